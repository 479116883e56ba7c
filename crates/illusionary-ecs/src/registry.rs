//! The [`Registry`] is the central coordinator of the ECS. It owns the id
//! allocator, every entity signature, every component pool and every system,
//! plus the two staging sets that defer topology changes to the frame
//! boundary.
//!
//! # Frame protocol
//!
//! - [`create_entity`](Registry::create_entity) stages the new entity as
//!   *pending add*. Systems do not see it until the next
//!   [`update`](Registry::update).
//! - [`kill_entity`](Registry::kill_entity) removes the entity from every
//!   system immediately and clears its signature, but only stages its id as
//!   *pending kill*. The id is recycled by the next `update`, never earlier.
//! - [`update`](Registry::update) runs once per frame, before systems iterate:
//!   it first matches pending adds against every system, then retires pending
//!   kills.
//!
//! # Example
//!
//! ```
//! use illusionary_ecs::prelude::*;
//!
//! #[derive(Debug, Clone, PartialEq)]
//! struct Transform { x: f32, y: f32 }
//! #[derive(Debug, Clone, PartialEq)]
//! struct Sprite { id: u32 }
//!
//! struct RenderSystem { base: SystemBase }
//! impl System for RenderSystem {
//!     fn base(&self) -> &SystemBase { &self.base }
//!     fn base_mut(&mut self) -> &mut SystemBase { &mut self.base }
//! }
//!
//! let mut registry = Registry::new();
//! registry.add_system(RenderSystem {
//!     base: SystemBase::new().with::<Transform>().with::<Sprite>(),
//! });
//!
//! let a = registry.create_entity();
//! registry.add_component(a, Transform { x: 0.0, y: 0.0 });
//! registry.add_component(a, Sprite { id: 7 });
//!
//! // Not visible until the frame boundary.
//! assert!(registry.get_system::<RenderSystem>().unwrap().entities().is_empty());
//! registry.update();
//! assert_eq!(registry.get_system::<RenderSystem>().unwrap().entities(), vec![a]);
//! ```

use std::any::{type_name, TypeId};
use std::collections::{BTreeSet, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::component::{Component, ComponentTypeId};
use crate::entity::{Entity, EntityAllocator};
use crate::pool::{ErasedPool, Pool};
use crate::signature::Signature;
use crate::system::{AsAny, System, SystemBase};
use crate::EcsError;

// ---------------------------------------------------------------------------
// RegistryConfig
// ---------------------------------------------------------------------------

/// Sizing knobs for registry storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Slots allocated when a component kind's pool is first created.
    pub initial_pool_size: usize,
    /// Extra slots past the id watermark when an entity overflows a pool.
    pub pool_growth: usize,
    /// Signatures added per batch when a new id exceeds signature storage.
    pub signature_growth: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            initial_pool_size: 1000,
            pool_growth: 100,
            signature_growth: 100,
        }
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Owner of all entities, components and systems.
pub struct Registry {
    config: RegistryConfig,
    allocator: EntityAllocator,
    /// Per-entity signature, indexed by entity id.
    signatures: Vec<Signature>,
    /// Per-kind pool, indexed by `ComponentTypeId`. `None` until first use.
    pools: Vec<Option<Box<dyn ErasedPool>>>,
    systems: HashMap<TypeId, Box<dyn System>>,
    /// Shared entity lists of systems currently lent out by `run_system`.
    lent: HashMap<TypeId, SystemBase>,
    pending_add: BTreeSet<Entity>,
    pending_kill: BTreeSet<Entity>,
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("entity_count", &self.allocator.active_count())
            .field(
                "pools",
                &self
                    .pools
                    .iter()
                    .flatten()
                    .map(|pool| pool.kind_name())
                    .collect::<Vec<_>>(),
            )
            .field("system_count", &self.systems.len())
            .field("pending_add", &self.pending_add.len())
            .field("pending_kill", &self.pending_kill.len())
            .field("recyclable_ids", &self.allocator.free_count())
            .finish()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// Create an empty registry with default sizing.
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    pub fn with_config(config: RegistryConfig) -> Self {
        debug!(?config, "registry created");
        Self {
            config,
            allocator: EntityAllocator::new(),
            signatures: Vec::new(),
            pools: Vec::new(),
            systems: HashMap::new(),
            lent: HashMap::new(),
            pending_add: BTreeSet::new(),
            pending_kill: BTreeSet::new(),
        }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    // -- commit -------------------------------------------------------------

    /// Apply staged topology changes. Call exactly once per frame, before any
    /// system reads its entity list.
    ///
    /// 1. Every pending add is matched against every system.
    /// 2. Every pending kill is removed from all systems, its signature is
    ///    cleared, and its id is returned to the recycle queue.
    pub fn update(&mut self) {
        let to_add = std::mem::take(&mut self.pending_add);
        for &entity in &to_add {
            self.add_entity_to_systems(entity);
        }

        let to_kill = std::mem::take(&mut self.pending_kill);
        for &entity in &to_kill {
            self.remove_entity_from_systems(entity);
            if let Some(sig) = self.signatures.get_mut(entity.index()) {
                sig.reset();
            }
            self.allocator.retire(entity);
        }

        if !to_add.is_empty() || !to_kill.is_empty() {
            debug!(
                added = to_add.len(),
                killed = to_kill.len(),
                recyclable = self.allocator.free_count(),
                "registry committed"
            );
        }
    }

    // -- entity lifecycle ---------------------------------------------------

    /// Create an entity, reusing the oldest retired id when one exists.
    ///
    /// The entity is staged as pending add and becomes visible to systems at
    /// the next [`update`](Self::update). An id that is still active, or still
    /// staged for kill, is never returned; such candidates are skipped.
    pub fn create_entity(&mut self) -> Entity {
        loop {
            let (entity, minted) = self.allocator.next_candidate();
            if minted {
                self.ensure_signature_capacity(entity);
            }

            if self.allocator.is_active(entity) {
                warn!(%entity, "candidate id is still active, trying the next one");
                continue;
            }
            if self.pending_kill.contains(&entity) {
                warn!(%entity, "candidate id is staged for kill, trying the next one");
                continue;
            }

            self.allocator.activate(entity);
            self.pending_add.insert(entity);
            debug!(%entity, recycled = !minted, "entity created");
            return entity;
        }
    }

    /// Kill an active entity.
    ///
    /// The entity leaves every system list and loses all components right
    /// away; its id is reclaimed at the next [`update`](Self::update).
    ///
    /// Returns [`EcsError::EntityNotActive`] and changes nothing if the id is
    /// not active.
    pub fn kill_entity(&mut self, entity: Entity) -> Result<(), EcsError> {
        if !self.allocator.is_active(entity) {
            error!(%entity, "attempted to kill an entity that is not active");
            return Err(EcsError::EntityNotActive { entity });
        }

        self.remove_entity_from_systems(entity);
        if let Some(sig) = self.signatures.get_mut(entity.index()) {
            sig.reset();
        }
        self.pending_add.remove(&entity);
        self.pending_kill.insert(entity);
        debug!(%entity, "entity staged for kill");
        Ok(())
    }

    /// Kill every active entity, e.g. when tearing down a scene.
    ///
    /// All entities leave all systems now; their ids are reclaimed at the
    /// next [`update`](Self::update). Ids already waiting in the recycle queue
    /// are not touched.
    pub fn clear_all_entities(&mut self) {
        let active: Vec<Entity> = self.allocator.active_entities().collect();
        info!(count = active.len(), "clearing all entities");

        for entity in active {
            self.remove_entity_from_systems(entity);
            if let Some(sig) = self.signatures.get_mut(entity.index()) {
                sig.reset();
            }
            self.pending_kill.insert(entity);
        }
        self.pending_add.clear();
    }

    /// Create a new entity carrying a copy of every component `template` has.
    ///
    /// The copy is staged like any new entity. Fails if `template` is not
    /// active or is already staged for kill.
    pub fn duplicate_entity(&mut self, template: Entity) -> Result<Entity, EcsError> {
        if !self.allocator.is_active(template) || self.pending_kill.contains(&template) {
            return Err(EcsError::EntityNotActive { entity: template });
        }

        let template_sig = self.signature(template);
        let copy = self.create_entity();
        for id in template_sig.iter() {
            let Some(pool) = self
                .pools
                .get_mut(id.index() as usize)
                .and_then(|p| p.as_deref_mut())
            else {
                continue;
            };
            if pool.duplicate(template.index(), copy.index()) {
                self.signatures[copy.index()].set(id);
            }
        }

        debug!(%template, %copy, kinds = template_sig.count(), "entity duplicated");
        Ok(copy)
    }

    /// Whether `entity` is active (created and not yet reclaimed).
    ///
    /// Entities staged for kill stay active until the next update.
    pub fn is_active(&self, entity: Entity) -> bool {
        self.allocator.is_active(entity)
    }

    /// Number of active entities.
    pub fn entity_count(&self) -> usize {
        self.allocator.active_count()
    }

    pub fn pending_add_count(&self) -> usize {
        self.pending_add.len()
    }

    pub fn pending_kill_count(&self) -> usize {
        self.pending_kill.len()
    }

    pub fn is_pending_kill(&self, entity: Entity) -> bool {
        self.pending_kill.contains(&entity)
    }

    /// How many times `entity`'s id has been reclaimed. Tells a stored handle
    /// apart from a later entity that reuses the same id.
    pub fn generation(&self, entity: Entity) -> u32 {
        self.allocator.generation(entity)
    }

    /// The component kinds `entity` currently carries.
    pub fn signature(&self, entity: Entity) -> Signature {
        self.signatures
            .get(entity.index())
            .copied()
            .unwrap_or_default()
    }

    /// Borrow the registry through an entity handle.
    pub fn entity_mut(&mut self, entity: Entity) -> EntityMut<'_> {
        EntityMut {
            registry: self,
            entity,
        }
    }

    fn ensure_signature_capacity(&mut self, entity: Entity) {
        if entity.index() >= self.signatures.len() {
            let len = entity.index() + self.config.signature_growth.max(1);
            self.signatures.resize(len, Signature::EMPTY);
        }
    }

    // -- components ---------------------------------------------------------

    /// Store `component` for `entity` and set its signature bit.
    ///
    /// Overwrites any previous value of the same kind. System membership is
    /// not re-evaluated: an entity that was already committed keeps its
    /// current system lists even if its signature now matches more or fewer
    /// systems. Only entities created since the last update are matched.
    ///
    /// Adding to an entity that is not active is refused with a warning.
    pub fn add_component<T: Component>(&mut self, entity: Entity, component: T) {
        if !self.allocator.is_active(entity) {
            warn!(
                %entity,
                component = type_name::<T>(),
                "ignoring component added to an entity that is not active"
            );
            return;
        }

        let id = ComponentTypeId::of::<T>();
        let slot = id.index() as usize;
        if slot >= self.pools.len() {
            self.pools.resize_with(slot + 1, || None);
        }

        let initial_size = self.config.initial_pool_size;
        let grown_size = self.allocator.watermark() as usize + self.config.pool_growth;
        let erased = self.pools[slot]
            .get_or_insert_with(|| Box::new(Pool::<T>::new(initial_size)) as Box<dyn ErasedPool>);
        if entity.index() >= erased.len() {
            erased.grow_to(grown_size.max(entity.index() + 1));
        }

        match ErasedPool::as_any_mut(&mut **erased).downcast_mut::<Pool<T>>() {
            Some(pool) => pool.set(entity.index(), component),
            None => panic!(
                "pool for component kind {} holds a different type",
                type_name::<T>()
            ),
        }

        self.ensure_signature_capacity(entity);
        self.signatures[entity.index()].set(id);
    }

    /// Clear the signature bit for `T`. The stored value stays in the pool,
    /// inert, until a later add overwrites it.
    ///
    /// Like [`add_component`](Self::add_component), this does not re-evaluate
    /// system membership.
    pub fn remove_component<T: Component>(&mut self, entity: Entity) {
        let Some(id) = ComponentTypeId::lookup::<T>() else {
            return;
        };
        if let Some(sig) = self.signatures.get_mut(entity.index()) {
            sig.unset(id);
        }
    }

    /// Whether `entity`'s signature has the bit for `T`.
    pub fn has_component<T: Component>(&self, entity: Entity) -> bool {
        match ComponentTypeId::lookup::<T>() {
            Some(id) => self.signature(entity).test(id),
            None => false,
        }
    }

    /// The value stored for `entity` in `T`'s pool.
    ///
    /// Does not consult the signature: after
    /// [`remove_component`](Self::remove_component) this still returns the
    /// stale value. Callers establish presence with
    /// [`has_component`](Self::has_component) first.
    ///
    /// # Panics
    ///
    /// Panics if no value of kind `T` was ever stored for this id.
    pub fn get_component<T: Component>(&self, entity: Entity) -> &T {
        self.pool::<T>()
            .and_then(|pool| pool.get(entity.index()))
            .unwrap_or_else(|| missing_component::<T>(entity))
    }

    /// Mutable form of [`get_component`](Self::get_component).
    ///
    /// # Panics
    ///
    /// Panics if no value of kind `T` was ever stored for this id.
    pub fn get_component_mut<T: Component>(&mut self, entity: Entity) -> &mut T {
        self.pool_mut::<T>()
            .and_then(|pool| pool.get_mut(entity.index()))
            .unwrap_or_else(|| missing_component::<T>(entity))
    }

    /// Checked access: `None` unless `entity` currently has `T`.
    pub fn component<T: Component>(&self, entity: Entity) -> Option<&T> {
        if !self.has_component::<T>(entity) {
            return None;
        }
        self.pool::<T>()?.get(entity.index())
    }

    /// Checked mutable access: `None` unless `entity` currently has `T`.
    pub fn component_mut<T: Component>(&mut self, entity: Entity) -> Option<&mut T> {
        if !self.has_component::<T>(entity) {
            return None;
        }
        self.pool_mut::<T>()?.get_mut(entity.index())
    }

    /// The pool for `T`, if one has been created.
    pub fn pool<T: Component>(&self) -> Option<&Pool<T>> {
        let id = ComponentTypeId::lookup::<T>()?;
        let erased = self.pools.get(id.index() as usize)?.as_deref()?;
        ErasedPool::as_any(erased).downcast_ref::<Pool<T>>()
    }

    fn pool_mut<T: Component>(&mut self) -> Option<&mut Pool<T>> {
        let id = ComponentTypeId::lookup::<T>()?;
        let erased = self.pools.get_mut(id.index() as usize)?.as_deref_mut()?;
        ErasedPool::as_any_mut(erased).downcast_mut::<Pool<T>>()
    }

    // -- systems ------------------------------------------------------------

    /// Register a system, keyed by its concrete type.
    ///
    /// A system added after entities were committed only sees entities
    /// created from then on. Adding a second system of the same type replaces
    /// the first.
    pub fn add_system<S: System>(&mut self, system: S) {
        let name = system.name();
        if self
            .systems
            .insert(TypeId::of::<S>(), Box::new(system))
            .is_some()
        {
            warn!(system = name, "system replaced by a new instance");
        } else {
            info!(system = name, "system added");
        }
    }

    /// Unregister a system. Returns `false` if it was not registered.
    pub fn remove_system<S: System>(&mut self) -> bool {
        let removed = self.systems.remove(&TypeId::of::<S>()).is_some();
        if removed {
            info!(system = type_name::<S>(), "system removed");
        }
        removed
    }

    pub fn has_system<S: System>(&self) -> bool {
        self.systems.contains_key(&TypeId::of::<S>())
    }

    pub fn get_system<S: System>(&self) -> Option<&S> {
        self.systems
            .get(&TypeId::of::<S>())
            .and_then(|system| AsAny::as_any(&**system).downcast_ref::<S>())
    }

    pub fn get_system_mut<S: System>(&mut self) -> Option<&mut S> {
        self.systems
            .get_mut(&TypeId::of::<S>())
            .and_then(|system| AsAny::as_any_mut(&mut **system).downcast_mut::<S>())
    }

    pub fn system_count(&self) -> usize {
        self.systems.len()
    }

    /// A snapshot of the entities matching `S`, safe to iterate while
    /// mutating the registry.
    pub fn system_entities<S: System>(&self) -> Result<Vec<Entity>, EcsError> {
        self.get_system::<S>()
            .map(|system| system.entities())
            .ok_or(EcsError::SystemNotFound {
                name: type_name::<S>(),
            })
    }

    /// Lend system `S` out together with the registry.
    ///
    /// The registry keeps a handle on the lent system's entity list, so
    /// entities killed inside `f` leave `S` at once, exactly as they do for
    /// systems that stayed registered.
    pub fn run_system<S, R>(
        &mut self,
        f: impl FnOnce(&mut S, &mut Registry) -> R,
    ) -> Result<R, EcsError>
    where
        S: System,
    {
        let key = TypeId::of::<S>();
        let mut lent = self.systems.remove(&key).ok_or(EcsError::SystemNotFound {
            name: type_name::<S>(),
        })?;

        self.lent.insert(key, lent.base().share());
        let result = match AsAny::as_any_mut(&mut *lent).downcast_mut::<S>() {
            Some(system) => f(system, self),
            None => panic!("system {} stored under a foreign key", type_name::<S>()),
        };
        self.lent.remove(&key);

        if self.systems.contains_key(&key) {
            warn!(
                system = type_name::<S>(),
                "system was re-added while running; keeping the running instance"
            );
        }
        self.systems.insert(key, lent);
        Ok(result)
    }

    /// Append `entity` to every system whose required signature its
    /// signature contains, including a system lent out by `run_system`.
    pub fn add_entity_to_systems(&mut self, entity: Entity) {
        let entity_sig = self.signature(entity);
        let bases = self
            .systems
            .values_mut()
            .map(|system| system.base_mut())
            .chain(self.lent.values_mut());
        for base in bases {
            if base.is_interested(entity_sig) {
                base.add_entity(entity);
            }
        }
    }

    /// Remove `entity` from every system list, including a lent one.
    pub fn remove_entity_from_systems(&mut self, entity: Entity) {
        let bases = self
            .systems
            .values_mut()
            .map(|system| system.base_mut())
            .chain(self.lent.values_mut());
        for base in bases {
            base.remove_entity(entity);
        }
    }
}

fn missing_component<T>(entity: Entity) -> ! {
    panic!(
        "entity {entity} has no stored {} component; check has_component first",
        type_name::<T>()
    )
}

// ---------------------------------------------------------------------------
// EntityMut -- forwarding handle
// ---------------------------------------------------------------------------

/// An entity together with a mutable borrow of its registry.
///
/// ```
/// use illusionary_ecs::prelude::*;
///
/// #[derive(Debug, Clone, PartialEq)]
/// struct Health(u32);
///
/// let mut registry = Registry::new();
/// let e = registry.create_entity();
/// registry.entity_mut(e).add_component(Health(3));
/// assert!(registry.entity_mut(e).has_component::<Health>());
/// registry.entity_mut(e).kill().unwrap();
/// ```
pub struct EntityMut<'r> {
    registry: &'r mut Registry,
    entity: Entity,
}

impl<'r> EntityMut<'r> {
    pub fn id(&self) -> Entity {
        self.entity
    }

    pub fn add_component<T: Component>(&mut self, component: T) -> &mut Self {
        self.registry.add_component(self.entity, component);
        self
    }

    pub fn remove_component<T: Component>(&mut self) -> &mut Self {
        self.registry.remove_component::<T>(self.entity);
        self
    }

    pub fn has_component<T: Component>(&self) -> bool {
        self.registry.has_component::<T>(self.entity)
    }

    pub fn get_component<T: Component>(&self) -> &T {
        self.registry.get_component::<T>(self.entity)
    }

    pub fn get_component_mut<T: Component>(&mut self) -> &mut T {
        self.registry.get_component_mut::<T>(self.entity)
    }

    pub fn kill(self) -> Result<(), EcsError> {
        self.registry.kill_entity(self.entity)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
