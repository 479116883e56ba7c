//! The system base shared by every processing unit.
//!
//! Concrete systems (rendering, physics, ...) live outside this crate. They
//! embed a [`SystemBase`] that records which component kinds they require and
//! which entities currently match, and implement [`System`] so the registry
//! can keep that list up to date.
//!
//! ```
//! use illusionary_ecs::prelude::*;
//!
//! #[derive(Clone)]
//! struct Transform { x: f32 }
//! #[derive(Clone)]
//! struct Velocity { dx: f32 }
//!
//! struct MovementSystem { base: SystemBase }
//!
//! impl MovementSystem {
//!     fn new() -> Self {
//!         let mut base = SystemBase::new();
//!         base.require_component::<Transform>();
//!         base.require_component::<Velocity>();
//!         Self { base }
//!     }
//! }
//!
//! impl System for MovementSystem {
//!     fn base(&self) -> &SystemBase { &self.base }
//!     fn base_mut(&mut self) -> &mut SystemBase { &mut self.base }
//! }
//!
//! let mut registry = Registry::new();
//! registry.add_system(MovementSystem::new());
//! assert!(registry.has_system::<MovementSystem>());
//! ```

use std::any::{type_name, Any};
use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use crate::component::ComponentTypeId;
use crate::entity::Entity;
use crate::signature::Signature;

// ---------------------------------------------------------------------------
// SystemBase
// ---------------------------------------------------------------------------

/// Matching entities in commit order, plus a set for membership tests.
#[derive(Debug, Default)]
struct Membership {
    order: Vec<Entity>,
    members: HashSet<Entity>,
}

/// Required signature plus the live list of matching entities.
///
/// The entity list is shared with the registry while the system is lent out
/// through [`Registry::run_system`](crate::registry::Registry::run_system),
/// so a kill issued mid-iteration is visible to the system at once.
#[derive(Debug, Default)]
pub struct SystemBase {
    signature: Signature,
    entities: Rc<RefCell<Membership>>,
}

impl SystemBase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Require component kind `T`. Call while constructing the system.
    pub fn require_component<T: 'static>(&mut self) {
        self.signature.set(ComponentTypeId::of::<T>());
    }

    /// Builder form of [`require_component`](Self::require_component).
    pub fn with<T: 'static>(mut self) -> Self {
        self.require_component::<T>();
        self
    }

    /// The kinds this system requires.
    #[inline]
    pub fn signature(&self) -> Signature {
        self.signature
    }

    /// Snapshot of the matching entities, in the order they were committed.
    pub fn entities(&self) -> Vec<Entity> {
        self.entities.borrow().order.clone()
    }

    /// Iterate the matching entities, skipping any that leave the list
    /// (killed) before the iterator reaches them.
    ///
    /// Entities committed after the iterator was created are not visited.
    pub fn iter_entities(&self) -> EntityIter {
        EntityIter {
            snapshot: self.entities().into_iter(),
            membership: Rc::clone(&self.entities),
        }
    }

    /// Whether an entity with signature `entity_signature` belongs here.
    #[inline]
    pub fn is_interested(&self, entity_signature: Signature) -> bool {
        entity_signature.contains(self.signature)
    }

    pub fn contains(&self, entity: Entity) -> bool {
        self.entities.borrow().members.contains(&entity)
    }

    pub fn len(&self) -> usize {
        self.entities.borrow().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A second handle onto the same signature and entity list.
    pub(crate) fn share(&self) -> SystemBase {
        SystemBase {
            signature: self.signature,
            entities: Rc::clone(&self.entities),
        }
    }

    /// Append `entity`. No-op if already present.
    pub(crate) fn add_entity(&mut self, entity: Entity) {
        let mut list = self.entities.borrow_mut();
        if list.members.insert(entity) {
            list.order.push(entity);
        }
    }

    /// Drop `entity`. No-op if absent.
    pub(crate) fn remove_entity(&mut self, entity: Entity) {
        let mut list = self.entities.borrow_mut();
        if list.members.remove(&entity) {
            list.order.retain(|&other| other != entity);
        }
    }
}

/// Iterator returned by [`SystemBase::iter_entities`].
#[derive(Debug)]
pub struct EntityIter {
    snapshot: std::vec::IntoIter<Entity>,
    membership: Rc<RefCell<Membership>>,
}

impl Iterator for EntityIter {
    type Item = Entity;

    fn next(&mut self) -> Option<Entity> {
        let membership = &self.membership;
        self.snapshot
            .by_ref()
            .find(|entity| membership.borrow().members.contains(entity))
    }
}

// ---------------------------------------------------------------------------
// System
// ---------------------------------------------------------------------------

/// Downcasting support for trait objects.
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// A processing unit registered with the [`Registry`](crate::registry::Registry).
///
/// Systems are stored keyed by their concrete type; at most one instance of
/// each type exists per registry.
pub trait System: AsAny {
    fn base(&self) -> &SystemBase;

    fn base_mut(&mut self) -> &mut SystemBase;

    /// Name used in logs and errors.
    fn name(&self) -> &'static str {
        type_name::<Self>()
    }

    /// Snapshot of the entities currently matching this system.
    fn entities(&self) -> Vec<Entity> {
        self.base().entities()
    }

    /// Iterate the matching entities, skipping ones killed mid-iteration.
    fn iter_entities(&self) -> EntityIter {
        self.base().iter_entities()
    }

    fn signature(&self) -> Signature {
        self.base().signature()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
