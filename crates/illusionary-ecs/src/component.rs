//! Component kinds and their process-wide ids.
//!
//! Every Rust type used as a component is assigned a [`ComponentTypeId`] the
//! first time it is seen (on first add, or when a system requires it). The id
//! indexes both [`Signature`](crate::signature::Signature) bits and the
//! registry's pool table. Ids are process-wide: the same type gets the same id
//! in every [`Registry`](crate::registry::Registry) for the lifetime of the
//! process, and ids are never handed to a second type.

use std::any::{type_name, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

use parking_lot::RwLock;

use crate::signature::MAX_COMPONENTS;

// ---------------------------------------------------------------------------
// Component
// ---------------------------------------------------------------------------

/// Marker for types that can be stored as components.
///
/// Components must be `Clone` so template entities can be replicated.
pub trait Component: Clone + 'static {}

impl<T: Clone + 'static> Component for T {}

// ---------------------------------------------------------------------------
// ComponentTypeId
// ---------------------------------------------------------------------------

/// Small integer identifying one component kind.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentTypeId(pub(crate) u32);

impl ComponentTypeId {
    /// The id for `T`, assigning the next free one on first use.
    ///
    /// # Panics
    ///
    /// Panics if more than [`MAX_COMPONENTS`] distinct kinds are requested.
    pub fn of<T: 'static>() -> Self {
        let rust_type_id = TypeId::of::<T>();
        if let Some(&id) = table().read().by_type.get(&rust_type_id) {
            return id;
        }
        table().write().register(rust_type_id, type_name::<T>())
    }

    /// The id for `T` if it has already been assigned.
    pub fn lookup<T: 'static>() -> Option<Self> {
        table().read().by_type.get(&TypeId::of::<T>()).copied()
    }

    #[inline]
    pub fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for ComponentTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ComponentTypeId({})", self.0)
    }
}

// ---------------------------------------------------------------------------
// ComponentTable -- the process-wide id assignment
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct ComponentTable {
    by_type: HashMap<TypeId, ComponentTypeId>,
    /// `type_name` of each kind, indexed by `ComponentTypeId.0`.
    names: Vec<&'static str>,
}

impl ComponentTable {
    fn register(&mut self, rust_type_id: TypeId, name: &'static str) -> ComponentTypeId {
        // Another thread may have won the race between the read and write lock.
        if let Some(&existing) = self.by_type.get(&rust_type_id) {
            return existing;
        }
        if self.names.len() >= MAX_COMPONENTS {
            panic!(
                "cannot register component '{name}': the limit of {MAX_COMPONENTS} component kinds is reached"
            );
        }

        let id = ComponentTypeId(self.names.len() as u32);
        self.names.push(name);
        self.by_type.insert(rust_type_id, id);
        tracing::debug!(component = name, id = id.0, "assigned component type id");
        id
    }
}

fn table() -> &'static RwLock<ComponentTable> {
    static TABLE: OnceLock<RwLock<ComponentTable>> = OnceLock::new();
    TABLE.get_or_init(|| RwLock::new(ComponentTable::default()))
}

/// Type name for an assigned id.
pub fn component_name(id: ComponentTypeId) -> Option<&'static str> {
    table().read().names.get(id.0 as usize).copied()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
