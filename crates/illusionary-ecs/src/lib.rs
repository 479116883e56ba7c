//! Illusionary ECS -- signature-matched Entity Component System with a
//! deferred per-frame commit.
//!
//! Entities are plain integer ids. Each entity carries a [`Signature`]
//! bitmask of the component kinds it owns; component values live in one
//! [`Pool`] per kind, indexed directly by entity id. Systems declare a
//! required signature and receive every committed entity whose signature is a
//! superset of it. Creation and destruction are staged and applied by
//! [`Registry::update`] once per frame, so system entity lists never change
//! while the frame's systems iterate them (kills aside: a killed entity
//! leaves every list at once).
//!
//! # Quick Start
//!
//! ```
//! use illusionary_ecs::prelude::*;
//!
//! #[derive(Debug, Clone, PartialEq)]
//! struct Position { x: f32, y: f32 }
//!
//! #[derive(Debug, Clone, PartialEq)]
//! struct Velocity { dx: f32, dy: f32 }
//!
//! struct MovementSystem { base: SystemBase }
//!
//! impl System for MovementSystem {
//!     fn base(&self) -> &SystemBase { &self.base }
//!     fn base_mut(&mut self) -> &mut SystemBase { &mut self.base }
//! }
//!
//! let mut registry = Registry::new();
//! registry.add_system(MovementSystem {
//!     base: SystemBase::new().with::<Position>().with::<Velocity>(),
//! });
//!
//! let ball = registry.create_entity();
//! registry
//!     .entity_mut(ball)
//!     .add_component(Position { x: 0.0, y: 0.0 })
//!     .add_component(Velocity { dx: 1.0, dy: 0.0 });
//! registry.update();
//!
//! registry
//!     .run_system::<MovementSystem, _>(|system, registry| {
//!         for e in system.iter_entities() {
//!             let v = registry.get_component::<Velocity>(e).clone();
//!             let p = registry.get_component_mut::<Position>(e);
//!             p.x += v.dx;
//!             p.y += v.dy;
//!         }
//!     })
//!     .unwrap();
//!
//! assert_eq!(registry.get_component::<Position>(ball), &Position { x: 1.0, y: 0.0 });
//! ```

#![deny(unsafe_code)]

pub mod component;
pub mod entity;
pub mod event;
pub mod pool;
pub mod registry;
pub mod signature;
pub mod system;
pub mod template;

pub use registry::Registry;
pub use signature::Signature;

use entity::Entity;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced by ECS operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EcsError {
    /// The entity was never created or has already been reclaimed.
    #[error("entity {entity} is not active")]
    EntityNotActive { entity: Entity },

    /// No system of the requested type is registered.
    #[error("system '{name}' is not registered")]
    SystemNotFound { name: &'static str },

    /// No template was registered under the requested name.
    #[error("entity template '{name}' not found. Registered templates: [{registered}]")]
    TemplateNotFound { name: String, registered: String },

    /// The template's entity has been killed.
    #[error("entity template '{name}' refers to entity {entity}, which is not active")]
    TemplateNotActive { name: String, entity: Entity },
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::component::{Component, ComponentTypeId};
    pub use crate::entity::{Entity, EntityAllocator};
    pub use crate::event::{ClickEvent, CollisionEvent, Event, EventBus};
    pub use crate::pool::{ErasedPool, Pool};
    pub use crate::registry::{EntityMut, Registry, RegistryConfig};
    pub use crate::signature::{Signature, MAX_COMPONENTS};
    pub use crate::system::{AsAny, EntityIter, System, SystemBase};
    pub use crate::template::EntityTemplates;
    pub use crate::EcsError;
}

// ---------------------------------------------------------------------------
// Integration Tests
// ---------------------------------------------------------------------------
