//! Typed publish/subscribe for domain events.
//!
//! Systems subscribe handlers to an event type on an [`EventBus`]; emitting an
//! event runs every handler for that type synchronously, in subscription
//! order. The bus knows nothing about the registry. Handlers receive a
//! caller-chosen context `C` alongside the event, which the frame loop sets
//! to the [`Registry`](crate::registry::Registry) so handlers can touch
//! components.
//!
//! Subscriptions are not expected to persist: the frame loop calls
//! [`EventBus::reset`] each frame and systems subscribe again.
//!
//! ```
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use illusionary_ecs::prelude::*;
//!
//! #[derive(Default)]
//! struct Scoreboard { hits: u32 }
//!
//! impl Scoreboard {
//!     fn on_collision(&mut self, _event: &mut CollisionEvent, _ctx: &mut ()) {
//!         self.hits += 1;
//!     }
//! }
//!
//! let board = Rc::new(RefCell::new(Scoreboard::default()));
//! let mut bus: EventBus = EventBus::new();
//! bus.subscribe_to_event(&board, Scoreboard::on_collision);
//!
//! bus.emit_event(CollisionEvent::new(Entity::new(1), Entity::new(2)), &mut ());
//! assert_eq!(board.borrow().hits, 1);
//! ```

use std::any::{type_name, Any, TypeId};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

use crate::entity::Entity;

/// Marker for types that can travel over an [`EventBus`].
pub trait Event: 'static {}

type Handler<C> = Box<dyn FnMut(&mut dyn Any, &mut C)>;

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Subscriber lists keyed by event type.
pub struct EventBus<C = ()> {
    subscribers: HashMap<TypeId, Vec<Handler<C>>>,
}

impl<C> Default for EventBus<C> {
    fn default() -> Self {
        Self {
            subscribers: HashMap::new(),
        }
    }
}

impl<C> fmt::Debug for EventBus<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("event_kinds", &self.subscribers.len())
            .field(
                "handlers",
                &self.subscribers.values().map(Vec::len).sum::<usize>(),
            )
            .finish()
    }
}

impl<C> EventBus<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every subscription.
    pub fn reset(&mut self) {
        self.subscribers.clear();
    }

    /// Subscribe a closure to events of type `E`.
    pub fn subscribe<E: Event>(&mut self, mut handler: impl FnMut(&mut E, &mut C) + 'static) {
        let erased: Handler<C> = Box::new(move |event: &mut dyn Any, ctx: &mut C| {
            if let Some(event) = event.downcast_mut::<E>() {
                handler(event, ctx);
            }
        });
        self.subscribers
            .entry(TypeId::of::<E>())
            .or_default()
            .push(erased);
    }

    /// Subscribe `method` bound to `owner`.
    ///
    /// The bus holds only a weak reference: once the owner is dropped its
    /// handler is skipped. A handler whose owner is already borrowed when the
    /// event fires is skipped with a warning.
    pub fn subscribe_to_event<E, O>(
        &mut self,
        owner: &Rc<RefCell<O>>,
        method: fn(&mut O, &mut E, &mut C),
    ) where
        E: Event,
        O: 'static,
        C: 'static,
    {
        let owner = Rc::downgrade(owner);
        self.subscribe::<E>(move |event, ctx| {
            let Some(owner) = owner.upgrade() else {
                trace!(event = type_name::<E>(), "event owner dropped, skipping handler");
                return;
            };
            match owner.try_borrow_mut() {
                Ok(mut owner) => method(&mut *owner, event, ctx),
                Err(_) => warn!(
                    event = type_name::<E>(),
                    owner = type_name::<O>(),
                    "event owner is already borrowed, skipping handler"
                ),
            };
        });
    }

    /// Run every handler subscribed to `E`, in subscription order.
    ///
    /// Returns the number of handlers invoked; zero when nobody listens.
    pub fn emit_event<E: Event>(&mut self, mut event: E, ctx: &mut C) -> usize {
        let Some(handlers) = self.subscribers.get_mut(&TypeId::of::<E>()) else {
            return 0;
        };
        for handler in handlers.iter_mut() {
            handler(&mut event, &mut *ctx);
        }
        handlers.len()
    }

    /// Number of handlers subscribed to `E`.
    pub fn subscriber_count<E: Event>(&self) -> usize {
        self.subscribers
            .get(&TypeId::of::<E>())
            .map_or(0, Vec::len)
    }
}

// ---------------------------------------------------------------------------
// Built-in events
// ---------------------------------------------------------------------------

/// Two entities overlapped this frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollisionEvent {
    pub a: Entity,
    pub b: Entity,
}

impl CollisionEvent {
    pub fn new(a: Entity, b: Entity) -> Self {
        Self { a, b }
    }
}

impl Event for CollisionEvent {}

/// A mouse button went down at a screen position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ClickEvent {
    pub button: i32,
    pub x: i32,
    pub y: i32,
}

impl ClickEvent {
    pub fn new(button: i32, x: i32, y: i32) -> Self {
        Self { button, x, y }
    }
}

impl Event for ClickEvent {}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
