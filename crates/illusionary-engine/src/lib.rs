//! Illusionary Engine -- frame loop, configuration and logging around the
//! Illusionary ECS.
//!
//! This crate builds on [`illusionary_ecs`] to provide the runtime driver: a
//! variable-timestep [`FrameLoop`](frame::FrameLoop) that owns the registry
//! and the event bus, commits staged entities once per frame and runs frame
//! systems in a fixed order.
//!
//! # Quick Start
//!
//! ```
//! use illusionary_engine::prelude::*;
//!
//! #[derive(Debug, Clone)]
//! struct Score(u32);
//!
//! let mut frames = FrameLoop::new(EngineConfig::default()).unwrap();
//! let board = frames.registry_mut().create_entity();
//! frames.registry_mut().add_component(board, Score(0));
//!
//! frames.add_system("scoring", move |registry, _events, _dt| {
//!     registry.get_component_mut::<Score>(board).0 += 1;
//!     Ok(())
//! });
//!
//! frames.run_frames(100);
//! assert_eq!(frames.registry().get_component::<Score>(board).0, 100);
//! ```

#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod frame;
pub mod logging;

pub use error::EngineError;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

/// Re-export the ECS crate for convenience.
pub use illusionary_ecs;

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common engine usage.
pub mod prelude {
    // Re-export everything from the ECS prelude.
    pub use illusionary_ecs::prelude::*;

    // Engine-specific exports.
    pub use crate::config::EngineConfig;
    pub use crate::frame::{FrameDiagnostics, FrameLoop, FrameSystemFn, SubscriptionHook};
    pub use crate::logging::{init_tracing, try_init_tracing};
    pub use crate::EngineError;
}
