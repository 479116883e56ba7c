//! Variable-timestep frame loop.
//!
//! The [`FrameLoop`] owns the [`Registry`] and the frame's [`EventBus`] and
//! drives one frame at a time:
//!
//! 1. The measured delta time is clamped to the configured maximum.
//! 2. While paused, nothing else happens.
//! 3. The event bus is reset and every subscription hook runs, so handlers
//!    are bound afresh each frame.
//! 4. [`Registry::update`] commits the entities staged during the previous
//!    frame. This happens exactly once, before any frame system runs.
//! 5. Frame systems run in registration order with the delta time. A system
//!    that fails is logged and the frame carries on.
//!
//! # Example
//!
//! ```
//! use illusionary_engine::prelude::*;
//!
//! let mut frames = FrameLoop::new(EngineConfig::default()).unwrap();
//! frames.add_system("spawner", |registry, _events, _dt| {
//!     registry.create_entity();
//!     Ok(())
//! });
//!
//! frames.run_frames(3);
//! assert_eq!(frames.frame_count(), 3);
//! assert_eq!(frames.registry().entity_count(), 3);
//! ```

use std::time::{Duration, Instant};

use illusionary_ecs::event::{Event, EventBus};
use illusionary_ecs::registry::Registry;
use tracing::{debug, error, info};

use crate::config::EngineConfig;
use crate::EngineError;

// ---------------------------------------------------------------------------
// FrameSystemFn
// ---------------------------------------------------------------------------

/// A per-frame system: receives the registry, the frame's event bus and the
/// clamped delta time in seconds.
pub type FrameSystemFn =
    Box<dyn FnMut(&mut Registry, &mut EventBus<Registry>, f64) -> Result<(), EngineError>>;

/// Re-binds event handlers after the bus is reset.
pub type SubscriptionHook = Box<dyn FnMut(&mut EventBus<Registry>)>;

struct FrameSystem {
    name: String,
    func: FrameSystemFn,
}

// ---------------------------------------------------------------------------
// FrameDiagnostics
// ---------------------------------------------------------------------------

/// Timing diagnostics for the last frame.
#[derive(Debug, Clone, Default)]
pub struct FrameDiagnostics {
    /// Delta time handed to systems, after clamping.
    pub delta_time: f64,
    /// Time spent in [`Registry::update`].
    pub commit_time: Duration,
    /// Wall-clock time per system (in order of execution).
    pub system_times: Vec<(String, Duration)>,
    /// Systems that returned an error this frame.
    pub failed_systems: Vec<String>,
    pub total_time: Duration,
}

// ---------------------------------------------------------------------------
// FrameLoop
// ---------------------------------------------------------------------------

/// Owns the registry and event bus and advances them frame by frame.
pub struct FrameLoop {
    config: EngineConfig,
    registry: Registry,
    events: EventBus<Registry>,
    hooks: Vec<SubscriptionHook>,
    systems: Vec<FrameSystem>,
    frame_counter: u64,
    /// Sum of the clamped delta times of every unpaused frame.
    elapsed: f64,
    paused: bool,
    last_diagnostics: FrameDiagnostics,
}

impl FrameLoop {
    /// Create a frame loop with a fresh registry sized by `config.registry`.
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        let registry = Registry::with_config(config.registry.clone());
        info!(target_fps = config.target_fps, "frame loop created");
        Ok(Self {
            config,
            registry,
            events: EventBus::new(),
            hooks: Vec::new(),
            systems: Vec::new(),
            frame_counter: 0,
            elapsed: 0.0,
            paused: false,
            last_diagnostics: FrameDiagnostics::default(),
        })
    }

    /// Register a frame system. Systems run in registration order.
    ///
    /// # Panics
    ///
    /// Panics if a system with the same name is already registered.
    pub fn add_system<F>(&mut self, name: &str, func: F)
    where
        F: FnMut(&mut Registry, &mut EventBus<Registry>, f64) -> Result<(), EngineError> + 'static,
    {
        assert!(
            !self.systems.iter().any(|s| s.name == name),
            "duplicate frame system name: {name:?}"
        );
        self.systems.push(FrameSystem {
            name: name.to_owned(),
            func: Box::new(func),
        });
    }

    /// Register a hook that subscribes handlers to the event bus. Hooks run
    /// at the start of every unpaused frame, right after the bus is reset.
    pub fn add_subscription_hook(&mut self, hook: impl FnMut(&mut EventBus<Registry>) + 'static) {
        self.hooks.push(Box::new(hook));
    }

    /// Advance one frame with a measured delta of `dt` seconds.
    ///
    /// Returns `false` if the loop is paused and nothing ran.
    pub fn frame(&mut self, dt: f64) -> bool {
        let dt = dt.clamp(0.0, self.config.max_frame_time());
        if self.paused {
            return false;
        }

        let frame_start = Instant::now();

        self.events.reset();
        for hook in &mut self.hooks {
            hook(&mut self.events);
        }

        let commit_start = Instant::now();
        self.registry.update();
        let commit_time = commit_start.elapsed();

        let mut system_times = Vec::with_capacity(self.systems.len());
        let mut failed_systems = Vec::new();
        for system in &mut self.systems {
            let sys_start = Instant::now();
            if let Err(err) = (system.func)(&mut self.registry, &mut self.events, dt) {
                error!(system = %system.name, error = %err, "frame system failed");
                failed_systems.push(system.name.clone());
            }
            system_times.push((system.name.clone(), sys_start.elapsed()));
        }

        self.frame_counter += 1;
        self.elapsed += dt;
        self.last_diagnostics = FrameDiagnostics {
            delta_time: dt,
            commit_time,
            system_times,
            failed_systems,
            total_time: frame_start.elapsed(),
        };
        true
    }

    /// Run `count` frames back to back at the target frame rate's delta.
    /// Returns the number of frames that actually ran (paused ones don't).
    pub fn run_frames(&mut self, count: u64) -> u64 {
        let dt = self.config.frame_dt();
        (0..count).filter(|_| self.frame(dt)).count() as u64
    }

    /// Run `count` frames in real time, sleeping off whatever is left of each
    /// frame's budget. Each frame receives the wall-clock time since the
    /// previous one.
    pub fn run_paced(&mut self, count: u64) -> u64 {
        let budget = self.config.frame_budget();
        let mut ran = 0;
        let mut last = Instant::now();
        let mut dt = self.config.frame_dt();
        for _ in 0..count {
            let start = Instant::now();
            if self.frame(dt) {
                ran += 1;
            }
            if let Some(rest) = budget.checked_sub(start.elapsed()) {
                std::thread::sleep(rest);
            }
            let now = Instant::now();
            dt = now.duration_since(last).as_secs_f64();
            last = now;
        }
        ran
    }

    /// Tear down the current scene: kill every entity and reclaim the ids
    /// immediately.
    pub fn end_scene(&mut self) {
        info!(frame = self.frame_counter, "ending scene");
        self.registry.clear_all_entities();
        self.registry.update();
    }

    /// Emit an event outside the frame systems, e.g. from input handling.
    pub fn emit_event<E: Event>(&mut self, event: E) -> usize {
        self.events.emit_event(event, &mut self.registry)
    }

    // -- pause --------------------------------------------------------------

    pub fn pause(&mut self) {
        self.set_paused(true);
    }

    pub fn resume(&mut self) {
        self.set_paused(false);
    }

    pub fn toggle_pause(&mut self) {
        self.set_paused(!self.paused);
    }

    pub fn set_paused(&mut self, paused: bool) {
        if self.paused != paused {
            debug!(paused, frame = self.frame_counter, "pause toggled");
        }
        self.paused = paused;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    // -- accessors ----------------------------------------------------------

    /// Number of unpaused frames run so far.
    pub fn frame_count(&self) -> u64 {
        self.frame_counter
    }

    /// Simulation time in seconds: the sum of clamped deltas.
    pub fn elapsed_time(&self) -> f64 {
        self.elapsed
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Mutable access for scene setup and tests.
    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    pub fn events(&self) -> &EventBus<Registry> {
        &self.events
    }

    pub fn system_count(&self) -> usize {
        self.systems.len()
    }

    /// The names of all frame systems, in execution order.
    pub fn system_names(&self) -> Vec<&str> {
        self.systems.iter().map(|s| s.name.as_str()).collect()
    }

    /// Diagnostics from the last unpaused frame.
    pub fn last_diagnostics(&self) -> &FrameDiagnostics {
        &self.last_diagnostics
    }
}

impl std::fmt::Debug for FrameLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameLoop")
            .field("frame_counter", &self.frame_counter)
            .field("paused", &self.paused)
            .field("systems", &self.system_names())
            .field("hooks", &self.hooks.len())
            .field("registry", &self.registry)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
