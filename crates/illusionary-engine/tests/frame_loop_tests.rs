//! Integration tests for the frame loop driving a registry across frames.

use std::cell::RefCell;
use std::rc::Rc;

use illusionary_engine::prelude::*;
use proptest::prelude::*;

// -- Component types --------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
struct Position {
    x: f64,
    y: f64,
}

#[derive(Debug, Clone, PartialEq)]
struct Velocity {
    dx: f64,
    dy: f64,
}

#[derive(Debug, Clone, PartialEq)]
struct Lifetime(u32);

// -- Systems ----------------------------------------------------------------

struct MovementSystem {
    base: SystemBase,
}

impl System for MovementSystem {
    fn base(&self) -> &SystemBase {
        &self.base
    }
    fn base_mut(&mut self) -> &mut SystemBase {
        &mut self.base
    }
}

struct ExpirySystem {
    base: SystemBase,
}

impl System for ExpirySystem {
    fn base(&self) -> &SystemBase {
        &self.base
    }
    fn base_mut(&mut self) -> &mut SystemBase {
        &mut self.base
    }
}

fn movement(registry: &mut Registry, _: &mut EventBus<Registry>, dt: f64) -> Result<(), EngineError> {
    registry.run_system::<MovementSystem, _>(|system, registry| {
        for e in system.iter_entities() {
            let v = registry.get_component::<Velocity>(e).clone();
            let p = registry.get_component_mut::<Position>(e);
            p.x += v.dx * dt;
            p.y += v.dy * dt;
        }
    })?;
    Ok(())
}

/// Counts lifetimes down and kills expired entities mid-iteration.
fn expiry(registry: &mut Registry, _: &mut EventBus<Registry>, _dt: f64) -> Result<(), EngineError> {
    for e in registry.system_entities::<ExpirySystem>()? {
        let left = registry.get_component_mut::<Lifetime>(e);
        left.0 = left.0.saturating_sub(1);
        if left.0 == 0 {
            registry.kill_entity(e)?;
        }
    }
    Ok(())
}

fn setup() -> FrameLoop {
    let _ = try_init_tracing("warn");
    let mut frames = FrameLoop::new(EngineConfig::default()).unwrap();
    let registry = frames.registry_mut();
    registry.add_system(MovementSystem {
        base: SystemBase::new().with::<Position>().with::<Velocity>(),
    });
    registry.add_system(ExpirySystem {
        base: SystemBase::new().with::<Lifetime>(),
    });
    frames.add_system("movement", movement);
    frames.add_system("expiry", expiry);
    frames
}

fn spawn_particle(registry: &mut Registry, ttl: u32) -> Entity {
    let e = registry.create_entity();
    registry
        .entity_mut(e)
        .add_component(Position { x: 0.0, y: 0.0 })
        .add_component(Velocity { dx: 60.0, dy: 0.0 })
        .add_component(Lifetime(ttl));
    e
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
fn particles_move_then_expire() {
    let mut frames = setup();
    let short = spawn_particle(frames.registry_mut(), 2);
    let long = spawn_particle(frames.registry_mut(), 10);

    frames.run_frames(2);
    assert!(frames.registry().is_pending_kill(short));
    assert_eq!(
        frames.registry().system_entities::<MovementSystem>().unwrap(),
        vec![long]
    );

    // Reclaimed by the next frame's commit.
    frames.run_frames(1);
    assert!(!frames.registry().is_active(short));
    assert_eq!(frames.registry().entity_count(), 1);

    let x = frames.registry().get_component::<Position>(long).x;
    assert!((x - 3.0).abs() < 1e-9, "moved 3 frames at 60 px/s and 60 fps: {x}");
}

#[test]
fn entity_spawned_by_a_system_runs_from_the_next_frame() {
    let mut frames = setup();
    let spawned = Rc::new(RefCell::new(None));
    let spawned_in = Rc::clone(&spawned);
    frames.add_system("spawner", move |registry, _, _| {
        if spawned_in.borrow().is_none() {
            *spawned_in.borrow_mut() = Some(spawn_particle(registry, 100));
        }
        Ok(())
    });

    frames.run_frames(1);
    let e = spawned.borrow().unwrap();
    assert_eq!(frames.registry().get_component::<Position>(e).x, 0.0);

    frames.run_frames(1);
    assert!(frames.registry().get_component::<Position>(e).x > 0.0);
}

#[test]
fn collision_events_flow_through_hooked_owner() {
    #[derive(Default)]
    struct Referee {
        calls: Vec<(Entity, Entity)>,
    }

    impl Referee {
        fn on_collision(&mut self, event: &mut CollisionEvent, registry: &mut Registry) {
            self.calls.push((event.a, event.b));
            let _ = registry.kill_entity(event.b);
        }
    }

    let mut frames = setup();
    let a = spawn_particle(frames.registry_mut(), 100);
    let b = spawn_particle(frames.registry_mut(), 100);

    let referee = Rc::new(RefCell::new(Referee::default()));
    let owner = Rc::clone(&referee);
    frames.add_subscription_hook(move |events| {
        events.subscribe_to_event(&owner, Referee::on_collision);
    });
    frames.add_system("collide_once", move |registry, events, _| {
        if registry.is_active(b) && !registry.is_pending_kill(b) {
            events.emit_event(CollisionEvent::new(a, b), registry);
        }
        Ok(())
    });

    frames.run_frames(3);
    assert_eq!(referee.borrow().calls, vec![(a, b)]);
    assert!(!frames.registry().is_active(b));
}

#[test]
fn scene_reload_reuses_ids() {
    let mut frames = setup();
    let first: Vec<Entity> = (0..5)
        .map(|_| spawn_particle(frames.registry_mut(), 100))
        .collect();
    frames.run_frames(1);

    frames.end_scene();
    assert!(frames
        .registry()
        .system_entities::<MovementSystem>()
        .unwrap()
        .is_empty());

    let second: Vec<Entity> = (0..5)
        .map(|_| spawn_particle(frames.registry_mut(), 100))
        .collect();
    assert_eq!(first, second);
    frames.run_frames(1);
    assert_eq!(
        frames.registry().system_entities::<MovementSystem>().unwrap().len(),
        5
    );
}

#[test]
fn diagnostics_name_every_system() {
    let mut frames = setup();
    frames.run_frames(1);
    let names: Vec<&str> = frames
        .last_diagnostics()
        .system_times
        .iter()
        .map(|(name, _)| name.as_str())
        .collect();
    assert_eq!(names, vec!["movement", "expiry"]);
    assert!(frames.last_diagnostics().failed_systems.is_empty());
}

#[test]
fn config_file_round_trip() {
    let path = std::env::temp_dir().join(format!(
        "illusionary-engine-config-{}.json",
        std::process::id()
    ));
    let config = EngineConfig {
        target_fps: 30,
        ..Default::default()
    };
    std::fs::write(&path, serde_json::to_string_pretty(&config).unwrap()).unwrap();
    let loaded = EngineConfig::from_json_file(&path).unwrap();
    std::fs::remove_file(&path).unwrap();
    assert_eq!(loaded, config);
}

proptest! {
    /// The registry commits exactly once per unpaused frame, so staged
    /// entities become visible after exactly one unpaused frame.
    #[test]
    fn pausing_never_commits(pauses in prop::collection::vec(any::<bool>(), 1..40)) {
        let mut frames = setup();
        let mut expected_frames = 0u64;
        for paused in pauses {
            let e = spawn_particle(frames.registry_mut(), 1_000);
            frames.set_paused(paused);
            let ran = frames.frame(1.0 / 60.0);
            prop_assert_eq!(ran, !paused);
            if ran {
                expected_frames += 1;
            }
            let visible = frames
                .registry()
                .system_entities::<MovementSystem>()
                .unwrap()
                .contains(&e);
            prop_assert_eq!(visible, ran);
        }
        prop_assert_eq!(frames.frame_count(), expected_frames);
    }
}
