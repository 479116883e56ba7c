//! Headless brick-breaker demo.
//!
//! A ball bounces around a walled arena, breaking bricks stamped out from a
//! template. Collisions are detected by one frame system and resolved by an
//! event handler that kills the brick and keeps score.
//!
//! Usage: `illusionary-demo [config.json]`. Set `RUST_LOG=debug` to watch the
//! registry commit entities frame by frame.

use std::cell::RefCell;
use std::rc::Rc;

use anyhow::Context;
use illusionary_engine::prelude::*;
use tracing::info;

const ARENA_W: f32 = 320.0;
const ARENA_H: f32 = 240.0;
const FRAMES: u64 = 900;

// ---------------------------------------------------------------------------
// Components
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
struct Transform {
    x: f32,
    y: f32,
}

#[derive(Debug, Clone, PartialEq)]
struct RigidBody {
    vx: f32,
    vy: f32,
}

#[derive(Debug, Clone, PartialEq)]
struct BoxCollider {
    w: f32,
    h: f32,
}

#[derive(Debug, Clone, PartialEq)]
struct Brick {
    points: u32,
}

// ---------------------------------------------------------------------------
// Systems
// ---------------------------------------------------------------------------

struct MovementSystem {
    base: SystemBase,
}

impl MovementSystem {
    fn new() -> Self {
        Self {
            base: SystemBase::new().with::<Transform>().with::<RigidBody>(),
        }
    }

    fn update(&mut self, registry: &mut Registry, dt: f32) {
        for e in self.base.iter_entities() {
            let mut body = registry.get_component::<RigidBody>(e).clone();
            let t = registry.get_component_mut::<Transform>(e);
            t.x += body.vx * dt;
            t.y += body.vy * dt;
            if !(0.0..=ARENA_W).contains(&t.x) {
                body.vx = -body.vx;
                t.x = t.x.clamp(0.0, ARENA_W);
            }
            if !(0.0..=ARENA_H).contains(&t.y) {
                body.vy = -body.vy;
                t.y = t.y.clamp(0.0, ARENA_H);
            }
            *registry.get_component_mut::<RigidBody>(e) = body;
        }
    }
}

impl System for MovementSystem {
    fn base(&self) -> &SystemBase {
        &self.base
    }
    fn base_mut(&mut self) -> &mut SystemBase {
        &mut self.base
    }
}

struct CollisionSystem {
    base: SystemBase,
}

impl CollisionSystem {
    fn new() -> Self {
        Self {
            base: SystemBase::new().with::<Transform>().with::<BoxCollider>(),
        }
    }

    /// Every overlapping pair, each reported once.
    fn overlaps(&self, registry: &Registry) -> Vec<(Entity, Entity)> {
        let entities = self.base.entities();
        let mut pairs = Vec::new();
        for (i, &a) in entities.iter().enumerate() {
            for &b in &entities[i + 1..] {
                if aabb_overlap(registry, a, b) {
                    pairs.push((a, b));
                }
            }
        }
        pairs
    }
}

impl System for CollisionSystem {
    fn base(&self) -> &SystemBase {
        &self.base
    }
    fn base_mut(&mut self) -> &mut SystemBase {
        &mut self.base
    }
}

fn aabb_overlap(registry: &Registry, a: Entity, b: Entity) -> bool {
    let (ta, ca) = (
        registry.get_component::<Transform>(a),
        registry.get_component::<BoxCollider>(a),
    );
    let (tb, cb) = (
        registry.get_component::<Transform>(b),
        registry.get_component::<BoxCollider>(b),
    );
    ta.x < tb.x + cb.w && ta.x + ca.w > tb.x && ta.y < tb.y + cb.h && ta.y + ca.h > tb.y
}

/// Breaks bricks on collision and keeps the score.
#[derive(Debug, Default)]
struct Scoreboard {
    score: u32,
    bricks_broken: u32,
}

impl Scoreboard {
    fn on_collision(&mut self, event: &mut CollisionEvent, registry: &mut Registry) {
        for brick in [event.a, event.b] {
            if registry.is_pending_kill(brick) {
                continue;
            }
            let Some(points) = registry.component::<Brick>(brick).map(|b| b.points) else {
                continue;
            };
            if registry.kill_entity(brick).is_ok() {
                self.score += points;
                self.bricks_broken += 1;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Scene setup
// ---------------------------------------------------------------------------

fn load_scene(registry: &mut Registry) -> Result<(), EcsError> {
    let mut templates = EntityTemplates::new();
    let proto = registry.create_entity();
    registry
        .entity_mut(proto)
        .add_component(Transform { x: -100.0, y: -100.0 })
        .add_component(Brick { points: 10 })
        .add_component(BoxCollider { w: 30.0, h: 10.0 });
    templates.register("brick", proto, registry)?;

    for row in 0..4 {
        for col in 0..8 {
            templates.replicate_with("brick", registry, |brick| {
                let t = brick.get_component_mut::<Transform>();
                t.x = 20.0 + col as f32 * 36.0;
                t.y = 20.0 + row as f32 * 16.0;
                brick.get_component_mut::<Brick>().points = 10 * (4 - row);
            })?;
        }
    }
    // The prototype only exists to be copied.
    registry.kill_entity(proto)?;

    let ball = registry.create_entity();
    registry
        .entity_mut(ball)
        .add_component(Transform { x: 160.0, y: 200.0 })
        .add_component(RigidBody { vx: 90.0, vy: -140.0 })
        .add_component(BoxCollider { w: 6.0, h: 6.0 });
    Ok(())
}

fn main() -> Result<(), anyhow::Error> {
    let config = match std::env::args().nth(1) {
        Some(path) => EngineConfig::from_json_file(&path)
            .with_context(|| format!("loading engine config from {path}"))?,
        None => EngineConfig::default(),
    };
    init_tracing(&config.log_filter);

    let mut frames = FrameLoop::new(config)?;
    frames.registry_mut().add_system(MovementSystem::new());
    frames.registry_mut().add_system(CollisionSystem::new());
    load_scene(frames.registry_mut())?;

    let scoreboard = Rc::new(RefCell::new(Scoreboard::default()));
    let owner = Rc::clone(&scoreboard);
    frames.add_subscription_hook(move |events| {
        events.subscribe_to_event(&owner, Scoreboard::on_collision);
    });

    frames.add_system("movement", |registry, _events, dt| {
        registry.run_system::<MovementSystem, _>(|system, registry| {
            system.update(registry, dt as f32)
        })?;
        Ok(())
    });
    frames.add_system("collision", |registry, events, _dt| {
        let pairs = registry.run_system::<CollisionSystem, _>(|system, registry| {
            system.overlaps(registry)
        })?;
        for (a, b) in pairs {
            events.emit_event(CollisionEvent::new(a, b), registry);
        }
        Ok(())
    });

    frames.run_frames(FRAMES);

    let board = scoreboard.borrow();
    info!(
        frames = frames.frame_count(),
        elapsed = frames.elapsed_time(),
        score = board.score,
        bricks_broken = board.bricks_broken,
        entities = frames.registry().entity_count(),
        "demo finished"
    );
    println!(
        "score {} ({} bricks) after {} frames",
        board.score,
        board.bricks_broken,
        frames.frame_count()
    );

    frames.end_scene();
    Ok(())
}
