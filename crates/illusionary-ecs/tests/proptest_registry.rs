//! Property tests for registry operations.
//!
//! These tests use `proptest` to generate random sequences of registry
//! operations and check them against a simple model of the deferred commit
//! after every step.

use std::collections::BTreeSet;

use illusionary_ecs::prelude::*;
use proptest::prelude::*;

#[derive(Debug, Clone, PartialEq)]
struct Pos {
    x: f32,
    y: f32,
}

#[derive(Debug, Clone, PartialEq)]
struct Tag(u32);

struct TaggedPositions {
    base: SystemBase,
}

impl System for TaggedPositions {
    fn base(&self) -> &SystemBase {
        &self.base
    }
    fn base_mut(&mut self) -> &mut SystemBase {
        &mut self.base
    }
}

/// Operations we can perform on the registry.
#[derive(Debug, Clone)]
enum RegistryOp {
    Create { pos: bool, tag: bool },
    Kill(usize),
    AddTag(usize),
    RemoveTag(usize),
    Update,
    ClearAll,
}

fn registry_op_strategy() -> impl Strategy<Value = RegistryOp> {
    prop_oneof![
        4 => (any::<bool>(), any::<bool>()).prop_map(|(pos, tag)| RegistryOp::Create { pos, tag }),
        2 => (0..100usize).prop_map(RegistryOp::Kill),
        1 => (0..100usize).prop_map(RegistryOp::AddTag),
        1 => (0..100usize).prop_map(RegistryOp::RemoveTag),
        2 => Just(RegistryOp::Update),
        1 => Just(RegistryOp::ClearAll),
    ]
}

/// Model of what the registry should look like.
#[derive(Default)]
struct Model {
    /// Active and not staged for kill.
    live: Vec<Entity>,
    /// Created since the last update and still live.
    staged: BTreeSet<Entity>,
    pending_kill: BTreeSet<Entity>,
    /// Expected contents of the system list.
    members: BTreeSet<Entity>,
}

fn setup_registry() -> Registry {
    let mut registry = Registry::new();
    registry.add_system(TaggedPositions {
        base: SystemBase::new().with::<Pos>().with::<Tag>(),
    });
    registry
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(2_000))]

    #[test]
    fn random_ops_match_model(ops in prop::collection::vec(registry_op_strategy(), 1..80)) {
        let mut registry = setup_registry();
        let required = registry.get_system::<TaggedPositions>().unwrap().signature();
        let mut model = Model::default();

        for op in ops {
            match op {
                RegistryOp::Create { pos, tag } => {
                    let e = registry.create_entity();
                    // Never hands out an id that is live or awaiting reclamation.
                    prop_assert!(!model.live.contains(&e));
                    prop_assert!(!model.pending_kill.contains(&e));
                    prop_assert!(registry.signature(e).is_empty());
                    if pos {
                        registry.add_component(e, Pos { x: e.id() as f32, y: 0.0 });
                    }
                    if tag {
                        registry.add_component(e, Tag(e.id()));
                    }
                    model.live.push(e);
                    model.staged.insert(e);
                }
                RegistryOp::Kill(idx) => {
                    if !model.live.is_empty() {
                        let e = model.live.remove(idx % model.live.len());
                        registry.kill_entity(e).unwrap();
                        model.staged.remove(&e);
                        model.members.remove(&e);
                        model.pending_kill.insert(e);
                        prop_assert!(registry.signature(e).is_empty());
                    }
                }
                RegistryOp::AddTag(idx) => {
                    if !model.live.is_empty() {
                        let e = model.live[idx % model.live.len()];
                        registry.add_component(e, Tag(7));
                        prop_assert!(registry.has_component::<Tag>(e));
                    }
                }
                RegistryOp::RemoveTag(idx) => {
                    if !model.live.is_empty() {
                        let e = model.live[idx % model.live.len()];
                        registry.remove_component::<Tag>(e);
                        prop_assert!(!registry.has_component::<Tag>(e));
                    }
                }
                RegistryOp::Update => {
                    for &e in &model.staged {
                        if registry.signature(e).contains(required) {
                            model.members.insert(e);
                        }
                    }
                    model.staged.clear();
                    registry.update();
                    for e in std::mem::take(&mut model.pending_kill) {
                        prop_assert!(!registry.is_active(e));
                    }
                }
                RegistryOp::ClearAll => {
                    registry.clear_all_entities();
                    model.pending_kill.extend(model.live.drain(..));
                    model.staged.clear();
                    model.members.clear();
                }
            }

            // Invariant: active count covers live plus staged-for-kill ids.
            prop_assert_eq!(
                registry.entity_count(),
                model.live.len() + model.pending_kill.len()
            );
            prop_assert_eq!(registry.pending_kill_count(), model.pending_kill.len());

            // Invariant: the system list is exactly the modelled membership.
            let listed: BTreeSet<Entity> = registry
                .system_entities::<TaggedPositions>()
                .unwrap()
                .into_iter()
                .collect();
            prop_assert_eq!(&listed, &model.members);

            // Invariant: no duplicates in the system list.
            prop_assert_eq!(
                listed.len(),
                registry.system_entities::<TaggedPositions>().unwrap().len()
            );
        }
    }

    /// Ids freed in one frame come back oldest-first in the next.
    #[test]
    fn retired_ids_recycle_in_kill_order(
        spawn_count in 1..30usize,
        kill_picks in prop::collection::vec(0..30usize, 1..15),
    ) {
        let mut registry = Registry::new();
        let mut live: Vec<Entity> = (0..spawn_count).map(|_| registry.create_entity()).collect();
        registry.update();

        let mut killed = Vec::new();
        for pick in kill_picks {
            if live.is_empty() {
                break;
            }
            let e = live.remove(pick % live.len());
            registry.kill_entity(e).unwrap();
            killed.push(e);
        }
        registry.update();

        // Commit order is ascending by id, which is the recycle order.
        let mut expected = killed.clone();
        expected.sort();
        let reused: Vec<Entity> = (0..killed.len()).map(|_| registry.create_entity()).collect();
        prop_assert_eq!(reused, expected);
    }

    /// Superset matching: a system sees an entity iff the entity's signature
    /// covers the system's requirement.
    #[test]
    fn system_match_is_superset_test(pos in any::<bool>(), tag in any::<bool>()) {
        let mut registry = setup_registry();
        let e = registry.create_entity();
        if pos {
            registry.add_component(e, Pos { x: 0.0, y: 0.0 });
        }
        if tag {
            registry.add_component(e, Tag(0));
        }
        registry.update();

        let listed = registry.system_entities::<TaggedPositions>().unwrap();
        prop_assert_eq!(listed.contains(&e), pos && tag);
    }

    /// Component values written to distinct entities stay independent.
    #[test]
    fn component_values_independent(count in 2..60usize) {
        let mut registry = Registry::new();
        let entities: Vec<Entity> = (0..count).map(|_| registry.create_entity()).collect();
        for (i, &e) in entities.iter().enumerate() {
            registry.add_component(e, Pos { x: i as f32, y: (i * 2) as f32 });
        }
        for (i, &e) in entities.iter().enumerate() {
            let pos = registry.get_component::<Pos>(e);
            prop_assert_eq!(pos.x, i as f32);
            prop_assert_eq!(pos.y, (i * 2) as f32);
        }
    }
}
