//! Named prototype entities.
//!
//! A template is an ordinary live entity registered under a name. Replicating
//! it creates a fresh entity carrying copies of the template's components,
//! which callers then tweak (position, colour, ...). Templates are usually
//! kept out of every system by giving them no matching signature, or simply
//! tolerated as one extra entity.

use std::collections::BTreeMap;

use tracing::debug;

use crate::entity::Entity;
use crate::registry::{EntityMut, Registry};
use crate::EcsError;

/// A registered prototype and the id generation it was registered at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Prototype {
    entity: Entity,
    generation: u32,
}

/// Name-to-entity map of replication prototypes.
#[derive(Debug, Clone, Default)]
pub struct EntityTemplates {
    templates: BTreeMap<String, Prototype>,
}

impl EntityTemplates {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `entity` under `name`, replacing any previous template with
    /// that name. Returns the replaced entity.
    ///
    /// The entity must be active in `registry` and not staged for kill.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        entity: Entity,
        registry: &Registry,
    ) -> Result<Option<Entity>, EcsError> {
        if !registry.is_active(entity) || registry.is_pending_kill(entity) {
            return Err(EcsError::EntityNotActive { entity });
        }
        let name = name.into();
        let generation = registry.generation(entity);
        debug!(template = %name, %entity, generation, "template registered");
        let previous = self
            .templates
            .insert(name, Prototype { entity, generation });
        Ok(previous.map(|p| p.entity))
    }

    /// Forget a template. The entity itself is left alive.
    pub fn unregister(&mut self, name: &str) -> Option<Entity> {
        self.templates.remove(name).map(|p| p.entity)
    }

    pub fn get(&self, name: &str) -> Result<Entity, EcsError> {
        self.prototype(name).map(|p| p.entity)
    }

    fn prototype(&self, name: &str) -> Result<Prototype, EcsError> {
        self.templates
            .get(name)
            .copied()
            .ok_or_else(|| EcsError::TemplateNotFound {
                name: name.to_owned(),
                registered: self.names().collect::<Vec<_>>().join(", "),
            })
    }

    /// Create a copy of the template called `name`.
    ///
    /// Fails with [`EcsError::TemplateNotActive`] once the prototype has been
    /// killed, including when its id now belongs to an unrelated entity.
    pub fn replicate(&self, name: &str, registry: &mut Registry) -> Result<Entity, EcsError> {
        let Prototype { entity, generation } = self.prototype(name)?;
        if !registry.is_active(entity)
            || registry.is_pending_kill(entity)
            || registry.generation(entity) != generation
        {
            return Err(EcsError::TemplateNotActive {
                name: name.to_owned(),
                entity,
            });
        }
        registry.duplicate_entity(entity)
    }

    /// Replicate, then let `customize` adjust the copy before it is committed.
    pub fn replicate_with(
        &self,
        name: &str,
        registry: &mut Registry,
        customize: impl FnOnce(&mut EntityMut<'_>),
    ) -> Result<Entity, EcsError> {
        let copy = self.replicate(name, registry)?;
        customize(&mut registry.entity_mut(copy));
        Ok(copy)
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.templates.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Position(i32, i32);

    #[derive(Debug, Clone, PartialEq)]
    struct Colour(&'static str);

    fn brick(registry: &mut Registry) -> Entity {
        let e = registry.create_entity();
        registry.add_component(e, Position(0, 0));
        registry.add_component(e, Colour("red"));
        e
    }

    #[test]
    fn replicate_copies_components() {
        let mut registry = Registry::new();
        let mut templates = EntityTemplates::new();
        let proto = brick(&mut registry);
        templates.register("brick", proto, &registry).unwrap();

        let copy = templates.replicate("brick", &mut registry).unwrap();
        assert_ne!(copy, proto);
        assert_eq!(registry.get_component::<Colour>(copy), &Colour("red"));
    }

    #[test]
    fn replicate_with_customizes_copy() {
        let mut registry = Registry::new();
        let mut templates = EntityTemplates::new();
        let proto = brick(&mut registry);
        templates.register("brick", proto, &registry).unwrap();

        let copy = templates
            .replicate_with("brick", &mut registry, |e| {
                e.add_component(Position(4, 2));
            })
            .unwrap();
        assert_eq!(registry.get_component::<Position>(copy), &Position(4, 2));
    }

    #[test]
    fn unknown_template_lists_registered_names() {
        let mut registry = Registry::new();
        let mut templates = EntityTemplates::new();
        for name in ["paddle", "ball"] {
            let proto = brick(&mut registry);
            templates.register(name, proto, &registry).unwrap();
        }

        let err = templates.replicate("brick", &mut registry).unwrap_err();
        assert_eq!(
            err.to_string(),
            "entity template 'brick' not found. Registered templates: [ball, paddle]"
        );
    }

    #[test]
    fn killed_template_cannot_be_replicated() {
        let mut registry = Registry::new();
        let mut templates = EntityTemplates::new();
        let proto = brick(&mut registry);
        templates.register("brick", proto, &registry).unwrap();
        registry.kill_entity(proto).unwrap();

        let err = templates.replicate("brick", &mut registry).unwrap_err();
        assert!(matches!(err, EcsError::TemplateNotActive { entity, .. } if entity == proto));
    }

    #[test]
    fn template_id_reused_by_another_entity_is_not_replicated() {
        let mut registry = Registry::new();
        let mut templates = EntityTemplates::new();
        let proto = brick(&mut registry);
        templates.register("brick", proto, &registry).unwrap();

        registry.kill_entity(proto).unwrap();
        registry.update();
        let stranger = registry.create_entity();
        registry.add_component(stranger, Colour("green"));
        assert_eq!(stranger, proto);

        let err = templates.replicate("brick", &mut registry).unwrap_err();
        assert_eq!(
            err,
            EcsError::TemplateNotActive {
                name: "brick".to_owned(),
                entity: proto,
            }
        );
        assert_eq!(registry.pending_add_count(), 1);
    }

    #[test]
    fn register_rejects_dead_entities() {
        let mut registry = Registry::new();
        let mut templates = EntityTemplates::new();
        let err = templates
            .register("ghost", Entity::new(3), &registry)
            .unwrap_err();
        assert_eq!(err, EcsError::EntityNotActive { entity: Entity::new(3) });

        let doomed = brick(&mut registry);
        registry.kill_entity(doomed).unwrap();
        assert!(templates.register("doomed", doomed, &registry).is_err());
        assert!(templates.is_empty());
    }

    #[test]
    fn register_replaces_by_name() {
        let mut registry = Registry::new();
        let mut templates = EntityTemplates::new();
        let first = registry.create_entity();
        let second = registry.create_entity();
        assert_eq!(templates.register("a", first, &registry).unwrap(), None);
        assert_eq!(
            templates.register("a", second, &registry).unwrap(),
            Some(first)
        );
        assert_eq!(templates.len(), 1);
        assert_eq!(templates.get("a").unwrap(), second);
        assert_eq!(templates.unregister("a"), Some(second));
        assert!(templates.is_empty());
    }
}
