//! Entity templates.
//!
//! A blueprint describes a set of named entities and their components,
//! detached from any world. Spawning a blueprint through a
//! [`CommandBuffer`](super::CommandBuffer) instantiates fresh world
//! entities for it; the blueprint itself is reusable.

use std::collections::HashMap;

use crate::reflect::Type;

use super::storage::{Component, Package};
use super::Entity;

/// A template describing entities and their components.
///
/// Entities inside a blueprint use blueprint-local ids; they are remapped
/// to real world entities at spawn time. Component values are held in
/// packaged form so the template can be instantiated any number of times.
#[derive(Default)]
pub struct Blueprint {
    next: u32,
    names: HashMap<String, Entity>,
    components: Vec<(Entity, Type, Package)>,
}

impl Blueprint {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a named template entity.
    ///
    /// # Panics
    ///
    /// Panics if the name is already taken within this blueprint.
    pub fn create(&mut self, name: &str) -> Entity {
        assert!(
            !self.names.contains_key(name),
            "blueprint already has an entity named '{name}'"
        );
        let entity = Entity::new(self.next);
        self.next += 1;
        self.names.insert(name.to_string(), entity);
        entity
    }

    /// Attach a component value to a template entity.
    ///
    /// Returns `false` when the value cannot be packaged, which is a
    /// recoverable data error.
    pub fn add<T: Component>(&mut self, entity: Entity, value: T) -> bool {
        match Package::new(&value) {
            Some(package) => {
                self.components.push((entity, Type::of::<T>(), package));
                true
            }
            None => false,
        }
    }

    /// Template entity registered under `name`, if any.
    pub fn entity(&self, name: &str) -> Option<Entity> {
        self.names.get(name).copied()
    }

    pub(crate) fn names(&self) -> impl Iterator<Item = (&str, Entity)> {
        self.names.iter().map(|(name, &entity)| (name.as_str(), entity))
    }

    pub(crate) fn components(&self) -> impl Iterator<Item = (Entity, Type, &Package)> {
        self.components
            .iter()
            .map(|(entity, ty, package)| (*entity, *ty, package))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Health(i32);

    #[test]
    fn named_entities_are_distinct() {
        let mut blueprint = Blueprint::new();
        let hero = blueprint.create("hero");
        let boss = blueprint.create("boss");
        assert_ne!(hero, boss);
        assert_eq!(blueprint.entity("hero"), Some(hero));
        assert_eq!(blueprint.entity("villager"), None);
    }

    #[test]
    #[should_panic(expected = "already has an entity named")]
    fn duplicate_entity_name_panics() {
        let mut blueprint = Blueprint::new();
        blueprint.create("hero");
        blueprint.create("hero");
    }

    #[test]
    fn components_are_kept_per_entity() {
        let mut blueprint = Blueprint::new();
        let hero = blueprint.create("hero");
        assert!(blueprint.add(hero, Health(100)));

        let stored: Vec<_> = blueprint.components().collect();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].0, hero);
        assert!(stored[0].1.is::<Health>());
        assert_eq!(stored[0].2.get::<Health>(), Some(Health(100)));
    }
}
