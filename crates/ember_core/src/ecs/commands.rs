//! Deferred world mutation.
//!
//! Systems queue structural changes on a [`CommandBuffer`] while storages
//! are locked for iteration; the dispatcher commits the buffer between
//! systems. Entity ids are reserved eagerly so queued mutations and
//! spawned blueprints can be referenced before the commit happens.

use std::any::Any;
use std::collections::HashMap;

use crate::reflect::Type;

use super::storage::{Component, Package};
use super::{Blueprint, Entity, World};

enum Command {
    Insert {
        entity: Entity,
        ty: Type,
        value: Box<dyn Any + Send + Sync>,
    },
    InsertPackaged {
        entity: Entity,
        ty: Type,
        package: Package,
    },
    Remove {
        entity: Entity,
        ty: Type,
    },
    Destroy {
        entity: Entity,
    },
}

/// Queue of world mutations applied on [`CommandBuffer::commit`].
#[derive(Default)]
pub struct CommandBuffer {
    queue: Vec<Command>,
}

impl CommandBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an entity now; its identity is valid immediately, only
    /// component mutations are deferred.
    pub fn create(&mut self, world: &World) -> Entity {
        world.create()
    }

    /// Queue attaching a component value to an entity.
    pub fn insert<T: Component>(&mut self, entity: Entity, value: T) {
        self.queue.push(Command::Insert {
            entity,
            ty: Type::of::<T>(),
            value: Box::new(value),
        });
    }

    /// Queue erasing the component of `entity`.
    pub fn remove<T: Component>(&mut self, entity: Entity) {
        self.queue.push(Command::Remove {
            entity,
            ty: Type::of::<T>(),
        });
    }

    /// Queue destroying an entity with all of its components.
    pub fn destroy(&mut self, entity: Entity) {
        self.queue.push(Command::Destroy { entity });
    }

    /// Instantiate a blueprint: every template entity gets a fresh world
    /// entity immediately, component insertion is deferred to commit.
    pub fn spawn(&mut self, world: &World, blueprint: &Blueprint) -> SpawnedEntities {
        let mut mapping = HashMap::new();
        let mut entities = HashMap::new();
        for (name, template) in blueprint.names() {
            let entity = world.create();
            mapping.insert(template, entity);
            entities.insert(name.to_string(), entity);
        }
        for (template, ty, package) in blueprint.components() {
            self.queue.push(Command::InsertPackaged {
                entity: mapping[&template],
                ty,
                package: package.clone(),
            });
        }
        SpawnedEntities { entities }
    }

    /// Apply every queued mutation, in queue order.
    pub fn commit(&mut self, world: &mut World) {
        for command in self.queue.drain(..) {
            match command {
                Command::Insert { entity, ty, value } => {
                    world.insert_any(entity, ty, value);
                }
                Command::InsertPackaged { entity, ty, package } => {
                    world.unpack_component(entity, ty, &package);
                }
                Command::Remove { entity, ty } => {
                    world.remove_by_type(entity, ty);
                }
                Command::Destroy { entity } => {
                    world.destroy(entity);
                }
            }
        }
    }
}

/// World entities created by spawning one blueprint.
pub struct SpawnedEntities {
    entities: HashMap<String, Entity>,
}

impl SpawnedEntities {
    /// The world entity spawned for the template entity `name`.
    ///
    /// # Panics
    ///
    /// Panics if the blueprint had no entity with that name.
    pub fn entity(&self, name: &str) -> Entity {
        match self.entities.get(name) {
            Some(&entity) => entity,
            None => panic!("blueprint has no entity named '{name}'"),
        }
    }

    pub fn try_entity(&self, name: &str) -> Option<Entity> {
        self.entities.get(name).copied()
    }
}
