//! The world: entities, component routing and resources.
//!
//! The world owns entity identities and forwards every component
//! operation to the [`ComponentManager`]. Component access follows the
//! lock discipline the manager only supplies: a shared storage guard for
//! read-only access to one component type across entities, an exclusive
//! guard for any mutation. Resources are world-global singletons behind
//! the same reader/writer pattern.

use std::any::{Any, TypeId};
use std::collections::{HashMap, HashSet};
use std::marker::PhantomData;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::reflect::Type;

use super::storage::{AnyStorage, Component, Context, Package};
use super::{ComponentManager, Entity, Registry};

/// Container of entities, components and resources.
pub struct World {
    next_entity: AtomicU32,
    alive: RwLock<HashSet<u32>>,
    components: ComponentManager,
    resources: HashMap<TypeId, RwLock<Box<dyn Any + Send + Sync>>>,
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl World {
    pub fn new() -> Self {
        Self {
            // Id 0 is reserved so a zeroed handle is never live.
            next_entity: AtomicU32::new(1),
            alive: RwLock::new(HashSet::new()),
            components: ComponentManager::new(),
            resources: HashMap::new(),
        }
    }

    // --- entities ---

    /// Create a live entity. Ids are monotonic and never reused.
    pub fn create(&self) -> Entity {
        let index = self.next_entity.fetch_add(1, Ordering::Relaxed);
        self.alive.write().unwrap().insert(index);
        Entity::new(index)
    }

    /// Destroy an entity and erase all of its components. Destroying an
    /// already-dead entity is a no-op.
    pub fn destroy(&self, entity: Entity) {
        if self.alive.write().unwrap().remove(&entity.index()) {
            self.components.remove_all(entity);
        }
    }

    pub fn is_alive(&self, entity: Entity) -> bool {
        self.alive.read().unwrap().contains(&entity.index())
    }

    // --- components ---

    /// Register a component type with this world.
    ///
    /// # Panics
    ///
    /// Panics if `T` was never added to the global [`Registry`].
    pub fn register<T: Component>(&mut self) {
        self.components.register(Type::of::<T>());
    }

    pub fn components(&self) -> &ComponentManager {
        &self.components
    }

    /// Shared access to the storage of `T`, for concurrent reads across
    /// entities of one component type.
    ///
    /// # Panics
    ///
    /// Panics if `T` is not registered with this world.
    pub fn read_storage<T: Component>(&self) -> ReadStorage<'_, T> {
        let id = self.components.id_of(Type::of::<T>());
        ReadStorage {
            guard: self.components.read(id),
            _marker: PhantomData,
        }
    }

    /// Exclusive access to the storage of `T`, required for any
    /// structural mutation.
    pub fn write_storage<T: Component>(&self) -> WriteStorage<'_, T> {
        let id = self.components.id_of(Type::of::<T>());
        WriteStorage {
            guard: self.components.write(id),
            _marker: PhantomData,
        }
    }

    /// Attach a component value to an entity, replacing any previous one.
    pub fn insert<T: Component>(&self, entity: Entity, value: T) -> bool {
        self.write_storage::<T>().insert(entity, value)
    }

    /// Clone out the component of `entity`, if present.
    pub fn get_cloned<T: Component + Clone>(&self, entity: Entity) -> Option<T> {
        self.read_storage::<T>().get(entity).cloned()
    }

    pub fn has<T: Component>(&self, entity: Entity) -> bool {
        self.read_storage::<T>().contains(entity)
    }

    /// Erase the component of `entity`. No-op when absent.
    pub fn remove<T: Component>(&self, entity: Entity) {
        self.write_storage::<T>().remove(entity);
    }

    pub(crate) fn insert_any(&self, entity: Entity, ty: Type, value: Box<dyn Any>) -> bool {
        match self.components.try_id_of(ty) {
            Some(id) => self.components.write(id).insert_any(entity, value),
            None => {
                tracing::warn!(component = ty.name(), "component type not registered with this world");
                false
            }
        }
    }

    pub(crate) fn unpack_component(&self, entity: Entity, ty: Type, package: &Package) -> bool {
        match self.components.try_id_of(ty) {
            Some(id) => self.components.unpack(entity, id, package, None),
            None => {
                tracing::warn!(component = ty.name(), "component type not registered with this world");
                false
            }
        }
    }

    pub(crate) fn remove_by_type(&self, entity: Entity, ty: Type) {
        if let Some(id) = self.components.try_id_of(ty) {
            self.components.remove(entity, id);
        }
    }

    // --- persistence hooks ---

    /// Package every component of `entity` into a map keyed by registered
    /// component name.
    pub fn pack_entity(&self, entity: Entity, context: Option<&Context>) -> Package {
        let mut fields = serde_json::Map::new();
        for id in 1..=self.components.count() {
            let ty = self.components.type_of(id);
            if let Some(package) = self.components.pack(entity, id, context) {
                let name = Registry::name_of(ty).unwrap_or_else(|| ty.name().to_string());
                fields.insert(name, package.into_json());
            }
        }
        Package::from_json(serde_json::Value::Object(fields))
    }

    /// Instantiate components of `entity` from a package produced by
    /// [`World::pack_entity`]. Returns `false` when any field named an
    /// unknown component or carried malformed data; the remaining fields
    /// are still applied.
    pub fn unpack_entity(&self, entity: Entity, package: &Package, context: Option<&Context>) -> bool {
        let serde_json::Value::Object(fields) = package.json() else {
            tracing::warn!("entity package is not a map");
            return false;
        };
        let mut ok = true;
        for (name, value) in fields {
            let unpacked = Registry::type_of(name)
                .and_then(|ty| self.components.try_id_of(ty))
                .map(|id| {
                    self.components
                        .unpack(entity, id, &Package::from_json(value.clone()), context)
                });
            match unpacked {
                Some(true) => {}
                Some(false) => ok = false,
                None => {
                    tracing::warn!(component = name.as_str(), "unknown component in entity package");
                    ok = false;
                }
            }
        }
        ok
    }

    // --- resources ---

    /// Register a world-global resource, replacing any previous value of
    /// the same type.
    pub fn insert_resource<R: Any + Send + Sync>(&mut self, value: R) {
        self.resources
            .insert(TypeId::of::<R>(), RwLock::new(Box::new(value)));
    }

    /// Shared access to a resource.
    ///
    /// # Panics
    ///
    /// Panics if the resource was never inserted.
    pub fn read_resource<R: Any + Send + Sync>(&self) -> ReadResource<'_, R> {
        ReadResource {
            guard: self.resource_lock::<R>().read().unwrap(),
            _marker: PhantomData,
        }
    }

    /// Exclusive access to a resource.
    pub fn write_resource<R: Any + Send + Sync>(&self) -> WriteResource<'_, R> {
        WriteResource {
            guard: self.resource_lock::<R>().write().unwrap(),
            _marker: PhantomData,
        }
    }

    fn resource_lock<R: Any>(&self) -> &RwLock<Box<dyn Any + Send + Sync>> {
        self.resources.get(&TypeId::of::<R>()).unwrap_or_else(|| {
            panic!(
                "resource '{}' is not registered",
                std::any::type_name::<R>()
            )
        })
    }
}

/// Shared guard over one component type's storage.
pub struct ReadStorage<'a, T> {
    guard: RwLockReadGuard<'a, Box<dyn AnyStorage>>,
    _marker: PhantomData<T>,
}

impl<T: Component> ReadStorage<'_, T> {
    pub fn get(&self, entity: Entity) -> Option<&T> {
        self.guard.get_any(entity)?.downcast_ref::<T>()
    }

    pub fn contains(&self, entity: Entity) -> bool {
        self.guard.contains(entity)
    }
}

/// Exclusive guard over one component type's storage.
pub struct WriteStorage<'a, T> {
    guard: RwLockWriteGuard<'a, Box<dyn AnyStorage>>,
    _marker: PhantomData<T>,
}

impl<T: Component> WriteStorage<'_, T> {
    pub fn get(&self, entity: Entity) -> Option<&T> {
        self.guard.get_any(entity)?.downcast_ref::<T>()
    }

    pub fn get_mut(&mut self, entity: Entity) -> Option<&mut T> {
        self.guard.get_any_mut(entity)?.downcast_mut::<T>()
    }

    pub fn insert(&mut self, entity: Entity, value: T) -> bool {
        self.guard.insert_any(entity, Box::new(value))
    }

    pub fn remove(&mut self, entity: Entity) {
        self.guard.erase(entity);
    }
}

/// Shared guard over a resource.
pub struct ReadResource<'a, R> {
    guard: RwLockReadGuard<'a, Box<dyn Any + Send + Sync>>,
    _marker: PhantomData<R>,
}

impl<R: Any> Deref for ReadResource<'_, R> {
    type Target = R;

    fn deref(&self) -> &R {
        self.guard.downcast_ref::<R>().expect("resource type mismatch")
    }
}

/// Exclusive guard over a resource.
pub struct WriteResource<'a, R> {
    guard: RwLockWriteGuard<'a, Box<dyn Any + Send + Sync>>,
    _marker: PhantomData<R>,
}

impl<R: Any> Deref for WriteResource<'_, R> {
    type Target = R;

    fn deref(&self) -> &R {
        self.guard.downcast_ref::<R>().expect("resource type mismatch")
    }
}

impl<R: Any> DerefMut for WriteResource<'_, R> {
    fn deref_mut(&mut self) -> &mut R {
        self.guard.downcast_mut::<R>().expect("resource type mismatch")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::storage::VecStorage;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Position {
        x: i32,
        y: i32,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Velocity {
        x: i32,
        y: i32,
    }

    fn world() -> World {
        Registry::add::<Position, VecStorage<Position>>("position");
        Registry::add::<Velocity, VecStorage<Velocity>>("velocity");
        let mut world = World::new();
        world.register::<Position>();
        world.register::<Velocity>();
        world
    }

    #[test]
    fn entity_ids_are_never_reused() {
        let world = world();
        let first = world.create();
        world.destroy(first);
        let second = world.create();
        assert_ne!(first, second);
        assert!(!world.is_alive(first));
        assert!(world.is_alive(second));
    }

    #[test]
    fn components_route_through_storages() {
        let world = world();
        let entity = world.create();

        assert!(world.insert(entity, Position { x: 1, y: 2 }));
        assert!(world.has::<Position>(entity));
        assert_eq!(world.get_cloned::<Position>(entity), Some(Position { x: 1, y: 2 }));

        {
            let mut storage = world.write_storage::<Position>();
            storage.get_mut(entity).unwrap().x = 10;
        }
        assert_eq!(world.read_storage::<Position>().get(entity).map(|p| p.x), Some(10));

        world.remove::<Position>(entity);
        assert!(!world.has::<Position>(entity));
        // Removing again is a no-op.
        world.remove::<Position>(entity);
    }

    #[test]
    fn destroy_erases_every_component() {
        let world = world();
        let entity = world.create();
        world.insert(entity, Position { x: 0, y: 0 });
        world.insert(entity, Velocity { x: 1, y: 1 });

        world.destroy(entity);
        assert!(!world.has::<Position>(entity));
        assert!(!world.has::<Velocity>(entity));
    }

    #[test]
    fn pack_and_unpack_entity_round_trip() {
        let world = world();
        let entity = world.create();
        world.insert(entity, Position { x: 3, y: 4 });

        let package = world.pack_entity(entity, None);

        let other = self::world();
        let clone = other.create();
        assert!(other.unpack_entity(clone, &package, None));
        assert_eq!(other.get_cloned::<Position>(clone), Some(Position { x: 3, y: 4 }));
        assert!(!other.has::<Velocity>(clone));
    }

    #[test]
    fn unpack_entity_flags_unknown_fields() {
        let world = world();
        let entity = world.create();
        let package = Package::from_json(serde_json::json!({ "mystery": 1 }));
        assert!(!world.unpack_entity(entity, &package, None));
    }

    #[test]
    fn resources_are_world_singletons() {
        struct Counter(u32);

        let mut world = World::new();
        world.insert_resource(Counter(0));

        world.write_resource::<Counter>().0 += 5;
        assert_eq!(world.read_resource::<Counter>().0, 5);
    }

    #[test]
    #[should_panic(expected = "is not registered")]
    fn missing_resource_panics() {
        let world = World::new();
        let _ = world.read_resource::<String>();
    }
}
