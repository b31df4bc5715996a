//! Type-erased component storage.
//!
//! Each registered component type owns exactly one storage instance,
//! created through the global [`Registry`](super::Registry). Storages are
//! used through the object-safe [`AnyStorage`] capability set
//! {insert, erase, pack, unpack}; typed access goes through the world's
//! storage guards, which downcast the erased views.

use std::any::{Any, TypeId};
use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use super::Entity;

/// Bounds every component value must satisfy.
///
/// Serialization bounds back the pack/unpack hooks; the concrete package
/// format stays with the external serialization layer.
pub trait Component: Send + Sync + Serialize + DeserializeOwned + 'static {}

impl<T> Component for T where T: Send + Sync + Serialize + DeserializeOwned + 'static {}

/// Errors on the package data path. Always recoverable: package contents
/// are content-controlled and must never abort the process.
#[derive(Debug, Error)]
pub enum PackageError {
    #[error("value cannot be represented as a package: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("malformed or type-mismatched package data: {0}")]
    Deserialize(#[source] serde_json::Error),
}

/// An opaque packaged component value, produced by [`AnyStorage::pack`]
/// and consumed by [`AnyStorage::unpack`].
#[derive(Clone, Debug, PartialEq)]
pub struct Package(serde_json::Value);

impl Package {
    /// Package a value.
    pub fn try_new<T: Serialize>(value: &T) -> Result<Self, PackageError> {
        serde_json::to_value(value)
            .map(Self)
            .map_err(PackageError::Serialize)
    }

    /// Package a value. Returns `None` if the value cannot be
    /// represented, which is a recoverable data error.
    pub fn new<T: Serialize>(value: &T) -> Option<Self> {
        match Self::try_new(value) {
            Ok(package) => Some(package),
            Err(error) => {
                tracing::warn!(%error, "failed to package value");
                None
            }
        }
    }

    /// Extract a typed value.
    pub fn try_get<T: DeserializeOwned>(&self) -> Result<T, PackageError> {
        serde_json::from_value(self.0.clone()).map_err(PackageError::Deserialize)
    }

    /// Extract a typed value. Returns `None` on malformed or
    /// type-mismatched package data.
    pub fn get<T: DeserializeOwned>(&self) -> Option<T> {
        self.try_get().ok()
    }

    pub(crate) fn from_json(value: serde_json::Value) -> Self {
        Self(value)
    }

    pub(crate) fn json(&self) -> &serde_json::Value {
        &self.0
    }

    pub(crate) fn into_json(self) -> serde_json::Value {
        self.0
    }
}

/// Out-of-band state threaded through pack/unpack by the external
/// serialization layer. The core never interprets its contents.
#[derive(Default)]
pub struct Context {
    entries: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<T: Any + Send + Sync>(&mut self, value: T) {
        self.entries.insert(TypeId::of::<T>(), Box::new(value));
    }

    pub fn get<T: Any>(&self) -> Option<&T> {
        self.entries
            .get(&TypeId::of::<T>())
            .and_then(|entry| entry.downcast_ref::<T>())
    }
}

/// Object-safe capability set shared by every storage variant.
///
/// `erase`, `pack` and `unpack` must all be safe to call for an entity
/// that was never inserted: erase is a no-op, pack yields `None` and
/// unpack simply inserts.
pub trait AnyStorage: Send + Sync {
    /// Insert a type-erased value. Returns `false` when the value is not
    /// of this storage's component type.
    fn insert_any(&mut self, entity: Entity, value: Box<dyn Any>) -> bool;

    /// Type-erased view of the component for `entity`, if present.
    fn get_any(&self, entity: Entity) -> Option<&dyn Any>;

    /// Type-erased mutable view of the component for `entity`, if present.
    fn get_any_mut(&mut self, entity: Entity) -> Option<&mut dyn Any>;

    /// Drop the component for `entity`. No-op when absent.
    fn erase(&mut self, entity: Entity);

    /// Whether `entity` has a component in this storage.
    fn contains(&self, entity: Entity) -> bool {
        self.get_any(entity).is_some()
    }

    /// Package the component for `entity`, or `None` when absent or
    /// unrepresentable.
    fn pack(&self, entity: Entity, context: Option<&Context>) -> Option<Package>;

    /// Instantiate a component for `entity` from a package. Returns
    /// `false` on malformed or type-mismatched package data.
    fn unpack(&mut self, entity: Entity, package: &Package, context: Option<&Context>) -> bool;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Dense storage backed by a vector indexed by entity id.
///
/// Suited to components present on most entities; memory is proportional
/// to the highest inserted entity id.
pub struct VecStorage<T> {
    data: Vec<Option<T>>,
}

impl<T> Default for VecStorage<T> {
    fn default() -> Self {
        Self { data: Vec::new() }
    }
}

impl<T: Component> VecStorage<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value, returning the previous one if any.
    pub fn insert(&mut self, entity: Entity, value: T) -> Option<T> {
        let index = entity.index() as usize;
        if index >= self.data.len() {
            self.data.resize_with(index + 1, || None);
        }
        self.data[index].replace(value)
    }

    pub fn get(&self, entity: Entity) -> Option<&T> {
        self.data.get(entity.index() as usize)?.as_ref()
    }

    pub fn get_mut(&mut self, entity: Entity) -> Option<&mut T> {
        self.data.get_mut(entity.index() as usize)?.as_mut()
    }

    /// Remove and return the value for `entity`, if any.
    pub fn remove(&mut self, entity: Entity) -> Option<T> {
        self.data.get_mut(entity.index() as usize)?.take()
    }
}

impl<T: Component> AnyStorage for VecStorage<T> {
    fn insert_any(&mut self, entity: Entity, value: Box<dyn Any>) -> bool {
        match value.downcast::<T>() {
            Ok(value) => {
                self.insert(entity, *value);
                true
            }
            Err(_) => {
                tracing::error!(
                    component = std::any::type_name::<T>(),
                    "value of wrong type handed to storage"
                );
                false
            }
        }
    }

    fn get_any(&self, entity: Entity) -> Option<&dyn Any> {
        self.get(entity).map(|value| value as &dyn Any)
    }

    fn get_any_mut(&mut self, entity: Entity) -> Option<&mut dyn Any> {
        self.get_mut(entity).map(|value| value as &mut dyn Any)
    }

    fn erase(&mut self, entity: Entity) {
        self.remove(entity);
    }

    fn pack(&self, entity: Entity, _context: Option<&Context>) -> Option<Package> {
        Package::new(self.get(entity)?)
    }

    fn unpack(&mut self, entity: Entity, package: &Package, _context: Option<&Context>) -> bool {
        match package.get::<T>() {
            Some(value) => {
                self.insert(entity, value);
                true
            }
            None => {
                tracing::warn!(
                    component = std::any::type_name::<T>(),
                    "malformed package data"
                );
                false
            }
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Sparse storage backed by a hash map.
///
/// Suited to components present on few entities, where dense indexing
/// would waste memory.
pub struct MapStorage<T> {
    data: HashMap<u32, T>,
}

impl<T> Default for MapStorage<T> {
    fn default() -> Self {
        Self {
            data: HashMap::new(),
        }
    }
}

impl<T: Component> MapStorage<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, entity: Entity, value: T) -> Option<T> {
        self.data.insert(entity.index(), value)
    }

    pub fn get(&self, entity: Entity) -> Option<&T> {
        self.data.get(&entity.index())
    }

    pub fn get_mut(&mut self, entity: Entity) -> Option<&mut T> {
        self.data.get_mut(&entity.index())
    }

    pub fn remove(&mut self, entity: Entity) -> Option<T> {
        self.data.remove(&entity.index())
    }
}

impl<T: Component> AnyStorage for MapStorage<T> {
    fn insert_any(&mut self, entity: Entity, value: Box<dyn Any>) -> bool {
        match value.downcast::<T>() {
            Ok(value) => {
                self.insert(entity, *value);
                true
            }
            Err(_) => {
                tracing::error!(
                    component = std::any::type_name::<T>(),
                    "value of wrong type handed to storage"
                );
                false
            }
        }
    }

    fn get_any(&self, entity: Entity) -> Option<&dyn Any> {
        self.get(entity).map(|value| value as &dyn Any)
    }

    fn get_any_mut(&mut self, entity: Entity) -> Option<&mut dyn Any> {
        self.get_mut(entity).map(|value| value as &mut dyn Any)
    }

    fn erase(&mut self, entity: Entity) {
        self.remove(entity);
    }

    fn pack(&self, entity: Entity, _context: Option<&Context>) -> Option<Package> {
        Package::new(self.get(entity)?)
    }

    fn unpack(&mut self, entity: Entity, package: &Package, _context: Option<&Context>) -> bool {
        match package.get::<T>() {
            Some(value) => {
                self.insert(entity, value);
                true
            }
            None => {
                tracing::warn!(
                    component = std::any::type_name::<T>(),
                    "malformed package data"
                );
                false
            }
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vec_storage_round_trips_values() {
        let mut storage = VecStorage::<i32>::new();
        assert_eq!(storage.insert(Entity::new(7), 42), None);
        assert_eq!(storage.get(Entity::new(7)), Some(&42));
        assert_eq!(storage.insert(Entity::new(7), 43), Some(42));
        assert_eq!(storage.remove(Entity::new(7)), Some(43));
        assert_eq!(storage.get(Entity::new(7)), None);
    }

    #[test]
    fn erase_of_missing_entity_is_a_noop() {
        let mut storage = VecStorage::<i32>::new();
        storage.erase(Entity::new(3));
        let mut storage = MapStorage::<i32>::new();
        storage.erase(Entity::new(3));
    }

    #[test]
    fn pack_unpack_round_trip() {
        let mut storage = VecStorage::<i32>::new();
        storage.insert(Entity::new(7), 42);

        let package = storage.pack(Entity::new(7), None).unwrap();

        let mut fresh = VecStorage::<i32>::new();
        assert!(fresh.unpack(Entity::new(7), &package, None));
        assert_eq!(fresh.get(Entity::new(7)), Some(&42));
    }

    #[test]
    fn pack_of_missing_entity_is_none() {
        let storage = VecStorage::<i32>::new();
        assert!(storage.pack(Entity::new(1), None).is_none());
    }

    #[test]
    fn unpack_of_mismatched_package_fails() {
        let package = Package::new(&"not a number").unwrap();
        assert!(matches!(
            package.try_get::<i32>(),
            Err(PackageError::Deserialize(_))
        ));

        let mut storage = VecStorage::<i32>::new();
        assert!(!storage.unpack(Entity::new(0), &package, None));
        assert!(storage.get(Entity::new(0)).is_none());
    }

    #[test]
    fn insert_any_rejects_wrong_type() {
        let mut storage: Box<dyn AnyStorage> = Box::<VecStorage<i32>>::default();
        assert!(!storage.insert_any(Entity::new(0), Box::new("wrong")));
        assert!(storage.insert_any(Entity::new(0), Box::new(5i32)));
        assert!(storage.contains(Entity::new(0)));
    }

    #[test]
    fn map_storage_round_trips_values() {
        let mut storage = MapStorage::<String>::new();
        storage.insert(Entity::new(1000), "sparse".to_string());
        assert_eq!(storage.get(Entity::new(1000)).map(String::as_str), Some("sparse"));
        assert_eq!(storage.remove(Entity::new(1000)).as_deref(), Some("sparse"));
    }

    #[test]
    fn context_is_a_type_map() {
        let mut context = Context::new();
        context.insert(42u32);
        assert_eq!(context.get::<u32>(), Some(&42));
        assert_eq!(context.get::<String>(), None);
    }
}
