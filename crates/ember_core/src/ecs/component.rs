//! Per-world component bookkeeping.
//!
//! The [`ComponentManager`] owns one storage per registered component
//! type and assigns each type a dense integer id, starting at 1. Every
//! storage sits behind its own reader/writer lock so independent
//! component types never contend; the manager exposes the guards but does
//! not police which callers must lock — that discipline belongs to the
//! world.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::reflect::Type;

use super::storage::{AnyStorage, Context, Package};
use super::{Entity, Registry};

struct Entry {
    ty: Type,
    // One lock per component type, never shared across entries.
    storage: RwLock<Box<dyn AnyStorage>>,
}

/// Owns the storages of every component type registered with one world.
#[derive(Default)]
pub struct ComponentManager {
    type_to_id: HashMap<TypeId, usize>,
    entries: Vec<Entry>,
}

impl ComponentManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a component type, assigning it the next dense id.
    ///
    /// Registering an already-known type is a no-op.
    ///
    /// # Panics
    ///
    /// Panics if `ty` was never registered with the global [`Registry`].
    pub fn register(&mut self, ty: Type) {
        if self.type_to_id.contains_key(&ty.id()) {
            return;
        }
        let storage = Registry::create_storage(ty).unwrap_or_else(|| {
            panic!(
                "component type '{}' is not registered in the global registry",
                ty.name()
            )
        });
        // Component ids start at 1.
        self.type_to_id.insert(ty.id(), self.entries.len() + 1);
        self.entries.push(Entry {
            ty,
            storage: RwLock::new(storage),
        });
    }

    /// Dense id of a registered type.
    ///
    /// # Panics
    ///
    /// Panics if `ty` was never registered with this manager.
    pub fn id_of(&self, ty: Type) -> usize {
        match self.type_to_id.get(&ty.id()) {
            Some(&id) => id,
            None => panic!(
                "component type '{}' is not registered in the component manager",
                ty.name()
            ),
        }
    }

    /// Dense id of `ty`, or `None` when unregistered.
    pub fn try_id_of(&self, ty: Type) -> Option<usize> {
        self.type_to_id.get(&ty.id()).copied()
    }

    /// Type registered under a dense id. Diagnostics/serialization path.
    ///
    /// # Panics
    ///
    /// Panics if no component has this id.
    pub fn type_of(&self, id: usize) -> Type {
        match id.checked_sub(1).and_then(|index| self.entries.get(index)) {
            Some(entry) => entry.ty,
            None => panic!("no component found with id {id}"),
        }
    }

    /// Number of registered component types.
    pub fn count(&self) -> usize {
        self.entries.len()
    }

    /// Erase the component with id `component_id` from `entity`.
    /// No-op when the entity never had it.
    pub fn remove(&self, entity: Entity, component_id: usize) {
        self.write(component_id).erase(entity);
    }

    /// Erase every component of `entity`.
    pub fn remove_all(&self, entity: Entity) {
        for entry in &self.entries {
            entry.storage.write().unwrap().erase(entity);
        }
    }

    /// Package the component with id `component_id` of `entity`.
    pub fn pack(
        &self,
        entity: Entity,
        component_id: usize,
        context: Option<&Context>,
    ) -> Option<Package> {
        self.read(component_id).pack(entity, context)
    }

    /// Instantiate a component from a package. Returns the storage's own
    /// success signal; malformed data is recoverable.
    pub fn unpack(
        &self,
        entity: Entity,
        component_id: usize,
        package: &Package,
        context: Option<&Context>,
    ) -> bool {
        self.write(component_id).unpack(entity, package, context)
    }

    /// Shared lock over one component type's storage.
    pub fn read(&self, component_id: usize) -> RwLockReadGuard<'_, Box<dyn AnyStorage>> {
        self.entry(component_id).storage.read().unwrap()
    }

    /// Exclusive lock over one component type's storage.
    pub fn write(&self, component_id: usize) -> RwLockWriteGuard<'_, Box<dyn AnyStorage>> {
        self.entry(component_id).storage.write().unwrap()
    }

    fn entry(&self, component_id: usize) -> &Entry {
        match component_id
            .checked_sub(1)
            .and_then(|index| self.entries.get(index))
        {
            Some(entry) => entry,
            None => panic!("no component found with id {component_id}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::storage::{MapStorage, VecStorage};
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Mass(f32);

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Charge(f32);

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct NeverRegistered;

    fn manager() -> ComponentManager {
        Registry::add::<Mass, VecStorage<Mass>>("mass");
        Registry::add::<Charge, MapStorage<Charge>>("charge");
        let mut manager = ComponentManager::new();
        manager.register(Type::of::<Mass>());
        manager.register(Type::of::<Charge>());
        manager
    }

    #[test]
    fn ids_are_dense_and_stable() {
        let manager = manager();
        let mass_id = manager.id_of(Type::of::<Mass>());
        let charge_id = manager.id_of(Type::of::<Charge>());
        assert_eq!(mass_id, 1);
        assert_eq!(charge_id, 2);
        // Repeated lookups agree and type_of inverts id_of.
        assert_eq!(manager.id_of(Type::of::<Mass>()), mass_id);
        assert_eq!(manager.type_of(mass_id), Type::of::<Mass>());
        assert_eq!(manager.type_of(charge_id), Type::of::<Charge>());
    }

    #[test]
    fn re_registration_is_a_noop() {
        let mut manager = manager();
        manager.register(Type::of::<Mass>());
        assert_eq!(manager.count(), 2);
        assert_eq!(manager.id_of(Type::of::<Mass>()), 1);
    }

    #[test]
    #[should_panic(expected = "not registered in the component manager")]
    fn unknown_type_id_lookup_panics() {
        manager().id_of(Type::of::<NeverRegistered>());
    }

    #[test]
    #[should_panic(expected = "no component found with id")]
    fn unknown_id_lookup_panics() {
        manager().type_of(99);
    }

    #[test]
    fn remove_and_remove_all_tolerate_missing_components() {
        let manager = manager();
        let entity = Entity::new(4);

        manager.write(1).insert_any(entity, Box::new(Mass(2.0)));
        assert!(manager.read(1).contains(entity));

        // Entity never had a Charge; erasing it is a no-op.
        manager.remove(entity, 2);
        manager.remove_all(entity);
        assert!(!manager.read(1).contains(entity));
    }

    #[test]
    fn pack_and_unpack_forward_to_the_storage() {
        let source = manager();
        let entity = Entity::new(7);

        source.write(1).insert_any(entity, Box::new(Mass(9.5)));
        let package = source.pack(entity, 1, None).unwrap();

        let other = manager();
        assert!(other.unpack(entity, 1, &package, None));
        assert_eq!(
            other.read(1).get_any(entity).unwrap().downcast_ref::<Mass>(),
            Some(&Mass(9.5))
        );

        // Mismatched package data fails without panicking.
        let bad = Package::new(&"garbage").unwrap();
        assert!(!other.unpack(entity, 1, &bad, None));
    }
}
