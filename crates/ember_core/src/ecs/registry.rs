//! Process-wide component type registry.
//!
//! Modules bind their component types here once at startup, associating a
//! stable human-readable name with a [`Type`] descriptor, a storage
//! factory and a package deserializer. Registration is idempotent; binding
//! the same name to two different types is a configuration error and
//! aborts.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::RwLock;

use once_cell::sync::Lazy;

use crate::reflect::Type;

use super::storage::{AnyStorage, Component, Package};
use super::{Blueprint, Entity};

type StorageFactory = Box<dyn Fn() -> Box<dyn AnyStorage> + Send + Sync>;
type BlueprintInsert = Box<dyn Fn(&Package, &mut Blueprint, Entity) -> bool + Send + Sync>;

struct RegistryEntry {
    ty: Type,
    name: String,
    make_storage: StorageFactory,
    insert_into_blueprint: BlueprintInsert,
}

#[derive(Default)]
struct RegistryInner {
    by_name: HashMap<String, usize>,
    by_type: HashMap<TypeId, usize>,
    entries: Vec<RegistryEntry>,
}

static REGISTRY: Lazy<RwLock<RegistryInner>> = Lazy::new(|| RwLock::new(RegistryInner::default()));

/// Global registry of component types, living for the whole process.
pub struct Registry;

impl Registry {
    /// Bind component type `T` to `name`, with `S` as its storage.
    ///
    /// Registering the exact same pair again is a no-op.
    ///
    /// # Panics
    ///
    /// Panics if `name` is already bound to a different type, or `T` is
    /// already bound under a different name.
    pub fn add<T, S>(name: &str)
    where
        T: Component,
        S: AnyStorage + Default + 'static,
    {
        let ty = Type::of::<T>();
        let mut inner = REGISTRY.write().unwrap();

        if let Some(&index) = inner.by_name.get(name) {
            let bound = inner.entries[index].ty;
            assert!(
                bound == ty,
                "component name '{name}' is already bound to type '{}'",
                bound.name()
            );
            return;
        }
        if let Some(&index) = inner.by_type.get(&ty.id()) {
            panic!(
                "component type '{}' is already registered under name '{}'",
                ty.name(),
                inner.entries[index].name
            );
        }

        let index = inner.entries.len();
        inner.by_name.insert(name.to_string(), index);
        inner.by_type.insert(ty.id(), index);
        inner.entries.push(RegistryEntry {
            ty,
            name: name.to_string(),
            make_storage: Box::new(|| Box::new(S::default())),
            insert_into_blueprint: Box::new(|package, blueprint, entity| {
                // Validate the payload before it reaches the blueprint;
                // content data must never abort the process.
                match package.get::<T>() {
                    Some(value) => blueprint.add(entity, value),
                    None => {
                        tracing::warn!(
                            component = std::any::type_name::<T>(),
                            "malformed package data for blueprint"
                        );
                        false
                    }
                }
            }),
        });
    }

    /// Descriptor registered under `name`, if any.
    pub fn type_of(name: &str) -> Option<Type> {
        let inner = REGISTRY.read().unwrap();
        inner.by_name.get(name).map(|&index| inner.entries[index].ty)
    }

    /// Registered name of `ty`, if any.
    pub fn name_of(ty: Type) -> Option<String> {
        let inner = REGISTRY.read().unwrap();
        inner
            .by_type
            .get(&ty.id())
            .map(|&index| inner.entries[index].name.clone())
    }

    /// Instantiate a fresh storage for `ty`, or `None` when the type was
    /// never registered.
    pub fn create_storage(ty: Type) -> Option<Box<dyn AnyStorage>> {
        let inner = REGISTRY.read().unwrap();
        inner
            .by_type
            .get(&ty.id())
            .map(|&index| (inner.entries[index].make_storage)())
    }

    /// Deserialize a component named `name` from `package` and attach it
    /// to `entity` inside `blueprint`.
    ///
    /// Returns `false` on an unknown name or malformed package data.
    pub fn create(name: &str, package: &Package, blueprint: &mut Blueprint, entity: Entity) -> bool {
        let inner = REGISTRY.read().unwrap();
        match inner.by_name.get(name) {
            Some(&index) => (inner.entries[index].insert_into_blueprint)(package, blueprint, entity),
            None => {
                tracing::warn!(component = name, "unknown component name");
                false
            }
        }
    }
}
