//! End-to-end exercise of the registry, blueprint and world layers.

use std::collections::HashMap;

use ember_core::ecs::{Blueprint, CommandBuffer, Package, Registry, VecStorage, World};
use ember_core::reflect::Type;

#[test]
fn register_spawn_and_pack_round_trip() {
    let mut blueprint = Blueprint::new();
    let entity = blueprint.create("entity");

    // Initially "foo" of type i32 isn't registered.
    assert_eq!(Registry::type_of("foo"), None);
    assert!(Registry::name_of(Type::of::<i32>()).is_none());

    // After registering, it can be found both ways.
    Registry::add::<i32, VecStorage<i32>>("foo");
    assert_eq!(Registry::type_of("foo"), Some(Type::of::<i32>()));
    assert_eq!(Registry::name_of(Type::of::<i32>()).as_deref(), Some("foo"));

    // A created storage is of the registered concrete variant.
    let storage = Registry::create_storage(Type::of::<i32>()).unwrap();
    assert!(storage.as_any().is::<VecStorage<i32>>());

    // Instantiate the component into the blueprint from a package.
    let package = Package::new(&42).unwrap();
    assert!(Registry::create("foo", &package, &mut blueprint, entity));

    // Spawn the blueprint into a world.
    let mut world = World::new();
    world.register::<i32>();
    let mut commands = CommandBuffer::new();
    let spawned = commands.spawn(&world, &blueprint);
    let entity = spawned.entity("entity");
    commands.commit(&mut world);

    // Package the entity and check the component came through.
    let package = world.pack_entity(entity, None);
    let fields: HashMap<String, i32> = package.get().unwrap();
    assert_eq!(fields.len(), 1);
    assert_eq!(fields["foo"], 42);
}
