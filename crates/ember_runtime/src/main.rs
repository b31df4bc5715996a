//! Ember Engine Runtime
//!
//! Minimal binary that boots an application with a pair of demo systems.
//! With nothing clearing `ShouldQuit`, the main schedule runs one frame.

use anyhow::Result;
use ember_core::ecs::{Entity, Registry, VecStorage};
use ember_runtime::{init_logging, App, DeltaTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Position {
    x: f32,
    y: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Velocity {
    x: f32,
    y: f32,
}

/// Entities spawned at startup, for the demo systems to walk.
struct Roster(Vec<Entity>);

fn main() -> Result<()> {
    init_logging();
    tracing::info!("Ember Engine v{}", ember_core::VERSION);

    Registry::add::<Position, VecStorage<Position>>("position");
    Registry::add::<Velocity, VecStorage<Velocity>>("velocity");

    let mut app = App::new();
    app.register_component::<Position>();
    app.register_component::<Velocity>();

    app.startup_system("spawn", |world, commands| {
        let mut roster = Vec::new();
        for i in 0..3 {
            let entity = commands.create(world);
            commands.insert(entity, Position { x: i as f32, y: 0.0 });
            commands.insert(entity, Velocity { x: 1.0, y: 0.5 });
            roster.push(entity);
        }
        world.insert_resource(Roster(roster));
    });

    app.tag("report").after("integrate");
    app.tag("integrate");

    app.system("integrate", |world, _commands| {
        let dt = world.read_resource::<DeltaTime>().value;
        let roster: Vec<Entity> = world.read_resource::<Roster>().0.clone();
        let mut positions = world.write_storage::<Position>();
        let velocities = world.read_storage::<Velocity>();
        for entity in roster {
            if let (Some(position), Some(velocity)) =
                (positions.get_mut(entity), velocities.get(entity))
            {
                position.x += velocity.x * dt;
                position.y += velocity.y * dt;
            }
        }
    })
    .tagged("integrate");

    app.system("report", |world, _commands| {
        let roster: Vec<Entity> = world.read_resource::<Roster>().0.clone();
        let positions = world.read_storage::<Position>();
        for entity in roster {
            if let Some(position) = positions.get(entity) {
                tracing::info!(?entity, x = position.x, y = position.y, "position");
            }
        }
    })
    .tagged("report");

    app.run();
    Ok(())
}
