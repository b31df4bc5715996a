//! Application shell and frame loop.

use std::collections::HashSet;
use std::time::Instant;

use ember_core::ecs::{CommandBuffer, Component, Dispatcher, World};

use crate::settings::AppSettings;

/// Seconds elapsed since the previous frame.
pub struct DeltaTime {
    pub value: f32,
}

/// Checked once per outer loop iteration; a running chain always
/// completes before the process may exit. Starts `true`, so an
/// application with no system driving it runs a single frame.
pub struct ShouldQuit {
    pub value: bool,
}

/// Process arguments, captured at startup.
pub struct Arguments {
    pub value: Vec<String>,
}

type Plugin = fn(&mut App);

/// Owns the world and both system schedules.
///
/// Setup is builder-flavoured: plugins and application code register
/// components, resources, tags and systems, then [`App::run`] compiles
/// both execution chains and enters the frame loop.
pub struct App {
    world: World,
    startup: Dispatcher,
    main: Dispatcher,
    plugins: HashSet<Plugin>,
    // Tags referenced through each schedule's tag builders, kept to warn
    // about likely startup/main mix-ups.
    startup_tags: Vec<String>,
    main_tags: Vec<String>,
    settings: AppSettings,
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

impl App {
    /// Application capturing the process arguments.
    pub fn new() -> Self {
        Self::with_args(std::env::args().skip(1).collect())
    }

    pub fn with_args(args: Vec<String>) -> Self {
        let mut world = World::new();
        world.insert_resource(DeltaTime { value: 0.0 });
        world.insert_resource(ShouldQuit { value: true });
        world.insert_resource(Arguments { value: args });
        Self {
            world,
            startup: Dispatcher::new(),
            main: Dispatcher::new(),
            plugins: HashSet::new(),
            startup_tags: Vec::new(),
            main_tags: Vec::new(),
            settings: AppSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: AppSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Apply a plugin once; re-adding it is a traced no-op.
    pub fn add_plugin(&mut self, plugin: Plugin) -> &mut Self {
        if self.plugins.insert(plugin) {
            plugin(self);
        } else {
            tracing::trace!("plugin was already registered");
        }
        self
    }

    /// Register a component type with the world.
    pub fn register_component<T: Component>(&mut self) -> &mut Self {
        self.world.register::<T>();
        self
    }

    /// Insert a world-global resource.
    pub fn add_resource<R: Send + Sync + 'static>(&mut self, resource: R) -> &mut Self {
        self.world.insert_resource(resource);
        self
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    /// Declare a tag on the main schedule.
    pub fn tag(&mut self, tag: &str) -> TagBuilder<'_> {
        self.main.add_tag(tag);
        TagBuilder {
            dispatcher: &mut self.main,
            tags: &mut self.main_tags,
        }
    }

    /// Declare a tag on the startup schedule.
    pub fn startup_tag(&mut self, tag: &str) -> TagBuilder<'_> {
        self.startup.add_tag(tag);
        TagBuilder {
            dispatcher: &mut self.startup,
            tags: &mut self.startup_tags,
        }
    }

    /// Register a system on the main schedule.
    pub fn system<F>(&mut self, name: &str, system: F) -> SystemBuilder<'_>
    where
        F: FnMut(&mut World, &mut CommandBuffer) + Send + 'static,
    {
        self.main.add_system(name, system);
        SystemBuilder {
            dispatcher: &mut self.main,
            opposite_tags: &self.startup_tags,
        }
    }

    /// Register a system on the startup schedule, executed exactly once.
    pub fn startup_system<F>(&mut self, name: &str, system: F) -> SystemBuilder<'_>
    where
        F: FnMut(&mut World, &mut CommandBuffer) + Send + 'static,
    {
        self.startup.add_system(name, system);
        SystemBuilder {
            dispatcher: &mut self.startup,
            opposite_tags: &self.main_tags,
        }
    }

    /// Compile both execution chains and run: the startup chain once,
    /// then the main chain until [`ShouldQuit`] is set.
    pub fn run(&mut self) {
        self.plugins.clear();
        self.main_tags.clear();
        self.startup_tags.clear();

        self.startup.compile_chain();
        self.main.compile_chain();

        let mut commands = CommandBuffer::new();
        self.startup.call_systems(&mut self.world, &mut commands);

        let target = self.settings.tick_duration();
        let mut previous = Instant::now();
        loop {
            self.main.call_systems(&mut self.world, &mut commands);

            let now = Instant::now();
            self.world.write_resource::<DeltaTime>().value = (now - previous).as_secs_f32();
            previous = now;

            if self.world.read_resource::<ShouldQuit>().value {
                break;
            }
            if let Some(target) = target {
                let elapsed = previous.elapsed();
                if elapsed < target {
                    std::thread::sleep(target - elapsed);
                }
            }
        }
    }
}

/// Orders a just-declared tag relative to other tags.
pub struct TagBuilder<'a> {
    dispatcher: &'a mut Dispatcher,
    tags: &'a mut Vec<String>,
}

impl TagBuilder<'_> {
    pub fn before(self, tag: &str) -> Self {
        self.tags.push(tag.to_string());
        self.dispatcher.tag_set_before_tag(tag);
        self
    }

    pub fn after(self, tag: &str) -> Self {
        self.tags.push(tag.to_string());
        self.dispatcher.tag_set_after_tag(tag);
        self
    }
}

/// Attaches tag constraints to a just-registered system.
pub struct SystemBuilder<'a> {
    dispatcher: &'a mut Dispatcher,
    opposite_tags: &'a [String],
}

impl SystemBuilder<'_> {
    fn warn_on_mismatch(&self, tag: &str) {
        if self.opposite_tags.iter().any(|t| t == tag) {
            tracing::warn!(
                tag,
                "tag was declared on the opposite schedule, possible tag/startup_tag mismatch?"
            );
        }
    }

    pub fn tagged(self, tag: &str) -> Self {
        self.warn_on_mismatch(tag);
        self.dispatcher.system_add_tag(tag);
        self
    }

    pub fn before(self, tag: &str) -> Self {
        self.warn_on_mismatch(tag);
        self.dispatcher.system_set_before_tag(tag);
        self
    }

    pub fn after(self, tag: &str) -> Self {
        self.warn_on_mismatch(tag);
        self.dispatcher.system_set_after_tag(tag);
        self
    }
}
