//! Entity Component System core types.
//!
//! Component types are described by runtime [`Type`](crate::reflect::Type)
//! descriptors and registered once in the process-wide [`Registry`]. A
//! [`World`] owns entities and one type-erased storage per registered
//! component, each behind its own reader/writer lock. Systems are plain
//! callables ordered by a tag-constrained [`Dispatcher`], and communicate
//! out-of-band through append-only [`EventPipe`]s.

mod blueprint;
mod commands;
mod component;
mod dispatcher;
mod entity;
mod event;
mod registry;
pub mod storage;
mod world;

pub use blueprint::Blueprint;
pub use commands::{CommandBuffer, SpawnedEntities};
pub use component::ComponentManager;
pub use dispatcher::Dispatcher;
pub use entity::Entity;
pub use event::{EventPipe, EventReader, EventWriter};
pub use registry::Registry;
pub use storage::{AnyStorage, Component, Context, MapStorage, Package, PackageError, VecStorage};
pub use world::{ReadResource, ReadStorage, World, WriteResource, WriteStorage};
