//! Ember Engine Runtime
//!
//! The application shell around the core ECS: owns the world, the
//! startup and main system schedules, and the frame loop.

mod app;
mod settings;

pub use app::{App, Arguments, DeltaTime, ShouldQuit, SystemBuilder, TagBuilder};
pub use settings::AppSettings;

/// Initialize the global logger. Safe to call more than once.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt::try_init();
}
