//! Runtime settings.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Frame-loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    /// Target tick rate; `None` leaves the loop uncapped.
    pub tick_rate_hz: Option<u32>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self { tick_rate_hz: None }
    }
}

impl AppSettings {
    pub(crate) fn tick_duration(&self) -> Option<Duration> {
        self.tick_rate_hz
            .filter(|&hz| hz > 0)
            .map(|hz| Duration::from_secs_f64(1.0 / f64::from(hz)))
    }
}
