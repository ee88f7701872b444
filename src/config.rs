use embassy_time::Duration;
use serde::{Deserialize, Serialize};

/// Engine configuration, read once at construction. There is no hot reload;
/// hosts that change any of these values recreate the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    /// How long a favorable condition must persist before a switch is
    /// requested, in milliseconds. Negative disables automatic switching
    /// entirely.
    pub stability_dwell_ms: i64,
    /// Minimum score advantage required to prefer a non-default slot on
    /// score alone. Negative disables RAT/signal based switching; equality
    /// of service state still drives service-based switching.
    pub score_tolerance: i32,
    /// Whether a switch decision must be validated by the switcher before
    /// it is actuated.
    pub require_ping: bool,
    /// Consecutive validation failures tolerated before the current switch
    /// opportunity is abandoned.
    pub max_validation_retries: u8,
    /// Enables the usable-state aware evaluation path. When off, only Home
    /// service is considered good enough to switch to.
    pub allow_roaming_switch: bool,
    /// Feature flag for RAT/signal score based switching.
    pub score_based_switch: bool,
}

impl Config {
    /// The stability dwell window, or `None` when auto switch is disabled.
    pub fn stability_dwell(&self) -> Option<Duration> {
        if self.stability_dwell_ms < 0 {
            return None;
        }
        Some(Duration::from_millis(self.stability_dwell_ms as u64))
    }

    /// Whether RAT/signal score differences may drive a switch.
    pub fn score_switch_enabled(&self) -> bool {
        self.score_based_switch && self.score_tolerance >= 0
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            stability_dwell_ms: 10_000,
            score_tolerance: 100,
            require_ping: true,
            max_validation_retries: 7,
            allow_roaming_switch: false,
            score_based_switch: false,
        }
    }
}
