//! Runner configuration

use crate::template_matching::MatchConfig;
use std::time::Duration;

/// Environment variable overriding [`RunnerConfig::loop_interval`] in milliseconds
pub const ENV_LOOP_INTERVAL_MS: &str = "AUTOCLICK_LOOP_INTERVAL_MS";
/// Environment variable overriding [`RunnerConfig::screen_scale`]
pub const ENV_SCREEN_SCALE: &str = "AUTOCLICK_SCREEN_SCALE";

#[derive(Debug, Clone, PartialEq)]
pub struct RunnerConfig {
    /// Pause between the end of a sequence and the next loop
    pub loop_interval: Duration,
    /// How often the cursor is checked while a long press is held
    pub long_press_poll_interval: Duration,
    /// Screenshot pixels per input coordinate unit (2.0 on most HiDPI screens)
    pub screen_scale: f32,
    pub match_config: MatchConfig,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            loop_interval: Duration::from_millis(500),
            long_press_poll_interval: Duration::from_millis(50),
            screen_scale: 1.0,
            match_config: MatchConfig::default(),
        }
    }
}

impl RunnerConfig {
    /// Defaults with every `AUTOCLICK_*` environment override applied
    pub fn from_env() -> Self {
        let mut config = Self {
            match_config: MatchConfig::from_env(),
            ..Self::default()
        };

        if let Ok(raw) = std::env::var(ENV_LOOP_INTERVAL_MS) {
            match raw.trim().parse::<u64>() {
                Ok(ms) => config.loop_interval = Duration::from_millis(ms),
                Err(_) => log::warn!("⚠️ Ignoring {}={:?}: expected milliseconds", ENV_LOOP_INTERVAL_MS, raw),
            }
        }
        if let Ok(raw) = std::env::var(ENV_SCREEN_SCALE) {
            match raw.trim().parse::<f32>() {
                Ok(scale) if scale.is_finite() && scale > 0.0 => config.screen_scale = scale,
                _ => log::warn!("⚠️ Ignoring {}={:?}: expected a positive number", ENV_SCREEN_SCALE, raw),
            }
        }

        config
    }

    /// Scale factor actually applied; invalid values fall back to 1.0
    pub(crate) fn effective_scale(&self) -> f64 {
        if self.screen_scale.is_finite() && self.screen_scale > 0.0 {
            self.screen_scale as f64
        } else {
            1.0
        }
    }
}
