//! Configuration for template matching

use std::path::PathBuf;

/// Environment variable overriding [`MatchConfig::confidence_threshold`]
pub const ENV_THRESHOLD: &str = "AUTOCLICK_THRESHOLD";
/// Environment variable enabling debug visualizations (`1`, `true`, `yes`, `on`)
pub const ENV_DEBUG: &str = "AUTOCLICK_DEBUG";
/// Environment variable naming a directory for debug PNGs
pub const ENV_DEBUG_DIR: &str = "AUTOCLICK_DEBUG_DIR";

#[derive(Debug, Clone, PartialEq)]
pub struct MatchConfig {
    /// Minimum confidence (0.0 to 1.0) for a candidate to count as found
    pub confidence_threshold: f32,
    /// Produce an annotated copy of the screenshot for every match attempt
    pub debug_enabled: bool,
    /// Where annotated screenshots are written when debug is on
    pub debug_output_dir: Option<PathBuf>,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.8,
            debug_enabled: false,
            debug_output_dir: None,
        }
    }
}

impl MatchConfig {
    /// Default configuration with any `AUTOCLICK_*` overrides from the environment applied
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Apply `AUTOCLICK_THRESHOLD`, `AUTOCLICK_DEBUG` and `AUTOCLICK_DEBUG_DIR` on top of `self`.
    /// Unparseable values are logged and ignored.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(raw) = std::env::var(ENV_THRESHOLD) {
            match raw.trim().parse::<f32>() {
                Ok(value) if value > 0.0 && value <= 1.0 => self.confidence_threshold = value,
                _ => log::warn!("⚠️ Ignoring {}={:?}: expected a number in (0, 1]", ENV_THRESHOLD, raw),
            }
        }
        if let Ok(raw) = std::env::var(ENV_DEBUG) {
            self.debug_enabled = parse_flag(&raw);
        }
        if let Ok(raw) = std::env::var(ENV_DEBUG_DIR)
            && !raw.trim().is_empty()
        {
            self.debug_output_dir = Some(PathBuf::from(raw.trim()));
        }
        self
    }
}

pub(crate) fn parse_flag(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Create a default configuration for screen automation
pub fn create_default_config() -> MatchConfig {
    MatchConfig::default()
}

/// Configuration preset for crisp UI elements that should match almost exactly
pub fn create_strict_config() -> MatchConfig {
    MatchConfig {
        confidence_threshold: 0.9,
        ..MatchConfig::default()
    }
}

/// Configuration preset for scaled or heavily compressed screens
pub fn create_tolerant_config() -> MatchConfig {
    MatchConfig {
        confidence_threshold: 0.7,
        ..MatchConfig::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_config_defaults() {
        let config = MatchConfig::default();

        assert_eq!(config.confidence_threshold, 0.8);
        assert!(!config.debug_enabled);
        assert!(config.debug_output_dir.is_none());
    }

    #[test]
    fn test_presets_order_thresholds() {
        assert!(create_strict_config().confidence_threshold > create_default_config().confidence_threshold);
        assert!(create_tolerant_config().confidence_threshold < create_default_config().confidence_threshold);
    }

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("1"));
        assert!(parse_flag(" TRUE "));
        assert!(parse_flag("on"));
        assert!(!parse_flag("0"));
        assert!(!parse_flag("nope"));
    }
}
