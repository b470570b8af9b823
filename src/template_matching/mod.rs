/// Template matching module for locating reference images in screenshots
///
/// This module provides:
/// - Full-frame normalized cross-correlation search
/// - Zero-mean confidence scoring against a configurable threshold
/// - Optional debug visualizations of every attempt
pub mod config;
pub mod matcher;
pub mod types;

pub use config::{MatchConfig, create_default_config, create_strict_config, create_tolerant_config};
pub use matcher::TemplateMatcher;
pub use types::{MatchResult, MatchStatus, Template};
