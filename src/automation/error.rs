use super::graph::{EdgeTag, NodeId};
use crate::device::DeviceError;
use std::path::PathBuf;
use thiserror::Error;

/// A specialized `Result` type for automation runs.
pub type AutomationResult<T> = Result<T, AutomationError>;

/// Malformed items, rejected before a run can start.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Delay must not be negative, got {delay}ms")]
    NegativeDelay { delay: i64 },

    #[error("Click offset ({x}, {y}) must lie within [0, 1] on both axes")]
    OffsetOutOfRange { x: f32, y: f32 },

    #[error("Failed to decode template image: {source}")]
    TemplateDecode { source: image::ImageError },

    #[error("Failed to encode template image as PNG: {source}")]
    TemplateEncode { source: image::ImageError },

    #[error("Unknown action '{action}'")]
    UnknownAction { action: String },

    #[error("Start index {index} is past the end of a {len}-item sequence")]
    StartIndexOutOfRange { index: usize, len: usize },
}

/// Invalid graph edits.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GraphError {
    #[error("Node {id:?} does not exist")]
    UnknownNode { id: NodeId },

    #[error("Node {id:?} cannot connect to itself")]
    SelfLoop { id: NodeId },

    #[error("Normal node {id:?} only takes untagged edges")]
    TaggedEdgeFromNormal { id: NodeId },

    #[error("Condition node {id:?} needs a success or failure tag on every edge")]
    UntaggedEdgeFromCondition { id: NodeId },

    #[error("Node {id:?} already has an outbound edge tagged {tag:?}")]
    DuplicateEdge { id: NodeId, tag: Option<EdgeTag> },
}

/// Failures reading or writing the workflow exchange format.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("Invalid workflow JSON: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },

    #[error("Record {index}: image is not valid base64: {source}")]
    Base64 {
        index: usize,
        source: base64::DecodeError,
    },

    #[error("Record {index}: {source}")]
    InvalidItem { index: usize, source: ConfigError },

    #[error("Failed to access workflow file {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// The error type returned by the runner and service.
#[derive(Debug, Error)]
pub enum AutomationError {
    #[error("Device failure: {0}")]
    Device(#[from] DeviceError),

    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid graph: {0}")]
    Graph(#[from] GraphError),
}

impl AutomationError {
    /// Whether the run died because of the injected capture/input capabilities
    pub fn is_device_failure(&self) -> bool {
        matches!(self, AutomationError::Device(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_automation_errors_always_carry_a_cause() {
        let errors = [
            AutomationError::from(DeviceError::capture("display gone")),
            AutomationError::from(ConfigError::NegativeDelay { delay: -1 }),
            AutomationError::from(ConfigError::StartIndexOutOfRange { index: 4, len: 2 }),
        ];
        for error in &errors {
            match error {
                AutomationError::Device(_) | AutomationError::Config(_) | AutomationError::Graph(_) => {
                    assert!(error.source().is_some(), "{error} has no cause")
                }
            }
        }
        assert!(errors[0].is_device_failure());
        assert!(!errors[1].is_device_failure());
    }
}
