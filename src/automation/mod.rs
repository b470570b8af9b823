// Sequence automation module
// Runs ordered lists of template-matching items against an injected screen
// and mouse, either linearly or by following a node graph.

pub mod channels;
pub mod config;
pub mod error;
pub mod fsm;
pub mod graph;
pub mod item;
pub mod record;
pub mod service;
pub mod types;


// Re-export the main types and functions for easy access
pub use channels::create_automation_channels;
pub use config::RunnerConfig;
pub use error::{AutomationError, AutomationResult, ConfigError, GraphError, RecordError};
pub use fsm::SequenceRunner;
pub use graph::{Edge, EdgeTag, GraphNode, NodeId, NodeKind, SequenceGraph, StepResult};
pub use item::{Item, Sequence};
pub use record::{ItemRecord, items_to_json, load_items, parse_items, save_items};
pub use service::AutomationService;
pub use types::{
    ActionKind, AutomationCommand, AutomationEvent, ReleaseReason, RunOptions, RunOutcome,
    RunSummary, RunnerState,
};
