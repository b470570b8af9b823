// Types and enums for sequence automation
use super::graph::SequenceGraph;
use super::item::Sequence;
use crate::device::MouseButton;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What to do at a located template
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    #[default]
    SingleClick,
    DoubleClick,
    LongPress,
    RightSingle,
    RightDouble,
    RightLong,
}

impl ActionKind {
    pub const ALL: [ActionKind; 6] = [
        ActionKind::SingleClick,
        ActionKind::DoubleClick,
        ActionKind::LongPress,
        ActionKind::RightSingle,
        ActionKind::RightDouble,
        ActionKind::RightLong,
    ];

    pub fn button(self) -> MouseButton {
        match self {
            ActionKind::SingleClick | ActionKind::DoubleClick | ActionKind::LongPress => {
                MouseButton::Left
            }
            ActionKind::RightSingle | ActionKind::RightDouble | ActionKind::RightLong => {
                MouseButton::Right
            }
        }
    }

    pub fn is_long_press(self) -> bool {
        matches!(self, ActionKind::LongPress | ActionKind::RightLong)
    }

    /// Clicks performed by a click-style action (0 for long presses)
    pub fn click_count(self) -> u8 {
        match self {
            ActionKind::SingleClick | ActionKind::RightSingle => 1,
            ActionKind::DoubleClick | ActionKind::RightDouble => 2,
            ActionKind::LongPress | ActionKind::RightLong => 0,
        }
    }

    /// Name used in exported workflow files
    pub fn as_wire(self) -> &'static str {
        match self {
            ActionKind::SingleClick => "single",
            ActionKind::DoubleClick => "double",
            ActionKind::LongPress => "long",
            ActionKind::RightSingle => "right_single",
            ActionKind::RightDouble => "right_double",
            ActionKind::RightLong => "right_long",
        }
    }

    /// Parse a workflow-file action name. Also accepts the snake_case variant names.
    pub fn from_wire(name: &str) -> Option<Self> {
        match name.trim() {
            "single" | "single_click" => Some(ActionKind::SingleClick),
            "double" | "double_click" => Some(ActionKind::DoubleClick),
            "long" | "long_press" => Some(ActionKind::LongPress),
            "right_single" => Some(ActionKind::RightSingle),
            "right_double" => Some(ActionKind::RightDouble),
            "right_long" => Some(ActionKind::RightLong),
            _ => None,
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerState {
    Idle,
    Running,
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Reached the end of the sequence with looping off
    Completed,
    /// Cancelled from outside
    Stopped,
}

/// Why a held button was let go
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseReason {
    /// The next processed item is not a long press
    NextAction,
    /// The user moved the cursor away from the press anchor
    CursorMoved,
    /// A new long press replaced the held one
    Replaced,
    SequenceEnd,
    Stopped,
    /// A capability error aborted the run
    Fatal,
}

/// Per-run options chosen when starting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunOptions {
    /// Start over from the first item after the last one
    pub loop_enabled: bool,
    /// First item to process. Loops always restart at 0.
    pub start_index: usize,
}

impl RunOptions {
    pub fn looping() -> Self {
        Self {
            loop_enabled: true,
            start_index: 0,
        }
    }
}

/// Counters reported when a run ends
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub outcome: RunOutcome,
    pub steps_processed: u64,
    pub matches: u64,
    pub misses: u64,
    pub skipped: u64,
    pub restarts: u64,
    pub loops_completed: u64,
}

#[derive(Debug, Clone)]
pub enum AutomationCommand {
    Start {
        sequence: Sequence,
        options: RunOptions,
    },
    StartGraph {
        graph: SequenceGraph,
        options: RunOptions,
    },
    Stop,
    Shutdown,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AutomationEvent {
    StateChanged(RunnerState),
    StepStarted {
        index: usize,
        alias: Option<String>,
    },
    StepSkipped {
        index: usize,
    },
    Matched {
        index: usize,
        x: i32,
        y: i32,
        confidence: f32,
    },
    MatchMissed {
        index: usize,
        status: u8,
        confidence: f32,
    },
    /// Interrupt-on-fail sent the cursor back to the first item
    Restarted {
        from: usize,
    },
    LongPressStarted {
        x: i32,
        y: i32,
        button: MouseButton,
    },
    LongPressReleased {
        button: MouseButton,
        reason: ReleaseReason,
    },
    LoopCompleted(u64),
    RunFinished(RunSummary),
    StartRejected,
    Error(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_names_roundtrip() {
        for action in ActionKind::ALL {
            assert_eq!(ActionKind::from_wire(action.as_wire()), Some(action));
        }
        assert_eq!(ActionKind::from_wire("long_press"), Some(ActionKind::LongPress));
        assert_eq!(ActionKind::from_wire("triple"), None);
    }

    #[test]
    fn test_buttons_and_clicks() {
        assert_eq!(ActionKind::RightDouble.button(), MouseButton::Right);
        assert_eq!(ActionKind::LongPress.button(), MouseButton::Left);
        assert_eq!(ActionKind::DoubleClick.click_count(), 2);
        assert!(ActionKind::RightLong.is_long_press());
        assert!(!ActionKind::RightSingle.is_long_press());
    }
}
