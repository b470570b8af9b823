pub mod automation;
pub mod device;
pub mod template_matching;

pub use automation::{AutomationService, Item, Sequence, SequenceGraph, SequenceRunner};
pub use device::{MouseInput, ScreenCapture};
pub use template_matching::{MatchResult, Template, TemplateMatcher};
