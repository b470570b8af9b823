// Communication channels between a caller and the automation service
use super::types::{AutomationCommand, AutomationEvent};
use tokio::sync::mpsc;

/// Pending commands beyond this many make `send` wait
pub const COMMAND_CHANNEL_CAPACITY: usize = 32;

/// Helper function to create automation channels.
///
/// Events are unbounded so the runner never blocks on a slow observer.
pub fn create_automation_channels() -> (
    mpsc::Sender<AutomationCommand>,
    mpsc::Receiver<AutomationCommand>,
    mpsc::UnboundedSender<AutomationEvent>,
    mpsc::UnboundedReceiver<AutomationEvent>,
) {
    let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    (cmd_tx, cmd_rx, event_tx, event_rx)
}
