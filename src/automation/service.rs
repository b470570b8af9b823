// Command-driven front end owning a single runner
use super::fsm::SequenceRunner;
use super::graph::SequenceGraph;
use super::item::Sequence;
use super::types::{AutomationCommand, AutomationEvent, RunOptions};
use crate::device::{MouseInput, ScreenCapture};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

enum Job {
    Sequence(Sequence),
    Graph(SequenceGraph),
}

/// Receives [`AutomationCommand`]s and drives the runner, one run at a time.
///
/// A `Start` arriving while a run is active is answered with
/// [`AutomationEvent::StartRejected`]; `Stop` cancels the active run.
pub struct AutomationService<C, I> {
    runner: SequenceRunner<C, I>,
    command_rx: mpsc::Receiver<AutomationCommand>,
    event_tx: mpsc::UnboundedSender<AutomationEvent>,
}

impl<C: ScreenCapture, I: MouseInput> AutomationService<C, I> {
    pub fn new(
        mut runner: SequenceRunner<C, I>,
        command_rx: mpsc::Receiver<AutomationCommand>,
        event_tx: mpsc::UnboundedSender<AutomationEvent>,
    ) -> Self {
        runner.set_event_sender(event_tx.clone());
        Self {
            runner,
            command_rx,
            event_tx,
        }
    }

    pub fn runner(&self) -> &SequenceRunner<C, I> {
        &self.runner
    }

    /// Process commands until `Shutdown` or until every sender is dropped.
    /// Hands the runner back once done.
    pub async fn run(mut self) -> SequenceRunner<C, I> {
        log::debug!("🤖 Automation service started");

        while let Some(command) = self.command_rx.recv().await {
            log::debug!("🤖 Processing automation command: {}", command_name(&command));
            let keep_going = match command {
                AutomationCommand::Start { sequence, options } => {
                    self.execute(Job::Sequence(sequence), options).await
                }
                AutomationCommand::StartGraph { graph, options } => {
                    self.execute(Job::Graph(graph), options).await
                }
                AutomationCommand::Stop => {
                    log::debug!("🤖 Stop received with no active run");
                    true
                }
                AutomationCommand::Shutdown => false,
            };
            if !keep_going {
                break;
            }
        }

        log::info!("🛑 Automation service shutting down");
        self.runner
    }

    /// Drive one run while still listening for commands.
    /// Returns whether the service should keep serving.
    async fn execute(&mut self, job: Job, options: RunOptions) -> bool {
        let cancel = CancellationToken::new();
        let Self {
            runner,
            command_rx,
            event_tx,
        } = self;

        let run = async {
            match job {
                Job::Sequence(sequence) => runner.run(sequence, options, cancel.clone()).await,
                Job::Graph(graph) => runner.run_graph(graph, options, cancel.clone()).await,
            }
        };
        tokio::pin!(run);

        let mut keep_going = true;
        loop {
            tokio::select! {
                result = &mut run => {
                    match result {
                        Ok(summary) => log::debug!("🤖 Run ended: {:?}", summary),
                        Err(error) => log::warn!("⚠️ Run ended with error: {}", error),
                    }
                    return keep_going;
                }
                command = command_rx.recv(), if !cancel.is_cancelled() => match command {
                    Some(AutomationCommand::Stop) => {
                        log::info!("⏹️ Stop requested");
                        cancel.cancel();
                    }
                    Some(AutomationCommand::Shutdown) | None => {
                        keep_going = false;
                        cancel.cancel();
                    }
                    Some(other) => {
                        log::warn!("⚠️ Ignoring {} while a run is active", command_name(&other));
                        let _ = event_tx.send(AutomationEvent::StartRejected);
                    }
                }
            }
        }
    }
}

fn command_name(command: &AutomationCommand) -> &'static str {
    match command {
        AutomationCommand::Start { .. } => "Start",
        AutomationCommand::StartGraph { .. } => "StartGraph",
        AutomationCommand::Stop => "Stop",
        AutomationCommand::Shutdown => "Shutdown",
    }
}
