// Sequence runner: the state machine driving one automation run
use super::config::RunnerConfig;
use super::error::{AutomationError, AutomationResult, ConfigError, GraphError};
use super::graph::{NodeId, NodeKind, SequenceGraph, StepResult};
use super::item::{Item, Sequence};
use super::types::{
    ActionKind, AutomationEvent, ReleaseReason, RunOptions, RunOutcome, RunSummary, RunnerState,
};
use crate::device::{MouseButton, MouseInput, ScreenCapture};
use crate::template_matching::{MatchResult, TemplateMatcher};
use tokio::sync::mpsc;
use tokio::time::{Duration, Instant, sleep};
use tokio_util::sync::CancellationToken;

/// Button currently held down by a long-press action
#[derive(Debug, Clone, Copy)]
struct LongPress {
    anchor: (i32, i32),
    button: MouseButton,
}

/// Bookkeeping for a single run; dropped when the run ends
#[derive(Debug, Default)]
struct RunState {
    long_press: Option<LongPress>,
    steps_processed: u64,
    matches: u64,
    misses: u64,
    skipped: u64,
    restarts: u64,
    loops_completed: u64,
}

impl RunState {
    fn summary(&self, outcome: RunOutcome) -> RunSummary {
        RunSummary {
            outcome,
            steps_processed: self.steps_processed,
            matches: self.matches,
            misses: self.misses,
            skipped: self.skipped,
            restarts: self.restarts,
            loops_completed: self.loops_completed,
        }
    }
}

/// Executes sequences of items against injected screen and mouse capabilities.
///
/// A run borrows the runner mutably, so one runner never drives two runs at
/// once. Held buttons are released before any run returns.
pub struct SequenceRunner<C, I> {
    capture: C,
    input: I,
    matcher: TemplateMatcher,
    config: RunnerConfig,
    state: RunnerState,
    event_tx: Option<mpsc::UnboundedSender<AutomationEvent>>,
}

impl<C: ScreenCapture, I: MouseInput> SequenceRunner<C, I> {
    pub fn new(capture: C, input: I, config: RunnerConfig) -> Self {
        Self {
            capture,
            input,
            matcher: TemplateMatcher::new(config.match_config.clone()),
            config,
            state: RunnerState::Idle,
            event_tx: None,
        }
    }

    pub fn with_event_sender(mut self, event_tx: mpsc::UnboundedSender<AutomationEvent>) -> Self {
        self.event_tx = Some(event_tx);
        self
    }

    pub fn set_event_sender(&mut self, event_tx: mpsc::UnboundedSender<AutomationEvent>) {
        self.event_tx = Some(event_tx);
    }

    pub fn state(&self) -> RunnerState {
        self.state
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Replace the configuration; takes effect on the next run
    pub fn update_config(&mut self, config: RunnerConfig) {
        self.matcher.update_config(config.match_config.clone());
        self.config = config;
    }

    pub fn capture(&self) -> &C {
        &self.capture
    }

    pub fn input(&self) -> &I {
        &self.input
    }

    /// Run `sequence` until it completes, `cancel` fires, or a device call fails.
    ///
    /// The sequence is owned by the run, so later edits by the caller never
    /// reach it.
    pub async fn run(
        &mut self,
        sequence: Sequence,
        options: RunOptions,
        cancel: CancellationToken,
    ) -> AutomationResult<RunSummary> {
        if options.start_index != 0 && options.start_index >= sequence.len() {
            return self.reject(
                ConfigError::StartIndexOutOfRange {
                    index: options.start_index,
                    len: sequence.len(),
                }
                .into(),
            );
        }

        log::info!(
            "🚀 Starting run: {} items, loop={}, start={}",
            sequence.len(),
            options.loop_enabled,
            options.start_index
        );
        self.set_state(RunnerState::Running);
        let mut run = RunState::default();
        let result = self.drive_sequence(&sequence, options, &mut run, &cancel).await;
        self.finish(run, result).await
    }

    /// Run a graph, choosing each next node from its edges.
    ///
    /// Execution enters at the first node of the linearized order;
    /// `options.start_index` indexes into that order.
    pub async fn run_graph(
        &mut self,
        graph: SequenceGraph,
        options: RunOptions,
        cancel: CancellationToken,
    ) -> AutomationResult<RunSummary> {
        let order = graph.linearize_ids();
        if options.start_index != 0 && options.start_index >= order.len() {
            return self.reject(
                ConfigError::StartIndexOutOfRange {
                    index: options.start_index,
                    len: order.len(),
                }
                .into(),
            );
        }

        log::info!(
            "🚀 Starting graph run: {} nodes, {} edges, loop={}",
            graph.len(),
            graph.edges().len(),
            options.loop_enabled
        );
        self.set_state(RunnerState::Running);
        let mut run = RunState::default();
        let entry = order.first().copied();
        let start = order.get(options.start_index).copied();
        let result = self
            .drive_graph(&graph, entry, start, options, &mut run, &cancel)
            .await;
        self.finish(run, result).await
    }

    async fn drive_sequence(
        &mut self,
        sequence: &Sequence,
        options: RunOptions,
        run: &mut RunState,
        cancel: &CancellationToken,
    ) -> AutomationResult<RunOutcome> {
        let mut cursor = options.start_index;

        loop {
            // Zero-delay sequences would otherwise never give the scheduler a turn
            tokio::task::yield_now().await;
            if cancel.is_cancelled() {
                return Ok(RunOutcome::Stopped);
            }

            let Some(item) = sequence.get(cursor) else {
                if self.end_of_pass(run, options, cancel).await? {
                    cursor = 0;
                    continue;
                }
                return Ok(RunOutcome::Completed);
            };

            let step = self.process_step(run, cursor, item, cancel).await?;
            if step == StepResult::Missed && item.interrupt_on_fail() {
                self.restart(run, cursor);
                cursor = 0;
            } else {
                cursor += 1;
            }
        }
    }

    async fn drive_graph(
        &mut self,
        graph: &SequenceGraph,
        entry: Option<NodeId>,
        start: Option<NodeId>,
        options: RunOptions,
        run: &mut RunState,
        cancel: &CancellationToken,
    ) -> AutomationResult<RunOutcome> {
        let mut current = start;

        loop {
            tokio::task::yield_now().await;
            if cancel.is_cancelled() {
                return Ok(RunOutcome::Stopped);
            }

            let Some(id) = current else {
                if self.end_of_pass(run, options, cancel).await? {
                    current = entry;
                    continue;
                }
                return Ok(RunOutcome::Completed);
            };
            let Some(node) = graph.node(id) else {
                return Err(GraphError::UnknownNode { id }.into());
            };

            let step = self.process_step(run, id.index(), &node.item, cancel).await?;
            current = match (node.kind, step) {
                (NodeKind::Normal, StepResult::Missed) if node.item.interrupt_on_fail() => {
                    self.restart(run, id.index());
                    entry
                }
                _ => graph.next_node(id, step),
            };
        }
    }

    /// Handle reaching the end of the items. Returns whether to go again.
    async fn end_of_pass(
        &mut self,
        run: &mut RunState,
        options: RunOptions,
        cancel: &CancellationToken,
    ) -> AutomationResult<bool> {
        self.release_long_press(run, ReleaseReason::SequenceEnd).await?;
        run.loops_completed += 1;
        log::debug!("🔁 Pass {} finished", run.loops_completed);
        self.emit(AutomationEvent::LoopCompleted(run.loops_completed));

        if !options.loop_enabled {
            return Ok(false);
        }
        let pause = self.config.loop_interval;
        self.wait(run, pause, cancel).await?;
        Ok(true)
    }

    fn restart(&mut self, run: &mut RunState, from: usize) {
        run.restarts += 1;
        log::info!("↩️ Item {} not found with interrupt set, restarting from the first item", from);
        self.emit(AutomationEvent::Restarted { from });
    }

    /// Process one item: match, act, then wait out its delay
    async fn process_step(
        &mut self,
        run: &mut RunState,
        index: usize,
        item: &Item,
        cancel: &CancellationToken,
    ) -> AutomationResult<StepResult> {
        if !item.is_enabled() {
            run.skipped += 1;
            log::debug!("⏭️ Skipping disabled {}", item.display_name(index));
            self.emit(AutomationEvent::StepSkipped { index });
            return Ok(StepResult::Skipped);
        }

        run.steps_processed += 1;
        log::debug!("▶️ Step {} ({}, {})", index, item.display_name(index), item.action());
        self.emit(AutomationEvent::StepStarted {
            index,
            alias: item.alias().map(str::to_string),
        });

        self.release_if_cursor_moved(run).await?;
        if run.long_press.is_some() && !item.action().is_long_press() {
            self.release_long_press(run, ReleaseReason::NextAction).await?;
        }

        // The screenshot only lives for the match
        let result = {
            let screenshot = self.capture.capture_screen().await?;
            self.matcher.locate(&screenshot, item.template())
        };

        let step = if result.is_found() {
            let (x, y) = self.target_point(&result, item.click_offset());
            run.matches += 1;
            log::info!(
                "🎯 {} found at {}, {} at ({}, {})",
                item.display_name(index),
                result.describe(),
                item.action(),
                x,
                y
            );
            self.emit(AutomationEvent::Matched {
                index,
                x,
                y,
                confidence: result.confidence,
            });
            self.dispatch(run, item.action(), x, y).await?;
            StepResult::Matched
        } else {
            run.misses += 1;
            log::info!("👀 {}: {}", item.display_name(index), result.describe());
            self.emit(AutomationEvent::MatchMissed {
                index,
                status: result.status.code(),
                confidence: result.confidence,
            });
            StepResult::Missed
        };
        drop(result);

        self.wait(run, Duration::from_millis(item.delay_ms()), cancel).await?;
        Ok(step)
    }

    /// Input coordinates for the clicked point inside a match
    fn target_point(&self, result: &MatchResult, offset: (f32, f32)) -> (i32, i32) {
        let (px, py) = result.point_at(offset);
        let scale = self.config.effective_scale();
        ((px as f64 / scale) as i32, (py as f64 / scale) as i32)
    }

    async fn dispatch(
        &mut self,
        run: &mut RunState,
        action: ActionKind,
        x: i32,
        y: i32,
    ) -> AutomationResult<()> {
        if !action.is_long_press() {
            self.input.move_and_click(x, y, action).await?;
            return Ok(());
        }

        if run.long_press.is_some() {
            self.release_long_press(run, ReleaseReason::Replaced).await?;
        }
        let button = action.button();
        self.input.press(x, y, button).await?;
        run.long_press = Some(LongPress {
            anchor: (x, y),
            button,
        });
        log::info!("🖱️ Holding {:?} button at ({}, {})", button, x, y);
        self.emit(AutomationEvent::LongPressStarted { x, y, button });
        Ok(())
    }

    async fn release_long_press(
        &mut self,
        run: &mut RunState,
        reason: ReleaseReason,
    ) -> AutomationResult<()> {
        let Some(press) = run.long_press.take() else {
            return Ok(());
        };
        self.input.release(press.button).await?;
        log::info!("🖱️ Released {:?} button ({:?})", press.button, reason);
        self.emit(AutomationEvent::LongPressReleased {
            button: press.button,
            reason,
        });
        Ok(())
    }

    /// Sleep for `duration` unless cancelled. While a button is held the sleep
    /// is sliced so the cursor can be checked against the press anchor.
    async fn wait(
        &mut self,
        run: &mut RunState,
        duration: Duration,
        cancel: &CancellationToken,
    ) -> AutomationResult<()> {
        let deadline = Instant::now() + duration;
        let poll_interval = self.config.long_press_poll_interval.max(Duration::from_millis(1));

        loop {
            let now = Instant::now();
            if now >= deadline {
                return Ok(());
            }
            let remaining = deadline - now;
            let slice = match run.long_press {
                Some(_) => remaining.min(poll_interval),
                None => remaining,
            };

            tokio::select! {
                _ = cancel.cancelled() => return Ok(()),
                _ = sleep(slice) => {}
            }

            self.release_if_cursor_moved(run).await?;
        }
    }

    /// Let go of a held button once the cursor has left the press anchor
    async fn release_if_cursor_moved(&mut self, run: &mut RunState) -> AutomationResult<()> {
        if let Some(press) = run.long_press
            && let Some(position) = self.input.cursor_position().await?
            && position != press.anchor
        {
            log::debug!(
                "🖱️ Cursor moved from {:?} to {:?} while holding",
                press.anchor,
                position
            );
            self.release_long_press(run, ReleaseReason::CursorMoved).await?;
        }
        Ok(())
    }

    /// Release held input and settle the final state
    async fn finish(
        &mut self,
        mut run: RunState,
        result: AutomationResult<RunOutcome>,
    ) -> AutomationResult<RunSummary> {
        let outcome = match result {
            Ok(outcome) => outcome,
            Err(error) => {
                log::error!("❌ Run aborted: {}", error);
                if let Err(release_error) = self.release_long_press(&mut run, ReleaseReason::Fatal).await {
                    log::warn!("⚠️ Could not release held button after failure: {}", release_error);
                }
                return self.fail(error);
            }
        };

        let reason = match outcome {
            RunOutcome::Completed => ReleaseReason::SequenceEnd,
            RunOutcome::Stopped => ReleaseReason::Stopped,
        };
        if let Err(error) = self.release_long_press(&mut run, reason).await {
            log::error!("❌ Failed to release held button: {}", error);
            return self.fail(error);
        }

        let summary = run.summary(outcome);
        match outcome {
            RunOutcome::Completed => {
                log::info!(
                    "✅ Run completed: {} steps, {} matches, {} misses",
                    summary.steps_processed,
                    summary.matches,
                    summary.misses
                );
                self.set_state(RunnerState::Idle);
            }
            RunOutcome::Stopped => {
                log::info!("⏹️ Run stopped after {} steps", summary.steps_processed);
                self.set_state(RunnerState::Stopped);
            }
        }
        self.emit(AutomationEvent::RunFinished(summary.clone()));
        Ok(summary)
    }

    fn fail(&mut self, error: AutomationError) -> AutomationResult<RunSummary> {
        self.set_state(RunnerState::Stopped);
        self.emit(AutomationEvent::Error(error.to_string()));
        Err(error)
    }

    /// Refuse to start; the runner state is left untouched
    fn reject(&mut self, error: AutomationError) -> AutomationResult<RunSummary> {
        log::warn!("⚠️ Run rejected: {}", error);
        self.emit(AutomationEvent::Error(error.to_string()));
        Err(error)
    }

    fn set_state(&mut self, new_state: RunnerState) {
        if self.state != new_state {
            log::debug!("🤖 Runner state: {:?} -> {:?}", self.state, new_state);
            self.state = new_state;
            self.emit(AutomationEvent::StateChanged(new_state));
        }
    }

    fn emit(&self, event: AutomationEvent) {
        if let Some(tx) = &self.event_tx {
            // A dropped receiver only means nobody is watching
            let _ = tx.send(event);
        }
    }
}
