/*!
 * Selection arbitration state machine.
 *
 * One machine per document context decides exactly when a raw selection is
 * "final", suppressing duplicates and in-progress selections. The machine
 * itself is synchronous and pure - `on_event` returns the timer effect the
 * driver should apply, `on_timer_fired` validates a fresh snapshot - so the
 * transition logic is testable without a runtime. The async driver owns the
 * single replaceable debounce deadline and the aggressive-mode poll ticker.
 *
 * Finalization waits for the modality-appropriate completion signal
 * (release, not press): intermediate selection states fire many spurious
 * change notifications, and a held pointer means the user is still
 * selecting.
 */

use log::{debug, warn};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;

use crate::adapter::{
    ContextId, DocumentTreeAdapter, EventClass, InputEventKind, RawInputEvent, SelectionSnapshot,
};
use crate::app_config::{ArbitrationConfig, DiscoveryConfig};
use crate::extraction::word_count;

/// Arbitration machine states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArbitrationState {
    /// Nothing pending
    Idle,
    /// Pointer held down; selection still in progress
    Suppressed,
    /// A finalize timer is armed
    Pending,
    /// Momentary, synchronous: snapshot validation in progress
    Finalizing,
}

/// Which modality asked for finalization
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TriggerKind {
    Pointer,
    Keyboard,
    Selection,
    Fallback,
}

/// Effect the driver must apply after feeding an event to the machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArbitrationAction {
    /// Replace any armed timer with a new one of this duration
    ArmTimer(Duration),
    /// Drop any armed timer
    CancelTimer,
    /// Attempt finalization right now, bypassing timer arming
    FinalizeNow,
    /// Nothing to do
    Ignore,
}

/// A selection judged stable and intentional
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalizedSelection {
    /// Trimmed selection text
    pub text: String,

    /// Whitespace-delimited word count, computed once and threaded through
    pub word_count: usize,

    /// Originating context
    pub context_id: ContextId,

    /// Anchor offset from the finalizing snapshot
    pub anchor_offset: usize,

    /// When finalization happened
    pub timestamp: Instant,
}

/// Per-context arbitration state
///
/// Exactly one instance and one `last_processed` value exist per context;
/// nothing here is shared across contexts.
pub struct ArbitrationMachine {
    context_id: ContextId,
    config: ArbitrationConfig,
    state: ArbitrationState,
    aggressive: bool,
    last_processed: Option<String>,
    pointer_down_at: Option<Instant>,
    last_press_duration: Option<Duration>,
    pending_trigger: Option<TriggerKind>,
}

impl ArbitrationMachine {
    pub fn new(context_id: ContextId, config: ArbitrationConfig, aggressive: bool) -> Self {
        Self {
            context_id,
            config,
            state: ArbitrationState::Idle,
            aggressive,
            last_processed: None,
            pointer_down_at: None,
            last_press_duration: None,
            pending_trigger: None,
        }
    }

    pub fn state(&self) -> ArbitrationState {
        self.state
    }

    /// Feed one raw input event; returns the timer effect to apply
    pub fn on_event(&mut self, event: &RawInputEvent) -> ArbitrationAction {
        match event.kind {
            InputEventKind::PointerDown => {
                // Restart semantics: a new press always cancels a pending
                // finalize rather than queuing behind it
                self.state = ArbitrationState::Suppressed;
                self.pointer_down_at = Some(event.timestamp);
                self.pending_trigger = None;
                ArbitrationAction::CancelTimer
            }
            InputEventKind::PointerUp => {
                self.last_press_duration = self
                    .pointer_down_at
                    .take()
                    .map(|down| event.timestamp.saturating_duration_since(down));
                self.state = ArbitrationState::Pending;
                self.pending_trigger = Some(TriggerKind::Pointer);
                ArbitrationAction::ArmTimer(Duration::from_millis(self.config.pointer_delay_ms))
            }
            InputEventKind::SelectionChange => {
                if self.state == ArbitrationState::Suppressed {
                    return ArbitrationAction::Ignore;
                }
                // A change burst right after release still belongs to the
                // pointer gesture; keep its intentionality evidence
                if self.pending_trigger != Some(TriggerKind::Pointer) {
                    self.pending_trigger = Some(TriggerKind::Selection);
                }
                self.state = ArbitrationState::Pending;
                ArbitrationAction::ArmTimer(Duration::from_millis(self.config.selection_delay_ms))
            }
            InputEventKind::KeyUp(key) => {
                if !key.completes_selection() || self.state == ArbitrationState::Suppressed {
                    return ArbitrationAction::Ignore;
                }
                self.state = ArbitrationState::Pending;
                self.pending_trigger = Some(TriggerKind::Keyboard);
                ArbitrationAction::ArmTimer(Duration::from_millis(self.config.keyboard_delay_ms))
            }
            InputEventKind::Copy | InputEventKind::Poll => {
                if !self.aggressive || self.state == ArbitrationState::Suppressed {
                    return ArbitrationAction::Ignore;
                }
                self.pending_trigger = Some(TriggerKind::Fallback);
                ArbitrationAction::FinalizeNow
            }
        }
    }

    /// The armed timer fired (or a fallback tick asked for finalization):
    /// validate the fresh snapshot and emit at most one finalized selection
    pub fn on_timer_fired(&mut self, snapshot: &SelectionSnapshot) -> Option<FinalizedSelection> {
        self.state = ArbitrationState::Finalizing;
        let trigger = self.pending_trigger.take();
        let result = self.validate(snapshot, trigger);
        self.state = ArbitrationState::Idle;
        result
    }

    /// Snapshot could not be taken; return to idle without emitting
    pub fn on_snapshot_unavailable(&mut self) {
        self.pending_trigger = None;
        self.state = ArbitrationState::Idle;
    }

    fn validate(
        &mut self,
        snapshot: &SelectionSnapshot,
        trigger: Option<TriggerKind>,
    ) -> Option<FinalizedSelection> {
        let text = snapshot.text.trim();

        if text.is_empty() || snapshot.range_count == 0 || snapshot.collapsed {
            return None;
        }

        if text.chars().count() < self.config.min_selection_chars {
            return None;
        }

        // Intentionality: a sub-threshold click that happened to land on a
        // selection is not a selection gesture. Threshold 0 disables the check.
        if trigger == Some(TriggerKind::Pointer) && self.config.min_press_ms > 0 {
            let min_press = Duration::from_millis(self.config.min_press_ms);
            match self.last_press_duration {
                Some(press) if press > min_press => {}
                _ => {
                    debug!("{}: pointer press too short, discarding", self.context_id);
                    return None;
                }
            }
        }

        if self.last_processed.as_deref() == Some(text) {
            debug!("{}: duplicate selection suppressed", self.context_id);
            return None;
        }

        self.last_processed = Some(text.to_string());
        Some(FinalizedSelection {
            text: text.to_string(),
            word_count: word_count(text),
            context_id: self.context_id,
            anchor_offset: snapshot.anchor_offset,
            timestamp: Instant::now(),
        })
    }
}

/// Spawn the async driver that owns a context's machine, debounce deadline,
/// and (in aggressive mode) the capped periodic fallback poll
pub fn spawn_arbitration(
    adapter: Arc<dyn DocumentTreeAdapter>,
    context_id: ContextId,
    config: ArbitrationConfig,
    discovery: DiscoveryConfig,
    aggressive: bool,
    output: UnboundedSender<FinalizedSelection>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let classes: &[EventClass] = if aggressive {
            &[
                EventClass::Pointer,
                EventClass::Keyboard,
                EventClass::Selection,
                EventClass::Clipboard,
            ]
        } else {
            &[EventClass::Pointer, EventClass::Keyboard, EventClass::Selection]
        };

        let mut events = adapter.subscribe_input_events(context_id, classes);
        let mut machine = ArbitrationMachine::new(context_id, config, aggressive);
        let mut deadline: Option<tokio::time::Instant> = None;

        let mut poll = tokio::time::interval(Duration::from_millis(
            discovery.aggressive_poll_interval_ms.max(1),
        ));
        poll.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let mut polls_remaining = if aggressive {
            discovery.aggressive_poll_limit
        } else {
            0
        };

        debug!("{}: arbitration attached (aggressive: {})", context_id, aggressive);

        loop {
            tokio::select! {
                maybe_event = events.recv() => {
                    let Some(event) = maybe_event else {
                        debug!("{}: input subscription closed, arbitration stopping", context_id);
                        break;
                    };
                    match machine.on_event(&event) {
                        ArbitrationAction::ArmTimer(delay) => {
                            deadline = Some(tokio::time::Instant::now() + delay);
                        }
                        ArbitrationAction::CancelTimer => {
                            deadline = None;
                        }
                        ArbitrationAction::FinalizeNow => {
                            deadline = None;
                            finalize(&*adapter, context_id, &mut machine, &output).await;
                        }
                        ArbitrationAction::Ignore => {}
                    }
                }
                _ = tokio::time::sleep_until(deadline.unwrap_or_else(tokio::time::Instant::now)),
                    if deadline.is_some() =>
                {
                    deadline = None;
                    finalize(&*adapter, context_id, &mut machine, &output).await;
                }
                _ = poll.tick(), if polls_remaining > 0 => {
                    polls_remaining -= 1;
                    let tick = RawInputEvent::now(InputEventKind::Poll, context_id);
                    if machine.on_event(&tick) == ArbitrationAction::FinalizeNow {
                        finalize(&*adapter, context_id, &mut machine, &output).await;
                    }
                }
            }
        }
    })
}

async fn finalize(
    adapter: &dyn DocumentTreeAdapter,
    context_id: ContextId,
    machine: &mut ArbitrationMachine,
    output: &UnboundedSender<FinalizedSelection>,
) {
    match adapter.selection_snapshot(context_id).await {
        Ok(snapshot) => {
            if let Some(finalized) = machine.on_timer_fired(&snapshot) {
                debug!(
                    "{}: finalized selection ({} words)",
                    context_id, finalized.word_count
                );
                if output.send(finalized).is_err() {
                    warn!("{}: finalized-selection receiver dropped", context_id);
                }
            }
        }
        Err(e) => {
            debug!("{}: snapshot unavailable during finalize: {}", context_id, e);
            machine.on_snapshot_unavailable();
        }
    }
}
