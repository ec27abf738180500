/*!
 * Common test utilities for the wordlens test suite
 */

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

use wordlens::adapter::{
    AncestorText, ContextId, DocumentTreeAdapter, EventClass, FrameCandidate, InputEventKind,
    MutationKind, MutationNotice, RawInputEvent, SelectionSnapshot,
};
use wordlens::app_config::Config;
use wordlens::errors::AccessError;

/// The root context every mock adapter starts with
pub const ROOT: ContextId = ContextId(0);

struct InputSubscriber {
    classes: Vec<EventClass>,
    tx: UnboundedSender<RawInputEvent>,
}

/// Scriptable in-memory document tree adapter
///
/// Snapshots, ancestor texts, candidate frames, and access outcomes are all
/// set by the test; events are pushed through the same channels a host
/// would use.
#[derive(Default)]
pub struct MockAdapter {
    snapshots: Mutex<HashMap<ContextId, SelectionSnapshot>>,
    ancestors: Mutex<HashMap<ContextId, AncestorText>>,
    input_subs: Mutex<HashMap<ContextId, Vec<InputSubscriber>>>,
    mutation_subs: Mutex<HashMap<ContextId, Vec<UnboundedSender<MutationNotice>>>>,
    frames: Mutex<HashMap<ContextId, Vec<FrameCandidate>>>,
    access_scripts: Mutex<HashMap<String, VecDeque<Result<Option<ContextId>, AccessError>>>>,
    access_attempts: Mutex<HashMap<String, usize>>,
    neutralized: Mutex<Vec<ContextId>>,
}

impl MockAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the snapshot the next finalization will see in a context
    pub fn set_snapshot(&self, context: ContextId, text: &str) {
        self.snapshots.lock().insert(
            context,
            SelectionSnapshot {
                text: text.to_string(),
                range_count: 1,
                collapsed: false,
                anchor_offset: 0,
            },
        );
    }

    /// Set a snapshot with full control over its fields
    pub fn set_raw_snapshot(&self, context: ContextId, snapshot: SelectionSnapshot) {
        self.snapshots.lock().insert(context, snapshot);
    }

    /// Set the flattened ancestor text for a context
    pub fn set_ancestor(&self, context: ContextId, block: Option<&str>, parent: &str) {
        self.ancestors.lock().insert(
            context,
            AncestorText {
                block: block.map(String::from),
                parent: parent.to_string(),
            },
        );
    }

    /// Add a candidate frame visible in a context
    pub fn add_frame(&self, context: ContextId, candidate: FrameCandidate) {
        self.frames.lock().entry(context).or_default().push(candidate);
    }

    /// Script the access outcomes for a frame id, consumed in order;
    /// exhausted scripts keep answering "not reachable yet"
    pub fn script_access(
        &self,
        frame_id: &str,
        outcomes: Vec<Result<Option<ContextId>, AccessError>>,
    ) {
        self.access_scripts
            .lock()
            .insert(frame_id.to_string(), outcomes.into());
    }

    /// How many access attempts a frame has seen
    pub fn access_attempts(&self, frame_id: &str) -> usize {
        self.access_attempts.lock().get(frame_id).copied().unwrap_or(0)
    }

    /// Contexts whose selection-blocking styles were neutralized
    pub fn neutralized_contexts(&self) -> Vec<ContextId> {
        self.neutralized.lock().clone()
    }

    /// How many input subscriptions a context has received in total
    pub fn input_subscription_count(&self, context: ContextId) -> usize {
        self.input_subs
            .lock()
            .get(&context)
            .map(|subs| subs.len())
            .unwrap_or(0)
    }

    /// Push one raw input event into a context's subscriptions
    pub fn push_event(&self, context: ContextId, kind: InputEventKind) {
        self.deliver(RawInputEvent::now(kind, context));
    }

    /// Pointer press and release with an explicit hold duration
    pub fn press_and_release(&self, context: ContextId, hold: Duration) {
        let down = RawInputEvent::now(InputEventKind::PointerDown, context);
        let up = RawInputEvent {
            kind: InputEventKind::PointerUp,
            context_id: context,
            timestamp: down.timestamp + hold,
        };
        self.deliver(down);
        self.deliver(up);
    }

    /// Push a mutation notice into a context's subscriptions
    pub fn push_mutation(&self, context: ContextId, kind: MutationKind) {
        let subs = self.mutation_subs.lock();
        if let Some(senders) = subs.get(&context) {
            for tx in senders {
                let _ = tx.send(MutationNotice {
                    context_id: context,
                    kind: kind.clone(),
                });
            }
        }
    }

    fn deliver(&self, event: RawInputEvent) {
        let class = event_class(event.kind);
        let subs = self.input_subs.lock();
        if let Some(subscribers) = subs.get(&event.context_id) {
            for sub in subscribers {
                if sub.classes.contains(&class) {
                    let _ = sub.tx.send(event.clone());
                }
            }
        }
    }
}

fn event_class(kind: InputEventKind) -> EventClass {
    match kind {
        InputEventKind::PointerDown | InputEventKind::PointerUp => EventClass::Pointer,
        InputEventKind::KeyUp(_) => EventClass::Keyboard,
        InputEventKind::SelectionChange | InputEventKind::Poll => EventClass::Selection,
        InputEventKind::Copy => EventClass::Clipboard,
    }
}

#[async_trait]
impl DocumentTreeAdapter for MockAdapter {
    fn root_context(&self) -> ContextId {
        ROOT
    }

    async fn selection_snapshot(&self, context: ContextId) -> Result<SelectionSnapshot, AccessError> {
        Ok(self
            .snapshots
            .lock()
            .get(&context)
            .cloned()
            .unwrap_or_default())
    }

    fn subscribe_input_events(
        &self,
        context: ContextId,
        classes: &[EventClass],
    ) -> UnboundedReceiver<RawInputEvent> {
        let (tx, rx) = unbounded_channel();
        self.input_subs
            .lock()
            .entry(context)
            .or_default()
            .push(InputSubscriber {
                classes: classes.to_vec(),
                tx,
            });
        rx
    }

    fn subscribe_mutations(&self, context: ContextId) -> UnboundedReceiver<MutationNotice> {
        let (tx, rx) = unbounded_channel();
        self.mutation_subs.lock().entry(context).or_default().push(tx);
        rx
    }

    fn list_candidate_frames(&self, context: ContextId) -> Vec<FrameCandidate> {
        self.frames.lock().get(&context).cloned().unwrap_or_default()
    }

    async fn try_access_embedded_context(
        &self,
        frame: &FrameCandidate,
    ) -> Result<Option<ContextId>, AccessError> {
        *self
            .access_attempts
            .lock()
            .entry(frame.frame_id.clone())
            .or_insert(0) += 1;

        self.access_scripts
            .lock()
            .get_mut(&frame.frame_id)
            .and_then(|script| script.pop_front())
            .unwrap_or(Ok(None))
    }

    async fn neutralize_selection_blocking(&self, context: ContextId) -> Result<(), AccessError> {
        self.neutralized.lock().push(context);
        Ok(())
    }

    async fn flatten_ancestor(
        &self,
        context: ContextId,
        _anchor_offset: usize,
    ) -> Result<AncestorText, AccessError> {
        Ok(self
            .ancestors
            .lock()
            .get(&context)
            .cloned()
            .unwrap_or_default())
    }
}

/// Engine config tuned for fast deterministic tests
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.default_target_language = "fr".to_string();
    config
}

/// Drain everything currently buffered in a receiver
pub fn drain<T>(rx: &mut UnboundedReceiver<T>) -> Vec<T> {
    let mut items = Vec::new();
    while let Ok(item) = rx.try_recv() {
        items.push(item);
    }
    items
}

/// Shorthand for an adapter wrapped the way the engine wants it
pub fn shared_adapter() -> Arc<MockAdapter> {
    Arc::new(MockAdapter::new())
}

/// Yield to the runtime so freshly spawned tasks get to run
pub async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}

/// A timestamp helper for event-sequence tests
pub fn at(base: Instant, offset_ms: u64) -> Instant {
    base + Duration::from_millis(offset_ms)
}
