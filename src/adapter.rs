/*!
 * Document tree adapter capability.
 *
 * The engine never touches a document tree directly: the host environment
 * implements this trait and the engine consumes selection snapshots, input
 * events, mutation notices, and embedded-context handles through it. This is
 * the seam that keeps the arbitration and extraction logic testable without
 * a real document.
 */

use async_trait::async_trait;
use std::time::Instant;
use tokio::sync::mpsc::UnboundedReceiver;

use crate::errors::AccessError;

/// Opaque identifier for one independently addressable document context
/// (the main document or an accessible embedded region)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextId(pub u64);

impl std::fmt::Display for ContextId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ctx-{}", self.0)
    }
}

/// Point-in-time view of the live selection in one context
#[derive(Debug, Clone, Default)]
pub struct SelectionSnapshot {
    /// Raw selection text as the host reports it
    pub text: String,

    /// Number of live ranges in the selection
    pub range_count: usize,

    /// True when the selection is a bare caret
    pub collapsed: bool,

    /// Character offset of the selection anchor inside its parent node
    pub anchor_offset: usize,
}

/// Keys whose release can complete a keyboard selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionKey {
    Shift,
    ArrowLeft,
    ArrowRight,
    ArrowUp,
    ArrowDown,
    Home,
    End,
    PageUp,
    PageDown,
    SelectAll,
    Other,
}

impl SelectionKey {
    /// Whether releasing this key typically ends a selection gesture
    pub fn completes_selection(&self) -> bool {
        !matches!(self, Self::Other)
    }
}

/// Kind of raw input signal delivered by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEventKind {
    PointerDown,
    PointerUp,
    KeyUp(SelectionKey),
    SelectionChange,
    /// Clipboard copy, observed only in aggressive monitoring mode
    Copy,
    /// Periodic fallback tick, generated by the engine itself in aggressive
    /// mode rather than by the host
    Poll,
}

/// Subscription classes for input events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventClass {
    Pointer,
    Keyboard,
    Selection,
    Clipboard,
}

/// A transient raw input signal; consumed by arbitration, never retained
#[derive(Debug, Clone)]
pub struct RawInputEvent {
    /// What happened
    pub kind: InputEventKind,

    /// Which context it happened in
    pub context_id: ContextId,

    /// When the host observed it
    pub timestamp: Instant,
}

impl RawInputEvent {
    pub fn now(kind: InputEventKind, context_id: ContextId) -> Self {
        Self {
            kind,
            context_id,
            timestamp: Instant::now(),
        }
    }
}

/// Kind of tree mutation the host reports
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationKind {
    /// New nodes landed in the tree; candidate frames may have appeared
    ChildrenAdded,

    /// The context's underlying tree went away
    ContextDetached,
}

/// A mutation notice from the host
#[derive(Debug, Clone)]
pub struct MutationNotice {
    pub context_id: ContextId,
    pub kind: MutationKind,
}

/// A candidate embedded region as the host sees it, before discovery has
/// evaluated it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameCandidate {
    /// Host-side identity, stable across re-observations of the same region
    pub frame_id: String,

    /// Source location, if the region has one yet
    pub source: Option<String>,

    /// Element identifier, if any
    pub identifier: Option<String>,
}

/// Flattened ancestor text around a selection anchor
///
/// Both fields may still carry inline markup; the extractor strips it. The
/// block text is absent when no block-level ancestor exists.
#[derive(Debug, Clone, Default)]
pub struct AncestorText {
    /// Text of the nearest block-level ancestor
    pub block: Option<String>,

    /// Text of the immediate parent node
    pub parent: String,
}

/// Capability the host environment implements to expose its document trees
///
/// Event receivers are plain unbounded channels: the host pushes, the engine
/// drains in arrival order. One receiver per subscription; dropping it ends
/// the subscription.
#[async_trait]
pub trait DocumentTreeAdapter: Send + Sync {
    /// The top-level document context
    fn root_context(&self) -> ContextId;

    /// Take a fresh selection snapshot for a context
    async fn selection_snapshot(&self, context: ContextId) -> Result<SelectionSnapshot, AccessError>;

    /// Subscribe to raw input events of the given classes in a context
    fn subscribe_input_events(
        &self,
        context: ContextId,
        classes: &[EventClass],
    ) -> UnboundedReceiver<RawInputEvent>;

    /// Subscribe to tree mutation notices for a context
    fn subscribe_mutations(&self, context: ContextId) -> UnboundedReceiver<MutationNotice>;

    /// Enumerate the candidate embedded regions currently present in a context
    fn list_candidate_frames(&self, context: ContextId) -> Vec<FrameCandidate>;

    /// Try to obtain a handle to a candidate's inner tree
    ///
    /// `Ok(None)` means "not reachable yet, keep polling"; a permission
    /// error is terminal for the candidate.
    async fn try_access_embedded_context(
        &self,
        frame: &FrameCandidate,
    ) -> Result<Option<ContextId>, AccessError>;

    /// Install inline style overrides neutralizing selection-blocking rules
    ///
    /// Optional capability: `AccessError::Unsupported` is expected from
    /// hosts that cannot write into the inner tree.
    async fn neutralize_selection_blocking(&self, context: ContextId) -> Result<(), AccessError>;

    /// Flatten the block ancestor and immediate parent around an anchor
    async fn flatten_ancestor(
        &self,
        context: ContextId,
        anchor_offset: usize,
    ) -> Result<AncestorText, AccessError>;
}
