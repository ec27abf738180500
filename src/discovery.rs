/*!
 * Frame discovery engine.
 *
 * Locates embedded content regions that may host selectable text - including
 * ones that load asynchronously or never become reachable - and reports when
 * arbitration can be attached to their inner tree. Every candidate is
 * evaluated exactly once; re-observations through mutation notices are
 * no-ops. Monitoring polls with a hard attempt ceiling, then degrades to
 * aggressive monitoring scoped to the originating outer context.
 */

use log::{debug, info, warn};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use crate::adapter::{ContextId, DocumentTreeAdapter, FrameCandidate};
use crate::app_config::DiscoveryConfig;
use crate::errors::AccessError;

/// Monitoring state of a candidate region
///
/// `Accessible` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    Pending,
    Accessible,
    Failed,
}

/// A candidate embedded region tracked until accessible or abandoned
#[derive(Debug, Clone)]
pub struct FrameDescriptor {
    /// Host-side identity of the region
    pub frame_id: String,

    /// Source location, if any yet
    pub source: Option<String>,

    /// Element identifier, if any
    pub identifier: Option<String>,

    /// Outer context the region was observed in
    pub origin: ContextId,

    /// Monitoring state
    pub state: MonitorState,

    /// Content-access attempts made so far
    pub attempts: u32,
}

impl FrameDescriptor {
    fn from_candidate(candidate: &FrameCandidate, origin: ContextId) -> Self {
        Self {
            frame_id: candidate.frame_id.clone(),
            source: candidate.source.clone(),
            identifier: candidate.identifier.clone(),
            origin,
            state: MonitorState::Pending,
            attempts: 0,
        }
    }

    fn as_candidate(&self) -> FrameCandidate {
        FrameCandidate {
            frame_id: self.frame_id.clone(),
            source: self.source.clone(),
            identifier: self.identifier.clone(),
        }
    }
}

/// Terminal result of monitoring one descriptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryOutcome {
    /// The inner tree became reachable; arbitration should attach here
    Attached(ContextId),

    /// The region stayed unreachable; fall back to aggressive monitoring on
    /// the originating outer context
    AggressiveFallback(ContextId),
}

/// Match a candidate against the configured content-format heuristics
///
/// A region qualifies when its source or identifier carries a content-format
/// marker, or when it has no source yet but its identifier suggests content
/// will be loaded into it dynamically.
pub fn candidate_matches(candidate: &FrameCandidate, config: &DiscoveryConfig) -> bool {
    let contains_any = |value: &str, markers: &[String]| {
        markers.iter().any(|marker| value.contains(marker.as_str()))
    };

    let source = candidate.source.as_deref().unwrap_or("");
    let identifier = candidate.identifier.as_deref().unwrap_or("");

    if contains_any(source, &config.frame_source_markers)
        || contains_any(identifier, &config.frame_source_markers)
    {
        return true;
    }

    source.is_empty()
        && !identifier.is_empty()
        && contains_any(identifier, &config.frame_identifier_markers)
}

/// Finds and monitors embedded content regions across document contexts
pub struct FrameDiscoveryEngine {
    adapter: Arc<dyn DocumentTreeAdapter>,
    config: DiscoveryConfig,

    /// Frame ids already evaluated; makes attach idempotent across rescans
    seen: Mutex<HashSet<String>>,
}

impl FrameDiscoveryEngine {
    pub fn new(adapter: Arc<dyn DocumentTreeAdapter>, config: DiscoveryConfig) -> Self {
        Self {
            adapter,
            config,
            seen: Mutex::new(HashSet::new()),
        }
    }

    /// Evaluate the candidate regions currently present in a context
    ///
    /// Each frame id is evaluated once ever; candidates re-observed through
    /// later scans or mutation notices yield nothing.
    pub fn scan(&self, context: ContextId) -> Vec<FrameDescriptor> {
        let candidates = self.adapter.list_candidate_frames(context);
        let mut seen = self.seen.lock();
        let mut descriptors = Vec::new();

        for candidate in candidates {
            if !seen.insert(candidate.frame_id.clone()) {
                continue;
            }
            if candidate_matches(&candidate, &self.config) {
                debug!("discovered candidate frame '{}' in {}", candidate.frame_id, context);
                descriptors.push(FrameDescriptor::from_candidate(&candidate, context));
            }
        }

        descriptors
    }

    /// Poll a descriptor until its inner tree is reachable or the attempt
    /// budget is spent; runs to a terminal state
    pub async fn monitor(&self, descriptor: &mut FrameDescriptor) -> DiscoveryOutcome {
        let interval = Duration::from_millis(self.config.poll_interval_ms);

        while descriptor.attempts < self.config.max_poll_attempts {
            descriptor.attempts += 1;

            match self
                .adapter
                .try_access_embedded_context(&descriptor.as_candidate())
                .await
            {
                Ok(Some(inner)) => {
                    descriptor.state = MonitorState::Accessible;
                    info!(
                        "frame '{}' accessible after {} attempts, attaching {}",
                        descriptor.frame_id, descriptor.attempts, inner
                    );
                    self.install_style_override(inner).await;
                    return DiscoveryOutcome::Attached(inner);
                }
                Ok(None) | Err(AccessError::NotLoaded) => {
                    debug!(
                        "frame '{}' not reachable yet (attempt {}/{})",
                        descriptor.frame_id, descriptor.attempts, self.config.max_poll_attempts
                    );
                }
                Err(AccessError::PermissionDenied(reason)) => {
                    warn!(
                        "frame '{}' permission denied: {}, falling back to aggressive monitoring",
                        descriptor.frame_id, reason
                    );
                    descriptor.state = MonitorState::Failed;
                    return DiscoveryOutcome::AggressiveFallback(descriptor.origin);
                }
                Err(e) => {
                    debug!("frame '{}' access error: {}", descriptor.frame_id, e);
                }
            }

            if descriptor.attempts < self.config.max_poll_attempts {
                tokio::time::sleep(interval).await;
            }
        }

        warn!(
            "frame '{}' unreachable after {} attempts, falling back to aggressive monitoring",
            descriptor.frame_id, descriptor.attempts
        );
        descriptor.state = MonitorState::Failed;
        DiscoveryOutcome::AggressiveFallback(descriptor.origin)
    }

    /// Neutralize selection-blocking rules inside a freshly attached tree
    ///
    /// Optional host capability; absence is not an error.
    async fn install_style_override(&self, context: ContextId) {
        match self.adapter.neutralize_selection_blocking(context).await {
            Ok(()) => debug!("{}: selection-blocking styles neutralized", context),
            Err(AccessError::Unsupported) => {
                debug!("{}: host cannot override styles, skipping", context)
            }
            Err(e) => debug!("{}: style override failed: {}", context, e),
        }
    }
}
