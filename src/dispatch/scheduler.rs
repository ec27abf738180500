/*!
 * Provider dispatch scheduler.
 *
 * Fans a finalized extraction out to the enabled providers under the
 * word-count policy and per-provider cooldown. Each provider owns a FIFO
 * queue drained by a dedicated worker task; a quota-sensitive provider pops
 * its next request only after its cooldown has elapsed since the
 * *completion* of the previous one, so a burst of completions cannot turn
 * into a burst of new requests. Failures are typed, terminal, and isolated
 * to the owning queue.
 */

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::app_config::{Config, ProviderKind};
use crate::arbitration::FinalizedSelection;
use crate::errors::ProviderError;
use crate::extraction::{is_complete_sentence, ExtractedContext};
use crate::providers::{ProviderGateway, ProviderRequest, RequestState};

/// Unconditional rejection threshold; not configurable
pub const HARD_WORD_LIMIT: usize = 100;

/// Outcome of the word-count policy gate, applied once per selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyVerdict {
    /// Dispatch to every enabled provider
    Dispatch,
    /// Over the soft limit and not shaped like a complete sentence
    NotASentence,
    /// Over the hard limit; never dispatched
    TooLong,
}

/// Evaluate the word-count policy for one selection
///
/// At or below the soft limit: always dispatch. Between the soft limit and
/// the hard limit: dispatch only when the text reads as a complete
/// sentence. Above the hard limit: never.
pub fn evaluate_policy(word_count: usize, text: &str, soft_limit: usize) -> PolicyVerdict {
    if word_count > HARD_WORD_LIMIT {
        return PolicyVerdict::TooLong;
    }
    if word_count > soft_limit && !is_complete_sentence(text) {
        return PolicyVerdict::NotASentence;
    }
    PolicyVerdict::Dispatch
}

/// What dispatch did with one finalized selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchDecision {
    /// Requests enqueued; one id per enabled provider
    Dispatched(Vec<(ProviderKind, Uuid)>),
    /// Rejected by the policy gate
    Rejected(PolicyVerdict),
}

/// Terminal result of one provider request
#[derive(Debug, Clone)]
pub struct ProviderResult {
    pub request_id: Uuid,
    pub provider_id: ProviderKind,
    pub outcome: Result<crate::providers::Translation, ProviderError>,
    pub completed_at: DateTime<Utc>,
}

/// Fans finalized extractions out to the enabled providers
pub struct DispatchScheduler {
    soft_limit: usize,
    target_lang: String,
    enabled: Vec<ProviderKind>,
    queues: HashMap<ProviderKind, UnboundedSender<ProviderRequest>>,
    results_rx: Mutex<Option<UnboundedReceiver<ProviderResult>>>,
    workers: Vec<JoinHandle<()>>,
}

impl DispatchScheduler {
    /// Create the scheduler and spawn one queue worker per enabled provider
    pub fn new(config: &Config, gateway: Arc<dyn ProviderGateway>) -> Self {
        let (results_tx, results_rx) = unbounded_channel();
        let mut queues = HashMap::new();
        let mut workers = Vec::new();

        for kind in &config.translation.enabled {
            let (tx, rx) = unbounded_channel();
            let cooldown = Duration::from_millis(config.translation.get_cooldown_ms(*kind));
            workers.push(spawn_provider_worker(
                *kind,
                cooldown,
                Arc::clone(&gateway),
                rx,
                results_tx.clone(),
            ));
            queues.insert(*kind, tx);
        }

        Self {
            soft_limit: config.max_word_count,
            target_lang: config.default_target_language.clone(),
            enabled: config.translation.enabled.clone(),
            queues,
            results_rx: Mutex::new(Some(results_rx)),
            workers,
        }
    }

    /// Apply the policy gate once, then enqueue to every enabled provider
    pub fn dispatch(
        &self,
        selection: &FinalizedSelection,
        context: &ExtractedContext,
    ) -> DispatchDecision {
        let verdict = evaluate_policy(selection.word_count, &selection.text, self.soft_limit);
        if verdict != PolicyVerdict::Dispatch {
            info!(
                "selection rejected by policy gate ({} words): {:?}",
                selection.word_count, verdict
            );
            return DispatchDecision::Rejected(verdict);
        }

        let mut tickets = Vec::with_capacity(self.enabled.len());
        for kind in &self.enabled {
            let request =
                ProviderRequest::new(*kind, &context.word, &context.sentence, &self.target_lang);
            let request_id = request.request_id;

            match self.queues.get(kind) {
                Some(queue) if queue.send(request).is_ok() => {
                    debug!("enqueued {} for {}", request_id, kind);
                    tickets.push((*kind, request_id));
                }
                _ => warn!("queue for {} is gone, dropping request", kind),
            }
        }

        DispatchDecision::Dispatched(tickets)
    }

    /// Take the terminal result stream; yields one event per request
    ///
    /// Can be taken once; later calls return `None`.
    pub fn take_results(&self) -> Option<UnboundedReceiver<ProviderResult>> {
        self.results_rx.lock().take()
    }

    /// Stop all queue workers
    pub fn shutdown(&mut self) {
        self.queues.clear();
        for worker in self.workers.drain(..) {
            worker.abort();
        }
    }
}

impl Drop for DispatchScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// One provider's queue worker: FIFO pop, cooldown since completion,
/// independent typed failure
fn spawn_provider_worker(
    kind: ProviderKind,
    cooldown: Duration,
    gateway: Arc<dyn ProviderGateway>,
    mut queue: UnboundedReceiver<ProviderRequest>,
    results: UnboundedSender<ProviderResult>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut last_completed: Option<tokio::time::Instant> = None;

        while let Some(mut request) = queue.recv().await {
            if !cooldown.is_zero() {
                if let Some(completed) = last_completed {
                    tokio::time::sleep_until(completed + cooldown).await;
                }
            }

            request.state = RequestState::InFlight;
            let outcome = gateway.submit(&request).await;
            last_completed = Some(tokio::time::Instant::now());

            request.state = match &outcome {
                Ok(_) => RequestState::Done,
                Err(e) => {
                    debug!("{} request {} failed: {}", kind, request.request_id, e);
                    RequestState::Failed
                }
            };

            let result = ProviderResult {
                request_id: request.request_id,
                provider_id: kind,
                outcome,
                completed_at: Utc::now(),
            };
            if results.send(result).is_err() {
                // Receiver gone; keep draining so senders never block
                debug!("{} result receiver dropped", kind);
            }
        }

        debug!("{} queue closed, worker exiting", kind);
    })
}
