/*!
 * Account-sync scheduler.
 *
 * A single in-flight attempt at a time: a trigger arriving while one is
 * running, or within the cooldown window measured from the last attempt
 * *start*, resolves immediately as suppressed - it is never queued. A
 * failed attempt retries on the fixed backoff table up to the retry budget;
 * exhaustion is terminal until an explicit manual trigger resets the
 * counter. Internal retries are part of the running attempt and bypass the
 * cooldown gate.
 */

use log::{debug, info, warn};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;

use crate::app_config::SyncConfig;
use crate::errors::SyncError;
use crate::providers::{SyncGateway, SyncPayload};

/// Externally visible sync state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncStatus {
    Idle,
    InFlight,
    /// A trigger was swallowed by the in-flight/cooldown/exhausted gate
    Suppressed,
    Succeeded,
    Failed {
        attempt: u32,
        reason: String,
    },
}

/// One running attempt, bounded by the retry budget
#[derive(Debug, Clone, Copy)]
struct SyncAttempt {
    attempt_count: u32,
    started_at: Instant,
}

/// Shared scheduler state; process-wide singleton, mutated only under the
/// lock and never across an await
struct SyncState {
    current: Option<SyncAttempt>,
    last_started: Option<Instant>,
    exhausted: bool,
}

/// Schedules account-sync attempts against the sync gateway
pub struct SyncScheduler {
    gateway: Arc<dyn SyncGateway>,
    config: SyncConfig,
    state: Arc<Mutex<SyncState>>,
    status_tx: watch::Sender<SyncStatus>,
}

impl SyncScheduler {
    pub fn new(gateway: Arc<dyn SyncGateway>, config: SyncConfig) -> Self {
        let (status_tx, _) = watch::channel(SyncStatus::Idle);
        Self {
            gateway,
            config,
            state: Arc::new(Mutex::new(SyncState {
                current: None,
                last_started: None,
                exhausted: false,
            })),
            status_tx,
        }
    }

    /// Watchable status stream for the presentation layer
    pub fn status(&self) -> watch::Receiver<SyncStatus> {
        self.status_tx.subscribe()
    }

    /// Automatic trigger (settings changed, timer, etc.)
    ///
    /// Returns the immediate disposition; the attempt itself runs in the
    /// background and reports through the status stream.
    pub fn trigger(&self, payload: SyncPayload) -> SyncStatus {
        self.trigger_inner(payload, false)
    }

    /// Explicit user-initiated trigger; resets an exhausted retry counter
    pub fn trigger_manual(&self, payload: SyncPayload) -> SyncStatus {
        self.trigger_inner(payload, true)
    }

    fn trigger_inner(&self, payload: SyncPayload, manual: bool) -> SyncStatus {
        let cooldown = Duration::from_millis(self.config.cooldown_ms);

        {
            let mut state = self.state.lock();

            if manual && state.exhausted {
                debug!("manual sync trigger resets exhausted retry counter");
                state.exhausted = false;
            }

            if let Some(current) = &state.current {
                debug!(
                    "sync attempt {} already in flight ({:?} since start), suppressing trigger",
                    current.attempt_count,
                    current.started_at.elapsed()
                );
                return SyncStatus::Suppressed;
            }
            if state.exhausted {
                debug!("sync retries exhausted, suppressing automatic trigger");
                return SyncStatus::Suppressed;
            }
            if let Some(last) = state.last_started {
                if last.elapsed() < cooldown {
                    debug!("sync cooldown active, suppressing trigger");
                    return SyncStatus::Suppressed;
                }
            }

            let now = Instant::now();
            state.current = Some(SyncAttempt {
                attempt_count: 1,
                started_at: now,
            });
            state.last_started = Some(now);
        }

        let _ = self.status_tx.send(SyncStatus::InFlight);
        self.spawn_attempt(payload);
        SyncStatus::InFlight
    }

    fn spawn_attempt(&self, payload: SyncPayload) {
        let gateway = Arc::clone(&self.gateway);
        let state = Arc::clone(&self.state);
        let status_tx = self.status_tx.clone();
        let max_retries = self.config.max_retries.max(1);
        let backoff = self.config.backoff_ms.clone();

        tokio::spawn(async move {
            let mut attempt = 1u32;

            loop {
                match gateway.attempt_sync(&payload).await {
                    Ok(()) => {
                        info!("sync succeeded on attempt {}", attempt);
                        let mut guard = state.lock();
                        guard.current = None;
                        guard.exhausted = false;
                        drop(guard);
                        let _ = status_tx.send(SyncStatus::Succeeded);
                        return;
                    }
                    Err(e) => {
                        warn!("sync attempt {} failed: {}", attempt, e);

                        if attempt >= max_retries {
                            let reason = terminal_reason(&e, attempt);
                            let mut guard = state.lock();
                            guard.current = None;
                            guard.exhausted = true;
                            drop(guard);
                            let _ = status_tx.send(SyncStatus::Failed {
                                attempt,
                                reason,
                            });
                            return;
                        }

                        // Backoff indexed by attempt count; the table's last
                        // entry covers any overrun
                        let delay_ms = backoff
                            .get(attempt as usize - 1)
                            .or_else(|| backoff.last())
                            .copied()
                            .unwrap_or(5000);
                        tokio::time::sleep(Duration::from_millis(delay_ms)).await;

                        attempt += 1;
                        if let Some(current) = state.lock().current.as_mut() {
                            current.attempt_count = attempt;
                        }
                    }
                }
            }
        });
    }
}

fn terminal_reason(error: &SyncError, attempts: u32) -> String {
    format!("{} ({})", SyncError::RetriesExhausted { attempts }, error)
}
