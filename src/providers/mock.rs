/*!
 * Mock gateway implementations for testing.
 *
 * This module provides mocks that simulate different behaviors:
 * - `MockProviderGateway::working()` - Always succeeds with translated text
 * - `MockProviderGateway::failing()` - Always fails with an error
 * - `MockProviderGateway::intermittent(n)` - Fails every nth request
 * - `MockProviderGateway::slow(ms)` - Succeeds after a delay
 *
 * Behaviors can also be set per provider, and submission timestamps are
 * recorded with the runtime clock so cooldown spacing can be asserted under
 * a paused test clock.
 */

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::time::Instant;

use crate::app_config::ProviderKind;
use crate::errors::{ProviderError, SyncError};
use crate::providers::{ProviderGateway, ProviderRequest, SyncGateway, SyncPayload, Translation};

/// Behavior mode for the mock provider gateway
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MockBehavior {
    /// Always succeeds with a marked-up translation
    Working,
    /// Always fails with a connection error
    Failing,
    /// Fails with a missing-credential error
    NoCredential,
    /// Fails intermittently (every nth request)
    Intermittent { fail_every: usize },
    /// Succeeds after a delay (for cooldown/ordering tests)
    Slow { delay_ms: u64 },
}

/// One recorded submission
#[derive(Debug, Clone)]
pub struct RecordedSubmission {
    pub request: ProviderRequest,
    pub at: Instant,
}

/// Mock provider gateway for testing dispatch behavior
pub struct MockProviderGateway {
    default_behavior: MockBehavior,
    per_provider: Mutex<HashMap<ProviderKind, MockBehavior>>,
    request_count: AtomicUsize,
    submissions: Mutex<Vec<RecordedSubmission>>,
}

impl MockProviderGateway {
    /// Create a new mock gateway with the specified default behavior
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            default_behavior: behavior,
            per_provider: Mutex::new(HashMap::new()),
            request_count: AtomicUsize::new(0),
            submissions: Mutex::new(Vec::new()),
        }
    }

    /// Create a working mock gateway that always succeeds
    pub fn working() -> Self {
        Self::new(MockBehavior::Working)
    }

    /// Create a failing mock gateway that always errors
    pub fn failing() -> Self {
        Self::new(MockBehavior::Failing)
    }

    /// Create a mock gateway missing its credential
    pub fn no_credential() -> Self {
        Self::new(MockBehavior::NoCredential)
    }

    /// Create an intermittently failing mock gateway
    pub fn intermittent(fail_every: usize) -> Self {
        Self::new(MockBehavior::Intermittent { fail_every })
    }

    /// Create a slow mock gateway
    pub fn slow(delay_ms: u64) -> Self {
        Self::new(MockBehavior::Slow { delay_ms })
    }

    /// Override the behavior for one provider
    pub fn with_behavior_for(self, kind: ProviderKind, behavior: MockBehavior) -> Self {
        self.per_provider.lock().insert(kind, behavior);
        self
    }

    /// Number of submissions seen so far
    pub fn submission_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Copy of all recorded submissions, in arrival order
    pub fn submissions(&self) -> Vec<RecordedSubmission> {
        self.submissions.lock().clone()
    }

    /// Submissions that targeted one provider
    pub fn submissions_for(&self, kind: ProviderKind) -> Vec<RecordedSubmission> {
        self.submissions
            .lock()
            .iter()
            .filter(|s| s.request.provider_id == kind)
            .cloned()
            .collect()
    }

    fn behavior_for(&self, kind: ProviderKind) -> MockBehavior {
        self.per_provider
            .lock()
            .get(&kind)
            .copied()
            .unwrap_or(self.default_behavior)
    }
}

#[async_trait]
impl ProviderGateway for MockProviderGateway {
    async fn submit(&self, request: &ProviderRequest) -> Result<Translation, ProviderError> {
        let count = self.request_count.fetch_add(1, Ordering::SeqCst) + 1;
        self.submissions.lock().push(RecordedSubmission {
            request: request.clone(),
            at: Instant::now(),
        });

        match self.behavior_for(request.provider_id) {
            MockBehavior::Working => Ok(Translation {
                word: format!("[{}] {}", request.target_lang, request.word),
                sentence: Some(format!("[{}] {}", request.target_lang, request.sentence)),
            }),
            MockBehavior::Failing => Err(ProviderError::ConnectionError(
                "mock connection refused".to_string(),
            )),
            MockBehavior::NoCredential => Err(ProviderError::MissingCredential(
                request.provider_id.to_string(),
            )),
            MockBehavior::Intermittent { fail_every } => {
                if fail_every > 0 && count % fail_every == 0 {
                    Err(ProviderError::ApiError {
                        status_code: 500,
                        message: "mock intermittent failure".to_string(),
                    })
                } else {
                    Ok(Translation {
                        word: format!("[{}] {}", request.target_lang, request.word),
                        sentence: None,
                    })
                }
            }
            MockBehavior::Slow { delay_ms } => {
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                Ok(Translation {
                    word: format!("[{}] {}", request.target_lang, request.word),
                    sentence: None,
                })
            }
        }
    }
}

/// Mock sync gateway that fails a configured number of times, then succeeds
pub struct MockSyncGateway {
    /// Attempts that should fail before the first success
    failures_before_success: usize,
    attempt_count: AtomicUsize,
    attempt_times: Mutex<Vec<Instant>>,
}

impl MockSyncGateway {
    pub fn new(failures_before_success: usize) -> Self {
        Self {
            failures_before_success,
            attempt_count: AtomicUsize::new(0),
            attempt_times: Mutex::new(Vec::new()),
        }
    }

    /// A gateway that succeeds on the first attempt
    pub fn always_succeeding() -> Self {
        Self::new(0)
    }

    /// A gateway that never succeeds
    pub fn always_failing() -> Self {
        Self::new(usize::MAX)
    }

    pub fn attempt_count(&self) -> usize {
        self.attempt_count.load(Ordering::SeqCst)
    }

    pub fn attempt_times(&self) -> Vec<Instant> {
        self.attempt_times.lock().clone()
    }
}

#[async_trait]
impl SyncGateway for MockSyncGateway {
    async fn attempt_sync(&self, _payload: &SyncPayload) -> Result<(), SyncError> {
        let count = self.attempt_count.fetch_add(1, Ordering::SeqCst) + 1;
        self.attempt_times.lock().push(Instant::now());

        if count <= self.failures_before_success {
            Err(SyncError::Gateway("mock sync failure".to_string()))
        } else {
            Ok(())
        }
    }
}
