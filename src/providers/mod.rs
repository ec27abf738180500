/*!
 * Gateway capabilities for outbound calls.
 *
 * Two seams face outward from the engine: translation providers and the
 * account-sync backend. Both are single capabilities with variants selected
 * by identifier, not per-vendor subclassing - the HTTP implementations speak
 * a uniform request/result contract, and the mock implementations drive the
 * test suite.
 */

use async_trait::async_trait;
use uuid::Uuid;

use crate::app_config::ProviderKind;
use crate::errors::{ProviderError, SyncError};

/// Lifecycle of one provider request
///
/// Transitions are monotonic forward-only; `Done` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestState {
    #[default]
    Queued,
    InFlight,
    Done,
    Failed,
}

/// Uniform translation request, owned by a per-provider FIFO queue
#[derive(Debug, Clone)]
pub struct ProviderRequest {
    /// Identifier keying the result stream
    pub request_id: Uuid,

    /// Which provider this request targets
    pub provider_id: ProviderKind,

    /// The cleaned selection
    pub word: String,

    /// Its containing sentence
    pub sentence: String,

    /// Target language (ISO 639-1)
    pub target_lang: String,

    /// Queue lifecycle state
    pub state: RequestState,
}

impl ProviderRequest {
    pub fn new(provider_id: ProviderKind, word: &str, sentence: &str, target_lang: &str) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            provider_id,
            word: word.to_string(),
            sentence: sentence.to_string(),
            target_lang: target_lang.to_string(),
            state: RequestState::default(),
        }
    }
}

/// Successful translation payload from a provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Translation {
    /// Translation of the selected word
    pub word: String,

    /// Translation of the containing sentence, when the vendor returns one
    pub sentence: Option<String>,
}

/// Common capability for all translation providers
///
/// One gateway serves every configured provider; the `provider_id` on the
/// request selects the variant.
#[async_trait]
pub trait ProviderGateway: Send + Sync {
    /// Submit a request and wait for the vendor's answer
    async fn submit(&self, request: &ProviderRequest) -> Result<Translation, ProviderError>;
}

/// Opaque payload handed to the sync backend
#[derive(Debug, Clone)]
pub struct SyncPayload {
    /// Profile the settings belong to
    pub profile_name: String,

    /// Settings blob, shape owned by the presentation layer
    pub settings: serde_json::Value,
}

/// Capability for account/profile sync attempts
#[async_trait]
pub trait SyncGateway: Send + Sync {
    /// Make one sync attempt
    async fn attempt_sync(&self, payload: &SyncPayload) -> Result<(), SyncError>;
}

pub mod http;
pub mod mock;
