use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Engine configuration module
/// This module handles the engine configuration including loading,
/// validating and defaulting configuration settings.
/// Represents the engine configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Default target language code (ISO 639-1)
    #[serde(default = "default_target_language")]
    pub default_target_language: String,

    /// Soft word-count limit for dispatch (selections above it must look
    /// like a complete sentence)
    #[serde(default = "default_max_word_count")]
    pub max_word_count: usize,

    /// Translation provider config
    #[serde(default)]
    pub translation: TranslationConfig,

    /// Selection arbitration tuning
    #[serde(default)]
    pub arbitration: ArbitrationConfig,

    /// Frame discovery tuning
    #[serde(default)]
    pub discovery: DiscoveryConfig,

    /// Account-sync scheduler tuning
    #[serde(default)]
    pub sync: SyncConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Translation provider type
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    // @provider: Google Translate (keyless web endpoint)
    #[default]
    Google,
    // @provider: DeepL
    DeepL,
    // @provider: Microsoft Translator
    Microsoft,
    // @provider: Gemini (quota-sensitive, cooldown enforced)
    Gemini,
}

impl ProviderKind {
    // @returns: Capitalized provider name
    pub fn display_name(&self) -> &str {
        match self {
            Self::Google => "Google Translate",
            Self::DeepL => "DeepL",
            Self::Microsoft => "Microsoft Translator",
            Self::Gemini => "Gemini",
        }
    }

    // @returns: Lowercase provider identifier
    pub fn to_lowercase_string(&self) -> String {
        match self {
            Self::Google => "google".to_string(),
            Self::DeepL => "deepl".to_string(),
            Self::Microsoft => "microsoft".to_string(),
            Self::Gemini => "gemini".to_string(),
        }
    }

    /// Whether this provider cannot work without an API key
    pub fn requires_api_key(&self) -> bool {
        !matches!(self, Self::Google)
    }
}

// Implement Display trait for ProviderKind
impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_lowercase_string())
    }
}

// Implement FromStr trait for ProviderKind
impl std::str::FromStr for ProviderKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "google" => Ok(Self::Google),
            "deepl" => Ok(Self::DeepL),
            "microsoft" => Ok(Self::Microsoft),
            "gemini" => Ok(Self::Gemini),
            _ => Err(anyhow!("Invalid provider type: {}", s)),
        }
    }
}

/// Provider configuration wrapper
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ProviderConfig {
    // @field: Provider type identifier
    #[serde(rename = "type")]
    pub provider_type: String,

    // @field: Model name (AI providers only)
    #[serde(default = "String::new")]
    pub model: String,

    // @field: API key
    #[serde(default = "String::new")]
    pub api_key: String,

    // @field: Service URL
    #[serde(default = "String::new")]
    pub endpoint: String,

    // @field: Cooldown between the completion of one request and the pop of
    // the next (milliseconds; 0 = dispatch immediately on enqueue)
    #[serde(default)]
    pub cooldown_ms: u64,

    // @field: Timeout seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl ProviderConfig {
    // @param kind: Provider enum
    // @returns: Provider config with defaults
    pub fn new(kind: ProviderKind) -> Self {
        match kind {
            ProviderKind::Google => Self {
                provider_type: "google".to_string(),
                model: String::new(),
                api_key: String::new(),
                endpoint: default_google_endpoint(),
                cooldown_ms: 0,
                timeout_secs: default_timeout_secs(),
            },
            ProviderKind::DeepL => Self {
                provider_type: "deepl".to_string(),
                model: String::new(),
                api_key: String::new(),
                endpoint: default_deepl_endpoint(),
                cooldown_ms: 0,
                timeout_secs: default_timeout_secs(),
            },
            ProviderKind::Microsoft => Self {
                provider_type: "microsoft".to_string(),
                model: String::new(),
                api_key: String::new(),
                endpoint: default_microsoft_endpoint(),
                cooldown_ms: 0,
                timeout_secs: default_timeout_secs(),
            },
            ProviderKind::Gemini => Self {
                provider_type: "gemini".to_string(),
                model: default_gemini_model(),
                api_key: String::new(),
                endpoint: default_gemini_endpoint(),
                cooldown_ms: default_gemini_cooldown_ms(),
                timeout_secs: default_ai_timeout_secs(),
            },
        }
    }
}

/// Translation dispatch configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranslationConfig {
    /// Providers a finalized selection fans out to
    #[serde(default = "default_enabled_providers")]
    pub enabled: Vec<ProviderKind>,

    /// Available translation providers
    #[serde(default)]
    pub available_providers: Vec<ProviderConfig>,
}

impl TranslationConfig {
    /// Get a provider configuration by kind
    pub fn get_provider_config(&self, kind: ProviderKind) -> Option<&ProviderConfig> {
        let provider_str = kind.to_lowercase_string();
        self.available_providers
            .iter()
            .find(|p| p.provider_type == provider_str)
    }

    /// Get the cooldown for a provider, falling back to its built-in default
    pub fn get_cooldown_ms(&self, kind: ProviderKind) -> u64 {
        self.get_provider_config(kind)
            .map(|p| p.cooldown_ms)
            .unwrap_or_else(|| ProviderConfig::new(kind).cooldown_ms)
    }
}

impl Default for TranslationConfig {
    fn default() -> Self {
        let mut config = Self {
            enabled: default_enabled_providers(),
            available_providers: Vec::new(),
        };

        // Add default providers
        config.available_providers.push(ProviderConfig::new(ProviderKind::Google));
        config.available_providers.push(ProviderConfig::new(ProviderKind::DeepL));
        config.available_providers.push(ProviderConfig::new(ProviderKind::Microsoft));
        config.available_providers.push(ProviderConfig::new(ProviderKind::Gemini));

        config
    }
}

/// Selection arbitration tuning
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ArbitrationConfig {
    /// Finalize delay after pointer release (D1, milliseconds)
    #[serde(default = "default_pointer_delay_ms")]
    pub pointer_delay_ms: u64,

    /// Finalize delay after a selection-change burst (D2, milliseconds)
    #[serde(default = "default_selection_delay_ms")]
    pub selection_delay_ms: u64,

    /// Finalize delay after a qualifying key release (D3, milliseconds)
    #[serde(default = "default_keyboard_delay_ms")]
    pub keyboard_delay_ms: u64,

    /// Minimum selection length in characters
    #[serde(default = "default_min_selection_chars")]
    pub min_selection_chars: usize,

    /// Minimum press-to-release duration for a pointer selection to count
    /// as intentional (milliseconds)
    #[serde(default = "default_min_press_ms")]
    pub min_press_ms: u64,
}

impl Default for ArbitrationConfig {
    fn default() -> Self {
        Self {
            pointer_delay_ms: default_pointer_delay_ms(),
            selection_delay_ms: default_selection_delay_ms(),
            keyboard_delay_ms: default_keyboard_delay_ms(),
            min_selection_chars: default_min_selection_chars(),
            min_press_ms: default_min_press_ms(),
        }
    }
}

/// Frame discovery tuning
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DiscoveryConfig {
    /// Interval between content-access attempts (milliseconds)
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Attempt ceiling before a descriptor is retired
    #[serde(default = "default_max_poll_attempts")]
    pub max_poll_attempts: u32,

    /// Source substrings marking a frame as chaptered-document content
    #[serde(default = "default_frame_source_markers")]
    pub frame_source_markers: Vec<String>,

    /// Identifier substrings suggesting dynamic content in a sourceless frame
    #[serde(default = "default_frame_identifier_markers")]
    pub frame_identifier_markers: Vec<String>,

    /// Aggressive-mode periodic selection poll interval (milliseconds)
    #[serde(default = "default_aggressive_poll_interval_ms")]
    pub aggressive_poll_interval_ms: u64,

    /// Aggressive-mode poll tick ceiling
    #[serde(default = "default_aggressive_poll_limit")]
    pub aggressive_poll_limit: u32,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            max_poll_attempts: default_max_poll_attempts(),
            frame_source_markers: default_frame_source_markers(),
            frame_identifier_markers: default_frame_identifier_markers(),
            aggressive_poll_interval_ms: default_aggressive_poll_interval_ms(),
            aggressive_poll_limit: default_aggressive_poll_limit(),
        }
    }
}

/// Account-sync scheduler tuning
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SyncConfig {
    /// Minimum gap between two attempt starts (milliseconds)
    #[serde(default = "default_sync_cooldown_ms")]
    pub cooldown_ms: u64,

    /// Retry budget per triggered attempt
    #[serde(default = "default_sync_max_retries")]
    pub max_retries: u32,

    /// Backoff schedule indexed by attempt count (milliseconds)
    #[serde(default = "default_sync_backoff_ms")]
    pub backoff_ms: Vec<u64>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            cooldown_ms: default_sync_cooldown_ms(),
            max_retries: default_sync_max_retries(),
            backoff_ms: default_sync_backoff_ms(),
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

fn default_target_language() -> String {
    "ru".to_string()
}

fn default_max_word_count() -> usize {
    25
}

fn default_enabled_providers() -> Vec<ProviderKind> {
    vec![ProviderKind::Google]
}

fn default_timeout_secs() -> u64 {
    15
}

fn default_ai_timeout_secs() -> u64 {
    60
}

fn default_google_endpoint() -> String {
    "https://translate.googleapis.com/translate_a/single".to_string()
}

fn default_deepl_endpoint() -> String {
    "https://api-free.deepl.com/v2/translate".to_string()
}

fn default_microsoft_endpoint() -> String {
    "https://api.cognitive.microsofttranslator.com/translate".to_string()
}

fn default_gemini_endpoint() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_gemini_model() -> String {
    "gemini-1.5-flash".to_string()
}

fn default_gemini_cooldown_ms() -> u64 {
    // Free-tier quota headroom; one request per second keeps the vendor happy
    1000
}

fn default_pointer_delay_ms() -> u64 {
    50
}

fn default_selection_delay_ms() -> u64 {
    250
}

fn default_keyboard_delay_ms() -> u64 {
    100
}

fn default_min_selection_chars() -> usize {
    2
}

fn default_min_press_ms() -> u64 {
    50
}

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_max_poll_attempts() -> u32 {
    20
}

fn default_frame_source_markers() -> Vec<String> {
    ["xhtml", "component", "epub", "OEBPS"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_frame_identifier_markers() -> Vec<String> {
    ["epub", "content"].iter().map(|s| s.to_string()).collect()
}

fn default_aggressive_poll_interval_ms() -> u64 {
    2000
}

fn default_aggressive_poll_limit() -> u32 {
    150
}

fn default_sync_cooldown_ms() -> u64 {
    5000
}

fn default_sync_max_retries() -> u32 {
    3
}

fn default_sync_backoff_ms() -> Vec<u64> {
    vec![1000, 2000, 5000]
}

impl Config {
    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())
            .map_err(|e| anyhow!("Failed to open config file {:?}: {}", path.as_ref(), e))?;
        let reader = BufReader::new(file);
        let config: Config = serde_json::from_reader(reader)
            .map_err(|e| anyhow!("Failed to parse config file: {}", e))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        // Validate target language
        let _target_name = crate::language_utils::get_language_name(&self.default_target_language)?;

        // Every enabled provider must have a config entry. Missing API keys
        // are not config-fatal: they surface as a typed per-request failure.
        for kind in &self.translation.enabled {
            if self.translation.get_provider_config(*kind).is_none() {
                return Err(anyhow!(
                    "Enabled provider '{}' has no entry in available_providers",
                    kind
                ));
            }
        }

        if self.max_word_count == 0 {
            return Err(anyhow!("max_word_count must be at least 1"));
        }

        if self.discovery.max_poll_attempts == 0 {
            return Err(anyhow!("discovery.max_poll_attempts must be at least 1"));
        }

        if self.sync.backoff_ms.is_empty() {
            return Err(anyhow!("sync.backoff_ms table must not be empty"));
        }

        Ok(())
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            default_target_language: default_target_language(),
            max_word_count: default_max_word_count(),
            translation: TranslationConfig::default(),
            arbitration: ArbitrationConfig::default(),
            discovery: DiscoveryConfig::default(),
            sync: SyncConfig::default(),
            log_level: LogLevel::default(),
        }
    }
}
