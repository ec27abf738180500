/*!
 * # wordlens
 *
 * A Rust library implementing the core engine of an in-page translation
 * assistant: text selected anywhere in a document tree - including embedded,
 * dynamically-loaded, or cross-origin-protected regions - is arbitrated into
 * a stable selection, expanded to its containing sentence, and fanned out to
 * translation providers under rate and retry constraints.
 *
 * ## Features
 *
 * - Per-context selection arbitration across pointer, keyboard, and
 *   programmatic modalities, with debounce and duplicate suppression
 * - Discovery and monitoring of dynamically-inserted embedded content
 *   regions, with a bounded-poll budget and an aggressive fallback mode
 * - Word and sentence extraction robust to mixed inline markup
 * - Per-provider FIFO dispatch with completion-anchored cooldowns
 * - Bounded-retry account-sync scheduling with fixed backoff
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `adapter`: the document-tree capability the host environment implements
 * - `app_config`: configuration management
 * - `discovery`: embedded-region discovery and monitoring
 * - `arbitration`: the per-context selection arbitration state machine
 * - `extraction`: word/sentence context extraction
 * - `dispatch`: provider fan-out and sync scheduling:
 *   - `dispatch::scheduler`: policy gate and per-provider cooldown queues
 *   - `dispatch::sync`: bounded-retry account-sync scheduler
 * - `providers`: gateway capabilities and their HTTP/mock implementations
 * - `controller`: pipeline wiring and the outward event streams
 * - `language_utils`: ISO language code utilities
 * - `errors`: custom error types for the engine
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod adapter;
pub mod app_config;
pub mod arbitration;
pub mod controller;
pub mod discovery;
pub mod dispatch;
pub mod errors;
pub mod extraction;
pub mod language_utils;
pub mod providers;

// Re-export main types for easier usage
pub use adapter::{ContextId, DocumentTreeAdapter, RawInputEvent, SelectionSnapshot};
pub use app_config::{Config, ProviderKind};
pub use arbitration::{ArbitrationMachine, ArbitrationState, FinalizedSelection};
pub use controller::{Controller, FinalizedSelectionEvent};
pub use discovery::{FrameDescriptor, FrameDiscoveryEngine, MonitorState};
pub use dispatch::{DispatchScheduler, ProviderResult, SyncScheduler, SyncStatus};
pub use extraction::{extract_context, ExtractedContext};
pub use errors::{AccessError, AppError, ProviderError, SyncError};
pub use language_utils::{get_language_name, language_codes_match, normalize_to_part1};
