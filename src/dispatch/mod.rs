/*!
 * Dispatch scheduling.
 *
 * Two independent schedulers live here: the provider fan-out with its
 * per-provider cooldown queues (`scheduler`), and the bounded-retry
 * account-sync scheduler (`sync`).
 */

pub mod scheduler;
pub mod sync;

pub use scheduler::{DispatchDecision, DispatchScheduler, PolicyVerdict, ProviderResult};
pub use sync::{SyncScheduler, SyncStatus};
