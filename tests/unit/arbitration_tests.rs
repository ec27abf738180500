/*!
 * Timing tests for the arbitration driver
 *
 * These run under a paused runtime clock: armed debounce deadlines elapse in
 * virtual time, so the assertions are deterministic.
 */

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};

use wordlens::adapter::{DocumentTreeAdapter, InputEventKind, SelectionKey};
use wordlens::app_config::{ArbitrationConfig, DiscoveryConfig};
use wordlens::arbitration::{spawn_arbitration, FinalizedSelection};

use crate::common::{settle, shared_adapter, MockAdapter, ROOT};

fn spawn_driver(
    adapter: &Arc<MockAdapter>,
    config: ArbitrationConfig,
    aggressive: bool,
) -> UnboundedReceiver<FinalizedSelection> {
    let (tx, rx) = unbounded_channel();
    let _driver = spawn_arbitration(
        Arc::clone(adapter) as Arc<dyn DocumentTreeAdapter>,
        ROOT,
        config,
        DiscoveryConfig::default(),
        aggressive,
        tx,
    );
    rx
}

/// Arbitration config with the intentionality threshold disabled, for tests
/// that drive sub-threshold pointer gestures
fn lenient_config() -> ArbitrationConfig {
    ArbitrationConfig {
        min_press_ms: 0,
        ..ArbitrationConfig::default()
    }
}

#[tokio::test(start_paused = true)]
async fn test_driver_withPointerGestureAndChangeBurst_shouldFinalizeExactlyOnce() {
    let adapter = shared_adapter();
    adapter.set_snapshot(ROOT, "a stable selection");
    let mut finalized = spawn_driver(&adapter, lenient_config(), false);
    settle().await;

    // Pointer down at t=0, a burst of spurious change events while held,
    // release at t=10ms
    adapter.push_event(ROOT, InputEventKind::PointerDown);
    for _ in 0..8 {
        adapter.push_event(ROOT, InputEventKind::SelectionChange);
    }
    adapter.press_and_release(ROOT, Duration::from_millis(10));
    settle().await;

    // Before release + D1 nothing may fire
    tokio::time::sleep(Duration::from_millis(40)).await;
    assert!(finalized.try_recv().is_err(), "finalized before the debounce elapsed");

    // At/after D1 exactly one finalization
    tokio::time::sleep(Duration::from_millis(20)).await;
    let first = finalized.try_recv().expect("selection should finalize after D1");
    assert_eq!(first.text, "a stable selection");
    assert_eq!(first.word_count, 3);

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert!(finalized.try_recv().is_err(), "finalized more than once");
}

#[tokio::test(start_paused = true)]
async fn test_driver_withPointerDownWhilePending_shouldCancelArmedTimer() {
    let adapter = shared_adapter();
    adapter.set_snapshot(ROOT, "restarted selection");
    let mut finalized = spawn_driver(&adapter, lenient_config(), false);
    settle().await;

    adapter.press_and_release(ROOT, Duration::from_millis(100));
    settle().await;

    // A new press lands before D1 elapses: restart, not queue
    tokio::time::sleep(Duration::from_millis(20)).await;
    adapter.push_event(ROOT, InputEventKind::PointerDown);
    settle().await;

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert!(
        finalized.try_recv().is_err(),
        "cancelled timer still finalized"
    );
}

#[tokio::test(start_paused = true)]
async fn test_driver_withKeyboardSelection_shouldFinalizeAfterKeyboardDelay() {
    let adapter = shared_adapter();
    adapter.set_snapshot(ROOT, "keyboard grown selection");
    let mut finalized = spawn_driver(&adapter, ArbitrationConfig::default(), false);
    settle().await;

    adapter.push_event(ROOT, InputEventKind::KeyUp(SelectionKey::ArrowRight));
    settle().await;

    tokio::time::sleep(Duration::from_millis(150)).await;
    let selection = finalized.try_recv().expect("keyboard selection should finalize");
    assert_eq!(selection.text, "keyboard grown selection");
}

#[tokio::test(start_paused = true)]
async fn test_driver_withSelectionChangeOnly_shouldDebounceToSingleFinalize() {
    let adapter = shared_adapter();
    adapter.set_snapshot(ROOT, "programmatic selection");
    let mut finalized = spawn_driver(&adapter, ArbitrationConfig::default(), false);
    settle().await;

    // Re-arming replaces the timer; only the quiet period after the last
    // change produces a finalization
    for _ in 0..3 {
        adapter.push_event(ROOT, InputEventKind::SelectionChange);
        settle().await;
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    tokio::time::sleep(Duration::from_millis(300)).await;

    let selection = finalized.try_recv().expect("change burst should finalize once");
    assert_eq!(selection.text, "programmatic selection");
    assert!(finalized.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn test_driver_withDuplicateFinalizations_shouldEmitSingleEvent() {
    let adapter = shared_adapter();
    adapter.set_snapshot(ROOT, "same text twice");
    let mut finalized = spawn_driver(&adapter, ArbitrationConfig::default(), false);
    settle().await;

    adapter.push_event(ROOT, InputEventKind::KeyUp(SelectionKey::End));
    tokio::time::sleep(Duration::from_millis(200)).await;
    adapter.push_event(ROOT, InputEventKind::KeyUp(SelectionKey::End));
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert!(finalized.try_recv().is_ok(), "first finalization should emit");
    assert!(
        finalized.try_recv().is_err(),
        "identical consecutive text must be deduplicated"
    );
}

#[tokio::test(start_paused = true)]
async fn test_driver_withShortClick_shouldDiscardUnintentionalSelection() {
    let adapter = shared_adapter();
    adapter.set_snapshot(ROOT, "accidental selection");
    // Default config: 50ms intentionality threshold active
    let mut finalized = spawn_driver(&adapter, ArbitrationConfig::default(), false);
    settle().await;

    adapter.press_and_release(ROOT, Duration::from_millis(10));
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(finalized.try_recv().is_err(), "10ms click should not finalize");

    // A deliberate press on new text does finalize
    adapter.set_snapshot(ROOT, "deliberate selection");
    adapter.press_and_release(ROOT, Duration::from_millis(200));
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(finalized.try_recv().is_ok());
}

#[tokio::test(start_paused = true)]
async fn test_driver_withAggressiveMode_shouldFinalizeOnCopyEvent() {
    let adapter = shared_adapter();
    adapter.set_snapshot(ROOT, "copied text");
    let mut finalized = spawn_driver(&adapter, ArbitrationConfig::default(), true);
    settle().await;

    adapter.push_event(ROOT, InputEventKind::Copy);
    settle().await;

    let selection = finalized.try_recv().expect("copy should finalize in aggressive mode");
    assert_eq!(selection.text, "copied text");
}

#[tokio::test(start_paused = true)]
async fn test_driver_withAggressiveMode_shouldPollAndRespectCeiling() {
    let adapter = shared_adapter();
    adapter.set_snapshot(ROOT, "first polled text");

    let discovery = DiscoveryConfig {
        aggressive_poll_interval_ms: 1000,
        aggressive_poll_limit: 3,
        ..DiscoveryConfig::default()
    };
    let (tx, mut finalized) = unbounded_channel();
    let _driver = spawn_arbitration(
        Arc::clone(&adapter) as Arc<dyn DocumentTreeAdapter>,
        ROOT,
        ArbitrationConfig::default(),
        discovery,
        true,
        tx,
    );
    settle().await;

    // First tick picks up the selection without any input event
    tokio::time::sleep(Duration::from_millis(1100)).await;
    assert!(finalized.try_recv().is_ok(), "poll tick should finalize");

    // Ticks beyond the ceiling must not fire even with fresh text
    tokio::time::sleep(Duration::from_millis(10_000)).await;
    let _ = finalized.try_recv(); // remaining budgeted ticks may emit for changed text
    adapter.set_snapshot(ROOT, "text after ceiling");
    tokio::time::sleep(Duration::from_millis(10_000)).await;
    assert!(
        finalized.try_recv().is_err(),
        "poll ticks past the ceiling must stop"
    );
}

#[tokio::test(start_paused = true)]
async fn test_driver_withEmptySnapshot_shouldReturnToIdleWithoutEmitting() {
    let adapter = shared_adapter();
    // No snapshot configured: the default empty snapshot is invalid
    let mut finalized = spawn_driver(&adapter, ArbitrationConfig::default(), false);
    settle().await;

    adapter.push_event(ROOT, InputEventKind::KeyUp(SelectionKey::Shift));
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(finalized.try_recv().is_err());

    // The machine recovered: a later valid selection still finalizes
    adapter.set_snapshot(ROOT, "valid after empty");
    adapter.push_event(ROOT, InputEventKind::KeyUp(SelectionKey::Shift));
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(finalized.try_recv().is_ok());
}
