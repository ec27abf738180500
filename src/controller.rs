/*!
 * Engine controller.
 *
 * Wires the pipeline: adapter -> discovery -> arbitration -> extraction ->
 * dispatch. Owns the per-context registry (one arbitration driver and one
 * dedup state per context, never shared), reacts to mutation notices by
 * rescanning for candidate frames or tearing down detached contexts, and
 * exposes the outward streams consumed by the presentation layer.
 */

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

use crate::adapter::{ContextId, DocumentTreeAdapter, MutationKind};
use crate::app_config::Config;
use crate::arbitration::{spawn_arbitration, FinalizedSelection};
use crate::discovery::{DiscoveryOutcome, FrameDiscoveryEngine};
use crate::dispatch::{DispatchScheduler, ProviderResult, SyncScheduler, SyncStatus};
use crate::extraction::extract_context;
use crate::providers::{ProviderGateway, SyncGateway, SyncPayload};

/// Outward event: one per distinct finalized selection
#[derive(Debug, Clone)]
pub struct FinalizedSelectionEvent {
    /// Cleaned selection
    pub word: String,

    /// Containing sentence
    pub sentence: String,

    /// The raw finalized text
    pub selected_text: String,

    /// Context the selection came from
    pub source_context_id: ContextId,

    /// Wall-clock emission time
    pub at: DateTime<Utc>,
}

/// One attached context: its arbitration driver and mutation watcher
struct ContextEntry {
    driver: JoinHandle<()>,
    watcher: JoinHandle<()>,
    aggressive: bool,
}

/// Shared engine state; tasks hold it through an Arc
struct EngineInner {
    config: Config,
    adapter: Arc<dyn DocumentTreeAdapter>,
    discovery: FrameDiscoveryEngine,
    scheduler: DispatchScheduler,
    sync: SyncScheduler,

    /// Gates event processing without tearing subscriptions down
    enabled: AtomicBool,

    contexts: Mutex<HashMap<ContextId, ContextEntry>>,
    selections_tx: UnboundedSender<FinalizedSelection>,
    selections_rx: Mutex<Option<UnboundedReceiver<FinalizedSelection>>>,
    events_tx: UnboundedSender<FinalizedSelectionEvent>,
    events_rx: Mutex<Option<UnboundedReceiver<FinalizedSelectionEvent>>>,
    pump: Mutex<Option<JoinHandle<()>>>,
}

/// Main engine controller
pub struct Controller {
    inner: Arc<EngineInner>,
}

impl Controller {
    /// Create a controller with the given configuration and gateways
    pub fn new(
        config: Config,
        adapter: Arc<dyn DocumentTreeAdapter>,
        provider_gateway: Arc<dyn ProviderGateway>,
        sync_gateway: Arc<dyn SyncGateway>,
    ) -> Result<Self> {
        config.validate()?;

        let discovery =
            FrameDiscoveryEngine::new(Arc::clone(&adapter), config.discovery.clone());
        let scheduler = DispatchScheduler::new(&config, provider_gateway);
        let sync = SyncScheduler::new(sync_gateway, config.sync.clone());

        let (selections_tx, selections_rx) = unbounded_channel();
        let (events_tx, events_rx) = unbounded_channel();

        Ok(Self {
            inner: Arc::new(EngineInner {
                config,
                adapter,
                discovery,
                scheduler,
                sync,
                enabled: AtomicBool::new(true),
                contexts: Mutex::new(HashMap::new()),
                selections_tx,
                selections_rx: Mutex::new(Some(selections_rx)),
                events_tx,
                events_rx: Mutex::new(Some(events_rx)),
                pump: Mutex::new(None),
            }),
        })
    }

    /// Gate or ungate event processing
    pub fn set_enabled(&self, enabled: bool) {
        self.inner.enabled.store(enabled, Ordering::SeqCst);
        info!("engine {}", if enabled { "enabled" } else { "disabled" });
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.enabled.load(Ordering::SeqCst)
    }

    /// Attach to the root context, start discovery, start the pipeline pump
    pub fn start(&self) -> Result<()> {
        let engine = &self.inner;
        let mut pump_slot = engine.pump.lock();
        if pump_slot.is_some() {
            return Err(anyhow!("controller already started"));
        }

        let root = engine.adapter.root_context();
        attach_context(engine, root, false);
        discover_in(engine, root);

        let selections = engine
            .selections_rx
            .lock()
            .take()
            .ok_or_else(|| anyhow!("selection channel already taken"))?;
        *pump_slot = Some(spawn_pump(engine, selections));

        info!("engine started on root {}", root);
        Ok(())
    }

    /// Take the finalized-selection event stream (once)
    pub fn selection_events(&self) -> Option<UnboundedReceiver<FinalizedSelectionEvent>> {
        self.inner.events_rx.lock().take()
    }

    /// Take the provider result stream (once)
    pub fn provider_results(&self) -> Option<UnboundedReceiver<ProviderResult>> {
        self.inner.scheduler.take_results()
    }

    /// Trigger an automatic sync attempt
    pub fn trigger_sync(&self, payload: SyncPayload) -> SyncStatus {
        self.inner.sync.trigger(payload)
    }

    /// Trigger a manual sync attempt, resetting an exhausted retry counter
    pub fn trigger_sync_manual(&self, payload: SyncPayload) -> SyncStatus {
        self.inner.sync.trigger_manual(payload)
    }

    /// Watchable sync status
    pub fn sync_status(&self) -> tokio::sync::watch::Receiver<SyncStatus> {
        self.inner.sync.status()
    }

    /// Abort every task this controller spawned
    pub fn shutdown(&self) {
        for (_, entry) in self.inner.contexts.lock().drain() {
            entry.driver.abort();
            entry.watcher.abort();
        }
        if let Some(pump) = self.inner.pump.lock().take() {
            pump.abort();
        }
        info!("engine shut down");
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Attach arbitration to a context; idempotent per context
///
/// An aggressive attach over an existing normal one replaces the driver
/// (the context's dedup state restarts with it).
fn attach_context(engine: &Arc<EngineInner>, context: ContextId, aggressive: bool) {
    let mut contexts = engine.contexts.lock();

    if let Some(entry) = contexts.get(&context) {
        if entry.aggressive || !aggressive {
            debug!("{}: already attached, skipping", context);
            return;
        }
        debug!("{}: upgrading to aggressive monitoring", context);
        let old = contexts.remove(&context).expect("entry present");
        old.driver.abort();
        old.watcher.abort();
    }

    let driver = spawn_arbitration(
        Arc::clone(&engine.adapter),
        context,
        engine.config.arbitration.clone(),
        engine.config.discovery.clone(),
        aggressive,
        engine.selections_tx.clone(),
    );
    let watcher = spawn_mutation_watcher(engine, context);

    contexts.insert(
        context,
        ContextEntry {
            driver,
            watcher,
            aggressive,
        },
    );
}

/// Evaluate candidate frames in a context and monitor the matches
fn discover_in(engine: &Arc<EngineInner>, context: ContextId) {
    for descriptor in engine.discovery.scan(context) {
        let engine = Arc::clone(engine);
        tokio::spawn(async move {
            let mut descriptor = descriptor;
            match engine.discovery.monitor(&mut descriptor).await {
                DiscoveryOutcome::Attached(inner) => attach_context(&engine, inner, false),
                DiscoveryOutcome::AggressiveFallback(origin) => {
                    attach_context(&engine, origin, true)
                }
            }
        });
    }
}

/// Watch a context's mutations: new children feed discovery, detach tears
/// the context down
fn spawn_mutation_watcher(engine: &Arc<EngineInner>, context: ContextId) -> JoinHandle<()> {
    let engine = Arc::clone(engine);
    let mut mutations = engine.adapter.subscribe_mutations(context);

    tokio::spawn(async move {
        while let Some(notice) = mutations.recv().await {
            match notice.kind {
                MutationKind::ChildrenAdded => discover_in(&engine, context),
                MutationKind::ContextDetached => {
                    info!("{}: detached, tearing down", context);
                    if let Some(entry) = engine.contexts.lock().remove(&context) {
                        entry.driver.abort();
                    }
                    break;
                }
            }
        }
    })
}

/// Pump finalized selections through extraction into dispatch
fn spawn_pump(
    engine: &Arc<EngineInner>,
    mut selections: UnboundedReceiver<FinalizedSelection>,
) -> JoinHandle<()> {
    let engine = Arc::clone(engine);

    tokio::spawn(async move {
        while let Some(selection) = selections.recv().await {
            if !engine.enabled.load(Ordering::SeqCst) {
                debug!("engine disabled, dropping finalized selection");
                continue;
            }

            let ancestor = match engine
                .adapter
                .flatten_ancestor(selection.context_id, selection.anchor_offset)
                .await
            {
                Ok(ancestor) => ancestor,
                Err(e) => {
                    // Extraction degrades to the selection itself
                    debug!("{}: ancestor unavailable: {}", selection.context_id, e);
                    Default::default()
                }
            };

            let extracted = extract_context(&selection.text, &ancestor);

            let event = FinalizedSelectionEvent {
                word: extracted.word.clone(),
                sentence: extracted.sentence.clone(),
                selected_text: selection.text.clone(),
                source_context_id: selection.context_id,
                at: Utc::now(),
            };
            if engine.events_tx.send(event).is_err() {
                debug!("selection-event receiver dropped");
            }

            engine.scheduler.dispatch(&selection, &extracted);
        }

        warn!("selection pump stopped: all arbitration senders dropped");
    })
}
