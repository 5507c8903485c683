//! Engine event loop
//!
//! One task owns all engine state. Mutation records, debounce and poll
//! timers, handle events and finished activations are multiplexed with
//! `tokio::select!`; every detector and injector pass runs synchronously
//! under a single write lock of the document.

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::{Instant, Sleep};
use tracing::{debug, info, instrument, warn};

use crate::config::Config;
use crate::detect::overlay::{find_panel, visible_thumbnail};
use crate::detect::selectors::controls;
use crate::detect::{is_marked, DetectContext, ItemDescriptor, PageShape};
use crate::dom::{Document, MutationObserver, MutationRecord, NodeId, ObserveOptions, SharedDocument};
use crate::error::{Error, Result};
use crate::inject::{claim, complete, inject, refresh_prices, ActivationContext, PriceFormatter, NATIVE_CURRENCY};
use crate::runtime::{Collaborators, Settings, ThumbnailInliner};

use super::overlay::{is_signal, reconcile_purchase_bar, OverlaySync, PanelPoll};
use super::scheduler::{FlushPlan, ScanScheduler};
use super::{EngineEvent, EngineHandle, EngineStats};

type Timer = Option<Pin<Box<Sleep>>>;

/// Augmentation engine for one page
pub struct Engine {
    doc: SharedDocument,
    collaborators: Arc<dyn Collaborators>,
    inliner: Arc<dyn ThumbnailInliner>,
    config: Config,
}

impl Engine {
    /// Create an engine; fails on invalid configuration
    pub fn new(
        doc: SharedDocument,
        collaborators: Arc<dyn Collaborators>,
        inliner: Arc<dyn ThumbnailInliner>,
        config: Config,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            doc,
            collaborators,
            inliner,
            config,
        })
    }

    /// Spawn the event loop
    ///
    /// Startup loads settings and the exchange rate, attaches observers,
    /// runs the initial full scan and starts looking for the lightbox panel.
    pub fn start(self) -> EngineHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(EngineLoop::new(self, rx).run());
        EngineHandle::new(tx, task)
    }
}

/// Cancel-and-reschedule: a timer of each kind is outstanding at most once
fn arm(timer: &mut Timer, after: Duration) {
    let deadline = Instant::now() + after;
    if let Some(sleep) = timer.as_mut() {
        sleep.as_mut().reset(deadline);
    } else {
        *timer = Some(Box::pin(tokio::time::sleep_until(deadline)));
    }
}

/// Resolve when the timer elapses and disarm it; pend forever when disarmed
async fn fire(timer: &mut Timer) {
    if let Some(sleep) = timer.as_mut() {
        sleep.as_mut().await;
        *timer = None;
    } else {
        std::future::pending::<()>().await;
    }
}

async fn recv_observer(observer: Option<&mut MutationObserver>) -> Option<MutationRecord> {
    match observer {
        Some(observer) => observer.recv().await,
        None => std::future::pending().await,
    }
}

struct EngineLoop {
    doc: SharedDocument,
    collaborators: Arc<dyn Collaborators>,
    inliner: Arc<dyn ThumbnailInliner>,
    config: Config,
    events: mpsc::UnboundedReceiver<EngineEvent>,

    scheduler: ScanScheduler,
    scan_observer: Option<MutationObserver>,
    overlay: OverlaySync,

    scan_timer: Timer,
    overlay_timer: Timer,
    poll_timer: Timer,

    activations: JoinSet<Result<bool>>,
    formatter: PriceFormatter,
    /// Last detail descriptor, reused by the overlay shape
    cached_detail: Option<ItemDescriptor>,
    /// Control button -> item it was built for
    registry: HashMap<NodeId, ItemDescriptor>,
    stats: EngineStats,
}

impl EngineLoop {
    fn new(engine: Engine, events: mpsc::UnboundedReceiver<EngineEvent>) -> Self {
        Self {
            scheduler: ScanScheduler::new(engine.config.max_dirty_roots),
            doc: engine.doc,
            collaborators: engine.collaborators,
            inliner: engine.inliner,
            config: engine.config,
            events,
            scan_observer: None,
            overlay: OverlaySync::new(),
            scan_timer: None,
            overlay_timer: None,
            poll_timer: None,
            activations: JoinSet::new(),
            formatter: PriceFormatter::native_only(),
            cached_detail: None,
            registry: HashMap::new(),
            stats: EngineStats::default(),
        }
    }

    async fn run(mut self) -> EngineStats {
        if let Err(e) = self.startup().await {
            warn!("Engine startup aborted: {}", e);
            self.teardown("startup failed").await;
            return self.stats;
        }

        loop {
            tokio::select! {
                event = self.events.recv() => match event {
                    Some(EngineEvent::Activate(button)) => self.activate(button).await,
                    Some(EngineEvent::ConfigChanged) => {
                        if let Err(e) = self.apply_settings().await {
                            warn!("Host context invalidated while reloading settings: {}", e);
                            self.teardown("context invalidated").await;
                            break;
                        }
                    }
                    Some(EngineEvent::ContextInvalidated) => {
                        warn!("Host context invalidated");
                        self.teardown("context invalidated").await;
                        break;
                    }
                    Some(EngineEvent::Shutdown) | None => {
                        self.teardown("shutdown").await;
                        break;
                    }
                },
                Some(record) = recv_observer(self.scan_observer.as_mut()) => {
                    self.on_scan_record(record).await;
                }
                Some(record) = recv_observer(self.overlay.body.as_mut()) => {
                    self.on_overlay_record(record).await;
                }
                Some(record) = recv_observer(self.overlay.panel.as_mut()) => {
                    self.on_overlay_record(record).await;
                }
                _ = fire(&mut self.scan_timer) => self.flush().await,
                _ = fire(&mut self.overlay_timer) => self.reconcile_overlay().await,
                _ = fire(&mut self.poll_timer) => self.poll_panel().await,
                Some(joined) = self.activations.join_next(), if !self.activations.is_empty() => {
                    match joined {
                        Ok(Ok(true)) => self.stats.items_added += 1,
                        Ok(Ok(false)) => {}
                        Ok(Err(e)) if e.is_context_invalidated() => {
                            warn!("Host context invalidated during activation: {}", e);
                            self.teardown("context invalidated").await;
                            break;
                        }
                        Ok(Err(e)) => warn!("Activation failed: {}", e),
                        Err(e) if e.is_cancelled() => {}
                        Err(e) => warn!("Activation task panicked: {}", e),
                    }
                }
            }
        }

        info!(
            "Engine stopped after {} flushes, {} controls injected",
            self.stats.flushes, self.stats.controls_injected
        );
        self.stats
    }

    #[instrument(skip(self))]
    async fn startup(&mut self) -> Result<()> {
        self.apply_settings().await?;

        let doc = self.doc.clone();
        let mut guard = doc.write().await;
        let doc = &mut *guard;

        let root = doc.document_node();
        self.scan_observer = Some(doc.observe(root, ObserveOptions::child_list_subtree()));
        self.overlay.attach_body(doc);

        self.scheduler.request_full_rescan();
        self.flush_locked(doc);
        self.sync_panel(doc);

        info!("Engine started on {}", doc.url());
        Ok(())
    }

    /// Reload settings and rate, then relabel live controls
    ///
    /// Only host invalidation is returned; other failures fall back to
    /// defaults.
    async fn apply_settings(&mut self) -> Result<()> {
        let settings = match self.collaborators.get_settings().await {
            Ok(settings) => settings,
            Err(e) if e.is_context_invalidated() => return Err(e),
            Err(e) => {
                warn!("Failed to load settings, using defaults: {}", e);
                Settings::default()
            }
        };

        let rate = if settings.target_currency.eq_ignore_ascii_case(NATIVE_CURRENCY) {
            None
        } else {
            match self.collaborators.get_rate(&settings.target_currency).await {
                Ok(rate) => rate,
                Err(e) if e.is_context_invalidated() => return Err(e),
                Err(e) => {
                    warn!("Failed to load {} rate: {}", settings.target_currency, e);
                    None
                }
            }
        };

        let formatter = PriceFormatter::new(&settings, rate.as_ref());
        if formatter != self.formatter {
            self.formatter = formatter;
            let updated = refresh_prices(&mut *self.doc.write().await, &self.formatter);
            debug!("Settings applied, {} controls relabeled", updated);
        }
        Ok(())
    }

    async fn on_scan_record(&mut self, first: MutationRecord) {
        let mut records = vec![first];
        if let Some(observer) = self.scan_observer.as_mut() {
            records.extend(observer.drain());
        }

        let doc = self.doc.read().await;
        let mut armed = false;
        for record in &records {
            armed |= self.scheduler.record(&doc, record);
        }
        drop(doc);

        if armed {
            arm(&mut self.scan_timer, self.config.scan_debounce());
        }
    }

    async fn on_overlay_record(&mut self, record: MutationRecord) {
        if is_signal(&*self.doc.read().await, &record) {
            arm(&mut self.overlay_timer, self.config.overlay_debounce());
        }
    }

    async fn flush(&mut self) {
        let doc = self.doc.clone();
        let mut guard = doc.write().await;
        self.flush_locked(&mut guard);
        if self.overlay.release_if_detached(&mut guard) {
            debug!("Lightbox panel detached, resuming panel polling");
            arm(&mut self.poll_timer, self.config.overlay_poll());
        }
    }

    /// Run one scheduled flush against a locked document
    #[instrument(skip(self, doc))]
    fn flush_locked(&mut self, doc: &mut Document) {
        let Some(plan) = self.scheduler.begin_flush() else {
            return;
        };
        self.stats.flushes += 1;
        let root = doc.document_node();

        let injected = match plan {
            FlushPlan::Full => {
                self.stats.full_rescans += 1;
                PageShape::ALL
                    .iter()
                    .map(|&shape| self.run_shape(doc, shape, root))
                    .sum::<usize>()
            }
            FlushPlan::Targeted(roots) => {
                let mut injected = 0;
                for dirty in roots {
                    if !doc.is_connected(dirty) {
                        continue;
                    }
                    self.stats.targeted_roots += 1;
                    for shape in PageShape::SCOPED {
                        injected += self.run_shape(doc, shape, dirty);
                    }
                }
                for shape in PageShape::UNSCOPED {
                    injected += self.run_shape(doc, shape, root);
                }
                injected
            }
        };

        self.prune_registry(doc);
        self.scheduler.finish_flush();
        if injected > 0 {
            debug!("Flush injected {} controls", injected);
        }
    }

    /// Forget controls the host has removed from the page
    fn prune_registry(&mut self, doc: &Document) {
        let before = self.registry.len();
        self.registry.retain(|&button, _| doc.is_connected(button));
        let pruned = before - self.registry.len();
        if pruned > 0 {
            debug!("Dropped {} detached controls", pruned);
        }
    }

    /// Detect one shape under `root` and inject its controls
    fn run_shape(&mut self, doc: &mut Document, shape: PageShape, root: NodeId) -> usize {
        let ctx = DetectContext {
            min_inline_image_bytes: self.config.min_inline_image_bytes,
            cached_detail: self.cached_detail.as_ref(),
        };
        let detections = shape.detect(doc, root, &ctx);

        let mut injected = 0;
        for detection in detections {
            if shape == PageShape::Detail {
                self.cached_detail = Some(detection.descriptor.clone());
            }
            if let Some(button) = inject(
                doc,
                detection.element,
                &detection.descriptor,
                shape.variant(),
                &self.formatter,
            ) {
                self.registry.insert(button, detection.descriptor);
                injected += 1;
            }
        }

        self.stats.controls_injected += injected;
        injected
    }

    #[instrument(skip(self))]
    async fn reconcile_overlay(&mut self) {
        let doc = self.doc.clone();
        let mut guard = doc.write().await;
        let doc = &mut *guard;

        if self.overlay.release_if_detached(doc) {
            arm(&mut self.poll_timer, self.config.overlay_poll());
        }
        if reconcile_purchase_bar(doc) {
            let root = doc.document_node();
            self.run_shape(doc, PageShape::Overlay, root);
            self.refresh_overlay_thumbnail(doc);
        }
    }

    /// Point the overlay control at the image the lightbox now shows
    fn refresh_overlay_thumbnail(&mut self, doc: &Document) {
        let Some(panel) = find_panel(doc).filter(|&panel| is_marked(doc, panel)) else {
            return;
        };
        let thumbnail = visible_thumbnail(doc, panel, self.config.min_inline_image_bytes);
        if thumbnail.is_empty() {
            return;
        }
        let Some(button) = doc.query(panel, &controls::BUTTON) else {
            return;
        };
        if let Some(descriptor) = self.registry.get_mut(&button) {
            if descriptor.thumbnail_ref != thumbnail {
                debug!("Lightbox image changed to {}", thumbnail);
                descriptor.thumbnail_ref = thumbnail;
            }
        }
    }

    async fn poll_panel(&mut self) {
        let doc = self.doc.clone();
        let mut guard = doc.write().await;
        self.sync_panel(&mut guard);
    }

    fn sync_panel(&mut self, doc: &mut Document) {
        match self.overlay.poll_panel(doc) {
            PanelPoll::Attached => arm(&mut self.overlay_timer, self.config.overlay_debounce()),
            PanelPoll::Watching => {}
            PanelPoll::Missing => arm(&mut self.poll_timer, self.config.overlay_poll()),
        }
    }

    async fn activate(&mut self, button: NodeId) {
        let Some(descriptor) = self.registry.get(&button).cloned() else {
            debug!("No control registered for {}", button);
            let doc = self.doc.clone();
            self.prune_registry(&*doc.read().await);
            return;
        };
        if !claim(&mut *self.doc.write().await, button) {
            debug!("Ignoring activation of busy control {}", button);
            return;
        }

        let ctx = ActivationContext {
            doc: self.doc.clone(),
            collaborators: self.collaborators.clone(),
            inliner: self.inliner.clone(),
            flash: self.config.success_flash(),
        };
        self.activations.spawn(complete(ctx, button, descriptor));
    }

    /// Drop every observer, timer, task and cache; injected controls stay
    async fn teardown(&mut self, reason: &str) {
        {
            let mut doc = self.doc.write().await;
            if let Some(observer) = self.scan_observer.take() {
                doc.disconnect(observer.id());
            }
            self.overlay.detach(&mut doc);
        }

        self.scan_timer = None;
        self.overlay_timer = None;
        self.poll_timer = None;
        self.activations.abort_all();
        self.scheduler.clear();
        self.cached_detail = None;
        self.stats.live_controls = self.registry.len();
        self.registry.clear();

        info!("Engine torn down: {}", reason);
    }
}

impl EngineHandle {
    /// Queue an activation of the control whose button is `button`
    pub fn activate(&self, button: NodeId) -> Result<()> {
        self.send(EngineEvent::Activate(button))
    }

    /// Settings or rates changed outside the page
    pub fn config_changed(&self) -> Result<()> {
        self.send(EngineEvent::ConfigChanged)
    }

    /// The hosting context went away
    pub fn invalidate(&self) -> Result<()> {
        self.send(EngineEvent::ContextInvalidated)
    }

    fn send(&self, event: EngineEvent) -> Result<()> {
        self.tx
            .send(event)
            .map_err(|_| Error::channel("engine loop has stopped"))
    }

    /// Whether the event loop has exited
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Shut the engine down and wait for its loop to exit
    pub async fn stop(self) -> Result<EngineStats> {
        // The loop may already have exited after an invalidation
        let _ = self.tx.send(EngineEvent::Shutdown);
        self.task
            .await
            .map_err(|e| Error::internal(format!("engine task failed: {}", e)))
    }
}
