//! # Augmentation engine
//!
//! Keeps purchase controls consistent with a page the host keeps rewriting.
//!
//! ## Architecture
//!
//! ```text
//! host mutation ──► scan observer ──► ScanScheduler (dirty roots / full rescan)
//!                                            │ debounce
//!                                            ▼
//!                          flush: PageShape::detect ──► inject
//!
//! body / panel attributes ──► overlay observers ──► reconcile purchase bar
//!
//! EngineHandle ──► EngineEvent ──► activation tasks (JoinSet)
//! ```
//!
//! Everything runs on one task; see `lifecycle` for the loop.
//!
//! ## Module structure
//! - `scheduler`: dirty-root accumulation and the flush state machine
//! - `overlay`: lightbox observers and purchase-bar reconcile
//! - `lifecycle`: `Engine`, the event loop and teardown

pub mod scheduler;
pub mod overlay;
pub mod lifecycle;


use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::dom::NodeId;

pub use lifecycle::Engine;
pub use overlay::{reconcile_purchase_bar, OverlaySync, PanelPoll};
pub use scheduler::{DirtyRoots, FlushPlan, ScanScheduler, SchedulerState};

/// Events consumed by the engine loop
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// A control button was clicked
    Activate(NodeId),
    /// Settings or exchange rates changed
    ConfigChanged,
    /// The hosting context is gone; tear down without retrying
    ContextInvalidated,
    /// Stop the engine
    Shutdown,
}

/// Counters reported when the engine stops
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineStats {
    pub flushes: u64,
    pub full_rescans: u64,
    /// Attached dirty roots scanned by targeted flushes
    pub targeted_roots: u64,
    pub controls_injected: usize,
    /// Controls still attached and registered at teardown
    pub live_controls: usize,
    /// Activations the cart accepted
    pub items_added: u64,
}

/// Handle to a running engine
#[derive(Debug)]
pub struct EngineHandle {
    tx: mpsc::UnboundedSender<EngineEvent>,
    task: JoinHandle<EngineStats>,
}

impl EngineHandle {
    fn new(tx: mpsc::UnboundedSender<EngineEvent>, task: JoinHandle<EngineStats>) -> Self {
        Self { tx, task }
    }
}
