//! Dirty-root accumulation for incremental scans
//!
//! Mutation records mark the nearest element of every touched node dirty.
//! Touches on the document, `html` or `body` escalate to a full rescan, and
//! so does overflowing the dirty set. The flag is only cleared by a flush.

use std::collections::HashSet;

use tracing::{debug, trace};

use crate::detect::is_engine_owned;
use crate::dom::{Document, MutationRecord, NodeId};

/// Scheduler state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// Nothing pending
    Idle,
    /// Dirty roots queued, waiting for the debounce timer
    Accumulating,
    /// A flush is running
    Flushing,
}

/// Work handed to a flush
#[derive(Debug, Clone, PartialEq)]
pub enum FlushPlan {
    /// Run every shape against the whole document
    Full,
    /// Run scoped shapes against each root, in insertion order
    Targeted(Vec<NodeId>),
}

/// Ordered, bounded set of dirty roots plus the full-rescan flag
#[derive(Debug, Clone)]
pub struct DirtyRoots {
    roots: Vec<NodeId>,
    seen: HashSet<NodeId>,
    full_rescan: bool,
    capacity: usize,
}

impl DirtyRoots {
    pub fn new(capacity: usize) -> Self {
        Self {
            roots: Vec::new(),
            seen: HashSet::new(),
            full_rescan: false,
            capacity,
        }
    }

    /// Queue `node`; returns `false` when it was already queued or superseded
    pub fn insert(&mut self, node: NodeId) -> bool {
        if self.full_rescan || !self.seen.insert(node) {
            return false;
        }
        self.roots.push(node);
        if self.roots.len() > self.capacity {
            debug!("Dirty set exceeded {} roots, collapsing to full rescan", self.capacity);
            self.escalate();
        }
        true
    }

    /// Replace any queued roots with a full rescan
    pub fn escalate(&mut self) {
        self.full_rescan = true;
        self.roots.clear();
        self.seen.clear();
    }

    pub fn is_full_rescan(&self) -> bool {
        self.full_rescan
    }

    pub fn len(&self) -> usize {
        self.roots.len()
    }

    pub fn is_empty(&self) -> bool {
        !self.full_rescan && self.roots.is_empty()
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    /// Hand out the pending work and reset
    fn take(&mut self) -> Option<FlushPlan> {
        if self.full_rescan {
            self.clear();
            return Some(FlushPlan::Full);
        }
        if self.roots.is_empty() {
            return None;
        }
        self.seen.clear();
        Some(FlushPlan::Targeted(std::mem::take(&mut self.roots)))
    }

    pub fn clear(&mut self) {
        self.roots.clear();
        self.seen.clear();
        self.full_rescan = false;
    }
}

/// Scan scheduler state machine: `Idle -> Accumulating -> Flushing -> Idle`
///
/// Debouncing is owned by the caller: every `record` returning `true`
/// should reset the debounce timer, and the timer firing calls `begin_flush`.
#[derive(Debug)]
pub struct ScanScheduler {
    state: SchedulerState,
    dirty: DirtyRoots,
}

impl ScanScheduler {
    pub fn new(max_dirty_roots: usize) -> Self {
        Self {
            state: SchedulerState::Idle,
            dirty: DirtyRoots::new(max_dirty_roots),
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn dirty(&self) -> &DirtyRoots {
        &self.dirty
    }

    /// Record one mutation; `true` when it should (re)arm the debounce timer
    ///
    /// Changes made entirely inside engine-owned controls are ignored.
    pub fn record(&mut self, doc: &Document, record: &MutationRecord) -> bool {
        if is_engine_owned(doc, record.target) {
            trace!("Ignoring mutation inside control {}", record.target);
            return false;
        }
        let added = record.added();
        if !added.is_empty() && added.iter().all(|&node| is_engine_owned(doc, node)) {
            trace!("Ignoring injected control under {}", record.target);
            return false;
        }

        for node in record.touched() {
            if doc.is_page_level(node) {
                self.dirty.escalate();
                continue;
            }
            if let Some(element) = doc.nearest_element(node) {
                if doc.is_page_level(element) {
                    self.dirty.escalate();
                } else {
                    self.dirty.insert(element);
                }
            }
        }

        if self.state == SchedulerState::Idle {
            self.state = SchedulerState::Accumulating;
        }
        true
    }

    /// Queue a full rescan, used at startup
    pub fn request_full_rescan(&mut self) {
        self.dirty.escalate();
        if self.state == SchedulerState::Idle {
            self.state = SchedulerState::Accumulating;
        }
    }

    /// Enter `Flushing` and take the pending work
    ///
    /// Returns `None` when a flush is already running or nothing is queued.
    pub fn begin_flush(&mut self) -> Option<FlushPlan> {
        if self.state == SchedulerState::Flushing {
            debug!("Flush already in flight, skipping");
            return None;
        }
        match self.dirty.take() {
            Some(plan) => {
                self.state = SchedulerState::Flushing;
                Some(plan)
            }
            None => {
                self.state = SchedulerState::Idle;
                None
            }
        }
    }

    /// Leave `Flushing`; stays armed if work arrived meanwhile
    pub fn finish_flush(&mut self) {
        self.state = if self.dirty.is_empty() {
            SchedulerState::Idle
        } else {
            SchedulerState::Accumulating
        };
    }

    /// Drop all pending work
    pub fn clear(&mut self) {
        self.dirty.clear();
        self.state = SchedulerState::Idle;
    }
}
