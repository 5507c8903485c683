//! Mutation records and observer registrations
//!
//! Observers receive one `MutationRecord` per tree change over an unbounded
//! tokio channel, in the order the changes were applied.

use tokio::sync::mpsc;

use super::tree::NodeId;

/// Observer registration ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(pub(crate) u64);

/// What changed
#[derive(Debug, Clone, PartialEq)]
pub enum MutationKind {
    /// Children were attached to or detached from the target
    ChildList {
        added: Vec<NodeId>,
        removed: Vec<NodeId>,
    },
    /// An attribute of the target changed
    Attributes {
        name: String,
        old_value: Option<String>,
    },
}

/// One observed change
#[derive(Debug, Clone, PartialEq)]
pub struct MutationRecord {
    /// Node whose children or attributes changed
    pub target: NodeId,
    /// Change details
    pub kind: MutationKind,
}

impl MutationRecord {
    /// Nodes touched by this change: the target and every newly attached node
    pub fn touched(&self) -> impl Iterator<Item = NodeId> + '_ {
        let added: &[NodeId] = match &self.kind {
            MutationKind::ChildList { added, .. } => added,
            MutationKind::Attributes { .. } => &[],
        };
        std::iter::once(self.target).chain(added.iter().copied())
    }

    /// Newly attached nodes, empty for attribute changes
    pub fn added(&self) -> &[NodeId] {
        match &self.kind {
            MutationKind::ChildList { added, .. } => added,
            MutationKind::Attributes { .. } => &[],
        }
    }
}

/// Observation options
#[derive(Debug, Clone, Default)]
pub struct ObserveOptions {
    /// Report child additions and removals
    pub child_list: bool,
    /// Report attribute changes
    pub attributes: bool,
    /// Restrict attribute reports to these names
    pub attribute_filter: Option<Vec<String>>,
    /// Include changes anywhere below the target
    pub subtree: bool,
}

impl ObserveOptions {
    /// Child list changes anywhere in the subtree
    pub fn child_list_subtree() -> Self {
        Self {
            child_list: true,
            subtree: true,
            ..Default::default()
        }
    }

    /// Changes to the named attributes of the target only
    pub fn attributes<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            attributes: true,
            attribute_filter: Some(names.into_iter().map(Into::into).collect()),
            ..Default::default()
        }
    }

    pub(crate) fn wants(&self, kind: &MutationKind) -> bool {
        match kind {
            MutationKind::ChildList { .. } => self.child_list,
            MutationKind::Attributes { name, .. } => {
                self.attributes
                    && self
                        .attribute_filter
                        .as_ref()
                        .map_or(true, |filter| filter.iter().any(|f| f == name))
            }
        }
    }
}

/// Registered observer as held by the document
#[derive(Debug)]
pub(crate) struct Registration {
    pub(crate) id: ObserverId,
    pub(crate) target: NodeId,
    pub(crate) options: ObserveOptions,
    pub(crate) tx: mpsc::UnboundedSender<MutationRecord>,
}

/// Receiving side of an observer registration
#[derive(Debug)]
pub struct MutationObserver {
    id: ObserverId,
    target: NodeId,
    rx: mpsc::UnboundedReceiver<MutationRecord>,
}

impl MutationObserver {
    pub(crate) fn new(
        id: ObserverId,
        target: NodeId,
        rx: mpsc::UnboundedReceiver<MutationRecord>,
    ) -> Self {
        Self { id, target, rx }
    }

    /// Registration ID, used to disconnect
    pub fn id(&self) -> ObserverId {
        self.id
    }

    /// Observed node
    pub fn target(&self) -> NodeId {
        self.target
    }

    /// Wait for the next record; `None` once disconnected and drained
    pub async fn recv(&mut self) -> Option<MutationRecord> {
        self.rx.recv().await
    }

    /// Take every record already queued
    pub fn drain(&mut self) -> Vec<MutationRecord> {
        let mut records = Vec::new();
        while let Ok(record) = self.rx.try_recv() {
            records.push(record);
        }
        records
    }
}
