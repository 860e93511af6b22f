//! Resource groups published to the host.

use std::collections::HashSet;
use std::path::PathBuf;

use serde::Serialize;
use tokio::sync::watch;

use super::TrackedResource;

/// Refresh state of one group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupState {
    /// Never refreshed, or the last refresh failed.
    #[default]
    Stale,
    Refreshing,
    Fresh,
}

/// What the host sees of a group at one instant.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GroupSnapshot {
    pub state: GroupState,
    pub resources: Vec<TrackedResource>,
}

/// How duplicate entries are handled while accumulating a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DedupPolicy {
    /// Keep every entry the tool printed.
    KeepAll,
    /// Keep the first entry for each path.
    ByPath,
}

/// Working buffer for one refresh.
#[derive(Debug)]
pub struct ResourceAccumulator {
    resources: Vec<TrackedResource>,
    seen: Option<HashSet<PathBuf>>,
}

impl ResourceAccumulator {
    #[must_use]
    pub fn new(policy: DedupPolicy) -> Self {
        Self {
            resources: Vec::new(),
            seen: match policy {
                DedupPolicy::KeepAll => None,
                DedupPolicy::ByPath => Some(HashSet::new()),
            },
        }
    }

    /// Append `resource` unless the policy rejects it as a duplicate.
    pub fn push(&mut self, resource: TrackedResource) {
        if let Some(seen) = &mut self.seen {
            if !seen.insert(resource.path().to_path_buf()) {
                return;
            }
        }
        self.resources.push(resource);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    #[must_use]
    pub fn into_resources(self) -> Vec<TrackedResource> {
        self.resources
    }
}

/// A named, ordered list of resources with "hide when empty" semantics.
///
/// Contents are only ever replaced wholesale.
#[derive(Debug)]
pub struct ResourceGroup {
    id: &'static str,
    label: &'static str,
    hide_when_empty: bool,
    tx: watch::Sender<GroupSnapshot>,
}

impl ResourceGroup {
    #[must_use]
    pub fn new(id: &'static str, label: &'static str) -> Self {
        let (tx, _) = watch::channel(GroupSnapshot::default());
        Self {
            id,
            label,
            hide_when_empty: true,
            tx,
        }
    }

    #[must_use]
    pub fn id(&self) -> &'static str {
        self.id
    }

    #[must_use]
    pub fn label(&self) -> &'static str {
        self.label
    }

    #[must_use]
    pub fn hide_when_empty(&self) -> bool {
        self.hide_when_empty
    }

    pub fn set_hide_when_empty(&mut self, hide: bool) {
        self.hide_when_empty = hide;
    }

    /// Whether the host should show the group at all.
    #[must_use]
    pub fn is_visible(&self) -> bool {
        !(self.hide_when_empty && self.is_empty())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tx.borrow().resources.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn state(&self) -> GroupState {
        self.tx.borrow().state
    }

    /// Clone of the published resources.
    #[must_use]
    pub fn resources(&self) -> Vec<TrackedResource> {
        self.tx.borrow().resources.clone()
    }

    #[must_use]
    pub fn snapshot(&self) -> GroupSnapshot {
        self.tx.borrow().clone()
    }

    /// Receiver notified on every state or content change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<GroupSnapshot> {
        self.tx.subscribe()
    }

    pub(crate) fn begin_refresh(&self) {
        self.set_state(GroupState::Refreshing);
    }

    /// Swap in new contents and mark the group fresh.
    pub(crate) fn publish(&self, resources: Vec<TrackedResource>) {
        tracing::debug!(group = self.id, count = resources.len(), "Publishing group");
        self.tx.send_replace(GroupSnapshot {
            state: GroupState::Fresh,
            resources,
        });
    }

    /// Mark the group stale, keeping whatever was last published.
    pub(crate) fn mark_stale(&self) {
        self.set_state(GroupState::Stale);
    }

    pub(crate) fn clear(&self) {
        self.tx.send_replace(GroupSnapshot::default());
    }

    fn set_state(&self, state: GroupState) {
        self.tx.send_modify(|snapshot| snapshot.state = state);
    }
}
