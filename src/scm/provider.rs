//! ClearCase source-control provider.
//!
//! Owns the three resource groups, refreshes them from `cleartool` listings,
//! and republishes the badge count. Refreshes are triggered at open, by
//! workspace file changes, and by the command dispatcher after mutating
//! actions.

use std::path::Path;
use std::sync::Arc;

use futures_util::StreamExt;
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::clearcase::{ClearCaseClient, ClearCaseError};
use crate::process::LogSink;
use crate::watcher::WorkspaceChange;

use super::{DedupPolicy, GroupSnapshot, ResourceAccumulator, ResourceGroup, TrackedResource};

/// Context key the host uses for this provider.
pub const CONTEXT_KEY: &str = "clearcase";

/// Display label of the provider.
pub const PROVIDER_LABEL: &str = "ClearCase";

/// Command bound to the host's commit input box.
pub const ACCEPT_INPUT_COMMAND: &str = "clearcase.checkin";

/// The three groups a provider owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupKind {
    CheckedOut,
    Elements,
    ViewPrivate,
}

impl GroupKind {
    /// Refresh order.
    pub const ALL: [Self; 3] = [Self::CheckedOut, Self::Elements, Self::ViewPrivate];

    #[must_use]
    pub fn id(self) -> &'static str {
        match self {
            Self::CheckedOut => "checkedouts",
            Self::Elements => "elements",
            Self::ViewPrivate => "viewprivate",
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::CheckedOut => "Checked Out Elements",
            Self::Elements => "Elements",
            Self::ViewPrivate => "View Private Files",
        }
    }
}

/// Provider behaviour switches.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProviderOptions {
    /// Collapse checked-out entries that repeat a path.
    pub dedupe_checked_outs: bool,
}

/// Synchronises resource groups with the state of the view.
#[derive(Debug)]
pub struct ScmProvider {
    client: ClearCaseClient,
    options: ProviderOptions,
    checked_outs: ResourceGroup,
    elements: ResourceGroup,
    view_privates: ResourceGroup,
    count_tx: watch::Sender<usize>,
    cancel: CancellationToken,
}

impl ScmProvider {
    /// Create a provider with empty, stale groups.
    #[must_use]
    pub fn new(client: ClearCaseClient, options: ProviderOptions) -> Self {
        let (count_tx, _) = watch::channel(0);
        Self {
            client,
            options,
            checked_outs: ResourceGroup::new(
                GroupKind::CheckedOut.id(),
                GroupKind::CheckedOut.label(),
            ),
            elements: ResourceGroup::new(GroupKind::Elements.id(), GroupKind::Elements.label()),
            view_privates: ResourceGroup::new(
                GroupKind::ViewPrivate.id(),
                GroupKind::ViewPrivate.label(),
            ),
            count_tx,
            cancel: CancellationToken::new(),
        }
    }

    /// Create a provider and run the initial refresh.
    ///
    /// A failed initial refresh is logged; the provider is still returned.
    pub async fn open(client: ClearCaseClient, options: ProviderOptions) -> Arc<Self> {
        let provider = Arc::new(Self::new(client, options));
        provider.refresh().await;
        provider
    }

    #[must_use]
    pub fn client(&self) -> &ClearCaseClient {
        &self.client
    }

    #[must_use]
    pub fn workspace_root(&self) -> &Path {
        self.client.workspace_root()
    }

    fn log(&self) -> &Arc<dyn LogSink> {
        self.client.log()
    }

    #[must_use]
    pub fn group(&self, kind: GroupKind) -> &ResourceGroup {
        match kind {
            GroupKind::CheckedOut => &self.checked_outs,
            GroupKind::Elements => &self.elements,
            GroupKind::ViewPrivate => &self.view_privates,
        }
    }

    /// Snapshots of every group, in refresh order.
    #[must_use]
    pub fn snapshots(&self) -> Vec<(GroupKind, GroupSnapshot)> {
        GroupKind::ALL
            .into_iter()
            .map(|kind| (kind, self.group(kind).snapshot()))
            .collect()
    }

    /// Badge count: the number of checked-out resources.
    #[must_use]
    pub fn count(&self) -> usize {
        *self.count_tx.borrow()
    }

    #[must_use]
    pub fn subscribe_count(&self) -> watch::Receiver<usize> {
        self.count_tx.subscribe()
    }

    fn update_count(&self) {
        let count = self.checked_outs.len();
        self.count_tx.send_if_modified(|current| {
            let changed = *current != count;
            *current = count;
            changed
        });
    }

    /// Refresh every group, stopping at the first failure. A disposed
    /// provider does nothing.
    ///
    /// # Errors
    ///
    /// Returns the listing error; groups not yet refreshed keep their
    /// previous contents.
    pub async fn refresh_all(&self) -> Result<(), ClearCaseError> {
        if self.is_disposed() {
            return Ok(());
        }
        for kind in GroupKind::ALL {
            self.refresh_group(kind).await?;
        }
        Ok(())
    }

    /// Refresh every group and log any failure instead of returning it.
    ///
    /// Returns whether all groups refreshed.
    pub async fn refresh(&self) -> bool {
        match self.refresh_all().await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "Resource group refresh failed");
                self.log().append_line(&e.to_string());
                false
            }
        }
    }

    /// Refresh a single group and republish the badge count.
    ///
    /// Returns the number of resources published.
    ///
    /// # Errors
    ///
    /// Returns the listing error; the group keeps its previous contents and
    /// is marked stale. A disposed provider publishes nothing.
    pub async fn refresh_group(&self, kind: GroupKind) -> Result<usize, ClearCaseError> {
        if self.is_disposed() {
            return Ok(0);
        }
        let group = self.group(kind);
        group.begin_refresh();
        match self.collect(kind).await {
            Ok(_) if self.is_disposed() => {
                tracing::debug!(
                    group = group.id(),
                    "Provider disposed mid-refresh, listing dropped"
                );
                group.clear();
                Ok(0)
            }
            Ok(resources) => {
                let count = resources.len();
                group.publish(resources);
                self.update_count();
                Ok(count)
            }
            Err(e) => {
                group.mark_stale();
                Err(e)
            }
        }
    }

    async fn collect(&self, kind: GroupKind) -> Result<Vec<TrackedResource>, ClearCaseError> {
        let root = self.workspace_root();
        let (mut batches, policy) = match kind {
            GroupKind::CheckedOut => (
                self.client.list_checked_outs()?,
                if self.options.dedupe_checked_outs {
                    DedupPolicy::ByPath
                } else {
                    DedupPolicy::KeepAll
                },
            ),
            GroupKind::Elements => (self.client.list_elements()?, DedupPolicy::ByPath),
            GroupKind::ViewPrivate => (
                self.client.list_view_privates().await?,
                DedupPolicy::ByPath,
            ),
        };
        let parse = |line: &str| match kind {
            GroupKind::Elements => TrackedResource::from_element_line(root, line),
            GroupKind::CheckedOut | GroupKind::ViewPrivate => {
                TrackedResource::from_path_line(root, line)
            }
        };

        let mut accumulator = ResourceAccumulator::new(policy);
        while let Some(batch) = batches.next().await {
            for line in &batch {
                accumulator.push(parse(line.as_str()));
            }
        }
        batches.finish().await?;
        Ok(accumulator.into_resources())
    }

    /// Refresh once per workspace change until the channel closes or the
    /// provider is disposed.
    ///
    /// Each change starts its own refresh; overlapping refreshes are not
    /// serialised and the last one to finish wins.
    pub fn spawn_watch_loop(
        self: &Arc<Self>,
        mut changes: mpsc::UnboundedReceiver<WorkspaceChange>,
    ) -> JoinHandle<()> {
        let provider = Arc::clone(self);
        let cancel = self.cancel.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    () = cancel.cancelled() => break,
                    change = changes.recv() => {
                        let Some(change) = change else { break };
                        tracing::debug!(
                            kind = ?change.kind,
                            paths = change.paths.len(),
                            "Workspace changed, refreshing"
                        );
                        let provider = Arc::clone(&provider);
                        tokio::spawn(async move {
                            provider.refresh().await;
                        });
                    }
                }
            }
            tracing::debug!("Workspace watch loop stopped");
        })
    }

    /// Whether [`Self::dispose`] has been called.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Stop the watch loop and empty every group.
    pub fn dispose(&self) {
        self.cancel.cancel();
        for kind in GroupKind::ALL {
            self.group(kind).clear();
        }
        self.count_tx.send_replace(0);
        tracing::debug!("Provider disposed");
    }
}
