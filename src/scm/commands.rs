//! User actions and their dispatch to the ClearCase client.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;

use crate::clearcase::ClearCaseError;

use super::{ScmProvider, TrackedResource};

/// A user-invokable source-control action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    CheckOut,
    CheckIn,
    UndoCheckOut,
    ShowVersionTree,
    MakeElement,
}

impl Action {
    /// Command identifier of this action.
    #[must_use]
    pub fn id(self) -> &'static str {
        COMMANDS
            .iter()
            .find(|entry| entry.action == self)
            .map_or("", |entry| entry.id)
    }

    /// Whether the resource groups are refreshed after the action succeeds.
    #[must_use]
    pub fn refreshes(self) -> bool {
        !matches!(self, Self::ShowVersionTree)
    }
}

/// One row of the command table.
#[derive(Debug, Clone, Copy)]
pub struct CommandEntry {
    pub id: &'static str,
    pub title: &'static str,
    pub action: Action,
}

/// Every command the provider contributes to the host.
pub const COMMANDS: &[CommandEntry] = &[
    CommandEntry {
        id: "clearcase.checkout",
        title: "Check Out",
        action: Action::CheckOut,
    },
    CommandEntry {
        id: "clearcase.checkin",
        title: "Check In",
        action: Action::CheckIn,
    },
    CommandEntry {
        id: "clearcase.undocheckout",
        title: "Undo Check Out",
        action: Action::UndoCheckOut,
    },
    CommandEntry {
        id: "clearcase.lsvtree",
        title: "Show Version Tree",
        action: Action::ShowVersionTree,
    },
    CommandEntry {
        id: "clearcase.mkelem",
        title: "Make Element",
        action: Action::MakeElement,
    },
];

/// Find the action registered under `id`.
#[must_use]
pub fn lookup_command(id: &str) -> Option<Action> {
    COMMANDS
        .iter()
        .find(|entry| entry.id == id)
        .map(|entry| entry.action)
}

/// Host-side inputs the dispatcher needs.
#[async_trait]
pub trait ActionHost: Send + Sync {
    /// File open in the active editor, used when nothing is selected.
    fn active_file(&self) -> Option<PathBuf>;

    /// Check-in comment; empty means no comment.
    async fn commit_comment(&self) -> String;
}

/// Fixed answers, for hosts without interactive input.
#[derive(Debug, Clone, Default)]
pub struct StaticHost {
    pub active_file: Option<PathBuf>,
    pub comment: String,
}

#[async_trait]
impl ActionHost for StaticHost {
    fn active_file(&self) -> Option<PathBuf> {
        self.active_file.clone()
    }

    async fn commit_comment(&self) -> String {
        self.comment.clone()
    }
}

/// What happened to a dispatched action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    /// No selection and no active file.
    Skipped,
    Completed,
    /// The failure was logged; carries its message.
    Failed(String),
}

/// Routes user actions to the client and refreshes afterwards.
///
/// Errors never escape: they are written to the log sink and reported as
/// [`ActionOutcome::Failed`].
pub struct CommandDispatcher {
    provider: Arc<ScmProvider>,
    host: Arc<dyn ActionHost>,
}

impl std::fmt::Debug for CommandDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandDispatcher")
            .field("provider", &self.provider)
            .finish_non_exhaustive()
    }
}

impl CommandDispatcher {
    #[must_use]
    pub fn new(provider: Arc<ScmProvider>, host: Arc<dyn ActionHost>) -> Self {
        Self { provider, host }
    }

    #[must_use]
    pub fn provider(&self) -> &Arc<ScmProvider> {
        &self.provider
    }

    /// Run the command registered under `id`.
    pub async fn execute(&self, id: &str, selection: &[TrackedResource]) -> ActionOutcome {
        match lookup_command(id) {
            Some(action) => self.dispatch(action, selection).await,
            None => {
                let message = format!("Unknown command: {id}");
                tracing::warn!(command = id, "Unknown command");
                self.provider.client().log().append_line(&message);
                ActionOutcome::Failed(message)
            }
        }
    }

    /// Paths an action applies to: the selection, or else the active file.
    #[must_use]
    pub fn resolve_targets(&self, selection: &[TrackedResource]) -> Option<Vec<PathBuf>> {
        if selection.is_empty() {
            return self.host.active_file().map(|path| vec![path]);
        }
        Some(
            selection
                .iter()
                .map(|resource| resource.path().to_path_buf())
                .collect(),
        )
    }

    /// Run `action` on `selection`.
    pub async fn dispatch(&self, action: Action, selection: &[TrackedResource]) -> ActionOutcome {
        let Some(paths) = self.resolve_targets(selection) else {
            tracing::debug!(?action, "No selection or active file, nothing to do");
            return ActionOutcome::Skipped;
        };

        tracing::info!(?action, paths = paths.len(), "Running action");
        let result = match self.invoke(action, &paths).await {
            // The client already logged the stub; the groups still refresh.
            Err(ClearCaseError::Unsupported(operation)) => {
                tracing::debug!(operation, "Unsupported action completed as a no-op");
                Ok(())
            }
            other => other,
        };
        match result {
            Ok(()) => {
                if action.refreshes() {
                    self.provider.refresh().await;
                }
                ActionOutcome::Completed
            }
            Err(e) => {
                let message = e.to_string();
                tracing::warn!(?action, error = %message, "Action failed");
                self.provider.client().log().append_line(&message);
                ActionOutcome::Failed(message)
            }
        }
    }

    async fn invoke(&self, action: Action, paths: &[PathBuf]) -> Result<(), ClearCaseError> {
        let client = self.provider.client();
        match action {
            Action::CheckOut => client.check_out(paths).await,
            Action::CheckIn => {
                let comment = self.host.commit_comment().await;
                client.check_in(paths, &comment).await
            }
            Action::UndoCheckOut => client.undo_check_out(paths).await,
            Action::ShowVersionTree => client.show_version_tree(paths),
            Action::MakeElement => client.mkelem(paths).await,
        }
    }

    pub async fn check_out(&self, selection: &[TrackedResource]) -> ActionOutcome {
        self.dispatch(Action::CheckOut, selection).await
    }

    pub async fn check_in(&self, selection: &[TrackedResource]) -> ActionOutcome {
        self.dispatch(Action::CheckIn, selection).await
    }

    pub async fn undo_check_out(&self, selection: &[TrackedResource]) -> ActionOutcome {
        self.dispatch(Action::UndoCheckOut, selection).await
    }

    pub async fn show_version_tree(&self, selection: &[TrackedResource]) -> ActionOutcome {
        self.dispatch(Action::ShowVersionTree, selection).await
    }

    pub async fn make_element(&self, selection: &[TrackedResource]) -> ActionOutcome {
        self.dispatch(Action::MakeElement, selection).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clearcase::ClearCaseClient;
    use crate::process::{LogSink, MemorySink, ScriptedResponse, ScriptedRunner};
    use crate::scm::{GroupKind, ProviderOptions};

    struct Fixture {
        dispatcher: CommandDispatcher,
        runner: ScriptedRunner,
        sink: MemorySink,
    }

    fn fixture(host: StaticHost) -> Fixture {
        let sink = MemorySink::new();
        let log: Arc<dyn LogSink> = Arc::new(sink.clone());
        let runner = ScriptedRunner::new("/ws", Arc::clone(&log));
        runner.respond("lsview", ScriptedResponse::lines(&["/views/dev.vws"]));
        let client = ClearCaseClient::new(Arc::new(runner.clone()), log);
        let provider = Arc::new(ScmProvider::new(client, ProviderOptions::default()));
        Fixture {
            dispatcher: CommandDispatcher::new(provider, Arc::new(host)),
            runner,
            sink,
        }
    }

    fn selection(paths: &[&str]) -> Vec<TrackedResource> {
        paths.iter().map(|p| TrackedResource::new(*p)).collect()
    }

    #[test]
    fn test_command_table() {
        assert_eq!(COMMANDS.len(), 5);
        assert_eq!(lookup_command("clearcase.checkin"), Some(Action::CheckIn));
        assert_eq!(lookup_command("clearcase.lsvtree"), Some(Action::ShowVersionTree));
        assert_eq!(lookup_command("git.commit"), None);
        for entry in COMMANDS {
            assert_eq!(entry.action.id(), entry.id);
        }
    }

    #[test]
    fn test_only_version_tree_skips_refresh() {
        assert!(!Action::ShowVersionTree.refreshes());
        assert!(Action::CheckOut.refreshes());
        assert!(Action::MakeElement.refreshes());
    }

    #[tokio::test]
    async fn test_no_selection_no_active_file_is_noop() {
        let f = fixture(StaticHost::default());
        for entry in COMMANDS {
            assert_eq!(f.dispatcher.dispatch(entry.action, &[]).await, ActionOutcome::Skipped);
        }
        assert!(f.runner.calls().is_empty());
    }

    #[tokio::test]
    async fn test_active_file_fallback() {
        let f = fixture(StaticHost {
            active_file: Some(PathBuf::from("/ws/open.c")),
            comment: String::new(),
        });
        assert_eq!(f.dispatcher.check_out(&[]).await, ActionOutcome::Completed);
        assert_eq!(f.runner.calls()[0], vec!["co", "-nc", "/ws/open.c"]);
    }

    #[tokio::test]
    async fn test_checkout_refreshes_groups() {
        let f = fixture(StaticHost::default());
        f.runner.respond("lsco", ScriptedResponse::lines(&["/ws/a.c"]));

        let outcome = f.dispatcher.check_out(&selection(&["/ws/a.c"])).await;
        assert_eq!(outcome, ActionOutcome::Completed);
        assert_eq!(f.runner.calls_to("lsco").len(), 1);
        assert_eq!(f.dispatcher.provider().count(), 1);
    }

    #[tokio::test]
    async fn test_multi_selection_single_invocation() {
        let f = fixture(StaticHost::default());
        f.dispatcher
            .undo_check_out(&selection(&["/ws/a b.c", "/ws/c.c"]))
            .await;
        assert_eq!(
            f.runner.calls_to("unco"),
            vec![vec!["unco", "-keep", "/ws/a b.c", "/ws/c.c"]]
        );
    }

    #[tokio::test]
    async fn test_checkin_uses_host_comment() {
        let f = fixture(StaticHost {
            active_file: None,
            comment: "fixed bug".to_string(),
        });
        f.dispatcher.check_in(&selection(&["/ws/a.c"])).await;
        assert_eq!(
            f.runner.calls_to("ci"),
            vec![vec!["ci", "-c", "fixed bug", "/ws/a.c"]]
        );
    }

    #[tokio::test]
    async fn test_failed_checkout_is_swallowed() {
        let f = fixture(StaticHost::default());
        f.runner.respond_once("lsco", ScriptedResponse::lines(&["/ws/old.c"]));
        f.dispatcher.provider().refresh().await;
        f.runner.respond("co", ScriptedResponse::exit(1));

        let outcome = f.dispatcher.check_out(&selection(&["/ws/a.c"])).await;
        assert!(matches!(outcome, ActionOutcome::Failed(ref m) if m.contains("exit code 1")));
        assert!(f.sink.contains("exit code 1"));
        // No refresh after the failure; the prior listing stays published.
        assert_eq!(f.runner.calls_to("lsco").len(), 1);
        let group = f.dispatcher.provider().group(GroupKind::CheckedOut);
        assert_eq!(group.resources(), selection(&["/ws/old.c"]));
    }

    #[tokio::test]
    async fn test_version_tree_does_not_refresh() {
        let f = fixture(StaticHost::default());
        let outcome = f.dispatcher.show_version_tree(&selection(&["/ws/a.c"])).await;
        assert_eq!(outcome, ActionOutcome::Completed);
        assert!(f.runner.calls_to("lsco").is_empty());
    }

    #[tokio::test]
    async fn test_mkelem_is_noop_that_refreshes() {
        let f = fixture(StaticHost::default());
        let outcome = f.dispatcher.make_element(&selection(&["/ws/new.c"])).await;
        assert_eq!(outcome, ActionOutcome::Completed);
        assert!(f.sink.contains("Not (yet) supported command: mkelem"));
        assert!(f.runner.calls_to("mkelem").is_empty());
        assert_eq!(f.runner.calls_to("lsco").len(), 1);
    }

    #[tokio::test]
    async fn test_execute_by_id() {
        let f = fixture(StaticHost::default());
        let outcome = f
            .dispatcher
            .execute("clearcase.checkout", &selection(&["/ws/a.c"]))
            .await;
        assert_eq!(outcome, ActionOutcome::Completed);

        let unknown = f.dispatcher.execute("clearcase.merge", &[]).await;
        assert!(matches!(unknown, ActionOutcome::Failed(_)));
        assert!(f.sink.contains("Unknown command: clearcase.merge"));
    }
}
