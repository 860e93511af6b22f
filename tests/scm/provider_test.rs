//! Tests for the resource-group provider.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clearcase_scm::process::ScriptedResponse;
use clearcase_scm::scm::{GroupKind, GroupState, ProviderOptions, ScmProvider};
use clearcase_scm::watcher::{ChangeKind, WorkspaceChange};

use super::scripted_client;

fn paths(provider: &ScmProvider, kind: GroupKind) -> Vec<PathBuf> {
    provider
        .group(kind)
        .resources()
        .iter()
        .map(|r| r.path().to_path_buf())
        .collect()
}

#[tokio::test]
async fn test_open_runs_initial_refresh() {
    let (client, runner, _) = scripted_client();
    runner.respond("lsco", ScriptedResponse::lines(&["src/a.c"]));
    runner.respond("lsview", ScriptedResponse::lines(&["Global path: /net/views/dev.vws"]));

    let provider = ScmProvider::open(client, ProviderOptions::default()).await;

    assert_eq!(
        paths(&provider, GroupKind::CheckedOut),
        vec![PathBuf::from("/ws/src/a.c")]
    );
    assert_eq!(provider.count(), 1);
    assert_eq!(runner.calls_to("lsco"), vec![vec!["lsco", "-s", "-r", "/ws"]]);
    assert_eq!(runner.calls_to("lspriv"), vec![vec!["lspriv", "/ws"]]);
}

#[tokio::test]
async fn test_snapshot_view_lists_view_only_files() {
    let (client, runner, _) = scripted_client();
    runner.respond(
        "lsview",
        ScriptedResponse::lines(&["Tag: dev_snap", "Global path: /views/dev_snap.stg"]),
    );
    // The snapshot listing shares `ls` with the element listing.
    runner.respond_once("ls", ScriptedResponse::lines(&["src/a.c@@/main/1"]));
    runner.respond_once(
        "ls",
        ScriptedResponse::lines(&["build/out.o", "src/a.c [checkedout]"]),
    );

    let provider = ScmProvider::new(client, ProviderOptions::default());
    assert!(provider.refresh().await);

    assert_eq!(
        paths(&provider, GroupKind::ViewPrivate),
        vec![PathBuf::from("/ws/build/out.o")]
    );
    let calls = runner.calls_to("ls");
    assert_eq!(calls[1], vec!["ls", "-r", "-view_only", "/ws"]);
}

#[tokio::test]
async fn test_quoted_paths_are_unquoted() {
    let (client, runner, _) = scripted_client();
    runner.respond("lsco", ScriptedResponse::lines(&["\"dir with space/a.c\""]));

    let provider = ScmProvider::new(client, ProviderOptions::default());
    provider.refresh_group(GroupKind::CheckedOut).await.unwrap();

    let resources = provider.group(GroupKind::CheckedOut).resources();
    assert_eq!(resources[0].path(), Path::new("/ws/dir with space/a.c"));
}

#[tokio::test]
async fn test_group_subscription_sees_refreshing_then_fresh() {
    let (client, runner, _) = scripted_client();
    runner.respond("ls", ScriptedResponse::lines(&["a.c@@/main/2"]));

    let provider = ScmProvider::new(client, ProviderOptions::default());
    let mut rx = provider.group(GroupKind::Elements).subscribe();
    assert_eq!(rx.borrow_and_update().state, GroupState::Stale);

    provider.refresh_group(GroupKind::Elements).await.unwrap();
    let snapshot = rx.borrow_and_update().clone();
    assert_eq!(snapshot.state, GroupState::Fresh);
    assert_eq!(snapshot.resources[0].version(), Some("/main/2"));
}

#[tokio::test]
async fn test_disposed_provider_ignores_refresh() {
    let (client, runner, _) = scripted_client();
    let provider = ScmProvider::new(client, ProviderOptions::default());

    provider.dispose();
    assert!(provider.refresh().await);
    assert!(runner.calls().is_empty());
    for (_, snapshot) in provider.snapshots() {
        assert!(snapshot.resources.is_empty());
    }
}

#[tokio::test]
async fn test_watch_loop_stops_when_channel_closes() {
    let (client, runner, _) = scripted_client();
    runner.respond("lsview", ScriptedResponse::lines(&["/views/dev.VWS"]));
    runner.respond("lsco", ScriptedResponse::lines(&["a.c", "b.c"]));
    let provider = Arc::new(ScmProvider::new(client, ProviderOptions::default()));

    let mut count_rx = provider.subscribe_count();
    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
    let handle = provider.spawn_watch_loop(rx);
    tx.send(WorkspaceChange::new(ChangeKind::Changed, vec![PathBuf::from("/ws/a.c")]))
        .unwrap();
    drop(tx);

    tokio::time::timeout(Duration::from_secs(2), count_rx.changed())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(*count_rx.borrow(), 2);
    tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .unwrap()
        .unwrap();
    assert!(!provider.is_disposed());
}
