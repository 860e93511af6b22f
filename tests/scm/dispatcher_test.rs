//! Tests for command dispatch.

use std::path::PathBuf;
use std::sync::Arc;

use clearcase_scm::process::ScriptedResponse;
use clearcase_scm::scm::{
    ActionOutcome, CommandDispatcher, GroupKind, ProviderOptions, ScmProvider, StaticHost,
    TrackedResource, COMMANDS,
};

use super::scripted_client;

fn dispatcher(host: StaticHost) -> (CommandDispatcher, clearcase_scm::process::ScriptedRunner) {
    let (client, runner, _) = scripted_client();
    runner.respond("lsview", ScriptedResponse::lines(&["/views/dev.vws"]));
    let provider = Arc::new(ScmProvider::new(client, ProviderOptions::default()));
    (CommandDispatcher::new(provider, Arc::new(host)), runner)
}

#[tokio::test]
async fn test_checkin_without_comment_uses_nc() {
    let (dispatcher, runner) = dispatcher(StaticHost::default());

    let outcome = dispatcher
        .execute("clearcase.checkin", &[TrackedResource::new("/ws/a.c")])
        .await;

    assert_eq!(outcome, ActionOutcome::Completed);
    assert_eq!(runner.calls_to("ci"), vec![vec!["ci", "-nc", "/ws/a.c"]]);
}

#[tokio::test]
async fn test_checkin_then_group_reflects_listing() {
    let (dispatcher, runner) = dispatcher(StaticHost {
        active_file: None,
        comment: "release notes".to_string(),
    });
    runner.respond_once("lsco", ScriptedResponse::lines(&["a.c", "b.c"]));
    dispatcher.provider().refresh().await;
    assert_eq!(dispatcher.provider().count(), 2);

    runner.respond("lsco", ScriptedResponse::lines(&["b.c"]));
    let selection = vec![TrackedResource::new("/ws/a.c")];
    assert_eq!(dispatcher.check_in(&selection).await, ActionOutcome::Completed);

    assert_eq!(
        runner.calls_to("ci"),
        vec![vec!["ci", "-c", "release notes", "/ws/a.c"]]
    );
    assert_eq!(dispatcher.provider().count(), 1);
    assert_eq!(
        dispatcher.provider().group(GroupKind::CheckedOut).resources(),
        vec![TrackedResource::new("/ws/b.c")]
    );
}

#[tokio::test]
async fn test_every_command_uses_active_file() {
    let (dispatcher, runner) = dispatcher(StaticHost {
        active_file: Some(PathBuf::from("/ws/open.c")),
        comment: String::new(),
    });

    for entry in COMMANDS {
        dispatcher.execute(entry.id, &[]).await;
    }

    let subcommands: Vec<String> = runner
        .calls()
        .into_iter()
        .filter(|call| call.last().is_some_and(|arg| arg == "/ws/open.c"))
        .map(|call| call[0].clone())
        .collect();
    // mkelem never reaches cleartool.
    assert_eq!(subcommands, vec!["co", "ci", "unco", "lsvtree"]);
}

#[tokio::test]
async fn test_failed_undo_checkout_keeps_groups() {
    let (dispatcher, runner) = dispatcher(StaticHost::default());
    runner.respond("unco", ScriptedResponse::exit(1));

    let outcome = dispatcher
        .undo_check_out(&[TrackedResource::new("/ws/a.c")])
        .await;

    assert!(matches!(outcome, ActionOutcome::Failed(ref m) if m.contains("unco")));
    assert!(runner.calls_to("lsco").is_empty());
}
