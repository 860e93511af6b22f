//! Provider and dispatcher tests against a scripted `cleartool`.

mod dispatcher_test;
mod provider_test;

use std::sync::Arc;

use clearcase_scm::clearcase::ClearCaseClient;
use clearcase_scm::process::{LogSink, MemorySink, ScriptedRunner};

/// Client over a scripted runner rooted at `/ws`, plus its log.
pub fn scripted_client() -> (ClearCaseClient, ScriptedRunner, MemorySink) {
    let sink = MemorySink::new();
    let log: Arc<dyn LogSink> = Arc::new(sink.clone());
    let runner = ScriptedRunner::new("/ws", Arc::clone(&log));
    let client = ClearCaseClient::new(Arc::new(runner.clone()), log);
    (client, runner, sink)
}

/// Verify the public provider surface is exported from the library.
#[test]
fn test_all_scm_types_exported() {
    use clearcase_scm::scm::{
        lookup_command, Action, ActionOutcome, GroupKind, GroupState, ProviderOptions,
        StaticHost, TrackedResource, ACCEPT_INPUT_COMMAND, COMMANDS, CONTEXT_KEY,
        PROVIDER_LABEL,
    };

    assert_eq!(CONTEXT_KEY, "clearcase");
    assert_eq!(PROVIDER_LABEL, "ClearCase");
    assert_eq!(lookup_command(ACCEPT_INPUT_COMMAND), Some(Action::CheckIn));
    assert_eq!(COMMANDS.len(), 5);
    assert_eq!(GroupKind::ALL.len(), 3);

    let _ = ProviderOptions::default();
    let _ = StaticHost::default();
    let _ = TrackedResource::new("/ws/a.c");
    let _ = ActionOutcome::Skipped;
    let _ = GroupState::Stale;
}
