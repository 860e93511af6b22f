//! Replaying runner for exercising the client without a ClearCase install.

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};

use super::{format_command_line, LineBatches, LogSink, ProcessError, ToolRunner};

/// Canned result for one invocation.
#[derive(Debug, Clone, Default)]
pub struct ScriptedResponse {
    /// Stdout batches, delivered in order.
    pub batches: Vec<Vec<String>>,
    /// Process exit code; non-zero produces `ProcessError::Failed`.
    pub exit_code: i32,
}

impl ScriptedResponse {
    /// Successful invocation printing `lines` as a single batch.
    #[must_use]
    pub fn lines(lines: &[&str]) -> Self {
        Self {
            batches: vec![lines.iter().map(|s| (*s).to_string()).collect()],
            exit_code: 0,
        }
    }

    /// Successful invocation printing each slice as its own batch.
    #[must_use]
    pub fn batches(batches: &[&[&str]]) -> Self {
        Self {
            batches: batches
                .iter()
                .map(|b| b.iter().map(|s| (*s).to_string()).collect())
                .collect(),
            exit_code: 0,
        }
    }

    /// Invocation that prints nothing and exits with `code`.
    #[must_use]
    pub fn exit(code: i32) -> Self {
        Self {
            batches: Vec::new(),
            exit_code: code,
        }
    }
}

#[derive(Debug, Default)]
struct Script {
    persistent: HashMap<String, ScriptedResponse>,
    queued: HashMap<String, VecDeque<ScriptedResponse>>,
    calls: Vec<Vec<String>>,
}

/// [`ToolRunner`] that answers by subcommand from a script.
///
/// Responses are keyed by the first argument (`lsco`, `ci`, ...). One-shot
/// responses queued with [`ScriptedRunner::respond_once`] are used before the
/// persistent response set with [`ScriptedRunner::respond`]; unknown
/// subcommands succeed with no output. Every argument vector is recorded.
#[derive(Debug, Clone)]
pub struct ScriptedRunner {
    program: String,
    workspace_root: PathBuf,
    log: Arc<dyn LogSink>,
    script: Arc<Mutex<Script>>,
}

impl ScriptedRunner {
    #[must_use]
    pub fn new(workspace_root: impl Into<PathBuf>, log: Arc<dyn LogSink>) -> Self {
        Self {
            program: "cleartool".to_string(),
            workspace_root: workspace_root.into(),
            log,
            script: Arc::new(Mutex::new(Script::default())),
        }
    }

    fn script(&self) -> std::sync::MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Answer every `subcommand` invocation with `response`.
    pub fn respond(&self, subcommand: &str, response: ScriptedResponse) {
        self.script()
            .persistent
            .insert(subcommand.to_string(), response);
    }

    /// Answer the next `subcommand` invocation with `response`.
    pub fn respond_once(&self, subcommand: &str, response: ScriptedResponse) {
        self.script()
            .queued
            .entry(subcommand.to_string())
            .or_default()
            .push_back(response);
    }

    /// Every argument vector started so far.
    #[must_use]
    pub fn calls(&self) -> Vec<Vec<String>> {
        self.script().calls.clone()
    }

    /// Argument vectors whose subcommand is `subcommand`.
    #[must_use]
    pub fn calls_to(&self, subcommand: &str) -> Vec<Vec<String>> {
        self.script()
            .calls
            .iter()
            .filter(|call| call.first().is_some_and(|c| c == subcommand))
            .cloned()
            .collect()
    }

    fn next_response(&self, args: &[String]) -> ScriptedResponse {
        let mut script = self.script();
        script.calls.push(args.to_vec());
        let Some(subcommand) = args.first() else {
            return ScriptedResponse::default();
        };
        if let Some(response) = script
            .queued
            .get_mut(subcommand)
            .and_then(VecDeque::pop_front)
        {
            return response;
        }
        script
            .persistent
            .get(subcommand)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl ToolRunner for ScriptedRunner {
    fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    fn start(&self, args: &[String]) -> Result<LineBatches, ProcessError> {
        let command = format_command_line(&self.program, args);
        self.log.append_line(&command);

        let response = self.next_response(args);
        let (batch_tx, batch_rx) = mpsc::channel(response.batches.len().max(1));
        for batch in response.batches {
            let _ = batch_tx.try_send(batch);
        }

        let result = if response.exit_code == 0 {
            Ok(())
        } else {
            let err = ProcessError::Failed {
                command: command.clone(),
                code: Some(response.exit_code),
            };
            self.log.append_line(&err.to_string());
            Err(err)
        };
        let (exit_tx, exit_rx) = oneshot::channel();
        let _ = exit_tx.send(result);

        Ok(LineBatches::new(command, batch_rx, exit_rx))
    }
}
