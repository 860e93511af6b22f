//! External tool process spawning.
//!
//! A [`ProcessRunner`] launches the tool with an argument vector in the
//! workspace root and hands back a [`LineBatches`] sequence: stdout arrives
//! as batches of non-empty lines while the process runs, stderr goes to the
//! log sink, and the exit status is collected with [`LineBatches::finish`].

use std::borrow::Cow;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::process::Stdio;
use std::sync::Arc;
use std::task::{ready, Context, Poll};

use async_trait::async_trait;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, ChildStderr, ChildStdout, Command};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use super::{LineSplitter, LogSink};

/// Capacity of the batch channel between the stdout reader and the consumer.
pub const DEFAULT_BATCH_BUFFER: usize = 64;

/// Read size for stdout chunks.
const READ_CHUNK: usize = 8 * 1024;

/// Error type for external tool invocations.
#[derive(thiserror::Error, Debug)]
pub enum ProcessError {
    /// The executable could not be located.
    #[error("ClearCase not found: `{program}` could not be started")]
    ToolNotFound { program: String },
    /// Permission denied when spawning.
    #[error("Permission denied starting `{program}`")]
    PermissionDenied { program: String },
    /// Other I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// The tool ran and exited unsuccessfully.
    #[error("ClearCase error: `{command}` failed with exit code {}", exit_code_label(.code))]
    Failed { command: String, code: Option<i32> },
}

impl ProcessError {
    /// Create a `ProcessError` from a spawn error, classifying common cases.
    fn from_spawn(err: std::io::Error, program: &str) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::ToolNotFound {
                program: program.to_string(),
            },
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied {
                program: program.to_string(),
            },
            _ => Self::Io(err),
        }
    }

    /// Exit code of a failed invocation, if the tool reported one.
    #[must_use]
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::Failed { code, .. } => *code,
            _ => None,
        }
    }
}

fn exit_code_label(code: &Option<i32>) -> String {
    code.map_or_else(|| "none (terminated by signal)".to_string(), |c| c.to_string())
}

/// Render an argument vector as a readable command line.
///
/// Arguments containing spaces or shell metacharacters are quoted so every
/// argument stays one visible token.
#[must_use]
pub fn format_command_line(program: &str, args: &[String]) -> String {
    let mut line = shell_escape::escape(Cow::Borrowed(program)).into_owned();
    for arg in args {
        line.push(' ');
        line.push_str(&shell_escape::escape(Cow::Borrowed(arg.as_str())));
    }
    line
}

type LineFilter = Box<dyn Fn(&str) -> bool + Send + Sync>;

/// Finite sequence of stdout line batches from one tool invocation.
///
/// Batches are delivered as soon as they are read; the sequence ends when
/// the process closes stdout. Consumers that need the full output must
/// accumulate across batches.
pub struct LineBatches {
    command: String,
    batches: mpsc::Receiver<Vec<String>>,
    exit: oneshot::Receiver<Result<(), ProcessError>>,
    filter: Option<LineFilter>,
}

impl std::fmt::Debug for LineBatches {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LineBatches")
            .field("command", &self.command)
            .field("filtered", &self.filter.is_some())
            .finish_non_exhaustive()
    }
}

impl LineBatches {
    /// Assemble a sequence from its channels.
    ///
    /// `exit` must resolve only after every batch has been sent.
    #[must_use]
    pub fn new(
        command: impl Into<String>,
        batches: mpsc::Receiver<Vec<String>>,
        exit: oneshot::Receiver<Result<(), ProcessError>>,
    ) -> Self {
        Self {
            command: command.into(),
            batches,
            exit,
            filter: None,
        }
    }

    /// The command line this sequence belongs to.
    #[must_use]
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Keep only lines for which `keep` returns true.
    ///
    /// Filters compose; batches left empty are skipped.
    #[must_use]
    pub fn filter_lines<F>(mut self, keep: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(match self.filter.take() {
            Some(previous) => Box::new(move |line: &str| previous(line) && keep(line)),
            None => Box::new(keep),
        });
        self
    }

    fn apply_filter(&self, mut batch: Vec<String>) -> Vec<String> {
        if let Some(keep) = &self.filter {
            batch.retain(|line| keep(line));
        }
        batch
    }

    /// Receive the next non-empty batch, or `None` once stdout is closed.
    pub async fn next_batch(&mut self) -> Option<Vec<String>> {
        loop {
            let batch = self.batches.recv().await?;
            let batch = self.apply_filter(batch);
            if !batch.is_empty() {
                return Some(batch);
            }
        }
    }

    /// Wait for the process to exit, discarding unread batches.
    ///
    /// # Errors
    ///
    /// Returns `ProcessError::Failed` on a non-zero exit code, or an I/O
    /// error if the output could not be read.
    pub async fn finish(mut self) -> Result<(), ProcessError> {
        while self.batches.recv().await.is_some() {}
        match self.exit.await {
            Ok(result) => result,
            Err(_) => Err(ProcessError::Io(std::io::Error::other(format!(
                "process monitor for `{}` stopped unexpectedly",
                self.command
            )))),
        }
    }

    /// Accumulate every line, then wait for exit.
    ///
    /// # Errors
    ///
    /// Same as [`LineBatches::finish`].
    pub async fn collect_lines(mut self) -> Result<Vec<String>, ProcessError> {
        let mut lines = Vec::new();
        while let Some(batch) = self.next_batch().await {
            lines.extend(batch);
        }
        self.finish().await?;
        Ok(lines)
    }
}

impl futures_core::Stream for LineBatches {
    type Item = Vec<String>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        loop {
            match ready!(this.batches.poll_recv(cx)) {
                Some(batch) => {
                    let batch = this.apply_filter(batch);
                    if !batch.is_empty() {
                        return Poll::Ready(Some(batch));
                    }
                }
                None => return Poll::Ready(None),
            }
        }
    }
}

/// Something that can start the external tool.
///
/// [`ProcessRunner`] is the real implementation; [`super::ScriptedRunner`]
/// replays canned output for tests.
#[async_trait]
pub trait ToolRunner: Send + Sync {
    /// Directory every invocation runs in.
    fn workspace_root(&self) -> &Path;

    /// Start the tool with `args` and return its output sequence.
    ///
    /// # Errors
    ///
    /// Returns `ProcessError` if the process cannot be spawned.
    fn start(&self, args: &[String]) -> Result<LineBatches, ProcessError>;

    /// Run the tool, handing each stdout batch to `on_lines` as it arrives.
    ///
    /// # Errors
    ///
    /// Returns `ProcessError` if the process cannot be spawned or exits
    /// unsuccessfully.
    async fn run(
        &self,
        args: &[String],
        on_lines: &mut (dyn FnMut(Vec<String>) + Send),
    ) -> Result<(), ProcessError> {
        let mut batches = self.start(args)?;
        while let Some(batch) = batches.next_batch().await {
            on_lines(batch);
        }
        batches.finish().await
    }
}

/// Spawns the real external tool.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    program: String,
    working_dir: PathBuf,
    log: Arc<dyn LogSink>,
}

impl ProcessRunner {
    /// Create a runner for `program` executing in `working_dir`.
    #[must_use]
    pub fn new(
        program: impl Into<String>,
        working_dir: impl Into<PathBuf>,
        log: Arc<dyn LogSink>,
    ) -> Self {
        Self {
            program: program.into(),
            working_dir: working_dir.into(),
            log,
        }
    }

    /// The executable being run.
    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    fn spawn_child(&self, args: &[String]) -> Result<Child, ProcessError> {
        Command::new(&self.program)
            .args(args)
            .current_dir(&self.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| ProcessError::from_spawn(e, &self.program))
    }
}

#[async_trait]
impl ToolRunner for ProcessRunner {
    fn workspace_root(&self) -> &Path {
        &self.working_dir
    }

    fn start(&self, args: &[String]) -> Result<LineBatches, ProcessError> {
        let command = format_command_line(&self.program, args);
        self.log.append_line(&command);
        tracing::debug!(
            command = %command,
            cwd = %self.working_dir.display(),
            "Spawning external tool"
        );

        let mut child = self.spawn_child(args)?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| std::io::Error::other("stdout not captured"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| std::io::Error::other("stderr not captured"))?;

        let (batch_tx, batch_rx) = mpsc::channel(DEFAULT_BATCH_BUFFER);
        let (exit_tx, exit_rx) = oneshot::channel();

        let stderr_task = tokio::spawn(forward_stderr(stderr, Arc::clone(&self.log)));
        let log = Arc::clone(&self.log);
        let monitored = command.clone();
        tokio::spawn(async move {
            let result = monitor(child, stdout, batch_tx, stderr_task, monitored).await;
            if let Err(e) = &result {
                log.append_line(&e.to_string());
            }
            let _ = exit_tx.send(result);
        });

        Ok(LineBatches::new(command, batch_rx, exit_rx))
    }
}

/// Drain stdout into the batch channel, then reap the child.
async fn monitor(
    mut child: Child,
    stdout: ChildStdout,
    batch_tx: mpsc::Sender<Vec<String>>,
    stderr_task: JoinHandle<()>,
    command: String,
) -> Result<(), ProcessError> {
    let pumped = pump_stdout(stdout, batch_tx).await;
    let _ = stderr_task.await;
    let status = child.wait().await?;
    pumped?;

    tracing::debug!(command = %command, status = ?status.code(), "External tool exited");
    if status.success() {
        Ok(())
    } else {
        Err(ProcessError::Failed {
            command,
            code: status.code(),
        })
    }
}

async fn pump_stdout(
    mut stdout: ChildStdout,
    batch_tx: mpsc::Sender<Vec<String>>,
) -> std::io::Result<()> {
    let mut splitter = LineSplitter::new();
    let mut buf = vec![0u8; READ_CHUNK];
    loop {
        let read = stdout.read(&mut buf).await?;
        if read == 0 {
            break;
        }
        let lines = splitter.push(&buf[..read]);
        // A dropped consumer still lets the child run to completion.
        if !lines.is_empty() {
            let _ = batch_tx.send(lines).await;
        }
    }
    if let Some(line) = splitter.finish() {
        let _ = batch_tx.send(vec![line]).await;
    }
    Ok(())
}

/// Forward stderr to the log line by line until EOF.
///
/// Bytes are decoded lossily; the pipe stays open for the whole run so the
/// tool never sees a closed stderr.
async fn forward_stderr(mut stderr: ChildStderr, log: Arc<dyn LogSink>) {
    let mut splitter = LineSplitter::new();
    let mut buf = vec![0u8; READ_CHUNK];
    loop {
        match stderr.read(&mut buf).await {
            Ok(0) => break,
            Ok(read) => {
                for line in splitter.push(&buf[..read]) {
                    report_stderr(log.as_ref(), &line);
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read external tool stderr");
                break;
            }
        }
    }
    if let Some(line) = splitter.finish() {
        report_stderr(log.as_ref(), &line);
    }
}

fn report_stderr(log: &dyn LogSink, line: &str) {
    if line.trim().is_empty() {
        return;
    }
    tracing::warn!(stderr = %line, "External tool reported an error");
    log.append_line(line);
}
