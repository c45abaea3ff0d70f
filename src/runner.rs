//! Child process spawning and output streaming.
//!
//! This module turns resolved run entries into live child processes. All
//! entries of a batch are started immediately with piped stdout/stderr, each
//! line of output is prefixed with the process's label padded to the widest
//! label in the batch, and an opaque `ProcessHandle` is returned per entry.
//! The handle is the only way to observe completion; awaiting it is the
//! supervisor's job.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Exit code conventionally reported when the executable could not be
/// spawned at all (the missing-tool case).
pub const MISSING_EXECUTABLE_CODE: i32 = -2;

/// One process to launch: resolved executable, arguments, and label parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunEntry {
    /// Package (or reserved group) name, first half of the output label.
    pub package_name: String,
    /// Script name, second half of the output label.
    pub script: String,
    /// Executable to invoke; may carry its own arguments ("pnpm --silent").
    pub executable: String,
    /// Arguments appended after the executable's own.
    pub args: Vec<String>,
    /// Working folder relative to the workspace root; absent for
    /// workspace-level steps, which run at the root itself.
    pub folder: Option<String>,
}

/// Terminal notifications emitted for a spawned child.
///
/// A normally-supervised child reports `Exited` once its exit status is
/// observed and `Closed` once its output streams have drained. A child that
/// never spawned reports only `Closed` with [`MISSING_EXECUTABLE_CODE`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessEvent {
    /// The child exited with the given code.
    Exited { code: i32 },
    /// The child's output streams closed; carries the same code.
    Closed { code: i32 },
}

/// An opaque reference to a running (or failed-to-start) child process.
pub struct ProcessHandle {
    /// Package name, for diagnostics.
    pub package_name: String,
    /// Script name, for diagnostics.
    pub script: String,
    /// The executable string the entry resolved to, for diagnostics.
    pub executable: String,
    events: mpsc::Receiver<ProcessEvent>,
}

impl ProcessHandle {
    pub(crate) fn new(
        package_name: String,
        script: String,
        executable: String,
        events: mpsc::Receiver<ProcessEvent>,
    ) -> Self {
        Self {
            package_name,
            script,
            executable,
            events,
        }
    }

    /// Receives the next notification for this child. `None` means the
    /// supervising task went away without reporting, which callers should
    /// treat as a failure.
    pub async fn next_event(&mut self) -> Option<ProcessEvent> {
        self.events.recv().await
    }
}

/// Spawns one child per entry and returns their handles without waiting.
///
/// All children start essentially simultaneously; there is no concurrency
/// limit and no queueing. A spawn failure does not abort the batch: the
/// affected entry still yields a handle, which reports
/// `Closed { code: -2 }`.
pub fn spawn_all(entries: &[RunEntry], workspace_root: &Path) -> Vec<ProcessHandle> {
    let width = label_width(entries);
    entries
        .iter()
        .map(|entry| spawn_entry(entry, workspace_root, width))
        .collect()
}

/// Renders the unpadded output label for an entry.
fn label(entry: &RunEntry) -> String {
    format!("{} > {} ", entry.package_name, entry.script)
}

/// The shared prefix width: the widest label in the batch.
fn label_width(entries: &[RunEntry]) -> usize {
    entries
        .iter()
        .map(|entry| label(entry).chars().count())
        .max()
        .unwrap_or(0)
}

fn padded_label(entry: &RunEntry, width: usize) -> String {
    format!("{:<width$}", label(entry))
}

/// Resolves the working directory for an entry against the workspace root.
fn entry_cwd(entry: &RunEntry, workspace_root: &Path) -> PathBuf {
    match &entry.folder {
        Some(folder) => workspace_root.join(folder),
        None => workspace_root.to_path_buf(),
    }
}

fn spawn_entry(entry: &RunEntry, workspace_root: &Path, width: usize) -> ProcessHandle {
    let (tx, rx) = mpsc::channel(2);
    let handle = ProcessHandle::new(
        entry.package_name.clone(),
        entry.script.clone(),
        entry.executable.clone(),
        rx,
    );
    let prefix = padded_label(entry, width);

    let (program, mut args) = match split_executable(&entry.executable) {
        Some(parts) => parts,
        None => {
            eprintln!("{}invalid executable: {:?}", prefix, entry.executable);
            let _ = tx.try_send(ProcessEvent::Closed {
                code: MISSING_EXECUTABLE_CODE,
            });
            return handle;
        }
    };
    args.extend(entry.args.iter().cloned());

    let mut command = Command::new(&program);
    command
        .args(&args)
        .current_dir(entry_cwd(entry, workspace_root))
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    command.kill_on_drop(true);

    let mut child = match command.spawn() {
        Ok(child) => child,
        Err(err) => {
            eprintln!("{}failed to start {}: {}", prefix, program, err);
            let _ = tx.try_send(ProcessEvent::Closed {
                code: MISSING_EXECUTABLE_CODE,
            });
            return handle;
        }
    };

    let stdout_task = child
        .stdout
        .take()
        .map(|stdout| tokio::spawn(stream_lines(stdout, prefix.clone(), false)));
    let stderr_task = child
        .stderr
        .take()
        .map(|stderr| tokio::spawn(stream_lines(stderr, prefix.clone(), true)));

    tokio::spawn(async move {
        let code = match child.wait().await {
            Ok(status) => status.code().unwrap_or(-1),
            Err(_) => -1,
        };
        let _ = tx.send(ProcessEvent::Exited { code }).await;
        join_reader(stdout_task).await;
        join_reader(stderr_task).await;
        let _ = tx.send(ProcessEvent::Closed { code }).await;
    });

    handle
}

async fn join_reader(task: Option<JoinHandle<()>>) {
    if let Some(task) = task {
        let _ = task.await;
    }
}

async fn stream_lines<R>(reader: R, prefix: String, to_stderr: bool)
where
    R: tokio::io::AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        let clean = sanitize_line(&line);
        if to_stderr {
            eprintln!("{}{}", prefix, clean);
        } else {
            println!("{}{}", prefix, clean);
        }
    }
}

// ANSI escapes in child output would break the column alignment.
fn sanitize_line(line: &str) -> String {
    let stripped = strip_ansi_escapes::strip(line.as_bytes());
    String::from_utf8_lossy(&stripped).to_string()
}

fn split_executable(raw: &str) -> Option<(String, Vec<String>)> {
    let mut parts = shell_words::split(raw).ok()?;
    if parts.is_empty() {
        return None;
    }
    let program = parts.remove(0);
    Some((program, parts))
}
