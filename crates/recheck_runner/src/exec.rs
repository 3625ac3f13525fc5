//! Shell job execution.
//!
//! Every job is a shell command line run with `sh -c`, its standard error
//! folded into standard output. [`execute`] runs one named job to completion;
//! a [`JobExecutor`] runs a whole batch with bounded parallelism and a
//! per-job timeout.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::{mpsc, Arc, Mutex};
use std::time::{Duration, Instant};

use rayon::prelude::*;
use recheck_cache::CacheEntry;

/// Result recorded for a job killed at its deadline.
pub const TIMEOUT_RESULT: i32 = 124;

/// Result recorded when the shell itself could not be started.
pub const SPAWN_FAILED_RESULT: i32 = 126;

/// Line appended to the output of a job killed at its deadline.
pub const TIMEOUT_MARKER: &str = "recheck: job timed out";

/// How often a running job is polled for completion.
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// How long to wait for the output pipe to close once the job's process
/// group has been killed.
const OUTPUT_GRACE: Duration = Duration::from_secs(5);

/// Exit status and captured output of one job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobResult {
    /// Exit status. Zero is success.
    pub result: i32,
    /// Combined standard output and standard error.
    pub output: String,
}

impl JobResult {
    /// Creates a new job result.
    pub fn new(result: i32, output: impl Into<String>) -> Self {
        Self {
            result,
            output: output.into(),
        }
    }

    /// Returns `true` if the job timed out.
    pub fn timed_out(&self) -> bool {
        self.result == TIMEOUT_RESULT && self.output.contains(TIMEOUT_MARKER)
    }
}

impl From<JobResult> for CacheEntry {
    fn from(job: JobResult) -> Self {
        CacheEntry::new(job.result, job.output)
    }
}

/// Runs a batch of named shell jobs.
pub trait JobExecutor {
    /// Runs every job in `jobs` (name to command line), at most `parallelism`
    /// at a time, killing any job still running after `timeout`.
    ///
    /// A failing job never stops the others. The returned map holds one
    /// result per job name.
    fn run_batch(
        &self,
        jobs: &BTreeMap<String, String>,
        parallelism: usize,
        timeout: Duration,
    ) -> BTreeMap<String, JobResult>;
}

/// Runs jobs as `sh -c` child processes on a scoped rayon thread pool.
#[derive(Debug, Clone, Default)]
pub struct ShellExecutor {
    cwd: Option<PathBuf>,
}

impl ShellExecutor {
    /// Creates an executor that runs jobs in the current directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an executor that runs every job in `dir`.
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            cwd: Some(dir.into()),
        }
    }
}

impl JobExecutor for ShellExecutor {
    fn run_batch(
        &self,
        jobs: &BTreeMap<String, String>,
        parallelism: usize,
        timeout: Duration,
    ) -> BTreeMap<String, JobResult> {
        let cwd = self.cwd.as_deref();
        let run = |(name, command): (&String, &String)| {
            let result = run_job(name, command, cwd, Some(timeout));
            tracing::debug!("{name}: finished with result {}", result.result);
            (name.clone(), result)
        };

        rayon::ThreadPoolBuilder::new()
            .num_threads(parallelism.max(1))
            .thread_name(|i| format!("recheck-job-{i}"))
            .build_scoped(rayon::ThreadBuilder::run, |pool| {
                pool.install(|| jobs.par_iter().map(&run).collect())
            })
            .unwrap_or_else(|e| {
                tracing::warn!("failed to create job pool ({e}), running sequentially");
                jobs.iter().map(&run).collect()
            })
    }
}

/// Runs one named shell job to completion, without a timeout.
///
/// `message` describes the step and is logged before the job starts.
pub fn execute(message: &str, command: &str, cwd: Option<&Path>) -> JobResult {
    tracing::info!("{message}");
    tracing::debug!("running `{command}`");
    run_job(message, command, cwd, None)
}

/// Quotes `arg` for safe inclusion in a `sh` command line.
pub fn shell_quote(arg: &str) -> String {
    let plain = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "_-+=./:,@%".contains(c));
    if plain {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}

fn run_job(name: &str, command: &str, cwd: Option<&Path>, timeout: Option<Duration>) -> JobResult {
    let mut cmd = Command::new("sh");
    cmd.arg("-c")
        .arg(format!("exec 2>&1\n{command}"))
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null());
    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        cmd.process_group(0);
    }

    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) => {
            return JobResult::new(SPAWN_FAILED_RESULT, format!("failed to spawn `{name}`: {e}"))
        }
    };

    let captured = Arc::new(Mutex::new(Vec::<u8>::new()));
    let (done_tx, done_rx) = mpsc::channel::<()>();
    match child.stdout.take() {
        Some(mut stdout) => {
            let sink = Arc::clone(&captured);
            std::thread::spawn(move || {
                let mut chunk = [0u8; 8192];
                loop {
                    match stdout.read(&mut chunk) {
                        Ok(0) => break,
                        Ok(n) => lock(&sink).extend_from_slice(&chunk[..n]),
                        Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
                        Err(_) => break,
                    }
                }
                let _ = done_tx.send(());
            });
        }
        None => drop(done_tx),
    }

    let deadline = timeout.map(|t| Instant::now() + t);
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break Some(status),
            Ok(None) => {}
            Err(e) => {
                kill(&mut child);
                return JobResult::new(
                    SPAWN_FAILED_RESULT,
                    format!("failed to wait for `{name}`: {e}"),
                );
            }
        }
        if deadline.is_some_and(|d| Instant::now() >= d) {
            kill(&mut child);
            break None;
        }
        std::thread::sleep(POLL_INTERVAL);
    };

    // Anything the job left running in the background still holds the
    // output pipe open. The job is over once its shell exits.
    if status.is_some() {
        kill_group(child.id());
    }
    if done_rx.recv_timeout(OUTPUT_GRACE).is_err() {
        tracing::debug!("{name}: output still open after the job ended, keeping what was read");
    }
    let bytes = std::mem::take(&mut *lock(&captured));
    let mut output = String::from_utf8_lossy(&bytes).into_owned();

    match status {
        Some(status) => JobResult::new(exit_code(status), output),
        None => {
            if !output.is_empty() && !output.ends_with('\n') {
                output.push('\n');
            }
            let secs = timeout.map(|t| t.as_secs()).unwrap_or_default();
            output.push_str(&format!("{TIMEOUT_MARKER} after {secs}s\n"));
            JobResult::new(TIMEOUT_RESULT, output)
        }
    }
}

fn lock(buf: &Mutex<Vec<u8>>) -> std::sync::MutexGuard<'_, Vec<u8>> {
    buf.lock().unwrap_or_else(|e| e.into_inner())
}

/// Kills the job together with everything it started.
fn kill(child: &mut Child) {
    kill_group(child.id());
    let _ = child.kill();
    let _ = child.wait();
}

/// Sends `SIGKILL` to the process group led by `pid`.
#[cfg(unix)]
fn kill_group(pid: u32) {
    let Ok(pgid) = libc::pid_t::try_from(pid) else {
        return;
    };
    // SAFETY: killpg only signals processes; it touches no memory of ours.
    if unsafe { libc::killpg(pgid, libc::SIGKILL) } != 0 {
        let err = std::io::Error::last_os_error();
        if err.raw_os_error() != Some(libc::ESRCH) {
            tracing::debug!("failed to kill process group {pgid}: {err}");
        }
    }
}

#[cfg(not(unix))]
fn kill_group(_pid: u32) {}

fn exit_code(status: ExitStatus) -> i32 {
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    status.code().unwrap_or(1)
}
