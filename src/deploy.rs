//! Deployment script execution

use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::error::{HookError, Result};

/// Maximum number of stderr characters echoed back in a failure response
pub const MAX_ERROR_EXCERPT: usize = 1000;

/// How the deployment script is launched
#[derive(Debug, Clone)]
pub struct DeploySettings {
    pub script: PathBuf,
    /// Program the script is handed to, e.g. `bash`. `None` executes the script directly.
    pub interpreter: Option<String>,
    pub timeout: Duration,
}

impl DeploySettings {
    fn command(&self) -> Command {
        let mut cmd = match self.interpreter.as_deref() {
            Some(interpreter) => {
                let mut cmd = Command::new(interpreter);
                cmd.arg(&self.script);
                cmd
            }
            None => Command::new(&self.script),
        };
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        // Own process group, so a timeout can take down everything the script started
        #[cfg(unix)]
        {
            cmd.process_group(0);
        }
        cmd
    }
}

/// Result of one run of the deployment script
#[derive(Debug, Clone)]
pub struct DeploymentOutcome {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
    /// `None` when the process was ended by a signal
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub elapsed: Duration,
    pub timed_out: bool,
}

impl DeploymentOutcome {
    pub fn succeeded(&self) -> bool {
        !self.timed_out && self.exit_code == Some(0)
    }

    /// Turns a timed out or failed run into the matching error.
    pub fn into_result(self) -> Result<Self> {
        if self.timed_out {
            return Err(HookError::ScriptTimedOut {
                after: self.elapsed,
            });
        }
        if self.exit_code != Some(0) {
            return Err(HookError::ScriptFailed {
                exit_code: self.exit_code,
                stderr: truncate_chars(&self.stderr, MAX_ERROR_EXCERPT).to_string(),
            });
        }
        Ok(self)
    }
}

/// Returns at most the first `max` characters of `s`.
pub fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Runs the deployment script once, bounded by `settings.timeout`.
///
/// Only a failure to start (or wait on) the process is an `Err`; non-zero
/// exits and timeouts come back as an outcome. On timeout the process group is
/// killed and the child reaped before returning.
///
/// Overlapping calls are not serialized.
pub async fn run_deploy_script(settings: &DeploySettings) -> Result<DeploymentOutcome> {
    let id = Uuid::now_v7();
    let started_at = Utc::now();
    let start = Instant::now();

    info!(
        "Deployment {} - running {:?} (interpreter: {:?}, timeout: {:?})",
        id, settings.script, settings.interpreter, settings.timeout
    );

    let mut child = settings.command().spawn().map_err(|e| {
        error!("Deployment {} - script failed to start: {}", id, e);
        HookError::ScriptLaunch(e)
    })?;
    // The child leads its own group; the id is kept because it is gone once the leader is reaped
    let pgid = child.id();
    let mut stdout_pipe = child.stdout.take();
    let mut stderr_pipe = child.stderr.take();

    // Both pipes are drained while waiting so a chatty script cannot block on a full pipe
    let finished = tokio::time::timeout(settings.timeout, async {
        tokio::join!(
            read_pipe(stdout_pipe.as_mut()),
            read_pipe(stderr_pipe.as_mut()),
            child.wait()
        )
    })
    .await;

    let (stdout, stderr, status) = match finished {
        Ok(done) => done,
        Err(_) => {
            terminate(&mut child, pgid).await;
            let elapsed = start.elapsed();
            error!(
                "Deployment {} - script timed out after {:?}",
                id, settings.timeout
            );
            return Ok(DeploymentOutcome {
                id,
                started_at,
                exit_code: None,
                stdout: String::new(),
                stderr: String::new(),
                elapsed,
                timed_out: true,
            });
        }
    };

    let status = status.map_err(|e| {
        error!("Deployment {} - could not wait on script: {}", id, e);
        HookError::ScriptLaunch(e)
    })?;

    let outcome = DeploymentOutcome {
        id,
        started_at,
        exit_code: status.code(),
        stdout,
        stderr,
        elapsed: start.elapsed(),
        timed_out: false,
    };

    if outcome.succeeded() {
        info!(
            "Deployment {} - script finished in {:?}\nStdout:\n{}\nStderr:\n{}",
            id, outcome.elapsed, outcome.stdout, outcome.stderr
        );
    } else {
        error!(
            "Deployment {} - script failed with exit code {:?}\nStderr:\n{}\nStdout:\n{}",
            id, outcome.exit_code, outcome.stderr, outcome.stdout
        );
    }
    Ok(outcome)
}

async fn read_pipe<R: AsyncRead + Unpin>(pipe: Option<&mut R>) -> String {
    let mut buf = Vec::new();
    if let Some(pipe) = pipe {
        if let Err(e) = pipe.read_to_end(&mut buf).await {
            warn!("Failed reading script output: {}", e);
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

/// Kills the script's process group, then the child itself, and reaps it.
///
/// The group is signalled even when the leader has already exited and been
/// reaped: background jobs it left behind still hold the output pipes.
async fn terminate(child: &mut Child, pgid: Option<u32>) {
    #[cfg(unix)]
    {
        if let Some(pgid) = pgid {
            // SAFETY: plain syscall on the group the child leads, no memory is touched
            let rc = unsafe { libc::killpg(pgid as libc::pid_t, libc::SIGKILL) };
            if rc == -1 {
                warn!(
                    "killpg({}) failed: {}",
                    pgid,
                    std::io::Error::last_os_error()
                );
            }
        }
    }
    #[cfg(not(unix))]
    let _ = pgid;
    if let Err(e) = child.start_kill() {
        warn!("Failed to kill deployment script: {}", e);
    }
    if let Err(e) = child.wait().await {
        warn!("Failed to reap deployment script: {}", e);
    }
}
