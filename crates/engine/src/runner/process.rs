// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Local child-process runner.

use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sbx_core::{CommandSpec, RunId, Stream};
use tokio::io::AsyncRead;
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;

use super::{Execution, Runner, RunnerKind};
use crate::error::RunError;
use crate::log_consumer::LogConsumer;

/// Runs the command list as a child process of this one.
///
/// The child gets the command's working directory, the inherited environment
/// overlaid with the command's environment, and its own process group (Unix)
/// so a timeout kills everything it spawned.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl ProcessRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Runner for ProcessRunner {
    fn kind(&self) -> RunnerKind {
        RunnerKind::Process
    }

    fn execution_dir(&self, host_dir: &Path) -> String {
        host_dir.display().to_string()
    }

    async fn start(
        &self,
        run_id: &RunId,
        spec: &CommandSpec,
        consumer: Arc<LogConsumer>,
    ) -> Result<Box<dyn Execution>, RunError> {
        let mut cmd = Command::new(spec.program());
        cmd.args(spec.args())
            .current_dir(spec.working_dir())
            .envs(spec.env())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        cmd.process_group(0);

        let mut child = cmd.spawn().map_err(|e| {
            RunError::Infrastructure(format!("failed to spawn `{}`: {e}", spec.program()))
        })?;
        let pid = child.id();
        tracing::info!(run_id = %run_id, pid, program = spec.program(), "process started");

        let readers = [
            child
                .stdout
                .take()
                .map(|out| spawn_reader(Stream::StdOut, out, Arc::clone(&consumer), run_id.clone())),
            child
                .stderr
                .take()
                .map(|err| spawn_reader(Stream::StdErr, err, consumer, run_id.clone())),
        ];
        Ok(Box::new(ProcessExecution { run_id: run_id.clone(), child, pid, readers }))
    }
}

fn spawn_reader<R>(stream: Stream, reader: R, consumer: Arc<LogConsumer>, run_id: RunId) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        if let Err(e) = consumer.consume(stream, reader).await {
            tracing::warn!(run_id = %run_id, %stream, error = %e, "output stream read failed");
        }
    })
}

/// Exit code, with death-by-signal reported shell-style as `128 + signal`.
fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    -1
}

struct ProcessExecution {
    run_id: RunId,
    child: Child,
    pid: Option<u32>,
    readers: [Option<JoinHandle<()>>; 2],
}

impl ProcessExecution {
    /// Await both readers. A reader is only cleared once it finished, so a
    /// cancelled drain can be resumed.
    async fn drain(&mut self) {
        for slot in &mut self.readers {
            if let Some(handle) = slot.as_mut() {
                if let Err(e) = handle.await {
                    tracing::warn!(run_id = %self.run_id, error = %e, "stream reader task failed");
                }
                *slot = None;
            }
        }
    }

    fn abort_readers(&mut self) {
        for handle in self.readers.iter_mut().filter_map(Option::take) {
            handle.abort();
        }
    }

    fn kill_group(&self) {
        #[cfg(unix)]
        if let Some(pid) = self.pid.and_then(|p| i32::try_from(p).ok()) {
            use nix::errno::Errno;
            use nix::sys::signal::{killpg, Signal};
            use nix::unistd::Pid;

            match killpg(Pid::from_raw(pid), Signal::SIGKILL) {
                Ok(()) | Err(Errno::ESRCH) => {}
                Err(e) => tracing::warn!(run_id = %self.run_id, pid, error = %e, "failed to kill process group"),
            }
        }
    }
}

#[async_trait]
impl Execution for ProcessExecution {
    async fn wait(&mut self) -> Result<i32, RunError> {
        let status = self
            .child
            .wait()
            .await
            .map_err(|e| RunError::Infrastructure(format!("failed to wait for process: {e}")))?;
        self.drain().await;
        let code = exit_code(status);
        tracing::info!(run_id = %self.run_id, exit_code = code, "process exited");
        Ok(code)
    }

    async fn terminate(&mut self, grace: Duration) {
        tracing::info!(run_id = %self.run_id, pid = self.pid, "killing process");
        self.kill_group();
        if let Err(e) = self.child.start_kill() {
            tracing::debug!(run_id = %self.run_id, error = %e, "process already exited");
        }
        if let Err(e) = self.child.wait().await {
            tracing::warn!(run_id = %self.run_id, error = %e, "failed to reap killed process");
        }
        if tokio::time::timeout(grace, self.drain()).await.is_err() {
            tracing::warn!(
                run_id = %self.run_id,
                grace_ms = grace.as_millis() as u64,
                "stream readers still open after kill, abandoning"
            );
            self.abort_readers();
        }
    }

    async fn cleanup(&mut self) {
        if let Ok(None) = self.child.try_wait() {
            self.kill_group();
            if let Err(e) = self.child.start_kill() {
                tracing::debug!(run_id = %self.run_id, error = %e, "process already exited");
            }
            if let Err(e) = self.child.wait().await {
                tracing::debug!(run_id = %self.run_id, error = %e, "failed to reap process during cleanup");
            }
        }
        self.abort_readers();
    }
}

#[cfg(test)]
#[path = "process_tests.rs"]
mod tests;
