// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Child launcher: spawn a mount's child process with piped stdio.
//!
//! Container mounts invoke the container engine in interactive, auto-remove
//! mode (`run -i --rm --name <n>`); command mounts spawn the command directly
//! with a controlled environment. Stderr is drained line-by-line into the log
//! stream at DEBUG. The launcher never adds volume mounts, port mappings, or
//! privileged mode.

use std::collections::BTreeMap;
use std::process::Stdio;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// How long a freshly spawned child gets to fail fast before we accept it.
const SPAWN_SETTLE: Duration = Duration::from_millis(200);

/// Errors surfaced by the launcher.
#[derive(Debug, thiserror::Error)]
pub enum LaunchError {
    /// The configured container engine binary is not on the search path.
    #[error("container engine '{0}' not found on PATH")]
    EngineMissing(String),

    /// `pull` returned a non-zero status.
    #[error("failed to pull image {image}: {detail}")]
    PullFailed {
        /// Image reference that failed to pull.
        image: String,
        /// Trimmed stderr from the engine.
        detail: String,
    },

    /// The child could not be spawned, or exited immediately.
    #[error("failed to spawn child: {0}")]
    Spawn(String),
}

/// Opaque handle referring to a running child.
///
/// Containers are addressed by their chosen name (usable with the engine's
/// `stop`/`kill`); direct commands by their process id. The handle is the key
/// under which the client manager tracks the mount's session.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ChildHandle {
    /// Container mount, addressed by container name.
    Container {
        /// Name passed to `run --name`.
        name: String,
    },
    /// Command mount, addressed by process id.
    Process {
        /// Process id of the spawned command.
        pid: u32,
    },
}

impl std::fmt::Display for ChildHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChildHandle::Container { name } => write!(f, "container:{name}"),
            ChildHandle::Process { pid } => write!(f, "pid:{pid}"),
        }
    }
}

/// What to launch for a mount.
#[derive(Clone, Debug)]
pub enum LaunchSpec {
    /// Run a container image through the engine.
    Container {
        /// Image reference (e.g. `docker.io/mcp/sqlite`).
        image: String,
        /// Container name, unique per mount.
        name: String,
    },
    /// Spawn a command directly.
    Command {
        /// Executable to run.
        command: String,
        /// Arguments.
        args: Vec<String>,
    },
}

/// A live child with piped stdio, plus the means to tear it down.
pub struct SpawnedChild {
    handle: ChildHandle,
    child: Child,
    stderr_task: Option<JoinHandle<()>>,
    /// Engine binary, present for container mounts (used for forced stops).
    engine: Option<String>,
}

impl SpawnedChild {
    /// The handle identifying this child.
    pub fn handle(&self) -> &ChildHandle {
        &self.handle
    }

    /// Whether the child is still running.
    pub fn is_running(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }

    /// Tear the child down: wait up to `grace` for it to exit (its stdin has
    /// normally been closed by the session already), then force-terminate.
    /// Container mounts additionally get a best-effort engine `kill`;
    /// auto-remove reclaims the container record.
    pub async fn teardown(mut self, grace: Duration) {
        match timeout(grace, self.child.wait()).await {
            Ok(Ok(status)) => {
                debug!(handle = %self.handle, %status, "child exited");
            }
            Ok(Err(err)) => {
                warn!(handle = %self.handle, error = %err, "wait failed; killing child");
                let _ = self.child.kill().await;
            }
            Err(_) => {
                warn!(handle = %self.handle, "child did not exit within grace; force-terminating");
                if let (Some(engine), ChildHandle::Container { name }) =
                    (self.engine.as_deref(), &self.handle)
                {
                    kill_container(engine, name).await;
                }
                let _ = self.child.kill().await;
                let _ = self.child.wait().await;
            }
        }

        if let Some(task) = self.stderr_task.take() {
            task.abort();
        }
    }
}

/// Spawns mount children through the container engine or directly.
#[derive(Clone, Debug)]
pub struct Launcher {
    engine: String,
}

impl Launcher {
    /// Create a launcher using the given engine binary (normally `podman`).
    pub fn new(engine: impl Into<String>) -> Self {
        Self {
            engine: engine.into(),
        }
    }

    /// Pull a container image. Idempotent; called before the first spawn of
    /// a container mount.
    pub async fn pull(&self, image: &str) -> Result<(), LaunchError> {
        info!(image, "pulling container image");
        let output = Command::new(&self.engine)
            .arg("pull")
            .arg(image)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|err| self.classify_engine_error(err))?;

        if output.status.success() {
            Ok(())
        } else {
            Err(LaunchError::PullFailed {
                image: image.to_string(),
                detail: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }

    /// Spawn a child per `spec` with piped stdio.
    ///
    /// When this returns the child is live and its pipes are usable. If the
    /// caller fails subsequent initialization it must tear the child down via
    /// [`SpawnedChild::teardown`].
    pub async fn spawn(
        &self,
        spec: &LaunchSpec,
        env: &BTreeMap<String, String>,
    ) -> Result<(SpawnedChild, ChildStdin, ChildStdout), LaunchError> {
        let (mut command, handle, engine) = match spec {
            LaunchSpec::Container { image, name } => {
                let mut cmd = Command::new(&self.engine);
                cmd.args(container_run_args(name, env, image));
                info!(image, container = %name, "starting interactive container");
                (
                    cmd,
                    ChildHandle::Container { name: name.clone() },
                    Some(self.engine.clone()),
                )
            }
            LaunchSpec::Command { command, args } => {
                let mut cmd = Command::new(command);
                cmd.args(args);
                // Controlled environment: a handful of inherited basics plus
                // the caller-assembled map. Nothing else leaks through.
                cmd.env_clear();
                for key in ["PATH", "HOME", "USER", "SHELL"] {
                    if let Ok(value) = std::env::var(key) {
                        cmd.env(key, value);
                    }
                }
                cmd.envs(env);
                info!(command = %command, args = ?args, "spawning stdio server");
                (cmd, ChildHandle::Process { pid: 0 }, None)
            }
        };

        command
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = command.spawn().map_err(|err| match spec {
            LaunchSpec::Container { .. } => self.classify_engine_error(err),
            LaunchSpec::Command { command, .. } => {
                LaunchError::Spawn(format!("'{command}': {err}"))
            }
        })?;

        let handle = match handle {
            ChildHandle::Process { .. } => ChildHandle::Process {
                pid: child.id().unwrap_or_default(),
            },
            other => other,
        };

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| LaunchError::Spawn("stdin not available".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| LaunchError::Spawn("stdout not available".into()))?;

        let stderr_task = child.stderr.take().map(|stderr| {
            let label = handle.to_string();
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    debug!(child = %label, "stderr: {line}");
                }
            })
        });

        // A child that dies immediately (bad image entrypoint, missing
        // module) should fail the spawn, not the handshake.
        tokio::time::sleep(SPAWN_SETTLE).await;
        if let Ok(Some(status)) = child.try_wait() {
            if let Some(task) = stderr_task {
                task.abort();
            }
            return Err(LaunchError::Spawn(format!(
                "child exited immediately with {status}"
            )));
        }

        Ok((
            SpawnedChild {
                handle,
                child,
                stderr_task,
                engine,
            },
            stdin,
            stdout,
        ))
    }

    fn classify_engine_error(&self, err: std::io::Error) -> LaunchError {
        if err.kind() == std::io::ErrorKind::NotFound {
            LaunchError::EngineMissing(self.engine.clone())
        } else {
            LaunchError::Spawn(err.to_string())
        }
    }
}

/// Argument vector for an interactive, auto-remove container run.
///
/// Environment variables are supplied via `-e KEY=VALUE` flag pairs in
/// sorted key order.
pub fn container_run_args(
    name: &str,
    env: &BTreeMap<String, String>,
    image: &str,
) -> Vec<String> {
    let mut args = vec![
        "run".to_string(),
        "-i".to_string(),
        "--rm".to_string(),
        "--name".to_string(),
        name.to_string(),
    ];
    for (key, value) in env {
        args.push("-e".to_string());
        args.push(format!("{key}={value}"));
    }
    args.push(image.to_string());
    args
}

/// Best-effort `kill` of a container by name during forced teardown.
async fn kill_container(engine: &str, name: &str) {
    let result = Command::new(engine)
        .args(["kill", name])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await;
    if let Err(err) = result {
        warn!(container = %name, error = %err, "engine kill failed");
    }
}

#[cfg(test)]
#[path = "launcher_tests.rs"]
mod tests;
