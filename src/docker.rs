//! Docker CLI runtime adapter.
//!
//! Production implementation of [`ContainerRuntime`] that shells out to the
//! `docker` binary via `tokio::process`. Containers run a systemd-capable
//! image in privileged mode so the in-container init shim can work; the
//! engine itself only relies on the narrow adapter contract.
//!
//! # Bounded Calls
//!
//! Every invocation is wrapped in `tokio::time::timeout`; a hung engine call
//! surfaces as [`Error::RuntimeFailure`] instead of stalling a sweep.
//!
//! [`Error::RuntimeFailure`]: crate::error::Error::RuntimeFailure

use crate::constants::{CONTAINER_READY_WAIT, CONTROL_TIMEOUT, HTTP_PORT_RANGE, VPS_IMAGE};
use crate::error::{Error, Result};
use crate::runtime::{ContainerRuntime, CreatedContainer, ExecOutput};
use crate::vps::ResourceSpec;
use async_trait::async_trait;
use rand::Rng;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info};

/// Container runtime backed by the Docker CLI.
pub struct DockerRuntime {
    /// Image booted for every VPS.
    image: String,
}

impl DockerRuntime {
    /// Creates an adapter using the default VPS image.
    pub fn new() -> Self {
        Self {
            image: VPS_IMAGE.to_string(),
        }
    }

    /// Creates an adapter booting a custom image.
    pub fn with_image(image: impl Into<String>) -> Self {
        Self {
            image: image.into(),
        }
    }

    /// Runs a docker subcommand with a bounded wait and captured output.
    async fn docker(
        &self,
        operation: &'static str,
        container: &str,
        args: &[&str],
        timeout: Duration,
    ) -> Result<ExecOutput> {
        let mut cmd = Command::new("docker");
        cmd.args(args);
        cmd.kill_on_drop(true);

        let output = tokio::time::timeout(timeout, cmd.output())
            .await
            .map_err(|_| Error::runtime(operation, container, format!("timed out after {timeout:?}")))?
            .map_err(|e| Error::runtime(operation, container, e.to_string()))?;

        Ok(ExecOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
        })
    }

    /// Runs a control subcommand that must exit zero.
    async fn control(&self, operation: &'static str, container: &str, args: &[&str]) -> Result<()> {
        let out = self.docker(operation, container, args, CONTROL_TIMEOUT).await?;
        if !out.is_success() {
            return Err(Error::runtime(
                operation,
                container,
                format!("exit status {}", out.exit_code),
            ));
        }
        Ok(())
    }
}

impl Default for DockerRuntime {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContainerRuntime for DockerRuntime {
    async fn create(&self, spec: &ResourceSpec) -> Result<CreatedContainer> {
        let (http_port, name) = {
            let mut rng = rand::rng();
            let http_port = rng.random_range(HTTP_PORT_RANGE);
            let name = format!("vps-{}", rng.random_range(1000..10000));
            (http_port, name)
        };

        let memory = format!("{}g", spec.ram_gb);
        let cpus = spec.cpu_cores.to_string();
        let publish = format!("{http_port}:80");
        let args = [
            "run",
            "-d",
            "--privileged",
            "--cgroupns=host",
            "--tmpfs",
            "/run",
            "--tmpfs",
            "/run/lock",
            "-v",
            "/sys/fs/cgroup:/sys/fs/cgroup:rw",
            "--name",
            name.as_str(),
            "--cpus",
            cpus.as_str(),
            "--memory",
            memory.as_str(),
            "--memory-swap",
            memory.as_str(),
            "-p",
            publish.as_str(),
            self.image.as_str(),
        ];

        let out = self.docker("create", &name, &args, CONTROL_TIMEOUT).await?;
        if !out.is_success() {
            return Err(Error::runtime(
                "create",
                name,
                format!("exit status {}", out.exit_code),
            ));
        }

        // docker prints the full container id; the short form is the
        // canonical identity everywhere else in the engine.
        let id: String = out.stdout.chars().take(12).collect();
        if id.is_empty() {
            return Err(Error::runtime("create", name, "no container id returned"));
        }

        // Give the init system a bounded window to come up before the
        // registry starts exec'ing bootstrap steps.
        tokio::time::sleep(CONTAINER_READY_WAIT).await;

        info!(container = %id, port = http_port, "container created");
        Ok(CreatedContainer { id, http_port })
    }

    async fn start(&self, id: &str) -> Result<()> {
        self.control("start", id, &["start", id]).await
    }

    async fn stop(&self, id: &str) -> Result<()> {
        self.control("stop", id, &["stop", id]).await
    }

    async fn restart(&self, id: &str) -> Result<()> {
        self.control("restart", id, &["restart", id]).await
    }

    async fn destroy(&self, id: &str) -> Result<()> {
        self.control("destroy", id, &["rm", "-f", id]).await
    }

    async fn exec(&self, id: &str, command: &str, timeout: Duration) -> Result<ExecOutput> {
        debug!(container = %id, command, "exec");
        self.docker("exec", id, &["exec", id, "bash", "-c", command], timeout)
            .await
    }

    async fn inspect(&self, id: &str) -> Result<bool> {
        let out = self
            .docker("inspect", id, &["inspect", id], CONTROL_TIMEOUT)
            .await?;
        Ok(out.is_success())
    }
}
