//! Container runtime adapter trait.
//!
//! This trait is the engine's only view of the external container engine:
//! - `create`: Allocate a container for a resource plan
//! - `start` / `stop` / `restart`: Coarse lifecycle control
//! - `destroy`: Tear a container down and release its resources
//! - `exec`: Run a command inside the container (bootstrap, probes)
//! - `inspect`: Check whether the engine still recognizes a container
//!
//! # Narrow By Design
//!
//! The registry never talks to the container engine directly; everything
//! funnels through this contract so tests can substitute a scripted
//! implementation and the production backend stays swappable.

use crate::error::Result;
use crate::vps::ResourceSpec;
use async_trait::async_trait;
use std::time::Duration;

// =============================================================================
// Adapter Types
// =============================================================================

/// Result of a successful container allocation.
#[derive(Debug, Clone)]
pub struct CreatedContainer {
    /// Runtime-assigned container identifier (opaque, globally unique).
    pub id: String,
    /// Host port mapped to the container's HTTP port.
    pub http_port: u16,
}

/// Captured output of an in-container command.
#[derive(Debug, Clone)]
pub struct ExecOutput {
    /// Exit status of the command.
    pub exit_code: i32,
    /// Captured standard output.
    pub stdout: String,
}

impl ExecOutput {
    /// Returns true if the command exited successfully.
    pub fn is_success(&self) -> bool {
        self.exit_code == 0
    }
}

// =============================================================================
// Container Runtime Trait
// =============================================================================

/// Narrow capability interface over the external container engine.
///
/// # Lifecycle
///
/// ```text
/// create(spec) → [exec(id, ...)] → stop(id) ⇄ start(id) → destroy(id)
/// ```
///
/// # Error Contract
///
/// Every method maps engine refusals and timeouts to
/// [`Error::RuntimeFailure`]; the caller decides whether that is fatal
/// (user-requested lifecycle calls) or downgradable (best-effort bootstrap).
///
/// [`Error::RuntimeFailure`]: crate::error::Error::RuntimeFailure
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Allocates and boots a container for the given resource plan.
    ///
    /// Returns only once the engine reports the container exists and a host
    /// HTTP port has been allocated; implementations also perform their own
    /// bounded wait for the container to become responsive.
    async fn create(&self, spec: &ResourceSpec) -> Result<CreatedContainer>;

    /// Starts a stopped container.
    async fn start(&self, id: &str) -> Result<()>;

    /// Stops a running container.
    async fn stop(&self, id: &str) -> Result<()>;

    /// Restarts a container regardless of current state.
    async fn restart(&self, id: &str) -> Result<()>;

    /// Destroys a container, forcing it down if still running.
    async fn destroy(&self, id: &str) -> Result<()>;

    /// Executes a shell command inside a running container.
    ///
    /// The call is bounded by `timeout`; expiry maps to a runtime failure.
    async fn exec(&self, id: &str, command: &str, timeout: Duration) -> Result<ExecOutput>;

    /// Returns whether the engine still recognizes the container.
    async fn inspect(&self, id: &str) -> Result<bool>;
}
