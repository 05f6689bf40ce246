//! VPS record types.
//!
//! This module defines the persisted state for a leased container:
//! - `ResourceSpec`: Coarse fixed-size resource plan
//! - `VpsRecord`: Canonical per-container record owned by the registry
//! - `VpsStatus`: Derived status view for display layers

use crate::constants::{DEFAULT_CPU_CORES, DEFAULT_DISK_GB, DEFAULT_RAM_GB};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Resource Spec
// =============================================================================

/// Resource plan for a VPS.
///
/// Plans are coarse and fixed-size; the engine does no bin-packing or
/// host-level admission control beyond what the container engine enforces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceSpec {
    /// RAM in gigabytes.
    pub ram_gb: u32,
    /// CPU cores.
    pub cpu_cores: u32,
    /// Disk in gigabytes.
    pub disk_gb: u32,
}

impl ResourceSpec {
    /// Creates a spec with explicit values.
    pub fn new(ram_gb: u32, cpu_cores: u32, disk_gb: u32) -> Self {
        Self {
            ram_gb,
            cpu_cores,
            disk_gb,
        }
    }
}

impl Default for ResourceSpec {
    fn default() -> Self {
        Self {
            ram_gb: DEFAULT_RAM_GB,
            cpu_cores: DEFAULT_CPU_CORES,
            disk_gb: DEFAULT_DISK_GB,
        }
    }
}

impl std::fmt::Display for ResourceSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}GB RAM / {} CPU / {}GB disk",
            self.ram_gb, self.cpu_cores, self.disk_gb
        )
    }
}

// =============================================================================
// Provision Flags
// =============================================================================

/// Flags applied to a record at provisioning time.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProvisionFlags {
    /// Provisioned through a paid plan rather than the points economy.
    pub paid_plan: bool,
    /// Created as a giveaway prize; never renewable.
    pub giveaway_grant: bool,
}

// =============================================================================
// VPS Record
// =============================================================================

/// Canonical record for one leased container.
///
/// Keyed in the registry by the runtime-assigned container id. Owned
/// exclusively by the registry; every mutation goes through a registry
/// operation and is persisted before the operation returns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VpsRecord {
    /// Owning user id. Exactly one owner per record.
    pub owner: String,
    /// Runtime container identifier.
    pub container_id: String,
    /// Resource plan the container was created with.
    pub spec: ResourceSpec,
    /// Host port mapped to the container's HTTP port.
    pub http_port: u16,
    /// Remote-shell connection string captured at provisioning.
    pub shell_access: String,
    /// Extra host ports mapped on request.
    #[serde(default)]
    pub extra_ports: Vec<u16>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Lease expiry timestamp.
    pub expires_at: DateTime<Utc>,
    /// Container is running (as far as the ledger knows).
    pub active: bool,
    /// Lease is suspended (expiry or admin action). Implies `!active`.
    pub suspended: bool,
    /// Provisioned through a paid plan.
    #[serde(default)]
    pub paid_plan: bool,
    /// Created as a giveaway prize; never renewable.
    #[serde(default)]
    pub giveaway_grant: bool,
    /// Users granted co-management. Never contains the owner.
    #[serde(default)]
    pub shared_with: Vec<String>,
    /// Whether the init shim probe succeeded after bootstrap.
    pub systemctl_working: bool,
    /// Whether the runtime confirmed the last suspension's stop call.
    ///
    /// `suspended` is ledger truth; this flag carries runtime truth so an
    /// operator can reconcile containers that refused to stop.
    #[serde(default = "default_stop_confirmed")]
    pub stop_confirmed: bool,
}

fn default_stop_confirmed() -> bool {
    true
}

impl VpsRecord {
    /// Derived status for display layers.
    pub fn status(&self) -> VpsStatus {
        if self.suspended {
            VpsStatus::Suspended
        } else if self.active {
            VpsStatus::Running
        } else {
            VpsStatus::Stopped
        }
    }

    /// Returns true if `user` owns this record or has shared access.
    pub fn grants_access(&self, user: &str) -> bool {
        self.owner == user || self.shared_with.iter().any(|u| u == user)
    }

    /// Returns true if the lease has expired as of `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

// =============================================================================
// VPS Status
// =============================================================================

/// High-level record status derived from the lifecycle flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VpsStatus {
    /// Active and (as far as the ledger knows) running.
    Running,
    /// Stopped by its manager but still leased.
    Stopped,
    /// Lease suspended; must be renewed or unsuspended to run again.
    Suspended,
}

impl std::fmt::Display for VpsStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VpsStatus::Running => write!(f, "running"),
            VpsStatus::Stopped => write!(f, "stopped"),
            VpsStatus::Suspended => write!(f, "suspended"),
        }
    }
}
