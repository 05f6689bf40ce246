//! # Engine Constants
//!
//! Defines the points economy, lease lifetimes, sweep cadence, and runtime
//! adapter bounds for the VPS engine. These constants are the **single source
//! of truth** for every economic and timing decision in the codebase.
//!
//! ## Modification Guidelines
//!
//! Before modifying any constant:
//! 1. Consider interactions with other values (e.g. `DEPLOY_COST` anchors the
//!    destroy refund and the renewal tiers).
//! 2. Update dependent tests and documentation.
//!
//! ## Cross-References
//!
//! - [`crate::registry`]: Uses the economy constants and lease lifetime
//! - [`crate::docker`]: Uses the adapter timeouts and port range
//! - [`crate::sweep`]: Uses the sweep periods
//! - [`crate::events`]: Uses the journal bound

use std::ops::RangeInclusive;
use std::time::Duration;

// =============================================================================
// Points Economy
// =============================================================================
//
// All prices are denominated in referral points (1 unique invite = 1 point).
// The refund on destroy is half the deploy cost, rounded down.
// =============================================================================

/// Points debited for a standard VPS deployment.
pub const DEPLOY_COST: u64 = 40;

/// Points debited for a renewal under [`RenewalMode::Standard`].
///
/// [`RenewalMode::Standard`]: crate::config::RenewalMode::Standard
pub const RENEW_COST_STANDARD: u64 = 10;

/// Points debited for a renewal under [`RenewalMode::Extended`].
///
/// [`RenewalMode::Extended`]: crate::config::RenewalMode::Extended
pub const RENEW_COST_EXTENDED: u64 = 20;

/// Days added by a standard-tier renewal.
pub const RENEW_DAYS_STANDARD: i64 = 15;

/// Days added by an extended-tier renewal.
pub const RENEW_DAYS_EXTENDED: i64 = 30;

/// Points refunded when an owner destroys a non-giveaway VPS.
///
/// Integer division: with an odd deploy cost the remainder is kept by the
/// house. Giveaway grants and admin-initiated destroys refund nothing.
pub const DESTROY_REFUND: u64 = DEPLOY_COST / 2;

// =============================================================================
// Lease Lifetimes
// =============================================================================

/// Fixed lifetime of every freshly provisioned VPS, giveaway grants included.
pub const VPS_LIFETIME_DAYS: i64 = 15;

// =============================================================================
// Default Resource Plan
// =============================================================================
//
// The engine manages coarse fixed-size plans on a single host; these are the
// defaults applied when the caller does not pick an explicit spec.
// =============================================================================

/// Default RAM allocation in gigabytes.
pub const DEFAULT_RAM_GB: u32 = 8;

/// Default CPU core allocation.
pub const DEFAULT_CPU_CORES: u32 = 2;

/// Default disk allocation in gigabytes.
pub const DEFAULT_DISK_GB: u32 = 20;

// =============================================================================
// Sweep Cadence
// =============================================================================

/// Period of the expiry sweep (suspends VPS past their expiry timestamp).
pub const EXPIRY_SWEEP_PERIOD: Duration = Duration::from_secs(10 * 60);

/// Period of the giveaway sweep (resolves ended giveaways into prize VPS).
pub const GIVEAWAY_SWEEP_PERIOD: Duration = Duration::from_secs(5 * 60);

// =============================================================================
// Runtime Adapter Bounds
// =============================================================================
//
// Every adapter call is bounded. The registry imposes no additional per-call
// budget beyond these; condition-based failures are retried naturally by the
// next sweep tick.
// =============================================================================

/// Container image used for provisioned VPS.
///
/// Must ship an init system so the in-container bootstrap can enable the
/// init shim; capability is probed after bootstrap and recorded per record.
pub const VPS_IMAGE: &str = "jrei/systemd-ubuntu:22.04";

/// Host port range from which HTTP ports are allocated.
pub const HTTP_PORT_RANGE: RangeInclusive<u16> = 3000..=3999;

/// Wait after container creation before the first exec, giving the init
/// system time to reach a responsive state.
pub const CONTAINER_READY_WAIT: Duration = Duration::from_secs(15);

/// Upper bound on a single in-container command execution.
pub const EXEC_TIMEOUT: Duration = Duration::from_secs(120);

/// Upper bound on container create/start/stop/restart/destroy calls.
pub const CONTROL_TIMEOUT: Duration = Duration::from_secs(60);

/// In-container bootstrap steps run after creation, in order.
///
/// Each step is best-effort: a failure degrades the record's capability flag
/// instead of failing the provision.
pub const BOOTSTRAP_COMMANDS: &[&str] = &[
    "apt-get update -y",
    "apt-get install -y tmate curl wget neofetch sudo nano htop",
    "systemctl enable systemd-user-sessions",
    "systemctl start systemd-user-sessions",
];

/// Probe that decides whether the init shim is usable inside the container.
pub const INIT_PROBE_COMMAND: &str = "systemctl --version";

/// Shell-access string recorded when remote-shell capture fails.
pub const FALLBACK_SHELL_ACCESS: &str = "ssh@tmate.io";

// =============================================================================
// Durable Journal
// =============================================================================

/// Maximum number of events retained in the durable journal.
///
/// The journal is truncated to the most recent entries on every append, so
/// it never grows without bound.
pub const MAX_JOURNAL_EVENTS: usize = 1000;

// =============================================================================
// Validation Bounds
// =============================================================================

/// Valid range for user-mapped extra ports.
pub const PORT_RANGE: RangeInclusive<u16> = 1..=65535;
