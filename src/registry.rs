//! # VPS Registry
//!
//! Owns the canonical set of VPS records and coordinates every lifecycle
//! operation: provisioning, start/stop/restart, renewal, reinstall, destroy,
//! sharing, port mapping, and suspension. All mutation paths, the external
//! command layer and the background sweeps alike, funnel through this one
//! authorization and consistency layer.
//!
//! # Lifecycle
//!
//! ```text
//!                    provision
//!   ┌─────────┐   ┌────────────┐  stop   ┌─────────┐
//!   │ (none)  │ ─►│   active   │ ──────► │ stopped │
//!   └─────────┘   └────────────┘ ◄────── └─────────┘
//!        ▲            │    ▲      start       │
//!        │ destroy    │    │ renew /          │ expiry /
//!        │            │    │ unsuspend        │ admin suspend
//!        │            ▼    │                  ▼
//!        │         ┌──────────────────────────────┐
//!        └──────── │          suspended           │
//!                  └──────────────────────────────┘
//! ```
//!
//! Reinstall is destroy + provision collapsed into one registry transaction:
//! the record swap happens only after the replacement container is confirmed.
//!
//! # Concurrency
//!
//! Ledger-gated operations hold the actor's user lock around the whole
//! "check balance → provision → debit" window; lifecycle operations hold the
//! container lock. In-memory state is never held across a runtime call:
//! operations snapshot, await the adapter, then re-lock to commit.

use crate::constants::{
    BOOTSTRAP_COMMANDS, DEPLOY_COST, DESTROY_REFUND, EXEC_TIMEOUT, FALLBACK_SHELL_ACCESS,
    INIT_PROBE_COMMAND, PORT_RANGE, VPS_LIFETIME_DAYS,
};
use crate::config::Settings;
use crate::error::{Error, Result};
use crate::events::{ActionEvent, EventLog};
use crate::ledger::Ledger;
use crate::locks::LockMap;
use crate::runtime::ContainerRuntime;
use crate::store::{Store, VPS_TABLE};
use crate::vps::{ProvisionFlags, ResourceSpec, VpsRecord};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

// =============================================================================
// Aggregate Usage
// =============================================================================

/// Aggregate resource commitment across all records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResourceUsage {
    /// Total VPS count.
    pub vps_count: usize,
    /// Committed RAM in gigabytes.
    pub total_ram_gb: u64,
    /// Committed CPU cores.
    pub total_cpu_cores: u64,
    /// Committed disk in gigabytes.
    pub total_disk_gb: u64,
}

// =============================================================================
// Expiry Arithmetic
// =============================================================================

/// Computes the post-renewal expiry.
///
/// Renewal extends from the current expiry while the lease is still live,
/// but from `now` once it has lapsed; renewing a long-suspended VPS must
/// not backdate the new window into time already lost.
pub fn extend_expiry(
    current: DateTime<Utc>,
    now: DateTime<Utc>,
    duration_days: i64,
) -> DateTime<Utc> {
    current.max(now) + Duration::days(duration_days)
}

// =============================================================================
// VPS Registry
// =============================================================================

/// Canonical registry of leased containers.
pub struct VpsRegistry {
    store: Arc<Store>,
    runtime: Arc<dyn ContainerRuntime>,
    ledger: Arc<Ledger>,
    settings: Arc<Settings>,
    events: Arc<EventLog>,
    records: Mutex<HashMap<String, VpsRecord>>,
    user_locks: LockMap,
    container_locks: LockMap,
}

impl VpsRegistry {
    /// Loads the registry from the store.
    pub fn load(
        store: Arc<Store>,
        runtime: Arc<dyn ContainerRuntime>,
        ledger: Arc<Ledger>,
        settings: Arc<Settings>,
        events: Arc<EventLog>,
    ) -> Result<Self> {
        let records = store.load(VPS_TABLE)?;
        Ok(Self {
            store,
            runtime,
            ledger,
            settings,
            events,
            records: Mutex::new(records),
            user_locks: LockMap::new(),
            container_locks: LockMap::new(),
        })
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Returns the record for a container id.
    pub async fn get(&self, container_id: &str) -> Result<VpsRecord> {
        self.records
            .lock()
            .await
            .get(container_id)
            .cloned()
            .ok_or_else(|| Error::VpsNotFound(container_id.to_string()))
    }

    /// Returns every record the user owns or co-manages.
    pub async fn list_for(&self, user: &str) -> Vec<VpsRecord> {
        self.records
            .lock()
            .await
            .values()
            .filter(|r| r.grants_access(user))
            .cloned()
            .collect()
    }

    /// Returns every record in the registry.
    pub async fn list_all(&self) -> Vec<VpsRecord> {
        self.records.lock().await.values().cloned().collect()
    }

    /// Returns aggregate resource commitment across all records.
    pub async fn resource_usage(&self) -> ResourceUsage {
        let records = self.records.lock().await;
        let mut usage = ResourceUsage {
            vps_count: records.len(),
            ..Default::default()
        };
        for r in records.values() {
            usage.total_ram_gb += u64::from(r.spec.ram_gb);
            usage.total_cpu_cores += u64::from(r.spec.cpu_cores);
            usage.total_disk_gb += u64::from(r.spec.disk_gb);
        }
        usage
    }

    /// Returns true iff `user` may act on `container_id`: configured admin,
    /// record owner, or shared-access grantee.
    pub async fn is_authorized(&self, user: &str, container_id: &str) -> Result<bool> {
        let record = self.get(container_id).await?;
        Ok(self.settings.is_admin(user).await || record.grants_access(user))
    }

    /// Authorization gate used by every mutating operation.
    ///
    /// Returns the record snapshot on success so callers get lookup and
    /// authorization in one step.
    async fn authorize(&self, actor: &str, container_id: &str) -> Result<VpsRecord> {
        let record = self.get(container_id).await?;
        if self.settings.is_admin(actor).await || record.grants_access(actor) {
            Ok(record)
        } else {
            Err(Error::Unauthorized {
                actor: actor.to_string(),
                target: container_id.to_string(),
            })
        }
    }

    // =========================================================================
    // Provisioning
    // =========================================================================

    /// Paid deployment: the standard user-facing path.
    ///
    /// Holds the actor's user lock across the whole check → provision →
    /// debit window so a double-submitted deploy cannot over-spend. Admins
    /// deploy free of charge. The debit lands only after the runtime has
    /// confirmed the container, so a crash mid-way loses revenue, not a paid
    /// container.
    pub async fn deploy(&self, actor: &str, spec: ResourceSpec) -> Result<VpsRecord> {
        let user_lock = self.user_locks.get(actor).await;
        let _guard = user_lock.lock().await;

        let is_admin = self.settings.is_admin(actor).await;
        if !is_admin {
            let available = self.ledger.balance(actor).await?;
            if available < DEPLOY_COST {
                return Err(Error::InsufficientFunds {
                    required: DEPLOY_COST,
                    available,
                });
            }
        }

        let record = self
            .provision(actor, spec, ProvisionFlags::default())
            .await?;

        if !is_admin {
            self.ledger.debit(actor, DEPLOY_COST, "vps deploy").await?;
        }

        self.events
            .record(
                ActionEvent::new("vps deployed", actor)
                    .vps(&record.container_id)
                    .details(format!("{}", record.spec)),
            )
            .await;

        Ok(record)
    }

    /// Provisions a container and registers its record.
    ///
    /// Used directly by admin provisioning and giveaway resolution (no
    /// charge); `deploy` wraps it with the points gate.
    pub async fn provision(
        &self,
        owner: &str,
        spec: ResourceSpec,
        flags: ProvisionFlags,
    ) -> Result<VpsRecord> {
        let record = self.provision_record(owner, spec, flags).await?;

        let mut records = self.records.lock().await;
        records.insert(record.container_id.clone(), record.clone());
        self.store.save(VPS_TABLE, &*records)?;
        drop(records);

        self.events
            .record(
                ActionEvent::new("vps provisioned", owner)
                    .vps(&record.container_id)
                    .details(format!(
                        "{}, systemctl {}",
                        record.spec,
                        if record.systemctl_working { "ok" } else { "degraded" }
                    )),
            )
            .await;

        Ok(record)
    }

    /// Allocates and bootstraps a container, returning an unregistered record.
    ///
    /// The record is built only after the runtime reports the container
    /// exists and a port is allocated; nothing half-created is ever handed to
    /// the registry map. Bootstrap and probe failures are collected per step
    /// and folded into the degraded-capability flag; they never fail the
    /// provision.
    async fn provision_record(
        &self,
        owner: &str,
        spec: ResourceSpec,
        flags: ProvisionFlags,
    ) -> Result<VpsRecord> {
        let created = self.runtime.create(&spec).await?;
        let cid = created.id.clone();

        let mut failed_steps: Vec<&str> = Vec::new();
        for &command in BOOTSTRAP_COMMANDS {
            match self.runtime.exec(&cid, command, EXEC_TIMEOUT).await {
                Ok(out) if out.is_success() => {}
                Ok(out) => {
                    warn!(container = %cid, command, exit = out.exit_code, "bootstrap step failed");
                    failed_steps.push(command);
                }
                Err(e) => {
                    warn!(container = %cid, command, "bootstrap step errored: {e}");
                    failed_steps.push(command);
                }
            }
        }

        let shell_access = self.capture_shell_access(&cid).await;

        let systemctl_working = match self.runtime.exec(&cid, INIT_PROBE_COMMAND, EXEC_TIMEOUT).await
        {
            Ok(out) => out.is_success(),
            Err(e) => {
                warn!(container = %cid, "init probe errored: {e}");
                false
            }
        };

        if !failed_steps.is_empty() {
            warn!(
                container = %cid,
                failed = failed_steps.len(),
                "provisioned with degraded bootstrap"
            );
        }

        let now = Utc::now();
        Ok(VpsRecord {
            owner: owner.to_string(),
            container_id: cid,
            spec,
            http_port: created.http_port,
            shell_access,
            extra_ports: Vec::new(),
            created_at: now,
            expires_at: now + Duration::days(VPS_LIFETIME_DAYS),
            active: true,
            suspended: false,
            paid_plan: flags.paid_plan,
            giveaway_grant: flags.giveaway_grant,
            shared_with: Vec::new(),
            systemctl_working,
            stop_confirmed: true,
        })
    }

    /// Captures a remote-shell connection string from inside the container.
    ///
    /// Best-effort: any failure falls back to the generic endpoint so the
    /// record always carries something usable.
    async fn capture_shell_access(&self, container_id: &str) -> String {
        let _ = self
            .runtime
            .exec(container_id, "pkill -f tmate || true", EXEC_TIMEOUT)
            .await;

        let sock = format!("/tmp/tmate-{container_id}.sock");
        let command = format!(
            "tmate -S {sock} new-session -d && sleep 5 && tmate -S {sock} display -p '#{{tmate_ssh}}'"
        );
        match self.runtime.exec(container_id, &command, EXEC_TIMEOUT).await {
            Ok(out) if out.is_success() && !out.stdout.is_empty() => out.stdout,
            Ok(_) | Err(_) => {
                warn!(container = %container_id, "shell capture failed, using fallback");
                FALLBACK_SHELL_ACCESS.to_string()
            }
        }
    }

    // =========================================================================
    // Start / Stop / Restart
    // =========================================================================

    /// Starts a stopped VPS.
    pub async fn start(&self, container_id: &str, actor: &str) -> Result<()> {
        let lock = self.container_locks.get(container_id).await;
        let _guard = lock.lock().await;

        let record = self.authorize(actor, container_id).await?;
        if record.suspended {
            return Err(Error::Suspended(container_id.to_string()));
        }
        if record.active {
            return Err(Error::AlreadyInState {
                id: container_id.to_string(),
                state: "running".to_string(),
            });
        }

        self.runtime.start(container_id).await?;
        self.update(container_id, |r| r.active = true).await?;
        self.events
            .record(ActionEvent::new("vps started", actor).vps(container_id))
            .await;
        Ok(())
    }

    /// Stops a running VPS.
    pub async fn stop(&self, container_id: &str, actor: &str) -> Result<()> {
        let lock = self.container_locks.get(container_id).await;
        let _guard = lock.lock().await;

        let record = self.authorize(actor, container_id).await?;
        if !record.active {
            return Err(Error::AlreadyInState {
                id: container_id.to_string(),
                state: "stopped".to_string(),
            });
        }

        self.runtime.stop(container_id).await?;
        self.update(container_id, |r| r.active = false).await?;
        self.events
            .record(ActionEvent::new("vps stopped", actor).vps(container_id))
            .await;
        Ok(())
    }

    /// Restarts a VPS regardless of run state.
    pub async fn restart(&self, container_id: &str, actor: &str) -> Result<()> {
        let lock = self.container_locks.get(container_id).await;
        let _guard = lock.lock().await;

        let record = self.authorize(actor, container_id).await?;
        if record.suspended {
            return Err(Error::Suspended(container_id.to_string()));
        }

        self.runtime.restart(container_id).await?;
        self.update(container_id, |r| r.active = true).await?;
        self.events
            .record(ActionEvent::new("vps restarted", actor).vps(container_id))
            .await;
        Ok(())
    }

    // =========================================================================
    // Renewal
    // =========================================================================

    /// Renews a lease at the process-wide renewal tier.
    ///
    /// Giveaway grants are never renewable. The new window runs from the
    /// current expiry if still live, otherwise from now (see
    /// [`extend_expiry`]). A renewed VPS that was stopped is restarted;
    /// restart failure keeps the record active (the lease is paid for) and
    /// is logged for reconciliation.
    pub async fn renew(&self, container_id: &str, actor: &str) -> Result<VpsRecord> {
        let user_lock = self.user_locks.get(actor).await;
        let _user_guard = user_lock.lock().await;
        let lock = self.container_locks.get(container_id).await;
        let _guard = lock.lock().await;

        let record = self.authorize(actor, container_id).await?;
        if record.giveaway_grant {
            return Err(Error::InvalidArgument(
                "giveaway-granted VPS cannot be renewed".to_string(),
            ));
        }

        let mode = self.settings.renewal_mode().await;
        self.ledger.debit(actor, mode.cost(), "vps renewal").await?;

        let was_stopped = !record.active;
        let now = Utc::now();
        let renewed = self
            .update(container_id, |r| {
                r.expires_at = extend_expiry(r.expires_at, now, mode.duration_days());
                r.suspended = false;
                r.active = true;
                r.stop_confirmed = true;
            })
            .await?;

        if was_stopped {
            if let Err(e) = self.runtime.start(container_id).await {
                warn!(container = %container_id, "restart after renewal failed: {e}");
            }
        }

        self.events
            .record(
                ActionEvent::new("vps renewed", actor)
                    .vps(container_id)
                    .details(format!(
                        "{} days for {} points",
                        mode.duration_days(),
                        mode.cost()
                    )),
            )
            .await;

        Ok(renewed)
    }

    // =========================================================================
    // Reinstall
    // =========================================================================

    /// Destroys and re-provisions a VPS with identical spec and owner.
    ///
    /// The prior expiry is preserved exactly: a reinstall grants no
    /// extra lifetime. The registry entry is swapped only once the
    /// replacement container is confirmed; if provisioning fails, the old
    /// record remains authoritative.
    pub async fn reinstall(&self, container_id: &str, actor: &str) -> Result<VpsRecord> {
        let lock = self.container_locks.get(container_id).await;
        let _guard = lock.lock().await;

        let old = self.authorize(actor, container_id).await?;
        if old.suspended {
            return Err(Error::Suspended(container_id.to_string()));
        }

        self.runtime.destroy(container_id).await?;

        let flags = ProvisionFlags {
            paid_plan: old.paid_plan,
            giveaway_grant: old.giveaway_grant,
        };
        let mut replacement = self.provision_record(&old.owner, old.spec, flags).await?;
        replacement.expires_at = old.expires_at;
        replacement.shared_with = old.shared_with.clone();

        let mut records = self.records.lock().await;
        records.remove(container_id);
        records.insert(replacement.container_id.clone(), replacement.clone());
        self.store.save(VPS_TABLE, &*records)?;
        drop(records);

        self.events
            .record(
                ActionEvent::new("vps reinstalled", actor)
                    .vps(&replacement.container_id)
                    .details(format!("replaced {container_id}")),
            )
            .await;

        Ok(replacement)
    }

    // =========================================================================
    // Destroy
    // =========================================================================

    /// Tears down a VPS and removes its record.
    ///
    /// The owner is refunded half the deploy cost unless the VPS was a
    /// giveaway grant or the destroy was admin-initiated. Teardown failure
    /// surfaces verbatim and leaves the record in place.
    pub async fn destroy(&self, container_id: &str, actor: &str) -> Result<u64> {
        let lock = self.container_locks.get(container_id).await;
        let _guard = lock.lock().await;

        let record = self.authorize(actor, container_id).await?;

        self.runtime.destroy(container_id).await?;

        let mut records = self.records.lock().await;
        records.remove(container_id);
        self.store.save(VPS_TABLE, &*records)?;
        drop(records);

        let refund = if record.giveaway_grant || self.settings.is_admin(actor).await {
            0
        } else {
            self.ledger
                .credit(&record.owner, DESTROY_REFUND, "vps destroy refund")
                .await?;
            DESTROY_REFUND
        };

        self.events
            .record(
                ActionEvent::new("vps destroyed", actor)
                    .vps(container_id)
                    .details(format!("refund {refund} points")),
            )
            .await;

        Ok(refund)
    }

    // =========================================================================
    // Sharing
    // =========================================================================

    /// Grants co-management of a VPS to another user. Owner-only.
    pub async fn share(&self, container_id: &str, owner: &str, grantee: &str) -> Result<()> {
        let record = self.get(container_id).await?;
        if record.owner != owner {
            return Err(Error::NotOwner {
                actor: owner.to_string(),
                target: container_id.to_string(),
            });
        }
        if grantee == owner {
            return Err(Error::InvalidArgument(
                "cannot share a VPS with its owner".to_string(),
            ));
        }
        if record.shared_with.iter().any(|u| u == grantee) {
            return Err(Error::AlreadyInState {
                id: container_id.to_string(),
                state: format!("shared with '{grantee}'"),
            });
        }

        self.update(container_id, |r| r.shared_with.push(grantee.to_string()))
            .await?;
        self.events
            .record(
                ActionEvent::new("vps shared", owner)
                    .vps(container_id)
                    .details(format!("with {grantee}")),
            )
            .await;
        Ok(())
    }

    /// Revokes co-management from a user. Owner-only.
    pub async fn unshare(&self, container_id: &str, owner: &str, grantee: &str) -> Result<()> {
        let record = self.get(container_id).await?;
        if record.owner != owner {
            return Err(Error::NotOwner {
                actor: owner.to_string(),
                target: container_id.to_string(),
            });
        }
        if !record.shared_with.iter().any(|u| u == grantee) {
            return Err(Error::AlreadyInState {
                id: container_id.to_string(),
                state: format!("not shared with '{grantee}'"),
            });
        }

        self.update(container_id, |r| r.shared_with.retain(|u| u != grantee))
            .await?;
        self.events
            .record(
                ActionEvent::new("vps unshared", owner)
                    .vps(container_id)
                    .details(format!("from {grantee}")),
            )
            .await;
        Ok(())
    }

    // =========================================================================
    // Port Mapping
    // =========================================================================

    /// Records an extra host port for a VPS.
    ///
    /// The runtime must still recognize the container before the port is
    /// recorded.
    pub async fn add_port(&self, container_id: &str, actor: &str, port: u16) -> Result<()> {
        let record = self.authorize(actor, container_id).await?;
        if !PORT_RANGE.contains(&port) {
            return Err(Error::InvalidArgument(format!(
                "port must be between {} and {}",
                PORT_RANGE.start(),
                PORT_RANGE.end()
            )));
        }
        if record.extra_ports.contains(&port) {
            return Err(Error::AlreadyInState {
                id: container_id.to_string(),
                state: format!("mapping port {port}"),
            });
        }

        if !self.runtime.inspect(container_id).await? {
            return Err(Error::runtime(
                "inspect",
                container_id,
                "container no longer exists",
            ));
        }

        self.update(container_id, |r| r.extra_ports.push(port))
            .await?;
        self.events
            .record(
                ActionEvent::new("port added", actor)
                    .vps(container_id)
                    .details(format!("port {port}")),
            )
            .await;
        Ok(())
    }

    // =========================================================================
    // Suspension (admin)
    // =========================================================================

    /// Suspends a lease. Admin-only.
    pub async fn suspend(&self, container_id: &str, actor: &str) -> Result<()> {
        if !self.settings.is_admin(actor).await {
            return Err(Error::Unauthorized {
                actor: actor.to_string(),
                target: container_id.to_string(),
            });
        }
        let lock = self.container_locks.get(container_id).await;
        let _guard = lock.lock().await;

        let record = self.get(container_id).await?;
        if record.suspended {
            return Err(Error::AlreadyInState {
                id: container_id.to_string(),
                state: "suspended".to_string(),
            });
        }

        self.runtime.stop(container_id).await?;
        self.update(container_id, |r| {
            r.active = false;
            r.suspended = true;
            r.stop_confirmed = true;
        })
        .await?;
        self.events
            .record(
                ActionEvent::new("vps suspended", actor)
                    .vps(container_id)
                    .details("admin suspension"),
            )
            .await;
        Ok(())
    }

    /// Lifts a suspension. Admin-only.
    pub async fn unsuspend(&self, container_id: &str, actor: &str) -> Result<()> {
        if !self.settings.is_admin(actor).await {
            return Err(Error::Unauthorized {
                actor: actor.to_string(),
                target: container_id.to_string(),
            });
        }
        let lock = self.container_locks.get(container_id).await;
        let _guard = lock.lock().await;

        let record = self.get(container_id).await?;
        if !record.suspended {
            return Err(Error::AlreadyInState {
                id: container_id.to_string(),
                state: "not suspended".to_string(),
            });
        }

        self.runtime.start(container_id).await?;
        self.update(container_id, |r| {
            r.active = true;
            r.suspended = false;
            r.stop_confirmed = true;
        })
        .await?;
        self.events
            .record(ActionEvent::new("vps unsuspended", actor).vps(container_id))
            .await;
        Ok(())
    }

    /// Suspends an expired lease on behalf of the expiry sweep.
    ///
    /// The record is marked suspended even when the stop call fails:
    /// `suspended` is the lease's billing state, while `stop_confirmed`
    /// records whether the runtime actually honored the stop so an operator
    /// can reconcile later.
    pub(crate) async fn suspend_expired(&self, container_id: &str) -> Result<()> {
        let lock = self.container_locks.get(container_id).await;
        let _guard = lock.lock().await;

        // Re-check under the lock: a renewal may have raced the sweep.
        let record = self.get(container_id).await?;
        if !record.active || !record.is_expired(Utc::now()) {
            return Ok(());
        }

        let stop_confirmed = match self.runtime.stop(container_id).await {
            Ok(()) => true,
            Err(e) => {
                warn!(container = %container_id, "stop during expiry failed: {e}");
                false
            }
        };

        self.update(container_id, |r| {
            r.active = false;
            r.suspended = true;
            r.stop_confirmed = stop_confirmed;
        })
        .await?;

        self.events
            .record(
                ActionEvent::new("vps expired", "system")
                    .vps(container_id)
                    .details(if stop_confirmed {
                        "auto-suspended".to_string()
                    } else {
                        "auto-suspended; stop unconfirmed".to_string()
                    }),
            )
            .await;
        Ok(())
    }

    /// Container ids of active leases already expired as of `now`.
    pub(crate) async fn expired_active(&self, now: DateTime<Utc>) -> Vec<String> {
        self.records
            .lock()
            .await
            .values()
            .filter(|r| r.active && r.is_expired(now))
            .map(|r| r.container_id.clone())
            .collect()
    }

    // =========================================================================
    // Shell Access
    // =========================================================================

    /// Recaptures the remote-shell connection string.
    pub async fn reset_shell_access(&self, container_id: &str, actor: &str) -> Result<String> {
        let record = self.authorize(actor, container_id).await?;
        if record.suspended {
            return Err(Error::Suspended(container_id.to_string()));
        }

        let shell_access = self.capture_shell_access(container_id).await;
        self.update(container_id, |r| r.shell_access = shell_access.clone())
            .await?;
        self.events
            .record(ActionEvent::new("shell access reset", actor).vps(container_id))
            .await;
        Ok(shell_access)
    }

    // =========================================================================
    // Internal
    // =========================================================================

    /// Applies a mutation to a record and persists the table.
    async fn update(
        &self,
        container_id: &str,
        mutate: impl FnOnce(&mut VpsRecord),
    ) -> Result<VpsRecord> {
        let mut records = self.records.lock().await;
        let record = records
            .get_mut(container_id)
            .ok_or_else(|| Error::VpsNotFound(container_id.to_string()))?;
        mutate(record);
        let snapshot = record.clone();
        self.store.save(VPS_TABLE, &*records)?;
        info!(container = %container_id, status = %snapshot.status(), "record updated");
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extend_expiry_future_keeps_base() {
        let now = Utc::now();
        let current = now + Duration::days(5);
        let extended = extend_expiry(current, now, 15);
        assert_eq!(extended, current + Duration::days(15));
    }

    #[test]
    fn test_extend_expiry_past_starts_from_now() {
        let now = Utc::now();
        let current = now - Duration::days(9);
        let extended = extend_expiry(current, now, 30);
        assert_eq!(extended, now + Duration::days(30));
    }
}
