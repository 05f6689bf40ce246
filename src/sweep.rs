//! # Background Sweeps
//!
//! Two fixed-period schedulers drive unattended state transitions through
//! the same registry operations the command layer uses:
//!
//! - [`ExpirySweeper`]: suspends leases past their expiry timestamp.
//! - [`GiveawaySweeper`]: resolves ended giveaways into prize VPS.
//!
//! # Tick Semantics
//!
//! A tick is one full pass over the target table. Items are processed to
//! completion one at a time (a selected item is never abandoned mid-way),
//! and a new tick does not begin until the previous one finished: the
//! interval is awaited between full passes. Per-item failures are logged
//! and isolated; the next tick retries whatever condition still holds.

use crate::constants::{EXPIRY_SWEEP_PERIOD, GIVEAWAY_SWEEP_PERIOD};
use crate::events::{ActionEvent, EventLog};
use crate::giveaway::{Giveaways, Resolution, WinnerPolicy};
use crate::registry::VpsRegistry;
use crate::vps::ProvisionFlags;
use chrono::{DateTime, Utc};
use rand::Rng;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

// =============================================================================
// Expiry Sweeper
// =============================================================================

/// Periodic sweep suspending VPS past their expiry timestamp.
pub struct ExpirySweeper {
    registry: Arc<VpsRegistry>,
}

impl ExpirySweeper {
    /// Creates the sweeper.
    pub fn new(registry: Arc<VpsRegistry>) -> Self {
        Self { registry }
    }

    /// Runs forever at the configured period.
    pub async fn run(self) {
        let mut interval = tokio::time::interval(EXPIRY_SWEEP_PERIOD);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            self.tick(Utc::now()).await;
        }
    }

    /// One full pass: suspends every active lease expired as of `now`.
    ///
    /// Returns the number of leases suspended this pass. Suspended records
    /// no longer match the selection predicate, so they are excluded from
    /// stop attempts on subsequent ticks.
    pub async fn tick(&self, now: DateTime<Utc>) -> usize {
        let expired = self.registry.expired_active(now).await;
        if expired.is_empty() {
            debug!("expiry sweep: nothing due");
            return 0;
        }

        let mut suspended = 0;
        for container_id in expired {
            match self.registry.suspend_expired(&container_id).await {
                Ok(()) => suspended += 1,
                Err(e) => warn!(container = %container_id, "expiry suspension failed: {e}"),
            }
        }
        info!(suspended, "expiry sweep complete");
        suspended
    }
}

// =============================================================================
// Giveaway Sweeper
// =============================================================================

/// Periodic sweep resolving giveaways past their end time.
pub struct GiveawaySweeper {
    giveaways: Arc<Giveaways>,
    registry: Arc<VpsRegistry>,
    events: Arc<EventLog>,
}

impl GiveawaySweeper {
    /// Creates the sweeper.
    pub fn new(giveaways: Arc<Giveaways>, registry: Arc<VpsRegistry>, events: Arc<EventLog>) -> Self {
        Self {
            giveaways,
            registry,
            events,
        }
    }

    /// Runs forever at the configured period.
    pub async fn run(self) {
        let mut interval = tokio::time::interval(GIVEAWAY_SWEEP_PERIOD);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            self.tick(Utc::now()).await;
        }
    }

    /// One full pass: resolves every giveaway due as of `now`.
    ///
    /// Returns the number of giveaways resolved this pass.
    pub async fn tick(&self, now: DateTime<Utc>) -> usize {
        let due = self.giveaways.due(now).await;
        if due.is_empty() {
            debug!("giveaway sweep: nothing due");
            return 0;
        }

        let mut resolved = 0;
        for giveaway in due {
            let outcome = self.resolve_one(&giveaway).await;
            match self.giveaways.resolve(&giveaway.id, outcome).await {
                Ok(()) => resolved += 1,
                Err(e) => error!(giveaway = %giveaway.id, "failed to mark resolved: {e}"),
            }
        }
        info!(resolved, "giveaway sweep complete");
        resolved
    }

    /// Draws winners and provisions their prize VPS.
    ///
    /// Provisioning failures are isolated per participant: one failure never
    /// aborts the remaining grants, and the giveaway still ends with an
    /// accurate grant count. Prize VPS carry the standard lifetime from
    /// their own creation time.
    async fn resolve_one(&self, giveaway: &crate::giveaway::GiveawayRecord) -> Resolution {
        if giveaway.participants.is_empty() {
            self.events
                .record(
                    ActionEvent::new("giveaway ended", "system")
                        .details(format!("{}: no participants", giveaway.id)),
                )
                .await;
            return Resolution {
                winners: Vec::new(),
                successful_grants: 0,
            };
        }

        let winners: Vec<String> = match giveaway.policy {
            WinnerPolicy::SingleRandom => {
                let idx = rand::rng().random_range(0..giveaway.participants.len());
                vec![giveaway.participants[idx].clone()]
            }
            WinnerPolicy::AllParticipants => giveaway.participants.clone(),
        };

        let flags = ProvisionFlags {
            paid_plan: false,
            giveaway_grant: true,
        };
        let mut successful_grants = 0;
        for winner in &winners {
            match self.registry.provision(winner, giveaway.prize, flags).await {
                Ok(record) => {
                    successful_grants += 1;
                    self.events
                        .record(
                            ActionEvent::new("giveaway prize granted", "system")
                                .vps(&record.container_id)
                                .details(format!("{} won {}", winner, giveaway.id)),
                        )
                        .await;
                }
                Err(e) => {
                    error!(
                        giveaway = %giveaway.id,
                        winner = %winner,
                        "prize provisioning failed: {e}"
                    );
                }
            }
        }

        self.events
            .record(
                ActionEvent::new("giveaway ended", "system").details(format!(
                    "{}: {} winner(s), {} grant(s)",
                    giveaway.id,
                    winners.len(),
                    successful_grants
                )),
            )
            .await;

        Resolution {
            winners,
            successful_grants,
        }
    }
}
