//! # Invite/Referral Tracker
//!
//! Attributes platform join events to inviters by diffing the current
//! invite-usage table against the snapshot taken at the last processed join.
//!
//! ## Idempotence Model
//!
//! The snapshot is only a differencing baseline and is unconditionally
//! overwritten after every processed join; out-of-order processing of two
//! joins is therefore a benign race. The inviter's credited-joiner dedup set
//! (owned by the ledger) is the source of truth: a rejoin is ignored without
//! error no matter how the snapshot looked.

use crate::error::Result;
use crate::ledger::Ledger;
use crate::store::{INVITES_TABLE, Store};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

// =============================================================================
// Snapshot Types
// =============================================================================

/// Observed state of one invite code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InviteUse {
    /// Cumulative use count reported by the platform.
    pub uses: u64,
    /// Inviter who created the link, if the platform knows it.
    pub inviter: Option<String>,
}

/// Per-guild snapshot: invite code → last observed use.
pub type GuildSnapshot = HashMap<String, InviteUse>;

/// Outcome of processing one join event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinOutcome {
    /// A unique join; the inviter was credited one referral.
    Credited { inviter: String },
    /// The joiner was already credited to this inviter; ignored.
    Rejoin { inviter: String },
    /// No invite's use count increased, or the used invite has no known
    /// inviter; nothing to credit.
    Unattributed,
}

// =============================================================================
// Invite Tracker
// =============================================================================

/// Deduplicating referral tracker over platform invite usage.
pub struct InviteTracker {
    store: Arc<Store>,
    ledger: Arc<Ledger>,
    snapshots: Mutex<HashMap<String, GuildSnapshot>>,
}

impl InviteTracker {
    /// Loads the tracker from the store.
    pub fn load(store: Arc<Store>, ledger: Arc<Ledger>) -> Result<Self> {
        let snapshots = store.load(INVITES_TABLE)?;
        Ok(Self {
            store,
            ledger,
            snapshots: Mutex::new(snapshots),
        })
    }

    /// Processes a join event against the current invite-usage table.
    ///
    /// Infers the consumed invite by finding a code whose use count exceeds
    /// the stored snapshot, credits its inviter through the ledger unless the
    /// joiner is a rejoin, then overwrites the snapshot with `current`.
    pub async fn process_join(
        &self,
        guild: &str,
        joiner: &str,
        current: &HashMap<String, InviteUse>,
    ) -> Result<JoinOutcome> {
        let mut snapshots = self.snapshots.lock().await;
        let baseline = snapshots.entry(guild.to_string()).or_default();

        let consumed = current.iter().find(|(code, use_now)| {
            let uses_before = baseline.get(*code).map(|u| u.uses).unwrap_or(0);
            use_now.uses > uses_before
        });

        let outcome = match consumed {
            Some((code, InviteUse { inviter: Some(inviter), .. })) => {
                if self.ledger.record_referral(inviter, joiner).await? {
                    info!(guild, joiner, inviter = %inviter, code = %code, "unique join credited");
                    JoinOutcome::Credited {
                        inviter: inviter.clone(),
                    }
                } else {
                    debug!(guild, joiner, inviter = %inviter, "rejoin ignored");
                    JoinOutcome::Rejoin {
                        inviter: inviter.clone(),
                    }
                }
            }
            _ => {
                debug!(guild, joiner, "join could not be attributed");
                JoinOutcome::Unattributed
            }
        };

        // The snapshot is overwritten even when nothing was credited, so the
        // next diff starts from the freshest usage table.
        *baseline = current.clone();
        self.store.save(INVITES_TABLE, &*snapshots)?;

        Ok(outcome)
    }

    /// Returns the stored snapshot for a guild, if any.
    pub async fn snapshot(&self, guild: &str) -> Option<GuildSnapshot> {
        self.snapshots.lock().await.get(guild).cloned()
    }
}
