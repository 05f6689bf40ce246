//! # Giveaways
//!
//! Admin-created VPS giveaways: users join while the giveaway is active; the
//! giveaway sweep resolves it after its end time into freshly provisioned
//! prize VPS. Records are retained forever as history: a resolved giveaway
//! is marked ended, never deleted.

use crate::error::{Error, Result};
use crate::store::{GIVEAWAYS_TABLE, Store};
use crate::vps::ResourceSpec;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

// =============================================================================
// Giveaway Types
// =============================================================================

/// How winners are chosen when a giveaway resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WinnerPolicy {
    /// One participant drawn uniformly at random.
    SingleRandom,
    /// Every participant receives a prize VPS.
    AllParticipants,
}

impl WinnerPolicy {
    /// Parses a policy name as given by the command layer.
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "random" | "single_random" => Ok(Self::SingleRandom),
            "all" | "all_participants" => Ok(Self::AllParticipants),
            other => Err(Error::InvalidArgument(format!(
                "unknown winner policy '{other}' (expected 'random' or 'all')"
            ))),
        }
    }
}

/// Giveaway lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GiveawayStatus {
    /// Accepting joins.
    Active,
    /// Resolved by the sweep (or ended empty).
    Ended,
}

/// Persisted giveaway record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GiveawayRecord {
    /// Generated id.
    pub id: String,
    /// Admin who created the giveaway.
    pub creator: String,
    /// Free-form description shown by the UI layer.
    pub description: String,
    /// Resource plan of each prize VPS.
    pub prize: ResourceSpec,
    /// Winner selection policy.
    pub policy: WinnerPolicy,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// When joins close and resolution becomes due.
    pub ends_at: DateTime<Utc>,
    /// Current status.
    pub status: GiveawayStatus,
    /// Joined user ids. Membership is unique; order carries no meaning.
    #[serde(default)]
    pub participants: Vec<String>,
    /// Resolved winner(s).
    #[serde(default)]
    pub winners: Vec<String>,
    /// Prize VPS successfully provisioned during resolution.
    #[serde(default)]
    pub successful_grants: u32,
    /// Set when the giveaway ended with nobody joined.
    #[serde(default)]
    pub no_participants: bool,
}

impl GiveawayRecord {
    /// Returns true if the giveaway is due for resolution as of `now`.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.status == GiveawayStatus::Active && now >= self.ends_at
    }
}

/// Outcome of resolving one giveaway, applied by [`Giveaways::resolve`].
#[derive(Debug, Clone)]
pub struct Resolution {
    /// Users that won a prize draw (may be empty for an empty giveaway).
    pub winners: Vec<String>,
    /// Prize VPS that were actually provisioned.
    pub successful_grants: u32,
}

// =============================================================================
// Giveaway Manager
// =============================================================================

/// Owns the giveaways table.
pub struct Giveaways {
    store: Arc<Store>,
    records: Mutex<HashMap<String, GiveawayRecord>>,
}

impl Giveaways {
    /// Loads the manager from the store.
    pub fn load(store: Arc<Store>) -> Result<Self> {
        let records = store.load(GIVEAWAYS_TABLE)?;
        Ok(Self {
            store,
            records: Mutex::new(records),
        })
    }

    /// Creates a giveaway ending `duration` from now.
    pub async fn create(
        &self,
        creator: &str,
        description: &str,
        prize: ResourceSpec,
        policy: WinnerPolicy,
        duration: chrono::Duration,
    ) -> Result<GiveawayRecord> {
        if duration < chrono::Duration::minutes(1) {
            return Err(Error::InvalidArgument(
                "giveaway must run for at least one minute".to_string(),
            ));
        }

        let now = Utc::now();
        let record = GiveawayRecord {
            id: uuid::Uuid::now_v7().to_string(),
            creator: creator.to_string(),
            description: description.to_string(),
            prize,
            policy,
            created_at: now,
            ends_at: now + duration,
            status: GiveawayStatus::Active,
            participants: Vec::new(),
            winners: Vec::new(),
            successful_grants: 0,
            no_participants: false,
        };

        let mut records = self.records.lock().await;
        records.insert(record.id.clone(), record.clone());
        self.store.save(GIVEAWAYS_TABLE, &*records)?;
        info!(giveaway = %record.id, ?policy, "giveaway created");
        Ok(record)
    }

    /// Adds a participant to an active giveaway.
    pub async fn join(&self, giveaway_id: &str, user: &str) -> Result<()> {
        let mut records = self.records.lock().await;
        let record = records
            .get_mut(giveaway_id)
            .ok_or_else(|| Error::GiveawayNotFound(giveaway_id.to_string()))?;

        if record.status != GiveawayStatus::Active {
            return Err(Error::AlreadyInState {
                id: giveaway_id.to_string(),
                state: "ended".to_string(),
            });
        }
        if record.participants.iter().any(|p| p == user) {
            return Err(Error::AlreadyInState {
                id: giveaway_id.to_string(),
                state: format!("joined by '{user}'"),
            });
        }

        record.participants.push(user.to_string());
        self.store.save(GIVEAWAYS_TABLE, &*records)?;
        Ok(())
    }

    /// Returns a giveaway by id.
    pub async fn get(&self, giveaway_id: &str) -> Result<GiveawayRecord> {
        self.records
            .lock()
            .await
            .get(giveaway_id)
            .cloned()
            .ok_or_else(|| Error::GiveawayNotFound(giveaway_id.to_string()))
    }

    /// Returns every giveaway, active and ended.
    pub async fn list_all(&self) -> Vec<GiveawayRecord> {
        self.records.lock().await.values().cloned().collect()
    }

    /// Giveaways due for resolution as of `now`.
    pub(crate) async fn due(&self, now: DateTime<Utc>) -> Vec<GiveawayRecord> {
        self.records
            .lock()
            .await
            .values()
            .filter(|g| g.is_due(now))
            .cloned()
            .collect()
    }

    /// Applies a resolution outcome and marks the giveaway ended.
    pub(crate) async fn resolve(&self, giveaway_id: &str, outcome: Resolution) -> Result<()> {
        let mut records = self.records.lock().await;
        let record = records
            .get_mut(giveaway_id)
            .ok_or_else(|| Error::GiveawayNotFound(giveaway_id.to_string()))?;

        record.status = GiveawayStatus::Ended;
        record.no_participants = record.participants.is_empty();
        record.winners = outcome.winners;
        record.successful_grants = outcome.successful_grants;
        let grants = record.successful_grants;
        self.store.save(GIVEAWAYS_TABLE, &*records)?;
        info!(
            giveaway = %giveaway_id,
            grants = grants,
            "giveaway resolved"
        );
        Ok(())
    }
}
