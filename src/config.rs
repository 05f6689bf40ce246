//! # Access Policy & Engine Settings
//!
//! Owns the persisted config document: the administrator id set, the active
//! log-sink target, and the process-wide renewal mode.
//!
//! Admin membership is an explicit grant/revoke policy with its own persisted
//! state rather than an ambient mutable set; every privileged check in the
//! engine goes through [`Settings::is_admin`].

use crate::constants::{
    RENEW_COST_EXTENDED, RENEW_COST_STANDARD, RENEW_DAYS_EXTENDED, RENEW_DAYS_STANDARD,
};
use crate::error::{Error, Result};
use crate::store::{CONFIG_TABLE, Store};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

// =============================================================================
// Renewal Mode
// =============================================================================

/// Process-wide renewal tier. Two fixed {cost, duration} pairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenewalMode {
    /// 15 days for [`RENEW_COST_STANDARD`] points.
    #[default]
    Standard,
    /// 30 days for [`RENEW_COST_EXTENDED`] points.
    Extended,
}

impl RenewalMode {
    /// Points debited for one renewal at this tier.
    pub fn cost(self) -> u64 {
        match self {
            RenewalMode::Standard => RENEW_COST_STANDARD,
            RenewalMode::Extended => RENEW_COST_EXTENDED,
        }
    }

    /// Days added by one renewal at this tier.
    pub fn duration_days(self) -> i64 {
        match self {
            RenewalMode::Standard => RENEW_DAYS_STANDARD,
            RenewalMode::Extended => RENEW_DAYS_EXTENDED,
        }
    }
}

// =============================================================================
// Config Document
// =============================================================================

/// Persisted config document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ConfigDoc {
    /// Grantable administrator ids.
    #[serde(default)]
    admins: Vec<String>,
    /// Where the external UI layer should deliver the activity feed.
    #[serde(default)]
    log_target: Option<String>,
    /// Active renewal tier.
    #[serde(default)]
    renewal_mode: RenewalMode,
}

// =============================================================================
// Settings
// =============================================================================

/// Access policy and engine settings over the config document.
pub struct Settings {
    store: Arc<Store>,
    /// Ids that are always administrators, fixed at construction.
    root_admins: Vec<String>,
    doc: Mutex<ConfigDoc>,
}

impl Settings {
    /// Loads settings from the store.
    ///
    /// `root_admins` are privileged unconditionally and cannot be revoked;
    /// grants issued at runtime persist in the config document.
    pub fn load(store: Arc<Store>, root_admins: Vec<String>) -> Result<Self> {
        let doc = store.load(CONFIG_TABLE)?;
        Ok(Self {
            store,
            root_admins,
            doc: Mutex::new(doc),
        })
    }

    // =========================================================================
    // Access Policy
    // =========================================================================

    /// Returns true if `user` holds admin privileges.
    pub async fn is_admin(&self, user: &str) -> bool {
        if self.root_admins.iter().any(|a| a == user) {
            return true;
        }
        self.doc.lock().await.admins.iter().any(|a| a == user)
    }

    /// Grants admin privileges to `user`.
    pub async fn grant_admin(&self, user: &str) -> Result<()> {
        let mut doc = self.doc.lock().await;
        if self.root_admins.iter().any(|a| a == user) || doc.admins.iter().any(|a| a == user) {
            return Err(Error::AlreadyInState {
                id: user.to_string(),
                state: "an admin".to_string(),
            });
        }
        doc.admins.push(user.to_string());
        self.store.save(CONFIG_TABLE, &*doc)?;
        info!(user, "admin granted");
        Ok(())
    }

    /// Revokes a runtime-granted admin.
    ///
    /// Root admins cannot be revoked.
    pub async fn revoke_admin(&self, user: &str) -> Result<()> {
        if self.root_admins.iter().any(|a| a == user) {
            return Err(Error::InvalidArgument(format!(
                "'{user}' is a root admin and cannot be revoked"
            )));
        }
        let mut doc = self.doc.lock().await;
        let before = doc.admins.len();
        doc.admins.retain(|a| a != user);
        if doc.admins.len() == before {
            return Err(Error::AlreadyInState {
                id: user.to_string(),
                state: "not an admin".to_string(),
            });
        }
        self.store.save(CONFIG_TABLE, &*doc)?;
        info!(user, "admin revoked");
        Ok(())
    }

    /// Lists all admins, root first.
    pub async fn admins(&self) -> Vec<String> {
        let doc = self.doc.lock().await;
        let mut all = self.root_admins.clone();
        for a in &doc.admins {
            if !all.contains(a) {
                all.push(a.clone());
            }
        }
        all
    }

    // =========================================================================
    // Settings
    // =========================================================================

    /// Returns the active log-sink target.
    pub async fn log_target(&self) -> Option<String> {
        self.doc.lock().await.log_target.clone()
    }

    /// Sets the log-sink target.
    pub async fn set_log_target(&self, target: Option<String>) -> Result<()> {
        let mut doc = self.doc.lock().await;
        doc.log_target = target;
        self.store.save(CONFIG_TABLE, &*doc)?;
        Ok(())
    }

    /// Returns the active renewal tier.
    pub async fn renewal_mode(&self) -> RenewalMode {
        self.doc.lock().await.renewal_mode
    }

    /// Switches the process-wide renewal tier.
    pub async fn set_renewal_mode(&self, mode: RenewalMode) -> Result<()> {
        let mut doc = self.doc.lock().await;
        doc.renewal_mode = mode;
        self.store.save(CONFIG_TABLE, &*doc)?;
        info!(?mode, "renewal mode changed");
        Ok(())
    }
}
