//! # Points Ledger
//!
//! Pure bookkeeping over user accounts: spendable points, referral counters,
//! and the referral dedup set. Every balance mutation is a ledger operation
//! with explicit before/after accounting, persisted immediately; there is
//! no separate commit phase.
//!
//! ## Invariants
//!
//! - Balances and counters are unsigned; no operation can drive them below
//!   zero. A debit that would do so fails with `InsufficientFunds` and
//!   changes nothing.
//! - `total_referrals >= unclaimed_referrals` at all times: claiming moves
//!   unclaimed into the balance and never touches the total.
//! - Accounts are created lazily on first touch and never deleted.
//!
//! ## Ownership
//!
//! The ledger holds exclusive write access to the users table; the registry
//! and invite tracker mutate accounts only through these methods.

use crate::error::{Error, Result};
use crate::store::{Store, USERS_TABLE};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

// =============================================================================
// User Account
// =============================================================================

/// Persisted per-user account state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserAccount {
    /// Spendable points balance.
    pub points: u64,
    /// Credited referrals not yet converted into points.
    pub unclaimed_referrals: u64,
    /// Lifetime unique referrals. Monotonically non-decreasing.
    pub total_referrals: u64,
    /// Joiner ids already credited to this account. Rejoins hit this set
    /// and are ignored.
    #[serde(default)]
    pub credited_joiners: Vec<String>,
}

// =============================================================================
// Ledger
// =============================================================================

/// Points ledger over all user accounts.
pub struct Ledger {
    store: Arc<Store>,
    accounts: Mutex<HashMap<String, UserAccount>>,
}

impl Ledger {
    /// Loads the ledger from the store.
    pub fn load(store: Arc<Store>) -> Result<Self> {
        let accounts = store.load(USERS_TABLE)?;
        Ok(Self {
            store,
            accounts: Mutex::new(accounts),
        })
    }

    /// Returns the spendable balance, creating the account if needed.
    pub async fn balance(&self, user: &str) -> Result<u64> {
        let mut accounts = self.accounts.lock().await;
        let created = !accounts.contains_key(user);
        let account = accounts.entry(user.to_string()).or_default();
        let balance = account.points;
        if created {
            self.store.save(USERS_TABLE, &*accounts)?;
        }
        Ok(balance)
    }

    /// Returns a snapshot of the account, creating it if needed.
    pub async fn account(&self, user: &str) -> Result<UserAccount> {
        let mut accounts = self.accounts.lock().await;
        let created = !accounts.contains_key(user);
        let snapshot = accounts.entry(user.to_string()).or_default().clone();
        if created {
            self.store.save(USERS_TABLE, &*accounts)?;
        }
        Ok(snapshot)
    }

    /// Credits `amount` points to `user`.
    pub async fn credit(&self, user: &str, amount: u64, reason: &str) -> Result<u64> {
        let mut accounts = self.accounts.lock().await;
        let account = accounts.entry(user.to_string()).or_default();
        let before = account.points;
        account.points += amount;
        let after = account.points;
        self.store.save(USERS_TABLE, &*accounts)?;
        info!(user, amount, before, after, reason, "points credited");
        Ok(after)
    }

    /// Debits `amount` points from `user`.
    ///
    /// Fails with [`Error::InsufficientFunds`] (and no state change) if the
    /// balance is too low.
    pub async fn debit(&self, user: &str, amount: u64, reason: &str) -> Result<u64> {
        let mut accounts = self.accounts.lock().await;
        let account = accounts.entry(user.to_string()).or_default();
        if account.points < amount {
            return Err(Error::InsufficientFunds {
                required: amount,
                available: account.points,
            });
        }
        let before = account.points;
        account.points -= amount;
        let after = account.points;
        self.store.save(USERS_TABLE, &*accounts)?;
        info!(user, amount, before, after, reason, "points debited");
        Ok(after)
    }

    /// Moves `amount` points from `from` to `to`, all-or-nothing.
    ///
    /// The debit side is checked first under the same lock as the credit;
    /// if it fails, the credit never runs.
    pub async fn transfer(&self, from: &str, to: &str, amount: u64) -> Result<()> {
        if amount == 0 {
            return Err(Error::InvalidArgument("amount must be greater than 0".into()));
        }
        if from == to {
            return Err(Error::InvalidArgument(
                "cannot transfer points to yourself".into(),
            ));
        }

        let mut accounts = self.accounts.lock().await;
        let available = accounts.entry(from.to_string()).or_default().points;
        if available < amount {
            return Err(Error::InsufficientFunds {
                required: amount,
                available,
            });
        }
        accounts.entry(from.to_string()).or_default().points -= amount;
        accounts.entry(to.to_string()).or_default().points += amount;
        self.store.save(USERS_TABLE, &*accounts)?;
        info!(from, to, amount, "points transferred");
        Ok(())
    }

    /// Converts all unclaimed referrals into points, returning the amount
    /// claimed. Zeroing and crediting happen under one lock hold.
    pub async fn claim_referrals(&self, user: &str) -> Result<u64> {
        let mut accounts = self.accounts.lock().await;
        let account = accounts.entry(user.to_string()).or_default();
        let claimed = account.unclaimed_referrals;
        account.points += claimed;
        account.unclaimed_referrals = 0;
        self.store.save(USERS_TABLE, &*accounts)?;
        if claimed > 0 {
            info!(user, claimed, "referrals claimed");
        }
        Ok(claimed)
    }

    /// Credits a unique referral to `inviter` for `joiner`.
    ///
    /// Returns `false` without any change if the joiner was already credited
    /// (rejoin). Otherwise the joiner enters the dedup set and both referral
    /// counters increment.
    pub async fn record_referral(&self, inviter: &str, joiner: &str) -> Result<bool> {
        let mut accounts = self.accounts.lock().await;
        let account = accounts.entry(inviter.to_string()).or_default();
        if account.credited_joiners.iter().any(|j| j == joiner) {
            return Ok(false);
        }
        account.credited_joiners.push(joiner.to_string());
        account.unclaimed_referrals += 1;
        account.total_referrals += 1;
        self.store.save(USERS_TABLE, &*accounts)?;
        info!(inviter, joiner, "unique referral credited");
        Ok(true)
    }

    /// Admin-side point grant.
    pub async fn deposit(&self, user: &str, amount: u64) -> Result<u64> {
        self.credit(user, amount, "admin deposit").await
    }

    /// Admin-side point removal, clamped to the available balance.
    ///
    /// Returns the amount actually removed.
    pub async fn deduct_up_to(&self, user: &str, amount: u64) -> Result<u64> {
        let mut accounts = self.accounts.lock().await;
        let account = accounts.entry(user.to_string()).or_default();
        let removed = amount.min(account.points);
        account.points -= removed;
        self.store.save(USERS_TABLE, &*accounts)?;
        info!(user, removed, "points removed by admin");
        Ok(removed)
    }

    /// Returns the top `n` accounts by balance, highest first.
    pub async fn top_balances(&self, n: usize) -> Vec<(String, u64)> {
        let accounts = self.accounts.lock().await;
        let mut ranked: Vec<(String, u64)> = accounts
            .iter()
            .filter(|(_, a)| a.points > 0)
            .map(|(id, a)| (id.clone(), a.points))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked.truncate(n);
        ranked
    }
}
