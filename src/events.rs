//! # Notification/Log Sink
//!
//! Structured events emitted for every state-changing operation. Events fan
//! out two ways:
//!
//! 1. An optional [`EventSink`] implemented by the external UI layer (user
//!    DMs, admin activity feed). The engine performs no formatting.
//! 2. A bounded durable journal through the store, truncated to the most
//!    recent [`MAX_JOURNAL_EVENTS`] entries on every append.
//!
//! Sink failures never fail the operation that emitted the event.

use crate::constants::MAX_JOURNAL_EVENTS;
use crate::store::{EVENTS_TABLE, Store};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

// =============================================================================
// Event Types
// =============================================================================

/// One state-changing action, as seen by the activity feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionEvent {
    /// Short action name ("vps deployed", "vps renewed", ...).
    pub action: String,
    /// User id that triggered the action ("system" for sweeps).
    pub actor: String,
    /// Target container id, when the action concerns one VPS.
    #[serde(default)]
    pub target_vps_id: Option<String>,
    /// Free-form detail line.
    #[serde(default)]
    pub details: String,
    /// When the action happened.
    pub timestamp: DateTime<Utc>,
}

impl ActionEvent {
    /// Builds an event stamped with the current time.
    pub fn new(action: impl Into<String>, actor: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            actor: actor.into(),
            target_vps_id: None,
            details: String::new(),
            timestamp: Utc::now(),
        }
    }

    /// Attaches the target container id.
    pub fn vps(mut self, container_id: impl Into<String>) -> Self {
        self.target_vps_id = Some(container_id.into());
        self
    }

    /// Attaches a detail line.
    pub fn details(mut self, details: impl Into<String>) -> Self {
        self.details = details.into();
        self
    }
}

/// Delivery interface implemented by the external UI layer.
pub trait EventSink: Send + Sync {
    /// Delivers one event. Implementations must not block the engine;
    /// failures are the sink's problem.
    fn deliver(&self, event: &ActionEvent);
}

// =============================================================================
// Event Log
// =============================================================================

/// Engine-side event fan-out: durable journal plus optional sink.
pub struct EventLog {
    store: Arc<Store>,
    sink: Option<Arc<dyn EventSink>>,
    journal: Mutex<Vec<ActionEvent>>,
}

impl EventLog {
    /// Loads the journal from the store.
    pub fn load(store: Arc<Store>, sink: Option<Arc<dyn EventSink>>) -> crate::error::Result<Self> {
        let journal: Vec<ActionEvent> = store.load(EVENTS_TABLE)?;
        Ok(Self {
            store,
            sink,
            journal: Mutex::new(journal),
        })
    }

    /// Records an event: journal append (bounded), sink delivery, trace line.
    ///
    /// Journal persistence failures are logged and swallowed; an activity
    /// feed outage must not fail the operation being recorded.
    pub async fn record(&self, event: ActionEvent) {
        info!(
            action = %event.action,
            actor = %event.actor,
            vps = event.target_vps_id.as_deref().unwrap_or("-"),
            details = %event.details,
            "event"
        );

        if let Some(sink) = &self.sink {
            sink.deliver(&event);
        }

        let mut journal = self.journal.lock().await;
        journal.push(event);
        if journal.len() > MAX_JOURNAL_EVENTS {
            let excess = journal.len() - MAX_JOURNAL_EVENTS;
            journal.drain(..excess);
        }
        if let Err(e) = self.store.save(EVENTS_TABLE, &*journal) {
            warn!("failed to persist event journal: {e}");
        }
    }

    /// Returns the most recent `limit` events, newest first.
    pub async fn recent(&self, limit: usize) -> Vec<ActionEvent> {
        let journal = self.journal.lock().await;
        journal.iter().rev().take(limit).cloned().collect()
    }
}
