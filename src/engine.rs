//! Engine assembly.
//!
//! Wires the store, ledger, tracker, registry, giveaways, and sweeps into
//! one handle the command layer talks to. The command layer contributes
//! authenticated caller identities and calls exactly one engine operation
//! per exposed action; no business rule lives outside this crate.

use crate::config::Settings;
use crate::error::Result;
use crate::events::{EventLog, EventSink};
use crate::giveaway::Giveaways;
use crate::invites::InviteTracker;
use crate::ledger::Ledger;
use crate::registry::VpsRegistry;
use crate::runtime::ContainerRuntime;
use crate::store::Store;
use crate::sweep::{ExpirySweeper, GiveawaySweeper};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Construction options for the engine.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Directory holding the persisted tables.
    pub data_dir: PathBuf,
    /// Ids that are unconditionally administrators.
    pub root_admins: Vec<String>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            root_admins: Vec::new(),
        }
    }
}

/// The assembled VPS engine.
///
/// All fields are shared handles; the engine is cheap to clone via `Arc`
/// and safe to call from concurrent command handlers.
pub struct Engine {
    /// Access policy and engine settings.
    pub settings: Arc<Settings>,
    /// Points ledger.
    pub ledger: Arc<Ledger>,
    /// Invite/referral tracker.
    pub invites: Arc<InviteTracker>,
    /// VPS registry.
    pub registry: Arc<VpsRegistry>,
    /// Giveaway manager.
    pub giveaways: Arc<Giveaways>,
    /// Event fan-out.
    pub events: Arc<EventLog>,
}

impl Engine {
    /// Builds the engine over a container runtime and optional event sink.
    pub fn new(
        options: EngineOptions,
        runtime: Arc<dyn ContainerRuntime>,
        sink: Option<Arc<dyn EventSink>>,
    ) -> Result<Self> {
        let store = Arc::new(Store::open(options.data_dir)?);
        let settings = Arc::new(Settings::load(store.clone(), options.root_admins)?);
        let events = Arc::new(EventLog::load(store.clone(), sink)?);
        let ledger = Arc::new(Ledger::load(store.clone())?);
        let invites = Arc::new(InviteTracker::load(store.clone(), ledger.clone())?);
        let giveaways = Arc::new(Giveaways::load(store.clone())?);
        let registry = Arc::new(VpsRegistry::load(
            store,
            runtime,
            ledger.clone(),
            settings.clone(),
            events.clone(),
        )?);

        Ok(Self {
            settings,
            ledger,
            invites,
            registry,
            giveaways,
            events,
        })
    }

    /// Spawns both background sweeps onto the current tokio runtime.
    ///
    /// The returned handles run until aborted; dropping them detaches the
    /// sweeps.
    pub fn spawn_sweeps(&self) -> (JoinHandle<()>, JoinHandle<()>) {
        let expiry = ExpirySweeper::new(self.registry.clone());
        let giveaway = GiveawaySweeper::new(
            self.giveaways.clone(),
            self.registry.clone(),
            self.events.clone(),
        );
        (
            tokio::spawn(expiry.run()),
            tokio::spawn(giveaway.run()),
        )
    }
}
