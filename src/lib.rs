//! # hostforge
//!
//! **Points-Gated VPS Lifecycle & Resource-Ledger Engine**
//!
//! This crate provisions, tracks, and reclaims short-lived VPS containers on
//! behalf of community-platform users, gated by an internal points economy
//! and referral accounting. It is the engine layer only: the chat-platform
//! command/UI layer and the container engine internals live outside this
//! crate, behind narrow contracts.
//!
//! # Architecture Overview
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                     command/UI layer (external)                  │
//! └───────────────┬──────────────────────────────┬───────────────────┘
//!                 │                              │
//! ┌───────────────▼──────────────┐  ┌────────────▼────────────┐
//! │         VpsRegistry          │  │  Ledger / InviteTracker │
//! │  provision · renew · destroy │  │  credit · debit · claim │
//! │  start/stop · share · ports  │  │  referral dedup         │
//! └───────┬──────────────┬───────┘  └────────────┬────────────┘
//!         │              │                       │
//! ┌───────▼───────┐  ┌───▼───────────────────────▼────────────┐
//! │ContainerRuntime│  │             Store                     │
//! │ (trait; Docker │  │  JSON tables, whole-file atomic       │
//! │  CLI adapter)  │  │  replace, bounded event journal       │
//! └───────▲───────┘  └───────────────────────────────────────┘
//!         │
//! ┌───────┴──────────────────────────────────────────────────┐
//! │  ExpirySweeper · GiveawaySweeper (periodic, same ops)    │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! # Lease Lifecycle
//!
//! ```text
//!   ┌─────────┐ provision ┌────────┐  stop   ┌─────────┐
//!   │ (none)  │ ────────► │ active │ ──────► │ stopped │
//!   └─────────┘           └────────┘ ◄────── └─────────┘
//!                            │   ▲    start       │
//!                   expiry / │   │ renew /        │ expiry /
//!                    admin   ▼   │ unsuspend      ▼ admin
//!                          ┌─────┴──────────────────┐
//!                          │       suspended        │
//!                          └────────────────────────┘
//! ```
//!
//! Destroy removes the record after runtime teardown; reinstall is
//! destroy + provision in one registry transaction with the expiry
//! preserved.
//!
//! # Consistency Model
//!
//! - Every persisted table is written with whole-file atomic replace; state
//!   is never observed half-written. There is no cross-table transaction:
//!   paid flows provision first and charge after confirmed success.
//! - Ledger-gated operations are serialized per user, lifecycle operations
//!   per container, with explicit keyed locks.
//! - Background sweeps invoke the same registry operations as the command
//!   layer, so authorization and consistency live in one place.
//!
//! # Example
//!
//! ```rust,ignore
//! use hostforge::{DockerRuntime, Engine, EngineOptions, ResourceSpec};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> hostforge::Result<()> {
//!     let engine = Engine::new(
//!         EngineOptions::default(),
//!         Arc::new(DockerRuntime::new()),
//!         None,
//!     )?;
//!     engine.spawn_sweeps();
//!
//!     let record = engine.registry.deploy("user-id", ResourceSpec::default()).await?;
//!     println!("deployed {} on port {}", record.container_id, record.http_port);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod constants;
pub mod docker;
pub mod engine;
pub mod error;
pub mod events;
pub mod giveaway;
pub mod invites;
pub mod ledger;
pub mod locks;
pub mod registry;
pub mod runtime;
pub mod store;
pub mod sweep;
pub mod vps;

// Re-exports
pub use config::{RenewalMode, Settings};
pub use constants::*;
pub use docker::DockerRuntime;
pub use engine::{Engine, EngineOptions};
pub use error::{Error, Result};
pub use events::{ActionEvent, EventLog, EventSink};
pub use giveaway::{GiveawayRecord, GiveawayStatus, Giveaways, WinnerPolicy};
pub use invites::{InviteTracker, InviteUse, JoinOutcome};
pub use ledger::{Ledger, UserAccount};
pub use registry::{ResourceUsage, VpsRegistry, extend_expiry};
pub use runtime::{ContainerRuntime, CreatedContainer, ExecOutput};
pub use store::Store;
pub use sweep::{ExpirySweeper, GiveawaySweeper};
pub use vps::{ProvisionFlags, ResourceSpec, VpsRecord, VpsStatus};
