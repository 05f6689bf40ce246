//! # Persistent Store
//!
//! Durable key-value tables for the engine, one JSON document per table,
//! written with whole-file atomic replace semantics.
//!
//! ## Storage Model
//!
//! Each table is a single document under the data directory:
//!
//! ```text
//! data/
//! ├── users.json       (user id → account)
//! ├── vps.json         (container id → VPS record)
//! ├── invites.json     (guild id → invite snapshot)
//! ├── giveaways.json   (giveaway id → giveaway record)
//! ├── config.json      (admin set, log target, renewal mode)
//! └── events.json      (bounded action journal)
//! ```
//!
//! ## Atomic Writes
//!
//! Every save goes through a temp file + rename:
//! 1. Serialize to `<table>.json.tmp.<uuid>`
//! 2. Rename over `<table>.json`
//!
//! Rename is atomic on POSIX filesystems, so persisted state is never
//! observed half-written. There is no cross-table transaction: callers must
//! treat each save as its own durability boundary and order their mutations
//! to fail toward the safer outcome.
//!
//! ## Missing Tables
//!
//! A table that does not exist on disk yet loads as its default value, so a
//! fresh data directory needs no seeding step.

use crate::error::{Error, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// File name of the users table.
pub const USERS_TABLE: &str = "users.json";
/// File name of the VPS records table.
pub const VPS_TABLE: &str = "vps.json";
/// File name of the invite snapshots table.
pub const INVITES_TABLE: &str = "invites.json";
/// File name of the giveaways table.
pub const GIVEAWAYS_TABLE: &str = "giveaways.json";
/// File name of the config document.
pub const CONFIG_TABLE: &str = "config.json";
/// File name of the bounded event journal.
pub const EVENTS_TABLE: &str = "events.json";

/// Durable document store with atomic whole-file replace.
///
/// The store itself is dumb: it (de)serializes whole documents and guarantees
/// no partial-write visibility. Table ownership is enforced one level up:
/// each engine component holds exclusive write access to its own table and
/// all reads/writes pass through that component's methods.
pub struct Store {
    /// Base directory for all tables.
    data_dir: PathBuf,
}

impl Store {
    /// Opens (creating if necessary) a store rooted at `data_dir`.
    pub fn open(data_dir: impl Into<PathBuf>) -> Result<Self> {
        let data_dir = data_dir.into();
        fs::create_dir_all(&data_dir).map_err(|e| Error::StoreInitFailed {
            path: data_dir.clone(),
            reason: e.to_string(),
        })?;

        info!("store initialized at {}", data_dir.display());

        Ok(Self { data_dir })
    }

    /// Returns the base directory.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Loads a table, returning `T::default()` if the file does not exist.
    pub fn load<T>(&self, table: &str) -> Result<T>
    where
        T: DeserializeOwned + Default,
    {
        let path = self.table_path(table);
        if !path.exists() {
            return Ok(T::default());
        }
        let bytes = fs::read(&path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Saves a table with atomic replace semantics.
    pub fn save<T>(&self, table: &str, value: &T) -> Result<()>
    where
        T: Serialize,
    {
        let path = self.table_path(table);
        let json = serde_json::to_vec_pretty(value)?;

        // Unique temp name so concurrent writers of the same table cannot
        // observe each other's partial output; the final rename is atomic.
        let temp_name = format!("{table}.tmp.{}", uuid::Uuid::now_v7());
        let temp_path = self.data_dir.join(temp_name);
        fs::write(&temp_path, &json).map_err(|e| Error::StoreWriteFailed(e.to_string()))?;
        fs::rename(&temp_path, &path).map_err(|e| {
            let _ = fs::remove_file(&temp_path);
            Error::StoreWriteFailed(e.to_string())
        })?;

        debug!("saved {} ({} bytes)", table, json.len());
        Ok(())
    }

    fn table_path(&self, table: &str) -> PathBuf {
        self.data_dir.join(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_missing_table_loads_default() {
        let temp = TempDir::new().unwrap();
        let store = Store::open(temp.path()).unwrap();

        let table: HashMap<String, u64> = store.load(USERS_TABLE).unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn test_save_load_roundtrip() {
        let temp = TempDir::new().unwrap();
        let store = Store::open(temp.path()).unwrap();

        let mut table = HashMap::new();
        table.insert("42".to_string(), 7u64);
        store.save(USERS_TABLE, &table).unwrap();

        let loaded: HashMap<String, u64> = store.load(USERS_TABLE).unwrap();
        assert_eq!(loaded, table);
    }

    #[test]
    fn test_save_replaces_whole_file() {
        let temp = TempDir::new().unwrap();
        let store = Store::open(temp.path()).unwrap();

        let mut table = HashMap::new();
        table.insert("a".to_string(), 1u64);
        table.insert("b".to_string(), 2u64);
        store.save(VPS_TABLE, &table).unwrap();

        table.remove("a");
        store.save(VPS_TABLE, &table).unwrap();

        let loaded: HashMap<String, u64> = store.load(VPS_TABLE).unwrap();
        assert_eq!(loaded.len(), 1);
        assert!(!loaded.contains_key("a"));
    }

    #[test]
    fn test_no_temp_files_left_behind() {
        let temp = TempDir::new().unwrap();
        let store = Store::open(temp.path()).unwrap();

        let table: HashMap<String, u64> = HashMap::new();
        store.save(GIVEAWAYS_TABLE, &table).unwrap();

        let leftovers: Vec<_> = std::fs::read_dir(temp.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().contains(".tmp."))
            .collect();
        assert!(leftovers.is_empty());
    }
}
