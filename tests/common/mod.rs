//! Shared test fixtures: a scripted container runtime and engine builders.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{Duration, Utc};
use hostforge::{
    ContainerRuntime, CreatedContainer, Engine, EngineOptions, Error, ExecOutput, GiveawayRecord,
    ResourceSpec, Store, UserAccount, VpsRecord,
};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration as StdDuration;
use tempfile::TempDir;

/// Id used as the unconditional admin in engine fixtures.
pub const ADMIN: &str = "1";

// =============================================================================
// Mock Runtime
// =============================================================================

/// Scripted [`ContainerRuntime`] recording every call.
#[derive(Default)]
pub struct MockRuntime {
    next: AtomicU32,
    calls: Mutex<Vec<(String, String)>>,
    fail_ops: Mutex<HashSet<String>>,
    create_failures: AtomicU32,
    exec_fails: AtomicBool,
}

impl MockRuntime {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Makes every future call of `op` fail.
    pub fn fail_op(&self, op: &str) {
        self.fail_ops.lock().unwrap().insert(op.to_string());
    }

    /// Clears a scripted failure.
    pub fn unfail_op(&self, op: &str) {
        self.fail_ops.lock().unwrap().remove(op);
    }

    /// Fails the next `n` create calls, then succeeds again.
    pub fn fail_next_creates(&self, n: u32) {
        self.create_failures.store(n, Ordering::SeqCst);
    }

    /// Makes every in-container exec exit non-zero.
    pub fn set_exec_fails(&self, fails: bool) {
        self.exec_fails.store(fails, Ordering::SeqCst);
    }

    /// Number of recorded calls of `op`.
    pub fn calls_of(&self, op: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(o, _)| o == op)
            .count()
    }

    /// Number of recorded calls of `op` against `id`.
    pub fn calls_against(&self, op: &str, id: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(o, i)| o == op && i == id)
            .count()
    }

    fn record(&self, op: &str, id: &str) {
        self.calls
            .lock()
            .unwrap()
            .push((op.to_string(), id.to_string()));
    }

    fn should_fail(&self, op: &'static str, id: &str) -> Result<(), Error> {
        if self.fail_ops.lock().unwrap().contains(op) {
            return Err(Error::RuntimeFailure {
                operation: op,
                container: id.to_string(),
                reason: "scripted failure".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl ContainerRuntime for MockRuntime {
    async fn create(&self, _spec: &ResourceSpec) -> Result<CreatedContainer, Error> {
        self.record("create", "-");
        if self.create_failures.load(Ordering::SeqCst) > 0 {
            self.create_failures.fetch_sub(1, Ordering::SeqCst);
            return Err(Error::RuntimeFailure {
                operation: "create",
                container: "-".to_string(),
                reason: "scripted failure".to_string(),
            });
        }
        self.should_fail("create", "-")?;
        let n = self.next.fetch_add(1, Ordering::SeqCst);
        Ok(CreatedContainer {
            id: format!("mock{n:08x}"),
            http_port: 3000 + (n % 1000) as u16,
        })
    }

    async fn start(&self, id: &str) -> Result<(), Error> {
        self.record("start", id);
        self.should_fail("start", id)
    }

    async fn stop(&self, id: &str) -> Result<(), Error> {
        self.record("stop", id);
        self.should_fail("stop", id)
    }

    async fn restart(&self, id: &str) -> Result<(), Error> {
        self.record("restart", id);
        self.should_fail("restart", id)
    }

    async fn destroy(&self, id: &str) -> Result<(), Error> {
        self.record("destroy", id);
        self.should_fail("destroy", id)
    }

    async fn exec(
        &self,
        id: &str,
        _command: &str,
        _timeout: StdDuration,
    ) -> Result<ExecOutput, Error> {
        self.record("exec", id);
        if self.exec_fails.load(Ordering::SeqCst) {
            Ok(ExecOutput {
                exit_code: 1,
                stdout: String::new(),
            })
        } else {
            Ok(ExecOutput {
                exit_code: 0,
                stdout: "ssh mock@tmate.io".to_string(),
            })
        }
    }

    async fn inspect(&self, id: &str) -> Result<bool, Error> {
        self.record("inspect", id);
        if self.fail_ops.lock().unwrap().contains("inspect") {
            return Ok(false);
        }
        Ok(true)
    }
}

// =============================================================================
// Fixtures
// =============================================================================

/// A plain record owned by `owner`, active, expiring 15 days out.
pub fn test_record(container_id: &str, owner: &str) -> VpsRecord {
    let now = Utc::now();
    VpsRecord {
        owner: owner.to_string(),
        container_id: container_id.to_string(),
        spec: ResourceSpec::default(),
        http_port: 3100,
        shell_access: "ssh seed@tmate.io".to_string(),
        extra_ports: vec![],
        created_at: now,
        expires_at: now + Duration::days(15),
        active: true,
        suspended: false,
        paid_plan: false,
        giveaway_grant: false,
        shared_with: vec![],
        systemctl_working: true,
        stop_confirmed: true,
    }
}

/// Engine builder over a temp data directory and a mock runtime.
pub struct EngineFixture {
    pub engine: Engine,
    pub runtime: Arc<MockRuntime>,
    pub dir: TempDir,
}

/// Builds an engine with pre-seeded tables.
///
/// Tables are written to the data directory before the engine boots, the
/// same way a restarted process would find them.
pub fn engine_with(
    balances: &[(&str, u64)],
    records: Vec<VpsRecord>,
    giveaways: Vec<GiveawayRecord>,
) -> EngineFixture {
    let dir = TempDir::new().unwrap();
    let store = Store::open(dir.path()).unwrap();

    if !balances.is_empty() {
        let users: HashMap<String, UserAccount> = balances
            .iter()
            .map(|(id, points)| {
                (
                    id.to_string(),
                    UserAccount {
                        points: *points,
                        ..Default::default()
                    },
                )
            })
            .collect();
        store.save("users.json", &users).unwrap();
    }
    if !records.is_empty() {
        let table: HashMap<String, VpsRecord> = records
            .into_iter()
            .map(|r| (r.container_id.clone(), r))
            .collect();
        store.save("vps.json", &table).unwrap();
    }
    if !giveaways.is_empty() {
        let table: HashMap<String, GiveawayRecord> = giveaways
            .into_iter()
            .map(|g| (g.id.clone(), g))
            .collect();
        store.save("giveaways.json", &table).unwrap();
    }

    let runtime = MockRuntime::new();
    let engine = Engine::new(
        EngineOptions {
            data_dir: dir.path().to_path_buf(),
            root_admins: vec![ADMIN.to_string()],
        },
        runtime.clone(),
        None,
    )
    .unwrap();

    EngineFixture {
        engine,
        runtime,
        dir,
    }
}

/// Builds an engine with empty tables.
pub fn engine() -> EngineFixture {
    engine_with(&[], vec![], vec![])
}
