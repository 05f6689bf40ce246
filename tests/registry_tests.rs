//! Tests for the VPS registry: deployment economics, authorization,
//! lifecycle transitions, renewal arithmetic, reinstall, destroy refunds,
//! sharing, and port mapping, all against a scripted runtime.

mod common;

use chrono::{Duration, Utc};
use common::{ADMIN, engine, engine_with, test_record};
use hostforge::{DEPLOY_COST, DESTROY_REFUND, Error, RenewalMode, ResourceSpec};

// =============================================================================
// Deploy
// =============================================================================

#[tokio::test]
async fn test_deploy_charges_exact_cost() {
    let fx = engine_with(&[("10", DEPLOY_COST)], vec![], vec![]);

    let record = fx
        .engine
        .registry
        .deploy("10", ResourceSpec::default())
        .await
        .unwrap();

    assert_eq!(record.owner, "10");
    assert!(record.active);
    assert!(!record.suspended);
    assert!(!record.giveaway_grant);
    assert_eq!(fx.engine.ledger.balance("10").await.unwrap(), 0);

    // The lease runs the fixed lifetime from creation.
    let lifetime = record.expires_at - record.created_at;
    assert_eq!(lifetime, Duration::days(15));
}

#[tokio::test]
async fn test_deploy_at_zero_balance_fails_with_shortfall() {
    let fx = engine_with(&[("10", DEPLOY_COST)], vec![], vec![]);
    let registry = &fx.engine.registry;

    registry.deploy("10", ResourceSpec::default()).await.unwrap();
    let err = registry
        .deploy("10", ResourceSpec::default())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::InsufficientFunds {
            required,
            available: 0
        } if required == DEPLOY_COST
    ));
    // Only the first deploy reached the runtime.
    assert_eq!(fx.runtime.calls_of("create"), 1);
}

#[tokio::test]
async fn test_deploy_failure_charges_nothing() {
    let fx = engine_with(&[("10", DEPLOY_COST)], vec![], vec![]);
    fx.runtime.fail_op("create");

    let err = fx
        .engine
        .registry
        .deploy("10", ResourceSpec::default())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::RuntimeFailure { .. }));

    // Provision-first ordering: nothing was debited and nothing registered.
    assert_eq!(fx.engine.ledger.balance("10").await.unwrap(), DEPLOY_COST);
    assert!(fx.engine.registry.list_all().await.is_empty());
}

#[tokio::test]
async fn test_admin_deploy_is_free() {
    let fx = engine();
    let record = fx
        .engine
        .registry
        .deploy(ADMIN, ResourceSpec::new(32, 6, 100))
        .await
        .unwrap();
    assert_eq!(record.spec.ram_gb, 32);
    assert_eq!(fx.engine.ledger.balance(ADMIN).await.unwrap(), 0);
}

#[tokio::test]
async fn test_degraded_bootstrap_still_provisions() {
    let fx = engine();
    fx.runtime.set_exec_fails(true);

    let record = fx
        .engine
        .registry
        .deploy(ADMIN, ResourceSpec::default())
        .await
        .unwrap();
    assert!(!record.systemctl_working);
    assert_eq!(record.shell_access, hostforge::FALLBACK_SHELL_ACCESS);
    assert!(record.active);
}

// =============================================================================
// Authorization
// =============================================================================

#[tokio::test]
async fn test_stranger_cannot_manage() {
    let fx = engine_with(&[], vec![test_record("vps-a", "10")], vec![]);
    let registry = &fx.engine.registry;

    let err = registry.stop("vps-a", "99").await.unwrap_err();
    assert!(matches!(err, Error::Unauthorized { .. }));
    assert_eq!(fx.runtime.calls_of("stop"), 0);
}

#[tokio::test]
async fn test_shared_user_can_manage() {
    let mut rec = test_record("vps-a", "10");
    rec.shared_with.push("20".to_string());
    let fx = engine_with(&[], vec![rec], vec![]);

    fx.engine.registry.stop("vps-a", "20").await.unwrap();
    assert!(!fx.engine.registry.get("vps-a").await.unwrap().active);
}

#[tokio::test]
async fn test_admin_can_manage_any() {
    let fx = engine_with(&[], vec![test_record("vps-a", "10")], vec![]);
    fx.engine.registry.stop("vps-a", ADMIN).await.unwrap();
}

#[tokio::test]
async fn test_unknown_vps_is_not_found() {
    let fx = engine();
    let err = fx.engine.registry.stop("nope", ADMIN).await.unwrap_err();
    assert!(matches!(err, Error::VpsNotFound(_)));
}

// =============================================================================
// Start / Stop / Restart
// =============================================================================

#[tokio::test]
async fn test_stop_then_start_roundtrip() {
    let fx = engine_with(&[], vec![test_record("vps-a", "10")], vec![]);
    let registry = &fx.engine.registry;

    registry.stop("vps-a", "10").await.unwrap();
    assert!(!registry.get("vps-a").await.unwrap().active);

    registry.start("vps-a", "10").await.unwrap();
    assert!(registry.get("vps-a").await.unwrap().active);
}

#[tokio::test]
async fn test_stop_when_stopped_is_already_in_state() {
    let mut rec = test_record("vps-a", "10");
    rec.active = false;
    let fx = engine_with(&[], vec![rec], vec![]);

    let err = fx.engine.registry.stop("vps-a", "10").await.unwrap_err();
    assert!(matches!(err, Error::AlreadyInState { .. }));
}

#[tokio::test]
async fn test_start_when_running_is_already_in_state() {
    let fx = engine_with(&[], vec![test_record("vps-a", "10")], vec![]);
    let err = fx.engine.registry.start("vps-a", "10").await.unwrap_err();
    assert!(matches!(err, Error::AlreadyInState { .. }));
}

#[tokio::test]
async fn test_runtime_refusal_leaves_prior_state() {
    let fx = engine_with(&[], vec![test_record("vps-a", "10")], vec![]);
    fx.runtime.fail_op("stop");

    let err = fx.engine.registry.stop("vps-a", "10").await.unwrap_err();
    assert!(matches!(err, Error::RuntimeFailure { .. }));
    // Failure is surfaced verbatim; the record keeps its confirmed state.
    assert!(fx.engine.registry.get("vps-a").await.unwrap().active);
}

#[tokio::test]
async fn test_suspended_vps_cannot_start_or_restart() {
    let mut rec = test_record("vps-a", "10");
    rec.active = false;
    rec.suspended = true;
    let fx = engine_with(&[], vec![rec], vec![]);
    let registry = &fx.engine.registry;

    assert!(matches!(
        registry.start("vps-a", "10").await.unwrap_err(),
        Error::Suspended(_)
    ));
    assert!(matches!(
        registry.restart("vps-a", "10").await.unwrap_err(),
        Error::Suspended(_)
    ));
}

// =============================================================================
// Renewal
// =============================================================================

#[tokio::test]
async fn test_renew_live_lease_extends_from_expiry() {
    let rec = test_record("vps-a", "10");
    let old_expiry = rec.expires_at;
    let fx = engine_with(&[("10", 10)], vec![rec], vec![]);

    let renewed = fx.engine.registry.renew("vps-a", "10").await.unwrap();
    assert_eq!(renewed.expires_at, old_expiry + Duration::days(15));
    assert_eq!(fx.engine.ledger.balance("10").await.unwrap(), 0);
}

#[tokio::test]
async fn test_renew_lapsed_lease_starts_from_now() {
    let mut rec = test_record("vps-a", "10");
    rec.expires_at = Utc::now() - Duration::days(10);
    rec.active = false;
    rec.suspended = true;
    let fx = engine_with(&[("10", 10)], vec![rec], vec![]);

    let before = Utc::now();
    let renewed = fx.engine.registry.renew("vps-a", "10").await.unwrap();
    let after = Utc::now();

    // The stale expiry is not the base: the new window starts now.
    assert!(renewed.expires_at >= before + Duration::days(15));
    assert!(renewed.expires_at <= after + Duration::days(15));
    assert!(renewed.active);
    assert!(!renewed.suspended);
    // The container was stopped, so renewal restarts it.
    assert_eq!(fx.runtime.calls_against("start", "vps-a"), 1);
}

#[tokio::test]
async fn test_renew_extended_tier() {
    let rec = test_record("vps-a", "10");
    let old_expiry = rec.expires_at;
    let fx = engine_with(&[("10", 25)], vec![rec], vec![]);

    fx.engine
        .settings
        .set_renewal_mode(RenewalMode::Extended)
        .await
        .unwrap();
    let renewed = fx.engine.registry.renew("vps-a", "10").await.unwrap();
    assert_eq!(renewed.expires_at, old_expiry + Duration::days(30));
    assert_eq!(fx.engine.ledger.balance("10").await.unwrap(), 5);
}

#[tokio::test]
async fn test_renew_without_funds_changes_nothing() {
    let rec = test_record("vps-a", "10");
    let old_expiry = rec.expires_at;
    let fx = engine_with(&[("10", 9)], vec![rec], vec![]);

    let err = fx.engine.registry.renew("vps-a", "10").await.unwrap_err();
    assert!(matches!(
        err,
        Error::InsufficientFunds {
            required: 10,
            available: 9
        }
    ));
    assert_eq!(
        fx.engine.registry.get("vps-a").await.unwrap().expires_at,
        old_expiry
    );
}

#[tokio::test]
async fn test_giveaway_grant_is_never_renewable() {
    let mut rec = test_record("vps-a", "10");
    rec.giveaway_grant = true;
    let fx = engine_with(&[("10", 100)], vec![rec], vec![]);

    let err = fx.engine.registry.renew("vps-a", "10").await.unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));
    assert_eq!(fx.engine.ledger.balance("10").await.unwrap(), 100);
}

// =============================================================================
// Reinstall
// =============================================================================

#[tokio::test]
async fn test_reinstall_preserves_expiry_exactly() {
    let rec = test_record("vps-a", "10");
    let old_expiry = rec.expires_at;
    let fx = engine_with(&[], vec![rec], vec![]);

    let replacement = fx.engine.registry.reinstall("vps-a", "10").await.unwrap();
    assert_ne!(replacement.container_id, "vps-a");
    assert_eq!(replacement.expires_at, old_expiry);
    assert_eq!(replacement.owner, "10");

    // The old entry is gone and the replacement is authoritative.
    assert!(matches!(
        fx.engine.registry.get("vps-a").await.unwrap_err(),
        Error::VpsNotFound(_)
    ));
    fx.engine
        .registry
        .get(&replacement.container_id)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_reinstall_requires_authorization() {
    let fx = engine_with(&[], vec![test_record("vps-a", "10")], vec![]);
    let err = fx.engine.registry.reinstall("vps-a", "99").await.unwrap_err();
    assert!(matches!(err, Error::Unauthorized { .. }));
    assert_eq!(fx.runtime.calls_of("destroy"), 0);
}

#[tokio::test]
async fn test_reinstall_keeps_old_record_when_provision_fails() {
    let fx = engine_with(&[], vec![test_record("vps-a", "10")], vec![]);
    fx.runtime.fail_next_creates(1);

    let err = fx.engine.registry.reinstall("vps-a", "10").await.unwrap_err();
    assert!(matches!(err, Error::RuntimeFailure { .. }));
    // The old record remains authoritative for reconciliation.
    fx.engine.registry.get("vps-a").await.unwrap();
}

// =============================================================================
// Destroy
// =============================================================================

#[tokio::test]
async fn test_owner_destroy_refunds_half_deploy_cost() {
    let fx = engine_with(&[("10", 0)], vec![test_record("vps-a", "10")], vec![]);

    let refund = fx.engine.registry.destroy("vps-a", "10").await.unwrap();
    assert_eq!(refund, DESTROY_REFUND);
    assert_eq!(refund, DEPLOY_COST / 2);
    assert_eq!(fx.engine.ledger.balance("10").await.unwrap(), DESTROY_REFUND);
    assert!(fx.engine.registry.list_all().await.is_empty());
}

#[tokio::test]
async fn test_destroy_giveaway_grant_refunds_nothing() {
    let mut rec = test_record("vps-a", "10");
    rec.giveaway_grant = true;
    let fx = engine_with(&[("10", 0)], vec![rec], vec![]);

    let refund = fx.engine.registry.destroy("vps-a", "10").await.unwrap();
    assert_eq!(refund, 0);
    assert_eq!(fx.engine.ledger.balance("10").await.unwrap(), 0);
}

#[tokio::test]
async fn test_admin_destroy_refunds_nothing() {
    let fx = engine_with(&[("10", 0)], vec![test_record("vps-a", "10")], vec![]);

    let refund = fx.engine.registry.destroy("vps-a", ADMIN).await.unwrap();
    assert_eq!(refund, 0);
    assert_eq!(fx.engine.ledger.balance("10").await.unwrap(), 0);
}

#[tokio::test]
async fn test_destroy_teardown_failure_keeps_record() {
    let fx = engine_with(&[("10", 0)], vec![test_record("vps-a", "10")], vec![]);
    fx.runtime.fail_op("destroy");

    let err = fx.engine.registry.destroy("vps-a", "10").await.unwrap_err();
    assert!(matches!(err, Error::RuntimeFailure { .. }));
    fx.engine.registry.get("vps-a").await.unwrap();
    assert_eq!(fx.engine.ledger.balance("10").await.unwrap(), 0);
}

// =============================================================================
// Sharing
// =============================================================================

#[tokio::test]
async fn test_share_grants_management_access() {
    let fx = engine_with(&[], vec![test_record("vps-a", "10")], vec![]);
    let registry = &fx.engine.registry;

    registry.share("vps-a", "10", "20").await.unwrap();
    assert!(registry.is_authorized("20", "vps-a").await.unwrap());

    registry.unshare("vps-a", "10", "20").await.unwrap();
    assert!(!registry.is_authorized("20", "vps-a").await.unwrap());
}

#[tokio::test]
async fn test_share_is_owner_only() {
    let fx = engine_with(&[], vec![test_record("vps-a", "10")], vec![]);
    let err = fx
        .engine
        .registry
        .share("vps-a", "20", "30")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotOwner { .. }));
}

#[tokio::test]
async fn test_duplicate_share_and_absent_unshare_error() {
    let fx = engine_with(&[], vec![test_record("vps-a", "10")], vec![]);
    let registry = &fx.engine.registry;

    registry.share("vps-a", "10", "20").await.unwrap();
    assert!(matches!(
        registry.share("vps-a", "10", "20").await.unwrap_err(),
        Error::AlreadyInState { .. }
    ));
    assert!(matches!(
        registry.unshare("vps-a", "10", "30").await.unwrap_err(),
        Error::AlreadyInState { .. }
    ));
}

#[tokio::test]
async fn test_cannot_share_with_owner() {
    let fx = engine_with(&[], vec![test_record("vps-a", "10")], vec![]);
    let err = fx
        .engine
        .registry
        .share("vps-a", "10", "10")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));
}

// =============================================================================
// Port Mapping
// =============================================================================

#[tokio::test]
async fn test_add_port_records_after_inspect() {
    let fx = engine_with(&[], vec![test_record("vps-a", "10")], vec![]);
    fx.engine.registry.add_port("vps-a", "10", 8080).await.unwrap();

    let record = fx.engine.registry.get("vps-a").await.unwrap();
    assert_eq!(record.extra_ports, vec![8080]);
    assert_eq!(fx.runtime.calls_against("inspect", "vps-a"), 1);
}

#[tokio::test]
async fn test_add_port_rejects_zero() {
    let fx = engine_with(&[], vec![test_record("vps-a", "10")], vec![]);
    let err = fx
        .engine
        .registry
        .add_port("vps-a", "10", 0)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));
}

#[tokio::test]
async fn test_add_port_rejects_duplicate() {
    let fx = engine_with(&[], vec![test_record("vps-a", "10")], vec![]);
    fx.engine.registry.add_port("vps-a", "10", 8080).await.unwrap();
    let err = fx
        .engine
        .registry
        .add_port("vps-a", "10", 8080)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::AlreadyInState { .. }));
}

#[tokio::test]
async fn test_add_port_requires_live_container() {
    let fx = engine_with(&[], vec![test_record("vps-a", "10")], vec![]);
    fx.runtime.fail_op("inspect");

    let err = fx
        .engine
        .registry
        .add_port("vps-a", "10", 8080)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::RuntimeFailure { .. }));
    assert!(fx.engine.registry.get("vps-a").await.unwrap().extra_ports.is_empty());
}

// =============================================================================
// Admin Suspension
// =============================================================================

#[tokio::test]
async fn test_suspend_unsuspend_roundtrip() {
    let fx = engine_with(&[], vec![test_record("vps-a", "10")], vec![]);
    let registry = &fx.engine.registry;

    registry.suspend("vps-a", ADMIN).await.unwrap();
    let record = registry.get("vps-a").await.unwrap();
    assert!(record.suspended);
    assert!(!record.active);

    registry.unsuspend("vps-a", ADMIN).await.unwrap();
    let record = registry.get("vps-a").await.unwrap();
    assert!(!record.suspended);
    assert!(record.active);
}

#[tokio::test]
async fn test_suspension_is_admin_only() {
    let fx = engine_with(&[], vec![test_record("vps-a", "10")], vec![]);
    // Even the owner cannot suspend.
    let err = fx.engine.registry.suspend("vps-a", "10").await.unwrap_err();
    assert!(matches!(err, Error::Unauthorized { .. }));
}

// =============================================================================
// Usage
// =============================================================================

#[tokio::test]
async fn test_resource_usage_totals() {
    let mut a = test_record("vps-a", "10");
    a.spec = ResourceSpec::new(8, 2, 20);
    let mut b = test_record("vps-b", "20");
    b.spec = ResourceSpec::new(32, 6, 100);
    let fx = engine_with(&[], vec![a, b], vec![]);

    let usage = fx.engine.registry.resource_usage().await;
    assert_eq!(usage.vps_count, 2);
    assert_eq!(usage.total_ram_gb, 40);
    assert_eq!(usage.total_cpu_cores, 8);
    assert_eq!(usage.total_disk_gb, 120);
}
