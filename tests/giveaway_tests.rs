//! Tests for giveaway creation, membership, and policy parsing.

mod common;

use chrono::Duration;
use common::{ADMIN, engine};
use hostforge::{Error, GiveawayStatus, ResourceSpec, WinnerPolicy};

#[tokio::test]
async fn test_create_and_join() {
    let fx = engine();
    let giveaway = fx
        .engine
        .giveaways
        .create(
            ADMIN,
            "weekend special",
            ResourceSpec::new(16, 4, 50),
            WinnerPolicy::SingleRandom,
            Duration::minutes(30),
        )
        .await
        .unwrap();

    assert_eq!(giveaway.status, GiveawayStatus::Active);
    assert_eq!(giveaway.creator, ADMIN);

    fx.engine.giveaways.join(&giveaway.id, "10").await.unwrap();
    fx.engine.giveaways.join(&giveaway.id, "20").await.unwrap();

    let loaded = fx.engine.giveaways.get(&giveaway.id).await.unwrap();
    assert_eq!(loaded.participants, vec!["10".to_string(), "20".to_string()]);
}

#[tokio::test]
async fn test_duplicate_join_is_rejected() {
    let fx = engine();
    let giveaway = fx
        .engine
        .giveaways
        .create(
            ADMIN,
            "prize",
            ResourceSpec::default(),
            WinnerPolicy::AllParticipants,
            Duration::minutes(10),
        )
        .await
        .unwrap();

    fx.engine.giveaways.join(&giveaway.id, "10").await.unwrap();
    let err = fx.engine.giveaways.join(&giveaway.id, "10").await.unwrap_err();
    assert!(matches!(err, Error::AlreadyInState { .. }));

    let loaded = fx.engine.giveaways.get(&giveaway.id).await.unwrap();
    assert_eq!(loaded.participants.len(), 1);
}

#[tokio::test]
async fn test_join_unknown_giveaway() {
    let fx = engine();
    let err = fx.engine.giveaways.join("missing", "10").await.unwrap_err();
    assert!(matches!(err, Error::GiveawayNotFound(_)));
}

#[tokio::test]
async fn test_too_short_duration_is_rejected() {
    let fx = engine();
    let err = fx
        .engine
        .giveaways
        .create(
            ADMIN,
            "blink",
            ResourceSpec::default(),
            WinnerPolicy::SingleRandom,
            Duration::seconds(30),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));
}

#[test]
fn test_winner_policy_parsing() {
    assert_eq!(
        WinnerPolicy::parse("random").unwrap(),
        WinnerPolicy::SingleRandom
    );
    assert_eq!(
        WinnerPolicy::parse("all").unwrap(),
        WinnerPolicy::AllParticipants
    );
    assert!(matches!(
        WinnerPolicy::parse("most-points").unwrap_err(),
        Error::InvalidArgument(_)
    ));
}
