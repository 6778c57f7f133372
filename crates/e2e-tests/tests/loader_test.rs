//! Index lifecycle E2E tests: publish, load, rebuild, reload.

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::json;

use alm_rag::{LoaderState, RagError};
use e2e_tests::{random_entries, TestHarness};

const DIM: usize = 32;

#[tokio::test]
async fn test_every_ordinal_resolves_after_load() {
    let harness = TestHarness::new();
    let entries = random_entries("b1", 200, DIM, 7);
    harness.publish_build("b1", &entries);

    let loader = harness.loader(DIM);
    let bundle = loader.load().await.unwrap();

    assert_eq!(bundle.build_id(), Some("b1"));
    assert_eq!(bundle.vector_count(), 200);
    assert_eq!(bundle.record_count(), 200);
    for ordinal in 0..200u64 {
        let (id, record) = bundle.lookup(ordinal).expect("ordinal resolves");
        assert_eq!(id, format!("b1-r{ordinal}"));
        assert_eq!(record.error_message, format!("synthetic error {ordinal}"));
    }
}

#[tokio::test]
async fn test_nearest_neighbor_of_stored_vector_is_itself() {
    let harness = TestHarness::new();
    let entries = random_entries("b1", 50, DIM, 11);
    harness.publish_build("b1", &entries);

    let loader = harness.loader(DIM);
    loader.load().await.unwrap();
    let builder = harness.context_builder(&loader);

    for (id, _, vector) in entries.iter().step_by(7) {
        let hits = builder.retrieve(vector, 3).unwrap();
        assert_eq!(&hits[0].id, id);
        assert!(hits.windows(2).all(|w| w[0].distance <= w[1].distance));
    }
}

#[tokio::test]
async fn test_reload_swaps_while_old_snapshot_stays_valid() {
    let harness = TestHarness::new();
    harness.publish_build("b1", &random_entries("b1", 20, DIM, 1));
    let loader = harness.loader(DIM);
    let first = loader.load().await.unwrap();

    harness.publish_build("b2", &random_entries("b2", 30, DIM, 2));
    let second = loader.reload().await.unwrap();

    assert_eq!(second.build_id(), Some("b2"));
    assert_eq!(loader.last_loaded_build_id().as_deref(), Some("b2"));
    assert_eq!(
        loader.state(),
        LoaderState::Loaded {
            build_id: Some("b2".to_string())
        }
    );

    // A reader holding the old snapshot still sees one consistent build.
    assert_eq!(first.build_id(), Some("b1"));
    assert_eq!(first.vector_count(), 20);
    assert_eq!(first.lookup(0).map(|(id, _)| id.to_string()), Some("b1-r0".to_string()));
}

#[tokio::test]
async fn test_failed_rebuild_keeps_serving_previous_bundle() {
    let harness = TestHarness::new();
    harness.publish_build("b1", &random_entries("b1", 20, DIM, 3));
    let loader = harness.loader(DIM);
    loader.load().await.unwrap();

    harness.write_pointer(json!({"status": "FAILED", "error_message": "embedding service down"}));
    let err = loader.reload().await.unwrap_err();
    match err {
        RagError::BuildFailed { message } => assert_eq!(message, "embedding service down"),
        other => panic!("Expected BuildFailed, got {other:?}"),
    }

    let served = loader.snapshot().expect("previous bundle still served");
    assert_eq!(served.build_id(), Some("b1"));
    assert!(matches!(loader.state(), LoaderState::Failed { .. }));
    assert!(!loader.check_ready().await);
}

#[tokio::test]
async fn test_wait_until_ready_sees_late_publish() {
    let harness = Arc::new(TestHarness::new());
    harness.write_pointer(json!({"status": "BUILDING"}));
    let loader = harness.loader(DIM);
    assert!(!loader.check_ready().await);

    let publisher = {
        let harness = Arc::clone(&harness);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(150)).await;
            harness.publish_build("late", &random_entries("late", 5, DIM, 4));
        })
    };

    let ready = loader
        .wait_until_ready(Duration::from_secs(10), Duration::from_millis(25))
        .await;
    publisher.await.unwrap();

    assert!(ready);
    assert_eq!(loader.state(), LoaderState::Unloaded, "waiting never loads");
    assert_eq!(loader.load().await.unwrap().build_id(), Some("late"));
}

#[tokio::test]
async fn test_concurrent_loads_share_one_bundle() {
    let harness = TestHarness::new();
    harness.publish_build("b1", &random_entries("b1", 10, DIM, 5));
    let loader = harness.loader(DIM);

    let (a, b, c) = tokio::join!(loader.load(), loader.load(), loader.load());
    let (a, b, c) = (a.unwrap(), b.unwrap(), c.unwrap());
    assert!(Arc::ptr_eq(&a, &b));
    assert!(Arc::ptr_eq(&b, &c));
}
