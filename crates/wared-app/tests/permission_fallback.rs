//! Permission cache degradation and ordering: stale-while-revalidate
//! fallback, durable snapshot preload, last-fetch-wins sequencing, and the
//! gate's reactive re-evaluation.

mod support;

use futures::StreamExt;
use futures_signals::signal::SignalExt;
use std::sync::Arc;
use support::{network_error, ok, profile_json, FakeTransport, BASE_URL};
use tokio::sync::Semaphore;
use wared_app::permissions::PERMISSIONS_STORAGE_KEY;
use wared_app::prelude::*;
use wared_app::session::TOKEN_STORAGE_KEY;

fn core_with(transport: Arc<FakeTransport>, storage: Arc<MemoryStorage>) -> AppCore {
    AppCore::new(AppConfig::new(BASE_URL), transport, storage, None)
}

async fn logged_in_core(transport: Arc<FakeTransport>, storage: Arc<MemoryStorage>) -> AppCore {
    transport.respond("auth/login", ok(200, serde_json::json!({ "token": "tok123" })));
    transport.respond("auth/profile", ok(200, profile_json()));
    transport.respond(
        "auth/permissions",
        ok(200, serde_json::json!(["a", "b"])),
    );
    let core = core_with(transport, storage);
    core.login("ali", "secret").await.unwrap();
    core
}

#[tokio::test]
async fn test_failed_refresh_keeps_previous_codes() {
    let transport = Arc::new(FakeTransport::new());
    let core = logged_in_core(transport.clone(), Arc::new(MemoryStorage::new())).await;
    assert!(core.permissions().has_all(["a", "b"]));
    assert_eq!(core.permissions().snapshot().freshness(), Freshness::Ready);

    transport.respond("auth/permissions", network_error());
    core.permissions()
        .refresh(core.client(), core.session())
        .await;

    let snapshot = core.permissions().snapshot();
    assert!(snapshot.has("a"));
    assert!(snapshot.has("b"));
    assert_eq!(snapshot.len(), 2);
    assert_eq!(snapshot.freshness(), Freshness::StaleFallback);
    assert_eq!(core.auth_phase(), AuthPhase::AuthenticatedDegraded);

    // A later successful refresh recovers
    transport.respond("auth/permissions", ok(200, serde_json::json!(["a"])));
    core.permissions()
        .refresh(core.client(), core.session())
        .await;
    assert_eq!(core.permissions().snapshot().freshness(), Freshness::Ready);
    assert!(!core.permissions().has("b"));
    assert_eq!(core.auth_phase(), AuthPhase::Authenticated);
}

#[tokio::test]
async fn test_successful_refresh_writes_durable_snapshot() {
    let storage = Arc::new(MemoryStorage::new());
    let core = logged_in_core(Arc::new(FakeTransport::new()), storage.clone()).await;
    assert!(core.permissions().has("a"));

    let raw = storage.load(PERMISSIONS_STORAGE_KEY).await.unwrap().unwrap();
    let stored: Vec<String> = serde_json::from_str(&raw).unwrap();
    assert_eq!(stored, vec!["a", "b"]);
}

#[tokio::test]
async fn test_preloaded_snapshot_bridges_failed_startup_fetch() {
    // A prior run left both a token and a permission snapshot behind; this
    // run's first fetch fails, so the stale codes carry the session.
    let storage = Arc::new(MemoryStorage::seeded([
        (TOKEN_STORAGE_KEY.to_string(), "tok123".to_string()),
        (
            PERMISSIONS_STORAGE_KEY.to_string(),
            r#"["incoming.read"]"#.to_string(),
        ),
    ]));
    let transport = Arc::new(FakeTransport::new());
    transport.respond("auth/profile", ok(200, profile_json()));
    transport.respond("auth/permissions", network_error());

    let core = core_with(transport, storage);
    core.start().await;

    assert_eq!(core.auth_phase(), AuthPhase::AuthenticatedDegraded);
    assert!(core.permissions().has("incoming.read"));
    assert!(core.gate().allows(&Policy::one("incoming.read")));
}

#[tokio::test]
async fn test_logout_erases_durable_snapshot() {
    let storage = Arc::new(MemoryStorage::new());
    let core = logged_in_core(Arc::new(FakeTransport::new()), storage.clone()).await;
    assert!(storage
        .load(PERMISSIONS_STORAGE_KEY)
        .await
        .unwrap()
        .is_some());

    core.logout().await;

    assert_eq!(storage.load(PERMISSIONS_STORAGE_KEY).await.unwrap(), None);
    assert!(core.permissions().snapshot().is_empty());
    assert_eq!(
        core.permissions().snapshot().freshness(),
        Freshness::Uninitialized
    );
}

#[tokio::test]
async fn test_forced_logout_erases_durable_snapshot() {
    let storage = Arc::new(MemoryStorage::new());
    let transport = Arc::new(FakeTransport::new());
    let core = logged_in_core(transport.clone(), storage.clone()).await;
    assert!(storage
        .load(PERMISSIONS_STORAGE_KEY)
        .await
        .unwrap()
        .is_some());

    // The server expires the session mid-flight; by the time the 401
    // surfaces, neither memory nor disk may still hold the grant list.
    transport.respond("incoming", ok(401, serde_json::json!("expired")));
    let err = core.client().get("incoming").await.unwrap_err();

    assert!(err.is_unauthorized());
    assert_eq!(storage.load(PERMISSIONS_STORAGE_KEY).await.unwrap(), None);
    assert!(core.permissions().snapshot().is_empty());
    assert_eq!(
        core.permissions().snapshot().freshness(),
        Freshness::Uninitialized
    );
}

#[tokio::test]
async fn test_slow_older_fetch_does_not_clobber_newer_result() {
    let transport = Arc::new(FakeTransport::new());
    let core = Arc::new(logged_in_core(transport.clone(), Arc::new(MemoryStorage::new())).await);

    // First refresh stalls in flight with an outdated grant list
    let gate = Arc::new(Semaphore::new(0));
    transport.respond_gated(
        "auth/permissions",
        gate.clone(),
        ok(200, serde_json::json!(["outdated"])),
    );
    let stalled = {
        let core = core.clone();
        tokio::spawn(async move {
            core.permissions()
                .refresh(core.client(), core.session())
                .await;
        })
    };
    while transport.calls_to("auth/permissions") < 2 {
        tokio::task::yield_now().await;
    }

    // A newer refresh completes while the old one is still in flight
    transport.respond("auth/permissions", ok(200, serde_json::json!(["current"])));
    core.permissions()
        .refresh(core.client(), core.session())
        .await;
    assert!(core.permissions().has("current"));

    // The stalled fetch now resolves; its result must be discarded
    gate.add_permits(1);
    stalled.await.unwrap();

    assert!(core.permissions().has("current"));
    assert!(!core.permissions().has("outdated"));
    assert_eq!(core.permissions().snapshot().freshness(), Freshness::Ready);
}

#[tokio::test]
async fn test_wrapped_permission_payload_is_accepted() {
    let transport = Arc::new(FakeTransport::new());
    transport.respond("auth/login", ok(200, serde_json::json!({ "token": "tok123" })));
    transport.respond("auth/profile", ok(200, profile_json()));
    transport.respond(
        "auth/permissions",
        ok(200, serde_json::json!({ "data": { "codes": ["incoming.read"] } })),
    );

    let core = core_with(transport, Arc::new(MemoryStorage::new()));
    core.login("ali", "secret").await.unwrap();

    assert!(core.permissions().has("incoming.read"));
    assert_eq!(core.permissions().snapshot().freshness(), Freshness::Ready);
}

#[tokio::test]
async fn test_unrecognized_payload_degrades_to_empty_not_error() {
    let transport = Arc::new(FakeTransport::new());
    transport.respond("auth/login", ok(200, serde_json::json!({ "token": "tok123" })));
    transport.respond("auth/profile", ok(200, profile_json()));
    transport.respond(
        "auth/permissions",
        ok(200, serde_json::json!({ "grants": ["incoming.read"] })),
    );

    let core = core_with(transport, Arc::new(MemoryStorage::new()));
    core.login("ali", "secret").await.unwrap();

    // Shape was not recognized: empty grant set for this cycle, no crash
    assert_eq!(core.auth_phase(), AuthPhase::Authenticated);
    assert!(core.permissions().snapshot().is_empty());
}

#[tokio::test]
async fn test_gate_watch_reacts_to_snapshot_changes() {
    let transport = Arc::new(FakeTransport::new());
    transport.respond("auth/login", ok(200, serde_json::json!({ "token": "tok123" })));
    transport.respond("auth/profile", ok(200, profile_json()));
    transport.respond("auth/permissions", ok(200, serde_json::json!(["incoming.read"])));

    let core = core_with(transport, Arc::new(MemoryStorage::new()));
    let mut decisions = core
        .gate()
        .watch(Policy::one("incoming.read"))
        .to_stream();

    // Before any session: denied
    assert_eq!(decisions.next().await, Some(false));

    core.login("ali", "secret").await.unwrap();
    assert_eq!(decisions.next().await, Some(true));

    core.logout().await;
    assert_eq!(decisions.next().await, Some(false));
}
