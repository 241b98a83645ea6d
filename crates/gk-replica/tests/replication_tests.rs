//! End-to-end Replication Tests
//!
//! Drives the authority service and the replica consumer over a shared
//! in-process bus and asserts the replica converges on the authority's
//! view of each user.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
};
use gk_authority::password::Argon2Config;
use gk_authority::{
    AuthorityService, MemoryPrincipalStore, MemoryRefreshTokenStore, PasswordService, ProfileFields,
    RegisterRequest, TokenCodec,
};
use gk_bus::{FailurePolicy, MemoryBus};
use gk_common::{HEADER_USER_EMAIL, HEADER_USER_ID, HEADER_USER_NAME, HEADER_USER_ROLE};
use gk_replica::api::{router, ApiState};
use gk_replica::{MemoryReplicaStore, ReplicaConsumer, ReplicaStore};
use tower::ServiceExt;

struct Pipeline {
    authority: AuthorityService,
    replica: Arc<MemoryReplicaStore>,
}

fn pipeline() -> Pipeline {
    let bus = Arc::new(MemoryBus::new(4));
    let replica = Arc::new(MemoryReplicaStore::new());

    let consumer = Arc::new(ReplicaConsumer::new(replica.clone()));
    bus.spawn_workers(consumer, FailurePolicy::LogAndDrop);

    let authority = AuthorityService::new(
        Arc::new(MemoryPrincipalStore::new()),
        Arc::new(MemoryRefreshTokenStore::new()),
        PasswordService::new(Argon2Config::testing()),
        TokenCodec::new("e2e-secret", "gatekit", 900),
        bus,
        3600,
    );

    Pipeline { authority, replica }
}

fn register_request(username: &str) -> RegisterRequest {
    RegisterRequest {
        username: username.to_string(),
        email: format!("{username}@example.com"),
        password: "hunter2hunter2".to_string(),
        profile: ProfileFields {
            first_name: Some("Alice".to_string()),
            city: Some("Lisbon".to_string()),
            ..ProfileFields::default()
        },
    }
}

/// Poll until the replica agrees or the deadline passes. Replication is
/// asynchronous by design, so tests wait for convergence instead of
/// sleeping a fixed interval.
async fn converge<F>(check: F)
where
    F: Fn() -> std::pin::Pin<Box<dyn std::future::Future<Output = bool> + Send>>,
{
    for _ in 0..100 {
        if check().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("replica did not converge within the deadline");
}

#[tokio::test]
async fn registration_replicates_the_full_profile() {
    let p = pipeline();
    let tokens = p.authority.register(register_request("alice")).await.unwrap();
    let user_id = tokens.principal.id.clone();

    let replica = p.replica.clone();
    let id = user_id.clone();
    converge(move || {
        let replica = replica.clone();
        let id = id.clone();
        Box::pin(async move { replica.find_by_id(&id).await.unwrap().is_some() })
    })
    .await;

    let profile = p.replica.find_by_id(&user_id).await.unwrap().unwrap();
    assert_eq!(profile.username.as_deref(), Some("alice"));
    assert_eq!(profile.email.as_deref(), Some("alice@example.com"));
    assert_eq!(profile.first_name.as_deref(), Some("Alice"));
    assert_eq!(profile.city.as_deref(), Some("Lisbon"));
    assert_eq!(profile.enabled, Some(true));
}

#[tokio::test]
async fn profile_update_merges_into_the_replica() {
    let p = pipeline();
    let tokens = p.authority.register(register_request("alice")).await.unwrap();
    let user_id = tokens.principal.id.clone();

    p.authority
        .update_profile(
            &user_id,
            ProfileFields {
                city: Some("Porto".to_string()),
                ..ProfileFields::default()
            },
        )
        .await
        .unwrap();

    let replica = p.replica.clone();
    let id = user_id.clone();
    converge(move || {
        let replica = replica.clone();
        let id = id.clone();
        Box::pin(async move {
            replica
                .find_by_id(&id)
                .await
                .unwrap()
                .is_some_and(|profile| profile.city.as_deref() == Some("Porto"))
        })
    })
    .await;

    // The update carried no firstName; the replica keeps the original
    let profile = p.replica.find_by_id(&user_id).await.unwrap().unwrap();
    assert_eq!(profile.first_name.as_deref(), Some("Alice"));
}

#[tokio::test]
async fn deletion_removes_the_replica_record() {
    let p = pipeline();
    let tokens = p.authority.register(register_request("alice")).await.unwrap();
    let user_id = tokens.principal.id.clone();

    let replica = p.replica.clone();
    let id = user_id.clone();
    converge(move || {
        let replica = replica.clone();
        let id = id.clone();
        Box::pin(async move { replica.find_by_id(&id).await.unwrap().is_some() })
    })
    .await;

    p.authority.delete_account(&user_id).await.unwrap();

    let replica = p.replica.clone();
    let id = user_id.clone();
    converge(move || {
        let replica = replica.clone();
        let id = id.clone();
        Box::pin(async move { replica.find_by_id(&id).await.unwrap().is_none() })
    })
    .await;
}

#[tokio::test]
async fn events_for_many_users_all_arrive() {
    let p = pipeline();
    for i in 0..20 {
        p.authority
            .register(register_request(&format!("user{i}")))
            .await
            .unwrap();
    }

    let replica = p.replica.clone();
    converge(move || {
        let replica = replica.clone();
        Box::pin(async move { replica.list().await.unwrap().len() == 20 })
    })
    .await;
}

#[tokio::test]
async fn profile_by_id_is_limited_to_self_or_admin() {
    let p = pipeline();
    let alice = p.authority.register(register_request("alice")).await.unwrap();
    let bob = p.authority.register(register_request("bob")).await.unwrap();
    let alice_id = alice.principal.id.clone();
    let bob_id = bob.principal.id.clone();

    // Partitions give no cross-user ordering, so wait for both records
    for id in [alice_id.clone(), bob_id.clone()] {
        let replica = p.replica.clone();
        converge(move || {
            let replica = replica.clone();
            let id = id.clone();
            Box::pin(async move { replica.find_by_id(&id).await.unwrap().is_some() })
        })
        .await;
    }

    let (app, _doc) = router(ApiState {
        store: p.replica.clone(),
    })
    .split_for_parts();

    let get_as = |caller_id: &str, role: &str, target: &str| {
        Request::builder()
            .uri(format!("/api/users/v1/{target}"))
            .header(HEADER_USER_ID, caller_id)
            .header(HEADER_USER_ROLE, role)
            .header(HEADER_USER_EMAIL, "caller@example.com")
            .header(HEADER_USER_NAME, "caller")
            .body(Body::empty())
            .unwrap()
    };

    // A user reading someone else's profile is refused
    let response = app
        .clone()
        .oneshot(get_as(&alice_id, "USER", &bob_id))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["error"], "FORBIDDEN");

    // Reading one's own record is fine
    let response = app
        .clone()
        .oneshot(get_as(&alice_id, "USER", &alice_id))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Admins can read anyone
    let response = app
        .oneshot(get_as("admin-1", "ADMIN", &bob_id))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn read_api_serves_replicated_profiles_behind_trusted_headers() {
    let p = pipeline();
    let tokens = p.authority.register(register_request("alice")).await.unwrap();
    let user_id = tokens.principal.id.clone();

    let replica = p.replica.clone();
    let id = user_id.clone();
    converge(move || {
        let replica = replica.clone();
        let id = id.clone();
        Box::pin(async move { replica.find_by_id(&id).await.unwrap().is_some() })
    })
    .await;

    let (app, _doc) = router(ApiState {
        store: p.replica.clone(),
    })
    .split_for_parts();

    let trusted = |req: axum::http::request::Builder| {
        req.header(HEADER_USER_ID, &user_id)
            .header(HEADER_USER_ROLE, "USER")
            .header(HEADER_USER_EMAIL, "alice@example.com")
            .header(HEADER_USER_NAME, "alice")
    };

    // Own profile
    let response = app
        .clone()
        .oneshot(
            trusted(Request::builder().uri("/api/users/v1/me"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let profile: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(profile["username"], "alice");
    assert_eq!(profile["city"], "Lisbon");

    // By username
    let response = app
        .clone()
        .oneshot(
            trusted(Request::builder().uri("/api/users/v1/by-username/alice"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Without headers: rejected before any lookup
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/users/v1/me")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Listing requires the admin role
    let response = app
        .oneshot(
            trusted(Request::builder().uri("/api/users/v1"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
