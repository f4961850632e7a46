use std::sync::Arc;

use serde_json::json;

use super::*;
use crate::net::classify::ErrorClassifier;
use crate::net::types::{Method, RawResponse};
use crate::session::mirror;
use crate::storage::{KeyValueStore, MemoryStore};
use crate::test_support::{MockTransport, RecordingNotifier, memory_session};

struct Harness {
    auth: AuthClient,
    transport: Arc<MockTransport>,
    notifier: Arc<RecordingNotifier>,
    session: SessionStore,
    mirror: MemoryStore,
    events: SessionEvents,
}

fn harness(transport: MockTransport) -> Harness {
    let (session, mirror) = memory_session();
    let transport = Arc::new(transport);
    let notifier = Arc::new(RecordingNotifier::default());
    let events = SessionEvents::default();
    let pipeline = HttpPipeline::new(
        transport.clone(),
        session.clone(),
        ErrorClassifier::default(),
        notifier.clone(),
        events.clone(),
    );
    let auth = AuthClient::new(pipeline, events.clone());
    Harness { auth, transport, notifier, session, mirror, events }
}

fn alice() -> Credentials {
    Credentials { username: "alice".to_owned(), password: "secret".to_owned() }
}

fn login_body() -> serde_json::Value {
    json!({
        "code": 200,
        "message": "ok",
        "data": {
            "userid": 7,
            "username": "alice",
            "email": "alice@example.com",
            "fullName": "Alice Liddell",
            "roles": ["USER"],
            "token": "tok-1",
            "refresh_token": "ref-1"
        }
    })
}

// =============================================================================
// login
// =============================================================================

#[tokio::test]
async fn login_establishes_session_and_announces_it() {
    let h = harness(MockTransport::status(200, login_body()));
    let mut rx = h.events.subscribe();

    let user = h.auth.login(&alice()).await.unwrap();
    assert_eq!(user.id, 7);
    assert_eq!(user.full_name, "Alice Liddell");
    assert!(user.roles.contains("USER"));

    let snap = h.session.snapshot();
    assert_eq!(snap.token, "tok-1");
    assert_eq!(snap.refresh_token, "ref-1");
    assert_eq!(snap.user, Some(user));
    assert_eq!(rx.try_recv().unwrap(), SessionEvent::SignedIn { username: "alice".to_owned() });

    let sent = h.transport.recorded();
    assert_eq!(sent[0].method, Method::Post);
    assert_eq!(sent[0].url, LOGIN_PATH);
    assert_eq!(sent[0].body, Some(json!({ "username": "alice", "password": "secret" })));
    assert_eq!(h.notifier.count(), 0);
}

#[tokio::test]
async fn login_accepts_unwrapped_payload_with_camel_case_refresh_token() {
    let h = harness(MockTransport::status(
        200,
        json!({ "userId": 3, "username": "bob", "token": "t", "refreshToken": "r" }),
    ));
    let user = h.auth.login(&alice()).await.unwrap();
    assert_eq!(user.id, 3);
    assert_eq!(h.session.refresh_token(), "r");
}

#[tokio::test]
async fn login_without_token_is_a_business_error() {
    let h = harness(MockTransport::status(200, json!({ "code": 200, "data": { "username": "alice" } })));
    let mut rx = h.events.subscribe();

    let err = h.auth.login(&alice()).await.unwrap_err();
    let AuthError::Api(err) = err else { panic!("expected api error") };
    assert_eq!(err.class, FailureClass::BusinessError);
    assert!(!h.session.is_authenticated());
    assert_eq!(h.notifier.count(), 1);
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn login_keeps_existing_token_when_response_omits_one() {
    let h = harness(MockTransport::status(200, json!({ "username": "alice", "userid": 1 })));
    h.session
        .set_session("old", Some("old-ref"), User { id: 1, username: "alice".to_owned(), ..User::default() })
        .unwrap();

    h.auth.login(&alice()).await.unwrap();
    assert_eq!(h.session.token(), "old");
    assert_eq!(h.session.refresh_token(), "old-ref");
}

#[tokio::test]
async fn rejected_credentials_surface_server_text() {
    let h = harness(MockTransport::status(401, json!({ "message": "Bad credentials" })));
    let mut rx = h.events.subscribe();

    let err = h.auth.login(&alice()).await.unwrap_err();
    let AuthError::Api(err) = err else { panic!("expected api error") };
    assert!(err.is_auth_expired());
    assert_eq!(h.notifier.texts(), vec!["Bad credentials".to_owned()]);
    assert_eq!(rx.try_recv().unwrap(), SessionEvent::Invalidated);
}

// =============================================================================
// account calls
// =============================================================================

#[tokio::test]
async fn register_does_not_sign_in() {
    let h = harness(MockTransport::status(200, json!({ "code": 200, "data": { "userid": 9, "username": "carol" } })));
    let request = RegisterRequest {
        username: "carol".to_owned(),
        password: "pw".to_owned(),
        email: "carol@example.com".to_owned(),
        full_name: Some("Carol".to_owned()),
    };

    let user = h.auth.register(&request).await.unwrap();
    assert_eq!(user.id, 9);
    assert!(!h.session.is_authenticated());
    let sent = h.transport.recorded();
    assert_eq!(sent[0].url, REGISTER_PATH);
    assert_eq!(sent[0].body.as_ref().unwrap()["fullName"], "Carol");
}

#[tokio::test]
async fn current_user_merges_into_session() {
    let h = harness(MockTransport::status(
        200,
        json!({ "code": 200, "data": { "userid": 7, "email": "new@example.com", "roles": ["ADMIN"] } }),
    ));
    h.session
        .set_session("tok", None, User { id: 7, username: "alice".to_owned(), ..User::default() })
        .unwrap();

    let user = h.auth.current_user().await.unwrap();
    assert_eq!(user.username, "alice");
    assert_eq!(user.email, "new@example.com");
    assert!(user.roles.contains("ADMIN"));
    assert_eq!(h.session.user(), Some(user));
    assert_eq!(h.transport.recorded()[0].header_value("Authorization"), Some("Bearer tok"));
}

#[tokio::test]
async fn current_user_repairs_session_restored_without_user() {
    let h = harness(MockTransport::status(
        200,
        json!({ "code": 200, "data": { "userid": 7, "username": "alice", "roles": null } }),
    ));
    h.mirror.set(mirror::TOKEN_KEY, "\"t1\"").unwrap();
    h.mirror.set(mirror::USER_KEY, "not json").unwrap();
    h.session.init();
    assert_eq!(h.session.user(), None);

    let user = h.auth.current_user().await.unwrap();
    assert_eq!(user.username, "alice");
    assert_eq!(h.session.user(), Some(user));
    assert_eq!(h.transport.recorded()[0].header_value("Authorization"), Some("Bearer t1"));
}

#[tokio::test]
async fn update_profile_applies_patch_even_without_response_body() {
    let h = harness(MockTransport::queue(vec![Ok(RawResponse::new(204, ""))]));
    h.session
        .set_session("tok", None, User { id: 7, username: "alice".to_owned(), ..User::default() })
        .unwrap();

    let patch = UserPatch { full_name: Some("Alice L.".to_owned()), ..UserPatch::default() };
    let user = h.auth.update_profile(&patch).await.unwrap();
    assert_eq!(user.full_name, "Alice L.");
    assert_eq!(h.session.token(), "tok");

    let sent = h.transport.recorded();
    assert_eq!(sent[0].method, Method::Put);
    assert_eq!(sent[0].body, Some(json!({ "fullName": "Alice L." })));
}

#[tokio::test]
async fn empty_profile_patch_sends_nothing() {
    let h = harness(MockTransport::status(500, json!({})));
    h.session
        .set_session("tok", None, User { id: 7, username: "alice".to_owned(), ..User::default() })
        .unwrap();

    let user = h.auth.update_profile(&UserPatch::default()).await.unwrap();
    assert_eq!(user.username, "alice");
    assert!(h.transport.recorded().is_empty());
    assert_eq!(h.notifier.count(), 0);
}

#[tokio::test]
async fn user_stats_hits_per_user_path() {
    let h = harness(MockTransport::status(200, json!({ "code": 200, "data": { "documents": 4 } })));
    let stats = h.auth.user_stats(42).await.unwrap();
    assert_eq!(stats, json!({ "documents": 4 }));
    assert_eq!(h.transport.recorded()[0].url, "/users/42/stats");
}

#[tokio::test]
async fn logout_clears_and_announces() {
    let h = harness(MockTransport::status(200, login_body()));
    h.auth.login(&alice()).await.unwrap();
    let mut rx = h.events.subscribe();

    h.auth.logout();
    assert!(!h.session.is_authenticated());
    assert_eq!(h.session.user(), None);
    assert_eq!(rx.try_recv().unwrap(), SessionEvent::SignedOut);
    assert_eq!(h.transport.recorded().len(), 1);
}
