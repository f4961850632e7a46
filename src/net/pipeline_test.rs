use serde_json::json;

use super::*;
use crate::net::messages::Locale;
use crate::net::transport::TransportError;
use crate::net::types::RawResponse;
use crate::session::types::User;
use crate::test_support::{MockTransport, RecordingNotifier, memory_session};

struct Harness {
    pipeline: HttpPipeline,
    transport: Arc<MockTransport>,
    notifier: Arc<RecordingNotifier>,
    session: SessionStore,
    events: SessionEvents,
}

fn harness(transport: MockTransport) -> Harness {
    let (session, _) = memory_session();
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
    Harness { pipeline, transport, notifier, session, events }
}

fn sign_in(session: &SessionStore, token: &str) {
    session
        .set_session(token, None, User { id: 1, username: "alice".to_owned(), ..User::default() })
        .unwrap();
}

// =============================================================================
// outbound
// =============================================================================

#[test]
fn inject_credentials_adds_bearer_header() {
    let req = inject_credentials(RequestDescriptor::get("/documents"), "abc");
    assert_eq!(req.header_value("Authorization"), Some("Bearer abc"));
}

#[test]
fn inject_credentials_skips_empty_token() {
    let req = inject_credentials(RequestDescriptor::get("/documents"), "");
    assert_eq!(req.header_value("Authorization"), None);
    assert!(req.headers.is_empty());
}

#[test]
fn inject_credentials_replaces_caller_header() {
    let req = RequestDescriptor::get("/documents").header("authorization", "Basic xyz");
    let req = inject_credentials(req, "abc");
    assert_eq!(req.headers.len(), 1);
    assert_eq!(req.header_value("Authorization"), Some("Bearer abc"));
}

#[tokio::test]
async fn authenticated_request_carries_token() {
    let h = harness(MockTransport::status(200, json!({ "ok": true })));
    sign_in(&h.session, "abc");

    let payload = h.pipeline.send(RequestDescriptor::get("/users/current")).await.unwrap();
    assert_eq!(payload, json!({ "ok": true }));

    let sent = h.transport.recorded();
    assert_eq!(sent[0].header_value("Authorization"), Some("Bearer abc"));
}

#[tokio::test]
async fn anonymous_request_is_unmodified() {
    let h = harness(MockTransport::status(200, json!([])));
    let req = RequestDescriptor::get("/public/documents").query("keyword", "x");
    h.pipeline.send(req.clone()).await.unwrap();
    assert_eq!(h.transport.recorded(), vec![req]);
}

#[tokio::test]
async fn login_endpoint_is_not_special_cased() {
    let h = harness(MockTransport::status(200, json!({})));
    sign_in(&h.session, "stale");
    h.pipeline.send(RequestDescriptor::post("/auth/login")).await.unwrap();
    assert_eq!(h.transport.recorded()[0].header_value("Authorization"), Some("Bearer stale"));
}

#[tokio::test]
async fn header_reflects_token_at_dispatch_time() {
    let (session, _) = memory_session();
    sign_in(&session, "abc");
    let clearing = session.clone();
    // The session is cleared while the request is "in flight".
    let transport = Arc::new(MockTransport::with(move |_| {
        clearing.clear();
        Ok(RawResponse::json(200, &json!({})))
    }));
    let pipeline = HttpPipeline::new(
        transport.clone(),
        session.clone(),
        ErrorClassifier::default(),
        Arc::new(RecordingNotifier::default()),
        SessionEvents::default(),
    );

    pipeline.send(RequestDescriptor::get("/documents")).await.unwrap();
    assert_eq!(transport.recorded()[0].header_value("Authorization"), Some("Bearer abc"));
    assert!(!session.is_authenticated());
}

// =============================================================================
// inbound side effects
// =============================================================================

#[tokio::test]
async fn status_401_clears_session_and_emits_invalidated() {
    let h = harness(MockTransport::status(401, json!({})));
    sign_in(&h.session, "abc");
    let mut rx = h.events.subscribe();

    let err = h.pipeline.send(RequestDescriptor::get("/documents")).await.unwrap_err();
    assert_eq!(err.class, FailureClass::AuthExpired);
    assert!(!h.session.is_authenticated());
    assert_eq!(rx.try_recv().unwrap(), SessionEvent::Invalidated);
    assert_eq!(h.notifier.texts(), vec!["Your session has expired, please sign in again".to_owned()]);
}

#[tokio::test]
async fn concurrent_401s_converge_to_signed_out() {
    let h = harness(MockTransport::status(401, json!({})).yielding());
    sign_in(&h.session, "abc");
    let mut rx = h.events.subscribe();

    let (a, b, c) = tokio::join!(
        h.pipeline.send(RequestDescriptor::get("/documents")),
        h.pipeline.send(RequestDescriptor::get("/users/current")),
        h.pipeline.send(RequestDescriptor::get("/users/1/stats")),
    );
    for result in [a, b, c] {
        assert_eq!(result.unwrap_err().class, FailureClass::AuthExpired);
    }

    // All three were dispatched with the token, before any reply.
    assert!(h.transport.recorded().iter().all(|r| r.header_value("Authorization") == Some("Bearer abc")));
    assert!(!h.session.is_authenticated());
    assert_eq!(h.session.snapshot(), crate::session::types::Session::default());
    assert_eq!(h.notifier.count(), 1);

    let mut invalidations = 0;
    while let Ok(event) = rx.try_recv() {
        assert_eq!(event, SessionEvent::Invalidated);
        invalidations += 1;
    }
    assert_eq!(invalidations, 3);
}

#[tokio::test]
async fn anonymous_401_with_server_text_is_shown() {
    let h = harness(MockTransport::status(401, json!({ "message": "Invalid username or password" })));
    let err = h.pipeline.send(RequestDescriptor::post("/auth/login")).await.unwrap_err();
    assert_eq!(err.message, "Invalid username or password");
    assert_eq!(h.notifier.texts(), vec!["Invalid username or password".to_owned()]);
}

#[tokio::test]
async fn anonymous_401_with_blank_message_shows_default_text() {
    let h = harness(MockTransport::status(
        401,
        json!({ "status": 401, "error": "Unauthorized", "message": "" }),
    ));
    let err = h.pipeline.send(RequestDescriptor::post("/auth/login")).await.unwrap_err();
    assert_eq!(err.class, FailureClass::AuthExpired);
    assert_eq!(h.notifier.texts(), vec!["Your session has expired, please sign in again".to_owned()]);
}

#[tokio::test]
async fn stale_token_401_after_sign_out_stays_quiet() {
    let h = harness(MockTransport::status(401, json!({ "message": "Token expired" })).yielding());
    sign_in(&h.session, "abc");

    let (a, b) = tokio::join!(
        h.pipeline.send(RequestDescriptor::get("/documents")),
        h.pipeline.send(RequestDescriptor::get("/users/current")),
    );
    assert!(a.is_err() && b.is_err());
    assert_eq!(h.notifier.texts(), vec!["Token expired".to_owned()]);
}

#[tokio::test]
async fn network_failure_keeps_session() {
    let h = harness(MockTransport::queue(vec![Err(TransportError::Timeout)]));
    sign_in(&h.session, "abc");

    let err = h.pipeline.send(RequestDescriptor::get("/documents")).await.unwrap_err();
    assert_eq!(err.class, FailureClass::Network);
    assert!(h.session.is_authenticated());
    assert_eq!(h.notifier.texts(), vec!["Network error, please check your connection".to_owned()]);
}

#[tokio::test]
async fn notify_classes_keep_session_and_emit_one_notice_each() {
    let h = harness(MockTransport::queue(vec![
        Ok(RawResponse::new(403, "")),
        Ok(RawResponse::new(404, "")),
        Ok(RawResponse::new(500, "")),
        Ok(RawResponse::json(200, &json!({ "code": 500, "message": "quota exceeded" }))),
    ]));
    sign_in(&h.session, "abc");
    let mut rx = h.events.subscribe();

    let mut classes = Vec::new();
    for _ in 0..4 {
        classes.push(h.pipeline.send(RequestDescriptor::get("/documents")).await.unwrap_err().class);
    }
    assert_eq!(
        classes,
        vec![FailureClass::Forbidden, FailureClass::NotFound, FailureClass::ServerError, FailureClass::BusinessError]
    );
    assert!(h.session.is_authenticated());
    assert!(rx.try_recv().is_err());
    assert_eq!(
        h.notifier.texts(),
        vec![
            "You do not have permission to perform this action".to_owned(),
            "The requested resource does not exist".to_owned(),
            "Server error, please try again later".to_owned(),
            "quota exceeded".to_owned(),
        ]
    );
}

#[tokio::test]
async fn success_has_no_side_effects() {
    let h = harness(MockTransport::status(200, json!({ "code": 200, "message": "ok", "data": { "n": 1 } })));
    sign_in(&h.session, "abc");
    let outcome = h.pipeline.dispatch(RequestDescriptor::get("/documents")).await;
    assert_eq!(outcome, Outcome::Success { payload: json!({ "n": 1 }) });
    assert_eq!(h.notifier.count(), 0);
}

#[tokio::test]
async fn send_json_decodes_payload() {
    #[derive(serde::Deserialize)]
    struct Stats {
        documents: u32,
    }
    let h = harness(MockTransport::status(200, json!({ "documents": 4 })));
    let stats: Stats = h.pipeline.send_json(RequestDescriptor::get("/users/1/stats")).await.unwrap();
    assert_eq!(stats.documents, 4);
}

#[tokio::test]
async fn send_json_shape_mismatch_is_business_error() {
    #[derive(Debug, serde::Deserialize)]
    #[allow(dead_code)]
    struct Stats {
        documents: u32,
    }
    let h = harness(MockTransport::status(200, json!({ "unexpected": true })));
    let err = h.pipeline.send_json::<Stats>(RequestDescriptor::get("/users/1/stats")).await.unwrap_err();
    assert_eq!(err.class, FailureClass::BusinessError);
    assert_eq!(h.notifier.count(), 1);
}

#[tokio::test]
async fn localized_notices_follow_classifier_locale() {
    let (session, _) = memory_session();
    let notifier = Arc::new(RecordingNotifier::default());
    let pipeline = HttpPipeline::new(
        Arc::new(MockTransport::status(404, Value::Null)),
        session,
        ErrorClassifier::new(Locale::ZhCn, 200),
        notifier.clone(),
        SessionEvents::default(),
    );
    pipeline.send(RequestDescriptor::get("/documents/9")).await.unwrap_err();
    assert_eq!(notifier.texts(), vec!["请求的资源不存在".to_owned()]);
}
