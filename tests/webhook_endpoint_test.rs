//! End-to-end tests for the inbound webhook endpoint: signed request in,
//! callbacks invoked, JSON acknowledgement out.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::Router;
use grantway::testing;
use grantway::webhooks::SignatureVerifier;
use grantway::{EntitlementContext, EntitlementStrategy, WebhookEndpoint};

const SECRET: &str = "whsec_test";
const GRANT_BODY: &str = r#"{"type":"benefit_grant.created","data":{"benefit":{"slug":"figma-team"},"customer":{"email":"a@b.com"},"properties":{"figmaTeamId":"T1"}}}"#;
const REVOKE_BODY: &str = r#"{"type":"benefit_grant.revoked","data":{"benefit":{"slug":"figma-team"},"customer":{"email":"a@b.com"},"properties":{"figmaTeamId":"T1"}}}"#;

fn signed(app: Router, body: &str) -> testing::Scenario {
    let verifier = SignatureVerifier::new(SECRET);
    let ts = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64;

    testing::post(app, "/")
        .text_body(body)
        .header("webhook-id", "msg_e2e")
        .header("webhook-timestamp", &ts.to_string())
        .header(
            "webhook-signature",
            &verifier.sign("msg_e2e", ts, body.as_bytes()),
        )
}

struct Recorded {
    grants: AtomicUsize,
    revokes: AtomicUsize,
    contexts: Mutex<Vec<EntitlementContext>>,
}

impl Recorded {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            grants: AtomicUsize::new(0),
            revokes: AtomicUsize::new(0),
            contexts: Mutex::new(Vec::new()),
        })
    }
}

fn figma_team_app(recorded: &Arc<Recorded>) -> Router {
    let on_grant = Arc::clone(recorded);
    let on_revoke = Arc::clone(recorded);

    let definition = EntitlementStrategy::new()
        .grant_fn(move |ctx| {
            let recorded = Arc::clone(&on_grant);
            async move {
                recorded.grants.fetch_add(1, Ordering::SeqCst);
                recorded.contexts.lock().unwrap().push(ctx);
                Ok(())
            }
        })
        .revoke_fn(move |ctx| {
            let recorded = Arc::clone(&on_revoke);
            async move {
                recorded.revokes.fetch_add(1, Ordering::SeqCst);
                recorded.contexts.lock().unwrap().push(ctx);
                Ok(())
            }
        })
        .build();

    WebhookEndpoint::new(SECRET)
        .register(definition.handler("figma-team"))
        .into_router()
}

#[tokio::test]
async fn signed_grant_event_reaches_the_grant_callback() {
    let recorded = Recorded::new();
    let app = figma_team_app(&recorded);

    let response = signed(app, GRANT_BODY)
        .execute()
        .await
        .assert_ok()
        .assert_json();

    let body: serde_json::Value = response.json().await;
    assert_eq!(body, serde_json::json!({"received": true}));

    assert_eq!(recorded.grants.load(Ordering::SeqCst), 1);
    assert_eq!(recorded.revokes.load(Ordering::SeqCst), 0);

    let contexts = recorded.contexts.lock().unwrap();
    assert_eq!(contexts.len(), 1);
    assert_eq!(contexts[0].customer.email, "a@b.com");
    assert_eq!(contexts[0].property("figmaTeamId"), Some("T1"));
}

#[tokio::test]
async fn signed_revoke_event_reaches_the_revoke_callback() {
    let recorded = Recorded::new();
    let app = figma_team_app(&recorded);

    signed(app, REVOKE_BODY).execute().await.assert_ok();

    assert_eq!(recorded.grants.load(Ordering::SeqCst), 0);
    assert_eq!(recorded.revokes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn wrong_signature_is_rejected_and_nothing_runs() {
    let recorded = Recorded::new();
    let app = figma_team_app(&recorded);

    let ts = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64;

    let response = testing::post(app, "/")
        .text_body(GRANT_BODY)
        .header("webhook-id", "msg_e2e")
        .header("webhook-timestamp", &ts.to_string())
        .header("webhook-signature", "v1,aW5jb3JyZWN0IHNpZ25hdHVyZQ==")
        .execute()
        .await
        .assert_forbidden();

    let body: serde_json::Value = response.json().await;
    assert_eq!(body, serde_json::json!({"received": false}));

    assert_eq!(recorded.grants.load(Ordering::SeqCst), 0);
    assert_eq!(recorded.revokes.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn stale_timestamp_is_rejected() {
    let recorded = Recorded::new();
    let app = figma_team_app(&recorded);

    let verifier = SignatureVerifier::new(SECRET);
    let stale = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64
        - 3600;

    testing::post(app, "/")
        .text_body(GRANT_BODY)
        .header("webhook-id", "msg_e2e")
        .header("webhook-timestamp", &stale.to_string())
        .header(
            "webhook-signature",
            &verifier.sign("msg_e2e", stale, GRANT_BODY.as_bytes()),
        )
        .execute()
        .await
        .assert_forbidden();

    assert_eq!(recorded.grants.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn event_for_another_slug_is_acknowledged_without_callbacks() {
    let recorded = Recorded::new();
    let app = figma_team_app(&recorded);

    let body = r#"{"type":"benefit_grant.created","data":{"benefit":{"slug":"discord-role"},"customer":{"email":"a@b.com"},"properties":{}}}"#;
    signed(app, body).execute().await.assert_ok();

    assert_eq!(recorded.grants.load(Ordering::SeqCst), 0);
    assert_eq!(recorded.revokes.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn redelivery_runs_callbacks_again() {
    let recorded = Recorded::new();

    // Two deliveries of the same webhook id: no dedupe store, so the grant
    // callback runs twice. Idempotency is the callback author's job.
    for _ in 0..2 {
        let app = figma_team_app(&recorded);
        signed(app, GRANT_BODY).execute().await.assert_ok();
    }

    assert_eq!(recorded.grants.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn multiple_registered_slugs_route_independently() {
    let figma = Arc::new(AtomicUsize::new(0));
    let discord = Arc::new(AtomicUsize::new(0));

    let count = |counter: &Arc<AtomicUsize>| {
        let counter = Arc::clone(counter);
        move |_ctx: EntitlementContext| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        }
    };

    let figma_definition = EntitlementStrategy::new().grant_fn(count(&figma)).build();
    let discord_definition = EntitlementStrategy::new().grant_fn(count(&discord)).build();

    let app = WebhookEndpoint::new(SECRET)
        .register(figma_definition.handler("figma-team"))
        .register(discord_definition.handler("discord-role"))
        .into_router();

    signed(app, GRANT_BODY).execute().await.assert_ok();

    assert_eq!(figma.load(Ordering::SeqCst), 1);
    assert_eq!(discord.load(Ordering::SeqCst), 0);
}
