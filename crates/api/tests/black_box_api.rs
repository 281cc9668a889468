use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::{json, Value};

use homefix_ai::{InMemoryFlagSource, ModelClient, ModelError, ModelRequest, UnconfiguredModelClient};
use homefix_infra::{AiConfig, AiServices};

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn(model: Arc<dyn ModelClient>, flags: Arc<InMemoryFlagSource>) -> Self {
        // Same router as prod, in-memory stores, ephemeral port.
        let services = AiServices::in_memory(AiConfig::default(), model, flags);
        let app = homefix_api::app::build_app(services);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url, handle }
    }

    async fn offline() -> Self {
        Self::spawn(Arc::new(UnconfiguredModelClient), InMemoryFlagSource::arc()).await
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Returns a fixed completion and counts calls.
struct CannedModel {
    reply: String,
    calls: AtomicUsize,
}

impl CannedModel {
    fn new(reply: Value) -> Arc<Self> {
        Arc::new(Self {
            reply: format!("```json\n{reply}\n```"),
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl ModelClient for CannedModel {
    async fn complete(&self, _request: &ModelRequest) -> Result<String, ModelError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.reply.clone())
    }
}

fn fraud_inputs() -> Value {
    json!({
        "referrer_id": "u_42",
        "signups_last_24h": 50,
        "signups_last_7d": 60,
        "conversions_last_7d": 1,
        "cluster_hash_matches": 4
    })
}

fn crm_inputs() -> Value {
    json!({
        "customer_id": "c_9",
        "days_since_last_booking": 200,
        "total_bookings": 3,
        "open_requests": 0
    })
}

async fn run_task(client: &reqwest::Client, base_url: &str, task_type: &str, body: Value) -> reqwest::Response {
    client
        .post(format!("{}/ai/tasks/{}/run", base_url, task_type))
        .header("x-actor-id", "admin_1")
        .json(&body)
        .send()
        .await
        .unwrap()
}

#[tokio::test]
async fn health_is_open() {
    let srv = TestServer::offline().await;
    let res = reqwest::get(format!("{}/health", srv.base_url)).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn disabled_flag_returns_rule_based_output() {
    let srv = TestServer::offline().await;
    let client = reqwest::Client::new();

    let res = run_task(
        &client,
        &srv.base_url,
        "FRAUD_SIGNAL_REFERRALS",
        json!({ "entity_type": "referral", "entity_id": "r_1", "inputs": fraud_inputs() }),
    )
    .await;

    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["used_fallback"], true);
    assert_eq!(body["fallback_reason"]["kind"], "flag_disabled");
    assert_eq!(body["output"]["risk_level"], "high");
    assert!(body["correlation_id"].as_str().is_some());
    assert!(body.get("job_id").is_none());
}

#[tokio::test]
async fn enabled_flag_uses_model_output() {
    let model = CannedModel::new(json!({
        "risk_score": 12,
        "risk_level": "low",
        "reasons": ["steady signup pattern"],
        "recommended_action": "allow"
    }));
    let flags = Arc::new(InMemoryFlagSource::with_flags([("ai_admin_triage_enabled", true)]));
    let srv = TestServer::spawn(model.clone(), flags).await;
    let client = reqwest::Client::new();

    let res = run_task(
        &client,
        &srv.base_url,
        "FRAUD_SIGNAL_REFERRALS",
        json!({ "entity_type": "referral", "entity_id": "r_1", "inputs": fraud_inputs() }),
    )
    .await;

    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["used_fallback"], false);
    assert_eq!(body["output"]["risk_score"], 12.0);
    assert!(body.get("fallback_reason").is_none());
    assert_eq!(model.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn unknown_task_and_bad_inputs_are_client_errors() {
    let srv = TestServer::offline().await;
    let client = reqwest::Client::new();

    let res = run_task(
        &client,
        &srv.base_url,
        "NOT_A_TASK",
        json!({ "entity_type": "provider", "entity_id": "p_1", "inputs": {} }),
    )
    .await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "unknown_task_type");

    let res = run_task(
        &client,
        &srv.base_url,
        "CRM_NEXT_BEST_ACTION",
        json!({ "entity_type": "customer", "entity_id": "c_9", "inputs": { "total_bookings": "many" } }),
    )
    .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "invalid_input");

    let res = run_task(
        &client,
        &srv.base_url,
        "CRM_NEXT_BEST_ACTION",
        json!({ "entity_type": "spaceship", "entity_id": "c_9", "inputs": crm_inputs() }),
    )
    .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn invalid_actor_header_is_rejected() {
    let srv = TestServer::offline().await;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/ai/tasks/CRM_NEXT_BEST_ACTION/run", srv.base_url))
        .header("x-actor-id", "   ")
        .json(&json!({ "entity_type": "customer", "entity_id": "c_9", "inputs": crm_inputs() }))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "invalid_actor");
}

#[tokio::test]
async fn fallback_endpoint_skips_flags_and_model() {
    let model = CannedModel::new(json!({}));
    let flags = Arc::new(InMemoryFlagSource::with_flags([("ai_crm_copilot_enabled", true)]));
    let srv = TestServer::spawn(model.clone(), flags).await;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/ai/tasks/CRM_NEXT_BEST_ACTION/fallback", srv.base_url))
        .json(&json!({ "inputs": crm_inputs() }))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["used_fallback"], true);
    assert!(!body["output"]["suggestions"].as_array().unwrap().is_empty());
    assert_eq!(model.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn persisted_run_is_queryable_and_accepts_feedback() {
    let srv = TestServer::offline().await;
    let client = reqwest::Client::new();

    let res = run_task(
        &client,
        &srv.base_url,
        "CRM_NEXT_BEST_ACTION",
        json!({ "entity_type": "customer", "entity_id": "c_9", "inputs": crm_inputs(), "persist": true }),
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    let job_id = body["job_id"].as_str().expect("job_id present").to_string();

    let res = client
        .get(format!(
            "{}/ai/invocations?entity_type=customer&entity_id=c_9&task_type=CRM_NEXT_BEST_ACTION",
            srv.base_url
        ))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    let items = body["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["job_id"], job_id.as_str());
    assert_eq!(items[0]["actor"], "admin_1");
    assert_eq!(items[0]["used_fallback"], true);

    let res = client
        .post(format!("{}/ai/feedback", srv.base_url))
        .header("x-actor-id", "admin_1")
        .json(&json!({ "job_id": job_id, "rating": "UP", "comment": "useful" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: Value = res.json().await.unwrap();
    assert!(body["feedback_id"].as_str().is_some());

    let res = client
        .get(format!("{}/ai/feedback/{}", srv.base_url, job_id))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["summary"]["up"], 1);
    assert_eq!(body["summary"]["down"], 0);
    assert_eq!(body["items"][0]["rating"], "up");
}

#[tokio::test]
async fn feedback_rejects_unknown_job_and_bad_rating() {
    let srv = TestServer::offline().await;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/ai/feedback", srv.base_url))
        .json(&json!({ "job_id": homefix_core::JobId::new().to_string(), "rating": "up" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = client
        .post(format!("{}/ai/feedback", srv.base_url))
        .json(&json!({ "job_id": homefix_core::JobId::new().to_string(), "rating": "meh" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn admin_flag_flip_changes_run_path() {
    let model = CannedModel::new(json!({
        "suggestions": [{
            "action": "call",
            "priority": "high",
            "title": "Call about spring tune-up",
            "rationale": "No booking in over six months."
        }]
    }));
    let srv = TestServer::spawn(model.clone(), InMemoryFlagSource::arc()).await;
    let client = reqwest::Client::new();

    let res = client
        .get(format!("{}/admin/feature-flags", srv.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    let crm = body["items"]
        .as_array()
        .unwrap()
        .iter()
        .find(|f| f["flag_key"] == "ai_crm_copilot_enabled")
        .cloned()
        .unwrap();
    assert_eq!(crm["enabled"], false);
    assert_eq!(crm["stored"], false);

    let res = client
        .put(format!("{}/admin/feature-flags/ai_crm_copilot_enabled", srv.base_url))
        .header("x-actor-id", "admin_1")
        .json(&json!({ "enabled": true }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["enabled"], true);
    assert_eq!(body["updated_by"], "admin_1");

    let res = run_task(
        &client,
        &srv.base_url,
        "CRM_NEXT_BEST_ACTION",
        json!({ "entity_type": "customer", "entity_id": "c_9", "inputs": crm_inputs() }),
    )
    .await;
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["used_fallback"], false);
    assert_eq!(model.calls.load(Ordering::SeqCst), 1);

    let res = client
        .put(format!("{}/admin/feature-flags/Bad-Key", srv.base_url))
        .json(&json!({ "enabled": true }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}
