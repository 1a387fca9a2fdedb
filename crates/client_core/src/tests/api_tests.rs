use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Query, State},
    http::{HeaderMap as AxumHeaders, StatusCode as AxumStatus},
    routing::{get, post, put},
    Json, Router,
};
use chrono::NaiveDate;
use serde_json::{json, Value};
use shared::{domain::CampaignStatus, protocol::CampaignContent};
use tokio::sync::Mutex;

use super::*;
use crate::{
    http::IDEMPOTENCY_KEY_HEADER, storage::LocalStorage, test_support::campaign,
    test_support::spawn_backend,
};

#[derive(Clone, Default)]
struct Recorded {
    kind_queries: Arc<Mutex<Vec<Option<String>>>>,
    idempotency: Arc<Mutex<Vec<Option<String>>>>,
    status_bodies: Arc<Mutex<Vec<Value>>>,
    authorization: Arc<Mutex<Vec<Option<String>>>>,
}

fn header(headers: &AxumHeaders, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

async fn login(Json(body): Json<Value>) -> (AxumStatus, Json<Value>) {
    if body["password"] == "hunter2" {
        (
            AxumStatus::OK,
            Json(json!({ "token": "fresh-token", "employee_id": 4 })),
        )
    } else {
        (
            AxumStatus::BAD_REQUEST,
            Json(json!({ "code": "validation", "message": "bad credentials" })),
        )
    }
}

async fn campaigns(
    State(recorded): State<Recorded>,
    headers: AxumHeaders,
    Query(query): Query<HashMap<String, String>>,
) -> Json<Value> {
    recorded
        .kind_queries
        .lock()
        .await
        .push(query.get("kind").cloned());
    recorded
        .authorization
        .lock()
        .await
        .push(header(&headers, "authorization"));
    Json(json!([campaign(1, CampaignStatus::Live)]))
}

async fn create_campaign(
    State(recorded): State<Recorded>,
    headers: AxumHeaders,
    Json(body): Json<Value>,
) -> (AxumStatus, Json<Value>) {
    recorded
        .idempotency
        .lock()
        .await
        .push(header(&headers, IDEMPOTENCY_KEY_HEADER));
    let mut created = campaign(11, CampaignStatus::Draft);
    created.name = body["name"].as_str().unwrap_or_default().to_string();
    (AxumStatus::CREATED, Json(json!(created)))
}

async fn campaign_status(
    State(recorded): State<Recorded>,
    Json(body): Json<Value>,
) -> Json<Value> {
    recorded.status_bodies.lock().await.push(body);
    Json(json!(campaign(3, CampaignStatus::Paused)))
}

async fn integration() -> Json<Value> {
    Json(json!({ "provider": "instagram", "connected": true, "account_name": "@brightsmile" }))
}

async fn integrations() -> Json<Value> {
    Json(json!([
        { "provider": "facebook", "connected": true },
        { "provider": "tiktok", "connected": false }
    ]))
}

async fn referrals(Query(query): Query<HashMap<String, String>>) -> Json<Value> {
    let name = query
        .get("search")
        .cloned()
        .unwrap_or_else(|| "everyone".to_string());
    Json(json!([{ "id": 1, "name": name, "referral_count": 3 }]))
}

async fn spawn_crm_backend() -> (CrmApi, Recorded) {
    let recorded = Recorded::default();
    let app = Router::new()
        .route("/api/auth/login/", post(login))
        .route("/api/campaigns/", get(campaigns).post(create_campaign))
        .route("/api/campaigns/3/status/", post(campaign_status))
        .route("/api/integrations/", get(integrations))
        .route("/api/integrations/instagram/", put(integration))
        .route("/api/referrals/", get(referrals))
        .with_state(recorded.clone());
    let base_url = spawn_backend(app).await.expect("spawn backend");
    let client = ApiClient::new(&base_url, LocalStorage::in_memory()).expect("client");
    (CrmApi::new(client), recorded)
}

fn create_request() -> CreateCampaignRequest {
    CreateCampaignRequest {
        name: "Spring whitening".into(),
        objective: "leads".into(),
        audience: "all".into(),
        start_date: NaiveDate::from_ymd_opt(2024, 1, 1).expect("date"),
        end_date: NaiveDate::from_ymd_opt(2024, 1, 10).expect("date"),
        content: CampaignContent::Social {
            platforms: vec![Platform::Facebook],
            mode: "organic".into(),
        },
        schedule_mode: shared::protocol::ScheduleMode::Now,
        scheduled_at: None,
    }
}

#[tokio::test]
async fn login_stores_token_and_later_calls_use_it() {
    let (api, recorded) = spawn_crm_backend().await;
    let mut session = api.client().subscribe_session();

    let response = api.login("dr@clinic.test", "hunter2").await.expect("login");

    assert_eq!(response.token, "fresh-token");
    assert_eq!(
        api.client().storage().token().expect("token").as_deref(),
        Some("fresh-token")
    );
    assert_eq!(session.recv().await.expect("event"), SessionEvent::LoggedIn);

    api.list_campaigns(None).await.expect("campaigns");
    assert_eq!(
        recorded.authorization.lock().await.as_slice(),
        &[Some("Bearer fresh-token".to_string())]
    );
}

#[tokio::test]
async fn failed_login_keeps_storage_empty() {
    let (api, _recorded) = spawn_crm_backend().await;

    let err = api
        .login("dr@clinic.test", "wrong")
        .await
        .expect_err("bad credentials");

    assert!(matches!(err, ClientError::Status { status: 400, .. }));
    assert_eq!(err.user_message(), "bad credentials");
    assert_eq!(api.client().storage().token().expect("token"), None);
}

#[tokio::test]
async fn logout_clears_token_and_broadcasts() {
    let (api, _recorded) = spawn_crm_backend().await;
    api.client().storage().set_token("t").expect("token");
    let mut session = api.client().subscribe_session();

    api.logout().expect("logout");

    assert_eq!(api.client().storage().token().expect("token"), None);
    assert_eq!(
        session.recv().await.expect("event"),
        SessionEvent::LoggedOut {
            reason: LogoutReason::UserRequested
        }
    );
}

#[tokio::test]
async fn campaign_listing_sends_kind_filter() {
    let (api, recorded) = spawn_crm_backend().await;

    let all = api.list_campaigns(None).await.expect("all");
    let email = api
        .list_campaigns(Some(CampaignKind::Email))
        .await
        .expect("email");

    assert_eq!(all.len(), 1);
    assert_eq!(email[0].status, CampaignStatus::Live);
    assert_eq!(
        recorded.kind_queries.lock().await.as_slice(),
        &[None, Some("email".to_string())]
    );
}

#[tokio::test]
async fn campaign_creation_reuses_idempotency_key() {
    let (api, recorded) = spawn_crm_backend().await;
    let key = Uuid::new_v4();

    let first = api
        .create_campaign(&create_request(), key)
        .await
        .expect("first");
    api.create_campaign(&create_request(), key)
        .await
        .expect("retry");

    assert_eq!(first.name, "Spring whitening");
    let expected = Some(key.to_string());
    assert_eq!(
        recorded.idempotency.lock().await.as_slice(),
        &[expected.clone(), expected]
    );
}

#[tokio::test]
async fn status_change_posts_action() {
    let (api, recorded) = spawn_crm_backend().await;

    let updated = api
        .change_campaign_status(CampaignId(3), CampaignAction::Pause)
        .await
        .expect("status");

    assert_eq!(updated.status, CampaignStatus::Paused);
    assert_eq!(
        recorded.status_bodies.lock().await.as_slice(),
        &[json!({ "action": "pause" })]
    );
}

#[tokio::test]
async fn integration_toggle_is_mirrored_locally() {
    let (api, _recorded) = spawn_crm_backend().await;

    let integration = api
        .set_integration_connected(Platform::Instagram, true)
        .await
        .expect("connect");

    assert!(integration.connected);
    let storage = api.client().storage();
    assert!(storage
        .integration_connected(Platform::Instagram)
        .expect("flag"));
    assert!(!storage
        .integration_connected(Platform::Facebook)
        .expect("flag"));
}

#[tokio::test]
async fn integration_sync_writes_fetched_flags() {
    let (api, _recorded) = spawn_crm_backend().await;
    let storage = api.client().storage();
    storage
        .set_integration_connected(Platform::Tiktok, true)
        .expect("flag");
    storage
        .set_integration_connected(Platform::Twitter, true)
        .expect("flag");

    let integrations = api.sync_integrations().await.expect("sync");

    assert_eq!(integrations.len(), 2);
    assert_eq!(
        storage.connected_integrations().expect("integrations"),
        vec![Platform::Facebook, Platform::Twitter]
    );
}

#[tokio::test]
async fn referral_search_is_trimmed_and_optional() {
    let (api, _recorded) = spawn_crm_backend().await;

    let everyone = api.list_referrals(Some("   ")).await.expect("all");
    let searched = api.list_referrals(Some(" ortho ")).await.expect("search");

    assert_eq!(everyone[0].name, "everyone");
    assert_eq!(searched[0].name, "ortho");
}

#[tokio::test]
async fn document_upload_rejects_blank_filename_locally() {
    let (api, _recorded) = spawn_crm_backend().await;

    let err = api
        .upload_ticket_document(TicketId(1), "  ", None, b"%PDF")
        .await
        .expect_err("blank filename");

    assert!(matches!(err, ClientError::Validation(_)));
}
