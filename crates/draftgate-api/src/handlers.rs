//! API Handlers
use crate::metrics;
use crate::middleware::{actor_from_headers, AdminActor};
use crate::state::AppState;
use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, rejection::QueryRejection, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use draftgate_core::{
    AdminSettings, ChatReply, ComplianceReport, DraftError, FallbackReason, GeneratedDraft,
    GenerationMode, GenerationOutcome, GenerationRequest, ReferenceArticle, RegeneratedParagraph,
    RequestContext, SettingsPatch,
};
use draftgate_ops::{
    AdminAuditEntry, AlertType, AuditAction, OpsAlert, OpsAlertSummary, TelemetrySnapshot,
    DEFAULT_WINDOW_MINUTES,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::future::Future;
use tokio_util::sync::CancellationToken;

const DEFAULT_LIST_LIMIT: usize = 20;
const MAX_LIST_LIMIT: usize = 100;
const MAX_WINDOW_MINUTES: u32 = 24 * 60;

// === Errors ===

#[derive(Debug)]
pub enum ApiError {
    Draft(DraftError),
    ActorRequired,
    Internal(String),
}

impl From<DraftError> for ApiError {
    fn from(err: DraftError) -> Self {
        ApiError::Draft(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        invalid(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        invalid(rejection.body_text())
    }
}

fn invalid(detail: impl Into<String>) -> ApiError {
    ApiError::Draft(DraftError::RequestInvalid {
        detail: detail.into(),
    })
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Draft(err) => {
                let status =
                    StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::BAD_GATEWAY);
                let mut body = json!({
                    "code": err.code(),
                    "message": err.message(),
                    "issues": err.issues(),
                });
                if let DraftError::ComplianceBlocked { report } = &err {
                    body["compliance"] = json!(report);
                }
                (status, body)
            }
            ApiError::ActorRequired => (
                StatusCode::UNAUTHORIZED,
                json!({
                    "code": "ADMIN_ACTOR_REQUIRED",
                    "message": "x-actor-id and x-actor-role headers are required",
                    "issues": [{
                        "code": "ADMIN_ACTOR_REQUIRED",
                        "message": "admin changes must be attributed to an actor",
                    }],
                }),
            ),
            ApiError::Internal(detail) => {
                tracing::error!(detail = %detail, "request task failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({
                        "code": "INTERNAL_ERROR",
                        "message": "internal error",
                        "issues": [{ "code": "INTERNAL_ERROR", "message": detail }],
                    }),
                )
            }
        };
        (status, Json(body)).into_response()
    }
}

/// Run model-path work on its own task. If the client disconnects, the
/// handler future is dropped and the guard cancels the context, so the
/// orchestrator sees the cancellation instead of being torn down mid-call.
async fn run_cancellable<F, Fut, T>(headers: &HeaderMap, work: F) -> Result<T, ApiError>
where
    F: FnOnce(RequestContext) -> Fut,
    Fut: Future<Output = T> + Send + 'static,
    T: Send + 'static,
{
    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();
    let mut ctx = RequestContext::new().with_cancel(cancel);
    if let Some(actor) = actor_from_headers(headers) {
        ctx = ctx.with_actor(actor);
    }
    tokio::spawn(work(ctx))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))
}

// === AI endpoints ===

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftResponse {
    #[serde(flatten)]
    pub draft: GeneratedDraft,
    pub outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<FallbackReason>,
}

impl DraftResponse {
    fn from_outcome(outcome: GenerationOutcome) -> Result<Self, ApiError> {
        let label = outcome.label();
        match outcome {
            GenerationOutcome::Success(draft) => Ok(Self {
                draft,
                outcome: label,
                fallback_reason: None,
            }),
            GenerationOutcome::FallbackRecovered { draft, reason } => Ok(Self {
                draft,
                outcome: label,
                fallback_reason: Some(reason),
            }),
            GenerationOutcome::Blocked(err) => Err(err.into()),
        }
    }
}

pub async fn generate_draft(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<GenerationRequest>, JsonRejection>,
) -> Result<Json<DraftResponse>, ApiError> {
    let Json(request) = payload?;
    let orchestrator = state.orchestrator.clone();
    let scenario = state.scenario_gateway(&headers);

    let outcome = run_cancellable(&headers, move |ctx| async move {
        match scenario {
            Some(gateway) => orchestrator.generate_with(gateway.as_ref(), &ctx, &request).await,
            None => orchestrator.generate(&ctx, &request).await,
        }
    })
    .await?;

    DraftResponse::from_outcome(outcome).map(Json)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegenerateParagraphBody {
    #[serde(default)]
    pub keyword: String,
    #[serde(default)]
    pub mode: GenerationMode,
    #[serde(default)]
    pub reference_article: Option<ReferenceArticle>,
    #[serde(default)]
    pub emotion: Option<String>,
    pub paragraphs: Vec<String>,
    pub paragraph_index: i64,
}

pub async fn regenerate_paragraph(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<RegenerateParagraphBody>, JsonRejection>,
) -> Result<Json<RegeneratedParagraph>, ApiError> {
    let Json(body) = payload?;
    let request = GenerationRequest {
        keyword: body.keyword,
        mode: body.mode,
        reference_article: body.reference_article,
        emotion: body.emotion,
    };
    let orchestrator = state.orchestrator.clone();
    let scenario = state.scenario_gateway(&headers);
    let (paragraphs, index) = (body.paragraphs, body.paragraph_index);

    let result = run_cancellable(&headers, move |ctx| async move {
        let gateway = scenario.unwrap_or_else(|| orchestrator.gateway().clone());
        orchestrator
            .regenerate_paragraph_with(gateway.as_ref(), &ctx, &request, &paragraphs, index)
            .await
    })
    .await?;

    Ok(Json(result?))
}

#[derive(Debug, Deserialize)]
pub struct ChatBody {
    pub message: String,
}

pub async fn chat(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<ChatBody>, JsonRejection>,
) -> Result<Json<ChatReply>, ApiError> {
    let Json(body) = payload?;
    let orchestrator = state.orchestrator.clone();
    let scenario = state.scenario_gateway(&headers);

    let reply = run_cancellable(&headers, move |ctx| async move {
        let gateway = scenario.unwrap_or_else(|| orchestrator.gateway().clone());
        orchestrator.chat_with(gateway.as_ref(), &ctx, &body.message).await
    })
    .await?;

    Ok(Json(reply?))
}

#[derive(Debug, Deserialize)]
pub struct ComplianceBody {
    pub content: String,
}

pub async fn compliance_check(
    State(state): State<AppState>,
    payload: Result<Json<ComplianceBody>, JsonRejection>,
) -> Result<Json<ComplianceReport>, ApiError> {
    let Json(body) = payload?;
    Ok(Json(state.orchestrator.compliance_check(&body.content)))
}

/// Always refused, whatever the body looks like.
pub async fn generate_interactive_article(State(state): State<AppState>, body: Bytes) -> ApiError {
    let payload = serde_json::from_slice::<Value>(&body)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&body).into_owned()));
    state.orchestrator.generate_interactive_spec(&payload).into()
}

// === Admin: stats & settings ===

pub async fn stats(State(state): State<AppState>) -> Json<TelemetrySnapshot> {
    Json(state.orchestrator.telemetry().snapshot())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftSettingsBody {
    pub title_max_length: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsSettingsBody {
    pub model_timeout_ms: i64,
}

pub async fn get_settings(State(state): State<AppState>) -> Json<AdminSettings> {
    Json(state.orchestrator.settings().get())
}

pub async fn update_draft_settings(
    State(state): State<AppState>,
    AdminActor(actor): AdminActor,
    payload: Result<Json<DraftSettingsBody>, JsonRejection>,
) -> Result<Json<AdminSettings>, ApiError> {
    let Json(body) = payload?;
    let applied = state.orchestrator.settings().update(SettingsPatch {
        title_max_length: Some(body.title_max_length),
        ..SettingsPatch::default()
    });
    state.audit.log(AdminAuditEntry::new(
        &actor,
        AuditAction::DraftSettingsUpdate,
        json!({ "requested": body.title_max_length, "applied": applied.title_max_length }),
    ));
    tracing::info!(actor = %actor.id, title_max_length = applied.title_max_length, "draft settings updated");
    Ok(Json(applied))
}

pub async fn update_news_settings(
    State(state): State<AppState>,
    AdminActor(actor): AdminActor,
    payload: Result<Json<NewsSettingsBody>, JsonRejection>,
) -> Result<Json<AdminSettings>, ApiError> {
    let Json(body) = payload?;
    let applied = state.orchestrator.settings().update(SettingsPatch {
        model_timeout_ms: Some(body.model_timeout_ms),
        ..SettingsPatch::default()
    });
    state.audit.log(AdminAuditEntry::new(
        &actor,
        AuditAction::NewsSettingsUpdate,
        json!({ "requested": body.model_timeout_ms, "applied": applied.model_timeout_ms }),
    ));
    tracing::info!(actor = %actor.id, model_timeout_ms = applied.model_timeout_ms, "news settings updated");
    Ok(Json(applied))
}

// === Admin: alerts & audit ===

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub limit: Option<usize>,
}

impl ListQuery {
    fn limit(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_LIST_LIMIT).clamp(1, MAX_LIST_LIMIT)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryQuery {
    pub window_minutes: Option<u32>,
}

pub async fn list_alerts(
    State(state): State<AppState>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<Value>, ApiError> {
    let Query(query) = query?;
    let alerts = state.orchestrator.alerts().recent_alerts(query.limit());
    Ok(Json(json!({ "alerts": alerts })))
}

pub async fn alert_summary(
    State(state): State<AppState>,
    query: Result<Query<SummaryQuery>, QueryRejection>,
) -> Result<Json<OpsAlertSummary>, ApiError> {
    let Query(query) = query?;
    let window = query
        .window_minutes
        .unwrap_or(DEFAULT_WINDOW_MINUTES)
        .clamp(1, MAX_WINDOW_MINUTES);
    Ok(Json(state.orchestrator.alerts().evaluate(window)))
}

#[derive(Debug, Default, Deserialize)]
pub struct AlertTestBody {
    #[serde(rename = "type", default)]
    pub alert_type: Option<String>,
}

/// Synthesize a test alert. An empty body fires a failure-rate alert.
pub async fn trigger_test_alert(
    State(state): State<AppState>,
    AdminActor(actor): AdminActor,
    body: Bytes,
) -> Result<Json<OpsAlert>, ApiError> {
    let body: AlertTestBody = if body.iter().all(u8::is_ascii_whitespace) {
        AlertTestBody::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| invalid(e.to_string()))?
    };
    let alert_type = match body.alert_type.as_deref() {
        None => AlertType::FailureRate,
        Some(raw) => AlertType::parse(raw)
            .ok_or_else(|| invalid(format!("unknown alert type '{}'", raw)))?,
    };

    let alert = state.orchestrator.alerts().trigger_test(alert_type);
    state.audit.log(AdminAuditEntry::new(
        &actor,
        AuditAction::AlertTest,
        json!({ "type": alert_type.as_str(), "alertId": alert.id }),
    ));
    Ok(Json(alert))
}

pub async fn list_audit(
    State(state): State<AppState>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<Value>, ApiError> {
    let Query(query) = query?;
    Ok(Json(json!({ "entries": state.audit.recent(query.limit()) })))
}

// === Misc ===

pub async fn health() -> (StatusCode, Json<Value>) {
    (
        StatusCode::OK,
        Json(json!({ "status": "ok", "version": env!("CARGO_PKG_VERSION") })),
    )
}

pub async fn prometheus_metrics(State(state): State<AppState>) -> Response {
    let snapshot = state.orchestrator.telemetry().snapshot();
    let summary = state.orchestrator.alerts().peek(DEFAULT_WINDOW_MINUTES);
    match metrics::render(&snapshot, &summary) {
        Ok(text) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            text,
        )
            .into_response(),
        Err(e) => ApiError::Internal(e.to_string()).into_response(),
    }
}
