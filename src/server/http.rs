use super::http_auth::{extract_user_id, is_admin_authorized, USER_ID_HEADER};
use super::http_errors::{invalid_choice, map_export_error, map_text_error, validation_error};
use super::http_parse::{
    allowed, parse_advanced, parse_export_format, parse_generation_style, parse_history_kind,
    parse_length, parse_plan_tier, parse_rewrite_style,
};
use super::http_types::{
    content_disposition, AdvancedOptionsBody, AnalysisResponse, AnalyzeBody, DifferencesResponse,
    EntitlementsResponse, ExportParams, GenerateBody, GenerateResponse, HealthResponse,
    HistoryEntryResponse, HistoryParams, PlanResponse, QuotaResponse, ResetQuotaBody,
    RewriteBody, RewriteResponse, SetPlanBody,
};
use super::state::AppState;
use crate::domain::{
    analyze, ExportFormat, GenerationRequest, GenerationStyle, HistoryKind, PlanTier,
    RewriteRequest, RewriteStyle, Sentiment, TextLength,
};
use axum::{
    extract::{Path, Query, State},
    http::{header, header::HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use strum::IntoEnumIterator;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;
use uuid::Uuid;
use validator::Validate;

type JsonReply = (StatusCode, Json<serde_json::Value>);

pub fn router(state: AppState) -> Router {
    let cors = match state
        .cors_allowed_origin
        .as_deref()
        .and_then(|origin| origin.parse::<HeaderValue>().ok())
    {
        Some(origin) => CorsLayer::new()
            .allow_origin(origin)
            .allow_methods(Any)
            .allow_headers(Any),
        None => CorsLayer::new(),
    };

    Router::new()
        .route("/health", get(health_check))
        .route("/plans", get(list_plans))
        .route("/plan", get(get_plan).put(set_plan))
        .route("/quota", get(get_quota))
        .route("/quota/reset", post(reset_quota))
        .route("/rewrite", post(rewrite_text))
        .route("/generate", post(generate_text))
        .route("/analyze", post(analyze_text))
        .route("/history", get(list_history))
        .route("/history/:id/export", get(export_history_entry))
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn reply((status, body): (StatusCode, serde_json::Value)) -> JsonReply {
    (status, Json(body))
}

fn missing_user() -> JsonReply {
    (
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({
            "error": format!("Missing or invalid {} header", USER_ID_HEADER)
        })),
    )
}

fn admin_required() -> JsonReply {
    (
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({ "error": "Admin authorization required" })),
    )
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health_check,
        list_plans,
        get_plan,
        set_plan,
        get_quota,
        reset_quota,
        rewrite_text,
        generate_text,
        analyze_text,
        list_history,
        export_history_entry,
    ),
    components(
        schemas(
            HealthResponse,
            EntitlementsResponse,
            PlanResponse,
            QuotaResponse,
            SetPlanBody,
            ResetQuotaBody,
            AdvancedOptionsBody,
            RewriteBody,
            GenerateBody,
            AnalyzeBody,
            AnalysisResponse,
            DifferencesResponse,
            RewriteResponse,
            GenerateResponse,
            HistoryEntryResponse,
        )
    ),
    tags(
        (name = "Health", description = "Health check endpoints"),
        (name = "Plans", description = "Plan catalog and user plan endpoints"),
        (name = "Quota", description = "Daily quota endpoints"),
        (name = "Text", description = "Rewriting, generation and analysis"),
        (name = "History", description = "Past results and export"),
    ),
    info(
        title = "Texto Maestro API",
        version = "0.1.0",
        description = "Plan-gated text rewriting and generation",
        license(name = "MIT")
    )
)]
struct ApiDoc;

/// Health check endpoint
///
/// Verifies profile database connectivity.
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
        (status = 503, description = "Service is unhealthy", body = HealthResponse)
    )
)]
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let active_sessions = state.sessions.active_sessions().await;
    match sqlx::query("SELECT 1").fetch_one(&state.pool).await {
        Ok(_) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "healthy".to_string(),
                active_sessions,
                error: None,
            }),
        ),
        Err(e) => {
            error!(error = %e, "Health check failed: DB connectivity issue");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "unhealthy".to_string(),
                    active_sessions,
                    error: Some("Database connectivity failed".to_string()),
                }),
            )
        }
    }
}

/// Entitlements of every plan, lowest tier first.
#[utoipa::path(
    get,
    path = "/plans",
    tag = "Plans",
    responses((status = 200, description = "Plan catalog", body = [EntitlementsResponse]))
)]
async fn list_plans() -> impl IntoResponse {
    let plans: Vec<EntitlementsResponse> = PlanTier::iter()
        .map(|tier| EntitlementsResponse::new(tier, tier.entitlements()))
        .collect();
    (StatusCode::OK, Json(plans))
}

#[utoipa::path(
    get,
    path = "/plan",
    tag = "Plans",
    params(("x-user-id" = String, Header, description = "Calling user")),
    responses(
        (status = 200, description = "Current plan", body = PlanResponse),
        (status = 401, description = "Missing user header", body = Object)
    )
)]
async fn get_plan(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    let Some(user_id) = extract_user_id(&headers) else {
        return missing_user();
    };

    let session = state.sessions.session(user_id).await;
    let tier = session.tier().await;
    (
        StatusCode::OK,
        Json(serde_json::json!(PlanResponse::new(tier, session.resolution().await))),
    )
}

/// Set a user's plan (admin only)
///
/// Records the plan in the profile store and resets the user's daily quota
/// to the new plan's limits.
#[utoipa::path(
    put,
    path = "/plan",
    tag = "Plans",
    request_body = SetPlanBody,
    responses(
        (status = 200, description = "Plan changed", body = Object),
        (status = 400, description = "Invalid tier", body = Object),
        (status = 401, description = "Unauthorized", body = Object)
    )
)]
async fn set_plan(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<SetPlanBody>,
) -> impl IntoResponse {
    if !is_admin_authorized(&headers, &state.admin_token) {
        return admin_required();
    }
    if let Err(e) = req.validate() {
        return reply(validation_error(&e));
    }
    let Some(tier) = parse_plan_tier(req.tier.as_str()) else {
        return reply(invalid_choice("tier", allowed::<PlanTier>()));
    };

    let change = state.sessions.change_plan(&req.user_id, tier).await;
    info!(user_id = %req.user_id, tier = %tier, "Plan changed by admin");

    (
        StatusCode::OK,
        Json(serde_json::json!({
            "user_id": req.user_id,
            "tier": tier,
            "quota": QuotaResponse::from(change.quota),
            "profile_synced": change.profile_error.is_none(),
        })),
    )
}

#[utoipa::path(
    get,
    path = "/quota",
    tag = "Quota",
    params(("x-user-id" = String, Header, description = "Calling user")),
    responses(
        (status = 200, description = "Remaining daily quota", body = QuotaResponse),
        (status = 401, description = "Missing user header", body = Object)
    )
)]
async fn get_quota(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    let Some(user_id) = extract_user_id(&headers) else {
        return missing_user();
    };

    let session = state.sessions.session(user_id).await;
    let quota = session.quota().current_state().await;
    (StatusCode::OK, Json(serde_json::json!(QuotaResponse::from(quota))))
}

/// Reset a user's quota to today's full allowance (admin only)
#[utoipa::path(
    post,
    path = "/quota/reset",
    tag = "Quota",
    request_body = ResetQuotaBody,
    responses(
        (status = 200, description = "Quota reset", body = QuotaResponse),
        (status = 401, description = "Unauthorized", body = Object)
    )
)]
async fn reset_quota(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<ResetQuotaBody>,
) -> impl IntoResponse {
    if !is_admin_authorized(&headers, &state.admin_token) {
        return admin_required();
    }
    if let Err(e) = req.validate() {
        return reply(validation_error(&e));
    }

    let session = state.sessions.session(&req.user_id).await;
    let _actions = session.lock_actions().await;
    let quota = session.quota().reset_today().await;
    (StatusCode::OK, Json(serde_json::json!(QuotaResponse::from(quota))))
}

#[utoipa::path(
    post,
    path = "/rewrite",
    tag = "Text",
    request_body = RewriteBody,
    params(("x-user-id" = String, Header, description = "Calling user")),
    responses(
        (status = 200, description = "Rewritten text", body = RewriteResponse),
        (status = 400, description = "Invalid request", body = Object),
        (status = 401, description = "Missing user header", body = Object),
        (status = 403, description = "Not available on the user's plan", body = Object),
        (status = 502, description = "Text generation failed", body = Object)
    )
)]
async fn rewrite_text(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<RewriteBody>,
) -> impl IntoResponse {
    let Some(user_id) = extract_user_id(&headers) else {
        return missing_user();
    };
    if let Err(e) = req.validate() {
        return reply(validation_error(&e));
    }
    let Some(style) = parse_rewrite_style(req.style.as_str()) else {
        return reply(invalid_choice("style", allowed::<RewriteStyle>()));
    };
    let advanced = match parse_advanced(req.advanced) {
        Ok(a) => a,
        Err(_) => return reply(invalid_choice("sentiment", allowed::<Sentiment>())),
    };

    let session = state.sessions.session(user_id).await;
    let request = RewriteRequest {
        text: req.text,
        style,
        advanced,
    };

    match state.text.rewrite(session.as_ref(), request).await {
        Ok(outcome) => (
            StatusCode::OK,
            Json(serde_json::json!(RewriteResponse::from(outcome))),
        ),
        Err(e) => reply(map_text_error(&e, session.tier().await)),
    }
}

#[utoipa::path(
    post,
    path = "/generate",
    tag = "Text",
    request_body = GenerateBody,
    params(("x-user-id" = String, Header, description = "Calling user")),
    responses(
        (status = 200, description = "Generated text", body = GenerateResponse),
        (status = 400, description = "Invalid request", body = Object),
        (status = 401, description = "Missing user header", body = Object),
        (status = 403, description = "Not available on the user's plan", body = Object),
        (status = 502, description = "Text generation failed", body = Object)
    )
)]
async fn generate_text(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<GenerateBody>,
) -> impl IntoResponse {
    let Some(user_id) = extract_user_id(&headers) else {
        return missing_user();
    };
    if let Err(e) = req.validate() {
        return reply(validation_error(&e));
    }
    let Some(style) = parse_generation_style(req.style.as_str()) else {
        return reply(invalid_choice("style", allowed::<GenerationStyle>()));
    };
    let Some(length) = parse_length(req.length.as_str()) else {
        return reply(invalid_choice("length", allowed::<TextLength>()));
    };
    let advanced = match parse_advanced(req.advanced) {
        Ok(a) => a,
        Err(_) => return reply(invalid_choice("sentiment", allowed::<Sentiment>())),
    };

    let session = state.sessions.session(user_id).await;
    let request = GenerationRequest {
        topic: req.topic,
        style,
        length,
        advanced,
    };

    match state.text.generate(session.as_ref(), request).await {
        Ok(outcome) => (
            StatusCode::OK,
            Json(serde_json::json!(GenerateResponse::from(outcome))),
        ),
        Err(e) => reply(map_text_error(&e, session.tier().await)),
    }
}

/// Word, sentence and sentiment statistics for a text
#[utoipa::path(
    post,
    path = "/analyze",
    tag = "Text",
    request_body = AnalyzeBody,
    responses(
        (status = 200, description = "Text statistics", body = AnalysisResponse),
        (status = 400, description = "Invalid request", body = Object)
    )
)]
async fn analyze_text(Json(req): Json<AnalyzeBody>) -> impl IntoResponse {
    if let Err(e) = req.validate() {
        return reply(validation_error(&e));
    }
    (
        StatusCode::OK,
        Json(serde_json::json!(AnalysisResponse::from(analyze(&req.text)))),
    )
}

/// Past results visible under the user's plan retention, newest first
#[utoipa::path(
    get,
    path = "/history",
    tag = "History",
    params(("x-user-id" = String, Header, description = "Calling user"), HistoryParams),
    responses(
        (status = 200, description = "History entries", body = [HistoryEntryResponse]),
        (status = 400, description = "Invalid kind", body = Object),
        (status = 401, description = "Missing user header", body = Object)
    )
)]
async fn list_history(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<HistoryParams>,
) -> impl IntoResponse {
    let Some(user_id) = extract_user_id(&headers) else {
        return missing_user();
    };
    let Some(kind) = parse_history_kind(params.kind.as_str()) else {
        return reply(invalid_choice("kind", allowed::<HistoryKind>()));
    };

    let session = state.sessions.session(user_id).await;
    let entries: Vec<HistoryEntryResponse> = session
        .history(kind)
        .await
        .into_iter()
        .map(Into::into)
        .collect();
    (StatusCode::OK, Json(serde_json::json!(entries)))
}

/// Download one history entry in a plan-permitted format
#[utoipa::path(
    get,
    path = "/history/{id}/export",
    tag = "History",
    params(
        ("id" = Uuid, Path, description = "History entry ID"),
        ("x-user-id" = String, Header, description = "Calling user"),
        ExportParams
    ),
    responses(
        (status = 200, description = "Exported document", body = String, content_type = "text/plain"),
        (status = 400, description = "Invalid format", body = Object),
        (status = 403, description = "Format not available on the user's plan", body = Object),
        (status = 404, description = "Entry not found", body = Object)
    )
)]
async fn export_history_entry(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Query(params): Query<ExportParams>,
) -> Response {
    let Some(user_id) = extract_user_id(&headers) else {
        return missing_user().into_response();
    };
    let Some(format) = parse_export_format(params.format.as_str()) else {
        return reply(invalid_choice("format", allowed::<ExportFormat>())).into_response();
    };

    let session = state.sessions.session(user_id).await;
    match session.export(id, format).await {
        Ok(doc) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, doc.content_type.to_string()),
                (header::CONTENT_DISPOSITION, content_disposition(&doc)),
            ],
            doc.body,
        )
            .into_response(),
        Err(e) => {
            warn!(user_id = %user_id, entry_id = %id, error = %e, "Export refused");
            reply(map_export_error(&e, session.tier().await)).into_response()
        }
    }
}
