use actix_web::{HttpRequest, HttpResponse, http::header::AUTHORIZATION, web};
use chrono::{Duration, Utc};
use serde::Deserialize;
use sqlx::SqlitePool;
use std::str::FromStr;
use tracing::instrument;
use utoipa::ToSchema;

use crate::{
    api::attendance::action_message,
    auth::{auth::AuthUser, auth::authenticate_bearer, policy::Operation},
    config::Config,
    error::AppError,
    model::{
        attendance::{AttendanceAction, AttendanceRecord},
        qr_code::{ActiveQr, QrCode},
        user::User,
    },
};

const DEFAULT_DESCRIPTION: &str = "Attendance QR code";

#[derive(Deserialize, ToSchema, Default)]
pub struct GenerateQr {
    #[schema(example = "Main entrance")]
    pub description: Option<String>,
    /// Hours until expiry. Omit for the configured default, `null` or `0` for none.
    #[serde(default, deserialize_with = "crate::api::explicit")]
    #[schema(value_type = Option<i64>, example = 24)]
    pub expires_hours: Option<Option<i64>>,
}

#[derive(Deserialize, ToSchema)]
pub struct ScanRequest {
    #[schema(example = "6f1c7a52-8d0e-4f5b-9b8e-2a4d1c9e7f10")]
    pub token: Option<String>,
    #[schema(example = 7)]
    pub user_id: Option<i64>,
    /// punch_in (default), punch_out, break_in / break_start, break_out / break_end
    #[schema(example = "punch_in")]
    pub action: Option<String>,
}

fn expiry(requested: Option<Option<i64>>, default_hours: i64) -> Result<Option<Duration>, AppError> {
    match requested.unwrap_or(Some(default_hours)) {
        None | Some(0) => Ok(None),
        Some(h) if h < 0 => Err(AppError::validation("expires_hours cannot be negative")),
        Some(h) => Duration::try_hours(h)
            .map(Some)
            .ok_or_else(|| AppError::validation("expires_hours out of range")),
    }
}

/* =========================
Generate (admin)
========================= */
#[utoipa::path(
    post,
    path = "/api/qr-code/generate",
    request_body(content = GenerateQr, description = "Optional settings", content_type = "application/json"),
    responses(
        (status = 201, description = "New QR code, previous ones deactivated", body = Object, example = json!({
            "message": "New QR code generated. 1 previous QR code(s) deactivated.",
            "deactivated_count": 1,
            "qr_code": {"id": 3, "token": "6f1c7a52-8d0e-4f5b-9b8e-2a4d1c9e7f10", "is_active": true}
        })),
        (status = 400, description = "Malformed body, negative or out of range expiry"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "QR Code"
)]
#[instrument(name = "generate_qr", skip_all, fields(user_id = auth.user_id))]
pub async fn generate(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    config: web::Data<Config>,
    body: web::Bytes,
) -> Result<HttpResponse, AppError> {
    auth.authorize(Operation::GenerateQr)?;

    // the body is optional, but a present one must be valid
    let payload: GenerateQr = if body.iter().all(u8::is_ascii_whitespace) {
        GenerateQr::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| AppError::validation(format!("Json deserialize error: {e}")))?
    };
    let expires_in = expiry(payload.expires_hours, config.qr_default_expiry_hours)?;
    let description = payload
        .description
        .filter(|d| !d.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string());

    let (deactivated_count, qr_code) =
        QrCode::generate(pool.get_ref(), auth.user_id, Some(description), expires_in).await?;

    Ok(HttpResponse::Created().json(serde_json::json!({
        "message": format!(
            "New QR code generated. {deactivated_count} previous QR code(s) deactivated."
        ),
        "deactivated_count": deactivated_count,
        "qr_code": qr_code
    })))
}

/// The code currently on display (admin)
#[utoipa::path(
    get,
    path = "/api/qr-code/active",
    responses(
        (status = 200, description = "Active QR code", body = Object, example = json!({
            "qr_code": {"id": 3, "is_active": true}
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "No active code", body = Object, example = json!({
            "error": "No active QR code"
        }))
    ),
    security(("bearer_auth" = [])),
    tag = "QR Code"
)]
pub async fn active(auth: AuthUser, pool: web::Data<SqlitePool>) -> Result<HttpResponse, AppError> {
    auth.authorize(Operation::ViewActiveQr)?;

    match QrCode::current(pool.get_ref(), Utc::now()).await? {
        ActiveQr::Active(qr_code) => Ok(HttpResponse::Ok().json(serde_json::json!({ "qr_code": qr_code }))),
        ActiveQr::Expired => Err(AppError::not_found("QR code expired and deactivated")),
        ActiveQr::None => Err(AppError::not_found("No active QR code")),
    }
}

/* =========================
Scan (public)
========================= */
#[utoipa::path(
    post,
    path = "/api/qr-code/scan",
    request_body = ScanRequest,
    responses(
        (status = 200, description = "Attendance updated", body = Object, example = json!({
            "message": "Punch-in recorded",
            "user": {"id": 7, "name": "Mario Rossi", "username": "mario"},
            "action": "punch_in",
            "timestamp": "2026-01-05T08:01:12Z",
            "attendance": {"id": 1, "status": "present"}
        })),
        (status = 400, description = "Missing field, invalid or expired code, unknown action"),
        (status = 404, description = "User not found"),
        (status = 409, description = "Transition not allowed", body = Object, example = json!({
            "error": "Already punched in today"
        }))
    ),
    tag = "QR Code"
)]
#[instrument(name = "scan_qr", skip_all, fields(user_id = ?payload.user_id))]
pub async fn scan(
    req: HttpRequest,
    pool: web::Data<SqlitePool>,
    config: web::Data<Config>,
    payload: web::Json<ScanRequest>,
) -> Result<HttpResponse, AppError> {
    let payload = payload.into_inner();

    let token = payload
        .token
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::validation("QR code token is required"))?;

    let user_id = payload
        .user_id
        .ok_or_else(|| AppError::validation("user_id is required"))?;

    if config.qr_scan_require_auth {
        let caller =
            authenticate_bearer(req.headers().get(AUTHORIZATION), pool.get_ref(), &config).await?;
        if caller.user_id != user_id {
            return Err(AppError::forbidden("Token does not belong to this user"));
        }
    }

    let user = User::find_by_id(pool.get_ref(), user_id)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    let qr_code = QrCode::find_active_by_token(pool.get_ref(), token)
        .await?
        .ok_or_else(|| AppError::validation("Invalid or inactive QR code"))?;

    let now = Utc::now();
    if qr_code.is_expired(now) {
        QrCode::deactivate(pool.get_ref(), qr_code.id).await?;
        tracing::info!(qr_id = qr_code.id, "Expired QR code deactivated on scan");
        return Err(AppError::validation("QR code expired"));
    }

    let action = match payload.action.as_deref() {
        None => AttendanceAction::PunchIn,
        Some(raw) => AttendanceAction::from_str(raw)
            .map_err(|_| AppError::validation("Invalid action"))?,
    };

    let record = AttendanceRecord::record_action(pool.get_ref(), user.id, action, now).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": action_message(action),
        "user": {
            "id": user.id,
            "name": user.full_name(),
            "username": user.username
        },
        "action": action.as_ref(),
        "timestamp": now,
        "attendance": record
    })))
}

/// Every code ever generated, newest first (admin)
#[utoipa::path(
    get,
    path = "/api/qr-code/history",
    responses(
        (status = 200, description = "QR code history", body = Object, example = json!({
            "qr_codes": [{"id": 3, "is_active": true, "creator_name": "Anna Bianchi"}]
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "QR Code"
)]
pub async fn history(auth: AuthUser, pool: web::Data<SqlitePool>) -> Result<HttpResponse, AppError> {
    auth.authorize(Operation::ViewQrHistory)?;

    let qr_codes = QrCode::history(pool.get_ref()).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({ "qr_codes": qr_codes })))
}

/// Retire one code (admin)
#[utoipa::path(
    post,
    path = "/api/qr-code/{qr_id}/deactivate",
    params(
        ("qr_id" = i64, Path, description = "ID of the QR code to deactivate")
    ),
    responses(
        (status = 200, description = "Deactivated", body = Object, example = json!({
            "message": "QR code deactivated"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "QR code not found"),
        (status = 409, description = "Already inactive")
    ),
    security(("bearer_auth" = [])),
    tag = "QR Code"
)]
pub async fn deactivate(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    auth.authorize(Operation::DeactivateQr)?;

    let qr_id = path.into_inner();

    if QrCode::find_by_id(pool.get_ref(), qr_id).await?.is_none() {
        return Err(AppError::not_found("QR code not found"));
    }

    if !QrCode::deactivate(pool.get_ref(), qr_id).await? {
        return Err(AppError::conflict("QR code already inactive"));
    }

    tracing::info!(qr_id, user_id = auth.user_id, "QR code deactivated");

    Ok(HttpResponse::Ok().json(serde_json::json!({ "message": "QR code deactivated" })))
}
