use actix_web::{HttpResponse, web};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use sqlx::SqlitePool;
use tracing::instrument;
use utoipa::IntoParams;

use crate::{
    auth::{auth::AuthUser, policy::Operation},
    error::AppError,
    model::attendance::{AttendanceAction, AttendanceRecord},
};

#[derive(Deserialize, IntoParams)]
pub struct DateRange {
    /// Inclusive lower bound
    #[param(example = "2026-01-01")]
    pub start_date: Option<NaiveDate>,
    /// Inclusive upper bound
    #[param(example = "2026-01-31")]
    pub end_date: Option<NaiveDate>,
}

#[derive(Deserialize, IntoParams)]
pub struct AttendanceFilter {
    /// Restrict to one user
    pub user_id: Option<i64>,
    #[param(example = "2026-01-01")]
    pub start_date: Option<NaiveDate>,
    #[param(example = "2026-01-31")]
    pub end_date: Option<NaiveDate>,
}

pub(crate) fn action_message(action: AttendanceAction) -> &'static str {
    match action {
        AttendanceAction::PunchIn => "Punch-in recorded",
        AttendanceAction::PunchOut => "Punch-out recorded",
        AttendanceAction::BreakIn => "Break started",
        AttendanceAction::BreakOut => "Break ended",
    }
}

async fn punch(
    auth: &AuthUser,
    pool: &SqlitePool,
    action: AttendanceAction,
) -> Result<HttpResponse, AppError> {
    let record = AttendanceRecord::record_action(pool, auth.user_id, action, Utc::now()).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": action_message(action),
        "attendance": record
    })))
}

/* =========================
Punch in
========================= */
#[utoipa::path(
    post,
    path = "/api/attendance/punch-in",
    responses(
        (status = 200, description = "Punch-in recorded", body = Object, example = json!({
            "message": "Punch-in recorded",
            "attendance": {"id": 1, "user_id": 7, "date": "2026-01-05", "status": "present"}
        })),
        (status = 401, description = "Unauthorized"),
        (status = 409, description = "Already punched in today", body = Object, example = json!({
            "error": "Already punched in today"
        }))
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
#[instrument(name = "punch_in", skip_all, fields(user_id = auth.user_id))]
pub async fn punch_in(auth: AuthUser, pool: web::Data<SqlitePool>) -> Result<HttpResponse, AppError> {
    punch(&auth, pool.get_ref(), AttendanceAction::PunchIn).await
}

/* =========================
Punch out
========================= */
#[utoipa::path(
    post,
    path = "/api/attendance/punch-out",
    responses(
        (status = 200, description = "Punch-out recorded", body = Object, example = json!({
            "message": "Punch-out recorded",
            "attendance": {"id": 1, "user_id": 7, "date": "2026-01-05", "status": "absent"}
        })),
        (status = 401, description = "Unauthorized"),
        (status = 409, description = "Not punched in, or already punched out", body = Object, example = json!({
            "error": "You must punch in first"
        }))
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
#[instrument(name = "punch_out", skip_all, fields(user_id = auth.user_id))]
pub async fn punch_out(auth: AuthUser, pool: web::Data<SqlitePool>) -> Result<HttpResponse, AppError> {
    punch(&auth, pool.get_ref(), AttendanceAction::PunchOut).await
}

/* =========================
Break start / end
========================= */
#[utoipa::path(
    post,
    path = "/api/attendance/break-start",
    responses(
        (status = 200, description = "Break started", body = Object, example = json!({
            "message": "Break started",
            "attendance": {"id": 1, "user_id": 7, "date": "2026-01-05", "status": "on_break"}
        })),
        (status = 401, description = "Unauthorized"),
        (status = 409, description = "Not punched in, or already on break", body = Object, example = json!({
            "error": "Already on break"
        }))
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
#[instrument(name = "break_start", skip_all, fields(user_id = auth.user_id))]
pub async fn break_start(auth: AuthUser, pool: web::Data<SqlitePool>) -> Result<HttpResponse, AppError> {
    punch(&auth, pool.get_ref(), AttendanceAction::BreakIn).await
}

#[utoipa::path(
    post,
    path = "/api/attendance/break-end",
    responses(
        (status = 200, description = "Break ended", body = Object, example = json!({
            "message": "Break ended",
            "attendance": {"id": 1, "user_id": 7, "date": "2026-01-05", "status": "present"}
        })),
        (status = 401, description = "Unauthorized"),
        (status = 409, description = "Not on break", body = Object, example = json!({
            "error": "Not on break"
        }))
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
#[instrument(name = "break_end", skip_all, fields(user_id = auth.user_id))]
pub async fn break_end(auth: AuthUser, pool: web::Data<SqlitePool>) -> Result<HttpResponse, AppError> {
    punch(&auth, pool.get_ref(), AttendanceAction::BreakOut).await
}

/// Own attendance, newest first
#[utoipa::path(
    get,
    path = "/api/attendance/my-attendance",
    params(DateRange),
    responses(
        (status = 200, description = "Own attendance records", body = Object, example = json!({
            "attendances": [{"id": 1, "user_id": 7, "date": "2026-01-05", "status": "absent"}]
        })),
        (status = 400, description = "Bad date"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn my_attendance(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    query: web::Query<DateRange>,
) -> Result<HttpResponse, AppError> {
    let records =
        AttendanceRecord::list(pool.get_ref(), Some(auth.user_id), query.start_date, query.end_date)
            .await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({ "attendances": records })))
}

/// Today's state for the caller
#[utoipa::path(
    get,
    path = "/api/attendance/today-status",
    responses(
        (status = 200, description = "Status of today's record", body = Object, example = json!({
            "status": "not_started",
            "attendance": null
        })),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn today_status(auth: AuthUser, pool: web::Data<SqlitePool>) -> Result<HttpResponse, AppError> {
    let today = Utc::now().date_naive();

    let body = match AttendanceRecord::find_for_day(pool.get_ref(), auth.user_id, today).await? {
        Some(record) => serde_json::json!({ "status": record.status, "attendance": record }),
        None => serde_json::json!({ "status": "not_started", "attendance": null }),
    };

    Ok(HttpResponse::Ok().json(body))
}

/// Everyone's attendance (manager/admin)
#[utoipa::path(
    get,
    path = "/api/attendance/all",
    params(AttendanceFilter),
    responses(
        (status = 200, description = "Attendance records", body = Object, example = json!({
            "attendances": [{"id": 1, "user_id": 7, "date": "2026-01-05", "status": "present"}]
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn all_attendance(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    query: web::Query<AttendanceFilter>,
) -> Result<HttpResponse, AppError> {
    auth.authorize(Operation::ViewAllAttendance)?;

    let records =
        AttendanceRecord::list(pool.get_ref(), query.user_id, query.start_date, query.end_date)
            .await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({ "attendances": records })))
}
