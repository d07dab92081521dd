use actix_web::{HttpResponse, web};
use chrono::NaiveDate;
use serde::Deserialize;
use sqlx::SqlitePool;
use tracing::instrument;
use utoipa::{IntoParams, ToSchema};

use crate::{
    auth::{auth::AuthUser, policy::Operation},
    error::AppError,
    model::leave_request::{
        Decision, LeaveChanges, LeaveRequest, LeaveStatus, NewLeaveRequest, parse_leave_type,
        validate_range,
    },
};

#[derive(Deserialize, ToSchema)]
pub struct CreateLeave {
    #[schema(example = "2026-01-05", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2026-01-09", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    /// holiday, permission or sick_leave
    #[schema(example = "holiday")]
    pub leave_type: String,
    #[schema(example = "Family trip")]
    pub reason: Option<String>,
    pub attachment_path: Option<String>,
}

/// Fields left out keep their current value.
#[derive(Deserialize, ToSchema)]
pub struct UpdateLeave {
    #[schema(example = "2026-01-06", format = "date", value_type = Option<String>)]
    pub start_date: Option<NaiveDate>,
    #[schema(example = "2026-01-09", format = "date", value_type = Option<String>)]
    pub end_date: Option<NaiveDate>,
    #[schema(example = "permission")]
    pub leave_type: Option<String>,
    /// `null` clears it
    #[serde(default, deserialize_with = "crate::api::explicit")]
    #[schema(value_type = Option<String>)]
    pub reason: Option<Option<String>>,
    /// `null` clears it
    #[serde(default, deserialize_with = "crate::api::explicit")]
    #[schema(value_type = Option<String>)]
    pub attachment_path: Option<Option<String>>,
}

#[derive(Deserialize, IntoParams)]
pub struct StatusFilter {
    /// pending, approved or rejected
    #[param(example = "pending")]
    pub status: Option<String>,
}

#[derive(Deserialize, IntoParams)]
pub struct LeaveFilter {
    /// pending, approved or rejected
    #[param(example = "pending")]
    pub status: Option<String>,
    /// Restrict to one requester
    pub user_id: Option<i64>,
}

fn parse_status(raw: Option<&str>) -> Result<Option<LeaveStatus>, AppError> {
    raw.map(|s| {
        s.parse::<LeaveStatus>().map_err(|_| {
            AppError::validation("Invalid status. Allowed: pending, approved, rejected")
        })
    })
    .transpose()
}

/* =========================
Create leave request
========================= */
#[utoipa::path(
    post,
    path = "/api/leave-requests",
    request_body(
        content = CreateLeave,
        description = "Leave request payload",
        content_type = "application/json"
    ),
    responses(
        (status = 201, description = "Leave request submitted", body = Object, example = json!({
            "message": "Leave request created",
            "leave_request": {"id": 1, "status": "pending", "leave_type": "holiday"}
        })),
        (status = 400, description = "Bad dates or leave type"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
#[instrument(name = "create_leave", skip_all, fields(user_id = auth.user_id))]
pub async fn create_leave(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    payload: web::Json<CreateLeave>,
) -> Result<HttpResponse, AppError> {
    let payload = payload.into_inner();

    // 1️⃣ validate leave type
    let leave_type = parse_leave_type(&payload.leave_type)?;

    // 2️⃣ validate dates
    validate_range(payload.start_date, payload.end_date)?;

    // 3️⃣ insert request
    let leave = LeaveRequest::insert(
        pool.get_ref(),
        NewLeaveRequest {
            user_id: auth.user_id,
            start_date: payload.start_date,
            end_date: payload.end_date,
            leave_type,
            reason: payload.reason,
            attachment_path: payload.attachment_path,
        },
    )
    .await
    .map_err(|e| {
        tracing::error!(error = %e, user_id = auth.user_id, "Failed to create leave request");
        AppError::from(e)
    })?;

    Ok(HttpResponse::Created().json(serde_json::json!({
        "message": "Leave request created",
        "leave_request": leave
    })))
}

/// Caller's own requests, newest first
#[utoipa::path(
    get,
    path = "/api/leave-requests/my-requests",
    params(StatusFilter),
    responses(
        (status = 200, description = "Own leave requests", body = Object, example = json!({
            "leave_requests": [{"id": 1, "status": "pending"}]
        })),
        (status = 400, description = "Invalid status"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn my_requests(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    query: web::Query<StatusFilter>,
) -> Result<HttpResponse, AppError> {
    let status = parse_status(query.status.as_deref())?;
    let requests = LeaveRequest::list(pool.get_ref(), Some(auth.user_id), status).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({ "leave_requests": requests })))
}

/// Approval queue, oldest first (manager/admin)
#[utoipa::path(
    get,
    path = "/api/leave-requests/pending",
    responses(
        (status = 200, description = "Pending leave requests", body = Object, example = json!({
            "leave_requests": [{"id": 1, "status": "pending"}]
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn pending_requests(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
) -> Result<HttpResponse, AppError> {
    auth.authorize(Operation::ViewPendingLeave)?;

    let requests = LeaveRequest::pending(pool.get_ref()).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({ "leave_requests": requests })))
}

/// Every request (manager/admin)
#[utoipa::path(
    get,
    path = "/api/leave-requests/all",
    params(LeaveFilter),
    responses(
        (status = 200, description = "Leave requests", body = Object, example = json!({
            "leave_requests": [{"id": 1, "status": "approved"}]
        })),
        (status = 400, description = "Invalid status"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn all_requests(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    query: web::Query<LeaveFilter>,
) -> Result<HttpResponse, AppError> {
    auth.authorize(Operation::ViewAllLeave)?;

    let status = parse_status(query.status.as_deref())?;
    let requests = LeaveRequest::list(pool.get_ref(), query.user_id, status).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({ "leave_requests": requests })))
}

/* =========================
Edit a pending request (owner)
========================= */
#[utoipa::path(
    put,
    path = "/api/leave-requests/{leave_id}",
    params(
        ("leave_id" = i64, Path, description = "ID of the leave request to edit")
    ),
    request_body = UpdateLeave,
    responses(
        (status = 200, description = "Leave request updated", body = Object, example = json!({
            "message": "Leave request updated",
            "leave_request": {"id": 1, "status": "pending"}
        })),
        (status = 400, description = "Bad dates or leave type"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Leave request not found"),
        (status = 409, description = "Already processed")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn update_leave(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
    payload: web::Json<UpdateLeave>,
) -> Result<HttpResponse, AppError> {
    let leave_id = path.into_inner();
    let payload = payload.into_inner();

    let leave_type = payload
        .leave_type
        .as_deref()
        .map(parse_leave_type)
        .transpose()?;

    let leave = LeaveRequest::update_pending(
        pool.get_ref(),
        leave_id,
        auth.user_id,
        LeaveChanges {
            start_date: payload.start_date,
            end_date: payload.end_date,
            leave_type,
            reason: payload.reason,
            attachment_path: payload.attachment_path,
        },
    )
    .await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Leave request updated",
        "leave_request": leave
    })))
}

async fn decide(
    auth: &AuthUser,
    pool: &SqlitePool,
    leave_id: i64,
    decision: Decision,
) -> Result<LeaveRequest, AppError> {
    auth.authorize(Operation::DecideLeave)?;
    LeaveRequest::decide(pool, leave_id, auth.user_id, decision).await
}

/* =========================
Approve leave (manager/admin)
========================= */
#[utoipa::path(
    post,
    path = "/api/leave-requests/{leave_id}/approve",
    params(
        ("leave_id" = i64, Path, description = "ID of the leave request to approve")
    ),
    responses(
        (status = 200, description = "Leave approved", body = Object, example = json!({
            "message": "Leave request approved",
            "leave_request": {"id": 1, "status": "approved", "approver_id": 2}
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Leave request not found"),
        (status = 409, description = "Already decided", body = Object, example = json!({
            "error": "Leave request already approved"
        }))
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
#[instrument(name = "approve_leave", skip_all, fields(user_id = auth.user_id))]
pub async fn approve_leave(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let leave = decide(&auth, pool.get_ref(), path.into_inner(), Decision::Approve).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Leave request approved",
        "leave_request": leave
    })))
}

/* =========================
Reject leave (manager/admin)
========================= */
#[utoipa::path(
    post,
    path = "/api/leave-requests/{leave_id}/reject",
    params(
        ("leave_id" = i64, Path, description = "ID of the leave request to reject")
    ),
    responses(
        (status = 200, description = "Leave rejected", body = Object, example = json!({
            "message": "Leave request rejected",
            "leave_request": {"id": 1, "status": "rejected", "approver_id": 2}
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Leave request not found"),
        (status = 409, description = "Already decided")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
#[instrument(name = "reject_leave", skip_all, fields(user_id = auth.user_id))]
pub async fn reject_leave(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let leave = decide(&auth, pool.get_ref(), path.into_inner(), Decision::Reject).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Leave request rejected",
        "leave_request": leave
    })))
}
