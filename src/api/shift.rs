use actix_web::{HttpResponse, web};
use chrono::{NaiveDate, NaiveDateTime};
use serde::Deserialize;
use sqlx::SqlitePool;
use utoipa::{IntoParams, ToSchema};

use crate::{
    api::attendance::DateRange,
    auth::{auth::AuthUser, policy::Operation},
    error::AppError,
    model::{
        shift::{NewShift, Shift, ShiftChanges, validate_times},
        user::User,
    },
};

#[derive(Deserialize, ToSchema)]
pub struct CreateShift {
    #[schema(example = 7)]
    pub user_id: i64,
    #[schema(example = "2026-02-10", format = "date", value_type = String)]
    pub date: NaiveDate,
    #[schema(example = "2026-02-10T09:00:00", value_type = String)]
    pub start_time: NaiveDateTime,
    #[schema(example = "2026-02-10T17:00:00", value_type = String)]
    pub end_time: NaiveDateTime,
    #[schema(example = "Front desk")]
    pub description: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateShift {
    #[schema(example = "2026-02-11", format = "date", value_type = Option<String>)]
    pub date: Option<NaiveDate>,
    #[schema(example = "2026-02-11T08:00:00", value_type = Option<String>)]
    pub start_time: Option<NaiveDateTime>,
    #[schema(example = "2026-02-11T16:00:00", value_type = Option<String>)]
    pub end_time: Option<NaiveDateTime>,
    pub description: Option<String>,
}

#[derive(Deserialize, IntoParams)]
pub struct ShiftFilter {
    /// Restrict to one user
    pub user_id: Option<i64>,
    #[param(example = "2026-02-01")]
    pub start_date: Option<NaiveDate>,
    #[param(example = "2026-02-28")]
    pub end_date: Option<NaiveDate>,
}

/// Own shifts, earliest first
#[utoipa::path(
    get,
    path = "/api/shifts/my-shifts",
    params(DateRange),
    responses(
        (status = 200, description = "Own shifts", body = Object, example = json!({
            "shifts": [{"id": 1, "user_id": 7, "date": "2026-02-10"}]
        })),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Shifts"
)]
pub async fn my_shifts(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    query: web::Query<DateRange>,
) -> Result<HttpResponse, AppError> {
    let shifts = Shift::list(pool.get_ref(), Some(auth.user_id), query.start_date, query.end_date).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({ "shifts": shifts })))
}

#[utoipa::path(
    get,
    path = "/api/shifts/all",
    params(ShiftFilter),
    responses(
        (status = 200, description = "Shifts", body = Object, example = json!({
            "shifts": [{"id": 1, "user_id": 7, "date": "2026-02-10"}]
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Shifts"
)]
pub async fn all_shifts(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    query: web::Query<ShiftFilter>,
) -> Result<HttpResponse, AppError> {
    auth.authorize(Operation::ViewAllShifts)?;

    let shifts = Shift::list(pool.get_ref(), query.user_id, query.start_date, query.end_date).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({ "shifts": shifts })))
}

/* =========================
Create shift (manager/admin)
========================= */
#[utoipa::path(
    post,
    path = "/api/shifts",
    request_body = CreateShift,
    responses(
        (status = 201, description = "Shift created", body = Object, example = json!({
            "message": "Shift created",
            "shift": {"id": 1, "user_id": 7, "date": "2026-02-10"}
        })),
        (status = 400, description = "start_time not before end_time"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Shifts"
)]
pub async fn create_shift(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    payload: web::Json<CreateShift>,
) -> Result<HttpResponse, AppError> {
    auth.authorize(Operation::ManageShifts)?;

    let payload = payload.into_inner();
    validate_times(payload.start_time, payload.end_time)?;

    if User::find_by_id(pool.get_ref(), payload.user_id).await?.is_none() {
        return Err(AppError::not_found("User not found"));
    }

    let shift = Shift::insert(
        pool.get_ref(),
        NewShift {
            user_id: payload.user_id,
            date: payload.date,
            start_time: payload.start_time,
            end_time: payload.end_time,
            description: payload.description,
        },
    )
    .await?;

    Ok(HttpResponse::Created().json(serde_json::json!({
        "message": "Shift created",
        "shift": shift
    })))
}

#[utoipa::path(
    put,
    path = "/api/shifts/{shift_id}",
    params(
        ("shift_id" = i64, Path, description = "ID of the shift to update")
    ),
    request_body = UpdateShift,
    responses(
        (status = 200, description = "Shift updated", body = Object, example = json!({
            "message": "Shift updated",
            "shift": {"id": 1, "user_id": 7, "date": "2026-02-11"}
        })),
        (status = 400, description = "start_time not before end_time"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Shift not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Shifts"
)]
pub async fn update_shift(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
    payload: web::Json<UpdateShift>,
) -> Result<HttpResponse, AppError> {
    auth.authorize(Operation::ManageShifts)?;

    let shift_id = path.into_inner();
    let payload = payload.into_inner();

    let current = Shift::find_by_id(pool.get_ref(), shift_id)
        .await?
        .ok_or_else(|| AppError::not_found("Shift not found"))?;

    validate_times(
        payload.start_time.unwrap_or(current.start_time),
        payload.end_time.unwrap_or(current.end_time),
    )?;

    let shift = Shift::update(
        pool.get_ref(),
        shift_id,
        ShiftChanges {
            date: payload.date,
            start_time: payload.start_time,
            end_time: payload.end_time,
            description: payload.description,
        },
    )
    .await?
    .ok_or_else(|| AppError::not_found("Shift not found"))?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Shift updated",
        "shift": shift
    })))
}

#[utoipa::path(
    delete,
    path = "/api/shifts/{shift_id}",
    params(
        ("shift_id" = i64, Path, description = "ID of the shift to delete")
    ),
    responses(
        (status = 200, description = "Shift deleted", body = Object, example = json!({
            "message": "Shift deleted"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Shift not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Shifts"
)]
pub async fn delete_shift(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    auth.authorize(Operation::ManageShifts)?;

    if !Shift::delete(pool.get_ref(), path.into_inner()).await? {
        return Err(AppError::not_found("Shift not found"));
    }

    Ok(HttpResponse::Ok().json(serde_json::json!({ "message": "Shift deleted" })))
}
