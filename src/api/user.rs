use actix_web::{HttpResponse, web};
use serde::Deserialize;
use sqlx::SqlitePool;
use tracing::instrument;
use utoipa::ToSchema;

use crate::{
    auth::{auth::AuthUser, handlers::hash_or_storage, policy::Operation},
    error::{AppError, is_unique_violation},
    model::{
        role::Role,
        user::{User, UserChanges},
    },
    utils::UsernameIndex,
};

#[derive(Deserialize, ToSchema)]
pub struct UpdateUser {
    #[schema(example = "Mario")]
    pub first_name: Option<String>,
    #[schema(example = "Rossi")]
    pub last_name: Option<String>,
    #[schema(example = "mario.rossi@example.com")]
    pub email: Option<String>,
    pub password: Option<String>,
    /// Admin only
    #[schema(example = "manager")]
    pub role: Option<String>,
    /// Admin only
    pub is_active: Option<bool>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// All users (admin)
#[utoipa::path(
    get,
    path = "/api/users",
    responses(
        (status = 200, description = "Registered users", body = Object, example = json!({
            "users": [{"id": 1, "username": "mario", "role": "employee"}]
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn list_users(auth: AuthUser, pool: web::Data<SqlitePool>) -> Result<HttpResponse, AppError> {
    auth.authorize(Operation::ListUsers)?;

    let users = User::list(pool.get_ref()).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({ "users": users })))
}

/// The caller's own profile
#[utoipa::path(
    get,
    path = "/api/users/profile",
    responses(
        (status = 200, description = "Own profile", body = Object, example = json!({
            "user": {"id": 1, "username": "mario", "role": "employee"}
        })),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn profile(auth: AuthUser, pool: web::Data<SqlitePool>) -> Result<HttpResponse, AppError> {
    let user = User::find_by_id(pool.get_ref(), auth.user_id)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    Ok(HttpResponse::Ok().json(serde_json::json!({ "user": user })))
}

#[utoipa::path(
    get,
    path = "/api/users/{user_id}",
    params(
        ("user_id" = i64, Path, description = "ID of the user to fetch")
    ),
    responses(
        (status = 200, description = "User found", body = Object, example = json!({
            "user": {"id": 7, "username": "mario", "role": "employee"}
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn get_user(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let user_id = path.into_inner();
    auth.authorize_self_or(user_id, Operation::ViewOtherUser)?;

    let user = User::find_by_id(pool.get_ref(), user_id)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    Ok(HttpResponse::Ok().json(serde_json::json!({ "user": user })))
}

/* =========================
Update user (self or admin)
========================= */
#[utoipa::path(
    put,
    path = "/api/users/{user_id}",
    params(
        ("user_id" = i64, Path, description = "ID of the user to update")
    ),
    request_body = UpdateUser,
    responses(
        (status = 200, description = "User updated", body = Object, example = json!({
            "message": "User updated",
            "user": {"id": 7, "username": "mario", "role": "manager"}
        })),
        (status = 400, description = "Invalid role"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "User not found"),
        (status = 409, description = "Email already in use")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
#[instrument(name = "update_user", skip_all, fields(user_id = auth.user_id))]
pub async fn update_user(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
    payload: web::Json<UpdateUser>,
) -> Result<HttpResponse, AppError> {
    let user_id = path.into_inner();
    auth.authorize_self_or(user_id, Operation::UpdateOtherUser)?;

    let payload = payload.into_inner();

    if User::find_by_id(pool.get_ref(), user_id).await?.is_none() {
        return Err(AppError::not_found("User not found"));
    }

    let email = non_empty(payload.email);
    if let Some(email) = email.as_deref() {
        if let Some(other) = User::find_by_email(pool.get_ref(), email).await? {
            if other.id != user_id {
                return Err(AppError::conflict("Email already in use"));
            }
        }
    }

    // role and is_active are silently ignored for non-admins
    let (role, is_active) = if auth.can(Operation::ChangeRoleOrStatus) {
        let role = payload
            .role
            .as_deref()
            .map(|r| {
                r.parse::<Role>().map_err(|_| {
                    AppError::validation("Invalid role. Allowed: employee, manager, admin")
                })
            })
            .transpose()?;
        (role, payload.is_active)
    } else {
        (None, None)
    };

    let password_hash = match payload.password.as_deref().filter(|p| !p.is_empty()) {
        Some(p) => Some(hash_or_storage(p)?),
        None => None,
    };

    let user = User::update(
        pool.get_ref(),
        user_id,
        UserChanges {
            first_name: non_empty(payload.first_name),
            last_name: non_empty(payload.last_name),
            email,
            password_hash,
            role,
            is_active,
        },
    )
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::conflict("Email already in use")
        } else {
            AppError::from(e)
        }
    })?
    .ok_or_else(|| AppError::not_found("User not found"))?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "User updated",
        "user": user
    })))
}

/* =========================
Delete user (admin)
========================= */
#[utoipa::path(
    delete,
    path = "/api/users/{user_id}",
    params(
        ("user_id" = i64, Path, description = "ID of the user to delete")
    ),
    responses(
        (status = 200, description = "User deleted", body = Object, example = json!({
            "message": "User deleted"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden, or deleting yourself"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
#[instrument(name = "delete_user", skip_all, fields(user_id = auth.user_id))]
pub async fn delete_user(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    index: web::Data<UsernameIndex>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    auth.authorize(Operation::DeleteUser)?;

    let user_id = path.into_inner();
    if user_id == auth.user_id {
        return Err(AppError::forbidden("You cannot delete your own account"));
    }

    let user = User::find_by_id(pool.get_ref(), user_id)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    if !User::delete(pool.get_ref(), user_id).await? {
        return Err(AppError::not_found("User not found"));
    }

    index.forget(&user.username).await;

    tracing::info!(deleted_user_id = user_id, "User deleted");

    Ok(HttpResponse::Ok().json(serde_json::json!({ "message": "User deleted" })))
}
