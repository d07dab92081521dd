use actix_web::{HttpResponse, web};
use serde_json::json;
use sqlx::SqlitePool;
use tracing::{debug, info, instrument};

use crate::{
    auth::{
        jwt::generate_token,
        password::{hash_password, verify_password},
    },
    config::Config,
    error::{AppError, is_unique_violation},
    model::{
        role::Role,
        user::{NewUser, User},
    },
    models::{LoginRequest, LoginResponse, RegisterRequest},
    utils::UsernameIndex,
};

fn required<'a>(field: &str, value: &'a str) -> Result<&'a str, AppError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::validation(format!("{field} is required")));
    }
    Ok(value)
}

/// Hashing only fails on broken parameters, never on user input.
pub(crate) fn hash_or_storage(password: &str) -> Result<String, AppError> {
    hash_password(password).map_err(|e| {
        tracing::error!(error = %e, "Password hashing failed");
        AppError::Storage(e.to_string())
    })
}

/* =========================
Register
========================= */
#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User created", body = Object,
         example = json!({
            "message": "User registered successfully",
            "user": {"id": 1, "username": "mario", "role": "employee", "is_active": true}
         })
        ),
        (status = 400, description = "Missing field"),
        (status = 409, description = "Username or email already taken")
    ),
    tag = "Auth"
)]
#[instrument(name = "auth_register", skip(pool, index, payload), fields(username = %payload.username))]
pub async fn register(
    payload: web::Json<RegisterRequest>,
    pool: web::Data<SqlitePool>,
    index: web::Data<UsernameIndex>,
) -> Result<HttpResponse, AppError> {
    let username = required("username", &payload.username)?;
    // passwords are taken verbatim
    if payload.password.is_empty() {
        return Err(AppError::validation("password is required"));
    }
    let email = required("email", &payload.email)?;
    let first_name = required("first_name", &payload.first_name)?;
    let last_name = required("last_name", &payload.last_name)?;

    if !index.is_available(username, pool.get_ref()).await? {
        info!("Username already taken");
        return Err(AppError::conflict("Username already exists"));
    }

    if User::find_by_email(pool.get_ref(), email).await?.is_some() {
        return Err(AppError::conflict("Email already exists"));
    }

    let password_hash = hash_or_storage(&payload.password)?;

    let user = User::insert(
        pool.get_ref(),
        NewUser {
            username,
            email,
            password_hash: &password_hash,
            first_name,
            last_name,
            role: Role::Employee,
        },
    )
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::conflict("Username or email already exists")
        } else {
            AppError::from(e)
        }
    })?;

    index.remember(&user.username).await;

    info!(user_id = user.id, "User registered");

    Ok(HttpResponse::Created().json(json!({
        "message": "User registered successfully",
        "user": user
    })))
}

/* =========================
Login
========================= */
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Signed session token", body = LoginResponse),
        (status = 400, description = "Missing username or password"),
        (status = 401, description = "Invalid credentials or disabled account")
    ),
    tag = "Auth"
)]
#[instrument(
    name = "auth_login",
    skip(pool, config, user),
    fields(username = %user.username)
)]
pub async fn login(
    user: web::Json<LoginRequest>,
    pool: web::Data<SqlitePool>,
    config: web::Data<Config>,
) -> Result<HttpResponse, AppError> {
    info!("Login request received");

    // 1️⃣ Basic validation
    if user.username.trim().is_empty() || user.password.is_empty() {
        info!("Validation failed: empty username or password");
        return Err(AppError::validation("Username and password are required"));
    }

    // 2️⃣ Fetch user
    debug!("Fetching user from database");

    let db_user = match User::find_by_username(pool.get_ref(), user.username.trim()).await? {
        Some(u) => {
            debug!(user_id = u.id, "User found");
            u
        }
        None => {
            info!("Invalid credentials: user not found");
            return Err(AppError::auth("Invalid credentials"));
        }
    };

    // 3️⃣ Verify password
    if let Err(e) = verify_password(&user.password, &db_user.password_hash) {
        info!(error = %e, "Invalid credentials: password mismatch");
        return Err(AppError::auth("Invalid credentials"));
    }

    // 4️⃣ Active account only
    if !db_user.is_active {
        info!(user_id = db_user.id, "Login refused: account disabled");
        return Err(AppError::auth("Account is disabled"));
    }

    // 5️⃣ Generate token
    let token = generate_token(&db_user, &config.jwt_secret, config.token_ttl).map_err(|e| {
        tracing::error!(error = %e, "Failed to sign token");
        AppError::Storage(e.to_string())
    })?;

    // 6️⃣ Update last_login_at (non-fatal)
    if let Err(e) = User::touch_last_login(pool.get_ref(), db_user.id).await {
        tracing::error!(error = %e, "Failed to update last_login_at");
    }

    info!(user_id = db_user.id, "Login successful");

    Ok(HttpResponse::Ok().json(LoginResponse {
        token,
        user: db_user,
    }))
}
