use actix_web::{FromRequest, HttpMessage, HttpRequest, dev::Payload, http::header::HeaderValue};
use futures::future::{Ready, ready};
use sqlx::SqlitePool;

use crate::{
    auth::{
        jwt::verify_token,
        policy::{Operation, allows},
    },
    config::Config,
    error::AppError,
    model::{role::Role, user::User},
};

/// The caller behind a verified bearer token, re-checked against the users table.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: i64,
    pub username: String,
    pub role: Role,
}

impl FromRequest for AuthUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    // populated by auth_middleware
    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<AuthUser>()
                .cloned()
                .ok_or_else(|| AppError::auth("Missing Authorization header")),
        )
    }
}

impl AuthUser {
    pub fn can(&self, op: Operation) -> bool {
        allows(self.role, op)
    }

    pub fn authorize(&self, op: Operation) -> Result<(), AppError> {
        if self.can(op) {
            Ok(())
        } else {
            tracing::info!(user_id = self.user_id, role = %self.role, ?op, "Access denied");
            Err(AppError::forbidden("Insufficient permissions"))
        }
    }

    /// Own data is always reachable; anything else needs `op`.
    pub fn authorize_self_or(&self, target_user_id: i64, op: Operation) -> Result<(), AppError> {
        if self.user_id == target_user_id {
            return Ok(());
        }
        self.authorize(op)
    }
}

/// Decodes an `Authorization: Bearer` header and loads the user it names.
/// Fails for missing, malformed or expired tokens and for deleted or
/// deactivated accounts.
pub async fn authenticate_bearer(
    header: Option<&HeaderValue>,
    pool: &SqlitePool,
    config: &Config,
) -> Result<AuthUser, AppError> {
    let header = header.ok_or_else(|| AppError::auth("Missing Authorization header"))?;

    let value = header
        .to_str()
        .map_err(|_| AppError::auth("Invalid Authorization header encoding"))?;

    let token = value
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::auth("Authorization header must start with Bearer"))?;

    let claims = verify_token(token, &config.jwt_secret).map_err(|e| {
        tracing::debug!(error = %e, "Token rejected");
        AppError::auth("Invalid or expired token")
    })?;

    let user = User::find_by_id(pool, claims.user_id)
        .await?
        .filter(|u| u.is_active)
        .ok_or_else(|| AppError::auth("Invalid or expired token"))?;

    Ok(AuthUser {
        user_id: user.id,
        username: user.username,
        // the stored role wins over the one baked into the token
        role: user.role,
    })
}
