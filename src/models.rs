use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::model::{role::Role, user::User};

#[derive(Deserialize, ToSchema)]
pub struct RegisterRequest {
    #[schema(example = "mario")]
    pub username: String,
    #[schema(example = "pw123")]
    pub password: String,
    #[schema(example = "mario@example.com")]
    pub email: String,
    #[schema(example = "Mario")]
    pub first_name: String,
    #[schema(example = "Rossi")]
    pub last_name: String,
}

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    #[schema(example = "mario")]
    pub username: String,
    #[schema(example = "pw123")]
    pub password: String,
}

#[derive(Serialize, ToSchema)]
pub struct LoginResponse {
    pub token: String,
    pub user: User,
}

/// Session token payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    pub user_id: i64,
    pub sub: String,
    pub role: Role,
    pub exp: usize,
    pub jti: String,
}
