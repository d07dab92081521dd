use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::Error};
use uuid::Uuid;

use crate::{model::user::User, models::Claims};

fn now() -> usize {
    Utc::now().timestamp().max(0) as usize
}

pub fn claims_for(user: &User, ttl: usize) -> Claims {
    Claims {
        user_id: user.id,
        sub: user.username.clone(),
        role: user.role,
        exp: now() + ttl,
        jti: Uuid::new_v4().to_string(),
    }
}

pub fn encode_claims(claims: &Claims, secret: &str) -> Result<String, Error> {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

/// HS256 session token for `user`, valid for `ttl` seconds.
pub fn generate_token(user: &User, secret: &str, ttl: usize) -> Result<String, Error> {
    encode_claims(&claims_for(user, ttl), secret)
}

pub fn verify_token(token: &str, secret: &str) -> Result<Claims, Error> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::role::Role;
    use jsonwebtoken::errors::ErrorKind;

    fn claims(exp: usize) -> Claims {
        Claims {
            user_id: 42,
            sub: "mario".into(),
            role: Role::Manager,
            exp,
            jti: Uuid::new_v4().to_string(),
        }
    }

    #[test]
    fn round_trips_identity() {
        let original = claims(now() + 3600);
        let token = encode_claims(&original, "secret").unwrap();

        assert_eq!(verify_token(&token, "secret").unwrap(), original);
    }

    #[test]
    fn rejects_wrong_secret() {
        let token = encode_claims(&claims(now() + 3600), "secret").unwrap();
        let err = verify_token(&token, "other").unwrap_err();

        assert_eq!(*err.kind(), ErrorKind::InvalidSignature);
    }

    #[test]
    fn rejects_expired_token() {
        // well past the default leeway
        let token = encode_claims(&claims(now() - 3600), "secret").unwrap();
        let err = verify_token(&token, "secret").unwrap_err();

        assert_eq!(*err.kind(), ErrorKind::ExpiredSignature);
    }
}
