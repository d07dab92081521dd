use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use sqlx::{SqliteExecutor, SqlitePool};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::AppError;

#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[schema(example = json!({
    "id": 3,
    "token": "6f1c7a52-8d0e-4f5b-9b8e-2a4d1c9e7f10",
    "created_by": 1,
    "is_active": true,
    "created_at": "2026-01-01T07:30:00Z",
    "expires_at": "2026-01-02T07:30:00Z",
    "description": "Attendance QR code",
    "creator_name": "Anna Bianchi"
}))]
pub struct QrCode {
    pub id: i64,
    pub token: String,
    pub created_by: Option<i64>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub description: Option<String>,
    pub creator_name: Option<String>,
}

const QR_SELECT: &str = r#"
    SELECT q.id, q.token, q.created_by, q.is_active, q.created_at, q.expires_at, q.description,
           u.first_name || ' ' || u.last_name AS creator_name
    FROM qr_codes q
    LEFT JOIN users u ON u.id = q.created_by
"#;

/// Random, unguessable token printed in the code.
pub fn new_token() -> String {
    Uuid::new_v4().to_string()
}

impl QrCode {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|exp| now > exp)
    }

    pub async fn find_by_id<'e, E: SqliteExecutor<'e>>(
        conn: E,
        id: i64,
    ) -> Result<Option<QrCode>, sqlx::Error> {
        sqlx::query_as::<_, QrCode>(&format!("{QR_SELECT} WHERE q.id = ?"))
            .bind(id)
            .fetch_optional(conn)
            .await
    }

    pub async fn find_active<'e, E: SqliteExecutor<'e>>(conn: E) -> Result<Option<QrCode>, sqlx::Error> {
        sqlx::query_as::<_, QrCode>(&format!("{QR_SELECT} WHERE q.is_active = 1 LIMIT 1"))
            .fetch_optional(conn)
            .await
    }

    pub async fn find_active_by_token<'e, E: SqliteExecutor<'e>>(
        conn: E,
        token: &str,
    ) -> Result<Option<QrCode>, sqlx::Error> {
        sqlx::query_as::<_, QrCode>(&format!(
            "{QR_SELECT} WHERE q.token = ? AND q.is_active = 1"
        ))
        .bind(token)
        .fetch_optional(conn)
        .await
    }

    pub async fn history<'e, E: SqliteExecutor<'e>>(conn: E) -> Result<Vec<QrCode>, sqlx::Error> {
        sqlx::query_as::<_, QrCode>(&format!("{QR_SELECT} ORDER BY q.created_at DESC, q.id DESC"))
            .fetch_all(conn)
            .await
    }

    /// Flips one code to inactive. Returns false when it was not active.
    pub async fn deactivate<'e, E: SqliteExecutor<'e>>(conn: E, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE qr_codes SET is_active = 0 WHERE id = ? AND is_active = 1")
            .bind(id)
            .execute(conn)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Retires every active code and issues a fresh one in the same transaction.
    /// Returns how many codes were retired alongside the new code.
    pub async fn generate(
        pool: &SqlitePool,
        created_by: i64,
        description: Option<String>,
        expires_in: Option<Duration>,
    ) -> Result<(u64, QrCode), AppError> {
        let now = Utc::now();
        let expires_at = expires_in
            .map(|d| {
                now.checked_add_signed(d)
                    .ok_or_else(|| AppError::validation("expires_hours out of range"))
            })
            .transpose()?;

        let mut tx = pool.begin().await?;

        let deactivated = sqlx::query("UPDATE qr_codes SET is_active = 0 WHERE is_active = 1")
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO qr_codes (token, created_by, is_active, created_at, expires_at, description)
            VALUES (?, ?, 1, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(new_token())
        .bind(created_by)
        .bind(now)
        .bind(expires_at)
        .bind(description)
        .fetch_one(&mut *tx)
        .await?;

        let code = Self::find_by_id(&mut *tx, id)
            .await?
            .ok_or_else(|| AppError::Storage("inserted QR code vanished".into()))?;

        tx.commit().await?;

        tracing::info!(qr_id = id, created_by, deactivated, "QR code generated");
        Ok((deactivated, code))
    }

    /// The active code, unless it has expired; an expired one is retired on the spot.
    pub async fn current(pool: &SqlitePool, now: DateTime<Utc>) -> Result<ActiveQr, AppError> {
        let Some(code) = Self::find_active(pool).await? else {
            return Ok(ActiveQr::None);
        };

        if code.is_expired(now) {
            Self::deactivate(pool, code.id).await?;
            tracing::info!(qr_id = code.id, "Expired QR code deactivated");
            return Ok(ActiveQr::Expired);
        }

        Ok(ActiveQr::Active(code))
    }
}

#[derive(Debug)]
pub enum ActiveQr {
    Active(QrCode),
    Expired,
    None,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code(expires_at: Option<DateTime<Utc>>) -> QrCode {
        QrCode {
            id: 1,
            token: new_token(),
            created_by: Some(1),
            is_active: true,
            created_at: Utc::now(),
            expires_at,
            description: None,
            creator_name: None,
        }
    }

    #[test]
    fn codes_without_expiry_never_expire() {
        assert!(!code(None).is_expired(Utc::now() + Duration::days(3650)));
    }

    #[test]
    fn expiry_is_strictly_after_deadline() {
        let deadline = Utc::now();
        let qr = code(Some(deadline));

        assert!(!qr.is_expired(deadline));
        assert!(qr.is_expired(deadline + Duration::seconds(1)));
    }

    #[test]
    fn tokens_are_unique() {
        assert_ne!(new_token(), new_token());
    }

    #[actix_web::test]
    async fn generate_keeps_a_single_active_code() {
        let pool = crate::db::init_memory_db().await.unwrap();
        sqlx::query(
            "INSERT INTO users (username, email, password_hash, first_name, last_name, role, is_active, created_at, updated_at)
             VALUES ('boss', 'boss@example.com', 'x', 'Anna', 'Bianchi', 'admin', 1, ?, ?)",
        )
        .bind(Utc::now())
        .bind(Utc::now())
        .execute(&pool)
        .await
        .unwrap();

        let (first_retired, a) = QrCode::generate(&pool, 1, None, Some(Duration::hours(24)))
            .await
            .unwrap();
        let (second_retired, b) = QrCode::generate(&pool, 1, None, None).await.unwrap();

        assert_eq!(first_retired, 0);
        assert_eq!(second_retired, 1);
        assert_eq!(b.creator_name.as_deref(), Some("Anna Bianchi"));

        let active: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM qr_codes WHERE is_active = 1")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(active, 1);

        let a = QrCode::find_by_id(&pool, a.id).await.unwrap().unwrap();
        assert!(!a.is_active);
        assert!(matches!(
            QrCode::current(&pool, Utc::now()).await.unwrap(),
            ActiveQr::Active(c) if c.id == b.id
        ));
    }
}
