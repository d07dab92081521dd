use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::SqliteExecutor;
use utoipa::ToSchema;

use crate::model::role::Role;

#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[schema(example = json!({
    "id": 1,
    "username": "mario",
    "email": "mario@example.com",
    "first_name": "Mario",
    "last_name": "Rossi",
    "role": "employee",
    "is_active": true,
    "created_at": "2026-01-01T08:00:00Z",
    "updated_at": "2026-01-01T08:00:00Z",
    "last_login_at": null
}))]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(skip)]
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}

pub struct NewUser<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub password_hash: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub role: Role,
}

/// Partial update; `None` keeps the stored value.
#[derive(Default)]
pub struct UserChanges {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
}

const USER_COLUMNS: &str = "id, username, email, password_hash, first_name, last_name, role, \
     is_active, created_at, updated_at, last_login_at";

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub async fn find_by_id<'e, E: SqliteExecutor<'e>>(
        conn: E,
        id: i64,
    ) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
            .bind(id)
            .fetch_optional(conn)
            .await
    }

    pub async fn find_by_username<'e, E: SqliteExecutor<'e>>(
        conn: E,
        username: &str,
    ) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = ?"
        ))
        .bind(username)
        .fetch_optional(conn)
        .await
    }

    pub async fn find_by_email<'e, E: SqliteExecutor<'e>>(
        conn: E,
        email: &str,
    ) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?"))
            .bind(email)
            .fetch_optional(conn)
            .await
    }

    pub async fn list<'e, E: SqliteExecutor<'e>>(conn: E) -> Result<Vec<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY id"))
            .fetch_all(conn)
            .await
    }

    pub async fn insert<'e, E: SqliteExecutor<'e>>(
        conn: E,
        new: NewUser<'_>,
    ) -> Result<User, sqlx::Error> {
        let now = Utc::now();

        sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users
                (username, email, password_hash, first_name, last_name, role, is_active, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, 1, ?, ?)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(new.username)
        .bind(new.email)
        .bind(new.password_hash)
        .bind(new.first_name)
        .bind(new.last_name)
        .bind(new.role)
        .bind(now)
        .bind(now)
        .fetch_one(conn)
        .await
    }

    pub async fn update<'e, E: SqliteExecutor<'e>>(
        conn: E,
        id: i64,
        changes: UserChanges,
    ) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users SET
                first_name    = COALESCE(?, first_name),
                last_name     = COALESCE(?, last_name),
                email         = COALESCE(?, email),
                password_hash = COALESCE(?, password_hash),
                role          = COALESCE(?, role),
                is_active     = COALESCE(?, is_active),
                updated_at    = ?
            WHERE id = ?
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(changes.first_name)
        .bind(changes.last_name)
        .bind(changes.email)
        .bind(changes.password_hash)
        .bind(changes.role)
        .bind(changes.is_active)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(conn)
        .await
    }

    pub async fn set_role<'e, E: SqliteExecutor<'e>>(
        conn: E,
        username: &str,
        role: Role,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE users SET role = ?, updated_at = ? WHERE username = ?")
            .bind(role)
            .bind(Utc::now())
            .bind(username)
            .execute(conn)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn touch_last_login<'e, E: SqliteExecutor<'e>>(
        conn: E,
        id: i64,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE users SET last_login_at = ? WHERE id = ?")
            .bind(Utc::now())
            .bind(id)
            .execute(conn)
            .await?;
        Ok(())
    }

    pub async fn delete<'e, E: SqliteExecutor<'e>>(conn: E, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(conn)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
