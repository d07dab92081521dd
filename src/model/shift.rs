use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Serialize;
use sqlx::SqliteExecutor;
use utoipa::ToSchema;

use crate::error::AppError;
use crate::utils::db_utils::{Filters, fetch_filtered};

#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
pub struct Shift {
    pub id: i64,
    pub user_id: i64,
    pub date: NaiveDate,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub struct NewShift {
    pub user_id: i64,
    pub date: NaiveDate,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub description: Option<String>,
}

#[derive(Default)]
pub struct ShiftChanges {
    pub date: Option<NaiveDate>,
    pub start_time: Option<NaiveDateTime>,
    pub end_time: Option<NaiveDateTime>,
    pub description: Option<String>,
}

pub(crate) const SHIFT_COLUMNS: &str =
    "id, user_id, date, start_time, end_time, description, created_at, updated_at";

pub fn validate_times(start: NaiveDateTime, end: NaiveDateTime) -> Result<(), AppError> {
    if start >= end {
        return Err(AppError::validation("start_time must be before end_time"));
    }
    Ok(())
}

impl Shift {
    pub async fn find_by_id<'e, E: SqliteExecutor<'e>>(
        conn: E,
        id: i64,
    ) -> Result<Option<Shift>, sqlx::Error> {
        sqlx::query_as::<_, Shift>(&format!("SELECT {SHIFT_COLUMNS} FROM shifts WHERE id = ?"))
            .bind(id)
            .fetch_optional(conn)
            .await
    }

    pub async fn insert<'e, E: SqliteExecutor<'e>>(conn: E, new: NewShift) -> Result<Shift, sqlx::Error> {
        let now = Utc::now();

        sqlx::query_as::<_, Shift>(&format!(
            r#"
            INSERT INTO shifts (user_id, date, start_time, end_time, description, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            RETURNING {SHIFT_COLUMNS}
            "#
        ))
        .bind(new.user_id)
        .bind(new.date)
        .bind(new.start_time)
        .bind(new.end_time)
        .bind(new.description)
        .bind(now)
        .bind(now)
        .fetch_one(conn)
        .await
    }

    pub async fn update<'e, E: SqliteExecutor<'e>>(
        conn: E,
        id: i64,
        changes: ShiftChanges,
    ) -> Result<Option<Shift>, sqlx::Error> {
        sqlx::query_as::<_, Shift>(&format!(
            r#"
            UPDATE shifts SET
                date        = COALESCE(?, date),
                start_time  = COALESCE(?, start_time),
                end_time    = COALESCE(?, end_time),
                description = COALESCE(?, description),
                updated_at  = ?
            WHERE id = ?
            RETURNING {SHIFT_COLUMNS}
            "#
        ))
        .bind(changes.date)
        .bind(changes.start_time)
        .bind(changes.end_time)
        .bind(changes.description)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(conn)
        .await
    }

    pub async fn delete<'e, E: SqliteExecutor<'e>>(conn: E, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM shifts WHERE id = ?")
            .bind(id)
            .execute(conn)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Earliest first. `from`/`to` are inclusive.
    pub async fn list<'e, E: SqliteExecutor<'e>>(
        conn: E,
        user_id: Option<i64>,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<Vec<Shift>, sqlx::Error> {
        let mut filters = Filters::new();
        filters
            .push_opt("user_id = ?", user_id)
            .push_opt("date >= ?", from)
            .push_opt("date <= ?", to);

        fetch_filtered(
            conn,
            &format!("SELECT {SHIFT_COLUMNS} FROM shifts"),
            filters,
            " ORDER BY date ASC, start_time ASC, id ASC",
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shift_must_end_after_it_starts() {
        let day = NaiveDate::from_ymd_opt(2026, 2, 10).unwrap();
        let nine = day.and_hms_opt(9, 0, 0).unwrap();
        let five = day.and_hms_opt(17, 0, 0).unwrap();

        assert!(validate_times(nine, five).is_ok());
        assert!(validate_times(five, nine).is_err());
        assert!(validate_times(nine, nine).is_err());
    }
}
