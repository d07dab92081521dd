use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{SqliteExecutor, SqlitePool};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

use crate::error::AppError;
use crate::utils::db_utils::{Filters, fetch_filtered};

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, EnumString, AsRefStr, sqlx::Type, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum LeaveType {
    Holiday,
    Permission,
    SickLeave,
}

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display, EnumString, sqlx::Type, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum LeaveStatus {
    Pending,
    Approved,
    Rejected,
}

/// Outcome a manager can give a pending request.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Decision {
    Approve,
    Reject,
}

impl Decision {
    pub fn status(self) -> LeaveStatus {
        match self {
            Decision::Approve => LeaveStatus::Approved,
            Decision::Reject => LeaveStatus::Rejected,
        }
    }
}

pub fn parse_leave_type(raw: &str) -> Result<LeaveType, AppError> {
    raw.parse::<LeaveType>().map_err(|_| {
        AppError::validation("Invalid leave type. Allowed: holiday, permission, sick_leave")
    })
}

pub fn validate_range(start: NaiveDate, end: NaiveDate) -> Result<(), AppError> {
    if start > end {
        return Err(AppError::validation("start_date cannot be after end_date"));
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[schema(example = json!({
    "id": 1,
    "user_id": 7,
    "start_date": "2026-01-05",
    "end_date": "2026-01-09",
    "leave_type": "holiday",
    "status": "pending",
    "reason": "Family trip",
    "attachment_path": null,
    "approver_id": null,
    "approved_at": null,
    "created_at": "2026-01-01T09:00:00Z",
    "updated_at": "2026-01-01T09:00:00Z"
}))]
pub struct LeaveRequest {
    pub id: i64,
    pub user_id: i64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub leave_type: LeaveType,
    pub status: LeaveStatus,
    pub reason: Option<String>,
    pub attachment_path: Option<String>,
    pub approver_id: Option<i64>,
    pub approved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub struct NewLeaveRequest {
    pub user_id: i64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub leave_type: LeaveType,
    pub reason: Option<String>,
    pub attachment_path: Option<String>,
}

#[derive(Default)]
pub struct LeaveChanges {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub leave_type: Option<LeaveType>,
    /// `Some(None)` clears the stored value.
    pub reason: Option<Option<String>>,
    pub attachment_path: Option<Option<String>>,
}

pub(crate) const LEAVE_COLUMNS: &str = "id, user_id, start_date, end_date, leave_type, status, \
     reason, attachment_path, approver_id, approved_at, created_at, updated_at";

impl LeaveRequest {
    pub fn is_pending(&self) -> bool {
        self.status == LeaveStatus::Pending
    }

    pub async fn find_by_id<'e, E: SqliteExecutor<'e>>(
        conn: E,
        id: i64,
    ) -> Result<Option<LeaveRequest>, sqlx::Error> {
        sqlx::query_as::<_, LeaveRequest>(&format!(
            "SELECT {LEAVE_COLUMNS} FROM leave_requests WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(conn)
        .await
    }

    pub async fn insert<'e, E: SqliteExecutor<'e>>(
        conn: E,
        new: NewLeaveRequest,
    ) -> Result<LeaveRequest, sqlx::Error> {
        let now = Utc::now();

        sqlx::query_as::<_, LeaveRequest>(&format!(
            r#"
            INSERT INTO leave_requests
                (user_id, start_date, end_date, leave_type, status, reason, attachment_path, created_at, updated_at)
            VALUES (?, ?, ?, ?, 'pending', ?, ?, ?, ?)
            RETURNING {LEAVE_COLUMNS}
            "#
        ))
        .bind(new.user_id)
        .bind(new.start_date)
        .bind(new.end_date)
        .bind(new.leave_type)
        .bind(new.reason)
        .bind(new.attachment_path)
        .bind(now)
        .bind(now)
        .fetch_one(conn)
        .await
    }

    /// Owner edit of a pending request. Fails with `Forbidden` for anyone else
    /// and with `Conflict` once the request is decided.
    pub async fn update_pending(
        pool: &SqlitePool,
        id: i64,
        owner_id: i64,
        changes: LeaveChanges,
    ) -> Result<LeaveRequest, AppError> {
        let mut tx = pool.begin().await?;

        let current = Self::find_by_id(&mut *tx, id)
            .await?
            .ok_or_else(|| AppError::not_found("Leave request not found"))?;

        if current.user_id != owner_id {
            return Err(AppError::forbidden("Only the owner can edit this request"));
        }
        if !current.is_pending() {
            return Err(AppError::conflict("Cannot edit a request that was already processed"));
        }

        validate_range(
            changes.start_date.unwrap_or(current.start_date),
            changes.end_date.unwrap_or(current.end_date),
        )?;

        let updated = sqlx::query_as::<_, LeaveRequest>(&format!(
            r#"
            UPDATE leave_requests SET
                start_date      = COALESCE(?, start_date),
                end_date        = COALESCE(?, end_date),
                leave_type      = COALESCE(?, leave_type),
                reason          = CASE WHEN ? THEN ? ELSE reason END,
                attachment_path = CASE WHEN ? THEN ? ELSE attachment_path END,
                updated_at      = ?
            WHERE id = ? AND status = 'pending'
            RETURNING {LEAVE_COLUMNS}
            "#
        ))
        .bind(changes.start_date)
        .bind(changes.end_date)
        .bind(changes.leave_type)
        .bind(changes.reason.is_some())
        .bind(changes.reason.flatten())
        .bind(changes.attachment_path.is_some())
        .bind(changes.attachment_path.flatten())
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::conflict("Cannot edit a request that was already processed"))?;

        tx.commit().await?;
        Ok(updated)
    }

    /// Moves a pending request to approved or rejected, exactly once.
    pub async fn decide(
        pool: &SqlitePool,
        id: i64,
        approver_id: i64,
        decision: Decision,
    ) -> Result<LeaveRequest, AppError> {
        let mut tx = pool.begin().await?;

        let current = Self::find_by_id(&mut *tx, id)
            .await?
            .ok_or_else(|| AppError::not_found("Leave request not found"))?;

        if !current.is_pending() {
            return Err(AppError::conflict(format!(
                "Leave request already {}",
                current.status
            )));
        }

        let decided = sqlx::query_as::<_, LeaveRequest>(&format!(
            r#"
            UPDATE leave_requests SET
                status = ?,
                approver_id = ?,
                approved_at = ?,
                updated_at = ?
            WHERE id = ? AND status = 'pending'
            RETURNING {LEAVE_COLUMNS}
            "#
        ))
        .bind(decision.status())
        .bind(approver_id)
        .bind(Utc::now())
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        // lost a race with another approver
        .ok_or_else(|| AppError::conflict("Leave request already decided"))?;

        tx.commit().await?;

        tracing::info!(leave_id = id, approver_id, status = %decided.status, "Leave request decided");
        Ok(decided)
    }

    /// Newest first.
    pub async fn list<'e, E: SqliteExecutor<'e>>(
        conn: E,
        user_id: Option<i64>,
        status: Option<LeaveStatus>,
    ) -> Result<Vec<LeaveRequest>, sqlx::Error> {
        let mut filters = Filters::new();
        filters
            .push_opt("user_id = ?", user_id)
            .push_opt("status = ?", status.map(|s| s.to_string()));

        fetch_filtered(
            conn,
            &format!("SELECT {LEAVE_COLUMNS} FROM leave_requests"),
            filters,
            " ORDER BY created_at DESC, id DESC",
        )
        .await
    }

    /// Approval queue, oldest first.
    pub async fn pending<'e, E: SqliteExecutor<'e>>(conn: E) -> Result<Vec<LeaveRequest>, sqlx::Error> {
        sqlx::query_as::<_, LeaveRequest>(&format!(
            "SELECT {LEAVE_COLUMNS} FROM leave_requests WHERE status = 'pending' ORDER BY created_at ASC, id ASC"
        ))
        .fetch_all(conn)
        .await
    }
}
