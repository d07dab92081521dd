use chrono::{DateTime, NaiveDate, Utc};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use sqlx::{SqliteConnection, SqliteExecutor, SqlitePool};
use strum_macros::{AsRefStr, EnumString};
use utoipa::ToSchema;

use crate::error::{AppError, is_unique_violation};
use crate::utils::db_utils::{Filters, fetch_filtered};

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum AttendanceStatus {
    Present,
    Absent,
    OnBreak,
}

/// Something a user (or the QR scanner on their behalf) does to today's record.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, EnumString, AsRefStr, ToSchema)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AttendanceAction {
    PunchIn,
    PunchOut,
    #[serde(alias = "break_start")]
    #[strum(to_string = "break_in", serialize = "break_start")]
    BreakIn,
    #[serde(alias = "break_end")]
    #[strum(to_string = "break_out", serialize = "break_end")]
    BreakOut,
}

#[derive(Debug, Display, Clone, Copy, Eq, PartialEq)]
pub enum TransitionError {
    #[display(fmt = "Already punched in today")]
    AlreadyPunchedIn,
    #[display(fmt = "You must punch in first")]
    NotPunchedIn,
    #[display(fmt = "Already punched out today")]
    AlreadyPunchedOut,
    #[display(fmt = "Already on break")]
    AlreadyOnBreak,
    #[display(fmt = "Not on break")]
    NotOnBreak,
    #[display(fmt = "Break already ended")]
    BreakAlreadyEnded,
}

impl std::error::Error for TransitionError {}

impl From<TransitionError> for AppError {
    fn from(e: TransitionError) -> Self {
        AppError::Conflict(e.to_string())
    }
}

/// The four timestamps that make up a working day. Status is computed from them
/// and never set on its own.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
pub struct Punches {
    pub punch_in: Option<DateTime<Utc>>,
    pub punch_out: Option<DateTime<Utc>>,
    pub break_start: Option<DateTime<Utc>>,
    pub break_end: Option<DateTime<Utc>>,
}

impl Punches {
    pub fn on_break(&self) -> bool {
        self.break_start.is_some() && self.break_end.is_none()
    }

    pub fn status(&self) -> AttendanceStatus {
        if self.punch_out.is_some() || self.punch_in.is_none() {
            AttendanceStatus::Absent
        } else if self.on_break() {
            AttendanceStatus::OnBreak
        } else {
            AttendanceStatus::Present
        }
    }

    /// Applies `action` at instant `at`. Punch-out closes the day: nothing is
    /// accepted after it.
    pub fn apply(self, action: AttendanceAction, at: DateTime<Utc>) -> Result<Punches, TransitionError> {
        let mut next = self;

        match action {
            AttendanceAction::PunchIn => {
                if self.punch_in.is_some() {
                    return Err(TransitionError::AlreadyPunchedIn);
                }
                next.punch_in = Some(at);
            }
            AttendanceAction::PunchOut => {
                if self.punch_in.is_none() {
                    return Err(TransitionError::NotPunchedIn);
                }
                if self.punch_out.is_some() {
                    return Err(TransitionError::AlreadyPunchedOut);
                }
                next.punch_out = Some(at);
            }
            AttendanceAction::BreakIn => {
                if self.punch_in.is_none() {
                    return Err(TransitionError::NotPunchedIn);
                }
                if self.punch_out.is_some() {
                    return Err(TransitionError::AlreadyPunchedOut);
                }
                if self.on_break() {
                    return Err(TransitionError::AlreadyOnBreak);
                }
                next.break_start = Some(at);
                next.break_end = None;
            }
            AttendanceAction::BreakOut => {
                if self.break_start.is_none() {
                    return Err(TransitionError::NotOnBreak);
                }
                if self.break_end.is_some() {
                    return Err(TransitionError::BreakAlreadyEnded);
                }
                if self.punch_out.is_some() {
                    return Err(TransitionError::AlreadyPunchedOut);
                }
                next.break_end = Some(at);
            }
        }

        Ok(next)
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
pub struct AttendanceRecord {
    pub id: i64,
    pub user_id: i64,
    pub date: NaiveDate,
    pub punch_in_time: Option<DateTime<Utc>>,
    pub punch_out_time: Option<DateTime<Utc>>,
    pub break_start_time: Option<DateTime<Utc>>,
    pub break_end_time: Option<DateTime<Utc>>,
    pub status: AttendanceStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const ATTENDANCE_COLUMNS: &str = "id, user_id, date, punch_in_time, punch_out_time, \
     break_start_time, break_end_time, status, notes, created_at, updated_at";

impl AttendanceRecord {
    pub fn punches(&self) -> Punches {
        Punches {
            punch_in: self.punch_in_time,
            punch_out: self.punch_out_time,
            break_start: self.break_start_time,
            break_end: self.break_end_time,
        }
    }

    pub async fn find_for_day<'e, E: SqliteExecutor<'e>>(
        conn: E,
        user_id: i64,
        date: NaiveDate,
    ) -> Result<Option<AttendanceRecord>, sqlx::Error> {
        sqlx::query_as::<_, AttendanceRecord>(&format!(
            "SELECT {ATTENDANCE_COLUMNS} FROM attendance WHERE user_id = ? AND date = ?"
        ))
        .bind(user_id)
        .bind(date)
        .fetch_optional(conn)
        .await
    }

    async fn insert(
        conn: &mut SqliteConnection,
        user_id: i64,
        date: NaiveDate,
        punches: Punches,
    ) -> Result<AttendanceRecord, sqlx::Error> {
        let now = Utc::now();

        sqlx::query_as::<_, AttendanceRecord>(&format!(
            r#"
            INSERT INTO attendance
                (user_id, date, punch_in_time, punch_out_time, break_start_time, break_end_time,
                 status, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING {ATTENDANCE_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(date)
        .bind(punches.punch_in)
        .bind(punches.punch_out)
        .bind(punches.break_start)
        .bind(punches.break_end)
        .bind(punches.status())
        .bind(now)
        .bind(now)
        .fetch_one(conn)
        .await
    }

    async fn store(
        conn: &mut SqliteConnection,
        id: i64,
        punches: Punches,
    ) -> Result<AttendanceRecord, sqlx::Error> {
        // timestamps and status always move together
        sqlx::query_as::<_, AttendanceRecord>(&format!(
            r#"
            UPDATE attendance SET
                punch_in_time = ?,
                punch_out_time = ?,
                break_start_time = ?,
                break_end_time = ?,
                status = ?,
                updated_at = ?
            WHERE id = ?
            RETURNING {ATTENDANCE_COLUMNS}
            "#
        ))
        .bind(punches.punch_in)
        .bind(punches.punch_out)
        .bind(punches.break_start)
        .bind(punches.break_end)
        .bind(punches.status())
        .bind(Utc::now())
        .bind(id)
        .fetch_one(conn)
        .await
    }

    /// Runs one state-machine step for `user_id` on the UTC day of `at`.
    /// Shared by the self-service endpoints and the QR scanner.
    pub async fn record_action(
        pool: &SqlitePool,
        user_id: i64,
        action: AttendanceAction,
        at: DateTime<Utc>,
    ) -> Result<AttendanceRecord, AppError> {
        let today = at.date_naive();
        let mut tx = pool.begin().await?;

        let existing = Self::find_for_day(&mut *tx, user_id, today).await?;
        let current = existing.as_ref().map(|r| r.punches()).unwrap_or_default();
        let next = current.apply(action, at)?;

        let record = match existing {
            Some(record) => Self::store(&mut *tx, record.id, next).await?,
            None => Self::insert(&mut *tx, user_id, today, next)
                .await
                .map_err(|e| {
                    // a concurrent punch-in created the row first
                    if is_unique_violation(&e) {
                        AppError::from(TransitionError::AlreadyPunchedIn)
                    } else {
                        AppError::from(e)
                    }
                })?,
        };

        tx.commit().await?;

        tracing::info!(
            user_id,
            action = action.as_ref(),
            status = ?record.status,
            "Attendance updated"
        );

        Ok(record)
    }

    /// Newest day first. `from`/`to` are inclusive.
    pub async fn list<'e, E: SqliteExecutor<'e>>(
        conn: E,
        user_id: Option<i64>,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<Vec<AttendanceRecord>, sqlx::Error> {
        let mut filters = Filters::new();
        filters
            .push_opt("user_id = ?", user_id)
            .push_opt("date >= ?", from)
            .push_opt("date <= ?", to);

        fetch_filtered(
            conn,
            &format!("SELECT {ATTENDANCE_COLUMNS} FROM attendance"),
            filters,
            " ORDER BY date DESC, id DESC",
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use std::str::FromStr;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, hour, 0, 0).unwrap()
    }

    fn run(actions: &[AttendanceAction]) -> Result<Punches, TransitionError> {
        actions
            .iter()
            .enumerate()
            .try_fold(Punches::default(), |p, (i, a)| p.apply(*a, at(8 + i as u32)))
    }

    use AttendanceAction::*;

    #[test]
    fn full_day_walks_through_every_status() {
        let start = Punches::default();
        assert_eq!(start.status(), AttendanceStatus::Absent);

        let p = start.apply(PunchIn, at(8)).unwrap();
        assert_eq!(p.status(), AttendanceStatus::Present);

        let p = p.apply(BreakIn, at(12)).unwrap();
        assert_eq!(p.status(), AttendanceStatus::OnBreak);

        let p = p.apply(BreakOut, at(13)).unwrap();
        assert_eq!(p.status(), AttendanceStatus::Present);

        let p = p.apply(PunchOut, at(17)).unwrap();
        assert_eq!(p.status(), AttendanceStatus::Absent);
        assert_eq!(p.punch_in, Some(at(8)));
        assert_eq!(p.punch_out, Some(at(17)));
    }

    #[rstest]
    #[case(&[PunchIn, PunchIn], TransitionError::AlreadyPunchedIn)]
    #[case(&[PunchOut], TransitionError::NotPunchedIn)]
    #[case(&[PunchIn, PunchOut, PunchOut], TransitionError::AlreadyPunchedOut)]
    #[case(&[BreakIn], TransitionError::NotPunchedIn)]
    #[case(&[PunchIn, BreakIn, BreakIn], TransitionError::AlreadyOnBreak)]
    #[case(&[PunchIn, BreakOut], TransitionError::NotOnBreak)]
    #[case(&[PunchIn, BreakIn, BreakOut, BreakOut], TransitionError::BreakAlreadyEnded)]
    #[case(&[PunchIn, PunchOut, BreakIn], TransitionError::AlreadyPunchedOut)]
    #[case(&[PunchIn, BreakIn, PunchOut, BreakOut], TransitionError::AlreadyPunchedOut)]
    fn rejects_invalid_sequences(#[case] actions: &[AttendanceAction], #[case] expected: TransitionError) {
        assert_eq!(run(actions).unwrap_err(), expected);
    }

    #[test]
    fn a_second_break_reopens_the_slot() {
        let p = run(&[PunchIn, BreakIn, BreakOut, BreakIn]).unwrap();

        assert_eq!(p.break_start, Some(at(11)));
        assert_eq!(p.break_end, None);
        assert_eq!(p.status(), AttendanceStatus::OnBreak);
    }

    #[test]
    fn punch_out_during_break_ends_the_day() {
        let p = run(&[PunchIn, BreakIn, PunchOut]).unwrap();

        assert!(p.on_break());
        assert_eq!(p.status(), AttendanceStatus::Absent);
    }

    #[test]
    fn failed_transition_leaves_input_untouched() {
        let p = run(&[PunchIn]).unwrap();
        let before = p;

        assert!(p.apply(PunchIn, at(9)).is_err());
        assert_eq!(p, before);
    }

    #[rstest]
    #[case("punch_in", PunchIn)]
    #[case("punch_out", PunchOut)]
    #[case("break_in", BreakIn)]
    #[case("break_start", BreakIn)]
    #[case("break_out", BreakOut)]
    #[case("break_end", BreakOut)]
    fn parses_scanner_actions(#[case] raw: &str, #[case] expected: AttendanceAction) {
        assert_eq!(AttendanceAction::from_str(raw).unwrap(), expected);
    }

    #[test]
    fn unknown_action_is_rejected() {
        assert!(AttendanceAction::from_str("lunch").is_err());
    }

    #[actix_web::test]
    async fn record_action_keeps_one_row_per_day() {
        let pool = crate::db::init_memory_db().await.unwrap();
        sqlx::query(
            "INSERT INTO users (username, email, password_hash, first_name, last_name, role, is_active, created_at, updated_at)
             VALUES ('mario', 'mario@example.com', 'x', 'Mario', 'Rossi', 'employee', 1, ?, ?)",
        )
        .bind(Utc::now())
        .bind(Utc::now())
        .execute(&pool)
        .await
        .unwrap();

        AttendanceRecord::record_action(&pool, 1, PunchIn, at(8)).await.unwrap();
        AttendanceRecord::record_action(&pool, 1, BreakIn, at(12)).await.unwrap();
        let err = AttendanceRecord::record_action(&pool, 1, PunchIn, at(13))
            .await
            .unwrap_err();
        assert_eq!(err, AppError::conflict("Already punched in today"));

        let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM attendance WHERE user_id = 1")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(rows, 1);

        let stored = AttendanceRecord::find_for_day(&pool, 1, at(8).date_naive())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, AttendanceStatus::OnBreak);
    }
}
