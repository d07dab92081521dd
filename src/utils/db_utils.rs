use chrono::NaiveDate;
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, SqliteExecutor};

/// ===============================
/// SQL bindable value enum
/// ===============================
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    String(String),
    I64(i64),
    Date(NaiveDate),
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::I64(v)
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::String(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::String(v.to_string())
    }
}

impl From<NaiveDate> for SqlValue {
    fn from(v: NaiveDate) -> Self {
        SqlValue::Date(v)
    }
}

/// ===============================
/// Dynamic WHERE clause
/// ===============================
/// Each condition carries exactly one `?` placeholder.
#[derive(Debug, Default)]
pub struct Filters {
    conditions: Vec<&'static str>,
    values: Vec<SqlValue>,
}

impl Filters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, condition: &'static str, value: impl Into<SqlValue>) -> &mut Self {
        self.conditions.push(condition);
        self.values.push(value.into());
        self
    }

    /// Adds the condition only when a value was supplied.
    pub fn push_opt<T: Into<SqlValue>>(&mut self, condition: &'static str, value: Option<T>) -> &mut Self {
        if let Some(v) = value {
            self.push(condition, v);
        }
        self
    }

    pub fn where_clause(&self) -> String {
        if self.conditions.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.conditions.join(" AND "))
        }
    }
}

/// ===============================
/// Run `select` + filters + `tail`
/// ===============================
pub async fn fetch_filtered<'e, E, O>(
    conn: E,
    select: &str,
    filters: Filters,
    tail: &str,
) -> Result<Vec<O>, sqlx::Error>
where
    E: SqliteExecutor<'e>,
    O: for<'r> FromRow<'r, SqliteRow> + Send + Unpin,
{
    let sql = format!("{select}{}{tail}", filters.where_clause());
    let mut query = sqlx::query_as::<_, O>(&sql);

    for value in filters.values {
        query = match value {
            SqlValue::String(v) => query.bind(v),
            SqlValue::I64(v) => query.bind(v),
            SqlValue::Date(v) => query.bind(v),
        };
    }

    query.fetch_all(conn).await
}
