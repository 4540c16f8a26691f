//! MySQL connection implementation

use async_trait::async_trait;
use chrono::{Datelike, Timelike};
use mysql_async::{Conn, Opts, Params, Pool, Row as MySqlRow, consts::ColumnType, prelude::*};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tether_core::{Connection, QueryResult, Result, Row, StatementResult, TetherError, Value};

/// A `mysql_async` pool exposed as a single shareable handle
pub struct MySqlConnection {
    pool: Pool,
    database_name: String,
    closed: AtomicBool,
}

impl MySqlConnection {
    /// Create the pool object. No connection is made until first use.
    pub fn new(opts: Opts) -> Self {
        let database_name = opts.db_name().unwrap_or_default().to_string();
        tracing::debug!(database = %database_name, "creating MySQL pool");
        Self {
            pool: Pool::new(opts),
            database_name,
            closed: AtomicBool::new(false),
        }
    }

    pub fn database_name(&self) -> &str {
        &self.database_name
    }

    async fn get_conn(&self) -> Result<Conn> {
        if self.is_closed() {
            return Err(TetherError::Connection("MySQL pool is closed".into()));
        }
        self.pool.get_conn().await.map_err(map_mysql_error)
    }
}

/// Reachability problems become `Connection` errors; everything the server
/// rejected stays a `Query` error.
fn map_mysql_error(err: mysql_async::Error) -> TetherError {
    match err {
        mysql_async::Error::Server(e) => TetherError::Query(e.to_string()),
        mysql_async::Error::Io(e) => TetherError::Connection(format!("I/O: {}", e)),
        other => TetherError::Connection(other.to_string()),
    }
}

fn to_params(params: &[Value]) -> Params {
    if params.is_empty() {
        Params::Empty
    } else {
        Params::Positional(params.iter().map(value_to_mysql).collect())
    }
}

fn value_to_mysql(value: &Value) -> mysql_async::Value {
    match value {
        Value::Null => mysql_async::Value::NULL,
        Value::Bool(v) => mysql_async::Value::Int(i64::from(*v)),
        Value::Int64(v) => mysql_async::Value::Int(*v),
        Value::UInt64(v) => mysql_async::Value::UInt(*v),
        Value::Float64(v) => mysql_async::Value::Double(*v),
        Value::Decimal(v) | Value::String(v) => mysql_async::Value::Bytes(v.clone().into_bytes()),
        Value::Bytes(v) => mysql_async::Value::Bytes(v.clone()),
        Value::DateTime(v) => mysql_async::Value::Date(
            v.year() as u16,
            v.month() as u8,
            v.day() as u8,
            v.hour() as u8,
            v.minute() as u8,
            v.second() as u8,
            v.nanosecond() / 1_000,
        ),
        Value::Json(v) => mysql_async::Value::Bytes(v.to_string().into_bytes()),
    }
}

/// Convert a `mysql_async` value, using the column type to interpret
/// text-protocol byte strings.
fn mysql_to_value(val: mysql_async::Value, col_type: ColumnType) -> Value {
    match val {
        mysql_async::Value::NULL => Value::Null,
        mysql_async::Value::Bytes(bytes) => match String::from_utf8(bytes) {
            Ok(s) => match col_type {
                ColumnType::MYSQL_TYPE_TINY
                | ColumnType::MYSQL_TYPE_SHORT
                | ColumnType::MYSQL_TYPE_LONG
                | ColumnType::MYSQL_TYPE_LONGLONG
                | ColumnType::MYSQL_TYPE_INT24
                | ColumnType::MYSQL_TYPE_YEAR => {
                    s.parse::<i64>().map(Value::Int64).unwrap_or(Value::String(s))
                }
                ColumnType::MYSQL_TYPE_FLOAT | ColumnType::MYSQL_TYPE_DOUBLE => {
                    s.parse::<f64>().map(Value::Float64).unwrap_or(Value::String(s))
                }
                ColumnType::MYSQL_TYPE_DECIMAL | ColumnType::MYSQL_TYPE_NEWDECIMAL => {
                    Value::Decimal(s)
                }
                ColumnType::MYSQL_TYPE_JSON => serde_json::from_str(&s)
                    .map(Value::Json)
                    .unwrap_or(Value::String(s)),
                _ => Value::String(s),
            },
            Err(e) => Value::Bytes(e.into_bytes()),
        },
        mysql_async::Value::Int(i) => Value::Int64(i),
        mysql_async::Value::UInt(u) => Value::UInt64(u),
        mysql_async::Value::Float(f) => Value::Float64(f64::from(f)),
        mysql_async::Value::Double(d) => Value::Float64(d),
        mysql_async::Value::Date(year, month, day, hour, min, sec, micro) => {
            chrono::NaiveDate::from_ymd_opt(year as i32, month as u32, day as u32)
                .and_then(|d| d.and_hms_micro_opt(hour as u32, min as u32, sec as u32, micro))
                .map(Value::DateTime)
                .unwrap_or_else(|| {
                    Value::String(format!(
                        "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
                        year, month, day, hour, min, sec
                    ))
                })
        }
        mysql_async::Value::Time(negative, days, hours, mins, secs, micros) => {
            let total_hours = days * 24 + u32::from(hours);
            let sign = if negative { "-" } else { "" };
            Value::String(format!(
                "{}{:02}:{:02}:{:02}.{:06}",
                sign, total_hours, mins, secs, micros
            ))
        }
    }
}

#[async_trait]
impl Connection for MySqlConnection {
    fn driver_name(&self) -> &str {
        "mysql"
    }

    #[tracing::instrument(skip(self, sql, params), fields(sql_preview = %sql.chars().take(100).collect::<String>()))]
    async fn execute(&self, sql: &str, params: &[Value]) -> Result<StatementResult> {
        let mut conn = self.get_conn().await?;
        conn.exec_drop(sql, to_params(params))
            .await
            .map_err(map_mysql_error)?;

        let result = StatementResult {
            affected_rows: conn.affected_rows(),
            last_insert_id: conn.last_insert_id(),
        };
        tracing::debug!(affected_rows = result.affected_rows, "statement executed");
        Ok(result)
    }

    #[tracing::instrument(skip(self, sql, params), fields(sql_preview = %sql.chars().take(100).collect::<String>()))]
    async fn query(&self, sql: &str, params: &[Value]) -> Result<QueryResult> {
        let start_time = Instant::now();
        let mut conn = self.get_conn().await?;

        let mysql_rows: Vec<MySqlRow> = conn
            .exec(sql, to_params(params))
            .await
            .map_err(map_mysql_error)?;

        let mut columns = Vec::new();
        let mut column_types = Vec::new();
        if let Some(first_row) = mysql_rows.first() {
            for col in first_row.columns_ref() {
                columns.push(col.name_str().to_string());
                column_types.push(col.column_type());
            }
        }

        let rows = mysql_rows
            .into_iter()
            .map(|mysql_row| {
                let values = column_types
                    .iter()
                    .enumerate()
                    .map(|(idx, col_type)| {
                        let raw: mysql_async::Value =
                            mysql_row.get(idx).unwrap_or(mysql_async::Value::NULL);
                        mysql_to_value(raw, *col_type)
                    })
                    .collect();
                Row::new(columns.clone(), values)
            })
            .collect::<Vec<_>>();

        let execution_time_ms = start_time.elapsed().as_millis() as u64;
        tracing::debug!(row_count = rows.len(), execution_time_ms, "query executed");

        Ok(QueryResult {
            columns,
            rows,
            affected_rows: conn.affected_rows(),
            execution_time_ms,
        })
    }

    /// Protocol-level `COM_PING` on a pooled connection.
    async fn ping(&self) -> Result<()> {
        let mut conn = self.get_conn().await?;
        conn.ping().await.map_err(map_mysql_error)
    }

    async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        tracing::info!(database = %self.database_name, "closing MySQL connection pool");
        self.pool
            .clone()
            .disconnect()
            .await
            .map_err(|e| TetherError::Connection(format!("Failed to close MySQL pool: {}", e)))
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}
