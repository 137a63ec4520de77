//! `mysql_async` backed gateway.

use async_trait::async_trait;
use chrono::NaiveDate;
use mysql_async::consts::ColumnType;
use mysql_async::prelude::*;
use mysql_async::{Conn, OptsBuilder, Pool, PoolConstraints, PoolOpts};
use ormsql_core::{escape_identifier, escape_string, Row, Value};
use parking_lot::Mutex;

use super::{ConnectionGateway, ExecInfo, GatewayError, QueryOutput};
use crate::config::AdapterSettings;

/// Server error: unknown database.
pub const ER_BAD_DB_ERROR: u16 = 1049;

/// Server error: table does not exist.
pub const ER_NO_SUCH_TABLE: u16 = 1146;

/// Connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No pool yet, or the last attempt failed.
    Disconnected,
    /// An attempt is in progress.
    Connecting,
    /// Pool established and the database selected.
    Ready,
    /// Closed by the caller.
    Closed,
}

/// Gateway that executes statements on a MySQL server.
///
/// Connects lazily on first use. Concurrent callers wait on a single
/// connection attempt.
pub struct MySqlGateway {
    settings: AdapterSettings,
    state: Mutex<ConnectionState>,
    pool: Mutex<Option<Pool>>,
    connect_lock: tokio::sync::Mutex<()>,
}

impl MySqlGateway {
    /// Create a gateway without connecting.
    pub fn new(settings: AdapterSettings) -> Self {
        Self {
            settings,
            state: Mutex::new(ConnectionState::Disconnected),
            pool: Mutex::new(None),
            connect_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Create a gateway and connect immediately.
    pub async fn connect(settings: AdapterSettings) -> Result<Self, GatewayError> {
        let gateway = Self::new(settings);
        gateway.ensure_connected().await?;
        Ok(gateway)
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        *self.state.lock()
    }

    /// The settings this gateway connects with.
    pub fn settings(&self) -> &AdapterSettings {
        &self.settings
    }

    /// Disconnect the pool. Later statements reconnect.
    pub async fn close(&self) -> Result<(), GatewayError> {
        let pool = self.pool.lock().take();
        *self.state.lock() = ConnectionState::Closed;
        if let Some(pool) = pool {
            pool.disconnect().await.map_err(map_error)?;
        }
        Ok(())
    }

    async fn ensure_connected(&self) -> Result<Pool, GatewayError> {
        let cached = self.pool.lock().clone();
        if let Some(pool) = cached {
            return Ok(pool);
        }

        let _guard = self.connect_lock.lock().await;
        let cached = self.pool.lock().clone();
        if let Some(pool) = cached {
            return Ok(pool);
        }

        *self.state.lock() = ConnectionState::Connecting;
        let mut attempt = 1u32;
        loop {
            match self.try_connect().await {
                Ok(pool) => {
                    *self.pool.lock() = Some(pool.clone());
                    *self.state.lock() = ConnectionState::Ready;
                    tracing::info!(
                        host = %self.settings.host,
                        port = self.settings.port,
                        database = ?self.settings.database,
                        pool_size = self.settings.pool_size(),
                        "connected to MySQL"
                    );
                    return Ok(pool);
                }
                Err(e) if self.settings.retry_on_error => {
                    if self.settings.silent_on_error {
                        tracing::debug!(error = %e, attempt, "connection failed, retrying");
                    } else {
                        tracing::warn!(
                            error = %e,
                            attempt,
                            retry_in_ms = self.settings.retry_interval_ms,
                            "connection failed, retrying"
                        );
                    }
                    tokio::time::sleep(self.settings.retry_interval()).await;
                    attempt += 1;
                }
                Err(e) => {
                    *self.state.lock() = ConnectionState::Disconnected;
                    return Err(e);
                }
            }
        }
    }

    async fn try_connect(&self) -> Result<Pool, GatewayError> {
        let pool = Pool::new(self.opts(true));
        match pool.get_conn().await {
            Ok(conn) => {
                drop(conn);
                Ok(pool)
            }
            Err(mysql_async::Error::Server(e)) if should_create_database(e.code, &self.settings) => {
                let _ = pool.disconnect().await;
                self.create_database().await?;
                Ok(Pool::new(self.opts(true)))
            }
            Err(e) => {
                let _ = pool.disconnect().await;
                Err(map_error(e))
            }
        }
    }

    async fn create_database(&self) -> Result<(), GatewayError> {
        let Some(database) = self.settings.database.as_deref() else {
            return Ok(());
        };
        let sql = create_database_sql(database, &self.settings);
        tracing::info!(database, "creating missing database");

        let mut conn = Conn::new(self.opts(false)).await.map_err(map_error)?;
        conn.query_drop(sql).await.map_err(map_error)?;
        conn.disconnect().await.map_err(map_error)
    }

    fn opts(&self, with_database: bool) -> OptsBuilder {
        let settings = &self.settings;
        let constraints = PoolConstraints::new(0, settings.pool_size()).unwrap_or_default();
        let database = if with_database {
            settings.database.clone()
        } else {
            None
        };

        OptsBuilder::default()
            .ip_or_hostname(settings.host.clone())
            .tcp_port(settings.port)
            .user(settings.user.clone())
            .pass(settings.password.clone())
            .db_name(database)
            .init(session_init(settings))
            .pool_opts(PoolOpts::default().with_constraints(constraints))
    }

    async fn run(&self, pool: &Pool, sql: &str) -> Result<QueryOutput, GatewayError> {
        let mut conn = pool.get_conn().await.map_err(map_error)?;
        if returns_rows(sql) {
            let rows: Vec<mysql_async::Row> = conn.query(sql).await.map_err(map_error)?;
            Ok(QueryOutput::Rows(rows.iter().map(convert_row).collect()))
        } else {
            conn.query_drop(sql).await.map_err(map_error)?;
            Ok(QueryOutput::Affected(ExecInfo {
                affected_rows: conn.affected_rows(),
                insert_id: conn.last_insert_id().filter(|id| *id != 0),
            }))
        }
    }
}

#[async_trait]
impl ConnectionGateway for MySqlGateway {
    async fn execute(&self, sql: &str) -> Result<QueryOutput, GatewayError> {
        let pool = self.ensure_connected().await?;
        match self.run(&pool, sql).await {
            Err(GatewayError::Server { code, .. })
                if should_create_database(code, &self.settings) =>
            {
                self.create_database().await?;
                self.run(&pool, sql).await
            }
            other => other,
        }
    }
}

/// `CREATE DATABASE` statement for the configured charset and collation.
pub fn create_database_sql(database: &str, settings: &AdapterSettings) -> String {
    format!(
        "CREATE DATABASE IF NOT EXISTS {} CHARACTER SET {} COLLATE {}",
        escape_identifier(database),
        settings.charset(),
        settings.collation()
    )
}

/// Statements run on every new connection.
///
/// `SET NAMES` always; `SET time_zone` unless the timezone is `local`, which
/// keeps the server default. `Z` means UTC.
pub fn session_init(settings: &AdapterSettings) -> Vec<String> {
    let mut init = vec![format!(
        "SET NAMES {} COLLATE {}",
        settings.charset(),
        settings.collation()
    )];
    let timezone = settings.timezone.trim();
    if !timezone.is_empty() && !timezone.eq_ignore_ascii_case("local") {
        let zone = if timezone.eq_ignore_ascii_case("z") {
            "+00:00"
        } else {
            timezone
        };
        init.push(format!("SET time_zone = {}", escape_string(zone)));
    }
    init
}

/// Whether a server error should trigger `CREATE DATABASE` and a retry.
pub fn should_create_database(code: u16, settings: &AdapterSettings) -> bool {
    code == ER_BAD_DB_ERROR && settings.create_database_on_error && settings.database.is_some()
}

fn returns_rows(sql: &str) -> bool {
    let keyword = sql
        .trim_start_matches(|c: char| c.is_whitespace() || c == '(')
        .split(|c: char| c.is_whitespace() || c == '(')
        .next()
        .unwrap_or_default()
        .to_ascii_uppercase();
    matches!(
        keyword.as_str(),
        "SELECT" | "SHOW" | "DESCRIBE" | "DESC" | "EXPLAIN" | "WITH"
    )
}

fn convert_row(row: &mysql_async::Row) -> Row {
    row.columns_ref()
        .iter()
        .enumerate()
        .map(|(i, column)| {
            let value = row
                .as_ref(i)
                .map(|raw| convert_value(raw, column.column_type()))
                .unwrap_or(Value::Null);
            (column.name_str().into_owned(), value)
        })
        .collect()
}

fn convert_value(raw: &mysql_async::Value, column_type: ColumnType) -> Value {
    use mysql_async::Value as Raw;

    match raw {
        Raw::NULL => Value::Null,
        Raw::Bytes(bytes) => {
            let text = String::from_utf8_lossy(bytes).into_owned();
            convert_text(text, column_type)
        }
        Raw::Int(i) => Value::Int(*i),
        Raw::UInt(u) => i64::try_from(*u)
            .map(Value::Int)
            .unwrap_or(Value::Float(*u as f64)),
        Raw::Float(f) => Value::Float(f64::from(*f)),
        Raw::Double(d) => Value::Float(*d),
        Raw::Date(year, month, day, hour, minute, second, micros) => {
            NaiveDate::from_ymd_opt(i32::from(*year), u32::from(*month), u32::from(*day))
                .and_then(|d| {
                    d.and_hms_micro_opt(
                        u32::from(*hour),
                        u32::from(*minute),
                        u32::from(*second),
                        *micros,
                    )
                })
                .map(|naive| Value::Date(naive.and_utc()))
                .unwrap_or(Value::Null)
        }
        Raw::Time(negative, days, hours, minutes, seconds, micros) => {
            let sign = if *negative { "-" } else { "" };
            let total_hours = u64::from(*days) * 24 + u64::from(*hours);
            Value::String(format!(
                "{sign}{total_hours:02}:{minutes:02}:{seconds:02}.{micros:06}"
            ))
        }
    }
}

/// Text protocol sends every value as bytes; recover numbers from the
/// column type.
fn convert_text(text: String, column_type: ColumnType) -> Value {
    match column_type {
        ColumnType::MYSQL_TYPE_TINY
        | ColumnType::MYSQL_TYPE_SHORT
        | ColumnType::MYSQL_TYPE_LONG
        | ColumnType::MYSQL_TYPE_INT24
        | ColumnType::MYSQL_TYPE_LONGLONG
        | ColumnType::MYSQL_TYPE_YEAR => match text.parse::<i64>() {
            Ok(i) => Value::Int(i),
            Err(_) => Value::String(text),
        },
        ColumnType::MYSQL_TYPE_FLOAT | ColumnType::MYSQL_TYPE_DOUBLE => {
            match text.parse::<f64>() {
                Ok(f) => Value::Float(f),
                Err(_) => Value::String(text),
            }
        }
        _ => Value::String(text),
    }
}

fn map_error(err: mysql_async::Error) -> GatewayError {
    match err {
        mysql_async::Error::Server(e) if e.code == ER_NO_SUCH_TABLE => {
            GatewayError::NoSuchTable(e.message)
        }
        mysql_async::Error::Server(e) => GatewayError::Server {
            code: e.code,
            message: e.message,
        },
        mysql_async::Error::Driver(e) => GatewayError::Protocol(e.to_string()),
        other => GatewayError::Connection(other.to_string()),
    }
}
