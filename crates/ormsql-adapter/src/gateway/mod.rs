//! The seam between compiled SQL and a live MySQL server.
//!
//! The adapter never talks to a driver directly. It hands finished statements
//! to a [`ConnectionGateway`] and reads back either rows or an affected-row
//! count. [`RecordingGateway`] answers from memory for tests; the `mysql`
//! feature adds a gateway backed by `mysql_async`.

mod memory;
#[cfg(feature = "mysql")]
mod mysql;

pub use memory::RecordingGateway;
#[cfg(feature = "mysql")]
pub use mysql::{ConnectionState, MySqlGateway};

use async_trait::async_trait;
use ormsql_core::{escape_identifier, escape_string, FieldInfo, IndexEntry, Row};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors reported by a gateway.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// Could not reach the server or obtain a connection.
    #[error("connection failed: {0}")]
    Connection(String),

    /// The statement referenced a table that does not exist.
    #[error("table does not exist: {0}")]
    NoSuchTable(String),

    /// The server rejected the statement.
    #[error("server error {code}: {message}")]
    Server {
        /// MySQL error number.
        code: u16,
        /// Server message.
        message: String,
    },

    /// The server answered with something the gateway could not interpret.
    #[error("protocol error: {0}")]
    Protocol(String),
}

/// Result of a write statement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecInfo {
    /// Rows changed by the statement.
    pub affected_rows: u64,
    /// Auto-increment id generated by an insert, if any.
    pub insert_id: Option<u64>,
}

impl ExecInfo {
    /// An `ExecInfo` with only a row count.
    pub fn affected(rows: u64) -> Self {
        Self {
            affected_rows: rows,
            insert_id: None,
        }
    }

    /// An `ExecInfo` for an insert that generated `id`.
    pub fn inserted(id: u64) -> Self {
        Self {
            affected_rows: 1,
            insert_id: Some(id),
        }
    }
}

/// What a statement produced.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutput {
    /// Result rows of a read.
    Rows(Vec<Row>),
    /// Outcome of a write.
    Affected(ExecInfo),
}

impl QueryOutput {
    /// The rows, if this is a read result.
    pub fn into_rows(self) -> Option<Vec<Row>> {
        match self {
            QueryOutput::Rows(rows) => Some(rows),
            QueryOutput::Affected(_) => None,
        }
    }

    /// The write outcome, if this is a write result.
    pub fn into_affected(self) -> Option<ExecInfo> {
        match self {
            QueryOutput::Affected(info) => Some(info),
            QueryOutput::Rows(_) => None,
        }
    }
}

/// Executes SQL against a server.
///
/// Implementations must be shareable across tasks; the adapter issues bulk
/// updates concurrently through one gateway.
#[async_trait]
pub trait ConnectionGateway: Send + Sync {
    /// Execute one statement.
    async fn execute(&self, sql: &str) -> Result<QueryOutput, GatewayError>;

    /// Quote a string literal the way this connection would.
    ///
    /// Informational only. Statements the adapter sends are built by
    /// `ormsql-core`, which always quotes with [`escape_string`], so an
    /// override here does not change generated SQL.
    fn escape(&self, value: &str) -> String {
        escape_string(value)
    }

    /// Column descriptions of `table`, in table order.
    async fn introspect_fields(&self, table: &str) -> Result<Vec<FieldInfo>, GatewayError> {
        let sql = format!("SHOW FIELDS FROM {}", escape_identifier(table));
        let rows = expect_rows(self.execute(&sql).await?)?;
        rows.iter()
            .map(|row| FieldInfo::from_row(row).map_err(|e| GatewayError::Protocol(e.to_string())))
            .collect()
    }

    /// Index membership rows of `table`.
    async fn introspect_indexes(&self, table: &str) -> Result<Vec<IndexEntry>, GatewayError> {
        let sql = format!("SHOW INDEXES FROM {}", escape_identifier(table));
        let rows = expect_rows(self.execute(&sql).await?)?;
        rows.iter()
            .map(|row| IndexEntry::from_row(row).map_err(|e| GatewayError::Protocol(e.to_string())))
            .collect()
    }
}

fn expect_rows(output: QueryOutput) -> Result<Vec<Row>, GatewayError> {
    output
        .into_rows()
        .ok_or_else(|| GatewayError::Protocol("introspection returned no result set".into()))
}
