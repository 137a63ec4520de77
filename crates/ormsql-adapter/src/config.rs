//! Adapter settings.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AdapterError, Result};

/// Default server host.
pub const DEFAULT_HOST: &str = "localhost";

/// Default MySQL port.
pub const DEFAULT_PORT: u16 = 3306;

/// Default connection collation.
pub const DEFAULT_COLLATION: &str = "utf8mb4_general_ci";

/// Default connection character set.
pub const DEFAULT_CHARSET: &str = "utf8mb4";

/// Default pool size when pooling is enabled.
pub const DEFAULT_CONNECTION_LIMIT: usize = 10;

/// Default delay between connection attempts.
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_millis(6000);

/// Default timezone for date handling.
pub const DEFAULT_TIMEZONE: &str = "local";

/// Connection and migration settings for the adapter.
///
/// Deserializes from the camelCase JSON shape used by datasource configs:
///
/// ```json
/// {"host": "db", "username": "app", "database": "shop", "collation": "utf8mb4_bin"}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AdapterSettings {
    /// Server host name or address.
    pub host: String,

    /// Server port.
    pub port: u16,

    /// Login user.
    #[serde(alias = "username")]
    pub user: Option<String>,

    /// Login password.
    pub password: Option<String>,

    /// Database (schema) to use. Created on demand when
    /// `create_database_on_error` is set.
    pub database: Option<String>,

    /// Connection character set. Derived from `collation` when unset.
    pub charset: Option<String>,

    /// Connection collation. Derived from `charset` when unset.
    pub collation: Option<String>,

    /// Use a connection pool instead of a single connection.
    pub pool: bool,

    /// Maximum pooled connections.
    pub connection_limit: usize,

    /// Keep retrying the initial connection after a failure.
    pub retry_on_error: bool,

    /// Delay between connection attempts in milliseconds.
    pub retry_interval_ms: u64,

    /// Create the database when the server reports it unknown.
    pub create_database_on_error: bool,

    /// Suppress connection error logs below `debug`.
    pub silent_on_error: bool,

    /// Storage engine applied to models that declare none.
    pub engine: Option<String>,

    /// Session time zone (`local`, `Z`, or `+hh:mm`). The MySQL gateway sets
    /// it on every connection; `local` keeps the server default.
    pub timezone: String,
}

impl AdapterSettings {
    /// Create settings for a database on localhost.
    pub fn new(database: impl Into<String>) -> Self {
        Self::default().with_database(database)
    }

    /// Parse settings from a JSON document.
    pub fn from_json_str(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).map_err(|e| AdapterError::Config(e.to_string()))
    }

    /// Set the host.
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Set the port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the login credentials.
    pub fn with_credentials(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self.password = Some(password.into());
        self
    }

    /// Set the database.
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    /// Set the collation. The charset follows unless set explicitly.
    pub fn with_collation(mut self, collation: impl Into<String>) -> Self {
        self.collation = Some(collation.into());
        self
    }

    /// Set the character set.
    pub fn with_charset(mut self, charset: impl Into<String>) -> Self {
        self.charset = Some(charset.into());
        self
    }

    /// Enable pooling with at most `limit` connections.
    pub fn with_pool(mut self, limit: usize) -> Self {
        self.pool = true;
        self.connection_limit = limit;
        self
    }

    /// Configure connection retry.
    pub fn with_retry(mut self, enabled: bool, interval: Duration) -> Self {
        self.retry_on_error = enabled;
        self.retry_interval_ms = interval.as_millis() as u64;
        self
    }

    /// Toggle database creation on "unknown database".
    pub fn with_create_database(mut self, enabled: bool) -> Self {
        self.create_database_on_error = enabled;
        self
    }

    /// Set the default storage engine.
    pub fn with_engine(mut self, engine: impl Into<String>) -> Self {
        self.engine = Some(engine.into());
        self
    }

    /// Set the timezone.
    pub fn with_timezone(mut self, timezone: impl Into<String>) -> Self {
        self.timezone = timezone.into();
        self
    }

    /// Effective collation.
    pub fn collation(&self) -> String {
        match (&self.collation, &self.charset) {
            (Some(collation), _) => collation.clone(),
            (None, Some(charset)) => format!("{charset}_general_ci"),
            (None, None) => DEFAULT_COLLATION.to_string(),
        }
    }

    /// Effective character set: explicit, else the collation prefix.
    pub fn charset(&self) -> String {
        if let Some(charset) = &self.charset {
            return charset.clone();
        }
        match &self.collation {
            Some(collation) => collation
                .split('_')
                .next()
                .filter(|prefix| !prefix.is_empty())
                .unwrap_or(DEFAULT_CHARSET)
                .to_string(),
            None => DEFAULT_CHARSET.to_string(),
        }
    }

    /// Delay between connection attempts.
    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }

    /// Number of connections the gateway should hold.
    pub fn pool_size(&self) -> usize {
        if self.pool {
            self.connection_limit.max(1)
        } else {
            1
        }
    }
}

impl Default for AdapterSettings {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            user: None,
            password: None,
            database: None,
            charset: None,
            collation: None,
            pool: false,
            connection_limit: DEFAULT_CONNECTION_LIMIT,
            retry_on_error: true,
            retry_interval_ms: DEFAULT_RETRY_INTERVAL.as_millis() as u64,
            create_database_on_error: true,
            silent_on_error: false,
            engine: None,
            timezone: DEFAULT_TIMEZONE.to_string(),
        }
    }
}
