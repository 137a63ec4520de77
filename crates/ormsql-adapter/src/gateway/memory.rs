//! In-memory gateway that records statements instead of executing them.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{ConnectionGateway, ExecInfo, GatewayError, QueryOutput};

type Responder = dyn Fn(&str) -> Result<QueryOutput, GatewayError> + Send + Sync;

/// A gateway that logs every statement and answers through a closure.
///
/// Without a responder every statement succeeds with zero affected rows.
#[derive(Clone)]
pub struct RecordingGateway {
    log: Arc<Mutex<Vec<String>>>,
    responder: Arc<Responder>,
}

impl RecordingGateway {
    /// Create a gateway that accepts everything.
    pub fn new() -> Self {
        Self::with_responder(|_| Ok(QueryOutput::Affected(ExecInfo::default())))
    }

    /// Create a gateway that answers each statement with `responder`.
    pub fn with_responder<F>(responder: F) -> Self
    where
        F: Fn(&str) -> Result<QueryOutput, GatewayError> + Send + Sync + 'static,
    {
        Self {
            log: Arc::new(Mutex::new(Vec::new())),
            responder: Arc::new(responder),
        }
    }

    /// Statements executed so far, in order.
    pub fn executed(&self) -> Vec<String> {
        self.log.lock().clone()
    }

    /// Forget the recorded statements.
    pub fn clear(&self) {
        self.log.lock().clear();
    }
}

impl Default for RecordingGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RecordingGateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordingGateway")
            .field("executed", &self.log.lock().len())
            .finish()
    }
}

#[async_trait]
impl ConnectionGateway for RecordingGateway {
    async fn execute(&self, sql: &str) -> Result<QueryOutput, GatewayError> {
        self.log.lock().push(sql.to_string());
        (self.responder)(sql)
    }
}
