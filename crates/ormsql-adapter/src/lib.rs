//! ormsql adapter - async MySQL persistence for declared models.
//!
//! Wraps `ormsql-core` compilation with a model registry, id generation,
//! concurrent bulk updates and schema migration, executing everything
//! through a [`ConnectionGateway`].
//!
//! # Example
//!
//! ```ignore
//! use ormsql_adapter::{Adapter, AdapterSettings, MySqlGateway};
//!
//! let settings = AdapterSettings::new("shop").with_credentials("app", "secret");
//! let gateway = MySqlGateway::connect(settings.clone()).await?;
//! let adapter = Adapter::new(gateway, settings);
//! adapter.define(person_model())?;
//! adapter.autoupdate().await?;
//! ```

pub mod adapter;
pub mod config;
pub mod error;
pub mod gateway;
pub mod id;
pub mod registry;

pub use adapter::Adapter;
pub use config::AdapterSettings;
pub use error::{AdapterError, BulkUpdateError, Result};
pub use gateway::{ConnectionGateway, ExecInfo, GatewayError, QueryOutput, RecordingGateway};
#[cfg(feature = "mysql")]
pub use gateway::{ConnectionState, MySqlGateway};
pub use id::generate_id;
pub use registry::ModelRegistry;
