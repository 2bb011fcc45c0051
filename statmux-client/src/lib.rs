//! Priority-ordered telemetry aggregation client.
//!
//! Aggregates live telemetry from multiple independent, dynamically
//! discovered providers into one consistent, de-duplicated stream. Each
//! provider publishes a schema (the fields it can report) and measurement
//! batches; providers may overlap, and the engine picks exactly one
//! authoritative source per field from the configured priority order.
//!
//! # Components
//!
//! - **Connector**: injected seam to reach provider processes; owns
//!   retry/timeout policy
//! - **Registry**: the configured priority order
//! - **Supervisor**: per-provider connection lifecycle
//! - **Merge**: wholesale schema rebuild with first-wins field ownership
//! - **Pipeline**: ownership filtering of measurement batches
//! - **Fan-out**: subscriber notification with contained callback failures
//!
//! # Example
//!
//! ```
//! use statmux_client::connector::mock::MockConnector;
//! use statmux_client::{ClientConfig, StatsClient};
//! use std::sync::Arc;
//!
//! let connector = Arc::new(MockConnector::new());
//! let client = StatsClient::new(ClientConfig::new(["obd2", "gps"]), connector)
//!     .expect("valid configuration");
//! assert!(client.merged_schema().is_empty());
//! ```

mod client;
pub mod connector;
pub mod discovery;
mod error;
mod fanout;
mod merge;
mod pipeline;
mod registry;
mod supervisor;

pub use client::{ClientConfig, ProviderStatus, StatsClient};
pub use connector::{Connector, ConnectorError, ConnectorResult, LinkEvent, PushListener};
pub use discovery::{Discovery, StaticDiscovery};
pub use error::{ClientError, ClientResult, SubscriberError};
pub use fanout::Subscriber;
pub use merge::{merge_schemas, MergedSchema};
pub use pipeline::filter_owned;
pub use registry::ProviderRegistry;
pub use supervisor::ConnectionState;
