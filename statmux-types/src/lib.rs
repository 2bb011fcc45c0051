//! Core type definitions for statmux.
//!
//! This crate defines the provider-agnostic types shared by the aggregation
//! engine and connector implementations:
//! - Provider and field identifiers (stable, externally assigned strings)
//! - Field schema declarations (type, unit, display metadata)
//! - Measurement batches (one provider's timestamped snapshot)
//!
//! Field values are carried as opaque JSON values; the engine routes and
//! filters them but never interprets them beyond what the schema declares.

mod ids;
mod measurement;
mod schema;

pub use ids::{FieldKey, ProviderId};
pub use measurement::{FieldValue, MeasurementBatch};
pub use schema::{FieldSchema, FieldType};
