//! Measurement batches.
//!
//! A batch is one provider's timestamped snapshot of field values. Batches
//! are ephemeral: the engine filters and delivers them, nothing retains
//! them.

use crate::{FieldKey, ProviderId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A single reported value. Opaque to the engine beyond what the schema
/// declares.
pub type FieldValue = serde_json::Value;

/// One provider's timestamped snapshot of field values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementBatch {
    /// The provider that reported the batch.
    pub provider: ProviderId,
    /// When the provider sampled the values.
    pub timestamp: DateTime<Utc>,
    /// Reported values, keyed by field.
    pub values: HashMap<FieldKey, FieldValue>,
}

impl MeasurementBatch {
    /// Creates a batch.
    pub fn new(
        provider: ProviderId,
        timestamp: DateTime<Utc>,
        values: HashMap<FieldKey, FieldValue>,
    ) -> Self {
        Self {
            provider,
            timestamp,
            values,
        }
    }

    /// Whether the batch carries no values.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
