//! Field schema declarations.
//!
//! A provider publishes one `FieldSchema` per field it can report. The
//! engine passes the metadata through untouched; only the merge step cares
//! about which provider's declaration wins for a shared key.

use serde::{Deserialize, Serialize};

/// Declared value type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Boolean,
    Integer,
    Float,
    Text,
}

/// A provider's declaration for a single field.
///
/// Everything besides the declared type is optional display metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSchema {
    /// Declared value type.
    pub value_type: FieldType,
    /// Unit of measurement, if any (e.g. `km/h`, `%`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    /// Human-readable description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Smallest expected value, for display scaling.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    /// Largest expected value, for display scaling.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

impl FieldSchema {
    /// Creates a schema declaring only a value type.
    #[must_use]
    pub fn new(value_type: FieldType) -> Self {
        Self {
            value_type,
            unit: None,
            description: None,
            min: None,
            max: None,
        }
    }

    /// Sets the unit.
    #[must_use]
    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the expected value range.
    #[must_use]
    pub fn with_range(mut self, min: f64, max: f64) -> Self {
        self.min = Some(min);
        self.max = Some(max);
        self
    }
}
