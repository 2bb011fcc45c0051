//! Measurement filtering.
//!
//! Every inbound batch is filtered against the ownership table before it
//! reaches a subscriber or the merged pull view: a provider may race a
//! just-applied recompute and still report fields it has lost (or never
//! had). Filtering here is what makes the pull-path union overwrite-free.

use crate::merge::MergedSchema;
use statmux_types::{FieldKey, FieldValue, ProviderId};
use std::collections::HashMap;

/// Drops every key in `values` that `provider` does not currently own.
#[must_use]
pub fn filter_owned(
    provider: &ProviderId,
    mut values: HashMap<FieldKey, FieldValue>,
    schema: &MergedSchema,
) -> HashMap<FieldKey, FieldValue> {
    values.retain(|key, _| schema.is_owned_by(key, provider));
    values
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge::merge_schemas;
    use serde_json::json;
    use statmux_types::{FieldSchema, FieldType};

    fn schema_of(keys: &[&str]) -> HashMap<FieldKey, FieldSchema> {
        keys.iter()
            .map(|k| (FieldKey::new(*k), FieldSchema::new(FieldType::Float)))
            .collect()
    }

    fn values_of(entries: &[(&str, serde_json::Value)]) -> HashMap<FieldKey, FieldValue> {
        entries
            .iter()
            .map(|(k, v)| (FieldKey::new(*k), v.clone()))
            .collect()
    }

    #[test]
    fn strips_fields_owned_by_a_higher_priority_provider() {
        let merged = merge_schemas(&[
            (ProviderId::new("A"), schema_of(&["speed", "fuel"])),
            (ProviderId::new("B"), schema_of(&["fuel", "rpm"])),
        ]);

        let filtered = filter_owned(
            &ProviderId::new("B"),
            values_of(&[("fuel", json!(10)), ("rpm", json!(3000))]),
            &merged,
        );

        assert_eq!(filtered, values_of(&[("rpm", json!(3000))]));
    }

    #[test]
    fn strips_fields_the_provider_never_declared() {
        let merged = merge_schemas(&[(ProviderId::new("A"), schema_of(&["speed"]))]);

        let filtered = filter_owned(
            &ProviderId::new("B"),
            values_of(&[("speed", json!(50)), ("altitude", json!(120))]),
            &merged,
        );

        assert!(filtered.is_empty());
    }

    #[test]
    fn owner_keeps_all_its_fields() {
        let merged = merge_schemas(&[(ProviderId::new("A"), schema_of(&["speed", "fuel"]))]);
        let values = values_of(&[("speed", json!(50)), ("fuel", json!(32.5))]);

        let filtered = filter_owned(&ProviderId::new("A"), values.clone(), &merged);
        assert_eq!(filtered, values);
    }
}
