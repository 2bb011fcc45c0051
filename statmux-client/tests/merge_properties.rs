//! Property-based tests for schema merge and ownership filtering.
//!
//! Verifies the ownership invariants over arbitrary provider sets and
//! priority orders:
//! - every merged key has exactly one owner
//! - the owner is the highest-priority provider declaring the key
//! - filtering keeps exactly the sender's owned keys

use proptest::prelude::*;
use statmux_client::{filter_owned, merge_schemas};
use statmux_types::{FieldKey, FieldSchema, FieldType, FieldValue, ProviderId};
use std::collections::{HashMap, HashSet};

fn schema_strategy() -> impl Strategy<Value = HashMap<FieldKey, FieldSchema>> {
    // A small key alphabet forces plenty of overlap between providers.
    prop::collection::hash_map(
        prop::string::string_regex("[a-e]{1,2}")
            .unwrap()
            .prop_map(FieldKey::new),
        Just(FieldSchema::new(FieldType::Float)),
        0..6,
    )
}

fn contributions_strategy() -> impl Strategy<Value = Vec<(ProviderId, HashMap<FieldKey, FieldSchema>)>>
{
    prop::collection::vec(schema_strategy(), 0..5).prop_map(|schemas| {
        schemas
            .into_iter()
            .enumerate()
            .map(|(rank, schema)| (ProviderId::new(format!("p{rank}")), schema))
            .collect()
    })
}

proptest! {
    #[test]
    fn every_key_is_owned_by_its_highest_priority_declarer(
        contributions in contributions_strategy(),
    ) {
        let merged = merge_schemas(&contributions);

        for (key, owner) in &merged.owners {
            let first_declarer = contributions
                .iter()
                .find(|(_, schema)| schema.contains_key(key))
                .map(|(provider, _)| provider);
            prop_assert_eq!(Some(owner), first_declarer);
        }
    }

    #[test]
    fn merged_fields_and_owners_cover_exactly_the_declared_keys(
        contributions in contributions_strategy(),
    ) {
        let merged = merge_schemas(&contributions);

        let declared: HashSet<FieldKey> = contributions
            .iter()
            .flat_map(|(_, schema)| schema.keys().cloned())
            .collect();

        prop_assert_eq!(merged.fields.len(), merged.owners.len());
        prop_assert_eq!(merged.fields.len(), declared.len());
        for key in &declared {
            prop_assert!(merged.owners.contains_key(key));
            prop_assert!(merged.fields.contains_key(key));
        }
    }

    #[test]
    fn filter_keeps_exactly_the_senders_owned_keys(
        contributions in contributions_strategy(),
        sender_rank in 0usize..5,
    ) {
        let merged = merge_schemas(&contributions);
        let sender = ProviderId::new(format!("p{sender_rank}"));

        // The sender reports every declared key, including ones it lost
        // or never had.
        let values: HashMap<FieldKey, FieldValue> = merged
            .owners
            .keys()
            .map(|key| (key.clone(), serde_json::json!(1)))
            .collect();

        let filtered = filter_owned(&sender, values.clone(), &merged);

        for key in values.keys() {
            prop_assert_eq!(
                filtered.contains_key(key),
                merged.is_owned_by(key, &sender)
            );
        }
    }
}
