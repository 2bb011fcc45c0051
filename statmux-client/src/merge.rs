//! Schema merge and field ownership.
//!
//! The merged schema is always rebuilt wholesale from every connected
//! provider's current declarations, never patched incrementally. Rebuilding
//! from scratch is what keeps the ownership table consistent across
//! arbitrary connect/disconnect interleavings.

use statmux_types::{FieldKey, FieldSchema, ProviderId};
use std::collections::HashMap;

/// The externally visible, de-duplicated field catalog plus the ownership
/// table. Published atomically as one unit; readers never observe a
/// half-built table.
///
/// Invariant: `fields` and `owners` hold exactly the same key set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergedSchema {
    /// Winning declaration per field.
    pub fields: HashMap<FieldKey, FieldSchema>,
    /// Owning provider per field.
    pub owners: HashMap<FieldKey, ProviderId>,
}

impl MergedSchema {
    /// The provider currently authoritative for a field.
    #[must_use]
    pub fn owner(&self, key: &FieldKey) -> Option<&ProviderId> {
        self.owners.get(key)
    }

    /// Whether `provider` currently owns `key`.
    #[must_use]
    pub fn is_owned_by(&self, key: &FieldKey, provider: &ProviderId) -> bool {
        self.owners.get(key).is_some_and(|owner| owner == provider)
    }

    /// The winning declaration for a field.
    #[must_use]
    pub fn field(&self, key: &FieldKey) -> Option<&FieldSchema> {
        self.fields.get(key)
    }

    /// Number of merged fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the merged view is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Merges per-provider schemas. `contributions` must be ordered by
/// priority, highest first.
///
/// Ownership and the published declaration are both first-wins: the first
/// provider declaring a key owns it and its declaration is the one
/// advertised. A lower-priority declaration for an already-claimed key is
/// discarded entirely; its values would never survive filtering, so
/// advertising its metadata would describe values the caller can never
/// receive.
#[must_use]
pub fn merge_schemas(
    contributions: &[(ProviderId, HashMap<FieldKey, FieldSchema>)],
) -> MergedSchema {
    let mut merged = MergedSchema::default();
    for (provider, schema) in contributions {
        for (key, declaration) in schema {
            if !merged.owners.contains_key(key) {
                merged.owners.insert(key.clone(), provider.clone());
                merged.fields.insert(key.clone(), declaration.clone());
            }
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use statmux_types::FieldType;

    fn schema_of(keys: &[&str]) -> HashMap<FieldKey, FieldSchema> {
        keys.iter()
            .map(|k| (FieldKey::new(*k), FieldSchema::new(FieldType::Float)))
            .collect()
    }

    #[test]
    fn first_declarer_owns_shared_keys() {
        let merged = merge_schemas(&[
            (ProviderId::new("A"), schema_of(&["speed", "fuel"])),
            (ProviderId::new("B"), schema_of(&["fuel", "rpm"])),
        ]);

        assert_eq!(merged.owner(&FieldKey::new("speed")).unwrap().as_str(), "A");
        assert_eq!(merged.owner(&FieldKey::new("fuel")).unwrap().as_str(), "A");
        assert_eq!(merged.owner(&FieldKey::new("rpm")).unwrap().as_str(), "B");
        assert_eq!(merged.len(), 3);
    }

    #[test]
    fn dropping_a_contributor_releases_its_fields() {
        // Same providers as above with A gone: B claims fuel, speed vanishes.
        let merged = merge_schemas(&[(ProviderId::new("B"), schema_of(&["fuel", "rpm"]))]);

        assert_eq!(merged.owner(&FieldKey::new("fuel")).unwrap().as_str(), "B");
        assert_eq!(merged.owner(&FieldKey::new("speed")), None);
        assert_eq!(merged.field(&FieldKey::new("speed")), None);
    }

    #[test]
    fn winning_declaration_is_first_wins_too() {
        let a_fuel: HashMap<_, _> = [(
            FieldKey::new("fuel"),
            FieldSchema::new(FieldType::Float).with_unit("l"),
        )]
        .into();
        let b_fuel: HashMap<_, _> = [(
            FieldKey::new("fuel"),
            FieldSchema::new(FieldType::Integer).with_unit("%"),
        )]
        .into();

        let merged = merge_schemas(&[
            (ProviderId::new("A"), a_fuel),
            (ProviderId::new("B"), b_fuel),
        ]);

        let fuel = merged.field(&FieldKey::new("fuel")).unwrap();
        assert_eq!(fuel.value_type, FieldType::Float);
        assert_eq!(fuel.unit.as_deref(), Some("l"));
    }

    #[test]
    fn fields_and_owners_share_one_key_set() {
        let merged = merge_schemas(&[
            (ProviderId::new("A"), schema_of(&["x", "y"])),
            (ProviderId::new("B"), schema_of(&["y", "z"])),
            (ProviderId::new("C"), schema_of(&["x", "z", "w"])),
        ]);

        let field_keys: std::collections::BTreeSet<_> = merged.fields.keys().collect();
        let owner_keys: std::collections::BTreeSet<_> = merged.owners.keys().collect();
        assert_eq!(field_keys, owner_keys);
    }

    #[test]
    fn empty_contributions_merge_to_empty() {
        assert!(merge_schemas(&[]).is_empty());
        assert!(merge_schemas(&[(ProviderId::new("A"), HashMap::new())]).is_empty());
    }
}
