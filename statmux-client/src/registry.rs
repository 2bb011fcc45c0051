//! Provider registry: the configured priority order.

use crate::error::{ClientError, ClientResult};
use statmux_types::ProviderId;
use std::collections::HashSet;

/// Ordered set of configured providers.
///
/// Position is priority: index 0 is the highest-priority provider, and for
/// a field declared by several providers the earliest declarer wins. The
/// order is fixed for the registry's lifetime; reconfiguration builds a new
/// registry.
#[derive(Debug, Clone, Default)]
pub struct ProviderRegistry {
    order: Vec<ProviderId>,
}

impl ProviderRegistry {
    /// Builds a registry from an ordered provider list.
    ///
    /// Duplicate identifiers are a configuration error, reported here
    /// rather than silently resolved.
    pub fn new(order: Vec<ProviderId>) -> ClientResult<Self> {
        let mut seen = HashSet::new();
        for provider in &order {
            if !seen.insert(provider) {
                return Err(ClientError::Configuration(format!(
                    "duplicate provider id '{provider}'"
                )));
            }
        }
        Ok(Self { order })
    }

    /// The configured order, highest priority first.
    #[must_use]
    pub fn order(&self) -> &[ProviderId] {
        &self.order
    }

    /// Priority rank of a provider (0 = highest), if configured.
    #[must_use]
    pub fn rank(&self, provider: &ProviderId) -> Option<usize> {
        self.order.iter().position(|p| p == provider)
    }

    /// Whether the provider is configured.
    #[must_use]
    pub fn contains(&self, provider: &ProviderId) -> bool {
        self.order.iter().any(|p| p == provider)
    }

    /// Number of configured providers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether no providers are configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(names: &[&str]) -> Vec<ProviderId> {
        names.iter().map(|n| ProviderId::new(*n)).collect()
    }

    #[test]
    fn preserves_configured_order() {
        let registry = ProviderRegistry::new(ids(&["b", "a", "c"])).unwrap();
        let order: Vec<&str> = registry.order().iter().map(|p| p.as_str()).collect();
        assert_eq!(order, vec!["b", "a", "c"]);
    }

    #[test]
    fn rank_follows_position() {
        let registry = ProviderRegistry::new(ids(&["a", "b"])).unwrap();
        assert_eq!(registry.rank(&ProviderId::new("a")), Some(0));
        assert_eq!(registry.rank(&ProviderId::new("b")), Some(1));
        assert_eq!(registry.rank(&ProviderId::new("c")), None);
    }

    #[test]
    fn duplicate_ids_are_a_configuration_error() {
        let err = ProviderRegistry::new(ids(&["a", "b", "a"])).unwrap_err();
        assert!(matches!(err, ClientError::Configuration(_)));
        assert!(err.to_string().contains("duplicate provider id 'a'"));
    }

    #[test]
    fn empty_registry_is_valid() {
        let registry = ProviderRegistry::new(Vec::new()).unwrap();
        assert!(registry.is_empty());
        assert_eq!(registry.len(), 0);
    }
}
