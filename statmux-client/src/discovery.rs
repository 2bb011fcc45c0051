//! Provider discovery seam.
//!
//! How candidate providers are found is the host platform's business; the
//! engine only needs an ordered identifier list, consulted at
//! configuration time.

use async_trait::async_trait;
use statmux_types::ProviderId;

/// Supplies the ordered candidate provider list.
#[async_trait]
pub trait Discovery: Send + Sync {
    /// Candidate providers in priority order, highest first.
    async fn list_candidate_providers(&self) -> Vec<ProviderId>;
}

/// A fixed, pre-ordered provider list.
#[derive(Debug, Clone, Default)]
pub struct StaticDiscovery {
    providers: Vec<ProviderId>,
}

impl StaticDiscovery {
    /// Creates a discovery source from a fixed list.
    pub fn new<I, P>(providers: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<ProviderId>,
    {
        Self {
            providers: providers.into_iter().map(Into::into).collect(),
        }
    }
}

#[async_trait]
impl Discovery for StaticDiscovery {
    async fn list_candidate_providers(&self) -> Vec<ProviderId> {
        self.providers.clone()
    }
}
