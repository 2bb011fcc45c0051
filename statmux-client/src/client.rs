//! The aggregation engine and its host-facing surface.

use crate::connector::Connector;
use crate::discovery::Discovery;
use crate::error::ClientResult;
use crate::fanout::{Subscriber, SubscriberSet};
use crate::merge::{merge_schemas, MergedSchema};
use crate::pipeline::filter_owned;
use crate::registry::ProviderRegistry;
use crate::supervisor::{self, ConnectionState};
use chrono::{DateTime, Utc};
use statmux_types::{FieldKey, FieldSchema, FieldValue, ProviderId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex, RwLock};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Engine configuration.
#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    /// Providers in priority order; earlier entries win shared fields.
    pub providers: Vec<ProviderId>,
}

impl ClientConfig {
    /// Creates a configuration from an ordered provider list.
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

/// Snapshot of one configured provider's connection state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderStatus {
    /// The provider.
    pub provider: ProviderId,
    /// Its current connection state.
    pub state: ConnectionState,
    /// Fields it declared at the most recent recompute it contributed to.
    pub declared_fields: usize,
}

pub(crate) struct ProviderLink {
    pub(crate) state: ConnectionState,
    /// Last-known schema, refreshed on every recompute this provider
    /// contributes to; cleared on disconnect.
    pub(crate) last_schema: HashMap<FieldKey, FieldSchema>,
}

/// State shared between the client surface, the supervision tasks, and
/// push listeners.
///
/// The merged schema and ownership table are published together behind one
/// lock and swapped wholesale; the recompute gate serializes
/// fetch → rebuild → publish → notify so subscribers observe a
/// schema-changed notification strictly before any measurement
/// notification filtered against the new table. No await happens while a
/// std lock is held.
pub(crate) struct Shared {
    connector: Arc<dyn Connector>,
    registry: RwLock<ProviderRegistry>,
    schema: RwLock<Arc<MergedSchema>>,
    links: RwLock<HashMap<ProviderId, ProviderLink>>,
    subscribers: SubscriberSet,
    recompute_gate: Mutex<()>,
}

impl Shared {
    pub(crate) fn connector(&self) -> &Arc<dyn Connector> {
        &self.connector
    }

    fn schema_snapshot(&self) -> Arc<MergedSchema> {
        self.schema.read().expect("schema lock poisoned").clone()
    }

    /// Updates a provider's connection state, returning the previous one.
    /// Dropping to `Unbound` also drops the provider's schema contribution.
    pub(crate) fn set_link_state(
        &self,
        provider: &ProviderId,
        state: ConnectionState,
    ) -> Option<ConnectionState> {
        let mut links = self.links.write().expect("link lock poisoned");
        let link = links.entry(provider.clone()).or_insert(ProviderLink {
            state,
            last_schema: HashMap::new(),
        });
        let previous = std::mem::replace(&mut link.state, state);
        if state == ConnectionState::Unbound {
            link.last_schema.clear();
        }
        Some(previous)
    }

    fn connected_in_priority_order(&self) -> Vec<ProviderId> {
        let registry = self.registry.read().expect("registry lock poisoned");
        let links = self.links.read().expect("link lock poisoned");
        registry
            .order()
            .iter()
            .filter(|p| links.get(*p).is_some_and(|l| l.state == ConnectionState::Connected))
            .cloned()
            .collect()
    }

    /// Rebuilds and publishes the merged schema from every connected
    /// provider's current declarations.
    pub(crate) async fn recompute_schema(&self) {
        let _gate = self.recompute_gate.lock().await;

        let mut contributions: Vec<(ProviderId, HashMap<FieldKey, FieldSchema>)> = Vec::new();
        for provider in self.connected_in_priority_order() {
            match self.connector.fetch_schema(&provider).await {
                Ok(schema) => contributions.push((provider, schema)),
                Err(error) => {
                    // Contributes nothing this round; not fatal to the
                    // recompute or to other providers.
                    warn!(%provider, %error, "schema fetch failed");
                }
            }
        }

        let merged = merge_schemas(&contributions);
        debug!(fields = merged.len(), providers = contributions.len(), "publishing merged schema");

        {
            let mut links = self.links.write().expect("link lock poisoned");
            for (provider, schema) in contributions {
                if let Some(link) = links.get_mut(&provider) {
                    link.last_schema = schema;
                }
            }
        }
        *self.schema.write().expect("schema lock poisoned") = Arc::new(merged);

        self.subscribers.notify_schema_changed();
    }

    /// Filters one provider's pushed batch against current ownership and
    /// fans it out as a discrete event.
    pub(crate) async fn deliver_measurements(
        &self,
        provider: &ProviderId,
        timestamp: DateTime<Utc>,
        values: HashMap<FieldKey, FieldValue>,
    ) {
        // Taking the recompute gate orders this delivery after any
        // recompute whose table it is filtered against.
        let _gate = self.recompute_gate.lock().await;
        let schema = self.schema_snapshot();
        let owned = filter_owned(provider, values, &schema);
        self.subscribers.notify_measurements(provider, timestamp, &owned);
    }
}

/// Aggregates live telemetry from multiple providers into one
/// de-duplicated stream.
///
/// Construction validates the configured priority order; `start()` issues
/// one connection attempt per provider and returns immediately. All
/// provider traffic is handled on per-provider supervision tasks.
pub struct StatsClient {
    shared: Arc<Shared>,
    tasks: StdMutex<HashMap<ProviderId, JoinHandle<()>>>,
}

impl StatsClient {
    /// Creates an engine over the given connector.
    ///
    /// Fails with `ClientError::Configuration` if the provider order
    /// contains duplicate identifiers.
    pub fn new(config: ClientConfig, connector: Arc<dyn Connector>) -> ClientResult<Self> {
        let registry = ProviderRegistry::new(config.providers)?;
        Ok(Self {
            shared: Arc::new(Shared {
                connector,
                registry: RwLock::new(registry),
                schema: RwLock::new(Arc::new(MergedSchema::default())),
                links: RwLock::new(HashMap::new()),
                subscribers: SubscriberSet::default(),
                recompute_gate: Mutex::new(()),
            }),
            tasks: StdMutex::new(HashMap::new()),
        })
    }

    /// Creates an engine configured from a discovery source.
    pub async fn from_discovery(
        connector: Arc<dyn Connector>,
        discovery: &dyn Discovery,
    ) -> ClientResult<Self> {
        let providers = discovery.list_candidate_providers().await;
        Self::new(ClientConfig { providers }, connector)
    }

    /// Issues one connection attempt per configured provider. A no-op if
    /// the engine is already running.
    pub fn start(&self) {
        let mut tasks = self.tasks.lock().expect("task lock poisoned");
        if !tasks.is_empty() {
            debug!("already started");
            return;
        }
        let order = self
            .shared
            .registry
            .read()
            .expect("registry lock poisoned")
            .order()
            .to_vec();
        info!(providers = order.len(), "starting");
        for provider in order {
            let task = tokio::spawn(supervisor::supervise(self.shared.clone(), provider.clone()));
            tasks.insert(provider, task);
        }
    }

    /// Releases every connection and listener registration.
    ///
    /// Safe to call mid-connection and without a prior `start()`;
    /// idempotent. Listener unregistration is best-effort: a provider that
    /// fails it is logged and released anyway.
    pub async fn stop(&self) {
        let tasks: Vec<JoinHandle<()>> = {
            let mut tasks = self.tasks.lock().expect("task lock poisoned");
            tasks.drain().map(|(_, task)| task).collect()
        };
        // Await the aborted tasks so their event streams are closed before
        // the teardown below runs.
        for task in tasks {
            task.abort();
            let _ = task.await;
        }

        let _gate = self.shared.recompute_gate.lock().await;

        let connected: Vec<ProviderId> = {
            let links = self.shared.links.read().expect("link lock poisoned");
            links
                .iter()
                .filter(|(_, link)| link.state == ConnectionState::Connected)
                .map(|(provider, _)| provider.clone())
                .collect()
        };
        for provider in connected {
            if let Err(error) = self.shared.connector.unregister_push_listener(&provider).await {
                warn!(%provider, %error, "listener unregistration failed");
            }
        }

        self.shared.links.write().expect("link lock poisoned").clear();
        *self.shared.schema.write().expect("schema lock poisoned") =
            Arc::new(MergedSchema::default());
        info!("stopped");
    }

    /// Replaces the configured provider order, tearing down all dependent
    /// state. Restarts automatically if the engine was running.
    pub async fn reconfigure(&self, providers: Vec<ProviderId>) -> ClientResult<()> {
        let registry = ProviderRegistry::new(providers)?;
        let was_running = !self.tasks.lock().expect("task lock poisoned").is_empty();
        self.stop().await;
        *self.shared.registry.write().expect("registry lock poisoned") = registry;
        if was_running {
            self.start();
        }
        Ok(())
    }

    /// Read-only snapshot of the merged schema and ownership table.
    #[must_use]
    pub fn merged_schema(&self) -> Arc<MergedSchema> {
        self.shared.schema_snapshot()
    }

    /// Synchronously asks every connected provider for its latest snapshot
    /// and unions the ownership-filtered results.
    ///
    /// A provider that errors is skipped; the remaining providers' partial
    /// result is still returned.
    pub async fn merged_measurements(&self) -> HashMap<FieldKey, FieldValue> {
        let schema = self.shared.schema_snapshot();
        let mut merged = HashMap::new();
        for provider in self.shared.connected_in_priority_order() {
            match self.shared.connector.fetch_measurements(&provider).await {
                Ok(values) => {
                    merged.extend(filter_owned(&provider, values, &schema));
                }
                Err(error) => {
                    warn!(%provider, %error, "measurement fetch failed");
                }
            }
        }
        merged
    }

    /// Registers a subscriber. Registrations are identity-based.
    pub fn subscribe(&self, subscriber: Arc<dyn Subscriber>) {
        self.shared.subscribers.subscribe(subscriber);
    }

    /// Removes a subscriber by identity.
    pub fn unsubscribe(&self, subscriber: &Arc<dyn Subscriber>) {
        self.shared.subscribers.unsubscribe(subscriber);
    }

    /// Connection state of every configured provider, in priority order.
    #[must_use]
    pub fn provider_states(&self) -> Vec<ProviderStatus> {
        let registry = self.shared.registry.read().expect("registry lock poisoned");
        let links = self.shared.links.read().expect("link lock poisoned");
        registry
            .order()
            .iter()
            .map(|provider| {
                let link = links.get(provider);
                ProviderStatus {
                    provider: provider.clone(),
                    state: link.map_or(ConnectionState::Unbound, |l| l.state),
                    declared_fields: link.map_or(0, |l| l.last_schema.len()),
                }
            })
            .collect()
    }
}
