//! Connector abstraction.
//!
//! Defines the seam between the engine and whatever IPC or transport binds
//! a provider process, so the aggregation logic is testable without any
//! real process boundary. The connector owns retry and timeout policy; the
//! engine only reacts to the events it is handed.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use statmux_types::{FieldKey, FieldSchema, FieldValue, ProviderId};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;

/// Result type alias for connector operations.
pub type ConnectorResult<T> = Result<T, ConnectorError>;

/// Errors reported by a connector for a single provider operation.
///
/// Always non-fatal to the engine: the operation is skipped and the
/// remaining providers continue unaffected.
#[derive(Debug, Error)]
pub enum ConnectorError {
    /// Provider unreachable for this operation.
    #[error("provider unavailable: {0}")]
    Unavailable(String),

    /// Provider reachable but refused a listener registration. The
    /// provider still answers direct fetches.
    #[error("listener registration rejected: {0}")]
    Rejected(String),
}

/// Connection lifecycle events delivered on a provider's event stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkEvent {
    /// The provider came up and answers requests.
    Connected,
    /// The provider went away, including abnormal termination.
    Disconnected,
}

/// Push callbacks a provider delivers after a successful listener
/// registration.
#[async_trait]
pub trait PushListener: Send + Sync {
    /// A new measurement batch from this provider.
    async fn on_measurements(
        &self,
        timestamp: DateTime<Utc>,
        values: HashMap<FieldKey, FieldValue>,
    );

    /// The provider changed the set of fields it reports.
    async fn on_schema_changed(&self);
}

/// Opaque per-provider channel to a provider process.
///
/// One logical channel per provider; events for different providers may be
/// delivered concurrently.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Issues a connection attempt and returns the provider's lifecycle
    /// event stream. The stream may never yield if the attempt never
    /// completes; the engine tolerates that.
    async fn connect(&self, provider: &ProviderId) -> ConnectorResult<mpsc::Receiver<LinkEvent>>;

    /// Fetches the provider's current schema declaration.
    async fn fetch_schema(
        &self,
        provider: &ProviderId,
    ) -> ConnectorResult<HashMap<FieldKey, FieldSchema>>;

    /// Fetches the provider's latest measurement snapshot.
    async fn fetch_measurements(
        &self,
        provider: &ProviderId,
    ) -> ConnectorResult<HashMap<FieldKey, FieldValue>>;

    /// Registers a push listener with the provider.
    async fn register_push_listener(
        &self,
        provider: &ProviderId,
        listener: Arc<dyn PushListener>,
    ) -> ConnectorResult<()>;

    /// Removes a previously registered push listener.
    async fn unregister_push_listener(&self, provider: &ProviderId) -> ConnectorResult<()>;
}

/// A scriptable connector for testing.
pub mod mock {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    struct MockProvider {
        schema: HashMap<FieldKey, FieldSchema>,
        measurements: HashMap<FieldKey, FieldValue>,
        reachable: bool,
        reject_listener: bool,
        events: Option<mpsc::Sender<LinkEvent>>,
        listener: Option<Arc<dyn PushListener>>,
    }

    impl Default for MockProvider {
        fn default() -> Self {
            Self {
                schema: HashMap::new(),
                measurements: HashMap::new(),
                reachable: true,
                reject_listener: false,
                events: None,
                listener: None,
            }
        }
    }

    /// In-memory connector with per-provider scripted behavior.
    ///
    /// Tests drive connection events through `signal_connected` /
    /// `signal_disconnected` and push notifications through
    /// `push_measurements` / `push_schema_changed`. The signal and push
    /// helpers wait briefly for the engine to reach the required state
    /// (connect issued, listener registered) so tests stay free of manual
    /// sleeps.
    #[derive(Default)]
    pub struct MockConnector {
        providers: Mutex<HashMap<ProviderId, MockProvider>>,
    }

    impl MockConnector {
        /// Creates an empty mock connector.
        pub fn new() -> Self {
            Self::default()
        }

        /// Sets the schema a provider will report.
        pub fn set_schema(&self, provider: &str, schema: HashMap<FieldKey, FieldSchema>) {
            let mut providers = self.providers.lock().unwrap();
            providers
                .entry(ProviderId::new(provider))
                .or_default()
                .schema = schema;
        }

        /// Sets the measurement snapshot a provider will report.
        pub fn set_measurements(&self, provider: &str, values: HashMap<FieldKey, FieldValue>) {
            let mut providers = self.providers.lock().unwrap();
            providers
                .entry(ProviderId::new(provider))
                .or_default()
                .measurements = values;
        }

        /// Makes every operation against the provider fail with
        /// `ConnectorError::Unavailable`.
        pub fn set_unreachable(&self, provider: &str, unreachable: bool) {
            let mut providers = self.providers.lock().unwrap();
            providers
                .entry(ProviderId::new(provider))
                .or_default()
                .reachable = !unreachable;
        }

        /// Makes listener registration fail with `ConnectorError::Rejected`
        /// while the provider keeps answering fetches.
        pub fn reject_listener(&self, provider: &str, reject: bool) {
            let mut providers = self.providers.lock().unwrap();
            providers
                .entry(ProviderId::new(provider))
                .or_default()
                .reject_listener = reject;
        }

        /// Whether a push listener is currently registered.
        pub fn listener_registered(&self, provider: &str) -> bool {
            let providers = self.providers.lock().unwrap();
            providers
                .get(provider)
                .is_some_and(|p| p.listener.is_some())
        }

        /// Delivers a `Connected` event on the provider's stream.
        pub async fn signal_connected(&self, provider: &str) {
            self.signal(provider, LinkEvent::Connected).await;
        }

        /// Delivers a `Disconnected` event on the provider's stream.
        pub async fn signal_disconnected(&self, provider: &str) {
            self.signal(provider, LinkEvent::Disconnected).await;
        }

        async fn signal(&self, provider: &str, event: LinkEvent) {
            // A send can fail against a channel left over from a previous
            // session (the engine was stopped and restarted); retry until a
            // fresh connect() replaces it.
            for _ in 0..400 {
                let sender = self.wait_for_link(provider).await;
                if sender.send(event).await.is_ok() {
                    return;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
            panic!("event stream for provider '{provider}' stayed closed");
        }

        /// Invokes the registered listener's measurement callback.
        pub async fn push_measurements(
            &self,
            provider: &str,
            timestamp: DateTime<Utc>,
            values: HashMap<FieldKey, FieldValue>,
        ) {
            let listener = self.wait_for_listener(provider).await;
            listener.on_measurements(timestamp, values).await;
        }

        /// Invokes the registered listener's schema-changed callback.
        pub async fn push_schema_changed(&self, provider: &str) {
            let listener = self.wait_for_listener(provider).await;
            listener.on_schema_changed().await;
        }

        async fn wait_for_link(&self, provider: &str) -> mpsc::Sender<LinkEvent> {
            for _ in 0..400 {
                let sender = {
                    let providers = self.providers.lock().unwrap();
                    providers.get(provider).and_then(|p| p.events.clone())
                };
                if let Some(sender) = sender {
                    return sender;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
            panic!("no connect() observed for provider '{provider}'");
        }

        async fn wait_for_listener(&self, provider: &str) -> Arc<dyn PushListener> {
            for _ in 0..400 {
                let listener = {
                    let providers = self.providers.lock().unwrap();
                    providers.get(provider).and_then(|p| p.listener.clone())
                };
                if let Some(listener) = listener {
                    return listener;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
            panic!("no listener registered for provider '{provider}'");
        }
    }

    #[async_trait]
    impl Connector for MockConnector {
        async fn connect(
            &self,
            provider: &ProviderId,
        ) -> ConnectorResult<mpsc::Receiver<LinkEvent>> {
            let (tx, rx) = mpsc::channel(8);
            let mut providers = self.providers.lock().unwrap();
            providers.entry(provider.clone()).or_default().events = Some(tx);
            Ok(rx)
        }

        async fn fetch_schema(
            &self,
            provider: &ProviderId,
        ) -> ConnectorResult<HashMap<FieldKey, FieldSchema>> {
            let providers = self.providers.lock().unwrap();
            match providers.get(provider) {
                Some(p) if p.reachable => Ok(p.schema.clone()),
                _ => Err(ConnectorError::Unavailable(provider.to_string())),
            }
        }

        async fn fetch_measurements(
            &self,
            provider: &ProviderId,
        ) -> ConnectorResult<HashMap<FieldKey, FieldValue>> {
            let providers = self.providers.lock().unwrap();
            match providers.get(provider) {
                Some(p) if p.reachable => Ok(p.measurements.clone()),
                _ => Err(ConnectorError::Unavailable(provider.to_string())),
            }
        }

        async fn register_push_listener(
            &self,
            provider: &ProviderId,
            listener: Arc<dyn PushListener>,
        ) -> ConnectorResult<()> {
            let mut providers = self.providers.lock().unwrap();
            let entry = providers.entry(provider.clone()).or_default();
            if !entry.reachable {
                return Err(ConnectorError::Unavailable(provider.to_string()));
            }
            if entry.reject_listener {
                return Err(ConnectorError::Rejected(provider.to_string()));
            }
            entry.listener = Some(listener);
            Ok(())
        }

        async fn unregister_push_listener(&self, provider: &ProviderId) -> ConnectorResult<()> {
            let mut providers = self.providers.lock().unwrap();
            let Some(entry) = providers.get_mut(provider.as_str()) else {
                return Err(ConnectorError::Unavailable(provider.to_string()));
            };
            if !entry.reachable {
                return Err(ConnectorError::Unavailable(provider.to_string()));
            }
            entry.listener = None;
            Ok(())
        }
    }
}
