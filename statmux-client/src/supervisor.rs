//! Connection lifecycle supervision.
//!
//! One supervision task per configured provider drains that provider's
//! lifecycle event stream. Providers connect and disconnect independently;
//! a failure on one never touches the others. The engine issues exactly one
//! connection attempt per provider and never retries — reconnect policy
//! belongs to the connector, which reports a fresh `Connected` event when
//! it succeeds.

use crate::client::Shared;
use crate::connector::{LinkEvent, PushListener};
use chrono::{DateTime, Utc};
use statmux_types::{FieldKey, FieldValue, ProviderId};
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use tracing::{debug, info, warn};

/// Connection state of a configured provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No live connection and no attempt in flight.
    Unbound,
    /// A connection attempt was issued and has not resolved yet.
    Connecting,
    /// Live connection; the provider contributes to the merged view.
    Connected,
}

/// Drives one provider's `Unbound → Connecting → Connected → Unbound`
/// cycle until the event stream ends or the task is aborted by `stop()`.
pub(crate) async fn supervise(shared: Arc<Shared>, provider: ProviderId) {
    shared.set_link_state(&provider, ConnectionState::Connecting);
    debug!(%provider, "connecting");

    let mut events = match shared.connector().connect(&provider).await {
        Ok(events) => events,
        Err(error) => {
            warn!(%provider, %error, "connection attempt failed");
            shared.set_link_state(&provider, ConnectionState::Unbound);
            return;
        }
    };

    while let Some(event) = events.recv().await {
        match event {
            LinkEvent::Connected => on_connected(&shared, &provider).await,
            LinkEvent::Disconnected => on_disconnected(&shared, &provider).await,
        }
    }

    // Stream end: the connector gave up on this provider.
    on_disconnected(&shared, &provider).await;
}

async fn on_connected(shared: &Arc<Shared>, provider: &ProviderId) {
    info!(%provider, "provider connected");
    shared.set_link_state(provider, ConnectionState::Connected);

    let listener: Arc<dyn PushListener> = Arc::new(EnginePushListener {
        shared: Arc::downgrade(shared),
        provider: provider.clone(),
    });
    if let Err(error) = shared
        .connector()
        .register_push_listener(provider, listener)
        .await
    {
        // The provider still answers direct fetches, so it keeps
        // participating in pull-style merged queries.
        warn!(%provider, %error, "listener registration failed");
    }

    shared.recompute_schema().await;
}

async fn on_disconnected(shared: &Arc<Shared>, provider: &ProviderId) {
    let previous = shared.set_link_state(provider, ConnectionState::Unbound);
    if previous != Some(ConnectionState::Connected) {
        return;
    }
    info!(%provider, "provider disconnected");
    // Recompute immediately so stale ownership entries do not linger.
    shared.recompute_schema().await;
}

/// Routes a provider's push notifications into the engine.
///
/// Holds a weak reference: once the client is dropped, late pushes from a
/// connector that still holds the listener become no-ops.
struct EnginePushListener {
    shared: Weak<Shared>,
    provider: ProviderId,
}

#[async_trait::async_trait]
impl PushListener for EnginePushListener {
    async fn on_measurements(
        &self,
        timestamp: DateTime<Utc>,
        values: HashMap<FieldKey, FieldValue>,
    ) {
        let Some(shared) = self.shared.upgrade() else {
            return;
        };
        shared
            .deliver_measurements(&self.provider, timestamp, values)
            .await;
    }

    async fn on_schema_changed(&self) {
        let Some(shared) = self.shared.upgrade() else {
            return;
        };
        debug!(provider = %self.provider, "provider signalled schema change");
        shared.recompute_schema().await;
    }
}
