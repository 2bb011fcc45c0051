//! Subscription fan-out.
//!
//! Delivers schema-change and new-measurement notifications to registered
//! subscribers. Delivery snapshots the subscriber set before iterating, so
//! concurrent subscribe/unsubscribe calls never skip unrelated subscribers,
//! and a failing callback is contained to the one subscriber that failed.

use crate::error::SubscriberError;
use chrono::{DateTime, Utc};
use statmux_types::{FieldKey, FieldValue, ProviderId};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::warn;

/// Receives merged-view notifications from the engine.
///
/// Callbacks run on the delivering provider's context and should not
/// block. A returned error is logged and contained; it never reaches other
/// subscribers or provider-handling code.
pub trait Subscriber: Send + Sync {
    /// One provider's filtered contribution, as a discrete event. Batches
    /// from different providers are never merged into one notification.
    fn on_new_measurements(
        &self,
        provider: &ProviderId,
        timestamp: DateTime<Utc>,
        values: &HashMap<FieldKey, FieldValue>,
    ) -> Result<(), SubscriberError>;

    /// The merged schema and ownership table were republished.
    fn on_schema_changed(&self) -> Result<(), SubscriberError>;
}

/// The registered subscriber set.
///
/// Registrations are identity-based: subscribing the same `Arc` twice
/// delivers twice, and `unsubscribe` removes by pointer identity.
#[derive(Default)]
pub struct SubscriberSet {
    subscribers: RwLock<Vec<Arc<dyn Subscriber>>>,
}

impl SubscriberSet {
    /// Adds a subscriber.
    pub fn subscribe(&self, subscriber: Arc<dyn Subscriber>) {
        self.subscribers
            .write()
            .expect("subscriber lock poisoned")
            .push(subscriber);
    }

    /// Removes a subscriber by identity.
    pub fn unsubscribe(&self, subscriber: &Arc<dyn Subscriber>) {
        self.subscribers
            .write()
            .expect("subscriber lock poisoned")
            .retain(|s| !Arc::ptr_eq(s, subscriber));
    }

    /// Number of registered subscribers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.subscribers
            .read()
            .expect("subscriber lock poisoned")
            .len()
    }

    /// Whether no subscribers are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Notifies every subscriber of one provider's filtered batch.
    pub fn notify_measurements(
        &self,
        provider: &ProviderId,
        timestamp: DateTime<Utc>,
        values: &HashMap<FieldKey, FieldValue>,
    ) {
        for subscriber in self.snapshot() {
            if let Err(error) = subscriber.on_new_measurements(provider, timestamp, values) {
                warn!(%provider, %error, "measurement callback failed");
            }
        }
    }

    /// Notifies every subscriber that the merged schema changed.
    pub fn notify_schema_changed(&self) {
        for subscriber in self.snapshot() {
            if let Err(error) = subscriber.on_schema_changed() {
                warn!(%error, "schema-changed callback failed");
            }
        }
    }

    fn snapshot(&self) -> Vec<Arc<dyn Subscriber>> {
        self.subscribers
            .read()
            .expect("subscriber lock poisoned")
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counting {
        measurements: AtomicUsize,
        schema_changes: AtomicUsize,
        fail: bool,
    }

    impl Counting {
        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::default()
            }
        }
    }

    impl Subscriber for Counting {
        fn on_new_measurements(
            &self,
            _provider: &ProviderId,
            _timestamp: DateTime<Utc>,
            _values: &HashMap<FieldKey, FieldValue>,
        ) -> Result<(), SubscriberError> {
            self.measurements.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(SubscriberError::new("measurement handler broke"));
            }
            Ok(())
        }

        fn on_schema_changed(&self) -> Result<(), SubscriberError> {
            self.schema_changes.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(SubscriberError::new("schema handler broke"));
            }
            Ok(())
        }
    }

    fn notify_once(set: &SubscriberSet) {
        set.notify_measurements(&ProviderId::new("A"), Utc::now(), &HashMap::new());
    }

    #[test]
    fn failing_subscriber_does_not_block_the_rest() {
        let set = SubscriberSet::default();
        let bad = Arc::new(Counting::failing());
        let good = Arc::new(Counting::default());
        set.subscribe(bad.clone());
        set.subscribe(good.clone());

        notify_once(&set);
        set.notify_schema_changed();

        assert_eq!(bad.measurements.load(Ordering::SeqCst), 1);
        assert_eq!(good.measurements.load(Ordering::SeqCst), 1);
        assert_eq!(good.schema_changes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unsubscribe_removes_by_identity() {
        let set = SubscriberSet::default();
        let first = Arc::new(Counting::default());
        let second = Arc::new(Counting::default());
        set.subscribe(first.clone());
        set.subscribe(second.clone());

        let first_dyn: Arc<dyn Subscriber> = first.clone();
        set.unsubscribe(&first_dyn);
        notify_once(&set);

        assert_eq!(first.measurements.load(Ordering::SeqCst), 0);
        assert_eq!(second.measurements.load(Ordering::SeqCst), 1);
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn duplicate_registration_delivers_twice() {
        let set = SubscriberSet::default();
        let subscriber = Arc::new(Counting::default());
        set.subscribe(subscriber.clone());
        set.subscribe(subscriber.clone());

        notify_once(&set);
        assert_eq!(subscriber.measurements.load(Ordering::SeqCst), 2);
    }
}
