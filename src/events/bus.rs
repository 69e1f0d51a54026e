//! Namespaced publish/subscribe.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use serde_json::Value;

use super::key::{EventError, EventKey, GLOBAL};

/// Callback invoked for each matching publish.
pub type EventHandler = Arc<dyn Fn(&EventDetails) + Send + Sync>;

/// What a subscriber receives.
#[derive(Debug, Clone)]
pub struct EventDetails {
    /// Normalized key that was published.
    pub key: EventKey,
    /// Arguments given to `publish`.
    pub arguments: Vec<Value>,
    /// Position of this invocation across all tiers of one publish.
    pub call_position: usize,
}

struct BusInner {
    enabled: bool,
    handlers: RwLock<HashMap<String, Vec<EventHandler>>>,
}

/// Event bus shared by the host, the table builder and the engine.
///
/// Cloning is cheap; all clones share one registry.
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_enabled(true)
    }

    /// A bus on which every call is a silent no-op.
    pub fn disabled() -> Self {
        Self::with_enabled(false)
    }

    pub fn with_enabled(enabled: bool) -> Self {
        Self {
            inner: Arc::new(BusInner {
                enabled,
                handlers: RwLock::new(HashMap::new()),
            }),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.enabled
    }

    /// Subscribe a closure to `key`.
    pub fn subscribe<F>(&self, key: &str, handler: F) -> Result<Subscription, EventError>
    where
        F: Fn(&EventDetails) + Send + Sync + 'static,
    {
        self.subscribe_shared(key, Arc::new(handler))
    }

    /// Subscribe an existing handler reference, so it can later be removed
    /// with [`EventBus::unsubscribe`].
    pub fn subscribe_shared(
        &self,
        key: &str,
        handler: EventHandler,
    ) -> Result<Subscription, EventError> {
        if !self.inner.enabled {
            return Ok(Subscription::inert(handler));
        }
        let key = EventKey::parse(key)?;

        self.inner
            .handlers
            .write()
            .entry(key.as_str().to_string())
            .or_default()
            .push(handler.clone());

        tracing::trace!(key = %key, "Event handler subscribed");
        Ok(Subscription {
            bus: Arc::downgrade(&self.inner),
            key,
            handler,
        })
    }

    /// Subscribe to every published event.
    pub fn subscribe_all<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&EventDetails) + Send + Sync + 'static,
    {
        let handler: EventHandler = Arc::new(handler);
        // the global key always parses
        self.subscribe_shared(GLOBAL, handler.clone())
            .unwrap_or_else(|_| Subscription::inert(handler))
    }

    /// Remove the first registration of `handler` under `key`.
    ///
    /// Returns `Ok(false)` when nothing was registered.
    pub fn unsubscribe(&self, key: &str, handler: &EventHandler) -> Result<bool, EventError> {
        if !self.inner.enabled {
            return Ok(false);
        }
        let key = EventKey::parse(key)?;
        Ok(remove_handler(&self.inner, &key, handler))
    }

    /// Publish `key` to the global, exact, `NS:*` and `*:NAME` tiers, in
    /// that order.
    pub fn publish(&self, key: &str, arguments: Vec<Value>) -> Result<(), EventError> {
        if !self.inner.enabled || key.trim() == GLOBAL {
            return Ok(());
        }
        let key = EventKey::parse(key)?;

        // Snapshot the tiers so handlers may (un)subscribe while running.
        let tiers: Vec<EventHandler> = {
            let handlers = self.inner.handlers.read();
            let mut lookups = vec![GLOBAL.to_string(), key.as_str().to_string()];
            if !key.is_wildcard() {
                lookups.push(key.namespace_wildcard());
                lookups.push(key.name_wildcard());
            }
            lookups
                .iter()
                .filter_map(|k| handlers.get(k))
                .flat_map(|list| list.iter().cloned())
                .collect()
        };

        tracing::trace!(key = %key, handlers = tiers.len(), "Publishing event");

        let mut details = EventDetails {
            key,
            arguments,
            call_position: 0,
        };
        for handler in tiers {
            handler(&details);
            details.call_position += 1;
        }
        Ok(())
    }

    /// Number of handlers registered under exactly `key`.
    pub fn handler_count(&self, key: &str) -> usize {
        EventKey::parse(key)
            .ok()
            .and_then(|key| self.inner.handlers.read().get(key.as_str()).map(Vec::len))
            .unwrap_or(0)
    }

    /// Drop every registration.
    pub fn clear(&self) {
        self.inner.handlers.write().clear();
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("enabled", &self.inner.enabled)
            .field("keys", &self.inner.handlers.read().len())
            .finish()
    }
}

/// Handle returned from a subscribe call.
pub struct Subscription {
    bus: Weak<BusInner>,
    key: EventKey,
    handler: EventHandler,
}

impl Subscription {
    fn inert(handler: EventHandler) -> Self {
        Self {
            bus: Weak::new(),
            key: EventKey::global(),
            handler,
        }
    }

    pub fn key(&self) -> &EventKey {
        &self.key
    }

    /// The registered handler reference.
    pub fn handler(&self) -> EventHandler {
        self.handler.clone()
    }

    /// Remove this registration. Returns false if the bus is gone or the
    /// handler was already removed.
    pub fn unsubscribe(self) -> bool {
        match self.bus.upgrade() {
            Some(inner) => remove_handler(&inner, &self.key, &self.handler),
            None => false,
        }
    }
}

fn remove_handler(inner: &BusInner, key: &EventKey, handler: &EventHandler) -> bool {
    let mut handlers = inner.handlers.write();
    let Some(list) = handlers.get_mut(key.as_str()) else {
        return false;
    };
    match list.iter().position(|h| same_handler(h, handler)) {
        Some(i) => {
            list.remove(i);
            true
        }
        None => false,
    }
}

// Compare data pointers only; vtable pointers are not unique.
fn same_handler(a: &EventHandler, b: &EventHandler) -> bool {
    std::ptr::eq(
        Arc::as_ptr(a) as *const (),
        Arc::as_ptr(b) as *const (),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    fn recorder(
        log: &Arc<Mutex<Vec<(String, usize)>>>,
        tag: &str,
    ) -> impl Fn(&EventDetails) + Send + Sync + 'static {
        let log = log.clone();
        let tag = tag.to_string();
        move |details: &EventDetails| log.lock().push((tag.clone(), details.call_position))
    }

    #[test]
    fn test_fan_out_order() {
        let bus = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        bus.subscribe("*:EVT", recorder(&log, "name")).unwrap();
        bus.subscribe("NS:*", recorder(&log, "namespace")).unwrap();
        bus.subscribe("NS:EVT", recorder(&log, "exact")).unwrap();
        bus.subscribe_all(recorder(&log, "global"));

        bus.publish("ns:evt", vec![]).unwrap();

        assert_eq!(
            *log.lock(),
            vec![
                ("global".to_string(), 0),
                ("exact".to_string(), 1),
                ("namespace".to_string(), 2),
                ("name".to_string(), 3),
            ]
        );
    }

    #[test]
    fn test_publish_carries_arguments() {
        let bus = EventBus::new();
        let seen = Arc::new(Mutex::new(None));
        let s = seen.clone();
        bus.subscribe("APP:STARTED", move |d| {
            *s.lock() = Some((d.key.to_string(), d.arguments.clone()));
        })
        .unwrap();

        bus.publish("app:started", vec![serde_json::json!({"port": 3000})])
            .unwrap();

        let seen = seen.lock().clone().unwrap();
        assert_eq!(seen.0, "APP:STARTED");
        assert_eq!(seen.1[0]["port"], 3000);
    }

    #[test]
    fn test_key_validation() {
        let bus = EventBus::new();
        assert!(bus.subscribe("bad_key_no_colon", |_| {}).is_err());
        assert!(bus.subscribe("*", |_| {}).is_ok());
        assert!(bus.publish("NS:EVT", vec![]).is_ok());
        assert!(bus.publish("nope", vec![]).is_err());
    }

    #[test]
    fn test_publishing_global_is_noop() {
        let bus = EventBus::new();
        let count = Arc::new(Mutex::new(0));
        let c = count.clone();
        bus.subscribe_all(move |_| *c.lock() += 1);

        bus.publish("*", vec![]).unwrap();
        assert_eq!(*count.lock(), 0);
    }

    #[test]
    fn test_unsubscribe_removes_first_reference() {
        let bus = EventBus::new();
        let handler: EventHandler = Arc::new(|_: &EventDetails| {});
        bus.subscribe_shared("A:B", handler.clone()).unwrap();
        bus.subscribe_shared("A:B", handler.clone()).unwrap();

        assert_eq!(bus.unsubscribe("a:b", &handler), Ok(true));
        assert_eq!(bus.handler_count("A:B"), 1);
        assert_eq!(bus.unsubscribe("A:B", &handler), Ok(true));
        assert_eq!(bus.unsubscribe("A:B", &handler), Ok(false));

        let other: EventHandler = Arc::new(|_: &EventDetails| {});
        assert_eq!(bus.unsubscribe("X:Y", &other), Ok(false));
    }

    #[test]
    fn test_subscription_handle_unsubscribes() {
        let bus = EventBus::new();
        let sub = bus.subscribe("ROUTES:AFTER_REFRESH", |_| {}).unwrap();
        assert_eq!(bus.handler_count("ROUTES:AFTER_REFRESH"), 1);
        assert!(sub.unsubscribe());
        assert_eq!(bus.handler_count("ROUTES:AFTER_REFRESH"), 0);
    }

    #[test]
    fn test_disabled_bus_is_silent() {
        let bus = EventBus::disabled();
        let count = Arc::new(Mutex::new(0));
        let c = count.clone();

        assert!(bus.subscribe("not namespaced", move |_| *c.lock() += 1).is_ok());
        assert!(bus.publish("also bad", vec![]).is_ok());
        assert_eq!(*count.lock(), 0);
        assert_eq!(bus.handler_count("NOT:NAMESPACED"), 0);
    }

    #[test]
    fn test_handler_may_subscribe_during_publish() {
        let bus = EventBus::new();
        let inner_bus = bus.clone();
        bus.subscribe("A:B", move |_| {
            inner_bus.subscribe("A:C", |_| {}).unwrap();
        })
        .unwrap();

        bus.publish("A:B", vec![]).unwrap();
        assert_eq!(bus.handler_count("A:C"), 1);
    }
}
