//! Listener registry keyed by message kind

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, error};

use super::messages::MessageKind;
use crate::common::traits::MessageHandler;

/// Token returned by [`HandlerRegistry::add`], used to remove the listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerId(u64);

type Entry = (HandlerId, Arc<dyn MessageHandler>);

/// Registry of listeners, invoked in registration order
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: RwLock<HashMap<MessageKind, Vec<Entry>>>,
    next_id: AtomicU64,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener for `kind`
    pub fn add(&self, kind: MessageKind, handler: Arc<dyn MessageHandler>) -> HandlerId {
        let id = HandlerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.handlers
            .write()
            .entry(kind)
            .or_default()
            .push((id, handler));
        id
    }

    /// Remove a listener; returns false when it was not registered under `kind`
    pub fn remove(&self, kind: &MessageKind, id: HandlerId) -> bool {
        let mut handlers = self.handlers.write();
        let Some(entries) = handlers.get_mut(kind) else {
            return false;
        };
        let before = entries.len();
        entries.retain(|(entry_id, _)| *entry_id != id);
        let removed = entries.len() != before;
        if entries.is_empty() {
            handlers.remove(kind);
        }
        removed
    }

    /// Invoke every listener of `kind` with `payload`
    ///
    /// Returns the number of listeners invoked. The lock is released before
    /// any listener runs, so listeners may register or remove listeners.
    pub fn notify(&self, kind: &MessageKind, payload: &serde_json::Value) -> usize {
        let entries: Vec<Entry> = match self.handlers.read().get(kind) {
            Some(entries) => entries.clone(),
            None => {
                debug!("No listeners for {}", kind);
                return 0;
            }
        };

        for (id, handler) in &entries {
            if let Err(e) = handler.handle(payload) {
                error!("Listener {:?} for {} failed: {}", id, kind, e);
            }
        }
        entries.len()
    }

    pub fn handler_count(&self, kind: &MessageKind) -> usize {
        self.handlers.read().get(kind).map(Vec::len).unwrap_or(0)
    }

    /// Total number of listeners across all kinds
    pub fn len(&self) -> usize {
        self.handlers.read().values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.handlers.write().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::errors::{ClientError, Result};
    use mockall::mock;
    use serde_json::{json, Value};
    use std::sync::Mutex;

    mock! {
        pub Listener {}
        impl MessageHandler for Listener {
            fn handle(&self, payload: &Value) -> Result<()>;
        }
    }

    #[test]
    fn test_notify_invokes_in_registration_order() {
        let registry = HandlerRegistry::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        for label in ["first", "second"] {
            let seen = seen.clone();
            registry.add(
                MessageKind::MarketData,
                Arc::new(move |_: &Value| -> Result<()> {
                    seen.lock().unwrap().push(label);
                    Ok(())
                }),
            );
        }

        assert_eq!(registry.notify(&MessageKind::MarketData, &json!({})), 2);
        assert_eq!(*seen.lock().unwrap(), vec!["first", "second"]);
    }

    #[test]
    fn test_failing_listener_does_not_stop_others() {
        let registry = HandlerRegistry::new();

        let mut failing = MockListener::new();
        failing
            .expect_handle()
            .times(1)
            .returning(|_| Err(ClientError::Handler("boom".into())));
        let mut healthy = MockListener::new();
        healthy
            .expect_handle()
            .withf(|payload| payload["ts_code"] == "600519.SH")
            .times(1)
            .returning(|_| Ok(()));

        registry.add(MessageKind::RealtimeData, Arc::new(failing));
        registry.add(MessageKind::RealtimeData, Arc::new(healthy));

        let invoked = registry.notify(&MessageKind::RealtimeData, &json!({"ts_code": "600519.SH"}));
        assert_eq!(invoked, 2);
    }

    #[test]
    fn test_remove_only_affects_matching_kind() {
        let registry = HandlerRegistry::new();
        let noop: Arc<dyn MessageHandler> = Arc::new(|_: &Value| -> Result<()> { Ok(()) });

        let news = registry.add(MessageKind::NewsUpdate, noop.clone());
        let again = registry.add(MessageKind::NewsUpdate, noop.clone());
        assert_ne!(news, again);

        assert!(!registry.remove(&MessageKind::MarketData, news));
        assert!(registry.remove(&MessageKind::NewsUpdate, news));
        assert!(!registry.remove(&MessageKind::NewsUpdate, news));
        assert_eq!(registry.handler_count(&MessageKind::NewsUpdate), 1);

        registry.clear();
        assert!(registry.is_empty());
        assert_eq!(registry.notify(&MessageKind::NewsUpdate, &Value::Null), 0);
    }

    #[test]
    fn test_listener_may_register_during_dispatch() {
        let registry = Arc::new(HandlerRegistry::new());
        let inner = registry.clone();
        registry.add(
            MessageKind::StockPrice,
            Arc::new(move |_: &Value| -> Result<()> {
                inner.add(
                    MessageKind::StockPrice,
                    Arc::new(|_: &Value| -> Result<()> { Ok(()) }),
                );
                Ok(())
            }),
        );

        assert_eq!(registry.notify(&MessageKind::StockPrice, &Value::Null), 1);
        assert_eq!(registry.handler_count(&MessageKind::StockPrice), 2);
    }
}
