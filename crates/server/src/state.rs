//! Application state shared across handlers and connections.

use std::sync::Arc;

use crate::conversations::ConversationResolver;
use crate::fanout::FanoutDispatcher;
use crate::lifecycle::MessageLifecycle;
use crate::receipts::ReadReceipts;
use crate::registry::ConnectionRegistry;
use crate::store::Store;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub registry: Arc<ConnectionRegistry>,
    pub dispatcher: Arc<FanoutDispatcher>,
    pub lifecycle: Arc<MessageLifecycle>,
    pub receipts: Arc<ReadReceipts>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>) -> Self {
        let registry = Arc::new(ConnectionRegistry::new());
        let dispatcher = Arc::new(FanoutDispatcher::new(registry.clone(), store.clone()));
        let resolver = ConversationResolver::new(store.clone());
        let lifecycle = Arc::new(MessageLifecycle::new(
            store.clone(),
            resolver,
            dispatcher.clone(),
        ));
        let receipts = Arc::new(ReadReceipts::new(store.clone(), dispatcher.clone()));

        Self {
            store,
            registry,
            dispatcher,
            lifecycle,
            receipts,
        }
    }
}
