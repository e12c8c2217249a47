pub mod telegram;

pub use telegram::TelegramNotifier;

use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::warn;

use crate::shared::errors::NotifierError;
use crate::shared::shutdown::ShutdownSignal;

/// Interactive menu button
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuButton {
    pub label: String,
    /// Event id delivered back when the button is pressed
    pub event_id: String,
}

impl MenuButton {
    pub fn new(label: impl Into<String>, event_id: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            event_id: event_id.into(),
        }
    }
}

pub type EventHandler = Arc<dyn Fn() + Send + Sync>;

/// Event id -> handler table. Immutable once built.
#[derive(Clone, Default)]
pub struct EventHandlers {
    handlers: Arc<HashMap<String, EventHandler>>,
}

impl EventHandlers {
    pub fn builder() -> EventHandlersBuilder {
        EventHandlersBuilder::default()
    }

    /// Run the handler registered for `event_id`.
    ///
    /// Returns `false` (and logs) when nothing is registered under that id.
    pub fn dispatch(&self, event_id: &str) -> bool {
        match self.handlers.get(event_id) {
            Some(handler) => {
                handler();
                true
            }
            None => {
                warn!("Unknown event: {}", event_id);
                false
            }
        }
    }
}

impl fmt::Debug for EventHandlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ids: Vec<_> = self.handlers.keys().collect();
        ids.sort();
        f.debug_struct("EventHandlers").field("events", &ids).finish()
    }
}

#[derive(Default)]
pub struct EventHandlersBuilder {
    handlers: HashMap<String, EventHandler>,
}

impl EventHandlersBuilder {
    pub fn on<F>(mut self, event_id: impl Into<String>, handler: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.handlers.insert(event_id.into(), Arc::new(handler));
        self
    }

    pub fn build(self) -> EventHandlers {
        EventHandlers {
            handlers: Arc::new(self.handlers),
        }
    }
}

/// Outbound chat channel plus its interactive event stream
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_message(&self, text: &str) -> Result<(), NotifierError>;

    /// Post a message carrying one button per entry
    async fn create_menu(&self, title: &str, buttons: &[MenuButton]) -> Result<(), NotifierError>;

    /// Deliver incoming events to `handlers` until `shutdown` fires
    async fn listen_for_events(
        &self,
        handlers: &EventHandlers,
        shutdown: ShutdownSignal,
    ) -> Result<(), NotifierError>;
}
