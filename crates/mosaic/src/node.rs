//! Host wiring: one receiver, one publisher, handlers registered once.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use mosaic_frame::DecodedMessage;
use mosaic_link::{
    CallbackRegistry, ConnectionManager, ConnectionState, DispatchStats, Dispatcher, HandlerId,
    HandlerResult,
};
use mosaic_transport::{open_transport, Transport, TransportOptions};
use tracing::info;

use crate::config::{NodeConfig, NodeConfigError};

/// Sink for decoded messages.
///
/// Implementations forward a message to whatever the host uses for
/// distribution. Errors are logged by the registry and do not stop dispatch.
pub trait Publisher: Send + Sync {
    fn publish(&self, message: &DecodedMessage, destination: &str) -> HandlerResult;
}

/// Publication destination for an identifier: `GPGGA` → `/gpgga`,
/// `4007.2` → `/4007_2`.
pub fn destination(identifier: &str) -> String {
    format!("/{}", identifier.to_ascii_lowercase().replace('.', "_"))
}

/// A configured receiver node.
pub struct Node {
    config: NodeConfig,
    manager: Arc<ConnectionManager>,
    registry: Arc<CallbackRegistry>,
}

impl Node {
    /// Build the transport named by `config.device` without opening it.
    pub fn new(config: NodeConfig) -> Result<Self, NodeConfigError> {
        let endpoint = config.endpoint()?;
        let transport = open_transport(&endpoint, TransportOptions::default())?;
        Self::with_transport(config, transport)
    }

    /// Use an already built transport.
    pub fn with_transport(
        config: NodeConfig,
        transport: Box<dyn Transport>,
    ) -> Result<Self, NodeConfigError> {
        let reconnect = config.reconnect_config()?;
        Ok(Self {
            config,
            manager: Arc::new(ConnectionManager::new(transport, reconnect)),
            registry: Arc::new(CallbackRegistry::new()),
        })
    }

    /// Register a publishing handler for every enabled identifier.
    pub fn subscribe(&self, publisher: Arc<dyn Publisher>) -> Vec<HandlerId> {
        self.config
            .publish
            .enabled_identifiers()
            .into_iter()
            .map(|identifier| {
                let topic = destination(identifier);
                info!(identifier, destination = %topic, "publishing");
                let publisher = Arc::clone(&publisher);
                self.registry
                    .insert(identifier, move |message| publisher.publish(message, &topic))
            })
            .collect()
    }

    pub fn connect(&self) -> ConnectionState {
        self.manager.connect()
    }

    /// A dispatcher reading from this node's connection.
    pub fn dispatcher(&self) -> Dispatcher {
        Dispatcher::new(
            Arc::clone(&self.manager),
            Arc::clone(&self.registry),
            self.config.publish.clone(),
        )
    }

    /// Dispatch until `running` is cleared.
    pub fn run(&self, running: &AtomicBool) -> DispatchStats {
        let mut dispatcher = self.dispatcher();
        dispatcher.run(running);
        dispatcher.stats()
    }

    pub fn shutdown(&self) {
        self.manager.shutdown();
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn manager(&self) -> &Arc<ConnectionManager> {
        &self.manager
    }

    pub fn registry(&self) -> &Arc<CallbackRegistry> {
        &self.registry
    }
}
