//! Delivery transport abstraction.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use opptrack_core::result::AppResult;
use opptrack_entity::notification::DeliveryMethod;

/// A message handed to a transport for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    /// Subject line; required by long-form transports, ignored by others.
    pub subject: Option<String>,
    /// Message body.
    pub body: String,
}

/// One delivery mechanism (mail API, SMS gateway, WhatsApp Business API).
///
/// Transports validate their own preconditions: a transport that cannot
/// deliver the given message shape fails with a validation error instead
/// of sending a malformed request.
#[async_trait]
pub trait ChannelTransport: Send + Sync {
    /// The delivery method this transport serves.
    fn method(&self) -> DeliveryMethod;

    /// Deliver one message to every recipient address.
    async fn send(&self, recipients: &[String], message: &OutboundMessage) -> AppResult<()>;
}

/// Lookup table from delivery method to transport.
#[derive(Clone, Default)]
pub struct TransportRegistry {
    transports: HashMap<DeliveryMethod, Arc<dyn ChannelTransport>>,
}

impl TransportRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a transport under its own method.
    pub fn register(&mut self, transport: Arc<dyn ChannelTransport>) {
        self.transports.insert(transport.method(), transport);
    }

    /// The transport for a method, if one is registered.
    pub fn get(&self, method: DeliveryMethod) -> Option<&Arc<dyn ChannelTransport>> {
        self.transports.get(&method)
    }
}

impl std::fmt::Debug for TransportRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let methods: Vec<_> = self.transports.keys().collect();
        f.debug_struct("TransportRegistry")
            .field("methods", &methods)
            .finish()
    }
}
