//! Core traits for generic WebSocket infrastructure.

/// Message parser trait for converting raw bytes to messages.
///
/// # Example
///
/// ```ignore
/// pub struct SimpleParser;
///
/// impl MessageParser<MyMessage> for SimpleParser {
///     fn parse(&self, bytes: &[u8]) -> crate::Result<Vec<MyMessage>> {
///         let msg: MyMessage = serde_json::from_slice(bytes)?;
///         Ok(vec![msg])
///     }
/// }
/// ```
pub trait MessageParser<M>: Send + Sync + 'static {
    /// Parse incoming bytes into messages.
    ///
    /// May return an empty vec for keepalive or otherwise empty frames.
    /// Handles both single objects and arrays of messages.
    fn parse(&self, bytes: &[u8]) -> crate::Result<Vec<M>>;
}

/// Receives parsed messages from the connection task, in arrival order.
///
/// `route` is called synchronously from the task that reads the socket, so a
/// slow router delays every message behind it.
pub trait MessageRouter<M>: Send + Sync + 'static {
    /// Called exactly once, after the first successful handshake and before any
    /// message of that connection is routed.
    fn wire(&self);

    /// Deliver one inbound message.
    fn route(&self, message: M);
}

impl<M, R: MessageRouter<M>> MessageRouter<M> for std::sync::Arc<R> {
    fn wire(&self) {
        (**self).wire();
    }

    fn route(&self, message: M) {
        (**self).route(message);
    }
}
