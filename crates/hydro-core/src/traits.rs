use crate::{
    error::HydroError,
    message::{IncomingMessage, OutgoingMessage},
    models::Reminder,
};
use async_trait::async_trait;

/// Messaging Channel trait.
///
/// Every messaging platform implements this trait to receive commands and
/// button presses and to send replies.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Human-readable channel name.
    fn name(&self) -> &str;

    /// Start listening for incoming messages.
    /// Returns a receiver that yields incoming messages.
    async fn start(&self) -> Result<tokio::sync::mpsc::Receiver<IncomingMessage>, HydroError>;

    /// Send a message, with optional inline controls.
    async fn send(&self, message: OutgoingMessage) -> Result<(), HydroError>;

    /// Acknowledge a button press so the client stops its spinner.
    async fn answer_callback(&self, _callback_id: &str) -> Result<(), HydroError> {
        Ok(())
    }

    /// Graceful shutdown.
    async fn stop(&self) -> Result<(), HydroError>;
}

/// Delivery dispatcher: renders one due reminder and hands it to a channel.
///
/// The scheduler calls this once per due reminder per poll cycle and only
/// looks at success or failure. Timeouts are the implementor's concern.
#[async_trait]
pub trait Dispatcher: Send + Sync {
    async fn dispatch(&self, reminder: &Reminder) -> Result<(), HydroError>;
}
