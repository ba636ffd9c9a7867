//! Message bus client with lazy connection and outstanding-task tracking.
//!
//! The pieces, from the bottom up:
//!
//! - [`ConnectionManager`] resolves the publish endpoint and connects on first
//!   use, then hands out the same connection forever.
//! - [`DashboardMessageBusClient`] sends requests over that connection and
//!   treats an unreachable bus as a silent no-op.
//! - [`TrackedClient`] wraps any [`MessageBusClient`] and records every
//!   in-flight operation so [`TrackedClient::wait_for_outstanding_tasks`] can
//!   drain them before shutdown.
//! - [`get_instance`] hands out the one tracked client of the process.
//!
//! # Usage
//!
//! ```ignore
//! use dashboard_message_bus_client::{get_instance, MessageBusClient, SendRequest};
//! use serde_json::json;
//!
//! async fn example(bus: std::sync::Arc<dyn dashboard_message_bus_client::MessageBus>) {
//!     let client = get_instance(None, bus);
//!     // Fire and forget; the drain below still waits for it.
//!     let _ = client.send_and_await(SendRequest::new("ping", json!({})));
//!     client.wait_for_outstanding_tasks().await;
//! }
//! ```

pub mod connection;
pub mod dispatcher;
pub mod singleton;
pub mod tracking;

#[cfg(test)]
pub(crate) mod test_bus;

pub use connection::ConnectionManager;
pub use dispatcher::DashboardMessageBusClient;
pub use singleton::{get_instance, try_instance, SharedClient};
pub use tracking::{PendingTask, TaskId, TaskRegistry, TrackedClient};

use futures::future::BoxFuture;
use serde_json::Value;
use thiserror::Error;

use crate::bus::BusError;

/// Errors returned to callers of client operations.
#[derive(Error, Debug)]
pub enum ClientError {
    /// The bus was reached but the exchange failed.
    ///
    /// Never carries a connection error from `send_and_await`; those are
    /// dropped by the client before they get here.
    #[error(transparent)]
    Bus(#[from] BusError),

    /// The runtime shut down before the tracked task settled.
    #[error("Tracked task {task_id} was aborted before it settled")]
    TaskAborted {
        /// Registry identifier of the aborted task.
        task_id: TaskId,
    },
}

/// Result type alias for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Asynchronous result of a client operation.
pub type TaskFuture<T> = BoxFuture<'static, ClientResult<T>>;

/// Request arguments: a message type and its payload.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SendRequest {
    /// Message type discriminator.
    #[serde(rename = "type")]
    pub message_type: String,
    /// Type-specific body.
    pub payload: Value,
}

impl SendRequest {
    /// Creates a request for `message_type` carrying `payload`.
    pub fn new(message_type: impl Into<String>, payload: Value) -> Self {
        Self {
            message_type: message_type.into(),
            payload,
        }
    }
}

/// Operations a message bus client offers.
///
/// Every operation returns a [`TaskFuture`]. Decorators such as
/// [`TrackedClient`] implement the same trait and forward to the wrapped
/// client, so callers do not care which one they hold.
pub trait MessageBusClient: Send + Sync {
    /// Sends a message and waits for the bus to answer it.
    ///
    /// Resolves to `Ok(())` when the bus cannot be reached at all; only
    /// failures of a reachable bus are reported.
    fn send_and_await(&self, request: SendRequest) -> TaskFuture<()>;

    /// Like [`send_and_await`](Self::send_and_await), but yields the reply body.
    ///
    /// Resolves to `Ok(None)` when the bus cannot be reached.
    fn request(&self, request: SendRequest) -> TaskFuture<Option<Value>>;
}
