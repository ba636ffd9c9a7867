//! Contract of the message bus transport consumed by the client.
//!
//! The client never speaks the wire protocol itself. Port discovery, socket
//! framing, reconnection policy and reply correlation all belong to a
//! [`MessageBus`] implementation supplied by the host application. This module
//! only defines the four operations the client needs and the values passed
//! between them.

mod error;

pub use error::BusError;

use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

/// Publish endpoint resolved by port discovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Endpoint {
    /// Port that accepts request/reply traffic from clients.
    pub publish_port: u16,
    /// Port that dashboards subscribe on, if the bus reported one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscribe_port: Option<u16>,
}

impl Endpoint {
    /// Creates an endpoint with only a publish port.
    pub fn new(publish_port: u16) -> Self {
        Self {
            publish_port,
            subscribe_port: None,
        }
    }
}

/// Opaque handle to an established transport connection.
///
/// The handle is cheap to clone; every clone refers to the same underlying
/// connection. Transports recover their concrete connection type with
/// [`ConnectionHandle::downcast_ref`].
#[derive(Clone)]
pub struct ConnectionHandle {
    inner: Arc<dyn Any + Send + Sync>,
}

impl ConnectionHandle {
    /// Wraps a transport-specific connection object.
    pub fn new<T: Any + Send + Sync>(connection: T) -> Self {
        Self {
            inner: Arc::new(connection),
        }
    }

    /// Returns the wrapped connection if it is of type `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }

    /// Returns `true` if both handles refer to the same connection.
    pub fn same_connection(&self, other: &ConnectionHandle) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for ConnectionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionHandle").finish_non_exhaustive()
    }
}

static NEXT_MESSAGE_ID: AtomicU64 = AtomicU64::new(1);

/// Typed envelope sent over the bus.
///
/// Serialized as `{"id": 1, "type": "ping", "payload": {}}`.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Message {
    /// Process-unique identifier used to correlate the reply.
    pub id: u64,
    /// Message type discriminator.
    #[serde(rename = "type")]
    pub message_type: String,
    /// Type-specific body.
    pub payload: Value,
}

impl Message {
    /// Builds a message with a fresh identifier.
    pub fn new(message_type: impl Into<String>, payload: Value) -> Self {
        Self {
            id: NEXT_MESSAGE_ID.fetch_add(1, Ordering::Relaxed),
            message_type: message_type.into(),
            payload,
        }
    }
}

/// Transport operations the client is built on.
///
/// Implementations own every protocol detail: how the lobby port is queried,
/// how many times and how fast connecting is retried, and how replies are
/// matched to requests.
#[async_trait]
pub trait MessageBus: Send + Sync {
    /// Resolves the publish endpoint of the bus listening on `host:port`.
    async fn discover_publish_endpoint(&self, port: u16, host: &str) -> Result<Endpoint, BusError>;

    /// Connects to `endpoint`, retrying transient failures.
    ///
    /// Returns [`BusError::Connection`] once the retry policy is exhausted.
    async fn connect_with_retries(
        &self,
        endpoint: &Endpoint,
        host: &str,
    ) -> Result<ConnectionHandle, BusError>;

    /// Builds the envelope for an outgoing request.
    fn create_message(&self, message_type: &str, payload: Value) -> Message {
        Message::new(message_type, payload)
    }

    /// Sends `message` on `connection` and waits for its correlated reply.
    async fn send_and_await(
        &self,
        connection: &ConnectionHandle,
        message: Message,
    ) -> Result<Option<Value>, BusError>;
}
