//! Request dispatch with best-effort delivery.
//!
//! A dashboard is optional: when nobody runs the message bus, requests are
//! dropped with a debug log instead of failing the caller. Only connection
//! errors get this treatment. A bus that is up but rejects, garbles or never
//! answers a message is still reported.

use std::sync::Arc;

use serde_json::Value;

use crate::bus::{BusError, MessageBus};
use crate::client::connection::ConnectionManager;
use crate::client::{ClientResult, MessageBusClient, SendRequest, TaskFuture};
use crate::config::ClientOptions;

/// Client that talks to the bus directly, without task tracking.
///
/// Cloning is cheap and clones share the connection. Most callers want the
/// tracked process-wide instance from [`get_instance`](crate::get_instance)
/// instead.
#[derive(Clone)]
pub struct DashboardMessageBusClient {
    shared: Arc<Shared>,
}

struct Shared {
    options: ClientOptions,
    bus: Arc<dyn MessageBus>,
    connection: ConnectionManager,
}

impl DashboardMessageBusClient {
    /// Creates a client for the bus at `options`, speaking through `bus`.
    ///
    /// Nothing is connected until the first request.
    pub fn new(options: ClientOptions, bus: Arc<dyn MessageBus>) -> Self {
        let connection = ConnectionManager::new(Arc::clone(&bus), options.clone());
        Self {
            shared: Arc::new(Shared {
                options,
                bus,
                connection,
            }),
        }
    }

    /// Options this client was built with.
    pub fn options(&self) -> &ClientOptions {
        &self.shared.options
    }

    /// Returns `true` once the bus connection has been established.
    pub fn is_connected(&self) -> bool {
        self.shared.connection.is_connected()
    }
}

impl Shared {
    async fn dispatch(&self, request: SendRequest) -> ClientResult<Option<Value>> {
        let message_type = request.message_type.clone();
        match self.exchange(request).await {
            Ok(reply) => Ok(reply),
            Err(e) if e.is_connection_error() => {
                tracing::debug!(
                    error = %e,
                    "Message bus unreachable, dropping '{}' message",
                    message_type
                );
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn exchange(&self, request: SendRequest) -> Result<Option<Value>, BusError> {
        let connection = self.connection.get_connection().await?;
        let message = self
            .bus
            .create_message(&request.message_type, request.payload);
        tracing::trace!(
            "Sending message {} of type '{}'",
            message.id,
            message.message_type
        );
        self.bus.send_and_await(&connection, message).await
    }
}

impl MessageBusClient for DashboardMessageBusClient {
    fn send_and_await(&self, request: SendRequest) -> TaskFuture<()> {
        let shared = Arc::clone(&self.shared);
        Box::pin(async move { shared.dispatch(request).await.map(|_| ()) })
    }

    fn request(&self, request: SendRequest) -> TaskFuture<Option<Value>> {
        let shared = Arc::clone(&self.shared);
        Box::pin(async move { shared.dispatch(request).await })
    }
}
