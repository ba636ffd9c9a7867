//! Lazy, memoized connection to the message bus.

use std::sync::{Arc, Mutex, MutexGuard};

use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use tokio::sync::OnceCell;

use crate::bus::{BusError, ConnectionHandle, MessageBus};
use crate::config::ClientOptions;

type Attempt = Shared<BoxFuture<'static, Result<ConnectionHandle, BusError>>>;

/// Establishes the bus connection on first use and reuses it afterwards.
///
/// Callers that arrive while a discovery and connect sequence is running join
/// it and all receive its outcome, success or failure. A failed attempt
/// leaves nothing behind, so the next caller starts over. Once a connection
/// is stored it is never replaced.
pub struct ConnectionManager {
    bus: Arc<dyn MessageBus>,
    options: ClientOptions,
    connection: OnceCell<ConnectionHandle>,
    in_flight: Mutex<Option<Attempt>>,
}

impl ConnectionManager {
    /// Creates a manager for the bus described by `options`.
    pub fn new(bus: Arc<dyn MessageBus>, options: ClientOptions) -> Self {
        Self {
            bus,
            options,
            connection: OnceCell::new(),
            in_flight: Mutex::new(None),
        }
    }

    /// Returns the connection, establishing it first if needed.
    ///
    /// # Errors
    ///
    /// Returns [`BusError::Discovery`] or [`BusError::Connection`] (or whatever
    /// the transport reports) if the bus cannot be reached.
    pub async fn get_connection(&self) -> Result<ConnectionHandle, BusError> {
        if let Some(connection) = self.connection.get() {
            tracing::trace!("Reusing message bus connection");
            return Ok(connection.clone());
        }

        let attempt = self.join_attempt();
        let outcome = attempt.clone().await;
        if let Ok(connection) = &outcome {
            let _ = self.connection.set(connection.clone());
        }

        let mut in_flight = self.lock_in_flight();
        if in_flight
            .as_ref()
            .is_some_and(|current| current.ptr_eq(&attempt))
        {
            *in_flight = None;
        }
        outcome
    }

    /// Returns `true` once a connection has been stored.
    pub fn is_connected(&self) -> bool {
        self.connection.initialized()
    }

    /// Returns the running attempt, starting one if there is none.
    fn join_attempt(&self) -> Attempt {
        let mut in_flight = self.lock_in_flight();
        if let Some(attempt) = in_flight.as_ref() {
            tracing::trace!("Joining in-flight message bus connection attempt");
            return attempt.clone();
        }
        let attempt = establish(Arc::clone(&self.bus), self.options.clone())
            .boxed()
            .shared();
        *in_flight = Some(attempt.clone());
        attempt
    }

    fn lock_in_flight(&self) -> MutexGuard<'_, Option<Attempt>> {
        self.in_flight.lock().unwrap_or_else(|e| e.into_inner())
    }
}

async fn establish(
    bus: Arc<dyn MessageBus>,
    options: ClientOptions,
) -> Result<ConnectionHandle, BusError> {
    let host = options.host.as_str();
    tracing::debug!(
        "Discovering message bus publish endpoint at {}:{}",
        host,
        options.port
    );
    let endpoint = bus.discover_publish_endpoint(options.port, host).await?;

    let connection = bus.connect_with_retries(&endpoint, host).await?;
    tracing::info!(
        "Connected to message bus at {}:{}",
        host,
        endpoint.publish_port
    );
    Ok(connection)
}
