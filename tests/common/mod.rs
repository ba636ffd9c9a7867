//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use dashboard_message_bus_client::{BusError, ConnectionHandle, Endpoint, Message, MessageBus};
use serde_json::Value;
use tokio::sync::Semaphore;

/// How the fake bus behaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Discovery and connect succeed, replies are empty.
    Healthy,
    /// Connect exhausts its retries every time.
    Unreachable,
    /// Connect succeeds but every reply times out.
    ReplyTimeout,
}

/// In-memory message bus that records what the client asks of it.
pub struct FakeBus {
    mode: Mode,
    gate: Option<Arc<Semaphore>>,
    pub discover_calls: AtomicUsize,
    pub connect_calls: AtomicUsize,
    pub send_calls: AtomicUsize,
    pub sent: Mutex<Vec<Message>>,
}

impl FakeBus {
    pub fn new(mode: Mode) -> Arc<Self> {
        Arc::new(Self::build(mode, None))
    }

    /// Replies are held until a permit is added to the returned semaphore.
    pub fn gated(mode: Mode) -> (Arc<Self>, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        (Arc::new(Self::build(mode, Some(Arc::clone(&gate)))), gate)
    }

    fn build(mode: Mode, gate: Option<Arc<Semaphore>>) -> Self {
        Self {
            mode,
            gate,
            discover_calls: AtomicUsize::new(0),
            connect_calls: AtomicUsize::new(0),
            send_calls: AtomicUsize::new(0),
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn discovers(&self) -> usize {
        self.discover_calls.load(Ordering::SeqCst)
    }

    pub fn connects(&self) -> usize {
        self.connect_calls.load(Ordering::SeqCst)
    }

    pub fn sends(&self) -> usize {
        self.send_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MessageBus for FakeBus {
    async fn discover_publish_endpoint(
        &self,
        port: u16,
        _host: &str,
    ) -> Result<Endpoint, BusError> {
        self.discover_calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        Ok(Endpoint::new(port + 1))
    }

    async fn connect_with_retries(
        &self,
        endpoint: &Endpoint,
        host: &str,
    ) -> Result<ConnectionHandle, BusError> {
        self.connect_calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        if self.mode == Mode::Unreachable {
            return Err(BusError::Connection {
                host: host.to_string(),
                port: endpoint.publish_port,
                attempts: 10,
                message: "connection refused".to_string(),
            });
        }
        Ok(ConnectionHandle::new(format!("{}:{}", host, endpoint.publish_port)))
    }

    async fn send_and_await(
        &self,
        connection: &ConnectionHandle,
        message: Message,
    ) -> Result<Option<Value>, BusError> {
        assert!(
            connection.downcast_ref::<String>().is_some(),
            "client must hand back the handle it was given"
        );
        self.send_calls.fetch_add(1, Ordering::SeqCst);
        let message_id = message.id;
        self.sent.lock().expect("lock poisoned").push(message);
        if let Some(gate) = &self.gate {
            gate.acquire().await.expect("gate closed").forget();
        }
        match self.mode {
            Mode::ReplyTimeout => Err(BusError::Timeout {
                message_id,
                waited: std::time::Duration::from_secs(30),
            }),
            _ => Ok(None),
        }
    }
}
