//! In-memory transport for unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Semaphore;

use crate::bus::{BusError, ConnectionHandle, Endpoint, Message, MessageBus};

/// What `send_and_await` answers with.
#[derive(Debug, Clone)]
pub(crate) enum Reply {
    Value(Option<Value>),
    Reject(String),
    Lost,
}

pub(crate) struct ScriptedBus {
    discover_calls: AtomicUsize,
    connect_calls: AtomicUsize,
    send_calls: AtomicUsize,
    fail_discovery: bool,
    fail_connect: bool,
    connect_delay: Duration,
    reply: Reply,
    hold: Option<Arc<Semaphore>>,
    last_discovery: Mutex<Option<(String, u16)>>,
    sent: Mutex<Vec<Message>>,
}

impl ScriptedBus {
    pub(crate) fn new() -> Self {
        Self {
            discover_calls: AtomicUsize::new(0),
            connect_calls: AtomicUsize::new(0),
            send_calls: AtomicUsize::new(0),
            fail_discovery: false,
            fail_connect: false,
            connect_delay: Duration::ZERO,
            reply: Reply::Value(None),
            hold: None,
            last_discovery: Mutex::new(None),
            sent: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn with_discovery_failures(mut self) -> Self {
        self.fail_discovery = true;
        self
    }

    pub(crate) fn with_connect_failures(mut self) -> Self {
        self.fail_connect = true;
        self
    }

    pub(crate) fn with_connect_delay(mut self, delay: Duration) -> Self {
        self.connect_delay = delay;
        self
    }

    pub(crate) fn with_reply(mut self, reply: Reply) -> Self {
        self.reply = reply;
        self
    }

    /// Replies wait for a permit on `gate` before answering.
    pub(crate) fn with_gate(mut self, gate: Arc<Semaphore>) -> Self {
        self.hold = Some(gate);
        self
    }

    pub(crate) fn discover_calls(&self) -> usize {
        self.discover_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn connect_calls(&self) -> usize {
        self.connect_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn send_calls(&self) -> usize {
        self.send_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn last_discovery(&self) -> Option<(String, u16)> {
        self.last_discovery.lock().expect("lock poisoned").clone()
    }

    pub(crate) fn sent(&self) -> Vec<Message> {
        self.sent.lock().expect("lock poisoned").clone()
    }
}

#[async_trait]
impl MessageBus for ScriptedBus {
    async fn discover_publish_endpoint(
        &self,
        port: u16,
        host: &str,
    ) -> Result<Endpoint, BusError> {
        self.discover_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_discovery.lock().expect("lock poisoned") = Some((host.to_string(), port));
        if self.fail_discovery {
            return Err(BusError::Discovery {
                host: host.to_string(),
                port,
                message: "connection refused".to_string(),
            });
        }
        Ok(Endpoint::new(port + 1))
    }

    async fn connect_with_retries(
        &self,
        endpoint: &Endpoint,
        host: &str,
    ) -> Result<ConnectionHandle, BusError> {
        self.connect_calls.fetch_add(1, Ordering::SeqCst);
        if !self.connect_delay.is_zero() {
            tokio::time::sleep(self.connect_delay).await;
        }
        if self.fail_connect {
            return Err(BusError::Connection {
                host: host.to_string(),
                port: endpoint.publish_port,
                attempts: 3,
                message: "connection refused".to_string(),
            });
        }
        Ok(ConnectionHandle::new(endpoint.publish_port))
    }

    async fn send_and_await(
        &self,
        _connection: &ConnectionHandle,
        message: Message,
    ) -> Result<Option<Value>, BusError> {
        self.send_calls.fetch_add(1, Ordering::SeqCst);
        let message_id = message.id;
        self.sent.lock().expect("lock poisoned").push(message);
        if let Some(gate) = &self.hold {
            gate.acquire()
                .await
                .expect("gate closed")
                .forget();
        }
        match &self.reply {
            Reply::Value(value) => Ok(value.clone()),
            Reply::Reject(reason) => Err(BusError::Rejected {
                message_id,
                reason: reason.clone(),
            }),
            Reply::Lost => Err(BusError::Connection {
                host: "localhost".to_string(),
                port: 24013,
                attempts: 1,
                message: "socket closed".to_string(),
            }),
        }
    }
}
