//! Dashboard message bus client.
//!
//! A client facade over a message bus transport. It connects lazily the first
//! time a message is sent, treats an absent bus as a quiet no-op, and keeps
//! track of every request still in flight so a process can wait for them
//! before it exits.
//!
//! The transport itself (port discovery, socket framing, retries, reply
//! correlation) is supplied by the caller as a [`MessageBus`] implementation.
//!
//! # Shutdown
//!
//! ```ignore
//! let client = dashboard_message_bus_client::get_instance(None, bus);
//! let _ = client.send_and_await(SendRequest::new("debug-log", payload));
//! // ... later, before exiting:
//! client.wait_for_outstanding_tasks().await;
//! ```

/// Message bus transport contract.
pub mod bus;

/// Client, connection management, task tracking and the shared instance.
pub mod client;

/// Client options.
pub mod config;

/// Tracing subscriber setup for host programs.
pub mod logging;

pub use bus::{BusError, ConnectionHandle, Endpoint, Message, MessageBus};
pub use client::{
    get_instance, try_instance, ClientError, ClientResult, DashboardMessageBusClient,
    MessageBusClient, PendingTask, SendRequest, SharedClient, TaskFuture, TaskId, TrackedClient,
};
pub use config::ClientOptions;
