//! Error types reported by a [`MessageBus`](super::MessageBus) transport.

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Errors that a message bus transport can report.
///
/// Cloneable so that one failed connection attempt can be handed to every
/// caller waiting on it.
///
/// [`BusError::Discovery`] and [`BusError::Connection`] together form the
/// *connection error* category: the bus could not be reached at all. The
/// client treats that category as "no dashboard listening" and drops the
/// request quietly. Every other variant means the bus was reachable but the
/// exchange itself failed, and is handed back to the caller.
#[derive(Error, Debug, Clone)]
pub enum BusError {
    /// The publish endpoint could not be resolved from the lobby port.
    #[error("Failed to discover message bus ports at {host}:{port}: {message}")]
    Discovery {
        /// Host that was queried.
        host: String,
        /// Lobby port that was queried.
        port: u16,
        /// Description of the failure.
        message: String,
    },

    /// The transport gave up connecting after exhausting its retry policy.
    #[error("Failed to connect to message bus at {host}:{port} after {attempts} attempts: {message}")]
    Connection {
        /// Host of the publish endpoint.
        host: String,
        /// Publish port.
        port: u16,
        /// Number of connection attempts made.
        attempts: u32,
        /// Description of the last failure.
        message: String,
    },

    /// The message could not be serialized for the wire.
    #[error("Failed to encode message of type '{message_type}'")]
    Encode {
        /// Type discriminator of the message.
        message_type: String,
        /// Underlying serialization error.
        #[source]
        source: Arc<serde_json::Error>,
    },

    /// No reply arrived within the transport's own deadline.
    #[error("Timed out after {waited:?} waiting for reply to message {message_id}")]
    Timeout {
        /// Identifier of the unanswered message.
        message_id: u64,
        /// How long the transport waited.
        waited: Duration,
    },

    /// The bus answered, but refused the message.
    #[error("Message {message_id} rejected by message bus: {reason}")]
    Rejected {
        /// Identifier of the rejected message.
        message_id: u64,
        /// Reason given by the bus.
        reason: String,
    },

    /// The reply was malformed or otherwise violated the protocol.
    #[error("Message bus protocol error: {message}")]
    Protocol {
        /// Description of the violation.
        message: String,
    },
}

impl BusError {
    /// Returns `true` if the bus could not be reached at all.
    pub fn is_connection_error(&self) -> bool {
        matches!(self, BusError::Discovery { .. } | BusError::Connection { .. })
    }
}
