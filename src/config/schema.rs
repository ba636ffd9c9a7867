//! Client options schema.
//!
//! Options derive `Deserialize` and `Serialize` with `#[serde(default)]` so a
//! host application can embed them in its own TOML file and leave out any
//! field it does not care about.

use serde::{Deserialize, Serialize};

/// Host the message bus lobby listens on when none is configured.
pub const DEFAULT_HOST: &str = "localhost";

/// Lobby port of the message bus when none is configured.
pub const DEFAULT_PORT: u16 = 24012;

/// Where to find the message bus.
///
/// Corresponds to:
/// ```toml
/// host = "localhost"
/// port = 24012
/// ```
///
/// Options are fixed once a client is built from them.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct ClientOptions {
    /// Host name of the bus.
    pub host: String,
    /// Lobby port used for publish endpoint discovery.
    pub port: u16,
}

impl ClientOptions {
    /// Creates options for the bus at `host:port`.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}
