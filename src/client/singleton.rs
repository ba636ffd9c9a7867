//! Process-wide tracked client.
//!
//! The first call to [`get_instance`] decides the options and transport for
//! the rest of the process. Later calls get the same client back no matter
//! what they pass.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::bus::MessageBus;
use crate::client::dispatcher::DashboardMessageBusClient;
use crate::client::tracking::TrackedClient;
use crate::config::ClientOptions;

/// Type of the process-wide client.
pub type SharedClient = TrackedClient<DashboardMessageBusClient>;

static INSTANCE: Mutex<Option<Arc<SharedClient>>> = Mutex::new(None);

fn slot() -> MutexGuard<'static, Option<Arc<SharedClient>>> {
    INSTANCE.lock().unwrap_or_else(|e| e.into_inner())
}

/// Returns the process-wide client, creating it on first use.
///
/// `options` defaults to `localhost:24012`. Both arguments only matter on the
/// very first call; afterwards they are ignored.
pub fn get_instance(
    options: Option<ClientOptions>,
    bus: Arc<dyn MessageBus>,
) -> Arc<SharedClient> {
    let mut slot = slot();
    if let Some(client) = slot.as_ref() {
        if let Some(ignored) = options.filter(|o| o != client.options()) {
            tracing::debug!(
                "Message bus client already created for {}:{}, ignoring {}:{}",
                client.options().host,
                client.options().port,
                ignored.host,
                ignored.port
            );
        }
        return Arc::clone(client);
    }

    let options = options.unwrap_or_default();
    tracing::debug!(
        "Creating message bus client for {}:{}",
        options.host,
        options.port
    );
    let client = Arc::new(TrackedClient::new(DashboardMessageBusClient::new(
        options, bus,
    )));
    *slot = Some(Arc::clone(&client));
    client
}

/// Returns the process-wide client if one has been created.
pub fn try_instance() -> Option<Arc<SharedClient>> {
    slot().clone()
}

/// Forgets the process-wide client so the next test starts fresh.
#[cfg(test)]
pub(crate) fn reset_instance() {
    slot().take();
}

impl SharedClient {
    /// Options the wrapped client was built with.
    pub fn options(&self) -> &ClientOptions {
        self.inner().options()
    }
}
