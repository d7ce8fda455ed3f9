//! The server component (spec §4.B): a named listener + dynamic client set,
//! broadcasting producer-supplied frames to every authorized receiver with
//! non-blocking backpressure.

pub mod client_entry;
pub mod error;
pub mod instance;
pub mod params;
pub mod sender;
pub mod watcher;

pub use client_entry::ClientEntry;
pub use error::ServerError;
pub use instance::ServerInstance;
pub use params::{AcceptMode, ClientStateChange, ServerParams};

use relaycast_core::registry::Registry;
use std::sync::{Arc, OnceLock};

static REGISTRY: OnceLock<Registry<ServerInstance>> = OnceLock::new();

fn registry() -> &'static Registry<ServerInstance> {
    REGISTRY.get_or_init(Registry::new)
}

/// Construct, register, and start a server instance (spec §4.B `start`).
pub fn start(params: ServerParams) -> Result<Arc<ServerInstance>, ServerError> {
    let name = params.name.clone();
    let instance = ServerInstance::spawn(params)?;
    registry()
        .insert(&name, instance.clone())
        .map_err(|_| ServerError::NameTaken(name))?;
    Ok(instance)
}

/// Look up a running instance by name.
pub fn find(name: &str) -> Option<Arc<ServerInstance>> {
    registry().get(name)
}

/// Stop and unregister a server instance by name (spec §4.B `stop`).
pub fn stop(name: &str) -> Result<(), ServerError> {
    let instance = registry().remove(name).ok_or_else(|| ServerError::NotFound(name.to_string()))?;
    instance.shutdown();
    Ok(())
}
