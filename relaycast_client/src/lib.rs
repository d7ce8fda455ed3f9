//! The client component (spec §4.C): a single outbound link, a handshake
//! watcher, and an HTTP-reassembly-aware receiver.

pub mod error;
pub mod instance;
pub mod params;
pub mod receiver;
pub mod watcher;

pub use error::ClientError;
pub use instance::ClientInstance;
pub use params::ClientParams;

use relaycast_core::registry::Registry;
use std::sync::{Arc, OnceLock};

static REGISTRY: OnceLock<Registry<ClientInstance>> = OnceLock::new();

fn registry() -> &'static Registry<ClientInstance> {
    REGISTRY.get_or_init(Registry::new)
}

/// Construct, register, and start a client instance (spec §4.C `start`).
pub fn start(params: ClientParams) -> Result<Arc<ClientInstance>, ClientError> {
    let name = params.name.clone();
    let instance = ClientInstance::spawn(params)?;
    registry()
        .insert(&name, instance.clone())
        .map_err(|_| ClientError::NameTaken(name))?;
    Ok(instance)
}

pub fn find(name: &str) -> Option<Arc<ClientInstance>> {
    registry().get(name)
}

/// `stop` (spec §4.C): mirror of server stop.
pub fn stop(name: &str) -> Result<(), ClientError> {
    let instance = registry().remove(name).ok_or_else(|| ClientError::NotFound(name.to_string()))?;
    instance.shutdown();
    Ok(())
}
