//! `relaycastd`: loads a TOML configuration, starts every configured server,
//! client, and controller plug-in, and blocks until a termination signal
//! arrives. Single-process: no master/worker model.

mod config;

use clap::Parser;
use config::AppConfig;
use relaycast_controller::{CommandEnvelope, ControlFacade, ControllerBus, HandlerCatalogue};
use std::process::ExitCode;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "relaycastd", version, about = "Multimedia relay engine: network fan-out servers, clients, and a plug-in control bus")]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(default_value = "relaycastd.toml")]
    config: String,
}

/// Routes a dispatched command to whichever collaborator owns it, by name
/// convention: `stopServer`/`startServer`/... address a server or client
/// instance by name (carried in `handler_data`); everything else is logged
/// and dropped, since the graphics/video/audio handlers those commands are
/// meant for are out of scope here (spec §2 Non-goals).
struct EngineCatalogue;

impl HandlerCatalogue for EngineCatalogue {
    fn handle_command(&self, envelope: CommandEnvelope) {
        let instance_name = envelope.handler_data.trim();
        match envelope.handler_name {
            "stopServer" => {
                if let Err(err) = relaycast_server::stop(instance_name) {
                    tracing::warn!(instance_name, error = %err, "stopServer failed");
                }
            }
            "suspendServer" => {
                if let Some(instance) = relaycast_server::find(instance_name) {
                    instance.suspend_sender();
                } else {
                    tracing::warn!(instance_name, "suspendServer: no such server");
                }
            }
            "resumeServer" => {
                if let Some(instance) = relaycast_server::find(instance_name) {
                    instance.resume_sender();
                } else {
                    tracing::warn!(instance_name, "resumeServer: no such server");
                }
            }
            "stopClient" => {
                if let Err(err) = relaycast_client::stop(instance_name) {
                    tracing::warn!(instance_name, error = %err, "stopClient failed");
                }
            }
            other => {
                tracing::debug!(handler = other, data = %envelope.handler_data, "command has no local handler, ignored");
            }
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive("relaycast_app=info".parse().unwrap()))
        .init();

    let config = match AppConfig::load(&cli.config) {
        Ok(config) => config,
        Err(err) => {
            tracing::error!(error = %err, "failed to load configuration");
            return ExitCode::FAILURE;
        }
    };

    relaycast_core::signals::install_term_signal();
    relaycast_core::signals::install_wake_signal();

    let mut servers = Vec::new();
    for server_config in config.servers {
        let name = server_config.name.clone();
        match relaycast_server::start(server_config.into_params()) {
            Ok(instance) => {
                tracing::info!(name, "server started");
                servers.push(instance);
            }
            Err(err) => {
                tracing::error!(name, error = %err, "server failed to start");
                return ExitCode::FAILURE;
            }
        }
    }

    let mut clients = Vec::new();
    for client_config in config.clients {
        let name = client_config.name.clone();
        match relaycast_client::start(client_config.into_params()) {
            Ok(instance) => {
                tracing::info!(name, "client started");
                clients.push(instance);
            }
            Err(err) => {
                tracing::error!(name, error = %err, "client failed to start");
                return ExitCode::FAILURE;
            }
        }
    }

    let facade = Arc::new(ControlFacade::new());
    facade.set_catalogue(Arc::new(EngineCatalogue));
    let controller_configs: Vec<_> = config.controllers.into_iter().map(Into::into).collect();
    let bus = match ControllerBus::spawn(facade, &controller_configs) {
        Ok(bus) => Some(bus),
        Err(err) => {
            tracing::error!(error = %err, "controller bus failed to start");
            None
        }
    };
    let bus = match bus {
        Some(bus) => bus,
        None => return ExitCode::FAILURE,
    };

    tracing::info!(
        servers = servers.len(),
        clients = clients.len(),
        controllers = controller_configs.len(),
        "relaycastd is running"
    );

    while !relaycast_core::signals::should_terminate() {
        std::thread::sleep(std::time::Duration::from_millis(250));
    }

    tracing::info!("shutdown requested, stopping components");
    bus.shutdown();
    for client in clients {
        client.shutdown();
    }
    for server in servers {
        server.shutdown();
    }

    ExitCode::SUCCESS
}
