//! On-disk configuration (spec §4.A `start`): a serde-derived, TOML-backed
//! config structure.

use relaycast_controller::LibraryConfig;
use relaycast_link::{LinkKind, LinkMode, Recipient};
use relaycast_server::AcceptMode;
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read {path:?}: {source}")]
    Read { path: String, source: std::io::Error },
    #[error("could not parse {path:?}: {source}")]
    Parse { path: String, source: toml::de::Error },
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RecipientConfig {
    Inet { host: String, service: String },
    Unix { socket_name: String },
}

impl From<RecipientConfig> for Recipient {
    fn from(value: RecipientConfig) -> Self {
        match value {
            RecipientConfig::Inet { host, service } => Recipient::Inet { host, service },
            RecipientConfig::Unix { socket_name } => Recipient::Unix { socket_name },
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum LinkKindConfig {
    InetStream,
    InetDgram,
    UnixStream,
    UnixDgram,
}

impl From<LinkKindConfig> for LinkKind {
    fn from(value: LinkKindConfig) -> Self {
        match value {
            LinkKindConfig::InetStream => LinkKind::InetStream,
            LinkKindConfig::InetDgram => LinkKind::InetDgram,
            LinkKindConfig::UnixStream => LinkKind::UnixStream,
            LinkKindConfig::UnixDgram => LinkKind::UnixDgram,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum LinkModeConfig {
    Standard,
    Http,
    Custom,
}

impl From<LinkModeConfig> for LinkMode {
    fn from(value: LinkModeConfig) -> Self {
        match value {
            LinkModeConfig::Standard => LinkMode::Standard,
            LinkModeConfig::Http => LinkMode::Http,
            LinkModeConfig::Custom => LinkMode::Custom,
        }
    }
}

fn default_mime() -> String {
    "application/octet-stream".to_string()
}
fn default_max_buffer_size() -> u32 {
    65536
}
fn default_max_clients() -> i32 {
    128
}
fn default_http_path() -> String {
    "/".to_string()
}
fn default_agent_name() -> String {
    "relaycastd".to_string()
}
fn default_agent_version() -> String {
    "1".to_string()
}

#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    pub name: String,
    pub recipient: RecipientConfig,
    pub kind: LinkKindConfig,
    pub mode: LinkModeConfig,
    #[serde(default = "default_mime")]
    pub mime: String,
    #[serde(default = "default_max_buffer_size")]
    pub max_buffer_size: u32,
    #[serde(default)]
    pub manual_accept: bool,
    #[serde(default = "default_http_path")]
    pub http_path: String,
    #[serde(default = "default_agent_name")]
    pub agent_name: String,
    #[serde(default = "default_agent_version")]
    pub agent_version: String,
    #[serde(default = "default_max_clients")]
    pub max_clients: i32,
}

impl ServerConfig {
    pub fn into_params(self) -> relaycast_server::ServerParams {
        let mut params = relaycast_server::ServerParams::new(self.name, self.recipient.into(), self.kind.into(), self.mode.into());
        params.mime = self.mime;
        params.max_buffer_size = self.max_buffer_size;
        params.accept_mode = if self.manual_accept { AcceptMode::Manual } else { AcceptMode::Automatic };
        params.http_path = self.http_path;
        params.agent_name = self.agent_name;
        params.agent_version = self.agent_version;
        params.max_clients = self.max_clients;
        params
    }
}

#[derive(Debug, Deserialize)]
pub struct ClientConfig {
    pub name: String,
    pub recipient: RecipientConfig,
    pub kind: LinkKindConfig,
    pub mode: LinkModeConfig,
    #[serde(default = "default_max_buffer_size")]
    pub max_buffer_size: u32,
    #[serde(default = "default_http_path")]
    pub http_path: String,
    #[serde(default = "default_agent_name")]
    pub agent_name: String,
    #[serde(default = "default_agent_version")]
    pub agent_version: String,
    pub local_name: Option<String>,
}

impl ClientConfig {
    pub fn into_params(self) -> relaycast_client::ClientParams {
        let mut params = relaycast_client::ClientParams::new(self.name, self.recipient.into(), self.kind.into(), self.mode.into());
        params.max_buffer_size = self.max_buffer_size;
        params.http_path = self.http_path;
        params.agent_name = self.agent_name;
        params.agent_version = self.agent_version;
        if let Some(local_name) = self.local_name {
            params.local_name = local_name;
        }
        params
    }
}

#[derive(Debug, Deserialize)]
pub struct ControllerConfig {
    pub path: String,
    #[serde(default = "default_init_symbol")]
    pub init_symbol: String,
    #[serde(default = "default_uninit_symbol")]
    pub uninit_symbol: String,
    #[serde(default = "default_on_command_symbol")]
    pub on_command_symbol: String,
    #[serde(default = "default_on_event_symbol")]
    pub on_event_symbol: String,
}

fn default_init_symbol() -> String {
    "pluginInit".to_string()
}
fn default_uninit_symbol() -> String {
    "pluginUninit".to_string()
}
fn default_on_command_symbol() -> String {
    "pluginOnCommand".to_string()
}
fn default_on_event_symbol() -> String {
    "pluginOnEvent".to_string()
}

impl From<ControllerConfig> for LibraryConfig {
    fn from(value: ControllerConfig) -> Self {
        LibraryConfig {
            path: value.path,
            init_symbol: value.init_symbol,
            uninit_symbol: value.uninit_symbol,
            on_command_symbol: value.on_command_symbol,
            on_event_symbol: value.on_event_symbol,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub servers: Vec<ServerConfig>,
    #[serde(default)]
    pub clients: Vec<ClientConfig>,
    #[serde(default)]
    pub controllers: Vec<ControllerConfig>,
}

impl AppConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<AppConfig, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }
}
