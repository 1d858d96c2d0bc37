use clap::Parser;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::chat::messages::MessageKind;

/// Command-line flags. Every option is optional so that only flags the
/// operator actually passed override the TOML file and environment.
#[derive(Parser, Serialize, Deserialize, Clone, Debug, Default)]
#[command(name = "netchat-operator", version, about = "NetChat operator hub")]
pub struct Cli {
    /// Path to TOML config file
    #[arg(long, default_value = "./netchat.toml")]
    #[serde(skip)]
    pub config: String,

    /// Address the kiosk TCP listener binds to
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_ip: Option<String>,

    /// Port the kiosk TCP listener binds to
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_port: Option<u16>,

    /// Seconds without any frame before a client is forced offline
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_timeout_seconds: Option<u64>,

    /// Seconds between liveness sweeps
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heartbeat_interval_seconds: Option<u64>,

    /// Address the operator UI bridge (HTTP + WebSocket) binds to
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ui_bind_address: Option<String>,

    /// Port of the operator UI bridge
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ui_port: Option<u16>,

    /// Data directory for the SQLite history database
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<String>,

    /// Enable structured JSON logging
    #[arg(long)]
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub json_logs: bool,

    /// Seed 20 online and 10 offline virtual devices (manual UI testing)
    #[arg(long)]
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub virtual_devices: bool,

    /// Output a commented TOML config template and exit
    #[arg(long)]
    #[serde(skip)]
    pub generate_config: bool,
}

/// Notification sound file per message category. Empty means no sound.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoundConfig {
    #[serde(default)]
    pub chat: String,
    #[serde(default)]
    pub payment: String,
    #[serde(default)]
    pub shutdown: String,
}

impl SoundConfig {
    /// Configured sound path for a category, if any.
    pub fn path_for(&self, kind: MessageKind) -> Option<String> {
        let path = match kind {
            MessageKind::Chat => &self.chat,
            MessageKind::Payment => &self.payment,
            MessageKind::Shutdown => &self.shutdown,
        };
        (!path.is_empty()).then(|| path.clone())
    }
}

/// Effective operator configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_server_ip")]
    pub server_ip: String,

    #[serde(default = "default_server_port")]
    pub server_port: u16,

    /// Liveness threshold, independent of the sweep interval
    #[serde(default = "default_client_timeout")]
    pub client_timeout_seconds: u64,

    /// Sweep interval of the liveness monitor
    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval_seconds: u64,

    #[serde(default = "default_ui_bind_address")]
    pub ui_bind_address: String,

    #[serde(default = "default_ui_port")]
    pub ui_port: u16,

    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    #[serde(default)]
    pub json_logs: bool,

    #[serde(default)]
    pub virtual_devices: bool,

    #[serde(default)]
    pub sounds: SoundConfig,
}

fn default_server_ip() -> String {
    "0.0.0.0".to_string()
}

fn default_server_port() -> u16 {
    5000
}

fn default_client_timeout() -> u64 {
    25
}

fn default_heartbeat_interval() -> u64 {
    20
}

fn default_ui_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_ui_port() -> u16 {
    5080
}

fn default_data_dir() -> String {
    "./data".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_ip: default_server_ip(),
            server_port: default_server_port(),
            client_timeout_seconds: default_client_timeout(),
            heartbeat_interval_seconds: default_heartbeat_interval(),
            ui_bind_address: default_ui_bind_address(),
            ui_port: default_ui_port(),
            data_dir: default_data_dir(),
            json_logs: false,
            virtual_devices: false,
            sounds: SoundConfig::default(),
        }
    }
}

impl Config {
    /// Layered precedence:
    /// built-in defaults < TOML file < env vars (NETCHAT_*) < CLI flags
    pub fn figment(cli: &Cli) -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&cli.config))
            .merge(Env::prefixed("NETCHAT_"))
            .merge(Serialized::defaults(cli))
    }

    pub fn load(cli: &Cli) -> Result<Self, figment::Error> {
        Self::figment(cli).extract()
    }

    /// Reject settings that would disable liveness detection.
    pub fn validate(&self) -> Result<(), String> {
        if self.client_timeout_seconds == 0 {
            return Err("client_timeout_seconds must be greater than zero".to_string());
        }
        if self.heartbeat_interval_seconds == 0 {
            return Err("heartbeat_interval_seconds must be greater than zero".to_string());
        }
        Ok(())
    }

    pub fn tcp_address(&self) -> String {
        format!("{}:{}", self.server_ip, self.server_port)
    }

    pub fn ui_address(&self) -> String {
        format!("{}:{}", self.ui_bind_address, self.ui_port)
    }
}

/// Generate a commented TOML config template
pub fn generate_config_template() -> String {
    r#"# NetChat Operator Configuration
# Place this file at ./netchat.toml or specify with --config <path>
# All settings can be overridden via environment variables (NETCHAT_SERVER_PORT, etc.)
# or CLI flags (--server-port, etc.)

# Kiosk TCP listener
# server_ip = "0.0.0.0"
# server_port = 5000

# A client that sends nothing (not even a heartbeat) for this long is
# forced offline by the liveness sweep.
# client_timeout_seconds = 25

# How often the liveness sweep runs
# heartbeat_interval_seconds = 20

# Operator UI bridge (HTTP + WebSocket events)
# ui_bind_address = "127.0.0.1"
# ui_port = 5080

# Directory holding netchat.db
# data_dir = "./data"

# Structured JSON logging
# json_logs = false

# ---- Notification sounds ----
# [sounds]
# chat = ""
# payment = ""
# shutdown = ""
"#
    .to_string()
}
