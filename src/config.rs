//! Process-wide configuration for the Handoff core and its demo host.
//!
//! Loaded the way the teacher's `Config::load()` does: explicit path env
//! var, then default file locations, then plain environment variables,
//! then built-in defaults. The keys here are exactly the ones spec.md §6
//! lists as consumed at process-wide level, plus the ambient `listen_addr`
//! / `log_level` / `metrics_enabled` the demo binary needs.
//!
//! This struct is the *boot* configuration — `grpc_mode` and
//! `handoff_enable_presigned_expiry_check` are read once at startup
//! (spec.md §3: `RuntimeConfig`'s boot-only fields). Everything else here
//! seeds the initial [`crate::types::RuntimeConfig`] and
//! [`crate::types::TransportChannelSpec`] that the Runtime Config Observer
//! subsequently owns and mutates.

use std::net::SocketAddr;

use serde::{Deserialize, Serialize};

use crate::error::AuthError;
use crate::types::{AuthCaptureMode, ChannelArgs, RuntimeConfig, TransportChannelSpec};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Address the demo binary listens on.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,

    /// `tracing_subscriber::EnvFilter` directive string.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Whether to mount `GET /metrics`.
    #[serde(default = "default_metrics_enabled")]
    pub metrics_enabled: bool,

    /// Boot-only: primary transport is RPC (true) or HTTP (false).
    #[serde(default = "default_grpc_mode")]
    pub grpc_mode: bool,

    /// Boot-only: whether SIN checks presigned-URL expiry at all.
    #[serde(default = "default_enable_presigned_expiry_check")]
    pub handoff_enable_presigned_expiry_check: bool,

    #[serde(default = "default_grpc_uri")]
    pub handoff_grpc_uri: String,
    #[serde(default = "default_initial_backoff_ms")]
    pub handoff_grpc_arg_initial_reconnect_backoff_ms: u64,
    #[serde(default = "default_min_backoff_ms")]
    pub handoff_grpc_arg_min_reconnect_backoff_ms: u64,
    #[serde(default = "default_max_backoff_ms")]
    pub handoff_grpc_arg_max_reconnect_backoff_ms: u64,

    #[serde(default = "default_true")]
    pub handoff_enable_chunked_upload: bool,
    #[serde(default = "default_true")]
    pub handoff_enable_signature_v2: bool,
    #[serde(default)]
    pub handoff_authparam_always: bool,
    #[serde(default)]
    pub handoff_authparam_withtoken: bool,

    /// HTTP-transport-only: base URI of the Authenticator's `/verify` endpoint.
    #[serde(default = "default_handoff_uri")]
    pub handoff_uri: String,
    /// HTTP-transport-only: verify TLS certificates on outbound calls.
    #[serde(default = "default_true")]
    pub handoff_verify_ssl: bool,
}

fn default_listen_addr() -> SocketAddr {
    "127.0.0.1:9000".parse().unwrap()
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_metrics_enabled() -> bool {
    true
}
fn default_grpc_mode() -> bool {
    true
}
fn default_enable_presigned_expiry_check() -> bool {
    true
}
fn default_grpc_uri() -> String {
    "http://127.0.0.1:50051".to_string()
}
fn default_initial_backoff_ms() -> u64 {
    1_000
}
fn default_min_backoff_ms() -> u64 {
    1_000
}
fn default_max_backoff_ms() -> u64 {
    120_000
}
fn default_handoff_uri() -> String {
    "http://127.0.0.1:8080".to_string()
}
fn default_true() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            log_level: default_log_level(),
            metrics_enabled: default_metrics_enabled(),
            grpc_mode: default_grpc_mode(),
            handoff_enable_presigned_expiry_check: default_enable_presigned_expiry_check(),
            handoff_grpc_uri: default_grpc_uri(),
            handoff_grpc_arg_initial_reconnect_backoff_ms: default_initial_backoff_ms(),
            handoff_grpc_arg_min_reconnect_backoff_ms: default_min_backoff_ms(),
            handoff_grpc_arg_max_reconnect_backoff_ms: default_max_backoff_ms(),
            handoff_enable_chunked_upload: true,
            handoff_enable_signature_v2: true,
            handoff_authparam_always: false,
            handoff_authparam_withtoken: false,
            handoff_uri: default_handoff_uri(),
            handoff_verify_ssl: true,
        }
    }
}

impl Config {
    pub fn from_file(path: &str) -> Result<Self, AuthError> {
        let content = std::fs::read_to_string(path).map_err(|e| AuthError::ConfigRead {
            path: path.to_string(),
            source: e,
        })?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Legacy env-var loading path, kept for parity with the teacher's
    /// `Config::from_env()` — useful in containerized deployments that
    /// inject config purely through the environment.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("HANDOFF_LISTEN_ADDR") {
            if let Ok(parsed) = addr.parse() {
                config.listen_addr = parsed;
            }
        }
        if let Ok(level) = std::env::var("HANDOFF_LOG_LEVEL") {
            config.log_level = level;
        }
        if let Ok(v) = std::env::var("HANDOFF_METRICS_ENABLED") {
            config.metrics_enabled = v == "true" || v == "1";
        }
        if let Ok(v) = std::env::var("HANDOFF_GRPC_MODE") {
            config.grpc_mode = v == "true" || v == "1";
        }
        if let Ok(uri) = std::env::var("handoff_grpc_uri") {
            config.handoff_grpc_uri = uri;
        }
        if let Ok(v) = std::env::var("handoff_grpc_arg_initial_reconnect_backoff_ms") {
            if let Ok(parsed) = v.parse() {
                config.handoff_grpc_arg_initial_reconnect_backoff_ms = parsed;
            }
        }
        if let Ok(v) = std::env::var("handoff_grpc_arg_min_reconnect_backoff_ms") {
            if let Ok(parsed) = v.parse() {
                config.handoff_grpc_arg_min_reconnect_backoff_ms = parsed;
            }
        }
        if let Ok(v) = std::env::var("handoff_grpc_arg_max_reconnect_backoff_ms") {
            if let Ok(parsed) = v.parse() {
                config.handoff_grpc_arg_max_reconnect_backoff_ms = parsed;
            }
        }
        if let Ok(v) = std::env::var("handoff_enable_chunked_upload") {
            config.handoff_enable_chunked_upload = v == "true" || v == "1";
        }
        if let Ok(v) = std::env::var("handoff_enable_signature_v2") {
            config.handoff_enable_signature_v2 = v == "true" || v == "1";
        }
        if let Ok(v) = std::env::var("handoff_authparam_always") {
            config.handoff_authparam_always = v == "true" || v == "1";
        }
        if let Ok(v) = std::env::var("handoff_authparam_withtoken") {
            config.handoff_authparam_withtoken = v == "true" || v == "1";
        }
        if let Ok(v) = std::env::var("handoff_enable_presigned_expiry_check") {
            config.handoff_enable_presigned_expiry_check = v == "true" || v == "1";
        }
        if let Ok(uri) = std::env::var("handoff_uri") {
            config.handoff_uri = uri;
        }
        if let Ok(v) = std::env::var("handoff_verify_ssl") {
            config.handoff_verify_ssl = v == "true" || v == "1";
        }

        config
    }

    /// Explicit path env var → default file locations → environment → defaults.
    pub fn load() -> Self {
        if let Ok(path) = std::env::var("HANDOFF_CONFIG") {
            if let Ok(config) = Self::from_file(&path) {
                return config;
            }
        }

        for path in &["handoff.toml", "/etc/handoff/config.toml"] {
            if std::path::Path::new(path).exists() {
                if let Ok(config) = Self::from_file(path) {
                    return config;
                }
            }
        }

        Self::from_env()
    }

    /// The initial [`RuntimeConfig`] snapshot, built from this boot config.
    pub fn runtime_config(&self) -> RuntimeConfig {
        RuntimeConfig {
            grpc_mode: self.grpc_mode,
            presigned_expiry_check: self.handoff_enable_presigned_expiry_check,
            signature_v2_enabled: self.handoff_enable_signature_v2,
            chunked_upload_enabled: self.handoff_enable_chunked_upload,
            authorization_capture_mode: AuthCaptureMode::from_toggles(
                self.handoff_authparam_always,
                self.handoff_authparam_withtoken,
            ),
        }
    }

    /// The initial RPC [`TransportChannelSpec`], used only when `grpc_mode` is true.
    pub fn channel_spec(&self) -> TransportChannelSpec {
        TransportChannelSpec {
            uri: self.handoff_grpc_uri.clone(),
            args: ChannelArgs {
                initial_backoff_ms: self.handoff_grpc_arg_initial_reconnect_backoff_ms,
                min_backoff_ms: self.handoff_grpc_arg_min_reconnect_backoff_ms,
                max_backoff_ms: self.handoff_grpc_arg_max_reconnect_backoff_ms,
            },
        }
    }
}
