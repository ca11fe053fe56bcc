//! Configuration module for the CallBridge gateway
//!
//! This module handles server configuration from various sources: .env files, YAML files,
//! and environment variables. Priority: YAML > ENV vars > .env values > defaults.
//!
//! # Modules
//! - `yaml`: YAML configuration file loading
//! - `env`: Environment variable loading
//! - `merge`: Merging YAML and environment configurations
//! - `validation`: Configuration validation logic
//!
//! # Example
//! ```rust,no_run
//! use callbridge_gateway::config::ServerConfig;
//! use std::path::PathBuf;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Load from environment variables only
//! let config = ServerConfig::from_env()?;
//!
//! // Load from YAML file with environment variable overrides
//! let config_path = PathBuf::from("config.yaml");
//! let config = ServerConfig::from_file(&config_path)?;
//!
//! println!("Server listening on {}", config.address());
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;

mod env;
mod merge;
mod validation;
mod yaml;

pub use validation::ConfigError;

/// Default bind port for the media stream server.
pub const DEFAULT_PORT: u16 = 5050;

/// Default OpenAI Realtime WebSocket endpoint (model is appended as a query parameter).
pub const DEFAULT_REALTIME_URL: &str = "wss://api.openai.com/v1/realtime";

/// Default realtime model used for phone calls.
pub const DEFAULT_REALTIME_MODEL: &str = "gpt-4o-mini-realtime-preview-2024-12-17";

/// Default Twilio REST API base URL.
pub const DEFAULT_TWILIO_API_BASE_URL: &str = "https://api.twilio.com";

/// TLS configuration for HTTPS and WSS
#[derive(Debug, Clone)]
pub struct TlsConfig {
    /// Path to the TLS certificate file (PEM format)
    pub cert_path: PathBuf,
    /// Path to the TLS private key file (PEM format)
    pub key_path: PathBuf,
}

/// Server configuration
///
/// Contains all configuration needed to run the gateway, including:
/// - Server settings (host, port, TLS, public host)
/// - OpenAI Realtime session settings
/// - Twilio credentials used for number provisioning
/// - Bridge behaviour toggles
/// - Security settings (CORS, rate limiting, connection limits)
///
/// `ServerConfig` implements `Drop`, so build test values from
/// [`ServerConfig::default`] and assign fields rather than using struct update syntax.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    // Server settings
    pub host: String,
    pub port: u16,

    // TLS configuration (optional)
    pub tls: Option<TlsConfig>,

    /// Host advertised in the TwiML stream URL. Falls back to the request `Host` header.
    pub public_host: Option<String>,

    // OpenAI Realtime settings
    pub openai_api_key: Option<String>,
    pub realtime_url: String,
    pub realtime_model: String,
    pub realtime_voice: String,
    pub realtime_temperature: f32,
    /// File holding the operator-supplied session instructions
    pub instructions_path: PathBuf,

    // Twilio settings
    pub twilio_account_sid: Option<String>,
    pub twilio_auth_token: Option<String>,
    pub twilio_webhook_url: Option<String>,
    pub twilio_api_base_url: String,
    pub twilio_number_country: String,

    // Bridge behaviour
    /// Close the telephony socket as well when the provider side ends first
    pub symmetric_shutdown: bool,
    /// Emit a playback mark after every forwarded audio frame
    pub playback_marks: bool,

    // Security settings
    pub cors_allowed_origins: Option<String>,
    pub rate_limit_requests_per_second: u32,
    pub rate_limit_burst_size: u32,
    pub max_websocket_connections: Option<usize>,
    pub max_connections_per_ip: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            tls: None,
            public_host: None,
            openai_api_key: None,
            realtime_url: DEFAULT_REALTIME_URL.to_string(),
            realtime_model: DEFAULT_REALTIME_MODEL.to_string(),
            realtime_voice: "alloy".to_string(),
            realtime_temperature: 0.8,
            instructions_path: PathBuf::from("instr.txt"),
            twilio_account_sid: None,
            twilio_auth_token: None,
            twilio_webhook_url: None,
            twilio_api_base_url: DEFAULT_TWILIO_API_BASE_URL.to_string(),
            twilio_number_country: "US".to_string(),
            symmetric_shutdown: false,
            playback_marks: false,
            cors_allowed_origins: Some("*".to_string()),
            rate_limit_requests_per_second: 60,
            rate_limit_burst_size: 10,
            max_websocket_connections: None,
            max_connections_per_ip: 100,
        }
    }
}

/// Zeroize secret fields when the configuration is dropped.
impl Drop for ServerConfig {
    fn drop(&mut self) {
        use zeroize::Zeroize;

        if let Some(ref mut key) = self.openai_api_key {
            key.zeroize();
        }
        if let Some(ref mut token) = self.twilio_auth_token {
            token.zeroize();
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables only
    ///
    /// Reads every supported variable (see `env.rs`), falls back to defaults,
    /// then validates the result.
    ///
    /// # Errors
    /// Returns an error if a variable has an invalid format or validation fails.
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        let config = env::load_from_env()?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a YAML file with environment variable base
    ///
    /// Priority order (highest to lowest):
    /// 1. YAML file values
    /// 2. Environment variables (actual ENV vars override .env values)
    /// 3. .env file values
    /// 4. Default values
    ///
    /// # Errors
    /// Returns an error if:
    /// - The YAML file cannot be read or is malformed
    /// - Environment variables have invalid formats
    /// - Configuration validation fails
    pub fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        // .env is loaded in main.rs, so env values here already include it
        let yaml_config = yaml::YamlConfig::from_file(path)?;
        let config = merge::merge_config(Some(yaml_config))?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Get the server address as a string in the format "host:port"
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Check if TLS is enabled
    pub fn is_tls_enabled(&self) -> bool {
        self.tls.is_some()
    }

    /// Full provider endpoint including the model query parameter
    pub fn realtime_endpoint(&self) -> String {
        let separator = if self.realtime_url.contains('?') { '&' } else { '?' };
        format!(
            "{}{}model={}",
            self.realtime_url, separator, self.realtime_model
        )
    }

    /// Twilio account SID and auth token, if both are configured
    pub fn twilio_credentials(&self) -> Option<(String, String)> {
        match (&self.twilio_account_sid, &self.twilio_auth_token) {
            (Some(sid), Some(token)) if !sid.is_empty() && !token.is_empty() => {
                Some((sid.clone(), token.clone()))
            }
            _ => None,
        }
    }
}
