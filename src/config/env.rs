use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use super::{ServerConfig, TlsConfig};

/// Read an environment variable, treating empty values as unset.
pub(super) fn env_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Parse an environment variable into `T`, returning a descriptive error on bad input.
pub(super) fn parse_env<T>(name: &str) -> Result<Option<T>, String>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env_var(name) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| format!("Invalid value for {name}: {e}")),
        None => Ok(None),
    }
}

/// Parse a boolean flag. Accepts true/false, 1/0, yes/no, on/off.
pub(super) fn parse_bool(name: &str) -> Result<Option<bool>, String> {
    match env_var(name) {
        Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(Some(true)),
            "false" | "0" | "no" | "off" => Ok(Some(false)),
            other => Err(format!("Invalid boolean for {name}: {other}")),
        },
        None => Ok(None),
    }
}

/// Build a [`ServerConfig`] from environment variables layered over defaults.
///
/// No validation happens here; callers validate after any YAML merge.
pub(super) fn load_from_env() -> Result<ServerConfig, Box<dyn std::error::Error>> {
    let mut config = ServerConfig::default();

    if let Some(host) = env_var("HOST") {
        config.host = host;
    }
    if let Some(port) = parse_env::<u16>("PORT")? {
        config.port = port;
    }
    config.public_host = env_var("PUBLIC_HOST");

    let tls_enabled = parse_bool("TLS_ENABLED")?.unwrap_or(false);
    if tls_enabled {
        let cert_path = env_var("TLS_CERT_PATH")
            .ok_or("TLS_ENABLED is set but TLS_CERT_PATH is missing")?;
        let key_path =
            env_var("TLS_KEY_PATH").ok_or("TLS_ENABLED is set but TLS_KEY_PATH is missing")?;
        config.tls = Some(TlsConfig {
            cert_path: PathBuf::from(cert_path),
            key_path: PathBuf::from(key_path),
        });
    }

    config.openai_api_key = env_var("OPENAI_API_KEY");
    if let Some(url) = env_var("OPENAI_REALTIME_URL") {
        config.realtime_url = url;
    }
    if let Some(model) = env_var("OPENAI_REALTIME_MODEL") {
        config.realtime_model = model;
    }
    if let Some(voice) = env_var("REALTIME_VOICE") {
        config.realtime_voice = voice;
    }
    if let Some(temperature) = parse_env::<f32>("REALTIME_TEMPERATURE")? {
        config.realtime_temperature = temperature;
    }
    if let Some(path) = env_var("INSTRUCTIONS_PATH") {
        config.instructions_path = PathBuf::from(path);
    }

    config.twilio_account_sid = env_var("TWILIO_ACCOUNT_SID");
    config.twilio_auth_token = env_var("TWILIO_AUTH_TOKEN");
    config.twilio_webhook_url = env_var("TWILIO_WEBHOOK_URL");
    if let Some(base) = env_var("TWILIO_API_BASE_URL") {
        config.twilio_api_base_url = base;
    }
    if let Some(country) = env_var("TWILIO_NUMBER_COUNTRY") {
        config.twilio_number_country = country.to_ascii_uppercase();
    }

    if let Some(symmetric) = parse_bool("SYMMETRIC_SHUTDOWN")? {
        config.symmetric_shutdown = symmetric;
    }
    if let Some(marks) = parse_bool("PLAYBACK_MARKS")? {
        config.playback_marks = marks;
    }

    if let Some(origins) = env_var("CORS_ALLOWED_ORIGINS") {
        config.cors_allowed_origins = Some(origins);
    }
    if let Some(rps) = parse_env::<u32>("RATE_LIMIT_REQUESTS_PER_SECOND")? {
        config.rate_limit_requests_per_second = rps;
    }
    if let Some(burst) = parse_env::<u32>("RATE_LIMIT_BURST_SIZE")? {
        config.rate_limit_burst_size = burst;
    }
    if let Some(max) = parse_env::<usize>("MAX_WEBSOCKET_CONNECTIONS")? {
        config.max_websocket_connections = Some(max);
    }
    if let Some(per_ip) = parse_env::<u32>("MAX_CONNECTIONS_PER_IP")? {
        config.max_connections_per_ip = per_ip;
    }

    Ok(config)
}
