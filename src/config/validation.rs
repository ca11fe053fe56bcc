use thiserror::Error;
use url::Url;

use super::ServerConfig;

/// Configuration problems detected after all sources are merged.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{0} is required")]
    MissingValue(&'static str),

    #[error("{name} is not a valid URL: {reason}")]
    InvalidUrl { name: &'static str, reason: String },

    #[error("REALTIME_TEMPERATURE must be between 0.6 and 1.2, got {0}")]
    TemperatureOutOfRange(f32),

    #[error("TLS {0} does not exist")]
    MissingTlsFile(String),
}

fn require(value: &Option<String>, name: &'static str) -> Result<(), ConfigError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(()),
        _ => Err(ConfigError::MissingValue(name)),
    }
}

fn require_scheme(raw: &str, name: &'static str, schemes: &[&str]) -> Result<(), ConfigError> {
    let url = Url::parse(raw).map_err(|e| ConfigError::InvalidUrl {
        name,
        reason: e.to_string(),
    })?;
    if !schemes.contains(&url.scheme()) {
        return Err(ConfigError::InvalidUrl {
            name,
            reason: format!("scheme must be one of {schemes:?}, got {}", url.scheme()),
        });
    }
    if url.host_str().is_none() {
        return Err(ConfigError::InvalidUrl {
            name,
            reason: "missing host".to_string(),
        });
    }
    Ok(())
}

/// Validate a merged configuration before the server starts.
pub(super) fn validate(config: &ServerConfig) -> Result<(), ConfigError> {
    require(&config.openai_api_key, "OPENAI_API_KEY")?;
    require(&config.twilio_account_sid, "TWILIO_ACCOUNT_SID")?;
    require(&config.twilio_auth_token, "TWILIO_AUTH_TOKEN")?;
    require(&config.twilio_webhook_url, "TWILIO_WEBHOOK_URL")?;

    if let Some(webhook) = &config.twilio_webhook_url {
        require_scheme(webhook, "TWILIO_WEBHOOK_URL", &["http", "https"])?;
    }
    require_scheme(&config.realtime_url, "OPENAI_REALTIME_URL", &["ws", "wss"])?;
    require_scheme(
        &config.twilio_api_base_url,
        "TWILIO_API_BASE_URL",
        &["http", "https"],
    )?;

    if !(0.6..=1.2).contains(&config.realtime_temperature) {
        return Err(ConfigError::TemperatureOutOfRange(
            config.realtime_temperature,
        ));
    }

    if let Some(tls) = &config.tls {
        if !tls.cert_path.exists() {
            return Err(ConfigError::MissingTlsFile(format!(
                "certificate {}",
                tls.cert_path.display()
            )));
        }
        if !tls.key_path.exists() {
            return Err(ConfigError::MissingTlsFile(format!(
                "key {}",
                tls.key_path.display()
            )));
        }
    }

    Ok(())
}
