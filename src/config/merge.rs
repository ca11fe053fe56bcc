use std::path::PathBuf;

use super::env::load_from_env;
use super::yaml::YamlConfig;
use super::{ServerConfig, TlsConfig};

/// Build the final configuration: environment (with defaults) first, YAML values on top.
pub(super) fn merge_config(
    yaml: Option<YamlConfig>,
) -> Result<ServerConfig, Box<dyn std::error::Error>> {
    let mut config = load_from_env()?;

    let Some(yaml) = yaml else {
        return Ok(config);
    };

    if let Some(server) = yaml.server {
        if let Some(host) = server.host {
            config.host = host;
        }
        if let Some(port) = server.port {
            config.port = port;
        }
        if server.public_host.is_some() {
            config.public_host = server.public_host;
        }
        if let Some(tls) = server.tls {
            match tls.enabled {
                Some(true) => {
                    let cert_path = tls
                        .cert_path
                        .ok_or("server.tls.enabled is true but cert_path is missing")?;
                    let key_path = tls
                        .key_path
                        .ok_or("server.tls.enabled is true but key_path is missing")?;
                    config.tls = Some(TlsConfig {
                        cert_path: PathBuf::from(cert_path),
                        key_path: PathBuf::from(key_path),
                    });
                }
                Some(false) => config.tls = None,
                None => {}
            }
        }
    }

    if let Some(providers) = yaml.providers {
        if providers.openai_api_key.is_some() {
            config.openai_api_key = providers.openai_api_key;
        }
        if let Some(url) = providers.realtime_url {
            config.realtime_url = url;
        }
        if let Some(model) = providers.realtime_model {
            config.realtime_model = model;
        }
        if let Some(voice) = providers.voice {
            config.realtime_voice = voice;
        }
        if let Some(temperature) = providers.temperature {
            config.realtime_temperature = temperature;
        }
    }

    if let Some(twilio) = yaml.twilio {
        if twilio.account_sid.is_some() {
            config.twilio_account_sid = twilio.account_sid;
        }
        if twilio.auth_token.is_some() {
            config.twilio_auth_token = twilio.auth_token;
        }
        if twilio.webhook_url.is_some() {
            config.twilio_webhook_url = twilio.webhook_url;
        }
        if let Some(base) = twilio.api_base_url {
            config.twilio_api_base_url = base;
        }
        if let Some(country) = twilio.number_country {
            config.twilio_number_country = country.to_ascii_uppercase();
        }
    }

    if let Some(bridge) = yaml.bridge {
        if let Some(path) = bridge.instructions_path {
            config.instructions_path = PathBuf::from(path);
        }
        if let Some(symmetric) = bridge.symmetric_shutdown {
            config.symmetric_shutdown = symmetric;
        }
        if let Some(marks) = bridge.playback_marks {
            config.playback_marks = marks;
        }
    }

    if let Some(security) = yaml.security {
        if security.cors_allowed_origins.is_some() {
            config.cors_allowed_origins = security.cors_allowed_origins;
        }
        if let Some(rps) = security.rate_limit_requests_per_second {
            config.rate_limit_requests_per_second = rps;
        }
        if let Some(burst) = security.rate_limit_burst_size {
            config.rate_limit_burst_size = burst;
        }
        if security.max_websocket_connections.is_some() {
            config.max_websocket_connections = security.max_websocket_connections;
        }
        if let Some(per_ip) = security.max_connections_per_ip {
            config.max_connections_per_ip = per_ip;
        }
    }

    Ok(config)
}
