//! Twilio REST number provisioning.
//!
//! Provisioning is two calls against the 2010-04-01 API:
//! - search `AvailablePhoneNumbers/{country}/Local.json` for one number
//! - purchase it through `IncomingPhoneNumbers.json`, pointing its voice URL
//!   at this server's call-control webhook

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{info, warn};
use zeroize::Zeroize;

use super::ProvisioningError;
use crate::config::ServerConfig;

const API_VERSION: &str = "2010-04-01";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Acquires a fresh phone number.
#[async_trait]
pub trait NumberProvisioner: Send + Sync {
    async fn provision(&self) -> Result<String, ProvisioningError>;
}

/// Credentials and targets for the Twilio REST API.
#[derive(Clone)]
pub struct TwilioProvisioningConfig {
    pub api_base_url: String,
    pub account_sid: String,
    pub auth_token: String,
    /// Voice URL attached to every purchased number
    pub webhook_url: String,
    /// ISO country code searched for available numbers
    pub country: String,
}

impl TwilioProvisioningConfig {
    /// `None` unless the account SID, auth token and webhook URL are all set.
    pub fn from_server_config(config: &ServerConfig) -> Option<Self> {
        let (account_sid, auth_token) = config.twilio_credentials()?;
        let webhook_url = config.twilio_webhook_url.clone()?;
        Some(Self {
            api_base_url: config.twilio_api_base_url.trim_end_matches('/').to_string(),
            account_sid,
            auth_token,
            webhook_url,
            country: config.twilio_number_country.clone(),
        })
    }

    fn account_url(&self) -> String {
        format!(
            "{}/{}/Accounts/{}",
            self.api_base_url, API_VERSION, self.account_sid
        )
    }
}

impl std::fmt::Debug for TwilioProvisioningConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TwilioProvisioningConfig")
            .field("api_base_url", &self.api_base_url)
            .field("account_sid", &self.account_sid)
            .field("auth_token", &"[REDACTED]")
            .field("webhook_url", &self.webhook_url)
            .field("country", &self.country)
            .finish()
    }
}

impl Drop for TwilioProvisioningConfig {
    fn drop(&mut self) {
        self.auth_token.zeroize();
    }
}

#[derive(Debug, Deserialize)]
struct AvailableNumbersPage {
    #[serde(default)]
    available_phone_numbers: Vec<AvailableNumber>,
}

#[derive(Debug, Deserialize)]
struct AvailableNumber {
    phone_number: String,
}

#[derive(Debug, Deserialize)]
struct IncomingNumber {
    phone_number: String,
}

#[derive(Debug, Deserialize)]
struct TwilioApiError {
    message: String,
}

/// [`NumberProvisioner`] backed by the Twilio REST API.
#[derive(Debug)]
pub struct TwilioNumberProvisioner {
    config: TwilioProvisioningConfig,
    http_client: Client,
}

impl TwilioNumberProvisioner {
    pub fn new(config: TwilioProvisioningConfig) -> Result<Self, ProvisioningError> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS))
            .pool_max_idle_per_host(4)
            .build()?;
        Ok(Self {
            config,
            http_client,
        })
    }

    pub fn config(&self) -> &TwilioProvisioningConfig {
        &self.config
    }

    async fn search_available(&self) -> Result<String, ProvisioningError> {
        let url = format!(
            "{}/AvailablePhoneNumbers/{}/Local.json",
            self.config.account_url(),
            self.config.country
        );
        let response = self
            .http_client
            .get(url)
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .query(&[("PageSize", "1")])
            .send()
            .await?;

        let page: AvailableNumbersPage = read_json(response).await?;
        page.available_phone_numbers
            .into_iter()
            .next()
            .map(|n| n.phone_number)
            .ok_or(ProvisioningError::NoAvailableNumbers)
    }

    async fn purchase(&self, phone_number: &str) -> Result<String, ProvisioningError> {
        let url = format!("{}/IncomingPhoneNumbers.json", self.config.account_url());
        let response = self
            .http_client
            .post(url)
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(&[
                ("PhoneNumber", phone_number),
                ("VoiceUrl", self.config.webhook_url.as_str()),
            ])
            .send()
            .await?;

        let purchased: IncomingNumber = read_json(response).await?;
        Ok(purchased.phone_number)
    }
}

#[async_trait]
impl NumberProvisioner for TwilioNumberProvisioner {
    async fn provision(&self) -> Result<String, ProvisioningError> {
        let candidate = self.search_available().await?;
        let number = self.purchase(&candidate).await?;
        info!(number = %number, country = %self.config.country, "Purchased Twilio number");
        Ok(number)
    }
}

async fn read_json<T: for<'de> Deserialize<'de>>(
    response: reqwest::Response,
) -> Result<T, ProvisioningError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json().await?);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<TwilioApiError>(&body)
        .map(|e| e.message)
        .unwrap_or(body);
    warn!(status = status.as_u16(), "Twilio API request failed: {}", message);
    Err(ProvisioningError::Api {
        status: status.as_u16(),
        message,
    })
}
