//! Phone number provisioning for operators.
//!
//! [`NumberRegistry`] remembers which number each user holds;
//! [`NumberProvisioner`] buys a new one when a user has none.

mod registry;
mod twilio;

use thiserror::Error;

pub use registry::{Assignment, NumberRegistry};
pub use twilio::{NumberProvisioner, TwilioNumberProvisioner, TwilioProvisioningConfig};

#[derive(Debug, Error)]
pub enum ProvisioningError {
    #[error("Twilio credentials are not configured")]
    NotConfigured,

    #[error("No available Twilio numbers")]
    NoAvailableNumbers,

    #[error("Twilio API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Twilio request failed: {0}")]
    Http(#[from] reqwest::Error),
}
