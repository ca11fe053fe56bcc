//! Operator-supplied session instructions.
//!
//! The business profile posted to `/set-instruction` is written to a plain
//! text file and re-read at the start of every call, so an update applies to
//! the next call without a restart.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tracing::info;

/// Text used when no instructions can be read.
pub const FALLBACK_INSTRUCTIONS: &str = "No instructions available.";

const DEFAULT_BUSINESS_NAME: &str = "Unnamed Business";
const DEFAULT_BUSINESS_DESCRIPTION: &str = "No description provided.";
const DEFAULT_INSTRUCTION: &str = "No instruction provided.";

#[derive(Debug, Error)]
pub enum InstructionError {
    #[error("instructions file {0} does not exist")]
    NotFound(PathBuf),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    InvalidProfile(String),
}

/// Source of the instruction text injected into each session.
#[async_trait]
pub trait InstructionSource: Send + Sync {
    async fn load(&self) -> Result<String, InstructionError>;
}

/// Business profile submitted by the operator. Missing fields get defaults.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct BusinessProfile {
    pub business_name: String,
    pub business_description: String,
    pub instruction: String,
}

impl Default for BusinessProfile {
    fn default() -> Self {
        Self {
            business_name: DEFAULT_BUSINESS_NAME.to_string(),
            business_description: DEFAULT_BUSINESS_DESCRIPTION.to_string(),
            instruction: DEFAULT_INSTRUCTION.to_string(),
        }
    }
}

impl BusinessProfile {
    /// Render the profile as the text stored on disk.
    pub fn render(&self) -> String {
        format!(
            "Business Name: {}\nBusiness Description: {}\nInstruction: {}\n",
            self.business_name, self.business_description, self.instruction
        )
    }
}

/// File-backed instruction store. Loaded text is trimmed.
#[derive(Debug, Clone)]
pub struct InstructionFile {
    path: PathBuf,
}

impl InstructionFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Overwrite the stored instructions with `profile`.
    pub async fn save(&self, profile: &BusinessProfile) -> Result<(), InstructionError> {
        tokio::fs::write(&self.path, profile.render()).await?;
        info!(path = %self.path.display(), business = %profile.business_name, "Instructions saved");
        Ok(())
    }
}

#[async_trait]
impl InstructionSource for InstructionFile {
    async fn load(&self) -> Result<String, InstructionError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => Ok(text.trim().to_string()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(InstructionError::NotFound(self.path.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Fixed instruction text, used by tests and embedders without a file.
#[derive(Debug, Clone)]
pub struct StaticInstructions(pub String);

#[async_trait]
impl InstructionSource for StaticInstructions {
    async fn load(&self) -> Result<String, InstructionError> {
        Ok(self.0.clone())
    }
}
