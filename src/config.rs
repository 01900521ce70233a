use std::{env, fs, path::Path};

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::Deserialize;

use crate::error::PublishError;

pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AuthType {
    /// Service account JSON key file
    JsonFile,
    /// Named service endpoint resolved from the environment
    ServiceEndpoint,
}

/// The parts of a Google service account key needed to mint access tokens.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

#[derive(Debug, Clone)]
pub struct Config {
    pub key: ServiceAccountKey,
}

impl Config {
    pub fn new(client_email: impl Into<String>, private_key: impl Into<String>) -> Self {
        Self {
            key: ServiceAccountKey {
                client_email: client_email.into(),
                private_key: private_key.into(),
                token_uri: default_token_uri(),
            },
        }
    }

    pub fn from_key_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read service account key {}", path.display()))?;
        if text.trim().is_empty() {
            return Err(PublishError::Credentials(format!(
                "service account key file {} is empty",
                path.display()
            ))
            .into());
        }
        let key: ServiceAccountKey = serde_json::from_str(&text).map_err(|e| {
            PublishError::Credentials(format!(
                "{} is not a valid service account key: {}",
                path.display(),
                e
            ))
        })?;
        Ok(Self { key })
    }

    /// Reads `ENDPOINT_AUTH_PARAMETER_<NAME>_USERNAME` (client email) and
    /// `..._PASSWORD` (PEM private key, `\n` escapes allowed).
    pub fn from_endpoint(name: &str) -> Result<Self> {
        let prefix = format!(
            "ENDPOINT_AUTH_PARAMETER_{}",
            name.to_uppercase().replace(['-', ' ', '.'], "_")
        );
        let client_email = env::var(format!("{}_USERNAME", prefix)).map_err(|_| {
            PublishError::Credentials(format!("service endpoint '{}' not found", name))
        })?;
        let private_key = env::var(format!("{}_PASSWORD", prefix)).map_err(|_| {
            PublishError::Credentials(format!("service endpoint '{}' has no private key", name))
        })?;
        if private_key.trim().is_empty() {
            return Err(PublishError::Credentials(format!(
                "service endpoint '{}' has an empty private key",
                name
            ))
            .into());
        }
        Ok(Self::new(client_email, private_key.replace("\\n", "\n")))
    }

    pub fn load(auth: AuthType, key_file: Option<&Path>, endpoint: Option<&str>) -> Result<Self> {
        match auth {
            AuthType::JsonFile => {
                let path = key_file.ok_or_else(|| {
                    PublishError::Credentials("--service-account-key is required".into())
                })?;
                Self::from_key_file(path)
            }
            AuthType::ServiceEndpoint => {
                let name = endpoint.ok_or_else(|| {
                    PublishError::Credentials("--service-endpoint is required".into())
                })?;
                Self::from_endpoint(name)
            }
        }
    }
}
