//! Configuration file loading.
//!
//! The configuration is read once at startup from a YAML file and handed to
//! the rest of the program as a plain [`Config`] value.
//!
//! # Example
//!
//! ```yaml
//! recipients:
//!   - "+31600000001"
//!   - "+31600000002"
//! portal:
//!   base_url: "https://example.rosasoftware.nl/ouderportaal/"
//!   site_number: "1234"
//!   login:
//!     username: "parent@example.com"
//!     password: "hunter2"
//! ledger:
//!   redis_url: "redis://127.0.0.1/"
//! gateway:
//!   rpc_url: "http://127.0.0.1:8080/api/v1/rpc"
//! photos:
//!   dir: "/home/pi/Pictures"
//! delivery_order: send_then_record
//! ```

use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, instrument};
use url::Url;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Everything a run needs to know up front.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Signal addresses every message goes to.
    pub recipients: Vec<String>,
    pub portal: PortalConfig,
    #[serde(default)]
    pub ledger: LedgerConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub photos: PhotoConfig,
    #[serde(default)]
    pub delivery_order: DeliveryOrder,
}

#[derive(Clone, Deserialize)]
pub struct PortalConfig {
    /// Portal root, e.g. `https://example.rosasoftware.nl/ouderportaal/`.
    pub base_url: String,
    /// Numeric identifier of the daycare site.
    pub site_number: String,
    /// Login form fields, posted verbatim.
    pub login: BTreeMap<String, String>,
}

impl fmt::Debug for PortalConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let login: BTreeMap<&str, &str> = self
            .login
            .iter()
            .map(|(k, v)| {
                let shown = if k == "username" { v.as_str() } else { "<redacted>" };
                (k.as_str(), shown)
            })
            .collect();
        f.debug_struct("PortalConfig")
            .field("base_url", &self.base_url)
            .field("site_number", &self.site_number)
            .field("login", &login)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LedgerConfig {
    pub redis_url: String,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            redis_url: "redis://127.0.0.1/".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// JSON-RPC endpoint of the signal-cli daemon.
    pub rpc_url: String,
    /// Sending account, only needed when the daemon serves several.
    #[serde(default)]
    pub account: Option<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            rpc_url: "http://127.0.0.1:8080/api/v1/rpc".to_string(),
            account: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PhotoConfig {
    /// Archive directory for every photo ever fetched.
    pub dir: PathBuf,
    /// Message text sent along with each photo.
    #[serde(default = "default_caption")]
    pub caption: String,
}

fn default_caption() -> String {
    "Foto".to_string()
}

impl Default for PhotoConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("photos"),
            caption: default_caption(),
        }
    }
}

/// When the ledger is updated relative to the gateway call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryOrder {
    /// Record only after the gateway accepted the message. A failed send is
    /// retried by the next run.
    #[default]
    SendThenRecord,
    /// Record first, then send. A failed send is never retried.
    RecordThenSend,
}

impl Config {
    /// Parse and validate a YAML document.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and validate the configuration file at `path`.
    #[instrument(level = "info", skip_all, fields(path = %path.display()))]
    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        let yaml = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Io {
                path: path.display().to_string(),
                source,
            })?;
        let config = Self::from_yaml(&yaml)?;
        info!(
            recipients = config.recipients.len(),
            portal = %config.portal.base_url,
            order = ?config.delivery_order,
            "Loaded configuration"
        );
        Ok(config)
    }

    fn validate(&mut self) -> Result<(), ConfigError> {
        self.recipients.retain(|r| !r.trim().is_empty());
        if self.recipients.is_empty() {
            return Err(ConfigError::Invalid("no recipients configured".into()));
        }

        // Relative endpoints are joined onto the base, which needs the slash.
        if !self.portal.base_url.ends_with('/') {
            self.portal.base_url.push('/');
        }
        Url::parse(&self.portal.base_url)
            .map_err(|e| ConfigError::Invalid(format!("portal.base_url: {e}")))?;

        if self.portal.site_number.trim().is_empty() {
            return Err(ConfigError::Invalid("portal.site_number is empty".into()));
        }
        if !self.portal.login.contains_key("username") {
            return Err(ConfigError::Invalid("portal.login.username is missing".into()));
        }
        Ok(())
    }
}
