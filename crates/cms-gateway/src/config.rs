//! Client configuration parsed from TOML
//!
//! A single `client.toml` describes where the REST backend lives and how
//! the session is established. Every field has a default so a minimal
//! file (or none at all) yields a usable configuration.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

fn default_base_url() -> String {
    "rest".to_string()
}

fn default_auth_mode() -> String {
    "credentials".to_string()
}

/// Authentication settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSection {
    /// "credentials" or "sso"
    #[serde(default = "default_auth_mode")]
    pub mode: String,
    /// SSO endpoint, consulted when mode is "sso"
    #[serde(default)]
    pub sso_endpoint: Option<String>,
}

impl Default for AuthSection {
    fn default() -> Self {
        Self {
            mode: default_auth_mode(),
            sso_endpoint: None,
        }
    }
}

/// Top-level client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL all request urls are resolved against
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Channel used when a lookup does not name one
    #[serde(default)]
    pub default_channel: u32,
    #[serde(default)]
    pub auth: AuthSection,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            default_channel: 0,
            auth: AuthSection::default(),
        }
    }
}

impl ClientConfig {
    /// Parse a configuration from TOML content.
    ///
    /// # Example
    ///
    /// ```
    /// use cms_gateway::ClientConfig;
    ///
    /// let config = ClientConfig::parse(r#"
    /// base_url = "https://cms.example.com/rest"
    /// default_channel = 2
    ///
    /// [auth]
    /// mode = "sso"
    /// sso_endpoint = "auth/ssologin"
    /// "#).unwrap();
    ///
    /// assert_eq!(config.default_channel, 2);
    /// assert_eq!(config.auth.mode, "sso");
    /// ```
    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        match self.auth.mode.as_str() {
            "credentials" => Ok(()),
            "sso" => {
                if self.auth.sso_endpoint.is_none() {
                    return Err(Error::Config(
                        "auth mode \"sso\" requires auth.sso_endpoint".to_string(),
                    ));
                }
                Ok(())
            }
            other => Err(Error::Config(format!("unknown auth mode {other:?}"))),
        }
    }
}
