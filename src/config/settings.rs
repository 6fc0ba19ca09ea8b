//! Typed view of the merged configuration

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::server::{Credentials, RestConfig, SignInMethod};
use crate::timeout::PollPolicy;

use super::ConfigError;

/// `[server]` table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Server root URL
    #[serde(default)]
    pub url: Option<String>,
    /// Site content URL; empty or "default" for the default site
    #[serde(default)]
    pub site: String,
    /// REST API version; discovered from the server when unset
    #[serde(default)]
    pub api_version: Option<String>,
    pub request_timeout_seconds: u64,
    pub page_size: u32,
}

/// `[auth]` table
#[derive(Clone, Serialize, Deserialize)]
pub struct AuthSettings {
    pub method: SignInMethod,
    /// Username, or personal access token name
    #[serde(default)]
    pub username: Option<String>,
    /// Password, or personal access token secret
    #[serde(default)]
    pub password: Option<String>,
}

impl fmt::Debug for AuthSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthSettings")
            .field("method", &self.method)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// `[poll]` table
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PollSettings {
    pub interval_seconds: u64,
    /// 0 = wait without bound
    pub max_wait_seconds: u64,
    pub failure_streak: u32,
}

/// `[artifacts]` table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactSettings {
    pub root: PathBuf,
}

/// Complete configuration after merging every layer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub auth: AuthSettings,
    pub poll: PollSettings,
    pub artifacts: ArtifactSettings,
}

impl Settings {
    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy::from_config(
            Some(self.poll.interval_seconds),
            Some(self.poll.max_wait_seconds),
            Some(self.poll.failure_streak),
        )
    }

    /// Sign-in credentials; username and password must be configured
    pub fn credentials(&self) -> Result<Credentials, ConfigError> {
        let name = self.auth.username.clone().ok_or(ConfigError::Missing {
            key: "auth.username",
            env: "TABLEAU_USERNAME",
        })?;
        let secret = self.auth.password.clone().ok_or(ConfigError::Missing {
            key: "auth.password",
            env: "TABLEAU_PASSWORD",
        })?;
        Ok(Credentials::new(
            self.auth.method,
            name,
            secret,
            self.server.site.clone(),
        ))
    }

    /// REST client settings; the server URL must be configured
    pub fn rest_config(&self) -> Result<RestConfig, ConfigError> {
        let base_url = self
            .server
            .url
            .clone()
            .filter(|u| !u.trim().is_empty())
            .ok_or(ConfigError::Missing {
                key: "server.url",
                env: "TABLEAU_SERVER_URL",
            })?;
        Ok(RestConfig {
            base_url,
            api_version: self.server.api_version.clone(),
            request_timeout: Duration::from_secs(self.server.request_timeout_seconds),
            page_size: self.server.page_size,
        })
    }
}
