//! Effective configuration with full provenance
//!
//! The effective configuration is the merged document plus where each
//! layer came from. Secrets stay in the typed `Settings`; the document kept
//! for display has them redacted.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

use crate::outcome::ExitOutcome;
use crate::server::SignInMethod;
use crate::timeout::PolicyValidationError;

use super::defaults::BuiltinDefaults;
use super::merge::{merge_layers, set_path};
use super::settings::Settings;

/// Schema version for effective_config
pub const SCHEMA_VERSION: u32 = 1;

/// Schema identifier
pub const SCHEMA_ID: &str = "tableau-refresh/effective_config@1";

/// Application directory under the user config dir
pub const APP_DIR: &str = "tableau-refresh";

/// Environment variables and the config keys they set
pub const ENV_KEYS: &[(&str, &str)] = &[
    ("TABLEAU_SERVER_URL", "server.url"),
    ("TABLEAU_SITE_ID", "server.site"),
    ("TABLEAU_API_VERSION", "server.api_version"),
    ("TABLEAU_USERNAME", "auth.username"),
    ("TABLEAU_PASSWORD", "auth.password"),
    ("TABLEAU_SIGN_IN_METHOD", "auth.method"),
    ("TABLEAU_ARTIFACTS_DIR", "artifacts.root"),
];

/// Keys that contain secrets and should be redacted
const SECRET_KEYS: &[&str] = &["password", "token", "secret", "credential"];

/// Upper bound for `server.request_timeout_seconds`
const MAX_REQUEST_TIMEOUT: u64 = 600;

/// Origin of a configuration source
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum ConfigOrigin {
    Builtin,
    User,
    File,
    Env,
    Cli,
}

/// A contributing config source with provenance
#[derive(Debug, Clone, Serialize)]
pub struct ConfigSource {
    pub origin: ConfigOrigin,

    /// File path (files only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// SHA-256 digest of raw file bytes (files only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
}

/// Effective configuration with full provenance
#[derive(Debug, Clone, Serialize)]
pub struct EffectiveConfig {
    pub schema_version: u32,
    pub schema_id: String,

    /// When this config was computed
    pub created_at: DateTime<Utc>,

    /// The merged configuration object, secrets redacted
    pub config: Value,

    /// Contributing sources in precedence order
    pub sources: Vec<ConfigSource>,

    /// Redacted key paths
    pub redactions: Vec<String>,

    #[serde(skip)]
    settings: Settings,
}

/// Default user config file: `$XDG_CONFIG_HOME/tableau-refresh/config.toml`
pub fn default_user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join("config.toml"))
}

/// Build the environment layer from a variable lookup
///
/// Unset and empty variables contribute nothing.
pub fn env_layer<F>(lookup: F) -> Option<Value>
where
    F: Fn(&str) -> Option<String>,
{
    let mut layer = Value::Null;
    for (var, key) in ENV_KEYS {
        if let Some(value) = lookup(var).filter(|v| !v.is_empty()) {
            set_path(&mut layer, key, Value::String(value));
        }
    }
    if layer.is_null() {
        None
    } else {
        Some(layer)
    }
}

/// Environment layer from the process environment
pub fn process_env_layer() -> Option<Value> {
    env_layer(|var| std::env::var(var).ok())
}

impl EffectiveConfig {
    /// Build effective config from layers
    ///
    /// A missing user file is skipped; a missing explicit file is an error.
    pub fn build(
        user_config_path: Option<&Path>,
        explicit_config_path: Option<&Path>,
        env_overrides: Option<Value>,
        cli_overrides: Option<Value>,
    ) -> Result<Self, ConfigError> {
        let mut layers = Vec::new();
        let mut sources = Vec::new();

        // Layer 1: Built-in defaults
        layers.push(BuiltinDefaults::default().to_value());
        sources.push(ConfigSource {
            origin: ConfigOrigin::Builtin,
            path: None,
            digest: None,
        });

        // Layer 2: User config
        if let Some(path) = user_config_path {
            if path.exists() {
                let (value, digest) = Self::load_toml_file(path)?;
                layers.push(value);
                sources.push(ConfigSource {
                    origin: ConfigOrigin::User,
                    path: Some(path.to_string_lossy().to_string()),
                    digest: Some(digest),
                });
            }
        }

        // Layer 3: Explicit --config file
        if let Some(path) = explicit_config_path {
            let (value, digest) = Self::load_toml_file(path)?;
            layers.push(value);
            sources.push(ConfigSource {
                origin: ConfigOrigin::File,
                path: Some(path.to_string_lossy().to_string()),
                digest: Some(digest),
            });
        }

        // Layer 4: Environment
        if let Some(env) = env_overrides {
            layers.push(env);
            sources.push(ConfigSource {
                origin: ConfigOrigin::Env,
                path: None,
                digest: None,
            });
        }

        // Layer 5: CLI flags
        if let Some(cli) = cli_overrides {
            layers.push(cli);
            sources.push(ConfigSource {
                origin: ConfigOrigin::Cli,
                path: None,
                digest: None,
            });
        }

        let merged = merge_layers(layers);
        let settings: Settings = serde_json::from_value(merged.clone())
            .map_err(|e| ConfigError::Parse(format!("invalid configuration: {}", e)))?;
        Self::validate(&settings)?;

        let mut config = merged;
        let redactions = Self::redact_secrets(&mut config);

        Ok(Self {
            schema_version: SCHEMA_VERSION,
            schema_id: SCHEMA_ID.to_string(),
            created_at: Utc::now(),
            config,
            sources,
            redactions,
            settings,
        })
    }

    /// Typed settings, secrets included
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Load and parse a TOML file, returning the value and digest
    fn load_toml_file(path: &Path) -> Result<(Value, String), ConfigError> {
        let bytes = fs::read(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        let digest = hex::encode(hasher.finalize());

        let contents = String::from_utf8(bytes)
            .map_err(|e| ConfigError::Parse(format!("{}: invalid UTF-8: {}", path.display(), e)))?;

        let toml_value: toml::Value = toml::from_str(&contents)
            .map_err(|e| ConfigError::Parse(format!("{}: {}", path.display(), e)))?;

        Ok((Self::toml_to_json(toml_value), digest))
    }

    /// Convert TOML Value to JSON Value
    fn toml_to_json(toml: toml::Value) -> Value {
        match toml {
            toml::Value::String(s) => Value::String(s),
            toml::Value::Integer(i) => Value::Number(i.into()),
            toml::Value::Float(f) => serde_json::Number::from_f64(f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            toml::Value::Boolean(b) => Value::Bool(b),
            toml::Value::Datetime(dt) => Value::String(dt.to_string()),
            toml::Value::Array(arr) => {
                Value::Array(arr.into_iter().map(Self::toml_to_json).collect())
            }
            toml::Value::Table(table) => Value::Object(
                table
                    .into_iter()
                    .map(|(k, v)| (k, Self::toml_to_json(v)))
                    .collect(),
            ),
        }
    }

    /// Redact secrets in place, returning the redacted key paths
    fn redact_secrets(value: &mut Value) -> Vec<String> {
        let mut redactions = Vec::new();
        Self::redact_recursive(value, String::new(), &mut redactions);
        redactions
    }

    fn redact_recursive(value: &mut Value, path: String, redactions: &mut Vec<String>) {
        match value {
            Value::Object(map) => {
                for (key, val) in map.iter_mut() {
                    let key_lower = key.to_lowercase();
                    let current_path = if path.is_empty() {
                        key.clone()
                    } else {
                        format!("{}.{}", path, key)
                    };

                    let is_secret = SECRET_KEYS.iter().any(|s| key_lower.contains(s));
                    if is_secret && !val.is_object() && !val.is_array() && !val.is_null() {
                        *val = Value::String("[REDACTED]".to_string());
                        redactions.push(current_path);
                    } else {
                        Self::redact_recursive(val, current_path, redactions);
                    }
                }
            }
            Value::Array(arr) => {
                for (i, val) in arr.iter_mut().enumerate() {
                    Self::redact_recursive(val, format!("{}[{}]", path, i), redactions);
                }
            }
            _ => {}
        }
    }

    /// Validate configuration values
    fn validate(settings: &Settings) -> Result<(), ConfigError> {
        settings.poll_policy().validate()?;

        // request_timeout_seconds must be in (0, 600]
        let timeout = settings.server.request_timeout_seconds;
        if timeout == 0 || timeout > MAX_REQUEST_TIMEOUT {
            return Err(ConfigError::Validation(format!(
                "server.request_timeout_seconds must be in (0, {}], got {}",
                MAX_REQUEST_TIMEOUT, timeout
            )));
        }

        // page_size must be in [1, 1000]
        let page_size = settings.server.page_size;
        if page_size == 0 || page_size > tableau_protocol::MAX_PAGE_SIZE {
            return Err(ConfigError::Validation(format!(
                "server.page_size must be in [1, {}], got {}",
                tableau_protocol::MAX_PAGE_SIZE,
                page_size
            )));
        }

        Ok(())
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Get a (redacted) config value by dot-separated path
    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut current = &self.config;
        for part in path.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    pub fn get_u64(&self, path: &str) -> Option<u64> {
        self.get(path).and_then(|v| v.as_u64())
    }

    pub fn get_str(&self, path: &str) -> Option<&str> {
        self.get(path).and_then(|v| v.as_str())
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse error: {0}")]
    Parse(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("validation error: {0}")]
    Policy(#[from] PolicyValidationError),

    #[error("{key} is not configured (set {env} or pass it on the command line)")]
    Missing {
        key: &'static str,
        env: &'static str,
    },
}

impl ConfigError {
    pub fn outcome(&self) -> ExitOutcome {
        ExitOutcome::UnknownError
    }
}

/// Parse a sign-in method given on the command line or in the environment
pub fn parse_sign_in_method(value: &str) -> Result<SignInMethod, ConfigError> {
    value.parse().map_err(ConfigError::Validation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_build_with_defaults_only() {
        let config = EffectiveConfig::build(None, None, None, None).unwrap();

        assert_eq!(config.schema_version, SCHEMA_VERSION);
        assert_eq!(config.get_u64("poll.interval_seconds"), Some(10));
        assert_eq!(config.get_str("auth.method"), Some("username_password"));
        assert_eq!(config.sources.len(), 1);
        assert_eq!(config.sources[0].origin, ConfigOrigin::Builtin);
    }

    #[test]
    fn test_cli_overrides_env() {
        let env = json!({"server": {"site": "from-env", "url": "https://env.example.com"}});
        let cli = json!({"server": {"site": "from-cli"}});

        let config = EffectiveConfig::build(None, None, Some(env), Some(cli)).unwrap();
        assert_eq!(config.settings().server.site, "from-cli");
        assert_eq!(
            config.settings().server.url.as_deref(),
            Some("https://env.example.com")
        );
        let origins: Vec<_> = config.sources.iter().map(|s| s.origin.clone()).collect();
        assert_eq!(
            origins,
            vec![ConfigOrigin::Builtin, ConfigOrigin::Env, ConfigOrigin::Cli]
        );
    }

    #[test]
    fn test_validation_interval() {
        let cli = json!({"poll": {"interval_seconds": 0}});
        let err = EffectiveConfig::build(None, None, None, Some(cli)).unwrap_err();
        assert!(err.to_string().contains("interval_seconds"));
    }

    #[test]
    fn test_validation_request_timeout() {
        let cli = json!({"server": {"request_timeout_seconds": 601}});
        let err = EffectiveConfig::build(None, None, None, Some(cli)).unwrap_err();
        assert!(err.to_string().contains("request_timeout_seconds"));
    }

    #[test]
    fn test_invalid_sign_in_method() {
        let cli = json!({"auth": {"method": "kerberos"}});
        let err = EffectiveConfig::build(None, None, None, Some(cli)).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_secret_redaction_keeps_settings() {
        let cli = json!({"auth": {"username": "analyst", "password": "hunter2"}});
        let config = EffectiveConfig::build(None, None, None, Some(cli)).unwrap();

        assert_eq!(config.get_str("auth.password"), Some("[REDACTED]"));
        assert_eq!(config.get_str("auth.username"), Some("analyst"));
        assert_eq!(config.redactions, vec!["auth.password".to_string()]);
        assert_eq!(config.settings().auth.password.as_deref(), Some("hunter2"));
        assert!(!config.to_json().unwrap().contains("hunter2"));
    }

    #[test]
    fn test_load_toml_file() {
        let mut temp = NamedTempFile::new().unwrap();
        writeln!(temp, "[server]").unwrap();
        writeln!(temp, "url = \"https://tableau.example.com\"").unwrap();
        writeln!(temp, "[poll]").unwrap();
        writeln!(temp, "max_wait_seconds = 0").unwrap();

        let config = EffectiveConfig::build(None, Some(temp.path()), None, None).unwrap();
        assert_eq!(config.get_str("server.url"), Some("https://tableau.example.com"));
        assert_eq!(config.settings().poll_policy().max_wait, None);

        let source = &config.sources[1];
        assert_eq!(source.origin, ConfigOrigin::File);
        assert_eq!(source.digest.as_ref().map(|d| d.len()), Some(64));
    }

    #[test]
    fn test_missing_user_file_is_skipped() {
        let config = EffectiveConfig::build(
            Some(Path::new("/nonexistent/tableau-refresh/config.toml")),
            None,
            None,
            None,
        )
        .unwrap();
        assert_eq!(config.sources.len(), 1);
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let err = EffectiveConfig::build(
            None,
            Some(Path::new("/nonexistent/explicit.toml")),
            None,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_env_layer() {
        let vars: HashMap<&str, &str> = [
            ("TABLEAU_SERVER_URL", "https://tableau.example.com"),
            ("TABLEAU_USERNAME", "analyst"),
            ("TABLEAU_SITE_ID", ""),
        ]
        .into_iter()
        .collect();

        let layer = env_layer(|k| vars.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(layer["server"]["url"], "https://tableau.example.com");
        assert_eq!(layer["auth"]["username"], "analyst");
        assert!(layer["server"].get("site").is_none());

        assert!(env_layer(|_| None).is_none());
    }

    #[test]
    fn test_parse_sign_in_method() {
        assert_eq!(
            parse_sign_in_method("access_token").unwrap(),
            SignInMethod::AccessToken
        );
        assert!(parse_sign_in_method("saml").is_err());
    }
}
