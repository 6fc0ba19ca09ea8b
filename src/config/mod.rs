//! Configuration merge system
//!
//! Layers, lowest precedence first:
//! 1. Built-in defaults
//! 2. User config (`$XDG_CONFIG_HOME/tableau-refresh/config.toml`)
//! 3. Explicit `--config` file
//! 4. Environment (`TABLEAU_*`)
//! 5. CLI flags

mod defaults;
mod effective;
mod merge;
mod settings;

pub use defaults::BuiltinDefaults;
pub use effective::{
    default_user_config_path, env_layer, parse_sign_in_method, process_env_layer, ConfigError,
    ConfigOrigin, ConfigSource, EffectiveConfig, ENV_KEYS,
};
pub use merge::{deep_merge, merge_layers, set_path};
pub use settings::{AuthSettings, PollSettings, ServerSettings, Settings};
