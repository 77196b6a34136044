mod parsing;
mod secret;
mod settings;
mod types;

pub(crate) use types::{
    AttemptSettings, ConfigError, Environment, SecuritySettings, Settings, TelemetrySettings,
};
