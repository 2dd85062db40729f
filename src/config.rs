//! The config module defines the application configuration. It is based on [config], a layered
//! configuration system for Rust applications (with strong support for 12-factor applications).
//!
//! # Layers
//!
//! The configuration consists of multiple layers. Upper layers overwrite lower layer
//! configurations (e.g. environment variables overwrite the default configuration).
//!
//! ## Layer 1 (Environment variables) \[optional\]
//!
//! The environment variables are the top most layer. They have the format
//! `[ENV_PREFIX]_[field]` where `ENV_PREFIX` defaults to `GATEHOUSE`, so the field
//! `mailbox_capacity` can be overwritten by `GATEHOUSE_MAILBOX_CAPACITY`.
//!
//! ## Layer 2 (Custom configuration) \[optional\]
//!
//! An optional configuration file intended for deployments and local testing. The file location
//! can be configured using the `CONFIG_FILE` environment variable, defaulting to
//! `config/config`. It can be of any file type supported by [config].
//!
//! ## Layer 3 (Default configuration)
//!
//! The default configuration provides default values for all config fields.

use config::{ConfigError, Environment, File};
use serde::Deserialize;
use std::env;

/// [`Config`] holds all configuration for the application. One immutable instance is created on
/// startup and then shared among the application components.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// The IPv4 socket address the TCP listener binds to.
    pub address: String,

    /// The idle read timeout in seconds after which a silent connection is closed.
    #[serde(alias = "readtimeout")]
    pub read_timeout: u64,

    /// The capacity of each connection's outbound byte-message channel.
    #[serde(alias = "outboundcapacity")]
    pub outbound_capacity: usize,

    /// The capacity of the supervisor's mailbox channel.
    #[serde(alias = "mailboxcapacity")]
    pub mailbox_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:25565".to_string(),
            read_timeout: 300,
            outbound_capacity: 64,
            mailbox_capacity: 256,
        }
    }
}

impl Config {
    /// Creates a new application configuration as described in the [module documentation](crate::config).
    pub fn read() -> Result<Self, ConfigError> {
        // the environment prefix for all `Config` fields
        let env_prefix = env::var("ENV_PREFIX").unwrap_or("gatehouse".into());
        // the path of the custom configuration file
        let config_file = env::var("CONFIG_FILE").unwrap_or("config/config".into());

        let s = config::Config::builder()
            // load custom configuration from file (at runtime)
            .add_source(File::with_name(&config_file).required(false))
            // add in config from the environment, e.g. `GATEHOUSE_ADDRESS=0.0.0.0:25565`
            .add_source(Environment::with_prefix(&env_prefix).separator("_"))
            .build()?;

        s.try_deserialize()
    }
}
