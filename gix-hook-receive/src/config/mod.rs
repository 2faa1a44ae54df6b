//! Configuration parsing from a git-config formatted file.
//!
//! # Configuration Keys
//!
//! ## Hook Configuration
//! - `hook.verbosePush`: Show progress output
//! - `hook.verbosePushDelay`: Milliseconds before progress output is shown
//! - `hook.onlyAllowPushIfEnvironmentSet`: Reject pushes that bypassed the forge
//! - `hook.production`: Keep technical error details away from clients
//! - `hook.updateServerInfo`: Run `git update-server-info` in post-receive
//!
//! ## Private API Configuration
//! - `internal.url`: Base URL of the private API
//! - `internal.token`: Bearer token
//! - `internal.timeout`: Request timeout in milliseconds

pub mod hooks;
pub mod internal;

use std::path::Path;

pub use hooks::HookConfig;
pub use internal::InternalApiConfig;

use crate::Error;

/// The environment variable naming the configuration file if `--config` isn't given.
pub const CONFIG_ENV: &str = "GIX_HOOK_CONFIG";

/// All configuration of the hook binary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    /// Session behaviour.
    pub hook: HookConfig,
    /// The private API.
    pub internal: InternalApiConfig,
}

impl Config {
    /// Parse all sections of `config`.
    pub fn from_config(config: &gix_config::File<'_>) -> Result<Self, Error> {
        Ok(Config {
            hook: HookConfig::from_config(config)?,
            internal: InternalApiConfig::from_config(config)?,
        })
    }

    /// Load the configuration file at `path`, or use defaults if there is none.
    pub fn load(path: Option<&Path>) -> Result<Self, Error> {
        let Some(path) = path else {
            return Ok(Config::default());
        };
        if !path.exists() {
            tracing::debug!(path = %path.display(), "configuration file not found, using defaults");
            return Ok(Config::default());
        }
        let file = gix_config::File::from_path_no_includes(path.to_owned(), gix_config::Source::Local).map_err(
            |err| Error::Configuration {
                key: "config file",
                message: format!("could not load {}: {err}", path.display()),
            },
        )?;
        Self::from_config(&file)
    }
}

fn boolean(config: &gix_config::File<'_>, key: &'static str) -> Result<Option<bool>, Error> {
    config
        .boolean(key)
        .transpose()
        .map_err(|err| Error::Configuration {
            key,
            message: format!("invalid boolean value: {err}"),
        })
}

fn non_negative(config: &gix_config::File<'_>, key: &'static str) -> Result<Option<u64>, Error> {
    let Some(value) = config.integer(key).transpose().map_err(|err| Error::Configuration {
        key,
        message: format!("invalid integer value: {err}"),
    })?
    else {
        return Ok(None);
    };
    u64::try_from(value).map(Some).map_err(|_| Error::Configuration {
        key,
        message: format!("value must be non-negative, got: {value}"),
    })
}
