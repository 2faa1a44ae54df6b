//! The `hook` section: how hooks present themselves and which pushes they accept.

use std::time::Duration;

use gix_config::File;

use super::{boolean, non_negative};
use crate::Error;

/// Configuration of the hook sessions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookConfig {
    /// Show progress output at all.
    pub verbose_push: bool,
    /// How long a session must run before its progress output is shown. Zero shows it right away.
    pub verbose_push_delay: Duration,
    /// Reject pushes that didn't come through the forge's dispatcher.
    pub only_allow_push_if_environment_set: bool,
    /// In production, technical error details only go to the audit log and not to the client.
    pub production: bool,
    /// Run `git update-server-info` at the start of post-receive.
    pub update_server_info: bool,
}

impl HookConfig {
    /// Create a new configuration with default settings.
    pub fn new() -> Self {
        Self {
            verbose_push: true,
            verbose_push_delay: Duration::from_secs(5),
            only_allow_push_if_environment_set: true,
            production: true,
            update_server_info: true,
        }
    }

    /// Read the configuration from the following keys, keeping defaults for those that are unset:
    ///
    /// - `hook.verbosePush` (default: true)
    /// - `hook.verbosePushDelay`: milliseconds (default: 5000)
    /// - `hook.onlyAllowPushIfEnvironmentSet` (default: true)
    /// - `hook.production` (default: true)
    /// - `hook.updateServerInfo` (default: true)
    pub fn from_config(config: &File<'_>) -> Result<Self, Error> {
        let mut hook = Self::new();
        if let Some(value) = boolean(config, "hook.verbosePush")? {
            hook.verbose_push = value;
        }
        if let Some(ms) = non_negative(config, "hook.verbosePushDelay")? {
            hook.verbose_push_delay = Duration::from_millis(ms);
        }
        if let Some(value) = boolean(config, "hook.onlyAllowPushIfEnvironmentSet")? {
            hook.only_allow_push_if_environment_set = value;
        }
        if let Some(value) = boolean(config, "hook.production")? {
            hook.production = value;
        }
        if let Some(value) = boolean(config, "hook.updateServerInfo")? {
            hook.update_server_info = value;
        }
        Ok(hook)
    }
}

impl Default for HookConfig {
    fn default() -> Self {
        Self::new()
    }
}
