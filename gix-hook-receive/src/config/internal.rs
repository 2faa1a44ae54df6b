//! The `internal` section: where to find the forge's private API.

use std::time::Duration;

use bstr::ByteSlice;
use gix_config::File;

use super::non_negative;
use crate::Error;

/// The default location of the private API.
pub const DEFAULT_URL: &str = "http://127.0.0.1:3000/";

/// How to reach the private API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InternalApiConfig {
    /// The base URL with a trailing slash, the API lives below `api/internal/`.
    pub url: String,
    /// The bearer token, empty if none is needed.
    pub token: String,
    /// The timeout of a single request.
    pub timeout: Duration,
}

impl InternalApiConfig {
    /// Read `internal.url`, `internal.token` and `internal.timeout` (milliseconds).
    pub fn from_config(config: &File<'_>) -> Result<Self, Error> {
        let mut internal = Self::default();
        if let Some(value) = config.string("internal.url") {
            let mut raw = value.to_str_lossy().into_owned();
            if !raw.ends_with('/') {
                raw.push('/');
            }
            internal.url = raw;
            internal.base_url()?;
        }
        if let Some(value) = config.string("internal.token") {
            internal.token = value.to_str_lossy().trim().to_owned();
        }
        if let Some(ms) = non_negative(config, "internal.timeout")? {
            internal.timeout = Duration::from_millis(ms);
        }
        Ok(internal)
    }

    /// Parse the base URL.
    pub fn base_url(&self) -> Result<url::Url, Error> {
        let url = url::Url::parse(&self.url).map_err(|err| Error::Configuration {
            key: "internal.url",
            message: format!("{:?} is not a valid URL: {err}", self.url),
        })?;
        if url.cannot_be_a_base() {
            return Err(Error::Configuration {
                key: "internal.url",
                message: format!("{:?} can't be used as base URL", self.url),
            });
        }
        Ok(url)
    }
}

impl Default for InternalApiConfig {
    fn default() -> Self {
        InternalApiConfig {
            url: DEFAULT_URL.into(),
            token: String::new(),
            timeout: Duration::from_secs(60),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let internal = InternalApiConfig::from_config(&File::try_from("").unwrap()).unwrap();
        assert_eq!(internal.url, DEFAULT_URL);
        assert_eq!(internal.base_url().unwrap().as_str(), DEFAULT_URL);
        assert!(internal.token.is_empty());
        assert_eq!(internal.timeout, Duration::from_secs(60));
    }

    #[test]
    fn url_gets_a_trailing_slash() {
        let config = File::try_from("[internal]\n\turl = https://forge.example/sub\n\ttoken = secret\n\ttimeout = 1500\n").unwrap();
        let internal = InternalApiConfig::from_config(&config).unwrap();
        assert_eq!(internal.url, "https://forge.example/sub/");
        assert_eq!(internal.token, "secret");
        assert_eq!(internal.timeout, Duration::from_millis(1500));
    }

    #[test]
    fn invalid_url() {
        let config = File::try_from("[internal]\n\turl = not a url\n").unwrap();
        assert!(matches!(
            InternalApiConfig::from_config(&config),
            Err(Error::Configuration { key: "internal.url", .. })
        ));
    }
}
