//! Push options, `git push -o key[=value]`.

use std::collections::BTreeMap;

use bstr::ByteSlice;
use serde::{Deserialize, Serialize};

/// Push options keyed by option name.
///
/// Options without a value are stored as `"true"`. Later options with the same key win.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PushOptions(BTreeMap<String, String>);

impl PushOptions {
    /// Create an empty set of options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a single `key=value` or bare `key` option, as received on the wire or through the
    /// environment.
    pub fn insert_raw(&mut self, raw: &[u8]) {
        let raw = raw.strip_suffix(b"\n").unwrap_or(raw);
        let (key, value) = match raw.split_once_str("=") {
            Some((key, value)) => (key.to_str_lossy().into_owned(), value.to_str_lossy().into_owned()),
            None => (raw.to_str_lossy().into_owned(), "true".to_owned()),
        };
        self.0.insert(key, value);
    }

    /// Set `key` to `value`.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    /// Obtain the value of `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Return `true` if no options were given.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The amount of distinct options.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterate over all options in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Read the options git exports to hooks as `GIT_PUSH_OPTION_COUNT` and `GIT_PUSH_OPTION_<n>`.
    ///
    /// `lookup` resolves a variable name to its value.
    pub fn from_git_env<'a>(lookup: impl Fn(&str) -> Option<&'a str>) -> Self {
        let mut options = PushOptions::new();
        let count = lookup("GIT_PUSH_OPTION_COUNT")
            .and_then(|count| count.trim().parse::<usize>().ok())
            .unwrap_or(0);
        for idx in 0..count {
            if let Some(raw) = lookup(&format!("GIT_PUSH_OPTION_{idx}")) {
                options.insert_raw(raw.as_bytes());
            }
        }
        options
    }
}

impl<'a> FromIterator<&'a [u8]> for PushOptions {
    fn from_iter<T: IntoIterator<Item = &'a [u8]>>(iter: T) -> Self {
        let mut options = PushOptions::new();
        for raw in iter {
            options.insert_raw(raw);
        }
        options
    }
}
