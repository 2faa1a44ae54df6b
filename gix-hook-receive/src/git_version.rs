//! Detect the version of the `git` binary that invokes us.
use std::fmt;
use std::process::Stdio;

use bstr::ByteSlice;

/// A `major.minor.patch` git version, compared numerically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GitVersion {
    /// The major version.
    pub major: u32,
    /// The minor version.
    pub minor: u32,
    /// The patch level, `0` if absent.
    pub patch: u32,
}

impl GitVersion {
    /// The first version with the proc-receive hook.
    pub const PROC_RECEIVE: GitVersion = GitVersion::new(2, 29, 0);

    /// Create a new version.
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        GitVersion { major, minor, patch }
    }

    /// Parse the output of `git --version`, like `git version 2.39.2 (Apple Git-143)`
    /// or `git version 2.45.1.windows.1`.
    pub fn parse(output: &[u8]) -> Option<Self> {
        let version = output.trim().strip_prefix(b"git version ")?;
        let version = version.fields().next()?;
        let mut numbers = version.split_str(".").map(|part| {
            let digits = part
                .iter()
                .position(|b| !b.is_ascii_digit())
                .map_or(part, |end| &part[..end]);
            digits.to_str().ok()?.parse::<u32>().ok()
        });
        let major = numbers.next()??;
        let minor = numbers.next()??;
        let patch = numbers.next().flatten().unwrap_or(0);
        Some(GitVersion::new(major, minor, patch))
    }

    /// Run `git --version` and parse its output. Any failure yields `None`.
    pub fn detect() -> Option<Self> {
        let output = gix_command::prepare("git")
            .arg("--version")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .and_then(std::process::Child::wait_with_output);
        match output {
            Ok(output) if output.status.success() => {
                let version = Self::parse(&output.stdout);
                if version.is_none() {
                    tracing::warn!(output = %output.stdout.as_bstr(), "could not parse git version");
                }
                version
            }
            Ok(output) => {
                tracing::warn!(status = %output.status, "git --version failed");
                None
            }
            Err(err) => {
                tracing::warn!(%err, "could not run git --version");
                None
            }
        }
    }

    /// Return `true` if this version is `other` or later.
    pub fn is_at_least(&self, other: GitVersion) -> bool {
        *self >= other
    }
}

impl fmt::Display for GitVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}
