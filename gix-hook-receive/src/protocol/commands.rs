//! Reference update commands as git hands them to hooks.
//!
//! The line-oriented hooks read `<old-oid> <new-oid> <refname>` from stdin, proc-receive reads the
//! same triple from pkt-lines. Object ids are kept as the hex strings git sent; they are forwarded
//! to the backend verbatim and only inspected to tell whether they denote "no object".

use bstr::ByteSlice;
use serde::{Deserialize, Serialize};

use crate::Error;

const BRANCH_PREFIX: &str = "refs/heads/";
const TAG_PREFIX: &str = "refs/tags/";
const PULL_PREFIX: &str = "refs/pull/";
const FOR_PREFIX: &str = "refs/for/";

/// A full reference name like `refs/heads/main`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RefName(String);

impl RefName {
    /// Wrap `name` without validation.
    pub fn new(name: impl Into<String>) -> Self {
        RefName(name.into())
    }

    /// The full name.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Return `true` for `refs/heads/*`.
    pub fn is_branch(&self) -> bool {
        self.0.starts_with(BRANCH_PREFIX)
    }

    /// Return `true` for `refs/tags/*`.
    pub fn is_tag(&self) -> bool {
        self.0.starts_with(TAG_PREFIX)
    }

    /// Return `true` for the forge-internal `refs/pull/<index>/<name>` references.
    pub fn is_pull(&self) -> bool {
        self.0
            .strip_prefix(PULL_PREFIX)
            .is_some_and(|rest| rest.contains('/'))
    }

    /// Return `true` for AGit-flow references, `refs/for/<branch>`.
    pub fn is_for(&self) -> bool {
        self.0.starts_with(FOR_PREFIX)
    }

    /// The short branch name if this is a branch.
    pub fn branch_name(&self) -> Option<&str> {
        self.0.strip_prefix(BRANCH_PREFIX)
    }
}

impl std::fmt::Display for RefName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RefName {
    fn from(name: &str) -> Self {
        RefName(name.to_owned())
    }
}

/// A single reference update as git reports it to hooks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefUpdateCommand {
    /// The object the reference pointed to, all zeros if it's created.
    pub old_oid: String,
    /// The object the reference will point to, all zeros if it's deleted.
    pub new_oid: String,
    /// The reference being updated.
    pub ref_full_name: RefName,
}

impl RefUpdateCommand {
    /// Create a new command.
    pub fn new(old_oid: impl Into<String>, new_oid: impl Into<String>, ref_full_name: impl Into<String>) -> Self {
        RefUpdateCommand {
            old_oid: old_oid.into(),
            new_oid: new_oid.into(),
            ref_full_name: RefName::new(ref_full_name),
        }
    }

    /// Parse a stdin line of the pre-receive and post-receive hooks.
    ///
    /// Fields are separated by any amount of whitespace. Lines with a field count other than
    /// three yield `None` and are meant to be skipped.
    pub fn from_hook_line(line: &[u8]) -> Option<Self> {
        let mut fields = line.fields();
        let (old, new, name) = (fields.next()?, fields.next()?, fields.next()?);
        if fields.next().is_some() {
            return None;
        }
        Some(RefUpdateCommand::new(
            old.to_str_lossy(),
            new.to_str_lossy(),
            name.to_str_lossy(),
        ))
    }

    /// Parse the payload of a proc-receive command pkt-line.
    ///
    /// Unlike stdin lines these are strict: anything but three space-separated, non-empty
    /// fields fails the session.
    pub fn from_proc_receive_line(payload: &[u8]) -> Result<Self, Error> {
        let malformed = || Error::Format {
            what: "command",
            line: payload.to_str_lossy().into_owned(),
        };
        let line = payload.strip_suffix(b"\n").unwrap_or(payload);
        let mut fields = line.splitn_str(3, " ");
        let (old, new, name) = match (fields.next(), fields.next(), fields.next()) {
            (Some(old), Some(new), Some(name)) => (old, new, name),
            _ => return Err(malformed()),
        };
        if old.is_empty() || new.is_empty() || name.is_empty() || name.contains_str(" ") {
            return Err(malformed());
        }
        Ok(RefUpdateCommand::new(
            old.to_str_lossy(),
            new.to_str_lossy(),
            name.to_str_lossy(),
        ))
    }

    /// Return `true` if this command deletes its reference.
    pub fn is_delete(&self) -> bool {
        is_empty_object_id(&self.new_oid)
    }
}

/// Return `true` if `oid` denotes "no object": either the empty string or a null id, all zeros
/// in any length, which covers SHA-1 and SHA-256 repositories alike.
pub fn is_empty_object_id(oid: &str) -> bool {
    oid.bytes().all(|b| b == b'0')
}
