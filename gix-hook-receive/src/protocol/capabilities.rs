//! The version and capability handshake that opens a proc-receive session.
//!
//! git sends `version=1\0<capabilities>` followed by a flush-pkt, and expects the hook to answer
//! with the same version and the subset of capabilities it wants to use.

use bstr::ByteSlice;

use crate::Error;

/// The only protocol version spoken.
pub const VERSION_HEAD: &str = "version=1";

/// The capability requesting push options to follow the commands.
pub const PUSH_OPTIONS: &str = "push-options";

/// Capabilities agreed upon during negotiation. They don't change afterwards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcReceiveCapabilities {
    /// Both sides agreed to exchange push options after the commands.
    pub push_options: bool,
}

impl ProcReceiveCapabilities {
    /// Parse the payload of the version pkt-line sent by git and keep the capabilities we support.
    pub fn from_version_line(payload: &[u8]) -> Result<Self, Error> {
        let index = match payload.find_byte(0) {
            Some(index) => index,
            // Older git sends just `version=1\n` without a capability list.
            None if payload.len() == 10 && payload[9] == b'\n' => 9,
            None => {
                return Err(Error::Format {
                    what: "version line",
                    line: payload.to_str_lossy().into_owned(),
                })
            }
        };
        let version = &payload[..index];
        if version != VERSION_HEAD.as_bytes() {
            return Err(Error::UnsupportedVersion {
                version: version.to_str_lossy().into_owned(),
            });
        }
        let offered = payload[index + 1..].trim_end_with(|c| c == '\n');
        let push_options = offered
            .split_str(" ")
            .any(|token| token.starts_with(PUSH_OPTIONS.as_bytes()));
        Ok(ProcReceiveCapabilities { push_options })
    }

    /// The payload of our answer, `version=1[\0push-options]\n`.
    pub fn response(&self) -> Vec<u8> {
        let mut out = VERSION_HEAD.as_bytes().to_vec();
        if self.push_options {
            out.push(0);
            out.extend_from_slice(PUSH_OPTIONS.as_bytes());
        }
        out.push(b'\n');
        out
    }
}
