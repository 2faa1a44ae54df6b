//! The terminal result of a hook session and the single path that reports failures.

use std::io::Write;

use crate::backend::Backend;
use crate::Error;

/// Prefix of all messages addressed to the pushing user.
pub const MESSAGE_PREFIX: &str = "Forge:";

/// Shown when an error came without a message for users.
pub const DEFAULT_USER_MESSAGE: &str = "Internal Server Error (no specific error)";

/// How a hook session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookOutcome {
    /// git may proceed with the push.
    pub accepted: bool,
    /// What to tell the pushing user.
    pub user_message: String,
    /// Technical detail for the audit log, possibly empty.
    pub log_message: String,
}

impl HookOutcome {
    /// An accepted push.
    pub fn accepted() -> Self {
        HookOutcome {
            accepted: true,
            user_message: String::new(),
            log_message: String::new(),
        }
    }

    /// A rejected push.
    pub fn rejected(user_message: impl Into<String>, log_message: impl Into<String>) -> Self {
        let user_message = user_message.into();
        HookOutcome {
            accepted: false,
            user_message: if user_message.is_empty() {
                DEFAULT_USER_MESSAGE.into()
            } else {
                user_message
            },
            log_message: log_message.into(),
        }
    }

    /// Turn the result of a session into its outcome.
    pub fn from_result(result: Result<(), Error>) -> Self {
        match result {
            Ok(()) => Self::accepted(),
            Err(err) => Self::rejected(err.user_message(), err.log_message()),
        }
    }

    /// The process exit code git interprets: 0 accepts, 1 rejects.
    pub fn exit_code(&self) -> i32 {
        i32::from(!self.accepted)
    }

    /// The audit log entry, the user message followed by the log message.
    pub fn combined_message(&self) -> String {
        if self.user_message.is_empty() {
            return self.log_message.clone();
        }
        let sep = if self.user_message.ends_with(|c: char| c.is_ascii_punctuation()) {
            " "
        } else {
            ". "
        };
        format!("{}{sep}{}", self.user_message, self.log_message)
    }

    /// Report a rejection: a blank line to `stdout`, the user message to `stderr` and, unless in
    /// `production`, the log message as well. Entries with a log message go to the audit log.
    ///
    /// Nothing is written for accepted pushes. Write and audit log failures are ignored as
    /// the exit code still tells git what to do.
    pub fn emit(&self, stdout: &mut impl Write, stderr: &mut impl Write, production: bool, backend: &mut impl Backend) {
        self.report(stdout, stderr, production);
        if self.accepted || self.log_message.is_empty() {
            return;
        }
        if let Err(err) = backend.audit_log(true, &self.combined_message()) {
            tracing::warn!(%err, "could not write audit log");
        }
    }

    /// Like [`emit()`](Self::emit()), but without an audit log entry. Used when no backend
    /// is available, or it can't be waited for.
    pub fn report(&self, stdout: &mut impl Write, stderr: &mut impl Write, production: bool) {
        if self.accepted {
            return;
        }
        // git may not collect our exit status if nothing was written to stdout.
        writeln!(stdout).ok();
        stdout.flush().ok();
        writeln!(stderr, "{MESSAGE_PREFIX} {}", self.user_message).ok();
        if !production && !self.log_message.is_empty() {
            writeln!(stderr, "{MESSAGE_PREFIX} {}", self.log_message).ok();
        }
        stderr.flush().ok();
    }
}
