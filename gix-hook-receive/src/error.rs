//! Errors of all hook sessions, and how they are presented to the pushing user.
//!
//! Every error carries two renditions: a short *user message* which git relays to the client,
//! and a *log message* with the technical detail, which goes to the audit log.

use gix_hook_wire::pktline;

/// The message shown when a push is rejected because it didn't come through the forge.
pub const ENVIRONMENT_NOT_SET_MESSAGE: &str = "Rejecting changes as the forge environment is not set.
If you are pushing over SSH you must push with a key managed by
the forge or set your environment appropriately.";

/// Stable high-level error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    /// Bad length headers, unexpected frame types or malformed command lines.
    ProtocolFormat,
    /// Short reads, failed writes or broken pipes.
    ProtocolIo,
    /// The hook was invoked without the environment or configuration it needs.
    Configuration,
    /// The private API refused the push or could not be reached.
    Backend,
    /// The installed git or the requested protocol version isn't supported.
    Version,
    /// A signal arrived before the operation could complete.
    Cancelled,
    /// The push was refused by the hook itself.
    Rejected,
}

/// The error returned by hook sessions.
#[derive(Debug, thiserror::Error)]
#[allow(missing_docs)]
pub enum Error {
    #[error(transparent)]
    PktLine(#[from] pktline::Error),
    #[error("malformed {what}: {line:?}")]
    Format { what: &'static str, line: String },
    #[error("received unsupported version: {version}")]
    UnsupportedVersion { version: String },
    #[error("current git version doesn't support proc-receive")]
    NoProcReceiveSupport,
    #[error("SSH_ORIGINAL_COMMAND is not set")]
    EnvironmentNotSet,
    #[error("invalid value for '{key}': {message}")]
    Configuration { key: &'static str, message: String },
    #[error("{operation} failed: {message}")]
    Backend {
        operation: &'static str,
        user_message: String,
        message: String,
    },
    #[error("interrupted before {operation}")]
    Cancelled { operation: &'static str },
    #[error("{message}")]
    InternalRef { message: String },
    #[error("failed to call 'git {command}': {message}")]
    Git { command: &'static str, message: String },
    #[error("could not read hook input")]
    Stdin(#[source] std::io::Error),
    #[error("could not write hook output")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Fast classification helper returning a stable error kind.
    pub fn kind(&self) -> Kind {
        match self {
            Error::PktLine(err) if err.is_io() => Kind::ProtocolIo,
            Error::PktLine(pktline::Error::EmptyData | pktline::Error::DataTooLong { .. }) => Kind::ProtocolIo,
            Error::PktLine(_) | Error::Format { .. } => Kind::ProtocolFormat,
            Error::UnsupportedVersion { .. } | Error::NoProcReceiveSupport => Kind::Version,
            Error::EnvironmentNotSet | Error::Configuration { .. } | Error::Git { .. } => Kind::Configuration,
            Error::Backend { .. } => Kind::Backend,
            Error::Cancelled { .. } => Kind::Cancelled,
            Error::InternalRef { .. } => Kind::Rejected,
            Error::Stdin(_) | Error::Io(_) => Kind::ProtocolIo,
        }
    }

    /// The message relayed to the pushing user. It may be empty for backend errors without one.
    pub fn user_message(&self) -> String {
        match self {
            Error::PktLine(err) => match err {
                pktline::Error::Read(_) => "Protocol: stdin error",
                pktline::Error::InvalidHeader { .. } => "Protocol: format parse error",
                pktline::Error::UnexpectedFlush => "Protocol: format data error",
                pktline::Error::InvalidLength { .. } | pktline::Error::UnexpectedData { .. } => {
                    "Protocol: format length error"
                }
                pktline::Error::EmptyData | pktline::Error::DataTooLong { .. } | pktline::Error::Write(_) => {
                    "Protocol: write error"
                }
            }
            .into(),
            Error::Format { .. } => "Protocol: format error".into(),
            Error::UnsupportedVersion { .. } => "Protocol: version error".into(),
            Error::NoProcReceiveSupport => "No proc-receive support".into(),
            Error::EnvironmentNotSet => ENVIRONMENT_NOT_SET_MESSAGE.into(),
            Error::Configuration { .. } => "Invalid hook configuration".into(),
            Error::Backend { user_message, .. } => user_message.clone(),
            Error::Cancelled { .. } => "Push was interrupted".into(),
            Error::InternalRef { message } => message.clone(),
            Error::Git { command, .. } => format!("Failed to call 'git {command}'"),
            Error::Stdin(_) => "Protocol: stdin error".into(),
            Error::Io(_) => "Protocol: write error".into(),
        }
    }

    /// The technical message for the audit log, including the chain of causes.
    ///
    /// It's empty for rejections that are fully explained by their user message.
    pub fn log_message(&self) -> String {
        if matches!(self, Error::EnvironmentNotSet | Error::InternalRef { .. }) {
            return String::new();
        }
        let mut out = self.to_string();
        let mut source = std::error::Error::source(self);
        while let Some(err) = source {
            out.push_str(": ");
            out.push_str(&err.to_string());
            source = err.source();
        }
        out
    }
}
