//! What git hands to hooks: reference update commands, push options and the proc-receive handshake.
pub mod capabilities;
pub mod commands;
pub mod options;

pub use capabilities::ProcReceiveCapabilities;
pub use commands::{is_empty_object_id, RefName, RefUpdateCommand};
pub use options::PushOptions;
