//! gix-hook-wire: wire-level building blocks for server-side git hooks.
//!
//! - [`pktline`] frames the binary conversation `receive-pack` has with its `proc-receive` hook.
//! - [`progress`] holds back human-readable progress output until a push turns out to be slow.
//!
#![deny(missing_docs, rust_2018_idioms)]
#![forbid(unsafe_code)]

pub mod pktline;
pub mod progress;

pub use pktline::{Expect, PktLine};
pub use progress::{DelayWriter, ProgressWriter};
