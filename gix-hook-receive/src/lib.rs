//! Server-side git hooks that hand push decisions to a forge.
//!
//! git runs these hooks during `receive-pack`:
//!
//! - `pre-receive` checks all reference updates in batches before they are applied.
//! - `update` protects forge-internal references.
//! - `post-receive` reports applied updates and shows pull request suggestions.
//! - `proc-receive` handles AGit-flow pushes to `refs/for/*` through the pkt-line protocol.
//!
//! Each invocation builds an [`InvocationContext`](env::InvocationContext) from the environment,
//! runs one [`Session`](session::Session) against a [`Backend`](backend::Backend) and ends with a
//! [`HookOutcome`](outcome::HookOutcome) whose exit code tells git whether to proceed.
//!
//! Design principles
//! - Sessions never read the process environment or spawn anything besides git itself.
//! - Batches and results keep the order in which git and the backend produced them.
//! - A push is accepted or rejected as a whole, there is nothing to roll back.

#![deny(missing_docs, rust_2018_idioms)]
#![forbid(unsafe_code)]

pub mod backend;
pub mod batch;
pub mod config;
pub mod env;
mod error;
pub mod git_version;
pub mod interrupt;
pub mod outcome;
pub mod protocol;
pub mod session;

pub use error::{Error, Kind, ENVIRONMENT_NOT_SET_MESSAGE};
