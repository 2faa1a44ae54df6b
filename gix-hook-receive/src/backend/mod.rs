//! The seam to the forge's private API, which decides about pushes.
//!
//! Hooks never decide on their own; they hand reference updates to a [`Backend`] and relay its
//! answers to git. Calls are synchronous and blocking.
//!
//! - `pre_receive`: Checks a batch of updates before git applies them
//! - `post_receive`: Reports a batch of applied updates, and learns about pull request suggestions
//! - `proc_receive`: Decides per reference how AGit-flow pushes are handled
//! - `set_default_branch`: Fixes the default branch after the first push to an empty repository
//! - `audit_log`: Records failures; best-effort
//!
//! # Examples
//!
//! ```rust
//! use gix_hook_receive::backend::{Backend, HookOptions, MemoryBackend};
//! use gix_hook_receive::env::RepoRef;
//! use gix_hook_receive::protocol::RefUpdateCommand;
//!
//! let mut backend = MemoryBackend::new();
//! let repo = RepoRef { owner: "alice".into(), name: "project".into() };
//! let mut options = HookOptions::default();
//! options.commands.push(RefUpdateCommand::new(
//!     "0000000000000000000000000000000000000000",
//!     "1111111111111111111111111111111111111111",
//!     "refs/heads/main",
//! ));
//!
//! backend.pre_receive(&repo, &options).unwrap();
//! assert_eq!(backend.pre_receive_batches(), vec![1]);
//! ```

use serde::{Deserialize, Serialize};

use crate::env::RepoRef;
use crate::protocol::{PushOptions, RefName, RefUpdateCommand};

pub mod http;
pub mod memory;

pub use http::HttpBackend;
pub use memory::MemoryBackend;

/// Everything the backend learns about a push besides the repository.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HookOptions {
    /// The id of the pushing user.
    pub user_id: i64,
    /// The name of the pushing user.
    pub user_name: String,
    /// Where git writes objects.
    pub git_object_directory: String,
    /// Additional object directories.
    pub git_alternative_object_directories: String,
    /// The quarantine directory of incoming objects.
    pub git_quarantine_path: String,
    /// Push options of the client.
    pub git_push_options: PushOptions,
    /// The pull request the push belongs to, or 0.
    pub pull_request_id: i64,
    /// The deploy key used for the push, or 0.
    pub deploy_key_id: i64,
    /// The permission bitmask of automation tokens.
    pub action_perm: i64,
    /// What triggered the push.
    pub push_trigger: String,
    /// The reference updates in arrival order.
    pub commands: Vec<RefUpdateCommand>,
}

impl HookOptions {
    /// Return a copy carrying `commands` instead of ours.
    pub fn with_commands(&self, commands: Vec<RefUpdateCommand>) -> Self {
        HookOptions {
            commands,
            ..self.clone()
        }
    }
}

/// A suggestion to open or visit a pull request for a pushed branch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostReceiveBranchResult {
    /// Show this suggestion at all.
    pub message: bool,
    /// Suggest creating a new pull request rather than visiting an existing one.
    pub create: bool,
    /// The pushed branch.
    pub branch: String,
    /// Where to go.
    pub url: String,
}

/// The answer to a post-receive batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostReceiveResponse {
    /// The repository had no commits before this push.
    pub repo_was_empty: bool,
    /// Suggestions in the order they should be shown.
    pub results: Vec<PostReceiveBranchResult>,
}

/// How the backend handled a single AGit-flow reference.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcReceiveResult {
    /// The reference as pushed by the client, like `refs/for/main/topic`.
    pub original_ref: RefName,
    /// The reference that was actually updated, like `refs/pull/12/head`.
    #[serde(rename = "ref")]
    pub ref_name: RefName,
    /// The previous value of `ref_name`.
    pub old_oid: String,
    /// The new value of `ref_name`.
    pub new_oid: String,
    /// The update wasn't a fast-forward.
    pub is_force_push: bool,
    /// The reference isn't ours to handle, and git should process it itself.
    pub is_not_matched: bool,
    /// Why the reference was refused, empty on success.
    pub err: String,
}

/// The error returned by backend calls.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct BackendError {
    /// What to tell the pushing user. It may be empty.
    pub user_message: String,
    /// The technical reason.
    pub message: String,
}

impl BackendError {
    /// Create an error with the same message for users and logs.
    pub fn new(message: impl Into<String>) -> Self {
        let message = message.into();
        BackendError {
            user_message: message.clone(),
            message,
        }
    }

    /// Create an error that doesn't tell users anything specific.
    pub fn internal(message: impl Into<String>) -> Self {
        BackendError {
            user_message: String::new(),
            message: message.into(),
        }
    }
}

/// The decisions a forge makes about pushes.
pub trait Backend {
    /// Check a batch of updates before they are applied. An error rejects the whole push.
    fn pre_receive(&mut self, repo: &RepoRef, options: &HookOptions) -> Result<(), BackendError>;

    /// Report a batch of applied updates.
    fn post_receive(&mut self, repo: &RepoRef, options: &HookOptions) -> Result<PostReceiveResponse, BackendError>;

    /// Decide how AGit-flow updates are handled, with one result per command.
    fn proc_receive(&mut self, repo: &RepoRef, options: &HookOptions) -> Result<Vec<ProcReceiveResult>, BackendError>;

    /// Make `branch` the default branch of `repo`.
    fn set_default_branch(&mut self, repo: &RepoRef, branch: &str) -> Result<(), BackendError>;

    /// Record `message` in the audit log.
    fn audit_log(&mut self, is_error: bool, message: &str) -> Result<(), BackendError>;
}

impl<B: Backend + ?Sized> Backend for &mut B {
    fn pre_receive(&mut self, repo: &RepoRef, options: &HookOptions) -> Result<(), BackendError> {
        (**self).pre_receive(repo, options)
    }

    fn post_receive(&mut self, repo: &RepoRef, options: &HookOptions) -> Result<PostReceiveResponse, BackendError> {
        (**self).post_receive(repo, options)
    }

    fn proc_receive(&mut self, repo: &RepoRef, options: &HookOptions) -> Result<Vec<ProcReceiveResult>, BackendError> {
        (**self).proc_receive(repo, options)
    }

    fn set_default_branch(&mut self, repo: &RepoRef, branch: &str) -> Result<(), BackendError> {
        (**self).set_default_branch(repo, branch)
    }

    fn audit_log(&mut self, is_error: bool, message: &str) -> Result<(), BackendError> {
        (**self).audit_log(is_error, message)
    }
}
