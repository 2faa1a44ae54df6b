#![allow(dead_code)]

use std::time::Duration;

use gix_hook_receive::backend::MemoryBackend;
use gix_hook_receive::config::HookConfig;
use gix_hook_receive::env::{vars, InvocationContext};
use gix_hook_receive::git_version::GitVersion;
use gix_hook_receive::session::Session;

pub const ZERO: &str = "0000000000000000000000000000000000000000";

/// A non-zero object id derived from `n`.
pub fn oid(n: usize) -> String {
    format!("{:040x}", n + 1)
}

/// A `<old> <new> <ref>` stdin line.
pub fn line(old: &str, new: &str, name: &str) -> String {
    format!("{old} {new} {name}\n")
}

/// The environment the forge's dispatcher sets up for a push of `alice/project` by `bob`.
pub fn push_env() -> Vec<(&'static str, &'static str)> {
    vec![
        (vars::SSH_ORIGINAL_COMMAND, "git-receive-pack 'alice/project.git'"),
        (vars::REPO_USER_NAME, "alice"),
        (vars::REPO_NAME, "project"),
        (vars::PUSHER_ID, "2"),
        (vars::PUSHER_NAME, "bob"),
    ]
}

/// Progress is shown immediately and git isn't run.
pub fn config() -> HookConfig {
    HookConfig {
        verbose_push_delay: Duration::ZERO,
        update_server_info: false,
        ..HookConfig::default()
    }
}

pub fn session_with(
    env: Vec<(&'static str, &'static str)>,
    git: Option<GitVersion>,
    backend: MemoryBackend,
) -> Session<MemoryBackend> {
    Session::new(InvocationContext::from_vars(env).with_git_version(git), config(), backend)
}

/// A session for a regular push with a git new enough for proc-receive.
pub fn session(backend: MemoryBackend) -> Session<MemoryBackend> {
    session_with(push_env(), Some(GitVersion::new(2, 43, 0)), backend)
}

/// A session for a regular push with a git that predates proc-receive.
pub fn old_git_session(backend: MemoryBackend) -> Session<MemoryBackend> {
    session_with(push_env(), Some(GitVersion::new(2, 25, 1)), backend)
}
