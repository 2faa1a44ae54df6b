//! The invocation context, read once from the environment the forge's SSH or HTTP dispatcher
//! prepared before git ran the hook.
//!
//! Sessions never look at the process environment themselves, which keeps them testable.

use std::collections::HashMap;

use crate::backend::HookOptions;
use crate::git_version::GitVersion;
use crate::protocol::PushOptions;

/// Names of the environment variables we read.
pub mod vars {
    /// Set for pushes the forge performs itself.
    pub const INTERNAL_PUSH: &str = "GIX_HOOK_INTERNAL_PUSH";
    /// Set if the repository is a wiki.
    pub const REPO_IS_WIKI: &str = "GIX_HOOK_REPO_IS_WIKI";
    /// The owner of the repository.
    pub const REPO_USER_NAME: &str = "GIX_HOOK_REPO_USER_NAME";
    /// The name of the repository.
    pub const REPO_NAME: &str = "GIX_HOOK_REPO_NAME";
    /// The numeric id of the pushing user.
    pub const PUSHER_ID: &str = "GIX_HOOK_PUSHER_ID";
    /// The name of the pushing user.
    pub const PUSHER_NAME: &str = "GIX_HOOK_PUSHER_NAME";
    /// The pull request the push belongs to, if any.
    pub const PR_ID: &str = "GIX_HOOK_PR_ID";
    /// The deploy key used for the push, if any.
    pub const DEPLOY_KEY_ID: &str = "GIX_HOOK_DEPLOY_KEY_ID";
    /// The permission bitmask of an automation token.
    pub const ACTION_PERM: &str = "GIX_HOOK_ACTION_PERM";
    /// What caused the push, like `pr-merge`.
    pub const PUSH_TRIGGER: &str = "GIX_HOOK_PUSH_TRIGGER";
    /// The command requested over SSH. It's set by the forge's dispatcher for all transports.
    pub const SSH_ORIGINAL_COMMAND: &str = "SSH_ORIGINAL_COMMAND";
    /// Where git writes objects.
    pub const GIT_OBJECT_DIRECTORY: &str = "GIT_OBJECT_DIRECTORY";
    /// Additional object directories.
    pub const GIT_ALTERNATE_OBJECT_DIRECTORIES: &str = "GIT_ALTERNATE_OBJECT_DIRECTORIES";
    /// The quarantine directory of incoming objects.
    pub const GIT_QUARANTINE_PATH: &str = "GIT_QUARANTINE_PATH";
}

/// The access a git command needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    /// No repository access, the command authenticates by other means.
    None,
    /// Fetching and archiving.
    Read,
    /// Pushing.
    Write,
}

/// An immutable mapping of the git commands allowed over SSH to the access they need.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerbTable {
    verbs: &'static [(&'static str, AccessMode)],
}

impl VerbTable {
    /// The commands forges allow.
    pub const DEFAULT: VerbTable = VerbTable::new(&[
        ("git-upload-pack", AccessMode::Read),
        ("git-upload-archive", AccessMode::Read),
        ("git-receive-pack", AccessMode::Write),
        ("git-lfs-authenticate", AccessMode::None),
    ]);

    /// Create a table from `verbs`.
    pub const fn new(verbs: &'static [(&'static str, AccessMode)]) -> Self {
        VerbTable { verbs }
    }

    /// The access needed by `verb`, or `None` if it's not allowed at all.
    pub fn access_mode(&self, verb: &str) -> Option<AccessMode> {
        self.verbs.iter().find(|(name, _)| *name == verb).map(|(_, mode)| *mode)
    }
}

impl Default for VerbTable {
    fn default() -> Self {
        VerbTable::DEFAULT
    }
}

/// The repository being pushed to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepoRef {
    /// The owning user or organization.
    pub owner: String,
    /// The repository name.
    pub name: String,
}

impl std::fmt::Display for RepoRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Everything a hook session needs to know about its invocation.
#[derive(Debug, Clone, Default)]
pub struct InvocationContext {
    /// The push was made by the forge itself and isn't checked.
    pub is_internal: bool,
    /// The push goes to a wiki repository.
    pub is_wiki: bool,
    /// The target repository.
    pub repo: RepoRef,
    /// The id of the pushing user.
    pub pusher_id: i64,
    /// The name of the pushing user.
    pub pusher_name: String,
    /// The pull request id, or 0.
    pub pull_request_id: i64,
    /// The deploy key id, or 0.
    pub deploy_key_id: i64,
    /// The permission bitmask of automation tokens.
    pub action_perm: i64,
    /// What triggered the push, if anything but a user.
    pub push_trigger: String,
    /// The SSH command line, empty if we weren't invoked through the forge.
    pub ssh_original_command: String,
    /// See [`vars::GIT_OBJECT_DIRECTORY`].
    pub git_object_directory: String,
    /// See [`vars::GIT_ALTERNATE_OBJECT_DIRECTORIES`].
    pub git_alternate_object_directories: String,
    /// See [`vars::GIT_QUARANTINE_PATH`].
    pub git_quarantine_path: String,
    /// Push options exported by git to the line-oriented hooks.
    pub push_options: PushOptions,
    /// The version of git running us, if it could be determined.
    pub git_version: Option<GitVersion>,
    /// The commands allowed over SSH.
    pub verbs: VerbTable,
}

impl InvocationContext {
    /// Read the context from the process environment.
    pub fn from_env() -> Self {
        Self::from_vars(
            std::env::vars_os()
                .map(|(k, v)| (k.to_string_lossy().into_owned(), v.to_string_lossy().into_owned())),
        )
    }

    /// Read the context from `env`, name-value pairs as found in the environment.
    pub fn from_vars<K, V>(env: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self::from_vars_with_verbs(env, VerbTable::DEFAULT)
    }

    /// Like [`from_vars()`](Self::from_vars()), but classify SSH commands with `verbs`.
    pub fn from_vars_with_verbs<K, V>(env: impl IntoIterator<Item = (K, V)>, verbs: VerbTable) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let env: HashMap<String, String> = env.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
        let get = |name: &str| env.get(name).map(String::as_str).unwrap_or_default();
        let int = |name: &str| get(name).trim().parse::<i64>().unwrap_or(0);

        InvocationContext {
            is_internal: parse_bool(get(vars::INTERNAL_PUSH)),
            is_wiki: parse_bool(get(vars::REPO_IS_WIKI)),
            repo: RepoRef {
                owner: get(vars::REPO_USER_NAME).to_owned(),
                name: get(vars::REPO_NAME).to_owned(),
            },
            pusher_id: int(vars::PUSHER_ID),
            pusher_name: get(vars::PUSHER_NAME).to_owned(),
            pull_request_id: int(vars::PR_ID),
            deploy_key_id: int(vars::DEPLOY_KEY_ID),
            action_perm: int(vars::ACTION_PERM),
            push_trigger: get(vars::PUSH_TRIGGER).to_owned(),
            ssh_original_command: get(vars::SSH_ORIGINAL_COMMAND).to_owned(),
            git_object_directory: get(vars::GIT_OBJECT_DIRECTORY).to_owned(),
            git_alternate_object_directories: get(vars::GIT_ALTERNATE_OBJECT_DIRECTORIES).to_owned(),
            git_quarantine_path: get(vars::GIT_QUARANTINE_PATH).to_owned(),
            push_options: PushOptions::from_git_env(|name| env.get(name).map(String::as_str)),
            git_version: None,
            verbs,
        }
    }

    /// Attach the detected git version.
    pub fn with_git_version(mut self, version: Option<GitVersion>) -> Self {
        self.git_version = version;
        self
    }

    /// Return `true` if the invoking git can run the proc-receive hook.
    pub fn supports_proc_receive(&self) -> bool {
        self.git_version
            .is_some_and(|version| version.is_at_least(GitVersion::PROC_RECEIVE))
    }

    /// Return `true` if the forge's dispatcher prepared our environment.
    pub fn has_push_environment(&self) -> bool {
        !self.ssh_original_command.is_empty()
    }

    /// The access requested by the SSH command, or `None` if its verb isn't allowed.
    pub fn requested_access(&self) -> Option<AccessMode> {
        let verb = self.ssh_original_command.split_whitespace().next()?;
        self.verbs.access_mode(verb)
    }

    /// The options sent along with every backend call, without commands.
    pub fn hook_options(&self) -> HookOptions {
        HookOptions {
            user_id: self.pusher_id,
            user_name: self.pusher_name.clone(),
            git_object_directory: self.git_object_directory.clone(),
            git_alternative_object_directories: self.git_alternate_object_directories.clone(),
            git_quarantine_path: self.git_quarantine_path.clone(),
            git_push_options: self.push_options.clone(),
            pull_request_id: self.pull_request_id,
            deploy_key_id: self.deploy_key_id,
            action_perm: self.action_perm,
            push_trigger: self.push_trigger.clone(),
            commands: Vec::new(),
        }
    }
}

/// Parse a boolean the way git's hook environment writes them. Everything unknown is `false`.
pub fn parse_bool(value: &str) -> bool {
    matches!(value, "1" | "t" | "T" | "true" | "TRUE" | "True")
}
