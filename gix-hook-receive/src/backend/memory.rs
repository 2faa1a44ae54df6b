//! A backend that records calls and replays scripted answers, for tests and dry runs.

use std::collections::VecDeque;

use super::{Backend, BackendError, HookOptions, PostReceiveResponse, ProcReceiveResult};
use crate::env::RepoRef;

/// The backend operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// [`Backend::pre_receive()`]
    PreReceive,
    /// [`Backend::post_receive()`]
    PostReceive,
    /// [`Backend::proc_receive()`]
    ProcReceive,
    /// [`Backend::set_default_branch()`]
    SetDefaultBranch,
    /// [`Backend::audit_log()`]
    AuditLog,
}

/// A recorded backend call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    /// A pre-receive batch.
    PreReceive(RepoRef, HookOptions),
    /// A post-receive batch.
    PostReceive(RepoRef, HookOptions),
    /// A proc-receive decision.
    ProcReceive(RepoRef, HookOptions),
    /// A default branch change.
    SetDefaultBranch(RepoRef, String),
    /// An audit log entry.
    AuditLog {
        /// The entry describes a failure.
        is_error: bool,
        /// The logged message.
        message: String,
    },
}

impl Call {
    /// The operation that was called.
    pub fn operation(&self) -> Operation {
        match self {
            Call::PreReceive(..) => Operation::PreReceive,
            Call::PostReceive(..) => Operation::PostReceive,
            Call::ProcReceive(..) => Operation::ProcReceive,
            Call::SetDefaultBranch(..) => Operation::SetDefaultBranch,
            Call::AuditLog { .. } => Operation::AuditLog,
        }
    }
}

/// An in-memory [`Backend`].
///
/// Unless scripted otherwise, all calls succeed, post-receive reports a non-empty repository
/// without suggestions, and proc-receive lets git handle every reference itself.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    calls: Vec<Call>,
    post_receive: VecDeque<PostReceiveResponse>,
    proc_receive: Option<Vec<ProcReceiveResult>>,
    failures: Vec<(Operation, usize, BackendError)>,
}

impl MemoryBackend {
    /// Create a backend that accepts everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer the next post-receive call with `response`. Answers are used in the order they are added.
    pub fn with_post_receive_response(mut self, response: PostReceiveResponse) -> Self {
        self.post_receive.push_back(response);
        self
    }

    /// Answer proc-receive calls with `results`.
    pub fn with_proc_receive_results(mut self, results: Vec<ProcReceiveResult>) -> Self {
        self.proc_receive = Some(results);
        self
    }

    /// Fail the `nth` call of `operation`, counting from zero.
    pub fn failing(mut self, operation: Operation, nth: usize, err: BackendError) -> Self {
        self.failures.push((operation, nth, err));
        self
    }

    /// All calls in the order they were made.
    pub fn calls(&self) -> &[Call] {
        &self.calls
    }

    /// The amount of calls made to `operation`.
    pub fn count(&self, operation: Operation) -> usize {
        self.calls.iter().filter(|call| call.operation() == operation).count()
    }

    /// The sizes of the pre-receive batches in call order.
    pub fn pre_receive_batches(&self) -> Vec<usize> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                Call::PreReceive(_, options) => Some(options.commands.len()),
                _ => None,
            })
            .collect()
    }

    /// The sizes of the post-receive batches in call order.
    pub fn post_receive_batches(&self) -> Vec<usize> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                Call::PostReceive(_, options) => Some(options.commands.len()),
                _ => None,
            })
            .collect()
    }

    /// The branches passed to `set_default_branch`.
    pub fn default_branches(&self) -> Vec<&str> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                Call::SetDefaultBranch(_, branch) => Some(branch.as_str()),
                _ => None,
            })
            .collect()
    }

    /// The audit log entries.
    pub fn audit_log_entries(&self) -> Vec<(bool, &str)> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                Call::AuditLog { is_error, message } => Some((*is_error, message.as_str())),
                _ => None,
            })
            .collect()
    }

    fn record(&mut self, call: Call) -> Result<(), BackendError> {
        let operation = call.operation();
        let nth = self.count(operation);
        self.calls.push(call);
        match self
            .failures
            .iter()
            .find(|(op, idx, _)| *op == operation && *idx == nth)
        {
            Some((_, _, err)) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

impl Backend for MemoryBackend {
    fn pre_receive(&mut self, repo: &RepoRef, options: &HookOptions) -> Result<(), BackendError> {
        self.record(Call::PreReceive(repo.clone(), options.clone()))
    }

    fn post_receive(&mut self, repo: &RepoRef, options: &HookOptions) -> Result<PostReceiveResponse, BackendError> {
        self.record(Call::PostReceive(repo.clone(), options.clone()))?;
        Ok(self.post_receive.pop_front().unwrap_or_default())
    }

    fn proc_receive(&mut self, repo: &RepoRef, options: &HookOptions) -> Result<Vec<ProcReceiveResult>, BackendError> {
        self.record(Call::ProcReceive(repo.clone(), options.clone()))?;
        Ok(match &self.proc_receive {
            Some(results) => results.clone(),
            None => options
                .commands
                .iter()
                .map(|cmd| ProcReceiveResult {
                    original_ref: cmd.ref_full_name.clone(),
                    ref_name: cmd.ref_full_name.clone(),
                    old_oid: cmd.old_oid.clone(),
                    new_oid: cmd.new_oid.clone(),
                    is_not_matched: true,
                    ..Default::default()
                })
                .collect(),
        })
    }

    fn set_default_branch(&mut self, repo: &RepoRef, branch: &str) -> Result<(), BackendError> {
        self.record(Call::SetDefaultBranch(repo.clone(), branch.to_owned()))
    }

    fn audit_log(&mut self, is_error: bool, message: &str) -> Result<(), BackendError> {
        self.record(Call::AuditLog {
            is_error,
            message: message.to_owned(),
        })
    }
}
