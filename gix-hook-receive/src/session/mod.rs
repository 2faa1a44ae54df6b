//! Hook sessions: one per process, driving a single hook from input to outcome.
//!
//! A [`Session`] owns the invocation context, the hook configuration and the backend. Each hook
//! is a method returning `Result<(), Error>`; [`Session::finish()`] turns that into a
//! [`HookOutcome`] and reports failures, and [`Session::run()`] does both.

use std::io::{self, BufRead, Write};

use gix_hook_wire::ProgressWriter;

use crate::backend::{Backend, BackendError};
use crate::config::HookConfig;
use crate::env::{InvocationContext, RepoRef};
use crate::interrupt::CancellationFlag;
use crate::outcome::HookOutcome;
use crate::Error;

mod post_receive;
mod pre_receive;
mod proc_receive;
mod update;

pub use post_receive::print_suggestions;

/// The hooks we implement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookKind {
    /// Check updates before they are applied.
    PreReceive,
    /// Check a single update before it is applied.
    Update,
    /// React to applied updates.
    PostReceive,
    /// Handle AGit-flow updates instead of git.
    ProcReceive,
}

impl HookKind {
    /// The name git uses for this hook.
    pub fn as_str(&self) -> &'static str {
        match self {
            HookKind::PreReceive => "pre-receive",
            HookKind::Update => "update",
            HookKind::PostReceive => "post-receive",
            HookKind::ProcReceive => "proc-receive",
        }
    }
}

/// Whether a session has work to do after checking its environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Gate {
    Proceed,
    Skip,
}

/// A single hook invocation.
#[derive(Debug)]
pub struct Session<B> {
    ctx: InvocationContext,
    config: HookConfig,
    backend: B,
    interrupt: CancellationFlag,
}

impl<B: Backend> Session<B> {
    /// Create a new session which can't be interrupted.
    pub fn new(ctx: InvocationContext, config: HookConfig, backend: B) -> Self {
        Session {
            ctx,
            config,
            backend,
            interrupt: CancellationFlag::new(),
        }
    }

    /// Check `interrupt` before each backend call.
    pub fn with_interrupt(mut self, interrupt: CancellationFlag) -> Self {
        self.interrupt = interrupt;
        self
    }

    /// The invocation context.
    pub fn context(&self) -> &InvocationContext {
        &self.ctx
    }

    /// The backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Consume the session and return its backend.
    pub fn into_backend(self) -> B {
        self.backend
    }

    /// Run `hook` with `args`, reading git's input from `stdin`, and report the outcome.
    pub fn run(
        &mut self,
        hook: HookKind,
        args: &[String],
        stdin: &mut impl BufRead,
        stdout: &mut impl Write,
        stderr: &mut impl Write,
    ) -> HookOutcome {
        let _span = tracing::info_span!("hook", name = hook.as_str(), repo = %self.ctx.repo).entered();
        let result = match hook {
            HookKind::PreReceive => self.pre_receive(&mut *stdin, &mut *stdout),
            HookKind::Update => self.update(args),
            HookKind::PostReceive => self.post_receive(&mut *stdin, &mut *stdout, &mut *stderr),
            HookKind::ProcReceive => self.proc_receive(stdin, &mut *stdout),
        };
        self.finish(result, stdout, stderr)
    }

    /// Turn `result` into an outcome, reporting failures on `stdout`, `stderr` and in the audit log.
    pub fn finish(&mut self, result: Result<(), Error>, stdout: &mut impl Write, stderr: &mut impl Write) -> HookOutcome {
        if let Err(err) = &result {
            tracing::debug!(kind = ?err.kind(), "{}", err.log_message());
        }
        let outcome = HookOutcome::from_result(result);
        outcome.emit(stdout, stderr, self.config.production, &mut self.backend);
        outcome
    }

    /// Decide whether to do anything at all. Internal pushes are trusted if `trust_internal` is set,
    /// and pushes that didn't come through the forge are rejected or ignored as configured.
    fn check_environment(&self, trust_internal: bool) -> Result<Gate, Error> {
        if trust_internal && self.ctx.is_internal {
            tracing::debug!("internal push, nothing to check");
            return Ok(Gate::Skip);
        }
        if !self.ctx.has_push_environment() {
            if self.config.only_allow_push_if_environment_set {
                return Err(Error::EnvironmentNotSet);
            }
            tracing::debug!("push environment not set, nothing to check");
            return Ok(Gate::Skip);
        }
        tracing::debug!(access = ?self.ctx.requested_access(), pusher = self.ctx.pusher_id, "push environment");
        Ok(Gate::Proceed)
    }

    /// Run `call` against the backend unless we were interrupted.
    fn call<T>(
        &mut self,
        operation: &'static str,
        call: impl FnOnce(&mut B, &RepoRef) -> Result<T, BackendError>,
    ) -> Result<T, Error> {
        let _in_flight = self.interrupt.enter(operation)?;
        tracing::debug!(operation, "calling backend");
        call(&mut self.backend, &self.ctx.repo).map_err(|err| Error::Backend {
            operation,
            user_message: err.user_message,
            message: err.message,
        })
    }

    fn progress<W: Write>(&self, out: W) -> ProgressWriter<W> {
        ProgressWriter::new(out, self.config.verbose_push, self.config.verbose_push_delay)
    }
}

/// Write progress output, which is purely informational and may fail.
fn report(out: &mut impl Write, args: std::fmt::Arguments<'_>) {
    if let Err(err) = out.write_fmt(args) {
        tracing::trace!(%err, "could not write progress");
    }
}

/// Read and discard the rest of `input` so git doesn't block writing to us.
fn drain(input: &mut impl BufRead) {
    if let Err(err) = io::copy(input, &mut io::sink()) {
        tracing::trace!(%err, "could not drain input");
    }
}

/// Read the next line into `buf`, returning `false` at the end of input.
fn read_line(input: &mut impl BufRead, buf: &mut Vec<u8>) -> Result<bool, Error> {
    buf.clear();
    Ok(input.read_until(b'\n', buf).map_err(Error::Stdin)? != 0)
}
