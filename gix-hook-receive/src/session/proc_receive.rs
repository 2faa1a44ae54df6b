use std::io::{Read, Write};

use gix_hook_wire::pktline::{self, Expect, PktLine};

use super::{Gate, Session};
use crate::backend::{Backend, ProcReceiveResult};
use crate::protocol::{is_empty_object_id, ProcReceiveCapabilities, PushOptions, RefUpdateCommand};
use crate::Error;

impl<B: Backend> Session<B> {
    /// Speak the proc-receive protocol with git over `input` and `output`:
    ///
    /// 1. Negotiate the version and capabilities.
    /// 2. Collect the commands, and push options if negotiated.
    /// 3. Let the backend decide about each reference.
    /// 4. Report the decisions back, one block of pkt-lines per result.
    ///
    /// Git versions without proc-receive support are refused before any I/O happens.
    pub fn proc_receive(&mut self, input: &mut impl Read, output: &mut impl Write) -> Result<(), Error> {
        if self.check_environment(false)? == Gate::Skip {
            return Ok(());
        }
        if !self.ctx.supports_proc_receive() {
            return Err(Error::NoProcReceiveSupport);
        }

        let version = pktline::read(input, Expect::Data)?;
        let capabilities = ProcReceiveCapabilities::from_version_line(version.payload())?;
        pktline::read(input, Expect::Flush)?;
        pktline::write_data(output, &capabilities.response())?;
        pktline::write_flush(output)?;
        output.flush()?;

        let mut commands = Vec::new();
        while let PktLine::Data(line) = pktline::read(input, Expect::Any)? {
            commands.push(RefUpdateCommand::from_proc_receive_line(&line)?);
        }
        let mut push_options = PushOptions::new();
        if capabilities.push_options {
            while let PktLine::Data(line) = pktline::read(input, Expect::Any)? {
                push_options.insert_raw(&line);
            }
        }
        tracing::debug!(
            commands = commands.len(),
            push_options = push_options.len(),
            "received proc-receive commands"
        );

        let mut options = self.ctx.hook_options().with_commands(commands);
        options.git_push_options = push_options;
        let results = self.call("proc-receive decision", |backend, repo| {
            backend.proc_receive(repo, &options)
        })?;

        for result in &results {
            write_result(output, result)?;
        }
        pktline::write_flush(output)?;
        output.flush()?;
        Ok(())
    }
}

/// Report a single decision to git.
fn write_result(out: &mut impl Write, result: &ProcReceiveResult) -> Result<(), Error> {
    let mut line = |text: String| pktline::write_data(&mut *out, text.as_bytes());
    if !result.err.is_empty() {
        line(format!("ng {} {}", result.original_ref, result.err))?;
        return Ok(());
    }
    line(format!("ok {}", result.original_ref))?;
    if result.is_not_matched {
        line("option fall-through".into())?;
        return Ok(());
    }
    line(format!("option refname {}", result.ref_name))?;
    if !is_empty_object_id(&result.old_oid) {
        line(format!("option old-oid {}", result.old_oid))?;
    }
    line(format!("option new-oid {}", result.new_oid))?;
    if result.is_force_push {
        line("option forced-update".into())?;
    }
    Ok(())
}
