use std::io::{BufRead, Write};

use super::{drain, read_line, report, Gate, Session};
use crate::backend::Backend;
use crate::batch::{RefUpdateBatcher, HOOK_BATCH_SIZE};
use crate::protocol::RefUpdateCommand;
use crate::Error;

impl<B: Backend> Session<B> {
    /// Check the reference updates git is about to apply, read from `input` as
    /// `<old-oid> <new-oid> <ref>` lines, in batches.
    ///
    /// Without proc-receive support only branches and tags are checked here, as other references
    /// aren't ours to authorize. With it, everything is checked as proc-receive defers authorization.
    /// Progress goes to `progress`. The first failing batch rejects the push and the remaining
    /// input is discarded.
    pub fn pre_receive(&mut self, mut input: impl BufRead, progress: impl Write) -> Result<(), Error> {
        let res = self.check_updates(&mut input, progress);
        if res.is_err() {
            drain(&mut input);
        }
        res
    }

    fn check_updates(&mut self, input: &mut impl BufRead, progress: impl Write) -> Result<(), Error> {
        if self.check_environment(true)? == Gate::Skip {
            return Ok(());
        }
        let mut out = self.progress(progress);
        let supports_proc_receive = self.ctx.supports_proc_receive();
        let options = self.ctx.hook_options();
        let mut batcher = RefUpdateBatcher::new();
        let (mut total, mut lastline) = (0_usize, 0_usize);

        let mut line = Vec::new();
        while read_line(input, &mut line)? {
            if self.ctx.is_wiki {
                continue;
            }
            let Some(cmd) = RefUpdateCommand::from_hook_line(&line) else {
                continue;
            };
            total += 1;
            lastline += 1;

            let name = &cmd.ref_full_name;
            if supports_proc_receive || name.is_branch() || name.is_tag() {
                report(&mut out, format_args!("*"));
                if let Some(batch) = batcher.push(cmd) {
                    report(&mut out, format_args!(" Checking {} references\n", batch.len()));
                    let options = options.with_commands(batch);
                    self.call("pre-receive check (batch)", |backend, repo| {
                        backend.pre_receive(repo, &options)
                    })?;
                    lastline = 0;
                }
            } else {
                report(&mut out, format_args!("."));
            }
            if lastline >= HOOK_BATCH_SIZE {
                report(&mut out, format_args!("\n"));
                lastline = 0;
            }
        }

        if let Some(batch) = batcher.finish() {
            report(&mut out, format_args!(" Checking {} references\n", batch.len()));
            let options = options.with_commands(batch);
            self.call("pre-receive check (last)", |backend, repo| {
                backend.pre_receive(repo, &options)
            })?;
        } else if lastline > 0 {
            report(&mut out, format_args!("\n"));
        }
        report(&mut out, format_args!("Checked {total} references in total\n"));
        tracing::debug!(total, "pre-receive checks passed");
        out.close().ok();
        Ok(())
    }
}
