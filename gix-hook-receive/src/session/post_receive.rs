use std::io::{BufRead, Write};
use std::process::Stdio;

use bstr::ByteSlice;

use super::{drain, read_line, report, Gate, Session};
use crate::backend::{Backend, HookOptions, PostReceiveBranchResult};
use crate::batch::RefUpdateBatcher;
use crate::protocol::{is_empty_object_id, RefUpdateCommand};
use crate::Error;

/// The branch made default when it's the first thing pushed to an empty repository.
const LEGACY_DEFAULT_BRANCH: &str = "master";

/// Accumulated backend answers of all post-receive batches.
#[derive(Default)]
struct Received {
    repo_was_empty: bool,
    suggestions: Vec<PostReceiveBranchResult>,
}

impl<B: Backend> Session<B> {
    /// Report applied reference updates, read from `input` as `<old-oid> <new-oid> <ref>` lines,
    /// to the backend in batches.
    ///
    /// If the repository was empty and the very first update pushed `master`, `master` becomes the
    /// default branch. Pull request suggestions are printed to `messages` at the end, or as far
    /// as they were collected if a batch fails.
    pub fn post_receive(
        &mut self,
        mut input: impl BufRead,
        progress: impl Write,
        messages: &mut impl Write,
    ) -> Result<(), Error> {
        let res = self.report_updates(&mut input, progress, messages);
        if res.is_err() {
            drain(&mut input);
        }
        res
    }

    fn report_updates(
        &mut self,
        input: &mut impl BufRead,
        progress: impl Write,
        messages: &mut impl Write,
    ) -> Result<(), Error> {
        if self.config.update_server_info {
            update_server_info()?;
        }
        if self.check_environment(true)? == Gate::Skip {
            return Ok(());
        }
        let mut out = self.progress(progress);
        let options = self.ctx.hook_options();
        let mut batcher = RefUpdateBatcher::new();
        let mut received = Received::default();
        let mut master_pushed = false;

        let mut line = Vec::new();
        while read_line(input, &mut line)? {
            if self.ctx.is_wiki {
                continue;
            }
            let Some(cmd) = RefUpdateCommand::from_hook_line(&line) else {
                continue;
            };
            report(&mut out, format_args!("."));
            if batcher.total() == 0 && cmd.ref_full_name.branch_name() == Some(LEGACY_DEFAULT_BRANCH) {
                master_pushed = !is_empty_object_id(&cmd.new_oid);
            }
            if let Some(batch) = batcher.push(cmd) {
                report(&mut out, format_args!(" Processing {} references\n", batch.len()));
                if let Err(err) = self.send_batch(&options, batch, &mut received) {
                    print_suggestions(messages, &received.suggestions);
                    return Err(err);
                }
            }
        }
        if let Some(batch) = batcher.finish() {
            report(&mut out, format_args!(" Processing {} references\n", batch.len()));
            if let Err(err) = self.send_batch(&options, batch, &mut received) {
                print_suggestions(messages, &received.suggestions);
                return Err(err);
            }
        }
        report(
            &mut out,
            format_args!("Processed {} references in total\n", batcher.total()),
        );
        out.close().ok();

        if received.repo_was_empty && master_pushed {
            tracing::debug!("first push to an empty repository, resetting the default branch");
            self.call("set default branch", |backend, repo| {
                backend.set_default_branch(repo, LEGACY_DEFAULT_BRANCH)
            })?;
        }
        print_suggestions(messages, &received.suggestions);
        Ok(())
    }

    fn send_batch(
        &mut self,
        options: &HookOptions,
        batch: Vec<RefUpdateCommand>,
        received: &mut Received,
    ) -> Result<(), Error> {
        let options = options.with_commands(batch);
        let response = self.call("post-receive update", |backend, repo| {
            backend.post_receive(repo, &options)
        })?;
        received.repo_was_empty |= response.repo_was_empty;
        received.suggestions.extend(response.results);
        Ok(())
    }
}

/// Print the pull request suggestions flagged for display, each framed by blank lines.
pub fn print_suggestions(out: &mut impl Write, suggestions: &[PostReceiveBranchResult]) {
    for suggestion in suggestions.iter().filter(|s| s.message) {
        report(out, format_args!("\n"));
        if suggestion.create {
            report(
                out,
                format_args!("Create a new pull request for '{}':\n", suggestion.branch),
            );
        } else {
            report(out, format_args!("Visit the existing pull request:\n"));
        }
        report(out, format_args!("  {}\n", suggestion.url));
        report(out, format_args!("\n"));
        out.flush().ok();
    }
}

/// Refresh the auxiliary files of dumb transports in the repository git runs us in.
fn update_server_info() -> Result<(), Error> {
    let output = gix_command::prepare("git")
        .arg("update-server-info")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .and_then(std::process::Child::wait_with_output)
        .map_err(|err| Error::Git {
            command: "update-server-info",
            message: err.to_string(),
        })?;
    if !output.status.success() {
        return Err(Error::Git {
            command: "update-server-info",
            message: format!("{}: {}", output.status, output.stderr.trim().as_bstr()),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn only_flagged_suggestions_are_printed() {
        let suggestions = [
            PostReceiveBranchResult {
                message: true,
                create: true,
                branch: "feature".into(),
                url: "https://forge.example/a/b/compare/main...feature".into(),
            },
            PostReceiveBranchResult {
                message: false,
                create: true,
                branch: "hidden".into(),
                url: "https://forge.example/hidden".into(),
            },
            PostReceiveBranchResult {
                message: true,
                create: false,
                branch: "fix".into(),
                url: "https://forge.example/a/b/pulls/3".into(),
            },
        ];
        let mut out = Vec::new();
        print_suggestions(&mut out, &suggestions);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "\nCreate a new pull request for 'feature':\n  https://forge.example/a/b/compare/main...feature\n\n\
             \nVisit the existing pull request:\n  https://forge.example/a/b/pulls/3\n\n"
        );
    }
}
