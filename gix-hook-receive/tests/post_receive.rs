use gix_hook_receive::backend::memory::Operation;
use gix_hook_receive::backend::{BackendError, MemoryBackend, PostReceiveBranchResult, PostReceiveResponse};
use gix_hook_receive::session::HookKind;
use gix_hook_receive::Kind;
use pretty_assertions::assert_eq;

mod util;
use util::{line, oid, ZERO};

fn empty_repo() -> PostReceiveResponse {
    PostReceiveResponse {
        repo_was_empty: true,
        results: Vec::new(),
    }
}

fn suggestion(branch: &str, create: bool) -> PostReceiveBranchResult {
    PostReceiveBranchResult {
        message: true,
        create,
        branch: branch.into(),
        url: format!("https://forge.example/alice/project/{branch}"),
    }
}

#[test]
fn updates_are_reported_in_batches_of_thirty() {
    let input: String = (0..65)
        .map(|idx| line(ZERO, &oid(idx), &format!("refs/heads/b{idx}")))
        .collect();
    let mut session = util::session(MemoryBackend::new());
    let mut progress = Vec::new();
    session
        .post_receive(input.as_bytes(), &mut progress, &mut std::io::sink())
        .unwrap();

    assert_eq!(session.backend().post_receive_batches(), vec![30, 30, 5]);
    let dots = ".".repeat(30);
    assert_eq!(
        String::from_utf8(progress).unwrap(),
        format!("{dots} Processing 30 references\n{dots} Processing 30 references\n..... Processing 5 references\nProcessed 65 references in total\n")
    );
    assert!(session.backend().default_branches().is_empty());
}

#[test]
fn first_push_of_master_to_an_empty_repository_resets_the_default_branch() {
    let input = [
        line(ZERO, &oid(0), "refs/heads/master"),
        line(ZERO, &oid(1), "refs/heads/develop"),
    ]
    .concat();
    let mut session = util::session(MemoryBackend::new().with_post_receive_response(empty_repo()));
    session
        .post_receive(input.as_bytes(), std::io::sink(), &mut std::io::sink())
        .unwrap();
    assert_eq!(session.backend().default_branches(), vec!["master"]);
    assert_eq!(
        session.backend().calls().last().map(|call| call.operation()),
        Some(Operation::SetDefaultBranch)
    );
}

#[test]
fn default_branch_is_kept_for_non_empty_repositories() {
    let input = line(ZERO, &oid(0), "refs/heads/master");
    let mut session = util::session(MemoryBackend::new());
    session
        .post_receive(input.as_bytes(), std::io::sink(), &mut std::io::sink())
        .unwrap();
    assert!(session.backend().default_branches().is_empty());
}

#[test]
fn master_only_counts_as_the_very_first_update() {
    let input = [
        line(ZERO, &oid(0), "refs/heads/main"),
        line(ZERO, &oid(1), "refs/heads/master"),
    ]
    .concat();
    let mut session = util::session(MemoryBackend::new().with_post_receive_response(empty_repo()));
    session
        .post_receive(input.as_bytes(), std::io::sink(), &mut std::io::sink())
        .unwrap();
    assert!(session.backend().default_branches().is_empty());
}

#[test]
fn deleting_master_doesnt_reset_the_default_branch() {
    let input = line(&oid(0), ZERO, "refs/heads/master");
    let mut session = util::session(MemoryBackend::new().with_post_receive_response(empty_repo()));
    session
        .post_receive(input.as_bytes(), std::io::sink(), &mut std::io::sink())
        .unwrap();
    assert!(session.backend().default_branches().is_empty());
}

#[test]
fn an_empty_repository_reported_by_a_later_batch_still_counts() {
    let input: String = std::iter::once(line(ZERO, &oid(0), "refs/heads/master"))
        .chain((1..40).map(|idx| line(ZERO, &oid(idx), &format!("refs/heads/b{idx}"))))
        .collect();
    let backend = MemoryBackend::new()
        .with_post_receive_response(PostReceiveResponse::default())
        .with_post_receive_response(empty_repo());
    let mut session = util::session(backend);
    session
        .post_receive(input.as_bytes(), std::io::sink(), &mut std::io::sink())
        .unwrap();
    assert_eq!(session.backend().post_receive_batches(), vec![30, 10]);
    assert_eq!(session.backend().default_branches(), vec!["master"]);
}

#[test]
fn suggestions_are_printed_after_progress() {
    let input = [
        line(ZERO, &oid(0), "refs/heads/feature"),
        line(&oid(1), &oid(2), "refs/heads/fix"),
    ]
    .concat();
    let backend = MemoryBackend::new().with_post_receive_response(PostReceiveResponse {
        repo_was_empty: false,
        results: vec![suggestion("feature", true), suggestion("fix", false)],
    });
    let mut session = util::session(backend);
    let mut messages = Vec::new();
    session
        .post_receive(input.as_bytes(), std::io::sink(), &mut messages)
        .unwrap();
    assert_eq!(
        String::from_utf8(messages).unwrap(),
        "\nCreate a new pull request for 'feature':\n  https://forge.example/alice/project/feature\n\n\
         \nVisit the existing pull request:\n  https://forge.example/alice/project/fix\n\n"
    );
}

#[test]
fn collected_suggestions_are_printed_when_a_later_batch_fails() {
    let input: String = (0..45)
        .map(|idx| line(ZERO, &oid(idx), &format!("refs/heads/b{idx}")))
        .collect();
    let backend = MemoryBackend::new()
        .with_post_receive_response(PostReceiveResponse {
            repo_was_empty: false,
            results: vec![suggestion("b0", true)],
        })
        .failing(Operation::PostReceive, 1, BackendError::new("database is locked"));
    let mut session = util::session(backend);
    let (mut stdout, mut stderr) = (Vec::new(), Vec::new());
    let outcome = session.run(
        HookKind::PostReceive,
        &[],
        &mut input.as_bytes(),
        &mut stdout,
        &mut stderr,
    );

    assert_eq!(outcome.exit_code(), 1);
    assert_eq!(outcome.log_message, "post-receive update failed: database is locked");
    assert_eq!(
        String::from_utf8(stderr).unwrap(),
        "\nCreate a new pull request for 'b0':\n  https://forge.example/alice/project/b0\n\n\
         Forge: database is locked\n"
    );
}

#[test]
fn failing_default_branch_reset_rejects() {
    let input = line(ZERO, &oid(0), "refs/heads/master");
    let backend = MemoryBackend::new()
        .with_post_receive_response(empty_repo())
        .failing(Operation::SetDefaultBranch, 0, BackendError::internal("no such branch"));
    let mut session = util::session(backend);
    let err = session
        .post_receive(input.as_bytes(), std::io::sink(), &mut std::io::sink())
        .unwrap_err();
    assert_eq!(err.kind(), Kind::Backend);
    assert_eq!(err.log_message(), "set default branch failed: no such branch");
}
