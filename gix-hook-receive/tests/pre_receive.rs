use std::io::Read;

use gix_hook_receive::backend::memory::Operation;
use gix_hook_receive::backend::{BackendError, MemoryBackend};
use gix_hook_receive::env::vars;
use gix_hook_receive::interrupt::CancellationFlag;
use gix_hook_receive::session::HookKind;
use gix_hook_receive::{Error, Kind};
use pretty_assertions::assert_eq;

mod util;
use util::{line, oid, ZERO};

fn branch_updates(count: usize) -> String {
    (0..count)
        .map(|idx| line(ZERO, &oid(idx), &format!("refs/heads/b{idx}")))
        .collect()
}

#[test]
fn updates_are_checked_in_batches_of_thirty() {
    let input = branch_updates(65);
    let mut session = util::session(MemoryBackend::new());
    let mut progress = Vec::new();
    session.pre_receive(input.as_bytes(), &mut progress).unwrap();

    let backend = session.into_backend();
    assert_eq!(backend.pre_receive_batches(), vec![30, 30, 5]);

    let expected = format!(
        "{stars} Checking 30 references\n{stars} Checking 30 references\n***** Checking 5 references\nChecked 65 references in total\n",
        stars = "*".repeat(30)
    );
    assert_eq!(String::from_utf8(progress).unwrap(), expected);
}

#[test]
fn batches_keep_arrival_order_and_context() {
    let input = branch_updates(31);
    let mut session = util::session(MemoryBackend::new());
    session.pre_receive(input.as_bytes(), std::io::sink()).unwrap();

    let backend = session.into_backend();
    let names: Vec<_> = backend
        .calls()
        .iter()
        .filter_map(|call| match call {
            gix_hook_receive::backend::memory::Call::PreReceive(repo, options) => {
                assert_eq!(repo.to_string(), "alice/project");
                assert_eq!(options.user_id, 2);
                Some(options.commands.iter().map(|c| c.ref_full_name.to_string()).collect::<Vec<_>>())
            }
            _ => None,
        })
        .flatten()
        .collect();
    let expected: Vec<_> = (0..31).map(|idx| format!("refs/heads/b{idx}")).collect();
    assert_eq!(names, expected);
}

#[test]
fn without_proc_receive_only_branches_and_tags_are_checked() {
    let input = [
        line(ZERO, &oid(1), "refs/heads/main"),
        line(ZERO, &oid(2), "refs/for/main/topic"),
        line(ZERO, &oid(3), "refs/tags/v1.0"),
        line(ZERO, &oid(4), "refs/notes/commits"),
    ]
    .concat();
    let mut session = util::old_git_session(MemoryBackend::new());
    let mut progress = Vec::new();
    session.pre_receive(input.as_bytes(), &mut progress).unwrap();

    assert_eq!(
        String::from_utf8(progress).unwrap(),
        "*.*. Checking 2 references\nChecked 4 references in total\n"
    );
    assert_eq!(session.backend().pre_receive_batches(), vec![2]);
}

#[test]
fn with_proc_receive_every_reference_is_checked() {
    let input = [
        line(ZERO, &oid(1), "refs/heads/main"),
        line(ZERO, &oid(2), "refs/for/main/topic"),
    ]
    .concat();
    let mut session = util::session(MemoryBackend::new());
    session.pre_receive(input.as_bytes(), std::io::sink()).unwrap();
    assert_eq!(session.backend().pre_receive_batches(), vec![2]);
}

#[test]
fn skipped_references_still_break_progress_lines() {
    let input: String = (0..31)
        .map(|idx| line(ZERO, &oid(idx), &format!("refs/notes/n{idx}")))
        .collect();
    let mut session = util::old_git_session(MemoryBackend::new());
    let mut progress = Vec::new();
    session.pre_receive(input.as_bytes(), &mut progress).unwrap();

    assert_eq!(
        String::from_utf8(progress).unwrap(),
        format!("{}\n.\nChecked 31 references in total\n", ".".repeat(30))
    );
    assert!(session.backend().calls().is_empty());
}

#[test]
fn malformed_lines_are_skipped() {
    let input = format!(
        "garbage\n{}\n{ZERO} {}\n{}",
        "", oid(0), line(ZERO, &oid(1), "refs/heads/main")
    );
    let mut session = util::session(MemoryBackend::new());
    let mut progress = Vec::new();
    session.pre_receive(input.as_bytes(), &mut progress).unwrap();
    assert_eq!(session.backend().pre_receive_batches(), vec![1]);
    assert!(String::from_utf8(progress).unwrap().ends_with("Checked 1 references in total\n"));
}

#[test]
fn a_failing_batch_stops_everything_and_drains_input() {
    let input = branch_updates(95);
    let backend = MemoryBackend::new().failing(
        Operation::PreReceive,
        1,
        BackendError {
            user_message: "branch b45 is protected".into(),
            message: "status 403".into(),
        },
    );
    let mut session = util::session(backend);
    let mut reader = input.as_bytes();
    let err = session.pre_receive(&mut reader, std::io::sink()).unwrap_err();

    assert_eq!(err.kind(), Kind::Backend);
    assert_eq!(err.user_message(), "branch b45 is protected");
    assert_eq!(err.log_message(), "pre-receive check (batch) failed: status 403");
    assert_eq!(session.backend().pre_receive_batches(), vec![30, 30]);

    let mut rest = Vec::new();
    reader.read_to_end(&mut rest).unwrap();
    assert!(rest.is_empty(), "remaining input was drained");
}

#[test]
fn the_last_batch_has_its_own_operation_name() {
    let backend = MemoryBackend::new().failing(Operation::PreReceive, 0, BackendError::internal("boom"));
    let mut session = util::session(backend);
    let err = session
        .pre_receive(branch_updates(3).as_bytes(), std::io::sink())
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Backend {
            operation: "pre-receive check (last)",
            ..
        }
    ));
}

#[test]
fn wiki_pushes_are_not_checked() {
    let mut env = util::push_env();
    env.push((vars::REPO_IS_WIKI, "true"));
    let mut session = util::session_with(env, None, MemoryBackend::new());
    let mut progress = Vec::new();
    session
        .pre_receive(branch_updates(3).as_bytes(), &mut progress)
        .unwrap();
    assert!(session.backend().calls().is_empty());
    assert_eq!(String::from_utf8(progress).unwrap(), "Checked 0 references in total\n");
}

#[test]
fn internal_pushes_are_trusted() {
    let mut session = util::session_with(vec![(vars::INTERNAL_PUSH, "1")], None, MemoryBackend::new());
    let mut progress = Vec::new();
    session
        .pre_receive(branch_updates(3).as_bytes(), &mut progress)
        .unwrap();
    assert!(progress.is_empty());
    assert!(session.backend().calls().is_empty());
}

#[test]
fn pushes_bypassing_the_forge_are_rejected() {
    let mut session = util::session_with(vec![], None, MemoryBackend::new());
    let (mut stdout, mut stderr) = (Vec::new(), Vec::new());
    let outcome = session.run(
        HookKind::PreReceive,
        &[],
        &mut branch_updates(2).as_bytes(),
        &mut stdout,
        &mut stderr,
    );
    assert_eq!(outcome.exit_code(), 1);
    assert_eq!(stdout, b"\n");
    assert!(String::from_utf8(stderr)
        .unwrap()
        .starts_with("Forge: Rejecting changes as the forge environment is not set."));
    assert!(session.backend().calls().is_empty(), "no audit log without a log message");
}

#[test]
fn pushes_bypassing_the_forge_can_be_allowed() {
    let ctx = gix_hook_receive::env::InvocationContext::from_vars(Vec::<(String, String)>::new());
    let config = gix_hook_receive::config::HookConfig {
        only_allow_push_if_environment_set: false,
        ..util::config()
    };
    let mut session = gix_hook_receive::session::Session::new(ctx, config, MemoryBackend::new());
    session
        .pre_receive(branch_updates(2).as_bytes(), std::io::sink())
        .unwrap();
    assert!(session.backend().calls().is_empty());
}

#[test]
fn interrupted_sessions_dont_call_the_backend() {
    let interrupt = CancellationFlag::new();
    interrupt.cancel();
    let mut session = util::session(MemoryBackend::new()).with_interrupt(interrupt);
    let err = session
        .pre_receive(branch_updates(2).as_bytes(), std::io::sink())
        .unwrap_err();
    assert_eq!(err.kind(), Kind::Cancelled);
    assert!(session.backend().calls().is_empty());
}

#[test]
fn backend_failures_are_reported_and_audited() {
    let backend = MemoryBackend::new().failing(
        Operation::PreReceive,
        0,
        BackendError {
            user_message: "branch main is protected".into(),
            message: "status 403".into(),
        },
    );
    let mut session = util::session(backend);
    let (mut stdout, mut stderr) = (Vec::new(), Vec::new());
    let outcome = session.run(
        HookKind::PreReceive,
        &[],
        &mut line(ZERO, &oid(0), "refs/heads/main").as_bytes(),
        &mut stdout,
        &mut stderr,
    );
    assert!(!outcome.accepted);
    assert_eq!(
        String::from_utf8(stdout).unwrap(),
        "* Checking 1 references\n\n"
    );
    assert_eq!(String::from_utf8(stderr).unwrap(), "Forge: branch main is protected\n");
    assert_eq!(
        session.backend().audit_log_entries(),
        vec![(true, "branch main is protected. pre-receive check (last) failed: status 403")]
    );
}
