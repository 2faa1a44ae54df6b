use gix_hook_receive::env::{vars, AccessMode, InvocationContext};
use serial_test::serial;

/// Set `pairs` in the process environment while `f` runs.
fn with_env<T>(pairs: &[(&str, &str)], f: impl FnOnce() -> T) -> T {
    for (name, value) in pairs {
        std::env::set_var(name, value);
    }
    let out = f();
    for (name, _) in pairs {
        std::env::remove_var(name);
    }
    out
}

#[test]
#[serial]
fn context_is_read_from_the_process_environment() {
    let ctx = with_env(
        &[
            (vars::SSH_ORIGINAL_COMMAND, "git-receive-pack 'alice/project.git'"),
            (vars::REPO_USER_NAME, "alice"),
            (vars::REPO_NAME, "project"),
            (vars::PUSHER_ID, "7"),
            ("GIT_PUSH_OPTION_COUNT", "1"),
            ("GIT_PUSH_OPTION_0", "ci.skip"),
        ],
        InvocationContext::from_env,
    );
    assert!(ctx.has_push_environment());
    assert_eq!(ctx.requested_access(), Some(AccessMode::Write));
    assert_eq!(ctx.repo.to_string(), "alice/project");
    assert_eq!(ctx.pusher_id, 7);
    assert_eq!(ctx.push_options.get("ci.skip"), Some("true"));
    assert_eq!(ctx.git_version, None, "detected separately");
}

#[test]
#[serial]
fn internal_marker_is_read_from_the_process_environment() {
    let ctx = with_env(&[(vars::INTERNAL_PUSH, "true")], InvocationContext::from_env);
    assert!(ctx.is_internal);
}
