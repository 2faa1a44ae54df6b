//! gix-hook - git server hooks delegating push decisions to a forge
//!
//! Usage:
//!   gix-hook hook pre-receive             # Check updates read from stdin
//!   gix-hook hook update <ref> <old> <new>
//!   gix-hook hook post-receive            # Report applied updates read from stdin
//!   gix-hook hook proc-receive            # Handle AGit-flow pushes over pkt-lines

use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use gix_hook_receive::backend::HttpBackend;
use gix_hook_receive::config::{Config, CONFIG_ENV};
use gix_hook_receive::env::InvocationContext;
use gix_hook_receive::git_version::GitVersion;
use gix_hook_receive::interrupt::CancellationFlag;
use gix_hook_receive::outcome::HookOutcome;
use gix_hook_receive::session::{HookKind, Session};

/// Server-side git hooks for a forge
#[derive(Parser, Debug)]
#[command(name = "gix-hook")]
#[command(version, about, long_about = None)]
struct Args {
    /// The configuration file, defaults to the value of GIX_HOOK_CONFIG
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    subcommand: SubCmd,
}

#[derive(Subcommand, Debug)]
enum SubCmd {
    /// Run one of the hooks git invokes during receive-pack
    #[command(subcommand)]
    Hook(Hook),
}

#[derive(Subcommand, Debug)]
enum Hook {
    /// Check reference updates before they are applied
    PreReceive(HookArgs),
    /// Check a single reference update
    Update(HookArgs),
    /// Report applied reference updates
    PostReceive(HookArgs),
    /// Decide how AGit-flow reference updates are handled
    ProcReceive(HookArgs),
}

#[derive(clap::Args, Debug)]
struct HookArgs {
    /// Log everything to stderr
    #[arg(long)]
    debug: bool,

    /// The arguments git passes to the hook
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,
}

impl Hook {
    fn split(self) -> (HookKind, HookArgs) {
        match self {
            Hook::PreReceive(args) => (HookKind::PreReceive, args),
            Hook::Update(args) => (HookKind::Update, args),
            Hook::PostReceive(args) => (HookKind::PostReceive, args),
            Hook::ProcReceive(args) => (HookKind::ProcReceive, args),
        }
    }
}

fn init_tracing(debug: bool) {
    let default = if debug { "trace" } else { "error" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()),
        )
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let args = Args::parse();
    let SubCmd::Hook(hook) = args.subcommand;
    let (kind, hook_args) = hook.split();
    init_tracing(hook_args.debug);

    let outcome = match setup(kind, args.config) {
        Ok(mut session) => {
            let stdin = io::stdin();
            let mut stdin = stdin.lock();
            // Unlocked, so an interrupt can still report while a session is writing.
            let (mut stdout, mut stderr) = (io::stdout(), io::stderr());
            session.run(kind, &hook_args.args, &mut stdin, &mut stdout, &mut stderr)
        }
        Err(err) => {
            tracing::error!("{err:#}");
            let user_message = err
                .downcast_ref::<gix_hook_receive::Error>()
                .map(gix_hook_receive::Error::user_message)
                .unwrap_or_default();
            let outcome = HookOutcome::rejected(user_message, format!("{err:#}"));
            outcome.report(&mut io::stdout(), &mut io::stderr(), true);
            outcome
        }
    };
    io::stdout().flush().ok();
    io::stderr().flush().ok();
    std::process::exit(outcome.exit_code());
}

/// Everything that can fail before a session exists.
fn setup(kind: HookKind, config_path: Option<PathBuf>) -> Result<Session<HttpBackend>> {
    let config_path = config_path.or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from));
    let config = Config::load(config_path.as_deref()).context("Failed to load the hook configuration")?;

    let mut ctx = InvocationContext::from_env();
    if kind == HookKind::PreReceive || kind == HookKind::ProcReceive {
        ctx = ctx.with_git_version(GitVersion::detect());
    }

    let interrupt = CancellationFlag::new();
    let production = config.hook.production;
    interrupt
        .install_signal_handlers(move |operation| {
            HookOutcome::rejected("Push was interrupted", format!("interrupted during {operation}")).report(
                &mut io::stdout(),
                &mut io::stderr(),
                production,
            );
        })
        .context("Failed to install signal handlers")?;
    let backend = HttpBackend::new(&config.internal).context("Failed to set up the private API client")?;
    Ok(Session::new(ctx, config.hook, backend).with_interrupt(interrupt))
}
