//! trackscroll - Pointer Gesture Wheel Scrolling
//!
//! Converts pressed-button gestures, drag gestures or a held key into
//! synthesized wheel scrolling, sitting between the OS raw input stream and
//! the application layer.

use anyhow::Result;
use trackscroll::config::profile;
use trackscroll::ipc::ControlCommand;
use trackscroll::utils;

struct Args {
    console: bool,
    profile: String,
    control: Option<ControlCommand>,
}

fn parse_args() -> Result<Args> {
    let mut args = Args {
        console: false,
        profile: "Default".to_string(),
        control: None,
    };

    let argv: Vec<String> = std::env::args().skip(1).collect();
    let mut i = 0;
    while i < argv.len() {
        let arg = argv[i].as_str();
        if arg == "--console" {
            args.console = true;
        } else if arg.starts_with("--send") {
            let next = argv.get(i + 1).map(|s| s.as_str());
            let cmd = ControlCommand::from_args(arg, next)
                .ok_or_else(|| anyhow::anyhow!("unknown command: {}", arg))?;
            args.control = Some(cmd);
            if matches!(cmd, ControlCommand::SetPassMode(_)) && next.is_some() {
                i += 1;
            }
        } else if arg.starts_with("--") {
            anyhow::bail!("unknown command: {}", arg);
        } else {
            // A bare argument selects a profile, if it exists.
            let dir = utils::app_data_dir();
            if profile::exists(&dir, arg) {
                args.profile = arg.to_string();
            } else {
                anyhow::bail!("no such profile: {}", arg);
            }
        }
        i += 1;
    }
    Ok(args)
}

fn init_logging(console: bool) {
    if console {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug"))
            .init();
    } else if let Err(e) = utils::init_logging(false) {
        eprintln!("logging init failed: {}", e);
    }
}

#[cfg(target_os = "windows")]
fn run(args: Args) -> Result<()> {
    use log::info;
    use std::sync::Arc;
    use trackscroll::platform::windows as win;
    use trackscroll::{Collaborators, Core};

    if let Some(cmd) = args.control {
        // Client mode: deliver the control word and leave.
        if win::send_control(cmd) {
            return Ok(());
        }
        anyhow::bail!("no running instance to receive {:?}", cmd);
    }

    let dir = utils::app_data_dir();
    utils::ensure_dir(&dir)?;

    let core = Core::load(
        dir,
        args.profile,
        Collaborators {
            injector: Arc::new(win::WinInjector),
            cursor: Arc::new(win::WinCursorHost::new()),
            motion: Arc::new(win::WinMotionSource),
            keys: Arc::new(win::WinKeyState),
        },
    );

    info!("starting with profile {:?}", core.profile_name());
    win::run(core)
}

#[cfg(not(target_os = "windows"))]
fn run(_args: Args) -> Result<()> {
    anyhow::bail!("trackscroll requires Windows low-level input hooks")
}

fn main() -> Result<()> {
    let args = parse_args()?;
    init_logging(args.console);
    run(args)
}
