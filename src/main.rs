use anyhow::{Context, Result};
use auto_typer::console::HELP;
use auto_typer::hotkeys::spawn_hotkey_listener;
use auto_typer::{
    Config, ConsoleCommand, ControlPanel, Feedback, FocusProvider, HotkeyRegistry, KeySender,
    PlatformFocus, Speed, Status, TextSource, TypingEngine, TyperError,
};
use clap::Parser;
use colored::Colorize;
use global_hotkey::GlobalHotKeyManager;
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::block_in_place;
use tracing::{debug, info};

#[derive(Parser, Debug)]
#[command(
    name = "autotyper",
    version,
    about = "Types text into the focused window like a human would"
)]
struct Args {
    /// Text to type
    #[arg(short, long, conflicts_with = "file")]
    text: Option<String>,

    /// UTF-8 text file to type
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Typing speed, 1 (slow) to 30 (fast)
    #[arg(short, long)]
    speed: Option<u8>,

    /// JSON configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Shortcut that starts typing
    #[arg(long)]
    start_hotkey: Option<String>,

    /// Shortcut that pauses and resumes typing
    #[arg(long)]
    pause_hotkey: Option<String>,

    /// Shortcut that stops typing
    #[arg(long)]
    end_hotkey: Option<String>,

    /// Start typing right away instead of waiting for the start hotkey
    #[arg(long)]
    autostart: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Write the effective configuration to this file and exit
    #[arg(long, value_name = "PATH")]
    write_config: Option<String>,
}

fn load_config(args: &Args) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };

    if let Some(speed) = args.speed {
        config.speed = Speed::new(speed)?;
    }
    if let Some(hotkey) = &args.start_hotkey {
        config.start_hotkey = hotkey.clone();
    }
    if let Some(hotkey) = &args.pause_hotkey {
        config.pause_hotkey = hotkey.clone();
    }
    if let Some(hotkey) = &args.end_hotkey {
        config.end_hotkey = hotkey.clone();
    }
    config.verbose |= args.verbose;

    config.validate()?;
    Ok(config)
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose {
        "auto_typer=debug,autotyper=debug"
    } else {
        "auto_typer=warn,autotyper=info"
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with_target(false)
        .try_init();
}

/// Reads console lines on a plain thread so a pending read never blocks
/// runtime shutdown.
fn spawn_stdin_reader() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

fn print_status(status: &Status) {
    let label = status.to_string();
    let label = match status {
        Status::Typing => label.green().bold(),
        Status::Paused | Status::WrongWindow => label.yellow().bold(),
        Status::Failed(_) => label.red().bold(),
        Status::Stopped => label.normal(),
    };
    println!("{} {}", "Status:".bold(), label);
}

fn print_error(error: &TyperError) {
    if error.is_user_error() {
        println!("{} {}", "⚠️ ".yellow(), error.to_string().yellow());
    } else {
        println!("{} {}", "❌".red(), error.to_string().red());
    }
}

/// Renders a handled command; returns `true` when the program should exit.
fn report(result: auto_typer::Result<Feedback>) -> bool {
    match result {
        Ok(Feedback::Silent) => false,
        Ok(Feedback::Message(message)) => {
            println!("{message}");
            false
        }
        Ok(Feedback::Quit) => true,
        Err(e) => {
            print_error(&e);
            false
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_config(&args).context("invalid configuration")?;
    init_logging(config.verbose);

    if let Some(path) = &args.write_config {
        config.save_to_file(path)?;
        println!("✅ Configuration written to {path}");
        return Ok(());
    }

    let focus = Arc::new(PlatformFocus::new());
    let home_window = focus.current_window();
    match &home_window {
        Some(window) => debug!(handle = window.handle(), title = window.title(), "control window"),
        None => debug!("control window unknown"),
    }

    let keys = Arc::new(KeySender::new().context("cannot simulate keystrokes on this system")?);
    let engine = Arc::new(
        TypingEngine::new(keys, focus, config.engine_options())
            .with_home_window(home_window)
            .with_speed(config.speed),
    );

    let manager = GlobalHotKeyManager::new()
        .map_err(|e| anyhow::anyhow!("Failed to create GlobalHotKeyManager: {}", e))?;
    let mut registry = HotkeyRegistry::new(manager);
    if let Err(e) = registry.apply_all(&config.bindings()) {
        print_error(&e);
    }

    let (action_tx, mut action_rx) = mpsc::unbounded_channel();
    let listener = spawn_hotkey_listener(registry.routes(), action_tx);

    let source = match (&args.text, &args.file) {
        (Some(text), _) => Some(TextSource::Inline(text.clone())),
        (None, Some(path)) => Some(TextSource::File(path.clone())),
        (None, None) => None,
    };
    let mut panel = ControlPanel::new(Arc::clone(&engine), registry, config.trim_input)
        .with_source(source);

    println!("{}", "⌨️  auto-typer".bold());
    println!("Active: {}", panel.hotkeys().bindings());
    println!("Speed: {}", engine.speed());
    println!("{HELP}");
    print_status(&engine.status());

    if args.autostart {
        println!(
            "Switch to the target window, typing starts in {:?}...",
            engine.options().grace_period
        );
        report(block_in_place(|| panel.handle_command(ConsoleCommand::Start)));
    }

    let mut status_rx = engine.subscribe();
    let mut lines = spawn_stdin_reader();
    let mut console_open = true;

    // Panel calls may wait on a session thread to wind down.
    loop {
        tokio::select! {
            line = lines.recv(), if console_open => {
                let Some(line) = line else {
                    info!("console closed, hotkeys remain active (Ctrl-C to exit)");
                    console_open = false;
                    continue;
                };
                if line.trim().is_empty() {
                    continue;
                }
                let quit = match line.parse::<ConsoleCommand>() {
                    Ok(command) => report(block_in_place(|| panel.handle_command(command))),
                    Err(message) => {
                        println!("{}", message.yellow());
                        false
                    }
                };
                if quit {
                    break;
                }
            }
            Some(action) = action_rx.recv() => {
                debug!(%action, "hotkey action");
                report(block_in_place(|| panel.handle_action(action)));
            }
            changed = status_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let status = status_rx.borrow_and_update().clone();
                print_status(&status);
            }
            _ = tokio::signal::ctrl_c() => {
                println!();
                break;
            }
        }
    }

    block_in_place(|| panel.shutdown());
    drop(action_rx);
    let _ = listener.await;
    println!("👋 Bye");
    Ok(())
}
