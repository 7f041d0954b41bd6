//! Twindeck - terminal two-deck player
//!
//! 1. Loads the YAML config and starts the cpal output stream
//! 2. Applies the configured deck defaults and loads files given on the command line
//! 3. Reads commands from stdin and prints positions from the poller
//!
//! ## Command line
//!
//! ```text
//! twindeck [--config <path>] [--list-devices] [deck-a-file] [deck-b-file]
//! ```

mod commands;
mod config;

use std::io::BufRead;
use std::path::PathBuf;
use std::thread;

use anyhow::{bail, Context, Result};
use crossbeam::channel::{self, Receiver};

use commands::{Command, HELP};
use config::{default_config_path, PlayerConfig};
use twindeck_core::audio::{get_output_devices, start_audio_system};
use twindeck_core::config::load_config;
use twindeck_core::engine::{AudioEngine, EngineController};
use twindeck_core::poller::PositionUpdate;
use twindeck_core::source::format_duration;
use twindeck_core::types::{DeckId, NUM_DECKS};

struct Args {
    config_path: PathBuf,
    list_devices: bool,
    files: Vec<PathBuf>,
}

fn parse_args() -> Result<Args> {
    let mut args = Args {
        config_path: default_config_path(),
        list_devices: false,
        files: Vec::new(),
    };

    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" => {
                args.config_path = iter.next().map(PathBuf::from).context("--config needs a path")?;
            }
            "--list-devices" => args.list_devices = true,
            "--help" | "-h" => {
                println!("usage: twindeck [--config <path>] [--list-devices] [deck-a-file] [deck-b-file]");
                println!();
                println!("{}", HELP);
                std::process::exit(0);
            }
            _ if arg.starts_with("--") => bail!("unknown option {}", arg),
            _ => args.files.push(PathBuf::from(arg)),
        }
    }

    if args.files.len() > NUM_DECKS {
        bail!("at most {} files can be loaded at start-up", NUM_DECKS);
    }
    Ok(args)
}

fn main() -> Result<()> {
    // Initialize logger - set RUST_LOG=debug for verbose output
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let args = parse_args()?;

    if args.list_devices {
        for device in get_output_devices()? {
            println!("{}", device);
        }
        return Ok(());
    }

    log::info!("twindeck starting up");
    let config: PlayerConfig = load_config(&args.config_path);

    let system = start_audio_system(&config.audio, AudioEngine::new()).context("Failed to start audio output")?;
    println!(
        "{} @ {}Hz, {} frames (~{:.1}ms)",
        system.handle.device_name(),
        system.sample_rate,
        system.buffer_size,
        system.latency_ms
    );

    let mut controller = EngineController::new(system.command_sender, system.deck_atomics);

    for i in 0..controller.deck_count() {
        if let Some(mut deck) = controller.deck(DeckId(i)) {
            if let Err(e) = deck.apply_settings(&config.deck) {
                log::warn!("{}: config defaults not applied: {}", deck.id(), e);
            }
        }
    }

    for (i, path) in args.files.iter().enumerate() {
        match commands::execute(&mut controller, Command::Load { deck: DeckId(i), path: path.clone() }) {
            Ok(Some(message)) => println!("{}", message),
            Ok(None) => {}
            Err(e) => eprintln!("{:#}", e),
        }
    }

    let mut poller = controller
        .poller(config.poller.interval())
        .spawn()
        .context("Failed to start position poller")?;
    let updates = poller.updates().clone();
    let lines = spawn_stdin_reader().context("Failed to start stdin reader")?;

    println!("type 'help' for commands");

    loop {
        crossbeam::select! {
            recv(updates) -> update => {
                if let Ok(update) = update {
                    print_update(&update);
                }
            }
            recv(lines) -> line => {
                let Ok(line) = line else { break };
                if line.trim().is_empty() {
                    continue;
                }
                match commands::parse(&line) {
                    Ok(Command::Quit) => break,
                    Ok(command) => match commands::execute(&mut controller, command) {
                        Ok(Some(message)) => println!("{}", message),
                        Ok(None) => {}
                        Err(e) => eprintln!("{:#}", e),
                    },
                    Err(e) => eprintln!("{}", e),
                }
            }
        }
    }

    log::info!("twindeck shutting down");
    poller.shutdown();
    drop(system.handle);
    Ok(())
}

/// Forward stdin lines to a channel; closes it on EOF
fn spawn_stdin_reader() -> std::io::Result<Receiver<String>> {
    let (tx, rx) = channel::unbounded();
    thread::Builder::new().name("stdin-reader".into()).spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    })?;
    Ok(rx)
}

fn print_update(update: &PositionUpdate) {
    if !update.snapshot.is_playing {
        return;
    }
    println!(
        "{}  {} / {}  ({:.0}%)",
        update.deck,
        format_duration(update.snapshot.position_seconds),
        format_duration(update.snapshot.length_seconds),
        update.relative * 100.0
    );
}
