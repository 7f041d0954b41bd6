//! Line commands typed at the player prompt
//!
//! ```text
//! load a ~/music/track.flac    play b       stop a
//! gain a 0.8    speed b 1.25   room a 0.7   damp a 0.3
//! loop b on     seek a 0.5     pos b 42.0
//! status        help           quit
//! ```
//!
//! Decks are named `a`/`b` or `1`/`2`.

use std::path::PathBuf;

use anyhow::Result;
use thiserror::Error;
use twindeck_core::engine::{DeckController, EngineController};
use twindeck_core::source::format_duration;
use twindeck_core::types::DeckId;

pub const HELP: &str = "\
commands:
  load <deck> <path>      decode a file onto a deck
  play <deck>             start playback
  stop <deck>             stop playback
  gain <deck> <0..1>      deck volume
  speed <deck> <0..100>   playback speed factor
  room <deck> <0..1>      reverb room size
  damp <deck> <0..1>      reverb damping
  loop <deck> on|off      loop at end of source
  seek <deck> <0..1>      jump to a fraction of the length
  pos <deck> <seconds>    jump to a time
  status                  show both decks
  quit                    exit
decks: a, b (or 1, 2)";

/// One parsed command line
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Load { deck: DeckId, path: PathBuf },
    Play(DeckId),
    Stop(DeckId),
    Gain(DeckId, f64),
    Speed(DeckId, f64),
    Room(DeckId, f64),
    Damp(DeckId, f64),
    Loop(DeckId, bool),
    Seek(DeckId, f64),
    Pos(DeckId, f64),
    Status,
    Help,
    Quit,
}

#[derive(Debug, Error, PartialEq)]
pub enum ParseError {
    #[error("empty command")]
    Empty,
    #[error("unknown command '{0}' (try 'help')")]
    UnknownCommand(String),
    #[error("'{command}' needs {what}")]
    MissingArgument { command: String, what: &'static str },
    #[error("unknown deck '{0}' (use a or b)")]
    UnknownDeck(String),
    #[error("'{0}' is not a number")]
    InvalidNumber(String),
    #[error("'{0}' is not on or off")]
    InvalidToggle(String),
}

/// Parse one input line
pub fn parse(line: &str) -> Result<Command, ParseError> {
    let line = line.trim();
    let mut words = line.split_whitespace();
    let name = words.next().ok_or(ParseError::Empty)?.to_ascii_lowercase();

    let missing = |what: &'static str| ParseError::MissingArgument {
        command: name.clone(),
        what,
    };

    match name.as_str() {
        "status" | "st" => return Ok(Command::Status),
        "help" | "?" => return Ok(Command::Help),
        "quit" | "exit" | "q" => return Ok(Command::Quit),
        _ => {}
    }

    let deck = parse_deck(words.next().ok_or_else(|| missing("a deck"))?)?;

    let command = match name.as_str() {
        "play" => Command::Play(deck),
        "stop" => Command::Stop(deck),
        "load" => {
            // The rest of the line is the path, so names with spaces work
            let path = line
                .splitn(3, char::is_whitespace)
                .nth(2)
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .ok_or_else(|| missing("a path"))?;
            Command::Load {
                deck,
                path: PathBuf::from(path),
            }
        }
        "loop" => {
            let toggle = words.next().ok_or_else(|| missing("on or off"))?;
            Command::Loop(deck, parse_toggle(toggle)?)
        }
        "gain" | "speed" | "room" | "damp" | "seek" | "pos" => {
            let value = words.next().ok_or_else(|| missing("a value"))?;
            let value: f64 = value
                .parse()
                .map_err(|_| ParseError::InvalidNumber(value.to_string()))?;
            match name.as_str() {
                "gain" => Command::Gain(deck, value),
                "speed" => Command::Speed(deck, value),
                "room" => Command::Room(deck, value),
                "damp" => Command::Damp(deck, value),
                "seek" => Command::Seek(deck, value),
                _ => Command::Pos(deck, value),
            }
        }
        _ => return Err(ParseError::UnknownCommand(name.clone())),
    };

    Ok(command)
}

fn parse_deck(word: &str) -> Result<DeckId, ParseError> {
    match word.to_ascii_lowercase().as_str() {
        "a" | "1" => Ok(DeckId::A),
        "b" | "2" => Ok(DeckId::B),
        _ => Err(ParseError::UnknownDeck(word.to_string())),
    }
}

fn parse_toggle(word: &str) -> Result<bool, ParseError> {
    match word.to_ascii_lowercase().as_str() {
        "on" | "true" | "1" | "yes" => Ok(true),
        "off" | "false" | "0" | "no" => Ok(false),
        _ => Err(ParseError::InvalidToggle(word.to_string())),
    }
}

/// Run a deck command against the controller
///
/// Returns the text to print, if any. `Quit` is left to the caller.
pub fn execute(controller: &mut EngineController, command: Command) -> Result<Option<String>> {
    let message = match command {
        Command::Load { deck, path } => {
            let mut deck = controller.try_deck(deck)?;
            deck.load(&path)?;
            Some(format!(
                "{}: loaded {} ({})",
                deck.id(),
                path.display(),
                format_duration(deck.audio_length())
            ))
        }
        Command::Play(deck) => {
            controller.try_deck(deck)?.start()?;
            None
        }
        Command::Stop(deck) => {
            controller.try_deck(deck)?.stop()?;
            None
        }
        Command::Gain(deck, value) => {
            controller.try_deck(deck)?.set_gain(value)?;
            None
        }
        Command::Speed(deck, value) => {
            controller.try_deck(deck)?.set_speed(value)?;
            None
        }
        Command::Room(deck, value) => {
            controller.try_deck(deck)?.set_room_size(value)?;
            None
        }
        Command::Damp(deck, value) => {
            controller.try_deck(deck)?.set_damping(value)?;
            None
        }
        Command::Loop(deck, looping) => {
            controller.try_deck(deck)?.set_looping(looping)?;
            None
        }
        Command::Seek(deck, fraction) => {
            controller.try_deck(deck)?.set_position_relative(fraction)?;
            None
        }
        Command::Pos(deck, seconds) => {
            controller.try_deck(deck)?.set_position(seconds)?;
            None
        }
        Command::Status => Some(status(controller)),
        Command::Help => Some(HELP.to_string()),
        Command::Quit => None,
    };
    Ok(message)
}

/// One line per deck with clock and settings
pub fn status(controller: &mut EngineController) -> String {
    (0..controller.deck_count())
        .filter_map(|i| controller.deck(DeckId(i)).map(|deck| deck_line(&deck)))
        .collect::<Vec<_>>()
        .join("\n")
}

fn deck_line(deck: &DeckController<'_>) -> String {
    let snapshot = deck.snapshot();
    let settings = deck.settings();
    format!(
        "{}  {} / {}  {:<7}  gain {:.2}  speed {:.2}  room {:.2}  damp {:.2}  loop {}",
        deck.id(),
        format_duration(snapshot.position_seconds),
        format_duration(snapshot.length_seconds),
        if snapshot.is_playing { "playing" } else { "stopped" },
        settings.gain,
        settings.speed,
        settings.room_size,
        settings.damping,
        if settings.looping { "on" } else { "off" },
    )
}
