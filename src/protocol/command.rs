/// Inbound line protocol from the controller board
///
/// `P:<0|1> S:<n> R:<0|1>` carries the play flag, song index and reset flag.
/// `V:<n>` carries the requested master volume in percent.

use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;

/// A playback (PSR) command as sent by the board
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackCommand {
    pub playing: bool,
    pub song_index: i64,
    pub reset: bool,
}

/// A volume command; `percent` is the raw value, see [`VolumeCommand::level`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VolumeCommand {
    pub percent: i64,
}

impl VolumeCommand {
    /// Requested level clamped to 0..=100
    pub fn level(&self) -> u8 {
        self.percent.clamp(0, 100) as u8
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Playback(PlaybackCommand),
    Volume(VolumeCommand),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("unrecognized line: {0:?}")]
    Unrecognized(String),
    #[error("malformed {field} value: {value:?}")]
    BadNumber { field: &'static str, value: String },
    #[error("{field} flag must be 0 or 1, got {value}")]
    BadFlag { field: &'static str, value: String },
}

fn volume_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"^V:\s*([+-]?\d+)$").unwrap())
}

fn playback_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"^P:(\d+)\s+S:([+-]?\d+)\s+R:(\d+)$").unwrap()
    })
}

fn parse_number(field: &'static str, value: &str) -> Result<i64, ParseError> {
    value.parse::<i64>().map_err(|_| ParseError::BadNumber {
        field,
        value: value.to_string(),
    })
}

fn parse_flag(field: &'static str, value: &str) -> Result<bool, ParseError> {
    match value {
        "0" => Ok(false),
        "1" => Ok(true),
        _ => Err(ParseError::BadFlag {
            field,
            value: value.to_string(),
        }),
    }
}

/// Parse one inbound line (surrounding whitespace is ignored)
pub fn parse_command(line: &str) -> Result<Command, ParseError> {
    let line = line.trim();

    if let Some(caps) = volume_regex().captures(line) {
        let percent = parse_number("volume", &caps[1])?;
        return Ok(Command::Volume(VolumeCommand { percent }));
    }

    if let Some(caps) = playback_regex().captures(line) {
        return Ok(Command::Playback(PlaybackCommand {
            playing: parse_flag("play", &caps[1])?,
            song_index: parse_number("song", &caps[2])?,
            reset: parse_flag("reset", &caps[3])?,
        }));
    }

    Err(ParseError::Unrecognized(line.to_string()))
}
