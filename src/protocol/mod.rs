// Controller board protocol
// Inbound command parsing/dedup and outbound lyric messages

pub mod command;
pub mod ingest;

pub use command::{parse_command, Command, ParseError, PlaybackCommand, VolumeCommand};
pub use ingest::CommandIngest;

/// Separator the board's display treats as a line break
pub const LINE_SEPARATOR: char = '|';

/// Outbound lyric message for already sanitized display text
pub fn lyric_message(text: &str) -> String {
    format!("L:{}", text)
}
