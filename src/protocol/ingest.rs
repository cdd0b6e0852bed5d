// Command ingest: reads lines from the board, parses them and drops repeats
//
// The board re-sends its full state whenever anything changes (and on some
// firmware periodically), so identical consecutive PSR commands are expected.

use crossbeam_channel::Sender;
use std::io::Read;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::command::{parse_command, Command, PlaybackCommand};
use crate::transport::LineReader;

/// Back-off after a failed read so a dead port does not spin
const READ_ERROR_BACKOFF: Duration = Duration::from_millis(100);

pub struct CommandIngest {
    last_command: Option<PlaybackCommand>,
}

impl CommandIngest {
    pub fn new() -> Self {
        Self { last_command: None }
    }

    /// Parse and filter one raw line; `Some` means it should reach the controller
    pub fn accept(&mut self, line: &str) -> Option<Command> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        debug!(line, "received");

        match parse_command(line) {
            Ok(Command::Volume(volume)) => Some(Command::Volume(volume)),
            Ok(Command::Playback(command)) => {
                if self.last_command == Some(command) {
                    debug!(?command, "duplicate command, ignoring");
                    return None;
                }
                self.last_command = Some(command);
                Some(Command::Playback(command))
            }
            Err(e) => {
                warn!("discarding line: {}", e);
                None
            }
        }
    }

    /// Read until the transport closes or the controller goes away
    pub fn run<R: Read>(mut self, mut reader: LineReader<R>, commands: Sender<Command>) {
        info!("listening for controller commands");

        loop {
            let line = match reader.read_line() {
                Ok(Some(line)) => line,
                Ok(None) => {
                    info!("transport closed");
                    break;
                }
                Err(e) => {
                    warn!("transport read failed: {}", e);
                    std::thread::sleep(READ_ERROR_BACKOFF);
                    continue;
                }
            };

            if let Some(command) = self.accept(&line) {
                if commands.send(command).is_err() {
                    info!("controller stopped, ending ingest");
                    break;
                }
            }
        }
    }
}

impl Default for CommandIngest {
    fn default() -> Self {
        Self::new()
    }
}
