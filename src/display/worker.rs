// Lyric worker: sends lyric chunks to the board in time with playback

use std::time::{Duration, Instant};
use tracing::{debug, warn};

use super::chunker::{sanitize, split_lyric};
use crate::library::LyricLine;
use crate::playback::cancel::CancelToken;
use crate::protocol::lyric_message;
use crate::settings::{DisplaySettings, TimingSettings};
use crate::transport::LineWriter;

/// What a lyric run got through before it stopped
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LyricProgress {
    pub lines_shown: usize,
    pub chunks_sent: usize,
}

pub struct LyricWorker {
    lyrics: Vec<LyricLine>,
    start_offset: f64,
    display: LineWriter,
    layout: DisplaySettings,
    timing: TimingSettings,
    cancel: CancelToken,
}

impl LyricWorker {
    /// `start_offset` is the song position (seconds) playback resumes from
    pub fn new(
        lyrics: Vec<LyricLine>,
        start_offset: f64,
        display: LineWriter,
        layout: DisplaySettings,
        timing: TimingSettings,
        cancel: CancelToken,
    ) -> Self {
        Self {
            lyrics,
            start_offset,
            display,
            layout,
            timing,
            cancel,
        }
    }

    pub fn run(self) -> LyricProgress {
        let started = Instant::now();
        let poll = self.timing.poll_interval();
        let mut progress = LyricProgress::default();

        let first = self
            .lyrics
            .iter()
            .position(|line| line.timestamp_seconds >= self.start_offset)
            .unwrap_or(self.lyrics.len());

        debug!(first, offset = self.start_offset, "lyric worker starting");

        'lines: for line in &self.lyrics[first..] {
            let deadline = Duration::try_from_secs_f64(line.timestamp_seconds - self.start_offset)
                .ok()
                .and_then(|due| started.checked_add(due));
            let Some(deadline) = deadline else {
                warn!(timestamp = line.timestamp_seconds, "skipping lyric with unusable timestamp");
                continue;
            };
            if !self.cancel.sleep_until(deadline, poll) {
                break;
            }

            for chunk in split_lyric(&line.text, self.layout.max_line_length, self.layout.max_display_lines) {
                if self.cancel.is_cancelled() {
                    break 'lines;
                }

                let text = sanitize(&chunk.text);
                match self.display.write_line(&lyric_message(&text)) {
                    Ok(()) => {
                        progress.chunks_sent += 1;
                        debug!(lyric = %text, "sent lyric");
                    }
                    Err(e) => warn!("failed to send lyric: {}", e),
                }

                if !self.cancel.sleep_for(self.timing.dwell(chunk.word_count), poll) {
                    break 'lines;
                }
            }

            progress.lines_shown += 1;
        }

        debug!(?progress, "lyric worker done");
        progress
    }
}
