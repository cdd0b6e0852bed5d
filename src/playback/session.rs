use crate::audio::StreamPosition;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Playing,
    Paused,
}

/// The one playback session; only the controller mutates it
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackSession {
    pub song_index: Option<usize>,
    pub state: PlaybackState,
    /// Where the last pause left off
    pub resume_frame: u64,
    /// Start frame for the next play cycle
    pub last_confirmed_frame: u64,
    /// Sample rate of the stream that reported `last_confirmed_frame`
    pub frame_rate: Option<u32>,
}

impl PlaybackSession {
    pub fn new() -> Self {
        Self {
            song_index: None,
            state: PlaybackState::Idle,
            resume_frame: 0,
            last_confirmed_frame: 0,
            frame_rate: None,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }

    pub fn record_position(&mut self, position: StreamPosition) {
        self.resume_frame = position.frame;
        self.last_confirmed_frame = position.frame;
        self.frame_rate = Some(position.sample_rate);
    }

    pub fn rewind(&mut self) {
        self.resume_frame = 0;
        self.last_confirmed_frame = 0;
    }

    /// Song time the next play cycle starts at
    pub fn resume_offset_seconds(&self) -> f64 {
        match self.frame_rate {
            Some(rate) if self.last_confirmed_frame > 0 => StreamPosition {
                frame: self.last_confirmed_frame,
                sample_rate: rate,
            }
            .seconds(),
            _ => 0.0,
        }
    }
}

impl Default for PlaybackSession {
    fn default() -> Self {
        Self::new()
    }
}
