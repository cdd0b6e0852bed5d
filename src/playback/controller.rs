// Playback controller: the session state machine and the workers it runs
//
// All session changes happen on the controller's thread. Commands arrive over
// one channel and the running audio worker's result over another, so a song
// ending on its own is handled between commands, never concurrently with one.

use crossbeam_channel::{never, select, Receiver};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::cancel::CancelToken;
use super::session::{PlaybackSession, PlaybackState};
use super::worker::WorkerHandle;
use crate::audio::{AudioBackend, AudioOutcome, AudioWorker};
use crate::display::{LyricProgress, LyricWorker};
use crate::library::{Library, Song};
use crate::protocol::{Command, PlaybackCommand, VolumeCommand};
use crate::settings::{DisplaySettings, TimingSettings};
use crate::transport::LineWriter;
use crate::volume::VolumeControl;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("song index {index} out of range (library has {count} songs)")]
    SongIndex { index: i64, count: usize },
}

/// The workers of one play cycle, sharing one cancel token
struct PlayCycle {
    cancel: CancelToken,
    audio: WorkerHandle<AudioOutcome>,
    lyrics: WorkerHandle<LyricProgress>,
}

pub struct PlaybackController {
    session: PlaybackSession,
    library: Library,
    backend: Arc<dyn AudioBackend>,
    display: LineWriter,
    volume: Option<Box<dyn VolumeControl>>,
    layout: DisplaySettings,
    timing: TimingSettings,
    cycle: Option<PlayCycle>,
}

impl PlaybackController {
    pub fn new(
        library: Library,
        backend: Arc<dyn AudioBackend>,
        display: LineWriter,
        volume: Option<Box<dyn VolumeControl>>,
        layout: DisplaySettings,
        timing: TimingSettings,
    ) -> Self {
        Self {
            session: PlaybackSession::new(),
            library,
            backend,
            display,
            volume,
            layout,
            timing,
            cycle: None,
        }
    }

    pub fn session(&self) -> &PlaybackSession {
        &self.session
    }

    /// Serve commands until the sender side is dropped
    pub fn run(mut self, commands: Receiver<Command>) {
        loop {
            let finished = self
                .cycle
                .as_ref()
                .map(|cycle| cycle.audio.done().clone())
                .unwrap_or_else(never);

            select! {
                recv(commands) -> command => match command {
                    Ok(command) => self.handle_command(command),
                    Err(_) => break,
                },
                recv(finished) -> outcome => self.on_audio_finished(outcome.ok()),
            }
        }

        info!("command stream closed, stopping playback");
        self.stop_cycle();
        self.session.state = PlaybackState::Idle;
    }

    pub fn handle_command(&mut self, command: Command) {
        match command {
            Command::Volume(volume) => self.apply_volume(volume),
            Command::Playback(playback) => self.apply_playback(playback),
        }
    }

    fn apply_volume(&self, command: VolumeCommand) {
        let level = command.level();
        let Some(volume) = &self.volume else {
            debug!(level, "no volume control, ignoring volume command");
            return;
        };
        match volume.set_level(level) {
            Ok(()) => info!("volume set to {}%", level),
            Err(e) => warn!("error setting volume: {}", e),
        }
    }

    fn apply_playback(&mut self, command: PlaybackCommand) {
        info!(
            playing = command.playing,
            song = command.song_index,
            reset = command.reset,
            "playback command"
        );

        if command.reset {
            self.reset();
        }

        let song = match self.validate(command.song_index) {
            Ok(song) => song.clone(),
            Err(e) => {
                warn!("ignoring command: {}", e);
                return;
            }
        };

        match (command.playing, self.session.is_playing()) {
            (true, false) => self.start(song),
            (false, true) => self.pause(),
            _ => debug!(state = ?self.session.state, "no transition"),
        }
    }

    fn validate(&self, index: i64) -> Result<&Song, ValidationError> {
        self.library.song(index).ok_or(ValidationError::SongIndex {
            index,
            count: self.library.len(),
        })
    }

    fn reset(&mut self) {
        self.stop_cycle();
        self.session.state = PlaybackState::Idle;
        self.session.rewind();
        info!("reset done, ready for new playback");
    }

    fn start(&mut self, song: Song) {
        let start_frame = self.session.last_confirmed_frame;
        let start_offset = self.session.resume_offset_seconds();
        info!(song = %song.file_name, frame = start_frame, offset = start_offset, "starting playback");

        let cancel = CancelToken::new();

        let audio = AudioWorker::new(self.backend.clone(), song.path.clone(), start_frame, cancel.clone());
        let audio = match WorkerHandle::spawn("audio", move || audio.run()) {
            Ok(handle) => handle,
            Err(e) => {
                error!("failed to start audio worker: {}", e);
                return;
            }
        };

        let lyrics = LyricWorker::new(
            self.library.lyrics_for(&song),
            start_offset,
            self.display.clone(),
            self.layout.clone(),
            self.timing.clone(),
            cancel.clone(),
        );
        let lyrics = match WorkerHandle::spawn("lyrics", move || lyrics.run()) {
            Ok(handle) => handle,
            Err(e) => {
                error!("failed to start lyric worker: {}", e);
                cancel.cancel();
                audio.join_timeout(self.timing.join_timeout());
                return;
            }
        };

        self.session.state = PlaybackState::Playing;
        self.session.song_index = Some(song.index);
        self.cycle = Some(PlayCycle { cancel, audio, lyrics });
    }

    fn pause(&mut self) {
        self.session.state = PlaybackState::Paused;

        let Some(cycle) = self.cycle.take() else {
            return;
        };
        cycle.cancel.cancel();
        let outcome = cycle.audio.join_timeout(self.timing.join_timeout());
        cycle.lyrics.join_timeout(self.timing.join_timeout());

        match outcome {
            Some(outcome) => self.apply_outcome(outcome),
            None => warn!(
                frame = self.session.last_confirmed_frame,
                "audio worker gave no position, keeping the previous one"
            ),
        }

        info!(
            state = ?self.session.state,
            frame = self.session.resume_frame,
            seconds = self.session.resume_offset_seconds(),
            "paused"
        );
    }

    /// The audio worker finished without being asked to
    fn on_audio_finished(&mut self, outcome: Option<AudioOutcome>) {
        let Some(cycle) = self.cycle.take() else {
            return;
        };
        cycle.cancel.cancel();
        cycle.lyrics.join_timeout(self.timing.join_timeout());
        cycle.audio.reap();

        match outcome {
            Some(outcome) => self.apply_outcome(outcome),
            None => {
                error!("audio worker exited without a result");
                self.session.state = PlaybackState::Idle;
            }
        }

        if self.session.is_playing() {
            self.session.state = PlaybackState::Paused;
        }
    }

    fn apply_outcome(&mut self, outcome: AudioOutcome) {
        match outcome {
            AudioOutcome::Stopped(position) => self.session.record_position(position),
            AudioOutcome::Ended => {
                info!("song ended");
                self.session.state = PlaybackState::Idle;
                self.session.rewind();
            }
            AudioOutcome::Failed { error, position } => {
                error!("playback failed: {}", error);
                self.session.state = PlaybackState::Idle;
                if let Some(position) = position {
                    self.session.record_position(position);
                }
            }
        }
    }

    /// Cancel and join the running workers; their results are discarded
    fn stop_cycle(&mut self) {
        if let Some(cycle) = self.cycle.take() {
            cycle.cancel.cancel();
            cycle.audio.join_timeout(self.timing.join_timeout());
            cycle.lyrics.join_timeout(self.timing.join_timeout());
        }
    }

    /// Block until the running audio worker finishes on its own
    #[cfg(test)]
    fn wait_for_audio(&mut self, timeout: std::time::Duration) -> bool {
        use crossbeam_channel::RecvTimeoutError;

        let Some(cycle) = &self.cycle else {
            return false;
        };
        let result = cycle.audio.done().recv_timeout(timeout);
        match result {
            Ok(outcome) => self.on_audio_finished(Some(outcome)),
            Err(RecvTimeoutError::Disconnected) => self.on_audio_finished(None),
            Err(RecvTimeoutError::Timeout) => return false,
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::fake::{FakeBackend, SAMPLE_RATE};
    use crate::protocol::CommandIngest;
    use crate::transport::{memory_writer, written_lines};
    use crate::volume::RecordingVolume;
    use parking_lot::Mutex;
    use std::fs;
    use std::path::PathBuf;
    use std::time::Duration;

    struct Fixture {
        controller: PlaybackController,
        backend: FakeBackend,
        sent: Arc<Mutex<Vec<u8>>>,
        levels: Arc<Mutex<Vec<u8>>>,
        _dir: tempfile::TempDir,
    }

    fn fixture(backend: FakeBackend) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("1_first.txt"),
            "[00:00.000] intro line\n[10:00.000] far away\n",
        )
        .unwrap();

        let songs = vec![
            Song {
                index: 0,
                file_name: "1_first.wav".to_string(),
                path: PathBuf::from("1_first.wav"),
            },
            Song {
                index: 1,
                file_name: "2_second.wav".to_string(),
                path: PathBuf::from("2_second.wav"),
            },
        ];

        let (display, sent) = memory_writer();
        let levels = Arc::new(Mutex::new(Vec::new()));
        let timing = TimingSettings {
            poll_interval_ms: 5,
            join_timeout_ms: 1000,
            min_dwell_ms: 10,
            word_dwell_ms: 2,
        };

        let controller = PlaybackController::new(
            Library::new(songs, dir.path().to_path_buf()),
            Arc::new(backend.clone()),
            display,
            Some(Box::new(RecordingVolume(levels.clone()))),
            DisplaySettings::default(),
            timing,
        );

        Fixture {
            controller,
            backend,
            sent,
            levels,
            _dir: dir,
        }
    }

    fn slow_backend() -> FakeBackend {
        FakeBackend::new(10_000_000, 100, Duration::from_millis(2))
    }

    fn play(playing: bool, song_index: i64, reset: bool) -> Command {
        Command::Playback(PlaybackCommand {
            playing,
            song_index,
            reset,
        })
    }

    fn settle() {
        std::thread::sleep(Duration::from_millis(60));
    }

    #[test]
    fn test_pause_resume_scenario() {
        let mut fx = fixture(slow_backend());
        let mut ingest = CommandIngest::new();

        for line in ["P:1 S:0 R:0", "P:1 S:0 R:0"] {
            if let Some(command) = ingest.accept(line) {
                fx.controller.handle_command(command);
            }
        }
        settle();
        assert_eq!(fx.controller.session().state, PlaybackState::Playing);
        assert_eq!(fx.backend.calls.lock().starts.len(), 1);

        let pause = ingest.accept("P:0 S:0 R:0").unwrap();
        fx.controller.handle_command(pause);
        let session = fx.controller.session().clone();
        assert_eq!(session.state, PlaybackState::Paused);
        assert!(session.resume_frame > 0);
        assert_eq!(session.resume_frame, session.last_confirmed_frame);
        assert_eq!(session.resume_frame, fx.backend.calls.lock().frames_written);
        assert_eq!(session.frame_rate, Some(SAMPLE_RATE));

        let resume = ingest.accept("P:1 S:0 R:0").unwrap();
        fx.controller.handle_command(resume);
        settle();
        assert_eq!(fx.controller.session().state, PlaybackState::Playing);
        assert_eq!(fx.backend.calls.lock().starts, vec![0, session.resume_frame]);

        fx.controller.handle_command(play(false, 0, true));
        assert_eq!(fx.controller.session().state, PlaybackState::Idle);

        // the intro is before the resume offset, so it was shown only once
        let intros = written_lines(&fx.sent)
            .iter()
            .filter(|l| l.as_str() == "L:intro line|")
            .count();
        assert_eq!(intros, 1);
    }

    #[test]
    fn test_play_while_playing_is_noop() {
        let mut fx = fixture(slow_backend());
        fx.controller.handle_command(play(true, 0, false));
        fx.controller.handle_command(play(true, 1, false));
        settle();
        assert_eq!(fx.controller.session().song_index, Some(0));
        assert_eq!(fx.backend.calls.lock().starts.len(), 1);
        fx.controller.handle_command(play(false, 0, true));
    }

    #[test]
    fn test_reset_from_every_state() {
        let mut fx = fixture(slow_backend());

        fx.controller.handle_command(play(false, 0, true));
        assert_eq!(fx.controller.session().state, PlaybackState::Idle);
        assert_eq!(fx.controller.session().resume_frame, 0);

        fx.controller.handle_command(play(true, 0, false));
        settle();
        fx.controller.handle_command(play(true, 0, true));
        // reset then start again from the top
        assert_eq!(fx.controller.session().state, PlaybackState::Playing);
        assert_eq!(fx.controller.session().last_confirmed_frame, 0);
        settle();

        fx.controller.handle_command(play(false, 0, false));
        assert_eq!(fx.controller.session().state, PlaybackState::Paused);
        assert!(fx.controller.session().resume_frame > 0);

        fx.controller.handle_command(play(false, 0, true));
        let session = fx.controller.session();
        assert_eq!(session.state, PlaybackState::Idle);
        assert_eq!(session.resume_frame, 0);
        assert_eq!(session.last_confirmed_frame, 0);
        assert!(fx.controller.cycle.is_none());
        assert_eq!(fx.backend.calls.lock().starts, vec![0, 0]);
    }

    #[test]
    fn test_reset_with_invalid_song_still_resets() {
        let mut fx = fixture(slow_backend());
        fx.controller.handle_command(play(true, 0, false));
        settle();
        fx.controller.handle_command(play(false, 0, false));
        assert!(fx.controller.session().resume_frame > 0);

        fx.controller.handle_command(play(true, 9, true));
        assert_eq!(fx.controller.session().state, PlaybackState::Idle);
        assert_eq!(fx.controller.session().resume_frame, 0);
        assert_eq!(fx.backend.calls.lock().starts.len(), 1);
    }

    #[test]
    fn test_out_of_range_song_ignored() {
        let mut fx = fixture(slow_backend());
        fx.controller.handle_command(play(true, 2, false));
        fx.controller.handle_command(play(true, -1, false));
        assert_eq!(fx.controller.session().state, PlaybackState::Idle);
        assert!(fx.controller.cycle.is_none());
        assert!(fx.backend.calls.lock().starts.is_empty());
    }

    #[test]
    fn test_natural_end_rewinds() {
        let mut fx = fixture(FakeBackend::new(500, 100, Duration::ZERO));
        fx.controller.handle_command(play(true, 0, false));
        assert!(fx.controller.wait_for_audio(Duration::from_secs(2)));

        let session = fx.controller.session();
        assert_eq!(session.state, PlaybackState::Idle);
        assert_eq!(session.resume_frame, 0);
        assert_eq!(session.last_confirmed_frame, 0);
        assert_eq!(session.song_index, Some(0));
        assert!(fx.controller.cycle.is_none());

        // a fresh play starts from the top
        fx.controller.handle_command(play(true, 0, false));
        assert!(fx.controller.wait_for_audio(Duration::from_secs(2)));
        assert_eq!(fx.backend.calls.lock().starts, vec![0, 0]);
    }

    #[test]
    fn test_audio_failure_goes_idle_and_keeps_position() {
        let mut backend = FakeBackend::new(10_000, 100, Duration::ZERO);
        backend.fail_at = Some(300);
        let mut fx = fixture(backend);

        fx.controller.handle_command(play(true, 0, false));
        assert!(fx.controller.wait_for_audio(Duration::from_secs(2)));

        let session = fx.controller.session();
        assert_eq!(session.state, PlaybackState::Idle);
        assert_eq!(session.last_confirmed_frame, 300);
    }

    #[test]
    fn test_volume_is_clamped() {
        let mut fx = fixture(slow_backend());
        for percent in [-5, 150, 57] {
            fx.controller.handle_command(Command::Volume(VolumeCommand { percent }));
        }
        assert_eq!(*fx.levels.lock(), vec![0, 100, 57]);
        assert_eq!(fx.controller.session().state, PlaybackState::Idle);
    }

    #[test]
    fn test_run_loop_handles_end_and_shutdown() {
        let backend = FakeBackend::new(300, 100, Duration::from_millis(1));
        let calls = backend.calls.clone();
        let (tx, rx) = crossbeam_channel::unbounded();

        // the controller stays on the thread it was built on
        let handle = std::thread::spawn(move || {
            let fx = fixture(backend);
            fx.controller.run(rx);
        });

        tx.send(play(true, 0, false)).unwrap();
        std::thread::sleep(Duration::from_millis(200));
        tx.send(play(true, 1, true)).unwrap();
        std::thread::sleep(Duration::from_millis(50));
        drop(tx);
        handle.join().unwrap();

        assert_eq!(calls.lock().starts, vec![0, 0]);
    }
}
