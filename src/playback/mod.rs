// Playback orchestration
// One session, driven by board commands, running an audio and a lyric worker per play cycle

pub mod cancel;
pub mod controller;
pub mod session;
pub mod worker;

pub use cancel::CancelToken;
pub use controller::{PlaybackController, ValidationError};
pub use session::{PlaybackSession, PlaybackState};
