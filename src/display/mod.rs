// Lyric display on the controller board

pub mod chunker;
pub mod worker;

pub use chunker::{sanitize, split_lyric, Chunk};
pub use worker::{LyricProgress, LyricWorker};
