// Song library
// Songs are enumerated once at startup; lyrics are read on demand per play

pub mod lyrics;
pub mod scanner;

pub use lyrics::{load_lyrics, parse_lyrics, LyricLine};
pub use scanner::{DirectoryScanner, Song};

use std::path::PathBuf;

use crate::settings::LibrarySettings;

pub struct Library {
    songs: Vec<Song>,
    lyric_dir: PathBuf,
}

impl Library {
    pub fn new(songs: Vec<Song>, lyric_dir: PathBuf) -> Self {
        Self { songs, lyric_dir }
    }

    pub fn scan(settings: &LibrarySettings) -> Result<Self, anyhow::Error> {
        let songs = DirectoryScanner::scan(&settings.song_dir)?;
        tracing::info!(count = songs.len(), dir = %settings.song_dir.display(), "found songs");
        Ok(Self::new(songs, settings.lyric_dir.clone()))
    }

    pub fn len(&self) -> usize {
        self.songs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.songs.is_empty()
    }

    pub fn songs(&self) -> &[Song] {
        &self.songs
    }

    /// Look up a song by the index the board sent; negative or past-the-end is `None`
    pub fn song(&self, index: i64) -> Option<&Song> {
        usize::try_from(index).ok().and_then(|i| self.songs.get(i))
    }

    pub fn lyrics_for(&self, song: &Song) -> Vec<LyricLine> {
        load_lyrics(&self.lyric_dir.join(format!("{}.txt", song.stem())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_lookup_and_lyrics() {
        let dir = tempfile::tempdir().unwrap();
        let songs_dir = dir.path().join("audio");
        let lyrics_dir = dir.path().join("lyrics");
        fs::create_dir_all(&songs_dir).unwrap();
        fs::create_dir_all(&lyrics_dir).unwrap();
        fs::write(songs_dir.join("1_hello.wav"), b"").unwrap();
        fs::write(songs_dir.join("2_quiet.wav"), b"").unwrap();
        fs::write(lyrics_dir.join("1_hello.txt"), "[00:01.000] Hello there\n").unwrap();

        let library = Library::scan(&LibrarySettings {
            song_dir: songs_dir,
            lyric_dir: lyrics_dir,
        })
        .unwrap();

        assert_eq!(library.len(), 2);
        assert!(library.song(-1).is_none());
        assert!(library.song(2).is_none());

        let hello = library.song(0).unwrap();
        assert_eq!(library.lyrics_for(hello)[0].text, "Hello there");

        let quiet = library.song(1).unwrap();
        assert!(library.lyrics_for(quiet).is_empty());
    }
}
