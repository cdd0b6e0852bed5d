use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use walkdir::WalkDir;

/// List of supported audio file extensions
const SUPPORTED_EXTENSIONS: &[&str] = &[
    "mp3", "flac", "ogg", "wav", "m4a", "aac",
];

/// One playable song; `index` is what the board sends as `S:<n>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Song {
    pub index: usize,
    pub file_name: String,
    pub path: PathBuf,
}

impl Song {
    /// File name without extension, also the lyric file's base name
    pub fn stem(&self) -> &str {
        Path::new(&self.file_name)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(&self.file_name)
    }
}

fn song_name_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"^(\d+)_.+\.([A-Za-z0-9]+)$").unwrap())
}

/// Scanner for the flat song directory
pub struct DirectoryScanner;

impl DirectoryScanner {
    /// List `<number>_<name>.<ext>` audio files, ordered by their number
    pub fn scan<P: AsRef<Path>>(directory: P) -> Result<Vec<Song>, anyhow::Error> {
        let directory = directory.as_ref();
        if !directory.is_dir() {
            anyhow::bail!("song directory {} does not exist", directory.display());
        }

        let mut found: Vec<(u64, String, PathBuf)> = Vec::new();

        for entry in WalkDir::new(directory)
            .min_depth(1)
            .max_depth(1)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();

            // Skip directories
            if !path.is_file() {
                continue;
            }

            let file_name = entry.file_name().to_string_lossy().to_string();
            let Some(caps) = song_name_regex().captures(&file_name) else {
                tracing::warn!(file = %file_name, "skipping file without a numeric prefix");
                continue;
            };

            let ext = caps[2].to_lowercase();
            if !SUPPORTED_EXTENSIONS.contains(&ext.as_str()) {
                continue;
            }

            let Ok(number) = caps[1].parse::<u64>() else {
                tracing::warn!(file = %file_name, "song number out of range, skipping");
                continue;
            };

            found.push((number, file_name, path.to_path_buf()));
        }

        found.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));

        Ok(found
            .into_iter()
            .enumerate()
            .map(|(index, (_, file_name, path))| Song {
                index,
                file_name,
                path,
            })
            .collect())
    }
}
