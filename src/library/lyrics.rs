/// Timestamped lyric files: one `[MM:SS.mmm] text` entry per line

use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

#[derive(Debug, Clone, PartialEq)]
pub struct LyricLine {
    pub timestamp_seconds: f64,
    pub text: String,
}

fn timestamp_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"^\[(\d+):(\d+(?:\.\d*)?)\](.*)$").unwrap())
}

/// Parse lyric file contents, ordered by timestamp.
///
/// Lines without a leading timestamp are ignored. The sort is stable, so lines
/// sharing a timestamp keep their file order.
pub fn parse_lyrics(contents: &str) -> Vec<LyricLine> {
    let mut lines: Vec<LyricLine> = contents
        .lines()
        .filter_map(|raw| {
            let raw = raw.trim_start_matches('\u{feff}').trim();
            let caps = timestamp_regex().captures(raw)?;
            let minutes: f64 = caps[1].parse().ok()?;
            let seconds: f64 = caps[2].parse().ok()?;
            let timestamp_seconds = minutes * 60.0 + seconds;
            if !timestamp_seconds.is_finite() {
                tracing::warn!(line = raw, "ignoring lyric with out of range timestamp");
                return None;
            }
            Some(LyricLine {
                timestamp_seconds,
                text: caps[3].trim().to_string(),
            })
        })
        .collect();

    lines.sort_by(|a, b| a.timestamp_seconds.total_cmp(&b.timestamp_seconds));
    lines
}

/// Load a lyric file. A missing or unreadable file means the song plays without lyrics.
pub fn load_lyrics(path: &Path) -> Vec<LyricLine> {
    match std::fs::read(path) {
        Ok(bytes) => parse_lyrics(&String::from_utf8_lossy(&bytes)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::info!(path = %path.display(), "no lyrics file, playing audio only");
            Vec::new()
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), "failed to read lyrics: {}", e);
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_sort() {
        let lyrics = parse_lyrics(
            "[00:12.500] Second line\n\
             [00:01.250]First line\n\
             not a lyric\n\
             [01:02.000] Third line  \n",
        );
        assert_eq!(
            lyrics,
            vec![
                LyricLine { timestamp_seconds: 1.25, text: "First line".to_string() },
                LyricLine { timestamp_seconds: 12.5, text: "Second line".to_string() },
                LyricLine { timestamp_seconds: 62.0, text: "Third line".to_string() },
            ]
        );
    }

    #[test]
    fn test_equal_timestamps_keep_file_order() {
        let lyrics = parse_lyrics("[00:05.00] b\n[00:05.00] a\n[00:01] c\n");
        let texts: Vec<&str> = lyrics.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["c", "b", "a"]);
    }

    #[test]
    fn test_malformed_timestamps_skipped() {
        let lyrics = parse_lyrics("[aa:05.00] x\n[00-05] y\n[] z\n\u{feff}[00:02.0] ok\n");
        assert_eq!(lyrics.len(), 1);
        assert_eq!(lyrics[0].text, "ok");
    }

    #[test]
    fn test_overflowing_timestamp_skipped() {
        let minutes = "9".repeat(400);
        let lyrics = parse_lyrics(&format!("[{}:00.00] overflow\n[00:03.00] ok\n", minutes));
        assert_eq!(
            lyrics,
            vec![LyricLine { timestamp_seconds: 3.0, text: "ok".to_string() }]
        );
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_lyrics(&dir.path().join("missing.txt")).is_empty());
    }
}
