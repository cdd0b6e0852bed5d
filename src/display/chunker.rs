// Splitting lyric text into screenfuls for the board's character display

use crate::protocol::LINE_SEPARATOR;

/// One screenful: physical lines joined by `|`, plus the words it accounts for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub text: String,
    pub word_count: usize,
}

/// Greedy word packing.
///
/// Lengths are in characters. Every packed word carries a trailing space, so a
/// word fits while `line_chars + word_chars + 1 <= max_line_length`. A word that does not fit
/// closes the current line and opens the next one; it is counted before the
/// screen is checked for fullness, so it is credited to the screen being closed.
/// A word longer than a whole line still closes the (possibly empty) current line.
pub fn split_lyric(text: &str, max_line_length: usize, max_display_lines: usize) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut current_chars = 0;
    let mut word_count = 0;

    for word in text.split_whitespace() {
        let word_chars = word.chars().count();
        if current_chars + word_chars + 1 <= max_line_length {
            current.push_str(word);
            current.push(' ');
            current_chars += word_chars + 1;
            word_count += 1;
        } else {
            lines.push(current.trim().to_string());
            current = format!("{} ", word);
            current_chars = word_chars + 1;
            word_count += 1;

            if lines.len() == max_display_lines {
                chunks.push(Chunk {
                    text: join_lines(&lines),
                    word_count,
                });
                lines.clear();
                word_count = 0;
            }
        }
    }

    let tail = current.trim();
    if !tail.is_empty() {
        lines.push(tail.to_string());
    }

    if !lines.is_empty() {
        chunks.push(Chunk {
            text: join_lines(&lines),
            word_count,
        });
    }

    chunks
}

fn join_lines(lines: &[String]) -> String {
    lines.join(&LINE_SEPARATOR.to_string())
}

/// Printable ASCII only, always containing at least one separator
pub fn sanitize(text: &str) -> String {
    let mut clean: String = text.chars().filter(|c| (' '..='~').contains(c)).collect();
    if !clean.contains(LINE_SEPARATOR) {
        clean.push(LINE_SEPARATOR);
    }
    clean
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(text: &str, word_count: usize) -> Chunk {
        Chunk {
            text: text.to_string(),
            word_count,
        }
    }

    #[test]
    fn test_alphabet_split() {
        // "a".."h" fill the first line exactly (8 words, 16 chars with spaces);
        // "q" overflows the second line and is credited to the first screen
        assert_eq!(
            split_lyric("a b c d e f g h i j k l m n o p q", 16, 2),
            vec![chunk("a b c d e f g h|i j k l m n o p", 17), chunk("q", 0)]
        );
    }

    #[test]
    fn test_short_line_single_chunk() {
        assert_eq!(split_lyric("Hello world", 16, 2), vec![chunk("Hello world", 2)]);
    }

    #[test]
    fn test_two_lines_one_screen() {
        assert_eq!(
            split_lyric("never gonna give you up", 16, 2),
            vec![chunk("never gonna|give you up", 5)]
        );
    }

    #[test]
    fn test_exact_fit_boundary() {
        // "abcdefghijklmno" is 15 chars: 15 + 1 <= 16 fits, 16 chars would not
        assert_eq!(split_lyric("abcdefghijklmno", 16, 2), vec![chunk("abcdefghijklmno", 1)]);
        assert_eq!(
            split_lyric("abcdefghijklmnop", 16, 2),
            vec![chunk("|abcdefghijklmnop", 1)]
        );
    }

    #[test]
    fn test_widths_count_characters_not_bytes() {
        // 9 characters but 16 bytes
        assert_eq!(
            split_lyric("\u{e9}\u{e9}\u{e9}\u{e9}\u{e9}\u{e9}\u{e9} x", 16, 2),
            vec![chunk("\u{e9}\u{e9}\u{e9}\u{e9}\u{e9}\u{e9}\u{e9} x", 2)]
        );
        // 15 wide characters fill a 16-wide line with the trailing space
        let wide = "\u{3042}".repeat(15);
        assert_eq!(split_lyric(&format!("{} x", wide), 16, 2), vec![chunk(&format!("{}|x", wide), 2)]);
    }

    #[test]
    fn test_single_line_display() {
        assert_eq!(
            split_lyric("one two three four", 8, 1),
            vec![chunk("one two", 3), chunk("three", 1), chunk("four", 0)]
        );
    }

    #[test]
    fn test_empty_text() {
        assert!(split_lyric("", 16, 2).is_empty());
        assert!(split_lyric("   \t ", 16, 2).is_empty());
    }

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize("Hello|world"), "Hello|world");
        assert_eq!(sanitize("Hello"), "Hello|");
        assert_eq!(sanitize("Caf\u{e9} na\u{ef}ve"), "Caf nave|");
        assert_eq!(sanitize("tab\there\r"), "tabhere|");
        assert_eq!(sanitize(""), "|");
    }
}
