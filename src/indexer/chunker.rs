use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::InvalidChunking;

pub const DEFAULT_CHUNK_SIZE: usize = 1200;
pub const DEFAULT_CHUNK_OVERLAP: usize = 150;

static WHITESPACE_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

/// Collapses every whitespace run into a single space and trims both ends.
pub fn normalize_whitespace(text: &str) -> String {
    WHITESPACE_RUN.replace_all(text, " ").trim().to_string()
}

pub fn check_chunking(max_chars: usize, overlap: usize) -> Result<(), InvalidChunking> {
    if overlap >= max_chars {
        return Err(InvalidChunking { max_chars, overlap });
    }
    Ok(())
}

/// Splits `text` into windows of at most `max_chars` characters, each window
/// starting `max_chars - overlap` characters after the previous one.
///
/// Offsets are counted in chars so multibyte text is never cut inside a
/// character. Empty text yields no chunks.
pub fn split_text(
    text: &str,
    max_chars: usize,
    overlap: usize,
) -> Result<Vec<String>, InvalidChunking> {
    check_chunking(max_chars, overlap)?;

    // byte offset of every char position, plus the end of the string
    let offsets: Vec<usize> = text
        .char_indices()
        .map(|(pos, _)| pos)
        .chain(std::iter::once(text.len()))
        .collect();
    let total = offsets.len() - 1;

    let mut chunks = Vec::new();
    if total == 0 {
        return Ok(chunks);
    }

    let step = max_chars - overlap;
    let mut start = 0;
    loop {
        let end = (start + max_chars).min(total);
        chunks.push(text[offsets[start]..offsets[end]].to_string());
        if end == total {
            break;
        }
        start += step;
    }

    Ok(chunks)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reassemble(chunks: &[String], overlap: usize) -> String {
        let mut out = String::new();
        for (i, chunk) in chunks.iter().enumerate() {
            if i == 0 {
                out.push_str(chunk);
            } else {
                out.extend(chunk.chars().skip(overlap));
            }
        }
        out
    }

    #[test]
    fn test_short_text_single_chunk() {
        let chunks = split_text("short", 100, 10).unwrap();
        assert_eq!(chunks, vec!["short".to_string()]);
    }

    #[test]
    fn test_exact_length_single_chunk() {
        let text = "a".repeat(1200);
        let chunks = split_text(&text, 1200, 150).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0], text);
    }

    #[test]
    fn test_empty_text() {
        assert!(split_text("", 100, 10).unwrap().is_empty());
    }

    #[test]
    fn test_windows_advance_by_step() {
        let chunks = split_text("abcdefghij", 4, 1).unwrap();
        assert_eq!(chunks, vec!["abcd", "defg", "ghij"]);
    }

    #[test]
    fn test_reassembly_reconstructs_text() {
        let text = "Pour créer un ticket, ouvrez l'application DigiTickets puis \
                    appuyez sur « Nouveau ». Renseignez le titre, la priorité \
                    et la description avant de valider. Les tickets résolus \
                    restent consultables dans l'historique.";
        for (max_chars, overlap) in [(10, 0), (10, 3), (25, 24), (50, 7), (1200, 150)] {
            let chunks = split_text(text, max_chars, overlap).unwrap();
            assert_eq!(reassemble(&chunks, overlap), text, "max={max_chars} overlap={overlap}");
            for chunk in &chunks {
                assert!(!chunk.is_empty());
                assert!(chunk.chars().count() <= max_chars);
            }
        }
    }

    #[test]
    fn test_multibyte_text_is_split_on_chars() {
        let text = "これはテスト文章です。日本語のマルチバイト文字を含みます。";
        let chunks = split_text(text, 8, 2).unwrap();
        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.chars().count() <= 8));
        assert_eq!(reassemble(&chunks, 2), text);
    }

    #[test]
    fn test_overlap_not_smaller_than_size_is_rejected() {
        let err = split_text("anything", 10, 10).unwrap_err();
        assert_eq!(err.max_chars, 10);
        assert_eq!(err.overlap, 10);
        assert!(split_text("anything", 0, 0).is_err());
    }

    #[test]
    fn test_normalize_whitespace() {
        assert_eq!(
            normalize_whitespace("  Page 1\n\nDigiTickets\t guide \r\n "),
            "Page 1 DigiTickets guide"
        );
        assert_eq!(normalize_whitespace(" \n\t "), "");
    }
}
