// src/normalize.rs

//! License text normalization
//!
//! Every candidate text passes through [`normalize`] before it is accepted,
//! so texts from different sources that differ only in line endings, stray
//! BOMs or indentation group together in the notices file.

/// Line terminator used in normalized output
pub const LINE_ENDING: &str = "\r\n";

/// Form feed, byte-order mark, zero-width space
const STRIPPED_CHARS: [char; 3] = ['\u{000C}', '\u{FEFF}', '\u{200B}'];

/// Canonicalize raw license text
///
/// Returns `None` for empty or whitespace-only input. Idempotent.
pub fn normalize(raw: &str) -> Option<String> {
    // Strip first: a BOM in front of a blank line must not shield it from the trim
    let stripped: String = raw.chars().filter(|c| !STRIPPED_CHARS.contains(c)).collect();
    if stripped.trim().is_empty() {
        return None;
    }

    let unified = stripped.replace("\r\n", "\n").replace('\r', "\n");
    let lines: Vec<&str> = unified.split('\n').collect();

    let first = lines.iter().position(|l| !is_blank(l))?;
    let last = lines.iter().rposition(|l| !is_blank(l))?;
    let body = &lines[first..=last];

    let indent = body
        .iter()
        .filter(|l| !is_blank(l))
        .map(|l| leading_spaces(l))
        .min()
        .unwrap_or(0);

    let dedented: Vec<&str> = body
        .iter()
        .map(|l| if is_blank(l) { l } else { &l[indent..] })
        .collect();

    Some(dedented.join(LINE_ENDING))
}

fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

fn leading_spaces(line: &str) -> usize {
    line.len() - line.trim_start_matches(' ').len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_and_whitespace() {
        assert_eq!(normalize(""), None);
        assert_eq!(normalize("   \r\n\t\n"), None);
        assert_eq!(normalize("\u{FEFF}\u{000C}\n"), None);
    }

    #[test]
    fn test_line_endings_unified() {
        assert_eq!(normalize("a\nb\rc\r\nd").unwrap(), "a\r\nb\r\nc\r\nd");
    }

    #[test]
    fn test_blank_lines_trimmed() {
        assert_eq!(normalize("\n\n  \nMIT License\n\n").unwrap(), "MIT License");
    }

    #[test]
    fn test_control_characters_stripped() {
        assert_eq!(
            normalize("\u{FEFF}Copyright\u{200B} (c)\u{000C}\n").unwrap(),
            "Copyright (c)"
        );
    }

    #[test]
    fn test_uniform_dedent() {
        let raw = "    The MIT License\n\n      Permission is hereby granted\n    THE SOFTWARE";
        assert_eq!(
            normalize(raw).unwrap(),
            "The MIT License\r\n\r\n  Permission is hereby granted\r\nTHE SOFTWARE"
        );
    }

    #[test]
    fn test_blank_lines_untouched_by_dedent() {
        let raw = "  a\n \n  b";
        assert_eq!(normalize(raw).unwrap(), "a\r\n \r\nb");
    }

    #[test]
    fn test_tabs_are_not_dedented() {
        assert_eq!(normalize("\tindented\n  two").unwrap(), "\tindented\r\n  two");
    }

    #[test]
    fn test_idempotent() {
        let samples = [
            "\u{FEFF}\n   Apache License\r\n     Version 2.0\r\r\n\n   END\n\n",
            "\r\n\u{200B}\n  x\n\u{000C}  y\r",
            "plain",
            "  \n  lead\n\ttab\n   ",
        ];
        for raw in samples {
            let once = normalize(raw).unwrap();
            assert_eq!(normalize(&once).unwrap(), once, "not idempotent for {raw:?}");
        }
    }
}
