//! Control markers embedded in chat text.
//!
//! Two kinds of marker travel inside otherwise free text:
//!
//! - the remember flag, `[[remember]]` (synonyms `{{remember}}` and
//!   `<<remember>>`), matched case-insensitively;
//! - the memory-request directive, `<<memory_request: NAME>>`.
//!
//! [`parse`] recognizes both in one scan and returns the text with every
//! marker removed plus what was found.

use regex::Regex;
use std::sync::LazyLock;

static MARKERS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\[\[\s*remember\s*\]\]|\{\{\s*remember\s*\}\}|<<\s*remember\s*>>|<<\s*memory_request\s*:\s*(.*?)\s*>>",
    )
    .unwrap()
});

/// Result of scanning a piece of text for markers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedText {
    /// Input with all markers removed and edges trimmed.
    pub cleaned: String,
    /// `true` if any remember marker was present.
    pub remember: bool,
    /// Trimmed names from memory-request directives, in order of appearance.
    pub memory_requests: Vec<String>,
}

/// Scan `text` for markers.
///
/// Only marker text is removed; everything between markers is kept verbatim.
/// Removal is repeated until no marker remains, so a marker assembled from the
/// pieces around a removed one is removed too.
pub fn parse(text: &str) -> ParsedText {
    let mut remember = false;
    let mut memory_requests = Vec::new();
    let mut current = text.to_string();

    loop {
        let mut cleaned = String::with_capacity(current.len());
        let mut last = 0;
        let mut found = false;

        for caps in MARKERS.captures_iter(&current) {
            let Some(whole) = caps.get(0) else { continue };
            found = true;
            cleaned.push_str(&current[last..whole.start()]);
            last = whole.end();

            match caps.get(1) {
                Some(name) => {
                    let name = name.as_str().trim();
                    if !name.is_empty() {
                        memory_requests.push(name.to_string());
                    }
                }
                None => remember = true,
            }
        }

        if !found {
            break;
        }
        cleaned.push_str(&current[last..]);
        current = cleaned;
    }

    ParsedText {
        cleaned: current.trim().to_string(),
        remember,
        memory_requests,
    }
}

/// `true` if `text` contains any remember marker or memory-request directive.
pub fn has_marker(text: &str) -> bool {
    MARKERS.is_match(text)
}
