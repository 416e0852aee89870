//! Recovery of a JSON object embedded in a binary container (CAR) payload.

use log::debug;
use serde_json::Value;

/// Markers that usually open the measurement object, tried before a bare `{`
const START_MARKERS: [&str; 2] = ["{\"location\"", "{\"wifiName\""];

/// Scanner state while walking the candidate object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    Normal,
    InString,
    /// Inside a string, right after a backslash
    Escaped,
}

impl ScanState {
    /// Advance over one character, adjusting `depth` for braces outside strings
    pub fn step(self, c: char, depth: &mut usize) -> ScanState {
        match self {
            ScanState::Escaped => ScanState::InString,
            ScanState::InString => match c {
                '\\' => ScanState::Escaped,
                '"' => ScanState::Normal,
                _ => ScanState::InString,
            },
            ScanState::Normal => {
                match c {
                    '"' => return ScanState::InString,
                    '{' => *depth += 1,
                    '}' => *depth = depth.saturating_sub(1),
                    _ => {}
                }
                ScanState::Normal
            }
        }
    }
}

/// Byte offset of the most likely object start in `text`
fn find_object_start(text: &str) -> Option<usize> {
    START_MARKERS
        .iter()
        .find_map(|marker| text.find(marker))
        .or_else(|| text.find('{'))
}

/// Byte range `[start, end)` of the balanced object beginning at `start`
pub fn balanced_object_end(text: &str, start: usize) -> Option<usize> {
    let mut state = ScanState::Normal;
    let mut depth = 0usize;

    for (offset, c) in text[start..].char_indices() {
        let was_open = depth > 0;
        state = state.step(c, &mut depth);
        if was_open && depth == 0 && state == ScanState::Normal && c == '}' {
            return Some(start + offset + c.len_utf8());
        }
    }
    None
}

/// Extract the first JSON object embedded in `buffer`.
///
/// The buffer is decoded as lossy UTF-8. Returns `None` when no balanced
/// object is present or the slice is not valid JSON; callers treat that as
/// "no payload from this source".
pub fn extract_json(buffer: &[u8]) -> Option<Value> {
    let text = String::from_utf8_lossy(buffer);
    let start = find_object_start(&text)?;
    let end = balanced_object_end(&text, start)?;

    match serde_json::from_str(&text[start..end]) {
        Ok(value) => Some(value),
        Err(e) => {
            debug!("Embedded object at {}..{} is not valid JSON: {}", start, end, e);
            None
        }
    }
}
