//! Chunk smoothing for streamed Markdown
//!
//! Providers split text at arbitrary points, so a delta may end in the middle
//! of `**bold**` or a `[link](url)`. The joiner holds such fragments back until
//! the construct closes, a newline arrives, or the buffer reaches its cap.
//! Concatenating everything it releases (plus [`MarkdownJoiner::flush`]) always
//! yields the input unchanged.

/// Default number of chars held back before a forced release
pub const DEFAULT_MAX_BUFFER: usize = 256;

#[derive(Debug, Clone)]
pub struct MarkdownJoiner {
    buffer: String,
    max_buffer: usize,
}

impl Default for MarkdownJoiner {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkdownJoiner {
    pub fn new() -> Self {
        Self::with_max_buffer(DEFAULT_MAX_BUFFER)
    }

    pub fn with_max_buffer(max_buffer: usize) -> Self {
        Self {
            buffer: String::new(),
            max_buffer: max_buffer.max(1),
        }
    }

    /// Feed one delta; returns the text that is safe to emit now
    pub fn push(&mut self, delta: &str) -> Option<String> {
        self.buffer.push_str(delta);

        let mut out = String::new();
        if let Some(pos) = self.buffer.rfind('\n') {
            out.extend(self.buffer.drain(..=pos));
        }

        if !is_open(&self.buffer) || self.buffer.chars().count() >= self.max_buffer {
            out.push_str(&std::mem::take(&mut self.buffer));
        }

        (!out.is_empty()).then_some(out)
    }

    /// Release whatever is still held back
    pub fn flush(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.buffer);
        (!rest.is_empty()).then_some(rest)
    }

    pub fn buffered(&self) -> &str {
        &self.buffer
    }
}

/// Whether `line` ends inside a Markdown construct
fn is_open(line: &str) -> bool {
    if line.is_empty() {
        return false;
    }

    let (double_star, single_star) = count_runs(line, '*');
    let (double_under, single_under) = count_runs(line, '_');
    if double_star % 2 == 1 || single_star % 2 == 1 {
        return true;
    }
    if double_under % 2 == 1 || single_under % 2 == 1 {
        return true;
    }
    if line.matches("~~").count() % 2 == 1 {
        return true;
    }
    if line.matches('`').count() % 2 == 1 {
        return true;
    }
    if open_link(line) {
        return true;
    }
    if line.ends_with(['*', '_', '~', '`', '[', '!', '\\']) {
        return true;
    }

    pending_line_marker(line)
}

/// Count `ch` runs as pairs (`**`) and leftovers (`*`)
fn count_runs(line: &str, ch: char) -> (usize, usize) {
    let mut doubles = 0;
    let mut singles = 0;
    let mut run = 0;
    for c in line.chars().chain(std::iter::once('\0')) {
        if c == ch {
            run += 1;
        } else if run > 0 {
            doubles += run / 2;
            singles += run % 2;
            run = 0;
        }
    }
    (doubles, singles)
}

/// `[label` without `]`, or `](url` without `)`
fn open_link(line: &str) -> bool {
    let last_open = line.rfind('[');
    let last_close = line.rfind(']');
    match (last_open, last_close) {
        (Some(_), None) => return true,
        (Some(open), Some(close)) if open > close => return true,
        _ => {}
    }

    match line.rfind("](") {
        Some(pos) => !line[pos..].contains(')'),
        None => false,
    }
}

/// A line that so far only holds a heading, list or quote marker
fn pending_line_marker(line: &str) -> bool {
    let trimmed = line.trim_start();
    !trimmed.is_empty()
        && trimmed.chars().count() <= 4
        && trimmed
            .chars()
            .all(|c| matches!(c, '#' | '-' | '+' | '>' | '.' | ' ') || c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn run(chunks: &[&str]) -> Vec<String> {
        let mut joiner = MarkdownJoiner::new();
        let mut out: Vec<String> = chunks.iter().filter_map(|c| joiner.push(c)).collect();
        out.extend(joiner.flush());
        out
    }

    #[test]
    fn test_plain_text_passes_through() {
        assert_eq!(run(&["Bonjour ", "le monde"]), vec!["Bonjour ", "le monde"]);
    }

    #[test]
    fn test_bold_is_held_until_closed() {
        assert_eq!(
            run(&["Un **gr", "and** mot"]),
            vec!["Un **grand** mot"]
        );
    }

    #[test]
    fn test_link_is_held_until_closed() {
        assert_eq!(
            run(&["Voir [la doc", "](https://ex", "ample.com) ici"]),
            vec!["Voir [la doc](https://example.com) ici"]
        );
    }

    #[test]
    fn test_heading_marker_waits_for_text() {
        let mut joiner = MarkdownJoiner::new();
        assert_eq!(joiner.push("##"), None);
        assert_eq!(joiner.push(" Titre").as_deref(), Some("## Titre"));
    }

    #[test]
    fn test_newline_releases_previous_lines() {
        let mut joiner = MarkdownJoiner::new();
        assert_eq!(joiner.push("snake_case"), None);
        assert_eq!(joiner.push("\nsuite").as_deref(), Some("snake_case\nsuite"));
    }

    #[test]
    fn test_cap_forces_release() {
        let mut joiner = MarkdownJoiner::with_max_buffer(8);
        assert_eq!(joiner.push("**ouvert"), Some("**ouvert".into()));
        assert_eq!(joiner.buffered(), "");
    }

    proptest! {
        #[test]
        fn prop_output_equals_input(chunks in proptest::collection::vec("[a-z *_`~\\[\\]()#\\n-]{0,12}", 0..20)) {
            let mut joiner = MarkdownJoiner::with_max_buffer(32);
            let mut out = String::new();
            for chunk in &chunks {
                if let Some(piece) = joiner.push(chunk) {
                    out.push_str(&piece);
                }
            }
            if let Some(rest) = joiner.flush() {
                out.push_str(&rest);
            }
            prop_assert_eq!(out, chunks.concat());
        }
    }
}
