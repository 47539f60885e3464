//! Single-line input buffer.
//!
//! The cursor is a grapheme index so that editing never splits a cluster.

use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

#[derive(Debug, Clone, Default)]
pub struct InputState {
    text: String,
    /// Cursor position in graphemes.
    cursor: usize,
}

impl InputState {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    fn grapheme_count(&self) -> usize {
        self.text.graphemes(true).count()
    }

    /// Byte offset of grapheme `index` (or the end of the text).
    fn byte_index(&self, index: usize) -> usize {
        self.text
            .grapheme_indices(true)
            .nth(index)
            .map_or(self.text.len(), |(i, _)| i)
    }

    /// Inserts text at the cursor. Line breaks become spaces.
    pub fn insert_str(&mut self, text: &str) {
        let text: String = text
            .chars()
            .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
            .collect();
        if text.is_empty() {
            return;
        }
        let before = self.grapheme_count();
        let at = self.byte_index(self.cursor);
        self.text.insert_str(at, &text);
        self.cursor += self.grapheme_count() - before;
    }

    pub fn insert_char(&mut self, c: char) {
        let mut buf = [0u8; 4];
        self.insert_str(c.encode_utf8(&mut buf));
    }

    /// Deletes the grapheme before the cursor.
    pub fn backspace(&mut self) {
        if self.cursor == 0 {
            return;
        }
        let start = self.byte_index(self.cursor - 1);
        let end = self.byte_index(self.cursor);
        self.text.replace_range(start..end, "");
        self.cursor -= 1;
    }

    /// Deletes the grapheme under the cursor.
    pub fn delete(&mut self) {
        if self.cursor >= self.grapheme_count() {
            return;
        }
        let start = self.byte_index(self.cursor);
        let end = self.byte_index(self.cursor + 1);
        self.text.replace_range(start..end, "");
    }

    pub fn move_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.grapheme_count());
    }

    pub fn move_home(&mut self) {
        self.cursor = 0;
    }

    pub fn move_end(&mut self) {
        self.cursor = self.grapheme_count();
    }

    /// Deletes from the start of the line to the cursor.
    pub fn kill_to_start(&mut self) {
        let end = self.byte_index(self.cursor);
        self.text.replace_range(..end, "");
        self.cursor = 0;
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.cursor = 0;
    }

    /// Visible slice for a field `width` cells wide, and the cursor column
    /// within it. Scrolls so the cursor stays visible.
    pub fn viewport(&self, width: usize) -> (String, usize) {
        let width = width.max(1);
        let graphemes: Vec<&str> = self.text.graphemes(true).collect();
        let before_cursor: usize = graphemes[..self.cursor].iter().map(|g| g.width()).sum();

        // Leave one cell for the cursor at the end.
        let mut start = 0;
        let mut skipped = 0;
        while before_cursor - skipped >= width && start < self.cursor {
            skipped += graphemes[start].width();
            start += 1;
        }

        let mut visible = String::new();
        let mut used = 0;
        for g in &graphemes[start..] {
            let w = g.width();
            if used + w > width {
                break;
            }
            visible.push_str(g);
            used += w;
        }
        (visible, before_cursor - skipped)
    }
}
