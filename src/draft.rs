/// Single-line text input with a character cursor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Draft {
    text: String,
    cursor: usize, // in characters, not bytes
}

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

impl Draft {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    fn char_count(&self) -> usize {
        self.text.chars().count()
    }

    pub fn insert(&mut self, c: char) {
        let byte_pos = char_to_byte_index(&self.text, self.cursor);
        self.text.insert(byte_pos, c);
        self.cursor += 1;
    }

    pub fn backspace(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let byte_pos = char_to_byte_index(&self.text, self.cursor);
            self.text.remove(byte_pos);
        }
    }

    pub fn delete(&mut self) {
        if self.cursor < self.char_count() {
            let byte_pos = char_to_byte_index(&self.text, self.cursor);
            self.text.remove(byte_pos);
        }
    }

    pub fn left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.char_count());
    }

    pub fn home(&mut self) {
        self.cursor = 0;
    }

    pub fn end(&mut self) {
        self.cursor = self.char_count();
    }

    /// Empty the draft and hand back what it held.
    pub fn take(&mut self) -> String {
        self.cursor = 0;
        std::mem::take(&mut self.text)
    }

    pub fn set(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.cursor = self.char_count();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn typed(s: &str) -> Draft {
        let mut d = Draft::default();
        s.chars().for_each(|c| d.insert(c));
        d
    }

    #[test]
    fn test_insert_in_middle() {
        let mut d = typed("helo");
        d.left();
        d.insert('l');
        assert_eq!(d.text(), "hello");
        assert_eq!(d.cursor(), 4);
    }

    #[test]
    fn test_backspace_and_delete_multibyte() {
        let mut d = typed("añb");
        d.left();
        d.backspace();
        assert_eq!(d.text(), "ab");
        d.home();
        d.delete();
        assert_eq!(d.text(), "b");
        assert_eq!(d.cursor(), 0);
    }

    #[test]
    fn test_cursor_bounds() {
        let mut d = typed("ab");
        d.right();
        assert_eq!(d.cursor(), 2);
        d.home();
        d.left();
        assert_eq!(d.cursor(), 0);
        d.backspace();
        assert_eq!(d.text(), "ab");
        d.end();
        d.delete();
        assert_eq!(d.text(), "ab");
    }

    #[test]
    fn test_take_clears() {
        let mut d = typed("question");
        assert_eq!(d.take(), "question");
        assert!(d.is_blank());
        assert_eq!(d.cursor(), 0);
    }

    #[test]
    fn test_whitespace_is_blank() {
        assert!(typed("  \t ").is_blank());
        assert!(!typed(" x ").is_blank());
    }
}
