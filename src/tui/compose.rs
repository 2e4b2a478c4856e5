//! Compose box: the message input line.

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph, Widget},
    Frame,
};

/// Height of the compose box: 1 input line plus borders.
pub const COMPOSE_HEIGHT: u16 = 3;

/// State for the compose box.
#[derive(Default)]
pub struct ComposeState {
    /// Current input text.
    pub input: String,
    /// Cursor position (character offset into `input`).
    pub cursor: usize,
}

impl ComposeState {
    pub fn insert_char(&mut self, c: char) {
        let byte_pos = self.char_to_byte(self.cursor);
        self.input.insert(byte_pos, c);
        self.cursor += 1;
    }

    pub fn backspace(&mut self) {
        if self.cursor > 0 {
            let end = self.char_to_byte(self.cursor);
            let start = self.char_to_byte(self.cursor - 1);
            self.input.drain(start..end);
            self.cursor -= 1;
        }
    }

    pub fn delete(&mut self) {
        if self.cursor < self.input.chars().count() {
            let start = self.char_to_byte(self.cursor);
            let end = self.char_to_byte(self.cursor + 1);
            self.input.drain(start..end);
        }
    }

    pub fn move_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_right(&mut self) {
        let count = self.input.chars().count();
        if self.cursor < count {
            self.cursor += 1;
        }
    }

    pub fn move_home(&mut self) {
        self.cursor = 0;
    }

    pub fn move_end(&mut self) {
        self.cursor = self.input.chars().count();
    }

    /// Clear all input text (Ctrl+U).
    pub fn clear(&mut self) {
        self.input.clear();
        self.cursor = 0;
    }

    /// Take the current text for sending and clear the box.
    ///
    /// The box is cleared even for whitespace-only input, but `None` is
    /// returned so nothing gets sent.
    pub fn take(&mut self) -> Option<String> {
        let text = self.input.trim().to_string();
        self.clear();
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }

    fn char_to_byte(&self, char_pos: usize) -> usize {
        self.input
            .char_indices()
            .nth(char_pos)
            .map(|(i, _)| i)
            .unwrap_or(self.input.len())
    }
}

/// Render the compose box into the given area.
pub fn render(
    area: Rect,
    frame: &mut Frame,
    state: &ComposeState,
    chat_name: &str,
    focused: bool,
) {
    let border_style = if focused {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let border_type = if focused {
        BorderType::Double
    } else {
        BorderType::Plain
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(border_type)
        .border_style(border_style);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if inner.height == 0 || inner.width == 0 {
        return;
    }

    let input_area = Rect::new(inner.x, inner.y, inner.width, 1);
    let cursor = cursor_position(input_area, state, focused);
    render_input(input_area, frame.buffer_mut(), state, chat_name);

    if let Some((cx, cy)) = cursor {
        frame.set_cursor_position((cx, cy));
    }
}

fn cursor_position(input_area: Rect, state: &ComposeState, focused: bool) -> Option<(u16, u16)> {
    if !focused {
        return None;
    }

    let avail = (input_area.width as usize).saturating_sub(1);
    let (_, offset) = visible_window(&state.input, state.cursor, avail);
    Some((input_area.x + 1 + offset as u16, input_area.y))
}

fn render_input(area: Rect, buf: &mut Buffer, state: &ComposeState, chat_name: &str) {
    let w = area.width as usize;

    if state.input.is_empty() {
        let placeholder = format!(" Message {}...", chat_name);
        let truncated: String = placeholder.chars().take(w).collect();
        let line = Line::from(Span::styled(
            truncated,
            Style::default().fg(Color::DarkGray),
        ));
        Paragraph::new(line).render(area, buf);
        return;
    }

    let avail = w.saturating_sub(1);
    let (visible, _) = visible_window(&state.input, state.cursor, avail);
    let line = Line::from(Span::styled(
        format!(" {}", visible),
        Style::default().fg(Color::White),
    ));
    Paragraph::new(line).render(area, buf);
}

/// Horizontal scrolling: the visible slice of the input and the cursor's
/// column offset within it.
fn visible_window(input: &str, cursor: usize, avail: usize) -> (String, usize) {
    if avail == 0 {
        return (String::new(), 0);
    }

    let chars: Vec<char> = input.chars().collect();
    if chars.len() <= avail {
        return (input.to_string(), cursor);
    }

    let start = if cursor < avail { 0 } else { cursor - avail + 1 };
    let end = (start + avail).min(chars.len());
    let visible: String = chars[start..end].iter().collect();
    (visible, cursor - start)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn editing_keeps_cursor_in_bounds() {
        let mut state = ComposeState::default();
        for c in "héllo".chars() {
            state.insert_char(c);
        }
        assert_eq!(state.input, "héllo");
        assert_eq!(state.cursor, 5);

        state.move_left();
        state.backspace();
        assert_eq!(state.input, "hélo");

        state.move_home();
        state.delete();
        assert_eq!(state.input, "élo");
    }

    #[test]
    fn take_trims_and_clears() {
        let mut state = ComposeState::default();
        for c in "  hello  ".chars() {
            state.insert_char(c);
        }

        assert_eq!(state.take(), Some("hello".to_string()));
        assert!(state.input.is_empty());
        assert_eq!(state.cursor, 0);
    }

    #[test]
    fn take_of_blank_input_clears_but_sends_nothing() {
        let mut state = ComposeState::default();
        state.insert_char(' ');
        state.insert_char(' ');

        assert_eq!(state.take(), None);
        assert!(state.input.is_empty());
    }

    #[test]
    fn long_input_scrolls_to_keep_cursor_visible() {
        let input = "abcdefghij";
        // Cursor at the end: the last column is reserved for the cursor.
        let (visible, offset) = visible_window(input, 10, 5);
        assert_eq!(visible, "ghij");
        assert_eq!(offset, 4);

        let (visible, offset) = visible_window(input, 2, 5);
        assert_eq!(visible, "abcde");
        assert_eq!(offset, 2);
    }
}
