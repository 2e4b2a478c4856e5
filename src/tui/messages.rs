//! Messages pane: the active chat's message list.
//!
//! Renders the session's message list bottom-anchored, with delivery markers
//! for our own messages and a typing indicator line when the peer is typing.

use chrono::Local;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph, Widget},
};

use crate::api::format_file_size;
use crate::models::{ChatMessage, Delivery};

/// Scroll state: distance from the bottom, in rows.
#[derive(Default)]
pub struct MessagesState {
    pub scroll_from_bottom: usize,
}

impl MessagesState {
    pub fn scroll_up(&mut self) {
        self.scroll_from_bottom += 1;
    }

    pub fn scroll_down(&mut self) {
        self.scroll_from_bottom = self.scroll_from_bottom.saturating_sub(1);
    }

    /// Snap back to the newest messages (on chat switch or new message).
    pub fn reset(&mut self) {
        self.scroll_from_bottom = 0;
    }
}

/// Marker shown after our own messages.
fn delivery_marker(delivery: Delivery) -> (&'static str, Color) {
    match delivery {
        Delivery::Pending => ("...", Color::DarkGray),
        Delivery::Confirmed => ("ok", Color::Green),
        Delivery::Received => ("", Color::Reset),
    }
}

/// Format one message as a display line.
fn message_line(msg: &ChatMessage, self_id: i64, peer_name: &str) -> Line<'static> {
    let own = msg.sender_id == self_id;
    let time = msg.timestamp.with_timezone(&Local).format("%H:%M");

    let name_span = if own {
        Span::styled("you".to_string(), Style::default().fg(Color::Cyan))
    } else {
        Span::styled(peer_name.to_string(), Style::default().fg(Color::Yellow))
    };

    let body = match msg.attachment.as_ref() {
        Some(file) => format!("[file] {} ({})", file.name, format_file_size(file.size)),
        None => msg.content.clone(),
    };
    let body_style = if msg.attachment.is_some() {
        Style::default()
            .fg(Color::Magenta)
            .add_modifier(Modifier::ITALIC)
    } else {
        Style::default().fg(Color::White)
    };

    let mut spans = vec![
        Span::styled(format!("{} ", time), Style::default().fg(Color::DarkGray)),
        name_span,
        Span::raw(": "),
        Span::styled(body, body_style),
    ];

    if own {
        let (marker, color) = delivery_marker(msg.delivery);
        if !marker.is_empty() {
            spans.push(Span::styled(
                format!("  {}", marker),
                Style::default().fg(color),
            ));
        }
    }

    Line::from(spans)
}

#[allow(clippy::too_many_arguments)]
pub fn render(
    area: Rect,
    buf: &mut Buffer,
    messages: &[ChatMessage],
    state: &MessagesState,
    self_id: i64,
    peer_name: &str,
    peer_typing: bool,
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
    block.render(area, buf);

    if inner.height == 0 || inner.width == 0 {
        return;
    }

    // The typing indicator occupies the bottom row while active.
    let mut list_height = inner.height as usize;
    if peer_typing && list_height > 0 {
        list_height -= 1;
        let line = Line::from(Span::styled(
            format!(" {} is typing...", peer_name),
            Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::ITALIC),
        ));
        let typing_area = Rect::new(inner.x, inner.y + inner.height - 1, inner.width, 1);
        Paragraph::new(line).render(typing_area, buf);
    }

    if list_height == 0 {
        return;
    }

    if messages.is_empty() {
        let line = Line::from(Span::styled(
            " (no messages)",
            Style::default().fg(Color::DarkGray),
        ));
        Paragraph::new(line).render(Rect::new(inner.x, inner.y, inner.width, 1), buf);
        return;
    }

    // Bottom-anchored window over the message list.
    let max_scroll = messages.len().saturating_sub(list_height);
    let from_bottom = state.scroll_from_bottom.min(max_scroll);
    let end = messages.len() - from_bottom;
    let start = end.saturating_sub(list_height);
    let window = &messages[start..end];

    // Render bottom-up so the newest visible message hugs the bottom row.
    let mut y = inner.y + list_height as u16;
    for msg in window.iter().rev() {
        y -= 1;
        let line = message_line(msg, self_id, peer_name);
        Paragraph::new(line).render(Rect::new(inner.x, y, inner.width, 1), buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Attachment, MessageId};
    use chrono::Utc;
    use uuid::Uuid;

    fn msg(sender_id: i64, content: &str, delivery: Delivery) -> ChatMessage {
        ChatMessage {
            id: MessageId::Local(Uuid::new_v4()),
            sender_id,
            content: content.to_string(),
            timestamp: Utc::now(),
            delivery,
            attachment: None,
        }
    }

    fn line_text(line: &Line) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn own_pending_message_shows_marker() {
        let line = message_line(&msg(1, "hi", Delivery::Pending), 1, "bob");
        let text = line_text(&line);
        assert!(text.contains("you: hi"));
        assert!(text.ends_with("..."));
    }

    #[test]
    fn received_message_has_no_marker() {
        let line = message_line(&msg(2, "hey", Delivery::Received), 1, "bob");
        let text = line_text(&line);
        assert!(text.contains("bob: hey"));
        assert!(!text.ends_with("ok"));
    }

    #[test]
    fn file_message_renders_name_and_size() {
        let mut m = msg(2, "", Delivery::Received);
        m.attachment = Some(Attachment {
            name: "photo.png".to_string(),
            size: 1536,
        });

        let text = line_text(&message_line(&m, 1, "bob"));
        assert!(text.contains("[file] photo.png (1.5 KB)"));
    }

    #[test]
    fn scroll_state_saturates_at_bottom() {
        let mut state = MessagesState::default();
        state.scroll_down();
        assert_eq!(state.scroll_from_bottom, 0);

        state.scroll_up();
        state.scroll_up();
        state.reset();
        assert_eq!(state.scroll_from_bottom, 0);
    }
}
