//! Transient notifications shown in the TUI.
//!
//! Every background failure and every noteworthy success surfaces here as a
//! short message that dismisses itself after a few seconds.

use std::time::{Duration, Instant};

use ratatui::{
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Paragraph, Widget},
    Frame,
};

/// How long a notification stays on screen.
pub const NOTIFICATION_TTL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyKind {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone)]
pub struct Notification {
    pub text: String,
    pub kind: NotifyKind,
    created: Instant,
}

/// Queue of live notifications, newest last.
#[derive(Default)]
pub struct NotifyState {
    items: Vec<Notification>,
}

impl NotifyState {
    pub fn push(&mut self, kind: NotifyKind, text: impl Into<String>, now: Instant) {
        let text = text.into();
        match kind {
            NotifyKind::Error => tracing::warn!("Notification: {}", text),
            _ => tracing::info!("Notification: {}", text),
        }
        self.items.push(Notification {
            text,
            kind,
            created: now,
        });
    }

    pub fn info(&mut self, text: impl Into<String>, now: Instant) {
        self.push(NotifyKind::Info, text, now);
    }

    pub fn success(&mut self, text: impl Into<String>, now: Instant) {
        self.push(NotifyKind::Success, text, now);
    }

    pub fn error(&mut self, text: impl Into<String>, now: Instant) {
        self.push(NotifyKind::Error, text, now);
    }

    /// Drop notifications older than the TTL; call once per tick.
    pub fn expire(&mut self, now: Instant) {
        self.items
            .retain(|n| now.duration_since(n.created) < NOTIFICATION_TTL);
    }

    pub fn items(&self) -> &[Notification] {
        &self.items
    }
}

fn kind_style(kind: NotifyKind) -> Style {
    match kind {
        NotifyKind::Info => Style::default().fg(Color::White).bg(Color::DarkGray),
        NotifyKind::Success => Style::default().fg(Color::Black).bg(Color::Green),
        NotifyKind::Error => Style::default().fg(Color::White).bg(Color::Red),
    }
}

/// Render live notifications as stacked one-line banners in the top-right.
pub fn render(frame: &mut Frame, state: &NotifyState) {
    let area = frame.area();
    // Leave the header row alone; stack below it.
    let mut y = area.y + 1;

    for notification in state.items().iter().rev() {
        if y >= area.bottom() {
            break;
        }

        let text = format!(" {} ", notification.text);
        let width = (text.chars().count() as u16).min(area.width);
        let x = area.right().saturating_sub(width);
        let banner_area = Rect::new(x, y, width, 1);

        let line = Line::from(Span::styled(text, kind_style(notification.kind)));
        Paragraph::new(line).render(banner_area, frame.buffer_mut());

        y += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notifications_expire_after_ttl() {
        let mut state = NotifyState::default();
        let t0 = Instant::now();

        state.error("connection lost", t0);
        state.expire(t0 + Duration::from_millis(4999));
        assert_eq!(state.items().len(), 1);

        state.expire(t0 + Duration::from_millis(5000));
        assert!(state.items().is_empty());
    }

    #[test]
    fn newer_notifications_outlive_older_ones() {
        let mut state = NotifyState::default();
        let t0 = Instant::now();

        state.info("first", t0);
        state.success("second", t0 + Duration::from_secs(3));

        state.expire(t0 + Duration::from_secs(6));
        assert_eq!(state.items().len(), 1);
        assert_eq!(state.items()[0].text, "second");
    }
}
