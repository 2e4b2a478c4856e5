//! UI rendering for the TUI

use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Widget},
    Frame,
};

use super::app::{App, Pane};
use super::{compose, messages, notify, sidebar};

fn connection_indicator(connected: bool) -> (&'static str, Color) {
    if connected {
        ("*", Color::Green)
    } else {
        ("o", Color::Red)
    }
}

/// Main render function
pub fn render(frame: &mut Frame, app: &App) {
    let area = frame.area();

    // Layout: header (1 line) + main content + status bar (1 line)
    let [header_area, main_area, status_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Fill(1),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(header_area, frame.buffer_mut(), app);

    // Main area: sidebar (24 cols) + chat content
    let [sidebar_area, content_area] =
        Layout::horizontal([Constraint::Length(24), Constraint::Fill(1)]).areas(main_area);

    sidebar::render(
        sidebar_area,
        frame.buffer_mut(),
        &app.sidebar,
        app.active_pane == Pane::Sidebar,
    );

    let [messages_area, compose_area] = Layout::vertical([
        Constraint::Fill(1),
        Constraint::Length(compose::COMPOSE_HEIGHT),
    ])
    .areas(content_area);

    let peer_name = app.peer_name();

    messages::render(
        messages_area,
        frame.buffer_mut(),
        app.session.messages(),
        &app.messages,
        app.session.current_user().id,
        &peer_name,
        app.session.peer_typing(),
        app.active_pane == Pane::Messages,
    );

    compose::render(
        compose_area,
        frame,
        &app.compose,
        &peer_name,
        app.active_pane == Pane::Compose,
    );

    render_status(status_area, frame.buffer_mut(), app);

    // Notifications draw on top of everything else.
    notify::render(frame, &app.notify);
}

/// Render the header bar
fn render_header(area: Rect, buf: &mut Buffer, app: &App) {
    let title = Span::styled(
        " MISPA",
        Style::default()
            .fg(Color::White)
            .add_modifier(Modifier::BOLD),
    );

    let (symbol, color) = connection_indicator(app.connected);
    let connection = Span::styled(format!(" {} ", symbol), Style::default().fg(color));

    let user_name = Span::styled(
        format!(" {} ", app.session.current_user().username),
        Style::default().fg(Color::Cyan),
    );

    // Right-align connection + user.
    let right = format!(" {}  {} ", symbol, app.session.current_user().username);
    let padding = Span::raw(" ".repeat(header_padding(area.width, " MISPA", &right)));

    let header_line = Line::from(vec![title, padding, connection, user_name]);
    Paragraph::new(header_line)
        .style(Style::default().bg(Color::DarkGray))
        .render(area, buf);
}

/// Columns of padding between the left and right header segments. Counted in
/// chars, not bytes, so a multibyte username doesn't under-pad.
fn header_padding(total: u16, left: &str, right: &str) -> usize {
    (total as usize).saturating_sub(left.chars().count() + right.chars().count())
}

/// Render the status bar
fn render_status(area: Rect, buf: &mut Buffer, app: &App) {
    let (symbol, color) = connection_indicator(app.connected);
    let connection = Span::styled(
        format!(
            " {} {} ",
            symbol,
            if app.connected {
                "Connected"
            } else {
                "Connecting..."
            }
        ),
        Style::default().fg(color),
    );

    let sep_style = Style::default().fg(Color::DarkGray);

    let chat = Span::styled(app.peer_name(), Style::default().fg(Color::Yellow));

    let pane = Span::styled(
        format!("Tab: {}", app.active_pane.as_str()),
        Style::default().fg(Color::Cyan),
    );

    let theme = Span::styled(
        format!("t: theme ({})", app.theme),
        Style::default().fg(Color::Gray),
    );

    let hints = Span::styled("/: search | q: quit", Style::default().fg(Color::Gray));

    let status_line = Line::from(vec![
        connection,
        Span::styled(" | ", sep_style),
        chat,
        Span::styled(" | ", sep_style),
        pane,
        Span::styled(" | ", sep_style),
        theme,
        Span::styled(" | ", sep_style),
        hints,
    ]);

    Paragraph::new(status_line)
        .style(Style::default().bg(Color::DarkGray))
        .render(area, buf);
}

#[cfg(test)]
mod tests {
    use super::header_padding;

    #[test]
    fn header_padding_counts_chars_not_bytes() {
        assert_eq!(header_padding(40, " MISPA", " *  ada "), 40 - 6 - 8);

        // An accented name is more bytes but the same number of columns.
        assert_eq!(
            header_padding(40, " MISPA", " *  élodie "),
            header_padding(40, " MISPA", " *  elodie ")
        );
    }

    #[test]
    fn header_padding_saturates_on_narrow_terminals() {
        assert_eq!(header_padding(4, " MISPA", " *  ada "), 0);
    }
}
