//! Sidebar widget: contact list with online markers and inline user search.

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph, Widget},
};

use crate::models::{ContactStatus, UserSearchResult};

/// A contact shown in the sidebar. The chat with a contact is keyed by the
/// contact's user id.
#[derive(Clone)]
pub struct Contact {
    pub user_id: i64,
    pub username: String,
    pub online: bool,
    /// Number of unread messages (0 = no badge).
    pub unread: u32,
}

/// Active search-mode state, entered with `/`.
#[derive(Default)]
pub struct SearchState {
    pub query: String,
    pub results: Vec<UserSearchResult>,
    pub selected: usize,
    /// A search is in flight for the current query.
    pub pending: bool,
}

/// Sidebar state: contacts plus optional search mode.
#[derive(Default)]
pub struct SidebarState {
    pub contacts: Vec<Contact>,
    pub selected: usize,
    pub search: Option<SearchState>,
}

impl SidebarState {
    pub fn in_search(&self) -> bool {
        self.search.is_some()
    }

    pub fn open_search(&mut self) {
        self.search = Some(SearchState::default());
    }

    pub fn close_search(&mut self) {
        self.search = None;
    }

    /// Replace search results (the response to the current query).
    pub fn set_results(&mut self, results: Vec<UserSearchResult>) {
        if let Some(search) = self.search.as_mut() {
            search.results = results;
            search.selected = 0;
            search.pending = false;
        }
    }

    /// The search result under the cursor.
    pub fn selected_result(&self) -> Option<&UserSearchResult> {
        let search = self.search.as_ref()?;
        search.results.get(search.selected)
    }

    /// The contact under the cursor (contact mode only).
    pub fn selected_contact(&self) -> Option<&Contact> {
        if self.in_search() {
            return None;
        }
        self.contacts.get(self.selected)
    }

    pub fn move_up(&mut self) {
        match self.search.as_mut() {
            Some(search) => search.selected = search.selected.saturating_sub(1),
            None => self.selected = self.selected.saturating_sub(1),
        }
    }

    pub fn move_down(&mut self) {
        match self.search.as_mut() {
            Some(search) => {
                if search.selected + 1 < search.results.len() {
                    search.selected += 1;
                }
            }
            None => {
                if self.selected + 1 < self.contacts.len() {
                    self.selected += 1;
                }
            }
        }
    }

    /// Add or refresh a contact entry, keeping the list sorted by name.
    pub fn upsert_contact(&mut self, user_id: i64, username: &str, online: bool) {
        match self.contacts.iter_mut().find(|c| c.user_id == user_id) {
            Some(contact) => {
                contact.username = username.to_string();
                contact.online = online;
            }
            None => {
                self.contacts.push(Contact {
                    user_id,
                    username: username.to_string(),
                    online,
                    unread: 0,
                });
                self.contacts.sort_by(|a, b| a.username.cmp(&b.username));
            }
        }
    }

    /// Apply a presence change from a `user_status` event.
    pub fn set_presence(&mut self, user_id: i64, status: ContactStatus) {
        if let Some(contact) = self.contacts.iter_mut().find(|c| c.user_id == user_id) {
            contact.online = status == ContactStatus::Online;
        }
    }

    /// Bump the unread badge for a contact other than the open chat.
    pub fn mark_unread(&mut self, user_id: i64) {
        if let Some(contact) = self.contacts.iter_mut().find(|c| c.user_id == user_id) {
            contact.unread += 1;
        }
    }

    /// Clear the unread badge (chat opened).
    pub fn mark_read(&mut self, user_id: i64) {
        if let Some(contact) = self.contacts.iter_mut().find(|c| c.user_id == user_id) {
            contact.unread = 0;
        }
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

pub fn render(area: Rect, buf: &mut Buffer, state: &SidebarState, focused: bool) {
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

    let title = if state.in_search() {
        " Search "
    } else {
        " Contacts "
    };
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_type(border_type)
        .border_style(border_style);
    let inner = block.inner(area);
    block.render(area, buf);

    if inner.height == 0 || inner.width == 0 {
        return;
    }

    match state.search.as_ref() {
        Some(search) => render_search(inner, buf, search),
        None => render_contacts(inner, buf, state, focused),
    }
}

fn render_contacts(inner: Rect, buf: &mut Buffer, state: &SidebarState, focused: bool) {
    if state.contacts.is_empty() {
        let line = Line::from(Span::styled(
            " / to search",
            Style::default().fg(Color::DarkGray),
        ));
        Paragraph::new(line).render(row(inner, 0), buf);
        return;
    }

    let height = inner.height as usize;
    let offset = scroll_offset(state.selected, height, state.contacts.len());

    for (row_idx, contact) in state.contacts.iter().enumerate().skip(offset).take(height) {
        let selected = row_idx == state.selected;
        let cursor = if selected { "\u{25BA}" } else { " " };
        let presence = if contact.online { "*" } else { "o" };
        let label = format!("{}{} {}", cursor, presence, contact.username);
        let badge = if contact.unread > 0 {
            contact.unread.to_string()
        } else {
            String::new()
        };

        let style = if selected {
            Style::default()
                .fg(Color::White)
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD)
        } else if contact.unread > 0 {
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD)
        } else if focused {
            Style::default().fg(Color::Gray)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        let badge_style = if contact.unread > 0 {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD)
        } else {
            style
        };

        render_row(
            buf,
            row(inner, (row_idx - offset) as u16),
            &label,
            &badge,
            style,
            badge_style,
        );
    }
}

fn render_search(inner: Rect, buf: &mut Buffer, search: &SearchState) {
    // Row 0: the query line.
    let query_line = Line::from(vec![
        Span::styled("/", Style::default().fg(Color::Yellow)),
        Span::styled(search.query.clone(), Style::default().fg(Color::White)),
        Span::styled("_", Style::default().fg(Color::Yellow)),
    ]);
    Paragraph::new(query_line).render(row(inner, 0), buf);

    if inner.height < 2 {
        return;
    }

    if search.pending {
        let line = Line::from(Span::styled(
            " Searching...",
            Style::default().fg(Color::DarkGray),
        ));
        Paragraph::new(line).render(row(inner, 1), buf);
        return;
    }

    let height = (inner.height - 1) as usize;
    let offset = scroll_offset(search.selected, height, search.results.len());

    for (idx, user) in search.results.iter().enumerate().skip(offset).take(height) {
        let selected = idx == search.selected;
        let cursor = if selected { "\u{25BA}" } else { " " };
        let marker = if user.is_contact { "+" } else { " " };
        let label = format!("{}{} {}", cursor, marker, user.username);

        let style = if selected {
            Style::default()
                .fg(Color::White)
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD)
        } else if user.is_contact {
            Style::default().fg(Color::Green)
        } else {
            Style::default().fg(Color::Gray)
        };

        render_row(
            buf,
            row(inner, 1 + (idx - offset) as u16),
            &label,
            "",
            style,
            style,
        );
    }
}

fn row(inner: Rect, offset: u16) -> Rect {
    Rect::new(inner.x, inner.y + offset, inner.width, 1)
}

/// Simple scroll offset: keep the selected item visible.
fn scroll_offset(selected: usize, height: usize, total: usize) -> usize {
    if total <= height || selected < height {
        return 0;
    }
    let max_offset = total.saturating_sub(height);
    selected.saturating_sub(height - 1).min(max_offset)
}

/// Render a row with left-aligned text and an optional right-aligned badge.
fn render_row(
    buf: &mut Buffer,
    area: Rect,
    left: &str,
    badge: &str,
    text_style: Style,
    badge_style: Style,
) {
    let width = area.width as usize;
    if width == 0 {
        return;
    }

    let badge_len = badge.chars().count();
    let max_left = if badge_len > 0 {
        width.saturating_sub(badge_len + 1)
    } else {
        width
    };

    let left_truncated: String = left.chars().take(max_left).collect();
    let left_len = left_truncated.chars().count();
    let pad = width.saturating_sub(left_len + badge_len);

    let line = Line::from(vec![
        Span::styled(left_truncated, text_style),
        Span::styled(" ".repeat(pad), text_style),
        Span::styled(badge.to_string(), badge_style),
    ]);

    Paragraph::new(line).render(area, buf);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contact(id: i64, name: &str) -> Contact {
        Contact {
            user_id: id,
            username: name.to_string(),
            online: false,
            unread: 0,
        }
    }

    #[test]
    fn upsert_keeps_contacts_sorted() {
        let mut state = SidebarState::default();
        state.upsert_contact(2, "zoe", false);
        state.upsert_contact(3, "ann", true);
        state.upsert_contact(2, "zoe", true);

        let names: Vec<&str> = state
            .contacts
            .iter()
            .map(|c| c.username.as_str())
            .collect();
        assert_eq!(names, vec!["ann", "zoe"]);
        assert!(state.contacts.iter().all(|c| c.online));
    }

    #[test]
    fn selection_stays_in_bounds() {
        let mut state = SidebarState::default();
        state.contacts = vec![contact(1, "a"), contact(2, "b")];

        state.move_up();
        assert_eq!(state.selected, 0);

        state.move_down();
        state.move_down();
        state.move_down();
        assert_eq!(state.selected, 1);
    }

    #[test]
    fn unread_badges_track_per_contact() {
        let mut state = SidebarState::default();
        state.contacts = vec![contact(1, "a"), contact(2, "b")];

        state.mark_unread(2);
        state.mark_unread(2);
        assert_eq!(state.contacts[1].unread, 2);

        state.mark_read(2);
        assert_eq!(state.contacts[1].unread, 0);
    }

    #[test]
    fn search_mode_has_its_own_cursor() {
        let mut state = SidebarState::default();
        state.contacts = vec![contact(1, "a")];
        state.open_search();
        assert!(state.selected_contact().is_none());

        state.set_results(vec![UserSearchResult {
            id: 9,
            username: "bob".to_string(),
            email: "bob@example.org".to_string(),
            is_contact: false,
            is_online: true,
        }]);
        assert_eq!(state.selected_result().map(|u| u.id), Some(9));

        state.close_search();
        assert_eq!(state.selected_contact().map(|c| c.user_id), Some(1));
    }
}
