use std::rc::Rc;
use std::time::Instant;
// src/ui.rs
use crate::app::App;
use crate::notify::NOTIFICATION_TAG;
use crate::presenter::TableRow;
use crate::scheduler::RefreshState;
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Cell, List, ListItem, Paragraph, Row, Table, Wrap},
};
use unicode_width::UnicodeWidthChar;

pub struct LayoutChunks {
    pub header_chunk: Rect,
    pub table_chunk: Rect,
    pub detail_chunk: Rect,
    pub notifications_chunk: Rect,
    pub hint_chunk: Rect,
}

pub fn compute_layout(frame_size: Rect) -> LayoutChunks {
    let main_chunks: Rc<[Rect]> = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(5),
            Constraint::Length(3),
            Constraint::Length(8),
            Constraint::Length(1),
        ])
        .split(frame_size);

    LayoutChunks {
        header_chunk: main_chunks[0],
        table_chunk: main_chunks[1],
        detail_chunk: main_chunks[2],
        notifications_chunk: main_chunks[3],
        hint_chunk: main_chunks[4],
    }
}

/// Cuts `text` to at most `max_width` terminal columns, ending in `…` when cut.
pub fn truncate_to_width(text: &str, max_width: usize) -> String {
    let total: usize = text.chars().map(|c| c.width().unwrap_or(0)).sum();
    if total <= max_width {
        return text.to_string();
    }
    if max_width == 0 {
        return String::new();
    }

    let mut out = String::new();
    let mut used = 0;
    for c in text.chars() {
        let w = c.width().unwrap_or(0);
        if used + w > max_width - 1 {
            break;
        }
        out.push(c);
        used += w;
    }
    out.push('…');
    out
}

fn on_off(flag: bool) -> &'static str {
    if flag { "on" } else { "off" }
}

pub fn ui(f: &mut Frame, app: &mut App) {
    let layout_chunks: LayoutChunks = compute_layout(f.size());

    let default_style: Style = Style::default().fg(Color::White);
    let accent_style: Style = Style::default().fg(Color::Cyan);
    let selected_row_style: Style = Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD);
    let live_style: Style = Style::default().fg(Color::LightRed).add_modifier(Modifier::BOLD);

    // --- Gather everything that borrows `app` immutably first ---
    let rows: Vec<TableRow> = app.visible_rows();
    let since_refresh: String = match app.seconds_since_refresh(Instant::now()) {
        Some(secs) => format!("{}s", secs),
        None => "never".to_string(),
    };
    let state_label: &str = match app.scheduler.state() {
        RefreshState::Idle => "idle",
        RefreshState::Refreshing => "refreshing…",
    };
    let header_text: String = format!(
        "Time Since Last Refresh: {} | {} | Live: {} | Upcoming: {} | {} tracked",
        since_refresh,
        state_label,
        on_off(app.config.show_live),
        on_off(app.config.show_upcoming),
        app.scheduler.snapshot().len(),
    );
    let editing = app.editing.map(|field| (field, app.input.value().to_string()));
    let detail_text: String = match (app.selected_row(), &app.status_message) {
        (Some(row), _) => format!("{} - {}", row.channel, row.title),
        (None, Some(message)) => message.clone(),
        (None, None) => "Select a broadcast to see its full title.".to_string(),
    };

    // ===================================== Header ================================================
    let header_widget: Paragraph = Paragraph::new(header_text).style(default_style).block(
        Block::default().title("VTSchedule").borders(Borders::ALL).border_style(accent_style),
    );
    f.render_widget(header_widget, layout_chunks.header_chunk);

    // ===================================== Table =================================================
    let header_row: Row = Row::new(vec!["Time", "Channel Name", "Title", "URL"])
        .style(accent_style.add_modifier(Modifier::BOLD));
    let table_rows: Vec<Row> = rows
        .iter()
        .map(|row| {
            let time_cell = if row.time == crate::presenter::LIVE_LABEL {
                Cell::from(row.time.clone()).style(live_style)
            } else {
                Cell::from(row.time.clone())
            };
            Row::new(vec![
                time_cell,
                Cell::from(row.channel.clone()),
                Cell::from(row.title.clone()),
                Cell::from(row.url.clone()),
            ])
            .style(default_style)
        })
        .collect();
    let widths = [
        Constraint::Length(22),
        Constraint::Percentage(20),
        Constraint::Percentage(40),
        Constraint::Min(44),
    ];
    let table_title: String = if rows.is_empty() {
        "Broadcasts (none)".to_string()
    } else {
        format!("Broadcasts ({})", rows.len())
    };
    let table_widget: Table = Table::new(table_rows, widths)
        .header(header_row)
        .block(Block::default().title(table_title).borders(Borders::ALL).border_style(default_style))
        .highlight_style(selected_row_style)
        .highlight_symbol(">> ");
    f.render_stateful_widget(table_widget, layout_chunks.table_chunk, &mut app.table_state);

    // ===================================== Detail ================================================
    let detail_area: Rect = layout_chunks.detail_chunk;
    if let Some((field, value)) = editing {
        let inner_width: usize = detail_area.width.saturating_sub(2) as usize;
        let scroll: usize = app.input.visual_scroll(inner_width);
        let visible: String = value.chars().skip(scroll).collect();
        let edit_widget: Paragraph = Paragraph::new(visible).style(default_style).block(
            Block::default()
                .title(format!("Edit {}", field.label()))
                .borders(Borders::ALL)
                .border_style(selected_row_style),
        );
        f.render_widget(edit_widget, detail_area);
        let cursor_x = detail_area.x + 1 + (app.input.visual_cursor().saturating_sub(scroll)) as u16;
        f.set_cursor(cursor_x.min(detail_area.right().saturating_sub(2)), detail_area.y + 1);
    } else {
        let detail_widget: Paragraph = Paragraph::new(detail_text)
            .wrap(Wrap { trim: true })
            .style(default_style)
            .block(Block::default().title("Selected").borders(Borders::ALL));
        f.render_widget(detail_widget, detail_area);
    }

    // ================================= Notifications =============================================
    let inner_width: usize = layout_chunks.notifications_chunk.width.saturating_sub(2) as usize;
    let notification_items: Vec<ListItem> = app
        .notifications
        .entries()
        .skip(app.notifications.scroll_offset as usize)
        .map(|n| {
            let line = format!(
                "[{}] {}: {}",
                n.received_at.format("%H:%M:%S"),
                NOTIFICATION_TAG,
                n.message
            );
            ListItem::new(truncate_to_width(&line, inner_width)).style(default_style)
        })
        .collect();
    let notifications_widget: List = List::new(notification_items)
        .block(Block::default().title("Notifications").borders(Borders::ALL));
    f.render_widget(notifications_widget, layout_chunks.notifications_chunk);

    // =================================== Hint Bar ================================================
    let hint_text: &str = if app.editing.is_some() {
        "[Enter] Save | [Esc] Cancel | [←/→] Move | [Backspace/Del] Delete"
    } else {
        "[R] Refresh | [L] Live | [U] Upcoming | [A] API Key | [C] Channels | [G] Orgs | [↑/↓] Select | [Enter] Open | [PgUp/PgDn] Notifications | [Q] Quit"
    };
    let hint_widget: Paragraph = Paragraph::new(hint_text)
        .style(Style::default().fg(Color::DarkGray))
        .alignment(ratatui::layout::Alignment::Center);
    f.render_widget(hint_widget, layout_chunks.hint_chunk);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncation_respects_display_width() {
        assert_eq!(truncate_to_width("short", 10), "short");
        assert_eq!(truncate_to_width("abcdefgh", 5), "abcd…");
        // Wide characters take two columns each.
        assert_eq!(truncate_to_width("配信配信配信", 5), "配信…");
        assert_eq!(truncate_to_width("abc", 0), "");
    }
}
