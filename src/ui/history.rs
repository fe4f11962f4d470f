use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Rect},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, Widget},
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::record::SessionRecord;
use crate::store::RecordStore;

const TASK_COLUMN_WIDTH: u16 = 30;

/// Clip `s` to at most `max` display columns, marking the cut with an ellipsis
pub fn truncate_to_width(s: &str, max: usize) -> String {
    if s.width() <= max {
        return s.to_string();
    }
    let mut out = String::new();
    let mut used = 0;
    for c in s.chars() {
        let w = c.width().unwrap_or(0);
        if used + w + 1 > max {
            break;
        }
        used += w;
        out.push(c);
    }
    out.push('…');
    out
}

/// Pure presenter for one history row
pub fn present_row(record: &SessionRecord) -> Row<'static> {
    Row::new(vec![
        Cell::from(truncate_to_width(
            &record.task_name,
            TASK_COLUMN_WIDTH as usize,
        )),
        Cell::from(record.start_time.format("%H:%M").to_string()),
        Cell::from(record.end_time.format("%H:%M").to_string()),
        Cell::from(record.work_display()).style(Style::default().fg(Color::Green)),
        Cell::from(record.break_display()).style(Style::default().fg(Color::Cyan)),
    ])
}

/// Session history, newest first
pub struct HistoryTable<'a> {
    store: &'a RecordStore,
}

impl<'a> HistoryTable<'a> {
    pub fn new(store: &'a RecordStore) -> Self {
        Self { store }
    }
}

impl Widget for HistoryTable<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if self.store.is_empty() {
            Paragraph::new("No sessions yet")
                .block(Block::default().borders(Borders::ALL).title("Session History"))
                .style(Style::default().fg(Color::Gray))
                .alignment(Alignment::Center)
                .render(area, buf);
            return;
        }

        let header = Row::new(vec!["Task", "Start", "End", "Focus", "Break"]).style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        );

        let rows: Vec<Row> = self.store.newest_first().map(present_row).collect();

        Table::new(
            rows,
            [
                Constraint::Length(TASK_COLUMN_WIDTH),
                Constraint::Length(6),
                Constraint::Length(6),
                Constraint::Length(9),
                Constraint::Length(9),
            ],
        )
        .header(header)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("Session History ({})", self.store.len())),
        )
        .render(area, buf);
    }
}
