use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Widget, Wrap},
};

use crate::{app::App, store::RecordStore, util::format_hms};

/// Rect of the given percentage size, centered in `r`
pub fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

fn render_popup(title: &str, lines: Vec<Line<'_>>, border: Color, area: Rect, buf: &mut Buffer) {
    let popup = centered_rect(60, 40, area);
    Clear.render(popup, buf);
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(border))
                .title(title.to_string()),
        )
        .render(popup, buf);
}

pub struct BreakPrompt<'a> {
    app: &'a App,
}

impl<'a> BreakPrompt<'a> {
    pub fn new(app: &'a App) -> Self {
        Self { app }
    }
}

impl Widget for BreakPrompt<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let work = self
            .app
            .session
            .pending()
            .map_or(0, |record| record.work_duration);
        let lines = vec![
            Line::from(format!("Work done: {}", format_hms(work))),
            Line::from("Break duration (mins):"),
            Line::from(Span::styled(
                format!("[ {} ]", self.app.break_input),
                Style::default().add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Line::from(Span::styled(
                "(enter) start break / (esc) skip break",
                Style::default().add_modifier(Modifier::ITALIC),
            )),
        ];
        render_popup("Break Time", lines, Color::Cyan, area, buf);
    }
}

pub struct StatsPopup<'a> {
    store: &'a RecordStore,
}

impl<'a> StatsPopup<'a> {
    pub fn new(store: &'a RecordStore) -> Self {
        Self { store }
    }
}

impl Widget for StatsPopup<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let lines = vec![
            Line::from("Total Focus Time:"),
            Line::from(Span::styled(
                format_hms(self.store.total_work_seconds()),
                Style::default()
                    .fg(Color::Green)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(format!(
                "Total Break Time: {}",
                format_hms(self.store.total_break_seconds())
            )),
            Line::from(format!("Sessions: {}", self.store.len())),
            Line::from(""),
            Line::from(Span::styled(
                "(e)xport / (c)lear all data / (esc) close",
                Style::default().add_modifier(Modifier::ITALIC),
            )),
        ];
        render_popup("Statistics", lines, Color::Gray, area, buf);
    }
}

pub struct ConfirmClear;

impl Widget for ConfirmClear {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let lines = vec![
            Line::from(Span::styled(
                "Delete all history?",
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Line::from("(y)es / any other key to cancel"),
        ];
        render_popup("Confirm", lines, Color::Red, area, buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::tempdir;

    fn rendered<W: Widget>(widget: W, area: Rect) -> String {
        let mut buffer = Buffer::empty(area);
        widget.render(area, &mut buffer);
        buffer
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect::<String>()
    }

    #[test]
    fn test_centered_rect_is_inside() {
        let outer = Rect::new(0, 0, 100, 50);
        let inner = centered_rect(60, 40, outer);
        assert_eq!(inner.width, 60);
        assert_eq!(inner.height, 20);
        assert_eq!(inner.x, 20);
        assert_eq!(inner.y, 15);
    }

    #[test]
    fn test_stats_popup_totals() {
        let dir = tempdir().unwrap();
        let mut store = RecordStore::new(dir.path().join("s.json"));
        let day = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();
        store
            .append(
                crate::record::SessionRecord::new(
                    "a",
                    day.and_hms_opt(9, 0, 0).unwrap(),
                    day.and_hms_opt(10, 30, 0).unwrap(),
                )
                .with_break(600),
            )
            .unwrap();

        let text = rendered(StatsPopup::new(&store), Rect::new(0, 0, 100, 30));
        assert!(text.contains("1:30:00"));
        assert!(text.contains("Total Break Time: 0:10:00"));
        assert!(text.contains("Sessions: 1"));
    }

    #[test]
    fn test_confirm_clear_text() {
        let text = rendered(ConfirmClear, Rect::new(0, 0, 100, 30));
        assert!(text.contains("Delete all history?"));
    }
}
