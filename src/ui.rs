pub mod history;
pub mod popup;

use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget},
};

use crate::{
    app::{App, Overlay, StatusKind},
    session::TimerState,
    util::{format_countdown, format_hms},
};

const HORIZONTAL_MARGIN: u16 = 2;
const VERTICAL_MARGIN: u16 = 1;

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let bold_style = Style::default().add_modifier(Modifier::BOLD);
        let italic_style = Style::default().add_modifier(Modifier::ITALIC);
        let dim_style = Style::default().add_modifier(Modifier::DIM);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .horizontal_margin(HORIZONTAL_MARGIN)
            .vertical_margin(VERTICAL_MARGIN)
            .constraints([
                Constraint::Length(3), // task input
                Constraint::Length(3), // timer
                Constraint::Length(1), // status
                Constraint::Length(1), // legend
                Constraint::Min(3),    // history
            ])
            .split(area);

        let state = self.state();

        // task input; locked to the running task once started
        let (task_text, task_style) = match (state, self.session.task_name()) {
            (TimerState::Idle, _) if self.task_input.is_empty() => {
                ("Enter task name...".to_string(), dim_style)
            }
            (TimerState::Idle, _) => (format!("{}▏", self.task_input), bold_style),
            (_, Some(task)) => (task.to_string(), bold_style),
            (_, None) => (String::new(), dim_style),
        };
        Paragraph::new(Span::styled(task_text, task_style))
            .block(Block::default().borders(Borders::ALL).title("Task"))
            .render(chunks[0], buf);

        // timer
        let timer_text = match state {
            TimerState::Break => format!("Break: {}", format_countdown(self.session.display_seconds())),
            TimerState::Alarm => "00:00:00".to_string(),
            _ => format_hms(self.session.display_seconds()),
        };
        let timer_style = match state {
            TimerState::Working => bold_style.fg(Color::Green),
            TimerState::BreakSetup => bold_style.fg(Color::Yellow),
            TimerState::Break => bold_style.fg(Color::Cyan),
            TimerState::Alarm if self.flash_on() => bold_style.fg(Color::White).bg(Color::Red),
            TimerState::Alarm => bold_style.fg(Color::Red),
            TimerState::Idle => bold_style,
        };
        Paragraph::new(Span::styled(timer_text, timer_style))
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL))
            .render(chunks[1], buf);

        // status
        let status_line = match &self.status {
            Some(status) if status.kind == StatusKind::Error => {
                Span::styled(status.text.clone(), Style::default().fg(Color::Red))
            }
            Some(status) => Span::styled(status.text.clone(), Style::default().fg(Color::Gray)),
            None => Span::styled(state.to_string(), Style::default().fg(Color::Gray)),
        };
        Paragraph::new(status_line)
            .alignment(Alignment::Center)
            .render(chunks[2], buf);

        Paragraph::new(Line::from(Span::styled(legend(state), italic_style)))
            .alignment(Alignment::Center)
            .render(chunks[3], buf);

        history::HistoryTable::new(&self.store).render(chunks[4], buf);

        match self.overlay {
            Overlay::None => {}
            Overlay::BreakPrompt => popup::BreakPrompt::new(self).render(area, buf),
            Overlay::Stats => popup::StatsPopup::new(&self.store).render(area, buf),
            Overlay::ConfirmClear => popup::ConfirmClear.render(area, buf),
        }
    }
}

/// Key hints for the main screen
pub fn legend(state: TimerState) -> &'static str {
    match state {
        TimerState::Idle => "(enter) start focus / (tab) stats / (esc)ape",
        TimerState::Working => "(enter) stop focus / (ctrl+c) quit",
        TimerState::BreakSetup => "(enter) choose break length",
        TimerState::Break => "(enter) end break early",
        TimerState::Alarm => "(enter) dismiss alarm",
    }
}
