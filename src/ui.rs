use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Gauge, List, ListItem, Paragraph},
    Frame,
};

use crate::app::{Mode, UiState};
use crate::history::HistoryQuery;
use crate::models::SessionRecord;
use crate::timer::state::WORK_PERIODS_PER_SESSION;
use crate::timer::{CyclePhase, TimerState};

pub fn render(frame: &mut Frame, app: &UiState) {
    let area = frame.area();
    if app.history.open {
        // The taller layout plays the role of the window growing for history.
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(7), Constraint::Min(5)])
            .split(area);
        render_timer(frame, app, chunks[0]);
        render_history(frame, app, chunks[1]);
    } else {
        render_timer(frame, app, area);
    }
}

fn phase_color(phase: CyclePhase) -> Color {
    match phase {
        CyclePhase::Work => Color::Cyan,
        CyclePhase::ShortBreak => Color::Green,
        CyclePhase::LongBreak => Color::Magenta,
    }
}

fn format_clock(secs: u32) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

fn cycle_dots(timer: &TimerState) -> String {
    let total = WORK_PERIODS_PER_SESSION as usize;
    let done = timer.completed_work_periods as usize;
    format!("{}{}", "●".repeat(done), "○".repeat(total.saturating_sub(done)))
}

fn render_timer(frame: &mut Frame, app: &UiState, area: Rect) {
    let timer = &app.timer;
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .title(" pmo ");
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Min(1),
        ])
        .split(inner);

    let mut status = vec![
        Span::styled(
            timer.phase.label(),
            Style::default()
                .fg(phase_color(timer.phase))
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw("  "),
        Span::styled(cycle_dots(timer), Style::default().fg(Color::DarkGray)),
    ];
    if !timer.is_running && timer.cycle_started_at.is_some() {
        status.push(Span::styled(
            "  paused",
            Style::default().fg(Color::Yellow),
        ));
    }
    frame.render_widget(Paragraph::new(Line::from(status)), rows[0]);

    let gauge = Gauge::default()
        .gauge_style(Style::default().fg(phase_color(timer.phase)))
        .ratio(timer.progress())
        .label(format_clock(timer.remaining_secs));
    frame.render_widget(gauge, rows[1]);

    frame.render_widget(Paragraph::new(task_line(app)), rows[2]);

    let hints = match app.mode {
        Mode::EditingTask => "enter start  esc done",
        Mode::Normal => "space start/pause  r reset  h history  q quit",
    };
    frame.render_widget(
        Paragraph::new(Span::styled(hints, Style::default().fg(Color::DarkGray))),
        rows[3],
    );
}

fn task_line(app: &UiState) -> Line<'_> {
    let label = Span::styled("Task: ", Style::default().fg(Color::DarkGray));
    match app.mode {
        Mode::EditingTask => Line::from(vec![
            label,
            Span::styled(
                app.task_input.as_str(),
                Style::default().fg(Color::Yellow),
            ),
            Span::styled("▏", Style::default().fg(Color::Yellow)),
        ]),
        Mode::Normal => {
            if app.timer.cycle_started_at.is_some() {
                Line::from(vec![label, Span::raw(app.timer.task_name.as_str())])
            } else if !app.task_input.is_empty() {
                Line::from(vec![
                    label,
                    Span::styled(
                        app.task_input.as_str(),
                        Style::default().fg(Color::Gray),
                    ),
                ])
            } else {
                Line::from(vec![
                    label,
                    Span::styled("press e to name one", Style::default().fg(Color::DarkGray)),
                ])
            }
        }
    }
}

fn render_history(frame: &mut Frame, app: &UiState, area: Rect) {
    let history = &app.history;
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .title(format!(" History: {} ", history.query.title()))
        .title_bottom(
            Line::from(" <-/-> day  t today  g recent ")
                .style(Style::default().fg(Color::DarkGray)),
        );

    if history.loading {
        frame.render_widget(
            Paragraph::new("Loading sessions...")
                .style(Style::default().fg(Color::DarkGray))
                .block(block),
            area,
        );
    } else if let Some(error) = &history.error {
        frame.render_widget(
            Paragraph::new(format!("Could not load sessions: {error}"))
                .style(Style::default().fg(Color::Red))
                .block(block),
            area,
        );
    } else if history.sessions.is_empty() {
        frame.render_widget(
            Paragraph::new("No study sessions recorded yet")
                .style(Style::default().fg(Color::DarkGray))
                .block(block),
            area,
        );
    } else {
        let show_date = history.query == HistoryQuery::Recent;
        let items: Vec<ListItem> = history
            .sessions
            .iter()
            .map(|session| ListItem::new(session_line(session, show_date)))
            .collect();
        frame.render_widget(List::new(items).block(block), area);
    }
}

fn session_line(session: &SessionRecord, show_date: bool) -> Line<'_> {
    let time_format = if show_date { "%m-%d %H:%M" } else { "%H:%M" };
    let badge = if session.is_completed {
        Span::styled("complete", Style::default().fg(Color::Green))
    } else {
        Span::styled("partial", Style::default().fg(Color::Yellow))
    };

    Line::from(vec![
        Span::styled(
            session.started_at.format(time_format).to_string(),
            Style::default().fg(Color::DarkGray),
        ),
        Span::raw("  "),
        Span::raw(session.task_name.as_str()),
        Span::raw("  "),
        Span::styled(
            format!("{}/{}", session.completed_cycles, WORK_PERIODS_PER_SESSION),
            Style::default().fg(Color::DarkGray),
        ),
        Span::raw("  "),
        badge,
        Span::raw("  "),
        Span::styled(
            format!("{}m", session.duration_secs / 60),
            Style::default().fg(Color::DarkGray),
        ),
    ])
}
