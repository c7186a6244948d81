use asc_notify::NotificationSeverity;
use asc_process::ProcessStatus;
use chrono::{DateTime, Utc};
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Cell, Paragraph, Row, Table};
use ratatui::Frame;

use crate::app::TuiApp;
use crate::model::AgentRow;

const ACCENT: Color = Color::Cyan;
const DIM: Color = Color::DarkGray;
const HEADER_FG: Color = Color::White;
const KEY_HINTS: &str = " q/Esc/Ctrl-C quit";

fn status_color(status: ProcessStatus) -> Color {
    match status {
        ProcessStatus::Running => Color::Green,
        ProcessStatus::Exited => Color::Red,
        ProcessStatus::Unknown => Color::Yellow,
    }
}

fn severity_color(severity: NotificationSeverity) -> Color {
    match severity {
        NotificationSeverity::Info => Color::Green,
        NotificationSeverity::Warning => Color::Yellow,
        NotificationSeverity::Error => Color::Red,
    }
}

fn titled_block(title: &str) -> Block<'_> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(DIM))
        .title(Span::styled(
            format!(" {title} "),
            Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
        ))
}

pub fn render_dashboard(frame: &mut Frame<'_>, app: &TuiApp) {
    let root = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(3),
            Constraint::Length(3),
        ])
        .split(frame.area());

    render_header(frame, root[0], app);
    render_agents(frame, root[1], app, Utc::now());
    render_footer(frame, root[2], app);
}

fn render_header(frame: &mut Frame<'_>, area: Rect, app: &TuiApp) {
    let running = app
        .agents
        .iter()
        .filter(|agent| agent.status == ProcessStatus::Running)
        .count();
    let line = Line::from(vec![
        Span::styled(
            " asc ",
            Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
        ),
        Span::styled(app.config_path.clone(), Style::default().fg(HEADER_FG)),
        Span::styled(
            format!("  {running}/{} running", app.agents.len()),
            Style::default().fg(DIM),
        ),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}

fn agent_row(agent: &AgentRow, now: DateTime<Utc>) -> Row<'static> {
    Row::new(vec![
        Cell::from(agent.name.clone()),
        Cell::from(agent.pid.to_string()),
        Cell::from(agent.status.as_str())
            .style(Style::default().fg(status_color(agent.status))),
        Cell::from(agent.uptime(now)),
        Cell::from(agent.command.clone()),
    ])
}

fn render_agents(frame: &mut Frame<'_>, area: Rect, app: &TuiApp, now: DateTime<Utc>) {
    if app.agents.is_empty() {
        let empty = Paragraph::new(Span::styled(" no agents running", Style::default().fg(DIM)))
            .block(titled_block("Agents"));
        frame.render_widget(empty, area);
        return;
    }

    let header = Row::new(vec!["NAME", "PID", "STATUS", "UPTIME", "COMMAND"])
        .style(Style::default().fg(DIM).add_modifier(Modifier::BOLD));
    let rows: Vec<Row<'static>> = app.agents.iter().map(|agent| agent_row(agent, now)).collect();
    let table = Table::new(
        rows,
        [
            Constraint::Length(20),
            Constraint::Length(8),
            Constraint::Length(9),
            Constraint::Length(8),
            Constraint::Min(10),
        ],
    )
    .header(header)
    .block(titled_block("Agents"));
    frame.render_widget(table, area);
}

fn footer_line(app: &TuiApp) -> Line<'static> {
    match app.notification() {
        Some(message) => Line::from(Span::styled(
            format!(" {}", message.summary()),
            Style::default().fg(severity_color(message.severity)),
        )),
        None => Line::from(Span::styled(KEY_HINTS, Style::default().fg(DIM))),
    }
}

fn render_footer(frame: &mut Frame<'_>, area: Rect, app: &TuiApp) {
    let widget = Paragraph::new(footer_line(app)).block(titled_block("Status"));
    frame.render_widget(widget, area);
}

#[cfg(test)]
mod tests {
    use super::{footer_line, render_dashboard, KEY_HINTS};
    use crate::event::TuiEvent;
    use crate::model::AgentRow;
    use crate::TuiApp;
    use asc_core::events::LifecycleEvent;
    use asc_notify::notification_for_lifecycle;
    use asc_process::ProcessStatus;
    use chrono::Utc;
    use ratatui::backend::TestBackend;
    use ratatui::buffer::Buffer;
    use ratatui::Terminal;
    use std::time::Instant;

    fn buffer_text(buffer: &Buffer) -> String {
        let area = buffer.area;
        let mut out = String::new();
        for y in area.top()..area.bottom() {
            for x in area.left()..area.right() {
                out.push_str(buffer[(x, y)].symbol());
            }
            out.push('\n');
        }
        out
    }

    fn draw(app: &TuiApp) -> String {
        let mut terminal = Terminal::new(TestBackend::new(100, 12)).expect("terminal");
        terminal
            .draw(|frame| render_dashboard(frame, app))
            .expect("draw");
        buffer_text(terminal.backend().buffer())
    }

    #[test]
    fn renders_agent_rows_and_header() {
        let mut app = TuiApp::new("/work/asc.toml");
        app.apply_event(
            TuiEvent::AgentsReplaced {
                agents: vec![
                    AgentRow {
                        name: "coder".to_string(),
                        pid: 4242,
                        status: ProcessStatus::Running,
                        started_at: Utc::now(),
                        command: "python agent_adapter.py".to_string(),
                    },
                    AgentRow {
                        name: "tester".to_string(),
                        pid: 4343,
                        status: ProcessStatus::Exited,
                        started_at: Utc::now(),
                        command: "sleep 1".to_string(),
                    },
                ],
            },
            Instant::now(),
        );

        let screen = draw(&app);
        assert!(screen.contains("/work/asc.toml"));
        assert!(screen.contains("1/2 running"));
        assert!(screen.contains("coder"));
        assert!(screen.contains("4242"));
        assert!(screen.contains("python agent_adapter.py"));
        assert!(screen.contains("exited"));
        assert!(screen.contains(KEY_HINTS.trim()));
    }

    #[test]
    fn renders_empty_state() {
        let screen = draw(&TuiApp::default());
        assert!(screen.contains("no agents running"));
    }

    #[test]
    fn footer_prefers_notification_over_key_hints() {
        let mut app = TuiApp::default();
        let text = |line: ratatui::text::Line<'static>| -> String {
            line.spans.iter().map(|s| s.content.as_ref()).collect()
        };
        assert_eq!(text(footer_line(&app)), KEY_HINTS);

        app.apply_event(
            TuiEvent::from(notification_for_lifecycle(&LifecycleEvent::ReloadFailed {
                error: "failed to parse asc.toml".to_string(),
            })),
            Instant::now(),
        );
        assert_eq!(
            text(footer_line(&app)),
            " Config reload failed: failed to parse asc.toml"
        );
    }
}
