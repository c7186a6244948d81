use crate::app::TuiApp;
use crate::error::TuiError;
use crate::event::TuiEvent;
use crate::ui::render_dashboard;
use crossterm::event::{self, Event as CEvent};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Receiver;
use std::time::{Duration, Instant};

pub const DEFAULT_TICK_RATE: Duration = Duration::from_millis(250);

/// Runs the dashboard until a quit key is pressed or `terminate` is set.
/// Background events are drained without blocking once per tick.
pub fn run_tui(
    app: &mut TuiApp,
    events: &Receiver<TuiEvent>,
    tick_rate: Duration,
    terminate: &AtomicBool,
) -> Result<(), TuiError> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let run_result = run_loop(&mut terminal, app, events, tick_rate, terminate);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    run_result
}

fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut TuiApp,
    events: &Receiver<TuiEvent>,
    tick_rate: Duration,
    terminate: &AtomicBool,
) -> Result<(), TuiError> {
    while !should_exit(app, terminate) {
        drain_events(app, events, Instant::now());
        terminal.draw(|frame| render_dashboard(frame, app))?;

        if event::poll(tick_rate)? {
            handle_terminal_event(app, event::read()?);
        }
    }
    Ok(())
}

fn should_exit(app: &TuiApp, terminate: &AtomicBool) -> bool {
    app.should_quit || terminate.load(Ordering::SeqCst)
}

fn drain_events(app: &mut TuiApp, events: &Receiver<TuiEvent>, now: Instant) {
    for event in events.try_iter() {
        app.apply_event(event, now);
    }
    app.expire_notification(now);
}

fn handle_terminal_event(app: &mut TuiApp, event: CEvent) {
    if let CEvent::Key(key) = event {
        app.handle_key_event(key);
    }
}
