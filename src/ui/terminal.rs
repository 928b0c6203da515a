use {
    crate::{config::ChartStyle, state::SeriesView, stream::StreamState},
    ratatui::{backend::CrosstermBackend, Terminal},
    std::time::Duration,
    tokio::sync::watch,
};

/// How long to wait for a key press before redrawing
const REFRESH_INTERVAL: Duration = Duration::from_millis(250);

/// Run the TUI event loop
///
/// Redraws from the latest published series; never writes to it. Blocks
/// the calling thread until 'q' or Esc.
pub fn run_ui(
    view: SeriesView,
    status: watch::Receiver<StreamState>,
    style: ChartStyle,
) -> Result<(), Box<dyn std::error::Error>> {
    let stdout = std::io::stdout();
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    crossterm::terminal::enable_raw_mode()?;
    // Every exit from here on, early `?` included, restores the terminal
    let _restore = RestoreOnDrop::new(restore_terminal);

    // Alternate screen keeps stderr logs off the chart
    crossterm::execute!(
        std::io::stdout(),
        crossterm::terminal::EnterAlternateScreen,
        crossterm::cursor::Hide
    )?;

    terminal.clear()?;

    event_loop(&mut terminal, &view, &status, style)
}

/// Runs its action once when dropped
struct RestoreOnDrop<F: FnOnce()> {
    action: Option<F>,
}

impl<F: FnOnce()> RestoreOnDrop<F> {
    fn new(action: F) -> Self {
        Self { action: Some(action) }
    }
}

impl<F: FnOnce()> Drop for RestoreOnDrop<F> {
    fn drop(&mut self) {
        if let Some(action) = self.action.take() {
            action();
        }
    }
}

fn restore_terminal() {
    if let Err(e) = crossterm::execute!(
        std::io::stdout(),
        crossterm::terminal::LeaveAlternateScreen,
        crossterm::cursor::Show
    ) {
        log::warn!("Failed to leave alternate screen: {}", e);
    }
    if let Err(e) = crossterm::terminal::disable_raw_mode() {
        log::warn!("Failed to disable raw mode: {}", e);
    }
}

fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    view: &SeriesView,
    status: &watch::Receiver<StreamState>,
    style: ChartStyle,
) -> Result<(), Box<dyn std::error::Error>> {
    loop {
        if crossterm::event::poll(REFRESH_INTERVAL)? {
            if let crossterm::event::Event::Key(key) = crossterm::event::read()? {
                match key.code {
                    crossterm::event::KeyCode::Char('q') | crossterm::event::KeyCode::Esc => {
                        return Ok(());
                    }
                    _ => {}
                }
            }
        }

        let series = view.current();
        let state = status.borrow().clone();
        let area = terminal.size()?;
        terminal.draw(|f| {
            if let Err(e) = crate::ui::layout::render_layout(f, area, &series, style, &state) {
                log::error!("Layout render error: {}", e);
            }
        })?;
    }
}
