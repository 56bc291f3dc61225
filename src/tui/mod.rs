//! Terminal viewer
//!
//! Same loop on every tick: drain the packet feed, draw, then wait up to
//! 16ms for a key.

pub mod app;
pub mod ui;

use std::io::{self, Stdout};
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::{info, warn};

use crate::clipboard;
use crate::error::Result;

pub use app::{App, Outcome};

const POLL_INTERVAL: Duration = Duration::from_millis(16);

/// Run the viewer until the operator quits.
///
/// Must be called from within a tokio runtime; socket sources are spawned
/// onto it.
pub fn run(mut app: App) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let result = event_loop(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    app.session.disconnect();
    info!(packets = app.session.store().len(), "viewer closed");
    result
}

fn event_loop(terminal: &mut Terminal<CrosstermBackend<Stdout>>, app: &mut App) -> Result<()> {
    loop {
        app.tick();
        terminal.draw(|f| ui::draw(f, app))?;

        if !event::poll(POLL_INTERVAL)? {
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        match app.handle_key(key) {
            Outcome::Continue => {}
            Outcome::Quit => return Ok(()),
            Outcome::Clipboard(text) => {
                if let Err(e) = clipboard::write_osc52(terminal.backend_mut(), &text) {
                    warn!(error = %e, "clipboard write failed");
                    app.session
                        .set_status(crate::session::StatusLevel::Alert, e.to_string());
                }
            }
        }
    }
}
