use std::{
    io,
    sync::Arc,
    time::Duration,
};

use crossterm::{
    event::{
        self,
        Event,
        KeyEventKind,
    },
    execute,
    terminal::{
        disable_raw_mode,
        enable_raw_mode,
        EnterAlternateScreen,
        LeaveAlternateScreen,
    },
};
use ratatui::{
    backend::{
        Backend,
        CrosstermBackend,
    },
    Terminal,
};
use tracing::info;

use crate::{
    core::{
        AnkimorphError,
        AppContext,
    },
    playback::PlaybackArbiter,
};

pub mod app;
pub mod config_page;
pub mod image;
pub mod input;
pub mod keys;
pub mod modal;
pub mod note_page;
pub mod query_page;
pub mod theme;

pub use app::{
    App,
    Page,
};

const TICK: Duration = Duration::from_millis(200);

/// Takes over the terminal until the user quits. The terminal is restored
/// even when the loop fails.
pub fn run(context: AppContext, arbiter: Option<Arc<PlaybackArbiter>>) -> Result<(), AnkimorphError> {
    let mut app = App::new(context, arbiter.clone())?;
    app.reload();

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;

    let res = run_app(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Some(arbiter) = arbiter {
        arbiter.stop();
    }
    info!("Session ended");
    res
}

fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<(), AnkimorphError> {
    while !app.should_quit() {
        app.tick();
        terminal.draw(|f| app.draw(f))?;
        if event::poll(TICK)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.handle_key(key);
                }
            }
        }
    }
    Ok(())
}
