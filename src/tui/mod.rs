mod app;
mod ui;

use crate::config::Config;
use anyhow::Result;
use app::{App, Mode, Update};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use std::io;
use std::path::PathBuf;
use std::time::Duration;

pub fn run(root: PathBuf, config: Config, globs: Vec<String>) -> Result<()> {
    // Index before taking over the terminal so errors print normally
    let mut app = App::new(root, config, globs)?;

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let result = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn run_app(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, app: &mut App) -> Result<()> {
    loop {
        terminal.draw(|f| ui::draw(f, app))?;

        // The "Refreshing..." / "Reindexing..." status is on screen by now
        if app.pending.is_some() {
            app.run_pending();
            continue;
        }

        if app.should_quit {
            return Ok(());
        }

        if !event::poll(Duration::from_millis(100))? {
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };
        // Windows reports both press and release
        if key.kind != KeyEventKind::Press {
            continue;
        }

        if key.modifiers == KeyModifiers::CONTROL && matches!(key.code, KeyCode::Char('c' | 'q')) {
            return Ok(());
        }

        if app.mode == Mode::Help {
            app.hide_help();
            continue;
        }

        match (key.modifiers, key.code) {
            (KeyModifiers::CONTROL, KeyCode::Char('o')) => app.undo(),
            (KeyModifiers::CONTROL, KeyCode::Char('i')) => app.redo(),
            (KeyModifiers::CONTROL, KeyCode::Char('d')) => app.select_page_down(),
            (KeyModifiers::CONTROL, KeyCode::Char('u')) => app.select_page_up(),
            (KeyModifiers::ALT, KeyCode::Left) => app.undo(),
            (KeyModifiers::ALT, KeyCode::Right) => app.redo(),
            (KeyModifiers::NONE | KeyModifiers::SHIFT, code) => match code {
                KeyCode::Down | KeyCode::Char('j') => app.select_next(),
                KeyCode::Up | KeyCode::Char('k') => app.select_prev(),
                KeyCode::PageDown => app.select_page_down(),
                KeyCode::PageUp => app.select_page_up(),
                KeyCode::Home | KeyCode::Char('g') => app.select_first(),
                KeyCode::End | KeyCode::Char('G') => app.select_last(),
                KeyCode::Enter | KeyCode::Right | KeyCode::Char('l') => app.enter(),
                KeyCode::Esc | KeyCode::Left | KeyCode::Char('h') => app.back(),
                KeyCode::Tab => app.redo(),
                KeyCode::Char('p') => app.toggle_pin(),
                KeyCode::Char('q') => return Ok(()),
                KeyCode::Char('?') | KeyCode::F(1) => app.show_help(),
                KeyCode::Char('r') => app.request(Update::Refresh),
                KeyCode::F(5) => app.request(Update::Reindex),
                _ => {}
            },
            _ => {}
        }
    }
}
