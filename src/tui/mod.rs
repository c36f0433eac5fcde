mod app;
mod editor;
mod event;
mod view;

use std::io;
use std::sync::mpsc::{self, Sender};
use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self as ct_event, Event, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{self, EnterAlternateScreen, LeaveAlternateScreen};
use log::info;
use ratatui::prelude::*;
use rusqlite::Connection;

use crate::access::{AccessController, SessionStorage};
use crate::config::Config;
use crate::router::View;
use crate::subscribe::{self, Subscription};
use crate::suggest::Suggester;
use app::{App, Update};
use event::KeyAction;

/// How long to wait for a key before looking at subscription updates.
const TICK: Duration = Duration::from_millis(100);

type Term = Terminal<CrosstermBackend<io::Stdout>>;

/// The subscription backing the current view.
struct Feed {
    view: View,
    _subscription: Subscription,
}

fn subscribe(db_path: &str, view: &View, poll: Duration, tx: &Sender<Update>) -> Feed {
    let tx = tx.clone();
    let subscription = match view {
        View::Dashboard => subscribe::stream_all_lists(db_path, poll, move |lists| {
            let _ = tx.send(Update::Lists(lists));
        }),
        View::List(id) => {
            let list_id = id.clone();
            subscribe::stream_list(db_path, id, poll, move |list| {
                let _ = tx.send(Update::List(list_id.clone(), list));
            })
        }
    };
    Feed {
        view: view.clone(),
        _subscription: subscription,
    }
}

pub fn run<S: SessionStorage>(
    db_path: &str,
    conn: &Connection,
    access: AccessController<S>,
    fragment: &str,
    poll: Duration,
    config: &Config,
) -> Result<()> {
    let suggester = Suggester::from_config(&config.suggest);
    let mut app = App::new(
        access,
        fragment,
        suggester.is_some(),
        config.share.base_url.clone(),
    )?;
    info!("ui started at {:?} as {}", app.view, app.access());

    terminal::enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_loop(&mut terminal, &mut app, db_path, conn, poll, suggester.as_ref());

    terminal::disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;

    result
}

fn run_loop<S: SessionStorage>(
    terminal: &mut Term,
    app: &mut App<S>,
    db_path: &str,
    conn: &Connection,
    poll: Duration,
    suggester: Option<&Suggester>,
) -> Result<()> {
    let (tx, rx) = mpsc::channel();
    let mut feed = subscribe(db_path, &app.view, poll, &tx);

    loop {
        while let Ok(update) = rx.try_recv() {
            app.apply(update);
        }
        terminal.draw(|frame| view::render(frame, app))?;

        if ct_event::poll(TICK)? {
            if let Event::Key(key) = ct_event::read()? {
                if key.kind == KeyEventKind::Press {
                    match event::handle_key(app, key) {
                        KeyAction::Quit => return Ok(()),
                        KeyAction::CreateList => app.submit_new_list(conn),
                        KeyAction::SubmitForm => app.submit_form(conn),
                        KeyAction::Toggle => app.toggle_selected(conn),
                        KeyAction::Confirm => app.confirm(conn),
                        KeyAction::Suggest => {
                            if let Some(suggester) = suggester {
                                app.status = Some("Asking for suggestions...".into());
                                terminal.draw(|frame| view::render(frame, app))?;
                                // Blocks input until the request returns or times out.
                                app.suggest(conn, suggester);
                            }
                        }
                        KeyAction::OpenEditor => edit_description(terminal, app),
                        KeyAction::Continue => {}
                    }
                }
            }
        }

        if feed.view != app.view {
            feed = subscribe(db_path, &app.view, poll, &tx);
        }
    }
}

fn edit_description<S: SessionStorage>(terminal: &mut Term, app: &mut App<S>) {
    let Some(form) = app.form.as_mut() else {
        return;
    };
    match editor::open_editor(terminal, &form.description) {
        Ok(content) => {
            form.description = content.trim_end().to_string();
            form.error = None;
        }
        Err(e) => form.error = Some(e.to_string()),
    }
}
