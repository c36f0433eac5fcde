use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use super::app::{App, FormField, Mode};
use crate::access::SessionStorage;
use crate::router::View;

/// Result of handling a key press. Everything that touches the store is left
/// to the event loop.
#[derive(Debug, PartialEq, Eq)]
pub enum KeyAction {
    Quit,
    CreateList,
    SubmitForm,
    OpenEditor,
    Toggle,
    Confirm,
    Suggest,
    Continue,
}

pub fn handle_key<S: SessionStorage>(app: &mut App<S>, key: KeyEvent) -> KeyAction {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return KeyAction::Quit;
    }
    match app.mode {
        Mode::NewList => handle_title(app, key),
        Mode::TaskForm => handle_form(app, key),
        Mode::Confirm(_) => match key.code {
            KeyCode::Char('y') | KeyCode::Enter => KeyAction::Confirm,
            _ => {
                app.cancel();
                KeyAction::Continue
            }
        },
        Mode::Help => {
            if matches!(key.code, KeyCode::Char('?') | KeyCode::Esc | KeyCode::Char('q')) {
                app.toggle_help();
            }
            KeyAction::Continue
        }
        Mode::Normal => {
            app.clear_messages();
            handle_normal(app, key)
        }
    }
}

fn handle_normal<S: SessionStorage>(app: &mut App<S>, key: KeyEvent) -> KeyAction {
    match key.code {
        KeyCode::Char('q') => return KeyAction::Quit,
        KeyCode::Char('j') | KeyCode::Down => app.move_down(),
        KeyCode::Char('k') | KeyCode::Up => app.move_up(),
        KeyCode::Char('?') => app.toggle_help(),
        _ => {
            return match app.view {
                View::Dashboard => handle_dashboard(app, key),
                View::List(_) => handle_list(app, key),
            }
        }
    }
    KeyAction::Continue
}

fn handle_dashboard<S: SessionStorage>(app: &mut App<S>, key: KeyEvent) -> KeyAction {
    match key.code {
        KeyCode::Esc => return KeyAction::Quit,
        KeyCode::Enter | KeyCode::Char('l') => app.open_selected(),
        KeyCode::Char('n') => app.start_new_list(),
        KeyCode::Char('d') => app.request_delete(),
        _ => {}
    }
    KeyAction::Continue
}

fn handle_list<S: SessionStorage>(app: &mut App<S>, key: KeyEvent) -> KeyAction {
    match key.code {
        KeyCode::Esc | KeyCode::Backspace | KeyCode::Char('h') => app.back(),
        KeyCode::Char('a') => app.start_add(),
        KeyCode::Char('e') => app.start_edit(),
        KeyCode::Char(' ') | KeyCode::Char('x') => return KeyAction::Toggle,
        KeyCode::Char('d') => app.request_delete(),
        KeyCode::Char('s') => app.share(),
        KeyCode::Char('g') if app.suggest_available() => return KeyAction::Suggest,
        _ => {}
    }
    KeyAction::Continue
}

fn handle_title<S: SessionStorage>(app: &mut App<S>, key: KeyEvent) -> KeyAction {
    match key.code {
        KeyCode::Esc => app.cancel(),
        KeyCode::Enter => return KeyAction::CreateList,
        KeyCode::Backspace => {
            app.title_input.pop();
            app.error = None;
        }
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.title_input.clear();
        }
        KeyCode::Char(c) => {
            app.title_input.push(c);
            app.error = None;
        }
        _ => {}
    }
    KeyAction::Continue
}

fn handle_form<S: SessionStorage>(app: &mut App<S>, key: KeyEvent) -> KeyAction {
    if key.code == KeyCode::Esc {
        app.cancel();
        return KeyAction::Continue;
    }
    if key.code == KeyCode::Enter {
        return KeyAction::SubmitForm;
    }
    let Some(form) = app.form.as_mut() else {
        return KeyAction::Continue;
    };
    match key.code {
        KeyCode::Tab => form.next_field(),
        KeyCode::BackTab => form.prev_field(),
        KeyCode::Backspace => {
            form.focused_buf_mut().pop();
            form.error = None;
        }
        KeyCode::Char(c) if key.modifiers.contains(KeyModifiers::CONTROL) => match c {
            'e' if form.focused == FormField::Description => return KeyAction::OpenEditor,
            'u' => {
                form.focused_buf_mut().clear();
                form.error = None;
            }
            _ => {}
        },
        KeyCode::Char(c) => {
            form.focused_buf_mut().push(c);
            form.error = None;
        }
        _ => {}
    }
    KeyAction::Continue
}
