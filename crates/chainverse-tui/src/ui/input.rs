//! Keyboard input handling for the TUI.
//!
//! Overlays take every key while they are shown; otherwise keys go to
//! whichever screen the session currently selects.

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};

use crate::app::{App, AppState, Screen, UploadFocus};

/// Handle keyboard input. Returns true if the app should quit.
pub fn handle_input(app: &mut App, key: KeyEvent) -> Result<bool> {
    match app.state {
        AppState::ShowingHelp => {
            if matches!(key.code, KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('q')) {
                app.state = AppState::Normal;
            }
            return Ok(false);
        }
        AppState::ShowingNotice => {
            if matches!(key.code, KeyCode::Enter | KeyCode::Esc | KeyCode::Char(' ')) {
                app.dismiss_notice();
            }
            return Ok(false);
        }
        AppState::ConfirmingQuit => {
            match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                    app.state = AppState::Quitting;
                    return Ok(true);
                }
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                    app.state = AppState::Normal;
                }
                _ => {}
            }
            return Ok(false);
        }
        // The provider hand-off cannot be cancelled from here, only abandoned
        AppState::AwaitingLogin => {
            if key.code == KeyCode::Char('q') {
                app.state = AppState::ConfirmingQuit;
            }
            return Ok(false);
        }
        AppState::Quitting => return Ok(true),
        AppState::Normal => {}
    }

    match app.screen() {
        Screen::Loading => {
            if key.code == KeyCode::Char('q') {
                app.state = AppState::ConfirmingQuit;
            }
        }
        Screen::LoginPrompt => match key.code {
            KeyCode::Char('l') | KeyCode::Enter => app.start_login(),
            KeyCode::Char('?') => app.state = AppState::ShowingHelp,
            KeyCode::Char('q') | KeyCode::Esc => app.state = AppState::ConfirmingQuit,
            _ => {}
        },
        Screen::UploadForm if app.form_active => handle_form_input(app, key),
        Screen::UploadForm => match key.code {
            KeyCode::Char('o') => app.start_logout(),
            KeyCode::Char('?') => app.state = AppState::ShowingHelp,
            KeyCode::Char('q') | KeyCode::Esc => app.state = AppState::ConfirmingQuit,
            KeyCode::Enter | KeyCode::Tab | KeyCode::Char('u') => {
                app.form_active = true;
                app.upload_focus = UploadFocus::Name;
            }
            _ => {}
        },
    }

    Ok(false)
}

fn handle_form_input(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.form_active = false;
        }
        KeyCode::Down | KeyCode::Tab => {
            app.upload_focus = app.upload_focus.next();
        }
        KeyCode::Up | KeyCode::BackTab => {
            app.upload_focus = app.upload_focus.prev();
        }
        KeyCode::Enter => match app.upload_focus {
            UploadFocus::Button => app.submit_upload(),
            focus => app.upload_focus = focus.next(),
        },
        KeyCode::Backspace => app.pop_upload_char(),
        KeyCode::Char(c) => app.push_upload_char(c),
        _ => {}
    }
}
