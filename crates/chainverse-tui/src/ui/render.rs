use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use chainverse_core::utils::truncate;

use crate::app::{App, AppState, Screen, UploadFocus};

use super::styles;

const APP_TITLE: &str = "Chainverse Objects";

/// Visible width of the upload form's text fields.
const FIELD_WIDTH: usize = 36;

pub fn render(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Title bar
            Constraint::Min(8),    // Main content
            Constraint::Length(2), // Status bar
        ])
        .split(frame.area());

    render_title_bar(frame, app, chunks[0]);
    render_main_content(frame, app, chunks[1]);
    render_status_bar(frame, app, chunks[2]);

    // Render overlays
    match app.state {
        AppState::ShowingHelp => render_help_overlay(frame),
        AppState::AwaitingLogin => render_login_overlay(frame, app),
        AppState::ShowingNotice => render_notice_overlay(frame, app),
        AppState::ConfirmingQuit => render_quit_overlay(frame),
        AppState::Normal | AppState::Quitting => {}
    }
}

fn render_title_bar(frame: &mut Frame, app: &App, area: Rect) {
    let title = format!("  {}", APP_TITLE);

    let right: Vec<Span> = match app.screen() {
        Screen::Loading => vec![],
        Screen::LoginPrompt => vec![Span::styled(
            "[l] Login with Internet Identity ",
            styles::help_key_style(),
        )],
        Screen::UploadForm => vec![
            Span::styled(app.welcome_text().unwrap_or_default(), styles::success_style()),
            Span::styled("  [o] Logout ", styles::help_key_style()),
        ],
    };
    let right_len: usize = right.iter().map(|s| s.content.chars().count()).sum();

    let mut spans = vec![Span::styled(title.clone(), styles::title_style())];
    spans.push(Span::raw(" ".repeat(
        (area.width as usize).saturating_sub(title.chars().count() + right_len),
    )));
    spans.extend(right);

    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(styles::muted_style());

    let paragraph = Paragraph::new(Line::from(spans)).block(block);
    frame.render_widget(paragraph, area);
}

fn render_main_content(frame: &mut Frame, app: &App, area: Rect) {
    match app.screen() {
        Screen::Loading => {
            let paragraph = Paragraph::new(Line::from(Span::styled("Loading...", styles::muted_style())))
                .alignment(Alignment::Center);
            frame.render_widget(paragraph, centered_rect_fixed(area.width, 1, area));
        }
        Screen::LoginPrompt => {
            let lines = vec![
                Line::from(Span::styled("Please login to mint NFTs", styles::highlight_style())),
                Line::from(""),
                Line::from(vec![
                    Span::styled("Press ", styles::muted_style()),
                    Span::styled("l", styles::help_key_style()),
                    Span::styled(" to login with Internet Identity", styles::muted_style()),
                ]),
            ];
            let paragraph = Paragraph::new(lines).alignment(Alignment::Center);
            frame.render_widget(paragraph, centered_rect_fixed(area.width, 3, area));
        }
        Screen::UploadForm => render_upload_form(frame, app, area),
    }
}

fn render_upload_form(frame: &mut Frame, app: &App, area: Rect) {
    let height = if app.upload_error.is_some() { 12 } else { 10 };
    let form_area = centered_rect_fixed(60, height, area);

    let field = |label: &str, value: &str, focus: UploadFocus| -> Line<'static> {
        let focused = app.form_active && app.upload_focus == focus;
        let style = if focused {
            styles::selected_style()
        } else {
            styles::field_style()
        };
        let cursor = if focused { "▌" } else { "" };
        // Show the tail of long values so the cursor stays visible
        let visible: String = {
            let count = value.chars().count();
            value.chars().skip(count.saturating_sub(FIELD_WIDTH - 1)).collect()
        };
        Line::from(vec![
            Span::styled(format!("  {:<13}[", label), styles::muted_style()),
            Span::styled(format!("{:<width$}", format!("{}{}", visible, cursor), width = FIELD_WIDTH), style),
            Span::styled("]", styles::muted_style()),
        ])
    };

    let mut lines = vec![
        Line::from(""),
        field("Name:", &app.upload_name, UploadFocus::Name),
        field("Description:", &app.upload_description, UploadFocus::Description),
        field("File:", &app.upload_path, UploadFocus::File),
        Line::from(""),
    ];

    let button_focused = app.form_active && app.upload_focus == UploadFocus::Button;
    let label = if app.minting {
        " Minting... "
    } else if button_focused {
        " ▶ Mint ◀ "
    } else {
        "   Mint   "
    };
    let button_style = if button_focused {
        styles::selected_style()
    } else {
        styles::field_style()
    };
    lines.push(Line::from(vec![
        Span::raw("                        ["),
        Span::styled(label, button_style),
        Span::raw("]"),
    ]));

    if let Some(ref error) = app.upload_error {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(format!("  {}", error), styles::error_style())));
    }

    let block = Block::default()
        .title(Span::styled(" Mint a Chainverse Object ", styles::title_style()))
        .borders(Borders::ALL)
        .border_style(styles::border_style(app.form_active));

    let paragraph = Paragraph::new(lines).block(block).wrap(Wrap { trim: false });
    frame.render_widget(paragraph, form_area);
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let shortcuts = match app.screen() {
        Screen::Loading => "[q]uit",
        Screen::LoginPrompt => "[l]ogin | [?] help | [q]uit",
        Screen::UploadForm if app.form_active => "Tab next field | Enter submit | Esc leave form",
        Screen::UploadForm => "[Enter] edit form | [o] logout | [?] help | [q]uit",
    };

    let left_text = match app.status_message {
        Some(ref msg) => format!(" {} ", truncate(msg, 60)),
        None => format!(" {} ", app.config.deployment.label()),
    };
    let right_text = format!(" {} ", shortcuts);

    let padding_len = (area.width as usize)
        .saturating_sub(left_text.chars().count())
        .saturating_sub(right_text.chars().count());
    let status_line = Line::from(vec![
        Span::styled(left_text, styles::muted_style()),
        Span::raw(" ".repeat(padding_len)),
        Span::styled(right_text, styles::muted_style()),
    ]);
    let paragraph = Paragraph::new(status_line).style(styles::status_bar_style());
    frame.render_widget(paragraph, area);
}

fn render_help_overlay(frame: &mut Frame) {
    let area = centered_rect_fixed(52, 17, frame.area());
    frame.render_widget(Clear, area);

    let version = env!("CARGO_PKG_VERSION");
    let key = |k: &'static str, desc: &'static str| {
        Line::from(vec![
            Span::styled(format!("  {:<10}", k), styles::help_key_style()),
            Span::styled(desc, styles::help_desc_style()),
        ])
    };

    let help_text = vec![
        Line::from(Span::styled(format!("  {}", APP_TITLE), styles::title_style())),
        Line::from(Span::styled(format!("  version {}", version), styles::muted_style())),
        Line::from(""),
        Line::from(Span::styled(" Session", styles::highlight_style())),
        key("l", "Login with Internet Identity"),
        key("o", "Logout"),
        Line::from(""),
        Line::from(Span::styled(" Upload form", styles::highlight_style())),
        key("Enter", "Edit form / next field / mint"),
        key("Tab ↑/↓", "Move between fields"),
        key("Esc", "Leave form"),
        Line::from(""),
        key("q", "Quit"),
        Line::from(""),
        Line::from(vec![
            Span::styled("       Press ", styles::muted_style()),
            Span::styled("?", styles::help_key_style()),
            Span::styled(" or ", styles::muted_style()),
            Span::styled("Esc", styles::help_key_style()),
            Span::styled(" to close", styles::muted_style()),
        ]),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true))
        .style(Style::default());

    frame.render_widget(Paragraph::new(help_text).block(block), area);
}

fn render_login_overlay(frame: &mut Frame, app: &App) {
    let area = centered_rect_fixed(72, 12, frame.area());
    frame.render_widget(Clear, area);

    let mut lines = vec![
        Line::from(Span::styled("  Login with Internet Identity", styles::title_style())),
        Line::from(""),
    ];

    match app.authorize_url {
        Some(ref url) => {
            lines.push(Line::from(Span::styled(
                "  Open this URL in your browser to continue:",
                styles::muted_style(),
            )));
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(format!("  {}", url), styles::highlight_style())));
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(
                "  Waiting for the identity provider...",
                styles::muted_style(),
            )));
        }
        None => {
            lines.push(Line::from(Span::styled(
                "  Contacting identity provider...",
                styles::muted_style(),
            )));
        }
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true))
        .style(Style::default());

    let paragraph = Paragraph::new(lines).block(block).wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
}

fn render_notice_overlay(frame: &mut Frame, app: &App) {
    let area = centered_rect_fixed(46, 7, frame.area());
    frame.render_widget(Clear, area);

    let message = app.notice.as_deref().unwrap_or_default();
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(format!("  {}", truncate(message, 40)), styles::error_style())),
        Line::from(""),
        Line::from(vec![
            Span::styled("  Press ", styles::muted_style()),
            Span::styled("[Enter]", styles::help_key_style()),
            Span::styled(" to continue", styles::muted_style()),
        ]),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true))
        .style(Style::default());

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

/// Create a centered rectangle with fixed dimensions
fn centered_rect_fixed(width: u16, height: u16, r: Rect) -> Rect {
    let x = r.x + (r.width.saturating_sub(width)) / 2;
    let y = r.y + (r.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width.min(r.width), height.min(r.height))
}

fn render_quit_overlay(frame: &mut Frame) {
    let area = centered_rect_fixed(46, 7, frame.area());
    frame.render_widget(Clear, area);

    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            "   Are you sure you want to quit?",
            styles::highlight_style(),
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled("   Press ", styles::muted_style()),
            Span::styled("[Y]", styles::help_key_style()),
            Span::styled(" to quit, ", styles::muted_style()),
            Span::styled("[N]", styles::help_key_style()),
            Span::styled(" to cancel", styles::muted_style()),
        ]),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true))
        .style(Style::default());

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_centered_rect_fixed() {
        let outer = Rect::new(0, 0, 100, 40);
        assert_eq!(centered_rect_fixed(40, 10, outer), Rect::new(30, 15, 40, 10));
        // Clamped to the outer area
        assert_eq!(centered_rect_fixed(200, 50, outer), Rect::new(0, 0, 100, 40));
    }
}
