use parlor_core::{View, MIN_PASSWORD_LEN};
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};
use crate::app::{App, FormField};

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, body, footer
    let [header_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);

    match app.state.view() {
        View::Login | View::Register => render_auth_screen(app, frame, body_area),
        View::Chat => render_chat_screen(app, frame, body_area),
    }

    render_footer(app, frame, footer_area);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let mut spans = vec![Span::styled(" Parlor ", Style::default().fg(Color::Cyan).bold())];

    if let Some(session) = app.state.session() {
        spans.push(Span::styled(
            format!(" Welcome, {}! ", session.username),
            Style::default().fg(Color::White),
        ));
    }

    spans.push(Span::styled(
        format!("v{}", env!("CARGO_PKG_VERSION")),
        Style::default().fg(Color::DarkGray),
    ));

    let header = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let mode_style = Style::default().bg(Color::Blue).fg(Color::White);

    let mode_text = match app.state.view() {
        View::Login => " LOGIN ",
        View::Register => " REGISTER ",
        View::Chat => " CHAT ",
    };

    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let keys: &[(&str, &str)] = match app.state.view() {
        View::Login => &[
            (" Tab ", " field "),
            (" Enter ", " login "),
            (" ^R ", " register "),
            (" Esc ", " quit "),
        ],
        View::Register => &[
            (" Tab ", " field "),
            (" Enter ", " register "),
            (" Esc ", " back to login "),
        ],
        View::Chat => &[
            (" Enter ", " send "),
            (" PgUp/PgDn ", " scroll "),
            (" ^X ", " logout "),
            (" ^C ", " quit "),
        ],
    };

    let mut spans = vec![Span::styled(mode_text, mode_style), Span::raw(" ")];
    for (key, label) in keys {
        spans.push(Span::styled(*key, key_style));
        spans.push(Span::styled(*label, label_style));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

/// Single-line text input with horizontal scrolling to keep the cursor visible.
fn render_input(
    frame: &mut Frame,
    area: Rect,
    block: Block,
    text: &str,
    style: Style,
    cursor: Option<usize>,
) {
    // Inner width = total width - 2 (for borders)
    let inner_width = area.width.saturating_sub(2) as usize;
    let cursor_pos = cursor.unwrap_or(0);

    let scroll_offset = if inner_width == 0 {
        0
    } else if cursor_pos >= inner_width {
        cursor_pos - inner_width + 1
    } else {
        0
    };

    let visible_text: String = text.chars().skip(scroll_offset).take(inner_width).collect();
    frame.render_widget(Paragraph::new(visible_text).style(style).block(block), area);

    if let Some(pos) = cursor {
        let cursor_x = (pos - scroll_offset) as u16;
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}

fn render_auth_screen(app: &mut App, frame: &mut Frame, area: Rect) {
    let registering = app.state.view() == View::Register;
    let accent = if registering { Color::Green } else { Color::Blue };

    let (title, subtitle, password_label, form) = if registering {
        (
            "Register",
            "Create an account to start chatting",
            format!("Password (min {} characters)", MIN_PASSWORD_LEN),
            &app.state.register_form,
        )
    } else {
        (
            "Login",
            "Sign in to start chatting with AI",
            "Password".to_string(),
            &app.state.login_form,
        )
    };

    let error_height = if app.state.error().is_some() { 3 } else { 0 };

    // Calculate popup size and position (centered)
    let popup_width = 60.min(area.width.saturating_sub(4));
    let popup_height = (17 + error_height).min(area.height);
    let popup_x = area.x + (area.width.saturating_sub(popup_width)) / 2;
    let popup_y = area.y + (area.height.saturating_sub(popup_height)) / 2;
    let popup_area = Rect::new(popup_x, popup_y, popup_width, popup_height);

    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(accent));
    let inner = block.inner(popup_area);
    frame.render_widget(block, popup_area);

    let [heading_area, error_area, user_label, user_area, pass_label, pass_area, _, button_area, _, switch_area] =
        Layout::vertical([
            Constraint::Length(3),
            Constraint::Length(error_height),
            Constraint::Length(1),
            Constraint::Length(3),
            Constraint::Length(1),
            Constraint::Length(3),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .areas(inner);

    let heading = Text::from(vec![
        Line::from(Span::styled(title, Style::default().fg(accent).bold())),
        Line::from(Span::styled(subtitle, Style::default().fg(Color::DarkGray))),
    ])
    .alignment(Alignment::Center);
    frame.render_widget(Paragraph::new(heading), heading_area);

    if let Some(error) = app.state.error() {
        render_error(frame, error_area, error);
    }

    let label_style = Style::default().fg(Color::Gray);
    frame.render_widget(Paragraph::new("Username").style(label_style), user_label);
    frame.render_widget(Paragraph::new(password_label).style(label_style), pass_label);

    let field_block = |focused: bool| {
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(if focused { Color::Yellow } else { Color::DarkGray }))
    };

    let username_focused = app.focus == FormField::Username;
    render_input(
        frame,
        user_area,
        field_block(username_focused),
        &form.username,
        Style::default().fg(Color::Cyan),
        username_focused.then_some(app.cursor),
    );

    let masked = "*".repeat(form.password.chars().count());
    render_input(
        frame,
        pass_area,
        field_block(!username_focused),
        &masked,
        Style::default().fg(Color::Cyan),
        (!username_focused).then_some(app.cursor),
    );

    let loading = app.state.is_loading();
    let (label, enabled) = if registering {
        let label = if loading { "Creating account..." } else { "[ Register ]" };
        (label, app.state.can_register())
    } else {
        let label = if loading { "Logging in..." } else { "[ Login ]" };
        (label, app.state.can_login())
    };
    let button_style = if enabled {
        Style::default().fg(Color::White).bg(accent).bold()
    } else {
        Style::default().fg(Color::DarkGray)
    };
    frame.render_widget(
        Paragraph::new(Span::styled(label, button_style)).alignment(Alignment::Center),
        button_area,
    );

    let switch_hint = if registering {
        "Already have an account? Esc to log in"
    } else {
        "Don't have an account? Ctrl-R to register"
    };
    frame.render_widget(
        Paragraph::new(Span::styled(switch_hint, Style::default().fg(accent)))
            .alignment(Alignment::Center),
        switch_area,
    );
}

fn render_error(frame: &mut Frame, area: Rect, error: &str) {
    let banner = Paragraph::new(error.to_string())
        .style(Style::default().fg(Color::Red))
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Red)),
        );
    frame.render_widget(banner, area);
}

fn render_chat_screen(app: &mut App, frame: &mut Frame, area: Rect) {
    let error_height = if app.state.error().is_some() { 3 } else { 0 };

    let [error_area, chat_area, input_area] = Layout::vertical([
        Constraint::Length(error_height),
        Constraint::Min(0),
        Constraint::Length(3),
    ])
    .areas(area);

    if let Some(error) = app.state.error() {
        render_error(frame, error_area, error);
    }

    app.chat_area = Some(chat_area);

    let chat_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(" AI Chat ");

    let inner_height = chat_area.height.saturating_sub(2);
    let wrap_width = chat_area.width.saturating_sub(2).max(1) as usize;

    if app.state.conversations().is_empty() {
        app.chat_max_scroll = 0;
        app.chat_scroll = 0;
        let empty = Paragraph::new(Span::styled(
            "No conversations yet. Start chatting with AI!",
            Style::default().fg(Color::DarkGray),
        ))
        .alignment(Alignment::Center)
        .block(chat_block);
        frame.render_widget(empty, chat_area);
    } else {
        let mut lines: Vec<Line> = Vec::new();

        for conv in app.state.conversations() {
            lines.push(
                Line::from(vec![
                    Span::styled(
                        conv.display_time(),
                        Style::default().fg(Color::DarkGray),
                    ),
                    Span::styled(
                        " You",
                        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                    ),
                ])
                .alignment(Alignment::Right),
            );
            for line in conv.user_message.lines() {
                lines.push(Line::from(line.to_string()).alignment(Alignment::Right));
            }

            lines.push(Line::from(Span::styled(
                "AI:",
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            )));
            if conv.loading {
                // Animated ellipsis: cycles through ".", "..", "..."
                let dots = ".".repeat((app.animation_frame as usize) + 1);
                lines.push(Line::from(Span::styled(
                    format!("Thinking{}", dots),
                    Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
                )));
            } else {
                for line in conv.ai_response.lines() {
                    lines.push(Line::from(line.to_string()));
                }
            }
            lines.push(Line::default());
        }

        // Estimate wrapped height for scroll bounds
        let total_lines: usize = lines
            .iter()
            .map(|line| line.width() / wrap_width + 1)
            .sum();
        app.chat_max_scroll = (total_lines as u16).saturating_sub(inner_height);
        app.chat_scroll = app.chat_scroll.min(app.chat_max_scroll);

        let chat = Paragraph::new(Text::from(lines))
            .block(chat_block)
            .wrap(Wrap { trim: false })
            .scroll((app.chat_scroll, 0));
        frame.render_widget(chat, chat_area);
    }

    // Message input, dimmed while a request is in flight
    let loading = app.state.is_loading();
    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(if loading { Color::DarkGray } else { Color::Yellow }))
        .title(" Message ");

    if app.state.draft.is_empty() {
        frame.render_widget(
            Paragraph::new(Span::styled(
                "Type your message...",
                Style::default().fg(Color::DarkGray),
            ))
            .block(input_block),
            input_area,
        );
        if !loading {
            frame.set_cursor_position((input_area.x + 1, input_area.y + 1));
        }
    } else {
        let style = if loading {
            Style::default().fg(Color::DarkGray)
        } else {
            Style::default().fg(Color::Cyan)
        };
        render_input(
            frame,
            input_area,
            input_block,
            &app.state.draft,
            style,
            (!loading).then_some(app.cursor),
        );
    }
}
