use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use parlor_core::View;
use ratatui::layout::Rect;

use crate::app::App;
use crate::tui::AppEvent;

pub fn handle_event(app: &mut App, event: AppEvent) {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Resize(_, _) => {}
        AppEvent::Tick => app.tick_animation(),
        AppEvent::Api(outcome) => app.handle_outcome(outcome),
    }
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any view
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    match app.state.view() {
        View::Login => handle_login(app, key),
        View::Register => handle_register(app, key),
        View::Chat => handle_chat(app, key),
    }
}

fn handle_login(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('r') if key.modifiers.contains(KeyModifiers::CONTROL) => app.show_register(),
        KeyCode::Esc => app.should_quit = true,
        KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down => app.toggle_field(),
        KeyCode::Enter => app.submit(),
        _ => handle_editing(app, key),
    }
}

fn handle_register(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('l') if key.modifiers.contains(KeyModifiers::CONTROL) => app.show_login(),
        KeyCode::Esc => app.show_login(),
        KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down => app.toggle_field(),
        KeyCode::Enter => app.submit(),
        _ => handle_editing(app, key),
    }
}

fn handle_chat(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('x') if key.modifiers.contains(KeyModifiers::CONTROL) => app.logout(),
        KeyCode::Enter => app.submit(),
        KeyCode::PageDown => app.scroll_down(10),
        KeyCode::PageUp => app.scroll_up(10),
        KeyCode::Down if key.modifiers.contains(KeyModifiers::CONTROL) => app.scroll_down(1),
        KeyCode::Up if key.modifiers.contains(KeyModifiers::CONTROL) => app.scroll_up(1),
        _ => handle_editing(app, key),
    }
}

/// Line editing shared by every text input.
fn handle_editing(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Backspace => app.backspace(),
        KeyCode::Delete => app.delete(),
        KeyCode::Left => app.cursor_left(),
        KeyCode::Right => app.cursor_right(),
        KeyCode::Home => app.cursor_home(),
        KeyCode::End => app.cursor_end(),
        KeyCode::Char(c)
            if !key.modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) =>
        {
            app.insert_char(c)
        }
        _ => {}
    }
}

/// Check if a point is within a rectangle
fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    if app.state.view() != View::Chat {
        return;
    }

    let in_chat = app
        .chat_area
        .map(|r| point_in_rect(mouse.column, mouse.row, r))
        .unwrap_or(false);
    if !in_chat {
        return;
    }

    match mouse.kind {
        MouseEventKind::ScrollDown => app.scroll_down(3),
        MouseEventKind::ScrollUp => app.scroll_up(3),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parlor_core::{ApiClient, ChatBackend};
    use std::sync::Arc;
    use tokio::sync::mpsc;

    fn app() -> App {
        let (tx, _rx) = mpsc::unbounded_channel();
        let backend: Arc<dyn ChatBackend> = Arc::new(ApiClient::new("http://127.0.0.1:9"));
        App::new(backend, tx)
    }

    fn press(app: &mut App, code: KeyCode) {
        handle_event(app, AppEvent::Key(KeyEvent::new(code, KeyModifiers::NONE)));
    }

    fn ctrl(app: &mut App, c: char) {
        handle_event(app, AppEvent::Key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)));
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            press(app, KeyCode::Char(c));
        }
    }

    #[test]
    fn test_typing_fills_login_form() {
        let mut app = app();
        type_text(&mut app, "al");
        press(&mut app, KeyCode::Tab);
        type_text(&mut app, "secret");

        assert_eq!(app.state.login_form.username, "al");
        assert_eq!(app.state.login_form.password, "secret");
    }

    #[test]
    fn test_ctrl_r_and_esc_switch_views() {
        let mut app = app();
        type_text(&mut app, "al");

        ctrl(&mut app, 'r');
        assert_eq!(app.state.view(), View::Register);
        assert!(app.state.login_form.username.is_empty());

        press(&mut app, KeyCode::Esc);
        assert_eq!(app.state.view(), View::Login);
        assert!(!app.should_quit);

        press(&mut app, KeyCode::Esc);
        assert!(app.should_quit);
    }

    #[test]
    fn test_ctrl_chars_are_not_typed() {
        let mut app = app();
        ctrl(&mut app, 'x');
        assert!(app.state.login_form.username.is_empty());
    }

    #[test]
    fn test_enter_with_short_password_does_nothing() {
        let mut app = app();
        ctrl(&mut app, 'r');
        type_text(&mut app, "al");
        press(&mut app, KeyCode::Tab);
        type_text(&mut app, "abc");
        press(&mut app, KeyCode::Enter);

        assert!(!app.state.is_loading());
        assert_eq!(app.state.view(), View::Register);
    }

    #[test]
    fn test_ctrl_c_quits_anywhere() {
        let mut app = app();
        ctrl(&mut app, 'r');
        ctrl(&mut app, 'c');
        assert!(app.should_quit);
    }
}
