use std::sync::Arc;

use parlor_core::{ChatBackend, ClientState, Command, Outcome, View};
use ratatui::layout::Rect;
use tokio::sync::mpsc::UnboundedSender;

use crate::tui::AppEvent;

/// Which field of the login/register form has the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormField {
    #[default]
    Username,
    Password,
}

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub struct App {
    pub should_quit: bool,
    pub state: ClientState,

    // Editing state
    pub focus: FormField,
    pub cursor: usize, // cursor position (in chars) in the active input

    // Chat view
    pub chat_scroll: u16,
    pub chat_max_scroll: u16, // updated during render
    pub chat_area: Option<Rect>, // for mouse hit-testing

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation

    backend: Arc<dyn ChatBackend>,
    events: UnboundedSender<AppEvent>,
}

impl App {
    pub fn new(backend: Arc<dyn ChatBackend>, events: UnboundedSender<AppEvent>) -> Self {
        Self {
            should_quit: false,
            state: ClientState::new(),
            focus: FormField::default(),
            cursor: 0,
            chat_scroll: 0,
            chat_max_scroll: 0,
            chat_area: None,
            animation_frame: 0,
            backend,
            events,
        }
    }

    /// The text field keys are typed into, if any.
    ///
    /// The chat input is locked while a request is in flight.
    pub fn active_input(&self) -> Option<&String> {
        match (self.state.view(), self.focus) {
            (View::Login, FormField::Username) => Some(&self.state.login_form.username),
            (View::Login, FormField::Password) => Some(&self.state.login_form.password),
            (View::Register, FormField::Username) => Some(&self.state.register_form.username),
            (View::Register, FormField::Password) => Some(&self.state.register_form.password),
            (View::Chat, _) if !self.state.is_loading() => Some(&self.state.draft),
            (View::Chat, _) => None,
        }
    }

    fn active_input_mut(&mut self) -> Option<&mut String> {
        let loading = self.state.is_loading();
        match (self.state.view(), self.focus) {
            (View::Login, FormField::Username) => Some(&mut self.state.login_form.username),
            (View::Login, FormField::Password) => Some(&mut self.state.login_form.password),
            (View::Register, FormField::Username) => Some(&mut self.state.register_form.username),
            (View::Register, FormField::Password) => Some(&mut self.state.register_form.password),
            (View::Chat, _) if !loading => Some(&mut self.state.draft),
            (View::Chat, _) => None,
        }
    }

    fn active_len(&self) -> usize {
        self.active_input().map(|s| s.chars().count()).unwrap_or(0)
    }

    // Line editing

    pub fn insert_char(&mut self, c: char) {
        let cursor = self.cursor;
        if let Some(input) = self.active_input_mut() {
            let byte_pos = char_to_byte_index(input, cursor);
            input.insert(byte_pos, c);
            self.cursor += 1;
        }
    }

    pub fn backspace(&mut self) {
        if self.cursor == 0 {
            return;
        }
        let cursor = self.cursor;
        if let Some(input) = self.active_input_mut() {
            let byte_pos = char_to_byte_index(input, cursor - 1);
            input.remove(byte_pos);
            self.cursor -= 1;
        }
    }

    pub fn delete(&mut self) {
        let cursor = self.cursor;
        if let Some(input) = self.active_input_mut() {
            if cursor < input.chars().count() {
                let byte_pos = char_to_byte_index(input, cursor);
                input.remove(byte_pos);
            }
        }
    }

    pub fn cursor_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn cursor_right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.active_len());
    }

    pub fn cursor_home(&mut self) {
        self.cursor = 0;
    }

    pub fn cursor_end(&mut self) {
        self.cursor = self.active_len();
    }

    /// Move between the username and password fields.
    pub fn toggle_field(&mut self) {
        self.focus = match self.focus {
            FormField::Username => FormField::Password,
            FormField::Password => FormField::Username,
        };
        self.cursor_end();
    }

    fn reset_editing(&mut self) {
        self.focus = FormField::Username;
        self.cursor = 0;
        self.chat_scroll = 0;
    }

    // View switching

    pub fn show_register(&mut self) {
        self.state.show_register();
        self.reset_editing();
    }

    pub fn show_login(&mut self) {
        self.state.show_login();
        self.reset_editing();
    }

    pub fn logout(&mut self) {
        self.state.logout();
        self.reset_editing();
    }

    /// Submit whatever the current view offers: login, register or send.
    pub fn submit(&mut self) {
        let command = match self.state.view() {
            View::Login => self.state.begin_login(),
            View::Register => self.state.begin_register(),
            View::Chat => self.state.begin_send(),
        };

        if let Some(command) = command {
            if let Command::SendMessage { .. } = command {
                // Draft was taken; newest entry sits at the top
                self.cursor = 0;
                self.chat_scroll = 0;
            }
            self.dispatch(command);
        }
    }

    /// Fold a finished request into the state and issue any follow-up.
    pub fn handle_outcome(&mut self, outcome: Outcome) {
        let before = self.state.view();
        let follow_up = self.state.apply(outcome);
        if self.state.view() != before {
            self.reset_editing();
        }
        if let Some(command) = follow_up {
            self.dispatch(command);
        }
    }

    /// Run a request in the background; its outcome comes back as an
    /// `AppEvent::Api`.
    fn dispatch(&self, command: Command) {
        tracing::debug!(command = command.name(), generation = command.generation(), "dispatching request");
        let backend = Arc::clone(&self.backend);
        let events = self.events.clone();
        tokio::spawn(async move {
            let outcome = command.execute(backend.as_ref()).await;
            // Receiver is gone only during shutdown
            let _ = events.send(AppEvent::Api(outcome));
        });
    }

    // Chat scrolling

    pub fn scroll_down(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_add(lines).min(self.chat_max_scroll);
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_sub(lines);
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.state.is_loading() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parlor_core::{ClientError, Conversation, Credentials, EntryId, Identifier, Session};
    use tokio::sync::mpsc;

    /// Backend that answers instantly from fixed data.
    struct FakeBackend;

    #[async_trait]
    impl ChatBackend for FakeBackend {
        async fn login(&self, credentials: &Credentials) -> Result<Session, ClientError> {
            Ok(Session {
                username: credentials.username.clone(),
                user_id: Identifier::Number(7),
            })
        }

        async fn register(&self, _credentials: &Credentials) -> Result<Session, ClientError> {
            Err(ClientError::Server("Username already exists".to_string()))
        }

        async fn send_message(&self, _username: &str, message: &str) -> Result<Conversation, ClientError> {
            Ok(Conversation {
                id: EntryId::Confirmed(Identifier::Number(1)),
                user_message: message.to_string(),
                ai_response: "Hi!".to_string(),
                timestamp: "2024-05-01T09:00:00".to_string(),
                loading: false,
            })
        }

        async fn history(&self, _username: &str) -> Result<Vec<Conversation>, ClientError> {
            Ok(Vec::new())
        }
    }

    fn app() -> (App, mpsc::UnboundedReceiver<AppEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (App::new(Arc::new(FakeBackend), tx), rx)
    }

    async fn next_outcome(rx: &mut mpsc::UnboundedReceiver<AppEvent>) -> Outcome {
        match rx.recv().await {
            Some(AppEvent::Api(outcome)) => outcome,
            other => panic!("expected an API outcome, got {:?}", other),
        }
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            app.insert_char(c);
        }
    }

    #[test]
    fn test_editing_is_utf8_safe() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut app = App::new(Arc::new(FakeBackend), tx);

        type_text(&mut app, "añb");
        app.cursor_left();
        app.backspace();
        assert_eq!(app.state.login_form.username, "ab");

        app.cursor_home();
        app.delete();
        assert_eq!(app.state.login_form.username, "b");

        app.cursor_end();
        assert_eq!(app.cursor, 1);
    }

    #[test]
    fn test_toggle_field_switches_input() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut app = App::new(Arc::new(FakeBackend), tx);

        type_text(&mut app, "al");
        app.toggle_field();
        type_text(&mut app, "pw");

        assert_eq!(app.state.login_form.username, "al");
        assert_eq!(app.state.login_form.password, "pw");
    }

    #[tokio::test]
    async fn test_login_round_trip_then_history() {
        let (mut app, mut rx) = app();
        type_text(&mut app, "al");
        app.submit();
        assert!(app.state.is_loading());

        let outcome = next_outcome(&mut rx).await;
        app.handle_outcome(outcome);
        assert_eq!(app.state.view(), View::Chat);
        assert_eq!(app.cursor, 0);

        // History load follows the login
        match next_outcome(&mut rx).await {
            Outcome::HistoryLoaded { username, .. } => assert_eq!(username, "al"),
            other => panic!("expected history, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_send_message_confirms_placeholder() {
        let (mut app, mut rx) = app();
        app.submit();
        let outcome = next_outcome(&mut rx).await;
        app.handle_outcome(outcome);
        let history = next_outcome(&mut rx).await;
        app.handle_outcome(history);

        type_text(&mut app, "hello");
        app.submit();
        assert!(app.state.draft.is_empty());
        assert!(app.state.conversations()[0].loading);

        // Input is locked while the message is in flight
        app.insert_char('x');
        assert!(app.state.draft.is_empty());

        let outcome = next_outcome(&mut rx).await;
        app.handle_outcome(outcome);
        assert_eq!(app.state.conversations().len(), 1);
        assert_eq!(app.state.conversations()[0].ai_response, "Hi!");
    }

    #[tokio::test]
    async fn test_register_error_keeps_view() {
        let (mut app, mut rx) = app();
        app.show_register();
        type_text(&mut app, "al");
        app.toggle_field();
        type_text(&mut app, "abcd");
        app.submit();

        let outcome = next_outcome(&mut rx).await;
        app.handle_outcome(outcome);
        assert_eq!(app.state.view(), View::Register);
        assert_eq!(app.state.error(), Some("Username already exists"));
    }
}
