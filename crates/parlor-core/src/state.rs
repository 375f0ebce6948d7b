//! UI-agnostic client state
//!
//! `ClientState` holds everything the views render: the active view, the
//! session, both auth forms, the chat draft, the conversation list and the
//! loading/error flags. User actions go through `begin_*` methods, which
//! check preconditions, update the state optimistically and hand back the
//! [`Command`] to issue. Responses come back through [`ClientState::apply`].
//! Nothing here touches the network or the terminal.

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::command::{Command, Outcome};
use crate::error::ClientError;
use crate::model::{AuthForm, Conversation, EntryId, Session};

/// Registration is refused below this many characters.
pub const MIN_PASSWORD_LEN: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum View {
    #[default]
    Login,
    Register,
    Chat,
}

#[derive(Debug, Default)]
pub struct ClientState {
    pub login_form: AuthForm,
    pub register_form: AuthForm,
    /// Chat input line.
    pub draft: String,

    view: View,
    session: Option<Session>,
    /// Newest first.
    conversations: Vec<Conversation>,
    loading: bool,
    error: Option<String>,
    /// Bumped on logout; outcomes from an older generation are dropped.
    generation: u64,
}

impl ClientState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(&self) -> View {
        self.view
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn conversations(&self) -> &[Conversation] {
        &self.conversations
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    // View switching

    pub fn show_register(&mut self) {
        if self.view == View::Login {
            self.view = View::Register;
            self.reset_forms();
        }
    }

    pub fn show_login(&mut self) {
        if self.view == View::Register {
            self.view = View::Login;
            self.reset_forms();
        }
    }

    fn reset_forms(&mut self) {
        self.login_form.clear();
        self.register_form.clear();
        self.error = None;
    }

    // Preconditions, also used by the UI to render disabled controls

    pub fn can_login(&self) -> bool {
        self.view == View::Login && !self.loading
    }

    pub fn can_register(&self) -> bool {
        self.view == View::Register
            && !self.loading
            // Counted in characters, not bytes or UTF-16 units
            && self.register_form.password.chars().count() >= MIN_PASSWORD_LEN
    }

    pub fn can_send(&self) -> bool {
        self.view == View::Chat
            && self.session.is_some()
            && !self.loading
            && !self.draft.trim().is_empty()
    }

    // Operations

    pub fn begin_login(&mut self) -> Option<Command> {
        if !self.can_login() {
            return None;
        }
        self.loading = true;
        self.error = None;
        Some(Command::Login {
            generation: self.generation,
            credentials: self.login_form.credentials(),
        })
    }

    pub fn begin_register(&mut self) -> Option<Command> {
        if !self.can_register() {
            return None;
        }
        self.loading = true;
        self.error = None;
        Some(Command::Register {
            generation: self.generation,
            credentials: self.register_form.credentials(),
        })
    }

    /// Put a placeholder for the draft at the head of the list, clear the
    /// draft, and return the request that will confirm it.
    pub fn begin_send(&mut self) -> Option<Command> {
        if !self.can_send() {
            return None;
        }
        let username = self.session.as_ref()?.username.clone();

        let key = Uuid::new_v4();
        let message = std::mem::take(&mut self.draft);
        self.conversations.insert(0, Conversation::pending(key, &message));
        self.loading = true;
        self.error = None;

        Some(Command::SendMessage {
            generation: self.generation,
            key,
            username,
            message,
        })
    }

    pub fn load_history(&self, username: &str) -> Command {
        Command::LoadHistory {
            generation: self.generation,
            username: username.to_string(),
        }
    }

    pub fn logout(&mut self) {
        if let Some(session) = self.session.take() {
            info!(username = %session.username, "logged out");
        }
        self.conversations.clear();
        self.reset_forms();
        self.draft.clear();
        self.view = View::Login;
        self.loading = false;
        self.generation += 1;
    }

    /// Fold a response into the state. Returns a follow-up request, if any.
    pub fn apply(&mut self, outcome: Outcome) -> Option<Command> {
        if outcome.generation() != self.generation {
            debug!(
                outcome_generation = outcome.generation(),
                current_generation = self.generation,
                "dropping stale response"
            );
            return None;
        }

        match outcome {
            Outcome::LoggedIn { result, .. } => {
                self.loading = false;
                match result {
                    Ok(session) => {
                        info!(username = %session.username, user_id = %session.user_id, "logged in");
                        let history = self.load_history(&session.username);
                        self.enter_chat(session);
                        Some(history)
                    }
                    Err(err) => {
                        self.fail("login", &err);
                        None
                    }
                }
            }
            Outcome::Registered { result, .. } => {
                self.loading = false;
                match result {
                    Ok(session) => {
                        info!(username = %session.username, user_id = %session.user_id, "registered");
                        self.enter_chat(session);
                        None
                    }
                    Err(err) => {
                        self.fail("register", &err);
                        None
                    }
                }
            }
            Outcome::MessageSent { key, result, .. } => {
                self.loading = false;
                match result {
                    Ok(conversation) => {
                        self.reconcile(key, conversation);
                    }
                    Err(err) => {
                        self.rollback(key);
                        self.fail("send_message", &err);
                    }
                }
                None
            }
            Outcome::HistoryLoaded {
                username, result, ..
            } => {
                match result {
                    Ok(conversations) => {
                        debug!(%username, count = conversations.len(), "history loaded");
                        self.conversations = conversations;
                    }
                    Err(err) => warn!(%username, error = %err, "failed to load chat history"),
                }
                None
            }
        }
    }

    fn enter_chat(&mut self, session: Session) {
        self.session = Some(session);
        self.conversations.clear();
        self.login_form.clear();
        self.register_form.clear();
        self.error = None;
        self.view = View::Chat;
    }

    fn fail(&mut self, operation: &str, err: &ClientError) {
        warn!(operation, error = %err, "request failed");
        self.error = Some(err.user_message());
    }

    /// Replace the placeholder keyed by `key` with the confirmed entry, in
    /// place. Returns false if the placeholder is gone.
    fn reconcile(&mut self, key: Uuid, confirmed: Conversation) -> bool {
        let pending = EntryId::Pending(key);
        match self.conversations.iter_mut().find(|c| c.id == pending) {
            Some(slot) => {
                *slot = confirmed;
                true
            }
            None => {
                debug!(%key, "placeholder no longer present, dropping confirmed entry");
                false
            }
        }
    }

    /// Remove the placeholder keyed by `key`.
    fn rollback(&mut self, key: Uuid) -> bool {
        let pending = EntryId::Pending(key);
        let before = self.conversations.len();
        self.conversations.retain(|c| c.id != pending);
        self.conversations.len() != before
    }
}
