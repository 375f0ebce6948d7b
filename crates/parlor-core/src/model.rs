//! Data types shared by the state container, the API client and the UI.

use chrono::{DateTime, Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Placeholder shown in place of the AI response while a message is in flight.
pub const PENDING_RESPONSE: &str = "...";

/// An identifier handed out by the chat service.
///
/// The service is free to use numbers or strings, so both are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Identifier {
    Number(i64),
    Text(String),
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identifier::Number(n) => write!(f, "{}", n),
            Identifier::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for Identifier {
    fn from(n: i64) -> Self {
        Identifier::Number(n)
    }
}

impl From<&str> for Identifier {
    fn from(s: &str) -> Self {
        Identifier::Text(s.to_string())
    }
}

/// The signed-in user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub username: String,
    pub user_id: Identifier,
}

/// Key of a conversation entry in the displayed list.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EntryId {
    /// Optimistic entry, keyed locally until the server confirms it.
    Pending(Uuid),
    /// Entry confirmed by the server.
    Confirmed(Identifier),
}

/// One user message and the AI response to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversation {
    pub id: EntryId,
    pub user_message: String,
    pub ai_response: String,
    /// ISO-8601 timestamp as sent by the server (or generated locally for
    /// pending entries).
    pub timestamp: String,
    pub loading: bool,
}

impl Conversation {
    /// Build the optimistic entry for a message that has just been sent.
    pub fn pending(key: Uuid, message: &str) -> Self {
        Self {
            id: EntryId::Pending(key),
            user_message: message.to_string(),
            ai_response: PENDING_RESPONSE.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            loading: true,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.id, EntryId::Pending(_))
    }

    /// Local wall-clock time of the entry, `HH:MM:SS`.
    ///
    /// Timestamps without an offset are taken to be local already. Anything
    /// unparseable is shown as-is.
    pub fn display_time(&self) -> String {
        if let Ok(ts) = DateTime::parse_from_rfc3339(&self.timestamp) {
            return ts.with_timezone(&Local).format("%H:%M:%S").to_string();
        }

        for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
            if let Ok(ts) = NaiveDateTime::parse_from_str(&self.timestamp, format) {
                return ts.format("%H:%M:%S").to_string();
            }
        }

        self.timestamp.clone()
    }
}

/// Username/password pair sent to `/login` and `/register`.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

// Keep passwords out of logs.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Contents of the login or register form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthForm {
    pub username: String,
    pub password: String,
}

impl AuthForm {
    pub fn clear(&mut self) {
        self.username.clear();
        self.password.clear();
    }

    pub fn credentials(&self) -> Credentials {
        Credentials {
            username: self.username.clone(),
            password: self.password.clone(),
        }
    }
}
