//! Requests produced by state transitions and the results fed back into them.

use uuid::Uuid;

use crate::api::ChatBackend;
use crate::error::ClientError;
use crate::model::{Conversation, Credentials, Session};

/// A request the client wants issued.
///
/// Each command carries the generation of the state that produced it so the
/// matching [`Outcome`] can be discarded if the user logged out meanwhile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Login {
        generation: u64,
        credentials: Credentials,
    },
    Register {
        generation: u64,
        credentials: Credentials,
    },
    SendMessage {
        generation: u64,
        key: Uuid,
        username: String,
        message: String,
    },
    LoadHistory {
        generation: u64,
        username: String,
    },
}

/// Result of running a [`Command`].
#[derive(Debug)]
pub enum Outcome {
    LoggedIn {
        generation: u64,
        result: Result<Session, ClientError>,
    },
    Registered {
        generation: u64,
        result: Result<Session, ClientError>,
    },
    MessageSent {
        generation: u64,
        key: Uuid,
        result: Result<Conversation, ClientError>,
    },
    HistoryLoaded {
        generation: u64,
        username: String,
        result: Result<Vec<Conversation>, ClientError>,
    },
}

impl Command {
    pub fn generation(&self) -> u64 {
        match self {
            Command::Login { generation, .. }
            | Command::Register { generation, .. }
            | Command::SendMessage { generation, .. }
            | Command::LoadHistory { generation, .. } => *generation,
        }
    }

    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Login { .. } => "login",
            Command::Register { .. } => "register",
            Command::SendMessage { .. } => "send_message",
            Command::LoadHistory { .. } => "load_history",
        }
    }

    /// Issue the request. Never fails: errors travel inside the outcome.
    pub async fn execute<B: ChatBackend + ?Sized>(self, backend: &B) -> Outcome {
        match self {
            Command::Login {
                generation,
                credentials,
            } => Outcome::LoggedIn {
                generation,
                result: backend.login(&credentials).await,
            },
            Command::Register {
                generation,
                credentials,
            } => Outcome::Registered {
                generation,
                result: backend.register(&credentials).await,
            },
            Command::SendMessage {
                generation,
                key,
                username,
                message,
            } => Outcome::MessageSent {
                generation,
                key,
                result: backend.send_message(&username, &message).await,
            },
            Command::LoadHistory {
                generation,
                username,
            } => {
                let result = backend.history(&username).await;
                Outcome::HistoryLoaded {
                    generation,
                    username,
                    result,
                }
            }
        }
    }
}

impl Outcome {
    pub fn generation(&self) -> u64 {
        match self {
            Outcome::LoggedIn { generation, .. }
            | Outcome::Registered { generation, .. }
            | Outcome::MessageSent { generation, .. }
            | Outcome::HistoryLoaded { generation, .. } => *generation,
        }
    }
}
