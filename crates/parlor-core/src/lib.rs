pub mod api;
pub mod command;
pub mod config;
pub mod error;
pub mod model;
pub mod state;

// Re-export main types for convenience
pub use api::{ApiClient, ChatBackend};
pub use command::{Command, Outcome};
pub use config::Config;
pub use error::{ClientError, CONNECT_FAILURE};
pub use model::{AuthForm, Conversation, Credentials, EntryId, Identifier, Session};
pub use state::{ClientState, View, MIN_PASSWORD_LEN};
