pub mod content;
pub mod message;
pub mod session;
pub mod user;

pub use content::{FileKind, MessageContent};
pub use message::{Message, MessageRole};
pub use session::{ChatSession, next_session_title};
pub use user::{AuthResponse, AuthState, User};
