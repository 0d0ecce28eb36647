pub mod auth_service;
pub mod chat_service;
pub mod error;

pub use auth_service::AuthService;
pub use chat_service::ChatService;
pub use error::ChatError;
