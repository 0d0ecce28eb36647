use thiserror::Error;

use crate::db::DbError;
use crate::llm::GenerativeError;
use crate::repositories::MediaError;
use crate::utils::DecodeError;

/// Failure of a chat intent. Always caught by the coordinator and turned into a
/// notice or a model-authored message.
#[derive(Error, Debug)]
pub enum ChatError {
    #[error("User not authenticated")]
    Unauthorized,

    #[error(transparent)]
    Store(DbError),

    #[error(transparent)]
    Model(#[from] GenerativeError),

    #[error(transparent)]
    Media(MediaError),

    #[error(transparent)]
    Decode(#[from] DecodeError),
}

impl From<DbError> for ChatError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Unauthorized => ChatError::Unauthorized,
            _ => ChatError::Store(err),
        }
    }
}

impl From<MediaError> for ChatError {
    fn from(err: MediaError) -> Self {
        match err {
            MediaError::Unauthorized => ChatError::Unauthorized,
            _ => ChatError::Media(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unauthorized_collapses() {
        assert!(matches!(
            ChatError::from(DbError::Unauthorized),
            ChatError::Unauthorized
        ));
        assert!(matches!(
            ChatError::from(MediaError::Unauthorized),
            ChatError::Unauthorized
        ));
        assert!(matches!(
            ChatError::from(DbError::InvalidData("x".into())),
            ChatError::Store(_)
        ));
    }

    #[test]
    fn test_messages_pass_through() {
        let err = ChatError::from(GenerativeError::Api {
            status: 429,
            message: "RESOURCE_EXHAUSTED: quota".to_string(),
        });
        assert_eq!(err.to_string(), "RESOURCE_EXHAUSTED: quota");
    }
}
