pub mod chat_store;
pub mod fire_chat_repo;
pub mod media_repo;
pub mod memory_chat_repo;
pub mod subscription;

pub use chat_store::ChatStore;
pub use fire_chat_repo::FireChatRepository;
pub use media_repo::{FirebaseStorageRepository, MediaError, MediaStore};
pub use memory_chat_repo::MemoryChatRepository;
pub use subscription::Subscription;
