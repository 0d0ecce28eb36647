pub mod image_utils;
pub mod nonce_utils;
pub mod push_id_utils;

pub use image_utils::{DecodeError, InlineImage, LocalImage, is_remote_uri};
pub use nonce_utils::create_nonce;
pub use push_id_utils::PushIdGenerator;
