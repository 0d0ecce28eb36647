pub mod client;
pub mod event_stream;
pub mod models;
pub mod paths;
pub mod tree;

pub use client::{DbError, RealtimeDbClient};
pub use event_stream::{DbEvent, SseDecoder, SseEvent};
pub use models::*;
