pub mod auth;
pub mod config;
pub mod db;
pub mod domain;
pub mod llm;
pub mod repositories;
pub mod services;
pub mod ui;
pub mod utils;

pub use config::Settings;
pub use db::RealtimeDbClient;
