// Integration tests for the chat and auth coordinators
// Run with: cargo test --test integration

mod auth_tests;
mod chat_service_tests;
mod support;
