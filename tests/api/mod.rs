//! API endpoint tests

mod auth_tests;
mod chat_list_tests;
mod chat_tests;
mod gateway_tests;
mod health_tests;
mod message_tests;
mod user_tests;
