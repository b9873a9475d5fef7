//! HTTP route handlers.

pub mod messages;
