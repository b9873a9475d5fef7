//! Shared wire types for the huddle chat backend and its clients.

pub mod events;
pub mod models;

pub use events::*;
pub use models::*;
