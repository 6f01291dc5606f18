//! HTTP request handlers, one module per area.

pub mod auth;
pub mod health;
pub mod todos;

pub use health::health_check;
