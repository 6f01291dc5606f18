//! # Todolist server
//!
//! Configuration for the `todolist-server` binary. See [`config::Config`]
//! for the environment contract.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod config;

pub use config::{Config, ConfigError, Environment};
