pub mod alias;
pub mod api;
pub mod auth;
pub mod config;
pub mod connection;
pub mod ctx;
pub mod defaults;
pub mod error;
pub mod login;
pub mod output;
pub mod service;
pub mod session;
pub mod status;

// Re-export commonly used error types
pub use error::{Error, Result};
pub use output::LogLevel;
