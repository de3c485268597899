//! Account configuration and the shared error type.

pub mod config;
pub mod error;
