//! Cross-cutting application concerns: configuration.

pub mod config;
