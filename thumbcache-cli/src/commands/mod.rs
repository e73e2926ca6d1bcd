//! CLI command implementations.
//!
//! Each subcommand has its own module with argument definitions and handlers.
//!
//! # Command Modules
//!
//! - [`config`] - Configuration management (init, show)
//! - [`render`] - One-shot render of a single request path
//! - [`serve`] - Run the HTTP thumbnail service

pub mod config;
pub mod render;
pub mod serve;
