//! CLI command implementations.
//!
//! # Command Modules
//!
//! - [`authorize`] - Resolve the location permission
//! - [`config`] - Configuration management (show, path, init)
//! - [`current`] - One-shot position fix
//! - [`watch`] - Continuous position updates

pub mod authorize;
pub mod common;
pub mod config;
pub mod current;
pub mod watch;
