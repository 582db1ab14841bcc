//! # Fermi Common Library
//!
//! Shared code for the Fermi estimation crates including:
//! - Error and result types
//! - TOML configuration loading and config path resolution
//! - Logging configuration and tracing initialization

pub mod config;
pub mod error;
pub mod logging;

pub use error::{Error, Result};
