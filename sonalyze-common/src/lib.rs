//! # Sonalyze Common Library
//!
//! Shared code for the Sonalyze audio analysis service:
//! - Configuration loading and root folder resolution
//! - Database initialization and row models
//! - Password hashing for the users table
//! - Common error type

pub mod config;
pub mod db;
pub mod error;
pub mod password;

pub use error::{Error, Result};
