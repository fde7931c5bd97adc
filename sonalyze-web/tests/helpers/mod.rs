//! Test Helper Utilities
//!
//! Shared utilities for testing sonalyze-web

#![allow(dead_code)]

pub mod app;
pub mod audio_generator;

use std::path::PathBuf;

pub use app::{
    body_string, create_test_app, create_test_app_with, flash_from, get, multipart_upload, post_form,
    session_cookie_from, TestApp,
};
pub use audio_generator::{generate_wav, wav_bytes, AudioConfig, Signal};

/// Path of a checked-in file under `tests/fixtures`
pub fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests").join("fixtures").join(name)
}
