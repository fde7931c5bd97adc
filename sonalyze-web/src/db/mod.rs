//! Record store queries for the `users` and `uploads` tables

pub mod uploads;
pub mod users;

pub use uploads::{count_uploads, insert_upload, list_uploads, list_uploads_for_user};
pub use users::{fetch_user_by_username, insert_user, verify_credentials};
