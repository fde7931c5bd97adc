//! HTTP handlers for sonalyze-web

pub mod auth;
pub mod health;
pub mod history;
pub mod pages;
pub mod upload;

pub use auth::auth_routes;
pub use health::health_routes;
pub use history::history_routes;
pub use pages::page_routes;
pub use upload::upload_routes;
