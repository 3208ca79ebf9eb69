//! Typed wrappers over the backend endpoints the console core needs

pub mod auth;
pub mod download_center;
pub mod user;

pub use auth::AuthService;
