//! Application services: accounts, listings, blog content and the per-request context.

pub mod auth;
pub mod blog;
pub mod context;
pub mod error;
pub mod properties;
pub mod repos;
pub mod tokens;
pub mod users;
