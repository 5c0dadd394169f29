//! Domain layer types and invariants.

pub mod blog;
pub mod error;
pub mod locale;
pub mod properties;
pub mod slug;
pub mod users;
