//! Leasehold: backend for a property-rental listing site.
//!
//! Layers follow the usual split: `domain` holds records and pure rules,
//! `application` holds services and the per-request context builder, and
//! `infra` wires them to axum, in-memory persistence and telemetry.

pub mod application;
pub mod config;
pub mod domain;
pub mod infra;

pub use leasehold_api_types as api_types;
