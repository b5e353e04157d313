//! Voyage notification engine domain layer.
//!
//! Pure types and rules shared by the store, delivery, and API crates:
//! categories and typed payloads, list filters, preference resolution, email
//! templates, analytics math, and badge display. Nothing in this crate does
//! I/O.

pub mod analytics;
pub mod badge;
pub mod channels;
pub mod error;
pub mod filter;
pub mod notification;
pub mod preferences;
pub mod roles;
pub mod templates;
pub mod types;
