//! Shared types for the ZainMart client.
//!
//! `api` holds the request/response shapes spoken with the data platform,
//! `body` the loosely typed payload bodies and localized text, and `models`
//! the domain documents (messages, groups, orders, reports...) that live
//! inside those bodies.

pub mod api;
pub mod body;
pub mod models;

pub use api::*;
pub use body::{Body, Text, Translation};
