//! Domain models for Campus.
//!
//! These are the core types shared across all crates.

pub mod audit;
pub mod role;
pub mod security_event;
pub mod session;
pub mod user;
