//! Campus Core — Domain models, repository traits, and error types
//! shared by the session and access-control crates.

pub mod error;
pub mod models;
pub mod repository;
