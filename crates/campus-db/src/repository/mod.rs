//! SurrealDB repository implementations.

mod audit;
mod security_event;
mod session;
mod user;

pub use audit::SurrealAuditLogRepository;
pub use security_event::SurrealSecurityEventRepository;
pub use session::SurrealSessionRepository;
pub use user::SurrealUserRepository;

use surrealdb_types::SurrealValue;

/// Row struct for count queries.
#[derive(Debug, SurrealValue)]
pub(crate) struct CountRow {
    pub(crate) total: u64,
}
