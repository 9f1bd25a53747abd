//! Campus Auth — Session lifecycle, audit/security event sink,
//! identity tokens, and credential login.

pub mod audit;
pub mod clock;
pub mod config;
pub mod error;
pub mod password;
pub mod service;
pub mod session;
pub mod token;

pub use audit::AuditSink;
pub use clock::{Clock, SystemClock};
pub use config::{AuthConfig, SessionConfig};
pub use error::AuthError;
pub use password::PasswordChecker;
pub use service::{AuthService, LoginInput, LoginOutput};
pub use session::{InvalidReason, SessionInfo, SessionManager, SessionValidation};
pub use token::{IdentityClaims, TokenKeys};
