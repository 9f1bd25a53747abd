//! Never-failing sink for audit entries and security events.
//!
//! Write failures are logged and swallowed; callers never see them.

use campus_core::models::audit::CreateAuditLogEntry;
use campus_core::models::security_event::{CreateSecurityEvent, Severity};
use campus_core::repository::{AuditLogRepository, SecurityEventRepository};
use tracing::{error, warn};

#[derive(Clone)]
pub struct AuditSink<A: AuditLogRepository, E: SecurityEventRepository> {
    audit_log: A,
    security_events: E,
}

impl<A: AuditLogRepository, E: SecurityEventRepository> AuditSink<A, E> {
    pub fn new(audit_log: A, security_events: E) -> Self {
        Self {
            audit_log,
            security_events,
        }
    }

    pub async fn record(&self, entry: CreateAuditLogEntry) {
        let action = entry.action.clone();
        if let Err(e) = self.audit_log.append(entry).await {
            error!(action = %action, error = %e, "failed to append audit log entry");
        }
    }

    pub async fn security(&self, event: CreateSecurityEvent) {
        if event.severity >= Severity::High {
            warn!(
                event_type = %event.event_type,
                severity = event.severity.as_str(),
                user_id = ?event.user_id,
                ip_address = ?event.ip_address,
                "{}",
                event.details
            );
        }

        let event_type = event.event_type.clone();
        if let Err(e) = self.security_events.append(event).await {
            error!(event_type = %event_type, error = %e, "failed to append security event");
        }
    }

    pub fn audit_log(&self) -> &A {
        &self.audit_log
    }

    pub fn security_events(&self) -> &E {
        &self.security_events
    }
}
