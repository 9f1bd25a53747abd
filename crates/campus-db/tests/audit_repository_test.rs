//! Integration tests for the audit log and security event repositories.

use campus_core::models::audit::{AuditStatus, CreateAuditLogEntry, action};
use campus_core::models::security_event::{CreateSecurityEvent, Severity, event};
use campus_core::repository::{
    AuditLogFilter, AuditLogRepository, Pagination, SecurityEventFilter, SecurityEventRepository,
};
use campus_db::repository::{SurrealAuditLogRepository, SurrealSecurityEventRepository};
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use uuid::Uuid;

async fn setup() -> Surreal<Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    campus_db::run_migrations(&db).await.unwrap();
    db
}

fn audit(actor_id: Option<Uuid>, action: &str) -> CreateAuditLogEntry {
    CreateAuditLogEntry {
        actor_id,
        action: action.into(),
        details: "test".into(),
        ip_address: Some("10.0.0.1".into()),
        user_agent: None,
        status: AuditStatus::Success,
    }
}

#[tokio::test]
async fn append_and_list_audit_entries() {
    let repo = SurrealAuditLogRepository::new(setup().await);
    let alice = Uuid::new_v4();

    let entry = repo
        .append(audit(Some(alice), action::SESSION_CREATED))
        .await
        .unwrap();
    assert_eq!(entry.actor_id, Some(alice));
    assert_eq!(entry.status, AuditStatus::Success);

    repo.append(audit(None, action::BULK_SESSION_CLEANUP))
        .await
        .unwrap();
    repo.append(audit(Some(alice), action::SESSION_TERMINATED))
        .await
        .unwrap();

    let all = repo
        .list(AuditLogFilter::default(), Pagination::default())
        .await
        .unwrap();
    assert_eq!(all.total, 3);
    assert_eq!(all.items.len(), 3);

    let by_actor = repo
        .list(
            AuditLogFilter {
                actor_id: Some(alice),
                ..Default::default()
            },
            Pagination::default(),
        )
        .await
        .unwrap();
    assert_eq!(by_actor.total, 2);

    let by_action = repo
        .list(
            AuditLogFilter {
                action: Some(action::BULK_SESSION_CLEANUP.into()),
                ..Default::default()
            },
            Pagination::default(),
        )
        .await
        .unwrap();
    assert_eq!(by_action.total, 1);
    assert_eq!(by_action.items[0].actor_id, None);
}

#[tokio::test]
async fn list_honours_pagination() {
    let repo = SurrealAuditLogRepository::new(setup().await);
    for _ in 0..5 {
        repo.append(audit(None, action::LOGIN_FAILED)).await.unwrap();
    }

    let page = repo
        .list(
            AuditLogFilter::default(),
            Pagination {
                offset: 2,
                limit: 2,
            },
        )
        .await
        .unwrap();
    assert_eq!(page.total, 5);
    assert_eq!(page.items.len(), 2);
}

#[tokio::test]
async fn append_and_list_security_events() {
    let repo = SurrealSecurityEventRepository::new(setup().await);
    let user = Uuid::new_v4();

    let created = repo
        .append(CreateSecurityEvent {
            user_id: Some(user),
            event_type: event::SESSION_HIJACK_ATTEMPT.into(),
            details: "ip changed".into(),
            ip_address: Some("9.9.9.9".into()),
            user_agent: Some("Chrome".into()),
            severity: Severity::Critical,
        })
        .await
        .unwrap();
    assert_eq!(created.severity, Severity::Critical);

    repo.append(CreateSecurityEvent {
        user_id: Some(Uuid::new_v4()),
        event_type: event::INVALID_SESSION_TOKEN.into(),
        details: "mismatch".into(),
        ip_address: None,
        user_agent: None,
        severity: Severity::High,
    })
    .await
    .unwrap();

    let mine = repo
        .list(
            SecurityEventFilter {
                user_id: Some(user),
                ..Default::default()
            },
            Pagination::default(),
        )
        .await
        .unwrap();
    assert_eq!(mine.total, 1);
    assert_eq!(mine.items[0].event_type, event::SESSION_HIJACK_ATTEMPT);
    assert_eq!(mine.items[0].ip_address.as_deref(), Some("9.9.9.9"));
}
