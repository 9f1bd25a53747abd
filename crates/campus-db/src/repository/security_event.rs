//! SurrealDB implementation of [`SecurityEventRepository`].

use campus_core::error::CampusResult;
use campus_core::models::security_event::{CreateSecurityEvent, SecurityEvent, Severity};
use campus_core::repository::{
    PaginatedResult, Pagination, SecurityEventFilter, SecurityEventRepository,
};
use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::CountRow;
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct SecurityEventRow {
    record_id: String,
    user_id: Option<String>,
    event_type: String,
    details: String,
    ip_address: Option<String>,
    user_agent: Option<String>,
    severity: String,
    timestamp: DateTime<Utc>,
}

fn parse_severity(s: &str) -> Result<Severity, DbError> {
    match s {
        "Low" => Ok(Severity::Low),
        "Medium" => Ok(Severity::Medium),
        "High" => Ok(Severity::High),
        "Critical" => Ok(Severity::Critical),
        other => Err(DbError::Corrupt(format!("unknown severity: {other}"))),
    }
}

impl SecurityEventRow {
    fn try_into_event(self) -> Result<SecurityEvent, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Corrupt(format!("invalid UUID: {e}")))?;
        let user_id = self
            .user_id
            .as_deref()
            .map(Uuid::parse_str)
            .transpose()
            .map_err(|e| DbError::Corrupt(format!("invalid user UUID: {e}")))?;
        Ok(SecurityEvent {
            id,
            user_id,
            event_type: self.event_type,
            details: self.details,
            ip_address: self.ip_address,
            user_agent: self.user_agent,
            severity: parse_severity(&self.severity)?,
            timestamp: self.timestamp,
        })
    }
}

/// SurrealDB implementation of the security event log. Append-only.
#[derive(Clone)]
pub struct SurrealSecurityEventRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealSecurityEventRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> SecurityEventRepository for SurrealSecurityEventRepository<C> {
    async fn append(&self, input: CreateSecurityEvent) -> CampusResult<SecurityEvent> {
        let id_str = Uuid::new_v4().to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('security_event', $id) SET \
                 user_id = $user_id, event_type = $event_type, \
                 details = $details, ip_address = $ip_address, \
                 user_agent = $user_agent, severity = $severity; \
                 SELECT meta::id(id) AS record_id, * \
                 FROM type::record('security_event', $id);",
            )
            .bind(("id", id_str.clone()))
            .bind(("user_id", input.user_id.map(|u| u.to_string())))
            .bind(("event_type", input.event_type))
            .bind(("details", input.details))
            .bind(("ip_address", input.ip_address))
            .bind(("user_agent", input.user_agent))
            .bind(("severity", input.severity.as_str().to_string()))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::Corrupt(e.to_string()))?;

        let rows: Vec<SecurityEventRow> = result.take(1).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "security_event".into(),
            id: id_str,
        })?;

        Ok(row.try_into_event()?)
    }

    async fn list(
        &self,
        filter: SecurityEventFilter,
        pagination: Pagination,
    ) -> CampusResult<PaginatedResult<SecurityEvent>> {
        let mut conditions = vec!["true"];
        if filter.user_id.is_some() {
            conditions.push("user_id = $user_id");
        }
        if filter.event_type.is_some() {
            conditions.push("event_type = $event_type");
        }
        let where_clause = conditions.join(" AND ");

        let query = format!(
            "SELECT count() AS total FROM security_event WHERE {where_clause} GROUP ALL; \
             SELECT meta::id(id) AS record_id, * FROM security_event \
             WHERE {where_clause} \
             ORDER BY timestamp ASC \
             LIMIT $limit START $offset;"
        );

        let mut builder = self
            .db
            .query(&query)
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset));
        if let Some(user_id) = filter.user_id {
            builder = builder.bind(("user_id", user_id.to_string()));
        }
        if let Some(event_type) = filter.event_type {
            builder = builder.bind(("event_type", event_type));
        }

        let mut result = builder.await.map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let rows: Vec<SecurityEventRow> = result.take(1).map_err(DbError::from)?;
        let items = rows
            .into_iter()
            .map(SecurityEventRow::try_into_event)
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }
}
