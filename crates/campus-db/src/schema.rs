//! Schema definitions and migration runner for SurrealDB.
//!
//! Tables are SCHEMAFULL. UUIDs are stored as strings, enums as
//! strings guarded by ASSERT constraints.

use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::info;

use crate::error::DbError;

const MIGRATION_TABLE_DDL: &str = "\
DEFINE TABLE IF NOT EXISTS _migration SCHEMAFULL;
DEFINE FIELD IF NOT EXISTS version ON TABLE _migration TYPE int;
DEFINE FIELD IF NOT EXISTS name ON TABLE _migration TYPE string;
DEFINE FIELD IF NOT EXISTS applied_at ON TABLE _migration TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX IF NOT EXISTS idx_migration_version ON TABLE _migration \
    COLUMNS version UNIQUE;
";

#[derive(Debug, SurrealValue)]
struct AppliedMigration {
    version: u32,
}

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

static MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "users_and_sessions",
        sql: SCHEMA_V1,
    },
    Migration {
        version: 2,
        name: "audit_and_security_events",
        sql: SCHEMA_V2,
    },
];

// -----------------------------------------------------------------------
// v1 — users and their single session record
// -----------------------------------------------------------------------

const SCHEMA_V1: &str = "\
DEFINE TABLE user SCHEMAFULL;
DEFINE FIELD college_id ON TABLE user TYPE option<string>;
DEFINE FIELD username ON TABLE user TYPE string;
DEFINE FIELD email ON TABLE user TYPE string;
DEFINE FIELD password_hash ON TABLE user TYPE string;
DEFINE FIELD role ON TABLE user TYPE string \
    ASSERT $value IN ['SUPER_ADMIN', 'COLLEGE_ADMIN', \
    'EDUCATION_DEPARTMENT', 'TEACHER', 'STUDENT'];
DEFINE FIELD status ON TABLE user TYPE string \
    ASSERT $value IN ['Active', 'Inactive'];
DEFINE FIELD created_at ON TABLE user TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE user TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_user_username ON TABLE user COLUMNS username UNIQUE;
DEFINE INDEX idx_user_email ON TABLE user COLUMNS email UNIQUE;

-- Record id is the owning user's id: one session record per user.
DEFINE TABLE user_session SCHEMAFULL;
DEFINE FIELD user_id ON TABLE user_session TYPE string;
DEFINE FIELD token_hash ON TABLE user_session TYPE option<string>;
DEFINE FIELD created_at ON TABLE user_session TYPE option<datetime>;
DEFINE FIELD expires_at ON TABLE user_session TYPE option<datetime>;
DEFINE FIELD last_activity ON TABLE user_session TYPE option<datetime>;
DEFINE FIELD ip_address ON TABLE user_session TYPE option<string>;
DEFINE FIELD user_agent ON TABLE user_session TYPE option<string>;
DEFINE FIELD is_logged_in ON TABLE user_session TYPE bool DEFAULT false;
DEFINE FIELD last_login_at ON TABLE user_session TYPE option<datetime>;
DEFINE FIELD last_logout ON TABLE user_session TYPE option<datetime>;
DEFINE INDEX idx_user_session_token ON TABLE user_session \
    COLUMNS token_hash;
DEFINE INDEX idx_user_session_logged_in ON TABLE user_session \
    COLUMNS is_logged_in;
";

// -----------------------------------------------------------------------
// v2 — append-only audit and security event logs
// -----------------------------------------------------------------------

const SCHEMA_V2: &str = "\
DEFINE TABLE audit_log SCHEMAFULL
    PERMISSIONS
        FOR create FULL
        FOR select FULL
        FOR update NONE
        FOR delete NONE;
DEFINE FIELD actor_id ON TABLE audit_log TYPE option<string>;
DEFINE FIELD action ON TABLE audit_log TYPE string;
DEFINE FIELD details ON TABLE audit_log TYPE string;
DEFINE FIELD ip_address ON TABLE audit_log TYPE option<string>;
DEFINE FIELD user_agent ON TABLE audit_log TYPE option<string>;
DEFINE FIELD status ON TABLE audit_log TYPE string \
    ASSERT $value IN ['Success', 'Failure', 'Warning'];
DEFINE FIELD timestamp ON TABLE audit_log TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_audit_time ON TABLE audit_log COLUMNS timestamp;
DEFINE INDEX idx_audit_actor ON TABLE audit_log COLUMNS actor_id;

DEFINE TABLE security_event SCHEMAFULL
    PERMISSIONS
        FOR create FULL
        FOR select FULL
        FOR update NONE
        FOR delete NONE;
DEFINE FIELD user_id ON TABLE security_event TYPE option<string>;
DEFINE FIELD event_type ON TABLE security_event TYPE string;
DEFINE FIELD details ON TABLE security_event TYPE string;
DEFINE FIELD ip_address ON TABLE security_event TYPE option<string>;
DEFINE FIELD user_agent ON TABLE security_event TYPE option<string>;
DEFINE FIELD severity ON TABLE security_event TYPE string \
    ASSERT $value IN ['Low', 'Medium', 'High', 'Critical'];
DEFINE FIELD timestamp ON TABLE security_event TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_security_event_time ON TABLE security_event \
    COLUMNS timestamp;
DEFINE INDEX idx_security_event_user ON TABLE security_event \
    COLUMNS user_id;
";

async fn current_version<C: Connection>(db: &Surreal<C>) -> Result<u32, DbError> {
    let mut result = db
        .query("SELECT version FROM _migration ORDER BY version DESC LIMIT 1")
        .await?;
    let applied: Vec<AppliedMigration> = result.take(0)?;
    Ok(applied.first().map(|m| m.version).unwrap_or(0))
}

async fn apply<C: Connection>(db: &Surreal<C>, migration: &Migration) -> Result<(), DbError> {
    info!(
        version = migration.version,
        name = migration.name,
        "Applying migration"
    );

    db.query(migration.sql).await?.check().map_err(|e| {
        DbError::Migration(format!(
            "v{} '{}' failed: {e}",
            migration.version, migration.name
        ))
    })?;

    db.query("CREATE _migration SET version = $version, name = $name")
        .bind(("version", migration.version))
        .bind(("name", migration.name))
        .await?
        .check()
        .map_err(|e| {
            DbError::Migration(format!(
                "could not record v{}: {e}",
                migration.version
            ))
        })?;

    Ok(())
}

/// Bring the schema up to date.
///
/// Creates the `_migration` tracking table on first run, then applies
/// every migration newer than the recorded version, in order.
pub async fn run_migrations<C: Connection>(db: &Surreal<C>) -> Result<(), DbError> {
    db.query(MIGRATION_TABLE_DDL)
        .await?
        .check()
        .map_err(|e| DbError::Migration(e.to_string()))?;

    let current = current_version(db).await?;
    for migration in MIGRATIONS.iter().filter(|m| m.version > current) {
        apply(db, migration).await?;
    }

    Ok(())
}
