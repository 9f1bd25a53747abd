//! SurrealDB connection management.

use surrealdb::Surreal;
use surrealdb::engine::remote::ws::{Client, Ws};
use surrealdb::opt::auth::Root;
use tracing::info;

use crate::error::DbError;
use crate::repository::{
    SurrealAuditLogRepository, SurrealSecurityEventRepository, SurrealSessionRepository,
    SurrealUserRepository,
};
use crate::schema::run_migrations;

/// Configuration for connecting to SurrealDB.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// WebSocket URL (e.g., `127.0.0.1:8000`).
    pub url: String,
    pub namespace: String,
    pub database: String,
    /// Root credentials.
    pub username: String,
    pub password: String,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: "127.0.0.1:8000".into(),
            namespace: "campus".into(),
            database: "main".into(),
            username: "root".into(),
            password: "root".into(),
        }
    }
}

/// Owns the SurrealDB client and hands out repositories bound to it.
#[derive(Clone)]
pub struct DbManager {
    db: Surreal<Client>,
}

impl DbManager {
    /// Connect, sign in as root, select namespace/database and bring
    /// the schema up to date.
    pub async fn connect(config: &DbConfig) -> Result<Self, DbError> {
        info!(
            url = %config.url,
            namespace = %config.namespace,
            database = %config.database,
            "Connecting to SurrealDB"
        );

        let db = Surreal::new::<Ws>(&config.url).await?;

        db.signin(Root {
            username: config.username.clone(),
            password: config.password.clone(),
        })
        .await?;

        db.use_ns(&config.namespace)
            .use_db(&config.database)
            .await?;

        run_migrations(&db).await?;

        info!("SurrealDB ready");

        Ok(Self { db })
    }

    pub fn client(&self) -> &Surreal<Client> {
        &self.db
    }

    pub fn users(&self, pepper: Option<String>) -> SurrealUserRepository<Client> {
        match pepper {
            Some(p) => SurrealUserRepository::with_pepper(self.db.clone(), p),
            None => SurrealUserRepository::new(self.db.clone()),
        }
    }

    pub fn sessions(&self) -> SurrealSessionRepository<Client> {
        SurrealSessionRepository::new(self.db.clone())
    }

    pub fn audit_log(&self) -> SurrealAuditLogRepository<Client> {
        SurrealAuditLogRepository::new(self.db.clone())
    }

    pub fn security_events(&self) -> SurrealSecurityEventRepository<Client> {
        SurrealSecurityEventRepository::new(self.db.clone())
    }
}
