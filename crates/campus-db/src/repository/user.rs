//! SurrealDB implementation of [`UserRepository`].
//!
//! Password hashing uses Argon2id (m=19 MiB, t=2, p=1) with a random
//! salt per hash and an optional server-side pepper.

use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHasher};
use campus_core::error::CampusResult;
use campus_core::models::role::Role;
use campus_core::models::user::{CreateUser, User, UserStatus};
use campus_core::repository::UserRepository;
use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct UserRow {
    record_id: String,
    college_id: Option<String>,
    username: String,
    email: String,
    password_hash: String,
    role: String,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn parse_status(s: &str) -> Result<UserStatus, DbError> {
    match s {
        "Active" => Ok(UserStatus::Active),
        "Inactive" => Ok(UserStatus::Inactive),
        other => Err(DbError::Corrupt(format!("unknown user status: {other}"))),
    }
}

fn status_to_string(s: UserStatus) -> &'static str {
    match s {
        UserStatus::Active => "Active",
        UserStatus::Inactive => "Inactive",
    }
}

fn parse_uuid(raw: &str, what: &str) -> Result<Uuid, DbError> {
    Uuid::parse_str(raw).map_err(|e| DbError::Corrupt(format!("invalid {what} UUID: {e}")))
}

impl UserRow {
    fn try_into_user(self) -> Result<User, DbError> {
        let role: Role = self.role.parse().map_err(DbError::Corrupt)?;
        Ok(User {
            id: parse_uuid(&self.record_id, "user")?,
            college_id: self
                .college_id
                .as_deref()
                .map(|c| parse_uuid(c, "college"))
                .transpose()?,
            username: self.username,
            email: self.email,
            password_hash: self.password_hash,
            role,
            status: parse_status(&self.status)?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Hash a password with Argon2id, prepending the pepper if one is set.
pub(crate) fn hash_password(password: &str, pepper: Option<&str>) -> Result<String, DbError> {
    let params = argon2::Params::new(19456, 2, 1, None)
        .map_err(|e| DbError::Corrupt(format!("argon2 params error: {e}")))?;
    let argon2 = Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, params);

    let peppered: String;
    let input = match pepper {
        Some(p) => {
            peppered = format!("{p}{password}");
            peppered.as_bytes()
        }
        None => password.as_bytes(),
    };

    let salt = SaltString::generate(&mut argon2::password_hash::rand_core::OsRng);
    let hash = argon2
        .hash_password(input, &salt)
        .map_err(|e| DbError::Corrupt(format!("password hash error: {e}")))?;

    Ok(hash.to_string())
}

/// SurrealDB implementation of the User repository.
#[derive(Clone)]
pub struct SurrealUserRepository<C: Connection> {
    db: Surreal<C>,
    pepper: Option<String>,
}

impl<C: Connection> SurrealUserRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db, pepper: None }
    }

    pub fn with_pepper(db: Surreal<C>, pepper: String) -> Self {
        Self {
            db,
            pepper: Some(pepper),
        }
    }

    async fn find_one(&self, field: &'static str, value: &str) -> Result<User, DbError> {
        let query = format!(
            "SELECT meta::id(id) AS record_id, * FROM user WHERE {field} = $value"
        );
        let mut result = self
            .db
            .query(&query)
            .bind(("value", value.to_string()))
            .await?;

        let rows: Vec<UserRow> = result.take(0)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "user".into(),
            id: format!("{field}={value}"),
        })?;

        row.try_into_user()
    }
}

impl<C: Connection> UserRepository for SurrealUserRepository<C> {
    async fn create(&self, input: CreateUser) -> CampusResult<User> {
        let id = Uuid::new_v4();
        let password_hash = hash_password(&input.password, self.pepper.as_deref())?;
        let (username, email) = (input.username.clone(), input.email.clone());

        let created = self
            .db
            .query(
                "CREATE type::record('user', $id) SET \
                 college_id = $college_id, \
                 username = $username, email = $email, \
                 password_hash = $password_hash, \
                 role = $role, status = 'Active'",
            )
            .bind(("id", id.to_string()))
            .bind(("college_id", input.college_id.map(|c| c.to_string())))
            .bind(("username", input.username))
            .bind(("email", input.email))
            .bind(("password_hash", password_hash))
            .bind(("role", input.role.as_str().to_string()))
            .await
            .map_err(DbError::from)?
            .check();

        if let Err(e) = created {
            // The unique indexes rejected it if either name is taken.
            let taken = self.find_one("username", &username).await.is_ok()
                || self.find_one("email", &email).await.is_ok();
            return Err(if taken {
                DbError::AlreadyExists {
                    entity: "user".into(),
                }
            } else {
                DbError::Corrupt(e.to_string())
            }
            .into());
        }

        self.get_by_id(id).await
    }

    async fn get_by_id(&self, id: Uuid) -> CampusResult<User> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT meta::id(id) AS record_id, * FROM type::record('user', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<UserRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "user".into(),
            id: id_str,
        })?;

        Ok(row.try_into_user()?)
    }

    async fn get_by_username(&self, username: &str) -> CampusResult<User> {
        Ok(self.find_one("username", username).await?)
    }

    async fn get_by_email(&self, email: &str) -> CampusResult<User> {
        Ok(self.find_one("email", email).await?)
    }

    async fn set_status(&self, id: Uuid, status: UserStatus) -> CampusResult<()> {
        self.db
            .query(
                "UPDATE type::record('user', $id) SET \
                 status = $status, updated_at = time::now()",
            )
            .bind(("id", id.to_string()))
            .bind(("status", status_to_string(status).to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Corrupt(e.to_string()))?;

        Ok(())
    }
}
