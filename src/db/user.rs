use std::fmt;

use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqlitePool;

use crate::password::{PasswordError, hash_password, verify_password};

#[derive(Clone)]
pub struct UserStore {
    pool: SqlitePool,
}

/// Account repository failure.
#[derive(Debug)]
pub enum AccountError {
    Database(sqlx::Error),
    PasswordHash(String),
}

impl fmt::Display for AccountError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccountError::Database(e) => write!(f, "account database error: {e}"),
            AccountError::PasswordHash(msg) => write!(f, "password hashing failed: {msg}"),
        }
    }
}

impl std::error::Error for AccountError {}

impl From<sqlx::Error> for AccountError {
    fn from(e: sqlx::Error) -> Self {
        AccountError::Database(e)
    }
}

impl From<PasswordError> for AccountError {
    fn from(e: PasswordError) -> Self {
        AccountError::PasswordHash(e.to_string())
    }
}

/// User role for authorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    User,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::User => "user",
            UserRole::Admin => "admin",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "admin" => UserRole::Admin,
            _ => UserRole::User,
        }
    }
}

#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    pub login: String,
    pub role: UserRole,
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    login: String,
    password_hash: String,
    role: String,
}

/// Fields needed to register an account.
#[derive(Debug, Clone)]
pub struct NewUser<'a> {
    pub login: &'a str,
    pub password: &'a str,
    pub name: &'a str,
    pub birth_date: &'a str,
    pub email: &'a str,
}

/// Profile fields shown on the settings page.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct UserProfile {
    pub login: String,
    pub name: String,
    pub email: String,
    pub photo: String,
    #[serde(rename = "birthday")]
    pub birth_date: String,
}

/// Partial profile update; `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate<'a> {
    pub name: Option<&'a str>,
    pub email: Option<&'a str>,
    pub birth_date: Option<&'a str>,
    pub password: Option<&'a str>,
}

/// Account id paired with its avatar path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct IdAndPath {
    pub id: i64,
    pub path: String,
}

impl UserStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create an account. Returns the new user ID.
    pub async fn create(&self, user: &NewUser<'_>) -> Result<i64, AccountError> {
        let hash = hash_password(user.password).await?;
        let result = sqlx::query(
            "INSERT INTO users (login, password_hash, name, birth_date, email) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(user.login)
        .bind(&hash)
        .bind(user.name)
        .bind(user.birth_date)
        .bind(user.email)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    /// Whether an account with this login exists.
    pub async fn exists(&self, login: &str) -> Result<bool, sqlx::Error> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE login = ?")
            .bind(login)
            .fetch_one(&self.pool)
            .await?;
        Ok(count.0 > 0)
    }

    /// Look up an account by login and check its password.
    /// Unknown login and wrong password both yield `None`.
    pub async fn verify_credentials(
        &self,
        login: &str,
        password: &str,
    ) -> Result<Option<User>, AccountError> {
        let row: Option<UserRow> = sqlx::query_as(
            "SELECT id, login, password_hash, role FROM users WHERE login = ?",
        )
        .bind(login)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        if !verify_password(row.password_hash, password).await? {
            return Ok(None);
        }
        Ok(Some(User {
            id: row.id,
            login: row.login,
            role: UserRole::parse(&row.role),
        }))
    }

    /// Map a login to its numeric account id.
    pub async fn get_id_by_login(&self, login: &str) -> Result<Option<i64>, sqlx::Error> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT id FROM users WHERE login = ?")
            .bind(login)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| r.0))
    }

    pub async fn get_role(&self, login: &str) -> Result<Option<UserRole>, sqlx::Error> {
        let row: Option<(String,)> = sqlx::query_as("SELECT role FROM users WHERE login = ?")
            .bind(login)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| UserRole::parse(&r.0)))
    }

    pub async fn get_profile(&self, login: &str) -> Result<Option<UserProfile>, sqlx::Error> {
        sqlx::query_as(
            "SELECT login, name, email, photo, birth_date FROM users WHERE login = ?",
        )
        .bind(login)
        .fetch_optional(&self.pool)
        .await
    }

    /// Apply a partial profile update. Returns false if no such login.
    pub async fn edit_profile(
        &self,
        login: &str,
        update: &ProfileUpdate<'_>,
    ) -> Result<bool, AccountError> {
        let password_hash = match update.password {
            Some(password) => Some(hash_password(password).await?),
            None => None,
        };

        let result = sqlx::query(
            "UPDATE users SET
                name = COALESCE(?, name),
                email = COALESCE(?, email),
                birth_date = COALESCE(?, birth_date),
                password_hash = COALESCE(?, password_hash)
             WHERE login = ?",
        )
        .bind(update.name)
        .bind(update.email)
        .bind(update.birth_date)
        .bind(password_hash)
        .bind(login)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Every account id with its avatar path, ordered by id.
    pub async fn ids_and_paths(&self) -> Result<Vec<IdAndPath>, sqlx::Error> {
        sqlx::query_as("SELECT id, photo AS path FROM users ORDER BY id")
            .fetch_all(&self.pool)
            .await
    }
}
