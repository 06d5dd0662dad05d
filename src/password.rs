//! Argon2 password hashing.
//!
//! Hashing and verification are CPU-bound, so the public functions run them
//! on tokio's blocking pool.

use std::fmt;

use argon2::password_hash::{PasswordHash, SaltString};
use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use rand::RngCore;
use tokio::task;

#[derive(Debug)]
pub enum PasswordError {
    Hash(argon2::password_hash::Error),
    /// The blocking task panicked or was cancelled.
    Task(String),
}

impl fmt::Display for PasswordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PasswordError::Hash(e) => write!(f, "password hashing failed: {e}"),
            PasswordError::Task(msg) => write!(f, "password task failed: {msg}"),
        }
    }
}

impl std::error::Error for PasswordError {}

impl From<argon2::password_hash::Error> for PasswordError {
    fn from(e: argon2::password_hash::Error) -> Self {
        PasswordError::Hash(e)
    }
}

impl From<task::JoinError> for PasswordError {
    fn from(e: task::JoinError) -> Self {
        PasswordError::Task(e.to_string())
    }
}

/// Hash a password into a PHC string.
pub async fn hash_password(password: &str) -> Result<String, PasswordError> {
    let password = password.to_string();
    task::spawn_blocking(move || hash_blocking(&password)).await?
}

/// Check a password against a stored PHC string. Unparseable hashes never match.
pub async fn verify_password(hash: String, password: &str) -> Result<bool, PasswordError> {
    let password = password.to_string();
    Ok(task::spawn_blocking(move || verify_blocking(&hash, &password)).await?)
}

fn hash_blocking(password: &str) -> Result<String, PasswordError> {
    let mut salt_bytes = [0u8; 16];
    rand::rng().fill_bytes(&mut salt_bytes);
    let salt = SaltString::encode_b64(&salt_bytes)?;
    let phc = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(phc.to_string())
}

fn verify_blocking(hash: &str, password: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}
