//! In-memory user registry with argon2 password hashes.
//!
//! There are no sessions or tokens; login only checks the password.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use std::collections::HashMap;
use std::sync::RwLock;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum UserError {
    #[error("Email already registered")]
    EmailTaken,

    #[error("Email not found")]
    EmailNotFound,

    #[error("Incorrect password")]
    IncorrectPassword,

    #[error("Password hashing failed: {0}")]
    Hash(String),

    #[error("User store lock poisoned")]
    Poisoned,
}

/// Email to password hash.
#[derive(Debug, Default)]
pub struct UserStore {
    users: RwLock<HashMap<String, String>>,
}

impl UserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, email: &str, password: &str) -> Result<(), UserError> {
        let mut users = self.users.write().map_err(|_| UserError::Poisoned)?;
        if users.contains_key(email) {
            return Err(UserError::EmailTaken);
        }

        let hash = hash_password(password)?;
        users.insert(email.to_string(), hash);
        tracing::info!("Registered user {}", email);
        Ok(())
    }

    pub fn login(&self, email: &str, password: &str) -> Result<(), UserError> {
        let users = self.users.read().map_err(|_| UserError::Poisoned)?;
        let hash = users.get(email).ok_or(UserError::EmailNotFound)?;

        if verify_password(password, hash) {
            Ok(())
        } else {
            Err(UserError::IncorrectPassword)
        }
    }
}

fn hash_password(password: &str) -> Result<String, UserError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| UserError::Hash(e.to_string()))
}

fn verify_password(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}
