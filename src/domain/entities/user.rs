use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::error::{check_length, ValidationError};

pub const USERNAME_MIN_LEN: usize = 2;
pub const USERNAME_MAX_LEN: usize = 64;
pub const EMAIL_MAX_LEN: usize = 255;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    /// Opaque credential digest. Hashing happens outside this crate.
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub is_verified: bool,
    pub last_login: DateTime<Utc>,
    pub last_password_change: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewUser {
    username: String,
    email: String,
    password_hash: String,
    is_verified: bool,
    last_login: DateTime<Utc>,
    last_password_change: DateTime<Utc>,
}

impl NewUser {
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        password_hash: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let username = username.into();
        let email = email.into();
        validate_username(&username)?;
        validate_email(&email)?;

        let now = Utc::now().trunc_subsecs(6);
        Ok(Self {
            username,
            email,
            password_hash: password_hash.into(),
            is_verified: false,
            last_login: now,
            last_password_change: now,
        })
    }

    pub fn verified(mut self) -> Self {
        self.is_verified = true;
        self
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn email(&self) -> &str {
        &self.email
    }
}

pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    check_length("username", username, USERNAME_MIN_LEN, USERNAME_MAX_LEN)?;
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
    {
        return Err(ValidationError::field(
            "username",
            "must contain only alphanumeric characters, underscores, dots, or hyphens",
        ));
    }
    Ok(())
}

/// Accepts `local@domain.tld`: one `@`, non-empty local part, and a dot
/// inside the domain with text on both sides.
pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    let invalid = || ValidationError::field("email", "invalid email address format");

    if email.chars().count() > EMAIL_MAX_LEN || email.chars().any(char::is_whitespace) {
        return Err(invalid());
    }
    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty() || domain.contains('@') {
        return Err(invalid());
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) if !host.is_empty() && !tld.is_empty() => Ok(()),
        _ => Err(invalid()),
    }
}
