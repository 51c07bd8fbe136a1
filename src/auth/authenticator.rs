// ABOUTME: Credential checking for the login route, plus an Argon2-backed implementation
// ABOUTME: Authenticators return the principal to store in the session, or None on bad credentials

use anyhow::Result;
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::panel::CurrentAdmin;

/// Turns submitted credentials into a principal.
///
/// `Ok(None)` means the credentials were wrong; `Err` is reserved for
/// failures of the backing service and is reported to the client as a 500.
#[async_trait]
pub trait Authenticator: Send + Sync + 'static {
    async fn authenticate(&self, email: &str, password: &str) -> Result<Option<CurrentAdmin>>;
}

/// One admin account with an Argon2 password hash
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminAccount {
    pub email: String,
    pub password_hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl AdminAccount {
    /// Create an account by hashing the provided password
    pub fn create(email: &str, password: &str) -> Result<Self> {
        Ok(Self {
            email: email.to_string(),
            password_hash: hash_password(password)?,
            title: None,
        })
    }

    pub fn verify_password(&self, password: &str) -> bool {
        verify_password(password, &self.password_hash)
    }

    fn principal(&self) -> CurrentAdmin {
        CurrentAdmin {
            email: self.email.clone(),
            title: self.title.clone(),
            avatar_url: None,
            id: None,
            extra: serde_json::Map::new(),
        }
    }
}

/// Authenticates against a fixed list of accounts
#[derive(Debug, Clone, Default)]
pub struct PasswordAuthenticator {
    accounts: Vec<AdminAccount>,
}

impl PasswordAuthenticator {
    pub fn new(accounts: Vec<AdminAccount>) -> Self {
        Self { accounts }
    }
}

#[async_trait]
impl Authenticator for PasswordAuthenticator {
    async fn authenticate(&self, email: &str, password: &str) -> Result<Option<CurrentAdmin>> {
        let email = email.trim();
        let Some(account) = self
            .accounts
            .iter()
            .find(|a| a.email.eq_ignore_ascii_case(email))
        else {
            return Ok(None);
        };

        let account = account.clone();
        let password = password.to_string();
        // Argon2 verification is CPU-bound
        let verified = tokio::task::spawn_blocking(move || {
            account
                .verify_password(&password)
                .then(|| account.principal())
        })
        .await?;
        Ok(verified)
    }
}

// =============================================================================
// Password hashing utilities
// =============================================================================

/// Hash a password using Argon2id
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?;
    Ok(hash.to_string())
}

/// Verify a password against an Argon2 hash
pub fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(parsed_hash) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}
