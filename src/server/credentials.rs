//! Durable credential store for the chat relay
//!
//! Accounts are kept in a JSON file mapping email to record, loaded fully
//! on open. Secrets are stored as salted argon2 digests, never as
//! comparable plaintext. All read-modify-write operations run under one
//! mutex so that racing account-create calls with the same email have
//! exactly one winner, and the in-memory map always mirrors the latest
//! durable state.

use std::collections::HashMap;
use std::fmt;
use std::fs::{self, File};
use std::io::Write;
use std::path::PathBuf;

use argon2::Argon2;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::{RelayError, Result};

/// One persisted account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountRecord {
    /// Display name chosen at registration
    pub username: String,
    /// Account email (unique key)
    pub email: String,
    /// Salted argon2 digest of the account secret (PHC string)
    pub secret_hash: String,
}

/// Failure modes of credential operations
#[derive(Debug)]
pub enum CredentialError {
    /// An account with this email already exists
    DuplicateEmail,
    /// The underlying persistence failed; the store is unchanged
    Store(RelayError),
}

impl fmt::Display for CredentialError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialError::DuplicateEmail => write!(f, "email already registered"),
            CredentialError::Store(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for CredentialError {}

/// Outcome of a login verification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyOutcome {
    /// Credentials match; carries the account's username
    Match(String),
    /// No account with that email
    NoSuchEmail,
    /// Account found but the secret does not match
    SecretMismatch,
}

/// JSON file-backed account store keyed by email
pub struct CredentialStore {
    path: PathBuf,
    accounts: Mutex<HashMap<String, AccountRecord>>,
}

impl CredentialStore {
    /// Open the store at the given path, loading existing accounts or
    /// starting empty if the file does not exist yet
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let accounts = if path.exists() {
            let data = fs::read_to_string(&path)
                .map_err(|e| RelayError::store(format!("Failed to read {}: {}", path.display(), e)))?;
            serde_json::from_str(&data)
                .map_err(|e| RelayError::store(format!("Corrupt store {}: {}", path.display(), e)))?
        } else {
            HashMap::new()
        };

        info!(
            "Opened credential store at {} ({} accounts)",
            path.display(),
            accounts.len()
        );

        Ok(Self {
            path,
            accounts: Mutex::new(accounts),
        })
    }

    /// Create an account. Check-then-insert runs as one atomic unit: of two
    /// concurrent creates with the same email, exactly one succeeds and the
    /// other gets `DuplicateEmail`. The record is durable before this
    /// returns.
    pub async fn create(
        &self,
        username: &str,
        email: &str,
        secret: &str,
    ) -> std::result::Result<(), CredentialError> {
        let mut accounts = self.accounts.lock().await;

        if accounts.contains_key(email) {
            debug!("Account create rejected, email already registered");
            return Err(CredentialError::DuplicateEmail);
        }

        let secret_hash = hash_secret(secret)
            .map_err(|e| CredentialError::Store(RelayError::internal(format!("Hashing failed: {}", e))))?;

        accounts.insert(
            email.to_string(),
            AccountRecord {
                username: username.to_string(),
                email: email.to_string(),
                secret_hash,
            },
        );

        if let Err(e) = self.persist(&accounts) {
            // Roll back so memory keeps mirroring the durable state
            accounts.remove(email);
            return Err(CredentialError::Store(RelayError::store(format!(
                "Failed to persist account store: {}",
                e
            ))));
        }

        info!("Created account for {}", username);
        Ok(())
    }

    /// Verify a login attempt. Exactly one of three outcomes: no such
    /// email, secret mismatch, or a match carrying the stored username.
    pub async fn verify(
        &self,
        email: &str,
        secret: &str,
    ) -> std::result::Result<VerifyOutcome, CredentialError> {
        let accounts = self.accounts.lock().await;

        let record = match accounts.get(email) {
            Some(record) => record,
            None => return Ok(VerifyOutcome::NoSuchEmail),
        };

        let matches = verify_secret(secret, &record.secret_hash).map_err(|e| {
            CredentialError::Store(RelayError::store(format!("Corrupt secret digest: {}", e)))
        })?;

        if matches {
            Ok(VerifyOutcome::Match(record.username.clone()))
        } else {
            Ok(VerifyOutcome::SecretMismatch)
        }
    }

    /// Number of stored accounts
    pub async fn len(&self) -> usize {
        self.accounts.lock().await.len()
    }

    /// Write the full record set to a temporary file, flush it, then rename
    /// over the store path. A failure mid-write leaves the prior file
    /// intact; readers never observe a partially-written store.
    fn persist(&self, accounts: &HashMap<String, AccountRecord>) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let data = serde_json::to_string_pretty(accounts)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

        let tmp = self.path.with_extension("tmp");
        let mut file = File::create(&tmp)?;
        file.write_all(data.as_bytes())?;
        file.sync_all()?;
        fs::rename(&tmp, &self.path)?;

        Ok(())
    }
}

/// Hash a secret with a fresh random salt, producing a PHC string
fn hash_secret(secret: &str) -> std::result::Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(secret.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Compare a secret against a stored digest
fn verify_secret(
    secret: &str,
    digest: &str,
) -> std::result::Result<bool, argon2::password_hash::Error> {
    let parsed = PasswordHash::new(digest)?;
    match Argon2::default().verify_password(secret.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(e),
    }
}
