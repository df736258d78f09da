use crate::ipc::STORED_TOKEN_KEY;
use std::fmt;
use std::path::PathBuf;
use std::sync::RwLock;
use tracing::{debug, warn};

/// Keyring service name; the account is [`STORED_TOKEN_KEY`].
pub const KEYRING_SERVICE: &str = "afrelay-monitor";

#[derive(Debug)]
pub enum AuthError {
    Storage(String),
    Keyring(String),
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::Storage(s) => write!(f, "Token storage: {}", s),
            AuthError::Keyring(s) => write!(f, "Keyring: {}", s),
        }
    }
}

impl std::error::Error for AuthError {}

/// Source of the bearer token attached to API calls.
/// An empty token on `set_token` clears the stored value.
pub trait CredentialProvider: Send + Sync {
    fn get_token(&self) -> Option<String>;
    fn set_token(&self, token: &str) -> Result<(), AuthError>;
}

fn normalize(token: &str) -> Option<String> {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Process-local token holder.
#[derive(Default)]
pub struct MemoryCredentials {
    token: RwLock<Option<String>>,
}

impl MemoryCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: &str) -> Self {
        Self {
            token: RwLock::new(normalize(token)),
        }
    }
}

impl CredentialProvider for MemoryCredentials {
    fn get_token(&self) -> Option<String> {
        match self.token.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn set_token(&self, token: &str) -> Result<(), AuthError> {
        let mut guard = self
            .token
            .write()
            .map_err(|e| AuthError::Storage(format!("Lock poisoned: {}", e)))?;
        *guard = normalize(token);
        Ok(())
    }
}

/// Token persisted as the sole content of a file.
pub struct FileCredentials {
    path: PathBuf,
}

impl FileCredentials {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

impl CredentialProvider for FileCredentials {
    fn get_token(&self) -> Option<String> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => normalize(&content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                warn!("[AUTH] Failed to read token file {:?}: {}", self.path, e);
                None
            }
        }
    }

    fn set_token(&self, token: &str) -> Result<(), AuthError> {
        match normalize(token) {
            Some(value) => {
                if let Some(parent) = self.path.parent() {
                    if !parent.as_os_str().is_empty() {
                        std::fs::create_dir_all(parent).map_err(|e| {
                            AuthError::Storage(format!("{}: {}", parent.display(), e))
                        })?;
                    }
                }
                std::fs::write(&self.path, value)
                    .map_err(|e| AuthError::Storage(format!("{}: {}", self.path.display(), e)))
            }
            None => match std::fs::remove_file(&self.path) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(AuthError::Storage(format!("{}: {}", self.path.display(), e))),
            },
        }
    }
}

/// Token kept in the OS keyring.
pub struct KeyringCredentials {
    entry: keyring::Entry,
}

impl KeyringCredentials {
    pub fn new() -> Result<Self, AuthError> {
        let entry = keyring::Entry::new(KEYRING_SERVICE, STORED_TOKEN_KEY)
            .map_err(|e| AuthError::Keyring(e.to_string()))?;
        Ok(Self { entry })
    }
}

impl CredentialProvider for KeyringCredentials {
    fn get_token(&self) -> Option<String> {
        match self.entry.get_password() {
            Ok(token) => normalize(&token),
            Err(keyring::Error::NoEntry) => None,
            Err(e) => {
                warn!("[AUTH] Keyring read failed: {}", e);
                None
            }
        }
    }

    fn set_token(&self, token: &str) -> Result<(), AuthError> {
        match normalize(token) {
            Some(value) => self
                .entry
                .set_password(&value)
                .map_err(|e| AuthError::Keyring(e.to_string())),
            None => match self.entry.delete_credential() {
                Ok(()) | Err(keyring::Error::NoEntry) => {
                    debug!("[AUTH] Keyring token cleared");
                    Ok(())
                }
                Err(e) => Err(AuthError::Keyring(e.to_string())),
            },
        }
    }
}
