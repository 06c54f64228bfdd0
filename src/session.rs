use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use crate::error::ClientResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CredentialKey {
    Token,
    Username,
    Name,
    Email,
    RememberedEmail,
}

impl CredentialKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Token => "token",
            Self::Username => "username",
            Self::Name => "name",
            Self::Email => "email",
            Self::RememberedEmail => "rememberedEmail",
        }
    }
}

/// Durable key/value storage for credentials.
pub trait CredentialStore: Send + Sync {
    fn get(&self, key: CredentialKey) -> Option<String>;
    fn set(&self, key: CredentialKey, value: &str) -> ClientResult<()>;
    fn remove(&self, key: CredentialKey) -> ClientResult<()>;
}

/// Credentials kept only for the lifetime of the process.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    entries: Mutex<BTreeMap<CredentialKey, String>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get(&self, key: CredentialKey) -> Option<String> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.get(&key).cloned()
    }

    fn set(&self, key: CredentialKey, value: &str) -> ClientResult<()> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key, value.to_string());
        Ok(())
    }

    fn remove(&self, key: CredentialKey) -> ClientResult<()> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.remove(&key);
        Ok(())
    }
}

/// Credentials persisted as a flat JSON object, rewritten on every change.
#[derive(Debug)]
pub struct FileCredentialStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileCredentialStore {
    /// Open the store at `path`, loading existing entries if the file exists.
    pub fn open(path: &Path) -> ClientResult<Self> {
        let entries = if path.exists() {
            let json = fs::read_to_string(path)?;
            serde_json::from_str(&json)?
        } else {
            BTreeMap::new()
        };

        Ok(Self {
            path: path.to_path_buf(),
            entries: Mutex::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, entries: &BTreeMap<String, String>) -> ClientResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(entries)?)?;
        Ok(())
    }
}

impl CredentialStore for FileCredentialStore {
    fn get(&self, key: CredentialKey) -> Option<String> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.get(key.as_str()).cloned()
    }

    fn set(&self, key: CredentialKey, value: &str) -> ClientResult<()> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.as_str().to_string(), value.to_string());
        self.persist(&entries)
    }

    fn remove(&self, key: CredentialKey) -> ClientResult<()> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if entries.remove(key.as_str()).is_some() {
            self.persist(&entries)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub username: String,
}

impl Session {
    pub fn new(token: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            username: username.into(),
        }
    }
}

/// Shared handle to the current session.
#[derive(Clone)]
pub struct SessionContext {
    store: Arc<dyn CredentialStore>,
}

impl SessionContext {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self { store }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryCredentialStore::new()))
    }

    pub fn login(&self, session: &Session) -> ClientResult<()> {
        self.store.set(CredentialKey::Token, &session.token)?;
        self.store.set(CredentialKey::Username, &session.username)?;
        tracing::info!(username = %session.username, "Session started");
        Ok(())
    }

    /// Clear the token and username. The remembered e-mail is kept.
    pub fn logout(&self) -> ClientResult<()> {
        self.store.remove(CredentialKey::Token)?;
        self.store.remove(CredentialKey::Username)?;
        tracing::info!("Session cleared");
        Ok(())
    }

    pub fn current_session(&self) -> Option<Session> {
        let token = self.token()?;
        let username = self.username()?;
        Some(Session { token, username })
    }

    pub fn token(&self) -> Option<String> {
        non_empty(self.store.get(CredentialKey::Token))
    }

    pub fn username(&self) -> Option<String> {
        non_empty(self.store.get(CredentialKey::Username))
    }

    pub fn set_profile(&self, name: Option<&str>, email: Option<&str>) -> ClientResult<()> {
        if let Some(name) = name {
            self.store.set(CredentialKey::Name, name)?;
        }
        if let Some(email) = email {
            self.store.set(CredentialKey::Email, email)?;
        }
        Ok(())
    }

    pub fn email(&self) -> Option<String> {
        non_empty(self.store.get(CredentialKey::Email))
    }

    pub fn remembered_email(&self) -> Option<String> {
        non_empty(self.store.get(CredentialKey::RememberedEmail))
    }

    pub fn remember_email(&self, email: &str) -> ClientResult<()> {
        self.store.set(CredentialKey::RememberedEmail, email)
    }

    pub fn forget_email(&self) -> ClientResult<()> {
        self.store.remove(CredentialKey::RememberedEmail)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}
