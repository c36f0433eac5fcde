//! Per-session owner detection.
//!
//! Whether the viewer may change anything is derived from navigation history
//! within the session: visiting the overview marks the session as the owner's,
//! and a list opened later in the same session inherits that. A list opened
//! in a session that never visited the overview is read-only.
//!
//! This is a convenience, not an authorization boundary. Anyone who opens the
//! overview in their own session becomes an owner.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use log::debug;

pub const OWNER_KEY: &str = "docket_owner";
const OWNER_VALUE: &str = "true";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Unknown,
    Owner,
    Viewer,
}

impl Access {
    pub fn can_edit(self) -> bool {
        self == Access::Owner
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Owner => "owner",
            Self::Viewer => "viewer",
        }
    }
}

impl fmt::Display for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Key/value storage that lives exactly as long as one session.
pub trait SessionStorage {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
    fn remove(&mut self, key: &str) -> Result<()>;
}

/// Storage for a session that exists only inside this process (the TUI's
/// own navigation, tests).
#[derive(Debug, Default)]
pub struct MemoryStorage {
    values: HashMap<String, String>,
}

impl SessionStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.values.remove(key);
        Ok(())
    }
}

/// Storage for a session shared by several processes: one directory per
/// session, one file per key.
#[derive(Debug, Clone)]
pub struct DirStorage {
    dir: PathBuf,
}

impl DirStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.dir.join(key)
    }
}

impl SessionStorage for DirStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.key_path(key);
        match fs::read_to_string(&path) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("failed to read {}", path.display())),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("failed to create {}", self.dir.display()))?;
        let path = self.key_path(key);
        fs::write(&path, value).with_context(|| format!("failed to write {}", path.display()))
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        let path = self.key_path(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("failed to remove {}", path.display())),
        }
    }
}

pub struct AccessController<S> {
    state: Access,
    storage: S,
}

impl<S: SessionStorage> AccessController<S> {
    pub fn new(storage: S) -> Self {
        Self {
            state: Access::Unknown,
            storage,
        }
    }

    pub fn state(&self) -> Access {
        self.state
    }

    /// The overview was opened: this session belongs to the owner from now on.
    pub fn enter_dashboard(&mut self) -> Result<Access> {
        self.storage.set(OWNER_KEY, OWNER_VALUE)?;
        self.state = Access::Owner;
        debug!("session marked as owner");
        Ok(self.state)
    }

    /// A specific list was opened, possibly from a shared link.
    pub fn enter_list(&mut self) -> Result<Access> {
        self.state = if self.has_owner_marker()? {
            Access::Owner
        } else {
            Access::Viewer
        };
        Ok(self.state)
    }

    pub fn has_owner_marker(&self) -> Result<bool> {
        Ok(self.storage.get(OWNER_KEY)?.as_deref() == Some(OWNER_VALUE))
    }

    /// Drop the owner marker. Lists opened afterwards in this session are
    /// read-only until the overview is visited again.
    pub fn forget(&mut self) -> Result<()> {
        self.storage.remove(OWNER_KEY)?;
        self.state = Access::Unknown;
        Ok(())
    }
}
