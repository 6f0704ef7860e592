//! # Credential Store
//!
//! Login → secret lookup used by the verifier.
//!
//! The on-disk format is one `login:secret` pair per line:
//!
//! ```text
//! # comment
//! user:P@ssw0rd
//! alice : s3cret
//! ```
//!
//! Lines are split at the first `:`; both fields are trimmed. Empty lines and
//! lines starting with `#` are ignored, lines without a separator or with an
//! empty field are skipped, and a repeated login overrides the earlier entry.
//! The database is loaded once and shared read-only.

use crate::error::{constants, ProtocolError, Result};
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Lookup contract the verifier depends on.
pub trait CredentialStore: Send + Sync {
    /// Secret registered for `login`, if any.
    fn lookup(&self, login: &str) -> Option<&str>;
}

impl<S: CredentialStore + ?Sized> CredentialStore for Arc<S> {
    fn lookup(&self, login: &str) -> Option<&str> {
        (**self).lookup(login)
    }
}

/// In-memory credential database loaded from a flat `login:secret` file.
#[derive(Debug, Clone, Default)]
pub struct CredentialDb {
    entries: HashMap<String, String>,
}

impl CredentialDb {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the database from a file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut file = File::open(path).map_err(|e| {
            ProtocolError::CredentialStore(format!(
                "{}: {}: {e}",
                constants::ERR_CREDENTIALS_OPEN,
                path.display()
            ))
        })?;

        let mut contents = String::new();
        file.read_to_string(&mut contents).map_err(|e| {
            ProtocolError::CredentialStore(format!(
                "{}: {}: {e}",
                constants::ERR_CREDENTIALS_READ,
                path.display()
            ))
        })?;

        let db = Self::parse(&contents);
        info!(path = %path.display(), entries = db.len(), "Credential database loaded");
        Ok(db)
    }

    /// Parse database text. Never fails; unusable lines are skipped.
    pub fn parse(contents: &str) -> Self {
        let mut db = Self::new();

        for (index, line) in contents.lines().enumerate() {
            let line_no = index + 1;
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let Some((login, secret)) = line.split_once(':') else {
                debug!(line = line_no, "Skipping credential line without separator");
                continue;
            };

            let (login, secret) = (login.trim(), secret.trim());
            if login.is_empty() || secret.is_empty() {
                warn!(line = line_no, "Skipping credential line with an empty field");
                continue;
            }

            db.insert(login, secret);
        }

        db
    }

    /// Add or replace an entry.
    pub fn insert(&mut self, login: impl Into<String>, secret: impl Into<String>) {
        self.entries.insert(login.into(), secret.into());
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl CredentialStore for CredentialDb {
    fn lookup(&self, login: &str) -> Option<&str> {
        self.entries.get(login).map(String::as_str)
    }
}

impl<L: Into<String>, S: Into<String>> FromIterator<(L, S)> for CredentialDb {
    fn from_iter<I: IntoIterator<Item = (L, S)>>(iter: I) -> Self {
        let mut db = Self::new();
        for (login, secret) in iter {
            db.insert(login, secret);
        }
        db
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_basic_entries() {
        let db = CredentialDb::parse("user:P@ssw0rd\nalice:s3cret\n");
        assert_eq!(db.len(), 2);
        assert_eq!(db.lookup("user"), Some("P@ssw0rd"));
        assert_eq!(db.lookup("alice"), Some("s3cret"));
        assert_eq!(db.lookup("bob"), None);
    }

    #[test]
    fn test_parse_trims_fields() {
        let db = CredentialDb::parse("  user \t:\t P@ssw0rd  \n");
        assert_eq!(db.lookup("user"), Some("P@ssw0rd"));
    }

    #[test]
    fn test_parse_skips_comments_blank_and_broken_lines() {
        let db = CredentialDb::parse("# header\n\nno separator here\nuser:pw\n:orphan\nghost:\n");
        assert_eq!(db.len(), 1);
        assert_eq!(db.lookup("user"), Some("pw"));
    }

    #[test]
    fn test_secret_may_contain_separator() {
        let db = CredentialDb::parse("user:a:b:c");
        assert_eq!(db.lookup("user"), Some("a:b:c"));
    }

    #[test]
    fn test_later_entry_overrides() {
        let db = CredentialDb::parse("user:old\nuser:new\n");
        assert_eq!(db.lookup("user"), Some("new"));
    }

    #[test]
    fn test_lookup_is_exact_match() {
        let db: CredentialDb = [("user", "pw")].into_iter().collect();
        assert_eq!(db.lookup("User"), None);
        assert_eq!(db.lookup("use"), None);
    }

    #[test]
    fn test_lookup_through_arc() {
        let store: Arc<dyn CredentialStore> = Arc::new(CredentialDb::parse("user:pw"));
        assert_eq!(store.lookup("user"), Some("pw"));
    }
}
