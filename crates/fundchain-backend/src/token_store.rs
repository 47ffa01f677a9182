// SPDX-License-Identifier: Apache-2.0

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use fundchain_core::{resolve_fundchain_cache_dir, token_fingerprint, ClientError};
use tracing::info;

pub const TOKEN_FILE_NAME: &str = "auth_token";

/// The one piece of durable client state: the backend bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    #[must_use]
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(TOKEN_FILE_NAME))
    }

    /// `<cache>/auth_token` under the resolved fundchain cache directory.
    #[must_use]
    pub fn default_location() -> Self {
        Self::in_dir(&resolve_fundchain_cache_dir())
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Missing or blank file reads as no token.
    pub fn load(&self) -> Result<Option<String>, ClientError> {
        match fs::read_to_string(&self.path) {
            Ok(raw) => {
                let token = raw.trim();
                Ok((!token.is_empty()).then(|| token.to_string()))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ClientError::internal(format!(
                "read token {} failed: {e}",
                self.path.display()
            ))),
        }
    }

    pub fn save(&self, token: &str) -> Result<(), ClientError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(ClientError::invalid_field("token", "token must not be empty"));
        }
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                ClientError::internal(format!("create {} failed: {e}", parent.display()))
            })?;
        }
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, token)
            .map_err(|e| ClientError::internal(format!("write {} failed: {e}", tmp.display())))?;
        restrict_permissions(&tmp)?;
        fs::rename(&tmp, &self.path).map_err(|e| {
            ClientError::internal(format!("rename to {} failed: {e}", self.path.display()))
        })?;
        info!(token = %token_fingerprint(token), path = %self.path.display(), "auth token stored");
        Ok(())
    }

    /// Idempotent sign-out.
    pub fn clear(&self) -> Result<(), ClientError> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                info!(path = %self.path.display(), "auth token cleared");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ClientError::internal(format!(
                "remove {} failed: {e}",
                self.path.display()
            ))),
        }
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<(), ClientError> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))
        .map_err(|e| ClientError::internal(format!("chmod {} failed: {e}", path.display())))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<(), ClientError> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_load_clear_cycle() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = TokenStore::in_dir(&dir.path().join("nested"));
        assert_eq!(store.load().expect("load"), None);

        store.save("  header.payload.sig\n").expect("save");
        assert_eq!(
            store.load().expect("load").as_deref(),
            Some("header.payload.sig")
        );

        store.clear().expect("clear");
        store.clear().expect("second clear");
        assert_eq!(store.load().expect("load"), None);
    }

    #[test]
    fn blank_file_reads_as_absent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = TokenStore::in_dir(dir.path());
        fs::write(store.path(), "   ").expect("write");
        assert_eq!(store.load().expect("load"), None);
    }

    #[test]
    fn empty_token_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = TokenStore::in_dir(dir.path()).save(" ").expect_err("empty");
        assert!(err.field_errors().is_some_and(|f| f.contains_key("token")));
    }

    #[cfg(unix)]
    #[test]
    fn stored_token_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().expect("tempdir");
        let store = TokenStore::in_dir(dir.path());
        store.save("a.b.c").expect("save");
        let mode = fs::metadata(store.path()).expect("meta").permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
