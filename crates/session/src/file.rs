//! JSON-file session storage.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use pipeline::{CredentialStore, CredentialStoreError, Session};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;
use tracing::debug;

/// Credential store persisted as a JSON document.
///
/// The file is read once by [`FileCredentialStore::open`]; afterwards reads are
/// served from memory and every change is written through. Writes go to a
/// sibling temporary file that is then renamed over the target, so a crash
/// never leaves a half-written session behind. On unix the temporary file is
/// created owner-only (`0o600`); it never exists with wider permissions.
#[derive(Debug)]
pub struct FileCredentialStore {
    path: PathBuf,
    session: RwLock<Session>,
}

impl FileCredentialStore {
    /// Opens the store at `path`. A missing file is an empty session.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or is not a
    /// valid session document.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, CredentialStoreError> {
        let path = path.into();
        let session = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(err) if err.kind() == ErrorKind::NotFound => Session::default(),
            Err(err) => return Err(err.into()),
        };
        debug!(path = %path.display(), signed_in = session.token.is_some(), "credential store opened");
        Ok(Self {
            path,
            session: RwLock::new(session),
        })
    }

    /// The backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn write(&self, session: &Session) -> Result<(), CredentialStoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let bytes = serde_json::to_vec_pretty(session)?;
        let tmp = self.path.with_extension("tmp");

        let result = replace_privately(&tmp, &bytes, &self.path).await;
        if result.is_err() {
            if let Err(err) = remove_if_present(&tmp).await {
                debug!(path = %tmp.display(), error = %err, "failed to remove temporary credential file");
            }
        }
        Ok(result?)
    }
}

/// Writes `bytes` to a fresh owner-only `tmp` and renames it over `target`.
async fn replace_privately(tmp: &Path, bytes: &[u8], target: &Path) -> std::io::Result<()> {
    // A stale file from an interrupted write may carry other permissions.
    remove_if_present(tmp).await?;

    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    options.mode(0o600);

    let mut file = options.open(tmp).await?;
    file.write_all(bytes).await?;
    file.sync_all().await?;
    drop(file);

    tokio::fs::rename(tmp, target).await
}

async fn remove_if_present(path: &Path) -> std::io::Result<()> {
    match tokio::fs::remove_file(path).await {
        Err(err) if err.kind() != ErrorKind::NotFound => Err(err),
        _ => Ok(()),
    }
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    async fn session(&self) -> Session {
        self.session.read().await.clone()
    }

    async fn set_session(&self, session: Session) -> Result<(), CredentialStoreError> {
        let mut current = self.session.write().await;
        self.write(&session).await?;
        *current = session;
        Ok(())
    }

    async fn clear(&self) -> Result<(), CredentialStoreError> {
        let mut current = self.session.write().await;
        remove_if_present(&self.path).await?;
        *current = Session::default();
        debug!(path = %self.path.display(), "credential file removed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_file_is_empty_session() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCredentialStore::open(dir.path().join("session.json"))
            .await
            .unwrap();
        assert!(store.session().await.is_empty());
    }

    #[tokio::test]
    async fn session_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("session.json");

        let store = FileCredentialStore::open(&path).await.unwrap();
        store
            .set_session(Session::new("tok", Some("u-9".to_owned())))
            .await
            .unwrap();

        let reopened = FileCredentialStore::open(&path).await.unwrap();
        assert_eq!(
            reopened.session().await,
            Session::new("tok", Some("u-9".to_owned()))
        );
    }

    #[tokio::test]
    async fn clear_removes_file_and_is_repeatable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        let store = FileCredentialStore::open(&path).await.unwrap();
        store.set_session(Session::new("tok", None)).await.unwrap();
        assert!(path.exists());

        store.clear().await.unwrap();
        assert!(!path.exists());
        assert!(store.session().await.is_empty());

        store.clear().await.unwrap();
    }

    #[tokio::test]
    async fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, b"{not json").unwrap();

        let err = FileCredentialStore::open(&path).await.unwrap_err();
        assert!(matches!(err, CredentialStoreError::Serialization(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn file_is_private_to_owner() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        let store = FileCredentialStore::open(&path).await.unwrap();
        store.set_session(Session::new("tok", None)).await.unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn stale_world_readable_temp_file_is_not_reused() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        let tmp = dir.path().join("session.tmp");
        std::fs::write(&tmp, b"leftover").unwrap();
        std::fs::set_permissions(&tmp, std::fs::Permissions::from_mode(0o644)).unwrap();

        let store = FileCredentialStore::open(&path).await.unwrap();
        store.set_session(Session::new("tok", None)).await.unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        assert!(!tmp.exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failed_rename_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        let store = FileCredentialStore::open(&path).await.unwrap();

        // A non-empty directory cannot be replaced by a file.
        std::fs::create_dir(&path).unwrap();
        std::fs::write(path.join("occupied"), b"x").unwrap();

        let err = store.set_session(Session::new("tok", None)).await.unwrap_err();
        assert!(matches!(err, CredentialStoreError::Io(_)));
        assert!(!dir.path().join("session.tmp").exists());
        assert!(store.session().await.is_empty());
    }
}
