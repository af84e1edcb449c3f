use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::sync::Mutex;
use tracing::info;

use accountmint_core::AccountRecord;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt store file: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Append-only credential file: a single JSON array of records. Appending
/// reads the existing array (a missing file counts as empty), pushes, and
/// rewrites the whole file. The mutex serializes appends so concurrent
/// sessions can never interleave read-modify-write cycles.
pub struct CredentialStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn append(&self, record: &AccountRecord) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;

        let mut records = self.read_records().await?;
        records.push(record.clone());

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let json = serde_json::to_string_pretty(&records)?;
        tokio::fs::write(&self.path, json).await?;

        info!(email = %record.email, total = records.len(), "account saved");
        Ok(())
    }

    pub async fn load(&self) -> Result<Vec<AccountRecord>, StoreError> {
        let _guard = self.lock.lock().await;
        self.read_records().await
    }

    async fn read_records(&self) -> Result<Vec<AccountRecord>, StoreError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn record(email: &str) -> AccountRecord {
        AccountRecord::new(email.to_string(), email.to_string(), "Ada".into(), "Miller".into())
    }

    #[tokio::test]
    async fn missing_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = CredentialStore::new(dir.path().join("accounts.json"));
        assert!(store.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn append_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = CredentialStore::new(dir.path().join("accounts.json"));

        store.append(&record("one@mail.test")).await.unwrap();
        store.append(&record("two@mail.test")).await.unwrap();

        let records = store.load().await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].email, "one@mail.test");
        assert_eq!(records[1].email, "two@mail.test");
    }

    #[tokio::test]
    async fn creates_parent_directory_on_first_append() {
        let dir = tempfile::tempdir().unwrap();
        let store = CredentialStore::new(dir.path().join("nested/data/accounts.json"));
        store.append(&record("one@mail.test")).await.unwrap();
        assert_eq!(store.load().await.unwrap().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn concurrent_appends_lose_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(CredentialStore::new(dir.path().join("accounts.json")));

        let mut handles = Vec::new();
        for i in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.append(&record(&format!("user{}@mail.test", i))).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(store.load().await.unwrap().len(), 8);
    }
}
