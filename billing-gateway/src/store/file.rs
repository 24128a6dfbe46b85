//! JSON file store.
//!
//! The whole state lives in one JSON document next to a `.lock` sidecar. Every
//! write takes an exclusive advisory lock on the sidecar, re-reads the document,
//! applies the change and replaces the document through a uniquely named temp
//! file. Two processes sharing one path therefore never lose each other's
//! records, and a crash leaves either the old or the new state on disk.

use std::{
    ffi::OsString,
    fs::{File, OpenOptions},
    io::{BufWriter, ErrorKind, Write},
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use fs2::FileExt;
use tempfile::NamedTempFile;
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use super::{BillingStore, InsertOutcome, state::StoreState};
use crate::{
    error::{GatewayError, Result},
    sync::{BillingProfile, TransactionRecord},
};

/// Store persisted as a single JSON document.
///
/// Reads are served from the copy loaded at the last write or refresh. Inserts
/// are checked against the document on disk, so a record written by another
/// process in the meantime comes back as [`InsertOutcome::Duplicate`].
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    lock_path: PathBuf,
    state: Mutex<StoreState>,
}

impl FileStore {
    /// Opens the store at `path`, starting empty if the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Store`] if the file exists but cannot be read
    /// or is not a valid store document.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let lock_path = sidecar(&path, "lock");

        let state = {
            let (path, lock_path) = (path.clone(), lock_path.clone());
            blocking(move || {
                let _lock = StoreLock::shared(&lock_path)?;
                read_state(&path)
            })
            .await?
        };
        debug!(
            path = %path.display(),
            profiles = state.profiles.len(),
            transactions = state.transactions.len(),
            "store loaded"
        );
        Ok(Self { path, lock_path, state: Mutex::new(state) })
    }

    /// Location of the store document.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Adds a profile and persists.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Store`] if the document cannot be written.
    pub async fn add_profile(&self, profile: BillingProfile) -> Result<()> {
        self.update(move |state| {
            state.profiles.push(profile);
            ((), true)
        })
        .await
    }

    /// Transactions recorded for a profile, in insertion order.
    pub async fn transactions_for(&self, profile_id: Uuid) -> Vec<TransactionRecord> {
        self.state.lock().await.transactions_for(profile_id)
    }

    /// Reloads the document written by any process sharing the path.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Store`] if the document cannot be read.
    pub async fn refresh(&self) -> Result<()> {
        let mut cached = self.state.lock().await;
        let (path, lock_path) = (self.path.clone(), self.lock_path.clone());
        *cached = blocking(move || {
            let _lock = StoreLock::shared(&lock_path)?;
            read_state(&path)
        })
        .await?;
        Ok(())
    }

    /// Applies `change` to the document on disk under the exclusive lock.
    ///
    /// `change` reports whether it modified the state; unmodified state is not
    /// rewritten. The cached copy is replaced only after a successful write.
    async fn update<T, F>(&self, change: F) -> Result<T>
    where
        F: FnOnce(&mut StoreState) -> (T, bool) + Send + 'static,
        T: Send + 'static,
    {
        let mut cached = self.state.lock().await;
        let (path, lock_path) = (self.path.clone(), self.lock_path.clone());

        let (state, value) = blocking(move || {
            let _lock = StoreLock::exclusive(&lock_path)?;
            let mut state = read_state(&path)?;
            let (value, changed) = change(&mut state);
            if changed {
                write_state(&path, &state)?;
            }
            Ok((state, value))
        })
        .await?;

        *cached = state;
        Ok(value)
    }
}

impl BillingStore for FileStore {
    async fn eligible_profiles(&self, since: DateTime<Utc>) -> Result<Vec<BillingProfile>> {
        self.refresh().await?;
        Ok(self.state.lock().await.eligible_profiles(since))
    }

    async fn transaction_exists(&self, profile_id: Uuid, transaction_id: &str) -> Result<bool> {
        Ok(self.state.lock().await.contains(profile_id, transaction_id))
    }

    async fn insert_transaction(&self, record: TransactionRecord) -> Result<InsertOutcome> {
        self.update(move |state| {
            let outcome = state.insert(record);
            (outcome, outcome == InsertOutcome::Inserted)
        })
        .await
    }
}

/// Advisory lock on the sidecar file, released when the handle closes.
struct StoreLock(File);

impl StoreLock {
    fn shared(lock_path: &Path) -> Result<Self> {
        let file = open_lock_file(lock_path)?;
        file.lock_shared().map_err(|e| io_error("cannot lock", lock_path, &e))?;
        Ok(Self(file))
    }

    fn exclusive(lock_path: &Path) -> Result<Self> {
        let file = open_lock_file(lock_path)?;
        file.lock_exclusive().map_err(|e| io_error("cannot lock", lock_path, &e))?;
        Ok(Self(file))
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.0);
    }
}

fn open_lock_file(lock_path: &Path) -> Result<File> {
    if let Some(parent) = lock_path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(|e| io_error("cannot create", parent, &e))?;
    }
    OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(lock_path)
        .map_err(|e| io_error("cannot open", lock_path, &e))
}

fn read_state(path: &Path) -> Result<StoreState> {
    let mut state = match std::fs::read(path) {
        Ok(bytes) => serde_json::from_slice::<StoreState>(&bytes).map_err(|e| {
            GatewayError::Store(format!("invalid store file {}: {e}", path.display()))
        })?,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(path = %path.display(), "store file not found, starting empty");
            StoreState::default()
        }
        Err(e) => return Err(io_error("cannot read", path, &e)),
    };
    state.reindex();
    Ok(state)
}

fn write_state(path: &Path, state: &StoreState) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp =
        NamedTempFile::new_in(dir).map_err(|e| io_error("cannot create temp file in", dir, &e))?;
    {
        let mut writer = BufWriter::new(tmp.as_file_mut());
        serde_json::to_writer_pretty(&mut writer, state)
            .map_err(|e| GatewayError::Store(format!("cannot serialize store: {e}")))?;
        writer.flush().map_err(|e| io_error("cannot write", path, &e))?;
    }
    tmp.as_file().sync_all().map_err(|e| io_error("cannot sync", path, &e))?;
    tmp.persist(path).map_err(|e| io_error("cannot replace", path, &e.error))?;
    Ok(())
}

fn sidecar(path: &Path, extension: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".");
    name.push(extension);
    PathBuf::from(name)
}

fn io_error(action: &str, path: &Path, e: &std::io::Error) -> GatewayError {
    GatewayError::Store(format!("{action} {}: {e}", path.display()))
}

async fn blocking<T, F>(work: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| GatewayError::Store(format!("store task failed: {e}")))?
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeDelta};
    use rust_decimal::Decimal;
    use tempfile::TempDir;

    use super::*;

    fn record(profile_id: Uuid, transaction_id: &str) -> TransactionRecord {
        TransactionRecord {
            profile_id,
            account_id: Uuid::new_v4(),
            transaction_id: transaction_id.to_owned(),
            transaction_date: NaiveDate::from_ymd_opt(2008, 10, 6)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            transaction_kind: None,
            amount: Decimal::new(500, 2),
            card_fragment: Some("1111".to_owned()),
            card_brand: Some("Visa".to_owned()),
            cardholder_name: None,
        }
    }

    async fn insert_many(store: &FileStore, profile_id: Uuid, prefix: &str) {
        for n in 0..10 {
            store.insert_transaction(record(profile_id, &format!("{prefix}-{n}"))).await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_missing_file_starts_empty() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::open(dir.path().join("billing.json")).await.unwrap();
        assert!(store.eligible_profiles(DateTime::<Utc>::MIN_UTC).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_state_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("billing.json");
        let profile =
            BillingProfile::new(Uuid::new_v4(), None, Utc::now() - TimeDelta::minutes(1), 1200);

        {
            let store = FileStore::open(&path).await.unwrap();
            store.add_profile(profile.clone()).await.unwrap();
            store.insert_transaction(record(profile.id, "A-1")).await.unwrap();
        }

        let reopened = FileStore::open(&path).await.unwrap();
        assert!(reopened.transaction_exists(profile.id, "A-1").await.unwrap());
        assert_eq!(
            reopened.insert_transaction(record(profile.id, "A-1")).await.unwrap(),
            InsertOutcome::Duplicate
        );
        let since = Utc::now() - TimeDelta::hours(1);
        assert_eq!(reopened.eligible_profiles(since).await.unwrap(), vec![profile]);
        let leftovers: Vec<_> = std::fs::read_dir(path.parent().unwrap())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(leftovers.len(), 2, "unexpected files: {leftovers:?}");
        assert!(leftovers.contains(&"billing.json.lock".to_owned()));
    }

    #[tokio::test]
    async fn test_overlapping_stores_keep_both_records() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("billing.json");
        let profile_id = Uuid::new_v4();

        let first = FileStore::open(&path).await.unwrap();
        let second = FileStore::open(&path).await.unwrap();
        assert_eq!(
            first.insert_transaction(record(profile_id, "A-1")).await.unwrap(),
            InsertOutcome::Inserted
        );
        assert_eq!(
            second.insert_transaction(record(profile_id, "B-1")).await.unwrap(),
            InsertOutcome::Inserted
        );

        let reopened = FileStore::open(&path).await.unwrap();
        assert!(reopened.transaction_exists(profile_id, "A-1").await.unwrap());
        assert!(reopened.transaction_exists(profile_id, "B-1").await.unwrap());
    }

    #[tokio::test]
    async fn test_insert_checks_records_written_elsewhere() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("billing.json");
        let profile_id = Uuid::new_v4();

        let first = FileStore::open(&path).await.unwrap();
        let second = FileStore::open(&path).await.unwrap();
        first.insert_transaction(record(profile_id, "A-1")).await.unwrap();

        assert!(!second.transaction_exists(profile_id, "A-1").await.unwrap());
        assert_eq!(
            second.insert_transaction(record(profile_id, "A-1")).await.unwrap(),
            InsertOutcome::Duplicate
        );
        assert!(second.transaction_exists(profile_id, "A-1").await.unwrap());
        assert_eq!(second.transactions_for(profile_id).await.len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_writers_lose_nothing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("billing.json");
        let profile_id = Uuid::new_v4();

        let first = FileStore::open(&path).await.unwrap();
        let second = FileStore::open(&path).await.unwrap();
        tokio::join!(insert_many(&first, profile_id, "A"), insert_many(&second, profile_id, "B"));

        let reopened = FileStore::open(&path).await.unwrap();
        assert_eq!(reopened.transactions_for(profile_id).await.len(), 20);
    }

    #[tokio::test]
    async fn test_refresh_sees_profiles_added_elsewhere() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("billing.json");
        let first = FileStore::open(&path).await.unwrap();
        let second = FileStore::open(&path).await.unwrap();
        let profile =
            BillingProfile::new(Uuid::new_v4(), None, Utc::now() - TimeDelta::minutes(1), 1200);

        first.add_profile(profile.clone()).await.unwrap();

        let since = Utc::now() - TimeDelta::hours(1);
        assert_eq!(second.eligible_profiles(since).await.unwrap(), vec![profile]);
    }

    #[tokio::test]
    async fn test_failed_write_leaves_cache_unchanged() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("billing.json");
        let store = FileStore::open(&path).await.unwrap();
        let profile_id = Uuid::new_v4();

        // A directory in place of the document makes every update fail.
        std::fs::create_dir(&path).unwrap();
        std::fs::write(path.join("occupied"), b"x").unwrap();

        let err = store.insert_transaction(record(profile_id, "A-1")).await.unwrap_err();
        assert!(matches!(err, GatewayError::Store(_)));
        assert!(!store.transaction_exists(profile_id, "A-1").await.unwrap());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_store_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("billing.json");
        std::fs::write(&path, b"not json").unwrap();

        let err = FileStore::open(&path).await.unwrap_err();
        assert!(matches!(err, GatewayError::Store(_)));
    }
}
