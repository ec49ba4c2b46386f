//! Sled-backed metadata store.

use std::path::Path;

use async_trait::async_trait;
use fintrust_types::{FileId, Identity};
use sled::transaction::{ConflictableTransactionError, TransactionError};
use sled::{Db, Transactional, Tree};
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::record::FileRecord;
use crate::storage::{sort_newest_first, MetadataStore};

/// Persistent metadata store.
///
/// Records live in the `files` tree as JSON keyed by file id. The
/// `files_by_owner` tree indexes `owner \0 file_id` for listings.
pub struct SledFileStore {
    db: Db,
    files: Tree,
    by_owner: Tree,
}

impl SledFileStore {
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let db = sled::open(path)?;
        let files = db.open_tree("files")?;
        let by_owner = db.open_tree("files_by_owner")?;
        Ok(Self {
            db,
            files,
            by_owner,
        })
    }

    pub fn flush(&self) -> StoreResult<()> {
        self.db.flush()?;
        Ok(())
    }

    fn owner_prefix(owner: &Identity) -> Vec<u8> {
        let mut key = owner.as_str().as_bytes().to_vec();
        key.push(0);
        key
    }

    fn owner_key(owner: &Identity, id: &FileId) -> Vec<u8> {
        let mut key = Self::owner_prefix(owner);
        key.extend_from_slice(id.as_str().as_bytes());
        key
    }
}

#[async_trait]
impl MetadataStore for SledFileStore {
    async fn insert_file(&self, record: FileRecord) -> StoreResult<()> {
        record.validate().map_err(StoreError::Invalid)?;

        let key = record.id.as_str().as_bytes().to_vec();
        let owner_key = Self::owner_key(&record.owner, &record.id);
        let value = serde_json::to_vec(&record)?;

        // Record and owner index commit together or not at all.
        (&self.files, &self.by_owner)
            .transaction(|(files, by_owner)| {
                if files.get(key.as_slice())?.is_some() {
                    return Err(ConflictableTransactionError::Abort(
                        StoreError::AlreadyExists(record.id.clone()),
                    ));
                }
                files.insert(key.as_slice(), value.as_slice())?;
                by_owner.insert(owner_key.as_slice(), &[][..])?;
                Ok(())
            })
            .map_err(|err| match err {
                TransactionError::Abort(err) => err,
                TransactionError::Storage(err) => StoreError::Database(err),
            })
    }

    async fn get_file(&self, id: &FileId) -> StoreResult<Option<FileRecord>> {
        match self.files.get(id.as_str().as_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn add_authorized_party(&self, id: &FileId, party: &Identity) -> StoreResult<bool> {
        let key = id.as_str().as_bytes();
        loop {
            let current = self
                .files
                .get(key)?
                .ok_or_else(|| StoreError::NotFound(id.clone()))?;
            let mut record: FileRecord = serde_json::from_slice(&current)?;
            if !record.authorized_parties.insert(party.clone()) {
                return Ok(false);
            }

            let updated = serde_json::to_vec(&record)?;
            match self.files.compare_and_swap(key, Some(current), Some(updated))? {
                Ok(()) => return Ok(true),
                Err(_) => debug!("concurrent update on file {}, retrying", id),
            }
        }
    }

    async fn list_by_owner(&self, owner: &Identity) -> StoreResult<Vec<FileRecord>> {
        let prefix = Self::owner_prefix(owner);
        let mut results = Vec::new();
        for entry in self.by_owner.scan_prefix(&prefix) {
            let (key, _) = entry?;
            let Some(id_bytes) = key.get(prefix.len()..) else {
                continue;
            };
            if let Some(bytes) = self.files.get(id_bytes)? {
                results.push(serde_json::from_slice::<FileRecord>(&bytes)?);
            }
        }
        sort_newest_first(&mut results);
        Ok(results)
    }

    async fn count(&self) -> StoreResult<u64> {
        Ok(self.files.len() as u64)
    }
}
