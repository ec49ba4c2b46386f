//! Metadata store trait and in-memory backend.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use fintrust_types::{FileId, Identity};
use parking_lot::RwLock;

use crate::error::{StoreError, StoreResult};
use crate::record::FileRecord;

/// Persistence for file records.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Store a new record. Fails if the id is taken or validation fails.
    async fn insert_file(&self, record: FileRecord) -> StoreResult<()>;

    /// Retrieve a record by id.
    async fn get_file(&self, id: &FileId) -> StoreResult<Option<FileRecord>>;

    /// Add `party` to the record's authorized set.
    ///
    /// Atomic add-to-set: concurrent calls never lose each other's updates.
    /// Returns `true` if the party was not present before.
    async fn add_authorized_party(&self, id: &FileId, party: &Identity) -> StoreResult<bool>;

    /// Records owned by `owner`, newest first.
    async fn list_by_owner(&self, owner: &Identity) -> StoreResult<Vec<FileRecord>>;

    /// Total number of records.
    async fn count(&self) -> StoreResult<u64>;
}

/// In-memory metadata store (for testing and single-process deployments).
#[derive(Clone, Default)]
pub struct MemoryFileStore {
    inner: Arc<MemoryFileStoreInner>,
}

#[derive(Default)]
struct MemoryFileStoreInner {
    /// Primary index: id -> record
    records: RwLock<HashMap<FileId, FileRecord>>,

    /// Secondary index: owner -> ids
    by_owner: RwLock<HashMap<Identity, Vec<FileId>>>,
}

impl MemoryFileStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MetadataStore for MemoryFileStore {
    async fn insert_file(&self, record: FileRecord) -> StoreResult<()> {
        record.validate().map_err(StoreError::Invalid)?;

        let id = record.id.clone();
        let owner = record.owner.clone();

        {
            let mut records = self.inner.records.write();
            if records.contains_key(&id) {
                return Err(StoreError::AlreadyExists(id));
            }
            records.insert(id.clone(), record);
        }

        self.inner.by_owner.write().entry(owner).or_default().push(id);

        Ok(())
    }

    async fn get_file(&self, id: &FileId) -> StoreResult<Option<FileRecord>> {
        Ok(self.inner.records.read().get(id).cloned())
    }

    async fn add_authorized_party(&self, id: &FileId, party: &Identity) -> StoreResult<bool> {
        let mut records = self.inner.records.write();
        let record = records
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        Ok(record.authorized_parties.insert(party.clone()))
    }

    async fn list_by_owner(&self, owner: &Identity) -> StoreResult<Vec<FileRecord>> {
        let by_owner = self.inner.by_owner.read();
        let records = self.inner.records.read();

        let Some(ids) = by_owner.get(owner) else {
            return Ok(Vec::new());
        };

        let mut results: Vec<FileRecord> = ids
            .iter()
            .filter_map(|id| records.get(id).cloned())
            .collect();
        sort_newest_first(&mut results);

        Ok(results)
    }

    async fn count(&self) -> StoreResult<u64> {
        Ok(self.inner.records.read().len() as u64)
    }
}

/// Newest upload first; ties broken by id so listings are stable.
pub(crate) fn sort_newest_first(records: &mut [FileRecord]) {
    records.sort_by(|a, b| {
        b.uploaded_at
            .cmp(&a.uploaded_at)
            .then_with(|| a.id.cmp(&b.id))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use fintrust_types::ContentRef;

    fn identity(raw: &str) -> Identity {
        Identity::parse(raw).unwrap()
    }

    fn record(owner: &str, cid: &str, millis: i64) -> FileRecord {
        FileRecord::new_at_time(
            identity(owner),
            format!("{cid}.pdf"),
            ContentRef::parse(cid).unwrap(),
            Utc.timestamp_millis_opt(millis).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let store = MemoryFileStore::new();
        let rec = record("0xAAA", "QmOne", 1_000);
        store.insert_file(rec.clone()).await.unwrap();

        assert_eq!(store.get_file(&rec.id).await.unwrap(), Some(rec));
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_insert_rejected() {
        let store = MemoryFileStore::new();
        let rec = record("0xAAA", "QmOne", 1_000);
        store.insert_file(rec.clone()).await.unwrap();

        let err = store.insert_file(rec).await.unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists(_)));
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_invalid_record_rejected() {
        let store = MemoryFileStore::new();
        let mut rec = record("0xAAA", "QmOne", 1_000);
        rec.file_name = String::new();

        let err = store.insert_file(rec).await.unwrap_err();
        assert!(matches!(err, StoreError::Invalid(_)));
    }

    #[tokio::test]
    async fn test_get_nonexistent() {
        let store = MemoryFileStore::new();
        let id = FileId::parse("missing").unwrap();
        assert_eq!(store.get_file(&id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_add_authorized_party_is_set_semantics() {
        let store = MemoryFileStore::new();
        let rec = record("0xAAA", "QmOne", 1_000);
        store.insert_file(rec.clone()).await.unwrap();

        assert!(store
            .add_authorized_party(&rec.id, &identity("0xBBB"))
            .await
            .unwrap());
        assert!(!store
            .add_authorized_party(&rec.id, &identity("0xbbb"))
            .await
            .unwrap());

        let stored = store.get_file(&rec.id).await.unwrap().unwrap();
        assert_eq!(stored.authorized_parties.len(), 1);
    }

    #[tokio::test]
    async fn test_add_authorized_party_missing_file() {
        let store = MemoryFileStore::new();
        let id = FileId::parse("missing").unwrap();
        let err = store
            .add_authorized_party(&id, &identity("0xBBB"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_list_by_owner_newest_first() {
        let store = MemoryFileStore::new();
        for (i, cid) in ["QmA", "QmB", "QmC"].iter().enumerate() {
            store
                .insert_file(record("0xAAA", cid, 1_000 + i as i64))
                .await
                .unwrap();
        }
        store
            .insert_file(record("0xCCC", "QmOther", 5_000))
            .await
            .unwrap();

        let files = store.list_by_owner(&identity("0xaaa")).await.unwrap();
        assert_eq!(files.len(), 3);
        assert_eq!(files[0].content_ref.as_str(), "QmC");
        assert_eq!(files[2].content_ref.as_str(), "QmA");

        let none = store.list_by_owner(&identity("0xDDD")).await.unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_grants_are_not_lost() {
        let store = MemoryFileStore::new();
        let rec = record("0xAAA", "QmOne", 1_000);
        store.insert_file(rec.clone()).await.unwrap();

        let tasks: Vec<_> = (0..32)
            .map(|i| {
                let store = store.clone();
                let id = rec.id.clone();
                tokio::spawn(async move {
                    let party = identity(&format!("0xparty{i}"));
                    store.add_authorized_party(&id, &party).await.unwrap();
                })
            })
            .collect();
        for task in futures::future::join_all(tasks).await {
            task.unwrap();
        }

        let stored = store.get_file(&rec.id).await.unwrap().unwrap();
        assert_eq!(stored.authorized_parties.len(), 32);
    }
}
