use std::fs::Metadata;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::{Mutex, RwLock};

/// Narrow seam to the persistence medium backing the store.
///
/// Metadata passes through untouched; the store records it but never
/// interprets it. Names resolve 1:1 against the medium, so unique names in
/// the store guarantee unique backing identities.
#[async_trait]
pub trait Storage: Send + Sync {
    async fn create(&self, name: &str, bytes: &[u8]) -> io::Result<Metadata>;
    async fn overwrite(&self, name: &str, bytes: &[u8]) -> io::Result<Metadata>;
    async fn remove(&self, name: &str) -> io::Result<()>;
    async fn stat(&self, name: &str) -> io::Result<Metadata>;
}

/// Backs entries with plain files directly under a root directory.
pub struct DiskStorage {
    root: PathBuf,
}

impl DiskStorage {
    pub fn new(root: PathBuf) -> DiskStorage {
        DiskStorage { root }
    }

    fn resolve(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}

#[async_trait]
impl Storage for DiskStorage {
    async fn create(&self, name: &str, bytes: &[u8]) -> io::Result<Metadata> {
        let path = self.resolve(name);
        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        fs::metadata(&path).await
    }

    async fn overwrite(&self, name: &str, bytes: &[u8]) -> io::Result<Metadata> {
        let path = self.resolve(name);
        fs::write(&path, bytes).await?;
        fs::metadata(&path).await
    }

    async fn remove(&self, name: &str) -> io::Result<()> {
        fs::remove_file(self.resolve(name)).await
    }

    async fn stat(&self, name: &str) -> io::Result<Metadata> {
        fs::metadata(self.resolve(name)).await
    }
}

/// Mutable half of an entry, guarded by the entry's lock.
pub struct FileState {
    pub content: Vec<u8>,
    pub metadata: Metadata,
}

/// One named file. The mutex serializes modify/delete on this entry; it is
/// held only for the duration of the mutation.
pub struct StoredFile {
    pub name: String,
    state: Mutex<FileState>,
}

impl StoredFile {
    pub async fn content(&self) -> Vec<u8> {
        self.state.lock().await.content.clone()
    }

    pub async fn metadata(&self) -> Metadata {
        self.state.lock().await.metadata.clone()
    }
}

/// The process-wide, ordered collection of entries.
///
/// The `RwLock` guards the collection's shape (insert, scan, remove) and is
/// distinct from each entry's content lock. `create` holds the write half
/// across the existence check, the persist step, and the append, so two
/// simultaneous creates of one name cannot both pass the check.
pub struct FileStore {
    entries: RwLock<Vec<Arc<StoredFile>>>,
    storage: Box<dyn Storage>,
}

impl FileStore {
    pub fn new(storage: Box<dyn Storage>) -> FileStore {
        FileStore {
            entries: RwLock::new(Vec::new()),
            storage,
        }
    }

    /// Linear scan by name, first match wins.
    pub async fn find(&self, name: &str) -> Option<Arc<StoredFile>> {
        let entries = self.entries.read().await;
        entries.iter().find(|entry| entry.name == name).cloned()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Persists a new entry and appends it. Fails with `AlreadyExists` when
    /// the name is taken; a persistence failure appends nothing.
    pub async fn create(&self, name: &str, bytes: &[u8]) -> io::Result<()> {
        let mut entries = self.entries.write().await;
        if entries.iter().any(|entry| entry.name == name) {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("{name} already exists"),
            ));
        }
        let metadata = self.storage.create(name, bytes).await?;
        entries.push(Arc::new(StoredFile {
            name: name.to_owned(),
            state: Mutex::new(FileState {
                content: bytes.to_vec(),
                metadata,
            }),
        }));
        Ok(())
    }

    /// Replaces an entry's content under its lock. In-memory content only
    /// changes after the backing write succeeded.
    pub async fn replace(&self, entry: &StoredFile, bytes: &[u8]) -> io::Result<()> {
        let mut state = entry.state.lock().await;
        let metadata = self.storage.overwrite(&entry.name, bytes).await?;
        state.content = bytes.to_vec();
        state.metadata = metadata;
        Ok(())
    }

    /// Removes the backing file under the entry's lock, then splices the
    /// first entry with that name out of the collection. A failed backing
    /// removal leaves the entry in place.
    pub async fn remove(&self, name: &str) -> io::Result<()> {
        let entry = self.find(name).await.ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("{name} not found"))
        })?;

        let _state = entry.state.lock().await;
        self.storage.remove(name).await?;

        let mut entries = self.entries.write().await;
        if let Some(index) = entries.iter().position(|candidate| candidate.name == name) {
            entries.remove(index);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn disk_store() -> (FileStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(Box::new(DiskStorage::new(dir.path().to_path_buf())));
        (store, dir)
    }

    /// Fails every operation, for exercising the 500 paths.
    struct BrokenStorage;

    #[async_trait]
    impl Storage for BrokenStorage {
        async fn create(&self, _name: &str, _bytes: &[u8]) -> io::Result<Metadata> {
            Err(io::Error::new(io::ErrorKind::Other, "disk on fire"))
        }
        async fn overwrite(&self, _name: &str, _bytes: &[u8]) -> io::Result<Metadata> {
            Err(io::Error::new(io::ErrorKind::Other, "disk on fire"))
        }
        async fn remove(&self, _name: &str) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::Other, "disk on fire"))
        }
        async fn stat(&self, _name: &str) -> io::Result<Metadata> {
            Err(io::Error::new(io::ErrorKind::Other, "disk on fire"))
        }
    }

    #[tokio::test]
    async fn create_then_find_returns_the_content() {
        let (store, _dir) = disk_store();
        store.create("a.txt", b"hello").await.unwrap();

        let entry = store.find("a.txt").await.unwrap();
        assert_eq!(entry.content().await, b"hello");
        assert_eq!(entry.metadata().await.len(), 5);
    }

    #[tokio::test]
    async fn create_persists_to_the_backing_medium() {
        let (store, dir) = disk_store();
        store.create("a.txt", b"hello").await.unwrap();
        assert_eq!(std::fs::read(dir.path().join("a.txt")).unwrap(), b"hello");
    }

    #[tokio::test]
    async fn duplicate_create_is_rejected_and_content_kept() {
        let (store, _dir) = disk_store();
        store.create("a.txt", b"first").await.unwrap();

        let err = store.create("a.txt", b"second").await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
        let entry = store.find("a.txt").await.unwrap();
        assert_eq!(entry.content().await, b"first");
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn replace_swaps_content_and_disk() {
        let (store, dir) = disk_store();
        store.create("a.txt", b"hello").await.unwrap();

        let entry = store.find("a.txt").await.unwrap();
        store.replace(&entry, b"world!").await.unwrap();

        assert_eq!(entry.content().await, b"world!");
        assert_eq!(std::fs::read(dir.path().join("a.txt")).unwrap(), b"world!");
        assert_eq!(entry.metadata().await.len(), 6);
    }

    #[tokio::test]
    async fn remove_deletes_entry_and_backing_file() {
        let (store, dir) = disk_store();
        store.create("a.txt", b"hello").await.unwrap();

        store.remove("a.txt").await.unwrap();
        assert!(store.find("a.txt").await.is_none());
        assert!(!dir.path().join("a.txt").exists());
    }

    #[tokio::test]
    async fn remove_missing_entry_reports_not_found() {
        let (store, _dir) = disk_store();
        let err = store.remove("ghost.txt").await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn failed_create_leaves_no_dangling_entry() {
        let store = FileStore::new(Box::new(BrokenStorage));
        assert!(store.create("a.txt", b"hello").await.is_err());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn failed_remove_keeps_the_entry() {
        let (disk, _dir) = disk_store();
        disk.create("a.txt", b"hello").await.unwrap();

        // Pull the freshly created entry into a store whose medium fails,
        // then watch remove leave the collection untouched.
        let entry = disk.find("a.txt").await.unwrap();
        let broken = FileStore::new(Box::new(BrokenStorage));
        broken.entries.write().await.push(entry);

        assert!(broken.remove("a.txt").await.is_err());
        assert!(broken.find("a.txt").await.is_some());
    }

    #[tokio::test]
    async fn failed_replace_keeps_previous_content() {
        let (disk, _dir) = disk_store();
        disk.create("a.txt", b"hello").await.unwrap();

        let entry = disk.find("a.txt").await.unwrap();
        let broken = FileStore::new(Box::new(BrokenStorage));
        broken.entries.write().await.push(Arc::clone(&entry));

        assert!(broken.replace(&entry, b"new content").await.is_err());
        assert_eq!(entry.content().await, b"hello");
    }

    #[tokio::test]
    async fn concurrent_creates_of_distinct_names_all_land() {
        let (store, _dir) = disk_store();
        let store = Arc::new(store);

        let mut tasks = Vec::new();
        for index in 0..8 {
            let store = Arc::clone(&store);
            tasks.push(tokio::spawn(async move {
                store
                    .create(&format!("file-{index}.txt"), b"data")
                    .await
                    .unwrap();
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }
        assert_eq!(store.len().await, 8);
    }

    #[tokio::test]
    async fn concurrent_creates_of_one_name_admit_exactly_one() {
        let (store, _dir) = disk_store();
        let store = Arc::new(store);

        let mut tasks = Vec::new();
        for _ in 0..8 {
            let store = Arc::clone(&store);
            tasks.push(tokio::spawn(
                async move { store.create("a.txt", b"data").await },
            ));
        }
        let mut created = 0;
        for task in tasks {
            if task.await.unwrap().is_ok() {
                created += 1;
            }
        }
        assert_eq!(created, 1);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn concurrent_create_and_remove_keep_the_collection_consistent() {
        let (store, _dir) = disk_store();
        let store = Arc::new(store);

        for index in 0..8 {
            store
                .create(&format!("keep-{index}.txt"), b"data")
                .await
                .unwrap();
            store
                .create(&format!("drop-{index}.txt"), b"data")
                .await
                .unwrap();
        }

        let mut tasks = Vec::new();
        for index in 0..8 {
            let remover = Arc::clone(&store);
            tasks.push(tokio::spawn(async move {
                remover.remove(&format!("drop-{index}.txt")).await.unwrap();
            }));
            let creator = Arc::clone(&store);
            tasks.push(tokio::spawn(async move {
                creator
                    .create(&format!("new-{index}.txt"), b"data")
                    .await
                    .unwrap();
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(store.len().await, 24);
        for index in 0..8 {
            assert!(store.find(&format!("keep-{index}.txt")).await.is_some());
            assert!(store.find(&format!("drop-{index}.txt")).await.is_none());
            assert!(store.find(&format!("new-{index}.txt")).await.is_some());
        }

        let entries = store.entries.read().await;
        let mut names: Vec<_> = entries.iter().map(|entry| entry.name.clone()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), entries.len());
    }
}
