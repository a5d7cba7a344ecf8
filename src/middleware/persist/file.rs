//! Directory-backed string storage.

use crate::deferred::Deferred;
use crate::error::{Result, StoreError};
use fs2::FileExt;
use lru::LruCache;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Read, Write};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use super::storage::StateStorage;

/// Magic bytes for item files.
const ITEM_MAGIC: &[u8; 4] = b"SCI\0";

/// Current item format version.
const ITEM_VERSION: u8 = 1;

/// Magic, version byte and content length.
const HEADER_LEN: u64 = 4 + 1 + 8;

/// Trailing CRC32.
const CHECKSUM_LEN: u64 = 4;

/// Stores each item in its own checksummed file.
///
/// File names are the SHA-256 of the item name, so any string is a valid
/// key. The directory is locked for exclusive use while the storage is open.
pub struct FileStorage {
    /// Base directory for items.
    path: PathBuf,

    /// Lock file for exclusive access.
    _lock_file: File,

    /// LRU cache for recently read items.
    cache: Mutex<LruCache<String, String>>,
}

impl FileStorage {
    /// Open (or create) a storage directory.
    pub fn new(path: impl AsRef<Path>, cache_size: usize) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        fs::create_dir_all(&path)?;

        let lock_file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(path.join("storage.lock"))?;
        lock_file.try_lock_exclusive().map_err(|_| StoreError::Locked)?;

        let cache_size = NonZeroUsize::new(cache_size.max(1)).unwrap_or(NonZeroUsize::MIN);

        Ok(Self {
            path,
            _lock_file: lock_file,
            cache: Mutex::new(LruCache::new(cache_size)),
        })
    }

    /// Read an item.
    pub fn read(&self, name: &str) -> Result<Option<String>> {
        if let Some(cached) = self.cache.lock().get(name).cloned() {
            return Ok(Some(cached));
        }

        let mut file = match File::open(self.item_path(name)) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        // Read and verify magic
        let mut magic = [0u8; 4];
        file.read_exact(&mut magic)?;
        if &magic != ITEM_MAGIC {
            return Err(StoreError::InvalidFormat("Invalid item magic".into()));
        }

        // Read version
        let mut version = [0u8; 1];
        file.read_exact(&mut version)?;
        if version[0] != ITEM_VERSION {
            return Err(StoreError::InvalidFormat(format!(
                "Unsupported item version: {}",
                version[0]
            )));
        }

        // Read content
        let mut len_bytes = [0u8; 8];
        file.read_exact(&mut len_bytes)?;
        let len = u64::from_le_bytes(len_bytes);

        let available = file
            .metadata()?
            .len()
            .saturating_sub(HEADER_LEN + CHECKSUM_LEN);
        if len != available {
            return Err(StoreError::Corruption(format!(
                "item claims {} content bytes, file holds {}",
                len, available
            )));
        }

        let mut content = vec![0u8; len as usize];
        file.read_exact(&mut content)?;

        // Read and verify checksum
        let mut checksum_bytes = [0u8; 4];
        file.read_exact(&mut checksum_bytes)?;
        let stored_checksum = u32::from_le_bytes(checksum_bytes);
        let computed_checksum = crc32fast::hash(&content);

        if stored_checksum != computed_checksum {
            return Err(StoreError::ChecksumMismatch {
                expected: stored_checksum,
                got: computed_checksum,
            });
        }

        let value = String::from_utf8(content)
            .map_err(|e| StoreError::Corruption(format!("item is not UTF-8: {}", e)))?;

        self.cache.lock().put(name.to_string(), value.clone());
        Ok(Some(value))
    }

    /// Write an item, replacing any previous value.
    pub fn write(&self, name: &str, value: &str) -> Result<()> {
        let item_path = self.item_path(name);
        let tmp_path = item_path.with_extension("tmp");

        {
            let mut file = File::create(&tmp_path)?;

            // Write header
            file.write_all(ITEM_MAGIC)?;
            file.write_all(&[ITEM_VERSION])?;

            // Write content
            let content = value.as_bytes();
            file.write_all(&(content.len() as u64).to_le_bytes())?;
            file.write_all(content)?;

            // Write checksum
            file.write_all(&crc32fast::hash(content).to_le_bytes())?;

            file.sync_all()?;
        }
        fs::rename(&tmp_path, &item_path)?;

        self.cache.lock().put(name.to_string(), value.to_string());
        Ok(())
    }

    /// Delete an item. Returns whether it existed.
    pub fn delete(&self, name: &str) -> Result<bool> {
        self.cache.lock().pop(name);

        match fs::remove_file(self.item_path(name)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Get the full path for an item.
    fn item_path(&self, name: &str) -> PathBuf {
        let digest = Sha256::digest(name.as_bytes());
        self.path.join(format!("{}.item", hex::encode(digest)))
    }
}

impl StateStorage for FileStorage {
    fn get_item(&self, name: &str) -> Deferred<Result<Option<String>>> {
        Deferred::ready(self.read(name))
    }

    fn set_item(&self, name: &str, value: String) -> Deferred<Result<()>> {
        Deferred::ready(self.write(name, &value))
    }

    fn remove_item(&self, name: &str) -> Deferred<Result<()>> {
        Deferred::ready(self.delete(name).map(|_| ()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_and_read() {
        let dir = TempDir::new().unwrap();
        let storage = FileStorage::new(dir.path().join("items"), 10).unwrap();

        storage.write("settings", r#"{"state":{},"version":0}"#).unwrap();
        assert_eq!(
            storage.read("settings").unwrap().as_deref(),
            Some(r#"{"state":{},"version":0}"#)
        );
        assert_eq!(storage.read("missing").unwrap(), None);
    }

    #[test]
    fn test_survives_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let storage = FileStorage::new(dir.path(), 10).unwrap();
            storage.write("key with / slashes", "value").unwrap();
        }

        let storage = FileStorage::new(dir.path(), 10).unwrap();
        assert_eq!(storage.read("key with / slashes").unwrap().as_deref(), Some("value"));
    }

    #[test]
    fn test_delete() {
        let dir = TempDir::new().unwrap();
        let storage = FileStorage::new(dir.path(), 10).unwrap();

        storage.write("gone", "soon").unwrap();
        assert!(storage.delete("gone").unwrap());
        assert!(!storage.delete("gone").unwrap());
        assert_eq!(storage.read("gone").unwrap(), None);
    }

    #[test]
    fn test_detects_corruption() {
        let dir = TempDir::new().unwrap();
        let path = {
            let storage = FileStorage::new(dir.path(), 10).unwrap();
            storage.write("app", "payload").unwrap();
            storage.item_path("app")
        };

        // Flip a content byte
        let mut bytes = fs::read(&path).unwrap();
        let content_start = ITEM_MAGIC.len() + 1 + 8;
        bytes[content_start] ^= 0xff;
        fs::write(&path, bytes).unwrap();

        let storage = FileStorage::new(dir.path(), 10).unwrap();
        assert!(matches!(
            storage.read("app"),
            Err(StoreError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn test_truncated_item_is_corruption() {
        let dir = TempDir::new().unwrap();
        let path = {
            let storage = FileStorage::new(dir.path(), 10).unwrap();
            storage.write("app", r#"{"state":{"count":1},"version":0}"#).unwrap();
            storage.item_path("app")
        };

        let bytes = fs::read(&path).unwrap();
        fs::write(&path, &bytes[..bytes.len() - 6]).unwrap();

        let storage = FileStorage::new(dir.path(), 10).unwrap();
        assert!(matches!(storage.read("app"), Err(StoreError::Corruption(_))));
    }

    #[test]
    fn test_exclusive_lock() {
        let dir = TempDir::new().unwrap();
        let _first = FileStorage::new(dir.path(), 10).unwrap();
        assert!(matches!(FileStorage::new(dir.path(), 10), Err(StoreError::Locked)));
    }
}
