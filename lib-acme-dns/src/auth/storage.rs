use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
extern crate tracing;

use super::errors::AcmeDnsErrors;
use super::types::{base_domain, AccountRecord};

#[cfg(unix)]
const STORAGE_FILE_MODE: u32 = 0o600;

/// JSON file mapping base domains to their acme-dns account.
///
/// Loaded once per invocation and written back in full. There is no locking,
/// two hook runs for the same domain racing on the file end with the last
/// writer's content.
#[derive(Debug, Clone)]
pub struct Storage {
    path: PathBuf,
    data: BTreeMap<String, AccountRecord>,
}

impl Storage {
    /// Reads the storage file at `path`.
    ///
    /// A missing or empty file yields an empty store. A file that exists but
    /// cannot be read, or whose content is not a JSON object of account records,
    /// is an error.
    pub async fn load(path: impl Into<PathBuf>) -> Result<Self, AcmeDnsErrors> {
        let path = path.into();
        let content = match fs::read(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No storage file yet, starting empty");
                Vec::new()
            }
            Err(source) => return Err(AcmeDnsErrors::StorageUnreadable { path, source }),
        };
        let data = if content.is_empty() {
            BTreeMap::new()
        } else {
            warn_on_open_permissions(&path).await;
            serde_json::from_slice(&content)
                .map_err(|source| AcmeDnsErrors::StorageCorrupted {
                    path: path.clone(),
                    source,
                })?
        };
        Ok(Storage { path, data })
    }

    /// Serializes the whole store and overwrites the file, creating it owner-only.
    pub async fn save(&self) -> Result<(), AcmeDnsErrors> {
        let serialized = serde_json::to_vec(&self.data)?;
        let write_error = |source: std::io::Error| AcmeDnsErrors::StorageWrite {
            path: self.path.clone(),
            source,
        };
        let mut options = fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        options.mode(STORAGE_FILE_MODE);
        let mut file = options.open(&self.path).await.map_err(write_error)?;
        file.write_all(&serialized).await.map_err(write_error)?;
        file.flush().await.map_err(write_error)?;
        tracing::debug!(path = %self.path.display(), entries = self.data.len(), "Storage saved");
        Ok(())
    }

    /// Stores `value` under `key`, dropping a leading `*.` from the key.
    pub fn put(&mut self, key: &str, value: AccountRecord) {
        self.data.insert(base_domain(key).to_string(), value);
    }

    pub fn fetch(&self, key: &str) -> Option<&AccountRecord> {
        self.data.get(base_domain(key))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[cfg(unix)]
async fn warn_on_open_permissions(path: &Path) {
    use std::os::unix::fs::PermissionsExt;

    if let Ok(metadata) = fs::metadata(path).await {
        let file_mode = metadata.permissions().mode() & 0o777;
        if file_mode & 0o077 != 0 {
            tracing::warn!(
                path = %path.display(),
                mode = format!("{:o}", file_mode),
                "Storage file is readable by other users (should be 0600)"
            );
        }
    }
}

#[cfg(not(unix))]
async fn warn_on_open_permissions(_path: &Path) {}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn account(subdomain: &str) -> AccountRecord {
        AccountRecord {
            subdomain: subdomain.to_string(),
            fulldomain: format!("{}.acme-dns.io", subdomain),
            username: "u".to_string(),
            password: "p".to_string(),
            allowfrom: None,
        }
    }

    #[tokio::test]
    async fn test_load_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let storage = Storage::load(dir.path().join("acmedns.json")).await.unwrap();
        assert!(storage.is_empty());
    }

    #[tokio::test]
    async fn test_load_empty_file_is_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("acmedns.json");
        std::fs::write(&path, "").unwrap();
        let storage = Storage::load(&path).await.unwrap();
        assert!(storage.is_empty());
    }

    #[tokio::test]
    async fn test_load_invalid_json_is_corrupted() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("acmedns.json");
        std::fs::write(&path, "{not json").unwrap();
        let result = Storage::load(&path).await;
        assert!(matches!(result, Err(AcmeDnsErrors::StorageCorrupted { .. })));
    }

    #[tokio::test]
    async fn test_load_non_utf8_is_corrupted() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("acmedns.json");
        std::fs::write(&path, [0xff, 0xfe, b'{']).unwrap();
        let result = Storage::load(&path).await;
        assert!(matches!(result, Err(AcmeDnsErrors::StorageCorrupted { .. })));
    }

    #[tokio::test]
    async fn test_load_non_object_is_corrupted() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("acmedns.json");
        std::fs::write(&path, "[]").unwrap();
        let result = Storage::load(&path).await;
        assert!(matches!(result, Err(AcmeDnsErrors::StorageCorrupted { .. })));
    }

    #[tokio::test]
    async fn test_load_record_missing_fields_is_corrupted() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("acmedns.json");
        std::fs::write(&path, r#"{"example.com": {"subdomain": "sub1"}}"#).unwrap();
        let result = Storage::load(&path).await;
        assert!(matches!(result, Err(AcmeDnsErrors::StorageCorrupted { .. })));
    }

    #[tokio::test]
    async fn test_load_directory_is_unreadable() {
        let dir = tempdir().unwrap();
        let result = Storage::load(dir.path()).await;
        assert!(matches!(result, Err(AcmeDnsErrors::StorageUnreadable { .. })));
    }

    #[tokio::test]
    async fn test_wildcard_and_base_share_entry() {
        let dir = tempdir().unwrap();
        let mut storage = Storage::load(dir.path().join("acmedns.json")).await.unwrap();
        storage.put("*.example.com", account("first"));
        assert_eq!(storage.fetch("example.com"), Some(&account("first")));
        assert_eq!(storage.fetch("*.example.com"), Some(&account("first")));

        storage.put("example.com", account("second"));
        assert_eq!(storage.len(), 1);
        assert_eq!(storage.fetch("*.example.com"), Some(&account("second")));
    }

    #[tokio::test]
    async fn test_fetch_missing_key_is_none() {
        let dir = tempdir().unwrap();
        let storage = Storage::load(dir.path().join("acmedns.json")).await.unwrap();
        assert_eq!(storage.fetch("example.com"), None);
    }

    #[tokio::test]
    async fn test_save_then_load_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("acmedns.json");
        let mut storage = Storage::load(&path).await.unwrap();
        storage.put("example.com", account("sub1"));
        storage.put("*.example.org", account("sub2"));
        storage.save().await.unwrap();

        let reloaded = Storage::load(&path).await.unwrap();
        assert_eq!(reloaded.data, storage.data);
        assert_eq!(reloaded.fetch("example.org"), Some(&account("sub2")));
    }

    #[tokio::test]
    async fn test_save_truncates_previous_content() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("acmedns.json");
        std::fs::write(&path, " ".repeat(4096)).unwrap();
        let storage = Storage {
            path: path.clone(),
            data: BTreeMap::new(),
        };
        storage.save().await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{}");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_save_creates_owner_only_file() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let path = dir.path().join("acmedns.json");
        let mut storage = Storage::load(&path).await.unwrap();
        storage.put("example.com", account("sub1"));
        storage.save().await.unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
    }

    #[tokio::test]
    async fn test_save_into_missing_directory_fails() {
        let dir = tempdir().unwrap();
        let storage = Storage {
            path: dir.path().join("missing").join("acmedns.json"),
            data: BTreeMap::new(),
        };
        let result = storage.save().await;
        assert!(matches!(result, Err(AcmeDnsErrors::StorageWrite { .. })));
    }
}
