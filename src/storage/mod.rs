use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::PathBuf;
use thiserror::Error;
use tokio::fs;
use uuid::Uuid;

const MAX_BASENAME_CHARS: usize = 100;
const MAX_EXTENSION_CHARS: usize = 16;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Stored file not found: {0}")]
    NotFound(String),

    #[error("Invalid stored name: {0}")]
    InvalidName(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Flat blob store for uploaded files, addressed by generated stored name
#[async_trait]
pub trait Storage: Send + Sync {
    async fn put(&self, stored_name: &str, data: &[u8]) -> Result<(), StorageError>;
    async fn get(&self, stored_name: &str) -> Result<Vec<u8>, StorageError>;
    /// Removing a name that does not exist is not an error
    async fn remove(&self, stored_name: &str) -> Result<(), StorageError>;
}

pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    pub async fn new(base_path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let base_path = base_path.into();
        fs::create_dir_all(&base_path).await?;
        Ok(Self { base_path })
    }

    /// Stored names are single path components; anything else never
    /// touches the filesystem.
    fn path_for(&self, stored_name: &str) -> Result<PathBuf, StorageError> {
        let flat = !stored_name.is_empty()
            && !stored_name.contains(['/', '\\'])
            && stored_name != "."
            && stored_name != "..";

        if flat {
            Ok(self.base_path.join(stored_name))
        } else {
            Err(StorageError::InvalidName(stored_name.to_string()))
        }
    }
}

#[async_trait]
impl Storage for LocalStorage {
    async fn put(&self, stored_name: &str, data: &[u8]) -> Result<(), StorageError> {
        let path = self.path_for(stored_name)?;
        fs::write(path, data).await?;
        Ok(())
    }

    async fn get(&self, stored_name: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.path_for(stored_name)?;
        match fs::read(path).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StorageError::NotFound(stored_name.to_string())),
            Err(e) => Err(e.into()),
        }
    }

    async fn remove(&self, stored_name: &str) -> Result<(), StorageError> {
        let path = self.path_for(stored_name)?;
        match fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Build an on-disk name: 32 random hex chars, `_`, then the sanitised
/// basename of what the client sent.
pub fn generate_stored_name(original_name: &str) -> String {
    format!("{}_{}", Uuid::new_v4().simple(), sanitize_basename(original_name))
}

/// Strip any directory part and replace characters outside `[A-Za-z0-9._-]`
pub fn sanitize_basename(original_name: &str) -> String {
    let basename = original_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default();

    let cleaned: String = basename
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = truncate_keeping_extension(cleaned);

    if cleaned.trim_matches('.').is_empty() {
        "file".to_string()
    } else {
        cleaned
    }
}

/// Shorten the stem so the whole name fits, keeping a short extension.
/// Input is ASCII after sanitising, so byte offsets are char offsets.
fn truncate_keeping_extension(mut name: String) -> String {
    if name.len() <= MAX_BASENAME_CHARS {
        return name;
    }

    match name.rfind('.') {
        Some(dot) if dot > 0 && name.len() - dot <= MAX_EXTENSION_CHARS => {
            let extension = name.split_off(dot);
            name.truncate(MAX_BASENAME_CHARS - extension.len());
            name + &extension
        }
        _ => {
            name.truncate(MAX_BASENAME_CHARS);
            name
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_drops_directories_and_unsafe_chars() {
        assert_eq!(sanitize_basename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_basename("C:\\Users\\ana\\pasaporte 2024.pdf"), "pasaporte_2024.pdf");
        assert_eq!(sanitize_basename("foto tamaño.png"), "foto_tama_o.png");
        assert_eq!(sanitize_basename(".."), "file");
        assert_eq!(sanitize_basename(""), "file");
    }

    #[test]
    fn stored_names_are_unique_and_flat() {
        let a = generate_stored_name("dni.pdf");
        let b = generate_stored_name("dni.pdf");
        assert_ne!(a, b);
        assert!(a.ends_with("_dni.pdf"));
        assert_eq!(a.find('_'), Some(32));
        assert!(!a.contains('/'));
    }

    #[test]
    fn long_names_are_truncated_but_keep_their_extension() {
        let long = format!("{}.pdf", "a".repeat(300));
        let cleaned = sanitize_basename(&long);
        assert_eq!(cleaned.chars().count(), MAX_BASENAME_CHARS);
        assert!(cleaned.ends_with("a.pdf"), "{cleaned}");

        let stored = generate_stored_name(&long);
        assert!(stored.ends_with(".pdf"));

        // No usable extension: plain cut
        let no_ext = "b".repeat(300);
        assert_eq!(sanitize_basename(&no_ext), "b".repeat(MAX_BASENAME_CHARS));
        let huge_ext = format!("c.{}", "d".repeat(300));
        assert_eq!(sanitize_basename(&huge_ext).len(), MAX_BASENAME_CHARS);
    }

    #[tokio::test]
    async fn local_storage_round_trip_and_idempotent_remove() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path().join("uploads")).await.unwrap();

        storage.put("abc_file.pdf", b"%PDF-1.4").await.unwrap();
        assert_eq!(storage.get("abc_file.pdf").await.unwrap(), b"%PDF-1.4");

        storage.remove("abc_file.pdf").await.unwrap();
        storage.remove("abc_file.pdf").await.unwrap();
        assert!(matches!(
            storage.get("abc_file.pdf").await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn local_storage_rejects_path_components() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();

        assert!(matches!(
            storage.put("../escape.pdf", b"x").await,
            Err(StorageError::InvalidName(_))
        ));
        assert!(matches!(storage.get("..").await, Err(StorageError::InvalidName(_))));
    }
}
