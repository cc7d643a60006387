use std::sync::Arc;

use tracing::{info, warn};

use crate::config::StorageConfig;
use crate::database::manager::DatabaseError;
use crate::database::models::{Document, DocumentKey, NewDocument};
use crate::database::repos::documents::DocumentStore;
use crate::storage::{generate_stored_name, Storage, StorageError};
use crate::types::DocumentStatus;

/// Document types an applicant may upload. Kept in display order; the first
/// five are mandatory for every application.
pub const ALLOWED_CATEGORIES: [&str; 12] = [
    "Pasaporte",
    "DNI",
    "Foto Tamaño Pasaporte",
    "Certificado Laboral",
    "Estados Financieros",
    "Certificado de Estudios",
    "Carta de Invitación",
    "Reserva de Hotel",
    "Boletos de Avión",
    "Seguro de Viaje",
    "Acta de Nacimiento",
    "Certificado de Matrimonio",
];

#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("Invalid category: {0}")]
    InvalidCategory(String),

    #[error("Unsupported file type: {0}")]
    UnsupportedMediaType(String),

    #[error("File exceeds the maximum size of {limit} bytes")]
    TooLarge { limit: usize },

    #[error("Status must be 'approved' or 'rejected'")]
    InvalidReviewStatus,

    #[error("A document for category '{0}' already exists; set replace=true to overwrite it")]
    Duplicate(String),

    #[error("Document not found")]
    NotFound,

    #[error("Stored file not found")]
    MissingFile,

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Limits applied to every upload
#[derive(Debug, Clone)]
pub struct UploadPolicy {
    pub max_bytes: usize,
    pub allowed_mime_types: Vec<String>,
}

impl From<&StorageConfig> for UploadPolicy {
    fn from(config: &StorageConfig) -> Self {
        Self {
            max_bytes: config.max_upload_bytes,
            allowed_mime_types: config.allowed_mime_types.clone(),
        }
    }
}

impl UploadPolicy {
    pub fn allows_mime(&self, mime_type: &str) -> bool {
        let essence = normalize_mime(mime_type);
        self.allowed_mime_types.iter().any(|allowed| allowed.eq_ignore_ascii_case(&essence))
    }
}

#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub user_id: i64,
    pub category: String,
    pub original_name: String,
    pub mime_type: String,
    pub data: Vec<u8>,
    pub family_member_name: Option<String>,
    pub replace: bool,
}

#[derive(Debug)]
pub struct UploadOutcome {
    pub document: Document,
    /// Rows displaced by a replace upload
    pub replaced: Vec<Document>,
}

/// `image/png; charset=binary` -> `image/png`
fn normalize_mime(mime_type: &str) -> String {
    mime_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Blank family member names mean the principal applicant
pub fn normalize_member(name: Option<String>) -> Option<String> {
    name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty())
}

pub fn is_allowed_category(category: &str) -> bool {
    ALLOWED_CATEGORIES.contains(&category)
}

/// Upload, replace, review, retrieval and deletion of applicant documents
pub struct DocumentService<S> {
    store: S,
    storage: Arc<dyn Storage>,
    policy: UploadPolicy,
}

impl<S: DocumentStore> DocumentService<S> {
    pub fn new(store: S, storage: Arc<dyn Storage>, policy: UploadPolicy) -> Self {
        Self { store, storage, policy }
    }

    /// Validate, write the file, then record the row.
    ///
    /// Every validation failure and the duplicate check happen before any
    /// storage mutation. A file written for a row that then fails to insert
    /// is removed again.
    pub async fn upload(&self, request: UploadRequest) -> Result<UploadOutcome, WorkflowError> {
        let category = request.category.trim().to_string();
        self.check_metadata(&category, &request.mime_type)?;
        let mime_type = normalize_mime(&request.mime_type);

        if request.data.len() > self.policy.max_bytes {
            return Err(WorkflowError::TooLarge {
                limit: self.policy.max_bytes,
            });
        }

        let new_document = NewDocument {
            user_id: request.user_id,
            category,
            original_name: request.original_name.clone(),
            stored_name: generate_stored_name(&request.original_name),
            mime_type,
            size_bytes: request.data.len() as i64,
            family_member_name: normalize_member(request.family_member_name),
        };
        let key = new_document.key();

        let existing = self.store.find_by_key(&key).await?;
        if !existing.is_empty() && !request.replace {
            return Err(WorkflowError::Duplicate(key.category));
        }

        self.storage.put(&new_document.stored_name, &request.data).await?;

        let stored_name = new_document.stored_name.clone();
        let written = if request.replace {
            self.store.replace(new_document).await
        } else {
            self.store.insert(new_document).await.map(|doc| (doc, Vec::new()))
        };

        let (document, replaced) = match written {
            Ok(written) => written,
            Err(e) => {
                self.discard_file(&stored_name).await;
                return Err(match e {
                    DatabaseError::Conflict(_) => WorkflowError::Duplicate(key.category),
                    other => other.into(),
                });
            }
        };

        self.discard_files(&replaced).await;

        info!(
            document_id = document.id,
            user_id = document.user_id,
            category = %document.category,
            replaced = replaced.len(),
            "Document uploaded"
        );

        Ok(UploadOutcome { document, replaced })
    }

    /// Category and MIME checks, in that order. Callers that stop reading an
    /// oversize body run this first so a bad category still reports as such.
    pub fn check_metadata(&self, category: &str, mime_type: &str) -> Result<(), WorkflowError> {
        if !is_allowed_category(category.trim()) {
            return Err(WorkflowError::InvalidCategory(category.trim().to_string()));
        }
        if !self.policy.allows_mime(mime_type) {
            return Err(WorkflowError::UnsupportedMediaType(mime_type.to_string()));
        }
        Ok(())
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.policy.max_bytes
    }

    /// Set the outcome of an admin review. Re-reviewing is allowed; moving
    /// back to pending is not.
    pub async fn review(
        &self,
        id: i64,
        status: DocumentStatus,
        admin_notes: Option<String>,
    ) -> Result<Document, WorkflowError> {
        if !status.is_review_outcome() {
            return Err(WorkflowError::InvalidReviewStatus);
        }

        let document = self
            .store
            .set_review(id, status, admin_notes)
            .await?
            .ok_or(WorkflowError::NotFound)?;

        info!(document_id = id, status = %status, "Document reviewed");
        Ok(document)
    }

    pub async fn list_for_owner(&self, user_id: i64, offset: i64, limit: i64) -> Result<Vec<Document>, WorkflowError> {
        Ok(self.store.list_for_user(user_id, offset, limit).await?)
    }

    pub async fn list_all(
        &self,
        status: Option<DocumentStatus>,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Document>, WorkflowError> {
        Ok(self.store.list_all(status, offset, limit).await?)
    }

    /// Load a document and its bytes. With `owner` set, documents belonging
    /// to anyone else look exactly like missing ones.
    pub async fn download(&self, id: i64, owner: Option<i64>) -> Result<(Document, Vec<u8>), WorkflowError> {
        let document = self.owned(id, owner).await?;

        match self.storage.get(&document.stored_name).await {
            Ok(data) => Ok((document, data)),
            Err(StorageError::NotFound(_)) => {
                warn!(document_id = id, stored_name = %document.stored_name, "Document row has no stored file");
                Err(WorkflowError::MissingFile)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Owner-initiated delete of the row and its file
    pub async fn delete(&self, id: i64, owner: i64) -> Result<Document, WorkflowError> {
        self.owned(id, Some(owner)).await?;

        let document = self.store.delete(id).await?.ok_or(WorkflowError::NotFound)?;
        self.discard_file(&document.stored_name).await;

        info!(document_id = id, user_id = owner, "Document deleted");
        Ok(document)
    }

    /// Best-effort removal of the files behind rows that are already gone,
    /// e.g. after an account delete cascaded over its documents
    pub async fn discard_files(&self, documents: &[Document]) {
        for document in documents {
            self.discard_file(&document.stored_name).await;
        }
    }

    async fn owned(&self, id: i64, owner: Option<i64>) -> Result<Document, WorkflowError> {
        let document = self.store.find(id).await?.ok_or(WorkflowError::NotFound)?;
        match owner {
            Some(user_id) if document.user_id != user_id => Err(WorkflowError::NotFound),
            _ => Ok(document),
        }
    }

    async fn discard_file(&self, stored_name: &str) {
        if let Err(e) = self.storage.remove(stored_name).await {
            warn!(stored_name, error = %e, "Failed to remove stored file");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::LocalStorage;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::Mutex;

    /// In-memory store enforcing the same key uniqueness as the database index
    #[derive(Default)]
    struct MemoryStore {
        rows: Mutex<Vec<Document>>,
        next_id: Mutex<i64>,
    }

    impl MemoryStore {
        fn materialize(&self, new: NewDocument) -> Document {
            let mut next_id = self.next_id.lock().unwrap();
            *next_id += 1;
            Document {
                id: *next_id,
                user_id: new.user_id,
                category: new.category,
                original_name: new.original_name,
                stored_name: new.stored_name,
                mime_type: new.mime_type,
                size_bytes: new.size_bytes,
                status: DocumentStatus::Pending,
                admin_notes: None,
                family_member_name: new.family_member_name,
                created_at: Utc::now(),
            }
        }

        fn len(&self) -> usize {
            self.rows.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl DocumentStore for MemoryStore {
        async fn find_by_key(&self, key: &DocumentKey) -> Result<Vec<Document>, DatabaseError> {
            let rows = self.rows.lock().unwrap();
            Ok(rows.iter().filter(|d| key.matches(d)).cloned().collect())
        }

        async fn insert(&self, document: NewDocument) -> Result<Document, DatabaseError> {
            let key = document.key();
            if self.rows.lock().unwrap().iter().any(|d| key.matches(d)) {
                return Err(DatabaseError::Conflict("duplicate".into()));
            }
            let row = self.materialize(document);
            self.rows.lock().unwrap().push(row.clone());
            Ok(row)
        }

        async fn replace(&self, document: NewDocument) -> Result<(Document, Vec<Document>), DatabaseError> {
            let key = document.key();
            let row = self.materialize(document);
            let mut rows = self.rows.lock().unwrap();
            let (removed, kept): (Vec<_>, Vec<_>) = rows.drain(..).partition(|d| key.matches(d));
            *rows = kept;
            rows.push(row.clone());
            Ok((row, removed))
        }

        async fn find(&self, id: i64) -> Result<Option<Document>, DatabaseError> {
            Ok(self.rows.lock().unwrap().iter().find(|d| d.id == id).cloned())
        }

        async fn list_for_user(&self, user_id: i64, offset: i64, limit: i64) -> Result<Vec<Document>, DatabaseError> {
            let rows = self.rows.lock().unwrap();
            Ok(rows
                .iter()
                .rev()
                .filter(|d| d.user_id == user_id)
                .skip(offset as usize)
                .take(limit as usize)
                .cloned()
                .collect())
        }

        async fn list_all(
            &self,
            status: Option<DocumentStatus>,
            offset: i64,
            limit: i64,
        ) -> Result<Vec<Document>, DatabaseError> {
            let rows = self.rows.lock().unwrap();
            Ok(rows
                .iter()
                .rev()
                .filter(|d| status.map_or(true, |s| d.status == s))
                .skip(offset as usize)
                .take(limit as usize)
                .cloned()
                .collect())
        }

        async fn set_review(
            &self,
            id: i64,
            status: DocumentStatus,
            admin_notes: Option<String>,
        ) -> Result<Option<Document>, DatabaseError> {
            let mut rows = self.rows.lock().unwrap();
            Ok(rows.iter_mut().find(|d| d.id == id).map(|d| {
                d.status = status;
                d.admin_notes = admin_notes;
                d.clone()
            }))
        }

        async fn delete(&self, id: i64) -> Result<Option<Document>, DatabaseError> {
            let mut rows = self.rows.lock().unwrap();
            let position = rows.iter().position(|d| d.id == id);
            Ok(position.map(|i| rows.remove(i)))
        }
    }

    struct Fixture {
        dir: tempfile::TempDir,
        storage: Arc<LocalStorage>,
        service: DocumentService<Arc<MemoryStore>>,
        store: Arc<MemoryStore>,
    }

    async fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let storage = Arc::new(LocalStorage::new(dir.path()).await.unwrap());
        let store = Arc::new(MemoryStore::default());
        let policy = UploadPolicy {
            max_bytes: 1024,
            allowed_mime_types: vec![
                "application/pdf".to_string(),
                "image/jpeg".to_string(),
                "image/png".to_string(),
            ],
        };
        let service = DocumentService::new(store.clone(), storage.clone(), policy);
        Fixture {
            dir,
            storage,
            service,
            store,
        }
    }

    fn upload(user_id: i64, category: &str, replace: bool) -> UploadRequest {
        UploadRequest {
            user_id,
            category: category.to_string(),
            original_name: "scan.pdf".to_string(),
            mime_type: "application/pdf".to_string(),
            data: b"%PDF-1.4 test".to_vec(),
            family_member_name: None,
            replace,
        }
    }

    fn file_count(fx: &Fixture) -> usize {
        std::fs::read_dir(fx.dir.path()).unwrap().count()
    }

    #[tokio::test]
    async fn duplicate_without_replace_conflicts_and_keeps_original() {
        let fx = fixture().await;
        let first = fx.service.upload(upload(1, "Pasaporte", false)).await.unwrap();

        let second = fx.service.upload(upload(1, "Pasaporte", false)).await;
        assert!(matches!(second, Err(WorkflowError::Duplicate(_))));

        assert_eq!(fx.store.len(), 1);
        assert_eq!(file_count(&fx), 1);
        assert!(fx.storage.get(&first.document.stored_name).await.is_ok());
    }

    #[tokio::test]
    async fn replace_swaps_exactly_one_row_and_file() {
        let fx = fixture().await;
        let first = fx.service.upload(upload(1, "Pasaporte", false)).await.unwrap();

        let second = fx.service.upload(upload(1, "Pasaporte", true)).await.unwrap();
        assert_eq!(second.replaced.len(), 1);
        assert_eq!(second.replaced[0].id, first.document.id);
        assert_ne!(second.document.id, first.document.id);

        assert_eq!(fx.store.len(), 1);
        assert_eq!(file_count(&fx), 1);
        assert!(matches!(
            fx.storage.get(&first.document.stored_name).await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn replace_without_existing_row_just_inserts() {
        let fx = fixture().await;
        let outcome = fx.service.upload(upload(1, "DNI", true)).await.unwrap();
        assert!(outcome.replaced.is_empty());
        assert_eq!(fx.store.len(), 1);
    }

    #[tokio::test]
    async fn family_members_have_independent_slots() {
        let fx = fixture().await;
        fx.service.upload(upload(1, "Pasaporte", false)).await.unwrap();

        let mut for_child = upload(1, "Pasaporte", false);
        for_child.family_member_name = Some("  Lucía  ".to_string());
        let child = fx.service.upload(for_child).await.unwrap();
        assert_eq!(child.document.family_member_name.as_deref(), Some("Lucía"));

        let mut blank = upload(1, "Pasaporte", false);
        blank.family_member_name = Some("   ".to_string());
        assert!(matches!(
            fx.service.upload(blank).await,
            Err(WorkflowError::Duplicate(_))
        ));
        assert_eq!(fx.store.len(), 2);
    }

    #[tokio::test]
    async fn invalid_uploads_never_touch_storage() {
        let fx = fixture().await;

        let result = fx.service.upload(upload(1, "Licencia", false)).await;
        assert!(matches!(result, Err(WorkflowError::InvalidCategory(_))));

        let mut gif = upload(1, "DNI", false);
        gif.mime_type = "image/gif".to_string();
        assert!(matches!(
            fx.service.upload(gif).await,
            Err(WorkflowError::UnsupportedMediaType(_))
        ));

        let mut big = upload(1, "DNI", false);
        big.data = vec![0u8; 1025];
        assert!(matches!(
            fx.service.upload(big).await,
            Err(WorkflowError::TooLarge { limit: 1024 })
        ));

        assert_eq!(fx.store.len(), 0);
        assert_eq!(file_count(&fx), 0);
    }

    #[tokio::test]
    async fn mime_parameters_are_ignored() {
        let fx = fixture().await;
        let mut png = upload(1, "Foto Tamaño Pasaporte", false);
        png.mime_type = "Image/PNG; charset=binary".to_string();
        let outcome = fx.service.upload(png).await.unwrap();
        assert_eq!(outcome.document.mime_type, "image/png");
    }

    #[tokio::test]
    async fn review_sets_terminal_status_and_rejects_pending() {
        let fx = fixture().await;
        let doc = fx.service.upload(upload(1, "DNI", false)).await.unwrap().document;

        let pending = fx.service.review(doc.id, DocumentStatus::Pending, None).await;
        assert!(matches!(pending, Err(WorkflowError::InvalidReviewStatus)));

        let approved = fx
            .service
            .review(doc.id, DocumentStatus::Approved, Some("Legible".to_string()))
            .await
            .unwrap();
        assert_eq!(approved.status, DocumentStatus::Approved);
        assert_eq!(approved.admin_notes.as_deref(), Some("Legible"));

        let rejected = fx.service.review(doc.id, DocumentStatus::Rejected, None).await.unwrap();
        assert_eq!(rejected.status, DocumentStatus::Rejected);

        let missing = fx.service.review(999, DocumentStatus::Approved, None).await;
        assert!(matches!(missing, Err(WorkflowError::NotFound)));
    }

    #[tokio::test]
    async fn owners_cannot_reach_other_users_documents() {
        let fx = fixture().await;
        let doc = fx.service.upload(upload(1, "DNI", false)).await.unwrap().document;

        assert!(matches!(
            fx.service.download(doc.id, Some(2)).await,
            Err(WorkflowError::NotFound)
        ));
        assert!(matches!(
            fx.service.delete(doc.id, 2).await,
            Err(WorkflowError::NotFound)
        ));

        let (owned, data) = fx.service.download(doc.id, Some(1)).await.unwrap();
        assert_eq!(owned.id, doc.id);
        assert_eq!(data, b"%PDF-1.4 test");

        // admin path
        assert!(fx.service.download(doc.id, None).await.is_ok());
    }

    #[tokio::test]
    async fn download_reports_missing_file() {
        let fx = fixture().await;
        let doc = fx.service.upload(upload(1, "DNI", false)).await.unwrap().document;
        fx.storage.remove(&doc.stored_name).await.unwrap();

        assert!(matches!(
            fx.service.download(doc.id, None).await,
            Err(WorkflowError::MissingFile)
        ));
    }

    #[tokio::test]
    async fn delete_removes_row_and_file() {
        let fx = fixture().await;
        let doc = fx.service.upload(upload(1, "DNI", false)).await.unwrap().document;

        fx.service.delete(doc.id, 1).await.unwrap();
        assert_eq!(fx.store.len(), 0);
        assert_eq!(file_count(&fx), 0);
    }

    #[tokio::test]
    async fn listing_is_scoped_to_owner() {
        let fx = fixture().await;
        fx.service.upload(upload(1, "DNI", false)).await.unwrap();
        fx.service.upload(upload(1, "Pasaporte", false)).await.unwrap();
        fx.service.upload(upload(2, "DNI", false)).await.unwrap();

        let mine = fx.service.list_for_owner(1, 0, 100).await.unwrap();
        assert_eq!(mine.len(), 2);
        assert!(mine.iter().all(|d| d.user_id == 1));
        assert_eq!(mine[0].category, "Pasaporte");

        assert_eq!(fx.service.list_all(None, 0, 100).await.unwrap().len(), 3);
        assert_eq!(
            fx.service
                .list_all(Some(DocumentStatus::Approved), 0, 100)
                .await
                .unwrap()
                .len(),
            0
        );
    }
}
