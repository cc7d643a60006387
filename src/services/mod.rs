pub mod accounts;
pub mod activity;
pub mod documents;

pub use documents::{DocumentService, UploadPolicy, UploadRequest, WorkflowError, ALLOWED_CATEGORIES};
