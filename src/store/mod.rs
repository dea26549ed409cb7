pub mod memory;
pub mod mongo;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{GroupPatch, NewGroup, NewQrCode, QrCode, QrCodeGroup, QrCodePatch};

pub use memory::MemoryStore;
pub use mongo::MongoStore;

pub const CODE_ID_LENGTH: usize = 6;
pub const GROUP_ID_LENGTH: usize = 9;
pub const SHORT_CODE_LENGTH: usize = 9;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no free identifier found after {attempts} attempts")]
    GenerationExhausted { attempts: usize },
    #[error("short code {0} is already taken")]
    DuplicateShortCode(String),
    #[error("database error: {0}")]
    Database(#[from] mongodb::error::Error),
}

impl StoreError {
    /// Collisions are worth retrying with fresh randomness; database
    /// failures are not.
    pub fn is_collision(&self) -> bool {
        matches!(
            self,
            StoreError::GenerationExhausted { .. } | StoreError::DuplicateShortCode(_)
        )
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Position in a newest-first listing: the last code a client has seen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageCursor {
    pub created_at: i64,
    pub id: String,
}

impl From<&QrCode> for PageCursor {
    fn from(code: &QrCode) -> Self {
        Self {
            created_at: code.created_at,
            id: code.id.clone(),
        }
    }
}

/// Persistence for codes and groups. Every owner-facing lookup is scoped by
/// `user_id`; a record owned by someone else is reported as absent. Absence
/// is `Ok(None)` / `Ok(false)`, never an error.
///
/// Listings are ordered newest first by `created_at`.
#[async_trait]
pub trait QrStore: Send + Sync {
    async fn create_code(&self, user_id: &str, new: NewQrCode) -> StoreResult<QrCode>;
    async fn get_code(&self, user_id: &str, id: &str) -> StoreResult<Option<QrCode>>;
    /// Public lookup used by the redirect path; short codes are globally unique.
    async fn get_code_by_short_code(&self, short_code: &str) -> StoreResult<Option<QrCode>>;
    async fn list_codes(&self, user_id: &str) -> StoreResult<Vec<QrCode>>;
    /// Up to `limit` codes strictly after `after`, in `list_codes` order.
    async fn list_codes_page(
        &self,
        user_id: &str,
        after: Option<&PageCursor>,
        limit: usize,
    ) -> StoreResult<Vec<QrCode>>;
    async fn list_codes_by_group(&self, user_id: &str, group_id: &str) -> StoreResult<Vec<QrCode>>;
    async fn update_code(&self, user_id: &str, id: &str, patch: QrCodePatch) -> StoreResult<Option<QrCode>>;
    async fn delete_code(&self, user_id: &str, id: &str) -> StoreResult<bool>;

    /// Appends one scan at `at` to an active record, serialized against every
    /// other write to that record. Returns `None` when the record is gone or
    /// no longer active.
    async fn record_scan(&self, id: &str, at: i64) -> StoreResult<Option<QrCode>>;

    async fn create_group(&self, user_id: &str, new: NewGroup) -> StoreResult<QrCodeGroup>;
    async fn get_group(&self, user_id: &str, id: &str) -> StoreResult<Option<QrCodeGroup>>;
    async fn list_groups(&self, user_id: &str) -> StoreResult<Vec<QrCodeGroup>>;
    async fn update_group(&self, user_id: &str, id: &str, patch: GroupPatch) -> StoreResult<Option<QrCodeGroup>>;
    /// Removes the group and detaches its member codes; the codes survive.
    async fn delete_group(&self, user_id: &str, id: &str) -> StoreResult<bool>;

    async fn ping(&self) -> StoreResult<()>;
    fn backend_name(&self) -> &'static str;
}
