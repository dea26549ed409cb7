use async_trait::async_trait;
use futures_util::TryStreamExt;
use log::{debug, info, warn};
use mongodb::bson::{Bson, Document, doc};
use mongodb::error::{Error as MongoError, ErrorKind, WriteFailure};
use mongodb::options::{IndexOptions, ReturnDocument};
use mongodb::{Collection, Database, IndexModel};

use super::{CODE_ID_LENGTH, GROUP_ID_LENGTH, PageCursor, QrStore, SHORT_CODE_LENGTH, StoreError, StoreResult};
use crate::models::{GroupPatch, NewGroup, NewQrCode, QrCode, QrCodeGroup, QrCodePatch};
use crate::utils::short_code::ShortCodeGenerator;

pub const CODES_COLLECTION: &str = "qr_codes";
pub const GROUPS_COLLECTION: &str = "qr_code_groups";

const DUPLICATE_KEY: i32 = 11000;

/// MongoDB-backed store. Short-code uniqueness rests on a unique index and
/// scans are a single-document pipeline update, which the server applies
/// atomically.
pub struct MongoStore {
    db: Database,
    generator: ShortCodeGenerator,
}

impl MongoStore {
    pub async fn new(db: Database, generator: ShortCodeGenerator) -> StoreResult<Self> {
        let store = Self { db, generator };
        store.ensure_indexes().await?;
        Ok(store)
    }

    fn codes(&self) -> Collection<QrCode> {
        self.db.collection::<QrCode>(CODES_COLLECTION)
    }

    fn groups(&self) -> Collection<QrCodeGroup> {
        self.db.collection::<QrCodeGroup>(GROUPS_COLLECTION)
    }

    async fn ensure_indexes(&self) -> StoreResult<()> {
        let unique = IndexOptions::builder().unique(true).build();
        self.codes()
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "short_code": 1 })
                    .options(unique)
                    .build(),
            )
            .await?;
        self.codes()
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "user_id": 1, "created_at": -1 })
                    .build(),
            )
            .await?;
        self.codes()
            .create_index(IndexModel::builder().keys(doc! { "group_id": 1 }).build())
            .await?;
        self.groups()
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "user_id": 1, "created_at": -1 })
                    .build(),
            )
            .await?;
        info!("MongoDB indexes ensured on {} and {}", CODES_COLLECTION, GROUPS_COLLECTION);
        Ok(())
    }

    async fn find_codes(&self, filter: Document) -> StoreResult<Vec<QrCode>> {
        let codes = self
            .codes()
            .find(filter)
            .sort(newest_first())
            .await?
            .try_collect()
            .await?;
        Ok(codes)
    }

    async fn find_codes_limited(&self, filter: Document, limit: i64) -> StoreResult<Vec<QrCode>> {
        let codes = self
            .codes()
            .find(filter)
            .sort(newest_first())
            .limit(limit)
            .await?
            .try_collect()
            .await?;
        Ok(codes)
    }
}

fn newest_first() -> Document {
    doc! { "created_at": -1, "_id": -1 }
}

/// Everything strictly after `cursor` in `newest_first` order.
fn page_filter(user_id: &str, cursor: Option<&PageCursor>) -> Document {
    let mut filter = doc! { "user_id": user_id };
    if let Some(cursor) = cursor {
        filter.insert(
            "$or",
            vec![
                doc! { "created_at": { "$lt": cursor.created_at } },
                doc! { "created_at": cursor.created_at, "_id": { "$lt": cursor.id.as_str() } },
            ],
        );
    }
    filter
}

fn is_duplicate_key(err: &MongoError) -> bool {
    matches!(
        &*err.kind,
        ErrorKind::Write(WriteFailure::WriteError(write_error)) if write_error.code == DUPLICATE_KEY
    )
}

fn optional(value: Option<String>) -> Bson {
    value.map(Bson::String).unwrap_or(Bson::Null)
}

fn code_changes(patch: QrCodePatch) -> Document {
    let mut set = Document::new();
    if let Some(title) = patch.title {
        set.insert("title", title);
    }
    if let Some(url) = patch.destination_url {
        set.insert("destination_url", url);
    }
    if let Some(color) = patch.foreground_color {
        set.insert("foreground_color", color);
    }
    if let Some(color) = patch.background_color {
        set.insert("background_color", color);
    }
    if let Some(size) = patch.size {
        set.insert("size", i64::from(size));
    }
    if let Some(is_active) = patch.is_active {
        set.insert("is_active", is_active);
    }
    if let Some(group_id) = patch.group_id {
        set.insert("group_id", optional(group_id));
    }
    set
}

fn group_changes(patch: GroupPatch) -> Document {
    let mut set = Document::new();
    if let Some(name) = patch.name {
        set.insert("name", name);
    }
    if let Some(base_url) = patch.base_url {
        set.insert("base_url", base_url);
    }
    if let Some(description) = patch.description {
        set.insert("description", optional(description));
    }
    set
}

/// Append then recount in one pipeline, so `scan_count` is always the length
/// of `scan_history` as the server sees it.
fn scan_pipeline(at: i64) -> Vec<Document> {
    vec![
        doc! {
            "$set": {
                "scan_history": {
                    "$concatArrays": [ { "$ifNull": ["$scan_history", []] }, [at] ]
                }
            }
        },
        doc! {
            "$set": {
                "scan_count": { "$size": "$scan_history" },
                "last_scanned": at,
            }
        },
    ]
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[async_trait]
impl QrStore for MongoStore {
    async fn create_code(&self, user_id: &str, new: NewQrCode) -> StoreResult<QrCode> {
        let created_at = now_millis();
        let mut last_short_code = String::new();

        for _ in 0..self.generator.max_attempts() {
            let code = QrCode::new(
                self.generator.generate(CODE_ID_LENGTH),
                user_id,
                self.generator.generate(SHORT_CODE_LENGTH),
                new.clone(),
                created_at,
            );
            match self.codes().insert_one(&code).await {
                Ok(_) => {
                    debug!("Created QR code {} with short code {}", code.id, code.short_code);
                    return Ok(code);
                }
                Err(e) if is_duplicate_key(&e) => {
                    warn!("Identifier collision on {}, regenerating", code.short_code);
                    last_short_code = code.short_code;
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(StoreError::DuplicateShortCode(last_short_code))
    }

    async fn get_code(&self, user_id: &str, id: &str) -> StoreResult<Option<QrCode>> {
        Ok(self
            .codes()
            .find_one(doc! { "_id": id, "user_id": user_id })
            .await?)
    }

    async fn get_code_by_short_code(&self, short_code: &str) -> StoreResult<Option<QrCode>> {
        Ok(self.codes().find_one(doc! { "short_code": short_code }).await?)
    }

    async fn list_codes(&self, user_id: &str) -> StoreResult<Vec<QrCode>> {
        self.find_codes(doc! { "user_id": user_id }).await
    }

    async fn list_codes_page(
        &self,
        user_id: &str,
        after: Option<&PageCursor>,
        limit: usize,
    ) -> StoreResult<Vec<QrCode>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        self.find_codes_limited(page_filter(user_id, after), limit).await
    }

    async fn list_codes_by_group(&self, user_id: &str, group_id: &str) -> StoreResult<Vec<QrCode>> {
        self.find_codes(doc! { "user_id": user_id, "group_id": group_id })
            .await
    }

    async fn update_code(&self, user_id: &str, id: &str, patch: QrCodePatch) -> StoreResult<Option<QrCode>> {
        let filter = doc! { "_id": id, "user_id": user_id };
        if patch.is_empty() {
            return Ok(self.codes().find_one(filter).await?);
        }
        Ok(self
            .codes()
            .find_one_and_update(filter, doc! { "$set": code_changes(patch) })
            .return_document(ReturnDocument::After)
            .await?)
    }

    async fn delete_code(&self, user_id: &str, id: &str) -> StoreResult<bool> {
        let result = self
            .codes()
            .delete_one(doc! { "_id": id, "user_id": user_id })
            .await?;
        Ok(result.deleted_count == 1)
    }

    async fn record_scan(&self, id: &str, at: i64) -> StoreResult<Option<QrCode>> {
        Ok(self
            .codes()
            .find_one_and_update(doc! { "_id": id, "is_active": true }, scan_pipeline(at))
            .return_document(ReturnDocument::After)
            .await?)
    }

    async fn create_group(&self, user_id: &str, new: NewGroup) -> StoreResult<QrCodeGroup> {
        let created_at = now_millis();
        for id in self.generator.candidates(GROUP_ID_LENGTH) {
            let group = QrCodeGroup::new(id, user_id, new.clone(), created_at);
            match self.groups().insert_one(&group).await {
                Ok(_) => return Ok(group),
                Err(e) if is_duplicate_key(&e) => {
                    warn!("Group id collision on {}, regenerating", group.id);
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(StoreError::GenerationExhausted {
            attempts: self.generator.max_attempts(),
        })
    }

    async fn get_group(&self, user_id: &str, id: &str) -> StoreResult<Option<QrCodeGroup>> {
        Ok(self
            .groups()
            .find_one(doc! { "_id": id, "user_id": user_id })
            .await?)
    }

    async fn list_groups(&self, user_id: &str) -> StoreResult<Vec<QrCodeGroup>> {
        let groups = self
            .groups()
            .find(doc! { "user_id": user_id })
            .sort(newest_first())
            .await?
            .try_collect()
            .await?;
        Ok(groups)
    }

    async fn update_group(&self, user_id: &str, id: &str, patch: GroupPatch) -> StoreResult<Option<QrCodeGroup>> {
        let filter = doc! { "_id": id, "user_id": user_id };
        if patch.is_empty() {
            return Ok(self.groups().find_one(filter).await?);
        }
        Ok(self
            .groups()
            .find_one_and_update(filter, doc! { "$set": group_changes(patch) })
            .return_document(ReturnDocument::After)
            .await?)
    }

    async fn delete_group(&self, user_id: &str, id: &str) -> StoreResult<bool> {
        let deleted = self
            .groups()
            .delete_one(doc! { "_id": id, "user_id": user_id })
            .await?;
        if deleted.deleted_count == 0 {
            return Ok(false);
        }

        let detached = self
            .codes()
            .update_many(
                doc! { "user_id": user_id, "group_id": id },
                doc! { "$set": { "group_id": Bson::Null } },
            )
            .await?;
        debug!("Deleted group {} and detached {} codes", id, detached.modified_count);
        Ok(true)
    }

    async fn ping(&self) -> StoreResult<()> {
        self.db.run_command(doc! { "ping": 1 }).await?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "mongodb"
    }
}
