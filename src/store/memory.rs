use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use log::debug;
use parking_lot::Mutex;

use super::{CODE_ID_LENGTH, GROUP_ID_LENGTH, PageCursor, QrStore, SHORT_CODE_LENGTH, StoreError, StoreResult};
use crate::models::{GroupPatch, NewGroup, NewQrCode, QrCode, QrCodeGroup, QrCodePatch};
use crate::utils::short_code::ShortCodeGenerator;

// Each code carries its own lock so scans of different codes never contend.
struct CodeSlot {
    seq: u64,
    record: Mutex<QrCode>,
}

struct GroupSlot {
    seq: u64,
    group: QrCodeGroup,
}

/// Process-local store.
///
/// Lock order: a `codes` shard may be held while taking a record mutex or a
/// `short_codes` shard, never the other way round.
pub struct MemoryStore {
    generator: ShortCodeGenerator,
    codes: DashMap<String, Arc<CodeSlot>>,
    short_codes: DashMap<String, String>,
    groups: DashMap<String, GroupSlot>,
    seq: AtomicU64,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(ShortCodeGenerator::default())
    }
}

impl MemoryStore {
    pub fn new(generator: ShortCodeGenerator) -> Self {
        Self {
            generator,
            codes: DashMap::new(),
            short_codes: DashMap::new(),
            groups: DashMap::new(),
            seq: AtomicU64::new(0),
        }
    }

    fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::Relaxed)
    }

    fn slot(&self, id: &str) -> Option<Arc<CodeSlot>> {
        self.codes.get(id).map(|entry| Arc::clone(entry.value()))
    }

    fn owned_slot(&self, user_id: &str, id: &str) -> Option<Arc<CodeSlot>> {
        self.slot(id).filter(|slot| slot.record.lock().belongs_to(user_id))
    }

    fn collect_codes(&self, keep: impl Fn(&QrCode) -> bool) -> Vec<QrCode> {
        let mut found: Vec<(u64, QrCode)> = self
            .codes
            .iter()
            .filter_map(|entry| {
                let record = entry.record.lock();
                keep(&*record).then(|| (entry.seq, record.clone()))
            })
            .collect();
        found.sort_by(|(seq_a, a), (seq_b, b)| {
            b.created_at.cmp(&a.created_at).then(seq_b.cmp(seq_a))
        });
        found.into_iter().map(|(_, code)| code).collect()
    }
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[async_trait]
impl QrStore for MemoryStore {
    async fn create_code(&self, user_id: &str, new: NewQrCode) -> StoreResult<QrCode> {
        let created_at = now_millis();
        for id in self.generator.candidates(CODE_ID_LENGTH) {
            let Entry::Vacant(slot) = self.codes.entry(id.clone()) else {
                continue;
            };
            let short_code = self.generator.claim(SHORT_CODE_LENGTH, |candidate| {
                match self.short_codes.entry(candidate.clone()) {
                    Entry::Vacant(index) => {
                        index.insert(id.clone());
                        Some(candidate)
                    }
                    Entry::Occupied(_) => None,
                }
            })?;

            let code = QrCode::new(id, user_id, short_code, new, created_at);
            slot.insert(Arc::new(CodeSlot {
                seq: self.next_seq(),
                record: Mutex::new(code.clone()),
            }));
            debug!("Created QR code {} with short code {}", code.id, code.short_code);
            return Ok(code);
        }

        Err(StoreError::GenerationExhausted {
            attempts: self.generator.max_attempts(),
        })
    }

    async fn get_code(&self, user_id: &str, id: &str) -> StoreResult<Option<QrCode>> {
        Ok(self
            .owned_slot(user_id, id)
            .map(|slot| slot.record.lock().clone()))
    }

    async fn get_code_by_short_code(&self, short_code: &str) -> StoreResult<Option<QrCode>> {
        let id = self.short_codes.get(short_code).map(|entry| entry.value().clone());
        Ok(id
            .and_then(|id| self.slot(&id))
            .map(|slot| slot.record.lock().clone()))
    }

    async fn list_codes(&self, user_id: &str) -> StoreResult<Vec<QrCode>> {
        Ok(self.collect_codes(|code| code.belongs_to(user_id)))
    }

    async fn list_codes_page(
        &self,
        user_id: &str,
        after: Option<&PageCursor>,
        limit: usize,
    ) -> StoreResult<Vec<QrCode>> {
        let codes = self.collect_codes(|code| code.belongs_to(user_id));
        let start = match after {
            None => 0,
            // Insertion order breaks created_at ties, so resume right after
            // the cursor's own record while it still exists.
            Some(cursor) => match codes.iter().position(|code| code.id == cursor.id) {
                Some(index) => index + 1,
                None => codes
                    .iter()
                    .position(|code| code.created_at < cursor.created_at)
                    .unwrap_or(codes.len()),
            },
        };
        Ok(codes.into_iter().skip(start).take(limit).collect())
    }

    async fn list_codes_by_group(&self, user_id: &str, group_id: &str) -> StoreResult<Vec<QrCode>> {
        Ok(self.collect_codes(|code| {
            code.belongs_to(user_id) && code.group_id.as_deref() == Some(group_id)
        }))
    }

    async fn update_code(&self, user_id: &str, id: &str, patch: QrCodePatch) -> StoreResult<Option<QrCode>> {
        let Some(slot) = self.owned_slot(user_id, id) else {
            return Ok(None);
        };
        let mut record = slot.record.lock();
        patch.apply(&mut record);
        Ok(Some(record.clone()))
    }

    async fn delete_code(&self, user_id: &str, id: &str) -> StoreResult<bool> {
        let removed = self
            .codes
            .remove_if(id, |_, slot| slot.record.lock().belongs_to(user_id));
        match removed {
            Some((_, slot)) => {
                let short_code = slot.record.lock().short_code.clone();
                self.short_codes.remove(&short_code);
                debug!("Deleted QR code {} ({})", id, short_code);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn record_scan(&self, id: &str, at: i64) -> StoreResult<Option<QrCode>> {
        let Some(slot) = self.slot(id) else {
            return Ok(None);
        };
        let mut record = slot.record.lock();
        if !record.is_active {
            return Ok(None);
        }
        record.register_scan(at);
        Ok(Some(record.clone()))
    }

    async fn create_group(&self, user_id: &str, new: NewGroup) -> StoreResult<QrCodeGroup> {
        let created_at = now_millis();
        self.generator.claim(GROUP_ID_LENGTH, |id| match self.groups.entry(id.clone()) {
            Entry::Vacant(slot) => {
                let group = QrCodeGroup::new(id, user_id, new.clone(), created_at);
                slot.insert(GroupSlot {
                    seq: self.next_seq(),
                    group: group.clone(),
                });
                Some(group)
            }
            Entry::Occupied(_) => None,
        })
    }

    async fn get_group(&self, user_id: &str, id: &str) -> StoreResult<Option<QrCodeGroup>> {
        Ok(self
            .groups
            .get(id)
            .filter(|slot| slot.group.user_id == user_id)
            .map(|slot| slot.group.clone()))
    }

    async fn list_groups(&self, user_id: &str) -> StoreResult<Vec<QrCodeGroup>> {
        let mut found: Vec<(u64, QrCodeGroup)> = self
            .groups
            .iter()
            .filter(|slot| slot.group.user_id == user_id)
            .map(|slot| (slot.seq, slot.group.clone()))
            .collect();
        found.sort_by(|(seq_a, a), (seq_b, b)| {
            b.created_at.cmp(&a.created_at).then(seq_b.cmp(seq_a))
        });
        Ok(found.into_iter().map(|(_, group)| group).collect())
    }

    async fn update_group(&self, user_id: &str, id: &str, patch: GroupPatch) -> StoreResult<Option<QrCodeGroup>> {
        Ok(self
            .groups
            .get_mut(id)
            .filter(|slot| slot.group.user_id == user_id)
            .map(|mut slot| {
                patch.apply(&mut slot.group);
                slot.group.clone()
            }))
    }

    async fn delete_group(&self, user_id: &str, id: &str) -> StoreResult<bool> {
        if self
            .groups
            .remove_if(id, |_, slot| slot.group.user_id == user_id)
            .is_none()
        {
            return Ok(false);
        }

        let mut detached = 0;
        for entry in self.codes.iter() {
            let mut record = entry.record.lock();
            if record.belongs_to(user_id) && record.group_id.as_deref() == Some(id) {
                record.group_id = None;
                detached += 1;
            }
        }
        debug!("Deleted group {} and detached {} codes", id, detached);
        Ok(true)
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
