use std::sync::Arc;

use log::debug;

use crate::store::{QrStore, StoreResult};

/// Turns a decided redirect into exactly one recorded scan.
///
/// Deliberately not idempotent: two calls mean two scans happened.
pub struct ScanAccountant {
    store: Arc<dyn QrStore>,
}

impl ScanAccountant {
    pub fn new(store: Arc<dyn QrStore>) -> Self {
        Self { store }
    }

    pub async fn record(&self, id: &str) -> StoreResult<()> {
        let now = chrono::Utc::now().timestamp_millis();
        match self.store.record_scan(id, now).await? {
            Some(code) => debug!(
                "Recorded scan of {} ({}), total {}",
                code.short_code, code.id, code.scan_count
            ),
            // The redirect was already decided; nothing to surface.
            None => debug!("QR code {} vanished or was deactivated before accounting", id),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewQrCode, QrCodePatch};
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn each_call_is_one_scan() {
        let store = Arc::new(MemoryStore::default());
        let code = store
            .create_code("user-1", NewQrCode::new("Menu", "https://example.com"))
            .await
            .unwrap();
        let accountant = ScanAccountant::new(store.clone());

        accountant.record(&code.id).await.unwrap();
        accountant.record(&code.id).await.unwrap();

        let code = store.get_code("user-1", &code.id).await.unwrap().unwrap();
        assert_eq!(code.scan_count, 2);
        assert_eq!(code.scan_history.len(), 2);
        assert_eq!(code.last_scanned, code.scan_history.last().copied());
    }

    #[tokio::test]
    async fn missing_record_is_a_no_op() {
        let accountant = ScanAccountant::new(Arc::new(MemoryStore::default()));
        assert!(accountant.record("gone42").await.is_ok());
    }

    #[tokio::test]
    async fn inactive_record_is_left_alone() {
        let store = Arc::new(MemoryStore::default());
        let code = store
            .create_code("user-1", NewQrCode::new("Menu", "https://example.com"))
            .await
            .unwrap();
        store
            .update_code("user-1", &code.id, QrCodePatch::activation(false))
            .await
            .unwrap();

        ScanAccountant::new(store.clone()).record(&code.id).await.unwrap();

        let code = store.get_code("user-1", &code.id).await.unwrap().unwrap();
        assert_eq!(code.scan_count, 0);
        assert!(code.scan_history.is_empty());
    }
}
