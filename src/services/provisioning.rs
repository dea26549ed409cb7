use log::warn;

use crate::models::{NewQrCode, QrCode};
use crate::store::{QrStore, StoreResult};

pub const CREATE_ATTEMPTS: usize = 3;

/// Creates a code, starting over with fresh randomness when the store runs
/// out of identifier candidates. Any other failure is returned at once.
pub async fn create_code(store: &dyn QrStore, user_id: &str, new: NewQrCode) -> StoreResult<QrCode> {
    let mut attempt = 1;
    loop {
        match store.create_code(user_id, new.clone()).await {
            Err(e) if e.is_collision() && attempt < CREATE_ATTEMPTS => {
                warn!("Create attempt {}/{} failed: {}", attempt, CREATE_ATTEMPTS, e);
                attempt += 1;
            }
            result => return result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, StoreError};
    use crate::utils::short_code::{CodeSource, ShortCodeGenerator};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Constant {
        calls: AtomicUsize,
    }

    impl CodeSource for Constant {
        fn generate(&self, length: usize) -> String {
            self.calls.fetch_add(1, Ordering::SeqCst);
            "A".repeat(length)
        }
    }

    #[tokio::test]
    async fn gives_up_after_bounded_attempts() {
        let source = Arc::new(Constant {
            calls: AtomicUsize::new(0),
        });
        let store = MemoryStore::new(ShortCodeGenerator::with_source(source.clone(), 4));

        create_code(&store, "user-1", NewQrCode::new("First", "https://example.com"))
            .await
            .unwrap();
        let calls_after_first = source.calls.load(Ordering::SeqCst);

        let err = create_code(&store, "user-1", NewQrCode::new("Second", "https://example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::GenerationExhausted { attempts: 4 }));
        // Every whole-create retry draws fresh candidates.
        assert_eq!(source.calls.load(Ordering::SeqCst) - calls_after_first, 4 * CREATE_ATTEMPTS);
    }
}
