use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, warn};

use crate::services::accountant::ScanAccountant;
use crate::store::{QrStore, StoreResult};
use crate::utils::short_code::is_valid_short_code;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Resolved { id: String, destination_url: String },
    Deactivated,
    NotFound,
}

/// Maps a scanned short code to where it should land, recording the scan
/// on the way.
///
/// Accounting runs as its own task and is awaited for at most
/// `accounting_timeout`; past that the redirect goes out while the task
/// finishes in the background.
pub struct Resolver {
    store: Arc<dyn QrStore>,
    accountant: Arc<ScanAccountant>,
    accounting_timeout: Duration,
}

impl Resolver {
    pub fn new(store: Arc<dyn QrStore>, accounting_timeout: Duration) -> Self {
        let accountant = Arc::new(ScanAccountant::new(Arc::clone(&store)));
        Self {
            store,
            accountant,
            accounting_timeout,
        }
    }

    pub async fn resolve(&self, short_code: &str) -> StoreResult<Resolution> {
        self.resolve_scoped(short_code, None).await
    }

    /// Multi-tenant variant: a code owned by someone else does not exist.
    pub async fn resolve_for_owner(&self, user_id: &str, short_code: &str) -> StoreResult<Resolution> {
        self.resolve_scoped(short_code, Some(user_id)).await
    }

    async fn resolve_scoped(&self, short_code: &str, owner: Option<&str>) -> StoreResult<Resolution> {
        if !is_valid_short_code(short_code) {
            debug!("Rejected malformed short code {:?}", short_code);
            return Ok(Resolution::NotFound);
        }

        let record = self
            .store
            .get_code_by_short_code(short_code)
            .await?
            .filter(|code| owner.is_none_or(|user_id| code.belongs_to(user_id)));

        let Some(code) = record else {
            debug!("Short code {} not found", short_code);
            return Ok(Resolution::NotFound);
        };
        if !code.is_active {
            debug!("Short code {} is deactivated", short_code);
            return Ok(Resolution::Deactivated);
        }

        self.account(code.id.clone()).await;
        Ok(Resolution::Resolved {
            id: code.id,
            destination_url: code.destination_url,
        })
    }

    async fn account(&self, id: String) {
        let accountant = Arc::clone(&self.accountant);
        let task = tokio::spawn(async move {
            let result = accountant.record(&id).await;
            result.map_err(|e| (id, e))
        });

        match tokio::time::timeout(self.accounting_timeout, task).await {
            Ok(Ok(Ok(()))) => {}
            Ok(Ok(Err((id, e)))) => error!("Failed to record scan of {}: {}", id, e),
            Ok(Err(e)) => error!("Scan accounting task failed: {}", e),
            Err(_) => warn!(
                "Scan accounting exceeded {:?}; redirecting while it completes",
                self.accounting_timeout
            ),
        }
    }
}
