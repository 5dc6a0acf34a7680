use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::phone;
use crate::session::{SessionRegistry, SessionStatus};

/// One entry of a batch send request.
#[derive(Debug, Clone, Deserialize)]
pub struct BatchItem {
    pub tenant_id: String,
    pub to: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchItemResult {
    pub ok: bool,
    pub tenant_id: String,
    pub to: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BatchOutcome {
    pub total: usize,
    pub failed: usize,
    pub results: Vec<BatchItemResult>,
}

/// Submits messages through tenant sessions with a bounded per-send
/// timeout. On timeout the in-flight send future is dropped; a message
/// already on the wire may still be delivered by the provider, which the
/// dedup ledger cannot detect.
pub struct Dispatcher {
    registry: Arc<SessionRegistry>,
    send_timeout: Duration,
}

impl Dispatcher {
    pub fn new(registry: Arc<SessionRegistry>, send_timeout: Duration) -> Self {
        Self {
            registry,
            send_timeout,
        }
    }

    /// Send one message. The tenant's session is created lazily if absent
    /// (it will report `initializing`, not ready); a session in any state
    /// but `ready` fails without touching the network. Returns the
    /// normalized destination on success.
    pub async fn send_one(
        &self,
        tenant_id: &str,
        to: &str,
        message: &str,
    ) -> Result<String, AppError> {
        if tenant_id.trim().is_empty() {
            return Err(AppError::InvalidInput("tenant_id is required".into()));
        }
        if message.trim().is_empty() {
            return Err(AppError::InvalidInput("message is required".into()));
        }
        let to = phone::normalize(to)
            .ok_or_else(|| AppError::InvalidInput(format!("Invalid phone number: {to:?}")))?;

        let session = self.registry.ensure(tenant_id);
        let status = session.status();
        if status != SessionStatus::Ready {
            return Err(AppError::SessionNotReady(status));
        }

        let provider = self.registry.provider().clone();
        match tokio::time::timeout(self.send_timeout, provider.send(tenant_id, &to, message)).await
        {
            Ok(Ok(())) => Ok(to),
            Ok(Err(e)) => Err(AppError::Upstream(e.message)),
            Err(_) => Err(AppError::Timeout(format!(
                "Send to {to} exceeded {}s",
                self.send_timeout.as_secs()
            ))),
        }
    }

    /// Send a batch sequentially. Items share nothing but the order they
    /// arrive in; a failure is recorded and the loop moves on, so the
    /// result list always has one entry per input item. Sequential on
    /// purpose: a tenant's chat session is a single connection and does
    /// not tolerate concurrent writes.
    pub async fn send_batch(&self, items: &[BatchItem]) -> BatchOutcome {
        let mut results = Vec::with_capacity(items.len());
        let mut failed = 0usize;

        for item in items {
            match self.send_one(&item.tenant_id, &item.to, &item.message).await {
                Ok(to) => results.push(BatchItemResult {
                    ok: true,
                    tenant_id: item.tenant_id.clone(),
                    to,
                    error: None,
                }),
                Err(e) => {
                    failed += 1;
                    results.push(BatchItemResult {
                        ok: false,
                        tenant_id: item.tenant_id.clone(),
                        to: phone::normalize(&item.to).unwrap_or_else(|| item.to.clone()),
                        error: Some(e.to_string()),
                    });
                }
            }
        }

        BatchOutcome {
            total: items.len(),
            failed,
            results,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::fake::FakeProvider;
    use crate::session::SessionRegistry;

    async fn ready_dispatcher(
        provider: Arc<FakeProvider>,
        timeout: Duration,
    ) -> (Dispatcher, Arc<SessionRegistry>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let registry = Arc::new(SessionRegistry::new(
            provider,
            dir.path().to_path_buf(),
        ));
        (Dispatcher::new(registry.clone(), timeout), registry, dir)
    }

    async fn wait_ready(registry: &SessionRegistry, tenant: &str) {
        for _ in 0..200 {
            if registry.status(tenant).map(|s| s.status) == Some(SessionStatus::Ready) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("tenant {tenant} never became ready");
    }

    #[tokio::test]
    async fn not_ready_fails_without_network_call() {
        let provider = Arc::new(FakeProvider::new());
        let (dispatcher, _registry, _dir) =
            ready_dispatcher(provider.clone(), Duration::from_secs(5)).await;

        let err = dispatcher
            .send_one("t1", "11999887766", "oi")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::SessionNotReady(_)));
        assert_eq!(provider.sent_count(), 0);
    }

    #[tokio::test]
    async fn ready_session_delivers_normalized() {
        let provider = Arc::new(FakeProvider::new().auto_ready());
        let (dispatcher, registry, _dir) =
            ready_dispatcher(provider.clone(), Duration::from_secs(5)).await;

        registry.ensure("t1");
        wait_ready(&registry, "t1").await;

        let to = dispatcher
            .send_one("t1", "(11) 99988-7766", "oi")
            .await
            .unwrap();
        assert_eq!(to, "5511999887766");
        assert_eq!(
            provider.sent(),
            vec![("t1".to_string(), "5511999887766".to_string(), "oi".to_string())]
        );
    }

    #[tokio::test]
    async fn invalid_phone_is_rejected_before_dispatch() {
        let provider = Arc::new(FakeProvider::new().auto_ready());
        let (dispatcher, registry, _dir) =
            ready_dispatcher(provider.clone(), Duration::from_secs(5)).await;
        registry.ensure("t1");
        wait_ready(&registry, "t1").await;

        let err = dispatcher.send_one("t1", "---", "oi").await.unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
        assert_eq!(provider.sent_count(), 0);
    }

    #[tokio::test]
    async fn slow_provider_times_out() {
        let provider = Arc::new(FakeProvider::new().auto_ready());
        provider.set_send_delay(Duration::from_secs(5));
        let (dispatcher, registry, _dir) =
            ready_dispatcher(provider.clone(), Duration::from_millis(50)).await;
        registry.ensure("t1");
        wait_ready(&registry, "t1").await;

        let err = dispatcher
            .send_one("t1", "11999887766", "oi")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Timeout(_)));
    }

    #[tokio::test]
    async fn batch_accounts_partial_failure_without_aborting() {
        let provider = Arc::new(FakeProvider::new().auto_ready());
        provider.fail_sends_to("5511000000000");
        let (dispatcher, registry, _dir) =
            ready_dispatcher(provider.clone(), Duration::from_secs(5)).await;
        registry.ensure("t1");
        wait_ready(&registry, "t1").await;

        let items = vec![
            BatchItem {
                tenant_id: "t1".into(),
                to: "11999887766".into(),
                message: "a".into(),
            },
            BatchItem {
                tenant_id: "t1".into(),
                to: "11 0000-0000".into(),
                message: "b".into(),
            },
            BatchItem {
                tenant_id: "t1".into(),
                to: "11988776655".into(),
                message: "c".into(),
            },
        ];

        let outcome = dispatcher.send_batch(&items).await;
        assert_eq!(outcome.total, 3);
        assert_eq!(outcome.failed, 1);
        assert_eq!(outcome.results.len(), 3);
        assert!(outcome.results[0].ok);
        assert!(!outcome.results[1].ok);
        assert!(outcome.results[2].ok, "failure must not stop later items");
        // The two successes went out in order.
        assert_eq!(provider.sent_count(), 2);
    }

    #[tokio::test]
    async fn batch_creates_missing_sessions_lazily() {
        let provider = Arc::new(FakeProvider::new());
        let (dispatcher, registry, _dir) =
            ready_dispatcher(provider.clone(), Duration::from_secs(5)).await;

        let items = vec![BatchItem {
            tenant_id: "brand-new".into(),
            to: "11999887766".into(),
            message: "oi".into(),
        }];
        let outcome = dispatcher.send_batch(&items).await;

        // The send fails (session still initializing/pairing) but the
        // session now exists for a later attempt.
        assert_eq!(outcome.failed, 1);
        assert!(registry.status("brand-new").is_some());
    }
}
