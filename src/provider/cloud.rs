use std::path::Path;

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::mpsc::{self, Receiver};

use crate::config::ProviderConfig;

use super::{ChatProvider, ProviderError, ProviderEvent};

/// Chat provider backed by a hosted WhatsApp cloud API. Sessions on this
/// variant are provisioned server-side, so there is no QR phase: a
/// successful init goes straight to ready, and auth problems surface as
/// `AuthFailure`.
pub struct CloudApiProvider {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl CloudApiProvider {
    pub fn new(config: &ProviderConfig) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .expect("Failed to build reqwest client"),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
        }
    }
}

#[async_trait]
impl ChatProvider for CloudApiProvider {
    async fn initialize(
        &self,
        tenant_id: &str,
        _state_dir: &Path,
    ) -> Result<Receiver<ProviderEvent>, ProviderError> {
        let resp = self
            .client
            .post(format!("{}/v1/sessions", self.base_url))
            .bearer_auth(&self.token)
            .json(&json!({ "tenant_id": tenant_id }))
            .send()
            .await
            .map_err(|e| ProviderError::from(format!("Session init request failed: {e}")))?;

        let status = resp.status();
        let (tx, rx) = mpsc::channel(4);

        if status.is_success() {
            let _ = tx.send(ProviderEvent::Authenticated).await;
            let _ = tx.send(ProviderEvent::Ready).await;
        } else if status.as_u16() == 401 || status.as_u16() == 403 {
            let body = truncated_body(resp).await;
            let _ = tx
                .send(ProviderEvent::AuthFailure(format!(
                    "Upstream rejected credentials ({status}): {body}"
                )))
                .await;
        } else {
            let body = truncated_body(resp).await;
            let _ = tx
                .send(ProviderEvent::Disconnected(format!(
                    "Upstream session init failed ({status}): {body}"
                )))
                .await;
        }

        Ok(rx)
    }

    async fn send(&self, tenant_id: &str, to: &str, body: &str) -> Result<(), ProviderError> {
        let resp = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .bearer_auth(&self.token)
            .json(&json!({ "tenant_id": tenant_id, "to": to, "body": body }))
            .send()
            .await
            .map_err(|e| ProviderError::from(format!("Send request failed: {e}")))?;

        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }

        let body = truncated_body(resp).await;
        Err(ProviderError::from(format!(
            "Upstream rejected send ({status}): {body}"
        )))
    }

    async fn destroy(&self, tenant_id: &str, _state_dir: &Path) -> Result<(), ProviderError> {
        let resp = self
            .client
            .delete(format!("{}/v1/sessions/{tenant_id}", self.base_url))
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| ProviderError::from(format!("Session destroy request failed: {e}")))?;

        if !resp.status().is_success() {
            tracing::warn!(
                "Upstream session destroy for {tenant_id} returned {}",
                resp.status()
            );
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "cloud-api"
    }
}

async fn truncated_body(resp: reqwest::Response) -> String {
    resp.text()
        .await
        .unwrap_or_default()
        .chars()
        .take(1024)
        .collect()
}
