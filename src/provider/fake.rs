use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc::{self, Receiver, Sender};

use super::{ChatProvider, ProviderError, ProviderEvent};

const CREDENTIALS_FILE: &str = "credentials";

/// Scripted chat provider for tests and local development.
///
/// By default a fresh tenant gets a QR pairing flow: `initialize` emits
/// `Qr` and then waits until the test calls [`FakeProvider::complete_pairing`],
/// which emits `Authenticated` + `Ready` and persists a credentials marker
/// under the tenant's state dir. A tenant whose marker already exists
/// resumes straight to `Ready`, mirroring how the real client restores a
/// persisted session without a new scan.
pub struct FakeProvider {
    /// Pending event senders, kept so pairing can be completed later.
    pending: Mutex<HashMap<String, Sender<ProviderEvent>>>,
    /// Explicit event scripts, consumed by the next `initialize` call.
    scripts: Mutex<HashMap<String, Vec<ProviderEvent>>>,
    /// Normalized numbers whose sends should fail.
    failing_numbers: Mutex<HashSet<String>>,
    /// Artificial latency before each send completes.
    send_delay: Mutex<Option<Duration>>,
    /// Every delivered message as (tenant_id, to, body).
    sent: Mutex<Vec<(String, String, String)>>,
    /// When set, skip the QR flow: fresh tenants pair instantly.
    auto_ready: Mutex<bool>,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self {
            pending: Mutex::new(HashMap::new()),
            scripts: Mutex::new(HashMap::new()),
            failing_numbers: Mutex::new(HashSet::new()),
            send_delay: Mutex::new(None),
            sent: Mutex::new(Vec::new()),
            auto_ready: Mutex::new(false),
        }
    }

    /// Skip the QR phase for tenants without persisted credentials.
    pub fn auto_ready(self) -> Self {
        *self.auto_ready.lock().unwrap() = true;
        self
    }

    /// Script the exact events the next `initialize` for `tenant_id` emits.
    pub fn set_script(&self, tenant_id: &str, events: Vec<ProviderEvent>) {
        self.scripts
            .lock()
            .unwrap()
            .insert(tenant_id.to_string(), events);
    }

    /// Make sends to this normalized number fail.
    pub fn fail_sends_to(&self, to: &str) {
        self.failing_numbers.lock().unwrap().insert(to.to_string());
    }

    /// Delay every send by the given duration (for timeout tests).
    pub fn set_send_delay(&self, delay: Duration) {
        *self.send_delay.lock().unwrap() = Some(delay);
    }

    /// Complete a pending QR pairing: emit Authenticated + Ready and
    /// persist the credentials marker.
    pub async fn complete_pairing(&self, tenant_id: &str, state_dir: &Path) {
        let tx = self.pending.lock().unwrap().remove(tenant_id);
        if let Some(tx) = tx {
            let _ = std::fs::create_dir_all(state_dir);
            let _ = std::fs::write(state_dir.join(CREDENTIALS_FILE), "authenticated");
            let _ = tx.send(ProviderEvent::Authenticated).await;
            let _ = tx.send(ProviderEvent::Ready).await;
        }
    }

    pub fn sent(&self) -> Vec<(String, String, String)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

impl Default for FakeProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatProvider for FakeProvider {
    async fn initialize(
        &self,
        tenant_id: &str,
        state_dir: &Path,
    ) -> Result<Receiver<ProviderEvent>, ProviderError> {
        std::fs::create_dir_all(state_dir)
            .map_err(|e| ProviderError::from(format!("Failed to create state dir: {e}")))?;

        let (tx, rx) = mpsc::channel(8);

        // An explicit script wins over everything.
        if let Some(events) = self.scripts.lock().unwrap().remove(tenant_id) {
            tokio::spawn(async move {
                for event in events {
                    if tx.send(event).await.is_err() {
                        break;
                    }
                }
            });
            return Ok(rx);
        }

        let has_credentials = state_dir.join(CREDENTIALS_FILE).exists();
        if has_credentials || *self.auto_ready.lock().unwrap() {
            let _ = std::fs::write(state_dir.join(CREDENTIALS_FILE), "authenticated");
            let _ = tx.send(ProviderEvent::Authenticated).await;
            let _ = tx.send(ProviderEvent::Ready).await;
        } else {
            let _ = tx
                .send(ProviderEvent::Qr(format!("fake-qr:{tenant_id}")))
                .await;
            self.pending
                .lock()
                .unwrap()
                .insert(tenant_id.to_string(), tx);
        }

        Ok(rx)
    }

    async fn send(&self, tenant_id: &str, to: &str, body: &str) -> Result<(), ProviderError> {
        let delay = *self.send_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.failing_numbers.lock().unwrap().contains(to) {
            return Err(ProviderError::from(format!(
                "Number {to} is not registered on the network"
            )));
        }

        self.sent.lock().unwrap().push((
            tenant_id.to_string(),
            to.to_string(),
            body.to_string(),
        ));
        Ok(())
    }

    async fn destroy(&self, tenant_id: &str, state_dir: &Path) -> Result<(), ProviderError> {
        self.pending.lock().unwrap().remove(tenant_id);
        let _ = std::fs::remove_file(state_dir.join(CREDENTIALS_FILE));
        Ok(())
    }

    fn name(&self) -> &str {
        "fake"
    }
}
