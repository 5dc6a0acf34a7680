pub mod cloud;
pub mod fake;

use std::path::Path;

use async_trait::async_trait;
use tokio::sync::mpsc::Receiver;

/// Lifecycle events emitted by a chat client while a tenant's session is
/// being brought up (or torn down from under us).
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderEvent {
    /// The client needs the user to scan a pairing code.
    Qr(String),
    /// Pairing credential accepted.
    Authenticated,
    /// The session can send messages.
    Ready,
    /// Credential rejected or pairing expired.
    AuthFailure(String),
    /// Connection to the chat network dropped.
    Disconnected(String),
}

#[derive(Debug)]
pub struct ProviderError {
    pub message: String,
}

impl std::fmt::Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl From<String> for ProviderError {
    fn from(s: String) -> Self {
        ProviderError { message: s }
    }
}

impl From<&str> for ProviderError {
    fn from(s: &str) -> Self {
        ProviderError {
            message: s.to_string(),
        }
    }
}

/// Capability interface over the underlying chat client.
///
/// One provider instance serves every tenant; per-tenant auth state lives
/// under `state_dir` in a format owned by the provider. The session
/// manager drives the returned event stream into its state machine, so
/// transitions stay testable without a live chat network.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Begin (or resume) a tenant session. The receiver yields lifecycle
    /// events until the session settles or the provider gives up. An `Err`
    /// means initialization itself failed to start.
    async fn initialize(
        &self,
        tenant_id: &str,
        state_dir: &Path,
    ) -> Result<Receiver<ProviderEvent>, ProviderError>;

    /// Deliver one message to a normalized address.
    async fn send(&self, tenant_id: &str, to: &str, body: &str) -> Result<(), ProviderError>;

    /// Tear the tenant session down, discarding auth state.
    async fn destroy(&self, tenant_id: &str, state_dir: &Path) -> Result<(), ProviderError>;

    /// Provider name for logs.
    fn name(&self) -> &str;
}
