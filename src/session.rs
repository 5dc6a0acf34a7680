use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;

use crate::provider::{ChatProvider, ProviderEvent};

/// Lifecycle of one tenant's messaging session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Initializing,
    Qr,
    Authenticated,
    Ready,
    AuthFailure,
    Disconnected,
    Error,
    LoggedOut,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Initializing => "initializing",
            SessionStatus::Qr => "qr",
            SessionStatus::Authenticated => "authenticated",
            SessionStatus::Ready => "ready",
            SessionStatus::AuthFailure => "auth_failure",
            SessionStatus::Disconnected => "disconnected",
            SessionStatus::Error => "error",
            SessionStatus::LoggedOut => "logged_out",
        }
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time view of a session, safe to hand to HTTP handlers.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub status: SessionStatus,
    pub qr_payload: Option<String>,
    pub last_error: Option<String>,
    pub last_event_at: DateTime<Utc>,
}

struct SessionInner {
    status: SessionStatus,
    qr_payload: Option<String>,
    last_error: Option<String>,
    last_event_at: DateTime<Utc>,
}

/// One tenant's session. State lives behind a sync mutex so status reads
/// never await; the provider event task is the only writer besides logout.
pub struct Session {
    pub tenant_id: String,
    inner: Mutex<SessionInner>,
}

impl Session {
    fn new(tenant_id: &str) -> Self {
        Self {
            tenant_id: tenant_id.to_string(),
            inner: Mutex::new(SessionInner {
                status: SessionStatus::Initializing,
                qr_payload: None,
                last_error: None,
                last_event_at: Utc::now(),
            }),
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let inner = self.inner.lock().unwrap();
        SessionSnapshot {
            status: inner.status,
            qr_payload: inner.qr_payload.clone(),
            last_error: inner.last_error.clone(),
            last_event_at: inner.last_event_at,
        }
    }

    pub fn status(&self) -> SessionStatus {
        self.inner.lock().unwrap().status
    }

    /// Apply one provider event to the state machine. Transitions are
    /// monotonic along the documented machine; anything else (including
    /// every event after logout) is dropped.
    fn apply(&self, event: ProviderEvent) {
        let mut inner = self.inner.lock().unwrap();
        if inner.status == SessionStatus::LoggedOut {
            return;
        }

        match event {
            // QR codes rotate while pairing is pending, so Qr -> Qr is a
            // legal self-transition that replaces the payload.
            ProviderEvent::Qr(payload) => match inner.status {
                SessionStatus::Initializing | SessionStatus::Qr => {
                    inner.status = SessionStatus::Qr;
                    inner.qr_payload = Some(payload);
                }
                other => {
                    tracing::debug!(
                        "Ignoring QR event for {} in state {other}",
                        self.tenant_id
                    );
                    return;
                }
            },
            ProviderEvent::Authenticated => match inner.status {
                SessionStatus::Initializing | SessionStatus::Qr => {
                    inner.status = SessionStatus::Authenticated;
                }
                other => {
                    tracing::debug!(
                        "Ignoring authenticated event for {} in state {other}",
                        self.tenant_id
                    );
                    return;
                }
            },
            ProviderEvent::Ready => {
                inner.status = SessionStatus::Ready;
                inner.qr_payload = None;
                inner.last_error = None;
            }
            ProviderEvent::AuthFailure(reason) => {
                inner.status = SessionStatus::AuthFailure;
                inner.qr_payload = None;
                inner.last_error = Some(reason);
            }
            ProviderEvent::Disconnected(reason) => {
                inner.status = SessionStatus::Disconnected;
                inner.qr_payload = None;
                inner.last_error = Some(reason);
            }
        }
        inner.last_event_at = Utc::now();
    }

    fn mark_error(&self, message: String) {
        let mut inner = self.inner.lock().unwrap();
        if inner.status == SessionStatus::LoggedOut {
            return;
        }
        inner.status = SessionStatus::Error;
        inner.last_error = Some(message);
        inner.last_event_at = Utc::now();
    }

    fn mark_logged_out(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.status = SessionStatus::LoggedOut;
        inner.qr_payload = None;
        inner.last_event_at = Utc::now();
    }
}

/// Concurrent per-tenant registry of live sessions. Sessions are created
/// lazily on first use and live until logout or process exit; auth state
/// persisted by the provider under `<session_root>/<tenant>` survives
/// restarts, so a recreated session resumes without a new QR scan.
pub struct SessionRegistry {
    provider: Arc<dyn ChatProvider>,
    session_root: PathBuf,
    sessions: DashMap<String, Arc<Session>>,
}

impl SessionRegistry {
    pub fn new(provider: Arc<dyn ChatProvider>, session_root: PathBuf) -> Self {
        Self {
            provider,
            session_root,
            sessions: DashMap::new(),
        }
    }

    pub fn state_dir(&self, tenant_id: &str) -> PathBuf {
        self.session_root.join(tenant_id)
    }

    pub fn provider(&self) -> &Arc<dyn ChatProvider> {
        &self.provider
    }

    /// Idempotent: returns the existing session or creates one and starts
    /// initialization in the background. Never blocks on the provider.
    pub fn ensure(&self, tenant_id: &str) -> Arc<Session> {
        use dashmap::mapref::entry::Entry;

        match self.sessions.entry(tenant_id.to_string()) {
            Entry::Occupied(entry) => entry.get().clone(),
            Entry::Vacant(entry) => {
                let session = Arc::new(Session::new(tenant_id));
                entry.insert(session.clone());
                self.spawn_lifecycle(session.clone());
                tracing::info!("Session created for tenant {tenant_id}");
                session
            }
        }
    }

    /// Explicit reinitialization entry point. A session stuck in a dead
    /// state is replaced by a brand-new one (dead sessions never
    /// auto-retry); anything else behaves exactly like `ensure`.
    pub fn init(&self, tenant_id: &str) -> Arc<Session> {
        if let Some(existing) = self.get(tenant_id) {
            match existing.status() {
                SessionStatus::AuthFailure
                | SessionStatus::Disconnected
                | SessionStatus::Error => {
                    self.sessions.remove(tenant_id);
                    tracing::info!(
                        "Reinitializing dead session for tenant {tenant_id} (was {})",
                        existing.status()
                    );
                }
                _ => return existing,
            }
        }
        self.ensure(tenant_id)
    }

    /// Non-blocking status read; `None` if no session exists.
    pub fn status(&self, tenant_id: &str) -> Option<SessionSnapshot> {
        self.sessions.get(tenant_id).map(|s| s.snapshot())
    }

    pub fn get(&self, tenant_id: &str) -> Option<Arc<Session>> {
        self.sessions.get(tenant_id).map(|s| Arc::clone(&s))
    }

    /// Tear down a tenant's session and remove it from the registry.
    /// Returns false if there was nothing to log out. The next `ensure`
    /// for the tenant creates a brand-new initializing session.
    pub async fn logout(&self, tenant_id: &str) -> bool {
        let Some((_, session)) = self.sessions.remove(tenant_id) else {
            return false;
        };

        // Terminal state first so the event task drops any late events.
        session.mark_logged_out();

        let state_dir = self.state_dir(tenant_id);
        if let Err(e) = self.provider.destroy(tenant_id, &state_dir).await {
            tracing::warn!("Provider destroy for {tenant_id} failed: {e}");
        }
        tracing::info!("Session logged out for tenant {tenant_id}");
        true
    }

    fn spawn_lifecycle(&self, session: Arc<Session>) {
        let provider = self.provider.clone();
        let state_dir = self.state_dir(&session.tenant_id);
        tokio::spawn(async move {
            drive_lifecycle(provider, session, state_dir).await;
        });
    }
}

async fn drive_lifecycle(
    provider: Arc<dyn ChatProvider>,
    session: Arc<Session>,
    state_dir: impl AsRef<Path>,
) {
    match provider.initialize(&session.tenant_id, state_dir.as_ref()).await {
        Ok(mut events) => {
            while let Some(event) = events.recv().await {
                tracing::debug!("Session event for {}: {event:?}", session.tenant_id);
                session.apply(event);
            }
        }
        Err(e) => {
            tracing::error!(
                "Session initialization for {} failed: {e}",
                session.tenant_id
            );
            session.mark_error(e.message);
        }
    }
}
