use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

use avisa::config::Config;
use avisa::models::{AutomationSettings, NotifiableInstallment};
use avisa::provider::fake::FakeProvider;
use avisa::state::SharedState;

pub const TEST_SECRET: &str = "test-shared-secret";

/// A running test server with a throwaway database and a scripted fake
/// chat provider. Everything lives under one temp dir that is removed on
/// drop.
pub struct TestApp {
    pub addr: SocketAddr,
    pub pool: SqlitePool,
    pub client: Client,
    pub provider: Arc<FakeProvider>,
    pub state: SharedState,
    _tmp: tempfile::TempDir,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub async fn get_auth(&self, path: &str) -> (Value, StatusCode) {
        let resp = self
            .client
            .get(self.url(path))
            .bearer_auth(TEST_SECRET)
            .send()
            .await
            .expect("get request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    pub async fn post_auth(&self, path: &str, body: &Value) -> (Value, StatusCode) {
        let resp = self
            .client
            .post(self.url(path))
            .bearer_auth(TEST_SECRET)
            .json(body)
            .send()
            .await
            .expect("post request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    /// Start a session and wait until it reaches the given status.
    pub async fn wait_for_status(&self, tenant_id: &str, want: &str) -> Value {
        for _ in 0..200 {
            let (body, status) = self
                .get_auth(&format!("/whatsapp/status?tenant_id={tenant_id}"))
                .await;
            assert_eq!(status, StatusCode::OK, "status poll failed: {body}");
            if body["status"] == want {
                return body;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        panic!("tenant {tenant_id} never reached status {want}");
    }

    /// Drive a tenant through init + QR pairing to ready.
    pub async fn make_ready(&self, tenant_id: &str) {
        let (body, status) = self
            .post_auth("/whatsapp/init", &json!({ "tenant_id": tenant_id }))
            .await;
        assert_eq!(status, StatusCode::OK, "init failed: {body}");

        self.wait_for_status(tenant_id, "qr").await;
        self.provider
            .complete_pairing(tenant_id, &self.state.sessions.state_dir(tenant_id))
            .await;
        self.wait_for_status(tenant_id, "ready").await;
    }

    pub async fn seed_settings(&self, settings: &AutomationSettings) {
        avisa::db::settings::upsert(&self.pool, settings)
            .await
            .expect("seed settings failed");
    }

    pub async fn seed_installment(&self, row: &NotifiableInstallment) {
        avisa::db::installments::insert(&self.pool, row)
            .await
            .expect("seed installment failed");
    }
}

/// Default automation settings for tests: everything on, 3-day early
/// window, templates exercising each field.
pub fn test_settings(tenant_id: &str) -> AutomationSettings {
    AutomationSettings {
        tenant_id: tenant_id.to_string(),
        enabled: true,
        early_days: 3,
        send_due_today: true,
        send_overdue: true,
        send_early: true,
        template_due_today: "Olá {{nome}}, parcela {{parcela}} de R$ {{valor}} vence hoje.".into(),
        template_overdue:
            "Olá {{nome}}, parcela {{parcela}} está atrasada há {{dias_atraso}} dia(s).".into(),
        template_early: "Olá {{nome}}, parcela {{parcela}} vence em {{vencimento}}.".into(),
        updated_at: Utc::now(),
    }
}

pub fn test_installment(
    tenant_id: &str,
    installment_id: &str,
    due_date: NaiveDate,
    phone: &str,
) -> NotifiableInstallment {
    NotifiableInstallment {
        installment_id: installment_id.to_string(),
        tenant_id: tenant_id.to_string(),
        loan_id: format!("loan-{installment_id}"),
        client_id: format!("client-{installment_id}"),
        installment_number: 1,
        due_date,
        amount: 250.0,
        client_name: "Ana Souza".into(),
        phone: phone.to_string(),
    }
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with(Arc::new(FakeProvider::new()), Some(TEST_SECRET)).await
}

pub async fn spawn_app_with(
    provider: Arc<FakeProvider>,
    api_secret: Option<&str>,
) -> TestApp {
    let tmp = tempfile::tempdir().expect("Failed to create temp dir");

    let db_path = tmp.path().join("avisa_test.db");
    let connect_options =
        SqliteConnectOptions::from_str(&format!("sqlite://{}", db_path.display()))
            .expect("Invalid test database path")
            .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(connect_options)
        .await
        .expect("Failed to connect to test database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations on test database");

    let config = Config {
        database_url: format!("sqlite://{}", db_path.display()),
        api_secret: api_secret.map(|s| s.to_string()),
        host: "127.0.0.1".parse().unwrap(),
        port: 0, // unused, we bind to a random port
        session_root: tmp.path().join("sessions"),
        send_timeout_secs: 5,
        scheduler_interval_secs: 0,
        log_level: "warn".to_string(),
        provider: None,
    };

    let (app, state) = avisa::build_app(pool.clone(), config, provider.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind to random port");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Server failed");
    });

    let client = Client::builder().build().unwrap();

    TestApp {
        addr,
        pool,
        client,
        provider,
        state,
        _tmp: tmp,
    }
}
