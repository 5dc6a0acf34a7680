use std::net::IpAddr;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    /// Shared secret for the HTTP surface. Optional so the process can
    /// start without it; protected endpoints answer 500 until it is set.
    pub api_secret: Option<String>,
    pub host: IpAddr,
    pub port: u16,
    /// Root directory for per-tenant provider auth state.
    pub session_root: PathBuf,
    pub send_timeout_secs: u64,
    /// 0 disables the in-process scheduler loop (external cadence assumed).
    pub scheduler_interval_secs: u64,
    pub log_level: String,
    pub provider: Option<ProviderConfig>,
}

#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub base_url: String,
    pub token: String,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let database_url = env_or("AVISA_DATABASE_URL", "sqlite://avisa.db?mode=rwc");

        let api_secret = std::env::var("AVISA_API_SECRET")
            .ok()
            .filter(|s| !s.is_empty());

        let host: IpAddr = env_or("AVISA_HOST", "0.0.0.0")
            .parse()
            .map_err(|e| format!("Invalid AVISA_HOST: {e}"))?;

        let port: u16 = env_or("AVISA_PORT", "3000")
            .parse()
            .map_err(|e| format!("Invalid AVISA_PORT: {e}"))?;

        let session_root = PathBuf::from(env_or("AVISA_SESSION_ROOT", "./sessions"));

        let send_timeout_secs: u64 = env_or("AVISA_SEND_TIMEOUT_SECS", "120")
            .parse()
            .map_err(|e| format!("Invalid AVISA_SEND_TIMEOUT_SECS: {e}"))?;

        let scheduler_interval_secs: u64 = env_or("AVISA_SCHEDULER_INTERVAL_SECS", "0")
            .parse()
            .map_err(|e| format!("Invalid AVISA_SCHEDULER_INTERVAL_SECS: {e}"))?;

        let log_level = env_or("AVISA_LOG_LEVEL", "info");

        let provider = match (
            std::env::var("AVISA_PROVIDER_URL").ok(),
            std::env::var("AVISA_PROVIDER_TOKEN").ok(),
        ) {
            (Some(base_url), Some(token)) => Some(ProviderConfig { base_url, token }),
            _ => None,
        };

        Ok(Config {
            database_url,
            api_secret,
            host,
            port,
            session_root,
            send_timeout_secs,
            scheduler_interval_secs,
            log_level,
            provider,
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
