//! Server configuration

use std::env;
use std::str::FromStr;

const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8080";
const DEFAULT_RATE_LIMIT_RPS: u32 = 100;
const DEFAULT_MAX_PAGE_SIZE: usize = 1000;

/// Server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Postgres connection string; `None` selects the in-memory store
    pub database_url: Option<String>,
    pub bind_address: String,
    /// Required `X-API-Key` value; `None` disables authentication
    pub api_key: Option<String>,
    pub cors_origins: Vec<String>,
    pub rate_limit_rps: u32,
    /// Absolute base used in Bundle links; derived from `Host` when unset
    pub base_url: Option<String>,
    pub max_page_size: usize,
    pub seed_test_patients: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: None,
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
            api_key: None,
            cors_origins: vec!["*".to_string()],
            rate_limit_rps: DEFAULT_RATE_LIMIT_RPS,
            base_url: None,
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
            seed_test_patients: false,
        }
    }
}

fn non_empty(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Parse a variable, falling back to `default` when unset or malformed
fn parsed<T: FromStr>(key: &str, default: T) -> T {
    match non_empty(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, "Ignoring malformed configuration value");
            default
        }),
        None => default,
    }
}

fn flag(key: &str) -> Option<bool> {
    non_empty(key).map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let database_url = non_empty("DATABASE_URL");
        // Reference patients are loaded into an empty in-memory store unless disabled
        let seed_test_patients = flag("SEED_TEST_PATIENTS").unwrap_or(database_url.is_none());

        Self {
            database_url,
            bind_address: non_empty("BIND_ADDRESS").unwrap_or_else(|| DEFAULT_BIND_ADDRESS.into()),
            api_key: non_empty("API_KEY"),
            cors_origins: non_empty("CORS_ORIGINS")
                .map(|v| {
                    v.split(',')
                        .map(|o| o.trim().to_string())
                        .filter(|o| !o.is_empty())
                        .collect()
                })
                .unwrap_or_else(|| vec!["*".to_string()]),
            rate_limit_rps: parsed("RATE_LIMIT_RPS", DEFAULT_RATE_LIMIT_RPS).max(1),
            base_url: non_empty("FHIR_BASE_URL").map(|u| u.trim_end_matches('/').to_string()),
            max_page_size: parsed("MAX_PAGE_SIZE", DEFAULT_MAX_PAGE_SIZE).max(1),
            seed_test_patients,
        }
    }
}
