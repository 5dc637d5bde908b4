use std::env;
use std::fmt;
use std::path::PathBuf;

/// Distinguishes runtime behavior for different stages of the tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the evidence tooling.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub data_dir: PathBuf,
    pub org_id: String,
    pub platform: Option<PlatformConfig>,
    pub telemetry: TelemetryConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("GRC_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let data_dir =
            PathBuf::from(env::var("GRC_DATA_DIR").unwrap_or_else(|_| "./data".to_string()));
        let org_id = env::var("GRC_ORG_ID").unwrap_or_default();

        let platform = match env::var("GRC_PLATFORM_BASE_URL") {
            Ok(base_url) if !base_url.trim().is_empty() => {
                if org_id.trim().is_empty() {
                    return Err(ConfigError::MissingOrgId);
                }
                let token = env::var("GRC_PLATFORM_TOKEN")
                    .ok()
                    .filter(|token| !token.trim().is_empty())
                    .ok_or(ConfigError::MissingToken)?;
                Some(PlatformConfig {
                    base_url: base_url.trim().trim_end_matches('/').to_string(),
                    token,
                })
            }
            _ => None,
        };

        let log_level = env::var("GRC_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            environment,
            data_dir,
            org_id,
            platform,
            telemetry: TelemetryConfig { log_level },
        })
    }

    /// Location of the reference registry backing table under the data directory.
    pub fn registry_path(&self) -> PathBuf {
        self.data_dir.join("evidence_task_registry.csv")
    }
}

/// Connection settings for the remote GRC platform. Absent when the tool
/// runs in local-only mode.
#[derive(Debug, Clone)]
pub struct PlatformConfig {
    pub base_url: String,
    pub token: String,
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

#[derive(Debug)]
pub enum ConfigError {
    MissingOrgId,
    MissingToken,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::MissingOrgId => {
                write!(f, "GRC_ORG_ID must be set when GRC_PLATFORM_BASE_URL is configured")
            }
            ConfigError::MissingToken => {
                write!(
                    f,
                    "GRC_PLATFORM_TOKEN must be set when GRC_PLATFORM_BASE_URL is configured"
                )
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        env::remove_var("GRC_ENV");
        env::remove_var("GRC_DATA_DIR");
        env::remove_var("GRC_ORG_ID");
        env::remove_var("GRC_PLATFORM_BASE_URL");
        env::remove_var("GRC_PLATFORM_TOKEN");
        env::remove_var("GRC_LOG_LEVEL");
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.data_dir, PathBuf::from("./data"));
        assert!(config.platform.is_none());
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(
            config.registry_path(),
            PathBuf::from("./data/evidence_task_registry.csv")
        );
    }

    #[test]
    fn platform_requires_org_and_token() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("GRC_PLATFORM_BASE_URL", "https://grc.example.com/");

        match AppConfig::load() {
            Err(ConfigError::MissingOrgId) => {}
            other => panic!("expected missing org id, got {other:?}"),
        }

        env::set_var("GRC_ORG_ID", "org-42");
        match AppConfig::load() {
            Err(ConfigError::MissingToken) => {}
            other => panic!("expected missing token, got {other:?}"),
        }

        env::set_var("GRC_PLATFORM_TOKEN", "secret");
        let config = AppConfig::load().expect("config loads");
        let platform = config.platform.expect("platform configured");
        assert_eq!(platform.base_url, "https://grc.example.com");
        reset_env();
    }
}
