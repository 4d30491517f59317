use crate::adapters::credentials::ServiceAccount;
use crate::domain::ApiVersion;
use crate::error::{FcmError, Result};
use crate::services::ConnectionParams;
use clap::{Args, Parser, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone, Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Config {
    #[command(flatten)]
    pub fcm: FcmConfig,

    #[command(flatten)]
    pub telemetry: TelemetryConfig,
}

#[derive(Clone, Debug, Args)]
pub struct FcmConfig {
    /// FCM protocol to speak (legacy or v1)
    #[arg(long, env = "FCM_API_VERSION", default_value = "v1")]
    pub api_version: ApiVersion,

    /// Legacy API server key
    #[arg(long, env = "FCM_SERVER_KEY", hide_env_values = true)]
    pub server_key: Option<String>,

    /// Legacy API sender id
    #[arg(long, env = "FCM_SENDER_ID")]
    pub sender_id: Option<String>,

    /// Path to the service-account JSON used by the v1 API
    #[arg(long, env = "FCM_SERVICE_ACCOUNT")]
    pub service_account: Option<PathBuf>,

    /// Timeout for every HTTP call, token exchange included
    #[arg(long, env = "FCM_TIMEOUT_SECS", default_value_t = 10)]
    pub timeout_secs: u64,
}

#[derive(Clone, Debug, Default, Args)]
pub struct TelemetryConfig {
    /// Log output format
    #[arg(long, env = "FCM_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// OTLP collector base URL; traces and metrics are exported only when set
    #[arg(long, env = "FCM_OTLP_ENDPOINT")]
    pub otlp_endpoint: Option<String>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl Config {
    #[must_use]
    pub fn load() -> Self {
        Self::parse()
    }
}

impl FcmConfig {
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Connection parameters for the configured API version.
    ///
    /// # Errors
    /// Returns `FcmError::Configuration` when a field the chosen version needs is missing,
    /// or the service-account file cannot be loaded.
    pub fn connection_params(&self) -> Result<ConnectionParams> {
        match self.api_version {
            ApiVersion::Legacy => {
                let server_key = non_empty(self.server_key.as_deref(), "server key")?;
                let sender_id = non_empty(self.sender_id.as_deref(), "sender id")?;
                Ok(ConnectionParams::Legacy { server_key, sender_id })
            }
            ApiVersion::V1 => {
                let path = self.service_account.as_ref().ok_or_else(|| {
                    FcmError::Configuration("the v1 api requires a service-account file".into())
                })?;
                let http = reqwest::Client::builder()
                    .timeout(self.timeout())
                    .build()
                    .map_err(|e| FcmError::Configuration(format!("failed to build http client: {e}")))?;
                let account = ServiceAccount::from_file(path)?.with_http_client(http);
                Ok(ConnectionParams::V1 { credentials: Arc::new(account) })
            }
        }
    }
}

fn non_empty(value: Option<&str>, what: &str) -> Result<String> {
    match value {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(FcmError::Configuration(format!("the legacy api requires a {what}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Config {
        Config::try_parse_from(std::iter::once("fcm-dispatch").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = parse(&[]);
        assert_eq!(config.fcm.api_version, ApiVersion::V1);
        assert_eq!(config.fcm.timeout(), Duration::from_secs(10));
        assert_eq!(config.telemetry.log_format, LogFormat::Text);
        assert!(config.telemetry.otlp_endpoint.is_none());
    }

    #[test]
    fn test_legacy_requires_key_and_sender() {
        let config = parse(&["--api-version", "legacy", "--server-key", "k"]);
        assert!(matches!(config.fcm.connection_params(), Err(FcmError::Configuration(_))));

        let config = parse(&["--api-version", "legacy", "--server-key", "k", "--sender-id", "42"]);
        let params = config.fcm.connection_params().unwrap();
        assert_eq!(params.api_version(), ApiVersion::Legacy);
    }

    #[test]
    fn test_v1_requires_service_account() {
        let config = parse(&["--api-version", "v1"]);
        assert!(matches!(config.fcm.connection_params(), Err(FcmError::Configuration(_))));
    }

    #[test]
    fn test_v1_loads_service_account_file() {
        let fixture = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/service_account.json");
        let config = parse(&["--service-account", fixture]);
        let ConnectionParams::V1 { credentials } = config.fcm.connection_params().unwrap() else {
            panic!("expected v1 params");
        };
        assert_eq!(credentials.project_id().unwrap(), "demo-project");
    }

    #[test]
    fn test_unknown_api_version_is_rejected() {
        let result = Config::try_parse_from(["fcm-dispatch", "--api-version", "v2"]);
        assert!(result.is_err());
    }
}
