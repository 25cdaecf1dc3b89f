//! Environment-driven configuration, read once at startup.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use cortex_dice::application::cascade::CascadeTiming;
use cortex_generation::{DEFAULT_BASE_URL, ModelFallback};
use cortex_narrative::application::pipeline::AgentSettings;

use crate::error::AppError;

const DEFAULT_OPERATOR_MODEL: &str = "grok-4-1-fast-non-reasoning";
const DEFAULT_NARRATOR_MODEL: &str = "grok-4-1-fast-reasoning";

/// Server configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    /// May be blank here; the generation backend rejects it at startup.
    pub generation_api_key: String,
    pub generation_base_url: String,
    pub operator_model: String,
    pub narrator_model: String,
    /// Alternates tried, in order, by the summarizer's fallback chain.
    pub fallback_models: Vec<String>,
    pub generation_timeout: Duration,
    /// YAML content pack replacing the database content tables.
    pub content_pack: Option<PathBuf>,
    pub dice_timing: CascadeTiming,
    pub otlp_endpoint: Option<String>,
}

fn parsed<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, AppError>
where
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| AppError::Config(format!("{key} is invalid: {e}"))),
        None => Ok(default),
    }
}

fn millis(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: Duration,
) -> Result<Duration, AppError> {
    let default_ms = u64::try_from(default.as_millis()).unwrap_or(u64::MAX);
    parsed(lookup, key, default_ms).map(Duration::from_millis)
}

impl AppConfig {
    /// Reads the process environment.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if `DATABASE_URL` is missing or a value
    /// cannot be parsed.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads configuration through `lookup`. Empty values count as unset.
    ///
    /// # Errors
    ///
    /// Same as [`AppConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let lookup = move |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let string = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_owned());

        let database_url = lookup("DATABASE_URL").ok_or_else(|| {
            AppError::Config("DATABASE_URL environment variable must be set".into())
        })?;
        let defaults = CascadeTiming::default();

        Ok(Self {
            database_url,
            host: string("HOST", "0.0.0.0"),
            port: parsed(&lookup, "PORT", 3000)?,
            generation_api_key: string("GENERATION_API_KEY", ""),
            generation_base_url: string("GENERATION_BASE_URL", DEFAULT_BASE_URL),
            operator_model: string("OPERATOR_MODEL", DEFAULT_OPERATOR_MODEL),
            narrator_model: string("NARRATOR_MODEL", DEFAULT_NARRATOR_MODEL),
            fallback_models: lookup("FALLBACK_MODELS")
                .map(|raw| {
                    raw.split(',')
                        .map(str::trim)
                        .filter(|m| !m.is_empty())
                        .map(str::to_owned)
                        .collect()
                })
                .unwrap_or_default(),
            generation_timeout: Duration::from_secs(parsed(
                &lookup,
                "GENERATION_TIMEOUT_SECS",
                60,
            )?),
            content_pack: lookup("CONTENT_PACK").map(PathBuf::from),
            dice_timing: CascadeTiming {
                initial_settle: millis(&lookup, "DICE_INITIAL_SETTLE_MS", defaults.initial_settle)?,
                companion_settle: millis(
                    &lookup,
                    "DICE_COMPANION_SETTLE_MS",
                    defaults.companion_settle,
                )?,
                reveal: millis(&lookup, "DICE_REVEAL_MS", defaults.reveal)?,
            },
            otlp_endpoint: lookup("OTEL_EXPORTER_OTLP_ENDPOINT"),
        })
    }

    /// Agent models and time budget. The operator model also serves the
    /// summarizer; `summary_timeout` is the budget of `summarizer`'s whole
    /// fallback chain.
    #[must_use]
    pub fn agent_settings(&self, summarizer: &ModelFallback) -> AgentSettings {
        AgentSettings {
            operator_model: self.operator_model.clone(),
            narrator_model: self.narrator_model.clone(),
            summarizer_model: self.operator_model.clone(),
            generation_timeout: self.generation_timeout,
            summary_timeout: summarizer.time_budget(&self.operator_model),
        }
    }

    /// Bind address.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if `HOST:PORT` is not a socket address.
    pub fn socket_addr(&self) -> Result<SocketAddr, AppError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| AppError::Config(format!("invalid HOST:PORT combination: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use cortex_test_support::FailingBackend;

    use super::*;

    fn config(pairs: &[(&str, &str)]) -> Result<AppConfig, AppError> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        AppConfig::from_lookup(move |key| env.get(key).cloned())
    }

    #[test]
    fn test_defaults_apply_when_only_database_url_is_set() {
        let config = config(&[("DATABASE_URL", "postgres://localhost/cortex")]).unwrap();

        assert_eq!(config.port, 3000);
        assert_eq!(config.generation_base_url, "https://api.x.ai/v1");
        assert_eq!(config.operator_model, "grok-4-1-fast-non-reasoning");
        assert_eq!(config.generation_timeout, Duration::from_secs(60));
        assert_eq!(config.dice_timing, CascadeTiming::default());
        assert!(config.fallback_models.is_empty());
        assert!(config.content_pack.is_none());
        assert_eq!(config.socket_addr().unwrap().to_string(), "0.0.0.0:3000");
    }

    #[test]
    fn test_missing_database_url_is_a_config_error() {
        let err = config(&[]).unwrap_err();

        match err {
            AppError::Config(msg) => assert!(msg.contains("DATABASE_URL")),
            other => panic!("expected Config, got {other:?}"),
        }
    }

    #[test]
    fn test_fallback_models_are_split_and_trimmed() {
        let config = config(&[
            ("DATABASE_URL", "postgres://localhost/cortex"),
            ("FALLBACK_MODELS", " grok-3-mini , ,grok-2 "),
        ])
        .unwrap();

        assert_eq!(config.fallback_models, vec!["grok-3-mini", "grok-2"]);
    }

    #[test]
    fn test_dice_timing_overrides() {
        let config = config(&[
            ("DATABASE_URL", "postgres://localhost/cortex"),
            ("DICE_INITIAL_SETTLE_MS", "10"),
            ("DICE_REVEAL_MS", "0"),
        ])
        .unwrap();

        assert_eq!(config.dice_timing.initial_settle, Duration::from_millis(10));
        assert_eq!(config.dice_timing.companion_settle, Duration::from_millis(3000));
        assert_eq!(config.dice_timing.reveal, Duration::ZERO);
    }

    #[test]
    fn test_invalid_port_is_rejected() {
        let err = config(&[
            ("DATABASE_URL", "postgres://localhost/cortex"),
            ("PORT", "eighty"),
        ])
        .unwrap_err();

        assert!(matches!(err, AppError::Config(msg) if msg.starts_with("PORT is invalid")));
    }

    #[test]
    fn test_summarizer_shares_operator_model_and_gets_chain_budget() {
        let config = config(&[
            ("DATABASE_URL", "postgres://localhost/cortex"),
            ("OPERATOR_MODEL", "small"),
            ("FALLBACK_MODELS", "backup"),
            ("GENERATION_TIMEOUT_SECS", "30"),
        ])
        .unwrap();
        let summarizer = ModelFallback::new(
            Arc::new(FailingBackend::default()),
            config.fallback_models.clone(),
            config.generation_timeout,
        );

        let settings = config.agent_settings(&summarizer);

        assert_eq!(settings.summarizer_model, "small");
        assert_eq!(settings.generation_timeout, Duration::from_secs(30));
        assert_eq!(settings.summary_timeout, Duration::from_secs(60));
    }
}
