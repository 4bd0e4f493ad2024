//! Configuration management.
//!
//! Settings come from a TOML file, then environment variables, then CLI
//! flags. The file is looked up at `--config`, `PIIGUARD_CONFIG_PATH`, or
//! `<config_dir>/piiguard/config.toml`.
//!
//! ```toml
//! threshold = 0.7
//! strict_recognizer = false
//!
//! [policy]
//! EMAIL = "<email>"
//!
//! [recognizer]
//! endpoint = "https://api-inference.example.com/models/dslim/bert-base-NER"
//! timeout_ms = 10000
//!
//! [recognizer.labels]
//! DATE = "DATE"
//!
//! [recognizer.bulkhead]
//! max_concurrent = 1
//!
//! [server]
//! port = 8000
//! cors_origins = ["http://localhost:3000"]
//!
//! [logging]
//! level = "debug"
//! format = "json"
//! ```

use crate::models::{PiiCategory, RedactionPolicy};
use crate::pipeline::{PiiPipeline, PipelineConfig, validate_threshold};
use crate::recognizer::{
    BulkheadClassifier, DEFAULT_THRESHOLD, EntityRecognizer, HttpClassifierConfig,
    HttpTokenClassifier, LabelMap, NoopClassifier, RecognizerBulkheadConfig, TokenClassifier,
};
use crate::{Error, Result};
use secrecy::SecretString;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Environment variable naming an explicit config file.
pub const CONFIG_PATH_ENV: &str = "PIIGUARD_CONFIG_PATH";

/// Main configuration for piiguard.
#[derive(Debug, Clone, Serialize)]
pub struct PiiguardConfig {
    /// Minimum recognizer confidence.
    pub threshold: f64,
    /// Fail requests when the recognizer fails.
    pub strict_recognizer: bool,
    /// Placeholder overrides keyed by category name.
    pub policy: BTreeMap<String, String>,
    /// Recognizer settings.
    pub recognizer: RecognizerSettings,
    /// HTTP server settings.
    pub server: ServerSettings,
    /// Logging settings.
    pub logging: LoggingSettings,
}

/// Recognizer settings.
#[derive(Debug, Clone, Serialize)]
pub struct RecognizerSettings {
    /// Token-classification endpoint; pattern-only when unset.
    pub endpoint: Option<String>,
    /// Bearer token for the endpoint.
    #[serde(serialize_with = "serialize_secret")]
    pub token: Option<SecretString>,
    /// Request timeout in milliseconds.
    pub timeout_ms: u64,
    /// Connect timeout in milliseconds.
    pub connect_timeout_ms: u64,
    /// Extra recognizer tag mappings (tag -> category).
    pub labels: BTreeMap<String, String>,
    /// Concurrency limit around the classifier.
    pub bulkhead: RecognizerBulkheadConfig,
}

impl Default for RecognizerSettings {
    fn default() -> Self {
        Self {
            endpoint: None,
            token: None,
            timeout_ms: HttpClassifierConfig::DEFAULT_TIMEOUT_MS,
            connect_timeout_ms: HttpClassifierConfig::DEFAULT_CONNECT_TIMEOUT_MS,
            labels: BTreeMap::new(),
            bulkhead: RecognizerBulkheadConfig::default(),
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerSettings {
    /// Bind address.
    pub host: String,
    /// Listen port.
    pub port: u16,
    /// Allowed CORS origins; empty allows any origin.
    pub cors_origins: Vec<String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            cors_origins: Vec::new(),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Filter directive, e.g. `info` or `piiguard=debug`.
    pub level: Option<String>,
    /// `pretty` or `json`.
    pub format: Option<String>,
    /// Log file; stderr when unset.
    pub file: Option<PathBuf>,
}

/// Configuration file structure (for TOML parsing).
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    /// Recognizer threshold.
    pub threshold: Option<f64>,
    /// Strict recognizer mode.
    pub strict_recognizer: Option<bool>,
    /// Placeholder overrides.
    pub policy: Option<BTreeMap<String, String>>,
    /// Recognizer section.
    pub recognizer: Option<ConfigFileRecognizer>,
    /// Server section.
    pub server: Option<ConfigFileServer>,
    /// Logging section.
    pub logging: Option<LoggingSettings>,
}

/// Recognizer section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileRecognizer {
    /// Endpoint URL.
    pub endpoint: Option<String>,
    /// Bearer token.
    pub token: Option<String>,
    /// Request timeout.
    pub timeout_ms: Option<u64>,
    /// Connect timeout.
    pub connect_timeout_ms: Option<u64>,
    /// Extra tag mappings.
    pub labels: Option<BTreeMap<String, String>>,
    /// Bulkhead settings.
    pub bulkhead: Option<ConfigFileBulkhead>,
}

/// Bulkhead section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileBulkhead {
    /// Max concurrent classifications.
    pub max_concurrent: Option<usize>,
    /// Permit timeout.
    pub acquire_timeout_ms: Option<u64>,
    /// Fail when full.
    pub fail_fast: Option<bool>,
}

/// Server section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileServer {
    /// Bind address.
    pub host: Option<String>,
    /// Listen port.
    pub port: Option<u16>,
    /// Allowed CORS origins.
    pub cors_origins: Option<Vec<String>>,
}

impl Default for PiiguardConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            strict_recognizer: false,
            policy: BTreeMap::new(),
            recognizer: RecognizerSettings::default(),
            server: ServerSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

impl PiiguardConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::OperationFailed {
            operation: "read_config_file".to_string(),
            cause: format!("{}: {e}", path.display()),
        })?;

        let file: ConfigFile = toml::from_str(&contents).map_err(|e| Error::OperationFailed {
            operation: "parse_config_file".to_string(),
            cause: e.to_string(),
        })?;

        Ok(Self::from_config_file(file))
    }

    /// Returns `<config_dir>/piiguard/config.toml`.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        directories::BaseDirs::new()
            .map(|dirs| dirs.config_dir().join("piiguard").join("config.toml"))
    }

    /// Loads configuration from the default location, or defaults when no
    /// file exists there.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file exists but cannot be read or parsed.
    pub fn load_default() -> Result<Self> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::load_from_file(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Loads the effective configuration: the explicit file, else
    /// `PIIGUARD_CONFIG_PATH`, else the default location, followed by
    /// environment overrides and validation.
    ///
    /// # Errors
    ///
    /// Returns an error if the chosen file cannot be loaded or the result is
    /// invalid.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let env_path = std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from);
        let config = match explicit.map(Path::to_path_buf).or(env_path) {
            Some(path) => {
                tracing::debug!(path = %path.display(), "Loading config file");
                Self::load_from_file(&path)?
            },
            None => Self::load_default()?,
        };

        let config = config.with_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Converts a `ConfigFile` to `PiiguardConfig`.
    fn from_config_file(file: ConfigFile) -> Self {
        let mut config = Self::default();

        if let Some(threshold) = file.threshold {
            config.threshold = threshold;
        }
        if let Some(strict) = file.strict_recognizer {
            config.strict_recognizer = strict;
        }
        if let Some(policy) = file.policy {
            config.policy = policy;
        }
        if let Some(logging) = file.logging {
            config.logging = logging;
        }

        if let Some(recognizer) = file.recognizer {
            let settings = &mut config.recognizer;
            settings.endpoint = recognizer.endpoint.filter(|e| !e.trim().is_empty());
            settings.token = recognizer.token.map(SecretString::from);
            if let Some(timeout) = recognizer.timeout_ms {
                settings.timeout_ms = timeout;
            }
            if let Some(timeout) = recognizer.connect_timeout_ms {
                settings.connect_timeout_ms = timeout;
            }
            if let Some(labels) = recognizer.labels {
                settings.labels = labels;
            }
            if let Some(bulkhead) = recognizer.bulkhead {
                if let Some(max) = bulkhead.max_concurrent {
                    settings.bulkhead.max_concurrent = max.max(1);
                }
                if let Some(timeout) = bulkhead.acquire_timeout_ms {
                    settings.bulkhead.acquire_timeout_ms = timeout;
                }
                if let Some(fail_fast) = bulkhead.fail_fast {
                    settings.bulkhead.fail_fast = fail_fast;
                }
            }
        }

        if let Some(server) = file.server {
            if let Some(host) = server.host {
                config.server.host = host;
            }
            if let Some(port) = server.port {
                config.server.port = port;
            }
            if let Some(origins) = server.cors_origins {
                config.server.cors_origins = origins;
            }
        }

        config
    }

    /// Applies environment variable overrides.
    ///
    /// | Variable | Description |
    /// |----------|-------------|
    /// | `PIIGUARD_THRESHOLD` | Recognizer threshold |
    /// | `PIIGUARD_STRICT` | Strict recognizer mode |
    /// | `PIIGUARD_RECOGNIZER_ENDPOINT` | Classifier endpoint |
    /// | `PIIGUARD_RECOGNIZER_TOKEN` | Classifier bearer token |
    /// | `PIIGUARD_RECOGNIZER_MAX_CONCURRENT` | Recognizer slots |
    /// | `PIIGUARD_RECOGNIZER_ACQUIRE_TIMEOUT_MS` | Slot wait, 0 waits without limit |
    /// | `PIIGUARD_RECOGNIZER_FAIL_FAST` | Reject when every slot is busy |
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Applies overrides from a variable lookup.
    #[must_use]
    pub fn with_overrides_from<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("PIIGUARD_THRESHOLD") {
            match v.trim().parse::<f64>() {
                Ok(threshold) => self.threshold = threshold,
                Err(_) => tracing::warn!(value = %v, "Ignoring unparsable PIIGUARD_THRESHOLD"),
            }
        }
        if let Some(v) = lookup("PIIGUARD_STRICT") {
            self.strict_recognizer = v.eq_ignore_ascii_case("true") || v == "1";
        }
        if let Some(v) = lookup("PIIGUARD_RECOGNIZER_ENDPOINT") {
            self.recognizer.endpoint = Some(v).filter(|e| !e.trim().is_empty());
        }
        if let Some(v) = lookup("PIIGUARD_RECOGNIZER_TOKEN") {
            self.recognizer.token = Some(SecretString::from(v));
        }
        let bulkhead = &mut self.recognizer.bulkhead;
        if let Some(v) = lookup("PIIGUARD_RECOGNIZER_MAX_CONCURRENT") {
            match v.trim().parse::<usize>() {
                Ok(max) => bulkhead.max_concurrent = max.max(1),
                Err(_) => tracing::warn!(
                    value = %v,
                    "Ignoring unparsable PIIGUARD_RECOGNIZER_MAX_CONCURRENT"
                ),
            }
        }
        if let Some(v) = lookup("PIIGUARD_RECOGNIZER_ACQUIRE_TIMEOUT_MS") {
            match v.trim().parse::<u64>() {
                Ok(timeout) => bulkhead.acquire_timeout_ms = timeout,
                Err(_) => tracing::warn!(
                    value = %v,
                    "Ignoring unparsable PIIGUARD_RECOGNIZER_ACQUIRE_TIMEOUT_MS"
                ),
            }
        }
        if let Some(v) = lookup("PIIGUARD_RECOGNIZER_FAIL_FAST") {
            bulkhead.fail_fast = v.eq_ignore_ascii_case("true") || v == "1";
        }
        self
    }

    /// Sets the recognizer threshold.
    #[must_use]
    pub const fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Checks the threshold and policy overrides.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        validate_threshold(self.threshold)?;
        if self.policy.keys().any(|k| k.trim().is_empty()) {
            return Err(Error::InvalidInput(
                "policy override has an empty category".to_string(),
            ));
        }
        if self.recognizer.labels.iter().any(|(tag, category)| {
            tag.trim().is_empty() || category.trim().is_empty()
        }) {
            return Err(Error::InvalidInput(
                "recognizer label mapping must name both tag and category".to_string(),
            ));
        }
        Ok(())
    }

    /// Returns the redaction policy with configured overrides applied.
    #[must_use]
    pub fn redaction_policy(&self) -> RedactionPolicy {
        RedactionPolicy::default().with_overrides(
            self.policy
                .iter()
                .map(|(category, placeholder)| (PiiCategory::custom(category), placeholder.clone())),
        )
    }

    /// Returns the pipeline settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn pipeline_config(&self) -> Result<PipelineConfig> {
        self.validate()?;
        Ok(PipelineConfig::default()
            .with_threshold(self.threshold)
            .with_policy(self.redaction_policy())
            .with_strict_recognizer(self.strict_recognizer))
    }

    /// Returns the configured recognizer label map.
    #[must_use]
    pub fn label_map(&self) -> LabelMap {
        self.recognizer
            .labels
            .iter()
            .fold(LabelMap::new(), |map, (tag, category)| {
                map.with_mapping(tag, PiiCategory::custom(category))
            })
    }

    /// Builds the pipeline described by this configuration.
    ///
    /// Uses the HTTP classifier behind a bulkhead when an endpoint is set,
    /// otherwise a classifier that finds nothing.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the HTTP client
    /// cannot be built.
    pub fn build_pipeline(&self) -> Result<PiiPipeline> {
        let classifier: Arc<dyn TokenClassifier> = match &self.recognizer.endpoint {
            Some(endpoint) => {
                let mut http = HttpClassifierConfig::new(endpoint.clone()).with_timeouts(
                    self.recognizer.timeout_ms,
                    self.recognizer.connect_timeout_ms,
                );
                if let Some(token) = &self.recognizer.token {
                    http = http.with_token(token.clone());
                }
                let inner = HttpTokenClassifier::new(http)?;
                tracing::info!(endpoint = %inner.endpoint(), "Using remote entity recognizer");
                Arc::new(BulkheadClassifier::new(
                    inner,
                    self.recognizer.bulkhead.clone(),
                ))
            },
            None => {
                tracing::info!("No recognizer endpoint configured, using patterns only");
                Arc::new(NoopClassifier)
            },
        };

        let recognizer = EntityRecognizer::new(classifier).with_label_map(self.label_map());
        Ok(PiiPipeline::new(self.pipeline_config()?).with_recognizer(recognizer))
    }

    /// Renders the configuration as TOML with secrets masked.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::OperationFailed {
            operation: "serialize_config".to_string(),
            cause: e.to_string(),
        })
    }
}

#[allow(clippy::ref_option)]
fn serialize_secret<S>(secret: &Option<SecretString>, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match secret {
        Some(_) => serializer.serialize_some("********"),
        None => serializer.serialize_none(),
    }
}
