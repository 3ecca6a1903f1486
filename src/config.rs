//! Configuration types for the correlog demo server.
//!
//! Config is loaded once at startup from a TOML file and validated before the
//! server opens any ports. Invalid configs are rejected with a clear error
//! rather than silently falling back to defaults. Every field has a default,
//! so an empty file is a valid config.
//!
//! # Example
//! ```toml
//! [server]
//! port       = 8080
//! log_format = "json"
//! log_level  = "correlog=debug"
//!
//! [correlation]
//! header              = "X-Correlation-ID"
//! include_in_response = true
//! generator           = "simple"
//!
//! [request_log]
//! enabled = true
//!
//! [action_log]
//! acknowledge_errors = true
//! ```

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::correlation::{CorrelationIdConfig, IdGenerator, DEFAULT_HEADER};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub correlation: CorrelationSection,

    #[serde(default)]
    pub request_log: RequestLogSection,

    #[serde(default)]
    pub action_log: ActionLogSection,
}

impl Config {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content =
            std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        let config: Self = toml::from_str(&content).context("parsing config TOML")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        self.correlation
            .to_config()
            .build()
            .context("[correlation] section is invalid")?;

        if let Some(level) = &self.server.log_level {
            tracing_subscriber::EnvFilter::try_new(level)
                .with_context(|| format!("[server] log_level `{level}` is not a valid filter"))?;
        }

        Ok(())
    }
}

/// Listener and log output settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Port to listen on (default: 8080).
    #[serde(default = "defaults::port")]
    pub port: u16,

    /// Log line layout (default: text).
    #[serde(default)]
    pub log_format: LogFormat,

    /// Log filter override (also controlled by `RUST_LOG` env var).
    #[serde(default)]
    pub log_level: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: defaults::port(),
            log_format: LogFormat::default(),
            log_level: None,
        }
    }
}

/// How log lines are written.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable single-line text.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

/// Which built-in generator produces missing correlation ids.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GeneratorKind {
    /// Hyphenated UUID v4.
    #[default]
    Uuid,
    /// UUID v4 without dashes.
    Simple,
    /// Never generate; only propagate ids sent by the caller.
    None,
}

impl std::fmt::Display for GeneratorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Uuid => "uuid",
            Self::Simple => "simple",
            Self::None => "none",
        })
    }
}

/// `[correlation]`: maps onto [`CorrelationIdConfig`].
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CorrelationSection {
    /// Header carrying the id (default: `X-Correlation-ID`).
    #[serde(default = "defaults::header")]
    pub header: String,

    /// Echo the id on responses (default: true).
    #[serde(default = "defaults::enabled")]
    pub include_in_response: bool,

    #[serde(default)]
    pub generator: GeneratorKind,
}

impl Default for CorrelationSection {
    fn default() -> Self {
        Self {
            header: defaults::header(),
            include_in_response: defaults::enabled(),
            generator: GeneratorKind::default(),
        }
    }
}

impl CorrelationSection {
    pub fn to_config(&self) -> CorrelationIdConfig {
        let base = CorrelationIdConfig::default()
            .header(self.header.clone())
            .include_in_response(self.include_in_response);
        match self.generator {
            GeneratorKind::Uuid => base.generator(IdGenerator::uuid()),
            GeneratorKind::Simple => base.generator(IdGenerator::simple_uuid()),
            GeneratorKind::None => base.without_generator(),
        }
    }
}

/// `[request_log]`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RequestLogSection {
    /// Log every request through the middleware logger (default: true).
    #[serde(default = "defaults::enabled")]
    pub enabled: bool,
}

impl Default for RequestLogSection {
    fn default() -> Self {
        Self {
            enabled: defaults::enabled(),
        }
    }
}

/// `[action_log]`
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ActionLogSection {
    /// Turn failed actions into `200` acknowledgements that embed the error
    /// (default: false).
    #[serde(default)]
    pub acknowledge_errors: bool,
}

mod defaults {
    pub fn port() -> u16 { 8080 }
    pub fn header() -> String { super::DEFAULT_HEADER.to_owned() }
    pub fn enabled() -> bool { true }
}

#[cfg(test)]
mod tests {
    use super::*;

    // -----------------------------------------------------------------------
    // Parsing & defaults
    // -----------------------------------------------------------------------

    #[test]
    fn parse_example_config() {
        let content = include_str!("../config.example.toml");
        let config: Config = toml::from_str(content).expect("example config should parse");
        config.validate().expect("example config should be valid");
    }

    #[test]
    fn empty_file_yields_defaults() {
        let config: Config = toml::from_str("").expect("empty config should parse");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.log_format, LogFormat::Text);
        assert_eq!(config.correlation.header, "X-Correlation-ID");
        assert!(config.correlation.include_in_response);
        assert_eq!(config.correlation.generator, GeneratorKind::Uuid);
        assert!(config.request_log.enabled);
        assert!(!config.action_log.acknowledge_errors);
    }

    #[test]
    fn generator_kind_deserializes_from_snake_case() {
        let c: CorrelationSection = toml::from_str("generator = \"simple\"").unwrap();
        assert_eq!(c.generator, GeneratorKind::Simple);

        let c: CorrelationSection = toml::from_str("generator = \"none\"").unwrap();
        assert_eq!(c.generator, GeneratorKind::None);
    }

    #[test]
    fn unknown_generator_is_rejected() {
        assert!(toml::from_str::<CorrelationSection>("generator = \"ulid\"").is_err());
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    #[test]
    fn validation_rejects_bad_header_name() {
        let mut config = Config::default();
        config.correlation.header = "not a header".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validation_rejects_bad_log_filter() {
        let mut config = Config::default();
        config.server.log_level = Some("correlog=loud".into());
        assert!(config.validate().is_err());
    }

    #[test]
    fn load_reports_missing_file() {
        let err = Config::load(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(format!("{err:#}").contains("reading"));
    }

    // -----------------------------------------------------------------------
    // Mapping
    // -----------------------------------------------------------------------

    #[test]
    fn section_maps_onto_correlation_config() {
        let section = CorrelationSection {
            header: "X-Request-ID".into(),
            include_in_response: false,
            generator: GeneratorKind::None,
        };
        let config = section.to_config();
        assert_eq!(config.header, "X-Request-ID");
        assert!(!config.include_in_response);
        assert!(config.generator.is_none());
    }

    #[test]
    fn simple_generator_produces_undashed_ids() {
        let section = CorrelationSection {
            generator: GeneratorKind::Simple,
            ..CorrelationSection::default()
        };
        let id = section.to_config().generator.expect("generator").generate();
        assert_eq!(id.len(), 32);
    }
}
