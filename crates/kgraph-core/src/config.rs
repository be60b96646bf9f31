//! KGraph Configuration Management
//!
//! Handles configuration from environment variables and TOML files
//! with sensible defaults for local development.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Graph database connection
    pub database: DatabaseConfig,

    /// Linguistic annotation service
    pub annotator: AnnotatorConfig,

    /// Entity and relation extraction
    pub extraction: ExtractionConfig,

    /// Graph ingestion
    pub ingest: IngestConfig,

    /// Duplicate clustering and merging
    pub dedup: DedupConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_env_override()
    }

    /// Load from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::FileReadError {
            path: path.clone(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path,
            message: e.to_string(),
        })
    }

    /// Apply environment variables on top of the current values (env takes precedence)
    pub fn with_env_override(mut self) -> Result<Self, ConfigError> {
        // SurrealDB
        if let Ok(url) = std::env::var("SURREALDB_URL") {
            self.database.surrealdb_url = url;
        }
        if let Ok(user) = std::env::var("SURREALDB_USER") {
            self.database.surrealdb_user = user;
        }
        if let Ok(pass) = std::env::var("SURREALDB_PASS") {
            self.database.surrealdb_pass = pass;
        }
        if let Ok(ns) = std::env::var("SURREALDB_NAMESPACE") {
            self.database.surrealdb_namespace = ns;
        }
        if let Ok(db) = std::env::var("SURREALDB_DATABASE") {
            self.database.surrealdb_database = db;
        }

        // Annotator
        if let Ok(url) = std::env::var("KGRAPH_ANNOTATOR_URL") {
            self.annotator.url = url;
        }

        // Extraction / ingestion / dedup
        if let Some(batch_size) = parse_env("KGRAPH_BATCH_SIZE")? {
            self.ingest.batch_size = batch_size;
        }
        if let Some(threshold) = parse_env("KGRAPH_SIMILARITY_THRESHOLD")? {
            self.dedup.similarity_threshold = threshold;
        }
        if let Some(max_records) = parse_env("KGRAPH_MAX_RECORDS")? {
            self.extraction.max_records = Some(max_records);
        }
        if let Ok(labels) = std::env::var("KGRAPH_DEDUP_LABELS") {
            self.dedup.labels = labels
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        // Logging
        if let Ok(level) = std::env::var("LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(json) = parse_env("KGRAPH_LOG_JSON")? {
            self.logging.json_format = json;
        }

        Ok(self)
    }

    /// Check value ranges that serde cannot express
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.dedup.similarity_threshold > 100 {
            return Err(ConfigError::InvalidValue {
                key: "dedup.similarity_threshold".to_string(),
                value: self.dedup.similarity_threshold.to_string(),
            });
        }
        if self.ingest.batch_size == 0 {
            return Err(ConfigError::InvalidValue {
                key: "ingest.batch_size".to_string(),
                value: "0".to_string(),
            });
        }
        if self.extraction.concurrency == 0 {
            return Err(ConfigError::InvalidValue {
                key: "extraction.concurrency".to_string(),
                value: "0".to_string(),
            });
        }
        if self.dedup.labels.is_empty() {
            return Err(ConfigError::MissingRequired("dedup.labels".to_string()));
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    match std::env::var(key) {
        Ok(value) => value
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                key: key.to_string(),
                value,
            }),
        Err(_) => Ok(None),
    }
}

/// Database connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SurrealDB WebSocket URL
    pub surrealdb_url: String,

    /// SurrealDB username
    pub surrealdb_user: String,

    /// SurrealDB password
    pub surrealdb_pass: String,

    /// SurrealDB namespace
    pub surrealdb_namespace: String,

    /// SurrealDB database name
    pub surrealdb_database: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            surrealdb_url: "ws://localhost:8000".to_string(),
            surrealdb_user: "root".to_string(),
            surrealdb_pass: "root".to_string(),
            surrealdb_namespace: "kgraph".to_string(),
            surrealdb_database: "knowledge".to_string(),
        }
    }
}

/// Annotation service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnotatorConfig {
    /// Endpoint accepting `{"text": ...}` and returning a parse
    pub url: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Only this many leading characters of a document are parsed
    pub max_chars: usize,
}

impl Default for AnnotatorConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8081/parse".to_string(),
            timeout_secs: 30,
            max_chars: 3000,
        }
    }
}

/// Extraction pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Candidate triples scoring below this are dropped
    pub min_score: u8,

    /// Records whose text is not longer than this (in chars) are skipped
    pub min_text_length: usize,

    /// Stop reading input after this many lines
    pub max_records: Option<usize>,

    /// Documents annotated concurrently
    pub concurrency: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            min_score: 5,
            min_text_length: 100,
            max_records: Some(1000),
            concurrency: 4,
        }
    }
}

/// Graph ingestion configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Triples written per transaction
    pub batch_size: usize,

    /// Label (table) of entity nodes
    pub node_label: String,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            batch_size: 50,
            node_label: "Entity".to_string(),
        }
    }
}

/// Duplicate clustering configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DedupConfig {
    /// Names scoring strictly above this (0-100) are clustered
    pub similarity_threshold: u8,

    /// Node labels to deduplicate
    pub labels: Vec<String>,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 90,
            labels: vec!["Entity".to_string()],
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// JSON lines instead of human-readable output
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}
