//! KGraph Core - Domain models, errors, and shared types
//!
//! This crate defines the core abstractions used throughout KGraph:
//! - Input records consumed by the extraction pipeline
//! - Entity mentions and their type labels
//! - Relation vocabulary and extracted triples
//! - Persisted graph nodes and edges
//! - Common error types
//! - Configuration management

pub mod config;

pub use config::{
    AnnotatorConfig, AppConfig, ConfigError, DatabaseConfig, DedupConfig, ExtractionConfig,
    IngestConfig, LoggingConfig,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Placeholder used when a record carries no domain or title
pub const UNKNOWN: &str = "unknown";

/// Node type written when the entity label of a node is not known
pub const DEFAULT_NODE_TYPE: &str = "ENTITY";

// ============================================================================
// Error Types
// ============================================================================

/// Core error types for KGraph operations
#[derive(Error, Debug)]
pub enum KgError {
    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    #[error("Annotation failed: {0}")]
    AnnotationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Invalid label: {0}")]
    InvalidLabel(String),

    #[error("Configuration error: {0}")]
    ConfigError(#[from] ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, KgError>;

// ============================================================================
// Input Records
// ============================================================================

/// A text record produced by the corpus preparation stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Topical domain of the source article
    #[serde(default = "unknown")]
    pub domain: String,

    /// Title of the source article
    #[serde(default = "unknown")]
    pub title: String,

    /// Body text
    pub text: String,
}

fn unknown() -> String {
    UNKNOWN.to_string()
}

impl Record {
    /// Create a new record
    pub fn new(
        domain: impl Into<String>,
        title: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            domain: domain.into(),
            title: title.into(),
            text: text.into(),
        }
    }

    /// Metadata attached to every triple extracted from this record
    pub fn metadata(&self) -> TripleMetadata {
        TripleMetadata::new(&self.domain, &self.title)
    }
}

// ============================================================================
// Entities
// ============================================================================

/// Named-entity type labels emitted by the annotator
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EntityLabel {
    Person,
    Org,
    Gpe,
    Loc,
    Product,
    Event,
    Fac,
    Cardinal,
    Ordinal,
    /// Any other label (DATE, MONEY, NORP, ...)
    Other(String),
}

impl EntityLabel {
    /// Get the string representation
    pub fn as_str(&self) -> &str {
        match self {
            Self::Person => "PERSON",
            Self::Org => "ORG",
            Self::Gpe => "GPE",
            Self::Loc => "LOC",
            Self::Product => "PRODUCT",
            Self::Event => "EVENT",
            Self::Fac => "FAC",
            Self::Cardinal => "CARDINAL",
            Self::Ordinal => "ORDINAL",
            Self::Other(label) => label,
        }
    }

    /// Labels worth keeping as graph nodes
    pub fn is_important(&self) -> bool {
        matches!(
            self,
            Self::Person
                | Self::Org
                | Self::Gpe
                | Self::Loc
                | Self::Product
                | Self::Event
                | Self::Fac
        )
    }

    /// Pure number labels
    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Cardinal | Self::Ordinal)
    }
}

impl From<&str> for EntityLabel {
    fn from(label: &str) -> Self {
        match label {
            "PERSON" => Self::Person,
            "ORG" => Self::Org,
            "GPE" => Self::Gpe,
            "LOC" => Self::Loc,
            "PRODUCT" => Self::Product,
            "EVENT" => Self::Event,
            "FAC" => Self::Fac,
            "CARDINAL" => Self::Cardinal,
            "ORDINAL" => Self::Ordinal,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for EntityLabel {
    fn from(label: String) -> Self {
        Self::from(label.as_str())
    }
}

impl From<EntityLabel> for String {
    fn from(label: EntityLabel) -> Self {
        label.as_str().to_string()
    }
}

impl std::fmt::Display for EntityLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A cleaned, quality-gated entity mention within one document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityMention {
    /// Cleaned surface text (the node name once persisted)
    pub text: String,

    /// Entity type label
    pub label: EntityLabel,
}

impl EntityMention {
    pub fn new(text: impl Into<String>, label: impl Into<EntityLabel>) -> Self {
        Self {
            text: text.into(),
            label: label.into(),
        }
    }
}

// ============================================================================
// Relations and Triples
// ============================================================================

/// Relation vocabulary of the knowledge graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelationType {
    Founded,
    Owns,
    Acquired,
    WorksFor,
    Leads,
    LocatedIn,
    Teaches,
    Studies,
    Develops,
    IsA,
    /// Generic fallback
    RelatedTo,
}

impl RelationType {
    pub const ALL: [RelationType; 11] = [
        Self::Founded,
        Self::Owns,
        Self::Acquired,
        Self::WorksFor,
        Self::Leads,
        Self::LocatedIn,
        Self::Teaches,
        Self::Studies,
        Self::Develops,
        Self::IsA,
        Self::RelatedTo,
    ];

    /// Get the string representation (also the edge type in the store)
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Founded => "FOUNDED",
            Self::Owns => "OWNS",
            Self::Acquired => "ACQUIRED",
            Self::WorksFor => "WORKS_FOR",
            Self::Leads => "LEADS",
            Self::LocatedIn => "LOCATED_IN",
            Self::Teaches => "TEACHES",
            Self::Studies => "STUDIES",
            Self::Develops => "DEVELOPS",
            Self::IsA => "IS_A",
            Self::RelatedTo => "RELATED_TO",
        }
    }

    /// Parse a relation label, ignoring case
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|r| r.as_str().eq_ignore_ascii_case(s.trim()))
    }
}

impl std::fmt::Display for RelationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A (subject, relation, object) fact
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Triple {
    pub subject: String,
    pub relation: RelationType,
    pub object: String,
}

impl Triple {
    pub fn new(subject: impl Into<String>, relation: RelationType, object: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            relation,
            object: object.into(),
        }
    }

    /// Case-insensitive identity used for per-document deduplication
    pub fn dedup_key(&self) -> (String, RelationType, String) {
        (
            self.subject.to_lowercase(),
            self.relation,
            self.object.to_lowercase(),
        )
    }
}

impl std::fmt::Display for Triple {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}, {})", self.subject, self.relation, self.object)
    }
}

/// A triple together with the confidence of the rule that produced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoredTriple {
    pub triple: Triple,
    /// Rule confidence (3-9)
    pub score: u8,
}

/// Provenance of a triple, carried into the graph on ingestion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TripleMetadata {
    pub domain: String,
    pub title: String,
    /// Entity label of the subject, if known
    pub subject_type: Option<String>,
    /// Entity label of the object, if known
    pub object_type: Option<String>,
}

impl TripleMetadata {
    pub fn new(domain: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            title: title.into(),
            subject_type: None,
            object_type: None,
        }
    }

    /// Attach entity labels for subject and object
    pub fn with_types(mut self, subject_type: Option<String>, object_type: Option<String>) -> Self {
        self.subject_type = subject_type;
        self.object_type = object_type;
        self
    }
}

impl Default for TripleMetadata {
    fn default() -> Self {
        Self::new(UNKNOWN, UNKNOWN)
    }
}

// ============================================================================
// Persisted Graph Model
// ============================================================================

/// A node as stored in the graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphNode {
    /// Unique key
    pub name: String,

    /// Entity type, first writer wins
    #[serde(rename = "type")]
    pub node_type: Option<String>,

    /// Source domain, first writer wins
    pub domain: Option<String>,
}

impl GraphNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            node_type: None,
            domain: None,
        }
    }

    /// Fill unset properties from `other`, keeping existing values
    pub fn combine(&mut self, other: &GraphNode) {
        if self.node_type.is_none() {
            self.node_type = other.node_type.clone();
        }
        if self.domain.is_none() {
            self.domain = other.domain.clone();
        }
    }
}

/// A directed, relation-typed edge as stored in the graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub subject: String,
    pub relation: RelationType,
    pub object: String,

    /// Number of times the triple was ingested
    pub weight: u64,

    /// Title of the first record that produced the edge
    pub source: Option<String>,
}

// ============================================================================
// Tests
// ============================================================================
