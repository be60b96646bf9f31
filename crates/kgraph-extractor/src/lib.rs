//! KGraph Extractor - Knowledge extraction pipeline
//!
//! Turns annotated text into typed entity mentions and
//! scored (subject, relation, object) triples.

use kgraph_core::{EntityMention, Result, Triple};

pub use annotator::{truncate_chars, Annotator, HttpAnnotator};
pub use entity::EntityFilter;
pub use parse::{EntitySpan, Parse, Token};
pub use pipeline::{DocumentExtraction, ExtractionOutcome, ExtractionPipeline, ExtractionStats};
pub use relation::{RuleBasedRe, VerbLexicon};

/// Trait for relation extractors working on a dependency parse
pub trait RelationExtractor: Send + Sync {
    fn extract(&self, parse: &Parse, entities: &[EntityMention]) -> Result<Vec<Triple>>;
}

pub mod annotator;
pub mod entity;
pub mod loader;
pub mod parse;
pub mod pipeline;
pub mod relation;
