//! Extraction pipeline
//!
//! Runs annotate → entity filter → relation extraction over a batch of
//! records. Documents are processed concurrently but results keep input
//! order. A document whose annotation fails is skipped and counted; the
//! rest of the batch proceeds.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use futures::stream::{self, StreamExt};

use crate::annotator::Annotator;
use crate::entity::EntityFilter;
use crate::relation::RuleBasedRe;
use crate::RelationExtractor;
use kgraph_core::{EntityMention, Record, RelationType, Result, Triple, TripleMetadata};

const DEFAULT_MAX_CHARS: usize = 3000;
const PROGRESS_EVERY: usize = 50;

/// What one document yielded
#[derive(Debug, Clone, Default)]
pub struct DocumentExtraction {
    pub entities: Vec<EntityMention>,
    pub triples: Vec<Triple>,
}

impl DocumentExtraction {
    /// Per-triple metadata carrying the record provenance and entity labels
    pub fn metadata(&self, record: &Record) -> Vec<TripleMetadata> {
        let labels: HashMap<String, String> = self
            .entities
            .iter()
            .map(|e| (e.text.to_lowercase(), e.label.to_string()))
            .collect();

        self.triples
            .iter()
            .map(|t| {
                record.metadata().with_types(
                    labels.get(&t.subject.to_lowercase()).cloned(),
                    labels.get(&t.object.to_lowercase()).cloned(),
                )
            })
            .collect()
    }
}

/// Counters reported at the end of an extraction run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionStats {
    /// Records handed to the pipeline
    pub documents: usize,
    /// Records skipped because annotation or extraction failed
    pub failed_documents: usize,
    /// Records with at least two entities
    pub valid_documents: usize,
    /// Entities found in valid records
    pub entities: usize,
    /// Triples extracted
    pub relations: usize,
    /// Triples per relation type
    pub relation_counts: BTreeMap<RelationType, usize>,
}

impl ExtractionStats {
    /// Most frequent relation types, ties broken by relation order
    pub fn top_relations(&self, n: usize) -> Vec<(RelationType, usize)> {
        let mut counts: Vec<(RelationType, usize)> =
            self.relation_counts.iter().map(|(r, c)| (*r, *c)).collect();
        counts.sort_by(|a, b| b.1.cmp(&a.1));
        counts.truncate(n);
        counts
    }
}

/// Triples of a whole run with their aligned metadata
#[derive(Debug, Clone, Default)]
pub struct ExtractionOutcome {
    pub triples: Vec<Triple>,
    /// `metadata[i]` describes `triples[i]`
    pub metadata: Vec<TripleMetadata>,
    pub stats: ExtractionStats,
}

/// Annotate-filter-extract pipeline
pub struct ExtractionPipeline {
    annotator: Arc<dyn Annotator>,
    filter: EntityFilter,
    extractor: Box<dyn RelationExtractor>,
    max_chars: usize,
    concurrency: usize,
}

impl ExtractionPipeline {
    /// Create a pipeline with the default filter and rule-based extractor
    pub fn new(annotator: Arc<dyn Annotator>) -> Self {
        Self {
            annotator,
            filter: EntityFilter::new(),
            extractor: Box::new(RuleBasedRe::new()),
            max_chars: DEFAULT_MAX_CHARS,
            concurrency: 1,
        }
    }

    /// Replace the relation extractor
    pub fn with_extractor(mut self, extractor: impl RelationExtractor + 'static) -> Self {
        self.extractor = Box::new(extractor);
        self
    }

    /// Replace the entity filter
    pub fn with_filter(mut self, filter: EntityFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Parse at most this many leading characters per document
    pub fn with_max_chars(mut self, max_chars: usize) -> Self {
        self.max_chars = max_chars;
        self
    }

    /// Number of documents annotated at the same time
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Extract entities and triples from a single record
    pub async fn process_document(&self, record: &Record) -> Result<DocumentExtraction> {
        let parse = self.annotator.annotate(&record.text, self.max_chars).await?;
        let entities = self.filter.filter(&parse.entities);

        if entities.len() < 2 {
            return Ok(DocumentExtraction {
                entities,
                triples: Vec::new(),
            });
        }

        let triples = self.extractor.extract(&parse, &entities)?;
        Ok(DocumentExtraction { entities, triples })
    }

    /// Extract from all records, skipping documents that fail
    pub async fn run(&self, records: &[Record]) -> ExtractionOutcome {
        let mut outcome = ExtractionOutcome::default();
        let total = records.len();

        let mut results = stream::iter(records.iter())
            .map(|record| async move { (record, self.process_document(record).await) })
            .buffered(self.concurrency);

        while let Some((record, result)) = results.next().await {
            let stats = &mut outcome.stats;
            if stats.documents % PROGRESS_EVERY == 0 {
                tracing::info!("Processing {}/{}...", stats.documents, total);
            }
            stats.documents += 1;

            let extraction = match result {
                Ok(extraction) => extraction,
                Err(e) => {
                    tracing::warn!("Skipping document {:?}: {}", record.title, e);
                    stats.failed_documents += 1;
                    continue;
                }
            };

            if extraction.entities.len() < 2 {
                continue;
            }
            stats.valid_documents += 1;
            stats.entities += extraction.entities.len();

            tracing::debug!(
                title = %record.title,
                entities = extraction.entities.len(),
                triples = extraction.triples.len(),
                "Document extracted"
            );

            for triple in &extraction.triples {
                *stats.relation_counts.entry(triple.relation).or_default() += 1;
            }
            stats.relations += extraction.triples.len();

            outcome.metadata.extend(extraction.metadata(record));
            outcome.triples.extend(extraction.triples);
        }

        tracing::info!(
            documents = outcome.stats.documents,
            valid = outcome.stats.valid_documents,
            failed = outcome.stats.failed_documents,
            entities = outcome.stats.entities,
            relations = outcome.stats.relations,
            "Extraction finished"
        );

        outcome
    }
}
