//! Graph ingestion
//!
//! Writes extracted triples to a [`GraphStore`] in fixed-size batches,
//! one transaction per batch. Batches committed before a failure stay
//! committed; the failure is returned to the caller.

use std::sync::Arc;

use crate::{validate_label, GraphStore, TripleWrite};
use kgraph_core::{Result, Triple, TripleMetadata};

pub const DEFAULT_BATCH_SIZE: usize = 50;
pub const DEFAULT_LABEL: &str = "Entity";

/// What an ingestion run wrote
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub triples: usize,
    pub batches: usize,
}

/// Batched triple writer
pub struct GraphIngestor {
    store: Arc<dyn GraphStore>,
    label: String,
    batch_size: usize,
}

impl GraphIngestor {
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self {
            store,
            label: DEFAULT_LABEL.to_string(),
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    /// Node label written to
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Triples per transaction
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Write triples with their aligned metadata
    ///
    /// A triple without a metadata entry gets `unknown` provenance. Lookup
    /// indexes are created afterwards; failing to create them only logs.
    pub async fn ingest(
        &self,
        triples: &[Triple],
        metadata: &[TripleMetadata],
    ) -> Result<IngestReport> {
        validate_label(&self.label)?;
        let mut report = IngestReport::default();
        if triples.is_empty() {
            return Ok(report);
        }

        if metadata.len() != triples.len() {
            tracing::warn!(
                triples = triples.len(),
                metadata = metadata.len(),
                "Metadata does not align with triples, missing entries default to unknown"
            );
        }

        let fallback = TripleMetadata::default();
        let total_batches = triples.len().div_ceil(self.batch_size);

        for (batch_no, chunk) in triples.chunks(self.batch_size).enumerate() {
            let offset = batch_no * self.batch_size;
            let batch: Vec<TripleWrite<'_>> = chunk
                .iter()
                .enumerate()
                .map(|(j, triple)| (triple, metadata.get(offset + j).unwrap_or(&fallback)))
                .collect();

            if let Err(e) = self.store.write_batch(&self.label, &batch).await {
                tracing::error!(
                    batch = batch_no + 1,
                    committed = report.triples,
                    "Batch write failed: {}",
                    e
                );
                return Err(e);
            }

            report.triples += chunk.len();
            report.batches += 1;
            tracing::info!("Ingested batch {}/{}", batch_no + 1, total_batches);
        }

        if let Err(e) = self.store.ensure_indexes(&self.label).await {
            tracing::warn!("Index creation failed: {}", e);
        }

        tracing::info!(
            store = self.store.name(),
            triples = report.triples,
            batches = report.batches,
            "Ingestion finished"
        );
        Ok(report)
    }
}
