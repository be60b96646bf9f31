//! KGraph Graph - Graph database abstraction
//!
//! Provides the label/property graph interface the engine writes to,
//! two implementations (in-memory and SurrealDB), batched triple
//! ingestion, and fuzzy duplicate clustering and merging.

use async_trait::async_trait;
use kgraph_core::{GraphEdge, GraphNode, KgError, RelationType, Result, Triple, TripleMetadata};

pub use dedup::{find_clusters, ClusterSet, DuplicateCluster, DuplicateMerger, PruneReport};
pub use ingest::{GraphIngestor, IngestReport};
pub use memory_store::InMemoryGraphStore;
pub use similarity::token_sort_ratio;
pub use surrealdb_store::SurrealDbStore;

/// One triple to write together with its provenance
pub type TripleWrite<'a> = (&'a Triple, &'a TripleMetadata);

/// Trait for graph database operations
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Upsert the nodes and edges of a batch in a single transaction
    ///
    /// Nodes are matched by name; `type` and `domain` are only written when
    /// unset. Edges are matched by (subject, relation, object); `weight` is
    /// incremented and `source` only written when unset.
    async fn write_batch(&self, label: &str, batch: &[TripleWrite<'_>]) -> Result<()>;

    /// Create the name and domain lookup indexes if missing
    async fn ensure_indexes(&self, label: &str) -> Result<()>;

    /// Names of every node with the label, in store scan order
    async fn node_names(&self, label: &str) -> Result<Vec<String>>;

    /// Merge `duplicate` into `master` in a single transaction
    ///
    /// Properties already set on the master win, relationships of the
    /// duplicate are redirected to the master, and the duplicate is
    /// deleted. Returns `false` when either node does not exist.
    async fn merge_nodes(&self, label: &str, master: &str, duplicate: &str) -> Result<bool>;

    /// Get a node by name
    async fn get_node(&self, label: &str, name: &str) -> Result<Option<GraphNode>>;

    /// Get an edge by its identity
    async fn get_edge(
        &self,
        label: &str,
        subject: &str,
        relation: RelationType,
        object: &str,
    ) -> Result<Option<GraphEdge>>;

    /// All edges touching a node, in either direction
    async fn edges_of(&self, label: &str, name: &str) -> Result<Vec<GraphEdge>>;

    /// Number of nodes with the label
    async fn node_count(&self, label: &str) -> Result<usize>;

    /// Store name for logging
    fn name(&self) -> &str;
}

/// Labels become table names, so only plain identifiers are accepted
pub fn validate_label(label: &str) -> Result<()> {
    let mut chars = label.chars();
    let valid = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');

    if valid {
        Ok(())
    } else {
        Err(KgError::InvalidLabel(label.to_string()))
    }
}

pub mod dedup;
pub mod ingest;
pub mod memory_store;
pub mod similarity;
pub mod surrealdb_store;
