//! Ingestion and dedup integration tests against the in-memory store

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use kgraph_core::{
    GraphEdge, GraphNode, KgError, RelationType, Result, Triple, TripleMetadata,
};
use kgraph_graph::{
    DuplicateMerger, GraphIngestor, GraphStore, InMemoryGraphStore, TripleWrite,
};

/// Store that fails the n-th batch write and delegates everything else
struct FailingStore {
    inner: InMemoryGraphStore,
    fail_on: usize,
    writes: AtomicUsize,
}

#[async_trait]
impl GraphStore for FailingStore {
    async fn write_batch(&self, label: &str, batch: &[TripleWrite<'_>]) -> Result<()> {
        if self.writes.fetch_add(1, Ordering::SeqCst) == self.fail_on {
            return Err(KgError::DatabaseError("connection reset".to_string()));
        }
        self.inner.write_batch(label, batch).await
    }

    async fn ensure_indexes(&self, label: &str) -> Result<()> {
        self.inner.ensure_indexes(label).await
    }

    async fn node_names(&self, label: &str) -> Result<Vec<String>> {
        self.inner.node_names(label).await
    }

    async fn merge_nodes(&self, label: &str, master: &str, duplicate: &str) -> Result<bool> {
        self.inner.merge_nodes(label, master, duplicate).await
    }

    async fn get_node(&self, label: &str, name: &str) -> Result<Option<GraphNode>> {
        self.inner.get_node(label, name).await
    }

    async fn get_edge(
        &self,
        label: &str,
        subject: &str,
        relation: RelationType,
        object: &str,
    ) -> Result<Option<GraphEdge>> {
        self.inner.get_edge(label, subject, relation, object).await
    }

    async fn edges_of(&self, label: &str, name: &str) -> Result<Vec<GraphEdge>> {
        self.inner.edges_of(label, name).await
    }

    async fn node_count(&self, label: &str) -> Result<usize> {
        self.inner.node_count(label).await
    }

    fn name(&self) -> &str {
        "failing"
    }
}

fn tech(title: &str) -> TripleMetadata {
    TripleMetadata::new("Technology", title)
}

#[tokio::test]
async fn test_reingesting_increments_weight_only() {
    let store = Arc::new(InMemoryGraphStore::new());
    let ingestor = GraphIngestor::new(store.clone());

    let triples = vec![Triple::new("Steve Jobs", RelationType::Founded, "Apple Inc")];
    let metadata = vec![tech("Apple")];

    ingestor.ingest(&triples, &metadata).await.unwrap();
    let nodes_after_first = store.node_count("Entity").await.unwrap();
    ingestor.ingest(&triples, &[tech("Steve Jobs")]).await.unwrap();

    assert_eq!(store.node_count("Entity").await.unwrap(), nodes_after_first);
    assert_eq!(store.edge_count("Entity").await, 1);

    let edge = store
        .get_edge("Entity", "Steve Jobs", RelationType::Founded, "Apple Inc")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(edge.weight, 2);
    assert_eq!(edge.source.as_deref(), Some("Apple"));
}

#[tokio::test]
async fn test_failed_batch_keeps_earlier_batches() {
    let store = Arc::new(FailingStore {
        inner: InMemoryGraphStore::new(),
        fail_on: 1,
        writes: AtomicUsize::new(0),
    });
    let ingestor = GraphIngestor::new(store.clone()).with_batch_size(2);

    let triples: Vec<Triple> = (0..5)
        .map(|i| Triple::new(format!("Startup {i}"), RelationType::LocatedIn, "Austin"))
        .collect();
    let metadata = vec![tech("Austin"); 5];

    let result = ingestor.ingest(&triples, &metadata).await;
    assert!(matches!(result, Err(KgError::DatabaseError(_))));

    // first batch committed, second and third never landed
    assert_eq!(store.node_count("Entity").await.unwrap(), 3);
    assert!(store.get_node("Entity", "Startup 1").await.unwrap().is_some());
    assert!(store.get_node("Entity", "Startup 2").await.unwrap().is_none());
}

#[tokio::test]
async fn test_prune_merges_and_is_idempotent() {
    let store = Arc::new(InMemoryGraphStore::new());
    let triples = vec![
        Triple::new("Steve Jobs", RelationType::Founded, "Apple Inc"),
        Triple::new("Steven Jobs", RelationType::Leads, "Apple Inc."),
        Triple::new("Apple Inc.", RelationType::LocatedIn, "Cupertino"),
        Triple::new("IBM", RelationType::LocatedIn, "Armonk"),
        Triple::new("I.B.M.", RelationType::Develops, "Watson"),
    ];
    let metadata = vec![tech("Apple"); triples.len()];
    GraphIngestor::new(store.clone())
        .ingest(&triples, &metadata)
        .await
        .unwrap();
    assert_eq!(store.node_count("Entity").await.unwrap(), 9);

    let merger = DuplicateMerger::new(store.clone());
    let (report, clusters) = merger.prune("Entity", false).await.unwrap();

    assert_eq!(report.names, 9);
    assert_eq!(report.clusters, 2);
    assert_eq!(report.merged, 2);
    assert_eq!(clusters.get("Steven Jobs"), Some(&["Steve Jobs".to_string()][..]));
    assert_eq!(store.node_count("Entity").await.unwrap(), 7);

    // the duplicate's edge now hangs off the master
    assert!(store
        .get_edge("Entity", "Steven Jobs", RelationType::Founded, "Apple Inc.")
        .await
        .unwrap()
        .is_some());
    assert!(store.get_node("Entity", "IBM").await.unwrap().is_some());
    assert!(store.get_node("Entity", "I.B.M.").await.unwrap().is_some());

    let (second, _) = merger.prune("Entity", false).await.unwrap();
    assert_eq!(second.merged, 0);

    // stale clusters are skipped without error
    assert_eq!(merger.merge("Entity", &clusters).await.unwrap(), 0);
}

#[tokio::test]
async fn test_dry_run_writes_nothing() {
    let store = Arc::new(InMemoryGraphStore::new());
    let triples = vec![
        Triple::new("Google LLC", RelationType::Owns, "YouTube"),
        Triple::new("Google LLC.", RelationType::Develops, "Android"),
    ];
    GraphIngestor::new(store.clone())
        .ingest(&triples, &[])
        .await
        .unwrap();

    let (report, clusters) = DuplicateMerger::new(store.clone())
        .prune("Entity", true)
        .await
        .unwrap();

    assert_eq!(report.clusters, 1);
    assert_eq!(report.merged, 0);
    assert_eq!(clusters.duplicate_count(), 1);
    assert_eq!(store.node_count("Entity").await.unwrap(), 4);
}

#[tokio::test]
async fn test_labels_are_isolated() {
    let store = Arc::new(InMemoryGraphStore::new());
    let triples = vec![
        Triple::new("Apple Inc", RelationType::LocatedIn, "Cupertino"),
        Triple::new("Apple Inc.", RelationType::LocatedIn, "Cupertino"),
    ];
    GraphIngestor::new(store.clone())
        .with_label("Company")
        .ingest(&triples, &[])
        .await
        .unwrap();

    let (report, _) = DuplicateMerger::new(store.clone())
        .prune("Entity", false)
        .await
        .unwrap();
    assert_eq!(report.names, 0);
    assert_eq!(store.node_count("Company").await.unwrap(), 3);
}
