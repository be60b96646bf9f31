//! In-memory graph store
//!
//! A petgraph-backed [`GraphStore`] used for tests, dry runs and small
//! corpora. Each label gets its own directed graph; a batch is applied
//! under one write lock, so readers never observe half a batch.

use std::collections::HashMap;

use async_trait::async_trait;
use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableDiGraph};
use petgraph::visit::{EdgeRef, IntoEdgeReferences};
use petgraph::Direction;
use tokio::sync::RwLock;

use crate::{validate_label, GraphStore, TripleWrite};
use kgraph_core::{GraphEdge, GraphNode, RelationType, Result, DEFAULT_NODE_TYPE};

#[derive(Debug, Clone)]
struct StoredNode {
    node: GraphNode,
    /// Creation order, used as scan order
    seq: u64,
}

#[derive(Debug, Clone)]
struct StoredEdge {
    relation: RelationType,
    weight: u64,
    source: Option<String>,
}

#[derive(Debug, Default)]
struct LabelGraph {
    graph: StableDiGraph<StoredNode, StoredEdge>,
    by_name: HashMap<String, NodeIndex>,
    next_seq: u64,
    indexed: bool,
}

impl LabelGraph {
    fn upsert_node(&mut self, name: &str, node_type: &str, domain: &str) -> NodeIndex {
        let idx = match self.by_name.get(name) {
            Some(idx) => *idx,
            None => {
                let idx = self.graph.add_node(StoredNode {
                    node: GraphNode::new(name),
                    seq: self.next_seq,
                });
                self.next_seq += 1;
                self.by_name.insert(name.to_string(), idx);
                idx
            }
        };

        let node = &mut self.graph[idx].node;
        node.node_type.get_or_insert_with(|| node_type.to_string());
        node.domain.get_or_insert_with(|| domain.to_string());
        idx
    }

    fn find_edge(&self, from: NodeIndex, to: NodeIndex, relation: RelationType) -> Option<EdgeIndex> {
        self.graph
            .edges_directed(from, Direction::Outgoing)
            .find(|e| e.target() == to && e.weight().relation == relation)
            .map(|e| e.id())
    }

    /// Add `weight` to the edge, creating it when absent
    fn add_weight(
        &mut self,
        from: NodeIndex,
        to: NodeIndex,
        relation: RelationType,
        weight: u64,
        source: Option<String>,
    ) {
        match self.find_edge(from, to, relation) {
            Some(id) => {
                let edge = &mut self.graph[id];
                edge.weight += weight;
                if edge.source.is_none() {
                    edge.source = source;
                }
            }
            None => {
                self.graph.add_edge(
                    from,
                    to,
                    StoredEdge {
                        relation,
                        weight,
                        source,
                    },
                );
            }
        }
    }

    fn to_graph_edge(&self, from: NodeIndex, to: NodeIndex, edge: &StoredEdge) -> GraphEdge {
        GraphEdge {
            subject: self.graph[from].node.name.clone(),
            relation: edge.relation,
            object: self.graph[to].node.name.clone(),
            weight: edge.weight,
            source: edge.source.clone(),
        }
    }

    fn merge(&mut self, master: NodeIndex, duplicate: NodeIndex) {
        let dup_node = self.graph[duplicate].node.clone();
        self.graph[master].node.combine(&dup_node);

        let moved: Vec<(NodeIndex, NodeIndex, StoredEdge)> = self
            .graph
            .edge_references()
            .filter(|e| e.source() == duplicate || e.target() == duplicate)
            .map(|e| {
                let redirect = |n: NodeIndex| if n == duplicate { master } else { n };
                (redirect(e.source()), redirect(e.target()), e.weight().clone())
            })
            .collect();

        self.graph.remove_node(duplicate);
        self.by_name.remove(&dup_node.name);

        for (from, to, edge) in moved {
            self.add_weight(from, to, edge.relation, edge.weight, edge.source);
        }
    }
}

/// In-memory graph store
#[derive(Debug, Default)]
pub struct InMemoryGraphStore {
    labels: RwLock<HashMap<String, LabelGraph>>,
}

impl InMemoryGraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of edges with the label
    pub async fn edge_count(&self, label: &str) -> usize {
        let labels = self.labels.read().await;
        labels.get(label).map_or(0, |g| g.graph.edge_count())
    }

    /// Whether lookup indexes were requested for the label
    pub async fn is_indexed(&self, label: &str) -> bool {
        let labels = self.labels.read().await;
        labels.get(label).is_some_and(|g| g.indexed)
    }
}

#[async_trait]
impl GraphStore for InMemoryGraphStore {
    async fn write_batch(&self, label: &str, batch: &[TripleWrite<'_>]) -> Result<()> {
        validate_label(label)?;
        let mut labels = self.labels.write().await;
        let graph = labels.entry(label.to_string()).or_default();

        for (triple, metadata) in batch {
            let subject_type = metadata.subject_type.as_deref().unwrap_or(DEFAULT_NODE_TYPE);
            let object_type = metadata.object_type.as_deref().unwrap_or(DEFAULT_NODE_TYPE);

            let from = graph.upsert_node(&triple.subject, subject_type, &metadata.domain);
            let to = graph.upsert_node(&triple.object, object_type, &metadata.domain);
            graph.add_weight(from, to, triple.relation, 1, Some(metadata.title.clone()));
        }

        Ok(())
    }

    async fn ensure_indexes(&self, label: &str) -> Result<()> {
        validate_label(label)?;
        let mut labels = self.labels.write().await;
        labels.entry(label.to_string()).or_default().indexed = true;
        Ok(())
    }

    async fn node_names(&self, label: &str) -> Result<Vec<String>> {
        validate_label(label)?;
        let labels = self.labels.read().await;
        let Some(graph) = labels.get(label) else {
            return Ok(Vec::new());
        };

        let mut nodes: Vec<&StoredNode> =
            graph.graph.node_indices().map(|idx| &graph.graph[idx]).collect();
        nodes.sort_by_key(|n| n.seq);
        Ok(nodes.into_iter().map(|n| n.node.name.clone()).collect())
    }

    async fn merge_nodes(&self, label: &str, master: &str, duplicate: &str) -> Result<bool> {
        validate_label(label)?;
        if master == duplicate {
            return Ok(false);
        }

        let mut labels = self.labels.write().await;
        let Some(graph) = labels.get_mut(label) else {
            return Ok(false);
        };

        let (Some(&m), Some(&d)) = (graph.by_name.get(master), graph.by_name.get(duplicate)) else {
            return Ok(false);
        };

        graph.merge(m, d);
        Ok(true)
    }

    async fn get_node(&self, label: &str, name: &str) -> Result<Option<GraphNode>> {
        validate_label(label)?;
        let labels = self.labels.read().await;
        Ok(labels
            .get(label)
            .and_then(|g| g.by_name.get(name).map(|idx| g.graph[*idx].node.clone())))
    }

    async fn get_edge(
        &self,
        label: &str,
        subject: &str,
        relation: RelationType,
        object: &str,
    ) -> Result<Option<GraphEdge>> {
        validate_label(label)?;
        let labels = self.labels.read().await;
        let Some(graph) = labels.get(label) else {
            return Ok(None);
        };

        let (Some(&from), Some(&to)) = (graph.by_name.get(subject), graph.by_name.get(object)) else {
            return Ok(None);
        };

        Ok(graph
            .find_edge(from, to, relation)
            .map(|id| graph.to_graph_edge(from, to, &graph.graph[id])))
    }

    async fn edges_of(&self, label: &str, name: &str) -> Result<Vec<GraphEdge>> {
        validate_label(label)?;
        let labels = self.labels.read().await;
        let Some(graph) = labels.get(label) else {
            return Ok(Vec::new());
        };
        let Some(&idx) = graph.by_name.get(name) else {
            return Ok(Vec::new());
        };

        Ok(graph
            .graph
            .edge_references()
            .filter(|e| e.source() == idx || e.target() == idx)
            .map(|e| graph.to_graph_edge(e.source(), e.target(), e.weight()))
            .collect())
    }

    async fn node_count(&self, label: &str) -> Result<usize> {
        validate_label(label)?;
        let labels = self.labels.read().await;
        Ok(labels.get(label).map_or(0, |g| g.graph.node_count()))
    }

    fn name(&self) -> &str {
        "memory"
    }
}
