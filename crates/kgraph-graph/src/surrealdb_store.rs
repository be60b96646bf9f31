//! SurrealDB implementation for graph storage
//!
//! Nodes live in a table named after the label, keyed by entity name.
//! Edges are `relates` relations carrying `predicate`, `weight` and
//! `source`. Every batch and every merge runs as one transaction.

use async_trait::async_trait;
use serde::Deserialize;
use surrealdb::engine::remote::ws::{Client, Ws};
use surrealdb::opt::auth::Root;
use surrealdb::Surreal;

use crate::{validate_label, GraphStore, TripleWrite};
use kgraph_core::{
    DatabaseConfig, GraphEdge, GraphNode, KgError, RelationType, Result, DEFAULT_NODE_TYPE,
};

const EDGE_SELECT: &str = "SELECT record::id(in) AS subject, predicate AS relation, \
     record::id(out) AS object, weight, source FROM relates";

/// SurrealDB graph store implementation
pub struct SurrealDbStore {
    client: Surreal<Client>,
}

impl SurrealDbStore {
    /// Create a new SurrealDB connection
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        // the client adds the scheme itself
        let url = config
            .surrealdb_url
            .strip_prefix("ws://")
            .or_else(|| config.surrealdb_url.strip_prefix("wss://"))
            .unwrap_or(&config.surrealdb_url);

        let client = Surreal::new::<Ws>(url)
            .await
            .map_err(|e| KgError::DatabaseError(format!("SurrealDB connection failed: {e}")))?;

        client
            .signin(Root {
                username: &config.surrealdb_user,
                password: &config.surrealdb_pass,
            })
            .await
            .map_err(|e| KgError::DatabaseError(format!("SurrealDB auth failed: {e}")))?;

        client
            .use_ns(&config.surrealdb_namespace)
            .use_db(&config.surrealdb_database)
            .await
            .map_err(|e| KgError::DatabaseError(format!("SurrealDB namespace error: {e}")))?;

        tracing::info!(url = %config.surrealdb_url, "Connected to SurrealDB");
        Ok(Self { client })
    }
}

/// Edge row as returned by [`EDGE_SELECT`]
#[derive(Debug, Deserialize)]
struct EdgeRecord {
    subject: String,
    relation: String,
    object: String,
    weight: u64,
    source: Option<String>,
}

impl EdgeRecord {
    fn into_edge(self) -> Option<GraphEdge> {
        let relation = RelationType::parse(&self.relation)?;
        Some(GraphEdge {
            subject: self.subject,
            relation,
            object: self.object,
            weight: self.weight,
            source: self.source,
        })
    }
}

#[derive(Debug, Deserialize)]
struct CountRecord {
    count: usize,
}

/// Statements upserting one triple; parameters are suffixed with `i`
fn triple_statements(i: usize) -> String {
    format!(
        r#"
        LET $s{i} = type::thing($label, $subject{i});
        LET $o{i} = type::thing($label, $object{i});
        UPSERT $s{i} SET name = $subject{i}, `type` = `type` ?? $subject_type{i}, domain = domain ?? $domain{i};
        UPSERT $o{i} SET name = $object{i}, `type` = `type` ?? $object_type{i}, domain = domain ?? $domain{i};
        LET $e{i} = (SELECT VALUE id FROM relates WHERE in = $s{i} AND out = $o{i} AND predicate = $predicate{i} LIMIT 1)[0];
        IF $e{i} != NONE {{
            UPDATE $e{i} SET weight += 1, source = source ?? $source{i};
        }} ELSE {{
            RELATE $s{i}->relates->$o{i} SET predicate = $predicate{i}, weight = 1, source = $source{i};
        }};
        "#
    )
}

const MERGE_QUERY: &str = r#"
    BEGIN TRANSACTION;
    LET $m = type::thing($label, $master);
    LET $d = type::thing($label, $duplicate);
    LET $merged = $m != $d AND record::exists($m) AND record::exists($d);
    IF $merged {
        LET $dup = (SELECT * FROM ONLY $d);
        UPDATE $m SET `type` = `type` ?? $dup.`type`, domain = domain ?? $dup.domain;
        FOR $edge IN (SELECT * FROM relates WHERE in = $d OR out = $d) {
            LET $from = IF $edge.in = $d { $m } ELSE { $edge.in };
            LET $to = IF $edge.out = $d { $m } ELSE { $edge.out };
            LET $existing = (SELECT VALUE id FROM relates
                WHERE in = $from AND out = $to AND predicate = $edge.predicate AND id != $edge.id
                LIMIT 1)[0];
            IF $existing != NONE {
                UPDATE $existing SET weight += $edge.weight, source = source ?? $edge.source;
            } ELSE {
                RELATE $from->relates->$to
                    SET predicate = $edge.predicate, weight = $edge.weight, source = $edge.source;
            };
            DELETE $edge.id;
        };
        DELETE $d;
    };
    COMMIT TRANSACTION;
    RETURN $merged;
"#;

#[async_trait]
impl GraphStore for SurrealDbStore {
    async fn write_batch(&self, label: &str, batch: &[TripleWrite<'_>]) -> Result<()> {
        validate_label(label)?;
        if batch.is_empty() {
            return Ok(());
        }

        let mut sql = String::from("BEGIN TRANSACTION;");
        for i in 0..batch.len() {
            sql.push_str(&triple_statements(i));
        }
        sql.push_str("COMMIT TRANSACTION;");

        let mut query = self.client.query(sql).bind(("label", label.to_string()));
        for (i, (triple, metadata)) in batch.iter().enumerate() {
            let subject_type = metadata
                .subject_type
                .clone()
                .unwrap_or_else(|| DEFAULT_NODE_TYPE.to_string());
            let object_type = metadata
                .object_type
                .clone()
                .unwrap_or_else(|| DEFAULT_NODE_TYPE.to_string());

            query = query
                .bind((format!("subject{i}"), triple.subject.clone()))
                .bind((format!("object{i}"), triple.object.clone()))
                .bind((format!("predicate{i}"), triple.relation.as_str()))
                .bind((format!("subject_type{i}"), subject_type))
                .bind((format!("object_type{i}"), object_type))
                .bind((format!("domain{i}"), metadata.domain.clone()))
                .bind((format!("source{i}"), metadata.title.clone()));
        }

        query
            .await
            .and_then(|response| response.check())
            .map_err(|e| KgError::DatabaseError(format!("Batch write failed: {e}")))?;

        Ok(())
    }

    async fn ensure_indexes(&self, label: &str) -> Result<()> {
        validate_label(label)?;
        let prefix = label.to_lowercase();
        let sql = format!(
            "DEFINE INDEX IF NOT EXISTS {prefix}_name ON TABLE {label} FIELDS name;
             DEFINE INDEX IF NOT EXISTS {prefix}_domain ON TABLE {label} FIELDS domain;
             DEFINE INDEX IF NOT EXISTS relates_key ON TABLE relates FIELDS in, out, predicate;"
        );

        self.client
            .query(sql)
            .await
            .and_then(|response| response.check())
            .map_err(|e| KgError::DatabaseError(format!("Index creation failed: {e}")))?;

        Ok(())
    }

    async fn node_names(&self, label: &str) -> Result<Vec<String>> {
        validate_label(label)?;
        let names: Vec<String> = self
            .client
            .query("SELECT VALUE name FROM type::table($label)")
            .bind(("label", label.to_string()))
            .await
            .map_err(|e| KgError::DatabaseError(format!("Query failed: {e}")))?
            .take(0)
            .map_err(|e| KgError::DatabaseError(format!("Result extraction failed: {e}")))?;

        Ok(names)
    }

    async fn merge_nodes(&self, label: &str, master: &str, duplicate: &str) -> Result<bool> {
        validate_label(label)?;
        if master == duplicate {
            return Ok(false);
        }
        let mut response = self
            .client
            .query(MERGE_QUERY)
            .bind(("label", label.to_string()))
            .bind(("master", master.to_string()))
            .bind(("duplicate", duplicate.to_string()))
            .await
            .and_then(|response| response.check())
            .map_err(|e| KgError::DatabaseError(format!("Merge failed: {e}")))?;

        // the transaction decides whether both nodes were still there
        let last = response.num_statements().saturating_sub(1);
        let merged: Option<bool> = response
            .take(last)
            .map_err(|e| KgError::DatabaseError(format!("Result extraction failed: {e}")))?;

        Ok(merged.unwrap_or(false))
    }

    async fn get_node(&self, label: &str, name: &str) -> Result<Option<GraphNode>> {
        validate_label(label)?;
        let node: Option<GraphNode> = self
            .client
            .select((label, name.to_string()))
            .await
            .map_err(|e| KgError::DatabaseError(format!("Failed to get node: {e}")))?;

        Ok(node)
    }

    async fn get_edge(
        &self,
        label: &str,
        subject: &str,
        relation: RelationType,
        object: &str,
    ) -> Result<Option<GraphEdge>> {
        validate_label(label)?;
        let records: Vec<EdgeRecord> = self
            .client
            .query(format!(
                "{EDGE_SELECT} WHERE in = type::thing($label, $subject) \
                 AND out = type::thing($label, $object) AND predicate = $predicate"
            ))
            .bind(("label", label.to_string()))
            .bind(("subject", subject.to_string()))
            .bind(("object", object.to_string()))
            .bind(("predicate", relation.as_str()))
            .await
            .map_err(|e| KgError::DatabaseError(format!("Query failed: {e}")))?
            .take(0)
            .map_err(|e| KgError::DatabaseError(format!("Result extraction failed: {e}")))?;

        Ok(records.into_iter().find_map(EdgeRecord::into_edge))
    }

    async fn edges_of(&self, label: &str, name: &str) -> Result<Vec<GraphEdge>> {
        validate_label(label)?;
        let records: Vec<EdgeRecord> = self
            .client
            .query(format!(
                "LET $node = type::thing($label, $name);
                 {EDGE_SELECT} WHERE in = $node OR out = $node;"
            ))
            .bind(("label", label.to_string()))
            .bind(("name", name.to_string()))
            .await
            .map_err(|e| KgError::DatabaseError(format!("Query failed: {e}")))?
            .take(1)
            .map_err(|e| KgError::DatabaseError(format!("Result extraction failed: {e}")))?;

        Ok(records.into_iter().filter_map(EdgeRecord::into_edge).collect())
    }

    async fn node_count(&self, label: &str) -> Result<usize> {
        validate_label(label)?;
        let counts: Vec<CountRecord> = self
            .client
            .query("SELECT count() FROM type::table($label) GROUP ALL")
            .bind(("label", label.to_string()))
            .await
            .map_err(|e| KgError::DatabaseError(format!("Query failed: {e}")))?
            .take(0)
            .map_err(|e| KgError::DatabaseError(format!("Result extraction failed: {e}")))?;

        Ok(counts.first().map_or(0, |c| c.count))
    }

    fn name(&self) -> &str {
        "surrealdb"
    }
}
