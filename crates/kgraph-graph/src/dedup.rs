//! Duplicate entity clustering and merging
//!
//! Names are grouped greedily: each unclaimed name in scan order anchors a
//! cluster of the later unclaimed names scoring above the threshold against
//! it. Candidates are compared with the anchor only, never with each other.
//! The longest name of a cluster becomes its master and absorbs the rest.

use std::cmp::Reverse;
use std::collections::HashSet;
use std::sync::Arc;

use crate::similarity::token_sort_ratio;
use crate::{validate_label, GraphStore};
use kgraph_core::Result;

pub const DEFAULT_THRESHOLD: u8 = 90;

/// A master name and the names to fold into it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateCluster {
    pub master: String,
    pub duplicates: Vec<String>,
}

/// Clusters in discovery order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClusterSet {
    clusters: Vec<DuplicateCluster>,
}

impl ClusterSet {
    pub fn iter(&self) -> impl Iterator<Item = &DuplicateCluster> {
        self.clusters.iter()
    }

    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    /// Duplicates recorded for a master
    pub fn get(&self, master: &str) -> Option<&[String]> {
        self.clusters
            .iter()
            .find(|c| c.master == master)
            .map(|c| c.duplicates.as_slice())
    }

    /// Number of names that would be merged away
    pub fn duplicate_count(&self) -> usize {
        self.clusters.iter().map(|c| c.duplicates.len()).sum()
    }
}

impl<'a> IntoIterator for &'a ClusterSet {
    type Item = &'a DuplicateCluster;
    type IntoIter = std::slice::Iter<'a, DuplicateCluster>;

    fn into_iter(self) -> Self::IntoIter {
        self.clusters.iter()
    }
}

/// Group names whose similarity to an anchor exceeds `threshold`
pub fn find_clusters<S: AsRef<str>>(names: &[S], threshold: u8) -> ClusterSet {
    let mut processed: HashSet<&str> = HashSet::new();
    let mut clusters = Vec::new();

    for (i, anchor) in names.iter().enumerate() {
        let anchor = anchor.as_ref();
        if processed.contains(anchor) {
            continue;
        }

        let mut cluster = vec![anchor];
        for candidate in &names[i + 1..] {
            let candidate = candidate.as_ref();
            if processed.contains(candidate) || cluster.contains(&candidate) {
                continue;
            }
            if token_sort_ratio(anchor, candidate) > threshold {
                cluster.push(candidate);
            }
        }

        if cluster.len() < 2 {
            continue;
        }

        // stable: equal lengths keep scan order
        cluster.sort_by_key(|name| Reverse(name.chars().count()));
        processed.extend(cluster.iter().copied());

        clusters.push(DuplicateCluster {
            master: cluster[0].to_string(),
            duplicates: cluster[1..].iter().map(|s| s.to_string()).collect(),
        });
    }

    ClusterSet { clusters }
}

/// Outcome of a prune run over one label
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PruneReport {
    pub label: String,
    pub names: usize,
    pub clusters: usize,
    pub merged: usize,
}

/// Folds duplicate nodes into their masters
pub struct DuplicateMerger {
    store: Arc<dyn GraphStore>,
    threshold: u8,
}

impl DuplicateMerger {
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self {
            store,
            threshold: DEFAULT_THRESHOLD,
        }
    }

    /// Minimum score a pair must exceed to be clustered
    pub fn with_threshold(mut self, threshold: u8) -> Self {
        self.threshold = threshold;
        self
    }

    /// Read the label's names and cluster them
    pub async fn find(&self, label: &str) -> Result<(usize, ClusterSet)> {
        let names = self.store.node_names(label).await?;
        tracing::info!(label, names = names.len(), "Clustering node names");
        Ok((names.len(), find_clusters(&names, self.threshold)))
    }

    /// Merge every duplicate into its master, one transaction per pair
    ///
    /// Pairs whose nodes no longer exist are skipped. Returns the number
    /// of duplicates actually merged.
    pub async fn merge(&self, label: &str, clusters: &ClusterSet) -> Result<usize> {
        validate_label(label)?;
        let mut merged = 0;

        for cluster in clusters {
            for duplicate in &cluster.duplicates {
                if self.store.merge_nodes(label, &cluster.master, duplicate).await? {
                    tracing::info!("Merged {:?} into {:?}", duplicate, cluster.master);
                    merged += 1;
                } else {
                    tracing::debug!("Nothing to merge for {:?} -> {:?}", duplicate, cluster.master);
                }
            }
        }

        Ok(merged)
    }

    /// Cluster a label and merge the result
    ///
    /// With `dry_run` the clusters are reported but nothing is written.
    pub async fn prune(&self, label: &str, dry_run: bool) -> Result<(PruneReport, ClusterSet)> {
        validate_label(label)?;
        let (names, clusters) = self.find(label).await?;

        let merged = if dry_run {
            0
        } else {
            self.merge(label, &clusters).await?
        };

        let report = PruneReport {
            label: label.to_string(),
            names,
            clusters: clusters.len(),
            merged,
        };
        tracing::info!(
            label,
            clusters = report.clusters,
            merged = report.merged,
            dry_run,
            "Prune finished"
        );
        Ok((report, clusters))
    }
}
