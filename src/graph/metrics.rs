//! Structural metrics over the merged entity/relation graph.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use super::scc::IndexGraph;
use super::{ArchGraph, DetailLevel, RelationType};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub level: DetailLevel,
    pub entity_count: usize,
    pub relation_count: usize,
    /// Only relation types that occur.
    pub relation_type_breakdown: BTreeMap<RelationType, usize>,
    pub strongly_connected_components: usize,
    /// Share of inferred relations, two decimals.
    pub inferred_relation_ratio: f64,
}

/// Compute a metrics snapshot. `level` tags the snapshot; the graph is taken
/// as already built at that level.
pub fn calculate(graph: &ArchGraph, level: DetailLevel) -> MetricsSnapshot {
    MetricsSnapshot {
        level,
        entity_count: graph.entities.len(),
        relation_count: graph.relations.len(),
        relation_type_breakdown: type_breakdown(graph),
        strongly_connected_components: count_components(graph),
        inferred_relation_ratio: inferred_ratio(graph),
    }
}

fn type_breakdown(graph: &ArchGraph) -> BTreeMap<RelationType, usize> {
    let mut breakdown = BTreeMap::new();
    for relation in &graph.relations {
        *breakdown.entry(relation.relation_type).or_insert(0) += 1;
    }
    breakdown
}

fn inferred_ratio(graph: &ArchGraph) -> f64 {
    if graph.relations.is_empty() {
        return 0.0;
    }
    let inferred = graph.relations.iter().filter(|r| r.is_inferred()).count();
    let ratio = inferred as f64 / graph.relations.len() as f64;
    (ratio * 100.0).round() / 100.0
}

/// SCC count; relations with an endpoint outside the entity set are skipped.
fn count_components(graph: &ArchGraph) -> usize {
    let mut index: HashMap<&str, usize> = HashMap::with_capacity(graph.entities.len());
    for entity in &graph.entities {
        let next = index.len();
        index.entry(entity.id.as_str()).or_insert(next);
    }

    let mut indexed = IndexGraph::new(index.len());
    for relation in &graph.relations {
        if let (Some(&from), Some(&to)) = (
            index.get(relation.source.as_str()),
            index.get(relation.target.as_str()),
        ) {
            indexed.add_edge(from, to);
        }
    }
    indexed.strongly_connected_components().len()
}
