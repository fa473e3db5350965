//! Capability layer: which structs provide and which consume each interface.
//!
//! Interfaces are always nodes. Structs become nodes only when an edge
//! touches them. `implements` edges come from the matcher; `uses` edges come
//! from struct field types that resolve to a module struct or interface.
//! A `uses` edge onto a struct is concrete usage and is also listed as a risk.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use tracing::debug;

use super::interfaces::Implementation;
use super::types::{
    CapabilityGraph, CapabilityNode, CapabilityNodeKind, CapabilityRelation, CapabilityRelationKind,
    ConcreteUsageRisk, UsageContext,
};
use crate::analysis::GoRawData;
use crate::graph::ArchGraphMapper;

/// Confidence of an edge derived from a field type.
const FIELD_USAGE_CONFIDENCE: f64 = 0.9;

/// Build the capability graph from raw facts and matched implementations.
pub fn build(raw: &GoRawData, implementations: &[Implementation]) -> CapabilityGraph {
    let mut nodes = all_nodes(raw);
    let kinds: HashMap<String, CapabilityNodeKind> =
        nodes.iter().map(|n| (n.id.clone(), n.kind)).collect();

    let mut edges: Vec<CapabilityRelation> = Vec::new();
    let mut index: HashMap<(CapabilityRelationKind, String, String), usize> = HashMap::new();

    for implementation in implementations {
        let source = implementation.struct_id();
        let target = implementation.interface_id();
        let key = (CapabilityRelationKind::Implements, source.clone(), target.clone());
        if index.contains_key(&key) {
            continue;
        }
        index.insert(key, edges.len());
        edges.push(CapabilityRelation {
            id: format!("impl-{}-{}", source, target),
            kind: CapabilityRelationKind::Implements,
            source,
            target,
            confidence: implementation.confidence,
            concrete_usage: false,
            context: None,
        });
    }

    let mapper = ArchGraphMapper::new(&raw.module_name);
    let mut risks: Vec<ConcreteUsageRisk> = Vec::new();
    for package in &raw.packages {
        for structure in &package.structs {
            let owner = format!("{}.{}", package.full_name, structure.name);
            for field in &structure.fields {
                let type_name = strip_channel(&field.type_name);
                let Some((_, target)) = mapper.resolve_field_type(package, type_name) else {
                    continue;
                };
                let Some(&target_kind) = kinds.get(&target) else {
                    continue;
                };
                let location = format!("{}:{}", field.location.file, field.location.start_line);
                let key = (CapabilityRelationKind::Uses, owner.clone(), target.clone());
                if let Some(&existing) = index.get(&key) {
                    if let Some(context) = edges[existing].context.as_mut() {
                        context.usage_locations.push(location);
                    }
                    continue;
                }

                let concrete_usage = target_kind == CapabilityNodeKind::Struct;
                if concrete_usage {
                    risks.push(ConcreteUsageRisk {
                        owner: owner.clone(),
                        field_type: field.type_name.clone(),
                        concrete_type: target.clone(),
                        location: location.clone(),
                    });
                }
                index.insert(key, edges.len());
                edges.push(CapabilityRelation {
                    id: format!("uses-{}-{}", owner, field.type_name),
                    kind: CapabilityRelationKind::Uses,
                    source: owner.clone(),
                    target,
                    confidence: FIELD_USAGE_CONFIDENCE,
                    concrete_usage,
                    context: Some(UsageContext {
                        field_type: true,
                        usage_locations: vec![location],
                    }),
                });
            }
        }
    }

    let mut fan_in: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    let mut fan_out: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    for edge in &edges {
        fan_in.entry(edge.target.as_str()).or_default().insert(edge.source.as_str());
        fan_out.entry(edge.source.as_str()).or_default().insert(edge.target.as_str());
    }
    nodes.retain(|n| {
        n.kind == CapabilityNodeKind::Interface
            || fan_in.contains_key(n.id.as_str())
            || fan_out.contains_key(n.id.as_str())
    });
    for node in &mut nodes {
        node.fan_in = fan_in.get(node.id.as_str()).map_or(0, BTreeSet::len);
        node.fan_out = fan_out.get(node.id.as_str()).map_or(0, BTreeSet::len);
    }

    debug!(
        nodes = nodes.len(),
        edges = edges.len(),
        risks = risks.len(),
        "capability graph built"
    );
    CapabilityGraph {
        nodes,
        edges,
        concrete_usage_risks: risks,
    }
}

/// Interface and struct nodes, first declaration wins on duplicate ids.
fn all_nodes(raw: &GoRawData) -> Vec<CapabilityNode> {
    let mut seen = BTreeSet::new();
    let mut nodes = Vec::new();
    for package in &raw.packages {
        for interface in &package.interfaces {
            let id = format!("{}.{}", package.full_name, interface.name);
            if seen.insert(id.clone()) {
                nodes.push(CapabilityNode {
                    id,
                    name: interface.name.clone(),
                    kind: CapabilityNodeKind::Interface,
                    package: package.full_name.clone(),
                    exported: interface.exported,
                    method_count: interface.methods.len(),
                    field_count: 0,
                    fan_in: 0,
                    fan_out: 0,
                });
            }
        }
        for structure in &package.structs {
            let id = format!("{}.{}", package.full_name, structure.name);
            if seen.insert(id.clone()) {
                nodes.push(CapabilityNode {
                    id,
                    name: structure.name.clone(),
                    kind: CapabilityNodeKind::Struct,
                    package: package.full_name.clone(),
                    exported: structure.exported,
                    method_count: structure.methods.len(),
                    field_count: structure.fields.len(),
                    fan_in: 0,
                    fan_out: 0,
                });
            }
        }
    }
    nodes
}

/// `chan T`, `<-chan T` and `chan<- T` -> `T`.
fn strip_channel(type_name: &str) -> &str {
    let trimmed = type_name.trim();
    ["<-chan ", "chan<- ", "chan "]
        .iter()
        .find_map(|prefix| trimmed.strip_prefix(prefix))
        .map(str::trim)
        .unwrap_or(trimmed)
}
