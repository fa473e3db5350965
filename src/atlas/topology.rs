//! Goroutine spawn and channel topology.
//!
//! Every package is scanned independently (free functions and struct
//! methods) and the per-package results are concatenated in package order.

use std::collections::{BTreeMap, HashMap, HashSet};

use rayon::prelude::*;
use tracing::debug;

use super::lifecycle;
use super::types::{
    ChannelDirection, ChannelEdge, ChannelEdgeKind, ChannelInfo, GoroutineKind, GoroutineNode,
    GoroutinePattern, GoroutineTopology, LineLocation, SpawnKind, SpawnRelation,
};
use crate::analysis::{GoChannelOp, GoFunctionBody, GoPackage, GoRawData, GoSpawnStmt, GoStruct};

/// A function or method body that may spawn goroutines.
pub(crate) struct Scope<'a> {
    /// `<pkg>.<Func>` or `<pkg>.<Struct>.<Method>`.
    pub id: String,
    pub body: &'a GoFunctionBody,
    /// Receiver variable and owning struct, for methods.
    pub receiver: Option<(&'a str, &'a GoStruct)>,
}

/// One `go` statement with its stable node id.
pub(crate) struct SpawnSite<'a> {
    pub node_id: String,
    pub scope_index: usize,
    pub spawn: &'a GoSpawnStmt,
}

/// Bodies of a package in declaration order: free functions, then methods.
/// Functions without an extracted body are skipped.
pub(crate) fn scopes(package: &GoPackage) -> Vec<Scope<'_>> {
    let mut scopes = Vec::new();
    for function in &package.functions {
        if let Some(body) = &function.body {
            scopes.push(Scope {
                id: format!("{}.{}", package.full_name, function.name),
                body,
                receiver: None,
            });
        }
    }
    for owner in &package.structs {
        for method in &owner.methods {
            if let Some(body) = &method.body {
                scopes.push(Scope {
                    id: format!("{}.{}.{}", package.full_name, owner.name, method.name),
                    body,
                    receiver: method.receiver.as_deref().map(|r| (r, owner)),
                });
            }
        }
    }
    scopes
}

/// Spawn sites of the given scopes. Two spawns on one line of the same
/// scope get `-2`, `-3` suffixes.
pub(crate) fn spawn_sites<'a>(scopes: &[Scope<'a>]) -> Vec<SpawnSite<'a>> {
    let mut used = HashSet::new();
    let mut sites = Vec::new();
    for (scope_index, scope) in scopes.iter().enumerate() {
        for spawn in &scope.body.spawns {
            let base = format!("{}.spawn-{}", scope.id, spawn.location.start_line);
            sites.push(SpawnSite {
                node_id: unique_id(base, &mut used),
                scope_index,
                spawn,
            });
        }
    }
    sites
}

pub(crate) fn unique_id(base: String, used: &mut HashSet<String>) -> String {
    if used.insert(base.clone()) {
        return base;
    }
    let mut n = 2;
    loop {
        let candidate = format!("{}-{}", base, n);
        if used.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}

/// Build the full topology, lifecycle summaries included.
pub fn build(raw: &GoRawData) -> GoroutineTopology {
    let parts: Vec<GoroutineTopology> = raw.packages.par_iter().map(build_package).collect();

    let mut topology = GoroutineTopology::default();
    for part in parts {
        topology.nodes.extend(part.nodes);
        topology.edges.extend(part.edges);
        topology.channels.extend(part.channels);
        topology.channel_edges.extend(part.channel_edges);
        topology.lifecycle.extend(part.lifecycle);
    }
    debug!(
        nodes = topology.nodes.len(),
        channels = topology.channels.len(),
        orphans = topology.orphan_count(),
        "goroutine topology built"
    );
    topology
}

/// Topology of a single package.
pub fn build_package(package: &GoPackage) -> GoroutineTopology {
    let mut topology = GoroutineTopology::default();

    if package.is_main() {
        if let Some(main) = package.find_function("main") {
            topology.nodes.push(GoroutineNode {
                id: format!("{}.main", package.full_name),
                name: "main".to_string(),
                kind: GoroutineKind::Main,
                spawn_type: None,
                package: package.full_name.clone(),
                location: LineLocation {
                    file: main.location.file.clone(),
                    line: main.location.start_line,
                },
                pattern: None,
            });
        }
    }

    let scopes = scopes(package);
    let sites = spawn_sites(&scopes);

    let mut used_channel_ids = HashSet::new();
    let mut bindings: HashMap<&str, Option<String>> = HashMap::new();
    for (scope_index, scope) in scopes.iter().enumerate() {
        let mut by_name: HashMap<&str, String> = HashMap::new();
        for op in scope.body.channel_makes() {
            let base = format!("chan-{}-{}", package.full_name, op.location.start_line);
            let id = unique_id(base, &mut used_channel_ids);
            topology.channels.push(channel_info(&id, op));
            topology.channel_edges.push(ChannelEdge {
                from: scope.id.clone(),
                to: id.clone(),
                edge_type: ChannelEdgeKind::Make,
            });
            if !op.channel_name.is_empty() {
                by_name.entry(op.channel_name.as_str()).or_insert(id);
            }
        }

        for site in sites.iter().filter(|s| s.scope_index == scope_index) {
            // First argument naming a local channel wins.
            let bound = site
                .spawn
                .args
                .iter()
                .find_map(|arg| by_name.get(arg.as_str()).cloned());
            if let Some(channel_id) = &bound {
                topology.channel_edges.push(ChannelEdge {
                    from: channel_id.clone(),
                    to: site.node_id.clone(),
                    edge_type: ChannelEdgeKind::Recv,
                });
            }
            bindings.insert(site.node_id.as_str(), bound);
        }
    }

    for site in &sites {
        let spawn_type = if site.spawn.target.is_anonymous() {
            SpawnKind::AnonymousFunc
        } else {
            SpawnKind::NamedFunc
        };
        topology.nodes.push(GoroutineNode {
            id: site.node_id.clone(),
            name: site.spawn.target.display_name().to_string(),
            kind: GoroutineKind::Spawned,
            spawn_type: Some(spawn_type),
            package: package.full_name.clone(),
            location: LineLocation {
                file: site.spawn.location.file.clone(),
                line: site.spawn.location.start_line,
            },
            pattern: None,
        });
        topology.edges.push(SpawnRelation {
            from: scopes[site.scope_index].id.clone(),
            to: site.node_id.clone(),
            spawn_type,
        });
    }

    let patterns = classify_patterns(&sites, &bindings);
    for node in &mut topology.nodes {
        node.pattern = patterns.get(node.id.as_str()).copied();
    }

    topology.lifecycle = lifecycle::summarize(package, &scopes, &sites);
    topology
}

fn channel_info(id: &str, op: &GoChannelOp) -> ChannelInfo {
    let channel_type = op.channel_type.clone().unwrap_or_else(|| "chan".to_string());
    let direction = if channel_type.starts_with("<-chan") {
        ChannelDirection::Receive
    } else if channel_type.starts_with("chan<-") || channel_type.starts_with("chan <-") {
        ChannelDirection::Send
    } else {
        ChannelDirection::Bidirectional
    };
    ChannelInfo {
        id: id.to_string(),
        name: op.channel_name.clone(),
        channel_type,
        direction,
        buffer_size: op.buffer_size,
        location: LineLocation {
            file: op.location.file.clone(),
            line: op.location.start_line,
        },
    }
}

/// Patterns among the spawn sites of each enclosing scope.
///
/// Sites sharing a channel form a worker pool; two or more sites bound to
/// distinct channels form a pipeline; two or more unbound sites fan out.
fn classify_patterns<'a>(
    sites: &'a [SpawnSite],
    bindings: &HashMap<&str, Option<String>>,
) -> HashMap<&'a str, GoroutinePattern> {
    let mut per_scope: BTreeMap<usize, Vec<&SpawnSite>> = BTreeMap::new();
    for site in sites {
        per_scope.entry(site.scope_index).or_default().push(site);
    }

    let mut patterns = HashMap::new();
    for group in per_scope.values() {
        if group.len() < 2 {
            continue;
        }
        let mut by_channel: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        let mut unbound = Vec::new();
        for &site in group {
            match bindings.get(site.node_id.as_str()).and_then(|b| b.as_deref()) {
                Some(channel) => by_channel.entry(channel).or_default().push(site.node_id.as_str()),
                None => unbound.push(site.node_id.as_str()),
            }
        }

        let mut singles = Vec::new();
        for members in by_channel.values() {
            if members.len() >= 2 {
                for id in members {
                    patterns.insert(*id, GoroutinePattern::WorkerPool);
                }
            } else {
                singles.extend(members.iter().copied());
            }
        }
        if singles.len() >= 2 {
            for id in singles {
                patterns.insert(id, GoroutinePattern::Pipeline);
            }
        }
        if unbound.len() >= 2 {
            for id in unbound {
                patterns.insert(id, GoroutinePattern::FanOut);
            }
        }
    }
    patterns
}
