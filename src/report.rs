//! Output formatting for goatlas results.
//!
//! Supports two output formats:
//! - Pretty: colored terminal summary for human readability
//! - JSON: the full architecture graph for programmatic consumption

use std::fs;
use std::path::Path;

use colored::*;

use crate::atlas::{
    CapabilityGraph, CapabilityNodeKind, CycleSeverity, FlowGraph, GoAtlasExtension, GoroutineKind,
    GoroutineTopology, PackageGraph,
};
use crate::graph::{ArchGraph, MetricsSnapshot};

/// Goroutines listed in the pretty output before truncating.
const MAX_LISTED_GOROUTINES: usize = 25;

/// Entry points listed in the pretty output before truncating.
const MAX_LISTED_ENTRY_POINTS: usize = 25;

// =============================================================================
// JSON Format
// =============================================================================

/// Serialize the graph as pretty-printed JSON.
pub fn render_json(graph: &ArchGraph) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(graph)?)
}

/// Write the graph as JSON to `output`, or stdout when `None`.
pub fn write_json(graph: &ArchGraph, output: Option<&Path>) -> anyhow::Result<()> {
    let json = render_json(graph)?;
    match output {
        Some(path) => {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    fs::create_dir_all(parent)?;
                }
            }
            fs::write(path, json + "\n")?;
        }
        None => println!("{}", json),
    }
    Ok(())
}

// =============================================================================
// Pretty Format
// =============================================================================

/// Write a human-readable summary of the graph.
pub fn write_pretty(path: &str, config_path: Option<&str>, graph: &ArchGraph) {
    // Header
    println!();
    print!("  ");
    print!("{}", "goatlas".cyan().bold());
    println!(" v{}", env!("CARGO_PKG_VERSION"));
    println!();

    print!("  {}", "Module:   ".dimmed());
    println!("{}", path);
    if let Some(config) = config_path {
        print!("  {}", "Config:   ".dimmed());
        println!("{}", config);
    }
    print!("  {}", "Files:    ".dimmed());
    println!("{}", graph.source_files.len());
    println!();

    if let Some(atlas) = &graph.extensions.go_atlas {
        write_metadata(atlas);
        println!();
    }

    if let Some(metrics) = &graph.metrics {
        write_metrics(metrics);
        println!();
    }

    if let Some(atlas) = &graph.extensions.go_atlas {
        if let Some(topology) = &atlas.layers.goroutine {
            write_goroutines(topology);
            println!();
        }
        if let Some(packages) = &atlas.layers.package {
            write_packages(packages);
            println!();
        }
        if let Some(capability) = &atlas.layers.capability {
            write_capability(capability);
            println!();
        }
        if let Some(flow) = &atlas.layers.flow {
            write_flow(flow);
            println!();
        }
        for warning in &atlas.metadata.warnings {
            println!("  {} {}", "WARN".yellow(), warning);
        }
        if !atlas.metadata.warnings.is_empty() {
            println!();
        }
    }
}

fn write_metadata(atlas: &GoAtlasExtension) {
    let meta = &atlas.metadata;
    println!(
        "  {:<12}{}",
        "Frameworks".bold(),
        meta.detected_frameworks.join(", ")
    );
    println!(
        "  {:<12}{} ({} of {} bodies extracted)",
        "Bodies".bold(),
        meta.function_body_strategy.as_str(),
        meta.extracted_function_count,
        meta.total_function_count
    );
    let gopls = if meta.gopls_enabled {
        "enabled".green()
    } else {
        "disabled".dimmed()
    };
    println!("  {:<12}{}", "gopls".bold(), gopls);
}

fn write_metrics(metrics: &MetricsSnapshot) {
    println!("  {} ({}):", "Graph".bold(), metrics.level.as_str());
    println!("    {:<22}{}", "entities", metrics.entity_count);
    println!("    {:<22}{}", "relations", metrics.relation_count);
    for (relation_type, count) in &metrics.relation_type_breakdown {
        println!("      {:<20}{}", relation_type.as_str().dimmed(), count);
    }
    let scc = metrics.strongly_connected_components.to_string();
    if metrics.strongly_connected_components < metrics.entity_count {
        println!("    {:<22}{}", "components", scc.yellow());
    } else {
        println!("    {:<22}{}", "components", scc);
    }
    println!(
        "    {:<22}{:.2}",
        "inferred ratio", metrics.inferred_relation_ratio
    );
}

fn write_goroutines(topology: &GoroutineTopology) {
    let spawned = topology
        .nodes
        .iter()
        .filter(|n| n.kind == GoroutineKind::Spawned)
        .count();
    let orphans = topology.orphan_count();
    print!(
        "  {} ({} spawned, {} channels",
        "Goroutines".bold(),
        spawned,
        topology.channels.len()
    );
    if orphans > 0 {
        print!(", {}", format!("{} orphan", orphans).red());
    }
    println!("):");

    for summary in topology.lifecycle.iter().take(MAX_LISTED_GOROUTINES) {
        let Some(node) = topology.find_node(&summary.node_id) else {
            continue;
        };
        let tag = if summary.orphan {
            "ORPHAN".red()
        } else {
            "ok    ".green()
        };
        print!("    {} {:<24}", tag, summary.spawn_target_name);
        print!("{}", node.location.to_string().blue());
        if let Some(pattern) = node.pattern {
            print!("  {}", format!("[{}]", pattern.as_str()).dimmed());
        }
        println!();
    }
    if topology.lifecycle.len() > MAX_LISTED_GOROUTINES {
        println!(
            "    {}",
            format!(
                "... {} more (use --format json for the full topology)",
                topology.lifecycle.len() - MAX_LISTED_GOROUTINES
            )
            .dimmed()
        );
    }
}

fn write_packages(packages: &PackageGraph) {
    println!(
        "  {} ({} packages, {} internal imports):",
        "Packages".bold(),
        packages.nodes.len(),
        packages.edges.len()
    );
    if packages.cycles.is_empty() {
        println!("    {}", "no import cycles".green());
        return;
    }
    for cycle in &packages.cycles {
        let tag = match cycle.severity {
            CycleSeverity::Error => "CYCLE".red(),
            CycleSeverity::Warning => "CYCLE".yellow(),
        };
        println!("    {} {}", tag, cycle.packages.join(" -> "));
    }
}

fn write_capability(capability: &CapabilityGraph) {
    let interfaces = capability
        .nodes
        .iter()
        .filter(|n| n.kind == CapabilityNodeKind::Interface)
        .count();
    println!(
        "  {} ({} interfaces, {} relations):",
        "Capabilities".bold(),
        interfaces,
        capability.edges.len()
    );
    if capability.concrete_usage_risks.is_empty() {
        println!("    {}", "no concrete dependencies".green());
        return;
    }
    for risk in &capability.concrete_usage_risks {
        print!("    {} {:<24}", "CONCRETE".yellow(), risk.owner);
        print!("{} ", risk.field_type);
        println!("{}", risk.location.blue());
    }
}

fn write_flow(flow: &FlowGraph) {
    println!("  {} ({}):", "Entry points".bold(), flow.entry_points.len());
    for entry in flow.entry_points.iter().take(MAX_LISTED_ENTRY_POINTS) {
        let method = entry.method.map_or("", |m| m.as_str());
        let calls = flow.chain_for(&entry.id).map_or(0, |c| c.calls.len());
        print!("    {:<10}{:<7}", entry.protocol, method);
        print!("{:<24}", entry.path);
        print!("{} ", entry.handler);
        print!("{}", entry.location.to_string().blue());
        println!("  {}", format!("[{}, {} calls]", entry.framework, calls).dimmed());
    }
    if flow.entry_points.len() > MAX_LISTED_ENTRY_POINTS {
        println!(
            "    {}",
            format!(
                "... {} more (use --format json for the full flow layer)",
                flow.entry_points.len() - MAX_LISTED_ENTRY_POINTS
            )
            .dimmed()
        );
    }
}
