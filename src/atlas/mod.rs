//! Go architecture atlas.
//!
//! Turns [`GoRawData`] into the unified [`ArchGraph`]: framework tags,
//! interface implementations (heuristic, optionally confirmed by gopls),
//! then the four atlas layers (package dependencies, interface capability,
//! goroutine topology with cancellation hygiene, entry point flow), and
//! finally metrics over the merged graph.
//!
//! Every builder here is a pure function of the raw facts. The only side
//! effect is the optional oracle subprocess.

mod capability;
mod flow;
mod frameworks;
mod interfaces;
mod lifecycle;
mod packages;
mod topology;
mod types;

use std::collections::BTreeMap;
use std::path::Path;

use tracing::{debug, info, warn};

use crate::analysis::{self, AnalysisContext, BodyStrategy, GoRawData, LoadOptions, ModuleInfo};
use crate::graph::{self, ArchGraph, ArchGraphMapper, DetailLevel};
use crate::oracle::{GoplsClient, GoplsOptions, ImplementationOracle};

pub use capability::build as build_capability_graph;
pub use flow::{build as build_flow_graph, CustomCallPattern, CustomFramework, FlowOptions, ManualEntryPoint};
pub use frameworks::{
    framework_for_import, is_serve_http, FrameworkDetector, FrameworkTags, STANDARD_NETWORKING,
};
pub use interfaces::{
    compare_methods, compare_types, match_authoritative, match_heuristic, merge, Implementation,
    MatchReport, MethodMatch,
};
pub use lifecycle::{build_lifecycle, STOP_CHANNEL_NAMES};
pub use packages::{build as build_package_graph, classify_package, package_import_path};
pub use topology::{build as build_topology, build_package as build_package_topology};
pub use types::*;

/// Knobs for one atlas run.
#[derive(Debug, Clone, Default)]
pub struct AtlasOptions {
    pub body_strategy: BodyStrategy,
    pub exclude_tests: bool,
    /// Module-relative glob patterns of files to skip.
    pub excluded_paths: Vec<String>,
    pub detail_level: DetailLevel,
    /// gopls settings; `None` runs the heuristic alone.
    pub oracle: Option<GoplsOptions>,
    /// Extra module path prefix -> framework tag mappings.
    pub frameworks: BTreeMap<String, String>,
    /// Entry point detection settings.
    pub flow: FlowOptions,
}

/// Drives the whole pipeline for one Go module.
#[derive(Debug, Clone, Default)]
pub struct AtlasBuilder {
    options: AtlasOptions,
}

impl AtlasBuilder {
    pub fn new(options: AtlasOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &AtlasOptions {
        &self.options
    }

    /// Load the module at `root` from disk and build its graph.
    ///
    /// A missing go.mod is not fatal: the directory is analyzed as an
    /// anonymous module named after itself.
    pub fn analyze_path(&self, root: &Path) -> anyhow::Result<ArchGraph> {
        let module = match ModuleInfo::from_root(root) {
            Ok(module) => module,
            Err(e) => {
                warn!(root = %root.display(), error = %e, "no usable go.mod, analyzing as anonymous module");
                ModuleInfo::anonymous(root)
            }
        };
        info!(module = %module.module_name, root = %root.display(), "loading Go module");

        let context = AnalysisContext::new(
            module.clone(),
            LoadOptions {
                body_strategy: self.options.body_strategy,
                exclude_tests: self.options.exclude_tests,
                excluded_paths: self.options.excluded_paths.clone(),
            },
        )?;
        let raw = context.load()?;

        let graph = match &self.options.oracle {
            Some(options) => {
                let mut client = GoplsClient::new(root, options.clone());
                let oracle: &mut dyn ImplementationOracle = &mut client;
                let graph = self.build(Some(&module), raw, Some(oracle));
                client.shutdown();
                graph
            }
            None => self.build(Some(&module), raw, None),
        };
        Ok(graph)
    }

    /// Build the graph from already loaded facts.
    pub fn build(
        &self,
        module: Option<&ModuleInfo>,
        raw: GoRawData,
        oracle: Option<&mut dyn ImplementationOracle>,
    ) -> ArchGraph {
        let raw = if self.options.exclude_tests {
            analysis::exclude_tests(raw)
        } else {
            raw
        };

        let detector = FrameworkDetector::with_extra(self.options.frameworks.clone());
        let frameworks = detector.detect(module, &raw);

        let gopls_enabled = oracle.is_some();
        let report = match oracle {
            Some(oracle) => match_authoritative(&raw, oracle),
            None => MatchReport {
                implementations: match_heuristic(&raw),
                oracle_failures: Vec::new(),
            },
        };

        let topology = build_topology(&raw);
        let package_graph = build_package_graph(&raw);
        let capability = build_capability_graph(&raw, &report.implementations);
        let flow = build_flow_graph(&raw, &frameworks, &self.options.flow);

        let mut graph = ArchGraphMapper::new(&raw.module_name).map(&raw, &report.implementations);

        let (extracted, total) = function_counts(&raw);
        let mut warnings: Vec<String> = report
            .oracle_failures
            .iter()
            .map(|reason| format!("gopls unavailable, implementations are heuristic: {}", reason))
            .collect();
        if self.options.body_strategy == BodyStrategy::None && total > 0 {
            warnings.push("function bodies were not extracted, goroutine topology is empty".to_string());
        }

        graph.extensions.go_atlas = Some(GoAtlasExtension {
            version: GO_ATLAS_EXTENSION_VERSION.to_string(),
            layers: GoAtlasLayers {
                package: Some(package_graph),
                capability: Some(capability),
                goroutine: Some(topology),
                flow: Some(flow),
            },
            metadata: GoAtlasMetadata {
                function_body_strategy: self.options.body_strategy,
                detected_frameworks: frameworks.into_iter().collect(),
                gopls_enabled,
                exclude_tests: self.options.exclude_tests,
                extracted_function_count: extracted,
                total_function_count: total,
                protocols: (!self.options.flow.protocols.is_empty())
                    .then(|| self.options.flow.protocols.clone()),
                completeness: LayerCompleteness::for_strategy(self.options.body_strategy),
                warnings,
            },
        });

        graph.metrics = Some(graph::calculate(&graph, self.options.detail_level));
        debug!(
            entities = graph.entities.len(),
            relations = graph.relations.len(),
            "atlas built"
        );
        graph
    }
}

/// (functions and methods with an extracted body, all functions and methods)
fn function_counts(raw: &GoRawData) -> (usize, usize) {
    let mut extracted = 0;
    let mut total = 0;
    for package in &raw.packages {
        for function in &package.functions {
            total += 1;
            if function.body.is_some() {
                extracted += 1;
            }
        }
        for method in package.structs.iter().flat_map(|s| s.methods.iter()) {
            total += 1;
            if method.body.is_some() {
                extracted += 1;
            }
        }
    }
    (extracted, total)
}
