//! Package dependency layer.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use tracing::debug;

use super::types::{
    CycleSeverity, PackageCycle, PackageDependency, PackageGraph, PackageKind, PackageNode,
    PackageStats,
};
use crate::analysis::{has_path_prefix, GoPackage, GoRawData, ImportKind};
use crate::graph::scc::IndexGraph;

/// Import path of a package: the module name for the root package,
/// `<module>/<full path>` otherwise.
pub fn package_import_path(module_name: &str, full_name: &str) -> String {
    if full_name == module_name || module_name.is_empty() {
        full_name.to_string()
    } else {
        format!("{}/{}", module_name, full_name)
    }
}

/// Classify a package by its module-relative path.
pub fn classify_package(package: &GoPackage) -> PackageKind {
    let path = package.full_name.as_str();
    let mut segments = path.split('/');
    let first = segments.next().unwrap_or_default();
    let last = path.rsplit('/').next().unwrap_or_default();

    if first == "tests" || package.full_name.ends_with("_test") {
        PackageKind::Tests
    } else if last.ends_with("testutil") {
        PackageKind::Testutil
    } else if path.split('/').any(|s| s == "examples" || s == "example") {
        PackageKind::Examples
    } else if first == "cmd" || package.is_main() {
        PackageKind::Cmd
    } else {
        PackageKind::Internal
    }
}

/// Build nodes, internal import edges and cycles.
pub fn build(raw: &GoRawData) -> PackageGraph {
    let module = raw.module_name.as_str();
    let mut graph = PackageGraph::default();

    // import path -> node index
    let mut index: HashMap<String, usize> = HashMap::new();
    for package in &raw.packages {
        let id = package_import_path(module, &package.full_name);
        if index.contains_key(&id) {
            continue;
        }
        index.insert(id.clone(), graph.nodes.len());
        graph.nodes.push(PackageNode {
            id,
            name: package.full_name.clone(),
            kind: classify_package(package),
            file_count: package.source_files.len(),
            stats: PackageStats {
                structs: package.structs.len(),
                interfaces: package.interfaces.len(),
                functions: package.functions.len(),
            },
        });
    }

    let mut scc_graph = IndexGraph::new(graph.nodes.len());
    for package in &raw.packages {
        let from = package_import_path(module, &package.full_name);
        let Some(&from_index) = index.get(&from) else {
            continue;
        };

        // target import path -> importing files
        let mut targets: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
        for import in &package.imports {
            let internal = match import.kind {
                Some(kind) => kind == ImportKind::Internal,
                None => has_path_prefix(&import.path, module),
            };
            if !internal || import.path == from {
                continue;
            }
            targets
                .entry(import.path.as_str())
                .or_default()
                .insert(import.location.file.as_str());
        }

        for (target, files) in targets {
            let Some(&to_index) = index.get(target) else {
                debug!(from = %from, to = %target, "import of unknown package, skipping");
                continue;
            };
            scc_graph.add_edge(from_index, to_index);
            graph.edges.push(PackageDependency {
                from: from.clone(),
                to: target.to_string(),
                strength: files.len().max(1),
            });
        }
    }

    for component in scc_graph.strongly_connected_components() {
        if component.len() < 2 {
            continue;
        }
        let mut packages: Vec<String> = component
            .into_iter()
            .map(|i| graph.nodes[i].id.clone())
            .collect();
        packages.sort();
        graph.cycles.push(PackageCycle {
            packages,
            severity: CycleSeverity::Error,
        });
    }
    graph.cycles.sort_by(|a, b| a.packages.cmp(&b.packages));

    debug!(
        packages = graph.nodes.len(),
        dependencies = graph.edges.len(),
        cycles = graph.cycles.len(),
        "package graph built"
    );
    graph
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{GoImport, SourceLocation};

    const MODULE: &str = "example.com/shop";

    fn package(full_name: &str, imports: &[(&str, &str)]) -> GoPackage {
        let name = full_name.rsplit('/').next().unwrap();
        let mut package = GoPackage::new(name, full_name);
        package.imports = imports
            .iter()
            .map(|(path, file)| GoImport {
                path: path.to_string(),
                alias: None,
                location: SourceLocation::at_line(file, 3),
                kind: None,
            })
            .collect();
        package.source_files = imports.iter().map(|(_, f)| f.to_string()).collect();
        package.source_files.dedup();
        package
    }

    fn raw(packages: Vec<GoPackage>) -> GoRawData {
        GoRawData {
            packages,
            module_root: "/src/shop".to_string(),
            module_name: MODULE.to_string(),
        }
    }

    #[test]
    fn test_edges_and_strength() {
        let data = raw(vec![
            package(
                "pkg/api",
                &[
                    ("example.com/shop/pkg/store", "pkg/api/a.go"),
                    ("example.com/shop/pkg/store", "pkg/api/b.go"),
                    ("net/http", "pkg/api/a.go"),
                    ("github.com/gin-gonic/gin", "pkg/api/a.go"),
                ],
            ),
            package("pkg/store", &[]),
        ]);
        let graph = build(&data);

        assert_eq!(graph.nodes.len(), 2);
        assert_eq!(graph.nodes[0].id, "example.com/shop/pkg/api");
        assert_eq!(graph.nodes[0].kind, PackageKind::Internal);
        assert_eq!(
            graph.edges,
            vec![PackageDependency {
                from: "example.com/shop/pkg/api".to_string(),
                to: "example.com/shop/pkg/store".to_string(),
                strength: 2,
            }]
        );
        assert!(graph.cycles.is_empty());
    }

    #[test]
    fn test_cycle_detection() {
        let data = raw(vec![
            package("pkg/a", &[("example.com/shop/pkg/b", "pkg/a/a.go")]),
            package("pkg/b", &[("example.com/shop/pkg/c", "pkg/b/b.go")]),
            package("pkg/c", &[("example.com/shop/pkg/a", "pkg/c/c.go")]),
            package("pkg/d", &[("example.com/shop/pkg/a", "pkg/d/d.go")]),
        ]);
        let graph = build(&data);
        assert_eq!(graph.cycles.len(), 1);
        assert_eq!(
            graph.cycles[0].packages,
            vec![
                "example.com/shop/pkg/a",
                "example.com/shop/pkg/b",
                "example.com/shop/pkg/c"
            ]
        );
        assert_eq!(graph.cycles[0].severity, CycleSeverity::Error);
    }

    #[test]
    fn test_root_package_and_kinds() {
        let mut root = package(MODULE, &[("example.com/shop/cmd/tool", "main.go")]);
        root.name = "shop".to_string();
        let data = raw(vec![
            root,
            package("cmd/tool", &[("example.com/shop", "cmd/tool/main.go")]),
            package("tests/e2e", &[]),
            package("pkg/testutil", &[]),
            package("examples/basic", &[]),
        ]);
        let graph = build(&data);
        let kinds: Vec<_> = graph.nodes.iter().map(|n| (n.id.as_str(), n.kind)).collect();
        assert_eq!(
            kinds,
            vec![
                ("example.com/shop", PackageKind::Internal),
                ("example.com/shop/cmd/tool", PackageKind::Cmd),
                ("example.com/shop/tests/e2e", PackageKind::Tests),
                ("example.com/shop/pkg/testutil", PackageKind::Testutil),
                ("example.com/shop/examples/basic", PackageKind::Examples),
            ]
        );
        assert_eq!(graph.cycles.len(), 1);
    }
}
