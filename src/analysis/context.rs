//! Project loading: file discovery, parallel extraction and package grouping.
//!
//! Files are parsed independently in parallel, then grouped into packages
//! keyed by module-relative directory. Methods are attached to their receiver
//! struct only after grouping, since Go lets a method live in any file of the
//! package.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use globset::{Glob, GlobSet, GlobSetBuilder};
use rayon::prelude::*;
use tracing::{debug, warn};
use walkdir::WalkDir;

use super::facts::{FileFacts, GoMethod, GoPackage, GoRawData};
use super::gomod::ModuleInfo;
use super::languages::get_analyzer;
use super::traits::BodyStrategy;

/// Directories never descended into.
const SKIPPED_DIRS: &[&str] = &["vendor", "node_modules", "testdata"];

/// Options controlling what the loader extracts.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    pub body_strategy: BodyStrategy,
    /// Skip `_test.go` files during discovery.
    pub exclude_tests: bool,
    /// Glob patterns (module-relative) of files to skip.
    pub excluded_paths: Vec<String>,
}

/// Analysis context for one Go module.
pub struct AnalysisContext {
    /// Module root; all fact paths are relative to it.
    base_dir: PathBuf,
    module: ModuleInfo,
    options: LoadOptions,
    excluded: GlobSet,
}

impl AnalysisContext {
    /// Create a context. Fails on an invalid exclusion pattern.
    pub fn new(module: ModuleInfo, options: LoadOptions) -> anyhow::Result<Self> {
        let mut builder = GlobSetBuilder::new();
        for pattern in &options.excluded_paths {
            let glob = Glob::new(pattern)
                .with_context(|| format!("invalid exclusion pattern '{}'", pattern))?;
            builder.add(glob);
        }
        Ok(Self {
            base_dir: module.module_root.clone(),
            module,
            options,
            excluded: builder.build()?,
        })
    }

    /// Get the base directory.
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn module(&self) -> &ModuleInfo {
        &self.module
    }

    fn relative_path(&self, path: &Path) -> String {
        path.strip_prefix(&self.base_dir)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/")
    }

    /// Discover `.go` files under the module root.
    pub fn collect_files(&self) -> anyhow::Result<Vec<PathBuf>> {
        let mut files = Vec::new();

        let walker = WalkDir::new(&self.base_dir)
            .follow_links(true)
            .into_iter()
            .filter_entry(|e| {
                if e.depth() == 0 || !e.file_type().is_dir() {
                    return true;
                }
                let name = e.file_name().to_string_lossy();
                !name.starts_with('.') && !SKIPPED_DIRS.contains(&name.as_ref())
            });

        for entry in walker {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("go") {
                continue;
            }
            if self.options.exclude_tests
                && path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .map(|n| n.ends_with("_test.go"))
                    .unwrap_or(false)
            {
                continue;
            }
            if self.excluded.is_match(self.relative_path(path)) {
                debug!(path = %path.display(), "skipping excluded file");
                continue;
            }
            files.push(path.to_path_buf());
        }

        files.sort();
        Ok(files)
    }

    /// Parse one file and extract its facts.
    pub fn analyze_file(&self, path: &Path) -> anyhow::Result<FileFacts> {
        let rel_path = self.relative_path(path);
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        let Some(analyzer) = get_analyzer(ext) else {
            return Ok(FileFacts::empty(&rel_path));
        };

        let source = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
        let parsed = analyzer.parse(&rel_path, &source)?;
        let facts = analyzer.extract_facts(&parsed, self.options.body_strategy)?;
        if facts.has_parse_errors {
            debug!(file = %rel_path, "source contains syntax errors, facts are partial");
        }
        Ok(facts)
    }

    /// Analyze files in parallel. Failures are logged and skipped; results
    /// are sorted by path.
    pub fn analyze_files_parallel(&self, paths: &[PathBuf]) -> Vec<FileFacts> {
        let results: Vec<_> = paths.par_iter().map(|p| (p, self.analyze_file(p))).collect();

        let mut all_facts = Vec::new();
        for (path, result) in results {
            match result {
                Ok(facts) => all_facts.push(facts),
                Err(e) => warn!(file = %path.display(), error = %e, "failed to analyze file"),
            }
        }

        all_facts.sort_by(|a, b| a.path.cmp(&b.path));
        all_facts
    }

    /// Discover, parse and group the whole module.
    pub fn load(&self) -> anyhow::Result<GoRawData> {
        let files = self.collect_files()?;
        debug!(count = files.len(), root = %self.base_dir.display(), "discovered Go files");
        let facts = self.analyze_files_parallel(&files);

        Ok(GoRawData {
            packages: group_packages(&self.module, facts),
            module_root: self.base_dir.to_string_lossy().into_owned(),
            module_name: self.module.module_name.clone(),
        })
    }
}

/// Group per-file facts into packages.
///
/// Packages are keyed by directory; an external test package (`foo_test`
/// next to `foo`) gets its own `<dir>_test` key. Methods whose receiver is
/// not a struct of the package are dropped.
pub fn group_packages(module: &ModuleInfo, files: Vec<FileFacts>) -> Vec<GoPackage> {
    let mut grouped: BTreeMap<String, (GoPackage, Vec<GoMethod>)> = BTreeMap::new();

    for file in files {
        let Some(package_name) = file.package.clone() else {
            warn!(file = %file.path, "file has no package clause, skipping");
            continue;
        };
        let dir = match file.path.rsplit_once('/') {
            Some((dir, _)) => dir.to_string(),
            None => String::new(),
        };
        let mut full_name = if dir.is_empty() {
            module.module_name.clone()
        } else {
            dir.clone()
        };
        if package_name.ends_with("_test") && file.is_test_file() {
            full_name.push_str("_test");
        }

        let (package, methods) = grouped.entry(full_name.clone()).or_insert_with(|| {
            let mut package = GoPackage::new(&package_name, &full_name);
            package.dir_path = dir.clone();
            (package, Vec::new())
        });

        // A package clause from a non-test file wins over one seen in a test file.
        if !file.is_test_file() {
            package.name = package_name;
        }
        package.source_files.push(file.path);
        for mut import in file.imports {
            let duplicate = package
                .imports
                .iter()
                .any(|i| i.path == import.path && i.location.file == import.location.file);
            if !duplicate {
                import.kind = Some(module.classify_import(&import.path));
                package.imports.push(import);
            }
        }
        package.structs.extend(file.structs);
        package.interfaces.extend(file.interfaces);
        package.functions.extend(file.functions);
        methods.extend(file.methods);
    }

    grouped
        .into_values()
        .map(|(mut package, methods)| {
            attach_methods(&mut package, methods);
            package
        })
        .collect()
}

fn attach_methods(package: &mut GoPackage, methods: Vec<GoMethod>) {
    for method in methods {
        let owner = method
            .receiver_type
            .as_deref()
            .and_then(|receiver| package.structs.iter_mut().find(|s| s.name == receiver));
        match owner {
            Some(owner) => owner.methods.push(method),
            None => debug!(
                package = %package.full_name,
                method = %method.name,
                receiver = method.receiver_type.as_deref().unwrap_or("?"),
                "dropping method whose receiver is not a struct of the package"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn module_at(root: &Path) -> ModuleInfo {
        write(root, "go.mod", "module example.com/shop\n\ngo 1.22\n");
        ModuleInfo::from_root(root).unwrap()
    }

    #[test]
    fn test_load_groups_files_by_directory() {
        let temp = TempDir::new().unwrap();
        let module = module_at(temp.path());
        write(temp.path(), "main.go", "package main\nfunc main() {}\n");
        write(
            temp.path(),
            "pkg/cart/cart.go",
            "package cart\nimport \"example.com/shop/pkg/store\"\ntype Cart struct{ s store.Store }\n",
        );
        write(
            temp.path(),
            "pkg/cart/methods.go",
            "package cart\nfunc (c *Cart) Add(id string) {}\nfunc (g *Ghost) Boo() {}\n",
        );
        write(temp.path(), "vendor/x/x.go", "package x\n");
        write(temp.path(), ".git/hooks/h.go", "package hooks\n");

        let ctx = AnalysisContext::new(module, LoadOptions::default()).unwrap();
        let raw = ctx.load().unwrap();

        let names: Vec<_> = raw.packages.iter().map(|p| p.full_name.as_str()).collect();
        assert_eq!(names, vec!["example.com/shop", "pkg/cart"]);

        let cart = raw.find_package("pkg/cart").unwrap();
        assert_eq!(cart.source_files.len(), 2);
        let cart_struct = cart.find_struct("Cart").unwrap();
        assert_eq!(cart_struct.methods.len(), 1);
        assert_eq!(cart_struct.methods[0].name, "Add");
        assert_eq!(
            cart.imports[0].kind,
            Some(crate::analysis::facts::ImportKind::Internal)
        );
    }

    #[test]
    fn test_exclude_tests_and_patterns() {
        let temp = TempDir::new().unwrap();
        let module = module_at(temp.path());
        write(temp.path(), "pkg/a/a.go", "package a\n");
        write(temp.path(), "pkg/a/a_test.go", "package a\n");
        write(temp.path(), "gen/mock.go", "package gen\n");

        let options = LoadOptions {
            exclude_tests: true,
            excluded_paths: vec!["gen/**".to_string()],
            ..Default::default()
        };
        let ctx = AnalysisContext::new(module, options).unwrap();
        let files = ctx.collect_files().unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("pkg/a/a.go"));
    }

    #[test]
    fn test_invalid_pattern_rejected() {
        let temp = TempDir::new().unwrap();
        let module = module_at(temp.path());
        let options = LoadOptions {
            excluded_paths: vec!["[".to_string()],
            ..Default::default()
        };
        assert!(AnalysisContext::new(module, options).is_err());
    }

    #[test]
    fn test_external_test_package_is_separate() {
        let module = ModuleInfo::parse("module example.com/shop\n").unwrap();
        let mut internal = FileFacts::empty("pkg/a/a.go");
        internal.package = Some("a".to_string());
        let mut external = FileFacts::empty("pkg/a/a_ext_test.go");
        external.package = Some("a_test".to_string());

        let packages = group_packages(&module, vec![internal, external]);
        let names: Vec<_> = packages.iter().map(|p| p.full_name.as_str()).collect();
        assert_eq!(names, vec!["pkg/a", "pkg/a_test"]);
        assert_eq!(packages[1].name, "a_test");
    }
}
