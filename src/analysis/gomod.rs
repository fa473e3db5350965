//! go.mod module descriptor.
//!
//! Go imports name subpackages while go.mod only declares root modules, so
//! every lookup here is a prefix match on a `/` boundary.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};

use super::facts::ImportKind;

/// One `require` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoModRequire {
    pub path: String,
    pub version: String,
    /// Marked `// indirect` in go.mod.
    pub indirect: bool,
}

/// One `replace` directive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoModReplace {
    pub from: String,
    pub to: String,
}

/// Parsed module descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleInfo {
    pub module_name: String,
    pub module_root: PathBuf,
    pub requires: Vec<GoModRequire>,
    #[serde(default)]
    pub replaces: Vec<GoModReplace>,
}

impl ModuleInfo {
    /// Read `go.mod` from the module root.
    pub fn from_root(root: &Path) -> anyhow::Result<Self> {
        let go_mod_path = root.join("go.mod");
        if !go_mod_path.exists() {
            bail!("go.mod not found at {}", go_mod_path.display());
        }
        let content = fs::read_to_string(&go_mod_path)
            .with_context(|| format!("failed to read {}", go_mod_path.display()))?;
        let mut info = Self::parse(&content)?;
        info.module_root = root.to_path_buf();
        Ok(info)
    }

    /// Parse go.mod content.
    pub fn parse(content: &str) -> anyhow::Result<Self> {
        let mut module_name = String::new();
        let mut requires = Vec::new();
        let mut replaces = Vec::new();

        let mut in_require_block = false;
        let mut in_replace_block = false;

        for raw in content.lines() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with("//") {
                continue;
            }

            if let Some(rest) = line.strip_prefix("module ") {
                module_name = rest.trim().trim_matches('"').to_string();
                continue;
            }

            if is_block_open(line, "require") {
                in_require_block = true;
                continue;
            }
            if is_block_open(line, "replace") {
                in_replace_block = true;
                continue;
            }
            if line == ")" {
                in_require_block = false;
                in_replace_block = false;
                continue;
            }

            if in_require_block {
                requires.extend(parse_require_line(line));
            } else if in_replace_block {
                replaces.extend(parse_replace_line(line));
            } else if let Some(rest) = line.strip_prefix("require ") {
                requires.extend(parse_require_line(rest));
            } else if let Some(rest) = line.strip_prefix("replace ") {
                replaces.extend(parse_replace_line(rest));
            }
        }

        if module_name.is_empty() {
            bail!("no module declaration found in go.mod");
        }

        Ok(Self {
            module_name,
            module_root: PathBuf::new(),
            requires,
            replaces,
        })
    }

    /// Descriptor for a directory without go.mod.
    pub fn anonymous(root: &Path) -> Self {
        let name = root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "main".to_string());
        Self {
            module_name: name,
            module_root: root.to_path_buf(),
            requires: Vec::new(),
            replaces: Vec::new(),
        }
    }

    /// Classify an import path relative to this module.
    ///
    /// The module prefix is checked before the stdlib heuristic so that
    /// dot-less module names (`myapp/pkg/x`) stay internal.
    pub fn classify_import(&self, import_path: &str) -> ImportKind {
        if import_path.starts_with("vendor/") {
            return ImportKind::Vendor;
        }
        if self.is_internal(import_path)
            || import_path.starts_with("./")
            || import_path.starts_with("../")
        {
            return ImportKind::Internal;
        }
        if is_stdlib(import_path) {
            return ImportKind::Std;
        }
        ImportKind::External
    }

    /// Whether the import path lies within this module.
    pub fn is_internal(&self, import_path: &str) -> bool {
        has_path_prefix(import_path, &self.module_name)
    }

    /// Module-relative package path of an internal import (`""` for the root).
    pub fn relative_path<'a>(&self, import_path: &'a str) -> Option<&'a str> {
        if !self.is_internal(import_path) {
            return None;
        }
        Some(
            import_path[self.module_name.len()..]
                .trim_start_matches('/'),
        )
    }

    /// Every required module path, direct and indirect.
    pub fn dependency_paths(&self) -> impl Iterator<Item = &str> {
        self.requires.iter().map(|r| r.path.as_str())
    }
}

/// `path == prefix` or `path` starts with `prefix/`.
pub fn has_path_prefix(path: &str, prefix: &str) -> bool {
    !prefix.is_empty()
        && (path == prefix
            || (path.starts_with(prefix) && path.as_bytes().get(prefix.len()) == Some(&b'/')))
}

/// Go stdlib packages have no dot in their first path component.
pub fn is_stdlib(import_path: &str) -> bool {
    let first = import_path.split('/').next().unwrap_or("");
    !first.is_empty() && !first.contains('.')
}

fn is_block_open(line: &str, keyword: &str) -> bool {
    line.strip_prefix(keyword)
        .map(|rest| rest.trim_start() == "(")
        .unwrap_or(false)
}

/// `google.golang.org/grpc v1.78.0 // indirect`
fn parse_require_line(line: &str) -> Option<GoModRequire> {
    let (body, comment) = match line.split_once("//") {
        Some((body, comment)) => (body, comment),
        None => (line, ""),
    };
    let mut parts = body.split_whitespace();
    let path = parts.next()?.to_string();
    let version = parts.next().unwrap_or("").to_string();
    Some(GoModRequire {
        path,
        version,
        indirect: comment.trim() == "indirect",
    })
}

/// `k8s.io/api => ./staging/src/k8s.io/api`
fn parse_replace_line(line: &str) -> Option<GoModReplace> {
    let line = line.split("//").next().unwrap_or("");
    let (from, to) = line.split_once("=>")?;
    let from = from.split_whitespace().next()?.to_string();
    let to = to.split_whitespace().next()?.to_string();
    Some(GoModReplace { from, to })
}
