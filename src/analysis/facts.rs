//! Raw fact structures extracted from Go source.
//!
//! These records are produced by the front-end and consumed read-only by the
//! atlas builders. Every record carries its source location; packages are
//! keyed by their module-relative `full_name`, never by the short name.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Source location of a declaration or statement.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceLocation {
    /// File path, relative to the module root.
    pub file: String,
    /// Start line (1-indexed).
    pub start_line: usize,
    /// End line (1-indexed).
    pub end_line: usize,
    /// Start column (1-indexed), when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_column: Option<usize>,
    /// End column (1-indexed), when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_column: Option<usize>,
}

impl SourceLocation {
    /// Create a location from a tree-sitter node.
    pub fn from_node(node: tree_sitter::Node, file: &str) -> Self {
        let start = node.start_position();
        let end = node.end_position();
        Self {
            file: file.to_string(),
            start_line: start.row + 1, // tree-sitter is 0-indexed
            end_line: end.row + 1,
            start_column: Some(start.column + 1),
            end_column: Some(end.column + 1),
        }
    }

    /// Create a line-only location.
    pub fn at_line(file: &str, line: usize) -> Self {
        Self {
            file: file.to_string(),
            start_line: line,
            end_line: line,
            start_column: None,
            end_column: None,
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.start_line)
    }
}

/// A struct field or a function parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoField {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    pub exported: bool,
    pub location: SourceLocation,
}

/// A call expression inside a function body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoCallExpr {
    /// Callee name without qualifier (`Done` for `ctx.Done()`).
    pub function_name: String,
    /// Operand of a selector call: a package alias or a receiver variable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qualifier: Option<String>,
    /// Raw argument texts, string literals unquoted.
    #[serde(default)]
    pub args: Vec<String>,
    pub location: SourceLocation,
}

impl GoCallExpr {
    /// Qualified callee text (`pkg.Fn` or `Fn`).
    pub fn qualified_name(&self) -> String {
        match &self.qualifier {
            Some(q) => format!("{}.{}", q, self.function_name),
            None => self.function_name.clone(),
        }
    }
}

/// What a `go` statement launches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SpawnTarget {
    /// `go worker(jobs)` or `go s.handle(conn)`.
    Named {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        qualifier: Option<String>,
    },
    /// `go func() { ... }()`.
    Anonymous,
}

impl SpawnTarget {
    /// Marker used as display name for anonymous spawns.
    pub const ANONYMOUS_NAME: &'static str = "<anonymous>";

    pub fn named(name: &str) -> Self {
        SpawnTarget::Named {
            name: name.to_string(),
            qualifier: None,
        }
    }

    pub fn display_name(&self) -> &str {
        match self {
            SpawnTarget::Named { name, .. } => name,
            SpawnTarget::Anonymous => Self::ANONYMOUS_NAME,
        }
    }

    pub fn is_anonymous(&self) -> bool {
        matches!(self, SpawnTarget::Anonymous)
    }
}

/// A `go` statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoSpawnStmt {
    pub target: SpawnTarget,
    /// Argument texts of the launched call.
    #[serde(default)]
    pub args: Vec<String>,
    pub location: SourceLocation,
}

/// Kind of channel operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelOpKind {
    Make,
    Send,
    Receive,
    Close,
}

/// A channel operation with the channel's local variable name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoChannelOp {
    /// Variable name (`jobs`); empty when the make result is not assigned.
    pub channel_name: String,
    pub operation: ChannelOpKind,
    /// Channel type text of a `make` (`chan Job`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_type: Option<String>,
    /// Literal buffer size of a `make`, when given.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buffer_size: Option<usize>,
    pub location: SourceLocation,
}

/// Behavior data extracted from a function body.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoFunctionBody {
    #[serde(default)]
    pub calls: Vec<GoCallExpr>,
    #[serde(default)]
    pub spawns: Vec<GoSpawnStmt>,
    #[serde(default)]
    pub channel_ops: Vec<GoChannelOp>,
}

impl GoFunctionBody {
    /// Channel `make` operations in this body.
    pub fn channel_makes(&self) -> impl Iterator<Item = &GoChannelOp> {
        self.channel_ops
            .iter()
            .filter(|op| op.operation == ChannelOpKind::Make)
    }
}

/// A method declared on a struct, or a method signature of an interface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoMethod {
    pub name: String,
    /// Receiver variable name (`s` in `func (s *Server)`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiver: Option<String>,
    /// Receiver type without pointer (`Server`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiver_type: Option<String>,
    #[serde(default)]
    pub parameters: Vec<GoField>,
    #[serde(default)]
    pub return_types: Vec<String>,
    pub exported: bool,
    pub location: SourceLocation,
    /// `None` means the body was not extracted, not that it is empty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<GoFunctionBody>,
}

/// A struct type declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoStruct {
    pub name: String,
    pub package_name: String,
    #[serde(default)]
    pub fields: Vec<GoField>,
    #[serde(default)]
    pub methods: Vec<GoMethod>,
    #[serde(default)]
    pub embedded_types: Vec<String>,
    pub exported: bool,
    pub location: SourceLocation,
}

impl GoStruct {
    pub fn find_method(&self, name: &str) -> Option<&GoMethod> {
        self.methods.iter().find(|m| m.name == name)
    }
}

/// An interface type declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoInterface {
    pub name: String,
    pub package_name: String,
    #[serde(default)]
    pub methods: Vec<GoMethod>,
    #[serde(default)]
    pub embedded_interfaces: Vec<String>,
    pub exported: bool,
    pub location: SourceLocation,
}

/// A free function (not a method).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoFunction {
    pub name: String,
    pub package_name: String,
    #[serde(default)]
    pub parameters: Vec<GoField>,
    #[serde(default)]
    pub return_types: Vec<String>,
    pub exported: bool,
    pub location: SourceLocation,
    /// `None` means the body was not extracted, not that it is empty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<GoFunctionBody>,
}

/// Import classification relative to the module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportKind {
    Std,
    Internal,
    External,
    Vendor,
}

/// An import declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoImport {
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    pub location: SourceLocation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ImportKind>,
}

impl GoImport {
    /// Name the import is referenced by in source: the alias, else the last
    /// path segment, skipping a major version suffix (`chi/v5` -> `chi`).
    pub fn local_name(&self) -> &str {
        if let Some(alias) = self.alias.as_deref() {
            return alias;
        }
        let mut segments = self.path.rsplit('/');
        let last = segments.next().unwrap_or(&self.path);
        let is_major_version = last
            .strip_prefix('v')
            .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()));
        match segments.next() {
            Some(parent) if is_major_version => parent,
            _ => last,
        }
    }
}

/// A Go package: every file of one directory sharing a package clause.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoPackage {
    pub id: String,
    /// Short package name (`hub`).
    pub name: String,
    /// Module-relative path (`pkg/hub`); the only safe uniqueness key.
    pub full_name: String,
    pub dir_path: String,
    #[serde(default)]
    pub imports: Vec<GoImport>,
    #[serde(default)]
    pub structs: Vec<GoStruct>,
    #[serde(default)]
    pub interfaces: Vec<GoInterface>,
    #[serde(default)]
    pub functions: Vec<GoFunction>,
    #[serde(default)]
    pub source_files: Vec<String>,
}

impl GoPackage {
    /// Create an empty package keyed by its module-relative path.
    pub fn new(name: &str, full_name: &str) -> Self {
        Self {
            id: full_name.to_string(),
            name: name.to_string(),
            full_name: full_name.to_string(),
            dir_path: full_name.to_string(),
            imports: Vec::new(),
            structs: Vec::new(),
            interfaces: Vec::new(),
            functions: Vec::new(),
            source_files: Vec::new(),
        }
    }

    /// Whether this package is a program entry point.
    pub fn is_main(&self) -> bool {
        self.name == "main"
    }

    pub fn find_function(&self, name: &str) -> Option<&GoFunction> {
        self.functions.iter().find(|f| f.name == name)
    }

    pub fn find_struct(&self, name: &str) -> Option<&GoStruct> {
        self.structs.iter().find(|s| s.name == name)
    }

    pub fn find_interface(&self, name: &str) -> Option<&GoInterface> {
        self.interfaces.iter().find(|i| i.name == name)
    }

    /// Find an import by the name it is referenced by in source.
    pub fn import_named(&self, local_name: &str) -> Option<&GoImport> {
        self.imports.iter().find(|i| i.local_name() == local_name)
    }
}

/// Complete raw facts of a Go module.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoRawData {
    pub packages: Vec<GoPackage>,
    pub module_root: String,
    pub module_name: String,
}

impl GoRawData {
    pub fn find_package(&self, full_name: &str) -> Option<&GoPackage> {
        self.packages.iter().find(|p| p.full_name == full_name)
    }

    /// Total number of source files across all packages.
    pub fn file_count(&self) -> usize {
        self.packages.iter().map(|p| p.source_files.len()).sum()
    }
}

/// Facts extracted from a single `.go` file, before package grouping.
///
/// Methods are kept apart from structs here because Go allows declaring a
/// method in any file of the package.
#[derive(Debug, Clone, Default)]
pub struct FileFacts {
    /// Module-relative file path.
    pub path: String,
    /// Package clause, if present.
    pub package: Option<String>,
    pub imports: Vec<GoImport>,
    pub structs: Vec<GoStruct>,
    pub interfaces: Vec<GoInterface>,
    pub functions: Vec<GoFunction>,
    pub methods: Vec<GoMethod>,
    pub has_parse_errors: bool,
}

impl FileFacts {
    pub fn empty(path: &str) -> Self {
        Self {
            path: path.to_string(),
            ..Default::default()
        }
    }

    /// Whether this is a `_test.go` file.
    pub fn is_test_file(&self) -> bool {
        self.path.ends_with("_test.go")
    }
}

/// Whether a Go identifier is exported.
pub fn is_exported(name: &str) -> bool {
    name.chars().next().map(|c| c.is_uppercase()).unwrap_or(false)
}
