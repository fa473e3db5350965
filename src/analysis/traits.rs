//! Core traits for source analysis.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::facts::FileFacts;

/// Holds a parsed tree-sitter tree and associated metadata.
///
/// Kept apart from `FileFacts` so the tree can serve several extraction
/// passes without re-parsing.
pub struct ParsedFile {
    /// The tree-sitter parse tree.
    pub tree: tree_sitter::Tree,
    /// The original source code (kept for node text extraction).
    pub source: Vec<u8>,
    /// Module-relative file path.
    pub path: String,
}

impl ParsedFile {
    /// Get text for a tree-sitter node.
    pub fn node_text(&self, node: tree_sitter::Node) -> &str {
        node.utf8_text(&self.source).unwrap_or("")
    }
}

/// Which function bodies the front-end extracts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BodyStrategy {
    /// Signatures only; every body stays unknown.
    None,
    /// Only bodies with concurrency or handler-registration signals.
    #[default]
    Selective,
    /// Every body.
    Full,
}

impl BodyStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            BodyStrategy::None => "none",
            BodyStrategy::Selective => "selective",
            BodyStrategy::Full => "full",
        }
    }
}

impl std::str::FromStr for BodyStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(BodyStrategy::None),
            "selective" => Ok(BodyStrategy::Selective),
            "full" => Ok(BodyStrategy::Full),
            other => Err(format!("unknown body strategy '{}'", other)),
        }
    }
}

/// Language front-end producing raw facts from a source file.
///
/// # Thread Safety
///
/// `tree_sitter::Parser` is not `Sync`, so implementations create a parser
/// per call.
pub trait LanguageAnalyzer: Send + Sync {
    /// Returns the language identifier (e.g., "go").
    fn language_id(&self) -> &'static str;

    /// Returns file extensions this analyzer handles (without dot).
    fn file_extensions(&self) -> &'static [&'static str];

    /// Parse a source file into a tree-sitter tree.
    ///
    /// Partial parse errors still yield a tree with ERROR nodes.
    fn parse(&self, path: &str, source: &[u8]) -> anyhow::Result<ParsedFile>;

    /// Extract declarations, imports and (per strategy) bodies.
    fn extract_facts(&self, parsed: &ParsedFile, strategy: BodyStrategy)
        -> anyhow::Result<FileFacts>;

    /// Check if this analyzer handles the given file.
    fn handles(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|ext| self.file_extensions().contains(&ext))
            .unwrap_or(false)
    }
}
