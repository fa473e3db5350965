//! Language-specific front-ends.

mod go;

pub use go::{GoAnalyzer, REGISTRATION_CALLS};

use super::LanguageAnalyzer;
use once_cell::sync::OnceCell;

/// Static storage for the Go analyzer.
static GO_ANALYZER: OnceCell<GoAnalyzer> = OnceCell::new();

/// Get an analyzer for the given file extension.
///
/// Returns None if no analyzer handles the extension.
pub fn get_analyzer(ext: &str) -> Option<&'static dyn LanguageAnalyzer> {
    match ext {
        "go" => Some(GO_ANALYZER.get_or_init(GoAnalyzer::new) as &'static dyn LanguageAnalyzer),
        _ => None,
    }
}
