//! Raw fact extraction for Go modules.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌──────────────┐     ┌───────────────┐
//! │ .go files       │────▶│ GoAnalyzer   │────▶│ FileFacts     │
//! └─────────────────┘     │ (tree-sitter)│     └───────────────┘
//!                         └──────────────┘             │ group by dir
//!                                                      ▼
//! ┌─────────────────┐     ┌──────────────┐     ┌───────────────┐
//! │ go.mod          │────▶│ ModuleInfo   │────▶│ GoRawData     │
//! └─────────────────┘     └──────────────┘     │ (packages)    │
//!                                              └───────────────┘
//! ```
//!
//! `GoRawData` is the only input of the atlas builders; anything that can
//! produce it (another front-end, a JSON dump) can drive them.

mod context;
pub mod facts;
mod filter;
mod gomod;
mod languages;
mod traits;

pub use context::{group_packages, AnalysisContext, LoadOptions};
pub use facts::{
    ChannelOpKind, FileFacts, GoCallExpr, GoChannelOp, GoField, GoFunction, GoFunctionBody,
    GoImport, GoInterface, GoMethod, GoPackage, GoRawData, GoSpawnStmt, GoStruct, ImportKind,
    SourceLocation, SpawnTarget,
};
pub use filter::{exclude_tests, is_test_package_path};
pub use gomod::{has_path_prefix, is_stdlib, GoModReplace, GoModRequire, ModuleInfo};
pub use languages::{get_analyzer, GoAnalyzer, REGISTRATION_CALLS};
pub use traits::{BodyStrategy, LanguageAnalyzer, ParsedFile};
