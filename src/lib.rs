//! goatlas - Go architecture atlas.
//!
//! goatlas extracts a structural and behavioral model of a Go module and
//! turns it into a language-agnostic architecture graph: entities, relations
//! (implementation, composition, aggregation), a goroutine spawn/channel
//! topology with cancellation hygiene, a package import graph, interface
//! capabilities, entry point flows and metrics.
//!
//! # Architecture
//!
//! - `analysis`: tree-sitter Go front-end producing raw facts (`GoRawData`)
//! - `atlas`: framework detection, interface matching, the package,
//!   capability, goroutine and flow layers, and the `AtlasBuilder` that
//!   drives them
//! - `oracle`: optional gopls client confirming interface implementations
//! - `graph`: the unified graph, the Go mapper and metrics (SCC et al.)
//! - `config`: YAML config schema
//! - `report`: Output formatting (pretty, JSON)
//!
//! # Example
//!
//! ```no_run
//! use goatlas::{AtlasBuilder, AtlasOptions};
//!
//! let graph = AtlasBuilder::new(AtlasOptions::default())
//!     .analyze_path(std::path::Path::new("."))
//!     .unwrap();
//! println!("{} entities", graph.entities.len());
//! ```

pub mod analysis;
pub mod atlas;
pub mod cli;
pub mod config;
pub mod graph;
pub mod oracle;
pub mod report;

pub use analysis::{AnalysisContext, BodyStrategy, GoRawData, LoadOptions, ModuleInfo};
pub use atlas::{AtlasBuilder, AtlasOptions, GoAtlasExtension, GoroutineTopology, Implementation};
pub use config::AtlasConfig;
pub use graph::{ArchGraph, DetailLevel, MetricsSnapshot};
pub use oracle::{GoplsClient, ImplementationOracle, NullOracle};
