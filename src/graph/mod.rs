//! Language-agnostic architecture graph.
//!
//! Entities and relations from any front-end land here; the Go atlas rides
//! along as a named extension block and metrics are computed over the final
//! merged graph.

mod mapper;
pub mod metrics;
pub mod scc;

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::analysis::SourceLocation;
use crate::atlas::GoAtlasExtension;

pub use mapper::ArchGraphMapper;
pub use metrics::{calculate, MetricsSnapshot};

/// Format version of the serialized graph.
pub const GRAPH_VERSION: &str = "1.0";

/// Granularity a metrics snapshot was taken at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetailLevel {
    Package,
    #[default]
    Class,
    Method,
}

impl DetailLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            DetailLevel::Package => "package",
            DetailLevel::Class => "class",
            DetailLevel::Method => "method",
        }
    }
}

impl std::str::FromStr for DetailLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "package" => Ok(DetailLevel::Package),
            "class" => Ok(DetailLevel::Class),
            "method" => Ok(DetailLevel::Method),
            other => Err(format!("unknown detail level '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Class,
    Interface,
    Struct,
    Enum,
    Function,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Private,
    Protected,
}

impl Visibility {
    pub fn from_exported(exported: bool) -> Self {
        if exported {
            Visibility::Public
        } else {
            Visibility::Private
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberKind {
    Field,
    Method,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: MemberKind,
    pub visibility: Visibility,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_type: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Parameter>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    /// `<module-relative package path>.<Name>`.
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: EntityKind,
    pub visibility: Visibility,
    #[serde(default)]
    pub members: Vec<Member>,
    pub source_location: SourceLocation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationType {
    Inheritance,
    Implementation,
    Composition,
    Aggregation,
    Dependency,
}

impl RelationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationType::Inheritance => "inheritance",
            RelationType::Implementation => "implementation",
            RelationType::Composition => "composition",
            RelationType::Aggregation => "aggregation",
            RelationType::Dependency => "dependency",
        }
    }
}

impl fmt::Display for RelationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a relation came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InferenceSource {
    /// Declared in source.
    Explicit,
    /// Derived by a local heuristic.
    Inferred,
    /// Reported by the gopls oracle.
    Gopls,
}

impl InferenceSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            InferenceSource::Explicit => "explicit",
            InferenceSource::Inferred => "inferred",
            InferenceSource::Gopls => "gopls",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relation {
    pub id: String,
    #[serde(rename = "type")]
    pub relation_type: RelationType,
    pub source: String,
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    /// Absent means explicit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inference_source: Option<InferenceSource>,
}

impl Relation {
    /// Whether the relation was derived rather than declared.
    pub fn is_inferred(&self) -> bool {
        matches!(
            self.inference_source,
            Some(InferenceSource::Inferred) | Some(InferenceSource::Gopls)
        )
    }
}

/// Named extension blocks.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Extensions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub go_atlas: Option<GoAtlasExtension>,
}

/// The unified architecture graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchGraph {
    pub version: String,
    pub language: String,
    #[serde(default)]
    pub source_files: Vec<String>,
    pub entities: Vec<Entity>,
    pub relations: Vec<Relation>,
    #[serde(default)]
    pub extensions: Extensions,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<MetricsSnapshot>,
}

impl ArchGraph {
    pub fn new(language: &str) -> Self {
        Self {
            version: GRAPH_VERSION.to_string(),
            language: language.to_string(),
            source_files: Vec::new(),
            entities: Vec::new(),
            relations: Vec::new(),
            extensions: Extensions::default(),
            metrics: None,
        }
    }

    pub fn find_entity(&self, id: &str) -> Option<&Entity> {
        self.entities.iter().find(|e| e.id == id)
    }

    /// Merge another graph in, keeping the first entity per id and the first
    /// relation per `(type, source, target)`.
    pub fn merge(&mut self, other: ArchGraph) {
        let mut entity_ids: HashSet<String> = self.entities.iter().map(|e| e.id.clone()).collect();
        for entity in other.entities {
            if entity_ids.insert(entity.id.clone()) {
                self.entities.push(entity);
            }
        }
        let mut relation_keys: HashSet<(RelationType, String, String)> = self
            .relations
            .iter()
            .map(|r| (r.relation_type, r.source.clone(), r.target.clone()))
            .collect();
        for mut relation in other.relations {
            if relation_keys.insert((relation.relation_type, relation.source.clone(), relation.target.clone())) {
                if self.relations.iter().any(|r| r.id == relation.id) {
                    relation.id = format!("{}-{}", relation.id, self.relations.len());
                }
                self.relations.push(relation);
            }
        }
        self.source_files.extend(other.source_files);
        self.source_files.sort();
        self.source_files.dedup();
        if self.extensions.go_atlas.is_none() {
            self.extensions.go_atlas = other.extensions.go_atlas;
        }
    }
}
