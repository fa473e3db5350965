//! Go atlas extension block: the package, capability, goroutine and flow
//! layers plus run metadata.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::analysis::BodyStrategy;

/// Version of the `goAtlas` extension format.
pub const GO_ATLAS_EXTENSION_VERSION: &str = "2.0";

/// Line-granular location used by topology records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineLocation {
    pub file: String,
    pub line: usize,
}

impl fmt::Display for LineLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

// ========== Goroutine topology ==========

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GoroutineKind {
    Main,
    Spawned,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpawnKind {
    NamedFunc,
    AnonymousFunc,
}

impl SpawnKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SpawnKind::NamedFunc => "named_func",
            SpawnKind::AnonymousFunc => "anonymous_func",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GoroutinePattern {
    WorkerPool,
    Pipeline,
    FanOut,
}

impl GoroutinePattern {
    pub fn as_str(&self) -> &'static str {
        match self {
            GoroutinePattern::WorkerPool => "worker-pool",
            GoroutinePattern::Pipeline => "pipeline",
            GoroutinePattern::FanOut => "fan-out",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoroutineNode {
    /// `<pkg full path>.<Func | Struct.Method>.spawn-<line>`, or
    /// `<pkg full path>.main` for an entry point.
    pub id: String,
    /// Callee name, `<anonymous>` for literals, `main` for entry points.
    pub name: String,
    #[serde(rename = "type")]
    pub kind: GoroutineKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spawn_type: Option<SpawnKind>,
    pub package: String,
    pub location: LineLocation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<GoroutinePattern>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpawnRelation {
    /// Enclosing function or method id.
    pub from: String,
    /// Spawned goroutine node id.
    pub to: String,
    pub spawn_type: SpawnKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelDirection {
    Send,
    Receive,
    Bidirectional,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelInfo {
    /// `chan-<pkg full path>-<line>`.
    pub id: String,
    /// Variable the channel was bound to; empty when unbound.
    pub name: String,
    #[serde(rename = "type")]
    pub channel_type: String,
    pub direction: ChannelDirection,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buffer_size: Option<usize>,
    pub location: LineLocation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelEdgeKind {
    Make,
    Recv,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelEdge {
    /// Function id for `make`, channel id for `recv`.
    pub from: String,
    /// Channel id for `make`, goroutine node id for `recv`.
    pub to: String,
    pub edge_type: ChannelEdgeKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CancellationMechanism {
    Context,
    Channel,
}

/// Cancellation hygiene of one spawned goroutine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoroutineLifecycleSummary {
    pub node_id: String,
    pub spawn_target_name: String,
    /// Target takes a `context.Context` parameter.
    pub receives_context: bool,
    /// False when the target body is unknown or unresolvable.
    pub cancellation_check_available: bool,
    /// Present only when `cancellation_check_available`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_cancellation_check: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancellation_mechanism: Option<CancellationMechanism>,
    pub orphan: bool,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoroutineTopology {
    pub nodes: Vec<GoroutineNode>,
    pub edges: Vec<SpawnRelation>,
    pub channels: Vec<ChannelInfo>,
    pub channel_edges: Vec<ChannelEdge>,
    pub lifecycle: Vec<GoroutineLifecycleSummary>,
}

impl GoroutineTopology {
    pub fn orphan_count(&self) -> usize {
        self.lifecycle.iter().filter(|l| l.orphan).count()
    }

    pub fn find_node(&self, id: &str) -> Option<&GoroutineNode> {
        self.nodes.iter().find(|n| n.id == id)
    }
}

// ========== Package layer ==========

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageKind {
    Internal,
    Cmd,
    Tests,
    Testutil,
    Examples,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageStats {
    pub structs: usize,
    pub interfaces: usize,
    pub functions: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageNode {
    /// Full import path (`<module>/<full path>`).
    pub id: String,
    /// Module-relative path.
    pub name: String,
    #[serde(rename = "type")]
    pub kind: PackageKind,
    pub file_count: usize,
    pub stats: PackageStats,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageDependency {
    pub from: String,
    pub to: String,
    /// Number of files of `from` importing `to`.
    pub strength: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CycleSeverity {
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageCycle {
    pub packages: Vec<String>,
    pub severity: CycleSeverity,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PackageGraph {
    pub nodes: Vec<PackageNode>,
    pub edges: Vec<PackageDependency>,
    pub cycles: Vec<PackageCycle>,
}

// ========== Capability layer ==========

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CapabilityNodeKind {
    Interface,
    Struct,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapabilityNode {
    /// `<pkg full path>.<Name>`, the same id as the graph entity.
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: CapabilityNodeKind,
    pub package: String,
    pub exported: bool,
    pub method_count: usize,
    pub field_count: usize,
    /// Distinct nodes with an edge into this one.
    pub fan_in: usize,
    /// Distinct nodes this one has an edge to.
    pub fan_out: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CapabilityRelationKind {
    Implements,
    Uses,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageContext {
    pub field_type: bool,
    /// `file:line` of every field with this usage.
    pub usage_locations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapabilityRelation {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: CapabilityRelationKind,
    pub source: String,
    pub target: String,
    pub confidence: f64,
    /// Set on `uses` edges whose target is a struct rather than an interface.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub concrete_usage: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<UsageContext>,
}

/// A struct field typed with a concrete module struct instead of an interface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConcreteUsageRisk {
    /// Struct holding the field.
    pub owner: String,
    /// Field type as written, e.g. `*engine.Engine`.
    pub field_type: String,
    /// Node id of the concrete struct.
    pub concrete_type: String,
    /// `file:line` of the first such field.
    pub location: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapabilityGraph {
    pub nodes: Vec<CapabilityNode>,
    pub edges: Vec<CapabilityRelation>,
    #[serde(default)]
    pub concrete_usage_risks: Vec<ConcreteUsageRisk>,
}

impl CapabilityGraph {
    pub fn find_node(&self, id: &str) -> Option<&CapabilityNode> {
        self.nodes.iter().find(|n| n.id == id)
    }
}

// ========== Flow layer ==========

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Any,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Any => "ANY",
        }
    }
}

/// Where a request, command, message or scheduled job enters the program.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryPoint {
    /// `entry-<pkg full path>-<line>`, `entry-<pkg full path>-main`, or
    /// `entry-manual-<function>` for configured entries.
    pub id: String,
    /// `http`, `grpc`, `cli`, `message`, `scheduler` or a configured protocol.
    pub protocol: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<HttpMethod>,
    pub framework: String,
    /// Route path or topic; empty when not a literal.
    pub path: String,
    /// Handler expression; empty for inline function literals.
    pub handler: String,
    #[serde(default)]
    pub middleware: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package: Option<String>,
    pub location: LineLocation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallKind {
    Direct,
    Interface,
    Indirect,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallEdge {
    pub from: String,
    pub to: String,
    #[serde(rename = "type")]
    pub kind: CallKind,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallChain {
    /// `chain-<entry point id>`.
    pub id: String,
    pub entry_point: String,
    pub calls: Vec<CallEdge>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowGraph {
    pub entry_points: Vec<EntryPoint>,
    pub call_chains: Vec<CallChain>,
}

impl FlowGraph {
    pub fn chain_for(&self, entry_id: &str) -> Option<&CallChain> {
        self.call_chains.iter().find(|c| c.entry_point == entry_id)
    }
}

// ========== Extension block ==========

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GoAtlasLayers {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package: Option<PackageGraph>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capability: Option<CapabilityGraph>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goroutine: Option<GoroutineTopology>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flow: Option<FlowGraph>,
}

/// Rough share of the real structure each layer can see, in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LayerCompleteness {
    pub package: f64,
    pub capability: f64,
    pub goroutine: f64,
    pub flow: f64,
}

impl LayerCompleteness {
    pub fn for_strategy(strategy: BodyStrategy) -> Self {
        let (goroutine, flow) = match strategy {
            BodyStrategy::Full => (0.7, 0.6),
            BodyStrategy::Selective => (0.5, 0.6),
            BodyStrategy::None => (0.0, 0.0),
        };
        Self {
            package: 1.0,
            capability: 0.85,
            goroutine,
            flow,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoAtlasMetadata {
    pub function_body_strategy: BodyStrategy,
    pub detected_frameworks: Vec<String>,
    pub gopls_enabled: bool,
    pub exclude_tests: bool,
    /// Functions and methods with an extracted body.
    pub extracted_function_count: usize,
    pub total_function_count: usize,
    /// Protocols the flow layer was restricted to; absent when unfiltered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocols: Option<Vec<String>>,
    pub completeness: LayerCompleteness,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoAtlasExtension {
    pub version: String,
    pub layers: GoAtlasLayers,
    pub metadata: GoAtlasMetadata,
}
