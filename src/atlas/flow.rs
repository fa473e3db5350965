//! Flow layer: entry points and the calls made by their handlers.
//!
//! Entry points are registration calls (`HandleFunc`, `r.Get`, `AddCommand`,
//! `Subscribe`, ...) matched against a per-framework pattern table, limited to
//! the frameworks detected for the module. `main.main` of a main package is an
//! entry point of its own. Only extracted bodies are scanned, so under the
//! `none` strategy the layer holds nothing beyond configured entries.

use std::collections::HashSet;

use phf::phf_map;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::frameworks::{framework_for_import, FrameworkTags};
use super::topology::unique_id;
use super::types::{CallChain, CallEdge, CallKind, EntryPoint, FlowGraph, HttpMethod, LineLocation};
use crate::analysis::{is_stdlib, GoCallExpr, GoFunctionBody, GoPackage, GoRawData};

/// Confidence of a call edge read off a handler body.
const DIRECT_CALL_CONFIDENCE: f64 = 0.7;

/// One way a framework registers a handler.
#[derive(Debug, Clone, Copy)]
struct CallPattern {
    method: Option<&'static str>,
    method_prefix: Option<&'static str>,
    method_suffix: Option<&'static str>,
    protocol: &'static str,
    http_method: Option<HttpMethod>,
    path_arg: Option<usize>,
    handler_arg: Option<usize>,
}

const fn call(method: &'static str, protocol: &'static str, path_arg: Option<usize>, handler_arg: Option<usize>) -> CallPattern {
    CallPattern {
        method: Some(method),
        method_prefix: None,
        method_suffix: None,
        protocol,
        http_method: None,
        path_arg,
        handler_arg,
    }
}

const fn route(method: &'static str, http_method: Option<HttpMethod>) -> CallPattern {
    CallPattern {
        method: Some(method),
        method_prefix: None,
        method_suffix: None,
        protocol: "http",
        http_method,
        path_arg: Some(0),
        handler_arg: Some(1),
    }
}

const GRPC_REGISTER: CallPattern = CallPattern {
    method: None,
    method_prefix: Some("Register"),
    method_suffix: Some("Server"),
    protocol: "grpc",
    http_method: None,
    path_arg: None,
    handler_arg: Some(1),
};

/// Framework tag -> registration calls.
static FRAMEWORK_PATTERNS: phf::Map<&'static str, &'static [CallPattern]> = phf_map! {
    "net/http" => &[route("HandleFunc", None), route("Handle", None)],
    "gorilla/mux" => &[route("HandleFunc", None), route("Handle", None)],
    "gin" => &[
        route("GET", Some(HttpMethod::Get)),
        route("POST", Some(HttpMethod::Post)),
        route("PUT", Some(HttpMethod::Put)),
        route("DELETE", Some(HttpMethod::Delete)),
        route("PATCH", Some(HttpMethod::Patch)),
        route("Any", Some(HttpMethod::Any)),
    ],
    "echo" => &[
        route("GET", Some(HttpMethod::Get)),
        route("POST", Some(HttpMethod::Post)),
        route("PUT", Some(HttpMethod::Put)),
        route("DELETE", Some(HttpMethod::Delete)),
        route("PATCH", Some(HttpMethod::Patch)),
    ],
    "chi" => &[
        route("Get", Some(HttpMethod::Get)),
        route("Post", Some(HttpMethod::Post)),
        route("Put", Some(HttpMethod::Put)),
        route("Delete", Some(HttpMethod::Delete)),
        route("Patch", Some(HttpMethod::Patch)),
    ],
    "cobra" => &[call("AddCommand", "cli", None, Some(0))],
    "grpc" => &[GRPC_REGISTER],
    "kafka-go" => &[call("ConsumePartition", "message", Some(0), None)],
    "sarama" => &[call("ConsumePartition", "message", Some(0), None)],
    "nats" => &[
        call("Subscribe", "message", Some(0), Some(1)),
        call("QueueSubscribe", "message", Some(0), Some(2)),
    ],
    "cron" => &[
        call("AddFunc", "scheduler", Some(0), Some(1)),
        call("AddJob", "scheduler", Some(0), Some(1)),
    ],
};

/// Builtins and conversions never worth listing in a call chain.
const BUILTINS: &[&str] = &[
    "make", "len", "append", "cap", "new", "delete", "copy", "close", "panic", "recover", "print",
    "println", "min", "max", "clear", "int", "int8", "int16", "int32", "int64", "uint", "uint8",
    "uint16", "uint32", "uint64", "string", "bool", "float32", "float64", "byte", "rune", "error",
];

/// Request accessors on the conventional `r *http.Request`.
const REQUEST_ACCESSORS: &[&str] = &["URL", "Context", "Body", "Header", "PathValue", "Method", "Form"];

/// User-defined registration call.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CustomCallPattern {
    /// Exact callee name.
    #[serde(default)]
    pub method: Option<String>,
    /// Callee name suffix, e.g. `Server` for `RegisterFooServer`.
    #[serde(default)]
    pub method_suffix: Option<String>,
    #[serde(default)]
    pub path_arg_index: Option<usize>,
    #[serde(default)]
    pub handler_arg_index: Option<usize>,
}

/// A framework the built-in table does not know.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomFramework {
    pub name: String,
    pub protocol: String,
    #[serde(default)]
    pub patterns: Vec<CustomCallPattern>,
}

/// An entry point declared by hand, e.g. `pkg/worker.(*Consumer).Run`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualEntryPoint {
    pub function: String,
    pub protocol: String,
}

/// Flow layer settings.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FlowOptions {
    /// Keep only entry points of these protocols; empty keeps all.
    #[serde(default)]
    pub protocols: Vec<String>,
    #[serde(default)]
    pub custom_frameworks: Vec<CustomFramework>,
    #[serde(default)]
    pub entry_points: Vec<ManualEntryPoint>,
}

/// A pattern enabled for this run, borrowed from the table or the options.
struct ActivePattern<'a> {
    framework: &'a str,
    method: Option<&'a str>,
    method_prefix: Option<&'a str>,
    method_suffix: Option<&'a str>,
    protocol: &'a str,
    http_method: Option<HttpMethod>,
    path_arg: Option<usize>,
    handler_arg: Option<usize>,
}

impl ActivePattern<'_> {
    fn matches(&self, call: &GoCallExpr) -> bool {
        let name = call.function_name.as_str();
        if self.method.is_none() && self.method_prefix.is_none() && self.method_suffix.is_none() {
            return false;
        }
        self.method.map_or(true, |m| name == m)
            && self.method_prefix.map_or(true, |p| name.starts_with(p))
            && self.method_suffix.map_or(true, |s| name.ends_with(s))
    }

    fn path<'c>(&self, call: &'c GoCallExpr) -> &'c str {
        self.path_arg
            .and_then(|i| call.args.get(i))
            .map_or("", |a| a.trim())
    }
}

/// Build the flow graph for the detected frameworks.
pub fn build(raw: &GoRawData, frameworks: &FrameworkTags, options: &FlowOptions) -> FlowGraph {
    let patterns = active_patterns(frameworks, options);
    let mut used = HashSet::new();
    let mut entry_points = Vec::new();

    for package in &raw.packages {
        let bodies = package
            .functions
            .iter()
            .filter_map(|f| f.body.as_ref())
            .chain(
                package
                    .structs
                    .iter()
                    .flat_map(|s| s.methods.iter())
                    .filter_map(|m| m.body.as_ref()),
            );
        for body in bodies {
            for call in &body.calls {
                if let Some(entry) = match_call(package, body, call, &patterns, &mut used) {
                    entry_points.push(entry);
                }
            }
        }

        if package.is_main() && frameworks.contains("main") {
            if let Some(main) = package.find_function("main") {
                entry_points.push(EntryPoint {
                    id: unique_id(format!("entry-{}-main", package.full_name), &mut used),
                    protocol: "cli".to_string(),
                    method: None,
                    framework: "main".to_string(),
                    path: String::new(),
                    handler: "main.main".to_string(),
                    middleware: Vec::new(),
                    package: Some(package.full_name.clone()),
                    location: LineLocation {
                        file: main.location.file.clone(),
                        line: main.location.start_line,
                    },
                });
            }
        }
    }

    for manual in &options.entry_points {
        let slug: String = manual
            .function
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();
        entry_points.push(EntryPoint {
            id: unique_id(format!("entry-manual-{}", slug), &mut used),
            protocol: manual.protocol.clone(),
            method: None,
            framework: "manual".to_string(),
            path: String::new(),
            handler: manual.function.clone(),
            middleware: Vec::new(),
            package: None,
            location: LineLocation {
                file: "manual".to_string(),
                line: 0,
            },
        });
    }

    if !options.protocols.is_empty() {
        entry_points.retain(|e| options.protocols.contains(&e.protocol));
    }

    let call_chains = entry_points
        .iter()
        .map(|entry| CallChain {
            id: format!("chain-{}", entry.id),
            entry_point: entry.id.clone(),
            calls: trace_calls(raw, entry),
        })
        .collect();

    debug!(entry_points = entry_points.len(), "flow graph built");
    FlowGraph {
        entry_points,
        call_chains,
    }
}

fn active_patterns<'a>(frameworks: &'a FrameworkTags, options: &'a FlowOptions) -> Vec<ActivePattern<'a>> {
    let mut active = Vec::new();
    for tag in frameworks {
        let Some(patterns) = FRAMEWORK_PATTERNS.get(tag.as_str()) else {
            continue;
        };
        for p in patterns.iter() {
            active.push(ActivePattern {
                framework: tag.as_str(),
                method: p.method,
                method_prefix: p.method_prefix,
                method_suffix: p.method_suffix,
                protocol: p.protocol,
                http_method: p.http_method,
                path_arg: p.path_arg,
                handler_arg: p.handler_arg,
            });
        }
    }
    for custom in &options.custom_frameworks {
        for p in &custom.patterns {
            active.push(ActivePattern {
                framework: custom.name.as_str(),
                method: p.method.as_deref(),
                method_prefix: None,
                method_suffix: p.method_suffix.as_deref(),
                protocol: custom.protocol.as_str(),
                http_method: None,
                path_arg: Some(p.path_arg_index.unwrap_or(0)),
                handler_arg: Some(p.handler_arg_index.unwrap_or(1)),
            });
        }
    }
    active
}

/// First pattern a call satisfies. A call qualified by an import that a known
/// framework owns only matches that framework's patterns; HTTP routes need a
/// path containing `/`.
fn match_call(
    package: &GoPackage,
    body: &GoFunctionBody,
    call: &GoCallExpr,
    patterns: &[ActivePattern],
    used: &mut HashSet<String>,
) -> Option<EntryPoint> {
    let owner = call
        .qualifier
        .as_deref()
        .and_then(|q| package.import_named(q))
        .and_then(|import| framework_for_import(&import.path));

    let pattern = patterns.iter().find(|p| {
        p.matches(call)
            && owner.map_or(true, |owner| owner == p.framework)
            && (p.protocol != "http" || p.path(call).contains('/'))
    })?;

    let handler = pattern
        .handler_arg
        .and_then(|i| call.args.get(i))
        .map(|a| a.trim())
        .filter(|a| !a.starts_with("func("))
        .unwrap_or("")
        .to_string();
    let middleware = if pattern.protocol == "http" {
        middleware_before(body, call)
    } else {
        Vec::new()
    };

    Some(EntryPoint {
        id: unique_id(
            format!("entry-{}-{}", package.full_name, call.location.start_line),
            used,
        ),
        protocol: pattern.protocol.to_string(),
        method: pattern.http_method,
        framework: pattern.framework.to_string(),
        path: pattern.path(call).to_string(),
        handler,
        middleware,
        package: Some(package.full_name.clone()),
        location: LineLocation {
            file: call.location.file.clone(),
            line: call.location.start_line,
        },
    })
}

/// Arguments of `Use(...)` calls on the same router earlier in the body.
fn middleware_before(body: &GoFunctionBody, route: &GoCallExpr) -> Vec<String> {
    let Some(router) = route.qualifier.as_deref() else {
        return Vec::new();
    };
    body.calls
        .iter()
        .filter(|c| {
            c.function_name == "Use"
                && c.qualifier.as_deref() == Some(router)
                && c.location.start_line < route.location.start_line
        })
        .flat_map(|c| c.args.iter().map(|a| a.trim().to_string()))
        .collect()
}

/// Function or method name a handler expression refers to:
/// `h.List` -> `List`, `api.NewHandler(s)` -> `NewHandler`,
/// `pkg/worker.(*Consumer).Run` -> `Run`.
fn handler_name(handler: &str) -> Option<&str> {
    let callee = handler.split('(').next().unwrap_or(handler);
    let name = callee.rsplit('.').next().unwrap_or(callee).trim();
    if is_identifier(name) {
        return Some(name);
    }
    let last = handler.rsplit('.').next()?.trim_end_matches(')').trim();
    is_identifier(last).then_some(last)
}

fn is_identifier(s: &str) -> bool {
    !s.is_empty()
        && !s.starts_with(|c: char| c.is_ascii_digit())
        && s.chars().all(|c| c.is_alphanumeric() || c == '_')
}

/// Calls made by the handler's body. Bodies in the entry's own package win;
/// other packages are searched only when it has none.
fn trace_calls(raw: &GoRawData, entry: &EntryPoint) -> Vec<CallEdge> {
    let Some(name) = handler_name(&entry.handler) else {
        return Vec::new();
    };

    let own: Vec<(&GoPackage, &GoFunctionBody)> = raw
        .packages
        .iter()
        .filter(|p| Some(&p.full_name) == entry.package.as_ref())
        .flat_map(|p| handler_bodies(p, name))
        .collect();
    let bodies = if own.is_empty() {
        raw.packages.iter().flat_map(|p| handler_bodies(p, name)).collect()
    } else {
        own
    };

    let mut seen = HashSet::new();
    let mut calls = Vec::new();
    for (package, body) in bodies {
        for call in &body.calls {
            if is_noisy(package, call) {
                continue;
            }
            let to = call.qualified_name();
            if !seen.insert(to.clone()) {
                continue;
            }
            calls.push(CallEdge {
                from: entry.handler.clone(),
                to,
                kind: CallKind::Direct,
                confidence: DIRECT_CALL_CONFIDENCE,
            });
        }
    }
    calls
}

fn handler_bodies<'a>(package: &'a GoPackage, name: &'a str) -> impl Iterator<Item = (&'a GoPackage, &'a GoFunctionBody)> {
    let functions = package
        .functions
        .iter()
        .filter(move |f| f.name == name)
        .filter_map(|f| f.body.as_ref());
    let methods = package
        .structs
        .iter()
        .flat_map(|s| s.methods.iter())
        .filter(move |m| m.name == name)
        .filter_map(|m| m.body.as_ref());
    functions.chain(methods).map(move |body| (package, body))
}

/// Builtins, standard library calls, and writes to the response or reads of
/// the request, context and error values.
fn is_noisy(package: &GoPackage, call: &GoCallExpr) -> bool {
    let Some(qualifier) = call.qualifier.as_deref() else {
        return BUILTINS.contains(&call.function_name.as_str());
    };
    if let Some(import) = package.import_named(qualifier) {
        return is_stdlib(&import.path);
    }
    let root = qualifier.split('.').next().unwrap_or(qualifier);
    match root {
        "w" | "ctx" | "err" => true,
        "r" => {
            let accessor = qualifier.split('.').nth(1).unwrap_or(call.function_name.as_str());
            REQUEST_ACCESSORS.contains(&accessor)
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{GoFunction, GoImport, GoMethod, GoStruct, SourceLocation, REGISTRATION_CALLS};

    fn call(qualifier: Option<&str>, name: &str, args: &[&str], line: usize) -> GoCallExpr {
        GoCallExpr {
            function_name: name.to_string(),
            qualifier: qualifier.map(str::to_string),
            args: args.iter().map(|a| a.to_string()).collect(),
            location: SourceLocation::at_line("pkg/api/routes.go", line),
        }
    }

    fn import(path: &str) -> GoImport {
        GoImport {
            path: path.to_string(),
            alias: None,
            location: SourceLocation::default(),
            kind: None,
        }
    }

    fn function(name: &str, calls: Vec<GoCallExpr>) -> GoFunction {
        GoFunction {
            name: name.to_string(),
            package_name: "api".to_string(),
            parameters: vec![],
            return_types: vec![],
            exported: true,
            location: SourceLocation::at_line("pkg/api/routes.go", 1),
            body: Some(GoFunctionBody {
                calls,
                ..Default::default()
            }),
        }
    }

    fn tags(list: &[&str]) -> FrameworkTags {
        list.iter().map(|t| t.to_string()).collect()
    }

    fn api_package() -> GoPackage {
        let mut package = GoPackage::new("api", "pkg/api");
        package.imports = vec![
            import("net/http"),
            import("github.com/go-chi/chi/v5"),
            import("encoding/json"),
            import("example.com/shop/pkg/store"),
        ];
        package.functions.push(function(
            "Routes",
            vec![
                call(Some("chi"), "NewRouter", &[], 10),
                call(Some("r"), "Use", &["logging"], 11),
                call(Some("r"), "Get", &["/items/{id}", "h.Show"], 12),
                call(Some("r"), "Post", &["/items", "func(w http.ResponseWriter, r *http.Request) {}"], 13),
                call(Some("http"), "HandleFunc", &["/health", "health"], 14),
                call(Some("q"), "Get", &["id"], 15),
            ],
        ));
        package.functions.push(function(
            "health",
            vec![call(Some("w"), "WriteHeader", &["200"], 30)],
        ));
        package.structs.push(GoStruct {
            name: "Handler".to_string(),
            package_name: "api".to_string(),
            fields: vec![],
            methods: vec![GoMethod {
                name: "Show".to_string(),
                receiver: Some("h".to_string()),
                receiver_type: Some("Handler".to_string()),
                parameters: vec![],
                return_types: vec![],
                exported: true,
                location: SourceLocation::at_line("pkg/api/handler.go", 20),
                body: Some(GoFunctionBody {
                    calls: vec![
                        call(Some("r"), "PathValue", &["id"], 21),
                        call(Some("h.store"), "Get", &["r.Context()", "id"], 22),
                        call(Some("json"), "NewEncoder", &["w"], 23),
                        call(Some("store"), "Validate", &["item"], 24),
                        call(None, "len", &["item.Name"], 25),
                        call(Some("h.store"), "Get", &["r.Context()", "id"], 26),
                    ],
                    ..Default::default()
                }),
            }],
            embedded_types: vec![],
            exported: true,
            location: SourceLocation::at_line("pkg/api/handler.go", 5),
        });
        package
    }

    fn raw(packages: Vec<GoPackage>) -> GoRawData {
        GoRawData {
            packages,
            module_root: "/src/shop".to_string(),
            module_name: "example.com/shop".to_string(),
        }
    }

    #[test]
    fn test_routes_detected_for_active_frameworks() {
        let flow = build(&raw(vec![api_package()]), &tags(&["chi", "net/http"]), &FlowOptions::default());

        let entries: Vec<(&str, &str, Option<HttpMethod>, &str, &str)> = flow
            .entry_points
            .iter()
            .map(|e| (e.id.as_str(), e.framework.as_str(), e.method, e.path.as_str(), e.handler.as_str()))
            .collect();
        assert_eq!(
            entries,
            vec![
                ("entry-pkg/api-12", "chi", Some(HttpMethod::Get), "/items/{id}", "h.Show"),
                ("entry-pkg/api-13", "chi", Some(HttpMethod::Post), "/items", ""),
                ("entry-pkg/api-14", "net/http", None, "/health", "health"),
            ]
        );
        assert_eq!(flow.entry_points[0].middleware, vec!["logging"]);
        assert!(flow.entry_points[2].middleware.is_empty());
        assert_eq!(flow.entry_points[0].location.to_string(), "pkg/api/routes.go:12");
    }

    #[test]
    fn test_inactive_framework_patterns_ignored() {
        let flow = build(&raw(vec![api_package()]), &tags(&["net/http"]), &FlowOptions::default());
        let ids: Vec<&str> = flow.entry_points.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["entry-pkg/api-14"]);
    }

    #[test]
    fn test_call_chain_filters_noise() {
        let flow = build(&raw(vec![api_package()]), &tags(&["chi", "net/http"]), &FlowOptions::default());

        let chain = flow.chain_for("entry-pkg/api-12").unwrap();
        assert_eq!(chain.id, "chain-entry-pkg/api-12");
        let targets: Vec<&str> = chain.calls.iter().map(|c| c.to.as_str()).collect();
        assert_eq!(targets, vec!["h.store.Get", "store.Validate"]);
        assert!(chain.calls.iter().all(|c| c.from == "h.Show" && c.kind == CallKind::Direct));
        assert_eq!(chain.calls[0].confidence, DIRECT_CALL_CONFIDENCE);

        assert!(flow.chain_for("entry-pkg/api-13").unwrap().calls.is_empty());
        assert!(flow.chain_for("entry-pkg/api-14").unwrap().calls.is_empty());
    }

    #[test]
    fn test_main_and_manual_entries_with_protocol_filter() {
        let mut main = GoPackage::new("main", "cmd/tool");
        main.functions.push(function("main", vec![call(Some("cmd"), "Execute", &[], 5)]));
        main.functions[0].location = SourceLocation::at_line("cmd/tool/main.go", 3);
        let options = FlowOptions {
            entry_points: vec![ManualEntryPoint {
                function: "pkg/worker.(*Consumer).Run".to_string(),
                protocol: "message".to_string(),
            }],
            ..Default::default()
        };
        let data = raw(vec![main, api_package()]);

        let flow = build(&data, &tags(&["main", "net/http"]), &options);
        let ids: Vec<&str> = flow.entry_points.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "entry-cmd/tool-main",
                "entry-pkg/api-14",
                "entry-manual-pkg_worker___Consumer__Run",
            ]
        );
        let main_chain = flow.chain_for("entry-cmd/tool-main").unwrap();
        assert_eq!(main_chain.calls[0].to, "cmd.Execute");
        assert_eq!(flow.entry_points[2].location.line, 0);

        let filtered = build(
            &data,
            &tags(&["main", "net/http"]),
            &FlowOptions {
                protocols: vec!["message".to_string()],
                ..options
            },
        );
        assert_eq!(filtered.entry_points.len(), 1);
        assert_eq!(filtered.call_chains.len(), 1);
        assert_eq!(filtered.entry_points[0].framework, "manual");
    }

    #[test]
    fn test_custom_framework_and_grpc() {
        let mut svc = GoPackage::new("svc", "pkg/svc");
        svc.imports.push(import("example.com/shop/gen/pb"));
        svc.functions.push(function(
            "Register",
            vec![
                call(Some("pb"), "RegisterOrdersServer", &["srv", "&orders{}"], 7),
                call(Some("bus"), "On", &["orders.created", "handleCreated"], 8),
                call(None, "NewServer", &[], 9),
            ],
        ));
        let options = FlowOptions {
            custom_frameworks: vec![CustomFramework {
                name: "acme-bus".to_string(),
                protocol: "message".to_string(),
                patterns: vec![CustomCallPattern {
                    method: Some("On".to_string()),
                    ..Default::default()
                }],
            }],
            ..Default::default()
        };

        let flow = build(&raw(vec![svc]), &tags(&["grpc", "net/http"]), &options);
        let entries: Vec<(&str, &str, &str, &str)> = flow
            .entry_points
            .iter()
            .map(|e| (e.framework.as_str(), e.protocol.as_str(), e.path.as_str(), e.handler.as_str()))
            .collect();
        assert_eq!(
            entries,
            vec![
                ("grpc", "grpc", "", "&orders{}"),
                ("acme-bus", "message", "orders.created", "handleCreated"),
            ]
        );
    }

    #[test]
    fn test_same_line_registrations_get_unique_ids() {
        let mut package = GoPackage::new("api", "pkg/api");
        package.functions.push(function(
            "Routes",
            vec![
                call(Some("mux"), "HandleFunc", &["/a", "a"], 4),
                call(Some("mux"), "HandleFunc", &["/b", "b"], 4),
            ],
        ));
        let flow = build(&raw(vec![package]), &tags(&["net/http"]), &FlowOptions::default());
        let ids: Vec<&str> = flow.entry_points.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["entry-pkg/api-4", "entry-pkg/api-4-2"]);
    }

    #[test]
    fn test_handler_name() {
        assert_eq!(handler_name("h.List"), Some("List"));
        assert_eq!(handler_name("api.NewHandler(s)"), Some("NewHandler"));
        assert_eq!(handler_name("pkg/worker.(*Consumer).Run"), Some("Run"));
        assert_eq!(handler_name("main.main"), Some("main"));
        assert_eq!(handler_name(""), None);
    }

    #[test]
    fn test_selective_extraction_keeps_every_registration_body() {
        for patterns in FRAMEWORK_PATTERNS.values() {
            for pattern in patterns.iter() {
                if let Some(method) = pattern.method {
                    assert!(REGISTRATION_CALLS.contains(&method), "{} not extracted", method);
                }
            }
        }
    }
}
