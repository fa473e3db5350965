//! Framework fingerprinting.
//!
//! Three additive layers: go.mod requirements, import paths, and structural
//! signatures. `net/http` is always present since the standard library is.

use std::collections::{BTreeMap, BTreeSet};

use phf::phf_map;
use tracing::debug;

use crate::analysis::{has_path_prefix, GoMethod, GoRawData, ModuleInfo};

/// Detected framework tags, ordered for stable output.
pub type FrameworkTags = BTreeSet<String>;

/// Tag added unconditionally.
pub const STANDARD_NETWORKING: &str = "net/http";

/// Module path prefix -> framework tag, matched against go.mod and imports.
static MODULE_FRAMEWORKS: phf::Map<&'static str, &'static str> = phf_map! {
    "github.com/gin-gonic/gin" => "gin",
    "github.com/labstack/echo" => "echo",
    "github.com/go-chi/chi" => "chi",
    "github.com/gorilla/mux" => "gorilla/mux",
    "github.com/gofiber/fiber" => "fiber",
    "google.golang.org/grpc" => "grpc",
    "github.com/spf13/cobra" => "cobra",
    "github.com/urfave/cli" => "urfave/cli",
    "github.com/segmentio/kafka-go" => "kafka-go",
    "github.com/Shopify/sarama" => "sarama",
    "github.com/IBM/sarama" => "sarama",
    "github.com/nats-io/nats.go" => "nats",
    "github.com/robfig/cron" => "cron",
};

/// Import-only table: frameworks whose import path differs from what go.mod
/// usually declares.
static IMPORT_FRAMEWORKS: phf::Map<&'static str, &'static str> = phf_map! {
    "github.com/beego/beego" => "beego",
    "github.com/cloudwego/hertz" => "hertz",
    "github.com/kataras/iris" => "iris",
    "github.com/confluentinc/confluent-kafka-go" => "confluent-kafka",
};

/// Framework detector with optional user-supplied prefix mappings.
#[derive(Debug, Clone, Default)]
pub struct FrameworkDetector {
    extra: BTreeMap<String, String>,
}

impl FrameworkDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add module path prefix -> tag mappings on top of the built-in tables.
    pub fn with_extra(extra: BTreeMap<String, String>) -> Self {
        Self { extra }
    }

    /// Run all layers.
    pub fn detect(&self, module: Option<&ModuleInfo>, raw: &GoRawData) -> FrameworkTags {
        let mut found = FrameworkTags::new();
        found.insert(STANDARD_NETWORKING.to_string());

        if let Some(module) = module {
            for path in module.dependency_paths() {
                self.match_module_path(path, &mut found);
            }
        }

        for package in &raw.packages {
            for import in &package.imports {
                self.match_module_path(&import.path, &mut found);
                for (prefix, tag) in IMPORT_FRAMEWORKS.entries() {
                    if has_path_prefix(&import.path, prefix) {
                        found.insert(tag.to_string());
                    }
                }
            }
        }

        for package in &raw.packages {
            if package.is_main() {
                found.insert("main".to_string());
            }
            let serves_http = package
                .structs
                .iter()
                .flat_map(|s| s.methods.iter())
                .any(is_serve_http);
            if serves_http {
                found.insert("serve-http".to_string());
            }
        }

        debug!(frameworks = ?found, "framework detection finished");
        found
    }

    fn match_module_path(&self, path: &str, found: &mut FrameworkTags) {
        for (prefix, tag) in MODULE_FRAMEWORKS.entries() {
            if has_path_prefix(path, prefix) {
                found.insert(tag.to_string());
            }
        }
        for (prefix, tag) in &self.extra {
            if has_path_prefix(path, prefix) {
                found.insert(tag.clone());
            }
        }
    }
}

/// Framework tag owning an import path, from the built-in tables.
pub fn framework_for_import(import_path: &str) -> Option<&'static str> {
    if import_path == STANDARD_NETWORKING {
        return Some(STANDARD_NETWORKING);
    }
    MODULE_FRAMEWORKS
        .entries()
        .chain(IMPORT_FRAMEWORKS.entries())
        .find(|(prefix, _)| has_path_prefix(import_path, prefix))
        .map(|(_, tag)| *tag)
}

/// `ServeHTTP(http.ResponseWriter, *http.Request)`: name, arity and both
/// parameter types must match.
pub fn is_serve_http(method: &GoMethod) -> bool {
    if method.name != "ServeHTTP" || method.parameters.len() != 2 {
        return false;
    }
    let writer = method.parameters[0].type_name.as_str();
    let request = method.parameters[1].type_name.as_str();
    (writer == "http.ResponseWriter" || writer.ends_with(".ResponseWriter"))
        && (request == "*http.Request" || request.ends_with(".Request"))
}
