//! Go front-end using tree-sitter.
//!
//! Extracts:
//! - Package clause and imports
//! - Struct and interface declarations (fields, embedded types, method sets)
//! - Free functions and methods with receivers
//! - Function bodies (calls, `go` statements, channel operations) per
//!   `BodyStrategy`

use std::collections::HashSet;

use streaming_iterator::StreamingIterator;
use tree_sitter::{Language, Node, Parser, Query, QueryCursor};

use crate::analysis::facts::{
    is_exported, ChannelOpKind, FileFacts, GoCallExpr, GoChannelOp, GoField, GoFunction,
    GoFunctionBody, GoImport, GoInterface, GoMethod, GoSpawnStmt, GoStruct, SourceLocation,
    SpawnTarget,
};
use crate::analysis::traits::{BodyStrategy, LanguageAnalyzer, ParsedFile};

/// Tree-sitter query for extracting imports.
const IMPORT_QUERY: &str = r#"
(import_declaration
  (import_spec
    name: (package_identifier)? @alias
    path: (interpreted_string_literal) @path
  )
) @import

(import_declaration
  (import_spec_list
    (import_spec
      name: (package_identifier)? @alias
      path: (interpreted_string_literal) @path
    ) @import_item
  )
) @import_group
"#;

/// Tree-sitter query for package declaration.
const PACKAGE_QUERY: &str = r#"
(package_clause
  (package_identifier) @package_name
)
"#;

/// Callee names that register entry points: HTTP routes, CLI commands,
/// message consumers and scheduled jobs.
pub const REGISTRATION_CALLS: &[&str] = &[
    "HandleFunc", "Handle", "GET", "POST", "PUT", "DELETE", "PATCH", "Any", "Get", "Post", "Put",
    "Delete", "Patch", "AddCommand", "ConsumePartition", "Subscribe", "QueueSubscribe", "AddFunc",
    "AddJob",
];

/// Route verbs common enough as plain method names (`cache.Get(key)`) that
/// they only count with a literal path as first argument.
const AMBIGUOUS_ROUTE_VERBS: &[&str] = &["Any", "Get", "Post", "Put", "Delete", "Patch"];

/// `RegisterFooServer(grpcServer, impl)`.
fn is_grpc_registration(name: &str) -> bool {
    name.len() > "RegisterServer".len() && name.starts_with("Register") && name.ends_with("Server")
}

/// Go language analyzer.
pub struct GoAnalyzer {
    language: Language,
}

impl GoAnalyzer {
    /// Create a new Go analyzer.
    pub fn new() -> Self {
        Self {
            language: tree_sitter_go::LANGUAGE.into(),
        }
    }

    /// Create a new parser for this thread.
    fn create_parser(&self) -> anyhow::Result<Parser> {
        let mut parser = Parser::new();
        parser.set_language(&self.language)?;
        Ok(parser)
    }

    /// Extract the package name from a parsed file.
    fn extract_package(&self, parsed: &ParsedFile) -> Option<String> {
        let query = Query::new(&self.language, PACKAGE_QUERY).ok()?;
        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(&query, parsed.tree.root_node(), &parsed.source[..]);

        if let Some(m) = matches.next() {
            for capture in m.captures {
                let name = query.capture_names()[capture.index as usize];
                if name == "package_name" {
                    return Some(parsed.node_text(capture.node).to_string());
                }
            }
        }
        None
    }

    /// Extract imports from a parsed file.
    fn extract_imports(&self, parsed: &ParsedFile) -> anyhow::Result<Vec<GoImport>> {
        let query = Query::new(&self.language, IMPORT_QUERY)?;
        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(&query, parsed.tree.root_node(), &parsed.source[..]);

        let mut imports = Vec::new();
        let mut seen_paths = HashSet::new();

        while let Some(m) = matches.next() {
            let mut path = String::new();
            let mut alias = None;
            let mut import_node = None;

            for capture in m.captures {
                let name = query.capture_names()[capture.index as usize];
                match name {
                    "path" => {
                        path = parsed.node_text(capture.node).trim_matches('"').to_string();
                        import_node = Some(capture.node);
                    }
                    "alias" => {
                        alias = Some(parsed.node_text(capture.node).to_string());
                    }
                    _ => {}
                }
            }

            if path.is_empty() || !seen_paths.insert(path.clone()) {
                continue;
            }
            if let Some(node) = import_node {
                imports.push(GoImport {
                    path,
                    alias,
                    location: SourceLocation::from_node(node, &parsed.path),
                    kind: None,
                });
            }
        }

        imports.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(imports)
    }

    /// Walk top-level declarations into `facts`.
    fn extract_declarations(
        &self,
        parsed: &ParsedFile,
        package_name: &str,
        strategy: BodyStrategy,
        facts: &mut FileFacts,
    ) {
        let root = parsed.tree.root_node();
        let mut cursor = root.walk();
        for node in root.named_children(&mut cursor) {
            match node.kind() {
                "function_declaration" => {
                    if let Some(func) = self.extract_function(parsed, node, package_name, strategy) {
                        facts.functions.push(func);
                    }
                }
                "method_declaration" => {
                    if let Some(method) = self.extract_method(parsed, node, strategy) {
                        facts.methods.push(method);
                    }
                }
                "type_declaration" => {
                    self.extract_type_declaration(parsed, node, package_name, facts);
                }
                _ => {}
            }
        }
    }

    fn extract_type_declaration(
        &self,
        parsed: &ParsedFile,
        decl: Node,
        package_name: &str,
        facts: &mut FileFacts,
    ) {
        let mut cursor = decl.walk();
        for spec in decl.named_children(&mut cursor) {
            if spec.kind() != "type_spec" {
                continue;
            }
            let (Some(name_node), Some(type_node)) =
                (spec.child_by_field_name("name"), spec.child_by_field_name("type"))
            else {
                continue;
            };
            let name = parsed.node_text(name_node).to_string();
            let location = type_location(parsed, spec, name_node);

            match type_node.kind() {
                "struct_type" => {
                    let (fields, embedded_types) = self.extract_struct_fields(parsed, type_node);
                    facts.structs.push(GoStruct {
                        exported: is_exported(&name),
                        name,
                        package_name: package_name.to_string(),
                        fields,
                        methods: Vec::new(),
                        embedded_types,
                        location,
                    });
                }
                "interface_type" => {
                    let (methods, embedded_interfaces) =
                        self.extract_interface_elements(parsed, type_node);
                    facts.interfaces.push(GoInterface {
                        exported: is_exported(&name),
                        name,
                        package_name: package_name.to_string(),
                        methods,
                        embedded_interfaces,
                        location,
                    });
                }
                _ => {}
            }
        }
    }

    /// Named fields and embedded type names of a struct body.
    fn extract_struct_fields(&self, parsed: &ParsedFile, struct_type: Node) -> (Vec<GoField>, Vec<String>) {
        let mut fields = Vec::new();
        let mut embedded = Vec::new();

        let mut cursor = struct_type.walk();
        let Some(list) = struct_type
            .named_children(&mut cursor)
            .find(|n| n.kind() == "field_declaration_list")
        else {
            return (fields, embedded);
        };

        let mut list_cursor = list.walk();
        for decl in list.named_children(&mut list_cursor) {
            if decl.kind() != "field_declaration" {
                continue;
            }
            let Some(type_node) = decl.child_by_field_name("type") else {
                continue;
            };
            let type_name = parsed.node_text(type_node).to_string();
            let tag = decl
                .child_by_field_name("tag")
                .map(|t| parsed.node_text(t).trim_matches('`').to_string());

            let mut name_cursor = decl.walk();
            let names: Vec<Node> = decl.children_by_field_name("name", &mut name_cursor).collect();
            if names.is_empty() {
                embedded.push(type_name.trim_start_matches('*').to_string());
                continue;
            }
            for name_node in names {
                let name = parsed.node_text(name_node).to_string();
                fields.push(GoField {
                    exported: is_exported(&name),
                    name,
                    type_name: type_name.clone(),
                    tag: tag.clone(),
                    location: SourceLocation::from_node(decl, &parsed.path),
                });
            }
        }

        (fields, embedded)
    }

    /// Method signatures and embedded interface names of an interface body.
    fn extract_interface_elements(
        &self,
        parsed: &ParsedFile,
        interface_type: Node,
    ) -> (Vec<GoMethod>, Vec<String>) {
        let mut methods = Vec::new();
        let mut embedded = Vec::new();

        let mut cursor = interface_type.walk();
        for elem in interface_type.named_children(&mut cursor) {
            match elem.kind() {
                "method_elem" | "method_spec" => {
                    let Some(name_node) = elem.child_by_field_name("name") else {
                        continue;
                    };
                    let name = parsed.node_text(name_node).to_string();
                    methods.push(GoMethod {
                        exported: is_exported(&name),
                        name,
                        receiver: None,
                        receiver_type: None,
                        parameters: elem
                            .child_by_field_name("parameters")
                            .map(|p| self.extract_parameters(parsed, p))
                            .unwrap_or_default(),
                        return_types: self.extract_results(parsed, elem.child_by_field_name("result")),
                        location: SourceLocation::from_node(elem, &parsed.path),
                        body: None,
                    });
                }
                "type_elem" | "constraint_elem" | "type_identifier" | "qualified_type" => {
                    let text = parsed.node_text(elem).trim();
                    // Union and approximation elements are type-set constraints.
                    if !text.is_empty() && !text.contains('|') && !text.starts_with('~') {
                        embedded.push(text.to_string());
                    }
                }
                _ => {}
            }
        }

        (methods, embedded)
    }

    /// Parameters of a `parameter_list`, one entry per declared name.
    fn extract_parameters(&self, parsed: &ParsedFile, list: Node) -> Vec<GoField> {
        let mut params = Vec::new();
        let mut cursor = list.walk();
        for decl in list.named_children(&mut cursor) {
            let variadic = match decl.kind() {
                "parameter_declaration" => false,
                "variadic_parameter_declaration" => true,
                _ => continue,
            };
            let Some(type_node) = decl.child_by_field_name("type") else {
                continue;
            };
            let mut type_name = parsed.node_text(type_node).to_string();
            if variadic {
                type_name = format!("...{}", type_name);
            }

            let mut name_cursor = decl.walk();
            let names: Vec<String> = decl
                .children_by_field_name("name", &mut name_cursor)
                .map(|n| parsed.node_text(n).to_string())
                .collect();
            let location = SourceLocation::from_node(decl, &parsed.path);

            if names.is_empty() {
                params.push(GoField {
                    name: String::new(),
                    type_name,
                    tag: None,
                    exported: false,
                    location,
                });
            } else {
                for name in names {
                    params.push(GoField {
                        exported: is_exported(&name),
                        name,
                        type_name: type_name.clone(),
                        tag: None,
                        location: location.clone(),
                    });
                }
            }
        }
        params
    }

    /// Result types: a single type or a (possibly named) parameter list.
    fn extract_results(&self, parsed: &ParsedFile, result: Option<Node>) -> Vec<String> {
        match result {
            None => Vec::new(),
            Some(node) if node.kind() == "parameter_list" => self
                .extract_parameters(parsed, node)
                .into_iter()
                .map(|p| p.type_name)
                .collect(),
            Some(node) => vec![parsed.node_text(node).to_string()],
        }
    }

    fn extract_function(
        &self,
        parsed: &ParsedFile,
        node: Node,
        package_name: &str,
        strategy: BodyStrategy,
    ) -> Option<GoFunction> {
        let name = parsed.node_text(node.child_by_field_name("name")?).to_string();
        Some(GoFunction {
            exported: is_exported(&name),
            name,
            package_name: package_name.to_string(),
            parameters: node
                .child_by_field_name("parameters")
                .map(|p| self.extract_parameters(parsed, p))
                .unwrap_or_default(),
            return_types: self.extract_results(parsed, node.child_by_field_name("result")),
            location: SourceLocation::from_node(node, &parsed.path),
            body: node
                .child_by_field_name("body")
                .and_then(|b| self.extract_body(parsed, b, strategy)),
        })
    }

    fn extract_method(&self, parsed: &ParsedFile, node: Node, strategy: BodyStrategy) -> Option<GoMethod> {
        let name = parsed.node_text(node.child_by_field_name("name")?).to_string();

        let receiver_list = node.child_by_field_name("receiver")?;
        let mut cursor = receiver_list.walk();
        let receiver_decl = receiver_list
            .named_children(&mut cursor)
            .find(|n| n.kind() == "parameter_declaration")?;
        let receiver = receiver_decl
            .child_by_field_name("name")
            .map(|n| parsed.node_text(n).to_string());
        let receiver_type = receiver_decl
            .child_by_field_name("type")
            .map(|t| strip_receiver_type(parsed.node_text(t)));

        Some(GoMethod {
            exported: is_exported(&name),
            name,
            receiver,
            receiver_type,
            parameters: node
                .child_by_field_name("parameters")
                .map(|p| self.extract_parameters(parsed, p))
                .unwrap_or_default(),
            return_types: self.extract_results(parsed, node.child_by_field_name("result")),
            location: SourceLocation::from_node(node, &parsed.path),
            body: node
                .child_by_field_name("body")
                .and_then(|b| self.extract_body(parsed, b, strategy)),
        })
    }

    /// Extract a body per strategy; `None` leaves the body unknown.
    fn extract_body(&self, parsed: &ParsedFile, block: Node, strategy: BodyStrategy) -> Option<GoFunctionBody> {
        match strategy {
            BodyStrategy::None => None,
            BodyStrategy::Selective if !has_behavior_signal(parsed, block) => None,
            _ => {
                let mut collector = BodyCollector {
                    parsed,
                    body: GoFunctionBody::default(),
                };
                collector.collect(block);
                Some(collector.body)
            }
        }
    }
}

impl Default for GoAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageAnalyzer for GoAnalyzer {
    fn language_id(&self) -> &'static str {
        "go"
    }

    fn file_extensions(&self) -> &'static [&'static str] {
        &["go"]
    }

    fn parse(&self, path: &str, source: &[u8]) -> anyhow::Result<ParsedFile> {
        let mut parser = self.create_parser()?;
        let tree = parser
            .parse(source, None)
            .ok_or_else(|| anyhow::anyhow!("failed to parse Go source: {}", path))?;

        Ok(ParsedFile {
            tree,
            source: source.to_vec(),
            path: path.to_string(),
        })
    }

    fn extract_facts(&self, parsed: &ParsedFile, strategy: BodyStrategy) -> anyhow::Result<FileFacts> {
        let mut facts = FileFacts::empty(&parsed.path);
        facts.package = self.extract_package(parsed);
        facts.imports = self.extract_imports(parsed)?;
        facts.has_parse_errors = parsed.tree.root_node().has_error();

        let package_name = facts.package.clone().unwrap_or_else(|| "main".to_string());
        self.extract_declarations(parsed, &package_name, strategy, &mut facts);

        Ok(facts)
    }
}

/// Location spanning a type spec, anchored at its name.
fn type_location(parsed: &ParsedFile, spec: Node, name_node: Node) -> SourceLocation {
    let mut location = SourceLocation::from_node(spec, &parsed.path);
    let start = name_node.start_position();
    location.start_line = start.row + 1;
    location.start_column = Some(start.column + 1);
    location
}

/// `*Server[T]` -> `Server`
fn strip_receiver_type(text: &str) -> String {
    let text = text.trim().trim_start_matches('(').trim_end_matches(')');
    let text = text.trim_start_matches('*');
    text.split('[').next().unwrap_or(text).trim().to_string()
}

fn is_receive(node: Node) -> bool {
    node.kind() == "unary_expression"
        && node
            .child_by_field_name("operator")
            .map(|op| op.kind() == "<-")
            .unwrap_or(false)
}

/// Callee name of a call expression: identifier or selector field.
fn callee_name<'a>(parsed: &'a ParsedFile, call: Node) -> Option<&'a str> {
    let func = call.child_by_field_name("function")?;
    match func.kind() {
        "identifier" => Some(parsed.node_text(func)),
        "selector_expression" => func.child_by_field_name("field").map(|f| parsed.node_text(f)),
        _ => None,
    }
}

/// Pre-scan for selective extraction.
fn has_behavior_signal(parsed: &ParsedFile, block: Node) -> bool {
    let mut stack = vec![block];
    while let Some(node) = stack.pop() {
        match node.kind() {
            "go_statement" | "send_statement" => return true,
            "unary_expression" if is_receive(node) => return true,
            "call_expression" => {
                if let Some(name) = callee_name(parsed, node) {
                    let registers = if AMBIGUOUS_ROUTE_VERBS.contains(&name) {
                        first_arg_is_route(parsed, node)
                    } else {
                        REGISTRATION_CALLS.contains(&name) || is_grpc_registration(name)
                    };
                    if registers {
                        return true;
                    }
                }
            }
            _ => {}
        }
        let mut cursor = node.walk();
        stack.extend(node.named_children(&mut cursor));
    }
    false
}

/// First argument is a string literal starting with `/`.
fn first_arg_is_route(parsed: &ParsedFile, call: Node) -> bool {
    let Some(args) = call.child_by_field_name("arguments") else {
        return false;
    };
    let mut cursor = args.walk();
    let Some(first) = args.named_children(&mut cursor).next() else {
        return false;
    };
    matches!(first.kind(), "interpreted_string_literal" | "raw_string_literal")
        && parsed.node_text(first).get(1..).is_some_and(|text| text.starts_with('/'))
}

/// Argument texts of a call, string literals unquoted.
fn argument_texts(parsed: &ParsedFile, call: Node) -> Vec<String> {
    let Some(args) = call.child_by_field_name("arguments") else {
        return Vec::new();
    };
    let mut cursor = args.walk();
    let texts = args
        .named_children(&mut cursor)
        .map(|arg| {
            let text = parsed.node_text(arg);
            match arg.kind() {
                "interpreted_string_literal" | "raw_string_literal" if text.len() >= 2 => {
                    text[1..text.len() - 1].to_string()
                }
                _ => text.to_string(),
            }
        })
        .collect();
    texts
}

/// Collects calls, spawns and channel operations from a body, nested
/// function literals included.
struct BodyCollector<'a> {
    parsed: &'a ParsedFile,
    body: GoFunctionBody,
}

impl BodyCollector<'_> {
    fn collect(&mut self, block: Node) {
        let mut stack = vec![block];
        while let Some(node) = stack.pop() {
            match node.kind() {
                "go_statement" => self.record_spawn(node),
                "send_statement" => self.record_send(node),
                "unary_expression" if is_receive(node) => self.record_receive(node),
                "call_expression" => self.record_call(node),
                _ => {}
            }
            let mut cursor = node.walk();
            let children: Vec<Node> = node.named_children(&mut cursor).collect();
            // Reverse so the stack pops in source order.
            stack.extend(children.into_iter().rev());
        }
    }

    fn location(&self, node: Node) -> SourceLocation {
        SourceLocation::from_node(node, &self.parsed.path)
    }

    fn record_spawn(&mut self, stmt: Node) {
        let mut cursor = stmt.walk();
        let Some(expr) = stmt.named_children(&mut cursor).next() else {
            return;
        };
        let (target, args) = match expr.kind() {
            "call_expression" => {
                let args = argument_texts(self.parsed, expr);
                let target = match expr.child_by_field_name("function") {
                    Some(func) if func.kind() == "func_literal" => SpawnTarget::Anonymous,
                    Some(func) if func.kind() == "selector_expression" => {
                        let qualifier = func
                            .child_by_field_name("operand")
                            .map(|o| self.parsed.node_text(o).to_string());
                        let name = func
                            .child_by_field_name("field")
                            .map(|f| self.parsed.node_text(f).to_string())
                            .unwrap_or_default();
                        SpawnTarget::Named { name, qualifier }
                    }
                    Some(func) => SpawnTarget::named(self.parsed.node_text(func)),
                    None => return,
                };
                (target, args)
            }
            "func_literal" => (SpawnTarget::Anonymous, Vec::new()),
            _ => return,
        };
        self.body.spawns.push(GoSpawnStmt {
            target,
            args,
            location: self.location(stmt),
        });
    }

    fn record_send(&mut self, stmt: Node) {
        let channel_name = stmt
            .child_by_field_name("channel")
            .map(|c| self.parsed.node_text(c).to_string())
            .unwrap_or_default();
        self.body.channel_ops.push(GoChannelOp {
            channel_name,
            operation: ChannelOpKind::Send,
            channel_type: None,
            buffer_size: None,
            location: self.location(stmt),
        });
    }

    fn record_receive(&mut self, expr: Node) {
        let channel_name = expr
            .child_by_field_name("operand")
            .map(|o| self.parsed.node_text(o).to_string())
            .unwrap_or_default();
        self.body.channel_ops.push(GoChannelOp {
            channel_name,
            operation: ChannelOpKind::Receive,
            channel_type: None,
            buffer_size: None,
            location: self.location(expr),
        });
    }

    fn record_call(&mut self, call: Node) {
        let Some(func) = call.child_by_field_name("function") else {
            return;
        };
        let (function_name, qualifier) = match func.kind() {
            "identifier" => (self.parsed.node_text(func).to_string(), None),
            "selector_expression" => {
                let (Some(operand), Some(field)) =
                    (func.child_by_field_name("operand"), func.child_by_field_name("field"))
                else {
                    return;
                };
                (
                    self.parsed.node_text(field).to_string(),
                    Some(self.parsed.node_text(operand).to_string()),
                )
            }
            _ => return,
        };

        if qualifier.is_none() {
            match function_name.as_str() {
                "make" if self.first_arg_kind(call) == Some("channel_type") => {
                    let args = argument_texts(self.parsed, call);
                    self.body.channel_ops.push(GoChannelOp {
                        channel_name: self.make_target_name(call),
                        operation: ChannelOpKind::Make,
                        channel_type: args.first().cloned(),
                        buffer_size: args.get(1).and_then(|size| size.parse().ok()),
                        location: self.location(call),
                    });
                }
                "close" => {
                    let args = argument_texts(self.parsed, call);
                    if let Some(channel) = args.into_iter().next() {
                        self.body.channel_ops.push(GoChannelOp {
                            channel_name: channel,
                            operation: ChannelOpKind::Close,
                            channel_type: None,
                            buffer_size: None,
                            location: self.location(call),
                        });
                    }
                }
                _ => {}
            }
        }

        self.body.calls.push(GoCallExpr {
            function_name,
            qualifier,
            args: argument_texts(self.parsed, call),
            location: self.location(call),
        });
    }

    fn first_arg_kind(&self, call: Node) -> Option<&'static str> {
        let args = call.child_by_field_name("arguments")?;
        let mut cursor = args.walk();
        let first = args.named_children(&mut cursor).next()?;
        Some(first.kind())
    }

    /// Variable a `make(chan ...)` result is bound to, or `""`.
    ///
    /// Handles `:=`, `=`, `var` and selector targets (`s.jobs = make(...)`
    /// yields `jobs`), picking the left-hand side at the call's position.
    fn make_target_name(&self, call: Node) -> String {
        let mut current = call.parent();
        while let Some(node) = current {
            match node.kind() {
                "short_var_declaration" | "assignment_statement" => {
                    let (Some(left), Some(right)) =
                        (node.child_by_field_name("left"), node.child_by_field_name("right"))
                    else {
                        return String::new();
                    };
                    let index = position_within(right, call).unwrap_or(0);
                    let mut cursor = left.walk();
                    let target = left.named_children(&mut cursor).nth(index);
                    return target.map(|t| self.binding_name(t)).unwrap_or_default();
                }
                "var_spec" => {
                    let index = node
                        .child_by_field_name("value")
                        .and_then(|v| position_within(v, call))
                        .unwrap_or(0);
                    let mut cursor = node.walk();
                    let name = node.children_by_field_name("name", &mut cursor).nth(index);
                    return name.map(|n| self.parsed.node_text(n).to_string()).unwrap_or_default();
                }
                "block" | "function_declaration" | "method_declaration" | "func_literal" => break,
                _ => current = node.parent(),
            }
        }
        String::new()
    }

    fn binding_name(&self, target: Node) -> String {
        match target.kind() {
            "selector_expression" => target
                .child_by_field_name("field")
                .map(|f| self.parsed.node_text(f).to_string())
                .unwrap_or_default(),
            "identifier" => self.parsed.node_text(target).to_string(),
            _ => String::new(),
        }
    }
}

/// Index of the named child of `list` that contains `node`.
fn position_within(list: Node, node: Node) -> Option<usize> {
    let mut cursor = list.walk();
    let index = list
        .named_children(&mut cursor)
        .position(|child| child.start_byte() <= node.start_byte() && child.end_byte() >= node.end_byte());
    index
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(source: &str, strategy: BodyStrategy) -> FileFacts {
        let analyzer = GoAnalyzer::new();
        let parsed = analyzer.parse("pkg/app/app.go", source.as_bytes()).unwrap();
        analyzer.extract_facts(&parsed, strategy).unwrap()
    }

    #[test]
    fn test_extract_package_and_imports() {
        let source = r#"
package hub

import (
    "context"
    "net/http"
    log "github.com/sirupsen/logrus"
)
"#;
        let facts = extract(source, BodyStrategy::Full);
        assert_eq!(facts.package.as_deref(), Some("hub"));
        assert_eq!(facts.imports.len(), 3);
        let logrus = facts
            .imports
            .iter()
            .find(|i| i.path == "github.com/sirupsen/logrus")
            .unwrap();
        assert_eq!(logrus.alias.as_deref(), Some("log"));
        assert_eq!(logrus.local_name(), "log");
    }

    #[test]
    fn test_extract_struct_fields_and_embedding() {
        let source = r#"
package store

type Base struct{}

type Cache struct {
    Base
    *sync.Mutex
    items map[string]int `json:"items"`
    Hits, Misses int
}
"#;
        let facts = extract(source, BodyStrategy::None);
        let cache = facts.structs.iter().find(|s| s.name == "Cache").unwrap();
        assert_eq!(cache.embedded_types, vec!["Base", "sync.Mutex"]);
        assert_eq!(cache.fields.len(), 3);
        let items = cache.fields.iter().find(|f| f.name == "items").unwrap();
        assert_eq!(items.type_name, "map[string]int");
        assert_eq!(items.tag.as_deref(), Some(r#"json:"items""#));
        assert!(!items.exported);
        assert_eq!(cache.location.start_line, 6);
    }

    #[test]
    fn test_extract_interface_methods() {
        let source = r#"
package io2

type Reader interface {
    Read(p []byte) (n int, err error)
}

type ReadCloser interface {
    Reader
    Close() error
}
"#;
        let facts = extract(source, BodyStrategy::None);
        let reader = facts.interfaces.iter().find(|i| i.name == "Reader").unwrap();
        assert_eq!(reader.methods.len(), 1);
        assert_eq!(reader.methods[0].parameters[0].type_name, "[]byte");
        assert_eq!(reader.methods[0].return_types, vec!["int", "error"]);

        let rc = facts.interfaces.iter().find(|i| i.name == "ReadCloser").unwrap();
        assert_eq!(rc.embedded_interfaces, vec!["Reader"]);
        assert_eq!(rc.methods[0].name, "Close");
    }

    #[test]
    fn test_extract_methods_with_receivers() {
        let source = r#"
package server

type Server struct{}

func (s *Server) Start(ctx context.Context, addr string) error {
    return nil
}

func (Server) Name() string { return "srv" }
"#;
        let facts = extract(source, BodyStrategy::Full);
        assert_eq!(facts.methods.len(), 2);
        let start = facts.methods.iter().find(|m| m.name == "Start").unwrap();
        assert_eq!(start.receiver.as_deref(), Some("s"));
        assert_eq!(start.receiver_type.as_deref(), Some("Server"));
        assert_eq!(start.parameters[0].type_name, "context.Context");
        assert_eq!(start.return_types, vec!["error"]);
        let name = facts.methods.iter().find(|m| m.name == "Name").unwrap();
        assert_eq!(name.receiver, None);
        assert_eq!(name.receiver_type.as_deref(), Some("Server"));
    }

    #[test]
    fn test_selective_skips_plain_bodies() {
        let source = r#"
package app

func plain() int {
    return 42
}

func spawner() {
    go plain()
}

func routes(mux *http.ServeMux) {
    mux.HandleFunc("/health", health)
}
"#;
        let facts = extract(source, BodyStrategy::Selective);
        let body_of = |name: &str| {
            facts
                .functions
                .iter()
                .find(|f| f.name == name)
                .unwrap()
                .body
                .clone()
        };
        assert!(body_of("plain").is_none());
        assert!(body_of("spawner").is_some());
        let routes = body_of("routes").unwrap();
        assert_eq!(routes.calls[0].function_name, "HandleFunc");
        assert_eq!(routes.calls[0].args, vec!["/health", "health"]);

        let full = extract(source, BodyStrategy::Full);
        assert!(full.functions.iter().all(|f| f.body.is_some()));

        let none = extract(source, BodyStrategy::None);
        assert!(none.functions.iter().all(|f| f.body.is_none()));
    }

    #[test]
    fn test_selective_keeps_non_http_registrations() {
        let source = r#"
package app

func commands(root *cobra.Command) {
    root.AddCommand(serveCmd)
}

func services(s *grpc.Server) {
    pb.RegisterOrdersServer(s, &orders{})
}

func register(s *Server) {
    s.RegisterServer()
}

func routes(r chi.Router) {
    r.Get("/items", list)
}

func lookup(c *Cache) {
    c.Get("id")
}
"#;
        let facts = extract(source, BodyStrategy::Selective);
        let kept: Vec<&str> = facts
            .functions
            .iter()
            .filter(|f| f.body.is_some())
            .map(|f| f.name.as_str())
            .collect();
        assert_eq!(kept, vec!["commands", "services", "routes"]);
    }

    #[test]
    fn test_extract_spawns_and_channels() {
        let source = r#"
package pool

func Run(ctx context.Context) {
    jobs := make(chan int, 10)
    var results = make(chan int)
    go worker(ctx, jobs)
    go func() {
        jobs <- 1
        close(jobs)
    }()
    <-results
}
"#;
        let facts = extract(source, BodyStrategy::Full);
        let body = facts.functions[0].body.as_ref().unwrap();

        assert_eq!(body.spawns.len(), 2);
        assert_eq!(body.spawns[0].target, SpawnTarget::named("worker"));
        assert_eq!(body.spawns[0].args, vec!["ctx", "jobs"]);
        assert_eq!(body.spawns[0].location.start_line, 7);
        assert!(body.spawns[1].target.is_anonymous());

        let makes: Vec<_> = body.channel_makes().map(|op| op.channel_name.as_str()).collect();
        assert_eq!(makes, vec!["jobs", "results"]);
        let jobs = body.channel_makes().next().unwrap();
        assert_eq!(jobs.channel_type.as_deref(), Some("chan int"));
        assert_eq!(jobs.buffer_size, Some(10));

        let kinds: Vec<_> = body.channel_ops.iter().map(|op| op.operation).collect();
        assert!(kinds.contains(&ChannelOpKind::Send));
        assert!(kinds.contains(&ChannelOpKind::Close));
        assert!(kinds.contains(&ChannelOpKind::Receive));
    }

    #[test]
    fn test_make_target_positions_and_selectors() {
        let source = r#"
package pool

func (p *Pool) init() {
    a, b := make(chan int), make(chan string)
    p.quit = make(chan struct{})
    go p.loop(a, b)
}
"#;
        let facts = extract(source, BodyStrategy::Full);
        let body = facts.methods[0].body.as_ref().unwrap();
        let makes: Vec<_> = body.channel_makes().map(|op| op.channel_name.as_str()).collect();
        assert_eq!(makes, vec!["a", "b", "quit"]);

        assert_eq!(
            body.spawns[0].target,
            SpawnTarget::Named {
                name: "loop".to_string(),
                qualifier: Some("p".to_string())
            }
        );
    }

    #[test]
    fn test_receive_on_context_done() {
        let source = r#"
package app

func loop(ctx context.Context) {
    for {
        select {
        case <-ctx.Done():
            return
        default:
        }
    }
}
"#;
        let facts = extract(source, BodyStrategy::Selective);
        let body = facts.functions[0].body.as_ref().unwrap();
        assert!(body
            .calls
            .iter()
            .any(|c| c.function_name == "Done" && c.qualifier.as_deref() == Some("ctx")));
        assert!(body
            .channel_ops
            .iter()
            .any(|op| op.operation == ChannelOpKind::Receive && op.channel_name == "ctx.Done()"));
    }
}
