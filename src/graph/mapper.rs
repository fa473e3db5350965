//! Go raw facts -> architecture graph.

use std::collections::HashSet;

use tracing::debug;

use super::{
    ArchGraph, Entity, EntityKind, InferenceSource, Member, MemberKind, Parameter, Relation,
    RelationType, Visibility,
};
use crate::analysis::{has_path_prefix, GoField, GoMethod, GoPackage, GoRawData};
use crate::atlas::Implementation;

/// Maps packages and implementation facts onto entities and relations.
#[derive(Debug, Clone, Default)]
pub struct ArchGraphMapper {
    module_name: String,
}

impl ArchGraphMapper {
    pub fn new(module_name: &str) -> Self {
        Self {
            module_name: module_name.to_string(),
        }
    }

    /// Build the Go graph: entities, implementation relations, then field
    /// relations.
    pub fn map(&self, raw: &GoRawData, implementations: &[Implementation]) -> ArchGraph {
        let mut graph = ArchGraph::new("go");
        graph.entities = self.map_entities(raw);
        graph.relations = self.map_relations(raw, implementations, &graph.entities);
        graph.source_files = raw
            .packages
            .iter()
            .flat_map(|p| p.source_files.iter().cloned())
            .collect();
        graph.source_files.sort();
        graph.source_files.dedup();
        debug!(
            entities = graph.entities.len(),
            relations = graph.relations.len(),
            "mapped Go facts to graph"
        );
        graph
    }

    /// One entity per struct and interface, keyed `<full path>.<Name>`.
    /// Duplicate declarations keep the first.
    pub fn map_entities(&self, raw: &GoRawData) -> Vec<Entity> {
        let mut seen = HashSet::new();
        let mut entities = Vec::new();
        for package in &raw.packages {
            for s in &package.structs {
                let id = format!("{}.{}", package.full_name, s.name);
                if !seen.insert(id.clone()) {
                    continue;
                }
                let mut members: Vec<Member> = s.fields.iter().map(field_member).collect();
                members.extend(s.methods.iter().map(method_member));
                entities.push(Entity {
                    id,
                    name: s.name.clone(),
                    kind: EntityKind::Struct,
                    visibility: Visibility::from_exported(s.exported),
                    members,
                    source_location: s.location.clone(),
                });
            }
            for i in &package.interfaces {
                let id = format!("{}.{}", package.full_name, i.name);
                if !seen.insert(id.clone()) {
                    continue;
                }
                entities.push(Entity {
                    id,
                    name: i.name.clone(),
                    kind: EntityKind::Interface,
                    visibility: Visibility::from_exported(i.exported),
                    members: i.methods.iter().map(method_member).collect(),
                    source_location: i.location.clone(),
                });
            }
        }
        entities
    }

    pub fn map_relations(
        &self,
        raw: &GoRawData,
        implementations: &[Implementation],
        entities: &[Entity],
    ) -> Vec<Relation> {
        let known: HashSet<&str> = entities.iter().map(|e| e.id.as_str()).collect();
        let mut keys = HashSet::new();
        let mut relations = Vec::new();

        for implementation in implementations {
            let source = implementation.struct_id();
            let target = implementation.interface_id();
            if !keys.insert((RelationType::Implementation, source.clone(), target.clone())) {
                continue;
            }
            relations.push(Relation {
                id: format!("impl-{}", relations.len()),
                relation_type: RelationType::Implementation,
                source,
                target,
                confidence: Some(implementation.confidence),
                inference_source: Some(implementation.source),
            });
        }

        let mut field_relations = 0;
        for package in &raw.packages {
            for s in &package.structs {
                let source = format!("{}.{}", package.full_name, s.name);
                let field_types = s
                    .fields
                    .iter()
                    .map(|f| f.type_name.as_str())
                    .chain(s.embedded_types.iter().map(String::as_str));
                for type_name in field_types {
                    let Some((relation_type, target)) = self.resolve_field_type(package, type_name) else {
                        continue;
                    };
                    if !known.contains(target.as_str()) {
                        continue;
                    }
                    if !keys.insert((relation_type, source.clone(), target.clone())) {
                        continue;
                    }
                    let prefix = match relation_type {
                        RelationType::Aggregation => "aggr",
                        _ => "comp",
                    };
                    relations.push(Relation {
                        id: format!("{}-{}", prefix, field_relations),
                        relation_type,
                        source: source.clone(),
                        target,
                        confidence: None,
                        inference_source: Some(InferenceSource::Explicit),
                    });
                    field_relations += 1;
                }
            }
        }
        relations
    }

    /// Entity id a field type refers to, with the relation it implies:
    /// composition for `T`/`*T`, aggregation for slices, arrays and map values.
    pub(crate) fn resolve_field_type(&self, package: &GoPackage, type_name: &str) -> Option<(RelationType, String)> {
        let (relation_type, element) = element_type(type_name)?;
        let id = match element.split_once('.') {
            None => format!("{}.{}", package.full_name, element),
            Some((qualifier, name)) => {
                let import = package.import_named(qualifier)?;
                let full_name = self.module_relative(&import.path)?;
                format!("{}.{}", full_name, name)
            }
        };
        Some((relation_type, id))
    }

    /// Module-relative package path of an import (`""` maps to the root package).
    fn module_relative(&self, import_path: &str) -> Option<String> {
        if self.module_name.is_empty() || !has_path_prefix(import_path, &self.module_name) {
            return None;
        }
        let rest = import_path[self.module_name.len()..].trim_start_matches('/');
        Some(if rest.is_empty() {
            self.module_name.clone()
        } else {
            rest.to_string()
        })
    }
}

/// Strip pointers and containers down to a named type.
fn element_type(type_name: &str) -> Option<(RelationType, &str)> {
    let mut rest = type_name.trim();
    let mut relation_type = RelationType::Composition;
    loop {
        rest = rest.trim_start_matches('*');
        if let Some(after) = rest.strip_prefix("map[") {
            rest = skip_bracket(after)?;
            relation_type = RelationType::Aggregation;
        } else if rest.starts_with('[') {
            rest = skip_bracket(&rest[1..])?;
            relation_type = RelationType::Aggregation;
        } else {
            break;
        }
    }
    let is_named = !rest.is_empty()
        && rest
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == '.')
        && rest.matches('.').count() <= 1
        && !rest.starts_with(|c: char| c.is_ascii_digit());
    is_named.then_some((relation_type, rest))
}

/// Text after the `]` closing an already-opened bracket.
fn skip_bracket(s: &str) -> Option<&str> {
    let mut depth = 1;
    for (i, c) in s.char_indices() {
        match c {
            '[' => depth += 1,
            ']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&s[i + 1..]);
                }
            }
            _ => {}
        }
    }
    None
}

fn field_member(field: &GoField) -> Member {
    Member {
        name: field.name.clone(),
        kind: MemberKind::Field,
        visibility: Visibility::from_exported(field.exported),
        field_type: Some(field.type_name.clone()),
        return_type: None,
        parameters: Vec::new(),
    }
}

fn method_member(method: &GoMethod) -> Member {
    Member {
        name: method.name.clone(),
        kind: MemberKind::Method,
        visibility: Visibility::from_exported(method.exported),
        field_type: None,
        return_type: (!method.return_types.is_empty()).then(|| method.return_types.join(", ")),
        parameters: method
            .parameters
            .iter()
            .map(|p| Parameter {
                name: p.name.clone(),
                type_name: p.type_name.clone(),
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{GoImport, GoInterface, GoStruct, SourceLocation};

    fn field(name: &str, type_name: &str) -> GoField {
        GoField {
            name: name.to_string(),
            type_name: type_name.to_string(),
            tag: None,
            exported: true,
            location: SourceLocation::default(),
        }
    }

    fn structure(name: &str, fields: Vec<GoField>) -> GoStruct {
        GoStruct {
            name: name.to_string(),
            package_name: String::new(),
            fields,
            methods: vec![],
            embedded_types: vec![],
            exported: true,
            location: SourceLocation::default(),
        }
    }

    fn runner_package(full_name: &str) -> GoPackage {
        let mut package = GoPackage::new("stress", full_name);
        package.structs.push(structure("Runner", vec![]));
        package
    }

    #[test]
    fn test_entity_ids_use_full_path() {
        let raw = GoRawData {
            packages: vec![runner_package("tests/stress"), runner_package("cmd/stress")],
            ..Default::default()
        };
        let entities = ArchGraphMapper::new("example.com/app").map_entities(&raw);
        let ids: Vec<_> = entities.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["tests/stress.Runner", "cmd/stress.Runner"]);
    }

    #[test]
    fn test_duplicate_declarations_dedup() {
        let mut package = runner_package("cmd/stress");
        package.structs.push(structure("Runner", vec![]));
        let raw = GoRawData {
            packages: vec![package],
            ..Default::default()
        };
        assert_eq!(ArchGraphMapper::new("x").map_entities(&raw).len(), 1);
    }

    #[test]
    fn test_field_relations() {
        let mut store = GoPackage::new("store", "pkg/store");
        store.structs.push(structure("Item", vec![]));
        store.interfaces.push(GoInterface {
            name: "Store".to_string(),
            package_name: "store".to_string(),
            methods: vec![],
            embedded_interfaces: vec![],
            exported: true,
            location: SourceLocation::default(),
        });

        let mut cart = GoPackage::new("cart", "pkg/cart");
        cart.imports.push(GoImport {
            path: "example.com/shop/pkg/store".to_string(),
            alias: None,
            location: SourceLocation::default(),
            kind: None,
        });
        cart.structs.push(structure("Line", vec![]));
        let mut c = structure(
            "Cart",
            vec![
                field("backend", "store.Store"),
                field("lines", "[]*Line"),
                field("index", "map[string]store.Item"),
                field("mu", "sync.Mutex"),
                field("hook", "func(Line) error"),
                field("backup", "*store.Store"),
            ],
        );
        c.embedded_types.push("Line".to_string());
        cart.structs.push(c);

        let raw = GoRawData {
            packages: vec![store, cart],
            module_root: String::new(),
            module_name: "example.com/shop".to_string(),
        };
        let graph = ArchGraphMapper::new("example.com/shop").map(&raw, &[]);
        let relations: Vec<_> = graph
            .relations
            .iter()
            .map(|r| (r.id.as_str(), r.relation_type, r.target.as_str()))
            .collect();
        assert_eq!(
            relations,
            vec![
                ("comp-0", RelationType::Composition, "pkg/store.Store"),
                ("aggr-1", RelationType::Aggregation, "pkg/cart.Line"),
                ("aggr-2", RelationType::Aggregation, "pkg/store.Item"),
                ("comp-3", RelationType::Composition, "pkg/cart.Line"),
            ]
        );
        assert!(graph
            .relations
            .iter()
            .all(|r| r.inference_source == Some(InferenceSource::Explicit)));
    }

    #[test]
    fn test_implementation_relations() {
        let implementation = Implementation {
            struct_name: "MemStore".to_string(),
            struct_package: "pkg/store".to_string(),
            interface_name: "Store".to_string(),
            interface_package: "pkg/store".to_string(),
            matched_methods: vec!["Get".to_string()],
            unresolved_methods: vec![],
            confidence: 1.0,
            source: InferenceSource::Gopls,
        };
        let relations = ArchGraphMapper::new("x").map_relations(
            &GoRawData::default(),
            &[implementation.clone(), implementation],
            &[],
        );
        assert_eq!(relations.len(), 1);
        assert_eq!(relations[0].id, "impl-0");
        assert_eq!(relations[0].source, "pkg/store.MemStore");
        assert_eq!(relations[0].inference_source, Some(InferenceSource::Gopls));
    }

    #[test]
    fn test_element_type() {
        assert_eq!(element_type("*Node"), Some((RelationType::Composition, "Node")));
        assert_eq!(element_type("[8]store.Item"), Some((RelationType::Aggregation, "store.Item")));
        assert_eq!(element_type("map[string][]*Job"), Some((RelationType::Aggregation, "Job")));
        assert_eq!(element_type("chan Job"), None);
        assert_eq!(element_type("func()"), None);
    }
}
