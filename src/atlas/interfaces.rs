//! Implicit interface implementation matching.
//!
//! Go types satisfy interfaces structurally. The heuristic compares declared
//! method signatures across every (struct, interface) pair of the module; an
//! authoritative oracle, when one answers, confirms pairs and supersedes the
//! heuristic for them.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::analysis::{GoInterface, GoMethod, GoPackage, GoRawData, GoStruct};
use crate::graph::InferenceSource;
use crate::oracle::{ImplementationOracle, InterfaceQuery, OracleAnswer};

/// A struct found to implement an interface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Implementation {
    pub struct_name: String,
    /// Module-relative package path of the struct.
    pub struct_package: String,
    pub interface_name: String,
    /// Module-relative package path of the interface.
    pub interface_package: String,
    pub matched_methods: Vec<String>,
    /// Methods matched by name and arity whose types could not be compared.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unresolved_methods: Vec<String>,
    pub confidence: f64,
    pub source: InferenceSource,
}

impl Implementation {
    pub fn struct_id(&self) -> String {
        format!("{}.{}", self.struct_package, self.struct_name)
    }

    pub fn interface_id(&self) -> String {
        format!("{}.{}", self.interface_package, self.interface_name)
    }

    fn key(&self) -> (String, String) {
        (self.struct_id(), self.interface_id())
    }
}

/// Result of comparing one interface method against a struct method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodMatch {
    Exact,
    /// Same shape, but a type could not be compared textually.
    Unresolved,
    Mismatch,
}

impl MethodMatch {
    fn combine(self, other: MethodMatch) -> MethodMatch {
        match (self, other) {
            (MethodMatch::Mismatch, _) | (_, MethodMatch::Mismatch) => MethodMatch::Mismatch,
            (MethodMatch::Unresolved, _) | (_, MethodMatch::Unresolved) => MethodMatch::Unresolved,
            _ => MethodMatch::Exact,
        }
    }
}

/// Matcher output plus the reasons the oracle could not be used.
#[derive(Debug, Clone, Default)]
pub struct MatchReport {
    pub implementations: Vec<Implementation>,
    pub oracle_failures: Vec<String>,
}

/// Predeclared identifiers that never name a package-local type.
const PREDECLARED: &[&str] = &[
    "any", "bool", "byte", "chan", "complex64", "complex128", "error", "float32", "float64",
    "func", "int", "int8", "int16", "int32", "int64", "interface", "map", "rune", "string",
    "struct", "uint", "uint8", "uint16", "uint32", "uint64", "uintptr",
];

struct Candidate<'a> {
    package: &'a GoPackage,
    structure: &'a GoStruct,
    methods: BTreeMap<&'a str, &'a GoMethod>,
}

struct Contract<'a> {
    package: &'a GoPackage,
    interface: &'a GoInterface,
    methods: Vec<&'a GoMethod>,
    /// False when an embedded interface lives outside the package, so
    /// `methods` is only part of the method set.
    complete: bool,
}

/// Heuristic matching over every (struct, interface) pair of the module.
pub fn match_heuristic(raw: &GoRawData) -> Vec<Implementation> {
    let candidates = candidates(raw);
    let contracts: Vec<_> = contracts(raw).into_iter().filter(|c| c.complete).collect();

    let mut seen = HashSet::new();
    let mut found = Vec::new();
    for candidate in &candidates {
        for contract in &contracts {
            if let Some(implementation) = check_pair(candidate, contract) {
                if seen.insert(implementation.key()) {
                    found.push(implementation);
                }
            }
        }
    }
    debug!(
        structs = candidates.len(),
        interfaces = contracts.len(),
        implementations = found.len(),
        "heuristic interface matching finished"
    );
    found
}

/// Ask the oracle once per interface; pairs it confirms are marked
/// authoritative, every other heuristic pair is kept as inferred. Interfaces
/// embedding foreign interfaces are queried too, although the heuristic
/// cannot judge them.
pub fn match_authoritative(raw: &GoRawData, oracle: &mut dyn ImplementationOracle) -> MatchReport {
    let heuristic = match_heuristic(raw);
    let candidates = candidates(raw);
    let contracts = contracts(raw);

    let by_location: HashMap<(&str, usize), &Candidate> = candidates
        .iter()
        .map(|c| {
            (
                (c.structure.location.file.as_str(), c.structure.location.start_line),
                c,
            )
        })
        .collect();

    let mut report = MatchReport::default();
    let mut confirmed: Vec<Implementation> = Vec::new();
    for contract in &contracts {
        let query = InterfaceQuery {
            name: contract.interface.name.clone(),
            file: contract.interface.location.file.clone(),
            line: contract.interface.location.start_line,
            column: contract.interface.location.start_column,
        };
        match oracle.implementors(&query) {
            OracleAnswer::Implementors(locations) => {
                for location in locations {
                    let Some(candidate) = by_location.get(&(location.file.as_str(), location.line)) else {
                        continue;
                    };
                    confirmed.push(Implementation {
                        struct_name: candidate.structure.name.clone(),
                        struct_package: candidate.package.full_name.clone(),
                        interface_name: contract.interface.name.clone(),
                        interface_package: contract.package.full_name.clone(),
                        matched_methods: contract.methods.iter().map(|m| m.name.clone()).collect(),
                        unresolved_methods: Vec::new(),
                        confidence: 1.0,
                        source: InferenceSource::Gopls,
                    });
                }
            }
            OracleAnswer::Unavailable(reason) => {
                warn!(
                    oracle = oracle.name(),
                    interface = %contract.interface.name,
                    reason = %reason,
                    "oracle unavailable, using heuristic result"
                );
                if !report.oracle_failures.contains(&reason) {
                    report.oracle_failures.push(reason);
                }
            }
        }
    }

    report.implementations = merge(confirmed, heuristic);
    report
}

/// Authoritative entries first, then heuristic entries for pairs not yet
/// present. One entry per (struct, interface).
pub fn merge(authoritative: Vec<Implementation>, heuristic: Vec<Implementation>) -> Vec<Implementation> {
    let mut seen = HashSet::new();
    let mut merged = Vec::with_capacity(authoritative.len() + heuristic.len());
    for implementation in authoritative.into_iter().chain(heuristic) {
        if seen.insert(implementation.key()) {
            merged.push(implementation);
        }
    }
    merged
}

fn candidates(raw: &GoRawData) -> Vec<Candidate<'_>> {
    raw.packages
        .iter()
        .flat_map(|package| {
            package.structs.iter().map(move |structure| Candidate {
                package,
                structure,
                methods: struct_method_set(package, structure),
            })
        })
        .collect()
}

fn contracts(raw: &GoRawData) -> Vec<Contract<'_>> {
    raw.packages
        .iter()
        .flat_map(|package| {
            package.interfaces.iter().filter_map(move |interface| {
                let (methods, complete) = interface_method_set(package, interface);
                if complete && methods.is_empty() {
                    return None;
                }
                Some(Contract {
                    package,
                    interface,
                    methods,
                    complete,
                })
            })
        })
        .collect()
}

/// Declared methods plus methods promoted from embedded structs of the same
/// package. Declared methods shadow promoted ones; a shallower promotion
/// shadows a deeper one.
fn struct_method_set<'a>(package: &'a GoPackage, root: &'a GoStruct) -> BTreeMap<&'a str, &'a GoMethod> {
    let mut methods = BTreeMap::new();
    let mut visited = HashSet::new();
    let mut level = vec![root];
    while !level.is_empty() {
        let mut next = Vec::new();
        for current in level {
            if !visited.insert(current.name.as_str()) {
                continue;
            }
            for method in &current.methods {
                methods.entry(method.name.as_str()).or_insert(method);
            }
            for embedded in &current.embedded_types {
                let name = embedded.trim_start_matches('*');
                if name.contains('.') {
                    continue;
                }
                if let Some(inner) = package.find_struct(name) {
                    next.push(inner);
                }
            }
        }
        level = next;
    }
    methods
}

/// Interface methods including embedded interfaces of the same package. The
/// flag is false when an embedded interface cannot be resolved, since the
/// full method set is then unknown.
fn interface_method_set<'a>(package: &'a GoPackage, root: &'a GoInterface) -> (Vec<&'a GoMethod>, bool) {
    let mut methods: Vec<&GoMethod> = Vec::new();
    let mut complete = true;
    let mut visited = HashSet::new();
    let mut stack = vec![root];
    while let Some(current) = stack.pop() {
        if !visited.insert(current.name.as_str()) {
            continue;
        }
        for method in &current.methods {
            if !methods.iter().any(|m| m.name == method.name) {
                methods.push(method);
            }
        }
        for embedded in &current.embedded_interfaces {
            match package.find_interface(embedded) {
                Some(inner) => stack.push(inner),
                None => {
                    debug!(
                        interface = %root.name,
                        embedded = %embedded,
                        "embedded interface not resolvable, method set incomplete"
                    );
                    complete = false;
                }
            }
        }
    }
    (methods, complete)
}

fn check_pair(candidate: &Candidate, contract: &Contract) -> Option<Implementation> {
    let same_package = candidate.package.full_name == contract.package.full_name;
    let mut matched = Vec::with_capacity(contract.methods.len());
    let mut unresolved = Vec::new();

    for wanted in &contract.methods {
        let have = candidate.methods.get(wanted.name.as_str())?;
        match compare_methods(wanted, have, same_package) {
            MethodMatch::Exact => matched.push(wanted.name.clone()),
            MethodMatch::Unresolved => {
                matched.push(wanted.name.clone());
                unresolved.push(wanted.name.clone());
            }
            MethodMatch::Mismatch => return None,
        }
    }

    Some(Implementation {
        struct_name: candidate.structure.name.clone(),
        struct_package: candidate.package.full_name.clone(),
        interface_name: contract.interface.name.clone(),
        interface_package: contract.package.full_name.clone(),
        matched_methods: matched,
        unresolved_methods: unresolved,
        confidence: 1.0,
        source: InferenceSource::Inferred,
    })
}

/// Compare an interface method signature with a struct method.
pub fn compare_methods(wanted: &GoMethod, have: &GoMethod, same_package: bool) -> MethodMatch {
    if wanted.parameters.len() != have.parameters.len()
        || wanted.return_types.len() != have.return_types.len()
    {
        return MethodMatch::Mismatch;
    }
    let params = wanted
        .parameters
        .iter()
        .zip(&have.parameters)
        .map(|(a, b)| (a.type_name.as_str(), b.type_name.as_str()));
    let results = wanted
        .return_types
        .iter()
        .zip(&have.return_types)
        .map(|(a, b)| (a.as_str(), b.as_str()));

    params
        .chain(results)
        .fold(MethodMatch::Exact, |acc, (a, b)| {
            acc.combine(compare_types(a, b, same_package))
        })
}

/// Textual type comparison.
///
/// Identical text is exact, unless the two sides live in different packages
/// and the type names a package-local identifier. Types equal once package
/// qualifiers are removed are unresolved. Anything else is a mismatch.
pub fn compare_types(wanted: &str, have: &str, same_package: bool) -> MethodMatch {
    let wanted = normalize_type(wanted);
    let have = normalize_type(have);
    if wanted == have {
        if same_package || !has_local_identifier(&wanted) {
            return MethodMatch::Exact;
        }
        return MethodMatch::Unresolved;
    }
    if strip_qualifiers(&wanted) == strip_qualifiers(&have) {
        return MethodMatch::Unresolved;
    }
    MethodMatch::Mismatch
}

fn normalize_type(type_name: &str) -> String {
    let collapsed = type_name.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.replace("interface {}", "any").replace("interface{}", "any")
}

fn identifiers(type_name: &str) -> Vec<(usize, &str)> {
    let mut found = Vec::new();
    let mut start = None;
    for (i, c) in type_name.char_indices() {
        let ident_char = c.is_alphanumeric() || c == '_';
        match (start, ident_char) {
            (None, true) => start = Some(i),
            (Some(s), false) => {
                found.push((s, &type_name[s..i]));
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        found.push((s, &type_name[s..]));
    }
    found
}

/// Drop `pkg.` qualifiers: `*store.Item` becomes `*Item`.
fn strip_qualifiers(type_name: &str) -> String {
    let mut out = String::with_capacity(type_name.len());
    let mut last = 0;
    for (start, ident) in identifiers(type_name) {
        let end = start + ident.len();
        if type_name[end..].starts_with('.') {
            out.push_str(&type_name[last..start]);
            last = end + 1;
        }
    }
    out.push_str(&type_name[last..]);
    out
}

fn has_local_identifier(type_name: &str) -> bool {
    identifiers(type_name).into_iter().any(|(start, ident)| {
        let qualified_part = start > 0 && type_name[..start].ends_with('.');
        let qualifier = type_name[start + ident.len()..].starts_with('.');
        !qualified_part
            && !qualifier
            && !PREDECLARED.contains(&ident)
            && !ident.chars().all(|c| c.is_ascii_digit())
    })
}
