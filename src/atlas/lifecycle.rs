//! Cancellation hygiene of spawned goroutines.
//!
//! Tier 1 looks at the target's parameter list: a `context.Context`
//! parameter means the caller can cancel it. Tier 2 needs the target body
//! and looks for an actual check: `Done()` on a context parameter, or a
//! receive on a conventionally named stop channel.

use rayon::prelude::*;

use super::topology::{self, Scope, SpawnSite};
use super::types::{CancellationMechanism, GoroutineLifecycleSummary};
use crate::analysis::{ChannelOpKind, GoField, GoFunctionBody, GoPackage, GoRawData, SpawnTarget};

/// Channel variable names treated as stop signals.
pub const STOP_CHANNEL_NAMES: &[&str] = &[
    "done", "stop", "quit", "cancel", "shutdown", "stopCh", "doneCh", "quitCh", "stopChan",
    "closing",
];

/// Lifecycle summaries for every spawn site of the module.
pub fn build_lifecycle(raw: &GoRawData) -> Vec<GoroutineLifecycleSummary> {
    raw.packages
        .par_iter()
        .map(|package| {
            let scopes = topology::scopes(package);
            let sites = topology::spawn_sites(&scopes);
            summarize(package, &scopes, &sites)
        })
        .flatten()
        .collect()
}

pub(crate) fn summarize(
    package: &GoPackage,
    scopes: &[Scope],
    sites: &[SpawnSite],
) -> Vec<GoroutineLifecycleSummary> {
    sites
        .iter()
        .map(|site| summarize_site(package, &scopes[site.scope_index], site))
        .collect()
}

/// What is known about a resolved spawn target.
struct Target<'a> {
    parameters: &'a [GoField],
    body: Option<&'a GoFunctionBody>,
}

fn summarize_site(package: &GoPackage, scope: &Scope, site: &SpawnSite) -> GoroutineLifecycleSummary {
    let name = site.spawn.target.display_name().to_string();
    let unresolved = GoroutineLifecycleSummary {
        node_id: site.node_id.clone(),
        spawn_target_name: name.clone(),
        receives_context: false,
        cancellation_check_available: false,
        has_cancellation_check: None,
        cancellation_mechanism: None,
        orphan: true,
    };

    let Some(target) = resolve_target(package, scope, &site.spawn.target) else {
        return unresolved;
    };

    let context_params: Vec<&str> = target
        .parameters
        .iter()
        .filter(|p| is_context_type(&p.type_name))
        .map(|p| p.name.as_str())
        .collect();
    let receives_context = !context_params.is_empty();

    match target.body {
        None => GoroutineLifecycleSummary {
            receives_context,
            orphan: !receives_context,
            ..unresolved
        },
        Some(body) => {
            let mechanism = cancellation_check(body, &context_params);
            GoroutineLifecycleSummary {
                receives_context,
                cancellation_check_available: true,
                has_cancellation_check: Some(mechanism.is_some()),
                cancellation_mechanism: mechanism,
                orphan: !(receives_context || mechanism.is_some()),
                ..unresolved
            }
        }
    }
}

/// Resolve a spawn target within the package.
///
/// Unqualified names are free functions. A qualifier resolves only when it is
/// the enclosing method's receiver variable; imports and other local values
/// have a type this pass cannot see and stay unresolved.
fn resolve_target<'a>(package: &'a GoPackage, scope: &Scope<'a>, target: &SpawnTarget) -> Option<Target<'a>> {
    let SpawnTarget::Named { name, qualifier } = target else {
        return None;
    };
    match qualifier {
        None => package.find_function(name).map(|f| Target {
            parameters: &f.parameters,
            body: f.body.as_ref(),
        }),
        Some(qualifier) => scope
            .receiver
            .filter(|(variable, _)| variable == qualifier)
            .and_then(|(_, owner)| owner.find_method(name))
            .map(|m| Target {
                parameters: &m.parameters,
                body: m.body.as_ref(),
            }),
    }
}

/// `context.Context` or any `*.Context` type, pointer or not.
fn is_context_type(type_name: &str) -> bool {
    let base = type_name.trim_start_matches('*');
    base == "context.Context" || base.ends_with(".Context")
}

fn cancellation_check(body: &GoFunctionBody, context_params: &[&str]) -> Option<CancellationMechanism> {
    let done_call = body.calls.iter().any(|call| {
        call.function_name == "Done"
            && call
                .qualifier
                .as_deref()
                .map(|q| context_params.contains(&last_segment(q)))
                .unwrap_or(false)
    });
    if done_call {
        return Some(CancellationMechanism::Context);
    }

    let mut mechanism = None;
    for op in &body.channel_ops {
        if op.operation != ChannelOpKind::Receive {
            continue;
        }
        let channel = op.channel_name.trim();
        if channel.ends_with(".Done()") {
            return Some(CancellationMechanism::Context);
        }
        if STOP_CHANNEL_NAMES.contains(&last_segment(channel)) {
            mechanism = Some(CancellationMechanism::Channel);
        }
    }
    mechanism
}

/// `s.stopCh` -> `stopCh`.
fn last_segment(expr: &str) -> &str {
    expr.rsplit('.').next().unwrap_or(expr)
}
