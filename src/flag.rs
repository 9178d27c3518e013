//! Feature-availability flagging.
//!
//! Callables that would have to forward a native `va_list` cannot be bound
//! on any platform, and C variadic functions only on platforms whose calling
//! convention allows it. Such callables are kept but get
//! `unsupported="<platforms>"`, so the emitter can produce a stub that fails
//! predictably.

use crate::model::{Arena, Kind, Module, NodeId, Platforms};
use std::convert::Infallible;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlagPolicy {
    /// Platforms on which C variadic (`...`) callables are unsupported.
    pub varargs: Platforms,
}

pub fn flag(mut module: Module, policy: &FlagPolicy) -> Module {
    let mut flagged = 0usize;
    let names: Vec<String> = module.repositories.keys().cloned().collect();
    for name in names {
        let Some(root) = module.repositories.get(&name).map(|r| r.root) else {
            continue;
        };
        let result: Result<NodeId, Infallible> = module.arena.rewrite(root, &mut |arena, _, id| {
            let unsupported = unsupported_on(arena, id, policy);
            if unsupported.is_empty() {
                return Ok(id);
            }
            flagged += 1;
            tracing::debug!(repository = %name, callable = arena.name(id).unwrap_or("?"), %unsupported, "flagged");
            Ok(arena.set_attr(id, "unsupported", &unsupported.to_string()))
        });
        let root = match result {
            Ok(root) => root,
            Err(never) => match never {},
        };
        if let Some(repo) = module.repositories.get_mut(&name) {
            repo.root = root;
        }
    }
    tracing::info!(flagged, "feature flagging done");
    module
}

/// Platforms on which a callable cannot be bound. Empty for anything else.
fn unsupported_on(arena: &Arena, id: NodeId, policy: &FlagPolicy) -> Platforms {
    if !arena.kind(id).is_callable() {
        return Platforms::empty();
    }
    let Some(params) = arena.child_of_kind(id, Kind::Parameters) else {
        return Platforms::empty();
    };
    let defined = match arena.platforms(id) {
        p if p.is_empty() => Platforms::all(),
        p => p,
    };
    let mut out = Platforms::empty();
    for &param in arena.children(params) {
        if takes_va_list(arena, param) {
            out = out.union(defined);
        }
        if arena.child_of_kind(param, Kind::Varargs).is_some() {
            out = out.union(policy.varargs.intersection(defined));
        }
    }
    out
}

fn takes_va_list(arena: &Arena, param: NodeId) -> bool {
    arena.children_of_kind(param, Kind::Type).any(|t| {
        let spelled = |key: &str| {
            arena
                .attr(t, key)
                .map(|v| v.replace(' ', ""))
                .is_some_and(|v| v == "va_list" || v == "va_list*")
        };
        spelled("c:type") || spelled("name")
    })
}
