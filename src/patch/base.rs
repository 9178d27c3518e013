//! Corrections that apply to every namespace.

use super::{Patch, PatchContext};
use crate::error::PatchError;
use crate::model::{Kind, NodeId};

pub struct BasePatch;

impl Patch for BasePatch {
    fn name(&self) -> &'static str {
        "base"
    }

    fn patch(&self, cx: &mut PatchContext, element: NodeId) -> Result<NodeId, PatchError> {
        match cx.kind(element) {
            // Private instance data is not part of the API. GPrivate is.
            Kind::Record if is_private(cx, element) => Ok(cx.arena.set_attr(element, "skip", "1")),
            Kind::Alias if aliases_void(cx, element) => Ok(cx.arena.set_attr(element, "skip", "1")),
            Kind::Method => Ok(unshadow(cx, element)),
            kind if kind.is_registered_type() => Ok(functions_to_methods(cx, element)),
            _ => Ok(element),
        }
    }
}

fn is_private(cx: &PatchContext, record: NodeId) -> bool {
    if cx.attr(record, "c:type") == Some("GPrivate") {
        return false;
    }
    cx.name(record)
        .is_some_and(|n| n.ends_with("Private") || n.starts_with('_'))
}

fn aliases_void(cx: &PatchContext, alias: NodeId) -> bool {
    cx.arena
        .child_of_kind(alias, Kind::Type)
        .is_some_and(|t| cx.attr(t, "name") == Some("none"))
}

/// Keep the plain method when its only shadow is the `_with_closures`
/// variant.
fn unshadow(cx: &mut PatchContext, method: NodeId) -> NodeId {
    let mut id = method;
    if cx
        .attr(id, "shadowed-by")
        .is_some_and(|s| s.ends_with("_with_closures"))
    {
        id = cx.arena.remove_attr(id, "shadowed-by");
    }
    if cx.attr(id, "shadows").is_some() && cx.name(id).is_some_and(|n| n.ends_with("_with_closures")) {
        id = cx.arena.remove_attr(id, "shadows");
    }
    id
}

/// Turn functions of a type whose first parameter is that type into
/// methods.
fn functions_to_methods(cx: &mut PatchContext, ty: NodeId) -> NodeId {
    let Some(name) = cx.name(ty).map(str::to_string) else {
        return ty;
    };
    let qualified = format!("{}.{}", cx.namespace, name);
    let mut children = cx.arena.children(ty).to_vec();
    for child in children.iter_mut() {
        if cx.kind(*child) == Kind::Function && takes_instance(cx, *child, &name, &qualified) {
            tracing::debug!(namespace = cx.namespace, function = cx.name(*child).unwrap_or("?"), "function becomes method");
            *child = into_method(cx, *child);
        }
    }
    cx.arena.with_children(ty, children)
}

fn takes_instance(cx: &PatchContext, function: NodeId, name: &str, qualified: &str) -> bool {
    let Some(params) = cx.arena.child_of_kind(function, Kind::Parameters) else {
        return false;
    };
    let Some(&first) = cx.arena.children(params).first() else {
        return false;
    };
    if cx.kind(first) != Kind::Parameter || matches!(cx.attr(first, "direction"), Some("out" | "inout")) {
        return false;
    }
    cx.arena
        .child_of_kind(first, Kind::Type)
        .and_then(|t| cx.attr(t, "name"))
        .is_some_and(|t| t == name || t == qualified)
}

fn into_method(cx: &mut PatchContext, function: NodeId) -> NodeId {
    let Some(params) = cx.arena.child_of_kind(function, Kind::Parameters) else {
        return function;
    };
    let list = cx.arena.children(params).to_vec();
    let Some((&first, rest)) = list.split_first() else {
        return function;
    };
    let mut new_list = vec![cx.arena.update(first, |n| n.kind = Kind::InstanceParameter)];
    for &p in rest {
        new_list.push(shift_indexes(cx, p));
    }
    let new_params = cx.arena.with_children(params, new_list);

    let mut children = cx.arena.children(function).to_vec();
    for child in children.iter_mut() {
        if *child == params {
            *child = new_params;
        } else if cx.kind(*child) == Kind::ReturnValue {
            *child = shift_indexes(cx, *child);
        }
    }
    cx.arena.update(function, |n| {
        n.kind = Kind::Method;
        n.children = children;
    })
}

/// Parameter indexes count from the first parameter, which is now the
/// instance parameter.
fn shift_indexes(cx: &mut PatchContext, id: NodeId) -> NodeId {
    let mut id = id;
    for key in ["closure", "destroy"] {
        if let Some(index) = shifted(cx.attr(id, key)) {
            id = cx.arena.set_attr(id, key, &index);
        }
    }
    let Some(array) = cx.arena.child_of_kind(id, Kind::Array) else {
        return id;
    };
    let Some(length) = shifted(cx.attr(array, "length")) else {
        return id;
    };
    let new_array = cx.arena.set_attr(array, "length", &length);
    let children = cx
        .arena
        .children(id)
        .iter()
        .map(|c| if *c == array { new_array } else { *c })
        .collect();
    cx.arena.with_children(id, children)
}

fn shifted(index: Option<&str>) -> Option<String> {
    let index: usize = index?.parse().ok()?;
    index.checked_sub(1).map(|i| i.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::SymbolIndex;
    use crate::model::sample::ModuleBuilder;
    use crate::model::Module;
    use crate::patch::PatchEngine;

    fn patched(module: Module) -> Module {
        let index = SymbolIndex::build(&module);
        PatchEngine::new().with(BasePatch).apply(module, &index).unwrap()
    }

    fn children(module: &Module, path: &[usize]) -> Vec<NodeId> {
        let ns = module.namespace("Test").unwrap();
        let id = module.arena.node_at(ns, path).unwrap();
        module.arena.children(id).to_vec()
    }

    fn module() -> Module {
        let mut b = ModuleBuilder::linux();
        let ret = b.ty("none", "void");
        let this = b.param("box", "Test.Box", "TestBox*");
        let cb = b.node(
            Kind::Parameter,
            &[("name", "func"), ("closure", "2"), ("destroy", "3")],
            vec![],
        );
        let len = b.ty("gint", "gint");
        let elem = b.ty("utf8", "char*");
        let array = b.node(Kind::Array, &[("length", "4")], vec![elem]);
        let items = b.node(Kind::Parameter, &[("name", "items")], vec![array]);
        let count = b.node(Kind::Parameter, &[("name", "count")], vec![len]);
        let watch = b.callable(
            Kind::Function,
            &[("name", "watch"), ("c:identifier", "test_box_watch")],
            ret,
            vec![this, cb, items, count],
        );

        let ret = b.ty("Box", "TestBox*");
        let other = b.param("size", "gint", "gint");
        let create = b.callable(Kind::Function, &[("name", "create")], ret, vec![other]);

        let ret = b.ty("none", "void");
        let t = b.ty("Box", "TestBox**");
        let out = b.node(Kind::Parameter, &[("name", "target"), ("direction", "out")], vec![t]);
        let fill = b.callable(Kind::Function, &[("name", "fill")], ret, vec![out]);

        let boxed = b.node(
            Kind::Record,
            &[("name", "Box"), ("c:type", "TestBox")],
            vec![watch, create, fill],
        );
        let private = b.node(Kind::Record, &[("name", "BoxPrivate")], vec![]);
        let hidden = b.node(Kind::Record, &[("name", "_Hidden")], vec![]);
        let gprivate = b.node(Kind::Record, &[("name", "Private"), ("c:type", "GPrivate")], vec![]);
        let none = b.ty("none", "void");
        let void = b.node(Kind::Alias, &[("name", "Nothing")], vec![none]);
        b.repo("Test", &[], vec![boxed, private, hidden, gprivate, void]);
        b.finish_merged()
    }

    #[test]
    fn functions_on_their_own_type_become_methods() {
        let m = patched(module());
        let members = children(&m, &[0]);
        let kinds: Vec<Kind> = members.iter().map(|c| m.arena.kind(*c)).collect();
        assert_eq!(kinds, vec![Kind::Method, Kind::Function, Kind::Function]);

        let params = children(&m, &[0, 0, 1]);
        assert_eq!(m.arena.kind(params[0]), Kind::InstanceParameter);
        assert_eq!(m.arena.name(params[0]), Some("box"));
        assert_eq!(m.arena.attr(params[1], "closure"), Some("1"));
        assert_eq!(m.arena.attr(params[1], "destroy"), Some("2"));
        let array = m.arena.child_of_kind(params[2], Kind::Array).unwrap();
        assert_eq!(m.arena.attr(array, "length"), Some("3"));
        assert_eq!(m.arena.attr(members[0], "c:identifier"), Some("test_box_watch"));
    }

    #[test]
    fn private_records_and_void_aliases_are_skipped() {
        let m = patched(module());
        let ns = m.namespace("Test").unwrap();
        let skipped: Vec<(&str, Option<&str>)> = m
            .arena
            .children(ns)
            .iter()
            .skip(1)
            .map(|c| (m.arena.name(*c).unwrap(), m.arena.attr(*c, "skip")))
            .collect();
        assert_eq!(
            skipped,
            vec![
                ("BoxPrivate", Some("1")),
                ("_Hidden", Some("1")),
                ("Private", None),
                ("Nothing", Some("1")),
            ]
        );
    }

    #[test]
    fn closure_variants_no_longer_shadow() {
        let mut b = ModuleBuilder::linux();
        let ret = b.ty("none", "void");
        let plain = b.callable(
            Kind::Method,
            &[("name", "connect"), ("shadowed-by", "connect_with_closures")],
            ret,
            vec![],
        );
        let ret = b.ty("none", "void");
        let closures = b.callable(
            Kind::Method,
            &[("name", "connect_with_closures"), ("shadows", "connect")],
            ret,
            vec![],
        );
        let ret = b.ty("none", "void");
        let kept = b.callable(
            Kind::Method,
            &[("name", "get"), ("shadowed-by", "get_full")],
            ret,
            vec![],
        );
        let class = b.node(Kind::Class, &[("name", "Source")], vec![plain, closures, kept]);
        b.repo("Test", &[], vec![class]);
        let m = patched(b.finish_merged());

        let methods = children(&m, &[0]);
        assert_eq!(m.arena.attr(methods[0], "shadowed-by"), None);
        assert_eq!(m.arena.attr(methods[1], "shadows"), None);
        assert_eq!(m.arena.attr(methods[2], "shadowed-by"), Some("get_full"));
    }

    #[test]
    fn runs_first_among_builtin_patches() {
        assert_eq!(PatchEngine::builtin().names()[0], "base");
    }
}
