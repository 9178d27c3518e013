//! Corrections for the GLib namespace.

use super::{Patch, PatchContext};
use crate::error::PatchError;
use crate::model::{Kind, Node, NodeId};

pub struct GLibPatch;

impl Patch for GLibPatch {
    fn name(&self) -> &'static str {
        "glib"
    }

    fn patch(&self, cx: &mut PatchContext, element: NodeId) -> Result<NodeId, PatchError> {
        if cx.namespace != "GLib" {
            return Ok(element);
        }

        match cx.kind(element) {
            // GType is gone from GLib but `g_strv_get_type` still returns it.
            Kind::Namespace => {
                let exists = cx
                    .arena
                    .children_of_kind(element, Kind::Alias)
                    .any(|a| cx.arena.attr(a, "name") == Some("Type"));
                if exists {
                    return Ok(element);
                }
                let gsize = cx.alloc(
                    Node::new(Kind::Type)
                        .with_attr("name", "gsize")
                        .with_attr("c:type", "gsize"),
                );
                let alias = cx.alloc(
                    Node::new(Kind::Alias)
                        .with_attr("name", "Type")
                        .with_attr("c:type", "GType")
                        .with_children(vec![gsize]),
                );
                Ok(cx.add(element, alias))
            }

            // Take a plain pointer instead of a string array, so no array is
            // marshalled just to be freed.
            Kind::Function if cx.attr(element, "c:identifier") == Some("g_strfreev") => {
                let Some(params) = cx.arena.child_of_kind(element, Kind::Parameters) else {
                    return Ok(element);
                };
                let Some(&first) = cx.arena.children(params).first() else {
                    return Ok(element);
                };
                let Some(pos) = cx
                    .arena
                    .children(first)
                    .iter()
                    .position(|c| matches!(cx.arena.kind(*c), Kind::Type | Kind::Array))
                else {
                    return Ok(element);
                };
                let current = cx.arena.children(first)[pos];
                if cx.attr(current, "name") == Some("gpointer") {
                    return Ok(element);
                }
                let gpointer = cx.alloc(
                    Node::new(Kind::Type)
                        .with_attr("name", "gpointer")
                        .with_attr("c:type", "gpointer"),
                );
                let mut children = cx.arena.children(first).to_vec();
                children[pos] = gpointer;
                let first = cx.arena.with_children(first, children);

                let mut params_children = cx.arena.children(params).to_vec();
                params_children[0] = first;
                let params_new = cx.arena.with_children(params, params_children);
                let children = replace_child(cx, element, params, params_new);
                Ok(cx.arena.with_children(element, children))
            }

            // Strv is declared as `utf8` with c:type `gchar**`; make it an array.
            Kind::Alias if cx.name(element) == Some("Strv") => {
                if cx.arena.child_of_kind(element, Kind::Array).is_some() {
                    return Ok(element);
                }
                let utf8 = cx.alloc(Node::new(Kind::Type).with_attr("name", "utf8"));
                let array = cx.alloc(
                    Node::new(Kind::Array)
                        .with_attr("zero-terminated", "1")
                        .with_children(vec![utf8]),
                );
                let mut children: Vec<NodeId> = cx
                    .arena
                    .children(element)
                    .iter()
                    .copied()
                    .filter(|c| cx.arena.kind(*c) != Kind::Type)
                    .collect();
                children.push(array);
                Ok(cx.arena.with_children(element, children))
            }

            _ => Ok(element),
        }
    }
}

fn replace_child(cx: &PatchContext, parent: NodeId, old: NodeId, new: NodeId) -> Vec<NodeId> {
    cx.arena
        .children(parent)
        .iter()
        .map(|c| if *c == old { new } else { *c })
        .collect()
}
