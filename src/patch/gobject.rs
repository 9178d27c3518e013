//! Corrections for the GObject namespace.

use super::{Patch, PatchContext};
use crate::error::PatchError;
use crate::model::{Kind, Node, NodeId};

pub struct GObjectPatch;

impl Patch for GObjectPatch {
    fn name(&self) -> &'static str {
        "gobject"
    }

    fn patch(&self, cx: &mut PatchContext, element: NodeId) -> Result<NodeId, PatchError> {
        if cx.namespace != "GObject" {
            return Ok(element);
        }

        match cx.kind(element) {
            // GInitiallyUnownedClass is laid out exactly like GObjectClass.
            // Declaring it as one field of that type makes it a subtype.
            Kind::Record if cx.name(element) == Some("InitiallyUnownedClass") => {
                let fields: Vec<NodeId> = cx.arena.children_of_kind(element, Kind::Field).collect();
                if let &[only] = fields.as_slice() {
                    if cx.attr(only, "name") == Some("parent_class") {
                        return Ok(element);
                    }
                }
                let ty = cx.alloc(
                    Node::new(Kind::Type)
                        .with_attr("name", "GObject.ObjectClass")
                        .with_attr("c:type", "GObjectClass"),
                );
                let field = cx.alloc(
                    Node::new(Kind::Field)
                        .with_attr("name", "parent_class")
                        .with_children(vec![ty]),
                );
                let mut children: Vec<NodeId> = cx.arena.children_of_kind(element, Kind::Doc).collect();
                children.push(field);
                Ok(cx.arena.with_children(element, children))
            }

            // g_type_module_use clashes with g_type_plugin_use, which has a
            // different return type.
            Kind::Method if cx.attr(element, "c:identifier") == Some("g_type_module_use") => {
                Ok(cx.arena.set_attr(element, "name", "use_type_module"))
            }

            _ => Ok(element),
        }
    }
}
