//! Corrections for Gtk, and for widget constructors in namespaces built on
//! top of it.

use super::{Patch, PatchContext};
use crate::error::PatchError;
use crate::model::{Kind, NodeId};

/// Declarations that only make sense from C. The callbacks lack the
/// annotations needed to manage their lifetime.
const CUSTOM_LAYOUT: &[(Kind, &str)] = &[
    (Kind::Callback, "CustomRequestModeFunc"),
    (Kind::Callback, "CustomMeasureFunc"),
    (Kind::Callback, "CustomAllocateFunc"),
    (Kind::Record, "CustomLayoutClass"),
    (Kind::Class, "CustomLayout"),
];

/// Methods whose names clash with an inherited method of a different
/// signature, by `c:identifier`: (identifier, attribute, new value).
const RENAMES: &[(&str, &str, &str)] = &[
    ("gtk_application_window_get_id", "name", "get_window_id"),
    ("gtk_menu_button_get_direction", "name", "get_arrow_direction"),
    ("gtk_print_settings_get", "name", "get_string"),
    ("gtk_print_unix_dialog_get_settings", "name", "get_print_settings"),
    ("gtk_widget_activate", "name", "activate_widget"),
    ("gtk_widget_activate_action", "name", "activate_action_if_exists"),
    ("gtk_widget_activate_action_variant", "shadows", "activate_action_if_exists"),
];

pub struct GtkPatch;

impl Patch for GtkPatch {
    fn name(&self) -> &'static str {
        "gtk"
    }

    fn patch(&self, cx: &mut PatchContext, element: NodeId) -> Result<NodeId, PatchError> {
        // Every namespace: widgets of libraries built on Gtk return Gtk.Widget.
        if cx.kind(element) == Kind::Class {
            return Ok(redirect_constructors(cx, element));
        }

        if cx.namespace != "Gtk" {
            return Ok(element);
        }

        match cx.kind(element) {
            Kind::Namespace => {
                let mut ns = element;
                for (kind, name) in CUSTOM_LAYOUT {
                    ns = cx.remove(ns, *kind, "name", name);
                }
                Ok(ns)
            }
            Kind::Method => {
                let ident = cx.attr(element, "c:identifier");
                match RENAMES.iter().find(|(id, _, _)| Some(*id) == ident) {
                    Some((_, key, value)) => Ok(cx.arena.set_attr(element, key, value)),
                    None => Ok(element),
                }
            }
            _ => Ok(element),
        }
    }
}

/// Named constructors of widgets usually return `GtkWidget*`. Point them at
/// the class they construct instead.
fn redirect_constructors(cx: &mut PatchContext, class: NodeId) -> NodeId {
    let Some(class_name) = cx.name(class).map(str::to_string) else {
        return class;
    };
    let c_type = match cx.attr(class, "c:type") {
        Some(c) => format!("{}*", c),
        None => format!("Gtk{}*", class_name),
    };

    let mut children = cx.arena.children(class).to_vec();
    for child in children.iter_mut() {
        if cx.kind(*child) != Kind::Constructor || cx.name(*child) == Some("new") {
            continue;
        }
        let Some(rv) = cx.arena.child_of_kind(*child, Kind::ReturnValue) else {
            continue;
        };
        let Some(ty) = cx.arena.child_of_kind(rv, Kind::Type) else {
            continue;
        };
        if cx.attr(ty, "c:type") != Some("GtkWidget*") {
            continue;
        }
        let widget = match cx.attr(ty, "name") {
            Some("Gtk.Widget") => true,
            Some("Widget") => cx.namespace == "Gtk",
            _ => false,
        };
        if !widget {
            continue;
        }
        let new_ty = cx.arena.set_attr(ty, "name", &class_name);
        let new_ty = cx.arena.set_attr(new_ty, "c:type", &c_type);
        let rv_children = swap(cx.arena.children(rv), ty, new_ty);
        let new_rv = cx.arena.with_children(rv, rv_children);
        let ctor_children = swap(cx.arena.children(*child), rv, new_rv);
        *child = cx.arena.with_children(*child, ctor_children);
    }
    cx.arena.with_children(class, children)
}

fn swap(children: &[NodeId], old: NodeId, new: NodeId) -> Vec<NodeId> {
    children
        .iter()
        .map(|c| if *c == old { new } else { *c })
        .collect()
}
