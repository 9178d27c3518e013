//! Element kinds of the introspection model.
//!
//! Every kind has a declaration-style type name (`VirtualMethod`) and a tag
//! name (`virtual-method`). Tags are derived from the type name by
//! hyphenating at capitals, except for a few compound kinds whose tags carry
//! a namespace prefix.

use std::sync::LazyLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Kind {
    Alias,
    Array,
    Attribute,
    Bitfield,
    Boxed,
    Callback,
    CInclude,
    Class,
    Constant,
    Constructor,
    Doc,
    Docsection,
    DocDeprecated,
    DocVersion,
    DocStability,
    DocFormat,
    Enumeration,
    Field,
    Function,
    FunctionInline,
    FunctionMacro,
    Implements,
    Include,
    InstanceParameter,
    Interface,
    Member,
    Method,
    MethodInline,
    Namespace,
    Package,
    Parameter,
    Parameters,
    Prerequisite,
    Property,
    Record,
    Repository,
    ReturnValue,
    Signal,
    SourcePosition,
    Type,
    Union,
    Varargs,
    VirtualMethod,
}

static TAGS: LazyLock<Vec<String>> =
    LazyLock::new(|| Kind::ALL.iter().map(|k| tag_for(k.type_name())).collect());

impl Kind {
    pub const ALL: [Kind; 43] = [
        Kind::Alias,
        Kind::Array,
        Kind::Attribute,
        Kind::Bitfield,
        Kind::Boxed,
        Kind::Callback,
        Kind::CInclude,
        Kind::Class,
        Kind::Constant,
        Kind::Constructor,
        Kind::Doc,
        Kind::Docsection,
        Kind::DocDeprecated,
        Kind::DocVersion,
        Kind::DocStability,
        Kind::DocFormat,
        Kind::Enumeration,
        Kind::Field,
        Kind::Function,
        Kind::FunctionInline,
        Kind::FunctionMacro,
        Kind::Implements,
        Kind::Include,
        Kind::InstanceParameter,
        Kind::Interface,
        Kind::Member,
        Kind::Method,
        Kind::MethodInline,
        Kind::Namespace,
        Kind::Package,
        Kind::Parameter,
        Kind::Parameters,
        Kind::Prerequisite,
        Kind::Property,
        Kind::Record,
        Kind::Repository,
        Kind::ReturnValue,
        Kind::Signal,
        Kind::SourcePosition,
        Kind::Type,
        Kind::Union,
        Kind::Varargs,
        Kind::VirtualMethod,
    ];

    pub fn type_name(self) -> &'static str {
        match self {
            Kind::Alias => "Alias",
            Kind::Array => "Array",
            Kind::Attribute => "Attribute",
            Kind::Bitfield => "Bitfield",
            Kind::Boxed => "Boxed",
            Kind::Callback => "Callback",
            Kind::CInclude => "CInclude",
            Kind::Class => "Class",
            Kind::Constant => "Constant",
            Kind::Constructor => "Constructor",
            Kind::Doc => "Doc",
            Kind::Docsection => "Docsection",
            Kind::DocDeprecated => "DocDeprecated",
            Kind::DocVersion => "DocVersion",
            Kind::DocStability => "DocStability",
            Kind::DocFormat => "DocFormat",
            Kind::Enumeration => "Enumeration",
            Kind::Field => "Field",
            Kind::Function => "Function",
            Kind::FunctionInline => "FunctionInline",
            Kind::FunctionMacro => "FunctionMacro",
            Kind::Implements => "Implements",
            Kind::Include => "Include",
            Kind::InstanceParameter => "InstanceParameter",
            Kind::Interface => "Interface",
            Kind::Member => "Member",
            Kind::Method => "Method",
            Kind::MethodInline => "MethodInline",
            Kind::Namespace => "Namespace",
            Kind::Package => "Package",
            Kind::Parameter => "Parameter",
            Kind::Parameters => "Parameters",
            Kind::Prerequisite => "Prerequisite",
            Kind::Property => "Property",
            Kind::Record => "Record",
            Kind::Repository => "Repository",
            Kind::ReturnValue => "ReturnValue",
            Kind::Signal => "Signal",
            Kind::SourcePosition => "SourcePosition",
            Kind::Type => "Type",
            Kind::Union => "Union",
            Kind::Varargs => "Varargs",
            Kind::VirtualMethod => "VirtualMethod",
        }
    }

    /// The element tag, also used as the `#selector` token in rule files.
    pub fn tag(self) -> &'static str {
        &TAGS[self as usize]
    }

    pub fn from_tag(tag: &str) -> Option<Kind> {
        Kind::ALL.iter().copied().find(|k| k.tag() == tag)
    }

    /// Types that can be looked up by name in a namespace.
    pub fn is_registered_type(self) -> bool {
        matches!(
            self,
            Kind::Alias
                | Kind::Bitfield
                | Kind::Boxed
                | Kind::Callback
                | Kind::Class
                | Kind::Enumeration
                | Kind::Interface
                | Kind::Record
                | Kind::Union
        )
    }

    pub fn is_callable(self) -> bool {
        matches!(
            self,
            Kind::Callback
                | Kind::Constructor
                | Kind::Function
                | Kind::FunctionInline
                | Kind::FunctionMacro
                | Kind::Method
                | Kind::MethodInline
                | Kind::Signal
                | Kind::VirtualMethod
        )
    }

    /// Nodes whose `name` (or `glib:type-name`) points at another declaration.
    pub fn is_type_reference(self) -> bool {
        matches!(self, Kind::Type | Kind::Implements | Kind::Prerequisite)
    }

    /// Declarations that are dropped from generation as a whole when one of
    /// their type references does not resolve.
    pub fn is_member(self) -> bool {
        matches!(
            self,
            Kind::Alias
                | Kind::Callback
                | Kind::Constant
                | Kind::Constructor
                | Kind::Field
                | Kind::Function
                | Kind::Method
                | Kind::Property
                | Kind::Signal
                | Kind::VirtualMethod
                | Kind::Implements
                | Kind::Prerequisite
        )
    }

    /// Kinds whose children are merged element by element across platforms.
    pub fn is_container(self) -> bool {
        matches!(
            self,
            Kind::Repository
                | Kind::Namespace
                | Kind::Class
                | Kind::Interface
                | Kind::Record
                | Kind::Union
                | Kind::Boxed
                | Kind::Enumeration
                | Kind::Bitfield
        )
    }

    /// The attribute holding the element's name for matching purposes.
    pub fn name_key(self) -> &'static str {
        match self {
            Kind::Boxed => "glib:name",
            _ => "name",
        }
    }
}

/// Convert a type name like `FooBar` to its tag, `foo-bar`.
fn tag_for(type_name: &str) -> String {
    match type_name {
        "CInclude" => return "c:include".to_string(),
        "DocFormat" => return "doc:format".to_string(),
        "Boxed" => return "glib:boxed".to_string(),
        "Signal" => return "glib:signal".to_string(),
        _ => {}
    }
    let mut tag = String::with_capacity(type_name.len() + 4);
    for (i, c) in type_name.chars().enumerate() {
        if i > 0 && c.is_ascii_uppercase() {
            tag.push('-');
        }
        tag.push(c.to_ascii_lowercase());
    }
    tag
}
