//! # Nodes
//!
//! Every entry in the tree is a [`Node`]: an id, a name, a link to its parent
//! slot and kind-specific attributes. Kinds and the slots they own form closed
//! sets, checked by [`ParentProp::accepts`].

use crate::binding::BindableValue;
use crate::id_generator::fresh_id;
use crate::query::QueryConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Opaque node identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        NodeId::new(id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeKind {
    App,
    Page,
    Element,
    Query,
    Theme,
    CodeComponent,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeKind::App => "app",
            NodeKind::Page => "page",
            NodeKind::Element => "element",
            NodeKind::Query => "query",
            NodeKind::Theme => "theme",
            NodeKind::CodeComponent => "codeComponent",
        };
        f.write_str(name)
    }
}

/// Named child slot of a parent node
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ParentProp {
    Pages,
    Themes,
    CodeComponents,
    Children,
    Queries,
    /// Element template attached to the element prop of that name
    Template(String),
}

impl ParentProp {
    pub fn template(prop: impl Into<String>) -> Self {
        ParentProp::from(prop.into())
    }

    pub fn as_str(&self) -> &str {
        match self {
            ParentProp::Pages => "pages",
            ParentProp::Themes => "themes",
            ParentProp::CodeComponents => "codeComponents",
            ParentProp::Children => "children",
            ParentProp::Queries => "queries",
            ParentProp::Template(name) => name,
        }
    }

    /// Whether a `parent` node may hold a `child` node in this slot.
    pub fn accepts(&self, parent: NodeKind, child: NodeKind) -> bool {
        matches!(
            (parent, self, child),
            (NodeKind::App, ParentProp::Pages, NodeKind::Page)
                | (NodeKind::App, ParentProp::Themes, NodeKind::Theme)
                | (NodeKind::App, ParentProp::CodeComponents, NodeKind::CodeComponent)
                | (NodeKind::Page, ParentProp::Children, NodeKind::Element)
                | (NodeKind::Page, ParentProp::Queries, NodeKind::Query)
                | (NodeKind::Element, ParentProp::Children, NodeKind::Element)
                | (NodeKind::Element, ParentProp::Template(_), NodeKind::Element)
        )
    }
}

impl From<String> for ParentProp {
    fn from(value: String) -> Self {
        match value.as_str() {
            "pages" => ParentProp::Pages,
            "themes" => ParentProp::Themes,
            "codeComponents" => ParentProp::CodeComponents,
            "children" => ParentProp::Children,
            "queries" => ParentProp::Queries,
            _ => ParentProp::Template(value),
        }
    }
}

impl From<ParentProp> for String {
    fn from(prop: ParentProp) -> Self {
        prop.as_str().to_string()
    }
}

impl fmt::Display for ParentProp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a node hangs in the tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParentLink {
    pub parent_id: NodeId,
    pub parent_prop: ParentProp,
    pub parent_index: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: NodeId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<ParentLink>,
    pub attributes: NodeAttributes,
}

impl Node {
    /// Create a detached node with a fresh id
    pub fn create(name: impl Into<String>, attributes: NodeAttributes) -> Self {
        Self::with_id(fresh_id(), name, attributes)
    }

    pub fn with_id(id: NodeId, name: impl Into<String>, attributes: NodeAttributes) -> Self {
        Self {
            id,
            name: name.into(),
            parent: None,
            attributes,
        }
    }

    pub fn kind(&self) -> NodeKind {
        self.attributes.kind()
    }

    pub fn parent_id(&self) -> Option<&NodeId> {
        self.parent.as_ref().map(|link| &link.parent_id)
    }

    pub fn parent_index(&self) -> Option<&str> {
        self.parent.as_ref().map(|link| link.parent_index.as_str())
    }

    /// All bindable values held by this node
    pub fn bindings(&self) -> Vec<&BindableValue> {
        match &self.attributes {
            NodeAttributes::Element(element) => element
                .props
                .values()
                .chain(element.layout.values())
                .collect(),
            NodeAttributes::Query(query) => {
                let mut out = query.query.bindings();
                out.extend(query.parameters.iter().map(|(_, v)| v));
                out.extend(query.enabled.iter());
                out
            }
            _ => Vec::new(),
        }
    }

    pub fn as_page(&self) -> Option<&PageAttributes> {
        match &self.attributes {
            NodeAttributes::Page(page) => Some(page),
            _ => None,
        }
    }

    pub fn as_element(&self) -> Option<&ElementAttributes> {
        match &self.attributes {
            NodeAttributes::Element(element) => Some(element),
            _ => None,
        }
    }

    pub fn as_query(&self) -> Option<&QueryAttributes> {
        match &self.attributes {
            NodeAttributes::Query(query) => Some(query),
            _ => None,
        }
    }

    pub fn as_theme(&self) -> Option<&ThemeAttributes> {
        match &self.attributes {
            NodeAttributes::Theme(theme) => Some(theme),
            _ => None,
        }
    }

    pub fn as_code_component(&self) -> Option<&CodeComponentAttributes> {
        match &self.attributes {
            NodeAttributes::CodeComponent(component) => Some(component),
            _ => None,
        }
    }
}

/// Kind-specific attributes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum NodeAttributes {
    App,
    Page(PageAttributes),
    Element(ElementAttributes),
    Query(QueryAttributes),
    Theme(ThemeAttributes),
    CodeComponent(CodeComponentAttributes),
}

impl NodeAttributes {
    pub fn kind(&self) -> NodeKind {
        match self {
            NodeAttributes::App => NodeKind::App,
            NodeAttributes::Page(_) => NodeKind::Page,
            NodeAttributes::Element(_) => NodeKind::Element,
            NodeAttributes::Query(_) => NodeKind::Query,
            NodeAttributes::Theme(_) => NodeKind::Theme,
            NodeAttributes::CodeComponent(_) => NodeKind::CodeComponent,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PageDisplay {
    Standalone,
    Shell,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageAttributes {
    pub title: String,
    #[serde(default)]
    pub parameters: Vec<(String, String)>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<PageDisplay>,
}

impl PageAttributes {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementAttributes {
    pub component: String,
    #[serde(default)]
    pub props: BTreeMap<String, BindableValue>,
    #[serde(default)]
    pub layout: BTreeMap<String, BindableValue>,
}

impl ElementAttributes {
    pub fn of(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            ..Default::default()
        }
    }

    pub fn with_prop(mut self, name: impl Into<String>, value: BindableValue) -> Self {
        self.props.insert(name.into(), value);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryAttributes {
    pub query: QueryConfig,
    #[serde(default)]
    pub parameters: Vec<(String, BindableValue)>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<BindableValue>,
    /// Milliseconds a result stays fresh
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_time: Option<u64>,
    /// Milliseconds between automatic refetches
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refetch_interval: Option<u64>,
}

impl QueryAttributes {
    pub fn new(query: QueryConfig) -> Self {
        Self {
            query,
            parameters: Vec::new(),
            enabled: None,
            cache_time: None,
            refetch_interval: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ThemeAttributes {
    #[serde(default)]
    pub options: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CodeComponentAttributes {
    pub code: String,
}
