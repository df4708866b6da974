//! # Application Document
//!
//! The whole tree, stored as a flat id → node map. Structure lives in each
//! node's [`ParentLink`]; sibling order is the byte order of `parent_index`.
//!
//! Public operations never modify `self`: they clone, apply, and return the new
//! value, so a previous snapshot stays valid for as long as anyone holds it.
//!
//! ```text
//! app ─┬─ pages ────────── page ─┬─ children ─ element ─┬─ children ─ element
//!      │                         │                      └─ <template> ─ element
//!      │                         └─ queries ── query
//!      ├─ themes ───────── theme
//!      └─ codeComponents ─ codeComponent
//! ```

use crate::binding::BindableValue;
use crate::errors::DomError;
use crate::fractional_index::key_between;
use crate::id_generator::stable_id;
use crate::node::{Node, NodeAttributes, NodeId, NodeKind, ParentLink, ParentProp};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Where to put a node among its future siblings
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Position {
    /// After the current last sibling
    #[default]
    Last,
    /// Before the current first sibling
    First,
    /// Directly before the given sibling
    Before(NodeId),
    /// Directly after the given sibling
    After(NodeId),
}

/// Only built through its own operations, so it is `Serialize` but not
/// `Deserialize`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppDom {
    root: NodeId,
    nodes: BTreeMap<NodeId, Node>,
}

impl Default for AppDom {
    fn default() -> Self {
        Self::new()
    }
}

impl AppDom {
    /// Tree holding only the root node
    pub fn new() -> Self {
        let root = Node::with_id(stable_id("app", "root"), "Application", NodeAttributes::App);
        let root_id = root.id.clone();
        let mut nodes = BTreeMap::new();
        nodes.insert(root_id.clone(), root);
        Self {
            root: root_id,
            nodes,
        }
    }

    pub fn root_id(&self) -> &NodeId {
        &self.root
    }

    pub fn root(&self) -> &Node {
        &self.nodes[&self.root]
    }

    pub fn get(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn node(&self, id: &NodeId) -> Result<&Node, DomError> {
        self.nodes
            .get(id)
            .ok_or_else(|| DomError::NodeNotFound(id.clone()))
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Children of `parent` in one slot, ordered by parent index
    pub fn children(&self, parent: &NodeId, prop: &ParentProp) -> Vec<&Node> {
        let mut children: Vec<&Node> = self
            .nodes
            .values()
            .filter(|node| {
                node.parent
                    .as_ref()
                    .is_some_and(|link| &link.parent_id == parent && &link.parent_prop == prop)
            })
            .collect();
        sort_siblings(&mut children);
        children
    }

    /// All children of `parent`, grouped by slot and ordered by parent index
    pub fn child_nodes(&self, parent: &NodeId) -> BTreeMap<ParentProp, Vec<&Node>> {
        let mut slots: BTreeMap<ParentProp, Vec<&Node>> = BTreeMap::new();
        for node in self.nodes.values() {
            if let Some(link) = &node.parent {
                if &link.parent_id == parent {
                    slots.entry(link.parent_prop.clone()).or_default().push(node);
                }
            }
        }
        for children in slots.values_mut() {
            sort_siblings(children);
        }
        slots
    }

    pub fn pages(&self) -> Vec<&Node> {
        self.children(&self.root, &ParentProp::Pages)
    }

    pub fn page_by_name(&self, name: &str) -> Option<&Node> {
        self.pages().into_iter().find(|page| page.name == name)
    }

    pub fn code_components(&self) -> Vec<&Node> {
        self.children(&self.root, &ParentProp::CodeComponents)
    }

    pub fn theme(&self) -> Option<&Node> {
        self.children(&self.root, &ParentProp::Themes).into_iter().next()
    }

    /// Ids of `id` and everything below it
    pub fn subtree_ids(&self, id: &NodeId) -> Vec<NodeId> {
        let mut by_parent: HashMap<&NodeId, Vec<&NodeId>> = HashMap::new();
        for node in self.nodes.values() {
            if let Some(parent) = node.parent_id() {
                by_parent.entry(parent).or_default().push(&node.id);
            }
        }

        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            out.push(current.clone());
            if let Some(children) = by_parent.get(current) {
                stack.extend(children.iter().copied());
            }
        }
        out
    }

    pub fn add_node(
        &self,
        node: Node,
        parent: &NodeId,
        prop: ParentProp,
        position: Position,
    ) -> Result<AppDom, DomError> {
        let mut next = self.clone();
        next.add_in_place(node, parent, prop, &position)?;
        Ok(next)
    }

    pub fn remove_node(&self, id: &NodeId) -> Result<AppDom, DomError> {
        let mut next = self.clone();
        next.remove_in_place(id)?;
        Ok(next)
    }

    pub fn move_node(
        &self,
        id: &NodeId,
        parent: &NodeId,
        prop: ParentProp,
        position: Position,
    ) -> Result<AppDom, DomError> {
        let mut next = self.clone();
        next.move_in_place(id, parent, prop, &position)?;
        Ok(next)
    }

    pub fn update_node(
        &self,
        id: &NodeId,
        name: Option<String>,
        attributes: Option<NodeAttributes>,
    ) -> Result<AppDom, DomError> {
        let mut next = self.clone();
        next.update_in_place(id, name, attributes)?;
        Ok(next)
    }

    pub fn set_prop(
        &self,
        id: &NodeId,
        prop: &str,
        value: Option<BindableValue>,
    ) -> Result<AppDom, DomError> {
        let mut next = self.clone();
        next.set_prop_in_place(id, prop, value)?;
        Ok(next)
    }

    // In-place variants. Each one validates everything before touching
    // `self`, so a failed call leaves the tree as it was.

    pub(crate) fn add_in_place(
        &mut self,
        mut node: Node,
        parent: &NodeId,
        prop: ParentProp,
        position: &Position,
    ) -> Result<(), DomError> {
        if self.nodes.contains_key(&node.id) {
            return Err(DomError::DuplicateId(node.id));
        }
        let parent_kind = self
            .nodes
            .get(parent)
            .ok_or_else(|| DomError::ParentNotFound(parent.clone()))?
            .kind();
        if !prop.accepts(parent_kind, node.kind()) {
            return Err(DomError::InvalidSlot {
                parent: parent_kind,
                prop,
                child: node.kind(),
            });
        }
        if node.kind() == NodeKind::Theme && self.theme().is_some() {
            return Err(DomError::ThemeExists);
        }
        if let ParentProp::Template(name) = &prop {
            self.check_template_slot(parent, name)?;
        }
        self.check_name(parent, &prop, node.kind(), &node.name, None)?;

        let parent_index = self.index_for(parent, &prop, position, None)?;
        node.parent = Some(ParentLink {
            parent_id: parent.clone(),
            parent_prop: prop,
            parent_index,
        });
        self.nodes.insert(node.id.clone(), node);
        Ok(())
    }

    pub(crate) fn remove_in_place(&mut self, id: &NodeId) -> Result<(), DomError> {
        if id == &self.root {
            return Err(DomError::RootImmutable("removed"));
        }
        if !self.nodes.contains_key(id) {
            return Err(DomError::NodeNotFound(id.clone()));
        }
        for removed in self.subtree_ids(id) {
            self.nodes.remove(&removed);
        }
        Ok(())
    }

    pub(crate) fn move_in_place(
        &mut self,
        id: &NodeId,
        parent: &NodeId,
        prop: ParentProp,
        position: &Position,
    ) -> Result<(), DomError> {
        if id == &self.root {
            return Err(DomError::RootImmutable("moved"));
        }
        let node = self.node(id)?;
        let (kind, name) = (node.kind(), node.name.clone());
        let parent_kind = self
            .nodes
            .get(parent)
            .ok_or_else(|| DomError::ParentNotFound(parent.clone()))?
            .kind();
        if self.subtree_ids(id).contains(parent) {
            return Err(DomError::CycleDetected);
        }
        if !prop.accepts(parent_kind, kind) {
            return Err(DomError::InvalidSlot {
                parent: parent_kind,
                prop,
                child: kind,
            });
        }
        if let ParentProp::Template(template) = &prop {
            self.check_template_slot(parent, template)?;
        }
        self.check_name(parent, &prop, kind, &name, Some(id))?;

        let parent_index = self.index_for(parent, &prop, position, Some(id))?;
        if let Some(node) = self.nodes.get_mut(id) {
            node.parent = Some(ParentLink {
                parent_id: parent.clone(),
                parent_prop: prop,
                parent_index,
            });
        }
        Ok(())
    }

    pub(crate) fn update_in_place(
        &mut self,
        id: &NodeId,
        name: Option<String>,
        attributes: Option<NodeAttributes>,
    ) -> Result<(), DomError> {
        let node = self.node(id)?;
        if let Some(attributes) = &attributes {
            if attributes.kind() != node.kind() {
                return Err(DomError::KindMismatch {
                    expected: node.kind(),
                    found: attributes.kind(),
                });
            }
        }
        if let Some(NodeAttributes::Element(element)) = &attributes {
            for prop in element.props.keys() {
                self.check_value_prop(id, prop)?;
            }
        }
        if let (Some(name), Some(link)) = (&name, &node.parent) {
            self.check_name(&link.parent_id, &link.parent_prop, node.kind(), name, Some(id))?;
        }

        if let Some(node) = self.nodes.get_mut(id) {
            if let Some(name) = name {
                node.name = name;
            }
            if let Some(attributes) = attributes {
                node.attributes = attributes;
            }
        }
        Ok(())
    }

    pub(crate) fn set_prop_in_place(
        &mut self,
        id: &NodeId,
        prop: &str,
        value: Option<BindableValue>,
    ) -> Result<(), DomError> {
        if value.is_some() {
            self.check_value_prop(id, prop)?;
        }
        let node = self
            .nodes
            .get_mut(id)
            .ok_or_else(|| DomError::NodeNotFound(id.clone()))?;
        let found = node.kind();
        match &mut node.attributes {
            NodeAttributes::Element(element) => {
                match value {
                    Some(value) => element.props.insert(prop.to_string(), value),
                    None => element.props.remove(prop),
                };
                Ok(())
            }
            _ => Err(DomError::KindMismatch {
                expected: NodeKind::Element,
                found,
            }),
        }
    }

    /// A prop is stored either as a value on the element or as a template
    /// slot holding children, never both.
    fn check_value_prop(&self, id: &NodeId, prop: &str) -> Result<(), DomError> {
        if self.children(id, &ParentProp::template(prop)).is_empty() {
            Ok(())
        } else {
            Err(DomError::PropConflict {
                node: id.clone(),
                prop: prop.to_string(),
            })
        }
    }

    fn check_template_slot(&self, parent: &NodeId, prop: &str) -> Result<(), DomError> {
        let has_value = self
            .get(parent)
            .and_then(|node| node.as_element())
            .is_some_and(|element| element.props.contains_key(prop));
        if has_value {
            Err(DomError::PropConflict {
                node: parent.clone(),
                prop: prop.to_string(),
            })
        } else {
            Ok(())
        }
    }

    /// Page and code component names become file names, so they must be
    /// usable as such and unique within their slot.
    fn check_name(
        &self,
        parent: &NodeId,
        prop: &ParentProp,
        kind: NodeKind,
        name: &str,
        exclude: Option<&NodeId>,
    ) -> Result<(), DomError> {
        if !matches!(kind, NodeKind::Page | NodeKind::CodeComponent) {
            return Ok(());
        }
        if !is_valid_file_name(name) {
            return Err(DomError::InvalidName {
                kind,
                name: name.to_string(),
            });
        }
        let taken = self
            .children(parent, prop)
            .iter()
            .any(|sibling| sibling.name == name && Some(&sibling.id) != exclude);
        if taken {
            return Err(DomError::DuplicateName {
                kind,
                name: name.to_string(),
            });
        }
        Ok(())
    }

    fn index_for(
        &self,
        parent: &NodeId,
        prop: &ParentProp,
        position: &Position,
        moving: Option<&NodeId>,
    ) -> Result<String, DomError> {
        let siblings: Vec<&Node> = self
            .children(parent, prop)
            .into_iter()
            .filter(|node| Some(&node.id) != moving)
            .collect();
        let index_at = |i: usize| siblings.get(i).and_then(|node| node.parent_index());

        let key = match position {
            Position::Last => key_between(siblings.last().and_then(|n| n.parent_index()), None)?,
            Position::First => key_between(None, index_at(0))?,
            Position::Before(sibling) => {
                let at = position_of(&siblings, sibling)?;
                let before = if at == 0 { None } else { index_at(at - 1) };
                key_between(before, index_at(at))?
            }
            Position::After(sibling) => {
                let at = position_of(&siblings, sibling)?;
                key_between(index_at(at), index_at(at + 1))?
            }
        };
        Ok(key)
    }
}

fn position_of(siblings: &[&Node], id: &NodeId) -> Result<usize, DomError> {
    siblings
        .iter()
        .position(|node| &node.id == id)
        .ok_or_else(|| DomError::SiblingMismatch(id.clone()))
}

fn sort_siblings(nodes: &mut [&Node]) {
    nodes.sort_by(|a, b| {
        a.parent_index()
            .cmp(&b.parent_index())
            .then_with(|| a.id.cmp(&b.id))
    });
}

/// Usable as a single path component on every platform we write to.
pub fn is_valid_file_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && !name
            .chars()
            .any(|c| matches!(c, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|') || c.is_control())
}

/// Next free name of the form `{base}{n}` among `existing`.
pub fn propose_name<'a>(base: &str, existing: impl IntoIterator<Item = &'a str>) -> String {
    let taken: HashSet<&str> = existing.into_iter().collect();
    if !taken.contains(base) {
        return base.to_string();
    }
    (1..)
        .map(|n| format!("{base}{n}"))
        .find(|candidate| !taken.contains(candidate.as_str()))
        .unwrap_or_else(|| base.to_string())
}
