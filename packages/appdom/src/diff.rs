//! # Diffs
//!
//! Ordered lists of structural edits applied to an [`AppDom`] as a unit.
//!
//! ## Semantics
//!
//! ### Add
//! - Attaches a detached node under `parent_id` in slot `parent_prop`
//! - Fails if the parent is missing or the slot doesn't fit the kinds
//!
//! ### Remove
//! - Removes the node and all descendants
//!
//! ### Update / SetProp
//! - Atomic replacement of the name and/or attributes (kind must not change)
//! - `SetProp` with no value deletes the element prop
//!
//! ### Move
//! - Reparents or reorders; fails if it would create a cycle
//!
//! A diff either applies completely or not at all: the first failing operation
//! aborts the whole call and the input tree is returned untouched.

use crate::binding::BindableValue;
use crate::dom::{AppDom, Position};
use crate::errors::DomError;
use crate::node::{Node, NodeAttributes, NodeId, ParentProp};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum DiffOp {
    #[serde(rename_all = "camelCase")]
    Add {
        node: Node,
        parent_id: NodeId,
        parent_prop: ParentProp,
        #[serde(default)]
        position: Position,
    },

    #[serde(rename_all = "camelCase")]
    Remove { node_id: NodeId },

    #[serde(rename_all = "camelCase")]
    Update {
        node_id: NodeId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        attributes: Option<NodeAttributes>,
    },

    #[serde(rename_all = "camelCase")]
    SetProp {
        node_id: NodeId,
        prop: String,
        #[serde(default)]
        value: Option<BindableValue>,
    },

    #[serde(rename_all = "camelCase")]
    Move {
        node_id: NodeId,
        parent_id: NodeId,
        parent_prop: ParentProp,
        #[serde(default)]
        position: Position,
    },
}

impl DiffOp {
    pub fn add(node: Node, parent_id: &NodeId, parent_prop: ParentProp) -> Self {
        DiffOp::Add {
            node,
            parent_id: parent_id.clone(),
            parent_prop,
            position: Position::Last,
        }
    }

    pub fn remove(node_id: &NodeId) -> Self {
        DiffOp::Remove {
            node_id: node_id.clone(),
        }
    }

    pub fn set_prop(node_id: &NodeId, prop: impl Into<String>, value: BindableValue) -> Self {
        DiffOp::SetProp {
            node_id: node_id.clone(),
            prop: prop.into(),
            value: Some(value),
        }
    }

    fn apply_to(&self, dom: &mut AppDom) -> Result<(), DomError> {
        match self {
            DiffOp::Add {
                node,
                parent_id,
                parent_prop,
                position,
            } => dom.add_in_place(node.clone(), parent_id, parent_prop.clone(), position),

            DiffOp::Remove { node_id } => dom.remove_in_place(node_id),

            DiffOp::Update {
                node_id,
                name,
                attributes,
            } => dom.update_in_place(node_id, name.clone(), attributes.clone()),

            DiffOp::SetProp {
                node_id,
                prop,
                value,
            } => dom.set_prop_in_place(node_id, prop, value.clone()),

            DiffOp::Move {
                node_id,
                parent_id,
                parent_prop,
                position,
            } => dom.move_in_place(node_id, parent_id, parent_prop.clone(), position),
        }
    }
}

impl AppDom {
    /// Apply `ops` in order, all or nothing.
    pub fn apply_diff(&self, ops: &[DiffOp]) -> Result<AppDom, DomError> {
        let mut next = self.clone();
        for (index, op) in ops.iter().enumerate() {
            op.apply_to(&mut next).map_err(|source| DomError::Diff {
                index,
                source: Box::new(source),
            })?;
        }
        Ok(next)
    }
}
