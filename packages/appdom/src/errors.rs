//! Error types for the document model

use crate::fractional_index::IndexError;
use crate::node::{NodeId, NodeKind, ParentProp};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomError {
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("Parent not found: {0}")]
    ParentNotFound(NodeId),

    #[error("Node already exists: {0}")]
    DuplicateId(NodeId),

    #[error("A {parent} node has no \"{prop}\" slot for a {child} node")]
    InvalidSlot {
        parent: NodeKind,
        prop: ParentProp,
        child: NodeKind,
    },

    #[error("Sibling {0} is not in the target slot")]
    SiblingMismatch(NodeId),

    #[error("Name \"{name}\" is already used by another {kind}")]
    DuplicateName { kind: NodeKind, name: String },

    #[error("Invalid name for a {kind}: {name:?}")]
    InvalidName { kind: NodeKind, name: String },

    #[error("Only one theme is allowed")]
    ThemeExists,

    #[error("The root node cannot be {0}")]
    RootImmutable(&'static str),

    #[error("Would create cycle")]
    CycleDetected,

    #[error("Prop \"{prop}\" of {node} cannot be both a value and a template")]
    PropConflict { node: NodeId, prop: String },

    #[error("Expected a {expected} node, found {found}")]
    KindMismatch { expected: NodeKind, found: NodeKind },

    #[error("Index error: {0}")]
    Index(#[from] IndexError),

    #[error("Diff operation {index} failed: {source}")]
    Diff {
        index: usize,
        #[source]
        source: Box<DomError>,
    },
}
