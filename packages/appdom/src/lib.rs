//! # Toolpad AppDom
//!
//! In-memory model of a Toolpad application.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ node: typed nodes, closed set of slots      │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ dom: AppDom tree value                      │
//! │  - add / remove / move / update             │
//! │  - fractional sibling ordering              │
//! │  - every edit returns a new tree            │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ diff: ordered edits, applied atomically     │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **Values, not mutation**: a tree is never changed in place; prior
//!    snapshots stay valid
//! 2. **Stable order**: inserting between siblings never renumbers them
//! 3. **All or nothing**: a diff that fails anywhere changes nothing
//!
//! ## Usage
//!
//! ```rust
//! use toolpad_appdom::{AppDom, DiffOp, Node, NodeAttributes, PageAttributes, ParentProp};
//!
//! let dom = AppDom::new();
//! let page = Node::create("home", NodeAttributes::Page(PageAttributes::titled("Home")));
//! let dom = dom
//!     .apply_diff(&[DiffOp::add(page, &dom.root_id().clone(), ParentProp::Pages)])
//!     .unwrap();
//! assert_eq!(dom.pages().len(), 1);
//! ```

mod binding;
mod diff;
mod dom;
mod errors;
pub mod fractional_index;
mod id_generator;
mod node;
mod query;

pub use binding::{BindableValue, ENV_KEY, JS_EXPRESSION_KEY, TEMPLATE_KEY};
pub use diff::DiffOp;
pub use dom::{is_valid_file_name, propose_name, AppDom, Position};
pub use errors::DomError;
pub use fractional_index::{key_between, IndexError};
pub use id_generator::{fresh_id, stable_id};
pub use node::{
    CodeComponentAttributes, ElementAttributes, Node, NodeAttributes, NodeId, NodeKind,
    PageAttributes, PageDisplay, ParentLink, ParentProp, QueryAttributes, ThemeAttributes,
};
pub use query::{
    LocalQuery, QueryConfig, ResponseType, RestBody, RestQuery, BODY_KINDS, QUERY_KINDS,
    RESPONSE_KINDS,
};
