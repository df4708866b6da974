//! Conversion between file documents and tree nodes.
//!
//! Expanding a page produces the diff that attaches its whole subtree; merging
//! applies those diffs one unit at a time. Collapsing goes the other way for
//! save.

use crate::errors::ProjectResult;
use crate::schema::{query_config_to_value, ElementSpec, PageFile, PageSpec, PropSpec, QuerySpec};
use std::collections::BTreeMap;
use std::path::Path;
use toolpad_appdom::{
    stable_id, AppDom, CodeComponentAttributes, DiffOp, DomError, ElementAttributes,
    Node, NodeAttributes, NodeId, NodeKind, PageAttributes, ParentProp, QueryAttributes,
    ThemeAttributes,
};

/// Diff attaching the page described by `file` (and everything in it) to the root.
pub fn expand_page(root: &NodeId, name: &str, file: PageFile) -> Vec<DiffOp> {
    let id = match file.id {
        Some(id) => NodeId::new(id),
        None => stable_id("page", name),
    };
    let attributes = PageAttributes {
        title: file.title.unwrap_or_else(|| name.to_string()),
        parameters: file.parameters,
        display: file.display,
    };
    let page = Node::with_id(id.clone(), name, NodeAttributes::Page(attributes));

    let mut ops = vec![DiffOp::add(page, root, ParentProp::Pages)];
    for element in file.content {
        expand_element(&mut ops, &id, ParentProp::Children, element);
    }
    for (query_name, attributes) in file.queries {
        let query = Node::create(query_name, NodeAttributes::Query(attributes));
        ops.push(DiffOp::add(query, &id, ParentProp::Queries));
    }
    ops
}

fn expand_element(ops: &mut Vec<DiffOp>, parent: &NodeId, prop: ParentProp, spec: ElementSpec) {
    let mut attributes = ElementAttributes::of(spec.component);
    attributes.layout = spec.layout;

    let mut templates = Vec::new();
    for (prop_name, value) in spec.props {
        match value {
            PropSpec::Value(value) => {
                attributes.props.insert(prop_name, value);
            }
            PropSpec::Template(elements) => templates.push((prop_name, elements)),
        }
    }

    let element = Node::create(spec.name, NodeAttributes::Element(attributes));
    let id = element.id.clone();
    ops.push(DiffOp::add(element, parent, prop));

    for child in spec.children {
        expand_element(ops, &id, ParentProp::Children, child);
    }
    for (prop_name, elements) in templates {
        for child in elements {
            expand_element(ops, &id, ParentProp::template(prop_name.clone()), child);
        }
    }
}

/// Merge one page into `dom`, replacing a page that already has its id.
pub fn merge_page(dom: &AppDom, name: &str, file: PageFile) -> Result<AppDom, DomError> {
    let mut ops = expand_page(dom.root_id(), name, file);
    if let Some(DiffOp::Add { node, .. }) = ops.first() {
        if dom.get(&node.id).is_some_and(|existing| existing.kind() == NodeKind::Page) {
            ops.insert(0, DiffOp::remove(&node.id));
        }
    }
    dom.apply_diff(&ops)
}

/// Insert the theme unless one is already present.
pub fn merge_theme(dom: &AppDom, theme: ThemeAttributes) -> Result<AppDom, DomError> {
    if dom.theme().is_some() {
        return Ok(dom.clone());
    }
    let node = Node::with_id(stable_id("theme", "theme"), "Theme", NodeAttributes::Theme(theme));
    dom.add_node(node, &dom.root_id().clone(), ParentProp::Themes, Default::default())
}

/// Make the code components of `dom` match `components` (name → source).
pub fn merge_code_components(
    dom: &AppDom,
    components: &BTreeMap<String, String>,
) -> Result<AppDom, DomError> {
    let root = dom.root_id().clone();
    let mut ops = Vec::new();

    for existing in dom.code_components() {
        match components.get(&existing.name) {
            None => ops.push(DiffOp::remove(&existing.id)),
            Some(code) => {
                let unchanged = existing
                    .as_code_component()
                    .is_some_and(|component| &component.code == code);
                if !unchanged {
                    ops.push(DiffOp::Update {
                        node_id: existing.id.clone(),
                        name: None,
                        attributes: Some(NodeAttributes::CodeComponent(CodeComponentAttributes {
                            code: code.clone(),
                        })),
                    });
                }
            }
        }
    }

    for (name, code) in components {
        if dom.code_components().iter().any(|existing| &existing.name == name) {
            continue;
        }
        let node = Node::with_id(
            stable_id("codeComponent", name),
            name.clone(),
            NodeAttributes::CodeComponent(CodeComponentAttributes { code: code.clone() }),
        );
        ops.push(DiffOp::add(node, &root, ParentProp::CodeComponents));
    }

    dom.apply_diff(&ops)
}

/// Canonical file document for a page node.
pub fn collapse_page(dom: &AppDom, page: &Node, path: &Path) -> ProjectResult<PageSpec> {
    let attributes = page.as_page().cloned().unwrap_or_default();

    let content = dom
        .children(&page.id, &ParentProp::Children)
        .into_iter()
        .map(|element| collapse_element(dom, element))
        .collect();

    let queries = dom
        .children(&page.id, &ParentProp::Queries)
        .into_iter()
        .filter_map(|node| node.as_query().map(|query| (node, query)))
        .map(|(node, query)| collapse_query(path, &node.name, query))
        .collect::<ProjectResult<Vec<_>>>()?;

    Ok(PageSpec {
        id: Some(page.id.to_string()),
        title: Some(attributes.title),
        display: attributes.display,
        parameters: attributes.parameters,
        content,
        queries,
    })
}

fn collapse_element(dom: &AppDom, element: &Node) -> ElementSpec {
    let attributes = element.as_element().cloned().unwrap_or_default();
    let mut props: BTreeMap<String, PropSpec> = attributes
        .props
        .into_iter()
        .map(|(name, value)| (name, PropSpec::Value(value)))
        .collect();
    let mut children = Vec::new();

    for (slot, nodes) in dom.child_nodes(&element.id) {
        let collapsed: Vec<ElementSpec> = nodes
            .into_iter()
            .map(|child| collapse_element(dom, child))
            .collect();
        match slot {
            ParentProp::Children => children = collapsed,
            ParentProp::Template(prop) => {
                props.insert(prop, PropSpec::Template(collapsed));
            }
            _ => {}
        }
    }

    ElementSpec {
        component: attributes.component,
        name: element.name.clone(),
        layout: attributes.layout,
        props,
        children,
    }
}

fn collapse_query(path: &Path, name: &str, query: &QueryAttributes) -> ProjectResult<QuerySpec> {
    Ok(QuerySpec {
        name: name.to_string(),
        query: query_config_to_value(path, &query.query)?,
        parameters: query.parameters.clone(),
        enabled: query.enabled.clone(),
        cache_time: query.cache_time,
        refetch_interval: query.refetch_interval,
    })
}
