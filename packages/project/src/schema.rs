//! # Project File Schema
//!
//! Shapes of `page.yml` and `theme.yml`, plus the validation functions that
//! turn file text into typed values.
//!
//! Every document is a versioned envelope:
//!
//! ```yaml
//! apiVersion: v1
//! kind: page
//! spec:
//!   id: home_id
//!   title: Home
//!   content:
//!     - component: Text
//!       name: text1
//!       props:
//!         value: Hello
//!   queries:
//!     - name: users
//!       query:
//!         kind: rest
//!         url: https://example.com/users
//! ```
//!
//! Validation reports the file and the offending field. Shape problems are
//! [`FileError::Invalid`]; an unknown `kind` tag in a query, body or response
//! is [`FileError::UnknownTag`].

use crate::errors::{FileError, ProjectError};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;
use std::path::Path;
use toolpad_appdom::{
    BindableValue, LocalQuery, PageDisplay, QueryAttributes, QueryConfig, ResponseType, RestBody,
    RestQuery, ThemeAttributes, BODY_KINDS, RESPONSE_KINDS, TEMPLATE_KEY,
};

pub const API_VERSION: &str = "v1";

/// `spec` of a page document, as stored
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<PageDisplay>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<(String, String)>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub content: Vec<ElementSpec>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub queries: Vec<QuerySpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementSpec {
    pub component: String,
    pub name: String,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub layout: BTreeMap<String, BindableValue>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub props: BTreeMap<String, PropSpec>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ElementSpec>,
}

/// Element prop: a bindable value or a `$$template` of child elements
#[derive(Debug, Clone, PartialEq)]
pub enum PropSpec {
    Value(BindableValue),
    Template(Vec<ElementSpec>),
}

impl Serialize for PropSpec {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            PropSpec::Value(value) => value.serialize(serializer),
            PropSpec::Template(elements) => {
                let mut map = BTreeMap::new();
                map.insert(TEMPLATE_KEY, elements);
                map.serialize(serializer)
            }
        }
    }
}

impl<'de> Deserialize<'de> for PropSpec {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        if let serde_json::Value::Object(map) = &value {
            if let (1, Some(elements)) = (map.len(), map.get(TEMPLATE_KEY)) {
                let elements = serde_json::from_value(elements.clone()).map_err(D::Error::custom)?;
                return Ok(PropSpec::Template(elements));
            }
        }
        Ok(PropSpec::Value(BindableValue::from_json(value)))
    }
}

/// Query entry of a page, with its config still untyped
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuerySpec {
    pub name: String,

    pub query: Value,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<(String, BindableValue)>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<BindableValue>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_time: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refetch_interval: Option<u64>,
}

/// A validated page file
#[derive(Debug, Clone, PartialEq)]
pub struct PageFile {
    pub id: Option<String>,
    pub title: Option<String>,
    pub display: Option<PageDisplay>,
    pub parameters: Vec<(String, String)>,
    pub content: Vec<ElementSpec>,
    pub queries: Vec<(String, QueryAttributes)>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Envelope<'a, S> {
    api_version: &'a str,
    kind: &'a str,
    spec: S,
}

/// Parse and validate the text of a `page.yml`.
pub fn parse_page_file(path: &Path, text: &str) -> Result<PageFile, FileError> {
    let spec = parse_envelope(path, text, "page")?;
    let spec: PageSpec =
        serde_yaml::from_value(spec).map_err(|e| FileError::invalid(path, "spec", e))?;

    let queries = spec
        .queries
        .into_iter()
        .enumerate()
        .map(|(i, query)| {
            let field = format!("spec.queries[{i}].query");
            let config = parse_query_config(path, &field, query.query)?;
            let attributes = QueryAttributes {
                query: config,
                parameters: query.parameters,
                enabled: query.enabled,
                cache_time: query.cache_time,
                refetch_interval: query.refetch_interval,
            };
            Ok((query.name, attributes))
        })
        .collect::<Result<Vec<_>, FileError>>()?;

    Ok(PageFile {
        id: spec.id,
        title: spec.title,
        display: spec.display,
        parameters: spec.parameters,
        content: spec.content,
        queries,
    })
}

/// Parse and validate the text of `theme.yml`.
pub fn parse_theme_file(path: &Path, text: &str) -> Result<ThemeAttributes, FileError> {
    let spec = parse_envelope(path, text, "theme")?;
    let options = serde_yaml::from_value(spec).map_err(|e| FileError::invalid(path, "spec", e))?;
    Ok(ThemeAttributes { options })
}

pub fn page_to_string(path: &Path, spec: &PageSpec) -> Result<String, ProjectError> {
    to_document(path, "page", spec)
}

pub fn theme_to_string(path: &Path, theme: &ThemeAttributes) -> Result<String, ProjectError> {
    to_document(path, "theme", &theme.options)
}

pub fn query_config_to_value(path: &Path, config: &QueryConfig) -> Result<Value, ProjectError> {
    serde_yaml::to_value(config).map_err(|source| ProjectError::Serialize {
        path: path.to_path_buf(),
        source,
    })
}

fn to_document<S: Serialize>(path: &Path, kind: &str, spec: S) -> Result<String, ProjectError> {
    let envelope = Envelope {
        api_version: API_VERSION,
        kind,
        spec,
    };
    serde_yaml::to_string(&envelope).map_err(|source| ProjectError::Serialize {
        path: path.to_path_buf(),
        source,
    })
}

/// Check the envelope and return its `spec`.
fn parse_envelope(path: &Path, text: &str, kind: &str) -> Result<Value, FileError> {
    let document: Value =
        serde_yaml::from_str(text).map_err(|e| FileError::invalid(path, "document", e))?;
    let Value::Mapping(mut document) = document else {
        return Err(FileError::invalid(path, "document", "expected a mapping"));
    };

    match document.get("apiVersion") {
        Some(Value::String(_)) | Some(Value::Number(_)) => {}
        Some(_) => return Err(FileError::invalid(path, "apiVersion", "expected a string or number")),
        None => return Err(FileError::invalid(path, "apiVersion", "missing")),
    }

    match document.get("kind") {
        Some(Value::String(found)) if found == kind => {}
        Some(other) => {
            return Err(FileError::invalid(
                path,
                "kind",
                format!("expected {kind:?}, found {other:?}"),
            ))
        }
        None => return Err(FileError::invalid(path, "kind", "missing")),
    }

    match document.remove("spec") {
        Some(Value::Null) => Ok(Value::Mapping(Mapping::new())),
        Some(spec @ Value::Mapping(_)) => Ok(spec),
        Some(_) => Err(FileError::invalid(path, "spec", "expected a mapping")),
        None => Err(FileError::invalid(path, "spec", "missing")),
    }
}

/// Split a tagged mapping into its fields and its `kind`.
fn tagged(path: &Path, field: &str, value: Value) -> Result<(Mapping, String), FileError> {
    let Value::Mapping(map) = value else {
        return Err(FileError::invalid(path, field, "expected a mapping"));
    };
    match map.get("kind") {
        Some(Value::String(kind)) => {
            let kind = kind.clone();
            Ok((map, kind))
        }
        Some(_) => Err(FileError::invalid(path, format!("{field}.kind"), "expected a string")),
        None => Err(FileError::invalid(path, format!("{field}.kind"), "missing")),
    }
}

fn unknown_tag(path: &Path, field: &str, tag: String) -> FileError {
    FileError::UnknownTag {
        path: path.to_path_buf(),
        field: field.to_string(),
        tag,
    }
}

fn parse_query_config(path: &Path, field: &str, value: Value) -> Result<QueryConfig, FileError> {
    let (mut map, kind) = tagged(path, field, value)?;
    match kind.as_str() {
        "local" => {
            let local: LocalQuery = serde_yaml::from_value(Value::Mapping(map))
                .map_err(|e| FileError::invalid(path, field, e))?;
            Ok(QueryConfig::Local(local))
        }
        "rest" => {
            let body_field = format!("{field}.body");
            let body = match map.remove("body") {
                None | Some(Value::Null) => None,
                Some(body) => Some(parse_body(path, &body_field, body)?),
            };
            let response_field = format!("{field}.response");
            let response = match map.remove("response") {
                None | Some(Value::Null) => None,
                Some(response) => Some(parse_response(path, &response_field, response)?),
            };

            let mut rest: RestQuery = serde_yaml::from_value(Value::Mapping(map))
                .map_err(|e| FileError::invalid(path, field, e))?;
            rest.body = body;
            rest.response = response;
            Ok(QueryConfig::Rest(rest))
        }
        _ => Err(unknown_tag(path, &format!("{field}.kind"), kind)),
    }
}

fn parse_body(path: &Path, field: &str, value: Value) -> Result<RestBody, FileError> {
    let (map, kind) = tagged(path, field, value)?;
    if !BODY_KINDS.contains(&kind.as_str()) {
        return Err(unknown_tag(path, &format!("{field}.kind"), kind));
    }
    serde_yaml::from_value(Value::Mapping(map)).map_err(|e| FileError::invalid(path, field, e))
}

fn parse_response(path: &Path, field: &str, value: Value) -> Result<ResponseType, FileError> {
    let (map, kind) = tagged(path, field, value)?;
    if !RESPONSE_KINDS.contains(&kind.as_str()) {
        return Err(unknown_tag(path, &format!("{field}.kind"), kind));
    }
    serde_yaml::from_value(Value::Mapping(map)).map_err(|e| FileError::invalid(path, field, e))
}
