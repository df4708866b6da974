//! Data-fetch descriptors carried by query nodes.
//!
//! Every level is tagged by a `kind` field. The derived serde impls are used
//! for diffs and for writing page files; loading page files goes through the
//! explicit tag checks in the project crate so that an unknown tag is reported
//! as such instead of as a generic shape error.

use crate::binding::BindableValue;
use serde::{Deserialize, Serialize};

pub const QUERY_KINDS: &[&str] = &["local", "rest"];
pub const BODY_KINDS: &[&str] = &["raw", "urlEncoded"];
pub const RESPONSE_KINDS: &[&str] = &["json", "raw", "xml", "csv"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum QueryConfig {
    /// Call a function defined in the project's resources
    Local(LocalQuery),

    /// HTTP fetch
    Rest(RestQuery),
}

impl QueryConfig {
    pub fn kind(&self) -> &'static str {
        match self {
            QueryConfig::Local(_) => "local",
            QueryConfig::Rest(_) => "rest",
        }
    }

    pub fn bindings(&self) -> Vec<&BindableValue> {
        match self {
            QueryConfig::Local(_) => Vec::new(),
            QueryConfig::Rest(rest) => rest.bindings(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalQuery {
    pub function: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestQuery {
    pub url: BindableValue,

    #[serde(default = "default_method")]
    pub method: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub headers: Vec<(String, BindableValue)>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub search_params: Vec<(String, BindableValue)>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<RestBody>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<ResponseType>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform: Option<String>,

    #[serde(default, skip_serializing_if = "is_false")]
    pub transform_enabled: bool,
}

impl RestQuery {
    pub fn new(url: BindableValue) -> Self {
        Self {
            url,
            method: default_method(),
            headers: Vec::new(),
            search_params: Vec::new(),
            body: None,
            response: None,
            transform: None,
            transform_enabled: false,
        }
    }

    fn bindings(&self) -> Vec<&BindableValue> {
        let mut out = vec![&self.url];
        out.extend(self.headers.iter().map(|(_, v)| v));
        out.extend(self.search_params.iter().map(|(_, v)| v));
        match &self.body {
            Some(RestBody::Raw { content, .. }) => out.push(content),
            Some(RestBody::UrlEncoded { content }) => out.extend(content.iter().map(|(_, v)| v)),
            None => {}
        }
        out
    }
}

fn default_method() -> String {
    "GET".to_string()
}

fn is_false(value: &bool) -> bool {
    !*value
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum RestBody {
    #[serde(rename_all = "camelCase")]
    Raw {
        content: BindableValue,
        content_type: String,
    },

    UrlEncoded {
        #[serde(default)]
        content: Vec<(String, BindableValue)>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ResponseType {
    Json,
    Raw,
    Xml,
    Csv {
        #[serde(default)]
        headers: bool,
    },
}
