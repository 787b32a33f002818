//! Dashboard documents and remote dashboard references

use crate::error::DocumentError;
use crate::slug::{slugify, Slug};
use serde_json::{Map, Value};
use std::fmt;

/// Prefix of the `uri` field of search results
const URI_PREFIX: &str = "db/";

/// A dashboard as declared in a configuration document.
///
/// Wire shape: `{"dashboard": {"title": "...", "tags": [...], ...}, ...}`.
/// Everything besides `dashboard.title` and `dashboard.tags` is carried
/// through untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardDocument {
    body: Map<String, Value>,
}

impl DashboardDocument {
    /// Parse a document from raw bytes
    pub fn from_slice(bytes: &[u8]) -> Result<Self, DocumentError> {
        let value: Value = serde_json::from_slice(bytes)
            .map_err(|e| DocumentError::InvalidJson(e.to_string()))?;
        Self::from_value(value)
    }

    /// Wrap an already-parsed JSON value
    pub fn from_value(value: Value) -> Result<Self, DocumentError> {
        match value {
            Value::Object(body) => Ok(Self { body }),
            _ => Err(DocumentError::NotAnObject),
        }
    }

    fn dashboard(&self) -> Option<&Map<String, Value>> {
        self.body.get("dashboard").and_then(Value::as_object)
    }

    /// The dashboard title
    pub fn title(&self) -> Result<&str, DocumentError> {
        self.dashboard()
            .and_then(|d| d.get("title"))
            .and_then(Value::as_str)
            .ok_or(DocumentError::MissingTitle)
    }

    /// The dashboard identity, derived from its title
    pub fn slug(&self) -> Result<Slug, DocumentError> {
        let title = self.title()?;
        let slug = slugify(title);
        if slug.is_empty() {
            return Err(DocumentError::EmptySlug(title.to_string()));
        }
        Ok(Slug::new(slug))
    }

    /// String entries of `dashboard.tags`
    pub fn tags(&self) -> Vec<&str> {
        self.dashboard()
            .and_then(|d| d.get("tags"))
            .and_then(Value::as_array)
            .map(|tags| tags.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }

    /// Append `tag` to `dashboard.tags` unless it is already there
    pub fn add_tag(&mut self, tag: &str) -> Result<(), DocumentError> {
        let dashboard = self
            .body
            .get_mut("dashboard")
            .and_then(Value::as_object_mut)
            .ok_or(DocumentError::MissingDashboard)?;

        let tags = dashboard
            .entry("tags")
            .or_insert_with(|| Value::Array(Vec::new()))
            .as_array_mut()
            .ok_or(DocumentError::InvalidTags)?;

        if !tags.iter().any(|t| t.as_str() == Some(tag)) {
            tags.push(Value::String(tag.to_string()));
        }
        Ok(())
    }

    /// Body sent to the import endpoint.
    ///
    /// A copy of the document with the top-level `overwrite` flag set; the
    /// document itself is left untouched.
    pub fn import_payload(&self, overwrite: bool) -> Value {
        let mut body = self.body.clone();
        body.insert("overwrite".to_string(), Value::Bool(overwrite));
        Value::Object(body)
    }

    pub fn as_value(&self) -> Value {
        Value::Object(self.body.clone())
    }
}

impl fmt::Display for DashboardDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.title() {
            Ok(title) => write!(f, "dashboard {:?}", title),
            Err(_) => f.write_str("untitled dashboard"),
        }
    }
}

/// A dashboard already present in the remote store, as returned by search
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteDashboardRef {
    hit: Value,
}

impl RemoteDashboardRef {
    pub fn new(hit: Value) -> Self {
        Self { hit }
    }

    /// Build a ref for `slug` the way search would report it
    pub fn for_slug(slug: &Slug) -> Self {
        Self::new(serde_json::json!({ "uri": format!("{}{}", URI_PREFIX, slug) }))
    }

    /// Raw `uri` field, if present
    pub fn uri(&self) -> Option<&str> {
        self.hit.get("uri").and_then(Value::as_str)
    }

    /// The dashboard identity, derived from `uri` with `db/` stripped
    pub fn slug(&self) -> Result<Slug, DocumentError> {
        let uri = self.uri().ok_or(DocumentError::MissingUri)?;
        match uri.strip_prefix(URI_PREFIX) {
            Some(slug) if !slug.is_empty() => Ok(Slug::new(slug)),
            _ => Err(DocumentError::InvalidUri(uri.to_string())),
        }
    }

    pub fn as_value(&self) -> &Value {
        &self.hit
    }
}

/// Parse a search response: a JSON array of hit objects
pub fn parse_search_results(bytes: &[u8]) -> Result<Vec<RemoteDashboardRef>, DocumentError> {
    let value: Value =
        serde_json::from_slice(bytes).map_err(|e| DocumentError::InvalidJson(e.to_string()))?;
    match value {
        Value::Array(hits) => Ok(hits.into_iter().map(RemoteDashboardRef::new).collect()),
        _ => Err(DocumentError::NotAnArray),
    }
}
