//! Typed view of an OpenAPI/Swagger document and the loaders that build it.
//!
//! Only the parts the helpers act on are typed (`paths`, operation summaries,
//! responses, request bodies and the Swagger 2.0 `produces`/`consumes`
//! lists). Everything else under an operation is kept verbatim so inspection
//! output shows the whole definition.

use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use tracing::debug;

use crate::error::{Error, Result};
use crate::resolver::Resolver;

/// Prefix of vendor extension keys, which are never HTTP methods.
pub const EXTENSION_PREFIX: &str = "x-";

/// Path item keys that hold operations.
pub const HTTP_METHODS: [&str; 8] = ["get", "put", "post", "delete", "options", "head", "patch", "trace"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Plain JSON, `$ref` pointers left as they are.
    Json,
    /// YAML (or JSON) with every `$ref` dereferenced.
    Yaml,
}

#[derive(Debug, Clone, Default)]
pub struct Spec {
    pub paths: IndexMap<String, PathItem>,
    pub produces: Vec<String>,
    pub consumes: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct PathItem {
    pub operations: IndexMap<String, Operation>,
    /// Path-level fields shared by the operations (`parameters`, `summary`,
    /// `servers`, ...), kept verbatim.
    pub shared: IndexMap<String, Value>,
    pub extensions: IndexMap<String, Value>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub produces: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub consumes: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Value>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub responses: IndexMap<String, Response>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_body: Option<RequestBody>,
    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Response {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<IndexMap<String, Value>>,
    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RequestBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<IndexMap<String, Value>>,
    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
}

impl Spec {
    /// Build the typed tree from a parsed document, failing on any HTTP
    /// method entry that is not a well-formed operation.
    pub fn from_value(document: Value) -> Result<Self> {
        let Value::Object(mut root) = document else {
            return Err(Error::InvalidSpec("document root must be a mapping".into()));
        };

        let paths: IndexMap<String, PathItem> = match root.remove("paths") {
            None | Some(Value::Null) => IndexMap::new(),
            Some(Value::Object(paths)) => paths
                .into_iter()
                .map(|(path, item)| {
                    let item = PathItem::from_value(&path, item)?;
                    Ok((path, item))
                })
                .collect::<Result<_>>()?,
            Some(_) => return Err(Error::InvalidSpec("\"paths\" must be a mapping".into())),
        };

        Ok(Self {
            paths,
            produces: string_list(root.remove("produces"), "produces")?,
            consumes: string_list(root.remove("consumes"), "consumes")?,
        })
    }

    /// Look up a path by its exact key.
    pub fn path(&self, path: &str) -> Option<&PathItem> {
        self.paths.get(path)
    }

    /// Look up a path, accepting a concrete path such as `/v1/items/42` for
    /// the template `/v1/items/{id}`. Any query string is ignored. Exact
    /// keys win over template matches.
    pub fn match_path(&self, path: &str) -> Option<(&str, &PathItem)> {
        let path = path.split_once('?').map_or(path, |(path, _)| path);
        if let Some((key, item)) = self.paths.get_key_value(path) {
            return Some((key.as_str(), item));
        }
        self.paths
            .iter()
            .find(|(template, _)| template_matches(template, path))
            .map(|(key, item)| (key.as_str(), item))
    }
}

impl PathItem {
    fn from_value(path: &str, item: Value) -> Result<Self> {
        let Value::Object(entries) = item else {
            return Err(Error::InvalidSpec(format!("{path}: path item must be a mapping")));
        };

        let mut parsed = Self::default();
        for (key, value) in entries {
            if key.starts_with(EXTENSION_PREFIX) {
                parsed.extensions.insert(key, value);
                continue;
            }
            if !HTTP_METHODS.contains(&key.as_str()) {
                parsed.shared.insert(key, value);
                continue;
            }
            let operation = serde_json::from_value(value)
                .map_err(|err| Error::InvalidSpec(format!("{path} {key}: {err}")))?;
            parsed.operations.insert(key, operation);
        }
        Ok(parsed)
    }

    /// Declared methods, sorted. Extensions and shared path-level fields are
    /// not methods.
    pub fn methods(&self) -> Vec<&str> {
        let mut methods: Vec<&str> = self.operations.keys().map(String::as_str).collect();
        methods.sort_unstable();
        methods
    }

    /// Case-insensitive operation lookup.
    pub fn operation(&self, method: &str) -> Option<&Operation> {
        self.operations.get(&method.to_lowercase())
    }
}

impl Serialize for PathItem {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let len = self.operations.len() + self.shared.len() + self.extensions.len();
        let mut map = serializer.serialize_map(Some(len))?;
        for (key, value) in &self.shared {
            map.serialize_entry(key, value)?;
        }
        for (method, operation) in &self.operations {
            map.serialize_entry(method, operation)?;
        }
        for (key, value) in &self.extensions {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl Operation {
    /// True when the operation sends a payload, either as an OpenAPI 3
    /// `requestBody` or a Swagger 2.0 `in: body` parameter.
    pub fn has_request_body(&self) -> bool {
        self.request_body.is_some()
            || self
                .parameters
                .iter()
                .any(|param| param.get("in").and_then(Value::as_str) == Some("body"))
    }
}

/// Load an API document from disk in the given format.
pub fn load(path: &Path, format: Format) -> Result<Spec> {
    let document = match format {
        Format::Json => load_json_document(path)?,
        Format::Yaml => Resolver::new().resolve_file(path)?,
    };
    let spec = Spec::from_value(document)?;
    debug!(path = %path.display(), paths = spec.paths.len(), "loaded spec");
    Ok(spec)
}

pub fn load_json(path: &Path) -> Result<Spec> {
    load(path, Format::Json)
}

pub fn load_yaml(path: &Path) -> Result<Spec> {
    load(path, Format::Yaml)
}

fn load_json_document(path: &Path) -> Result<Value> {
    let raw = read_file(path)?;
    serde_json::from_str(&raw).map_err(|source| Error::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Parse a YAML document into a JSON value. Non-string mapping keys such as
/// unquoted status codes become strings.
pub(crate) fn load_yaml_document(path: &Path) -> Result<Value> {
    let raw = read_file(path)?;
    let yaml: serde_yaml::Value = serde_yaml::from_str(&raw).map_err(|source| Error::Yaml {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::to_value(yaml).map_err(|source| Error::Json {
        path: path.to_path_buf(),
        source,
    })
}

fn read_file(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn string_list(value: Option<Value>, field: &str) -> Result<Vec<String>> {
    match value {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(value) => serde_json::from_value(value)
            .map_err(|err| Error::InvalidSpec(format!("\"{field}\": {err}"))),
    }
}

fn template_matches(template: &str, path: &str) -> bool {
    let mut expected = template.split('/');
    let mut actual = path.split('/');
    loop {
        match (expected.next(), actual.next()) {
            (None, None) => return true,
            (Some(want), Some(got)) => {
                let is_param = want.starts_with('{') && want.ends_with('}');
                if is_param && got.is_empty() {
                    return false;
                }
                if !is_param && want != got {
                    return false;
                }
            }
            _ => return false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    fn sample() -> Spec {
        Spec::from_value(json!({
            "swagger": "2.0",
            "produces": ["application/json"],
            "paths": {
                "/v1/items": {
                    "post": {"summary": "Create item"},
                    "get": {"summary": "Query items"},
                    "x-internal": true
                },
                "/v1/items/{id}": {
                    "get": {"summary": "Get item"}
                },
                "/v1/items/export": {
                    "get": {"summary": "Export items"}
                }
            }
        }))
        .unwrap()
    }

    #[test]
    fn keeps_document_order_of_paths() {
        let spec = sample();
        let keys: Vec<&str> = spec.paths.keys().map(String::as_str).collect();
        assert_eq!(keys, ["/v1/items", "/v1/items/{id}", "/v1/items/export"]);
        assert_eq!(spec.produces, ["application/json"]);
    }

    #[test]
    fn splits_extensions_from_operations() {
        let spec = sample();
        let item = spec.path("/v1/items").unwrap();
        assert_eq!(item.methods(), ["get", "post"]);
        assert!(item.extensions.contains_key("x-internal"));
        assert_eq!(
            item.operation("POST").and_then(|op| op.summary.as_deref()),
            Some("Create item")
        );
    }

    #[test]
    fn rejects_malformed_operation() {
        let err = Spec::from_value(json!({
            "paths": {"/users": {"get": {"summary": 42}}}
        }))
        .unwrap_err();
        assert!(matches!(err, Error::InvalidSpec(ref msg) if msg.starts_with("/users get")));
    }

    #[test]
    fn path_level_fields_are_not_operations() {
        let spec = Spec::from_value(json!({
            "paths": {
                "/v1/items/{id}": {
                    "summary": "Single item",
                    "parameters": [{"in": "path", "name": "id", "required": true}],
                    "servers": [{"url": "https://mirror.example.com"}],
                    "get": {"summary": "Get item"},
                    "delete": {"summary": "Delete item"}
                },
                "/v1/status": {"get": {}}
            }
        }))
        .unwrap();

        let item = spec.path("/v1/items/{id}").unwrap();
        assert_eq!(item.methods(), ["delete", "get"]);
        assert_eq!(item.shared["parameters"][0]["name"], "id");
        assert_eq!(item.shared["summary"], "Single item");
        assert!(item.operation("parameters").is_none());

        let shown = serde_json::to_value(item).unwrap();
        assert_eq!(shown["servers"][0]["url"], "https://mirror.example.com");
        assert_eq!(shown["get"]["summary"], "Get item");
    }

    #[test]
    fn missing_paths_is_empty() {
        let spec = Spec::from_value(json!({"openapi": "3.0.0"})).unwrap();
        assert!(spec.paths.is_empty());
    }

    #[test]
    fn match_path_prefers_exact_keys() {
        let spec = sample();
        assert_eq!(spec.match_path("/v1/items/export").unwrap().0, "/v1/items/export");
        assert_eq!(spec.match_path("/v1/items/42").unwrap().0, "/v1/items/{id}");
        assert_eq!(spec.match_path("/v1/items?page=2").unwrap().0, "/v1/items");
        assert!(spec.match_path("/v1/items/42/attachments").is_none());
        assert!(spec.match_path("/v1/items/").is_none());
    }

    #[test]
    fn request_body_detection() {
        let op: Operation = serde_json::from_value(json!({
            "parameters": [{"in": "body", "name": "payload"}]
        }))
        .unwrap();
        assert!(op.has_request_body());

        let op: Operation = serde_json::from_value(json!({
            "parameters": [{"in": "query", "name": "q"}]
        }))
        .unwrap();
        assert!(!op.has_request_body());
    }

    #[test]
    fn yaml_status_codes_become_strings() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            "paths:\n  /users:\n    get:\n      responses:\n        200:\n          content:\n            application/json: {{}}\n"
        )
        .unwrap();

        let spec = load_yaml(file.path()).unwrap();
        let op = spec.path("/users").unwrap().operation("get").unwrap();
        assert!(op.responses.contains_key("200"));
    }

    #[test]
    fn json_loader_leaves_refs_alone() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r##"{{"paths": {{"/users": {{"get": {{"responses": {{"200": {{"$ref": "#/responses/Users"}}}}}}}}}}}}"##
        )
        .unwrap();

        let spec = load_json(file.path()).unwrap();
        let op = spec.path("/users").unwrap().operation("get").unwrap();
        assert_eq!(op.responses["200"].extra["$ref"], "#/responses/Users");
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_json(Path::new("does-not-exist.json")).unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }
}
