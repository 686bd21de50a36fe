//! `$ref` dereferencing for multi-file YAML/JSON specs.
//!
//! References are resolved relative to the document they appear in:
//! `#/components/schemas/Item` points into the same file,
//! `schemas.yaml#/Item` and `schemas.yaml` into a sibling file. The result
//! contains no `$ref` objects; a reference that leads back into itself is an
//! error because it has no finite expansion.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{Error, Result};
use crate::spec::load_yaml_document;

const REF_KEY: &str = "$ref";

#[derive(Debug, Default)]
pub struct Resolver {
    documents: HashMap<PathBuf, Value>,
}

impl Resolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load `path` and return it with every reference expanded.
    pub fn resolve_file(&mut self, path: &Path) -> Result<Value> {
        let path = canonical(path);
        let root = self.document(&path)?.clone();
        let mut active = Vec::new();
        self.resolve_value(&root, &path, &mut active)
    }

    fn document(&mut self, path: &Path) -> Result<&Value> {
        if !self.documents.contains_key(path) {
            debug!(path = %path.display(), "reading referenced document");
            let document = load_yaml_document(path)?;
            self.documents.insert(path.to_path_buf(), document);
        }
        Ok(&self.documents[path])
    }

    fn resolve_value(&mut self, value: &Value, base: &Path, active: &mut Vec<String>) -> Result<Value> {
        match value {
            Value::Object(map) => match map.get(REF_KEY) {
                Some(Value::String(reference)) => self.resolve_ref(reference, map, base, active),
                _ => {
                    let mut resolved = Map::with_capacity(map.len());
                    for (key, child) in map {
                        resolved.insert(key.clone(), self.resolve_value(child, base, active)?);
                    }
                    Ok(Value::Object(resolved))
                }
            },
            Value::Array(items) => items
                .iter()
                .map(|item| self.resolve_value(item, base, active))
                .collect::<Result<Vec<_>>>()
                .map(Value::Array),
            other => Ok(other.clone()),
        }
    }

    fn resolve_ref(
        &mut self,
        reference: &str,
        siblings: &Map<String, Value>,
        base: &Path,
        active: &mut Vec<String>,
    ) -> Result<Value> {
        let (target_path, pointer) = split_reference(reference, base)?;
        let key = format!("{}#{}", target_path.display(), pointer);
        if active.contains(&key) {
            return Err(Error::RecursiveRef {
                reference: reference.to_string(),
            });
        }

        let target = {
            let document = self.document(&target_path)?;
            document
                .pointer(&pointer)
                .cloned()
                .ok_or_else(|| Error::UnresolvedRef {
                    reference: reference.to_string(),
                    reason: format!("no value at {} in {}", pointer, target_path.display()),
                })?
        };

        active.push(key);
        let mut resolved = self.resolve_value(&target, &target_path, active)?;
        active.pop();

        // Keys next to `$ref` (e.g. a description override) win over the target's.
        if let Value::Object(resolved_map) = &mut resolved {
            for (name, value) in siblings {
                if name != REF_KEY {
                    let value = self.resolve_value(value, base, active)?;
                    resolved_map.insert(name.clone(), value);
                }
            }
        }
        debug!(reference, "resolved reference");
        Ok(resolved)
    }
}

/// Split a reference into the absolute document path and a JSON pointer.
fn split_reference(reference: &str, base: &Path) -> Result<(PathBuf, String)> {
    if reference.contains("://") {
        return Err(Error::UnresolvedRef {
            reference: reference.to_string(),
            reason: "remote references are not supported".into(),
        });
    }

    let (file, fragment) = reference.split_once('#').unwrap_or((reference, ""));
    let target_path = if file.is_empty() {
        base.to_path_buf()
    } else {
        let dir = base.parent().unwrap_or_else(|| Path::new("."));
        canonical(&dir.join(file))
    };

    let pointer = urlencoding::decode(fragment)
        .map_err(|err| Error::UnresolvedRef {
            reference: reference.to_string(),
            reason: err.to_string(),
        })?
        .into_owned();
    if !pointer.is_empty() && !pointer.starts_with('/') {
        return Err(Error::UnresolvedRef {
            reference: reference.to_string(),
            reason: "fragment must be a JSON pointer".into(),
        });
    }
    Ok((target_path, pointer))
}

fn canonical(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn resolves_internal_refs() {
        let dir = TempDir::new().unwrap();
        let root = write(
            &dir,
            "api.yaml",
            r##"
paths:
  /users:
    get:
      responses:
        "200":
          $ref: "#/components/responses/Users"
components:
  responses:
    Users:
      description: users
      content:
        application/json:
          schema:
            $ref: "#/components/schemas/User"
  schemas:
    User:
      type: object
"##,
        );

        let resolved = Resolver::new().resolve_file(&root).unwrap();
        let response = &resolved["paths"]["/users"]["get"]["responses"]["200"];
        assert_eq!(response["description"], "users");
        assert_eq!(
            response["content"]["application/json"]["schema"],
            json!({"type": "object"})
        );
    }

    #[test]
    fn resolves_external_refs_relative_to_referencing_file() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("shared")).unwrap();
        write(
            &dir,
            "shared/schemas.yaml",
            r##"
Item:
  type: object
  properties:
    location:
      $ref: "#/Location"
Location:
  type: string
"##,
        );
        let root = write(
            &dir,
            "api.yaml",
            r##"
paths:
  /items:
    post:
      requestBody:
        content:
          application/json:
            schema:
              $ref: "shared/schemas.yaml#/Item"
"##,
        );

        let resolved = Resolver::new().resolve_file(&root).unwrap();
        let schema = &resolved["paths"]["/items"]["post"]["requestBody"]["content"]["application/json"]["schema"];
        assert_eq!(schema["properties"]["location"], json!({"type": "string"}));
    }

    #[test]
    fn whole_file_reference() {
        let dir = TempDir::new().unwrap();
        write(&dir, "users.yaml", "get:\n  summary: List users\n");
        let root = write(&dir, "api.yaml", "paths:\n  /users:\n    $ref: users.yaml\n");

        let resolved = Resolver::new().resolve_file(&root).unwrap();
        assert_eq!(resolved["paths"]["/users"]["get"]["summary"], "List users");
    }

    #[test]
    fn sibling_keys_override_target() {
        let dir = TempDir::new().unwrap();
        let root = write(
            &dir,
            "api.yaml",
            r##"
a:
  $ref: "#/b"
  description: local
b:
  description: shared
  type: string
"##,
        );

        let resolved = Resolver::new().resolve_file(&root).unwrap();
        assert_eq!(resolved["a"], json!({"description": "local", "type": "string"}));
    }

    #[test]
    fn escaped_pointer_tokens() {
        let dir = TempDir::new().unwrap();
        let root = write(
            &dir,
            "api.yaml",
            r##"
paths:
  /users/{id}:
    get:
      summary: Get user
alias:
  $ref: "#/paths/~1users~1%7Bid%7D/get"
"##,
        );

        let resolved = Resolver::new().resolve_file(&root).unwrap();
        assert_eq!(resolved["alias"]["summary"], "Get user");
    }

    #[test]
    fn recursive_reference_is_an_error() {
        let dir = TempDir::new().unwrap();
        let root = write(
            &dir,
            "api.yaml",
            r##"
Node:
  properties:
    children:
      items:
        $ref: "#/Node"
"##,
        );

        let err = Resolver::new().resolve_file(&root).unwrap_err();
        assert!(matches!(err, Error::RecursiveRef { ref reference } if reference == "#/Node"));
    }

    #[test]
    fn shared_reference_is_not_recursive() {
        let dir = TempDir::new().unwrap();
        let root = write(
            &dir,
            "api.yaml",
            r##"
a: {$ref: "#/shared"}
b: {$ref: "#/shared"}
shared: {type: string}
"##,
        );

        let resolved = Resolver::new().resolve_file(&root).unwrap();
        assert_eq!(resolved["a"], resolved["b"]);
    }

    #[test]
    fn dangling_reference_is_an_error() {
        let dir = TempDir::new().unwrap();
        let root = write(&dir, "api.yaml", "a:\n  $ref: \"#/missing\"\n");

        let err = Resolver::new().resolve_file(&root).unwrap_err();
        assert!(matches!(err, Error::UnresolvedRef { .. }));
    }

    #[test]
    fn missing_external_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        let root = write(&dir, "api.yaml", "a:\n  $ref: other.yaml#/x\n");

        let err = Resolver::new().resolve_file(&root).unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }
}
