// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Manifest loading from the resources directory.

pub mod scanner;

pub use scanner::{scan_resources, ResourceBuckets, ScanReport};

use crate::error::{InstallerError, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;

/// Load a single-document YAML manifest into a typed object
pub fn load_yaml<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path).map_err(|e| InstallerError::Manifest {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    serde_yaml::from_str(&content).map_err(|e| InstallerError::Manifest {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Parse every document of a (possibly multi-document) YAML file as JSON values.
/// Empty documents are dropped.
pub fn parse_documents(content: &str) -> std::result::Result<Vec<Value>, serde_yaml::Error> {
    let mut documents = Vec::new();
    for document in serde_yaml::Deserializer::from_str(content) {
        let value = Value::deserialize(document)?;
        if !value.is_null() {
            documents.push(value);
        }
    }
    Ok(documents)
}

/// Deep-merge `patch` into `target` with JSON merge-patch semantics:
/// objects merge recursively, `null` removes a key, anything else replaces.
pub fn merge_json(target: &mut Value, patch: &Value) {
    let Value::Object(patch_map) = patch else {
        *target = patch.clone();
        return;
    };

    if !target.is_object() {
        *target = Value::Object(Default::default());
    }

    if let Value::Object(target_map) = target {
        for (key, value) in patch_map {
            if value.is_null() {
                target_map.remove(key);
            } else {
                merge_json(
                    target_map.entry(key.clone()).or_insert(Value::Null),
                    value,
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_merge_json_nested() {
        let mut target = json!({"spec": {"server": {"cheImage": "a"}, "auth": {"x": 1}}});
        merge_json(
            &mut target,
            &json!({"spec": {"server": {"cheImageTag": "7"}, "devWorkspace": {"enable": true}}}),
        );
        assert_eq!(
            target,
            json!({"spec": {
                "server": {"cheImage": "a", "cheImageTag": "7"},
                "auth": {"x": 1},
                "devWorkspace": {"enable": true}
            }})
        );
    }

    #[test]
    fn test_merge_json_null_removes_key() {
        let mut target = json!({"metadata": {"finalizers": ["a"], "name": "x"}});
        merge_json(&mut target, &json!({"metadata": {"finalizers": null}}));
        assert_eq!(target, json!({"metadata": {"name": "x"}}));
    }

    #[test]
    fn test_merge_json_scalar_replaces_object() {
        let mut target = json!({"a": {"b": 1}});
        merge_json(&mut target, &json!({"a": 2}));
        assert_eq!(target, json!({"a": 2}));
    }

    #[test]
    fn test_parse_documents_skips_empty() {
        let docs = parse_documents("---\nkind: Role\n---\n\n---\nkind: RoleBinding\n").unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[1]["kind"], "RoleBinding");
    }
}
