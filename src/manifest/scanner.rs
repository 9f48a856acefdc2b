// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Resource scanner - classifies RBAC manifests by kind

use crate::error::{InstallerError, Result};
use crate::manifest::parse_documents;
use k8s_openapi::api::rbac::v1::{ClusterRole, ClusterRoleBinding, Role, RoleBinding};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::path::Path;
use tracing::{debug, instrument, warn};
use walkdir::WalkDir;

/// RBAC objects found in the resources directory, in file order
#[derive(Debug, Clone, Default)]
pub struct ResourceBuckets {
    pub roles: Vec<Role>,
    pub role_bindings: Vec<RoleBinding>,
    pub cluster_roles: Vec<ClusterRole>,
    pub cluster_role_bindings: Vec<ClusterRoleBinding>,
}

impl ResourceBuckets {
    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
            && self.role_bindings.is_empty()
            && self.cluster_roles.is_empty()
            && self.cluster_role_bindings.is_empty()
    }
}

/// Outcome of a scan: the buckets plus any non-fatal warnings
#[derive(Debug, Clone, Default)]
pub struct ScanReport {
    pub buckets: ResourceBuckets,
    pub warnings: Vec<String>,
}

fn is_yaml(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e == "yaml" || e == "yml")
}

fn decode<T: DeserializeOwned>(path: &Path, value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(|e| InstallerError::Manifest {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Scan the top level of `dir` and sort RBAC manifests into buckets.
///
/// Files are visited in name order so repeated runs apply objects in the
/// same sequence. Unequal role/binding counts are reported as warnings.
#[instrument]
pub fn scan_resources(dir: &Path) -> Result<ScanReport> {
    let mut buckets = ResourceBuckets::default();

    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| InstallerError::Manifest {
            path: dir.to_path_buf(),
            message: e.to_string(),
        })?;
        let path = entry.path();
        if !entry.file_type().is_file() || !is_yaml(path) {
            debug!("Skipping {}", path.display());
            continue;
        }

        let content = std::fs::read_to_string(path)?;
        let documents = parse_documents(&content).map_err(|e| InstallerError::Manifest {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        for document in documents {
            let Some(kind) = document.get("kind").and_then(Value::as_str) else {
                debug!("Skipping document without kind in {}", path.display());
                continue;
            };
            match kind {
                "Role" => buckets.roles.push(decode(path, document)?),
                "RoleBinding" => buckets.role_bindings.push(decode(path, document)?),
                "ClusterRole" => buckets.cluster_roles.push(decode(path, document)?),
                "ClusterRoleBinding" => {
                    buckets.cluster_role_bindings.push(decode(path, document)?)
                }
                other => debug!("Ignoring {} in {}", other, path.display()),
            }
        }
    }

    let mut warnings = Vec::new();
    if buckets.roles.len() != buckets.role_bindings.len() {
        warnings.push(format!(
            "found {} roles but {} role bindings",
            buckets.roles.len(),
            buckets.role_bindings.len()
        ));
    }
    if buckets.cluster_roles.len() != buckets.cluster_role_bindings.len() {
        warnings.push(format!(
            "found {} cluster roles but {} cluster role bindings",
            buckets.cluster_roles.len(),
            buckets.cluster_role_bindings.len()
        ));
    }
    for warning in &warnings {
        warn!("{} in {}", warning, dir.display());
    }

    Ok(ScanReport { buckets, warnings })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, content: &str) {
        fs::write(dir.path().join(name), content).unwrap();
    }

    fn role(name: &str) -> String {
        format!(
            "apiVersion: rbac.authorization.k8s.io/v1\nkind: Role\nmetadata:\n  name: {}\nrules: []\n",
            name
        )
    }

    fn role_binding(name: &str) -> String {
        format!(
            r#"apiVersion: rbac.authorization.k8s.io/v1
kind: RoleBinding
metadata:
  name: {name}
roleRef:
  apiGroup: rbac.authorization.k8s.io
  kind: Role
  name: {name}
subjects:
  - kind: ServiceAccount
    name: che-operator
"#
        )
    }

    #[test]
    fn test_scan_classifies_by_kind() {
        let dir = TempDir::new().unwrap();
        write(&dir, "role.yaml", &role("che-operator"));
        write(&dir, "role_binding.yaml", &role_binding("che-operator"));
        write(
            &dir,
            "cluster_role.yaml",
            "apiVersion: rbac.authorization.k8s.io/v1\nkind: ClusterRole\nmetadata:\n  name: admin\nrules: []\n",
        );
        write(
            &dir,
            "cluster_role_binding.yaml",
            r#"apiVersion: rbac.authorization.k8s.io/v1
kind: ClusterRoleBinding
metadata:
  name: admin
roleRef:
  apiGroup: rbac.authorization.k8s.io
  kind: ClusterRole
  name: admin
"#,
        );

        let report = scan_resources(dir.path()).unwrap();

        assert_eq!(report.buckets.roles.len(), 1);
        assert_eq!(report.buckets.role_bindings.len(), 1);
        assert_eq!(report.buckets.cluster_roles.len(), 1);
        assert_eq!(report.buckets.cluster_role_bindings.len(), 1);
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_scan_skips_non_yaml_and_kindless_files() {
        let dir = TempDir::new().unwrap();
        write(&dir, "README.md", "kind: Role\n");
        write(&dir, "notes.yaml", "description: no kind here\n");
        write(&dir, "role.yml", &role("che-operator"));
        write(&dir, "role_binding.yaml", &role_binding("che-operator"));

        let report = scan_resources(dir.path()).unwrap();

        assert_eq!(report.buckets.roles.len(), 1);
        assert_eq!(report.buckets.role_bindings.len(), 1);
    }

    #[test]
    fn test_scan_ignores_other_kinds_and_subdirectories() {
        let dir = TempDir::new().unwrap();
        write(
            &dir,
            "operator.yaml",
            "apiVersion: apps/v1\nkind: Deployment\nmetadata:\n  name: che-operator\n",
        );
        fs::create_dir(dir.path().join("crds")).unwrap();
        write(&dir, "crds/role.yaml", &role("nested"));

        let report = scan_resources(dir.path()).unwrap();

        assert!(report.buckets.is_empty());
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_count_mismatch_is_a_single_warning() {
        let dir = TempDir::new().unwrap();
        write(&dir, "role.yaml", &role("first"));
        write(&dir, "role2.yaml", &role("second"));
        write(&dir, "role_binding.yaml", &role_binding("first"));

        let report = scan_resources(dir.path()).unwrap();

        assert_eq!(report.buckets.roles.len(), 2);
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].contains("2 roles"));
    }

    #[test]
    fn test_multi_document_file() {
        let dir = TempDir::new().unwrap();
        write(
            &dir,
            "rbac.yaml",
            &format!("{}---\n{}", role("che-operator"), role_binding("che-operator")),
        );

        let report = scan_resources(dir.path()).unwrap();

        assert_eq!(report.buckets.roles.len(), 1);
        assert_eq!(report.buckets.role_bindings.len(), 1);
    }

    #[test]
    fn test_invalid_yaml_is_an_error() {
        let dir = TempDir::new().unwrap();
        write(&dir, "broken.yaml", "kind: [Role\n");

        let err = scan_resources(dir.path()).unwrap_err();
        assert!(matches!(err, InstallerError::Manifest { .. }));
    }
}
