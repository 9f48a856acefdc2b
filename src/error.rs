// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Identifies a Kubernetes object in user-visible messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectRef {
    pub kind: String,
    pub name: String,
    pub namespace: Option<String>,
}

impl ObjectRef {
    pub fn cluster(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            name: name.into(),
            namespace: None,
        }
    }

    pub fn namespaced(
        kind: impl Into<String>,
        name: impl Into<String>,
        namespace: impl Into<String>,
    ) -> Self {
        Self {
            kind: kind.into(),
            name: name.into(),
            namespace: Some(namespace.into()),
        }
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{} '{}' in namespace '{}'", self.kind, self.name, ns),
            None => write!(f, "{} '{}'", self.kind, self.name),
        }
    }
}

#[derive(Error, Debug)]
pub enum InstallerError {
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    #[error("Kubernetes API error for {object}: {source}")]
    Api {
        object: ObjectRef,
        #[source]
        source: kube::Error,
    },

    #[error("{object} not found")]
    Precondition { object: ObjectRef },

    #[error("{object} has no resourceVersion, refusing to replace it")]
    MissingResourceVersion { object: ObjectRef },

    #[error("container '{container}' not found in {object}")]
    MissingContainer { container: String, object: ObjectRef },

    #[error("Incompatible update: {0}")]
    Incompatible(String),

    #[error("{0} not initialized")]
    NotInitialized(&'static str),

    #[error("step '{step}' reads {slot} before any earlier step writes it")]
    PipelineOrder { step: &'static str, slot: String },

    #[error("timed out after {waited:?} waiting for {what}")]
    Timeout { what: String, waited: Duration },

    #[error("invalid manifest {}: {message}", path.display())]
    Manifest { path: PathBuf, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl InstallerError {
    /// Wrap a kube error with the object it concerns
    pub fn api(object: ObjectRef, source: kube::Error) -> Self {
        InstallerError::Api { object, source }
    }

    /// Check if this is a Kubernetes 404 Not Found error
    pub fn is_not_found(&self) -> bool {
        match self {
            InstallerError::Kube(kube::Error::Api(resp))
            | InstallerError::Api {
                source: kube::Error::Api(resp),
                ..
            } => resp.code == 404,
            _ => false,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, InstallerError::Timeout { .. })
    }

    /// Errors worth retrying: server-side failures, throttling and
    /// connection problems. Everything else is permanent.
    pub fn is_transient(&self) -> bool {
        let source = match self {
            InstallerError::Kube(e) | InstallerError::Api { source: e, .. } => e,
            _ => return false,
        };
        match source {
            kube::Error::Api(resp) => resp.code >= 500 || resp.code == 429,
            kube::Error::HyperError(_) | kube::Error::Service(_) => true,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, InstallerError>;
