// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Kubernetes object handling: capability discovery, naming, idempotent
//! application and per-kind lifecycle.

pub mod apply;
pub mod capabilities;
pub mod checluster;
pub mod crd;
pub mod deployment;
pub mod namespaces;
pub mod naming;
pub mod rbac;

pub use apply::{Applied, ApplyMode, ApplyOutcome};
pub use capabilities::{probe_capabilities, ClusterCapabilities};
pub use namespaces::ensure_namespace_exists;
