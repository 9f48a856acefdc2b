// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

/// Manifest files expected at fixed paths below the resources directory
pub mod paths {
    pub const SERVICE_ACCOUNT: &str = "service_account.yaml";
    pub const OPERATOR_DEPLOYMENT: &str = "operator.yaml";
    pub const CRD_V1: &str = "crds/org_v1_che_crd.yaml";
    pub const CRD_V1BETA1: &str = "crds/org_v1_che_crd-v1beta1.yaml";
    pub const DEFAULT_CR: &str = "crds/org_v1_che_cr.yaml";
}

/// Names of the objects the installer owns
pub mod names {
    pub const OPERATOR: &str = "che-operator";
    pub const OPERATOR_CONTAINER: &str = "che-operator";
    pub const OPERATOR_SELECTOR: &str = "app=che-operator";
    pub const SERVICE_ACCOUNT: &str = "che-operator";
    pub const CRD: &str = "checlusters.org.eclipse.che";
    pub const POSTGRES_PVC: &str = "postgres-data";
    /// Cluster RBAC created before names were prefixed with the namespace
    pub const LEGACY_CLUSTER_ROLE: &str = "che-operator";
    pub const LEGACY_CLUSTER_ROLE_BINDING: &str = "che-operator";
    /// Cluster RBAC created by the workspace engine component
    pub const ALTERNATE_COMPONENT_PREFIX: &str = "devworkspace-che";
}

/// Image tag used by the nightly channel
pub const NIGHTLY_TAG: &str = "next";

/// Convergence polling defaults
pub mod wait {
    /// Delay that lets the API server flush newly created objects
    pub const FLUSH_DELAY_SECS: u64 = 5;
    pub const POLL_INTERVAL_SECS: u64 = 1;
    pub const POD_READY_TIMEOUT_SECS: u64 = 130;
    pub const REPLICA_TIMEOUT_SECS: u64 = 300;
    pub const CR_DELETION_ATTEMPTS: u32 = 20;
    pub const FINALIZER_GRACE_SECS: u64 = 2;
}
