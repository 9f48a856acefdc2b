// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Custom resource types managed by the installer.

pub mod che_cluster;

pub use che_cluster::{CheCluster, CheClusterSpec};
