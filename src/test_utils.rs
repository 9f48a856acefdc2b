// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Test utilities for mocking Kubernetes API responses.

use crate::config::WaitConfig;
use http::{Request, Response};
use http_body_util::BodyExt;
use kube::client::Body;
use kube::Client;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;
use tower::Service;

type Key = (String, String);

/// A request seen by the mock
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub body: Option<Value>,
}

/// A mock HTTP service that returns predefined responses based on method and path.
///
/// Several responses registered for the same request are served in order; the
/// last one keeps being served once the others are used up. Unmatched requests
/// get a Kubernetes 404 Status. Every request is recorded.
#[derive(Clone)]
pub struct MockService {
    responses: Arc<Mutex<HashMap<Key, VecDeque<(u16, String)>>>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockService {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(HashMap::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn on(self, method: &str, path: &str, status: u16, body: &str) -> Self {
        self.responses
            .lock()
            .unwrap()
            .entry((method.to_string(), path.to_string()))
            .or_default()
            .push_back((status, body.to_string()));
        self
    }

    pub fn on_get(self, path: &str, status: u16, body: &str) -> Self {
        self.on("GET", path, status, body)
    }

    pub fn on_post(self, path: &str, status: u16, body: &str) -> Self {
        self.on("POST", path, status, body)
    }

    pub fn on_put(self, path: &str, status: u16, body: &str) -> Self {
        self.on("PUT", path, status, body)
    }

    pub fn on_patch(self, path: &str, status: u16, body: &str) -> Self {
        self.on("PATCH", path, status, body)
    }

    pub fn on_delete(self, path: &str, status: u16, body: &str) -> Self {
        self.on("DELETE", path, status, body)
    }

    /// Build a kube Client from this mock service
    pub fn into_client(self) -> Client {
        Client::new(self, "default")
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Number of requests with this method and exact path
    pub fn count(&self, method: &str, path: &str) -> usize {
        self.requests()
            .iter()
            .filter(|r| r.method == method && r.path == path)
            .count()
    }

    /// Number of requests with this method, any path
    pub fn count_method(&self, method: &str) -> usize {
        self.requests()
            .iter()
            .filter(|r| r.method == method)
            .count()
    }

    pub fn last_body(&self, method: &str, path: &str) -> Option<Value> {
        self.requests()
            .into_iter()
            .rev()
            .find(|r| r.method == method && r.path == path)
            .and_then(|r| r.body)
    }

    fn next_response(&self, method: &str, path: &str) -> Option<(u16, String)> {
        let mut responses = self.responses.lock().unwrap();
        let queue = responses.get_mut(&(method.to_string(), path.to_string()))?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

impl Default for MockService {
    fn default() -> Self {
        Self::new()
    }
}

impl Service<Request<Body>> for MockService {
    type Response = Response<Body>;
    type Error = tower::BoxError;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let method = req.method().to_string();
        let path = req.uri().path().to_string();
        let response = self.next_response(&method, &path);
        let requests = self.requests.clone();

        Box::pin(async move {
            let bytes = req
                .into_body()
                .collect()
                .await
                .map_err(|e| -> tower::BoxError { e.into() })?
                .to_bytes();
            requests.lock().unwrap().push(RecordedRequest {
                method,
                path: path.clone(),
                body: serde_json::from_slice(&bytes).ok(),
            });

            let (status, body) = response
                .unwrap_or_else(|| (404, not_found_json("resource", &path)));
            Ok(Response::builder()
                .status(status)
                .header("content-type", "application/json")
                .body(Body::from(body.into_bytes()))
                .unwrap())
        })
    }
}

/// A Kubernetes Status failure body
pub fn status_json(code: u16, reason: &str, message: &str) -> String {
    json!({
        "kind": "Status",
        "apiVersion": "v1",
        "metadata": {},
        "status": "Failure",
        "message": message,
        "reason": reason,
        "code": code
    })
    .to_string()
}

/// Create a 404 not found response
pub fn not_found_json(resource: &str, name: &str) -> String {
    status_json(404, "NotFound", &format!("{} \"{}\" not found", resource, name))
}

/// Body returned by a successful delete
pub fn deleted_json() -> String {
    json!({
        "kind": "Status",
        "apiVersion": "v1",
        "metadata": {},
        "status": "Success",
        "code": 200
    })
    .to_string()
}

/// A minimal object of any kind, as returned by GET
pub fn object_json(api_version: &str, kind: &str, name: &str, namespace: Option<&str>) -> String {
    let mut metadata = json!({"name": name, "resourceVersion": "1", "uid": "test-uid"});
    if let Some(ns) = namespace {
        metadata["namespace"] = json!(ns);
    }
    json!({"apiVersion": api_version, "kind": kind, "metadata": metadata}).to_string()
}

/// A list of objects, as returned by LIST
pub fn list_json(api_version: &str, kind: &str, items: Vec<Value>) -> String {
    json!({
        "apiVersion": api_version,
        "kind": format!("{}List", kind),
        "metadata": {"resourceVersion": "1"},
        "items": items
    })
    .to_string()
}

/// Create a mock namespace JSON response
pub fn namespace_json(name: &str) -> String {
    object_json("v1", "Namespace", name, None)
}

/// API group discovery document listing the given groups
pub fn api_groups_json(groups: &[(&str, &[&str])]) -> String {
    let groups: Vec<Value> = groups
        .iter()
        .map(|(name, versions)| {
            let versions: Vec<Value> = versions
                .iter()
                .map(|v| json!({"groupVersion": format!("{}/{}", name, v), "version": v}))
                .collect();
            json!({"name": name, "versions": versions})
        })
        .collect();
    json!({"kind": "APIGroupList", "apiVersion": "v1", "groups": groups}).to_string()
}

/// Wait bounds small enough for tests that poll a mock
pub fn fast_waits() -> WaitConfig {
    WaitConfig {
        flush_delay: Duration::ZERO,
        poll_interval: Duration::from_millis(1),
        pod_ready_timeout: Duration::from_millis(50),
        replica_timeout: Duration::from_millis(50),
        cr_deletion_attempts: 3,
        finalizer_grace: Duration::ZERO,
    }
}
