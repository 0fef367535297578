//! Extraction of labeled raw values from MaxScale REST documents.
//!
//! Two document shapes are understood:
//!
//! - `/v1/services`: `data[].attributes.router_diagnostics` holds router
//!   counters, and its `server_query_statistics` array holds per-node counters.
//! - `/v1/servers`: `data[].attributes.state` holds a free-text server state.
//!
//! The nesting is fixed, so lookups are direct rather than a recursive search.
//! A malformed element is recorded as an error and skipped; its siblings are
//! still walked. An element whose id repeats an earlier sibling's is skipped
//! the same way, so every emitted series has a unique label set.

use std::collections::HashSet;

use serde_json::Value;

use crate::catalog::{Domain, MetricCatalog, MetricDescriptor};
use crate::error::ScrapeError;

/// Key inside `router_diagnostics` that holds per-node statistics.
pub const NODE_STATISTICS_KEY: &str = "server_query_statistics";

/// Items extracted from one document, plus the element-level errors hit on the way.
#[derive(Debug)]
pub struct Walk<T> {
    pub items: Vec<T>,
    pub errors: Vec<ScrapeError>,
}

impl<T> Default for Walk<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            errors: Vec::new(),
        }
    }
}

/// A catalog-recognized field with its raw value and resolved label values.
#[derive(Debug, Clone, PartialEq)]
pub struct RawSample<'a> {
    pub descriptor: &'a MetricDescriptor,
    /// Upstream field key.
    pub field: String,
    /// Raw scalar text, before normalization.
    pub raw: String,
    pub labels: Vec<String>,
}

/// A server id with its state string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerEntry {
    pub id: String,
    pub state: String,
}

/// Walk a `/v1/services` document.
pub fn walk_services<'a>(doc: &Value, catalog: &'a MetricCatalog) -> Walk<RawSample<'a>> {
    let mut walk = Walk::default();

    let Some(services) = data_array(doc, "/services", &mut walk.errors) else {
        return walk;
    };

    let mut seen = HashSet::new();
    for (index, service) in services.iter().enumerate() {
        let Some(router_id) = service.get("id").and_then(Value::as_str) else {
            walk.errors
                .push(ScrapeError::missing(format!("service #{index}"), "id"));
            continue;
        };

        if !seen.insert(router_id) {
            walk.errors
                .push(ScrapeError::duplicate(format!("service #{index}"), router_id));
            continue;
        }

        let Some(diagnostics) = service
            .pointer("/attributes/router_diagnostics")
            .and_then(Value::as_object)
        else {
            walk.errors.push(ScrapeError::missing(
                format!("service {router_id}"),
                "attributes.router_diagnostics",
            ));
            continue;
        };

        for (key, value) in diagnostics {
            if key == NODE_STATISTICS_KEY {
                walk_nodes(router_id, value, catalog, &mut walk);
                continue;
            }

            let labels = vec![router_id.to_string()];
            if let Some(descriptor) = lookup(catalog, Domain::Router, key, &labels) {
                push_sample(&mut walk, descriptor, key, value, labels);
            }
        }
    }

    walk
}

fn walk_nodes<'a>(
    router_id: &str,
    statistics: &Value,
    catalog: &'a MetricCatalog,
    walk: &mut Walk<RawSample<'a>>,
) {
    let Some(nodes) = statistics.as_array() else {
        walk.errors.push(ScrapeError::missing(
            format!("router {router_id}"),
            format!("{NODE_STATISTICS_KEY}[]"),
        ));
        return;
    };

    let mut seen = HashSet::new();
    for (index, node) in nodes.iter().enumerate() {
        let Some(node_id) = node.get("id").and_then(Value::as_str) else {
            walk.errors.push(ScrapeError::missing(
                format!("router {router_id} node #{index}"),
                "id",
            ));
            continue;
        };

        if !seen.insert(node_id) {
            walk.errors.push(ScrapeError::duplicate(
                format!("router {router_id} node #{index}"),
                node_id,
            ));
            continue;
        }

        let Some(fields) = node.as_object() else {
            continue;
        };

        for (key, value) in fields {
            let labels = vec![router_id.to_string(), node_id.to_string()];
            if let Some(descriptor) = lookup(catalog, Domain::Node, key, &labels) {
                push_sample(walk, descriptor, key, value, labels);
            }
        }
    }
}

/// Walk a `/v1/servers` document.
///
/// Every server with a unique id yields an entry; a missing state is recorded
/// and classified as an empty string.
pub fn walk_servers(doc: &Value) -> Walk<ServerEntry> {
    let mut walk = Walk::default();

    let Some(servers) = data_array(doc, "/servers", &mut walk.errors) else {
        return walk;
    };

    let mut seen = HashSet::new();
    for (index, server) in servers.iter().enumerate() {
        let Some(id) = server.get("id").and_then(Value::as_str) else {
            walk.errors
                .push(ScrapeError::missing(format!("server #{index}"), "id"));
            continue;
        };

        if !seen.insert(id) {
            walk.errors
                .push(ScrapeError::duplicate(format!("server #{index}"), id));
            continue;
        }

        let state = match server.pointer("/attributes/state").and_then(Value::as_str) {
            Some(state) => state.to_string(),
            None => {
                walk.errors.push(ScrapeError::missing(
                    format!("server {id}"),
                    "attributes.state",
                ));
                String::new()
            }
        };

        walk.items.push(ServerEntry {
            id: id.to_string(),
            state,
        });
    }

    walk
}

fn data_array<'v>(doc: &'v Value, path: &str, errors: &mut Vec<ScrapeError>) -> Option<&'v [Value]> {
    match doc.get("data").and_then(Value::as_array) {
        Some(data) => Some(data.as_slice()),
        None => {
            errors.push(ScrapeError::missing(format!("{path} document"), "data"));
            None
        }
    }
}

/// Catalog lookup restricted to descriptors whose label schema fits `labels`.
fn lookup<'a>(
    catalog: &'a MetricCatalog,
    domain: Domain,
    key: &str,
    labels: &[String],
) -> Option<&'a MetricDescriptor> {
    catalog
        .descriptor_for(domain, key)
        .filter(|descriptor| descriptor.labels.len() == labels.len())
}

fn push_sample<'a>(
    walk: &mut Walk<RawSample<'a>>,
    descriptor: &'a MetricDescriptor,
    key: &str,
    value: &Value,
    labels: Vec<String>,
) {
    match scalar_text(value) {
        Some(raw) => walk.items.push(RawSample {
            descriptor,
            field: key.to_string(),
            raw,
            labels,
        }),
        None => walk.errors.push(ScrapeError::parse(key, value.to_string())),
    }
}

/// Text of a JSON string or number.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
