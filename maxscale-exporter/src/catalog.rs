//! Static catalog mapping MaxScale REST fields to Prometheus metric descriptors.

use std::collections::HashMap;
use std::sync::LazyLock;

/// Namespace shared by every exported metric.
pub const NAMESPACE: &str = "maxscale";

/// Label names for router-scoped metrics.
pub const ROUTER_LABELS: &[&str] = &["id"];

/// Label names for per-node diagnostics inside a router.
pub const NODE_LABELS: &[&str] = &["id", "node"];

/// Label names for server status metrics.
pub const SERVER_LABELS: &[&str] = &["id"];

/// Synthetic node key for the server status indicator.
pub const NODE_STATUS_KEY: &str = "node_status";

/// Synthetic node key for the master indicator.
pub const NODE_MASTER_KEY: &str = "node_master";

/// Prometheus value kind of a metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Counter,
    Gauge,
}

impl ValueKind {
    /// Get the TYPE comment string for Prometheus exposition format.
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueKind::Counter => "counter",
            ValueKind::Gauge => "gauge",
        }
    }
}

/// How a raw upstream value is turned into a number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FieldRule {
    /// Plain floating point parse.
    #[default]
    Float,
    /// Floating point parse after stripping a trailing `s` unit.
    Seconds,
}

/// Which catalog a field key is looked up in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Domain {
    Router,
    Node,
}

/// Immutable description of one exported metric family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricDescriptor {
    /// Fully-qualified metric name.
    pub name: String,
    /// Help text.
    pub help: &'static str,
    /// Ordered label names.
    pub labels: &'static [&'static str],
    /// Counter or gauge.
    pub kind: ValueKind,
    /// Conversion applied to the raw value.
    pub rule: FieldRule,
}

impl MetricDescriptor {
    /// Create a gauge descriptor `{namespace}_{subsystem}_{name}`.
    pub fn gauge(
        subsystem: &str,
        name: &str,
        help: &'static str,
        labels: &'static [&'static str],
    ) -> Self {
        Self {
            name: build_fq_name(NAMESPACE, subsystem, name),
            help,
            labels,
            kind: ValueKind::Gauge,
            rule: FieldRule::Float,
        }
    }

    /// Create a counter descriptor `{namespace}_{subsystem}_{name}`.
    pub fn counter(
        subsystem: &str,
        name: &str,
        help: &'static str,
        labels: &'static [&'static str],
    ) -> Self {
        Self {
            kind: ValueKind::Counter,
            ..Self::gauge(subsystem, name, help, labels)
        }
    }

    /// Use the given conversion rule for raw values.
    pub fn with_rule(mut self, rule: FieldRule) -> Self {
        self.rule = rule;
        self
    }
}

/// Join non-empty name parts with underscores.
pub fn build_fq_name(namespace: &str, subsystem: &str, name: &str) -> String {
    [namespace, subsystem, name]
        .iter()
        .filter(|part| !part.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("_")
}

/// Mapping from upstream field key to descriptor, for router and node fields.
#[derive(Debug)]
pub struct MetricCatalog {
    router: HashMap<&'static str, MetricDescriptor>,
    node: HashMap<&'static str, MetricDescriptor>,
}

impl MetricCatalog {
    fn new() -> Self {
        let router = HashMap::from([
            (
                "connections",
                MetricDescriptor::gauge(
                    "router",
                    "connections",
                    "Total connections of a router",
                    ROUTER_LABELS,
                ),
            ),
            (
                "current_connections",
                MetricDescriptor::gauge(
                    "router",
                    "connections_current",
                    "The total number of processed events",
                    ROUTER_LABELS,
                ),
            ),
            (
                "queries",
                MetricDescriptor::gauge(
                    "router",
                    "queries",
                    "Total queries of a router",
                    ROUTER_LABELS,
                ),
            ),
            (
                "route_master",
                MetricDescriptor::gauge(
                    "router",
                    "route_master",
                    "Total queries routed to the master",
                    ROUTER_LABELS,
                ),
            ),
            (
                "route_slave",
                MetricDescriptor::gauge(
                    "router",
                    "route_slave",
                    "Total queries routed to the slave",
                    ROUTER_LABELS,
                ),
            ),
            (
                "route_all",
                MetricDescriptor::gauge(
                    "router",
                    "route_all",
                    "Total queries routed",
                    ROUTER_LABELS,
                ),
            ),
            (
                "rw_transactions",
                MetricDescriptor::gauge(
                    "router",
                    "transactions_rw",
                    "Number of read/write transactions",
                    ROUTER_LABELS,
                ),
            ),
            (
                "ro_transactions",
                MetricDescriptor::gauge(
                    "router",
                    "transactions_ro",
                    "Number of read only transactions",
                    ROUTER_LABELS,
                ),
            ),
            (
                "replayed_transactions",
                MetricDescriptor::gauge(
                    "router",
                    "transactions_replayed",
                    "Number of replayed transactions",
                    ROUTER_LABELS,
                ),
            ),
        ]);

        let node = HashMap::from([
            (
                "total",
                MetricDescriptor::gauge(
                    "node",
                    "query_total",
                    "Total queries sent to a node",
                    NODE_LABELS,
                ),
            ),
            (
                "read",
                MetricDescriptor::gauge(
                    "node",
                    "query_read",
                    "Total read queries sent to a node",
                    NODE_LABELS,
                ),
            ),
            (
                "write",
                MetricDescriptor::gauge(
                    "node",
                    "query_write",
                    "Total write queries sent to a node",
                    NODE_LABELS,
                ),
            ),
            (
                "avg_sess_duration",
                MetricDescriptor::gauge(
                    "node",
                    "query_avg_sess_duration",
                    "Average query session duration on a node",
                    NODE_LABELS,
                )
                .with_rule(FieldRule::Seconds),
            ),
            (
                "avg_selects_per_session",
                MetricDescriptor::gauge(
                    "node",
                    "query_selects_per_session",
                    "Average selects per session on a node",
                    NODE_LABELS,
                ),
            ),
            (
                NODE_STATUS_KEY,
                MetricDescriptor::gauge(
                    "node",
                    "status",
                    "Current status of a node",
                    SERVER_LABELS,
                ),
            ),
            (
                NODE_MASTER_KEY,
                MetricDescriptor::gauge(
                    "node",
                    "master",
                    "Current master in galera",
                    SERVER_LABELS,
                ),
            ),
        ]);

        Self { router, node }
    }

    /// The process-wide catalog, built on first use.
    pub fn global() -> &'static MetricCatalog {
        static CATALOG: LazyLock<MetricCatalog> = LazyLock::new(MetricCatalog::new);
        &CATALOG
    }

    /// Look up the descriptor for a field key. Unknown keys yield `None`.
    pub fn descriptor_for(&self, domain: Domain, key: &str) -> Option<&MetricDescriptor> {
        match domain {
            Domain::Router => self.router.get(key),
            Domain::Node => self.node.get(key),
        }
    }

    /// Descriptor for a synthetic key that is always present.
    ///
    /// Only used with [`NODE_STATUS_KEY`] and [`NODE_MASTER_KEY`].
    pub(crate) fn synthetic(&self, key: &'static str) -> &MetricDescriptor {
        &self.node[key]
    }

    /// All descriptors, sorted by metric name.
    pub fn descriptors(&self) -> Vec<&MetricDescriptor> {
        let mut all: Vec<_> = self.router.values().chain(self.node.values()).collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        all
    }
}
