//! Scrape orchestration: fetch, walk, normalize and emit.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use serde_json::Value;
use tracing::{debug, warn};

use crate::catalog::{MetricCatalog, MetricDescriptor, NODE_MASTER_KEY, NODE_STATUS_KEY};
use crate::config::MaxScaleConfig;
use crate::error::{Result, ScrapeError};
use crate::exposition::{MetricSink, TextSink};
use crate::fetcher::{SERVERS_PATH, SERVICES_PATH, StatusFetcher};
use crate::normalize::{classify_state, normalize_value};
use crate::walker::{walk_servers, walk_services};

/// One metric value with its resolved label values.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample<'a> {
    pub descriptor: &'a MetricDescriptor,
    pub value: f64,
    /// Label values, in the order of `descriptor.labels`.
    pub labels: Vec<String>,
}

impl<'a> Sample<'a> {
    pub fn new(descriptor: &'a MetricDescriptor, value: f64, labels: Vec<String>) -> Self {
        debug_assert_eq!(descriptor.labels.len(), labels.len());
        Self {
            descriptor,
            value,
            labels,
        }
    }
}

/// Output of one scrape cycle.
#[derive(Debug, Clone)]
pub struct ScrapeResult<'a> {
    /// All samples in emission order; `up` and the scrape counter come last.
    pub samples: Vec<Sample<'a>>,
    /// Whether any document could not be fetched or decoded.
    pub failed: bool,
}

impl<'a> ScrapeResult<'a> {
    /// Value of the health gauge for this scrape.
    pub fn up(&self) -> bool {
        !self.failed
    }

    /// Samples of the given metric family.
    pub fn family<'s>(&'s self, name: &'s str) -> impl Iterator<Item = &'s Sample<'a>> + 's {
        self.samples
            .iter()
            .filter(move |s| s.descriptor.name == name)
    }

    /// Send every sample to a sink.
    pub fn emit_to<S: MetricSink>(&self, sink: &mut S) {
        for sample in &self.samples {
            sink.emit(sample);
        }
    }
}

/// Collector statistics.
#[derive(Debug, Clone, Default)]
pub struct CollectorStats {
    /// Scrape cycles started.
    pub scrapes: u64,
    /// Scrape cycles that reported `up = 0`.
    pub failed_scrapes: u64,
    /// Duration of the last completed scrape in milliseconds.
    pub last_scrape_duration_ms: u64,
    /// Health of the last completed scrape.
    pub last_up: bool,
}

/// Pull-based collector for the MaxScale REST API.
///
/// Each call to [`collect`](Self::collect) is an independent scrape. The only
/// state carried between scrapes is the scrape counter and the statistics, so
/// concurrent scrapes are safe.
///
/// With a scrape timeout set, both document fetches share one deadline; a
/// cycle that outlives it reports `up 0` along with whatever was gathered.
pub struct MaxScaleCollector {
    fetcher: StatusFetcher,
    scrape_timeout: Option<Duration>,
    catalog: &'static MetricCatalog,
    up: MetricDescriptor,
    total_scrapes_desc: MetricDescriptor,
    total_scrapes: AtomicU64,
    stats: RwLock<CollectorStats>,
}

impl MaxScaleCollector {
    /// Create a collector scraping through the given fetcher.
    pub fn new(fetcher: StatusFetcher) -> Self {
        Self {
            fetcher,
            scrape_timeout: None,
            catalog: MetricCatalog::global(),
            up: MetricDescriptor::gauge(
                "",
                "up",
                "Was the last scrape of MaxScale successful?",
                &[],
            ),
            total_scrapes_desc: MetricDescriptor::counter(
                "exporter",
                "total_scrapes",
                "Current total MaxScale scrapes",
                &[],
            ),
            total_scrapes: AtomicU64::new(0),
            stats: RwLock::new(CollectorStats::default()),
        }
    }

    /// Create a collector from the upstream configuration.
    pub fn from_config(config: &MaxScaleConfig) -> Result<Self> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let fetcher = StatusFetcher::new(&config.address, timeout)?;
        Ok(Self::new(fetcher).with_scrape_timeout(timeout))
    }

    /// Bound each whole scrape cycle. A zero timeout leaves it unbounded.
    pub fn with_scrape_timeout(mut self, timeout: Duration) -> Self {
        self.scrape_timeout = (!timeout.is_zero()).then_some(timeout);
        self
    }

    /// Every descriptor this collector can emit.
    pub fn describe(&self) -> Vec<&MetricDescriptor> {
        let mut all = self.catalog.descriptors();
        all.push(&self.up);
        all.push(&self.total_scrapes_desc);
        all
    }

    /// The upstream `host:port` being scraped.
    pub fn target(&self) -> &str {
        self.fetcher.host()
    }

    /// Total scrapes started so far.
    pub fn total_scrapes(&self) -> u64 {
        self.total_scrapes.load(Ordering::Relaxed)
    }

    /// Get collector statistics.
    pub fn stats(&self) -> CollectorStats {
        self.stats.read().clone()
    }

    /// Run one scrape cycle.
    pub async fn collect(&self) -> ScrapeResult<'_> {
        let start = Instant::now();
        let scrapes = self.total_scrapes.fetch_add(1, Ordering::Relaxed) + 1;

        let mut samples = Vec::new();
        let steps = self.scrape_documents(&mut samples);
        let failed = match self.scrape_timeout {
            Some(timeout) => match tokio::time::timeout(timeout, steps).await {
                Ok(failed) => failed,
                Err(_) => {
                    warn!(
                        target_host = %self.target(),
                        timeout_ms = timeout.as_millis() as u64,
                        "Scrape deadline exceeded"
                    );
                    true
                }
            },
            None => steps.await,
        };

        let up = if failed { 0.0 } else { 1.0 };
        samples.push(Sample::new(&self.up, up, Vec::new()));
        samples.push(Sample::new(
            &self.total_scrapes_desc,
            scrapes as f64,
            Vec::new(),
        ));

        let elapsed = start.elapsed();
        {
            let mut stats = self.stats.write();
            stats.scrapes += 1;
            if failed {
                stats.failed_scrapes += 1;
            }
            stats.last_scrape_duration_ms = elapsed.as_millis() as u64;
            stats.last_up = !failed;
        }

        debug!(
            samples = samples.len(),
            up = !failed,
            duration_ms = elapsed.as_millis() as u64,
            "Scrape completed"
        );

        ScrapeResult { samples, failed }
    }

    /// Run one scrape and render it in Prometheus exposition format.
    pub async fn render(&self) -> String {
        let result = self.collect().await;
        let mut sink = TextSink::new();
        result.emit_to(&mut sink);
        sink.finish()
    }

    /// Fetch both documents in order. Returns whether either step failed.
    async fn scrape_documents<'a>(&'a self, samples: &mut Vec<Sample<'a>>) -> bool {
        let mut failed = false;

        if let Err(e) = self.scrape_services(samples).await {
            failed = true;
            warn!(target_host = %self.target(), error = %e, "Services scrape failed");
        }

        if let Err(e) = self.scrape_servers(samples).await {
            failed = true;
            warn!(target_host = %self.target(), error = %e, "Servers scrape failed");
        }

        failed
    }

    async fn scrape_services<'a>(&'a self, samples: &mut Vec<Sample<'a>>) -> Result<()> {
        let doc = self.fetch_document(SERVICES_PATH).await?;
        let walk = walk_services(&doc, self.catalog);
        log_element_errors(SERVICES_PATH, &walk.errors);

        for raw in walk.items {
            match normalize_value(&raw.field, &raw.raw, raw.descriptor.rule) {
                Ok(value) => samples.push(Sample::new(raw.descriptor, value, raw.labels)),
                Err(e) => {
                    warn!(path = SERVICES_PATH, labels = ?raw.labels, error = %e, "Skipping sample");
                }
            }
        }

        Ok(())
    }

    async fn scrape_servers<'a>(&'a self, samples: &mut Vec<Sample<'a>>) -> Result<()> {
        let doc = self.fetch_document(SERVERS_PATH).await?;
        let walk = walk_servers(&doc);
        log_element_errors(SERVERS_PATH, &walk.errors);

        let status = self.catalog.synthetic(NODE_STATUS_KEY);
        let master = self.catalog.synthetic(NODE_MASTER_KEY);

        for server in walk.items {
            let state = classify_state(&server.state);
            samples.push(Sample::new(status, state.status, vec![server.id.clone()]));
            samples.push(Sample::new(master, state.master, vec![server.id]));
        }

        Ok(())
    }

    async fn fetch_document(&self, path: &str) -> Result<Value> {
        let body = self.fetcher.fetch(path).await?;
        serde_json::from_slice(&body).map_err(|source| ScrapeError::Decode {
            path: path.to_string(),
            source,
        })
    }
}

impl std::fmt::Debug for MaxScaleCollector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MaxScaleCollector")
            .field("fetcher", &self.fetcher)
            .field("scrape_timeout", &self.scrape_timeout)
            .field("total_scrapes", &self.total_scrapes())
            .finish()
    }
}

fn log_element_errors(path: &str, errors: &[ScrapeError]) {
    for error in errors {
        match error {
            ScrapeError::ValueParse { .. } => warn!(path, error = %error, "Skipping field"),
            _ => debug!(path, error = %error, "Skipping element"),
        }
    }
}

/// Create a shareable collector handle.
pub type SharedCollector = Arc<MaxScaleCollector>;
