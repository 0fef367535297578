//! Metric sinks, including the Prometheus text exposition encoder.

use std::collections::HashMap;
use std::fmt::Write;

use crate::catalog::ValueKind;
use crate::collector::Sample;

/// Content type of the text exposition format.
pub const TEXT_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Destination for the samples of one scrape.
///
/// Samples may arrive in any order; label values are already resolved.
pub trait MetricSink {
    fn emit(&mut self, sample: &Sample<'_>);
}

/// One metric family being rendered.
#[derive(Debug)]
struct Family {
    name: String,
    help: &'static str,
    kind: ValueKind,
    lines: Vec<String>,
}

/// Sink rendering the Prometheus text format (version 0.0.4).
///
/// Families are written in the order they are first seen, each with a single
/// `# HELP` and `# TYPE` header.
#[derive(Debug, Default)]
pub struct TextSink {
    families: Vec<Family>,
    index: HashMap<String, usize>,
}

impl TextSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of samples received so far.
    pub fn len(&self) -> usize {
        self.families.iter().map(|f| f.lines.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Render everything received into exposition text.
    pub fn finish(self) -> String {
        let mut output = String::with_capacity(self.len() * 100);

        for family in &self.families {
            writeln!(output, "# HELP {} {}", family.name, escape_help(family.help)).ok();
            writeln!(output, "# TYPE {} {}", family.name, family.kind.as_str()).ok();
            for line in &family.lines {
                output.push_str(line);
                output.push('\n');
            }
        }

        output
    }
}

impl MetricSink for TextSink {
    fn emit(&mut self, sample: &Sample<'_>) {
        let descriptor = sample.descriptor;

        let line = format!(
            "{}{} {}",
            descriptor.name,
            format_labels(descriptor.labels, &sample.labels),
            format_value(sample.value)
        );

        let slot = match self.index.get(&descriptor.name) {
            Some(&slot) => slot,
            None => {
                self.families.push(Family {
                    name: descriptor.name.clone(),
                    help: descriptor.help,
                    kind: descriptor.kind,
                    lines: Vec::new(),
                });
                self.index
                    .insert(descriptor.name.clone(), self.families.len() - 1);
                self.families.len() - 1
            }
        };

        self.families[slot].lines.push(line);
    }
}

/// Escape special characters in label values.
fn escape_label_value(value: &str) -> String {
    let mut result = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => result.push_str("\\\\"),
            '"' => result.push_str("\\\""),
            '\n' => result.push_str("\\n"),
            _ => result.push(c),
        }
    }
    result
}

/// Escape help text (backslash and newline only).
fn escape_help(help: &str) -> String {
    help.replace('\\', "\\\\").replace('\n', "\\n")
}

/// Format a floating point value for Prometheus.
fn format_value(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        if value.is_sign_positive() {
            "+Inf".to_string()
        } else {
            "-Inf".to_string()
        }
    } else if value.fract() == 0.0 {
        format!("{:.0}", value)
    } else {
        format!("{}", value)
    }
}

/// Format labels for Prometheus exposition format.
fn format_labels(names: &[&str], values: &[String]) -> String {
    if names.is_empty() {
        return String::new();
    }

    let parts: Vec<String> = names
        .iter()
        .zip(values)
        .map(|(k, v)| format!("{}=\"{}\"", k, escape_label_value(v)))
        .collect();

    format!("{{{}}}", parts.join(","))
}
