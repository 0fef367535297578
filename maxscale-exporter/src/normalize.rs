//! Conversion of raw MaxScale values into metric values.

use crate::catalog::FieldRule;
use crate::error::{Result, ScrapeError};

/// Numeric pair derived from a server state string.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ServerState {
    /// 1 if the server is running.
    pub status: f64,
    /// 1 if the server is running as master.
    pub master: f64,
}

/// Convert a raw field value according to its rule.
pub fn normalize_value(field: &str, raw: &str, rule: FieldRule) -> Result<f64> {
    let trimmed = raw.trim();
    let number = match rule {
        FieldRule::Float => trimmed,
        FieldRule::Seconds => trimmed.strip_suffix('s').unwrap_or(trimmed),
    };

    number
        .parse::<f64>()
        .map_err(|_| ScrapeError::parse(field, raw))
}

/// Classify a server state string such as `"Master, Running"`.
///
/// Tests are case-sensitive and ordered: `Down` wins over `Running`.
pub fn classify_state(state: &str) -> ServerState {
    if state.contains("Down") {
        return ServerState {
            status: 0.0,
            master: 0.0,
        };
    }

    if state.contains("Running") {
        let master = if state.contains("Master") { 1.0 } else { 0.0 };
        return ServerState {
            status: 1.0,
            master,
        };
    }

    ServerState {
        status: 0.0,
        master: 0.0,
    }
}
