//! Error types for the scrape pipeline.

use thiserror::Error;

/// Result type alias using [`ScrapeError`].
pub type Result<T> = std::result::Result<T, ScrapeError>;

/// Errors that can occur while scraping the MaxScale REST API.
///
/// None of these are fatal. Each one is scoped to the smallest unit it
/// concerns (one sub-path, one element, one field) and processing carries on.
#[derive(Error, Debug)]
pub enum ScrapeError {
    /// The request could not be sent or no response was received.
    #[error("Request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The upstream answered with a non-success status.
    #[error("Request to {url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    /// The response body could not be read.
    #[error("Failed to read response body from {url}: {source}")]
    BodyRead {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The response body is not a JSON document.
    #[error("Failed to decode {path} document: {source}")]
    Decode {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    /// An expected key is missing from one element of the document.
    #[error("Cannot extract `{field}` from {context}")]
    FieldExtraction { context: String, field: String },

    /// A raw value could not be converted to a number.
    #[error("Cannot parse value {raw:?} of field `{field}`")]
    ValueParse { field: String, raw: String },
}

impl ScrapeError {
    /// Create a field extraction error.
    pub fn missing(context: impl Into<String>, field: impl Into<String>) -> Self {
        Self::FieldExtraction {
            context: context.into(),
            field: field.into(),
        }
    }

    /// Create a field extraction error for an id that repeats an earlier element's.
    pub fn duplicate(context: impl Into<String>, id: &str) -> Self {
        Self::FieldExtraction {
            context: format!("{}: id {id:?} already seen", context.into()),
            field: "id".to_string(),
        }
    }

    /// Create a value parse error.
    pub fn parse(field: impl Into<String>, raw: impl Into<String>) -> Self {
        Self::ValueParse {
            field: field.into(),
            raw: raw.into(),
        }
    }

    /// Whether this error marks the whole scrape as failed.
    ///
    /// Only failures to obtain a document flip the `up` gauge; a single
    /// missing key or unparsable value just drops that one sample.
    pub fn degrades_health(&self) -> bool {
        matches!(
            self,
            Self::Transport { .. } | Self::Status { .. } | Self::BodyRead { .. } | Self::Decode { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_errors_do_not_degrade_health() {
        assert!(!ScrapeError::missing("service #0", "id").degrades_health());
        assert!(!ScrapeError::parse("queries", "abc").degrades_health());
        assert!(!ScrapeError::duplicate("server #1", "s1").degrades_health());
    }

    #[test]
    fn test_duplicate_id_message() {
        let err = ScrapeError::duplicate("server #1", "s1");
        assert!(matches!(err, ScrapeError::FieldExtraction { ref field, .. } if field == "id"));
        assert_eq!(
            err.to_string(),
            "Cannot extract `id` from server #1: id \"s1\" already seen"
        );
    }

    #[test]
    fn test_status_error_degrades_health() {
        let err = ScrapeError::Status {
            url: "http://127.0.0.1:8989/v1/services".to_string(),
            status: 401,
        };
        assert!(err.degrades_health());
        assert!(err.to_string().contains("HTTP 401"));
    }

    #[test]
    fn test_decode_error_degrades_health() {
        let source = serde_json::from_slice::<serde_json::Value>(b"not json").unwrap_err();
        let err = ScrapeError::Decode {
            path: "/servers".to_string(),
            source,
        };
        assert!(err.degrades_health());
    }
}
