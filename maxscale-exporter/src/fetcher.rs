//! HTTP client for the MaxScale REST API.

use std::time::Duration;

use tracing::trace;

use crate::error::{Result, ScrapeError};

/// Sub-path of the services listing.
pub const SERVICES_PATH: &str = "/services";

/// Sub-path of the servers listing.
pub const SERVERS_PATH: &str = "/servers";

/// Basic-auth credentials embedded in the configured address.
#[derive(Clone, PartialEq, Eq)]
struct Credentials {
    username: String,
    password: Option<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}

/// Fetches raw status documents from `http://{address}/v1{path}`.
///
/// The address is `host:port`, optionally prefixed with `user:password@`.
/// Credentials are sent as HTTP basic auth and never appear in URLs or logs.
#[derive(Debug, Clone)]
pub struct StatusFetcher {
    client: reqwest::Client,
    host: String,
    credentials: Option<Credentials>,
}

impl StatusFetcher {
    /// Create a fetcher. A zero `timeout` leaves requests unbounded.
    pub fn new(address: &str, timeout: Duration) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if !timeout.is_zero() {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|source| ScrapeError::Transport {
            url: format!("http://{address}"),
            source,
        })?;

        let (credentials, host) = split_credentials(address);

        Ok(Self {
            client,
            host: host.to_string(),
            credentials,
        })
    }

    /// The `host:port` part of the address.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Full URL for a sub-path such as `/services`.
    pub fn url(&self, sub_path: &str) -> String {
        format!("http://{}/v1{}", self.host, sub_path)
    }

    /// Perform a single GET and return the body bytes.
    pub async fn fetch(&self, sub_path: &str) -> Result<Vec<u8>> {
        let url = self.url(sub_path);

        let mut request = self.client.get(&url);
        if let Some(credentials) = &self.credentials {
            request = request.basic_auth(&credentials.username, credentials.password.as_ref());
        }

        let response = request
            .send()
            .await
            .map_err(|source| ScrapeError::Transport {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScrapeError::Status {
                url,
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|source| ScrapeError::BodyRead {
                url: url.clone(),
                source,
            })?;

        trace!(url = %url, bytes = body.len(), "Fetched status document");

        Ok(body.to_vec())
    }
}

/// Split `user:pass@host:port` into credentials and `host:port`.
fn split_credentials(address: &str) -> (Option<Credentials>, &str) {
    let Some((userinfo, host)) = address.rsplit_once('@') else {
        return (None, address);
    };

    let credentials = match userinfo.split_once(':') {
        Some((username, password)) => Credentials {
            username: username.to_string(),
            password: Some(password.to_string()),
        },
        None => Credentials {
            username: userinfo.to_string(),
            password: None,
        },
    };

    (Some(credentials), host)
}
