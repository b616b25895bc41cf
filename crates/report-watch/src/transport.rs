//! Blocking HTTP transport behind a small trait.
//!
//! The orchestrator only needs two things from the network: a page or JSON
//! body as text, and an artifact streamed into a writer. Both are single
//! attempts; there is no retry or backoff here.

use std::io::Write;
use std::time::Duration;

/// Failure of a single request.
#[derive(thiserror::Error, Debug)]
pub enum TransportError {
    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("Request to {url} failed: {reason}")]
    Request { url: String, reason: String },

    #[error("Failed to build HTTP client: {0}")]
    Client(String),
}

/// Network access used by the resolver, catalog client, and downloader.
pub trait Transport {
    /// GET `url` and return the body as text. Non-2xx statuses are errors.
    fn get_text(&self, url: &str) -> Result<String, TransportError>;

    /// GET `url` and copy the body into `sink`, returning the byte count.
    fn fetch_to(&self, url: &str, sink: &mut dyn Write) -> Result<u64, TransportError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn get_text(&self, url: &str) -> Result<String, TransportError> {
        (**self).get_text(url)
    }

    fn fetch_to(&self, url: &str, sink: &mut dyn Write) -> Result<u64, TransportError> {
        (**self).fetch_to(url, sink)
    }
}

/// `Transport` over `reqwest::blocking::Client`.
pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    /// Build a client with the given per-request timeout and user agent.
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self, TransportError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(5))
            .user_agent(user_agent)
            .build()
            .map_err(|e| TransportError::Client(e.to_string()))?;

        Ok(Self { client })
    }

    fn send(&self, url: &str) -> Result<reqwest::blocking::Response, TransportError> {
        let resp = self
            .client
            .get(url)
            .send()
            .map_err(|e| request_error(url, e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        tracing::debug!("GET {url} -> {}", status.as_u16());
        Ok(resp)
    }
}

impl Transport for HttpTransport {
    fn get_text(&self, url: &str) -> Result<String, TransportError> {
        self.send(url)?.text().map_err(|e| request_error(url, e))
    }

    fn fetch_to(&self, url: &str, sink: &mut dyn Write) -> Result<u64, TransportError> {
        let mut resp = self.send(url)?;
        resp.copy_to(sink).map_err(|e| request_error(url, e))
    }
}

fn request_error(url: &str, e: reqwest::Error) -> TransportError {
    TransportError::Request {
        url: url.to_string(),
        reason: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_transport_creation() {
        let transport = HttpTransport::new(Duration::from_secs(5), "report-watch-test");
        assert!(transport.is_ok());
    }

    #[test]
    fn test_status_error_message() {
        let err = TransportError::Status {
            url: "https://example.com/list".to_string(),
            status: 503,
        };
        assert_eq!(err.to_string(), "HTTP 503 from https://example.com/list");
    }
}
