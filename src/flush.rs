/// Best-effort flushing of crops from an external edge cache
use async_trait::async_trait;
use log::debug;
use reqwest::{Client, Method, StatusCode};
use serde::Serialize;
use std::time::Duration;

/// Error while notifying the edge cache about a stale crop
#[derive(Debug, Serialize)]
pub struct FlushError {
    pub reason: String,
    pub http_error_code: Option<u32>,
}

impl FlushError {
    fn new(reason: String, http_error_code: Option<u32>) -> Self {
        FlushError {
            reason,
            http_error_code,
        }
    }
}

/// Flush notification hook for caches that sit in front of this service.
///
/// Failures here are logged by the caller and never fail the selection
/// update that triggered them; a stale edge entry beats a blocked edit.
#[async_trait]
pub trait CacheFlusher: Send + Sync {
    async fn flush(&self, path: &str) -> Result<(), FlushError>;
}

/// Issues a PURGE request per crop path against a configured base URL.
pub struct HttpCacheFlusher {
    flush_base_url: String,
    method: Method,
    client: Client,
}

impl HttpCacheFlusher {
    pub fn new(flush_base_url: String, timeout: Option<u32>) -> Self {
        let timeout = Duration::from_secs(timeout.unwrap_or(30) as u64);
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout / 3)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .expect("Failed to create flush hook client");

        HttpCacheFlusher {
            flush_base_url: flush_base_url.trim_end_matches("/").into(),
            method: Method::from_bytes(b"PURGE").expect("PURGE is a valid method name"),
            client,
        }
    }
}

#[async_trait]
impl CacheFlusher for HttpCacheFlusher {
    async fn flush(&self, path: &str) -> Result<(), FlushError> {
        let resp = self
            .client
            .request(
                self.method.clone(),
                format!("{}{}", self.flush_base_url, path),
            )
            .send()
            .await;
        let resp = match resp {
            Ok(resp) => resp,
            Err(err) => {
                debug!(
                    "Got http error while trying to flush crop {}. Err: {}",
                    path, err
                );
                return Err(FlushError::new(
                    "Failed to request crop flush".to_string(),
                    None,
                ));
            }
        };
        let status = resp.status();
        if status != StatusCode::OK {
            debug!("Got http error from flush hook status={},path={}", status, path);
            return Err(FlushError::new(
                "Got error from flush hook".to_string(),
                Some(status.as_u16().into()),
            ));
        }

        Ok(())
    }
}
