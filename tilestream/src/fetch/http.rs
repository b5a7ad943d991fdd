//! Blocking HTTP transport for fetch batches.

use std::sync::mpsc;
use std::thread;

use tracing::debug;

use super::{BatchFetcher, FetchError, FetchOptions, FetchResponse, FetchResult};

/// Batch fetcher backed by a blocking reqwest client.
///
/// Requests are dispatched in waves of at most `max_connections`
/// threads; the call returns once every request of the batch has
/// either completed or failed. No retries.
pub struct HttpBatchFetcher;

impl HttpBatchFetcher {
    /// Create a new HTTP batch fetcher.
    pub fn new() -> Self {
        Self
    }

    fn build_client(options: &FetchOptions) -> Result<reqwest::blocking::Client, FetchError> {
        let mut builder = reqwest::blocking::Client::builder().timeout(options.timeout);
        if let Some(user_agent) = &options.user_agent {
            builder = builder.user_agent(user_agent.clone());
        }
        if options.accept_invalid_certs {
            builder = builder.danger_accept_invalid_certs(true);
        }
        builder
            .build()
            .map_err(|e| FetchError::new(format!("failed to create HTTP client: {}", e)))
    }
}

impl Default for HttpBatchFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl BatchFetcher for HttpBatchFetcher {
    fn fetch_all(&self, urls: &[String], options: &FetchOptions) -> Vec<FetchResult> {
        if urls.is_empty() {
            return Vec::new();
        }

        let client = match Self::build_client(options) {
            Ok(client) => client,
            // No client means no request can be attempted at all
            Err(e) => return urls.iter().map(|_| Err(e.clone())).collect(),
        };

        let batch_size = options.max_connections.max(1);
        debug!(
            requests = urls.len(),
            parallel = batch_size,
            "dispatching fetch batch"
        );

        let (tx, rx) = mpsc::channel();
        let mut handles = vec![];

        for wave in urls
            .iter()
            .cloned()
            .enumerate()
            .collect::<Vec<_>>()
            .chunks(batch_size)
        {
            for (index, url) in wave.iter().cloned() {
                let client = client.clone();
                let referer = options.referer.clone();
                let tx = tx.clone();

                let handle = thread::spawn(move || {
                    let result = fetch_one(&client, &url, referer.as_deref());
                    let _ = tx.send((index, result));
                });
                handles.push(handle);
            }

            // Wait for this wave before opening more connections
            for handle in handles.drain(..) {
                let _ = handle.join();
            }
        }

        drop(tx);

        let mut results: Vec<FetchResult> = urls
            .iter()
            .map(|_| Err(FetchError::new("request was not attempted")))
            .collect();
        for (index, result) in rx {
            results[index] = result;
        }
        results
    }
}

fn fetch_one(
    client: &reqwest::blocking::Client,
    url: &str,
    referer: Option<&str>,
) -> FetchResult {
    let mut request = client.get(url);
    if let Some(referer) = referer {
        request = request.header(reqwest::header::REFERER, referer);
    }

    let response = request
        .send()
        .map_err(|e| FetchError::new(format!("request failed: {}", e)))?;

    let status = response.status().as_u16();
    let body = response
        .bytes()
        .map_err(|e| FetchError::new(format!("failed to read response body: {}", e)))?;

    Ok(FetchResponse { status, body })
}
