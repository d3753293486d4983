//! Fetch capability: how one work item becomes a payload.
//!
//! The dispatcher works against anything that can turn a work item into JSON.
//! Two implementations ship: an HTTP fetcher for real endpoints and a closure
//! adapter for synthetic or in-process work.

use crate::error::Result;
use crate::model::WorkItem;
use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;

/// Turns one work item into a JSON payload.
///
/// Implementations may block and may fail. Failures are swallowed at the
/// worker boundary: the dispatcher logs them and substitutes a `Null`
/// payload, so a bad item never aborts the run.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, item: &WorkItem) -> Result<serde_json::Value>;
}

// ---------------------------------------------------------------------------
// HTTP fetcher
// ---------------------------------------------------------------------------

/// Fetches `{base_url}/{item}` and parses the JSON body.
pub struct HttpFetcher {
    client: reqwest::Client,
    base_url: String,
}

impl HttpFetcher {
    /// Build a fetcher with a per-request timeout.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self { client, base_url })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, item: &WorkItem) -> Result<serde_json::Value> {
        let url = format!("{}/{}", self.base_url, item);
        let response = self.client.get(&url).send().await?.error_for_status()?;
        Ok(response.json().await?)
    }
}

// ---------------------------------------------------------------------------
// Closure adapter
// ---------------------------------------------------------------------------

/// Adapter so a plain async closure satisfies [`Fetcher`].
pub struct FetchFn<F>(F);

impl<F, Fut> FetchFn<F>
where
    F: Fn(WorkItem) -> Fut + Send + Sync,
    Fut: Future<Output = Result<serde_json::Value>> + Send,
{
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

#[async_trait]
impl<F, Fut> Fetcher for FetchFn<F>
where
    F: Fn(WorkItem) -> Fut + Send + Sync,
    Fut: Future<Output = Result<serde_json::Value>> + Send,
{
    async fn fetch(&self, item: &WorkItem) -> Result<serde_json::Value> {
        (self.0)(item.clone()).await
    }
}
