use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, de::DeserializeOwned};
use tracing::{debug, warn};

use crate::{
    error::FeedError,
    grid::GridCell,
    issue_time::IssueTime,
    model::{ObservationItem, RawFeedItem},
};

use super::FeedSource;

/// Public data portal root of the village forecast service.
pub const DEFAULT_BASE_URL: &str = "http://apis.data.go.kr/1360000/VilageFcstInfoService_2.0";

/// Result code of a successful response.
pub const RESULT_OK: &str = "00";

const FORECAST_ENDPOINT: &str = "getVilageFcst";
const OBSERVATION_ENDPOINT: &str = "getUltraSrtNcst";

/// One short-term release carries roughly 900 rows for three days.
const FORECAST_ROWS: u32 = 1000;
const OBSERVATION_ROWS: u32 = 10;

#[derive(Debug, Clone)]
pub struct KmaClient {
    service_key: String,
    base_url: String,
    http: Client,
}

impl KmaClient {
    pub fn new(service_key: String) -> Self {
        Self {
            service_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            http: Client::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn fetch_items<T: DeserializeOwned>(
        &self,
        endpoint: &'static str,
        rows: u32,
        cell: GridCell,
        issue: IssueTime,
    ) -> Result<Vec<T>> {
        // The portal hands out keys already percent-encoded; pass them through untouched.
        let url = format!(
            "{}/{}?serviceKey={}",
            self.base_url.trim_end_matches('/'),
            endpoint,
            self.service_key
        );

        debug!(endpoint, %cell, %issue, "requesting KMA feed");

        let res = self
            .http
            .get(&url)
            .query(&[
                ("numOfRows", rows.to_string()),
                ("pageNo", "1".to_string()),
                ("dataType", "JSON".to_string()),
                ("base_date", issue.base_date()),
                ("base_time", issue.base_time()),
                ("nx", cell.x.to_string()),
                ("ny", cell.y.to_string()),
            ])
            .send()
            .await
            .with_context(|| format!("Failed to send request to KMA ({endpoint})"))?;

        let status = res.status();
        let body = res
            .text()
            .await
            .with_context(|| format!("Failed to read KMA {endpoint} response body"))?;

        if !status.is_success() {
            warn!(endpoint, %status, "KMA request failed");
            return Err(FeedError::Status { endpoint, status, body: truncate_body(&body) }.into());
        }

        let envelope: FeedEnvelope = serde_json::from_str(&body).with_context(|| {
            format!("Failed to parse KMA {endpoint} JSON: {}", truncate_body(&body))
        })?;

        let items = envelope.into_items(endpoint)?;
        debug!(endpoint, rows = items.len(), "received KMA feed");
        Ok(items)
    }
}

#[async_trait]
impl FeedSource for KmaClient {
    async fn fetch_forecast(&self, cell: GridCell, issue: IssueTime) -> Result<Vec<RawFeedItem>> {
        self.fetch_items(FORECAST_ENDPOINT, FORECAST_ROWS, cell, issue).await
    }

    async fn fetch_observation(
        &self,
        cell: GridCell,
        issue: IssueTime,
    ) -> Result<Vec<ObservationItem>> {
        self.fetch_items(OBSERVATION_ENDPOINT, OBSERVATION_ROWS, cell, issue).await
    }
}

/// `{"response": {"header": {...}, "body": {"items": {"item": [...]}}}}`
#[derive(Debug, Deserialize)]
pub struct FeedEnvelope {
    pub response: FeedResponse,
}

#[derive(Debug, Deserialize)]
pub struct FeedResponse {
    pub header: FeedHeader,
    /// Kept raw: error responses send `"items": ""` instead of an object.
    #[serde(default)]
    pub body: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedHeader {
    pub result_code: String,
    pub result_msg: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FeedBody<T> {
    items: FeedItems<T>,
}

#[derive(Debug, Deserialize)]
struct FeedItems<T> {
    #[serde(default = "Vec::new")]
    item: Vec<T>,
}

impl FeedEnvelope {
    /// Check the result code and decode the rows.
    pub fn into_items<T: DeserializeOwned>(self, endpoint: &'static str) -> Result<Vec<T>> {
        let FeedResponse { header, body } = self.response;

        if header.result_code != RESULT_OK {
            warn!(endpoint, code = %header.result_code, msg = %header.result_msg, "KMA returned an error code");
            return Err(FeedError::ResultCode {
                endpoint,
                code: header.result_code,
                message: header.result_msg,
            }
            .into());
        }

        let body = body.ok_or(FeedError::MissingBody { endpoint })?;
        let body: FeedBody<T> = serde_json::from_value(body)
            .with_context(|| format!("Failed to decode KMA {endpoint} items"))?;

        Ok(body.items.item)
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
