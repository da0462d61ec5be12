//! HTTP client for the queue emulator
//!
//! The emulator exposes two endpoints: a JSON statistics API and an SQS-compatible
//! control API taking form-encoded `Action` requests.

use async_trait::async_trait;
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use queuedash_core::{FetchError, OperationError, OperationKind, Snapshot};
use reqwest::{header, Client};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use crate::{DEFAULT_ACCOUNT_ID, SQS_API_VERSION};

/// Characters escaped in the queue-name segment of a queue URL
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Where the emulator lives
#[derive(Debug, Clone)]
pub struct EndpointConfig {
    pub statistics_url: String,
    pub control_url: String,
    pub account_id: String,
    pub request_timeout: Duration,
}

impl EndpointConfig {
    /// Validate both base URLs. Trailing slashes are dropped.
    pub fn new(statistics_url: &str, control_url: &str) -> Result<Self, url::ParseError> {
        Ok(Self {
            statistics_url: normalize_base(statistics_url)?,
            control_url: normalize_base(control_url)?,
            account_id: DEFAULT_ACCOUNT_ID.to_string(),
            request_timeout: Duration::from_secs(10),
        })
    }

    pub fn with_account_id(mut self, account_id: impl Into<String>) -> Self {
        self.account_id = account_id.into();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn statistics_endpoint(&self) -> String {
        format!("{}/statistics/queues", self.statistics_url)
    }

    pub fn control_endpoint(&self) -> String {
        format!("{}/", self.control_url)
    }

    /// `{control}/{account}/{name}`, the SQS queue URL for `name`
    pub fn queue_url(&self, queue_name: &str) -> String {
        format!(
            "{}/{}/{}",
            self.control_url,
            self.account_id,
            utf8_percent_encode(queue_name, PATH_SEGMENT)
        )
    }
}

fn normalize_base(raw: &str) -> Result<String, url::ParseError> {
    let parsed = Url::parse(raw.trim())?;
    Ok(parsed.as_str().trim_end_matches('/').to_string())
}

/// Source of statistics snapshots, consumed by the poller
#[async_trait]
pub trait StatisticsSource: Send + Sync {
    async fn fetch_statistics(&self) -> Result<Snapshot, FetchError>;
}

/// Target of destructive queue operations
#[async_trait]
pub trait ControlSource: Send + Sync {
    async fn run_operation(
        &self,
        kind: OperationKind,
        queue_name: &str,
    ) -> Result<(), OperationError>;
}

/// reqwest-based client for both emulator endpoints
pub struct EmulatorClient {
    config: EndpointConfig,
    client: Client,
}

impl EmulatorClient {
    pub fn new(config: EndpointConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(config.request_timeout).build()?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &EndpointConfig {
        &self.config
    }

    pub async fn purge_queue(&self, queue_name: &str) -> Result<(), OperationError> {
        self.run_operation(OperationKind::Purge, queue_name).await
    }

    pub async fn delete_queue(&self, queue_name: &str) -> Result<(), OperationError> {
        self.run_operation(OperationKind::Delete, queue_name).await
    }
}

#[async_trait]
impl StatisticsSource for EmulatorClient {
    async fn fetch_statistics(&self) -> Result<Snapshot, FetchError> {
        let url = self.config.statistics_endpoint();
        debug!(url = %url, "Fetching queue statistics");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        Snapshot::from_json(&body).map_err(|e| FetchError::Decode(e.to_string()))
    }
}

#[async_trait]
impl ControlSource for EmulatorClient {
    async fn run_operation(
        &self,
        kind: OperationKind,
        queue_name: &str,
    ) -> Result<(), OperationError> {
        let queue_url = self.config.queue_url(queue_name);
        debug!(action = kind.action(), queue_url = %queue_url, "Sending control request");

        let response = self
            .client
            .post(self.config.control_endpoint())
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(control_form(kind, &queue_url))
            .send()
            .await
            .map_err(|e| OperationError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        warn!(
            action = kind.action(),
            queue = %queue_name,
            status = status.as_u16(),
            "Control request rejected"
        );

        Err(OperationError::Rejected {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            code: extract_xml_value(&body, "Code"),
            body,
        })
    }
}

/// Form body for an SQS queue action
pub fn control_form(kind: OperationKind, queue_url: &str) -> String {
    form_urlencoded::Serializer::new(String::new())
        .append_pair("Action", kind.action())
        .append_pair("QueueUrl", queue_url)
        .append_pair("Version", SQS_API_VERSION)
        .finish()
}

fn extract_xml_value(xml: &str, tag: &str) -> Option<String> {
    let open_tag = format!("<{}>", tag);
    let close_tag = format!("</{}>", tag);

    let start = xml.find(&open_tag)? + open_tag.len();
    let end = xml[start..].find(&close_tag)?;
    Some(xml[start..start + end].trim().to_string())
}
