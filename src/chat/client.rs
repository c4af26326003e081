//! HTTP transport for the completion endpoint.
//!
//! The exchange controller only sees the [`CompletionBackend`] trait: hand it
//! the wire messages for one turn, get back a stream of raw byte chunks. The
//! `reqwest` implementation lives here together with the outbound payload
//! structs.

use std::collections::BTreeMap;
use std::pin::Pin;

use anyhow::Result;
use async_trait::async_trait;
use futures_util::{Stream, StreamExt};
use reqwest::Client;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use serde::Serialize;

use crate::chat::config::CompletionApiConfig;

/// Request could not be sent, or the endpoint rejected it.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("request could not be sent: {0}")]
    Send(String),
    #[error("endpoint returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("response read failed: {0}")]
    Read(String),
}

/// Raw response body chunks, in arrival order, with arbitrary boundaries.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>, TransportError>> + Send>>;

/// One entry of the outbound `messages` sequence.
#[derive(Debug, Clone, Serialize)]
pub struct RequestMessage {
    pub role: &'static str,
    pub content: String,
}

/// Outbound payload of the completion endpoint.
#[derive(Serialize)]
struct CompletionPayload<'a> {
    model: &'a str,
    messages: &'a [RequestMessage],
    temperature: f32,
    stream: bool,
}

/// The seam between the exchange controller and the network.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Name used for the UI and for log lines.
    fn name(&self) -> &str;

    /// Submits one turn and opens the streaming response body.
    async fn open(&self, messages: Vec<RequestMessage>) -> Result<ByteStream, TransportError>;
}

/// `CompletionBackend` over an OpenAI-compatible HTTP endpoint.
pub struct HttpCompletionClient {
    base_url: String,
    model: String,
    temperature: f32,
    headers: HeaderMap,
    client: Client,
}

impl HttpCompletionClient {
    pub fn new(config: &CompletionApiConfig) -> Result<Self> {
        let headers = build_headers(config.resolved_api_key().as_deref(), &config.extra_headers)?;
        Ok(Self {
            base_url: config.base_url().to_string(),
            model: config.model().to_string(),
            temperature: config.temperature(),
            headers,
            client: Client::new(),
        })
    }
}

#[async_trait]
impl CompletionBackend for HttpCompletionClient {
    fn name(&self) -> &str {
        &self.model
    }

    async fn open(&self, messages: Vec<RequestMessage>) -> Result<ByteStream, TransportError> {
        let payload = CompletionPayload {
            model: &self.model,
            messages: &messages,
            temperature: self.temperature,
            stream: true,
        };
        let response = self
            .client
            .post(&self.base_url)
            .headers(self.headers.clone())
            .json(&payload)
            .send()
            .await
            .map_err(|err| TransportError::Send(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let chunks = response.bytes_stream().map(|item| {
            item.map(|chunk| chunk.to_vec())
                .map_err(|err| TransportError::Read(err.to_string()))
        });
        Ok(Box::pin(chunks))
    }
}

/// 建構請求標頭：JSON 內容型別、Bearer 授權與設定中的額外標頭。
fn build_headers(
    api_key: Option<&str>,
    extra: &BTreeMap<String, String>,
) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    if let Some(api_key) = api_key {
        let value = format!("Bearer {}", api_key);
        headers.insert(AUTHORIZATION, HeaderValue::from_str(&value)?);
    }
    for (key, value) in extra.iter() {
        let header_name = HeaderName::from_bytes(key.as_bytes())?;
        headers.insert(header_name, HeaderValue::from_str(value)?);
    }
    Ok(headers)
}
