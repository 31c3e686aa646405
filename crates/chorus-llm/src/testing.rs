//! Test doubles for the transport boundary

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::{StreamExt, stream};
use http::{HeaderMap, StatusCode};

use crate::client::CompletionClient;
use crate::error::LlmError;
use crate::provider::WireRequest;
use crate::provider::openai::{OpenAiAdapter, OpenAiDialect};
use crate::sse::ByteStream;
use crate::transport::{Transport, WireResponse};

type Responder = dyn Fn(&WireRequest) -> Result<WireResponse, LlmError> + Send + Sync;

/// Transport answering from a closure and recording every request body
pub struct ScriptedTransport {
    respond: Box<Responder>,
    requests: Mutex<Vec<serde_json::Value>>,
}

impl ScriptedTransport {
    pub fn new(respond: impl Fn(&WireRequest) -> Result<WireResponse, LlmError> + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self {
            respond: Box::new(respond),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<serde_json::Value> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: WireRequest) -> Result<WireResponse, LlmError> {
        self.requests.lock().unwrap().push(request.body.clone());
        (self.respond)(&request)
    }
}

pub fn openai_client(label: &str, transport: Arc<ScriptedTransport>) -> CompletionClient {
    let adapter = OpenAiAdapter::new(
        label,
        OpenAiDialect::OpenAi,
        Some(url::Url::parse("http://vendor.test/v1").unwrap()),
        Some("sk-test".into()),
    )
    .unwrap();
    CompletionClient::new(Arc::new(adapter), transport, "o3-mini")
}

fn frames(payloads: &[&str]) -> Vec<Bytes> {
    payloads.iter().map(|p| Bytes::from(format!("data: {p}\n\n"))).collect()
}

/// Successful event-stream response carrying `payloads`
pub fn sse_body(payloads: &[&str]) -> WireResponse {
    WireResponse {
        status: StatusCode::OK,
        headers: HeaderMap::new(),
        body: static_body(frames(payloads)),
    }
}

/// Event-stream response that delivers `payloads` and then never ends
pub fn hanging_sse(payloads: &[&str]) -> WireResponse {
    let chunks: Vec<Result<Bytes, LlmError>> = frames(payloads).into_iter().map(Ok).collect();
    let body: ByteStream = Box::pin(stream::iter(chunks).chain(stream::pending()));
    WireResponse {
        status: StatusCode::OK,
        headers: HeaderMap::new(),
        body,
    }
}

/// Plain JSON response
pub fn json_response(status: StatusCode, body: &str) -> WireResponse {
    WireResponse {
        status,
        headers: HeaderMap::new(),
        body: static_body([Bytes::from(body.to_owned())]),
    }
}

/// Body made of fixed chunks
pub fn static_body<I, B>(chunks: I) -> ByteStream
where
    I: IntoIterator<Item = B>,
    B: Into<Bytes>,
{
    let chunks: Vec<Result<Bytes, LlmError>> = chunks.into_iter().map(|c| Ok(c.into())).collect();
    Box::pin(stream::iter(chunks))
}
