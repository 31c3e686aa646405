//! Mock vendor backend for integration tests
//!
//! Serves the `OpenAI` chat-completions and Anthropic Messages endpoints with
//! scripted answers, streamed or whole, and records every request body

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Body;
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router, routing};
use bytes::Bytes;
use futures_util::{StreamExt, stream};
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;
use url::Url;

/// How the mock answers every request
#[derive(Debug, Clone)]
pub enum Reply {
    /// Answer with reasoning fragments followed by text fragments
    Answer {
        reasoning: Vec<&'static str>,
        text: Vec<&'static str>,
    },
    /// Reject requests that carry reasoning parameters, answer the rest
    RejectReasoning,
    /// Reject every request with 401
    Unauthorized,
    /// Stream one text fragment, then never finish
    Stall,
    /// Hold the response back for the given time before answering
    Slow(Duration),
    /// Stream `frames` numbered fragments, one every `interval`, then finish
    Trickle { frames: usize, interval: Duration },
}

impl Reply {
    /// Plain text answer split into fragments
    pub fn text(fragments: &[&'static str]) -> Self {
        Self::Answer {
            reasoning: Vec::new(),
            text: fragments.to_vec(),
        }
    }
}

pub const STALL_FRAGMENT: &str = "partial";
pub const PLAIN_ANSWER: &str = "answer without reasoning";
pub const REJECTION: &str = "Unrecognized request argument supplied: reasoning_effort";

/// Mock vendor listening on an ephemeral local port
pub struct MockVendor {
    addr: SocketAddr,
    shutdown: CancellationToken,
    state: Arc<VendorState>,
}

struct VendorState {
    reply: Reply,
    requests: Mutex<Vec<Value>>,
}

impl MockVendor {
    /// Start the mock server, returning once it is listening
    pub async fn start(reply: Reply) -> anyhow::Result<Self> {
        let state = Arc::new(VendorState {
            reply,
            requests: Mutex::new(Vec::new()),
        });

        let app = Router::new()
            .route("/v1/chat/completions", routing::post(chat_completions))
            .route("/v1/messages", routing::post(messages))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let shutdown = CancellationToken::new();
        let shutdown_clone = shutdown.clone();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    shutdown_clone.cancelled().await;
                })
                .await
                .ok();
        });

        Ok(Self { addr, shutdown, state })
    }

    /// Base URL to configure a target with
    pub fn base_url(&self) -> Url {
        format!("http://{}/v1", self.addr).parse().expect("valid URL")
    }

    /// Request bodies received so far
    pub fn requests(&self) -> Vec<Value> {
        self.state.requests.lock().unwrap().clone()
    }
}

impl Drop for MockVendor {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

impl VendorState {
    fn record(&self, body: &Value) {
        self.requests.lock().unwrap().push(body.clone());
    }
}

fn error(status: StatusCode, error_type: &str, message: &str) -> Response {
    let body = json!({ "type": "error", "error": { "type": error_type, "message": message } });
    (status, Json(body)).into_response()
}

fn event_stream(frames: Vec<String>) -> Response {
    let body = frames.concat();
    ([(header::CONTENT_TYPE, "text/event-stream")], body).into_response()
}

fn stalled_stream(frame: String) -> Response {
    let chunks = stream::iter([Ok::<_, Infallible>(Bytes::from(frame))]).chain(stream::pending());
    ([(header::CONTENT_TYPE, "text/event-stream")], Body::from_stream(chunks)).into_response()
}

// -- OpenAI chat completions --

fn openai_frame(chunk: &Value) -> String {
    format!("data: {chunk}\n\n")
}

fn openai_text_chunk(text: &str) -> Value {
    json!({ "choices": [{ "index": 0, "delta": { "content": text } }] })
}

fn openai_answer(reasoning: &[&str], text: &[&str], stream: bool) -> Response {
    if !stream {
        let reasoning = (!reasoning.is_empty()).then(|| reasoning.concat());
        let body = json!({
            "id": "chatcmpl-mock",
            "object": "chat.completion",
            "choices": [{
                "index": 0,
                "message": { "role": "assistant", "content": text.concat(), "reasoning_content": reasoning },
                "finish_reason": "stop"
            }]
        });
        return Json(body).into_response();
    }

    let mut frames = Vec::new();
    for fragment in reasoning {
        frames.push(openai_frame(&json!({ "choices": [{ "index": 0, "delta": { "reasoning_content": fragment } }] })));
    }
    for fragment in text {
        frames.push(openai_frame(&openai_text_chunk(fragment)));
    }
    frames.push(openai_frame(&json!({ "choices": [{ "index": 0, "delta": {}, "finish_reason": "stop" }] })));
    frames.push("data: [DONE]\n\n".to_owned());
    event_stream(frames)
}

async fn chat_completions(State(state): State<Arc<VendorState>>, Json(body): Json<Value>) -> Response {
    state.record(&body);
    let stream = body["stream"].as_bool().unwrap_or(false);

    match &state.reply {
        Reply::Answer { reasoning, text } => openai_answer(reasoning, text, stream),
        Reply::RejectReasoning if body.get("reasoning_effort").is_some() => {
            error(StatusCode::BAD_REQUEST, "invalid_request_error", REJECTION)
        }
        Reply::RejectReasoning => openai_answer(&[], &[PLAIN_ANSWER], stream),
        Reply::Unauthorized => error(StatusCode::UNAUTHORIZED, "invalid_api_key", "Incorrect API key provided"),
        Reply::Stall => stalled_stream(openai_frame(&openai_text_chunk(STALL_FRAGMENT))),
        Reply::Slow(delay) => {
            tokio::time::sleep(*delay).await;
            openai_answer(&[], &["late"], stream)
        }
        Reply::Trickle { frames, interval } => trickle_stream(*frames, *interval),
    }
}

fn trickle_stream(frames: usize, interval: Duration) -> Response {
    let fragments = stream::iter(0..frames).then(move |i| async move {
        tokio::time::sleep(interval).await;
        Ok::<_, Infallible>(Bytes::from(openai_frame(&openai_text_chunk(&format!("{i} ")))))
    });
    let finish = stream::once(async {
        let stop = openai_frame(&json!({ "choices": [{ "index": 0, "delta": {}, "finish_reason": "stop" }] }));
        Ok::<_, Infallible>(Bytes::from(format!("{stop}data: [DONE]\n\n")))
    });
    (
        [(header::CONTENT_TYPE, "text/event-stream")],
        Body::from_stream(fragments.chain(finish)),
    )
        .into_response()
}

// -- Anthropic messages --

fn anthropic_frame(event: &Value) -> String {
    format!("event: {}\ndata: {event}\n\n", event["type"].as_str().unwrap_or("message"))
}

fn anthropic_answer(reasoning: &[&str], text: &[&str], stream: bool) -> Response {
    if !stream {
        let mut content = Vec::new();
        if !reasoning.is_empty() {
            content.push(json!({ "type": "thinking", "thinking": reasoning.concat(), "signature": "sig" }));
        }
        content.push(json!({ "type": "text", "text": text.concat() }));
        let body = json!({
            "id": "msg_mock",
            "type": "message",
            "role": "assistant",
            "content": content,
            "stop_reason": "end_turn"
        });
        return Json(body).into_response();
    }

    let mut frames = vec![anthropic_frame(&json!({
        "type": "message_start",
        "message": { "id": "msg_mock", "type": "message", "role": "assistant", "content": [] }
    }))];
    frames.push(": keepalive\n\n".to_owned());

    let mut index = 0;
    if !reasoning.is_empty() {
        frames.push(anthropic_frame(&json!({
            "type": "content_block_start", "index": index, "content_block": { "type": "thinking", "thinking": "" }
        })));
        for fragment in reasoning {
            frames.push(anthropic_frame(&json!({
                "type": "content_block_delta", "index": index, "delta": { "type": "thinking_delta", "thinking": fragment }
            })));
        }
        frames.push(anthropic_frame(&json!({ "type": "content_block_stop", "index": index })));
        index += 1;
    }

    frames.push(anthropic_frame(&json!({
        "type": "content_block_start", "index": index, "content_block": { "type": "text", "text": "" }
    })));
    for fragment in text {
        frames.push(anthropic_frame(&json!({
            "type": "content_block_delta", "index": index, "delta": { "type": "text_delta", "text": fragment }
        })));
    }
    frames.push(anthropic_frame(&json!({ "type": "content_block_stop", "index": index })));
    frames.push(anthropic_frame(&json!({ "type": "message_delta", "delta": { "stop_reason": "end_turn" } })));
    frames.push(anthropic_frame(&json!({ "type": "message_stop" })));
    event_stream(frames)
}

async fn messages(State(state): State<Arc<VendorState>>, Json(body): Json<Value>) -> Response {
    state.record(&body);
    let stream = body["stream"].as_bool().unwrap_or(false);

    match &state.reply {
        Reply::Answer { reasoning, text } => anthropic_answer(reasoning, text, stream),
        Reply::RejectReasoning if body.get("thinking").is_some() => error(
            StatusCode::BAD_REQUEST,
            "invalid_request_error",
            "thinking: Extra inputs are not permitted",
        ),
        Reply::RejectReasoning => anthropic_answer(&[], &[PLAIN_ANSWER], stream),
        Reply::Unauthorized => error(StatusCode::UNAUTHORIZED, "authentication_error", "invalid x-api-key"),
        Reply::Stall => stalled_stream(anthropic_frame(&json!({
            "type": "content_block_delta", "index": 0, "delta": { "type": "text_delta", "text": STALL_FRAGMENT }
        }))),
        Reply::Slow(delay) => {
            tokio::time::sleep(*delay).await;
            anthropic_answer(&[], &["late"], stream)
        }
        Reply::Trickle { .. } => anthropic_answer(&[], &["trickle"], stream),
    }
}
