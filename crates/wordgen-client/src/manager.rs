//! The single-channel connection manager.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::header::ACCEPT;
use reqwest::StatusCode;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::sse::SseParser;
use crate::{ClientConfig, ClientError, ReconnectContext};
use wordgen_address::normalize_word;
use wordgen_protocol::{decode_frame, InboundEvent, SubmitAck, WordRequest};

const SUBMIT_PATH: &str = "/api/words/generate";
const EVENTS_PATH: &str = "/api/words/events";
const EVENT_CAPACITY: usize = 64;
const SUBMIT_TIMEOUT: Duration = Duration::from_secs(10);
/// Grace period between forwarding a `connection_close` frame and tearing
/// the channel down, so final-event consumers run first.
const CLOSE_GRACE: Duration = Duration::from_millis(150);

pub struct ConnectionManager {
    config: ClientConfig,
    http: reqwest::Client,
    connected: Arc<AtomicBool>,
    events_tx: broadcast::Sender<InboundEvent>,
    reader: Mutex<Option<JoinHandle<()>>>,
}

impl ConnectionManager {
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| ClientError::Http(e.to_string()))?;
        let (events_tx, _) = broadcast::channel(EVENT_CAPACITY);
        Ok(Self {
            config,
            http,
            connected: Arc::new(AtomicBool::new(false)),
            events_tx,
            reader: Mutex::new(None),
        })
    }

    /// Subscribe to decoded channel events. Unknown tags are forwarded too.
    pub fn subscribe(&self) -> broadcast::Receiver<InboundEvent> {
        self.events_tx.subscribe()
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Validate and post a new word request, then open its channel.
    pub async fn submit(&self, request: &WordRequest) -> Result<SubmitAck, ClientError> {
        if request.source_word.trim().is_empty() {
            return Err(ClientError::MissingField("source_word"));
        }
        if request.target_language.trim().is_empty() {
            return Err(ClientError::MissingField("target_language"));
        }
        let normalized = normalize_word(&request.source_word);

        let mut body = serde_json::json!({
            "source_word": request.source_word,
            "target_language": request.target_language,
        });
        if let Some(src) = request.source_language.as_deref() {
            body["source_language"] = serde_json::json!(src);
        }
        if let Some(user_id) = self.config.user_id.as_deref() {
            body["user_id"] = serde_json::json!(user_id);
        }

        let url = format!("{}{}", self.config.base_url, SUBMIT_PATH);
        let resp = self
            .http
            .post(&url)
            .timeout(SUBMIT_TIMEOUT)
            .json(&body)
            .send()
            .await
            .map_err(|e| ClientError::Submission(e.to_string()))?;
        let status = resp.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(ClientError::RateLimited);
        }
        if !status.is_success() {
            let detail = resp.text().await.unwrap_or_default();
            return Err(ClientError::Submission(format!("{}: {}", status, detail)));
        }
        let ack: SubmitAck = resp
            .json()
            .await
            .map_err(|e| ClientError::Submission(e.to_string()))?;

        self.open_channel(&normalized, &request.target_language);
        Ok(ack)
    }

    /// Re-open the channel of an already-submitted, still-pending request
    /// without resubmitting.
    pub fn reconnect(&self, ctx: &ReconnectContext) {
        self.open_channel(&normalize_word(&ctx.source_word), &ctx.target_language);
    }

    /// Tear down the live channel, if any.
    pub fn close(&self) {
        let mut guard = self.reader.lock().expect("reader handle poisoned");
        if let Some(handle) = guard.take() {
            handle.abort();
        }
        self.connected.store(false, Ordering::SeqCst);
    }

    /// Exactly one channel may be live: any prior reader is aborted before
    /// the new one spawns.
    fn open_channel(&self, source_word: &str, target_language: &str) {
        let mut guard = self.reader.lock().expect("reader handle poisoned");
        if let Some(handle) = guard.take() {
            handle.abort();
            self.connected.store(false, Ordering::SeqCst);
        }
        let url = format!("{}{}", self.config.base_url, EVENTS_PATH);
        let query = [
            (
                "user_id",
                self.config
                    .user_id
                    .clone()
                    .unwrap_or_else(|| "anonymous".to_string()),
            ),
            ("source_word", source_word.to_string()),
            ("target_language", target_language.to_string()),
        ];
        let http = self.http.clone();
        let connected = self.connected.clone();
        let events_tx = self.events_tx.clone();
        *guard = Some(tokio::spawn(async move {
            run_channel(http, url, query, connected, events_tx).await;
        }));
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        self.close();
    }
}

async fn run_channel(
    http: reqwest::Client,
    url: String,
    query: [(&str, String); 3],
    connected: Arc<AtomicBool>,
    events_tx: broadcast::Sender<InboundEvent>,
) {
    let resp = match http
        .get(&url)
        .query(&query)
        .header(ACCEPT, "text/event-stream")
        .send()
        .await
    {
        Ok(resp) if resp.status().is_success() => resp,
        Ok(resp) => {
            tracing::warn!(status = %resp.status(), "channel rejected");
            return;
        }
        Err(err) => {
            tracing::warn!(%err, "channel connect failed");
            return;
        }
    };
    connected.store(true, Ordering::SeqCst);

    let mut stream = resp.bytes_stream();
    let mut parser = SseParser::new();
    'read: while let Some(chunk) = stream.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(err) => {
                tracing::warn!(%err, "channel transport error");
                break;
            }
        };
        for msg in parser.push(&chunk) {
            if msg.data.is_empty() {
                continue;
            }
            // A decode failure drops the frame, never the channel.
            let event = match decode_frame(&msg.data) {
                Ok(event) => event,
                Err(err) => {
                    tracing::warn!(%err, "dropping undecodable frame");
                    continue;
                }
            };
            let closing = matches!(event, InboundEvent::ConnectionClose { .. });
            let _ = events_tx.send(event);
            if closing {
                tokio::time::sleep(CLOSE_GRACE).await;
                break 'read;
            }
        }
    }
    connected.store(false, Ordering::SeqCst);
}
