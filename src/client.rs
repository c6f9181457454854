use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::debounce::Debouncer;
use crate::error::{ChatError, Result};
use crate::state::{Source, WireMessage};

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Extensions offered by the upload prompt. The service decides what it
/// actually accepts.
pub const SUGGESTED_EXTENSIONS: [&str; 4] = ["pdf", "doc", "docx", "txt"];

#[derive(Serialize)]
struct ChatRequest<'a> {
    messages: &'a [WireMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Deserialize)]
struct ChatReply {
    response: String,
    #[serde(default)]
    sources: Option<Vec<Source>>,
}

#[derive(Deserialize)]
struct HealthReply {
    status: String,
}

#[derive(Deserialize)]
struct ErrorReply {
    detail: serde_json::Value,
}

/// An answer from the service.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResponse {
    pub answer: String,
    pub sources: Vec<Source>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UploadResponse {
    #[serde(default)]
    pub message: String,
    pub document_count: u64,
}

/// A file staged for upload.
#[derive(Debug, Clone)]
pub struct Document {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl Document {
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            bytes,
        }
    }

    pub async fn read(path: &Path) -> Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        Ok(Self { filename, bytes })
    }

    fn extension(&self) -> Option<String> {
        Path::new(&self.filename)
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
    }

    /// Whether the file carries one of [`SUGGESTED_EXTENSIONS`].
    pub fn has_suggested_extension(&self) -> bool {
        self.extension()
            .is_some_and(|ext| SUGGESTED_EXTENSIONS.contains(&ext.as_str()))
    }

    fn mime_type(&self) -> &'static str {
        match self.extension().as_deref() {
            Some("pdf") => "application/pdf",
            Some("txt") => "text/plain",
            Some("doc") => "application/msword",
            Some("docx") => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
            _ => "application/octet-stream",
        }
    }
}

/// Optional generation parameters forwarded with every chat request.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ChatOptions {
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

/// HTTP client for the answering service.
#[derive(Clone)]
pub struct ChatClient {
    client: Client,
    base_url: String,
    options: ChatOptions,
}

impl ChatClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            options: ChatOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ChatOptions) -> Self {
        self.options = options;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Post a transcript to `/chat` and return the body untouched.
    pub async fn send_messages(&self, messages: &[WireMessage]) -> Result<serde_json::Value> {
        let url = format!("{}/chat", self.base_url);
        let request = ChatRequest {
            messages,
            temperature: self.options.temperature,
            max_tokens: self.options.max_tokens,
        };

        tracing::debug!(%url, turns = messages.len(), "sending chat request");
        let response = self.client.post(&url).json(&request).send().await?;
        let response = check_status(response).await?;
        Ok(response.json().await?)
    }

    /// Post a transcript and decode the answer.
    pub async fn chat(&self, messages: &[WireMessage]) -> Result<QueryResponse> {
        let body = self.send_messages(messages).await?;
        let reply: ChatReply = serde_json::from_value(body)?;
        Ok(QueryResponse {
            answer: reply.response,
            sources: reply.sources.unwrap_or_default(),
        })
    }

    /// Ask a single question with no prior turns.
    pub async fn submit_query(&self, text: &str) -> Result<QueryResponse> {
        if text.trim().is_empty() {
            return Err(ChatError::Precondition("query text is empty".to_string()));
        }
        self.chat(&[WireMessage::user(text)]).await
    }

    pub async fn upload_document(&self, document: Document) -> Result<UploadResponse> {
        let url = format!("{}/upload", self.base_url);
        let mime = document.mime_type();
        let size = document.bytes.len();
        let part = Part::bytes(document.bytes)
            .file_name(document.filename.clone())
            .mime_str(mime)?;
        let form = Form::new().part("file", part);

        tracing::debug!(%url, filename = %document.filename, size, "uploading document");
        let response = self.client.post(&url).multipart(form).send().await?;
        let response = check_status(response).await?;
        Ok(response.json().await?)
    }

    /// Probe `/health`. Reachable-but-unhealthy is `Ok(false)`.
    pub async fn health(&self) -> Result<bool> {
        let url = format!("{}/health", self.base_url);
        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Ok(false);
        }
        let reply: HealthReply = response.json().await?;
        Ok(reply.status == "healthy")
    }
}

async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = match serde_json::from_str::<ErrorReply>(&body) {
        Ok(ErrorReply {
            detail: serde_json::Value::String(detail),
        }) => detail,
        Ok(ErrorReply { detail }) => detail.to_string(),
        Err(_) if body.is_empty() => status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string(),
        Err(_) => body,
    };
    Err(ChatError::remote_status(status, message))
}

/// Single entry point for chat submissions, optionally debounced.
#[derive(Clone)]
pub struct ChatDispatcher {
    client: ChatClient,
    debouncer: Option<Arc<Debouncer<Vec<WireMessage>, QueryResponse>>>,
}

impl ChatDispatcher {
    pub fn new(client: ChatClient, debounce: Option<Duration>) -> Self {
        let debouncer = debounce.map(|delay| {
            let client = client.clone();
            Arc::new(Debouncer::new(delay, move |messages: Vec<WireMessage>| {
                let client = client.clone();
                async move { client.chat(&messages).await }
            }))
        });
        Self { client, debouncer }
    }

    pub fn client(&self) -> &ChatClient {
        &self.client
    }

    /// Send `messages`. With debounce on, bursts of calls collapse into the
    /// last one and every caller receives its answer.
    pub fn dispatch(&self, messages: Vec<WireMessage>) -> BoxFuture<'static, Result<QueryResponse>> {
        match &self.debouncer {
            Some(debouncer) => debouncer.call(messages).boxed(),
            None => {
                let client = self.client.clone();
                async move { client.chat(&messages).await }.boxed()
            }
        }
    }
}
