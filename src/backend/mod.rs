//! Backend HTTP client.
//!
//! One method per backend endpoint; each issues exactly one request and
//! returns a typed result or a [`BackendError`]. No retries happen here:
//! callers decide what a failure means for the user. All wire types live in
//! [`types`].

pub mod types;

use std::time::Duration;

use hyper::ext::ReasonPhrase;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::config::{AskLlmEncoding, BackendConfig};
use types::{AskLlmRequest, AskLlmResponse, Friend, PendingMessagesResponse, StartResponse, UserMessageRequest};

/// Detail used whenever a successful response is missing required fields.
pub const UNEXPECTED_FORMAT: &str = "Unexpected response format";

// ── Error ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum BackendError {
    /// Non-2xx response.
    #[error("backend returned HTTP {status}: {status_text}")]
    Http { status: u16, status_text: String },
    /// DNS, timeout, connection refused, …
    #[error("backend unreachable: {cause}")]
    Network { cause: String },
    /// 2xx response whose body lacks a required field or is not valid JSON.
    #[error("malformed backend payload: {detail}")]
    MalformedPayload { detail: String },
    /// The backend answered but reported an error in the payload itself.
    #[error("backend reported error: {detail}")]
    Remote { detail: String },
}

impl BackendError {
    /// The user-facing part of the error, rendered by handlers as
    /// `"Error: {detail}"`.
    pub fn detail(&self) -> &str {
        match self {
            BackendError::Http { status_text, .. } => status_text,
            BackendError::Network { cause } => cause,
            BackendError::MalformedPayload { detail } | BackendError::Remote { detail } => detail,
        }
    }

    /// Chat text for this error.
    pub fn to_chat_text(&self) -> String {
        format!("Error: {}", self.detail())
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(e: reqwest::Error) -> Self {
        BackendError::Network { cause: e.to_string() }
    }
}

// ── Client ────────────────────────────────────────────────────────────────────

/// Typed client for the backend REST service.
///
/// Cheap to clone: `reqwest::Client` is an `Arc` internally.
#[derive(Debug, Clone)]
pub struct BackendClient {
    client: Client,
    base_url: String,
    ask_llm_encoding: AskLlmEncoding,
}

impl BackendClient {
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| BackendError::Network {
                cause: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            ask_llm_encoding: config.ask_llm_encoding,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// `POST /start`.
    pub async fn start(&self) -> Result<StartResponse, BackendError> {
        let url = self.url("/start");
        debug!(%url, "backend start");
        let response = self.client.post(&url).send().await.map_err(|e| network(&url, e))?;
        let response = check_status(&url, response)?;
        parse_json(&url, response).await
    }

    /// `POST /ask-llm`: returns the answer text.
    ///
    /// An `error` field in the payload becomes [`BackendError::Remote`]; a
    /// payload with neither `answer` nor `error` is malformed.
    pub async fn ask_llm(&self, question: &str) -> Result<String, BackendError> {
        let url = self.url("/ask-llm");
        let body = AskLlmRequest { question };
        debug!(%url, encoding = ?self.ask_llm_encoding, question_len = question.len(), "backend ask-llm");

        let request = match self.ask_llm_encoding {
            AskLlmEncoding::Json => self.client.post(&url).json(&body),
            AskLlmEncoding::Form => self.client.post(&url).form(&body),
        };
        let response = request.send().await.map_err(|e| network(&url, e))?;
        let response = check_status(&url, response)?;
        let data: AskLlmResponse = parse_json(&url, response).await?;

        match (data.answer, data.error) {
            (Some(answer), _) if !answer.is_empty() => {
                debug!(answer_len = answer.len(), "ask-llm answered");
                Ok(answer)
            }
            (_, Some(detail)) => {
                warn!(%detail, "ask-llm returned an error payload");
                Err(BackendError::Remote { detail })
            }
            _ => {
                error!("ask-llm response had neither answer nor error");
                Err(BackendError::MalformedPayload { detail: UNEXPECTED_FORMAT.to_string() })
            }
        }
    }

    /// `GET /random-friend`.
    pub async fn random_friend(&self) -> Result<Friend, BackendError> {
        let url = self.url("/random-friend");
        debug!(%url, "backend random-friend");
        let response = self.client.get(&url).send().await.map_err(|e| network(&url, e))?;
        let response = check_status(&url, response)?;
        let raw: types::RawFriend = parse_json(&url, response).await?;
        raw.into_friend().ok_or_else(|| {
            error!(%url, "random-friend response missing name or ens_address");
            BackendError::MalformedPayload { detail: UNEXPECTED_FORMAT.to_string() }
        })
    }

    /// `POST /user-message`: the response body is ignored.
    pub async fn post_user_message(&self, message: &str) -> Result<(), BackendError> {
        let url = self.url("/user-message");
        debug!(%url, message_len = message.len(), "backend user-message");
        let response = self
            .client
            .post(&url)
            .json(&UserMessageRequest { message })
            .send()
            .await
            .map_err(|e| network(&url, e))?;
        check_status(&url, response)?;
        Ok(())
    }

    /// `GET /get-pending-messages`. A missing `messages` field is empty.
    pub async fn get_pending_messages(&self) -> Result<Vec<String>, BackendError> {
        let url = self.url("/get-pending-messages");
        let response = self.client.get(&url).send().await.map_err(|e| network(&url, e))?;
        let response = check_status(&url, response)?;
        let data: PendingMessagesResponse = parse_json(&url, response).await?;
        Ok(data.messages)
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn network(url: &str, e: reqwest::Error) -> BackendError {
    error!(%url, error = %e, timeout = e.is_timeout(), "backend request failed (transport)");
    BackendError::from(e)
}

/// Return the response if it is 2xx, otherwise an [`BackendError::Http`]
/// carrying the canonical status text (e.g. `"Not Found"`).
fn check_status(url: &str, response: Response) -> Result<Response, BackendError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    // Prefer the phrase the server actually sent; hyper only records it when
    // it differs from the canonical one.
    let status_text = response
        .extensions()
        .get::<ReasonPhrase>()
        .and_then(|r| std::str::from_utf8(r.as_bytes()).ok())
        .or_else(|| status.canonical_reason())
        .map(str::to_string)
        .unwrap_or_else(|| status.as_str().to_string());
    error!(%url, %status, "backend returned HTTP error");
    Err(BackendError::Http { status: status.as_u16(), status_text })
}

async fn parse_json<T: DeserializeOwned>(url: &str, response: Response) -> Result<T, BackendError> {
    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|e| {
        error!(%url, error = %e, "failed to deserialize backend response");
        BackendError::MalformedPayload { detail: UNEXPECTED_FORMAT.to_string() }
    })
}
