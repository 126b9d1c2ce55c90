//! Narrow inbound chat requests to the fields the upstream accepts, and build the
//! upstream request headers.

use axum::http::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use axum::http::{HeaderMap, HeaderValue};
use std::fmt;

use super::types::{ChatRequest, ForwardPayload};
use crate::error::{RelayError, Result};

pub const EVENT_STREAM: &str = "text/event-stream";
pub const APPLICATION_JSON: &str = "application/json";

/// Top-level fields accepted on a [`ChatRequest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Messages,
    Model,
    MaxTokens,
    Temperature,
    TopP,
    Stream,
    PresencePenalty,
    FrequencyPenalty,
}

impl Field {
    pub const ALL: [Field; 8] = [
        Field::Messages,
        Field::Model,
        Field::MaxTokens,
        Field::Temperature,
        Field::TopP,
        Field::Stream,
        Field::PresencePenalty,
        Field::FrequencyPenalty,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Field::Messages => "messages",
            Field::Model => "model",
            Field::MaxTokens => "max_tokens",
            Field::Temperature => "temperature",
            Field::TopP => "top_p",
            Field::Stream => "stream",
            Field::PresencePenalty => "presence_penalty",
            Field::FrequencyPenalty => "frequency_penalty",
        }
    }

    /// Whether the field is sent upstream. The penalties are accepted from clients but
    /// never forwarded.
    pub const fn is_forwarded(self) -> bool {
        match self {
            Field::Messages
            | Field::Model
            | Field::MaxTokens
            | Field::Temperature
            | Field::TopP
            | Field::Stream => true,
            Field::PresencePenalty | Field::FrequencyPenalty => false,
        }
    }
}

fn keep<T: Clone>(field: Field, value: &Option<T>) -> Option<T> {
    if field.is_forwarded() {
        value.clone()
    } else {
        None
    }
}

/// Apply the forwarding allow-list. Fields absent from the request stay absent.
pub fn narrow(req: &ChatRequest) -> ForwardPayload {
    ForwardPayload {
        messages: req.messages.clone(),
        model: req.model.clone(),
        max_tokens: keep(Field::MaxTokens, &req.max_tokens),
        temperature: keep(Field::Temperature, &req.temperature),
        top_p: keep(Field::TopP, &req.top_p),
        stream: keep(Field::Stream, &req.stream),
    }
}

impl From<ForwardPayload> for ChatRequest {
    fn from(payload: ForwardPayload) -> Self {
        Self {
            messages: payload.messages,
            model: payload.model,
            max_tokens: payload.max_tokens,
            temperature: payload.temperature,
            top_p: payload.top_p,
            stream: payload.stream,
            presence_penalty: None,
            frequency_penalty: None,
        }
    }
}

/// A caller-supplied upstream key, held only as a ready-made sensitive
/// `Authorization` value.
#[derive(Clone)]
pub struct Credential {
    bearer: HeaderValue,
}

impl Credential {
    /// Read the credential from `header`. Absent, empty, or non-text values are all
    /// treated as missing.
    pub fn from_headers(headers: &HeaderMap, header: &str) -> Result<Self> {
        let key = headers
            .get(header)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        if key.is_empty() {
            return Err(RelayError::missing_credential(header));
        }

        let mut bearer = HeaderValue::from_str(&format!("Bearer {}", key))
            .map_err(|_| RelayError::missing_credential(header))?;
        bearer.set_sensitive(true);
        Ok(Self { bearer })
    }

    pub fn authorization(&self) -> HeaderValue {
        self.bearer.clone()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential([redacted])")
    }
}

pub fn accept_for(streaming: bool) -> &'static str {
    if streaming {
        EVENT_STREAM
    } else {
        APPLICATION_JSON
    }
}

/// Headers for an upstream call: bearer auth, JSON content type, the configured client
/// identifier, and an `Accept` value matching the streaming mode.
pub fn upstream_headers(
    credential: &Credential,
    user_agent: &str,
    streaming: bool,
) -> Result<HeaderMap> {
    let user_agent = HeaderValue::from_str(user_agent)
        .map_err(|e| RelayError::config(format!("Invalid user_agent: {}", e)))?;

    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, credential.authorization());
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(APPLICATION_JSON));
    headers.insert(USER_AGENT, user_agent);
    headers.insert(ACCEPT, HeaderValue::from_static(accept_for(streaming)));
    Ok(headers)
}
