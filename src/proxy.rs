use crate::config::RelayConfig;
use crate::error::{RelayError, Result};
use crate::logging::SharedJournal;
use crate::relay::request::{narrow, upstream_headers, Credential};
use crate::relay::response::{decode_success, status_error};
use crate::relay::streaming::relay_stream;
use crate::relay::types::ChatRequest;

use bytes::Bytes;
use futures::stream::Stream;
use std::convert::Infallible;

/// Send a chat completion request upstream.
///
/// Returns the open upstream response on a success status. Streaming requests get the
/// response before any of the body is read. A failure status is turned into
/// [`RelayError::UpstreamHttp`]; no response at all into
/// [`RelayError::UpstreamTransport`].
pub async fn forward_chat(
    req: &ChatRequest,
    credential: &Credential,
    config: &RelayConfig,
    client: &reqwest::Client,
    journal: &SharedJournal,
) -> Result<reqwest::Response> {
    let url = config.chat_completions_url()?;
    let streaming = req.is_streaming();
    let payload = narrow(req);
    let headers = upstream_headers(credential, &config.provider.user_agent, streaming)?;

    journal.info(
        "proxy",
        format!(
            "POST {} model={} streaming={} messages={}",
            url,
            payload.model,
            streaming,
            payload.messages.len()
        ),
    );

    let response = client
        .post(&url)
        .headers(headers)
        .json(&payload)
        .timeout(config.timeouts.chat())
        .send()
        .await
        .map_err(|e| RelayError::transport(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        let error = match response.text().await {
            Ok(body) => status_error(status.as_u16(), &body),
            Err(e) => RelayError::upstream_http(status.as_u16(), e.to_string()),
        };
        journal.warn("proxy", format!("Upstream rejected request: {}", error));
        return Err(error);
    }

    Ok(response)
}

/// Read a buffered upstream response and pass its JSON through verbatim.
pub async fn relay_blocking(
    response: reqwest::Response,
    journal: &SharedJournal,
) -> Result<serde_json::Value> {
    let body = response
        .bytes()
        .await
        .map_err(|e| RelayError::transport(e.to_string()))?;

    decode_success(&body).map_err(|e| {
        journal.error(
            "proxy",
            format!(
                "Invalid JSON from upstream: {}",
                String::from_utf8_lossy(&body[..body.len().min(300)])
            ),
        );
        e
    })
}

/// Reframe a streaming upstream response for the client.
pub fn relay_streaming(
    response: reqwest::Response,
    journal: &SharedJournal,
) -> impl Stream<Item = std::result::Result<Bytes, Infallible>> + Send + 'static {
    relay_stream(response.bytes_stream(), journal.clone())
}
