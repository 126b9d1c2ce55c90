//! Model listing with a static fallback.
//!
//! A live listing from the upstream is preferred. When the upstream cannot be reached,
//! rejects the call, or returns something that isn't JSON, the configured fallback
//! catalog is served instead so clients always get a usable model list. A missing
//! credential is still rejected by the caller before any of this runs.

use crate::config::RelayConfig;
use crate::error::{RelayError, Result};
use crate::logging::SharedJournal;
use crate::relay::request::{upstream_headers, Credential};
use crate::relay::response::{decode_success, status_error};
use crate::relay::types::{ModelCatalog, ModelEntry};

/// Result of a model listing.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelListing {
    Live(serde_json::Value),
    Fallback(ModelCatalog),
}

/// Build the static catalog from configuration.
#[must_use]
pub fn fallback_catalog(config: &RelayConfig) -> ModelCatalog {
    let fallback = &config.fallback;
    let owned_by = config.fallback_owner();
    ModelCatalog {
        object: "list".to_string(),
        data: fallback
            .models
            .iter()
            .map(|id| ModelEntry {
                id: id.clone(),
                object: "model".to_string(),
                created: fallback.created,
                owned_by: owned_by.clone(),
            })
            .collect(),
    }
}

/// Fetch the live model list from the upstream `/models` endpoint.
///
/// # Errors
/// Returns the same error classes as a blocking chat call.
pub async fn fetch_models(
    credential: &Credential,
    config: &RelayConfig,
    client: &reqwest::Client,
) -> Result<serde_json::Value> {
    let url = config.models_url()?;
    let headers = upstream_headers(credential, &config.provider.user_agent, false)?;

    let response = client
        .get(&url)
        .headers(headers)
        .timeout(config.timeouts.models())
        .send()
        .await
        .map_err(|e| RelayError::transport(e.to_string()))?;

    let status = response.status();
    let body = response
        .bytes()
        .await
        .map_err(|e| RelayError::transport(e.to_string()))?;

    if !status.is_success() {
        return Err(status_error(
            status.as_u16(),
            &String::from_utf8_lossy(&body),
        ));
    }

    decode_success(&body)
}

/// List models, falling back to the static catalog on any upstream failure.
pub async fn list_models(
    credential: &Credential,
    config: &RelayConfig,
    client: &reqwest::Client,
    journal: &SharedJournal,
) -> ModelListing {
    match fetch_models(credential, config, client).await {
        Ok(models) => ModelListing::Live(models),
        Err(e) => {
            journal.warn(
                "models",
                format!("Failed to fetch models: {}, serving fallback catalog", e),
            );
            ModelListing::Fallback(fallback_catalog(config))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_fallback_catalog() {
        let catalog = fallback_catalog(&RelayConfig::default());
        assert_eq!(catalog.object, "list");
        assert_eq!(catalog.data.len(), 7);
        assert_eq!(catalog.data[0].id, "grok-3-beta");
        assert_eq!(catalog.data[6].id, "grok-4-fast-reasoning");
        for entry in &catalog.data {
            assert_eq!(entry.object, "model");
            assert_eq!(entry.created, 1_744_681_729);
            assert_eq!(entry.owned_by, "xAI");
        }
    }

    #[test]
    fn test_custom_fallback_catalog() {
        let mut config = RelayConfig::default();
        config.fallback.models = vec!["gpt-4o".to_string()];
        config.fallback.created = 0;
        config.fallback.owned_by = Some("my-team".to_string());

        let catalog = fallback_catalog(&config);
        assert_eq!(catalog.data.len(), 1);
        assert_eq!(catalog.data[0].owned_by, "my-team");
        assert_eq!(catalog.data[0].created, 0);
    }

    #[test]
    fn test_fallback_owner_comes_from_provider_preset() {
        let mut config = RelayConfig::default();
        config.provider.name = "openai".to_string();

        let catalog = fallback_catalog(&config);
        assert!(catalog.data.iter().all(|m| m.owned_by == "openai"));
    }
}
