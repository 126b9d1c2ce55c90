//! Built-in provider presets for OpenAI-compatible chat completion APIs.
//!
//! A preset fixes the upstream base URL (including the versioned path prefix) and the
//! name of the inbound header that carries the caller's credential for that provider.

#[derive(Debug, Clone)]
pub struct ProviderPreset {
    pub name: &'static str,
    pub base_url: &'static str,
    pub credential_header: &'static str,
    pub owned_by: &'static str,
}

pub const DEFAULT_PROVIDER: &str = "grok";

const PRESETS: &[ProviderPreset] = &[
    ProviderPreset {
        name: "grok",
        base_url: "https://api.x.ai/v1",
        credential_header: "X-XAI-API-Key",
        owned_by: "xAI",
    },
    ProviderPreset {
        name: "openai",
        base_url: "https://api.openai.com/v1",
        credential_header: "X-OpenAI-API-Key",
        owned_by: "openai",
    },
    ProviderPreset {
        name: "openrouter",
        base_url: "https://openrouter.ai/api/v1",
        credential_header: "X-OpenRouter-API-Key",
        owned_by: "openrouter",
    },
    ProviderPreset {
        name: "groq",
        base_url: "https://api.groq.com/openai/v1",
        credential_header: "X-Groq-API-Key",
        owned_by: "groq",
    },
    ProviderPreset {
        name: "deepseek",
        base_url: "https://api.deepseek.com/v1",
        credential_header: "X-DeepSeek-API-Key",
        owned_by: "deepseek",
    },
    ProviderPreset {
        name: "together",
        base_url: "https://api.together.xyz/v1",
        credential_header: "X-Together-API-Key",
        owned_by: "together",
    },
    ProviderPreset {
        name: "fireworks",
        base_url: "https://api.fireworks.ai/inference/v1",
        credential_header: "X-Fireworks-API-Key",
        owned_by: "fireworks",
    },
    ProviderPreset {
        name: "mistral",
        base_url: "https://api.mistral.ai/v1",
        credential_header: "X-Mistral-API-Key",
        owned_by: "mistralai",
    },
];

impl ProviderPreset {
    #[must_use]
    pub fn from_name(name: &str) -> Option<&'static ProviderPreset> {
        let name = name.to_lowercase();
        PRESETS.iter().find(|p| p.name == name)
    }

    #[must_use]
    pub fn all() -> &'static [ProviderPreset] {
        PRESETS
    }
}
