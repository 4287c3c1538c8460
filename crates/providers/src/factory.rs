use webpilot_core::{Config, Error, Result};

use crate::{AnthropicProvider, GeminiProvider, OllamaProvider, OpenAiProvider, Provider};

/// Default api_base for OpenAI-compatible providers.
fn default_api_base(provider_name: &str) -> &'static str {
    match provider_name {
        "openai" => "https://api.openai.com/v1",
        "deepseek" => "https://api.deepseek.com/v1",
        "openrouter" => "https://openrouter.ai/api/v1",
        "groq" => "https://api.groq.com/openai/v1",
        _ => "https://api.openai.com/v1",
    }
}

/// Infer the provider name from a model-string prefix.
/// Returns None when the prefix is not recognized (caller falls back).
pub fn infer_provider_from_model(model: &str) -> Option<&'static str> {
    if model.starts_with("anthropic/") || model.starts_with("claude-") {
        Some("anthropic")
    } else if model.starts_with("gemini/") || model.starts_with("gemini-") {
        Some("gemini")
    } else if model.starts_with("ollama/") {
        Some("ollama")
    } else if model.starts_with("openai/")
        || model.starts_with("gpt-")
        || model.starts_with("o1")
        || model.starts_with("o3")
    {
        Some("openai")
    } else if model.starts_with("deepseek") {
        Some("deepseek")
    } else {
        None
    }
}

/// First configured provider with a usable API key, in preference order.
fn fallback_provider_name(config: &Config) -> Option<&str> {
    let priority = ["anthropic", "openai", "deepseek", "gemini", "ollama"];
    for name in priority {
        if let Some(p) = config.providers.get(name) {
            if !p.api_key.is_empty() && p.api_key != "dummy" {
                return Some(name);
            }
        }
    }
    // ollama needs no real api_key
    if config.providers.contains_key("ollama") {
        return Some("ollama");
    }
    None
}

/// Single entry point for provider construction.
///
/// Resolution order:
/// 1. `explicit_provider` (from Command.provider or config agent.provider)
/// 2. model-prefix inference ("claude-..." -> anthropic)
/// 3. first provider in config with an API key
///
/// An explicit provider with no config entry or no API key is an error
/// (ollama excepted).
pub fn create_provider(
    config: &Config,
    model: &str,
    explicit_provider: Option<&str>,
) -> Result<Box<dyn Provider>> {
    let max_tokens = config.agent.max_tokens;
    let temperature = config.agent.temperature;
    let proxy = config.network.proxy.as_deref();

    let effective_provider: &str = if let Some(ep) = explicit_provider {
        ep
    } else if let Some(inferred) = infer_provider_from_model(model) {
        inferred
    } else if let Some(fallback) = fallback_provider_name(config) {
        fallback
    } else {
        return Err(Error::Provider(
            "No reasoning provider configured. Set 'provider' in config, use a recognized \
             model prefix (e.g. 'claude-...', 'gpt-4o', 'gemini-...'), or add an API key to \
             the providers section."
                .to_string(),
        ));
    };

    let provider_cfg = config.providers.get(effective_provider);

    if effective_provider != "ollama" {
        match provider_cfg {
            None => {
                return Err(Error::Provider(format!(
                    "Provider '{}' is not present in the providers section",
                    effective_provider
                )));
            }
            Some(cfg) if cfg.api_key.is_empty() || cfg.api_key == "dummy" => {
                return Err(Error::Provider(format!(
                    "Provider '{}' has no API key configured",
                    effective_provider
                )));
            }
            _ => {}
        }
    }

    let empty_cfg = webpilot_core::config::ProviderConfig::default();
    let resolved_cfg = provider_cfg.unwrap_or(&empty_cfg);

    match effective_provider {
        "anthropic" => Ok(Box::new(AnthropicProvider::new(
            &resolved_cfg.api_key,
            resolved_cfg.api_base.as_deref(),
            model,
            max_tokens,
            temperature,
            proxy,
        )) as Box<dyn Provider>),
        "gemini" => Ok(Box::new(GeminiProvider::new(
            &resolved_cfg.api_key,
            resolved_cfg.api_base.as_deref(),
            model,
            max_tokens,
            temperature,
            proxy,
        )) as Box<dyn Provider>),
        "ollama" => Ok(Box::new(OllamaProvider::new(
            resolved_cfg.api_base.as_deref().or(Some("http://localhost:11434")),
            model,
            max_tokens,
            temperature,
            proxy,
        )) as Box<dyn Provider>),
        _ => {
            // OpenAI-compatible: openai, deepseek, openrouter, groq, relays
            let api_base = resolved_cfg
                .api_base
                .as_deref()
                .unwrap_or_else(|| default_api_base(effective_provider));
            Ok(Box::new(OpenAiProvider::new(
                &resolved_cfg.api_key,
                Some(api_base),
                model,
                max_tokens,
                temperature,
                proxy,
            )) as Box<dyn Provider>)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infer_provider_from_model() {
        assert_eq!(infer_provider_from_model("claude-3-haiku-20240307"), Some("anthropic"));
        assert_eq!(infer_provider_from_model("anthropic/claude-3-sonnet"), Some("anthropic"));
        assert_eq!(infer_provider_from_model("gemini-pro"), Some("gemini"));
        assert_eq!(infer_provider_from_model("gemini/gemini-pro"), Some("gemini"));
        assert_eq!(infer_provider_from_model("ollama/llama3"), Some("ollama"));
        assert_eq!(infer_provider_from_model("gpt-4o"), Some("openai"));
        assert_eq!(infer_provider_from_model("deepseek-chat"), Some("deepseek"));
        assert_eq!(infer_provider_from_model("some-unknown-model"), None);
    }

    #[test]
    fn test_explicit_provider_wins_over_prefix() {
        let mut config = Config::default();
        config.providers.get_mut("openai").unwrap().api_key = "sk-test".to_string();
        let result = create_provider(&config, "claude-3-haiku-20240307", Some("openai"));
        assert!(result.is_ok());
        assert_eq!(result.unwrap().model(), "claude-3-haiku-20240307");
    }

    #[test]
    fn test_model_prefix_inference() {
        let mut config = Config::default();
        config.providers.get_mut("anthropic").unwrap().api_key = "sk-ant-test".to_string();
        assert!(create_provider(&config, "claude-3-haiku-20240307", None).is_ok());
    }

    #[test]
    fn test_ollama_needs_no_key() {
        let config = Config::default();
        assert!(create_provider(&config, "llama3", Some("ollama")).is_ok());
    }

    #[test]
    fn test_explicit_without_key_fails() {
        let config = Config::default(); // anthropic key empty
        let result = create_provider(&config, "gpt-4o", Some("anthropic"));
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_explicit_provider_fails() {
        let config = Config::default();
        let result = create_provider(&config, "gpt-4o", Some("acme-llm"));
        assert!(result.is_err());
    }

    #[test]
    fn test_no_config_at_all_fails() {
        let mut config = Config::default();
        for p in config.providers.values_mut() {
            p.api_key = String::new();
        }
        config.providers.remove("ollama");
        let result = create_provider(&config, "some-unknown-model", None);
        assert!(result.is_err());
    }
}
