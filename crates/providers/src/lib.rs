pub mod anthropic;
pub mod client;
pub mod factory;
pub mod gemini;
pub mod ollama;
pub mod openai;

use async_trait::async_trait;
use webpilot_core::Result;

/// A reasoning backend: turns one natural-language prompt into text.
#[async_trait]
pub trait Provider: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Label used when the provider choice is forwarded to collaborators
    /// (e.g. the automation bridge) and in log fields.
    fn model(&self) -> &str;
}

pub use anthropic::AnthropicProvider;
pub use factory::{create_provider, infer_provider_from_model};
pub use gemini::GeminiProvider;
pub use ollama::OllamaProvider;
pub use openai::OpenAiProvider;
