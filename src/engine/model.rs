//! Model selection for automation engines.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Model used when `ALUMNIUM_MODEL` is unset.
pub const DEFAULT_MODEL: &str = "anthropic/claude-haiku-4-5-20251001";

/// LLM provider backing an automation engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    Anthropic,
    AwsAnthropic,
    AwsMeta,
    AzureOpenai,
    Deepseek,
    Github,
    Google,
    Mistralai,
    Ollama,
    Openai,
    Xai,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Anthropic => "anthropic",
            Self::AwsAnthropic => "aws_anthropic",
            Self::AwsMeta => "aws_meta",
            Self::AzureOpenai => "azure_openai",
            Self::Deepseek => "deepseek",
            Self::Github => "github",
            Self::Google => "google",
            Self::Mistralai => "mistralai",
            Self::Ollama => "ollama",
            Self::Openai => "openai",
            Self::Xai => "xai",
        }
    }

    /// Model name used when only the provider is configured.
    pub fn default_model(&self) -> &'static str {
        match self {
            Self::Anthropic => "claude-haiku-4-5-20251001",
            Self::AwsAnthropic => "us.anthropic.claude-haiku-4-5-20251001-v1:0",
            Self::AwsMeta => "us.meta.llama4-maverick-17b-instruct-v1:0",
            Self::AzureOpenai => "gpt-4o-mini",
            Self::Deepseek => "deepseek-chat",
            Self::Github => "gpt-4o-mini",
            Self::Google => "gemini-2.0-flash",
            Self::Mistralai => "mistral-medium-2505",
            Self::Ollama => "mistral-small3.1",
            Self::Openai => "gpt-4o-mini",
            Self::Xai => "grok-4-fast-non-reasoning",
        }
    }

    pub fn all() -> &'static [Provider] {
        &[
            Self::Anthropic,
            Self::AwsAnthropic,
            Self::AwsMeta,
            Self::AzureOpenai,
            Self::Deepseek,
            Self::Github,
            Self::Google,
            Self::Mistralai,
            Self::Ollama,
            Self::Openai,
            Self::Xai,
        ]
    }
}

impl FromStr for Provider {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let normalized = input.trim().to_lowercase().replace('-', "_");
        Provider::all()
            .iter()
            .copied()
            .find(|p| p.as_str() == normalized)
            .ok_or_else(|| format!("unknown model provider: {input}"))
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Provider plus model name, written `provider/name`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Model {
    pub provider: Provider,
    pub name: String,
}

impl Model {
    pub fn new(provider: Provider, name: impl Into<String>) -> Self {
        Self {
            provider,
            name: name.into(),
        }
    }
}

impl Default for Model {
    fn default() -> Self {
        Model::new(Provider::Anthropic, Provider::Anthropic.default_model())
    }
}

impl FromStr for Model {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let input = input.trim();
        match input.split_once('/') {
            Some((provider, name)) => {
                let provider: Provider = provider.parse()?;
                let name = name.trim();
                if name.is_empty() {
                    Ok(Model::new(provider, provider.default_model()))
                } else {
                    Ok(Model::new(provider, name))
                }
            }
            None => {
                let provider: Provider = input.parse()?;
                Ok(Model::new(provider, provider.default_model()))
            }
        }
    }
}

impl std::fmt::Display for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.provider, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_model_matches_fallback_string() {
        let parsed: Model = DEFAULT_MODEL.parse().unwrap();
        assert_eq!(parsed, Model::default());
        assert_eq!(parsed.to_string(), DEFAULT_MODEL);
    }

    #[test]
    fn bare_provider_uses_its_default_name() {
        let model: Model = "openai".parse().unwrap();
        assert_eq!(model.provider, Provider::Openai);
        assert_eq!(model.name, "gpt-4o-mini");
    }

    #[test]
    fn model_name_may_contain_slashes() {
        let model: Model = "ollama/library/qwen3:8b".parse().unwrap();
        assert_eq!(model.provider, Provider::Ollama);
        assert_eq!(model.name, "library/qwen3:8b");
    }

    #[test]
    fn provider_names_are_normalized() {
        assert_eq!("AWS-Anthropic".parse::<Provider>(), Ok(Provider::AwsAnthropic));
        assert!("skynet".parse::<Provider>().is_err());
    }
}
