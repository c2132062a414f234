use crate::config::Config;
use crate::providers::OpenAICompatibleProvider;
use crate::traits::{Provider, ProviderKind};
use anyhow::{Result, anyhow};
use std::sync::Arc;

pub fn create_provider(config: &Config) -> Result<Arc<dyn Provider>> {
    let kind: ProviderKind = config.provider.as_deref().unwrap_or("groq").parse()?;

    let env_vars: &[&str] = match kind {
        ProviderKind::OpenAi => &["OPENAI_API_KEY", "PROCTOR_OPENAI_API_KEY", "PROCTOR_API_KEY"],
        ProviderKind::Groq => &["GROQ_API_KEY", "PROCTOR_GROQ_API_KEY", "PROCTOR_API_KEY"],
    };
    let api_key = resolve_api_key_with_fallback(env_vars, &config.api_key)?;

    let mut provider = OpenAICompatibleProvider::new(kind, api_key)
        .with_temperature(config.temperature)
        .with_top_p(config.top_p)
        .with_max_tokens(config.max_tokens)
        .with_reasoning_effort(config.reasoning_effort.clone());
    if let Some(model) = &config.model {
        provider = provider.with_model(model.clone());
    }
    if let Some(base_url) = &config.base_url {
        provider = provider.with_base_url(base_url.clone());
    }

    tracing::debug!("Using {} provider with model {}", kind, provider.model());
    Ok(Arc::new(provider))
}

fn resolve_api_key_with_fallback(env_vars: &[&str], config_key: &str) -> Result<String> {
    for var_name in env_vars {
        if let Ok(key) = std::env::var(var_name)
            && !key.trim().is_empty()
        {
            return Ok(key);
        }
    }
    if !config_key.is_empty() {
        Ok(config_key.to_string())
    } else {
        Err(anyhow!(
            "No API key found. Set one of {} or run 'proctor onboard'.",
            env_vars.join(", ")
        ))
    }
}
