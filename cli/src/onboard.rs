use anyhow::{Context, Result};
use console::style;
use dialoguer::{Input, Select};
use proctor_core::config::{Config, get_config_path};
use proctor_core::traits::ProviderKind;

const PROVIDERS: &[ProviderKind] = &[ProviderKind::Groq, ProviderKind::OpenAi];

fn print_step(step: usize, total: usize, title: &str) {
    println!();
    println!(
        "{}",
        style(format!("[{}/{}] {}", step, total, title))
            .cyan()
            .bold()
    );
    println!();
}

fn models_for(kind: ProviderKind) -> &'static [&'static str] {
    match kind {
        ProviderKind::Groq => &[
            "openai/gpt-oss-120b",
            "openai/gpt-oss-20b",
            "llama-3.3-70b-versatile",
        ],
        ProviderKind::OpenAi => &["gpt-4o", "gpt-4o-mini", "gpt-5-mini"],
    }
}

fn setup_provider() -> Result<ProviderKind> {
    let names: Vec<&str> = PROVIDERS.iter().map(|p| p.as_str()).collect();

    let selection = Select::new()
        .with_prompt("Select your provider")
        .items(&names)
        .default(0)
        .interact()
        .context("Failed to select provider")?;

    Ok(PROVIDERS[selection])
}

fn setup_api_key(kind: ProviderKind) -> Result<String> {
    let api_key: String = Input::new()
        .with_prompt(format!("Enter your {} API key", kind))
        .interact_text()
        .context("Failed to read API key")?;

    let api_key = api_key.trim().to_string();
    if api_key.is_empty() {
        return Err(anyhow::anyhow!("API key cannot be empty"));
    }

    Ok(api_key)
}

fn setup_model(kind: ProviderKind) -> Result<String> {
    let models = models_for(kind);

    let selection = Select::new()
        .with_prompt("Select your model")
        .items(models)
        .default(0)
        .interact()
        .context("Failed to select model")?;

    Ok(models[selection].to_string())
}

pub fn run_onboard() -> Result<Config> {
    println!();
    println!("  {}", style("proctor").cyan().bold());
    println!(
        "  {}",
        style("An agent that writes pytest suites and runs them until they pass.").dim()
    );
    println!();

    print_step(1, 3, "Provider");
    let provider = setup_provider()?;

    print_step(2, 3, "API Key");
    let api_key = setup_api_key(provider)?;

    print_step(3, 3, "Model");
    let model = setup_model(provider)?;

    let config = Config {
        provider: Some(provider.as_str().to_string()),
        api_key,
        model: Some(model),
        ..Default::default()
    };

    println!();
    println!("  {} Configuration complete!", style("✓").green().bold());
    println!(
        "  {} Config saved to {}",
        style("→").green(),
        style(get_config_path().display()).cyan()
    );
    println!(
        "  {} You can now run: {}",
        style("→").green(),
        style("proctor run --file <module.py>").cyan().bold()
    );
    println!();

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_provider_offers_its_default_model_first() {
        assert_eq!(models_for(ProviderKind::Groq)[0], "openai/gpt-oss-120b");
        assert_eq!(models_for(ProviderKind::OpenAi)[0], "gpt-4o");
    }
}
