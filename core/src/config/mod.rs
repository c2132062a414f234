use crate::agent::{PruneOptions, ThrottleConfig};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

const PROCTOR_DIR: &str = ".proctor";

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AgentVariant {
    Simple,
    #[default]
    Scratchpad,
}

impl std::str::FromStr for AgentVariant {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "simple" | "v1" => Ok(Self::Simple),
            "scratchpad" | "v2" => Ok(Self::Scratchpad),
            other => Err(anyhow::anyhow!(
                "Unknown agent variant: {}. Available: simple, scratchpad",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub provider: Option<String>,
    pub api_key: String,
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub temperature: Option<f64>,
    pub top_p: Option<f64>,
    pub max_tokens: Option<u32>,
    pub reasoning_effort: Option<String>,
    pub max_iterations: usize,
    pub variant: AgentVariant,
    pub workspace_dir: PathBuf,
    pub target_module: Option<String>,
    pub test_output_dir: String,
    pub prompt_template: Option<PathBuf>,
    pub python: Option<String>,
    pub prune: PruneOptions,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            provider: None,
            api_key: String::new(),
            base_url: None,
            model: None,
            temperature: None,
            top_p: None,
            max_tokens: None,
            reasoning_effort: None,
            max_iterations: 10,
            variant: AgentVariant::default(),
            workspace_dir: PathBuf::from("."),
            target_module: None,
            test_output_dir: "tools/llm_tests".to_string(),
            prompt_template: None,
            python: None,
            prune: PruneOptions::default(),
        }
    }
}

impl Config {
    pub fn load_or_init() -> Result<Self> {
        if config_exists() {
            load_config()
        } else {
            Ok(Config::default())
        }
    }

    pub fn throttle_config(&self) -> ThrottleConfig {
        let config = ThrottleConfig::new(self.test_output_dir.clone());
        match &self.target_module {
            Some(target) => config.with_target_module(target.clone()),
            None => config,
        }
    }
}

pub fn get_proctor_dir() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(PROCTOR_DIR)
}

pub fn get_config_path() -> PathBuf {
    get_proctor_dir().join("config.toml")
}

pub fn ensure_proctor_dir() -> Result<PathBuf> {
    let proctor_dir = get_proctor_dir();

    if !proctor_dir.exists() {
        std::fs::create_dir_all(&proctor_dir).with_context(|| {
            format!(
                "Failed to create proctor directory at {}",
                proctor_dir.display()
            )
        })?;
    }

    Ok(proctor_dir)
}

pub fn load_config() -> Result<Config> {
    let config_path = get_config_path();

    let content = std::fs::read_to_string(&config_path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            anyhow::anyhow!(
                "Config file not found. Run 'proctor onboard' to set up your configuration."
            )
        } else {
            anyhow::anyhow!("Failed to read config from {}: {}", config_path.display(), e)
        }
    })?;

    parse_config(&content)
        .with_context(|| format!("Failed to parse config from {}", config_path.display()))
}

pub fn parse_config(content: &str) -> Result<Config> {
    Ok(toml::from_str(content)?)
}

pub fn save_config(config: &Config) -> Result<()> {
    ensure_proctor_dir()?;

    let config_path = get_config_path();
    let content =
        toml::to_string_pretty(config).with_context(|| "Failed to serialize config to TOML")?;

    std::fs::write(&config_path, content)
        .with_context(|| format!("Failed to write config to {}", config_path.display()))?;

    Ok(())
}

pub fn config_exists() -> bool {
    get_config_path().exists()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_fills_defaults() {
        let config = parse_config(
            r#"
provider = "groq"
model = "openai/gpt-oss-120b"
variant = "simple"
target_module = "tools/toolkit/web_explorer.py"

[prune]
last_n = 6
"#,
        )
        .unwrap();

        assert_eq!(config.provider.as_deref(), Some("groq"));
        assert_eq!(config.variant, AgentVariant::Simple);
        assert_eq!(config.max_iterations, 10);
        assert_eq!(config.test_output_dir, "tools/llm_tests");
        assert_eq!(config.prune.last_n, 6);
        assert!(config.prune.drop_tools);

        let throttle = config.throttle_config();
        assert_eq!(
            throttle.target_module.as_deref(),
            Some("tools/toolkit/web_explorer.py")
        );
        assert_eq!(throttle.max_dir_listings, 2);
    }

    #[test]
    fn round_trips_through_toml() {
        let config = Config {
            api_key: "k".into(),
            temperature: Some(0.3),
            ..Config::default()
        };
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed = parse_config(&text).unwrap();

        assert_eq!(parsed.api_key, "k");
        assert_eq!(parsed.temperature, Some(0.3));
        assert_eq!(parsed.variant, AgentVariant::Scratchpad);
    }

    #[test]
    fn variant_names() {
        assert_eq!("v1".parse::<AgentVariant>().unwrap(), AgentVariant::Simple);
        assert_eq!(
            "Scratchpad".parse::<AgentVariant>().unwrap(),
            AgentVariant::Scratchpad
        );
        assert!("v3".parse::<AgentVariant>().is_err());
    }
}
