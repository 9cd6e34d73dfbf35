use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub completion: CompletionConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    pub index: IndexConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CompletionConfig {
    pub api_url: String,
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_completion_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_max_tokens() -> u32 {
    500
}
fn default_temperature() -> f64 {
    0.2
}
fn default_completion_timeout_secs() -> u64 {
    60
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_embedding_model")]
    pub model: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(),
            model: "all-minilm-l6-v2".to_string(),
            url: None,
            timeout_secs: 30,
        }
    }
}

fn default_provider() -> String {
    "ollama".to_string()
}
fn default_embedding_model() -> String {
    "all-minilm-l6-v2".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct IndexConfig {
    pub url: String,
    pub collection: String,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_top_k() -> usize {
    5
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct SessionConfig {
    /// Maximum number of most-recent turns rendered into the prompt
    /// transcript. Absent means unbounded.
    #[serde(default)]
    pub history_window: Option<usize>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:7878".to_string()
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    // Validate completion
    if config.completion.api_url.trim().is_empty() {
        anyhow::bail!("completion.api_url must not be empty");
    }
    if config.completion.model.trim().is_empty() {
        anyhow::bail!("completion.model must not be empty");
    }
    if !(0.0..=2.0).contains(&config.completion.temperature) {
        anyhow::bail!("completion.temperature must be in [0.0, 2.0]");
    }
    if config.completion.max_tokens == 0 {
        anyhow::bail!("completion.max_tokens must be > 0");
    }

    // Validate embedding
    match config.embedding.provider.as_str() {
        "ollama" | "openai" => {}
        other => anyhow::bail!(
            "Unknown embedding provider: '{}'. Must be ollama or openai.",
            other
        ),
    }
    if config.embedding.model.trim().is_empty() {
        anyhow::bail!("embedding.model must not be empty");
    }

    // Validate index
    if config.index.url.trim().is_empty() {
        anyhow::bail!("index.url must not be empty");
    }
    if config.index.collection.trim().is_empty() {
        anyhow::bail!("index.collection must not be empty");
    }
    if config.index.top_k < 1 {
        anyhow::bail!("index.top_k must be >= 1");
    }

    if config.session.history_window == Some(0) {
        anyhow::bail!("session.history_window must be >= 1 when set");
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    const MINIMAL: &str = r#"
[completion]
api_url = "https://api.llama.com/v1/chat/completions"
model = "Llama-4-Maverick-17B-128E-Instruct-FP8"

[index]
url = "http://localhost:6333"
collection = "notion_content"
"#;

    #[test]
    fn test_minimal_config_defaults() {
        let file = write_config(MINIMAL);
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.completion.max_tokens, 500);
        assert!((config.completion.temperature - 0.2).abs() < 1e-9);
        assert_eq!(config.completion.timeout_secs, 60);
        assert_eq!(config.embedding.provider, "ollama");
        assert_eq!(config.index.top_k, 5);
        assert_eq!(config.session.history_window, None);
        assert_eq!(config.server.bind, "127.0.0.1:7878");
    }

    #[test]
    fn test_missing_file_errors() {
        let err = load_config(Path::new("/nonexistent/atlas.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn test_unknown_embedding_provider_errors() {
        let content = format!(
            "{}\n[embedding]\nprovider = \"sentence-transformers\"\n",
            MINIMAL
        );
        let file = write_config(&content);
        let err = load_config(file.path()).unwrap_err();
        assert!(err.to_string().contains("Unknown embedding provider"));
    }

    #[test]
    fn test_zero_top_k_errors() {
        let content = MINIMAL.replace(
            "collection = \"notion_content\"",
            "collection = \"notion_content\"\ntop_k = 0",
        );
        let file = write_config(&content);
        let err = load_config(file.path()).unwrap_err();
        assert!(err.to_string().contains("top_k"));
    }

    #[test]
    fn test_zero_history_window_errors() {
        let content = format!("{}\n[session]\nhistory_window = 0\n", MINIMAL);
        let file = write_config(&content);
        let err = load_config(file.path()).unwrap_err();
        assert!(err.to_string().contains("history_window"));
    }

    #[test]
    fn test_out_of_range_temperature_errors() {
        let content = format!("{}\n", MINIMAL).replace(
            "model = \"Llama-4-Maverick-17B-128E-Instruct-FP8\"",
            "model = \"Llama-4-Maverick-17B-128E-Instruct-FP8\"\ntemperature = 3.5",
        );
        let file = write_config(&content);
        let err = load_config(file.path()).unwrap_err();
        assert!(err.to_string().contains("temperature"));
    }
}
