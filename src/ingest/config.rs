// src/ingest/config.rs
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

const ENV_PATH: &str = "NEWS_SOURCES_PATH";

/// A single string or a list of strings. Lists are flattened to
/// comma-joined values when the outbound request is built.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    One(String),
    Many(Vec<String>),
}

impl ParamValue {
    /// Wire form of the value: lists become comma-joined strings.
    pub fn to_query_value(&self) -> String {
        match self {
            ParamValue::One(s) => s.clone(),
            ParamValue::Many(v) => v.join(","),
        }
    }

    pub fn contains(&self, needle: &str) -> bool {
        match self {
            ParamValue::One(s) => s == needle,
            ParamValue::Many(v) => v.iter().any(|s| s == needle),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            ParamValue::One(s) => s.trim().is_empty(),
            ParamValue::Many(v) => v.iter().all(|s| s.trim().is_empty()),
        }
    }
}

/// Per-provider configuration, loaded at startup and read-only thereafter.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    pub name: String,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub api_key: Option<String>,
    /// Overrides the adapter's built-in endpoint; mostly useful in tests.
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub parameters: BTreeMap<String, ParamValue>,
}

impl SourceConfig {
    /// The API key, if present and non-blank.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }

    pub fn param(&self, key: &str) -> Option<&ParamValue> {
        self.parameters.get(key)
    }

    pub fn endpoint_or(&self, default: &str) -> String {
        self.endpoint
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| default.to_string())
    }
}

/// The full `[sources]` table. BTreeMap keeps orchestrator iteration order
/// stable across runs.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SourcesConfig {
    #[serde(default)]
    pub sources: BTreeMap<String, SourceConfig>,
}

/// Load source configuration from an explicit path. TOML or JSON.
pub fn load_from(path: &Path) -> Result<SourcesConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading source config from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    let mut cfg = parse_config(&content, ext.as_str())?;
    apply_env_keys(&mut cfg);
    Ok(cfg)
}

/// Load using env var + fallbacks:
/// 1) $NEWS_SOURCES_PATH
/// 2) config/news.toml
/// 3) config/news.json
pub fn load_default() -> Result<SourcesConfig> {
    if let Ok(p) = std::env::var(ENV_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_from(&pb);
        } else {
            return Err(anyhow!("NEWS_SOURCES_PATH points to non-existent path"));
        }
    }
    let toml_p = PathBuf::from("config/news.toml");
    if toml_p.exists() {
        return load_from(&toml_p);
    }
    let json_p = PathBuf::from("config/news.json");
    if json_p.exists() {
        return load_from(&json_p);
    }
    Ok(SourcesConfig::default())
}

fn parse_config(s: &str, hint_ext: &str) -> Result<SourcesConfig> {
    // Try TOML first if hinted or the content looks like toml.
    let try_toml = hint_ext == "toml" || s.contains("[sources");
    if try_toml {
        if let Ok(v) = toml::from_str(s) {
            return Ok(v);
        }
    }
    if let Ok(v) = serde_json::from_str(s) {
        return Ok(v);
    }
    if !try_toml {
        if let Ok(v) = toml::from_str(s) {
            return Ok(v);
        }
    }
    Err(anyhow!("unsupported source config format"))
}

/// Environment API keys win over file values: `news_api` reads
/// NEWSAPI_API_KEY, `the_guardian` THEGUARDIAN_API_KEY, and so on.
fn apply_env_keys(cfg: &mut SourcesConfig) {
    for (key, source) in cfg.sources.iter_mut() {
        let var = format!("{}_API_KEY", key.replace('_', "").to_ascii_uppercase());
        if let Ok(v) = std::env::var(&var) {
            if !v.trim().is_empty() {
                source.api_key = Some(v);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    const TOML_CFG: &str = r#"
        [sources.news_api]
        name = "NewsAPI"
        enabled = true
        api_key = "k1"

        [sources.news_api.parameters]
        q = "bitcoin"
        language = ["en", "ar"]
    "#;

    #[test]
    fn toml_and_json_parse_to_the_same_config() {
        let json_cfg = r#"{
            "sources": {
                "news_api": {
                    "name": "NewsAPI",
                    "enabled": true,
                    "api_key": "k1",
                    "parameters": { "q": "bitcoin", "language": ["en", "ar"] }
                }
            }
        }"#;

        let from_toml = parse_config(TOML_CFG, "toml").unwrap();
        let from_json = parse_config(json_cfg, "json").unwrap();

        for cfg in [&from_toml, &from_json] {
            let src = cfg.sources.get("news_api").unwrap();
            assert_eq!(src.name, "NewsAPI");
            assert!(src.enabled);
            assert_eq!(src.api_key(), Some("k1"));
            assert_eq!(
                src.param("language"),
                Some(&ParamValue::Many(vec!["en".into(), "ar".into()]))
            );
        }
    }

    #[test]
    fn list_parameters_flatten_to_comma_joined() {
        let v = ParamValue::Many(vec!["en".into(), "ar".into()]);
        assert_eq!(v.to_query_value(), "en,ar");
        assert!(v.contains("ar"));
        assert!(!v.contains("fr"));
    }

    #[test]
    fn blank_api_key_counts_as_missing() {
        let mut cfg = parse_config(TOML_CFG, "toml").unwrap();
        let src = cfg.sources.get_mut("news_api").unwrap();
        src.api_key = Some("   ".into());
        assert_eq!(src.api_key(), None);
    }

    #[serial_test::serial]
    #[test]
    fn env_api_key_overrides_file_value() {
        env::set_var("NEWSAPI_API_KEY", "from-env");
        let mut cfg = parse_config(TOML_CFG, "toml").unwrap();
        apply_env_keys(&mut cfg);
        env::remove_var("NEWSAPI_API_KEY");

        let src = cfg.sources.get("news_api").unwrap();
        assert_eq!(src.api_key(), Some("from-env"));
    }
}
