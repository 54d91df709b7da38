use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use crate::ai::DecodingParams;

/// Where the fine-tuned model lives and how much context it gets.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelConfig {
    pub model_path: PathBuf,
    pub tokenizer_path: PathBuf,
    pub max_seq_length: usize,
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub app_title: String,
    pub model: ModelConfig,
    pub decoding: DecodingParams,
    pub host: String,
    pub port: u16,
    /// Listen on every interface so the page is reachable from other machines.
    pub share: bool,
    pub open_browser: bool,
}

impl Default for Config {
    fn default() -> Self {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }
}

impl Config {
    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let flag = |key: &str, default: bool| {
            lookup(key)
                .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
                .unwrap_or(default)
        };

        let model_path = lookup("CROPGPT_MODEL_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("farming_chatbot_lora/model.gguf"));

        let tokenizer_path = lookup("CROPGPT_TOKENIZER_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("farming_chatbot_lora/tokenizer.json"));

        let defaults = DecodingParams::default();
        let decoding = DecodingParams {
            max_new_tokens: parsed(&lookup, "CROPGPT_MAX_NEW_TOKENS").unwrap_or(defaults.max_new_tokens),
            temperature: parsed(&lookup, "CROPGPT_TEMPERATURE").unwrap_or(defaults.temperature),
            top_p: parsed(&lookup, "CROPGPT_TOP_P").unwrap_or(defaults.top_p),
            repetition_penalty: parsed(&lookup, "CROPGPT_REPETITION_PENALTY")
                .unwrap_or(defaults.repetition_penalty),
        };

        Self {
            app_title: "CropGPT - AI Farming Assistant".to_string(),
            model: ModelConfig {
                model_path,
                tokenizer_path,
                max_seq_length: parsed(&lookup, "CROPGPT_MAX_SEQ_LENGTH").unwrap_or(512),
                seed: parsed(&lookup, "CROPGPT_SEED"),
            },
            decoding,
            host: lookup("CROPGPT_HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            port: parsed(&lookup, "CROPGPT_PORT").unwrap_or(7860),
            share: flag("CROPGPT_SHARE", true),
            open_browser: flag("CROPGPT_OPEN_BROWSER", true),
        }
    }

    /// Address the server binds to. Sharing widens it to every interface.
    pub fn bind_addr(&self) -> String {
        let host = if self.share { "0.0.0.0" } else { self.host.as_str() };
        format!("{}:{}", host, self.port)
    }

    /// Address the local browser is pointed at.
    pub fn local_url(&self) -> String {
        let host = if self.host == "0.0.0.0" { "127.0.0.1" } else { self.host.as_str() };
        format!("http://{}:{}/", host, self.port)
    }
}

fn parsed<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    lookup(key).and_then(|v| v.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_match_the_shipped_model_setup() {
        let config = config_from(&[]);
        assert_eq!(config.model.model_path, PathBuf::from("farming_chatbot_lora/model.gguf"));
        assert_eq!(config.model.max_seq_length, 512);
        assert_eq!(config.model.seed, None);
        assert_eq!(config.decoding, DecodingParams::default());
        assert_eq!(config.port, 7860);
        assert!(config.share);
        assert!(config.open_browser);
        assert_eq!(config.bind_addr(), "0.0.0.0:7860");
        assert_eq!(config.local_url(), "http://127.0.0.1:7860/");
    }

    #[test]
    fn overrides_are_applied() {
        let config = config_from(&[
            ("CROPGPT_MODEL_PATH", "/models/crop.gguf"),
            ("CROPGPT_TEMPERATURE", "0.2"),
            ("CROPGPT_MAX_NEW_TOKENS", "64"),
            ("CROPGPT_SEED", "42"),
            ("CROPGPT_HOST", "localhost"),
            ("CROPGPT_PORT", "9000"),
            ("CROPGPT_SHARE", "false"),
            ("CROPGPT_OPEN_BROWSER", "no"),
        ]);
        assert_eq!(config.model.model_path, PathBuf::from("/models/crop.gguf"));
        assert_eq!(config.decoding.temperature, 0.2);
        assert_eq!(config.decoding.max_new_tokens, 64);
        assert_eq!(config.model.seed, Some(42));
        assert!(!config.share);
        assert!(!config.open_browser);
        assert_eq!(config.bind_addr(), "localhost:9000");
        assert_eq!(config.local_url(), "http://localhost:9000/");
    }

    #[test]
    fn unparseable_values_fall_back_to_defaults() {
        let config = config_from(&[
            ("CROPGPT_PORT", "not-a-port"),
            ("CROPGPT_TOP_P", "high"),
        ]);
        assert_eq!(config.port, 7860);
        assert_eq!(config.decoding.top_p, 0.9);
    }
}
