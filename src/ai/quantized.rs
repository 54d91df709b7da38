//! Fine-tuned llama-family model in GGUF form, run with candle.

use std::fs::File;
use std::path::Path;

use candle_core::quantized::gguf_file;
use candle_core::{Device, Tensor};
use candle_transformers::generation::{LogitsProcessor, Sampling};
use candle_transformers::models::quantized_llama::ModelWeights;
use candle_transformers::utils::apply_repeat_penalty;
use tokenizers::Tokenizer;

use super::{DecodingParams, InferenceBackend, ModelError, NoModel};
use crate::config::{Config, ModelConfig};

/// Tried in order when the GGUF file carries no EOS id.
const EOS_CANDIDATES: [&str; 5] = ["</s>", "<|eot_id|>", "<|end_of_text|>", "<|im_end|>", "<eos>"];

pub struct QuantizedModel {
    weights: ModelWeights,
    tokenizer: Tokenizer,
    device: Device,
    eos_token: Option<u32>,
    max_seq_length: usize,
    seed: Option<u64>,
    label: String,
}

impl QuantizedModel {
    pub fn load(config: &ModelConfig) -> Result<Self, ModelError> {
        let device = Device::cuda_if_available(0)?;

        let tokenizer = load_tokenizer(&config.tokenizer_path)?;

        let mut file = File::open(&config.model_path).map_err(|e| {
            ModelError::Load(format!("{}: {}", config.model_path.display(), e))
        })?;
        let content = gguf_file::Content::read(&mut file)
            .map_err(|e| ModelError::Load(format!("{}: {}", config.model_path.display(), e)))?;

        let gguf_eos = content
            .metadata
            .get("tokenizer.ggml.eos_token_id")
            .and_then(|v| v.to_u32().ok());

        let weights = ModelWeights::from_gguf(content, &mut file, &device)
            .map_err(|e| ModelError::Load(e.to_string()))?;

        let eos_token = gguf_eos.or_else(|| {
            let vocab = tokenizer.get_vocab(true);
            EOS_CANDIDATES.iter().find_map(|t| vocab.get(*t).copied())
        });
        if eos_token.is_none() {
            log::warn!("⚠️ No end-of-sequence token found, generation stops on length only");
        }

        let label = config
            .model_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "model".to_string());

        log::info!(
            "📦 Model {} loaded on {}",
            config.model_path.display(),
            if device.is_cuda() { "CUDA" } else { "CPU" }
        );

        Ok(Self {
            weights,
            tokenizer,
            device,
            eos_token,
            max_seq_length: config.max_seq_length,
            seed: config.seed,
            label,
        })
    }

    fn sampler(&self, params: &DecodingParams) -> LogitsProcessor {
        let sampling = if params.temperature <= 0.0 {
            Sampling::ArgMax
        } else {
            Sampling::TopP {
                p: params.top_p,
                temperature: params.temperature,
            }
        };
        let seed = self.seed.unwrap_or_else(rand::random);
        LogitsProcessor::from_sampling(seed, sampling)
    }

    /// Next-token logits for `input`, penalised for every token already in the sequence.
    fn step(
        &mut self,
        input: &[u32],
        index_pos: usize,
        history: &[u32],
        penalty: f32,
    ) -> Result<Tensor, ModelError> {
        let input = Tensor::new(input, &self.device)?.unsqueeze(0)?;
        let logits = self.weights.forward(&input, index_pos)?.squeeze(0)?;
        penalize(logits, penalty, history)
    }
}

impl InferenceBackend for QuantizedModel {
    fn name(&self) -> &str {
        &self.label
    }

    fn is_available(&self) -> bool {
        true
    }

    fn generate(&mut self, prompt: &str, params: &DecodingParams) -> Result<String, ModelError> {
        let encoding = self
            .tokenizer
            .encode(prompt, true)
            .map_err(|e| ModelError::Tokenizer(e.to_string()))?;
        let ids = encoding.get_ids();
        if ids.is_empty() {
            return Err(ModelError::Generation("prompt produced no tokens".to_string()));
        }

        let kept = fit_context(ids, self.max_seq_length);
        if kept.len() < ids.len() {
            log::warn!(
                "⚠️ Prompt is {} tokens, keeping the last {}",
                ids.len(),
                kept.len()
            );
        }
        let mut tokens = kept.to_vec();
        let prompt_len = tokens.len();

        let budget = params
            .max_new_tokens
            .min(self.max_seq_length.saturating_sub(prompt_len));
        let mut sampler = self.sampler(params);

        let logits = self.step(&tokens, 0, &tokens, params.repetition_penalty)?;
        let mut next = sampler.sample(&logits)?;

        for _ in 0..budget {
            if Some(next) == self.eos_token {
                break;
            }
            tokens.push(next);
            if tokens.len() - prompt_len == budget {
                break;
            }
            let index_pos = tokens.len() - 1;
            let logits = self.step(&[next], index_pos, &tokens, params.repetition_penalty)?;
            next = sampler.sample(&logits)?;
        }

        log::debug!("🧠 Generated {} tokens", tokens.len() - prompt_len);

        self.tokenizer
            .decode(&tokens, true)
            .map_err(|e| ModelError::Tokenizer(e.to_string()))
    }
}

/// Applies the repetition penalty to every token already seen.
fn penalize(logits: Tensor, penalty: f32, seen: &[u32]) -> Result<Tensor, ModelError> {
    if penalty == 1.0 {
        return Ok(logits);
    }
    Ok(apply_repeat_penalty(&logits, penalty, seen)?)
}

/// Tail of the prompt that leaves room for at least one new token.
fn fit_context(ids: &[u32], max_seq_length: usize) -> &[u32] {
    let limit = max_seq_length.saturating_sub(1).max(1);
    &ids[ids.len().saturating_sub(limit)..]
}

fn load_tokenizer(path: &Path) -> Result<Tokenizer, ModelError> {
    if !path.exists() {
        return Err(ModelError::Load(format!(
            "tokenizer not found at {}",
            path.display()
        )));
    }
    Tokenizer::from_file(path)
        .map_err(|e| ModelError::Load(format!("{}: {}", path.display(), e)))
}

/// Tries to load the configured model and falls back to demo mode on failure.
pub fn load_backend(config: &Config) -> Box<dyn InferenceBackend> {
    log::info!("⏳ Loading model from {}", config.model.model_path.display());
    match QuantizedModel::load(&config.model) {
        Ok(model) => {
            log::info!("✅ Model loaded successfully");
            Box::new(model)
        }
        Err(e) => {
            log::warn!("⚠️ Model not loaded: {}", e);
            log::warn!("⚠️ Running in demo mode");
            Box::new(NoModel)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;

    fn model_config(model_path: PathBuf, tokenizer_path: PathBuf) -> ModelConfig {
        ModelConfig {
            model_path,
            tokenizer_path,
            max_seq_length: 512,
            seed: Some(7),
        }
    }

    #[test]
    fn missing_files_fail_to_load() {
        let dir = tempfile::tempdir().unwrap();
        let config = model_config(dir.path().join("model.gguf"), dir.path().join("tokenizer.json"));
        let err = QuantizedModel::load(&config).err().expect("load must fail");
        assert!(matches!(err, ModelError::Load(_)));
    }

    #[test]
    fn corrupt_tokenizer_fails_to_load() {
        let dir = tempfile::tempdir().unwrap();
        let tokenizer_path = dir.path().join("tokenizer.json");
        File::create(&tokenizer_path)
            .unwrap()
            .write_all(b"{ not json")
            .unwrap();
        let config = model_config(dir.path().join("model.gguf"), tokenizer_path);
        assert!(matches!(QuantizedModel::load(&config), Err(ModelError::Load(_))));
    }

    const WORD_LEVEL_TOKENIZER: &str = r#"{
        "version": "1.0",
        "truncation": null,
        "padding": null,
        "added_tokens": [],
        "normalizer": null,
        "pre_tokenizer": null,
        "post_processor": null,
        "decoder": null,
        "model": {
            "type": "WordLevel",
            "vocab": { "[UNK]": 0, "rice": 1 },
            "unk_token": "[UNK]"
        }
    }"#;

    #[test]
    fn corrupt_gguf_fails_to_load() {
        let dir = tempfile::tempdir().unwrap();
        let tokenizer_path = dir.path().join("tokenizer.json");
        std::fs::write(&tokenizer_path, WORD_LEVEL_TOKENIZER).unwrap();
        assert!(load_tokenizer(&tokenizer_path).is_ok());

        let model_path = dir.path().join("model.gguf");
        std::fs::write(&model_path, b"definitely not a gguf file").unwrap();

        let config = model_config(model_path, tokenizer_path);
        assert!(matches!(QuantizedModel::load(&config), Err(ModelError::Load(_))));
    }

    #[test]
    fn penalty_reaches_tokens_at_the_start_of_a_long_sequence() {
        let logits = Tensor::new(&[2.0f32, 2.0, 2.0, -1.0], &Device::Cpu).unwrap();
        let mut seen = vec![0u32, 3];
        seen.extend(std::iter::repeat(2).take(200));

        let out = penalize(logits, 2.0, &seen).unwrap().to_vec1::<f32>().unwrap();
        assert_eq!(out, vec![1.0, 2.0, 1.0, -2.0]);
    }

    #[test]
    fn neutral_penalty_leaves_logits_alone() {
        let logits = Tensor::new(&[0.5f32, -0.5], &Device::Cpu).unwrap();
        let out = penalize(logits, 1.0, &[0, 1]).unwrap().to_vec1::<f32>().unwrap();
        assert_eq!(out, vec![0.5, -0.5]);
    }

    #[test]
    fn long_prompts_keep_their_tail() {
        let ids: Vec<u32> = (0..600).collect();
        let kept = fit_context(&ids, 512);
        assert_eq!(kept.len(), 511);
        assert_eq!(kept.first(), Some(&89));
        assert_eq!(kept.last(), Some(&599));

        let short = [1, 2, 3];
        assert_eq!(fit_context(&short, 512), &short);
    }

    #[test]
    fn load_backend_falls_back_to_demo_mode() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::from_lookup(|_| None);
        config.model = model_config(dir.path().join("model.gguf"), dir.path().join("tokenizer.json"));

        let backend = load_backend(&config);
        assert!(!backend.is_available());
        assert_eq!(backend.name(), "demo");
    }
}
