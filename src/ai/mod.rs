pub mod local;
pub mod quantized;

pub use local::RuleTable;
pub use quantized::load_backend;

use thiserror::Error;

/// Generation controls applied to every model call.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodingParams {
    pub max_new_tokens: usize,
    pub temperature: f64,
    /// Nucleus sampling threshold.
    pub top_p: f64,
    pub repetition_penalty: f32,
}

impl Default for DecodingParams {
    fn default() -> Self {
        Self {
            max_new_tokens: 300,
            temperature: 0.7,
            top_p: 0.9,
            repetition_penalty: 1.1,
        }
    }
}

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("failed to load model: {0}")]
    Load(String),

    #[error("tokenizer error: {0}")]
    Tokenizer(String),

    #[error("generation failed: {0}")]
    Generation(String),

    #[error(transparent)]
    Candle(#[from] candle_core::Error),

    #[error("no model is loaded")]
    Unavailable,
}

/// A text generator the responder can hand prompts to.
pub trait InferenceBackend {
    /// Short label for logs and the status endpoint.
    fn name(&self) -> &str;

    fn is_available(&self) -> bool;

    /// Returns the decoded output for `prompt`. Causal models echo the prompt
    /// in front of the continuation.
    fn generate(&mut self, prompt: &str, params: &DecodingParams) -> Result<String, ModelError>;
}

/// Stand-in used when no model could be loaded.
#[derive(Debug, Default)]
pub struct NoModel;

impl InferenceBackend for NoModel {
    fn name(&self) -> &str {
        "demo"
    }

    fn is_available(&self) -> bool {
        false
    }

    fn generate(&mut self, _prompt: &str, _params: &DecodingParams) -> Result<String, ModelError> {
        Err(ModelError::Unavailable)
    }
}
