use crate::ai::{DecodingParams, InferenceBackend, RuleTable};
use crate::core::History;

/// Separates the instruction from the model's answer.
pub const RESPONSE_MARKER: &str = "### Response:";

/// Instruction prompt the model was fine-tuned on.
pub fn build_prompt(message: &str) -> String {
    format!(
        "Below is an instruction that describes a farming-related task. \
         Write a response that appropriately completes the request.\n\n\
         ### Instruction:\n{}\n\n{}\n",
        message, RESPONSE_MARKER
    )
}

/// Text after the last response marker, trimmed.
pub fn extract_response(generated: &str) -> &str {
    generated
        .rsplit(RESPONSE_MARKER)
        .next()
        .unwrap_or(generated)
        .trim()
}

pub fn apology(error: &dyn std::fmt::Display) -> String {
    format!(
        "Sorry, I encountered an error: {}\n\nPlease try again or rephrase your question.",
        error
    )
}

/// Answers chat messages with the model when one is loaded, canned advice otherwise.
pub struct Responder {
    backend: Box<dyn InferenceBackend>,
    rules: RuleTable,
    params: DecodingParams,
}

impl Responder {
    pub fn new(backend: Box<dyn InferenceBackend>, rules: RuleTable, params: DecodingParams) -> Self {
        Self {
            backend,
            rules,
            params,
        }
    }

    pub fn is_demo(&self) -> bool {
        !self.backend.is_available()
    }

    pub fn mode(&self) -> &'static str {
        if self.is_demo() {
            "demo"
        } else {
            "model"
        }
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    pub fn rules(&self) -> &RuleTable {
        &self.rules
    }

    /// Appends one turn for `message`; blank messages leave the history untouched.
    pub fn respond(&mut self, message: &str, mut history: History) -> History {
        if message.trim().is_empty() {
            return history;
        }

        let response = if self.is_demo() {
            self.canned_response(message)
        } else {
            self.model_response(message)
        };

        history.push(message, &response);
        history
    }

    fn canned_response(&self, message: &str) -> String {
        log::debug!("🌾 Answering from canned advice");
        self.rules.lookup(message).to_string()
    }

    fn model_response(&mut self, message: &str) -> String {
        let prompt = build_prompt(message);
        match self.backend.generate(&prompt, &self.params) {
            Ok(generated) => extract_response(&generated).to_string(),
            Err(e) => {
                log::warn!("⚠️ Generation failed: {}", e);
                apology(&e)
            }
        }
    }
}
