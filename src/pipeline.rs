//! Text-generation pipeline: a compiled model bound to a tokenizer
//!
//! The pipeline is the task-specific callable of the latency probe: encode
//! the prompt, run the compiled model's greedy loop, decode the continuation.
//! Exactly one synchronous request per call, no batching, no retries.

use serde::Serialize;

use crate::error::{ForgeProbeError, ProbeResult};
use crate::pretrained::PretrainedModel;
use crate::tokenizer::TokenizerAdapter;

/// Default number of tokens a pipeline generates per request
pub const DEFAULT_MAX_NEW_TOKENS: usize = 16;

/// Task name the pipeline factory recognizes
pub const TEXT_GENERATION_TASK: &str = "text-generation";

/// Build a task pipeline from a compiled model and tokenizer
///
/// Only the `"text-generation"` task exists; anything else is a
/// configuration error.
pub fn pipeline(
    task: &str,
    model: PretrainedModel,
    tokenizer: TokenizerAdapter,
) -> ProbeResult<TextGenerationPipeline> {
    if task != TEXT_GENERATION_TASK {
        return Err(ForgeProbeError::InvalidConfiguration(format!(
            "unknown pipeline task: {}",
            task
        )));
    }
    TextGenerationPipeline::new(model, tokenizer)
}

/// Output of one generation request
#[derive(Debug, Clone, Serialize)]
pub struct GenerationOutput {
    /// Prompt plus generated continuation
    pub generated_text: String,
    /// Tokens the prompt encoded to
    pub prompt_tokens: usize,
    /// Tokens generated
    pub generated_tokens: usize,
}

/// Bound combination of compiled model and tokenizer
#[derive(Debug)]
pub struct TextGenerationPipeline {
    model: PretrainedModel,
    tokenizer: TokenizerAdapter,
    max_new_tokens: usize,
}

impl TextGenerationPipeline {
    /// Bind a compiled model and tokenizer
    ///
    /// The model must already be compiled; deferring compilation past
    /// pipeline construction is an error.
    pub fn new(model: PretrainedModel, tokenizer: TokenizerAdapter) -> ProbeResult<Self> {
        if !model.is_compiled() {
            return Err(ForgeProbeError::ModelNotCompiled);
        }
        Ok(TextGenerationPipeline {
            model,
            tokenizer,
            max_new_tokens: DEFAULT_MAX_NEW_TOKENS,
        })
    }

    /// Set the number of tokens generated per request
    pub fn with_max_new_tokens(mut self, max_new_tokens: usize) -> Self {
        self.max_new_tokens = max_new_tokens;
        self
    }

    /// Run one generation request
    ///
    /// Returns prompt + continuation; non-empty for any non-empty prompt.
    pub fn generate(&self, prompt: &str) -> ProbeResult<GenerationOutput> {
        if prompt.is_empty() {
            return Err(ForgeProbeError::EmptyPrompt);
        }

        let prompt_ids = self.tokenizer.encode(prompt);
        if prompt_ids.is_empty() {
            return Err(ForgeProbeError::GenerationFailed(
                "prompt encoded to no tokens".to_string(),
            ));
        }

        let compiled = self.model.compiled()?;
        let raw_ids = compiled.generate(&prompt_ids, self.max_new_tokens);

        // The model's vocabulary may be larger than the tokenizer's; clamp
        // ids into decodable range.
        let vocab = self.tokenizer.vocab_size();
        let new_ids: Vec<u32> = raw_ids.iter().map(|&id| id % vocab).collect();
        let continuation = self.tokenizer.decode(&new_ids);

        Ok(GenerationOutput {
            generated_text: format!("{}{}", prompt, continuation),
            prompt_tokens: prompt_ids.len(),
            generated_tokens: new_ids.len(),
        })
    }
}
