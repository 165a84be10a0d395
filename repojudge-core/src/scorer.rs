//! Per-chunk LLM scoring and averaging.

use std::sync::Arc;

use crate::config::LlmConfig;
use crate::domain::{LlmAssessment, SourceChunk};
use crate::llm::{ChatModel, OpenAiChatClient};
use crate::verdict::{ChunkVerdict, parse_verdict};

const NEUTRAL: f64 = 50.0;

const SYSTEM_PROMPT: &str = "You are a hackathon code evaluator. Analyze the code snippet you are given \
and score it against the project description.

EVALUATION CRITERIA:
1. Logic Quality (0-100): How well does the code implement its intended functionality? Is it efficient and bug-free?
2. Relevance (0-100): How relevant is this code to the project description? Does it align with the project goals?
3. Style & Readability (0-100): How clean, well-structured, and readable is the code? Includes naming, comments, structure.

Return ONLY a valid JSON object with this exact structure:
{\"logic\": 85, \"relevance\": 90, \"style\": 75, \"feedback\": \"Brief specific feedback about this code snippet\"}

Do not include any other text, explanations, or markdown formatting.";

enum Backend {
    Available(Arc<dyn ChatModel + Send + Sync>),
    Unavailable(String),
}

/// Scores source chunks with a chat model, degrading to neutral scores.
pub struct LlmScorer {
    backend: Backend,
    max_chunks: usize,
    max_chunk_chars: usize,
}

impl LlmScorer {
    /// Build a scorer backed by the configured OpenAI-compatible endpoint.
    ///
    /// A missing API key or a client that cannot be constructed leaves the
    /// scorer unavailable rather than failing.
    pub fn from_config(config: &LlmConfig) -> Self {
        let backend = if config.api_key.is_none() {
            Backend::Unavailable("LLM evaluation skipped - API key not set".to_string())
        } else {
            match OpenAiChatClient::from_config(config) {
                Ok(client) => Backend::Available(Arc::new(client)),
                Err(err) => Backend::Unavailable(format!("LLM initialization failed: {err}")),
            }
        };
        Self {
            backend,
            max_chunks: config.max_chunks,
            max_chunk_chars: config.max_chunk_chars,
        }
    }

    /// Build a scorer over an explicit model.
    pub fn with_model(model: Arc<dyn ChatModel + Send + Sync>, config: &LlmConfig) -> Self {
        Self {
            backend: Backend::Available(model),
            max_chunks: config.max_chunks,
            max_chunk_chars: config.max_chunk_chars,
        }
    }

    /// Build a scorer that always returns the neutral default with `reason`.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        let defaults = LlmConfig::default();
        Self {
            backend: Backend::Unavailable(reason.into()),
            max_chunks: defaults.max_chunks,
            max_chunk_chars: defaults.max_chunk_chars,
        }
    }

    /// Why the scorer cannot reach a model, if it cannot.
    pub fn unavailable_reason(&self) -> Option<&str> {
        match &self.backend {
            Backend::Available(_) => None,
            Backend::Unavailable(reason) => Some(reason),
        }
    }

    /// Score the leading chunks and average each axis.
    pub async fn score(&self, description: &str, chunks: &[SourceChunk]) -> LlmAssessment {
        let model = match &self.backend {
            Backend::Available(model) => model,
            Backend::Unavailable(reason) => return neutral(vec![reason.clone()], 0),
        };
        if chunks.is_empty() {
            return neutral(vec!["No code chunks evaluated".to_string()], 0);
        }

        let selected = &chunks[..chunks.len().min(self.max_chunks)];
        let mut verdicts = Vec::with_capacity(selected.len());
        for (index, chunk) in selected.iter().enumerate() {
            let snippet = truncate_chars(&chunk.render(), self.max_chunk_chars);
            let prompt = user_prompt(description, &snippet);
            let verdict = match model.complete(SYSTEM_PROMPT, &prompt).await {
                Ok(reply) => parse_verdict(&reply).unwrap_or_else(|failure| {
                    log::warn!(
                        "unparseable verdict for chunk {index} ({}): {}",
                        chunk.origin_file,
                        failure.raw
                    );
                    neutral_verdict(format!("LLM response parsing failed: {failure}"))
                }),
                Err(err) => {
                    log::warn!("llm evaluation failed for chunk {index}: {err}");
                    neutral_verdict(format!("Evaluation error: {err}"))
                }
            };
            verdicts.push(verdict);
        }

        average(verdicts)
    }
}

fn user_prompt(description: &str, snippet: &str) -> String {
    format!("PROJECT DESCRIPTION:\n{description}\n\nCODE SNIPPET:\n{snippet}")
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

fn neutral_verdict(feedback: String) -> ChunkVerdict {
    ChunkVerdict {
        logic: NEUTRAL,
        relevance: NEUTRAL,
        style: NEUTRAL,
        feedback,
    }
}

fn neutral(feedback: Vec<String>, evaluated_chunks: usize) -> LlmAssessment {
    LlmAssessment {
        logic: NEUTRAL,
        relevance: NEUTRAL,
        style: NEUTRAL,
        feedback,
        evaluated_chunks,
    }
}

fn average(verdicts: Vec<ChunkVerdict>) -> LlmAssessment {
    let count = verdicts.len() as f64;
    let mean = |axis: fn(&ChunkVerdict) -> f64| verdicts.iter().map(axis).sum::<f64>() / count;
    LlmAssessment {
        logic: mean(|v| v.logic),
        relevance: mean(|v| v.relevance),
        style: mean(|v| v.style),
        evaluated_chunks: verdicts.len(),
        feedback: verdicts.into_iter().map(|v| v.feedback).collect(),
    }
}
