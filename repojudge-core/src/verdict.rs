//! Extraction of a structured verdict from free-form model output.

use std::fmt;

const DEFAULT_AXIS: f64 = 50.0;
const DEFAULT_FEEDBACK: &str = "No specific feedback provided";

/// Scores and comment the model gave one chunk.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkVerdict {
    /// Logic quality, `[0, 100]`.
    pub logic: f64,
    /// Relevance to the description, `[0, 100]`.
    pub relevance: f64,
    /// Style and readability, `[0, 100]`.
    pub style: f64,
    /// Free-text comment.
    pub feedback: String,
}

/// A response that did not contain a usable verdict.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseFailure {
    /// The response as received.
    pub raw: String,
    /// What was wrong with it.
    pub reason: String,
}

impl fmt::Display for ParseFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.reason)
    }
}

impl std::error::Error for ParseFailure {}

/// Return the contents of the first fenced block, or the trimmed text when unfenced.
///
/// Handles a `json`-tagged fence, a bare fence and a fence carrying any
/// other language tag on its opening line.
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(open) = trimmed.find("```") else {
        return trimmed;
    };
    let mut body = &trimmed[open + 3..];
    if let Some(rest) = body.strip_prefix("json") {
        body = rest;
    } else if let Some(newline) = body.find('\n') {
        let tag = body[..newline].trim();
        if !tag.is_empty() && !tag.contains(['{', '[']) {
            body = &body[newline + 1..];
        }
    }
    let end = body.find("```").unwrap_or(body.len());
    body[..end].trim()
}

/// Parse a model response into a verdict.
pub fn parse_verdict(text: &str) -> Result<ChunkVerdict, ParseFailure> {
    let failure = |reason: String| ParseFailure {
        raw: text.to_string(),
        reason,
    };

    let payload = strip_code_fence(text);
    let value: serde_json::Value =
        serde_json::from_str(payload).map_err(|err| failure(err.to_string()))?;
    let object = value
        .as_object()
        .ok_or_else(|| failure("expected a JSON object".to_string()))?;

    let axis = |name: &str| -> Result<f64, ParseFailure> {
        match object.get(name) {
            None | Some(serde_json::Value::Null) => Ok(DEFAULT_AXIS),
            Some(serde_json::Value::Number(number)) => number
                .as_f64()
                .map(clamp_axis)
                .ok_or_else(|| failure(format!("{name} is not a finite number"))),
            Some(serde_json::Value::String(raw)) => raw
                .trim()
                .parse::<f64>()
                .map(clamp_axis)
                .map_err(|_| failure(format!("{name} is not numeric: {raw:?}"))),
            Some(other) => Err(failure(format!("{name} is not numeric: {other}"))),
        }
    };

    let feedback = match object.get("feedback") {
        Some(serde_json::Value::String(text)) => text.clone(),
        None | Some(serde_json::Value::Null) => DEFAULT_FEEDBACK.to_string(),
        Some(other) => other.to_string(),
    };

    Ok(ChunkVerdict {
        logic: axis("logic")?,
        relevance: axis("relevance")?,
        style: axis("style")?,
        feedback,
    })
}

fn clamp_axis(value: f64) -> f64 {
    value.clamp(0.0, 100.0)
}
