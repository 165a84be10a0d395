//! Domain entities for repojudge.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Hackathon bookkeeping attached to a submission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionContext {
    /// Hackathon identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hackathon_id: Option<String>,
    /// Team identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_id: Option<String>,
    /// Team join code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_code: Option<String>,
}

/// A request to evaluate one repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationRequest {
    /// Remote repository URL (or local path for local evaluations).
    pub repository_url: String,
    /// Free-text description of what the project is supposed to do.
    pub project_description: String,
    /// Optional submission metadata carried to the result sink.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submission: Option<SubmissionContext>,
}

impl EvaluationRequest {
    /// Create a request without submission metadata.
    pub fn new(repository_url: impl Into<String>, project_description: impl Into<String>) -> Self {
        Self {
            repository_url: repository_url.into(),
            project_description: project_description.into(),
            submission: None,
        }
    }

    /// Attach submission metadata.
    pub fn with_submission(mut self, submission: SubmissionContext) -> Self {
        self.submission = Some(submission);
        self
    }
}

/// A bounded window of a source file's lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceChunk {
    /// File path relative to the repository root, `/`-separated.
    pub origin_file: String,
    /// 1-based inclusive line range covered by `text`.
    pub line_range: (usize, usize),
    /// The lines of the window joined with `\n`.
    pub text: String,
}

impl SourceChunk {
    /// Render the chunk with its provenance header, as submitted for scoring.
    pub fn render(&self) -> String {
        format!(
            "# FILE: {} (lines {}-{})\n{}",
            self.origin_file, self.line_range.0, self.line_range.1, self.text
        )
    }
}

/// One function entry from the complexity reporter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionComplexity {
    /// Function, method or class name.
    #[serde(default = "unknown")]
    pub name: String,
    /// Cyclomatic complexity.
    #[serde(default)]
    pub complexity: u32,
    /// Block kind reported by the tool (function, method, class).
    #[serde(rename = "type", default = "unknown")]
    pub kind: String,
    /// Letter rank reported by the tool.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rank: Option<String>,
    /// Starting line number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lineno: Option<u32>,
}

fn unknown() -> String {
    "unknown".to_string()
}

/// Complexity entries keyed by file path.
pub type ComplexityReport = BTreeMap<String, Vec<FunctionComplexity>>;

/// A function whose complexity exceeds the reporting threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplexityIssue {
    /// File containing the function.
    pub file: String,
    /// Function name.
    pub function: String,
    /// Cyclomatic complexity.
    pub complexity: u32,
    /// Block kind reported by the tool.
    pub kind: String,
}

/// Repository hygiene flags and size counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructureReport {
    /// A README file exists.
    pub has_readme: bool,
    /// A dependency manifest exists.
    pub has_requirements: bool,
    /// A container definition exists.
    pub has_dockerfile: bool,
    /// A CI workflow definition exists.
    pub has_ci: bool,
    /// Files live under a test directory.
    pub has_tests: bool,
    /// Number of non-hidden files.
    pub file_count: usize,
    /// Number of non-hidden directories below the root.
    pub dir_count: usize,
}

/// Averaged LLM axis scores across evaluated chunks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmAssessment {
    /// Logic quality, 0-100.
    pub logic: f64,
    /// Relevance to the project description, 0-100.
    pub relevance: f64,
    /// Style and readability, 0-100.
    pub style: f64,
    /// One feedback line per evaluated chunk, or a single explanatory note.
    pub feedback: Vec<String>,
    /// Number of chunks submitted to the model.
    pub evaluated_chunks: usize,
}

/// Qualitative feedback derived from the metrics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feedback {
    /// Things the project does well.
    pub strengths: Vec<String>,
    /// Things that pull the score down.
    pub weaknesses: Vec<String>,
    /// Suggested next steps.
    pub recommendations: Vec<String>,
    /// One-line verdict derived from the final score.
    pub overall_impression: String,
}

/// Complete outcome of one repository evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    /// Repository URL or local path that was evaluated.
    pub source: String,
    /// Number of source chunks collected.
    pub chunk_count: usize,
    /// Raw complexity entries.
    pub complexity_report: ComplexityReport,
    /// Functions above the complexity threshold.
    pub complexity_issues: Vec<ComplexityIssue>,
    /// Lint score, 0-10.
    pub lint_score: f64,
    /// Duplicated code percentage, 0-100.
    pub duplication_percent: f64,
    /// Repository structure flags.
    pub structure: StructureReport,
    /// Structure bonus before weighting.
    pub structure_score: f64,
    /// LLM axis scores.
    pub llm: LlmAssessment,
    /// Weighted final score.
    pub final_score: f64,
    /// Synthesized feedback.
    pub feedback: Feedback,
    /// Causes of any sub-score that fell back to its default.
    pub warnings: Vec<String>,
}

/// A persisted evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRecord {
    /// Record identifier.
    pub id: Uuid,
    /// When the evaluation finished.
    pub evaluated_at: DateTime<Utc>,
    /// The originating request.
    pub request: EvaluationRequest,
    /// The evaluation outcome.
    pub result: EvaluationResult,
}

impl EvaluationRecord {
    /// Stamp a new record for a finished evaluation.
    pub fn new(request: EvaluationRequest, result: EvaluationResult) -> Self {
        Self {
            id: Uuid::new_v4(),
            evaluated_at: Utc::now(),
            request,
            result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_render_prefixes_provenance_header() {
        let chunk = SourceChunk {
            origin_file: "src/app.py".to_string(),
            line_range: (1, 2),
            text: "import os\nprint(os.name)".to_string(),
        };
        assert_eq!(
            chunk.render(),
            "# FILE: src/app.py (lines 1-2)\nimport os\nprint(os.name)"
        );
    }

    #[test]
    fn function_complexity_fills_defaults() {
        let entry: FunctionComplexity =
            serde_json::from_str(r#"{"complexity": 9}"#).expect("parse entry");
        assert_eq!(entry.name, "unknown");
        assert_eq!(entry.kind, "unknown");
        assert_eq!(entry.complexity, 9);
        assert!(entry.rank.is_none());
    }

    #[test]
    fn request_omits_missing_submission() {
        let request = EvaluationRequest::new("https://example.com/repo.git", "demo");
        let json = serde_json::to_value(&request).expect("serialize");
        assert!(json.get("submission").is_none());

        let request = request.with_submission(SubmissionContext {
            hackathon_id: Some("hack-1".to_string()),
            team_id: None,
            team_code: Some("ABC123".to_string()),
        });
        let json = serde_json::to_value(&request).expect("serialize");
        assert_eq!(json["submission"]["hackathon_id"], "hack-1");
        assert!(json["submission"].get("team_id").is_none());
    }
}
