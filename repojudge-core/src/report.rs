//! Report formatting for evaluation outcomes.

use std::fmt::Write;

use serde::{Deserialize, Serialize};

use crate::domain::{EvaluationResult, Feedback, StructureReport};

/// How the evaluated checkout was obtained.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "message", rename_all = "snake_case")]
pub enum EvaluationStatus {
    /// Repository was cloned into a transient workspace.
    Cloned,
    /// An existing local directory was evaluated.
    Local,
    /// Evaluation could not run, with the cause.
    Failed(String),
}

/// Outcome of evaluating one target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    /// Repository URL or local path.
    pub source: String,
    /// How the checkout was obtained.
    pub status: EvaluationStatus,
    /// The evaluation result, absent on failure.
    pub result: Option<EvaluationResult>,
}

impl EvaluationReport {
    /// Wrap a finished evaluation.
    pub fn new(source: String, status: EvaluationStatus, result: EvaluationResult) -> Self {
        Self {
            source,
            status,
            result: Some(result),
        }
    }

    /// Create a report for a target that could not be evaluated.
    pub fn failed(source: String, error: impl Into<String>) -> Self {
        Self {
            source,
            status: EvaluationStatus::Failed(error.into()),
            result: None,
        }
    }
}

/// Render evaluation reports as Markdown.
pub fn render_evaluation_markdown(reports: &[EvaluationReport]) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "# Repository Evaluation Report\n");
    for report in reports {
        let _ = writeln!(output, "## {}\n", report.source);
        append_status(&mut output, &report.status);
        if let Some(result) = &report.result {
            append_scores(&mut output, result);
            append_structure(&mut output, &result.structure);
            append_feedback(&mut output, &result.feedback);
            append_list(
                &mut output,
                "Model feedback",
                &result.llm.feedback,
                "No model feedback.",
            );
            append_list(
                &mut output,
                "Complexity issues",
                &result
                    .complexity_issues
                    .iter()
                    .map(|issue| {
                        format!(
                            "`{}` in {} ({} {})",
                            issue.function, issue.file, issue.kind, issue.complexity
                        )
                    })
                    .collect::<Vec<_>>(),
                "No complexity issues found.",
            );
            append_list(&mut output, "Warnings", &result.warnings, "No warnings.");
        }
        let _ = writeln!(output);
    }
    output
}

/// Render any serializable report payload as JSON.
pub fn render_json<T: Serialize + ?Sized>(payload: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(payload)
}

fn append_status(output: &mut String, status: &EvaluationStatus) {
    match status {
        EvaluationStatus::Cloned => {
            let _ = writeln!(output, "- Status: cloned");
        }
        EvaluationStatus::Local => {
            let _ = writeln!(output, "- Status: local");
        }
        EvaluationStatus::Failed(error) => {
            let _ = writeln!(output, "- Status: failed ({error})");
        }
    }
    let _ = writeln!(output);
}

fn append_scores(output: &mut String, result: &EvaluationResult) {
    let _ = writeln!(output, "### Scores");
    let _ = writeln!(output, "- Final score: {:.2}", result.final_score);
    let _ = writeln!(output, "- Duplication: {:.2}%", result.duplication_percent);
    let _ = writeln!(output, "- Lint score: {:.2}/10", result.lint_score);
    let _ = writeln!(output, "- Logic: {:.1}", result.llm.logic);
    let _ = writeln!(output, "- Relevance: {:.1}", result.llm.relevance);
    let _ = writeln!(output, "- Style: {:.1}", result.llm.style);
    let _ = writeln!(output, "- Structure bonus: {:.1}", result.structure_score);
    let _ = writeln!(
        output,
        "- Chunks: {} collected, {} scored\n",
        result.chunk_count, result.llm.evaluated_chunks
    );
}

fn append_structure(output: &mut String, structure: &StructureReport) {
    let mark = |present: bool| if present { "yes" } else { "no" };
    let _ = writeln!(output, "### Structure");
    let _ = writeln!(output, "- README: {}", mark(structure.has_readme));
    let _ = writeln!(output, "- Dependency manifest: {}", mark(structure.has_requirements));
    let _ = writeln!(output, "- Container definition: {}", mark(structure.has_dockerfile));
    let _ = writeln!(output, "- CI workflow: {}", mark(structure.has_ci));
    let _ = writeln!(output, "- Tests: {}", mark(structure.has_tests));
    let _ = writeln!(
        output,
        "- Files: {}, directories: {}\n",
        structure.file_count, structure.dir_count
    );
}

fn append_feedback(output: &mut String, feedback: &Feedback) {
    let _ = writeln!(output, "### Overall\n{}\n", feedback.overall_impression);
    append_list(output, "Strengths", &feedback.strengths, "None noted.");
    append_list(output, "Weaknesses", &feedback.weaknesses, "None noted.");
    append_list(
        output,
        "Recommendations",
        &feedback.recommendations,
        "None noted.",
    );
}

fn append_list(output: &mut String, title: &str, items: &[String], empty_message: &str) {
    if items.is_empty() {
        let _ = writeln!(output, "### {title}\n{empty_message}\n");
        return;
    }
    let _ = writeln!(output, "### {title}");
    for item in items {
        let _ = writeln!(output, "- {item}");
    }
    let _ = writeln!(output);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ComplexityIssue, LlmAssessment};

    fn sample_result() -> EvaluationResult {
        EvaluationResult {
            source: "https://example.com/team/repo.git".to_string(),
            chunk_count: 8,
            complexity_report: Default::default(),
            complexity_issues: vec![ComplexityIssue {
                file: "app.py".to_string(),
                function: "handler".to_string(),
                complexity: 12,
                kind: "function".to_string(),
            }],
            lint_score: 7.5,
            duplication_percent: 3.25,
            structure: StructureReport {
                has_readme: true,
                file_count: 12,
                dir_count: 2,
                ..StructureReport::default()
            },
            structure_score: 21.2,
            llm: LlmAssessment {
                logic: 80.0,
                relevance: 70.0,
                style: 65.0,
                feedback: vec!["Readable handlers".to_string()],
                evaluated_chunks: 5,
            },
            final_score: 76.41,
            feedback: Feedback {
                strengths: vec!["Well-documented with README".to_string()],
                weaknesses: vec!["No test files detected".to_string()],
                recommendations: vec!["Add unit tests to ensure code reliability".to_string()],
                overall_impression: "Good project with some areas for improvement".to_string(),
            },
            warnings: vec!["duplication check failed: npx is not installed".to_string()],
        }
    }

    #[test]
    fn renders_evaluation_markdown() {
        let report = EvaluationReport::new(
            "https://example.com/team/repo.git".to_string(),
            EvaluationStatus::Cloned,
            sample_result(),
        );
        let output = render_evaluation_markdown(&[report]);
        assert!(output.contains("# Repository Evaluation Report"));
        assert!(output.contains("Status: cloned"));
        assert!(output.contains("Final score: 76.41"));
        assert!(output.contains("Chunks: 8 collected, 5 scored"));
        assert!(output.contains("- README: yes"));
        assert!(output.contains("`handler` in app.py (function 12)"));
        assert!(output.contains("npx is not installed"));
        assert!(output.contains("Readable handlers"));
    }

    #[test]
    fn renders_failed_report_without_result() {
        let report = EvaluationReport::failed("repo".to_string(), "clone failed: boom");
        let output = render_evaluation_markdown(&[report]);
        assert!(output.contains("Status: failed (clone failed: boom)"));
        assert!(!output.contains("### Scores"));
    }

    #[test]
    fn renders_json_payload() {
        let report = EvaluationReport::new(
            "repo".to_string(),
            EvaluationStatus::Local,
            sample_result(),
        );
        let json = render_json(&vec![report]).expect("json");
        let parsed: serde_json::Value = serde_json::from_str(&json).expect("parse");
        assert!(parsed.is_array());
        let mut keys: Vec<&str> = parsed[0]
            .as_object()
            .expect("report object")
            .keys()
            .map(String::as_str)
            .collect();
        keys.sort_unstable();
        assert_eq!(keys, vec!["result", "source", "status"]);
        assert_eq!(parsed[0]["status"]["status"], "local");
        assert_eq!(parsed[0]["result"]["final_score"], 76.41);
    }
}
