//! Weighted score aggregation and threshold-driven feedback.

use crate::domain::{Feedback, StructureReport};

const WEIGHT_ORIGINALITY: f64 = 0.30;
const WEIGHT_LOGIC: f64 = 0.25;
const WEIGHT_RELEVANCE: f64 = 0.20;
const WEIGHT_STYLE: f64 = 0.10;
const WEIGHT_LINT: f64 = 0.10;
const WEIGHT_STRUCTURE: f64 = 0.05;

/// Sub-scores combined into the final score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreInputs {
    /// Duplicated code percentage, `[0, 100]`.
    pub duplication_percent: f64,
    /// LLM logic score.
    pub logic: f64,
    /// LLM relevance score.
    pub relevance: f64,
    /// LLM style score.
    pub style: f64,
    /// Lint score, `[0, 10]`.
    pub lint_score: f64,
    /// Structure bonus from [`structure_score`].
    pub structure_score: f64,
}

/// Structure bonus. The sum is not clamped; only the file-count bonus is bounded.
pub fn structure_score(report: &StructureReport) -> f64 {
    let flag = |present: bool, points: f64| if present { points } else { 0.0 };
    flag(report.has_readme, 20.0)
        + flag(report.has_requirements, 20.0)
        + flag(report.has_tests, 15.0)
        + flag(report.has_dockerfile, 15.0)
        + flag(report.has_ci, 10.0)
        + (report.file_count as f64 / 10.0).min(20.0)
}

/// Weighted final score rounded to two decimals.
pub fn aggregate(inputs: &ScoreInputs) -> f64 {
    let total = (100.0 - inputs.duplication_percent) * WEIGHT_ORIGINALITY
        + inputs.logic * WEIGHT_LOGIC
        + inputs.relevance * WEIGHT_RELEVANCE
        + inputs.style * WEIGHT_STYLE
        + (inputs.lint_score * 10.0) * WEIGHT_LINT
        + inputs.structure_score * WEIGHT_STRUCTURE;
    (total * 100.0).round() / 100.0
}

/// One-line verdict for a final score.
pub fn overall_impression(final_score: f64) -> &'static str {
    if final_score >= 85.0 {
        "Excellent project with strong implementation"
    } else if final_score >= 70.0 {
        "Good project with some areas for improvement"
    } else if final_score >= 50.0 {
        "Average project needing significant improvements"
    } else {
        "Project requires major refactoring and improvements"
    }
}

/// Derive strengths, weaknesses and recommendations from fixed thresholds.
pub fn synthesize_feedback(
    inputs: &ScoreInputs,
    structure: &StructureReport,
    complexity_issue_count: usize,
    final_score: f64,
) -> Feedback {
    let mut feedback = Feedback {
        overall_impression: overall_impression(final_score).to_string(),
        ..Feedback::default()
    };

    if inputs.lint_score >= 7.0 {
        feedback
            .strengths
            .push("Good code quality with high lint score".to_string());
    }
    if inputs.duplication_percent < 5.0 {
        feedback
            .strengths
            .push("Low duplication indicates original work".to_string());
    }
    if inputs.logic >= 70.0 {
        feedback
            .strengths
            .push("Strong logical implementation".to_string());
    }
    if structure.has_readme {
        feedback
            .strengths
            .push("Well-documented with README".to_string());
    }
    if structure.has_requirements {
        feedback
            .strengths
            .push("Good dependency management".to_string());
    }

    if complexity_issue_count > 0 {
        feedback.weaknesses.push(format!(
            "High complexity in {complexity_issue_count} functions"
        ));
    }
    if inputs.lint_score < 5.0 {
        feedback
            .weaknesses
            .push("Low code quality score needs improvement".to_string());
    }
    if !structure.has_tests {
        feedback
            .weaknesses
            .push("No test files detected".to_string());
    }
    if inputs.style < 60.0 {
        feedback
            .weaknesses
            .push("Code style and readability need improvement".to_string());
    }

    if complexity_issue_count > 0 {
        feedback
            .recommendations
            .push("Refactor complex functions to improve maintainability".to_string());
    }
    if !structure.has_tests {
        feedback
            .recommendations
            .push("Add unit tests to ensure code reliability".to_string());
    }
    if inputs.style < 70.0 {
        feedback
            .recommendations
            .push("Improve code formatting and add comments".to_string());
    }
    if !structure.has_ci {
        feedback
            .recommendations
            .push("Consider adding a CI workflow".to_string());
    }
    if inputs.lint_score < 5.0 {
        feedback
            .recommendations
            .push("Address linter warnings to raise the code quality score".to_string());
    }

    feedback
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    fn inputs() -> ScoreInputs {
        ScoreInputs {
            duplication_percent: 10.0,
            logic: 80.0,
            relevance: 70.0,
            style: 60.0,
            lint_score: 8.0,
            structure_score: 75.0,
        }
    }

    #[test]
    fn aggregate_matches_weighted_sum() {
        approx_eq(aggregate(&inputs()), 78.75);
    }

    #[test]
    fn aggregate_rounds_to_two_decimals() {
        let score = aggregate(&ScoreInputs {
            logic: 100.0 / 3.0,
            ..inputs()
        });
        approx_eq(score, 67.08);
    }

    #[test]
    fn all_defaults_still_produce_a_score() {
        let score = aggregate(&ScoreInputs {
            duplication_percent: 0.0,
            logic: 50.0,
            relevance: 50.0,
            style: 50.0,
            lint_score: 0.0,
            structure_score: 0.0,
        });
        approx_eq(score, 57.5);
    }

    #[test]
    fn structure_score_example() {
        let report = StructureReport {
            has_readme: true,
            has_requirements: true,
            file_count: 50,
            ..StructureReport::default()
        };
        approx_eq(structure_score(&report), 45.0);
    }

    #[test]
    fn structure_score_sums_every_component() {
        let report = StructureReport {
            has_readme: true,
            has_requirements: true,
            has_dockerfile: true,
            has_ci: true,
            has_tests: true,
            file_count: 1_000,
            dir_count: 40,
        };
        approx_eq(structure_score(&report), 100.0);
        approx_eq(
            structure_score(&StructureReport {
                file_count: 7,
                ..StructureReport::default()
            }),
            0.7,
        );
    }

    #[test]
    fn impression_ladder_boundaries() {
        assert_eq!(
            overall_impression(85.0),
            "Excellent project with strong implementation"
        );
        assert_eq!(
            overall_impression(84.99),
            "Good project with some areas for improvement"
        );
        assert_eq!(
            overall_impression(50.0),
            "Average project needing significant improvements"
        );
        assert_eq!(
            overall_impression(49.99),
            "Project requires major refactoring and improvements"
        );
    }

    #[test]
    fn missing_tests_yield_weakness_and_recommendation() {
        let structure = StructureReport {
            has_readme: true,
            ..StructureReport::default()
        };
        let feedback = synthesize_feedback(&inputs(), &structure, 2, 78.75);

        assert!(feedback.weaknesses.contains(&"No test files detected".to_string()));
        assert!(
            feedback
                .recommendations
                .contains(&"Add unit tests to ensure code reliability".to_string())
        );
        assert!(
            feedback
                .weaknesses
                .contains(&"High complexity in 2 functions".to_string())
        );
        assert!(
            feedback
                .strengths
                .contains(&"Well-documented with README".to_string())
        );
        assert!(
            feedback
                .strengths
                .contains(&"Strong logical implementation".to_string())
        );
        assert_eq!(
            feedback.overall_impression,
            "Good project with some areas for improvement"
        );
    }

    #[test]
    fn healthy_project_has_no_weaknesses() {
        let structure = StructureReport {
            has_readme: true,
            has_requirements: true,
            has_tests: true,
            has_ci: true,
            ..StructureReport::default()
        };
        let healthy = ScoreInputs {
            duplication_percent: 1.0,
            style: 90.0,
            ..inputs()
        };

        let feedback = synthesize_feedback(&healthy, &structure, 0, 90.0);

        assert!(feedback.weaknesses.is_empty());
        assert!(feedback.recommendations.is_empty());
        assert_eq!(feedback.strengths.len(), 5);
    }
}
