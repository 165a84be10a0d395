//! Complexity and lint analysis through external Python tooling.

use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use crate::domain::{ComplexityIssue, ComplexityReport, FunctionComplexity};
use crate::fs::FileSystem;
use crate::tools::{ToolInvocation, ToolRunner};

const RATING_PREFIX: &str = "Your code has been rated at ";
const PYLINT_ACCEPTED_CODES: &[i32] = &[0, 4, 8, 16, 32];

/// Outcome of the complexity and lint passes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StaticAnalysis {
    /// Per-file complexity entries, empty when the reporter failed.
    pub complexity_report: ComplexityReport,
    /// Lint score in `[0, 10]`, `0.0` when linting did not produce a rating.
    pub lint_score: f64,
    /// Functions above the complexity threshold.
    pub complexity_issues: Vec<ComplexityIssue>,
    /// Why any part fell back to its default.
    pub warnings: Vec<String>,
}

/// Runs `radon` and `pylint` against a checkout.
pub struct StaticAnalyzer<'a> {
    tools: &'a (dyn ToolRunner + Send + Sync),
    timeout: Duration,
    complexity_threshold: u32,
    lint_sample_size: usize,
}

impl<'a> StaticAnalyzer<'a> {
    /// Create an analyzer over the given tool runner.
    pub fn new(
        tools: &'a (dyn ToolRunner + Send + Sync),
        timeout: Duration,
        complexity_threshold: u32,
        lint_sample_size: usize,
    ) -> Self {
        Self {
            tools,
            timeout,
            complexity_threshold,
            lint_sample_size,
        }
    }

    /// Run both passes. Never fails; problems are recorded as warnings.
    pub async fn analyze<F: FileSystem + ?Sized>(&self, fs: &F, root: &Path) -> StaticAnalysis {
        let mut analysis = StaticAnalysis::default();

        match self.complexity(root).await {
            Ok(report) => {
                analysis.complexity_issues = complexity_issues(&report, self.complexity_threshold);
                analysis.complexity_report = report;
            }
            Err(warning) => {
                log::warn!("{warning}");
                analysis.warnings.push(warning);
            }
        }

        let sample = match python_sample(fs, root, self.lint_sample_size) {
            Ok(sample) => sample,
            Err(warning) => {
                log::warn!("{warning}");
                analysis.warnings.push(warning);
                Vec::new()
            }
        };
        if !sample.is_empty() {
            match self.lint(&sample).await {
                Ok(score) => analysis.lint_score = score,
                Err(warning) => {
                    log::warn!("{warning}");
                    analysis.warnings.push(warning);
                }
            }
        }

        analysis
    }

    async fn complexity(&self, root: &Path) -> Result<ComplexityReport, String> {
        let invocation = ToolInvocation::new(
            "radon",
            vec![
                "cc".to_string(),
                root.display().to_string(),
                "-s".to_string(),
                "-j".to_string(),
            ],
            self.timeout,
        );
        let output = self
            .tools
            .invoke(&invocation)
            .await
            .map_err(|err| format!("complexity analysis failed: {err}"))?;
        if !output.success() {
            return Err(format!(
                "complexity analysis failed: radon exited with {:?}",
                output.code
            ));
        }
        let mut report = parse_complexity_report(&output.stdout)
            .map_err(|err| format!("complexity analysis failed: {err}"))?;
        report.retain(|file, _| !under_hidden_dir(root, file));
        Ok(report)
    }

    async fn lint(&self, sample: &[PathBuf]) -> Result<f64, String> {
        let mut args: Vec<String> = sample
            .iter()
            .map(|path| path.display().to_string())
            .collect();
        args.push("--score=y".to_string());
        let invocation = ToolInvocation::new("pylint", args, self.timeout);

        let output = self
            .tools
            .invoke(&invocation)
            .await
            .map_err(|err| format!("lint analysis failed: {err}"))?;
        if !output.exited_with_any(PYLINT_ACCEPTED_CODES) {
            return Err(format!(
                "lint analysis failed: pylint exited with {:?}",
                output.code
            ));
        }
        parse_lint_rating(&output.stdout)
            .ok_or_else(|| "lint analysis failed: no rating in pylint output".to_string())
    }
}

/// Decode radon's JSON. Per-file values that are not entry lists and
/// entries that do not decode are skipped.
pub fn parse_complexity_report(stdout: &str) -> Result<ComplexityReport, serde_json::Error> {
    let raw: serde_json::Map<String, serde_json::Value> = serde_json::from_str(stdout)?;
    let mut report = ComplexityReport::new();
    for (file, value) in raw {
        let serde_json::Value::Array(values) = value else {
            continue;
        };
        let mut entries = Vec::with_capacity(values.len());
        for value in values {
            match serde_json::from_value::<FunctionComplexity>(value) {
                Ok(entry) => entries.push(entry),
                Err(err) => log::debug!("skipping complexity entry in {file}: {err}"),
            }
        }
        report.insert(file, entries);
    }
    Ok(report)
}

/// Whether `file`, taken relative to `root`, sits below a dot-prefixed directory.
pub fn under_hidden_dir(root: &Path, file: &str) -> bool {
    let path = Path::new(file);
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative.parent().is_some_and(|dir| {
        dir.components().any(|component| match component {
            Component::Normal(name) => name.to_string_lossy().starts_with('.'),
            _ => false,
        })
    })
}

/// Functions whose complexity is strictly above `threshold`.
pub fn complexity_issues(report: &ComplexityReport, threshold: u32) -> Vec<ComplexityIssue> {
    report
        .iter()
        .flat_map(|(file, entries)| {
            entries
                .iter()
                .filter(move |entry| entry.complexity > threshold)
                .map(move |entry| ComplexityIssue {
                    file: file.clone(),
                    function: entry.name.clone(),
                    complexity: entry.complexity,
                    kind: entry.kind.clone(),
                })
        })
        .collect()
}

/// Extract the rating from pylint's summary line, clamped to `[0, 10]`.
pub fn parse_lint_rating(stdout: &str) -> Option<f64> {
    stdout.lines().find_map(|line| {
        let (_, rest) = line.split_once(RATING_PREFIX)?;
        let (score, _) = rest.split_once("/10")?;
        score.trim().parse::<f64>().ok().map(|score| score.clamp(0.0, 10.0))
    })
}

fn python_sample<F: FileSystem + ?Sized>(
    fs: &F,
    root: &Path,
    limit: usize,
) -> Result<Vec<PathBuf>, String> {
    let entries = fs
        .walk(root)
        .map_err(|err| format!("lint analysis failed: {err}"))?;
    Ok(entries
        .into_iter()
        .filter(|entry| entry.is_file() && entry.file_name_lower().ends_with(".py"))
        .take(limit)
        .map(|entry| root.join(entry.relative))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::{MockFileSystem, TreeEntry};
    use crate::tools::testing::{Scripted, ScriptedToolRunner, output};

    const RADON_JSON: &str = r#"{
        "/repo/app.py": [
            {"name": "handler", "complexity": 12, "type": "function", "rank": "C", "lineno": 3},
            {"name": "helper", "complexity": 2, "type": "function", "rank": "A", "lineno": 30},
            {"complexity": 8}
        ],
        "/repo/broken.py": {"error": "invalid syntax"}
    }"#;

    fn python_tree() -> MockFileSystem {
        let mut fs = MockFileSystem::new();
        fs.expect_walk().returning(|_| {
            Ok(vec![
                TreeEntry::file("a.py"),
                TreeEntry::file("b.py"),
                TreeEntry::file("notes.md"),
                TreeEntry::dir("pkg"),
                TreeEntry::file("pkg/c.py"),
                TreeEntry::file("pkg/d.py"),
            ])
        });
        fs
    }

    fn analyzer(runner: &ScriptedToolRunner) -> StaticAnalyzer<'_> {
        StaticAnalyzer::new(runner, Duration::from_secs(300), 7, 3)
    }

    #[tokio::test]
    async fn reports_issues_and_lint_score() {
        let runner = ScriptedToolRunner::new()
            .with("radon", output(0, RADON_JSON))
            .with(
                "pylint",
                output(
                    16,
                    "************* Module a\n\nYour code has been rated at 7.25/10 (previous run: 6.00/10)\n",
                ),
            );

        let analysis = analyzer(&runner)
            .analyze(&python_tree(), Path::new("/repo"))
            .await;

        assert_eq!(analysis.lint_score, 7.25);
        assert_eq!(analysis.complexity_report.len(), 1);
        assert_eq!(
            analysis.complexity_issues,
            vec![
                ComplexityIssue {
                    file: "/repo/app.py".to_string(),
                    function: "handler".to_string(),
                    complexity: 12,
                    kind: "function".to_string(),
                },
                ComplexityIssue {
                    file: "/repo/app.py".to_string(),
                    function: "unknown".to_string(),
                    complexity: 8,
                    kind: "unknown".to_string(),
                },
            ]
        );
        assert!(analysis.warnings.is_empty());

        let calls = runner.calls();
        assert_eq!(calls[0].args, vec!["cc", "/repo", "-s", "-j"]);
        assert_eq!(
            calls[1].args,
            vec!["/repo/a.py", "/repo/b.py", "/repo/pkg/c.py", "--score=y"]
        );
    }

    #[tokio::test]
    async fn degrades_when_tools_are_missing() {
        let runner = ScriptedToolRunner::new()
            .with("radon", Scripted::Missing)
            .with("pylint", Scripted::Timeout);

        let analysis = analyzer(&runner)
            .analyze(&python_tree(), Path::new("/repo"))
            .await;

        assert_eq!(analysis.lint_score, 0.0);
        assert!(analysis.complexity_issues.is_empty());
        assert!(analysis.complexity_report.is_empty());
        assert_eq!(analysis.warnings.len(), 2);
        assert!(analysis.warnings[0].contains("radon is not installed"));
        assert!(analysis.warnings[1].contains("timed out"));
    }

    #[tokio::test]
    async fn ignores_output_of_failed_runs() {
        let runner = ScriptedToolRunner::new()
            .with("radon", output(1, RADON_JSON))
            .with("pylint", output(1, "Your code has been rated at 9.00/10"));

        let analysis = analyzer(&runner)
            .analyze(&python_tree(), Path::new("/repo"))
            .await;

        assert_eq!(analysis.lint_score, 0.0);
        assert!(analysis.complexity_issues.is_empty());
        assert_eq!(analysis.warnings.len(), 2);
    }

    #[tokio::test]
    async fn skips_lint_without_python_files() {
        let mut fs = MockFileSystem::new();
        fs.expect_walk()
            .returning(|_| Ok(vec![TreeEntry::file("index.js")]));
        let runner = ScriptedToolRunner::new().with("radon", output(0, "{}"));

        let analysis = analyzer(&runner).analyze(&fs, Path::new("/repo")).await;

        assert_eq!(analysis.lint_score, 0.0);
        assert!(analysis.warnings.is_empty());
        assert_eq!(runner.calls().len(), 1);
    }

    #[tokio::test]
    async fn hidden_directories_never_yield_issues() {
        let radon = r#"{
            "/repo/.venv/lib/site.py": [{"name": "setup", "complexity": 30, "type": "function"}],
            "/repo/pkg/.cache/gen.py": [{"name": "build", "complexity": 11, "type": "function"}],
            "/repo/pkg/core.py": [{"name": "run", "complexity": 9, "type": "method"}]
        }"#;
        let mut fs = MockFileSystem::new();
        fs.expect_walk().returning(|_| Ok(Vec::new()));
        let runner = ScriptedToolRunner::new().with("radon", output(0, radon));

        let analysis = analyzer(&runner).analyze(&fs, Path::new("/repo")).await;

        assert_eq!(analysis.complexity_report.len(), 1);
        assert_eq!(analysis.complexity_issues.len(), 1);
        assert_eq!(analysis.complexity_issues[0].file, "/repo/pkg/core.py");
    }

    #[test]
    fn hidden_dir_check_is_relative_to_root() {
        let root = Path::new("/home/me/.cache/ws");
        assert!(!under_hidden_dir(root, "/home/me/.cache/ws/app.py"));
        assert!(under_hidden_dir(root, "/home/me/.cache/ws/.tox/x.py"));
        assert!(under_hidden_dir(root, ".venv/lib/x.py"));
        assert!(!under_hidden_dir(root, ".setup.py"));
    }

    #[test]
    fn malformed_entries_are_skipped_individually() {
        let report = parse_complexity_report(
            r#"{"/repo/app.py": [
                {"name": "ok", "complexity": 9, "type": "function"},
                {"name": "float", "complexity": 8.5, "type": "function"},
                {"name": null, "complexity": 10, "type": "function"},
                {"name": "also_ok", "complexity": 12, "type": "method"}
            ]}"#,
        )
        .expect("report");

        let names: Vec<&str> = report["/repo/app.py"]
            .iter()
            .map(|entry| entry.name.as_str())
            .collect();
        assert_eq!(names, vec!["ok", "also_ok"]);
        assert_eq!(complexity_issues(&report, 7).len(), 2);
    }

    #[test]
    fn malformed_radon_output_is_an_error() {
        assert!(parse_complexity_report("not json").is_err());
        assert!(parse_complexity_report("[1, 2]").is_err());
    }

    #[test]
    fn lint_rating_is_clamped() {
        assert_eq!(
            parse_lint_rating("Your code has been rated at -3.50/10"),
            Some(0.0)
        );
        assert_eq!(parse_lint_rating("nothing to see"), None);
    }
}
