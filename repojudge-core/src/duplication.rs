//! Copy-paste detection through `jscpd`.

use std::path::Path;
use std::time::Duration;

use crate::tools::{ToolInvocation, ToolRunner};

/// Duplication percentage plus the reason it defaulted, if it did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DuplicationReport {
    /// Duplicated share of the code base, `[0, 100]`.
    pub percent: f64,
    /// Set when the detector failed and `percent` is the `0.0` default.
    pub warning: Option<String>,
}

/// Run the duplication detector over `root`.
///
/// A failed run reports `0.0`, the same value as a clean repository; the
/// `warning` tells the two apart.
pub async fn check_duplication(
    tools: &(dyn ToolRunner + Send + Sync),
    root: &Path,
    timeout: Duration,
) -> DuplicationReport {
    let invocation = ToolInvocation::new(
        "npx",
        vec![
            "jscpd".to_string(),
            root.display().to_string(),
            "--reporters".to_string(),
            "json".to_string(),
        ],
        timeout,
    );

    let outcome = match tools.invoke(&invocation).await {
        Ok(output) if output.success() => parse_duplication(&output.stdout)
            .ok_or_else(|| "duplication check failed: no percentage in jscpd output".to_string()),
        Ok(output) => Err(format!(
            "duplication check failed: jscpd exited with {:?}",
            output.code
        )),
        Err(err) => Err(format!("duplication check failed: {err}")),
    };

    match outcome {
        Ok(percent) => DuplicationReport {
            percent,
            warning: None,
        },
        Err(warning) => {
            log::warn!("{warning}");
            DuplicationReport {
                percent: 0.0,
                warning: Some(warning),
            }
        }
    }
}

/// Read the total percentage from jscpd JSON, or from its console table.
pub fn parse_duplication(stdout: &str) -> Option<f64> {
    let percent = match serde_json::from_str::<serde_json::Value>(stdout) {
        Ok(json) => json
            .pointer("/statistics/total/percentage")
            .map(|value| value.as_f64())
            .unwrap_or(Some(0.0))?,
        Err(_) => scan_total_line(stdout)?,
    };
    Some(percent.clamp(0.0, 100.0))
}

fn scan_total_line(stdout: &str) -> Option<f64> {
    stdout
        .lines()
        .filter(|line| line.contains("Total") && line.contains('%'))
        .find_map(|line| {
            let (before, _) = line.trim().split_once('%')?;
            let token = before.split_whitespace().last()?;
            token.trim_start_matches('(').parse::<f64>().ok()
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::{Scripted, ScriptedToolRunner, output};

    #[tokio::test]
    async fn reads_percentage_from_json() {
        let runner = ScriptedToolRunner::new().with(
            "npx",
            output(0, r#"{"statistics": {"total": {"percentage": 12.5, "clones": 3}}}"#),
        );

        let report = check_duplication(&runner, Path::new("/repo"), Duration::from_secs(300)).await;

        assert_eq!(report.percent, 12.5);
        assert!(report.warning.is_none());
        assert_eq!(
            runner.calls()[0].args,
            vec!["jscpd", "/repo", "--reporters", "json"]
        );
    }

    #[tokio::test]
    async fn missing_tool_defaults_to_zero_with_warning() {
        let runner = ScriptedToolRunner::new().with("npx", Scripted::Missing);

        let report = check_duplication(&runner, Path::new("/repo"), Duration::from_secs(300)).await;

        assert_eq!(report.percent, 0.0);
        assert!(report.warning.expect("warning").contains("npx is not installed"));
    }

    #[tokio::test]
    async fn non_zero_exit_defaults_to_zero() {
        let runner = ScriptedToolRunner::new().with(
            "npx",
            output(1, r#"{"statistics": {"total": {"percentage": 40.0}}}"#),
        );

        let report = check_duplication(&runner, Path::new("/repo"), Duration::from_secs(300)).await;

        assert_eq!(report.percent, 0.0);
        assert!(report.warning.is_some());
    }

    #[test]
    fn falls_back_to_console_table() {
        let table = "│ Format │ Files │\n│ Total: │ 12 │ 340 │ 3 │ 4.2% │\n";
        assert_eq!(parse_duplication(table), Some(4.2));
        assert_eq!(parse_duplication("Total 120 lines (7.5%)"), Some(7.5));
        assert_eq!(parse_duplication("no summary"), None);
    }

    #[test]
    fn json_without_statistics_is_zero_and_values_are_clamped() {
        assert_eq!(parse_duplication(r#"{"duplicates": []}"#), Some(0.0));
        assert_eq!(
            parse_duplication(r#"{"statistics": {"total": {"percentage": 140}}}"#),
            Some(100.0)
        );
    }
}
