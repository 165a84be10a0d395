#![deny(missing_docs)]
//! repojudge command-line interface.
//!
//! Evaluates hackathon repositories and renders score reports.

use clap::{ArgGroup, Args, Parser, Subcommand, ValueEnum};
use repojudge_core::{
    EvaluationReport, EvaluationRequest, EvaluationStatus, Evaluator, SubmissionContext,
    render_evaluation_markdown, render_json,
};
use std::fmt::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

pub(crate) type CliResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

#[derive(Parser)]
#[command(name = "repojudge", version, about = "Hackathon repository evaluator")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone)]
#[command(group(
    ArgGroup::new("source")
        .required(true)
        .args(&["file", "url", "path"])
))]
struct RepoSourceArgs {
    /// File containing repository URLs (one per line).
    #[arg(short, long)]
    file: Option<PathBuf>,
    /// Single repository URL to clone.
    #[arg(long)]
    url: Option<String>,
    /// Local checkout to evaluate in place.
    #[arg(long)]
    path: Option<PathBuf>,
}

#[derive(Args, Clone)]
#[command(group(
    ArgGroup::new("project")
        .required(true)
        .args(&["description", "description_file"])
))]
struct DescriptionArgs {
    /// What the project is supposed to do.
    #[arg(short, long)]
    description: Option<String>,
    /// File holding the project description.
    #[arg(long)]
    description_file: Option<PathBuf>,
}

#[derive(Args, Clone, Default)]
struct SubmissionArgs {
    /// Hackathon identifier recorded with each result.
    #[arg(long, env = "REPOJUDGE_HACKATHON_ID")]
    hackathon_id: Option<String>,
    /// Team identifier recorded with each result.
    #[arg(long)]
    team_id: Option<String>,
    /// Team join code recorded with each result.
    #[arg(long)]
    team_code: Option<String>,
}

#[derive(Args, Clone)]
struct RunArgs {
    /// Maximum number of concurrent evaluations.
    #[arg(short = 'j', long, default_value_t = 2)]
    concurrency: usize,
    /// Append every result as a JSON line to this file.
    #[arg(long, env = "REPOJUDGE_SINK")]
    sink: Option<PathBuf>,
}

#[derive(Args, Clone)]
struct OutputArgs {
    /// Output format for report data.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
    /// Write the report to a file instead of stdout.
    #[arg(long = "report-output")]
    report_output: Option<PathBuf>,
}

#[derive(ValueEnum, Copy, Clone, Debug, Eq, PartialEq)]
enum OutputFormat {
    Text,
    Json,
    Markdown,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate repositories from a URL, a URL list file, or a local path.
    Evaluate {
        #[command(flatten)]
        source: RepoSourceArgs,
        #[command(flatten)]
        description: DescriptionArgs,
        #[command(flatten)]
        submission: SubmissionArgs,
        #[command(flatten)]
        run: RunArgs,
        #[command(flatten)]
        report: OutputArgs,
    },
}

#[cfg(not(test))]
#[tokio::main]
async fn main() -> CliResult<()> {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Evaluate {
            source,
            description,
            submission,
            run,
            report,
        } => {
            let source = resolve_source_args(&source)?;
            let description = resolve_description(&description).await?;
            let config = repojudge_core::PipelineConfig::from_env()?;
            let mut evaluator = Evaluator::from_config(config);
            if let Some(path) = run.sink.clone() {
                evaluator =
                    evaluator.with_sink(Arc::new(repojudge_core::JsonLinesSink::new(path)));
            }
            run_evaluate(
                Arc::new(evaluator),
                source,
                description,
                submission.into_context(),
                run.concurrency,
                report,
            )
            .await?
        }
    }

    Ok(())
}

#[cfg(test)]
fn main() {}

async fn run_evaluate(
    evaluator: Arc<Evaluator>,
    source: BatchSource,
    description: String,
    submission: Option<SubmissionContext>,
    concurrency: usize,
    report: OutputArgs,
) -> CliResult<()> {
    let targets = load_targets(source).await?;
    if targets.is_empty() {
        println!("No repositories found to evaluate.");
        return Ok(());
    }

    let reports = evaluate_targets(evaluator, targets, description, submission, concurrency).await?;
    emit_evaluation_reports(&reports, &report).await
}

async fn evaluate_targets(
    evaluator: Arc<Evaluator>,
    targets: Vec<Target>,
    description: String,
    submission: Option<SubmissionContext>,
    concurrency: usize,
) -> CliResult<Vec<EvaluationReport>> {
    let concurrency = if concurrency == 0 { 1 } else { concurrency };
    log::info!(
        "evaluating {} target(s) with concurrency {concurrency}",
        targets.len()
    );
    let semaphore = Arc::new(Semaphore::new(concurrency));
    let mut tasks = JoinSet::new();

    for (index, target) in targets.into_iter().enumerate() {
        let permit = semaphore.clone().acquire_owned().await?;
        let evaluator = evaluator.clone();
        let description = description.clone();
        let submission = submission.clone();
        tasks.spawn(async move {
            let _permit = permit;
            (
                index,
                evaluate_target(&evaluator, target, description, submission).await,
            )
        });
    }

    let mut reports = Vec::new();
    while let Some(result) = tasks.join_next().await {
        match result {
            Ok(indexed) => reports.push(indexed),
            Err(err) => {
                log::error!("evaluation task failed: {err}");
                reports.push((usize::MAX, report_from_task_error(err)));
            }
        }
    }
    reports.sort_by_key(|(index, _)| *index);

    Ok(reports.into_iter().map(|(_, report)| report).collect())
}

async fn evaluate_target(
    evaluator: &Evaluator,
    target: Target,
    description: String,
    submission: Option<SubmissionContext>,
) -> EvaluationReport {
    match target {
        Target::Clone { url } => {
            let request = build_request(&url, description, submission);
            match evaluator.evaluate(&request).await {
                Ok(result) => EvaluationReport::new(url, EvaluationStatus::Cloned, result),
                Err(err) => EvaluationReport::failed(url, err.to_string()),
            }
        }
        Target::Local { path } => {
            let source = path.display().to_string();
            let request = build_request(&source, description, submission);
            match evaluator.evaluate_local(&path, &request).await {
                Ok(result) => EvaluationReport::new(source, EvaluationStatus::Local, result),
                Err(err) => EvaluationReport::failed(source, err.to_string()),
            }
        }
    }
}

fn build_request(
    source: &str,
    description: String,
    submission: Option<SubmissionContext>,
) -> EvaluationRequest {
    let request = EvaluationRequest::new(source, description);
    match submission {
        Some(submission) => request.with_submission(submission),
        None => request,
    }
}

impl SubmissionArgs {
    fn into_context(self) -> Option<SubmissionContext> {
        if self.hackathon_id.is_none() && self.team_id.is_none() && self.team_code.is_none() {
            return None;
        }
        Some(SubmissionContext {
            hackathon_id: self.hackathon_id,
            team_id: self.team_id,
            team_code: self.team_code,
        })
    }
}

fn resolve_source_args(source: &RepoSourceArgs) -> CliResult<BatchSource> {
    if let Some(file) = source.file.clone() {
        return Ok(BatchSource::File(file));
    }
    if let Some(url) = source.url.clone() {
        let trimmed = url.trim();
        if trimmed.is_empty() {
            return Err("url cannot be empty".into());
        }
        return Ok(BatchSource::Url(trimmed.to_string()));
    }
    if let Some(path) = source.path.clone() {
        return Ok(BatchSource::Path(path));
    }
    Err("no repository source provided".into())
}

async fn resolve_description(args: &DescriptionArgs) -> CliResult<String> {
    let raw = match (&args.description, &args.description_file) {
        (Some(text), _) => text.clone(),
        (None, Some(path)) => tokio::fs::read_to_string(path).await?,
        (None, None) => return Err("no project description provided".into()),
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err("project description cannot be empty".into());
    }
    Ok(trimmed.to_string())
}

async fn load_repo_urls(path: &Path) -> CliResult<Vec<String>> {
    let contents = tokio::fs::read_to_string(path).await?;
    let urls = contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect();
    Ok(urls)
}

async fn load_targets(source: BatchSource) -> CliResult<Vec<Target>> {
    match source {
        BatchSource::File(file) => {
            let urls = load_repo_urls(&file).await?;
            Ok(urls.into_iter().map(|url| Target::Clone { url }).collect())
        }
        BatchSource::Url(url) => Ok(vec![Target::Clone { url }]),
        BatchSource::Path(path) => Ok(vec![Target::Local { path }]),
    }
}

enum BatchSource {
    File(PathBuf),
    Url(String),
    Path(PathBuf),
}

enum Target {
    Clone { url: String },
    Local { path: PathBuf },
}

fn report_from_task_error(error: tokio::task::JoinError) -> EvaluationReport {
    EvaluationReport::failed("unknown".to_string(), error.to_string())
}

async fn emit_evaluation_reports(
    reports: &[EvaluationReport],
    output: &OutputArgs,
) -> CliResult<()> {
    let contents = match output.format {
        OutputFormat::Text => render_evaluation_text(reports),
        OutputFormat::Markdown => render_evaluation_markdown(reports),
        OutputFormat::Json => render_json(reports)?,
    };
    emit_output(output, contents).await
}

async fn emit_output(output: &OutputArgs, contents: String) -> CliResult<()> {
    if let Some(path) = &output.report_output {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, contents).await?;
    } else {
        print!("{contents}");
    }
    Ok(())
}

fn render_evaluation_text(reports: &[EvaluationReport]) -> String {
    let mut output = String::new();
    for report in reports {
        let _ = writeln!(output, "Source: {}", report.source);
        match &report.status {
            EvaluationStatus::Cloned => {
                let _ = writeln!(output, "Status: cloned");
            }
            EvaluationStatus::Local => {
                let _ = writeln!(output, "Status: local");
            }
            EvaluationStatus::Failed(error) => {
                let _ = writeln!(output, "Status: failed ({error})");
                let _ = writeln!(output);
                continue;
            }
        }
        let Some(result) = &report.result else {
            let _ = writeln!(output);
            continue;
        };

        let _ = writeln!(
            output,
            "Final score: {:.2} ({})",
            result.final_score, result.feedback.overall_impression
        );
        let _ = writeln!(
            output,
            "Duplication: {:.2}%  Lint: {:.2}/10  Structure bonus: {:.1}",
            result.duplication_percent, result.lint_score, result.structure_score
        );
        let _ = writeln!(
            output,
            "LLM: logic {:.1}, relevance {:.1}, style {:.1} ({} of {} chunks scored)",
            result.llm.logic,
            result.llm.relevance,
            result.llm.style,
            result.llm.evaluated_chunks,
            result.chunk_count
        );
        if !result.complexity_issues.is_empty() {
            let _ = writeln!(
                output,
                "Complex functions: {}",
                result.complexity_issues.len()
            );
        }
        append_text_list(&mut output, "Strengths", &result.feedback.strengths);
        append_text_list(&mut output, "Weaknesses", &result.feedback.weaknesses);
        append_text_list(
            &mut output,
            "Recommendations",
            &result.feedback.recommendations,
        );
        append_text_list(&mut output, "Warnings", &result.warnings);
        let _ = writeln!(output);
    }
    output
}

fn append_text_list(output: &mut String, title: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    let _ = writeln!(output, "{title}:");
    for item in items {
        let _ = writeln!(output, "- {item}");
    }
}
