//! End-to-end evaluation of one repository.

use std::path::Path;
use std::sync::Arc;

use crate::collector::collect;
use crate::config::PipelineConfig;
use crate::domain::{EvaluationRecord, EvaluationRequest, EvaluationResult, StructureReport};
use crate::duplication::check_duplication;
use crate::error::{JudgeError, Result};
use crate::fs::{FileSystem, StdFileSystem};
use crate::scorer::LlmScorer;
use crate::scoring::{ScoreInputs, aggregate, structure_score, synthesize_feedback};
use crate::sink::ResultSink;
use crate::static_analysis::StaticAnalyzer;
use crate::structure::analyze_structure;
use crate::tools::{ProcessToolRunner, ToolRunner};
use crate::workspace::WorkspaceManager;

/// Runs the analyzers in sequence and combines their results.
///
/// Only acquiring the workspace can fail an evaluation; every analyzer
/// degrades to its neutral default and records a warning instead.
pub struct Evaluator {
    config: PipelineConfig,
    workspaces: WorkspaceManager,
    tools: Arc<dyn ToolRunner + Send + Sync>,
    fs: Arc<dyn FileSystem + Send + Sync>,
    scorer: LlmScorer,
    sink: Option<Arc<dyn ResultSink + Send + Sync>>,
}

impl Evaluator {
    /// Evaluator using `git`, local processes, the real filesystem and the configured model.
    pub fn from_config(config: PipelineConfig) -> Self {
        let workspaces = WorkspaceManager::from_config(&config);
        let scorer = LlmScorer::from_config(&config.llm);
        Self::with_parts(
            config,
            workspaces,
            Arc::new(ProcessToolRunner::new()),
            Arc::new(StdFileSystem::new()),
            scorer,
        )
    }

    /// Evaluator over explicit collaborators.
    pub fn with_parts(
        config: PipelineConfig,
        workspaces: WorkspaceManager,
        tools: Arc<dyn ToolRunner + Send + Sync>,
        fs: Arc<dyn FileSystem + Send + Sync>,
        scorer: LlmScorer,
    ) -> Self {
        Self {
            config,
            workspaces,
            tools,
            fs,
            scorer,
            sink: None,
        }
    }

    /// Persist every finished evaluation to `sink`.
    pub fn with_sink(mut self, sink: Arc<dyn ResultSink + Send + Sync>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Clone the requested repository, evaluate it and remove the clone.
    pub async fn evaluate(&self, request: &EvaluationRequest) -> Result<EvaluationResult> {
        let workspace = self.workspaces.acquire(&request.repository_url).await?;
        let result = self
            .analyze(
                workspace.path(),
                &request.repository_url,
                &request.project_description,
            )
            .await;
        self.persist(request, &result);
        self.workspaces.release(workspace).await;
        Ok(result)
    }

    /// Evaluate an existing checkout in place. The directory is never modified.
    pub async fn evaluate_local(
        &self,
        path: &Path,
        request: &EvaluationRequest,
    ) -> Result<EvaluationResult> {
        if !path.is_dir() {
            return Err(JudgeError::Other(format!(
                "local path not found: {}",
                path.display()
            )));
        }
        let result = self
            .analyze(path, &path.display().to_string(), &request.project_description)
            .await;
        self.persist(request, &result);
        Ok(result)
    }

    async fn analyze(&self, root: &Path, source: &str, description: &str) -> EvaluationResult {
        let fs = &*self.fs;
        let mut warnings = Vec::new();

        log::info!("collecting sources for {source}");
        let chunks = collect(fs, root, &self.config.extensions, self.config.chunk_lines)
            .unwrap_or_else(|err| {
                let warning = format!("source collection failed: {err}");
                log::warn!("{warning}");
                warnings.push(warning);
                Vec::new()
            });
        log::info!("found {} code chunks", chunks.len());

        log::info!("running static analysis");
        let analyzer = StaticAnalyzer::new(
            &*self.tools,
            self.config.tool_timeout,
            self.config.complexity_threshold,
            self.config.lint_sample_size,
        );
        let analysis = analyzer.analyze(fs, root).await;
        warnings.extend(analysis.warnings);

        log::info!("running duplication check");
        let duplication = check_duplication(&*self.tools, root, self.config.tool_timeout).await;
        warnings.extend(duplication.warning);

        log::info!("analyzing repository structure");
        let structure = analyze_structure(fs, root).unwrap_or_else(|err| {
            let warning = format!("structure analysis failed: {err}");
            log::warn!("{warning}");
            warnings.push(warning);
            StructureReport::default()
        });
        let structure_score = structure_score(&structure);

        log::info!("running llm evaluation");
        if let Some(reason) = self.scorer.unavailable_reason() {
            warnings.push(reason.to_string());
        }
        let llm = self.scorer.score(description, &chunks).await;

        let inputs = ScoreInputs {
            duplication_percent: duplication.percent,
            logic: llm.logic,
            relevance: llm.relevance,
            style: llm.style,
            lint_score: analysis.lint_score,
            structure_score,
        };
        let final_score = aggregate(&inputs);
        let feedback = synthesize_feedback(
            &inputs,
            &structure,
            analysis.complexity_issues.len(),
            final_score,
        );
        log::info!("{source} scored {final_score:.2}");

        EvaluationResult {
            source: source.to_string(),
            chunk_count: chunks.len(),
            complexity_report: analysis.complexity_report,
            complexity_issues: analysis.complexity_issues,
            lint_score: analysis.lint_score,
            duplication_percent: duplication.percent,
            structure,
            structure_score,
            llm,
            final_score,
            feedback,
            warnings,
        }
    }

    fn persist(&self, request: &EvaluationRequest, result: &EvaluationResult) {
        let Some(sink) = &self.sink else {
            return;
        };
        let record = EvaluationRecord::new(request.clone(), result.clone());
        if let Err(err) = sink.persist(&record) {
            log::warn!("failed to persist evaluation of {}: {err}", result.source);
        }
    }
}
