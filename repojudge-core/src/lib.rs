#![deny(missing_docs)]
//! repojudge core library.
//!
//! This crate contains the evaluation pipeline that scores hackathon
//! repositories: cloning, source collection, static analysis, duplication
//! detection, structure heuristics, LLM review and score aggregation.

pub mod collector;
pub mod config;
pub mod domain;
pub mod duplication;
pub mod error;
pub mod fs;
/// Chat-completion client.
pub mod llm;
pub mod pipeline;
pub mod report;
pub mod scorer;
pub mod scoring;
pub mod sink;
pub mod static_analysis;
pub mod structure;
pub mod tools;
pub mod verdict;
pub mod workspace;

pub use config::{LlmConfig, PipelineConfig};
pub use domain::{
    ComplexityIssue, EvaluationRecord, EvaluationRequest, EvaluationResult, Feedback,
    LlmAssessment, SourceChunk, StructureReport, SubmissionContext,
};
pub use error::{JudgeError, Result};
pub use fs::{FileSystem, StdFileSystem};
pub use pipeline::Evaluator;
pub use report::{EvaluationReport, EvaluationStatus, render_evaluation_markdown, render_json};
pub use sink::{JsonLinesSink, ResultSink};
pub use workspace::{Workspace, WorkspaceManager};
