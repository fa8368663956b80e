use terrace_domain::NodeId;
use thiserror::Error;

/// Failure injected into a dry-run walk with `--fail`.
#[derive(Debug, Error)]
#[error("simulated failure for {node}")]
pub struct SimulatedFailure {
    pub node: NodeId,
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    ArgumentParse(#[from] clap::Error),
    #[error(transparent)]
    Pipeline(#[from] terrace_engine::PipelineError),
    #[error(transparent)]
    Graph(#[from] terrace_engine::GraphError),
    #[error(transparent)]
    Walk(#[from] terrace_engine::WalkError<SimulatedFailure>),
    #[error(transparent)]
    Report(#[from] terrace_report::ReportError),
}
