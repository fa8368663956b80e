use std::fmt;
use std::io;
use std::path::PathBuf;

use terrace_domain::NodeId;
use thiserror::Error;

/// Machine-readable classification of a [`GraphError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    Cycle,
    MissingNode,
    DuplicateNode,
    InvalidEdge,
}

impl ErrorCode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cycle => "CYCLE",
            Self::MissingNode => "MISSING_NODE",
            Self::DuplicateNode => "DUPLICATE_NODE",
            Self::InvalidEdge => "INVALID_EDGE",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("dependency cycle detected: {message}")]
    Cycle { message: String },
    #[error("edge {from} -> {to} references missing node {missing}")]
    MissingNode {
        from: NodeId,
        to: NodeId,
        missing: NodeId,
    },
    #[error("node {id} already exists")]
    DuplicateNode { id: NodeId },
    #[error("invalid edge {from} -> {to}: {message}")]
    InvalidEdge {
        from: NodeId,
        to: NodeId,
        message: String,
    },
}

impl GraphError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Cycle { .. } => ErrorCode::Cycle,
            Self::MissingNode { .. } => ErrorCode::MissingNode,
            Self::DuplicateNode { .. } => ErrorCode::DuplicateNode,
            Self::InvalidEdge { .. } => ErrorCode::InvalidEdge,
        }
    }

    pub(crate) fn cycle(message: impl Into<String>) -> Self {
        Self::Cycle {
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum WalkError<E>
where
    E: std::error::Error + 'static,
{
    #[error(transparent)]
    Graph(#[from] GraphError),
    #[error("visitor failed for {node}")]
    Visitor {
        node: NodeId,
        #[source]
        source: E,
    },
}

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("config root does not exist: {root}")]
    RootDoesNotExist { root: PathBuf },
    #[error("failed while walking config directory")]
    Walk {
        #[source]
        source: walkdir::Error,
    },
    #[error("failed to canonicalize config path: {path}")]
    CanonicalizePath {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read config: {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),
    #[error("no config documents found under {folder} (expected files ending with .json)")]
    NoConfigs { folder: PathBuf },
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Graph(#[from] GraphError),
}
