use std::fs;
use std::path::{Path, PathBuf};

use terrace_domain::{ConfigDocument, UnresolvedReference, ValidationReport};

use crate::builder::{BuildOptions, GraphBuilder};
use crate::discovery::discover_configs;
use crate::error::{LoadError, PipelineError};
use crate::graph::ResourceGraph;
use crate::validate::validate_builder;

type PipelineResult<T> = std::result::Result<T, PipelineError>;

/// A graph together with the documents it was built from.
#[derive(Debug, Clone)]
pub struct LoadedGraph {
    pub documents: Vec<PathBuf>,
    pub graph: ResourceGraph,
    /// Empty unless strict references were requested.
    pub unresolved: Vec<UnresolvedReference>,
}

/// Parse one JSON configuration document.
///
/// # Errors
///
/// Returns an error when the file cannot be read or is not a valid document.
pub fn load_config(path: &Path) -> std::result::Result<ConfigDocument, LoadError> {
    let content = fs::read_to_string(path).map_err(|source| LoadError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| LoadError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Load every document under `path` (a file or folder) and build a graph
/// placing them all in `module_path`.
///
/// # Errors
///
/// Returns an error when discovery or loading fails, no documents are
/// found, or the builder rejects the configuration.
pub fn build_graph_for_path(
    path: &Path,
    module_path: &str,
    options: BuildOptions,
) -> PipelineResult<LoadedGraph> {
    let (documents, mut builder) = prepare(path, options)?;
    let graph = builder.build(module_path)?;
    Ok(LoadedGraph {
        documents,
        graph,
        unresolved: builder.unresolved().to_vec(),
    })
}

/// Validate every document under `path`.
///
/// Graph problems are reported inside the [`ValidationReport`]; only
/// discovery and load failures are returned as errors.
///
/// # Errors
///
/// Returns an error when discovery or loading fails or no documents are
/// found.
pub fn validate_path(
    path: &Path,
    module_path: &str,
    options: BuildOptions,
) -> PipelineResult<ValidationReport> {
    let (_, mut builder) = prepare(path, options)?;
    Ok(validate_builder(&mut builder, module_path))
}

fn prepare(path: &Path, options: BuildOptions) -> PipelineResult<(Vec<PathBuf>, GraphBuilder)> {
    let documents = discover_configs(path)?;
    if documents.is_empty() {
        return Err(PipelineError::NoConfigs {
            folder: path.to_path_buf(),
        });
    }

    let mut builder = GraphBuilder::with_options(options);
    for document in &documents {
        let config = load_config(document)?;
        builder.add_config(document.display().to_string(), config);
    }
    Ok((documents, builder))
}
