mod builder;
mod discovery;
mod dot;
mod error;
mod graph;
mod interpolation;
mod pipeline;
mod resolve;
mod validate;
mod walk;

pub use builder::{BuildOptions, GraphBuilder};
pub use discovery::discover_configs;
pub use error::{DiscoveryError, ErrorCode, GraphError, LoadError, PipelineError, WalkError};
pub use graph::ResourceGraph;
pub use interpolation::{extract_map_references, extract_references};
pub use pipeline::{LoadedGraph, build_graph_for_path, load_config, validate_path};
pub use resolve::{
    DEFAULT_PROVIDER_ALIAS, provider_binding, provider_candidates, reference_candidates,
};
pub use validate::{build_graph, strict_builder, validate_builder, validate_config};
pub use walk::{DEFAULT_MAX_PARALLEL, WalkDirection, WalkOptions};
