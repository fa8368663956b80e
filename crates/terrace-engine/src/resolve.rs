//! Mapping of textual reference tokens onto node ids.
//!
//! Resolution is purely syntactic: it yields the ids a token *could* name
//! inside a module. Whether such a node exists is decided by the caller.

use terrace_domain::NodeId;

pub const DEFAULT_PROVIDER_ALIAS: &str = "default";

/// Candidate ids for `token` inside `module`, most specific first.
///
/// - `var.<name>` names a variable.
/// - `module.<path>` names the module call addressed by the whole dotted
///   path; `module.vpc.subnet_id` names `module.vpc.subnet_id`, not
///   `module.vpc`.
/// - `data.<type>.<name>` names a data source; shorter tokens name nothing.
/// - anything else is read as `<type>.<name>` of a resource, ignoring any
///   trailing attribute access.
///
/// `${...}` wrappers, surrounding whitespace and `[index]` suffixes on the
/// name segment are ignored.
#[must_use]
pub fn reference_candidates(token: &str, module: &str) -> Vec<NodeId> {
    let token = unwrap_interpolation(token);
    let segments: Vec<&str> = token.split('.').map(str::trim).collect();
    if segments.iter().any(|segment| segment.is_empty()) {
        return Vec::new();
    }

    match segments.as_slice() {
        ["var", name, ..] => vec![NodeId::variable(module, strip_index(name))],
        ["module", path @ ..] if !path.is_empty() => {
            vec![NodeId::module_call(module, &path.join("."))]
        }
        ["data", data_type, name, ..] => vec![NodeId::data(module, data_type, strip_index(name))],
        ["data", ..] => Vec::new(),
        [resource_type, name, ..] => {
            vec![NodeId::resource(module, resource_type, strip_index(name))]
        }
        _ => Vec::new(),
    }
}

/// Provider name and alias bound by a resource or data source.
///
/// An explicit `provider` of the form `<name>.<alias>` selects that alias;
/// a bare name selects the default alias. Without one the provider is the
/// type prefix before the first `_` (`aws_instance` -> `aws`).
#[must_use]
pub fn provider_binding<'a>(explicit: Option<&'a str>, resource_type: &'a str) -> (&'a str, &'a str) {
    match explicit.map(str::trim).filter(|value| !value.is_empty()) {
        Some(value) => value
            .split_once('.')
            .unwrap_or((value, DEFAULT_PROVIDER_ALIAS)),
        None => (
            resource_type
                .split_once('_')
                .map_or(resource_type, |(prefix, _)| prefix),
            DEFAULT_PROVIDER_ALIAS,
        ),
    }
}

/// Provider ids to try for a binding: the module-local one, then the root
/// one.
#[must_use]
pub fn provider_candidates(module: &str, name: &str, alias: &str) -> Vec<NodeId> {
    let mut candidates = vec![NodeId::provider(module, name, alias)];
    if !module.is_empty() {
        candidates.push(NodeId::provider("", name, alias));
    }
    candidates
}

fn unwrap_interpolation(token: &str) -> &str {
    let token = token.trim();
    token
        .strip_prefix("${")
        .and_then(|inner| inner.strip_suffix('}'))
        .map_or(token, str::trim)
}

fn strip_index(name: &str) -> &str {
    name.split_once('[').map_or(name, |(base, _)| base)
}
