// error taxonomy for manifests, predicates and extractor binding

use std::path::PathBuf;
use thiserror::Error;

/// Errors produced while loading, validating or binding rule sets.
///
/// The merge itself never fails; everything here comes from the layers
/// around it.
#[derive(Debug, Error)]
pub enum RuleError {
    #[error("failed to read rules file {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse rules file {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("project rules not found at {0}")]
    MissingRules(PathBuf),

    #[error("invalid regex test '{pattern}'")]
    InvalidRegex {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("invalid host test '{0}': expected a bare host name like 'example.com'")]
    InvalidHost(String),

    #[error("empty property name")]
    EmptyProperty,

    #[error("property '{0}' is defined more than once")]
    DuplicateProperty(String),

    #[error("unknown extractor '{name}' for property '{property}'")]
    UnknownExtractor { property: String, name: String },
}
