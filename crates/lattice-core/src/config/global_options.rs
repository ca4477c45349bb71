//! Global checker options, as loaded from configuration.

use serde::{Deserialize, Serialize};

use crate::errors::OptionsError;

/// One `relay_integration_module_prefix_includes` entry: paths matching
/// `pattern` use `prefix` instead of the default module prefix.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PrefixOverrideConfig {
    pub pattern: String,
    pub prefix: Option<String>,
}

/// Global configuration for the parsing service. All regex-valued fields
/// are stored as source patterns and compiled when per-run
/// [`ParsingOptions`](crate::config::ParsingOptions) are resolved.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct GlobalOptions {
    /// Check files with no `@flow` pragma.
    pub all: bool,
    pub modules_are_use_strict: bool,
    pub munge_underscores: bool,
    pub module_ref_prefix: Option<String>,
    pub module_ref_prefix_legacy_interop: Option<String>,
    pub facebook_fbt: Option<String>,
    pub suppress_types: Vec<String>,
    /// Literal types longer than this are generalized. Default: 100.
    pub max_literal_len: Option<usize>,
    pub component_syntax: bool,
    pub exact_by_default: bool,
    pub enable_enums: bool,
    pub enable_relay_integration: bool,
    pub relay_integration_excludes: Vec<String>,
    pub relay_integration_module_prefix: Option<String>,
    pub relay_integration_module_prefix_includes: Vec<PrefixOverrideConfig>,
    pub node_main_fields: Vec<String>,
    pub distributed: bool,
    pub enable_conditional_types: bool,
    pub enable_mapped_types: bool,
    pub tuple_enhancements: bool,
    /// Docblock directive-token scan cap. Default: 10.
    pub max_header_tokens: Option<usize>,
    /// Paths matching any of these patterns are treated as `@noflow`.
    pub untyped_paths: Vec<String>,
    /// Worker threads. 0 = auto-detect.
    pub workers: Option<usize>,
    /// Emit a timing summary after a cold parse.
    pub profile: bool,
}

impl GlobalOptions {
    pub fn from_toml_str(s: &str) -> Result<Self, OptionsError> {
        toml::from_str(s).map_err(|e| OptionsError::Config {
            message: e.to_string(),
        })
    }

    pub fn effective_max_literal_len(&self) -> usize {
        self.max_literal_len.unwrap_or(100)
    }

    pub fn effective_max_header_tokens(&self) -> usize {
        self.max_header_tokens.unwrap_or(10)
    }

    /// Effective worker count, defaulting to 0 (auto-detect).
    pub fn effective_workers(&self) -> usize {
        self.workers.unwrap_or(0)
    }
}
