//! Per-run parse options and the resolver that derives them.

use std::path::Path;

use regex::Regex;

use crate::errors::OptionsError;
use crate::types::collections::FxHashSet;
use crate::types::docblock::{Docblock, FlowPragma};

use super::global_options::GlobalOptions;

/// Whether type syntax is checked for files in this run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypesMode {
    /// Every file is checked, pragma or not.
    TypesAllowed,
    /// Only files opting in via docblock pragma are checked.
    TypesForbiddenByDefault,
}

/// Compiled `relay_integration_module_prefix_includes` entry.
#[derive(Debug, Clone)]
pub struct RelayPrefixOverride {
    pub pattern: Regex,
    pub prefix: Option<String>,
}

/// Caller-supplied overrides for the two resolver-contractual fields.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParseOptionOverrides {
    pub types_mode: Option<TypesMode>,
    pub use_strict: Option<bool>,
}

/// Immutable per-run configuration bundle handed to the parse pipeline.
#[derive(Debug, Clone)]
pub struct ParsingOptions {
    pub types_mode: TypesMode,
    pub use_strict: bool,
    pub munge_underscores: bool,
    pub module_ref_prefix: Option<String>,
    pub module_ref_prefix_legacy_interop: Option<String>,
    pub facebook_fbt: Option<String>,
    pub suppress_types: FxHashSet<String>,
    pub max_literal_len: usize,
    pub component_syntax: bool,
    pub exact_by_default: bool,
    pub enable_enums: bool,
    pub enable_relay_integration: bool,
    pub relay_integration_excludes: Vec<Regex>,
    pub relay_integration_module_prefix: Option<String>,
    pub relay_integration_module_prefix_includes: Vec<RelayPrefixOverride>,
    pub node_main_fields: Vec<String>,
    pub distributed: bool,
    pub enable_conditional_types: bool,
    pub enable_mapped_types: bool,
    pub tuple_enhancements: bool,
    pub max_header_tokens: usize,
}

impl ParsingOptions {
    /// Resolve per-run options from global configuration plus overrides.
    ///
    /// `types_mode`: the override wins; else `TypesAllowed` iff the global
    /// `all` flag is set. `use_strict`: the override wins; else the global
    /// `modules_are_use_strict`. Everything else copies through.
    pub fn resolve(
        global: &GlobalOptions,
        overrides: ParseOptionOverrides,
    ) -> Result<Self, OptionsError> {
        let types_mode = overrides.types_mode.unwrap_or(if global.all {
            TypesMode::TypesAllowed
        } else {
            TypesMode::TypesForbiddenByDefault
        });
        let use_strict = overrides
            .use_strict
            .unwrap_or(global.modules_are_use_strict);

        let relay_integration_excludes = compile_patterns(&global.relay_integration_excludes)?;
        let relay_integration_module_prefix_includes = global
            .relay_integration_module_prefix_includes
            .iter()
            .map(|o| {
                Ok(RelayPrefixOverride {
                    pattern: compile(&o.pattern)?,
                    prefix: o.prefix.clone(),
                })
            })
            .collect::<Result<Vec<_>, OptionsError>>()?;

        Ok(Self {
            types_mode,
            use_strict,
            munge_underscores: global.munge_underscores,
            module_ref_prefix: global.module_ref_prefix.clone(),
            module_ref_prefix_legacy_interop: global.module_ref_prefix_legacy_interop.clone(),
            facebook_fbt: global.facebook_fbt.clone(),
            suppress_types: global.suppress_types.iter().cloned().collect(),
            max_literal_len: global.effective_max_literal_len(),
            component_syntax: global.component_syntax,
            exact_by_default: global.exact_by_default,
            enable_enums: global.enable_enums,
            enable_relay_integration: global.enable_relay_integration,
            relay_integration_excludes,
            relay_integration_module_prefix: global.relay_integration_module_prefix.clone(),
            relay_integration_module_prefix_includes,
            node_main_fields: global.node_main_fields.clone(),
            distributed: global.distributed,
            enable_conditional_types: global.enable_conditional_types,
            enable_mapped_types: global.enable_mapped_types,
            tuple_enhancements: global.tuple_enhancements,
            max_header_tokens: global.effective_max_header_tokens(),
        })
    }

    /// Relay integration applies to this file unless an exclude pattern
    /// matches it.
    pub fn relay_enabled_for(&self, path: &Path) -> bool {
        if !self.enable_relay_integration {
            return false;
        }
        let p = path.to_string_lossy();
        !self
            .relay_integration_excludes
            .iter()
            .any(|re| re.is_match(&p))
    }

    /// Relay artifact module prefix for this file: the first matching
    /// override, else the default prefix.
    pub fn relay_prefix_for(&self, path: &Path) -> Option<&str> {
        let p = path.to_string_lossy();
        for o in &self.relay_integration_module_prefix_includes {
            if o.pattern.is_match(&p) {
                return o.prefix.as_deref();
            }
        }
        self.relay_integration_module_prefix.as_deref()
    }
}

/// Whether a file's types are checked under the given mode and docblock.
pub fn types_checked(mode: TypesMode, docblock: &Docblock) -> bool {
    match mode {
        TypesMode::TypesAllowed => true,
        TypesMode::TypesForbiddenByDefault => matches!(
            docblock.flow,
            Some(FlowPragma::OptIn)
                | Some(FlowPragma::OptInStrict)
                | Some(FlowPragma::OptInStrictLocal)
        ),
    }
}

fn compile(pattern: &str) -> Result<Regex, OptionsError> {
    Regex::new(pattern).map_err(|e| OptionsError::InvalidRegex {
        pattern: pattern.to_string(),
        message: e.to_string(),
    })
}

/// Compile a list of configured patterns, reporting the offending pattern
/// on failure.
pub fn compile_patterns(patterns: &[String]) -> Result<Vec<Regex>, OptionsError> {
    patterns.iter().map(|p| compile(p)).collect()
}
