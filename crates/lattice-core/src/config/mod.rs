//! Configuration: global options and the per-run parse-options resolver.

pub mod global_options;
pub mod parsing_options;

pub use global_options::{GlobalOptions, PrefixOverrideConfig};
pub use parsing_options::{
    compile_patterns, types_checked, ParseOptionOverrides, ParsingOptions, RelayPrefixOverride,
    TypesMode,
};
