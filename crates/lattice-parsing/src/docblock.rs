//! Docblock parsing: pragma extraction from a file's leading comments.
//!
//! Scans at most `max_tokens` directive tokens; everything past the leading
//! comment block is ignored.

use lattice_core::types::docblock::{Docblock, FlowPragma};

/// Errors found while scanning the docblock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocblockError {
    /// More than one `@flow`/`@noflow` pragma.
    MultipleFlowAttributes,
    /// `@flow` followed by an unrecognized mode token.
    InvalidFlowMode { token: String },
    /// More than one `@providesModule` pragma.
    MultipleProvidesModuleAttributes,
}

impl std::fmt::Display for DocblockError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MultipleFlowAttributes => write!(f, "duplicate @flow pragma"),
            Self::InvalidFlowMode { token } => write!(f, "invalid @flow mode `{token}`"),
            Self::MultipleProvidesModuleAttributes => {
                write!(f, "duplicate @providesModule pragma")
            }
        }
    }
}

/// Parse the leading comment block of `content`.
///
/// A shebang line is skipped. Only comments before the first non-comment
/// token are considered. Returns all pragma errors found alongside the
/// (best-effort) docblock; the caller decides whether errors are fatal.
pub fn parse_docblock(content: &str, max_tokens: usize) -> (Vec<DocblockError>, Docblock) {
    let mut errors = Vec::new();
    let mut docblock = Docblock::default();

    let tokens = docblock_tokens(content);
    let mut consumed = 0usize;
    let mut i = 0usize;
    while i < tokens.len() && consumed < max_tokens {
        let token = tokens[i];
        consumed += 1;
        match token {
            "@flow" => {
                let mode = match tokens.get(i + 1) {
                    Some(&"strict") => {
                        i += 1;
                        consumed += 1;
                        FlowPragma::OptInStrict
                    }
                    Some(&"strict-local") => {
                        i += 1;
                        consumed += 1;
                        FlowPragma::OptInStrictLocal
                    }
                    Some(next) if next.starts_with("strict") => {
                        i += 1;
                        consumed += 1;
                        errors.push(DocblockError::InvalidFlowMode {
                            token: next.to_string(),
                        });
                        FlowPragma::OptIn
                    }
                    _ => FlowPragma::OptIn,
                };
                if docblock.flow.is_some() {
                    errors.push(DocblockError::MultipleFlowAttributes);
                } else {
                    docblock.flow = Some(mode);
                }
            }
            "@noflow" => {
                if docblock.flow.is_some() {
                    errors.push(DocblockError::MultipleFlowAttributes);
                } else {
                    docblock.flow = Some(FlowPragma::OptOut);
                }
            }
            "@providesModule" => {
                if let Some(name) = tokens.get(i + 1) {
                    i += 1;
                    consumed += 1;
                    if docblock.provides_module.is_some() {
                        errors.push(DocblockError::MultipleProvidesModuleAttributes);
                    } else {
                        docblock.provides_module = Some(name.to_string());
                    }
                }
            }
            _ => {}
        }
        i += 1;
    }

    (errors, docblock)
}

/// Whitespace-split tokens of the leading comment block, with block-comment
/// decoration stars dropped.
fn docblock_tokens(content: &str) -> Vec<&str> {
    let mut rest = content;
    if rest.starts_with("#!") {
        rest = rest.split_once('\n').map_or("", |(_, tail)| tail);
    }

    let mut tokens = Vec::new();
    loop {
        rest = rest.trim_start();
        if let Some(after) = rest.strip_prefix("/*") {
            let Some(end) = after.find("*/") else {
                // Unterminated block comment; scan what is there.
                tokens.extend(after.split_whitespace().filter(|t| *t != "*"));
                break;
            };
            tokens.extend(after[..end].split_whitespace().filter(|t| *t != "*"));
            rest = &after[end + 2..];
        } else if let Some(after) = rest.strip_prefix("//") {
            let (line, tail) = after.split_once('\n').unwrap_or((after, ""));
            tokens.extend(line.split_whitespace());
            rest = tail;
        } else {
            break;
        }
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_comment_flow_pragma() {
        let (errors, db) = parse_docblock("// @flow\nconst x = 1;\n", 10);
        assert!(errors.is_empty());
        assert_eq!(db.flow, Some(FlowPragma::OptIn));
        assert!(!db.is_strict());
    }

    #[test]
    fn block_comment_strict_modes() {
        let (errors, db) = parse_docblock("/**\n * @flow strict\n */\n", 10);
        assert!(errors.is_empty());
        assert_eq!(db.flow, Some(FlowPragma::OptInStrict));
        assert!(db.is_strict());

        let (_, db) = parse_docblock("/* @flow strict-local */", 10);
        assert_eq!(db.flow, Some(FlowPragma::OptInStrictLocal));
    }

    #[test]
    fn noflow_opts_out() {
        let (errors, db) = parse_docblock("// @noflow\n", 10);
        assert!(errors.is_empty());
        assert_eq!(db.flow, Some(FlowPragma::OptOut));
    }

    #[test]
    fn duplicate_flow_pragma_is_an_error() {
        let (errors, db) = parse_docblock("/* @flow */\n// @noflow\n", 10);
        assert_eq!(errors, vec![DocblockError::MultipleFlowAttributes]);
        // First pragma wins.
        assert_eq!(db.flow, Some(FlowPragma::OptIn));
    }

    #[test]
    fn invalid_strict_mode_is_an_error() {
        let (errors, db) = parse_docblock("// @flow strict-global\n", 10);
        assert_eq!(
            errors,
            vec![DocblockError::InvalidFlowMode {
                token: "strict-global".to_string()
            }]
        );
        assert_eq!(db.flow, Some(FlowPragma::OptIn));
    }

    #[test]
    fn provides_module_name() {
        let (errors, db) = parse_docblock("/* @providesModule Widget */\n", 10);
        assert!(errors.is_empty());
        assert_eq!(db.provides_module.as_deref(), Some("Widget"));
    }

    #[test]
    fn pragma_after_code_is_ignored() {
        let (_, db) = parse_docblock("const x = 1;\n// @flow\n", 10);
        assert_eq!(db.flow, None);
    }

    #[test]
    fn shebang_is_skipped() {
        let (_, db) = parse_docblock("#!/usr/bin/env node\n// @flow\n", 10);
        assert_eq!(db.flow, Some(FlowPragma::OptIn));
    }

    #[test]
    fn token_cap_limits_the_scan() {
        let (_, db) = parse_docblock("/* one two three four five @flow */", 3);
        assert_eq!(db.flow, None);
    }
}
