//! Source parser seam and the tree-sitter-backed implementation.
//!
//! The parser never fails on recoverable syntax errors: error and missing
//! nodes in the produced tree are surfaced as `SyntaxError`s and the tree
//! is still usable for signature extraction.

use std::path::Path;

use lattice_core::errors::ParserError;
use lattice_core::types::artifacts::Loc;
use tree_sitter::{Language, Node, Parser, Tree};

/// Options handed to the source parser.
#[derive(Debug, Clone, Default)]
pub struct ParserOptions {
    pub components: bool,
    pub enums: bool,
    pub esproposal_decorators: bool,
    pub types: bool,
    pub use_strict: bool,
    pub module_ref_prefix: Option<String>,
    pub module_ref_prefix_legacy_interop: Option<String>,
}

/// A recoverable syntax error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    pub loc: Loc,
    pub message: String,
}

impl std::fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}: {}",
            self.loc.start_line + 1,
            self.loc.start_col,
            self.message
        )
    }
}

/// Parse output: the syntax tree plus any recovered errors.
pub struct ParsedSource {
    pub tree: Tree,
    pub errors: Vec<SyntaxError>,
}

/// The low-level source parser consumed by the pipeline.
///
/// Recoverable syntax errors must never surface as `Err`; those are
/// returned on the `ParsedSource`. `Err` is reserved for the parser
/// itself being unusable.
pub trait SourceParser: Sync {
    fn parse(
        &self,
        content: &str,
        file: &Path,
        opts: &ParserOptions,
    ) -> Result<ParsedSource, ParserError>;
}

/// Production parser. Dialect routing is by the `types` option: the
/// annotation-bearing grammar (TSX) when types are parsed, the plain
/// JavaScript grammar otherwise.
pub struct TreeSitterParser;

impl SourceParser for TreeSitterParser {
    fn parse(
        &self,
        content: &str,
        file: &Path,
        opts: &ParserOptions,
    ) -> Result<ParsedSource, ParserError> {
        let (dialect, language): (&str, Language) = if opts.types {
            ("tsx", tree_sitter_typescript::LANGUAGE_TSX.into())
        } else {
            ("javascript", tree_sitter_javascript::LANGUAGE.into())
        };
        let mut parser = Parser::new();
        parser
            .set_language(&language)
            .map_err(|e| ParserError::GrammarNotFound {
                dialect: dialect.to_string(),
                message: e.to_string(),
            })?;
        let tree = parser.parse(content, None).ok_or_else(|| ParserError::NoTree {
            file: file.display().to_string(),
        })?;
        let errors = collect_syntax_errors(&tree, content);
        Ok(ParsedSource { tree, errors })
    }
}

/// Loc for a node's span.
pub(crate) fn node_loc(node: Node<'_>) -> Loc {
    let start = node.start_position();
    let end = node.end_position();
    Loc {
        start_line: start.row as u32,
        start_col: start.column as u32,
        end_line: end.row as u32,
        end_col: end.column as u32,
    }
}

/// Node text as a source slice.
pub(crate) fn node_text<'s>(node: Node<'_>, source: &'s str) -> &'s str {
    &source[node.byte_range()]
}

/// Visit every descendant of `node` in preorder.
pub(crate) fn for_each_descendant<'a>(node: Node<'a>, f: &mut dyn FnMut(Node<'a>)) {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        f(child);
        for_each_descendant(child, f);
    }
}

fn collect_syntax_errors(tree: &Tree, source: &str) -> Vec<SyntaxError> {
    let root = tree.root_node();
    if !root.has_error() {
        return Vec::new();
    }
    let mut errors = Vec::new();
    let mut visit = |node: Node<'_>| {
        if node.is_error() {
            let text = node_text(node, source);
            let snippet: String = text.chars().take(20).collect();
            errors.push(SyntaxError {
                loc: node_loc(node),
                message: format!("Unexpected token `{}`", snippet.trim()),
            });
        } else if node.is_missing() {
            errors.push(SyntaxError {
                loc: node_loc(node),
                message: format!("Missing {}", node.kind()),
            });
        }
    };
    visit(root);
    for_each_descendant(root, &mut visit);
    errors
}
