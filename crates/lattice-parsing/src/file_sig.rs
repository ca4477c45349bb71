//! File-signature extraction: the import/export-level summary of a file,
//! independent of types. Single preorder pass over the syntax tree.

use std::sync::OnceLock;

use lattice_core::types::artifacts::{FileSig, ModuleKind, SigImport, TolerableError};
use regex::Regex;
use tree_sitter::{Node, Tree};

use crate::parser::{for_each_descendant, node_loc, node_text};

/// Per-file options, already resolved against the global configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileSigOptions<'a> {
    pub enable_enums: bool,
    /// Relay integration, with the exclusion list already applied.
    pub enable_relay_integration: bool,
    pub relay_module_prefix: Option<&'a str>,
    pub module_ref_prefix: Option<&'a str>,
    pub module_ref_prefix_legacy_interop: Option<&'a str>,
}

/// Extract the file signature and any tolerable errors found on the way.
pub fn extract_file_sig(
    tree: &Tree,
    source: &str,
    opts: &FileSigOptions<'_>,
) -> (FileSig, Vec<TolerableError>) {
    let mut sig = FileSig::default();
    let mut errors = Vec::new();

    let mut visit = |node: Node<'_>| match node.kind() {
        "import_statement" => {
            sig.module_kind = ModuleKind::Es;
            if let Some(source_node) = node.child_by_field_name("source") {
                let specifier = string_value(source_node, source);
                sig.require_set.push(specifier.clone());
                sig.imports.push(SigImport {
                    source: specifier,
                    names: import_names(node, source),
                });
            }
        }
        "export_statement" => {
            sig.module_kind = ModuleKind::Es;
            if let Some(source_node) = node.child_by_field_name("source") {
                sig.require_set.push(string_value(source_node, source));
            }
            collect_exports(node, source, &mut sig);
        }
        "call_expression" => {
            collect_call(node, source, opts, &mut sig, &mut errors);
        }
        "assignment_expression" => {
            collect_commonjs_export(node, source, &mut sig);
        }
        "string" => {
            collect_module_ref(node, source, opts, &mut sig);
        }
        _ => {}
    };
    for_each_descendant(tree.root_node(), &mut visit);

    (sig, errors)
}

/// Inner text of a string literal node, without quotes.
fn string_value(node: Node<'_>, source: &str) -> String {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.kind() == "string_fragment" {
            return node_text(child, source).to_string();
        }
    }
    String::new()
}

fn import_names(import: Node<'_>, source: &str) -> Vec<String> {
    let mut names = Vec::new();
    let mut cursor = import.walk();
    for child in import.children(&mut cursor) {
        if child.kind() != "import_clause" {
            continue;
        }
        let mut clause_cursor = child.walk();
        for clause_child in child.children(&mut clause_cursor) {
            match clause_child.kind() {
                // Default import binding.
                "identifier" => names.push("default".to_string()),
                "namespace_import" => names.push("*".to_string()),
                "named_imports" => {
                    let mut visit = |n: Node<'_>| {
                        if n.kind() == "import_specifier" {
                            if let Some(name) = n.child_by_field_name("name") {
                                names.push(node_text(name, source).to_string());
                            }
                        }
                    };
                    for_each_descendant(clause_child, &mut visit);
                }
                _ => {}
            }
        }
    }
    names
}

fn collect_exports(export: Node<'_>, source: &str, sig: &mut FileSig) {
    let mut cursor = export.walk();
    for child in export.children(&mut cursor) {
        match child.kind() {
            "default" => sig.has_default_export = true,
            "export_clause" => {
                let mut visit = |n: Node<'_>| {
                    if n.kind() == "export_specifier" {
                        if let Some(name) = n.child_by_field_name("name") {
                            sig.export_names.push(node_text(name, source).to_string());
                        }
                    }
                };
                for_each_descendant(child, &mut visit);
            }
            _ => {}
        }
    }
    if let Some(decl) = export.child_by_field_name("declaration") {
        collect_declaration_names(decl, source, sig);
    }
}

fn collect_declaration_names(decl: Node<'_>, source: &str, sig: &mut FileSig) {
    match decl.kind() {
        "lexical_declaration" | "variable_declaration" => {
            let mut visit = |n: Node<'_>| {
                if n.kind() == "variable_declarator" {
                    if let Some(name) = n.child_by_field_name("name") {
                        collect_binding_names(name, source, &mut sig.export_names);
                    }
                }
            };
            for_each_descendant(decl, &mut visit);
        }
        "function_declaration"
        | "generator_function_declaration"
        | "class_declaration"
        | "abstract_class_declaration"
        | "enum_declaration"
        | "type_alias_declaration"
        | "interface_declaration" => {
            if let Some(name) = decl.child_by_field_name("name") {
                sig.export_names.push(node_text(name, source).to_string());
            }
        }
        _ => {}
    }
}

/// Identifier names bound by a (possibly destructuring) pattern.
fn collect_binding_names(pattern: Node<'_>, source: &str, out: &mut Vec<String>) {
    match pattern.kind() {
        "identifier" => out.push(node_text(pattern, source).to_string()),
        _ => {
            let mut visit = |n: Node<'_>| {
                if matches!(
                    n.kind(),
                    "identifier" | "shorthand_property_identifier_pattern"
                ) {
                    out.push(node_text(n, source).to_string());
                }
            };
            for_each_descendant(pattern, &mut visit);
        }
    }
}

fn collect_call(
    node: Node<'_>,
    source: &str,
    opts: &FileSigOptions<'_>,
    sig: &mut FileSig,
    errors: &mut Vec<TolerableError>,
) {
    let Some(function) = node.child_by_field_name("function") else {
        return;
    };
    if function.kind() != "identifier" {
        return;
    }
    let Some(arguments) = node.child_by_field_name("arguments") else {
        return;
    };
    match node_text(function, source) {
        "require" => {
            let args: Vec<Node<'_>> = {
                let mut cursor = arguments.walk();
                arguments.named_children(&mut cursor).collect()
            };
            match args.as_slice() {
                [arg] if arg.kind() == "string" => {
                    sig.require_set.push(string_value(*arg, source));
                }
                _ => errors.push(TolerableError::UnsupportedRequire {
                    loc: node_loc(node),
                }),
            }
        }
        // A tagged template parses as a call whose arguments are the
        // template string.
        "graphql" if opts.enable_relay_integration && arguments.kind() == "template_string" => {
            if let Some(name) = graphql_operation_name(node_text(arguments, source)) {
                let prefix = opts.relay_module_prefix.unwrap_or("");
                sig.require_set.push(format!("{prefix}{name}.graphql"));
            }
        }
        _ => {}
    }
}

fn graphql_operation_name(template: &str) -> Option<String> {
    static OPERATION: OnceLock<Option<Regex>> = OnceLock::new();
    let re = OPERATION
        .get_or_init(|| Regex::new(r"(?:query|mutation|subscription|fragment)\s+([A-Za-z0-9_]+)").ok())
        .as_ref()?;
    re.captures(template).map(|c| c[1].to_string())
}

fn collect_commonjs_export(node: Node<'_>, source: &str, sig: &mut FileSig) {
    let Some(left) = node.child_by_field_name("left") else {
        return;
    };
    if left.kind() != "member_expression" {
        return;
    }
    match node_text(left, source) {
        "module.exports" => sig.has_default_export = true,
        text => {
            if let Some(name) = text
                .strip_prefix("module.exports.")
                .or_else(|| text.strip_prefix("exports."))
            {
                if !name.contains('.') {
                    sig.export_names.push(name.to_string());
                }
            }
        }
    }
}

fn collect_module_ref(
    node: Node<'_>,
    source: &str,
    opts: &FileSigOptions<'_>,
    sig: &mut FileSig,
) {
    let prefixes = [opts.module_ref_prefix, opts.module_ref_prefix_legacy_interop];
    if prefixes.iter().all(Option::is_none) {
        return;
    }
    let value = string_value(node, source);
    for prefix in prefixes.into_iter().flatten() {
        if let Some(module) = value.strip_prefix(prefix) {
            if !module.is_empty() {
                sig.require_set.push(module.to_string());
            }
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{ParsedSource, ParserOptions, SourceParser, TreeSitterParser};
    use std::path::PathBuf;

    fn parse(content: &str) -> ParsedSource {
        TreeSitterParser
            .parse(
                content,
                &PathBuf::from("test.js"),
                &ParserOptions {
                    types: true,
                    ..Default::default()
                },
            )
            .expect("parser available")
    }

    fn sig_of(content: &str, opts: &FileSigOptions<'_>) -> (FileSig, Vec<TolerableError>) {
        let parsed = parse(content);
        extract_file_sig(&parsed.tree, content, opts)
    }

    #[test]
    fn imports_become_requires() {
        let (sig, errors) = sig_of(
            "import React from 'react';\nimport {map} from './util';\n",
            &FileSigOptions::default(),
        );
        assert!(errors.is_empty());
        assert_eq!(sig.require_set.as_slice(), ["react", "./util"]);
        assert_eq!(sig.module_kind, ModuleKind::Es);
        assert_eq!(sig.imports[0].names, vec!["default".to_string()]);
        assert_eq!(sig.imports[1].names, vec!["map".to_string()]);
    }

    #[test]
    fn require_calls_become_requires() {
        let (sig, errors) = sig_of(
            "const fs = require('fs');\nconst x = require(dynamic);\n",
            &FileSigOptions::default(),
        );
        assert_eq!(sig.require_set.as_slice(), ["fs"]);
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], TolerableError::UnsupportedRequire { .. }));
        assert_eq!(sig.module_kind, ModuleKind::CommonJs);
    }

    #[test]
    fn export_declarations_are_named() {
        let (sig, _) = sig_of(
            "export const a = 1, {b, c} = obj;\nexport function f() {}\nexport default 3;\n",
            &FileSigOptions::default(),
        );
        assert_eq!(sig.export_names, vec!["a", "b", "c", "f"]);
        assert!(sig.has_default_export);
    }

    #[test]
    fn reexport_pulls_in_the_source() {
        let (sig, _) = sig_of("export {x} from './x';\n", &FileSigOptions::default());
        assert_eq!(sig.require_set.as_slice(), ["./x"]);
        assert_eq!(sig.export_names, vec!["x"]);
    }

    #[test]
    fn commonjs_exports() {
        let (sig, _) = sig_of(
            "module.exports = main;\nexports.helper = () => {};\n",
            &FileSigOptions::default(),
        );
        assert!(sig.has_default_export);
        assert_eq!(sig.export_names, vec!["helper"]);
        assert_eq!(sig.module_kind, ModuleKind::CommonJs);
    }

    #[test]
    fn graphql_tags_become_relay_requires() {
        let content = "const q = graphql`query WidgetQuery { id }`;\n";
        let opts = FileSigOptions {
            enable_relay_integration: true,
            relay_module_prefix: Some("artifacts/"),
            ..Default::default()
        };
        let (sig, _) = sig_of(content, &opts);
        assert_eq!(sig.require_set.as_slice(), ["artifacts/WidgetQuery.graphql"]);

        // Integration off: the tag is ignored.
        let (sig, _) = sig_of(content, &FileSigOptions::default());
        assert!(sig.require_set.is_empty());
    }

    #[test]
    fn module_ref_prefix_strings() {
        let opts = FileSigOptions {
            module_ref_prefix: Some("m#"),
            ..Default::default()
        };
        let (sig, _) = sig_of("const ref = 'm#Widget';\nconst plain = 'Widget';\n", &opts);
        assert_eq!(sig.require_set.as_slice(), ["Widget"]);
    }
}
