//! Free-variable collection: the set of names a file reads from the global
//! scope. Function-level scoping with hoisted declarations gathered in a
//! pre-pass per scope.

use lattice_core::FxHashSet;
use tree_sitter::{Node, Tree};

use crate::parser::node_text;

/// Options for the scope pass.
#[derive(Debug, Clone, Default)]
pub struct ScopeOptions {
    pub enable_enums: bool,
    /// Names treated as ambient (declared by the environment).
    pub ambient: Vec<String>,
}

/// Collect the free-variable set of a file.
pub fn collect_globals(tree: &Tree, source: &str, opts: &ScopeOptions) -> FxHashSet<String> {
    let mut globals = FxHashSet::default();
    let mut scopes: Vec<FxHashSet<String>> = Vec::new();
    visit_scope(tree.root_node(), source, &mut scopes, &mut globals, opts);
    globals
}

fn is_scope_root(kind: &str) -> bool {
    matches!(
        kind,
        "program"
            | "function_declaration"
            | "function_expression"
            | "function"
            | "generator_function"
            | "generator_function_declaration"
            | "arrow_function"
            | "method_definition"
    )
}

fn visit_scope<'a>(
    node: Node<'a>,
    source: &str,
    scopes: &mut Vec<FxHashSet<String>>,
    globals: &mut FxHashSet<String>,
    opts: &ScopeOptions,
) {
    scopes.push(gather_declarations(node, source, opts));
    visit_children(node, source, scopes, globals, opts);
    scopes.pop();
}

fn visit_children<'a>(
    node: Node<'a>,
    source: &str,
    scopes: &mut Vec<FxHashSet<String>>,
    globals: &mut FxHashSet<String>,
    opts: &ScopeOptions,
) {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        visit(child, source, scopes, globals, opts);
    }
}

fn visit<'a>(
    node: Node<'a>,
    source: &str,
    scopes: &mut Vec<FxHashSet<String>>,
    globals: &mut FxHashSet<String>,
    opts: &ScopeOptions,
) {
    if is_scope_root(node.kind()) {
        visit_scope(node, source, scopes, globals, opts);
        return;
    }
    if node.kind() == "identifier" {
        let name = node_text(node, source);
        let declared = scopes.iter().rev().any(|scope| scope.contains(name));
        if !declared && !opts.ambient.iter().any(|a| a == name) {
            globals.insert(name.to_string());
        }
    }
    visit_children(node, source, scopes, globals, opts);
}

/// Hoisted declarations of one scope: everything declared anywhere in the
/// scope body, not descending into nested functions (except for their
/// hoisted names).
fn gather_declarations(
    scope_root: Node<'_>,
    source: &str,
    opts: &ScopeOptions,
) -> FxHashSet<String> {
    let mut decls = FxHashSet::default();
    // A named function binds its own name inside its body.
    if let Some(name) = scope_root.child_by_field_name("name") {
        if name.kind() == "identifier" {
            decls.insert(node_text(name, source).to_string());
        }
    }
    // Bare arrow parameter (`x => ...`) has no formal_parameters node.
    if let Some(param) = scope_root.child_by_field_name("parameter") {
        collect_pattern_identifiers(param, source, &mut decls);
    }
    gather_into(scope_root, source, opts, &mut decls);
    decls
}

fn gather_into(
    node: Node<'_>,
    source: &str,
    opts: &ScopeOptions,
    decls: &mut FxHashSet<String>,
) {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        match child.kind() {
            kind if is_scope_root(kind) => {
                // Hoisted binding in this scope; body belongs to the nested one.
                if let Some(name) = child.child_by_field_name("name") {
                    if name.kind() == "identifier" {
                        decls.insert(node_text(name, source).to_string());
                    }
                }
            }
            "variable_declarator" => {
                if let Some(name) = child.child_by_field_name("name") {
                    collect_pattern_identifiers(name, source, decls);
                }
                if let Some(value) = child.child_by_field_name("value") {
                    gather_into(value, source, opts, decls);
                }
            }
            "class_declaration" | "abstract_class_declaration" => {
                if let Some(name) = child.child_by_field_name("name") {
                    decls.insert(node_text(name, source).to_string());
                }
                gather_into(child, source, opts, decls);
            }
            "import_statement" => {
                let mut clause_cursor = child.walk();
                for import_child in child.children(&mut clause_cursor) {
                    if import_child.kind() == "import_clause" {
                        collect_pattern_identifiers(import_child, source, decls);
                    }
                }
            }
            "formal_parameters" => {
                collect_pattern_identifiers(child, source, decls);
            }
            "catch_clause" => {
                if let Some(param) = child.child_by_field_name("parameter") {
                    collect_pattern_identifiers(param, source, decls);
                }
                gather_into(child, source, opts, decls);
            }
            "enum_declaration" if opts.enable_enums => {
                if let Some(name) = child.child_by_field_name("name") {
                    decls.insert(node_text(name, source).to_string());
                }
            }
            "type_alias_declaration" | "interface_declaration" => {
                // Type-level bindings; never free variables at runtime.
            }
            _ => gather_into(child, source, opts, decls),
        }
    }
}

fn collect_pattern_identifiers(node: Node<'_>, source: &str, out: &mut FxHashSet<String>) {
    if node.kind() == "identifier" {
        out.insert(node_text(node, source).to_string());
        return;
    }
    let mut visit = |n: Node<'_>| {
        if matches!(
            n.kind(),
            "identifier" | "shorthand_property_identifier_pattern"
        ) {
            out.insert(node_text(n, source).to_string());
        }
    };
    crate::parser::for_each_descendant(node, &mut visit);
}
