//! Type-signature packing: compact, serializable descriptions of a
//! module's type-level exports, derived from the syntax tree.
//!
//! The packer is tolerant: exports it cannot represent produce `SigError`s
//! and pack as `Any`. `Sig`-kind errors are surfaced by the pipeline as
//! signature-verification diagnostics; `Check`-kind errors are dropped.

use lattice_core::types::artifacts::{FileSig, Loc, Locs, PackedExport, PackedTy, TypeSig};
use lattice_core::ParsingOptions;
use tree_sitter::{Node, Tree};

use crate::parser::{for_each_descendant, node_loc, node_text};

/// Errors from the packer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SigError {
    /// Signature defect visible to the file's author; the location indexes
    /// into the packer's `Locs` table.
    Sig { loc_index: u32, message: String },
    /// Internal consistency defect; dropped by the pipeline.
    Check { message: String },
}

/// Inputs to the packer.
pub struct SigInput<'a> {
    pub tree: &'a Tree,
    pub source: &'a str,
    pub file_sig: &'a FileSig,
    pub strict: bool,
    pub options: &'a ParsingOptions,
}

/// Pack the module's exports. Returns the errors, the location table the
/// errors index into, and the signature itself.
pub fn pack_type_sig(input: &SigInput<'_>) -> (Vec<SigError>, Locs, TypeSig) {
    let mut packer = Packer {
        source: input.source,
        options: input.options,
        errors: Vec::new(),
        locs: Locs::default(),
        exports: Vec::new(),
        default_export: None,
    };

    let root = input.tree.root_node();
    let mut cursor = root.walk();
    for child in root.children(&mut cursor) {
        if child.kind() == "export_statement" {
            packer.pack_export_statement(child);
        }
    }

    let sig = TypeSig {
        module_kind: input.file_sig.module_kind,
        exports: packer.exports,
        default_export: packer.default_export,
        exact_by_default: input.options.exact_by_default,
        strict: input.strict,
    };
    (packer.errors, packer.locs, sig)
}

struct Packer<'a> {
    source: &'a str,
    options: &'a ParsingOptions,
    errors: Vec<SigError>,
    locs: Locs,
    exports: Vec<PackedExport>,
    default_export: Option<PackedTy>,
}

impl<'a> Packer<'a> {
    fn text(&self, node: Node<'_>) -> &'a str {
        node_text(node, self.source)
    }

    fn pack_export_statement(&mut self, export: Node<'_>) {
        let is_default = {
            let mut cursor = export.walk();
            let has_default = export.children(&mut cursor).any(|c| c.kind() == "default");
            has_default
        };

        if is_default {
            if let Some(value) = export.child_by_field_name("value") {
                self.default_export = Some(self.pack_default_value(value));
            } else if let Some(decl) = export.child_by_field_name("declaration") {
                self.default_export = Some(self.pack_declaration_ty(decl));
            }
            return;
        }

        if let Some(decl) = export.child_by_field_name("declaration") {
            self.pack_declaration(decl);
            return;
        }

        // `export { a, b }` — the local bindings are not resolved here.
        let mut specifiers = Vec::new();
        let mut visit = |n: Node<'_>| {
            if n.kind() == "export_specifier" {
                if let Some(name) = n.child_by_field_name("name") {
                    specifiers.push(node_text(name, self.source).to_string());
                }
            }
        };
        for_each_descendant(export, &mut visit);
        for name in specifiers {
            self.errors.push(SigError::Check {
                message: format!("export `{name}` re-exports a local binding"),
            });
            self.exports.push(PackedExport {
                name,
                ty: PackedTy::Unknown,
            });
        }
    }

    fn pack_declaration<'b>(&mut self, decl: Node<'b>) {
        match decl.kind() {
            "lexical_declaration" | "variable_declaration" => {
                let mut declarators: Vec<Node<'b>> = Vec::new();
                let mut visit = |n: Node<'b>| {
                    if n.kind() == "variable_declarator" {
                        declarators.push(n);
                    }
                };
                for_each_descendant(decl, &mut visit);
                for declarator in declarators {
                    self.pack_declarator(declarator);
                }
            }
            "function_declaration" | "generator_function_declaration" => {
                if let Some(name) = decl.child_by_field_name("name") {
                    let ty = PackedTy::Function {
                        arity: arity_of(decl),
                    };
                    self.push_export(self.text(name).to_string(), ty, node_loc(name));
                }
            }
            "class_declaration" | "abstract_class_declaration" => {
                if let Some(name) = decl.child_by_field_name("name") {
                    let ty = self.pack_class(decl);
                    self.push_export(self.text(name).to_string(), ty, node_loc(name));
                }
            }
            "enum_declaration" => {
                if let Some(name) = decl.child_by_field_name("name") {
                    let ty = PackedTy::Enum {
                        name: self.text(name).to_string(),
                    };
                    self.push_export(self.text(name).to_string(), ty, node_loc(name));
                }
            }
            "type_alias_declaration" | "interface_declaration" => {
                if let Some(name) = decl.child_by_field_name("name") {
                    let ty = PackedTy::Alias(self.text(name).to_string());
                    self.push_export(self.text(name).to_string(), ty, node_loc(name));
                }
            }
            _ => {}
        }
    }

    fn pack_declarator(&mut self, declarator: Node<'_>) {
        let Some(name) = declarator.child_by_field_name("name") else {
            return;
        };
        if name.kind() != "identifier" {
            // Destructured exports carry no useful signature.
            for_each_descendant(name, &mut |n: Node<'_>| {
                if matches!(
                    n.kind(),
                    "identifier" | "shorthand_property_identifier_pattern"
                ) {
                    self.push_export(
                        node_text(n, self.source).to_string(),
                        PackedTy::Unknown,
                        node_loc(n),
                    );
                }
            });
            return;
        }

        let ty = if let Some(annotation) = declarator.child_by_field_name("type") {
            self.pack_annotation(annotation)
        } else if let Some(value) = declarator.child_by_field_name("value") {
            self.pack_value(value, name)
        } else {
            PackedTy::Unknown
        };
        self.push_export(self.text(name).to_string(), ty, node_loc(name));
    }

    fn push_export(&mut self, name: String, ty: PackedTy, loc: Loc) {
        self.locs.push(loc);
        self.exports.push(PackedExport { name, ty });
    }

    fn pack_default_value(&mut self, value: Node<'_>) -> PackedTy {
        match value.kind() {
            "string" | "number" | "true" | "false" | "arrow_function" | "function_expression"
            | "function" | "generator_function" | "class" | "object" | "identifier" => {
                self.pack_value_quiet(value)
            }
            _ => {
                let loc_index = self.locs.push(node_loc(value));
                self.errors.push(SigError::Sig {
                    loc_index,
                    message: "default export expression is not representable in a module \
                              signature; add a type annotation"
                        .to_string(),
                });
                PackedTy::Any
            }
        }
    }

    fn pack_declaration_ty(&mut self, decl: Node<'_>) -> PackedTy {
        match decl.kind() {
            "function_declaration" | "generator_function_declaration" => PackedTy::Function {
                arity: arity_of(decl),
            },
            "class_declaration" | "abstract_class_declaration" => self.pack_class(decl),
            _ => PackedTy::Unknown,
        }
    }

    /// Pack an initializer expression for a named export.
    fn pack_value(&mut self, value: Node<'_>, name: Node<'_>) -> PackedTy {
        match value.kind() {
            "string" | "number" | "true" | "false" | "template_string" | "arrow_function"
            | "function_expression" | "function" | "generator_function" | "class" | "object"
            | "identifier" | "new_expression" => self.pack_value_quiet(value),
            _ => {
                let loc_index = self.locs.push(node_loc(name));
                self.errors.push(SigError::Sig {
                    loc_index,
                    message: format!(
                        "cannot derive the type of `{}` from its initializer; add an annotation",
                        self.text(name)
                    ),
                });
                PackedTy::Any
            }
        }
    }

    fn pack_value_quiet(&mut self, value: Node<'_>) -> PackedTy {
        match value.kind() {
            "string" => {
                let text = self.text(value);
                let inner = text
                    .strip_prefix(['"', '\''])
                    .and_then(|t| t.strip_suffix(['"', '\'']))
                    .unwrap_or(text);
                if inner.len() > self.options.max_literal_len {
                    PackedTy::String
                } else {
                    PackedTy::StringLit(inner.to_string())
                }
            }
            "template_string" => PackedTy::String,
            "number" => PackedTy::NumberLit(self.text(value).to_string()),
            "true" | "false" => PackedTy::Boolean,
            "arrow_function" | "function_expression" | "function" | "generator_function" => {
                PackedTy::Function {
                    arity: arity_of(value),
                }
            }
            "class" => self.pack_class(value),
            "object" => PackedTy::Object,
            "identifier" => self.alias_or_suppressed(self.text(value)),
            "new_expression" => value
                .child_by_field_name("constructor")
                .map(|c| self.alias_or_suppressed(self.text(c)))
                .unwrap_or(PackedTy::Unknown),
            _ => PackedTy::Unknown,
        }
    }

    fn pack_class(&mut self, class: Node<'_>) -> PackedTy {
        let name = class
            .child_by_field_name("name")
            .map(|n| self.text(n).to_string())
            .unwrap_or_default();
        let mut members = Vec::new();
        if let Some(body) = class.child_by_field_name("body") {
            let mut cursor = body.walk();
            for member in body.children(&mut cursor) {
                let member_name = match member.kind() {
                    "method_definition" | "public_field_definition" | "field_definition" => {
                        member.child_by_field_name("name").map(|n| self.text(n))
                    }
                    _ => None,
                };
                if let Some(member_name) = member_name {
                    if self.options.munge_underscores && member_name.starts_with('_') {
                        continue;
                    }
                    members.push(member_name.to_string());
                }
            }
        }
        PackedTy::Class { name, members }
    }

    fn alias_or_suppressed(&self, name: &str) -> PackedTy {
        if self.options.suppress_types.contains(name) {
            PackedTy::Any
        } else {
            PackedTy::Alias(name.to_string())
        }
    }

    /// Pack a `type_annotation` node.
    fn pack_annotation(&mut self, annotation: Node<'_>) -> PackedTy {
        let Some(ty) = annotation.named_child(0) else {
            return PackedTy::Unknown;
        };
        self.pack_ty(ty)
    }

    fn pack_ty(&mut self, ty: Node<'_>) -> PackedTy {
        match ty.kind() {
            "parenthesized_type" => ty
                .named_child(0)
                .map(|inner| self.pack_ty(inner))
                .unwrap_or(PackedTy::Unknown),
            "predefined_type" => match self.text(ty) {
                "string" => PackedTy::String,
                "number" => PackedTy::Number,
                "boolean" => PackedTy::Boolean,
                "any" => PackedTy::Any,
                other => PackedTy::Alias(other.to_string()),
            },
            "literal_type" => ty
                .named_child(0)
                .map(|inner| self.pack_value_quiet(inner))
                .unwrap_or(PackedTy::Unknown),
            "conditional_type" => {
                if self.options.enable_conditional_types {
                    PackedTy::Alias(self.text(ty).to_string())
                } else {
                    PackedTy::Any
                }
            }
            "tuple_type" => {
                let enhanced = has_descendant(ty, &["optional_type", "rest_type"]);
                if enhanced && !self.options.tuple_enhancements {
                    PackedTy::Any
                } else {
                    PackedTy::Alias(self.text(ty).to_string())
                }
            }
            "object_type" => {
                if has_descendant(ty, &["mapped_type_clause"])
                    && !self.options.enable_mapped_types
                {
                    PackedTy::Any
                } else {
                    PackedTy::Object
                }
            }
            "type_identifier" => self.alias_or_suppressed(self.text(ty)),
            "generic_type" => ty
                .child_by_field_name("name")
                .map(|n| self.alias_or_suppressed(self.text(n)))
                .unwrap_or(PackedTy::Unknown),
            _ => PackedTy::Alias(self.text(ty).to_string()),
        }
    }
}

fn arity_of(function: Node<'_>) -> u32 {
    function
        .child_by_field_name("parameters")
        .map(|params| {
            let mut cursor = params.walk();
            params.named_children(&mut cursor).count() as u32
        })
        .unwrap_or_else(|| u32::from(function.child_by_field_name("parameter").is_some()))
}

fn has_descendant(node: Node<'_>, kinds: &[&str]) -> bool {
    let mut found = false;
    let mut visit = |n: Node<'_>| {
        if kinds.contains(&n.kind()) {
            found = true;
        }
    };
    for_each_descendant(node, &mut visit);
    found
}
