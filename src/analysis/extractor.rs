//! Generic entity and relationship extraction over tree-sitter
//!
//! One walk serves every registered language: the grammar table says
//! which node kinds are classes, functions, imports, and calls, and how
//! docstrings are attached. Emitted call and inheritance targets are
//! textual; the resolution pass in `analysis::mod` links them to entity
//! ids after insertion.

use tree_sitter::{Node, Parser, Tree};

use crate::analysis::grammar::{grammar_for, DocstringStyle, ExtractionGrammar};
use crate::error::{ParanoidError, Result};
use crate::lang::Lang;
use crate::store::{Entity, EntityKind, RelationKind, Relationship};

/// Extraction result for one file
#[derive(Debug, Default)]
pub struct Extraction {
    pub entities: Vec<Entity>,
    pub relationships: Vec<Relationship>,
}

/// Parse a source file and extract its entities and relationships.
///
/// `file_path` must already be the normalized posix-style path used as
/// the storage key.
pub fn extract_file(file_path: &str, source: &str, lang: Lang) -> Result<Extraction> {
    let mut parser = Parser::new();
    parser
        .set_language(&lang.tree_sitter_language())
        .map_err(|e| ParanoidError::ParseError {
            path: file_path.to_string(),
            message: format!("failed to load grammar: {}", e),
        })?;

    let tree: Tree = parser
        .parse(source, None)
        .ok_or_else(|| ParanoidError::ParseError {
            path: file_path.to_string(),
            message: "parser produced no tree".to_string(),
        })?;

    let root = tree.root_node();
    if root.has_error() {
        return Err(ParanoidError::ParseError {
            path: file_path.to_string(),
            message: "syntax errors in source".to_string(),
        });
    }

    let grammar = grammar_for(lang.family());
    let mut extraction = Extraction::default();
    let ctx = ExtractContext {
        file_path,
        source,
        lang,
        grammar,
    };

    walk_scope(&ctx, root, None, &mut extraction);
    Ok(extraction)
}

struct ExtractContext<'a> {
    file_path: &'a str,
    source: &'a str,
    lang: Lang,
    grammar: &'static ExtractionGrammar,
}

impl<'a> ExtractContext<'a> {
    fn text(&self, node: Node) -> String {
        node.utf8_text(self.source.as_bytes())
            .unwrap_or_default()
            .to_string()
    }

    fn location(&self, node: Node) -> String {
        format!("{}:{}", self.file_path, node.start_position().row + 1)
    }
}

/// Walk one lexical scope (module root or class body), collecting
/// definitions and imports. `parent_class` carries the qualified name
/// of the enclosing class.
fn walk_scope(
    ctx: &ExtractContext<'_>,
    scope: Node,
    parent_class: Option<&str>,
    out: &mut Extraction,
) {
    let mut cursor = scope.walk();
    for child in scope.named_children(&mut cursor) {
        // Python wraps decorated definitions; look through the wrapper
        let node = if child.kind() == "decorated_definition" {
            child
                .child_by_field_name("definition")
                .unwrap_or(child)
        } else {
            child
        };
        let kind = node.kind();

        if ctx.grammar.import_nodes.contains(&kind) {
            extract_import(ctx, node, out);
        } else if ctx.grammar.class_nodes.contains(&kind) {
            extract_class(ctx, node, parent_class, out);
        } else if ctx.grammar.function_nodes.contains(&kind) {
            extract_function(ctx, node, parent_class, out);
        } else if kind == "export_statement" {
            // JS/TS: exported declarations nest one level down
            walk_scope(ctx, node, parent_class, out);
        }
    }
}

fn extract_import(ctx: &ExtractContext<'_>, node: Node, out: &mut Extraction) {
    let mut targets: Vec<String> = Vec::new();

    match ctx.lang.family() {
        crate::lang::LangFamily::Python => {
            if node.kind() == "import_from_statement" {
                if let Some(module) = node.child_by_field_name("module_name") {
                    targets.push(ctx.text(module));
                }
            } else {
                let mut cursor = node.walk();
                for child in node.named_children(&mut cursor) {
                    match child.kind() {
                        "dotted_name" => targets.push(ctx.text(child)),
                        "aliased_import" => {
                            if let Some(name) = child.child_by_field_name("name") {
                                targets.push(ctx.text(name));
                            }
                        }
                        _ => {}
                    }
                }
            }
        }
        _ => {
            // JS/TS: import ... from "module"
            if let Some(source_node) = node.child_by_field_name("source") {
                targets.push(strip_quotes(&ctx.text(source_node)));
            }
        }
    }

    for target in targets {
        out.relationships.push(Relationship {
            id: None,
            kind: RelationKind::Imports,
            from_entity_id: None,
            to_entity_id: None,
            from_file: Some(ctx.file_path.to_string()),
            to_file: Some(target),
            location: Some(ctx.location(node)),
            from_entity_qualified_name: None,
        });
    }
}

fn extract_class(
    ctx: &ExtractContext<'_>,
    node: Node,
    parent_class: Option<&str>,
    out: &mut Extraction,
) {
    let Some(name_node) = node.child_by_field_name(ctx.grammar.name_field) else {
        return;
    };
    let name = ctx.text(name_node);
    let qualified_name = match parent_class {
        Some(parent) => format!("{}.{}", parent, name),
        None => name.clone(),
    };

    let body = node.child_by_field_name(ctx.grammar.body_field);
    let docstring = extract_docstring(ctx, node, body);

    out.entities.push(Entity {
        id: None,
        file_path: ctx.file_path.to_string(),
        kind: EntityKind::Class,
        name,
        qualified_name: qualified_name.clone(),
        parent_name: parent_class.map(str::to_string),
        parent_entity_id: None,
        start_line: node.start_position().row as i64 + 1,
        end_line: node.end_position().row as i64 + 1,
        docstring,
        signature: None,
        language: ctx.lang.name().to_string(),
    });

    for (base_name, base_node) in base_classes(ctx, node) {
        out.relationships.push(Relationship {
            id: None,
            kind: RelationKind::Inherits,
            from_entity_id: None,
            to_entity_id: None,
            from_file: Some(ctx.file_path.to_string()),
            to_file: Some(base_name),
            location: Some(ctx.location(base_node)),
            from_entity_qualified_name: Some(qualified_name.clone()),
        });
    }

    if let Some(body) = body {
        walk_scope(ctx, body, Some(&qualified_name), out);
    }
}

fn extract_function(
    ctx: &ExtractContext<'_>,
    node: Node,
    parent_class: Option<&str>,
    out: &mut Extraction,
) {
    let name = node
        .child_by_field_name(ctx.grammar.name_field)
        .map(|n| ctx.text(n))
        .unwrap_or_else(|| "<anonymous>".to_string());

    let (qualified_name, kind) = match parent_class {
        Some(parent) => (format!("{}.{}", parent, name), EntityKind::Method),
        None => (name.clone(), EntityKind::Function),
    };

    let signature = node
        .child_by_field_name(ctx.grammar.params_field)
        .map(|n| ctx.text(n))
        .unwrap_or_else(|| "()".to_string());

    let body = node.child_by_field_name(ctx.grammar.body_field);
    let docstring = extract_docstring(ctx, node, body);

    if let Some(body) = body {
        extract_calls(ctx, body, &qualified_name, out);
    }

    out.entities.push(Entity {
        id: None,
        file_path: ctx.file_path.to_string(),
        kind,
        name,
        qualified_name,
        parent_name: parent_class.map(str::to_string),
        parent_entity_id: None,
        start_line: node.start_position().row as i64 + 1,
        end_line: node.end_position().row as i64 + 1,
        docstring,
        signature: Some(signature),
        language: ctx.lang.name().to_string(),
    });
}

/// Collect call expressions anywhere inside a function body
fn extract_calls(
    ctx: &ExtractContext<'_>,
    body: Node,
    caller_qualified_name: &str,
    out: &mut Extraction,
) {
    let mut stack = vec![body];
    while let Some(node) = stack.pop() {
        if ctx.grammar.call_nodes.contains(&node.kind()) {
            if let Some(function_node) = node.child_by_field_name(ctx.grammar.call_function_field) {
                let callee = callee_name(ctx, function_node);
                if !callee.is_empty() {
                    out.relationships.push(Relationship {
                        id: None,
                        kind: RelationKind::Calls,
                        from_entity_id: None,
                        to_entity_id: None,
                        from_file: Some(ctx.file_path.to_string()),
                        to_file: Some(callee),
                        location: Some(ctx.location(function_node)),
                        from_entity_qualified_name: Some(caller_qualified_name.to_string()),
                    });
                }
            }
        }
        // Do not descend into nested definitions; they extract their own calls
        if node.id() != body.id()
            && (ctx.grammar.function_nodes.contains(&node.kind())
                || ctx.grammar.class_nodes.contains(&node.kind()))
        {
            continue;
        }
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            stack.push(child);
        }
    }
}

/// Textual name of a call target: `foo()` -> "foo",
/// `obj.method()` -> "method", `Outer.Inner.fn()` -> "fn".
/// An attribute chain on a capitalized head keeps the dotted form so
/// `User.login()` resolves as a qualified name.
fn callee_name(ctx: &ExtractContext<'_>, function_node: Node) -> String {
    match function_node.kind() {
        "identifier" => ctx.text(function_node),
        "attribute" | "member_expression" => {
            let full = ctx.text(function_node);
            let head = full.split('.').next().unwrap_or("");
            if head.chars().next().is_some_and(char::is_uppercase) && full.matches('.').count() >= 1
            {
                full
            } else {
                let field = match function_node.kind() {
                    "attribute" => "attribute",
                    _ => "property",
                };
                function_node
                    .child_by_field_name(field)
                    .map(|n| ctx.text(n))
                    .unwrap_or(full)
            }
        }
        _ => ctx.text(function_node),
    }
}

/// Base classes of a class definition with the node they came from
fn base_classes<'t>(ctx: &ExtractContext<'_>, class_node: Node<'t>) -> Vec<(String, Node<'t>)> {
    let mut bases = Vec::new();

    if !ctx.grammar.superclass_field.is_empty() {
        // Python: superclasses argument_list
        if let Some(superclasses) = class_node.child_by_field_name(ctx.grammar.superclass_field) {
            let mut cursor = superclasses.walk();
            for child in superclasses.named_children(&mut cursor) {
                match child.kind() {
                    "identifier" | "attribute" => bases.push((ctx.text(child), child)),
                    _ => {}
                }
            }
        }
        return bases;
    }

    // JS/TS: class_heritage child holds `extends Base`
    let mut cursor = class_node.walk();
    for child in class_node.named_children(&mut cursor) {
        if child.kind() == "class_heritage" {
            let mut stack = vec![child];
            while let Some(node) = stack.pop() {
                if node.kind() == "identifier" {
                    bases.push((ctx.text(node), node));
                    continue;
                }
                let mut inner = node.walk();
                for grandchild in node.named_children(&mut inner) {
                    stack.push(grandchild);
                }
            }
        }
    }
    bases
}

fn extract_docstring(ctx: &ExtractContext<'_>, node: Node, body: Option<Node>) -> Option<String> {
    match ctx.grammar.docstring_style {
        DocstringStyle::BodyStringLiteral => {
            let body = body?;
            let first = body.named_child(0)?;
            if first.kind() != "expression_statement" {
                return None;
            }
            let expr = first.named_child(0)?;
            if expr.kind() != "string" {
                return None;
            }
            let raw = ctx.text(expr);
            let cleaned = raw.trim_matches(|c| c == '"' || c == '\'').trim();
            if cleaned.is_empty() {
                None
            } else {
                Some(cleaned.to_string())
            }
        }
        DocstringStyle::PrecedingComment => {
            let previous = node.prev_named_sibling()?;
            if previous.kind() != "comment" {
                return None;
            }
            // Only comments directly above the definition count
            if node.start_position().row > previous.end_position().row + 1 {
                return None;
            }
            let raw = ctx.text(previous);
            let cleaned: String = raw
                .lines()
                .map(|line| {
                    line.trim()
                        .trim_start_matches("/**")
                        .trim_start_matches("/*")
                        .trim_end_matches("*/")
                        .trim_start_matches("*")
                        .trim_start_matches("///")
                        .trim_start_matches("//")
                        .trim()
                })
                .filter(|line| !line.is_empty())
                .collect::<Vec<_>>()
                .join("\n");
            if cleaned.is_empty() {
                None
            } else {
                Some(cleaned)
            }
        }
    }
}

fn strip_quotes(raw: &str) -> String {
    raw.trim_matches(|c| c == '"' || c == '\'' || c == '`').to_string()
}

/// Heuristics for the doc_quality table
pub fn doc_quality_heuristics(entity: &Entity) -> (bool, bool, bool, i64) {
    let has_docstring = entity.docstring.as_deref().is_some_and(|d| !d.is_empty());
    let has_examples = entity
        .docstring
        .as_deref()
        .is_some_and(|d| d.contains(">>>") || d.to_lowercase().contains("example"));
    let has_type_hints = entity
        .signature
        .as_deref()
        .is_some_and(|s| s.contains(':') || s.contains("->"));

    let mut score: i64 = 0;
    if !has_docstring {
        score += 50;
    }
    if !has_type_hints {
        score += 20;
    }
    if entity.kind == EntityKind::Class {
        score += 10;
    }
    if !entity.name.starts_with('_') {
        score += 20;
    }
    (has_docstring, has_examples, has_type_hints, score)
}
