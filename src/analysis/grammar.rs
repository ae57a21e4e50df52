//! Language grammar definitions for graph extraction
//!
//! Each supported language registers an [`ExtractionGrammar`] mapping
//! semantic concepts to tree-sitter node kinds, plus its conventions
//! for docstrings and import targets. The generic extractor in
//! `extractor.rs` is driven entirely by these tables; adding a language
//! means adding a table and registering it in [`grammar_for`].

use crate::lang::LangFamily;

/// How a language attaches documentation to a definition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocstringStyle {
    /// First string literal in the definition body (Python)
    BodyStringLiteral,
    /// Block or line comment immediately preceding the definition (JS/TS)
    PrecedingComment,
}

/// AST node mappings for one language family
#[derive(Debug, Clone)]
pub struct ExtractionGrammar {
    pub name: &'static str,

    /// Class declaration nodes
    pub class_nodes: &'static [&'static str],
    /// Function/method declaration nodes
    pub function_nodes: &'static [&'static str],
    /// Import statement nodes
    pub import_nodes: &'static [&'static str],
    /// Call expression nodes
    pub call_nodes: &'static [&'static str],

    /// Field name for a definition's identifier
    pub name_field: &'static str,
    /// Field name for a definition's body
    pub body_field: &'static str,
    /// Field name for a function's parameter list
    pub params_field: &'static str,
    /// Field name for a class's base-class clause; empty when the
    /// language expresses inheritance elsewhere
    pub superclass_field: &'static str,
    /// Field name for a call expression's target
    pub call_function_field: &'static str,

    pub docstring_style: DocstringStyle,
}

pub static PYTHON_GRAMMAR: ExtractionGrammar = ExtractionGrammar {
    name: "python",
    class_nodes: &["class_definition"],
    function_nodes: &["function_definition"],
    import_nodes: &["import_statement", "import_from_statement"],
    call_nodes: &["call"],
    name_field: "name",
    body_field: "body",
    params_field: "parameters",
    superclass_field: "superclasses",
    call_function_field: "function",
    docstring_style: DocstringStyle::BodyStringLiteral,
};

pub static JAVASCRIPT_GRAMMAR: ExtractionGrammar = ExtractionGrammar {
    name: "javascript",
    class_nodes: &["class_declaration"],
    function_nodes: &[
        "function_declaration",
        "generator_function_declaration",
        "method_definition",
    ],
    import_nodes: &["import_statement"],
    call_nodes: &["call_expression"],
    name_field: "name",
    body_field: "body",
    params_field: "parameters",
    // JS puts `extends X` in a class_heritage child, not a field
    superclass_field: "",
    call_function_field: "function",
    docstring_style: DocstringStyle::PrecedingComment,
};

pub static TYPESCRIPT_GRAMMAR: ExtractionGrammar = ExtractionGrammar {
    name: "typescript",
    class_nodes: &["class_declaration"],
    function_nodes: &[
        "function_declaration",
        "generator_function_declaration",
        "method_definition",
    ],
    import_nodes: &["import_statement"],
    call_nodes: &["call_expression"],
    name_field: "name",
    body_field: "body",
    params_field: "parameters",
    superclass_field: "",
    call_function_field: "function",
    docstring_style: DocstringStyle::PrecedingComment,
};

/// Grammar table for a language family
pub fn grammar_for(family: LangFamily) -> &'static ExtractionGrammar {
    match family {
        LangFamily::Python => &PYTHON_GRAMMAR,
        LangFamily::JavaScript => &JAVASCRIPT_GRAMMAR,
        LangFamily::TypeScript => &TYPESCRIPT_GRAMMAR,
    }
}
