// SPDX-License-Identifier: MIT OR Apache-2.0
//! Per-target-language syntax rules.
//!
//! A [`Syntax`] maps registered types to their spelling in one shading
//! language: declared type names, default values, aggregate construction
//! idioms and restricted identifiers. Everything the generators know about
//! a concrete language's text lives here.

mod glsl;
mod osl;

pub use glsl::{GlslFragmentSyntax, GlslSyntax};
pub use osl::OslSyntax;

use glint_graph::{Type, Value};
use indexmap::IndexMap;
use std::collections::HashSet;

/// Construction idiom for an aggregate type: opening/closing syntax for
/// literal construction plus the accessor used for each component.
#[derive(Debug, Clone)]
pub struct AggregateSyntax {
    /// Opening constructor syntax, e.g. `vec3(`.
    pub open: String,
    /// Closing constructor syntax, e.g. `)`.
    pub close: String,
    /// Component accessors, e.g. `.x`/`.y` or `[0]`/`[1]`.
    pub members: Vec<&'static str>,
}

impl AggregateSyntax {
    /// Create a new construction idiom.
    pub fn new(open: &str, close: &str, members: Vec<&'static str>) -> Self {
        Self {
            open: open.to_string(),
            close: close.to_string(),
            members,
        }
    }

    /// Build a constructed value from component expressions.
    pub fn construct(&self, components: &[String]) -> String {
        format!("{}{}{}", self.open, components.join(", "), self.close)
    }
}

/// Syntax information for one registered type in one target language.
#[derive(Debug, Clone)]
pub struct TypeSyntax {
    /// Declared type name.
    pub name: String,
    /// Default value literal.
    pub default_value: String,
    /// Default value literal valid in a parameter-initialization context.
    pub param_default_value: String,
    /// Type definition emitted once per target when the language lacks the
    /// type natively.
    pub type_definition: Option<String>,
    /// Spelling used when the type appears as an output parameter.
    pub output_name: String,
    /// Construction idiom for aggregate types.
    pub aggregate: Option<AggregateSyntax>,
}

impl TypeSyntax {
    /// Scalar or opaque type syntax.
    pub fn new(name: &str, default_value: &str, param_default_value: &str, output_name: &str) -> Self {
        Self {
            name: name.to_string(),
            default_value: default_value.to_string(),
            param_default_value: param_default_value.to_string(),
            type_definition: None,
            output_name: output_name.to_string(),
            aggregate: None,
        }
    }

    /// Attach a one-shot type definition.
    pub fn with_definition(mut self, definition: &str) -> Self {
        self.type_definition = Some(definition.to_string());
        self
    }

    /// Attach an aggregate construction idiom.
    pub fn with_aggregate(mut self, aggregate: AggregateSyntax) -> Self {
        self.aggregate = Some(aggregate);
        self
    }
}

/// Shared storage for a language's type syntax and restricted names.
#[derive(Debug, Default)]
pub struct SyntaxTable {
    types: IndexMap<Type, TypeSyntax>,
    restricted: HashSet<&'static str>,
}

impl SyntaxTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the syntax for a type.
    pub fn add_type_syntax(&mut self, ty: Type, syntax: TypeSyntax) {
        self.types.insert(ty, syntax);
    }

    /// Add restricted identifiers (keywords and builtins).
    pub fn add_restricted_names(&mut self, names: &[&'static str]) {
        self.restricted.extend(names);
    }

    /// All registered type syntaxes, in registration order.
    pub fn type_syntaxes(&self) -> impl Iterator<Item = (&Type, &TypeSyntax)> {
        self.types.iter()
    }

    fn get(&self, ty: Type) -> Option<&TypeSyntax> {
        self.types.get(&ty)
    }

    fn is_restricted(&self, name: &str) -> bool {
        self.restricted.contains(name)
    }
}

/// Per-target-language syntax rules.
pub trait Syntax {
    /// The backing table.
    fn table(&self) -> &SyntaxTable;

    /// Syntax for a type, or `None` when the language has no mapping for
    /// it. Call sites decide whether that is a skip or an error.
    fn type_syntax(&self, ty: Type) -> Option<&TypeSyntax> {
        self.table().get(ty)
    }

    /// Declared type name.
    fn type_name(&self, ty: Type) -> Option<&str> {
        self.type_syntax(ty).map(|syntax| syntax.name.as_str())
    }

    /// Default value literal.
    fn default_value(&self, ty: Type) -> Option<&str> {
        self.type_syntax(ty)
            .map(|syntax| syntax.default_value.as_str())
    }

    /// Default value literal for a parameter-initialization context.
    fn param_default_value(&self, ty: Type) -> Option<&str> {
        self.type_syntax(ty)
            .map(|syntax| syntax.param_default_value.as_str())
    }

    /// Format a literal value of the given type.
    fn value(&self, ty: Type, value: &Value) -> Option<String> {
        let syntax = self.type_syntax(ty)?;
        match value {
            Value::Float(v) => Some(format_float(*v)),
            Value::Integer(v) => Some(v.to_string()),
            Value::Boolean(v) => Some(v.to_string()),
            Value::String(v) => {
                let aggregate = syntax.aggregate.as_ref()?;
                Some(format!("{}{}{}", aggregate.open, v, aggregate.close))
            }
            _ => {
                let components: Vec<String> = value
                    .components()?
                    .iter()
                    .map(|component| format_float(*component))
                    .collect();
                Some(syntax.aggregate.as_ref()?.construct(&components))
            }
        }
    }

    /// Whether an identifier is reserved in this language.
    fn is_restricted(&self, name: &str) -> bool {
        self.table().is_restricted(name)
    }

    /// Spell a variable name for the target; the type may carry a
    /// naming convention (e.g. sampler suffixes for filenames).
    fn variable_name(&self, name: &str, _ty: Type) -> String {
        sanitize_name(name)
    }

    /// Qualifier used for constant-block declarations.
    fn constant_qualifier(&self) -> &'static str {
        "const"
    }

    /// Qualifier used for uniform declarations.
    fn uniform_qualifier(&self) -> &'static str {
        "uniform"
    }

    /// Spell a channel-mask application on a variable, rebuilding the
    /// target type through its construction idiom.
    fn swizzled_variable(
        &self,
        variable: &str,
        ty: Type,
        channels: &str,
        target_ty: Type,
    ) -> Option<String> {
        let source = self.type_syntax(ty)?;
        let target = self.type_syntax(target_ty)?;

        let mut components = Vec::with_capacity(channels.len());
        for channel in channels.chars() {
            match channel {
                '0' => components.push("0.0".to_string()),
                '1' => components.push("1.0".to_string()),
                _ => {
                    let index = channel_index(channel)?;
                    if ty.is_scalar() {
                        if index != 0 {
                            return None;
                        }
                        components.push(variable.to_string());
                    } else {
                        let member = source.aggregate.as_ref()?.members.get(index)?;
                        components.push(format!("{variable}{member}"));
                    }
                }
            }
        }

        if target_ty.is_scalar() {
            return components.into_iter().next();
        }
        Some(target.aggregate.as_ref()?.construct(&components))
    }
}

fn channel_index(channel: char) -> Option<usize> {
    match channel {
        'r' | 'x' => Some(0),
        'g' | 'y' => Some(1),
        'b' | 'z' => Some(2),
        'a' | 'w' => Some(3),
        _ => None,
    }
}

/// Format a float in fixed notation: always a decimal point, never
/// scientific, so the literal is valid on every target.
pub fn format_float(value: f32) -> String {
    let mut text = format!("{value}");
    if text.contains('e') || text.contains('E') {
        text = format!("{value:.10}");
        while text.ends_with('0') && !text.ends_with(".0") {
            text.pop();
        }
    }
    if !text.contains('.') {
        text.push_str(".0");
    }
    text
}

/// Turn an arbitrary name into a valid identifier.
pub fn sanitize_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() || ch == '_' {
            out.push(ch);
        } else {
            out.push('_');
        }
    }
    if out.is_empty() || out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_float() {
        assert_eq!(format_float(1.0), "1.0");
        assert_eq!(format_float(0.5), "0.5");
        assert_eq!(format_float(-3.0), "-3.0");
        let tiny = format_float(1.0e-9);
        assert!(!tiny.contains('e') && !tiny.contains('E'));
        assert!(tiny.contains('.'));
    }

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("base color"), "base_color");
        assert_eq!(sanitize_name("1stop"), "_1stop");
        assert_eq!(sanitize_name(""), "_");
    }
}
