// SPDX-License-Identifier: MIT OR Apache-2.0
//! OSL syntax rules.

use super::{AggregateSyntax, Syntax, SyntaxTable, TypeSyntax};
use glint_graph::types;

/// Syntax rules for Open Shading Language.
#[derive(Debug)]
pub struct OslSyntax {
    table: SyntaxTable,
}

impl OslSyntax {
    /// Create the OSL syntax rules.
    pub fn new() -> Self {
        let mut table = SyntaxTable::new();

        table.add_restricted_names(&[
            "and", "break", "closure", "color", "continue", "do", "else", "emit", "float",
            "for", "if", "illuminance", "illuminate", "int", "matrix", "normal", "not",
            "or", "output", "point", "public", "return", "string", "struct", "vector",
            "void", "while", "bool", "case", "catch", "char", "class", "const", "delete",
            "default", "double", "enum", "extern", "false", "friend", "goto", "inline",
            "long", "new", "operator", "private", "protected", "short", "signed",
            "sizeof", "static", "switch", "template", "this", "throw", "true", "try",
            "typedef", "uniform", "union", "unsigned", "varying", "virtual", "volatile",
            "emission",
        ]);

        table.add_type_syntax(
            types::FLOAT,
            TypeSyntax::new("float", "0.0", "0.0", "output float"),
        );
        table.add_type_syntax(
            types::INTEGER,
            TypeSyntax::new("int", "0", "0", "output int"),
        );
        table.add_type_syntax(
            types::BOOLEAN,
            TypeSyntax::new("int", "0", "0", "output int")
                .with_definition("#define true 1\n#define false 0"),
        );
        table.add_type_syntax(
            types::COLOR2,
            TypeSyntax::new("color2", "color2(0.0, 0.0)", "color2(0.0, 0.0)", "output color2")
                .with_definition("struct color2 { float r; float a; };")
                .with_aggregate(AggregateSyntax::new("color2(", ")", vec![".r", ".a"])),
        );
        table.add_type_syntax(
            types::COLOR3,
            TypeSyntax::new(
                "color",
                "color(0.0, 0.0, 0.0)",
                "color(0.0, 0.0, 0.0)",
                "output color",
            )
            .with_aggregate(AggregateSyntax::new("color(", ")", vec!["[0]", "[1]", "[2]"])),
        );
        table.add_type_syntax(
            types::COLOR4,
            TypeSyntax::new(
                "color4",
                "color4(color(0.0), 0.0)",
                "color4(color(0.0), 0.0)",
                "output color4",
            )
            .with_definition(
                "struct color4 { color rgb; float a; };\ncolor4 color4_pack(float r, float g, float b, float a) { return color4(color(r,g,b), a); }",
            )
            .with_aggregate(AggregateSyntax::new(
                "color4_pack(",
                ")",
                vec![".rgb[0]", ".rgb[1]", ".rgb[2]", ".a"],
            )),
        );
        table.add_type_syntax(
            types::VECTOR2,
            TypeSyntax::new(
                "vector2",
                "vector2(0.0, 0.0)",
                "vector2(0.0, 0.0)",
                "output vector2",
            )
            .with_definition("struct vector2 { float x; float y; };")
            .with_aggregate(AggregateSyntax::new("vector2(", ")", vec![".x", ".y"])),
        );
        table.add_type_syntax(
            types::VECTOR3,
            TypeSyntax::new(
                "vector",
                "vector(0.0, 0.0, 0.0)",
                "vector(0.0, 0.0, 0.0)",
                "output vector",
            )
            .with_aggregate(AggregateSyntax::new("vector(", ")", vec!["[0]", "[1]", "[2]"])),
        );
        table.add_type_syntax(
            types::VECTOR4,
            TypeSyntax::new(
                "vector4",
                "vector4(0.0, 0.0, 0.0, 0.0)",
                "vector4(0.0, 0.0, 0.0, 0.0)",
                "output vector4",
            )
            .with_definition("struct vector4 { float x; float y; float z; float w; };")
            .with_aggregate(AggregateSyntax::new(
                "vector4(",
                ")",
                vec![".x", ".y", ".z", ".w"],
            )),
        );
        table.add_type_syntax(
            types::MATRIX33,
            TypeSyntax::new("matrix", "1", "1", "output matrix"),
        );
        table.add_type_syntax(
            types::MATRIX44,
            TypeSyntax::new("matrix", "1", "1", "output matrix"),
        );
        table.add_type_syntax(
            types::STRING,
            TypeSyntax::new("string", "\"\"", "\"\"", "output string")
                .with_aggregate(AggregateSyntax::new("\"", "\"", vec![])),
        );
        table.add_type_syntax(
            types::FILENAME,
            TypeSyntax::new("string", "\"\"", "\"\"", "output string")
                .with_aggregate(AggregateSyntax::new("\"", "\"", vec![])),
        );
        table.add_type_syntax(
            types::BSDF,
            TypeSyntax::new("BSDF", "null_closure", "0", "output BSDF")
                .with_definition("#define BSDF closure color"),
        );
        table.add_type_syntax(
            types::EDF,
            TypeSyntax::new("EDF", "null_closure", "0", "output EDF")
                .with_definition("#define EDF closure color"),
        );
        table.add_type_syntax(
            types::VDF,
            TypeSyntax::new("VDF", "null_closure", "0", "output VDF")
                .with_definition("#define VDF closure color"),
        );
        table.add_type_syntax(
            types::SURFACE_SHADER,
            TypeSyntax::new("surfaceshader", "null_closure", "0", "output surfaceshader")
                .with_definition("#define surfaceshader closure color"),
        );
        table.add_type_syntax(
            types::VOLUME_SHADER,
            TypeSyntax::new("volumeshader", "{0,0,0}", "0", "output volumeshader")
                .with_definition("struct volumeshader { VDF vdf; EDF edf; color absorption; };"),
        );
        table.add_type_syntax(
            types::DISPLACEMENT_SHADER,
            TypeSyntax::new("displacementshader", "{0,0}", "0", "output displacementshader")
                .with_definition("struct displacementshader { vector offset; float scale; };"),
        );

        Self { table }
    }
}

impl Default for OslSyntax {
    fn default() -> Self {
        Self::new()
    }
}

impl Syntax for OslSyntax {
    fn table(&self) -> &SyntaxTable {
        &self.table
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glint_graph::Value;

    #[test]
    fn test_type_names() {
        let syntax = OslSyntax::new();
        assert_eq!(syntax.type_name(types::COLOR3), Some("color"));
        assert_eq!(syntax.type_name(types::VECTOR3), Some("vector"));
        assert_eq!(syntax.type_name(types::VECTOR2), Some("vector2"));
        assert_eq!(syntax.type_name(types::FILENAME), Some("string"));
    }

    #[test]
    fn test_defaults() {
        let syntax = OslSyntax::new();
        assert_eq!(syntax.default_value(types::BSDF), Some("null_closure"));
        assert_eq!(syntax.param_default_value(types::BSDF), Some("0"));
        assert_eq!(
            syntax.default_value(types::COLOR3),
            Some("color(0.0, 0.0, 0.0)")
        );
    }

    #[test]
    fn test_value_formatting() {
        let syntax = OslSyntax::new();
        assert_eq!(
            syntax.value(types::VECTOR2, &Value::Vec2([1.0, 2.0])),
            Some("vector2(1.0, 2.0)".to_string())
        );
        assert_eq!(
            syntax.value(types::FILENAME, &Value::String("a.png".into())),
            Some("\"a.png\"".to_string())
        );
        assert_eq!(
            syntax.value(types::COLOR4, &Value::Vec4([1.0, 0.5, 0.0, 1.0])),
            Some("color4_pack(1.0, 0.5, 0.0, 1.0)".to_string())
        );
    }
}
