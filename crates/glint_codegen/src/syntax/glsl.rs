// SPDX-License-Identifier: MIT OR Apache-2.0
//! GLSL syntax rules.

use super::{AggregateSyntax, Syntax, SyntaxTable, TypeSyntax};
use glint_graph::{types, Type};

/// Syntax rules for the GLSL family of languages.
#[derive(Debug)]
pub struct GlslSyntax {
    table: SyntaxTable,
}

impl GlslSyntax {
    /// Suffix appended to sampler uniforms by the fragment syntax.
    pub const SAMPLER_SUFFIX: &'static str = "Sampler";

    /// Create the GLSL syntax rules.
    pub fn new() -> Self {
        let mut table = SyntaxTable::new();

        table.add_restricted_names(&[
            "attribute", "const", "uniform", "varying", "buffer", "shared", "coherent",
            "volatile", "restrict", "readonly", "writeonly", "atomic_uint", "layout",
            "centroid", "flat", "smooth", "noperspective", "patch", "sample", "break",
            "continue", "do", "for", "while", "switch", "case", "default", "if", "else",
            "subroutine", "in", "out", "inout", "float", "double", "int", "void", "bool",
            "true", "false", "invariant", "precise", "discard", "return", "mat2", "mat3",
            "mat4", "vec2", "vec3", "vec4", "ivec2", "ivec3", "ivec4", "bvec2", "bvec3",
            "bvec4", "uint", "uvec2", "uvec3", "uvec4", "lowp", "mediump", "highp",
            "precision", "sampler1D", "sampler2D", "sampler3D", "samplerCube",
            "sampler2DShadow", "struct", "common", "partition", "active", "asm", "class",
            "union", "enum", "typedef", "template", "this", "mix", "texture", "normalize",
            "length", "cross", "dot", "reflect", "refract",
        ]);

        table.add_type_syntax(
            types::FLOAT,
            TypeSyntax::new("float", "0.0", "0.0", "out float"),
        );
        table.add_type_syntax(types::INTEGER, TypeSyntax::new("int", "0", "0", "out int"));
        table.add_type_syntax(
            types::BOOLEAN,
            TypeSyntax::new("bool", "false", "false", "out bool"),
        );
        table.add_type_syntax(
            types::COLOR2,
            TypeSyntax::new("vec2", "vec2(0.0)", "vec2(0.0)", "out vec2")
                .with_aggregate(AggregateSyntax::new("vec2(", ")", vec![".r", ".g"])),
        );
        table.add_type_syntax(
            types::COLOR3,
            TypeSyntax::new("vec3", "vec3(0.0)", "vec3(0.0)", "out vec3")
                .with_aggregate(AggregateSyntax::new("vec3(", ")", vec![".r", ".g", ".b"])),
        );
        table.add_type_syntax(
            types::COLOR4,
            TypeSyntax::new("vec4", "vec4(0.0)", "vec4(0.0)", "out vec4").with_aggregate(
                AggregateSyntax::new("vec4(", ")", vec![".r", ".g", ".b", ".a"]),
            ),
        );
        table.add_type_syntax(
            types::VECTOR2,
            TypeSyntax::new("vec2", "vec2(0.0)", "vec2(0.0)", "out vec2")
                .with_aggregate(AggregateSyntax::new("vec2(", ")", vec![".x", ".y"])),
        );
        table.add_type_syntax(
            types::VECTOR3,
            TypeSyntax::new("vec3", "vec3(0.0)", "vec3(0.0)", "out vec3")
                .with_aggregate(AggregateSyntax::new("vec3(", ")", vec![".x", ".y", ".z"])),
        );
        table.add_type_syntax(
            types::VECTOR4,
            TypeSyntax::new("vec4", "vec4(0.0)", "vec4(0.0)", "out vec4").with_aggregate(
                AggregateSyntax::new("vec4(", ")", vec![".x", ".y", ".z", ".w"]),
            ),
        );
        table.add_type_syntax(
            types::MATRIX33,
            TypeSyntax::new("mat3", "mat3(1.0)", "mat3(1.0)", "out mat3"),
        );
        table.add_type_syntax(
            types::MATRIX44,
            TypeSyntax::new("mat4", "mat4(1.0)", "mat4(1.0)", "out mat4"),
        );
        // GLSL has no string type; `string` is intentionally left unmapped
        // so that string-typed properties are skipped for this target.
        table.add_type_syntax(
            types::FILENAME,
            TypeSyntax::new("sampler2D", "", "", "out sampler2D"),
        );
        table.add_type_syntax(
            types::BSDF,
            TypeSyntax::new("BSDF", "BSDF(0.0)", "BSDF(0.0)", "out BSDF")
                .with_definition("#define BSDF vec3"),
        );
        table.add_type_syntax(
            types::EDF,
            TypeSyntax::new("EDF", "EDF(0.0)", "EDF(0.0)", "out EDF")
                .with_definition("#define EDF vec3"),
        );
        table.add_type_syntax(
            types::VDF,
            TypeSyntax::new("VDF", "VDF(0.0)", "VDF(0.0)", "out VDF")
                .with_definition("#define VDF vec3"),
        );
        table.add_type_syntax(
            types::SURFACE_SHADER,
            TypeSyntax::new(
                "surfaceshader",
                "surfaceshader(vec3(0.0), vec3(0.0))",
                "{vec3(0.0), vec3(0.0)}",
                "out surfaceshader",
            )
            .with_definition("struct surfaceshader { vec3 color; vec3 transparency; };"),
        );
        table.add_type_syntax(
            types::LIGHT_SHADER,
            TypeSyntax::new(
                "lightshader",
                "lightshader(vec3(0.0), vec3(0.0))",
                "{vec3(0.0), vec3(0.0)}",
                "out lightshader",
            )
            .with_definition("struct lightshader { vec3 intensity; vec3 direction; };"),
        );

        Self { table }
    }
}

impl Default for GlslSyntax {
    fn default() -> Self {
        Self::new()
    }
}

impl Syntax for GlslSyntax {
    fn table(&self) -> &SyntaxTable {
        &self.table
    }
}

/// GLSL syntax specialized for host-engine fragments.
///
/// A filename input corresponds to a texture sampler uniform, which host
/// fragment conventions address through a suffixed name.
#[derive(Debug, Default)]
pub struct GlslFragmentSyntax {
    inner: GlslSyntax,
}

impl GlslFragmentSyntax {
    /// Create the fragment syntax rules.
    pub fn new() -> Self {
        Self {
            inner: GlslSyntax::new(),
        }
    }
}

impl Syntax for GlslFragmentSyntax {
    fn table(&self) -> &SyntaxTable {
        self.inner.table()
    }

    fn variable_name(&self, name: &str, ty: Type) -> String {
        let variable = self.inner.variable_name(name, ty);
        if ty == types::FILENAME && !variable.ends_with(GlslSyntax::SAMPLER_SUFFIX) {
            return format!("{variable}{}", GlslSyntax::SAMPLER_SUFFIX);
        }
        variable
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glint_graph::Value;

    #[test]
    fn test_type_names() {
        let syntax = GlslSyntax::new();
        assert_eq!(syntax.type_name(types::COLOR3), Some("vec3"));
        assert_eq!(syntax.type_name(types::VECTOR2), Some("vec2"));
        assert_eq!(syntax.type_name(types::FILENAME), Some("sampler2D"));
        assert_eq!(syntax.type_name(types::STRING), None);
    }

    #[test]
    fn test_value_formatting() {
        let syntax = GlslSyntax::new();
        assert_eq!(
            syntax.value(types::VECTOR2, &Value::Vec2([1.0, 2.0])),
            Some("vec2(1.0, 2.0)".to_string())
        );
        assert_eq!(
            syntax.value(types::FLOAT, &Value::Float(0.25)),
            Some("0.25".to_string())
        );
    }

    #[test]
    fn test_swizzled_variable() {
        let syntax = GlslSyntax::new();
        assert_eq!(
            syntax.swizzled_variable("base", types::COLOR4, "rgb", types::COLOR3),
            Some("vec3(base.r, base.g, base.b)".to_string())
        );
        assert_eq!(
            syntax.swizzled_variable("f", types::FLOAT, "rr0", types::VECTOR3),
            Some("vec3(f, f, 0.0)".to_string())
        );
        assert_eq!(
            syntax.swizzled_variable("c", types::COLOR3, "g", types::FLOAT),
            Some("c.g".to_string())
        );
    }

    #[test]
    fn test_fragment_sampler_suffix() {
        let syntax = GlslFragmentSyntax::new();
        assert_eq!(
            syntax.variable_name("diffuse_map", types::FILENAME),
            "diffuse_mapSampler"
        );
        assert_eq!(syntax.variable_name("base", types::COLOR3), "base");
    }

    #[test]
    fn test_restricted_names() {
        let syntax = GlslSyntax::new();
        assert!(syntax.is_restricted("vec3"));
        assert!(syntax.is_restricted("uniform"));
        assert!(!syntax.is_restricted("base_color"));
    }
}
