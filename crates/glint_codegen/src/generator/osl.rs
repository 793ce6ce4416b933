// SPDX-License-Identifier: MIT OR Apache-2.0
//! OSL generator producing a single-stage shader.

use super::{emit_type_definitions, hw, Emitter, ShaderGenerator};
use crate::context::GenContext;
use crate::error::ShaderGenError;
use crate::library;
use crate::shader::Shader;
use crate::stage::{Brackets, ShaderVariable};
use crate::syntax::{OslSyntax, Syntax};
use glint_graph::{types, ShaderGraph};

/// OSL generator: one stage whose entry point is the `shader` block,
/// with the public interface expressed as shader parameters and the
/// result as an output parameter.
#[derive(Debug, Default)]
pub struct OslGenerator {
    syntax: OslSyntax,
}

impl OslGenerator {
    /// Language identifier.
    pub const LANGUAGE: &'static str = "osl";
    /// Target identifier.
    pub const TARGET: &'static str = "";

    /// Create the generator.
    pub fn new() -> Self {
        Self::default()
    }
}

impl ShaderGenerator for OslGenerator {
    fn language(&self) -> &'static str {
        Self::LANGUAGE
    }

    fn target(&self) -> &'static str {
        Self::TARGET
    }

    fn syntax(&self) -> &dyn Syntax {
        &self.syntax
    }

    fn generate(
        &self,
        name: &str,
        graph: &ShaderGraph,
        ctx: &mut GenContext,
    ) -> Result<Shader, ShaderGenError> {
        library::register_osl_library(ctx);
        ctx.reset_identifiers();

        let mut shader = Shader::new(name);
        let stage = shader.create_stage(hw::PIXEL_STAGE);
        stage.create_uniform_block(hw::PUBLIC_UNIFORMS, "");

        let emitter = Emitter::bind(graph, &self.syntax, Self::LANGUAGE, Self::TARGET, ctx)?;

        // Publish graph inputs as shader parameters.
        let block = stage.create_uniform_block(hw::PUBLIC_UNIFORMS, "");
        for (index, input) in graph.inputs().iter().enumerate() {
            let variable = emitter.graph_input_variable(index)?;
            block.add(input.ty, variable, input.value.clone());
        }

        let output_socket = graph.output_socket();
        let output_ty = output_socket.map_or(types::COLOR3, |socket| socket.ty);
        let output_name = output_socket.map_or("out", |socket| socket.name.as_str());
        let output_variable = ctx.make_identifier(output_name, &self.syntax);

        let shader_name = ctx.make_identifier(name, &self.syntax);
        stage.set_function_name(&shader_name);

        if ctx.options.emit_version_string {
            stage.add_comment("Generated by the Glint shader generator");
            stage.new_line();
        }

        emit_type_definitions(stage, &self.syntax);

        stage.add_include("stdlib/osl/lib/mx_math.osl", ctx)?;
        stage.new_line();

        emitter.emit_function_definitions(ctx, stage)?;

        // Shader signature: parameters in declaration order, then the
        // output parameter.
        stage.add_line(&format!("shader {shader_name}"), false);
        stage.begin_scope(Brackets::Parentheses);
        let uniforms: Vec<ShaderVariable> = stage
            .uniform_block(hw::PUBLIC_UNIFORMS)?
            .variables()
            .cloned()
            .collect();
        for uniform in &uniforms {
            let Some(type_name) = self.syntax.type_name(uniform.ty) else {
                tracing::debug!(
                    variable = %uniform.name,
                    "skipping parameter with no syntax mapping"
                );
                continue;
            };
            let type_name = type_name.to_string();
            let value = uniform
                .value
                .as_ref()
                .and_then(|value| self.syntax.value(uniform.ty, value))
                .or_else(|| {
                    self.syntax
                        .param_default_value(uniform.ty)
                        .map(str::to_string)
                });
            let Some(value) = value else { continue };
            stage.add_line(&format!("{type_name} {} = {value},", uniform.name), false);
        }
        let output_spelling = self
            .syntax
            .type_syntax(output_ty)
            .map(|syntax| syntax.output_name.clone())
            .ok_or_else(|| ShaderGenError::UnsupportedType {
                ty: output_ty.name().to_string(),
                language: Self::LANGUAGE.to_string(),
            })?;
        let output_default = self
            .syntax
            .param_default_value(output_ty)
            .unwrap_or("0")
            .to_string();
        stage.add_line(
            &format!("{output_spelling} {output_variable} = {output_default}"),
            false,
        );
        stage.end_scope(false, true)?;

        // Shader body.
        stage.begin_scope(Brackets::Braces);
        emitter.emit_function_calls(ctx, stage)?;
        match emitter.final_output_result()? {
            Some(result) => stage.add_line(&format!("{output_variable} = {result}"), true),
            None => {
                if let Some(default) = self.syntax.default_value(output_ty) {
                    let default = default.to_string();
                    stage.add_line(&format!("{output_variable} = {default}"), true);
                }
            }
        }
        stage.end_scope(false, true)?;

        Ok(shader)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glint_graph::{ImplDef, ImplKind, NodeDef, PortDef, ShaderNode};
    use std::sync::Arc;

    #[test]
    fn test_single_stage_shader_with_output_parameter() {
        let mut ctx = GenContext::default();
        ctx.register_source(
            "stdlib/genosl/mx_constant_color3.osl",
            "void mx_constant_color3(color value, output color result)\n{\n    result = value;\n}\n",
        );
        let def = Arc::new(
            NodeDef::new("ND_constant_color3", "constant", types::COLOR3)
                .with_input(PortDef::new("value", types::COLOR3))
                .with_implementation(ImplDef::new(
                    "osl",
                    ImplKind::SourceCode {
                        file: "stdlib/genosl/mx_constant_color3.osl".into(),
                        function: "mx_constant_color3".into(),
                    },
                )),
        );
        let mut graph = ShaderGraph::new("constant");
        let base = graph.add_input("base_color", types::COLOR3, Some([1.0, 0.0, 0.0].into()));
        let c = graph.add_node(ShaderNode::new("c", def)).unwrap();
        graph.connect_input(base, (c, 0)).unwrap();
        let out = graph.add_output("out", types::COLOR3);
        graph.connect_output(out, (c, 0)).unwrap();

        let generator = OslGenerator::new();
        let shader = generator.generate("constant_test", &graph, &mut ctx).unwrap();
        let code = shader.source_code(hw::PIXEL_STAGE).unwrap();

        assert!(code.contains("shader constant_test"));
        assert!(code.contains("color base_color = color(1.0, 0.0, 0.0),"));
        assert!(code.contains("output color out = color(0.0, 0.0, 0.0)"));
        assert!(code.contains("mx_constant_color3(base_color, c_out);"));
        assert!(code.contains("out = c_out;"));
    }

    #[test]
    fn test_output_channel_mask_applied() {
        let mut ctx = GenContext::default();
        ctx.register_source(
            "stdlib/genosl/mx_constant_color4.osl",
            "void mx_constant_color4(color4 value, output color4 result)\n{\n    result = value;\n}\n",
        );
        let def = Arc::new(
            NodeDef::new("ND_constant_color4", "constant", types::COLOR4)
                .with_input(PortDef::new("value", types::COLOR4))
                .with_implementation(ImplDef::new(
                    "osl",
                    ImplKind::SourceCode {
                        file: "stdlib/genosl/mx_constant_color4.osl".into(),
                        function: "mx_constant_color4".into(),
                    },
                )),
        );
        let mut graph = ShaderGraph::new("masked");
        let c = graph.add_node(ShaderNode::new("c", def)).unwrap();
        let out = graph.add_output("out", types::COLOR3);
        graph.set_output_channels(out, "rgb").unwrap();
        graph.connect_output(out, (c, 0)).unwrap();

        let generator = OslGenerator::new();
        let shader = generator.generate("masked_test", &graph, &mut ctx).unwrap();
        let code = shader.source_code(hw::PIXEL_STAGE).unwrap();

        assert!(code.contains(
            "out = color(c_out.rgb[0], c_out.rgb[1], c_out.rgb[2]);"
        ));
    }
}
