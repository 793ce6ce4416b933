// SPDX-License-Identifier: MIT OR Apache-2.0
//! Hardware GLSL generator producing vertex and pixel stages.

use super::{
    emit_constant_declarations, emit_type_definitions, emit_uniform_declarations, hw, Emitter,
    HwLightBindings, ShaderGenerator,
};
use crate::context::{GenContext, SpecularEnvironmentMethod};
use crate::error::ShaderGenError;
use crate::library;
use crate::shader::Shader;
use crate::stage::{Brackets, ShaderStage, ShaderVariable};
use crate::syntax::{GlslSyntax, Syntax};
use glint_graph::{types, Classification, NodeDef, ShaderGraph, Type};

/// GLSL generator for hardware rendering: one vertex stage and one pixel
/// stage, with geometric streams promoted through a cross-stage varying
/// block and lighting evaluated in a loop over active light sources.
#[derive(Debug, Default)]
pub struct GlslGenerator {
    syntax: GlslSyntax,
    lights: HwLightBindings,
}

impl GlslGenerator {
    /// Language identifier.
    pub const LANGUAGE: &'static str = "glsl";
    /// Target identifier.
    pub const TARGET: &'static str = "";

    /// Create a generator with no bound light shaders.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a light shader nodedef to a numeric light type id.
    pub fn bind_light_shader(
        &mut self,
        light_type: usize,
        def: &NodeDef,
        ctx: &GenContext,
    ) -> Result<(), ShaderGenError> {
        self.lights
            .bind(light_type, def, Self::LANGUAGE, Self::TARGET, ctx)
    }

    fn setup_stages(&self, shader: &mut Shader) {
        let vertex = shader.create_stage(hw::VERTEX_STAGE);
        vertex.create_input_block(hw::VERTEX_INPUTS, "");
        vertex.create_output_block(hw::VERTEX_DATA, "vd");
        vertex
            .create_uniform_block(hw::PRIVATE_UNIFORMS, "u")
            .add(types::MATRIX44, hw::WORLD_MATRIX, None);
        vertex
            .create_uniform_block(hw::PRIVATE_UNIFORMS, "u")
            .add(types::MATRIX44, hw::VIEW_PROJECTION_MATRIX, None);
        vertex
            .create_input_block(hw::VERTEX_INPUTS, "")
            .add(types::VECTOR3, hw::ATTR_POSITION, None);
        vertex.create_uniform_block(hw::PUBLIC_UNIFORMS, "u");

        let pixel = shader.create_stage(hw::PIXEL_STAGE);
        pixel.create_input_block(hw::VERTEX_DATA, "vd");
        pixel.create_output_block(hw::PIXEL_OUTPUTS, "");
        pixel.create_uniform_block(hw::PRIVATE_UNIFORMS, "u");
        pixel.create_uniform_block(hw::PUBLIC_UNIFORMS, "u");
    }

    fn emit_vertex_stage(
        &self,
        emitter: &Emitter<'_>,
        ctx: &GenContext,
        stage: &mut ShaderStage,
    ) -> Result<(), ShaderGenError> {
        if ctx.options.emit_version_string {
            stage.add_line("#version 400", false);
            stage.new_line();
        }

        emit_uniform_declarations(stage, hw::PRIVATE_UNIFORMS, &self.syntax)?;
        emit_uniform_declarations(stage, hw::PUBLIC_UNIFORMS, &self.syntax)?;
        stage.new_line();

        let attributes: Vec<ShaderVariable> = stage
            .input_block(hw::VERTEX_INPUTS)?
            .variables()
            .cloned()
            .collect();
        for attribute in &attributes {
            let type_name = self
                .syntax
                .type_name(attribute.ty)
                .ok_or_else(|| ShaderGenError::UnsupportedType {
                    ty: attribute.ty.name().to_string(),
                    language: Self::LANGUAGE.to_string(),
                })?
                .to_string();
            stage.add_line(&format!("in {type_name} {}", attribute.name), true);
        }
        stage.new_line();

        emit_interface_block(stage, "out", hw::VERTEX_DATA, true, &self.syntax)?;

        stage.add_line("void main()", false);
        stage.begin_scope(Brackets::Braces);
        stage.add_line(
            &format!(
                "vec4 hPositionWorld = {} * vec4({}, 1.0)",
                hw::WORLD_MATRIX,
                hw::ATTR_POSITION
            ),
            true,
        );
        stage.add_line(
            &format!("gl_Position = {} * hPositionWorld", hw::VIEW_PROJECTION_MATRIX),
            true,
        );
        emitter.emit_function_calls(ctx, stage)?;
        stage.end_scope(false, true)?;
        Ok(())
    }

    fn emit_pixel_stage(
        &self,
        emitter: &Emitter<'_>,
        ctx: &GenContext,
        stage: &mut ShaderStage,
        output_name: &str,
        lighting: bool,
    ) -> Result<(), ShaderGenError> {
        let graph = emitter.graph;

        if ctx.options.emit_version_string {
            stage.add_line("#version 400", false);
            stage.new_line();
        }

        stage.add_include("pbrlib/glsl/lib/mx_defines.glsl", ctx)?;
        let max_lights = ctx.options.max_active_light_sources.max(1);
        stage.add_line(
            &format!("#define {} {max_lights}", hw::MAX_LIGHT_SOURCES),
            false,
        );
        stage.new_line();

        emit_type_definitions(stage, &self.syntax);

        emit_uniform_declarations(stage, hw::PRIVATE_UNIFORMS, &self.syntax)?;
        emit_uniform_declarations(stage, hw::PUBLIC_UNIFORMS, &self.syntax)?;
        stage.new_line();

        if !stage.constant_block().is_empty() {
            emit_constant_declarations(stage, &self.syntax)?;
            stage.new_line();
        }

        stage.add_include("pbrlib/glsl/lib/mx_math.glsl", ctx)?;
        stage.new_line();

        if lighting {
            match ctx.options.specular_environment_method {
                SpecularEnvironmentMethod::FilteredImportanceSampling => {
                    stage.add_include("pbrlib/glsl/lib/mx_environment_fis.glsl", ctx)?;
                    stage.new_line();
                }
                SpecularEnvironmentMethod::Prefilter => {
                    stage.add_include("pbrlib/glsl/lib/mx_environment_prefilter.glsl", ctx)?;
                    stage.new_line();
                }
                SpecularEnvironmentMethod::None => {}
            }
        }

        if graph.has_classification(Classification::CONVOLUTION2D) {
            stage.add_include("stdlib/glsl/lib/mx_sampling.glsl", ctx)?;
            stage.new_line();
        }

        if ctx.options.file_texture_vertical_flip {
            stage.add_include("stdlib/glsl/lib/mx_get_target_uv_vflip.glsl", ctx)?;
        } else {
            stage.add_include("stdlib/glsl/lib/mx_get_target_uv_noop.glsl", ctx)?;
        }
        stage.new_line();

        emit_interface_block(stage, "in", hw::VERTEX_DATA, false, &self.syntax)?;

        stage.add_line(&format!("out vec4 {output_name}"), true);
        stage.new_line();

        if lighting && !self.lights.is_empty() {
            self.lights.emit_light_data(stage, &self.syntax)?;
            self.lights.emit_light_functions(stage, ctx)?;
        }

        emitter.emit_function_definitions(ctx, stage)?;

        stage.add_line("void main()", false);
        stage.begin_scope(Brackets::Braces);
        if graph.has_classification(Classification::CLOSURE)
            && !graph.has_classification(Classification::SHADER)
        {
            // Closures cannot render without a surface shader attached;
            // output the documented constant fallback.
            stage.add_line(&format!("{output_name} = vec4(0.0, 0.0, 0.0, 1.0)"), true);
        } else {
            emitter.emit_function_calls(ctx, stage)?;
            match emitter.final_output_result()? {
                Some(result) if graph.has_classification(Classification::SURFACE) => {
                    if ctx.options.hw_transparency {
                        stage.add_line(
                            &format!(
                                "float outAlpha = clamp(1.0 - dot({result}.transparency, vec3(0.3333)), 0.0, 1.0)"
                            ),
                            true,
                        );
                        stage.add_line(
                            &format!("{output_name} = vec4({result}.color, outAlpha)"),
                            true,
                        );
                    } else {
                        stage.add_line(
                            &format!("{output_name} = vec4({result}.color, 1.0)"),
                            true,
                        );
                    }
                }
                Some(result) => {
                    let output_ty = graph
                        .output_socket()
                        .map_or(types::COLOR3, |socket| socket.ty);
                    let widened = to_vec3(output_ty, &result);
                    stage.add_line(&format!("{output_name} = vec4({widened}, 1.0)"), true);
                }
                None => {
                    stage.add_line(&format!("{output_name} = vec4(0.0, 0.0, 0.0, 1.0)"), true);
                }
            }
        }
        stage.end_scope(false, true)?;
        Ok(())
    }
}

impl ShaderGenerator for GlslGenerator {
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
        library::register_glsl_library(ctx);
        ctx.reset_identifiers();

        let mut shader = Shader::new(name);
        self.setup_stages(&mut shader);

        let emitter = Emitter::bind(graph, &self.syntax, Self::LANGUAGE, Self::TARGET, ctx)?;

        for node in graph.nodes() {
            if let Some(implementation) = emitter.binding(node.id) {
                implementation.create_variables(node, &mut shader)?;
            }
        }

        let lighting = graph.has_classification(Classification::SURFACE)
            || graph.has_classification(Classification::BSDF);

        setup_public_uniforms(&emitter, &mut shader, graph)?;
        if lighting {
            setup_environment_uniforms(&mut shader)?;
            if !self.lights.is_empty() {
                self.lights
                    .create_variables(shader.stage_mut(hw::PIXEL_STAGE)?);
            }
        }

        let output_name = graph
            .output_socket()
            .map_or_else(|| "out1".to_string(), |socket| socket.name.clone());
        let output_name = ctx.make_identifier(&output_name, &self.syntax);
        shader
            .stage_mut(hw::PIXEL_STAGE)?
            .create_output_block(hw::PIXEL_OUTPUTS, "")
            .add(types::COLOR4, output_name.clone(), None);

        self.emit_vertex_stage(&emitter, ctx, shader.stage_mut(hw::VERTEX_STAGE)?)?;
        self.emit_pixel_stage(
            &emitter,
            ctx,
            shader.stage_mut(hw::PIXEL_STAGE)?,
            &output_name,
            lighting,
        )?;

        Ok(shader)
    }
}

/// Publish graph inputs and unconnected filename inputs as public
/// uniforms on the pixel stage.
pub(super) fn setup_public_uniforms(
    emitter: &Emitter<'_>,
    shader: &mut Shader,
    graph: &ShaderGraph,
) -> Result<(), ShaderGenError> {
    let pixel = shader.stage_mut(hw::PIXEL_STAGE)?;
    let block = pixel.create_uniform_block(hw::PUBLIC_UNIFORMS, "u");
    for (index, input) in graph.inputs().iter().enumerate() {
        let variable = emitter.graph_input_variable(index)?;
        let entry = block.add(input.ty, variable, input.value.clone());
        if input.ty.semantic() == glint_graph::Semantic::Color {
            entry.semantic = Some("color".to_string());
        }
    }
    for (variable, ty) in emitter.filename_inputs() {
        block.add(ty, variable, None);
    }
    Ok(())
}

/// Declare the environment samplers the lighting support library reads.
pub(super) fn setup_environment_uniforms(shader: &mut Shader) -> Result<(), ShaderGenError> {
    let pixel = shader.stage_mut(hw::PIXEL_STAGE)?;
    let block = pixel.create_uniform_block(hw::PRIVATE_UNIFORMS, "u");
    block
        .add(types::FILENAME, "u_envRadianceSampler", None)
        .flags
        .push("global".to_string());
    block
        .add(types::FILENAME, "u_envIrradianceSampler", None)
        .flags
        .push("global".to_string());
    Ok(())
}

/// Declare a varying interface block (`in`/`out VertexData { ... } vd;`).
pub(super) fn emit_interface_block(
    stage: &mut ShaderStage,
    keyword: &str,
    block_name: &str,
    output: bool,
    syntax: &dyn Syntax,
) -> Result<(), ShaderGenError> {
    let block = if output {
        stage.output_block(block_name)?
    } else {
        stage.input_block(block_name)?
    };
    if block.is_empty() {
        return Ok(());
    }
    let instance = block.instance().to_string();
    let variables: Vec<ShaderVariable> = block.variables().cloned().collect();

    stage.add_line(&format!("{keyword} {block_name}"), false);
    stage.begin_scope(Brackets::Braces);
    for variable in &variables {
        let Some(type_name) = syntax.type_name(variable.ty) else {
            tracing::debug!(
                variable = %variable.name,
                "skipping varying with no syntax mapping"
            );
            continue;
        };
        stage.add_line(&format!("{type_name} {}", variable.name), true);
    }
    stage.end_scope(false, false)?;
    stage.add_string(&format!(" {instance};"));
    stage.new_line();
    stage.new_line();
    Ok(())
}

/// Convert an expression of an arbitrary type to a three-component value,
/// the canonical output arity for GLSL-family targets.
pub(super) fn to_vec3(ty: Type, variable: &str) -> String {
    if ty.is_float3() {
        variable.to_string()
    } else if ty.is_float2() {
        format!("vec3({variable}, 0.0)")
    } else if ty.is_float4() {
        format!("{variable}.xyz")
    } else if ty == types::FLOAT || ty == types::INTEGER {
        format!("vec3({variable}, {variable}, {variable})")
    } else if ty == types::BSDF || ty == types::EDF {
        format!("vec3({variable})")
    } else {
        // Other types cannot be displayed; return black.
        "vec3(0.0, 0.0, 0.0)".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glint_graph::{stdlib, ImplDef, ImplKind, PortDef, ShaderNode};
    use std::sync::Arc;

    #[test]
    fn test_stream_declared_and_propagated_once() {
        let def = Arc::new(stdlib::texcoord());
        let mut graph = ShaderGraph::new("uv");
        let uv1 = graph.add_node(ShaderNode::new("uv1", def.clone())).unwrap();
        graph.add_node(ShaderNode::new("uv2", def)).unwrap();
        let out = graph.add_output("out", types::VECTOR2);
        graph.connect_output(out, (uv1, 0)).unwrap();

        let generator = GlslGenerator::new();
        let mut ctx = GenContext::default();
        let shader = generator.generate("uv_test", &graph, &mut ctx).unwrap();

        // Two consumers, one attribute, one varying, one propagation.
        let vertex = shader.source_code(hw::VERTEX_STAGE).unwrap();
        assert_eq!(vertex.matches("in vec2 i_texcoord_0;").count(), 1);
        assert_eq!(vertex.matches("vd.texcoord_0 = i_texcoord_0;").count(), 1);

        let pixel = shader.source_code(hw::PIXEL_STAGE).unwrap();
        assert_eq!(pixel.matches("vec2 texcoord_0;").count(), 1);
        assert!(pixel.contains("vec2 uv1_out = vd.texcoord_0;"));
        assert!(pixel.contains("vec2 uv2_out = vd.texcoord_0;"));
        assert!(pixel.contains("#define MAX_LIGHT_SOURCES 3"));
    }

    #[test]
    fn test_light_shader_binding_and_dispatch() {
        let mut ctx = GenContext::default();
        ctx.register_source(
            "pbrlib/genglsl/mx_point_light.glsl",
            "void mx_point_light(vec3 color, float intensity, vec3 position, out lightshader result)\n{\n    result.intensity = color * intensity;\n    result.direction = vec3(0.0, 0.0, 1.0);\n}\n",
        );
        let light_def = NodeDef::new("ND_point_light", "point_light", types::LIGHT_SHADER)
            .with_input(PortDef::new("color", types::COLOR3))
            .with_input(PortDef::new("intensity", types::FLOAT))
            .with_input(PortDef::new("position", types::VECTOR3))
            .with_implementation(ImplDef::new(
                "glsl",
                ImplKind::LightShader {
                    file: "pbrlib/genglsl/mx_point_light.glsl".into(),
                    function: "mx_point_light".into(),
                },
            ));

        ctx.register_source(
            "pbrlib/genglsl/mx_surface.glsl",
            "void mx_surface(vec3 base, out surfaceshader result)\n{\n    result.color = base;\n    result.transparency = vec3(0.0);\n}\n",
        );
        let surface_def = Arc::new(
            NodeDef::new("ND_surface", "surface", types::SURFACE_SHADER)
                .with_input(PortDef::new("base", types::COLOR3).with_value([1.0, 0.0, 0.0]))
                .with_implementation(ImplDef::new(
                    "glsl",
                    ImplKind::SourceCode {
                        file: "pbrlib/genglsl/mx_surface.glsl".into(),
                        function: "mx_surface".into(),
                    },
                )),
        );

        let mut generator = GlslGenerator::new();
        generator.bind_light_shader(0, &light_def, &ctx).unwrap();

        let mut graph = ShaderGraph::new("surface");
        let surface = graph
            .add_node(ShaderNode::new("surface1", surface_def))
            .unwrap();
        let out = graph.add_output("out", types::SURFACE_SHADER);
        graph.connect_output(out, (surface, 0)).unwrap();

        let shader = generator.generate("surface_test", &graph, &mut ctx).unwrap();
        let pixel = shader.source_code(hw::PIXEL_STAGE).unwrap();

        assert!(pixel.contains("struct LightData"));
        assert!(pixel.contains("uniform LightData u_lightData[MAX_LIGHT_SOURCES];"));
        assert!(pixel.contains("uniform int u_numActiveLightSources;"));
        assert!(pixel.contains("if (light.type == 0)"));
        assert!(pixel.contains(
            "mx_point_light(light.color, light.intensity, light.position, result);"
        ));
        assert!(pixel.contains("= vec4(surface1_out.color, 1.0);"));
    }

    #[test]
    fn test_transparency_option_controls_alpha() {
        let mut ctx = GenContext::default();
        ctx.options.hw_transparency = true;
        ctx.register_source(
            "pbrlib/genglsl/mx_surface.glsl",
            "void mx_surface(vec3 base, out surfaceshader result)\n{\n    result.color = base;\n    result.transparency = vec3(0.0);\n}\n",
        );
        let surface_def = Arc::new(
            NodeDef::new("ND_surface", "surface", types::SURFACE_SHADER)
                .with_input(PortDef::new("base", types::COLOR3))
                .with_implementation(ImplDef::new(
                    "glsl",
                    ImplKind::SourceCode {
                        file: "pbrlib/genglsl/mx_surface.glsl".into(),
                        function: "mx_surface".into(),
                    },
                )),
        );
        let mut graph = ShaderGraph::new("surface");
        let surface = graph
            .add_node(ShaderNode::new("surface1", surface_def))
            .unwrap();
        let out = graph.add_output("out", types::SURFACE_SHADER);
        graph.connect_output(out, (surface, 0)).unwrap();

        let generator = GlslGenerator::new();
        let shader = generator.generate("surface_test", &graph, &mut ctx).unwrap();
        let pixel = shader.source_code(hw::PIXEL_STAGE).unwrap();

        assert!(pixel.contains("surface1_out.transparency"));
        assert!(pixel.contains("vec4(surface1_out.color, outAlpha)"));
    }

    #[test]
    fn test_to_vec3_conversions() {
        assert_eq!(to_vec3(types::VECTOR3, "v"), "v");
        assert_eq!(to_vec3(types::VECTOR2, "v"), "vec3(v, 0.0)");
        assert_eq!(to_vec3(types::COLOR4, "v"), "v.xyz");
        assert_eq!(to_vec3(types::FLOAT, "v"), "vec3(v, v, v)");
        assert_eq!(to_vec3(types::STRING, "v"), "vec3(0.0, 0.0, 0.0)");
    }
}
