// SPDX-License-Identifier: MIT OR Apache-2.0
//! GLSL fragment generator producing a single callable pixel function
//! for host-engine wrapping.

use super::glsl::{setup_environment_uniforms, setup_public_uniforms, to_vec3};
use super::{
    emit_constant_declarations, emit_type_definitions, hw, replace_tokens, Emitter,
    HwLightBindings, ShaderGenerator,
};
use crate::context::{GenContext, SpecularEnvironmentMethod};
use crate::error::ShaderGenError;
use crate::library;
use crate::shader::Shader;
use crate::stage::{Brackets, ShaderVariable};
use crate::syntax::{GlslFragmentSyntax, Syntax};
use glint_graph::{types, Classification, NodeDef, ShaderGraph};
use indexmap::IndexMap;

/// GLSL generator emitting one callable fragment function instead of a
/// complete shader program.
///
/// The host engine supplies interpolated geometry through its own
/// conventions, so the cross-stage varying references are remapped by a
/// final token-substitution pass, and texture samplers follow the host's
/// suffixed naming.
#[derive(Debug)]
pub struct GlslFragmentGenerator {
    syntax: GlslFragmentSyntax,
    lights: HwLightBindings,
    token_substitutions: IndexMap<String, String>,
}

impl GlslFragmentGenerator {
    /// Language identifier.
    pub const LANGUAGE: &'static str = "glsl";
    /// Target identifier.
    pub const TARGET: &'static str = "fragment";

    /// Create a generator with the host identifier conventions.
    pub fn new() -> Self {
        let mut token_substitutions = IndexMap::new();
        token_substitutions.insert("vd".to_string(), "PIX_IN".to_string());
        token_substitutions.insert(hw::POSITION_WORLD.to_string(), "Pw".to_string());
        token_substitutions.insert(hw::NORMAL_WORLD.to_string(), "Nw".to_string());
        Self {
            syntax: GlslFragmentSyntax::new(),
            lights: HwLightBindings::default(),
            token_substitutions,
        }
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
}

impl Default for GlslFragmentGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl ShaderGenerator for GlslFragmentGenerator {
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
        let pixel = shader.create_stage(hw::PIXEL_STAGE);
        pixel.create_input_block(hw::VERTEX_DATA, "vd");
        pixel.create_output_block(hw::PIXEL_OUTPUTS, "");
        pixel.create_uniform_block(hw::PRIVATE_UNIFORMS, "u");
        pixel.create_uniform_block(hw::PUBLIC_UNIFORMS, "u");

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

        let function_name = ctx.make_identifier(name, &self.syntax);
        let stage = shader.stage_mut(hw::PIXEL_STAGE)?;
        stage.set_function_name(&function_name);

        if ctx.options.emit_version_string {
            stage.add_comment("Generated by the Glint shader generator");
            stage.new_line();
        }

        // Global constants and type definitions.
        stage.add_include("pbrlib/glsl/lib/mx_defines.glsl", ctx)?;
        let max_lights = ctx.options.max_active_light_sources.max(1);
        stage.add_line(
            &format!("#define {} {max_lights}", hw::MAX_LIGHT_SOURCES),
            false,
        );
        stage.new_line();
        emit_type_definitions(stage, &self.syntax);

        if !stage.constant_block().is_empty() {
            emit_constant_declarations(stage, &self.syntax)?;
            stage.new_line();
        }

        // Common math functions.
        stage.add_include("pbrlib/glsl/lib/mx_math.glsl", ctx)?;
        stage.new_line();

        // Lighting functions.
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

        // Sampling code, only when the graph convolves.
        if graph.has_classification(Classification::CONVOLUTION2D) {
            stage.add_include("stdlib/glsl/lib/mx_sampling.glsl", ctx)?;
            stage.new_line();
        }

        // UV transform selection.
        if ctx.options.file_texture_vertical_flip {
            stage.add_include("stdlib/glsl/lib/mx_get_target_uv_vflip.glsl", ctx)?;
        } else {
            stage.add_include("stdlib/glsl/lib/mx_get_target_uv_noop.glsl", ctx)?;
        }
        stage.new_line();

        // The host supplies interpolated vertex data; the varying block is
        // published through the manifest only, never declared in the text.
        if lighting && !self.lights.is_empty() {
            self.lights.emit_light_data(stage, &self.syntax)?;
            self.lights.emit_light_functions(stage, ctx)?;
        }

        emitter.emit_function_definitions(ctx, stage)?;

        // Function signature, built from the public uniform block in
        // declaration order.
        stage.add_line(&format!("vec3 {function_name}"), false);
        stage.begin_scope(Brackets::Parentheses);
        let uniforms: Vec<ShaderVariable> = stage
            .uniform_block(hw::PUBLIC_UNIFORMS)?
            .variables()
            .cloned()
            .collect();
        let parameters: Vec<String> = uniforms
            .iter()
            .filter_map(|uniform| match self.syntax.type_name(uniform.ty) {
                Some(type_name) => Some(format!("{type_name} {}", uniform.name)),
                None => {
                    tracing::debug!(
                        variable = %uniform.name,
                        "skipping parameter with no syntax mapping"
                    );
                    None
                }
            })
            .collect();
        let last = parameters.len().saturating_sub(1);
        for (index, parameter) in parameters.iter().enumerate() {
            stage.begin_line();
            stage.add_string(parameter);
            if index < last {
                stage.add_string(",");
            }
            stage.end_line(false);
        }
        stage.end_scope(false, true)?;

        // Function body.
        stage.begin_scope(Brackets::Braces);
        if graph.has_classification(Classification::CLOSURE)
            && !graph.has_classification(Classification::SHADER)
        {
            // Closures cannot render without a surface shader attached;
            // output the documented constant fallback.
            stage.add_line("return vec3(0.0)", true);
        } else {
            emitter.emit_function_calls(ctx, stage)?;
            match emitter.final_output_result()? {
                Some(result) if graph.has_classification(Classification::SURFACE) => {
                    stage.add_line(&format!("return {result}.color"), true);
                }
                Some(result) => {
                    let output_ty = graph
                        .output_socket()
                        .map_or(types::COLOR3, |socket| socket.ty);
                    stage.add_line(&format!("return {}", to_vec3(output_ty, &result)), true);
                }
                None => {
                    stage.add_line("return vec3(0.0)", true);
                }
            }
        }
        stage.end_scope(false, true)?;

        // Replace all tokens with the host's identifier names, as a pure
        // post-pass over the finished text.
        replace_tokens(stage, &self.token_substitutions);

        Ok(shader)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glint_graph::{stdlib, ImplDef, ImplKind, PortDef, ShaderNode};
    use std::sync::Arc;

    fn constant_float_def(ctx: &mut GenContext) -> Arc<NodeDef> {
        ctx.register_source(
            "stdlib/genglsl/mx_constant_float.glsl",
            "void mx_constant_float(float value, out float result)\n{\n    result = value;\n}\n",
        );
        Arc::new(
            NodeDef::new("ND_constant_float", "constant", types::FLOAT)
                .with_input(PortDef::new("value", types::FLOAT).with_value(0.25))
                .with_implementation(ImplDef::new(
                    "glsl",
                    ImplKind::SourceCode {
                        file: "stdlib/genglsl/mx_constant_float.glsl".into(),
                        function: "mx_constant_float".into(),
                    },
                )),
        )
    }

    #[test]
    fn test_scalar_output_widened_to_canonical_arity() {
        let mut ctx = GenContext::default();
        let def = constant_float_def(&mut ctx);
        let mut graph = ShaderGraph::new("scalar");
        let c = graph.add_node(ShaderNode::new("c", def)).unwrap();
        let out = graph.add_output("out", types::FLOAT);
        graph.connect_output(out, (c, 0)).unwrap();

        let generator = GlslFragmentGenerator::new();
        let shader = generator.generate("scalar_test", &graph, &mut ctx).unwrap();
        let code = shader.source_code(hw::PIXEL_STAGE).unwrap();

        assert!(code.contains("vec3 scalar_test"));
        assert!(code.contains("mx_constant_float(0.25, c_out);"));
        // A float-typed graph still returns the canonical three components.
        assert!(code.contains("return vec3(c_out, c_out, c_out);"));
    }

    #[test]
    fn test_shared_implementation_and_determinism() {
        let mut ctx = GenContext::default();
        let def = constant_float_def(&mut ctx);
        let mut graph = ShaderGraph::new("pair");
        let a = graph.add_node(ShaderNode::new("a", def.clone())).unwrap();
        graph.add_node(ShaderNode::new("b", def)).unwrap();
        let out = graph.add_output("out", types::FLOAT);
        graph.connect_output(out, (a, 0)).unwrap();

        let generator = GlslFragmentGenerator::new();
        let shader = generator.generate("pair_test", &graph, &mut ctx).unwrap();
        let code = shader.source_code(hw::PIXEL_STAGE).unwrap().to_string();

        assert_eq!(code.matches("void mx_constant_float").count(), 1);
        assert_eq!(code.matches("mx_constant_float(0.25,").count(), 2);

        // Same graph and options in a fresh context: byte-identical text.
        let mut ctx = GenContext::default();
        constant_float_def(&mut ctx);
        let again = generator.generate("pair_test", &graph, &mut ctx).unwrap();
        assert_eq!(code, again.source_code(hw::PIXEL_STAGE).unwrap());
    }

    #[test]
    fn test_closure_graph_falls_back_to_constant_output() {
        let mut ctx = GenContext::default();
        ctx.register_source(
            "pbrlib/genglsl/mx_diffuse_brdf.glsl",
            "void mx_diffuse_brdf(vec3 color, out BSDF result)\n{\n    result = color * M_PI_INV;\n}\n",
        );
        let def = Arc::new(
            NodeDef::new("ND_diffuse_brdf", "diffuse_brdf", types::BSDF)
                .with_input(PortDef::new("color", types::COLOR3))
                .with_implementation(ImplDef::new(
                    "glsl",
                    ImplKind::SourceCode {
                        file: "pbrlib/genglsl/mx_diffuse_brdf.glsl".into(),
                        function: "mx_diffuse_brdf".into(),
                    },
                )),
        );
        let mut graph = ShaderGraph::new("closure");
        let brdf = graph.add_node(ShaderNode::new("brdf1", def)).unwrap();
        let out = graph.add_output("out", types::BSDF);
        graph.connect_output(out, (brdf, 0)).unwrap();

        let generator = GlslFragmentGenerator::new();
        let shader = generator.generate("closure_test", &graph, &mut ctx).unwrap();
        let code = shader.source_code(hw::PIXEL_STAGE).unwrap();

        assert!(code.contains("return vec3(0.0);"));
        // No node calls are emitted for the unattached closure.
        assert!(!code.contains("brdf1_out"));
    }

    #[test]
    fn test_stream_tokens_remapped_for_host() {
        let mut ctx = GenContext::default();
        let mut graph = ShaderGraph::new("geom");
        let pos = graph
            .add_node(ShaderNode::new("pos1", Arc::new(stdlib::geompos())))
            .unwrap();
        let out = graph.add_output("out", types::VECTOR3);
        graph.connect_output(out, (pos, 0)).unwrap();

        let generator = GlslFragmentGenerator::new();
        let shader = generator.generate("geom_test", &graph, &mut ctx).unwrap();
        let code = shader.source_code(hw::PIXEL_STAGE).unwrap();

        assert!(code.contains("vec3 pos1_out = PIX_IN.Pw;"));
        assert!(!code.contains("positionWorld"));

        // The varying stays visible to packaging through the manifest.
        let manifest = shader.stage_manifest(hw::PIXEL_STAGE).unwrap();
        assert!(manifest
            .iter()
            .any(|info| info.name == "positionWorld"
                && info.flags.contains(&"varying".to_string())));
    }

    #[test]
    fn test_graph_inputs_become_function_parameters() {
        let mut ctx = GenContext::default();
        ctx.register_source(
            "stdlib/genglsl/mx_constant_color3.glsl",
            "void mx_constant_color3(vec3 value, out vec3 result)\n{\n    result = value;\n}\n",
        );
        let def = Arc::new(
            NodeDef::new("ND_constant_color3", "constant", types::COLOR3)
                .with_input(PortDef::new("value", types::COLOR3))
                .with_implementation(ImplDef::new(
                    "glsl",
                    ImplKind::SourceCode {
                        file: "stdlib/genglsl/mx_constant_color3.glsl".into(),
                        function: "mx_constant_color3".into(),
                    },
                )),
        );
        let mut graph = ShaderGraph::new("interface");
        let base = graph.add_input("base_color", types::COLOR3, Some([1.0, 0.0, 0.0].into()));
        let c = graph.add_node(ShaderNode::new("c", def)).unwrap();
        graph.connect_input(base, (c, 0)).unwrap();
        let out = graph.add_output("out", types::COLOR3);
        graph.connect_output(out, (c, 0)).unwrap();

        let generator = GlslFragmentGenerator::new();
        let shader = generator.generate("interface_test", &graph, &mut ctx).unwrap();
        let code = shader.source_code(hw::PIXEL_STAGE).unwrap();

        assert!(code.contains("vec3 base_color"));
        assert!(code.contains("mx_constant_color3(base_color, c_out);"));
        assert!(code.contains("return c_out;"));
    }

    #[test]
    fn test_missing_implementation_names_the_node() {
        let mut ctx = GenContext::default();
        let def = Arc::new(
            NodeDef::new("ND_osl_only", "mystery", types::COLOR3).with_implementation(
                ImplDef::new(
                    "osl",
                    ImplKind::SourceCode {
                        file: "stdlib/genosl/mx_mystery.osl".into(),
                        function: "mx_mystery".into(),
                    },
                ),
            ),
        );
        let mut graph = ShaderGraph::new("missing");
        graph
            .add_node(ShaderNode::new("mystery1", def))
            .unwrap();

        let generator = GlslFragmentGenerator::new();
        let result = generator.generate("missing_test", &graph, &mut ctx);
        assert!(matches!(
            result,
            Err(ShaderGenError::NoMatchingImplementation { node, language, .. })
                if node == "mystery1" && language == "glsl"
        ));
    }
}
