// SPDX-License-Identifier: MIT OR Apache-2.0
//! Generator orchestration: binding, dependency-order emission and the
//! per-language generators built on top of it.

mod fragment;
mod glsl;
mod osl;

pub use fragment::GlslFragmentGenerator;
pub use glsl::GlslGenerator;
pub use osl::OslGenerator;

use crate::context::GenContext;
use crate::error::ShaderGenError;
use crate::implementation::{Implementation, LightShaderImpl, SourceCodeImpl};
use crate::shader::Shader;
use crate::stage::{Brackets, ShaderStage, ShaderVariable};
use crate::syntax::Syntax;
use glint_graph::{types, NodeDef, NodeId, ShaderGraph, ShaderNode, SocketSource, Type};
use indexmap::IndexMap;
use std::collections::HashMap;

/// Well-known names used by the hardware generators.
pub mod hw {
    /// Vertex stage name.
    pub const VERTEX_STAGE: &str = "vertex";
    /// Pixel stage name. Single-stage generators use this name too.
    pub const PIXEL_STAGE: &str = "pixel";

    /// Vertex attribute input block.
    pub const VERTEX_INPUTS: &str = "VertexInputs";
    /// Cross-stage varying block.
    pub const VERTEX_DATA: &str = "VertexData";
    /// Uniforms owned by the host integration.
    pub const PRIVATE_UNIFORMS: &str = "PrivateUniforms";
    /// Uniforms published to the user interface.
    pub const PUBLIC_UNIFORMS: &str = "PublicUniforms";
    /// Pixel stage output block.
    pub const PIXEL_OUTPUTS: &str = "PixelOutputs";
    /// Per-light data block.
    pub const LIGHT_DATA: &str = "LightData";

    /// Position attribute.
    pub const ATTR_POSITION: &str = "i_position";
    /// Normal attribute.
    pub const ATTR_NORMAL: &str = "i_normal";
    /// World-space position varying.
    pub const POSITION_WORLD: &str = "positionWorld";
    /// World-space normal varying.
    pub const NORMAL_WORLD: &str = "normalWorld";
    /// World matrix uniform.
    pub const WORLD_MATRIX: &str = "u_worldMatrix";
    /// World inverse transpose matrix uniform.
    pub const WORLD_INVERSE_TRANSPOSE_MATRIX: &str = "u_worldInverseTransposeMatrix";
    /// View-projection matrix uniform.
    pub const VIEW_PROJECTION_MATRIX: &str = "u_viewProjectionMatrix";
    /// Frame time uniform.
    pub const FRAME: &str = "u_frame";
    /// Active light count uniform.
    pub const NUM_ACTIVE_LIGHTS: &str = "u_numActiveLightSources";
    /// Light data uniform array instance.
    pub const LIGHT_DATA_INSTANCE: &str = "u_lightData";
    /// Maximum light count macro.
    pub const MAX_LIGHT_SOURCES: &str = "MAX_LIGHT_SOURCES";
}

/// A per-language shader generator.
///
/// One generator instance serves one request; concurrent requests each
/// own their generator, context and stages.
pub trait ShaderGenerator {
    /// The target shading language.
    fn language(&self) -> &'static str;
    /// The generator target within the language; may be empty.
    fn target(&self) -> &'static str;
    /// The active syntax rules.
    fn syntax(&self) -> &dyn Syntax;
    /// Generate a shader for a graph. Fatal conditions abort the request
    /// with a descriptive error; no partial output is returned.
    fn generate(
        &self,
        name: &str,
        graph: &ShaderGraph,
        ctx: &mut GenContext,
    ) -> Result<Shader, ShaderGenError>;
}

/// Per-request emission state: resolved implementations, synthesized
/// socket variable names and the dependency order.
pub struct Emitter<'a> {
    /// The graph being generated.
    pub graph: &'a ShaderGraph,
    /// The active syntax rules.
    pub syntax: &'a dyn Syntax,
    /// The active language.
    pub language: &'a str,
    /// The active target.
    pub target: &'a str,
    bindings: IndexMap<NodeId, Implementation>,
    output_variables: HashMap<(NodeId, usize), String>,
    input_variables: HashMap<(NodeId, usize), String>,
    graph_input_variables: Vec<String>,
    order: Vec<NodeId>,
}

impl<'a> Emitter<'a> {
    /// Bind every node of a graph to an implementation and assign the
    /// variable names its sockets will use in emitted code.
    ///
    /// A node whose definition has no entry for the (language, target)
    /// pair fails with [`ShaderGenError::NoMatchingImplementation`].
    pub fn bind(
        graph: &'a ShaderGraph,
        syntax: &'a dyn Syntax,
        language: &'a str,
        target: &'a str,
        ctx: &mut GenContext,
    ) -> Result<Self, ShaderGenError> {
        let order = graph.topological_order()?;

        let mut bindings = IndexMap::new();
        let mut output_variables = HashMap::new();
        let mut input_variables = HashMap::new();

        for node in graph.nodes() {
            let entry = node.def.implementation(language, target).ok_or_else(|| {
                ShaderGenError::NoMatchingImplementation {
                    node: node.name.clone(),
                    language: language.to_string(),
                    target: target.to_string(),
                }
            })?;
            let implementation = Implementation::from_def(&entry.kind, &node.def, ctx)?;
            bindings.insert(node.id, implementation);

            for (index, output) in node.outputs.iter().enumerate() {
                let base = syntax.variable_name(&format!("{}_{}", node.name, output.name), output.ty);
                let variable = ctx.make_identifier(&base, syntax);
                output_variables.insert((node.id, index), variable);
            }
            for (index, input) in node.inputs.iter().enumerate() {
                let base = syntax.variable_name(&format!("{}_{}", node.name, input.name), input.ty);
                let variable = ctx.make_identifier(&base, syntax);
                input_variables.insert((node.id, index), variable);
            }
        }

        let mut graph_input_variables = Vec::with_capacity(graph.inputs().len());
        for input in graph.inputs() {
            let base = syntax.variable_name(&input.name, input.ty);
            graph_input_variables.push(ctx.make_identifier(&base, syntax));
        }

        Ok(Self {
            graph,
            syntax,
            language,
            target,
            bindings,
            output_variables,
            input_variables,
            graph_input_variables,
            order,
        })
    }

    /// Nodes in dependency order.
    pub fn order(&self) -> &[NodeId] {
        &self.order
    }

    /// The implementation bound to a node.
    pub fn binding(&self, node: NodeId) -> Option<&Implementation> {
        self.bindings.get(&node)
    }

    /// The variable name assigned to a node output socket.
    pub fn output_variable(&self, node: NodeId, index: usize) -> Result<String, ShaderGenError> {
        self.output_variables
            .get(&(node, index))
            .cloned()
            .ok_or_else(|| ShaderGenError::UnknownVariable {
                block: "node outputs".to_string(),
                name: format!("{node:?}[{index}]"),
            })
    }

    /// The variable name assigned to a node input socket.
    pub fn input_variable(&self, node: NodeId, index: usize) -> Result<String, ShaderGenError> {
        self.input_variables
            .get(&(node, index))
            .cloned()
            .ok_or_else(|| ShaderGenError::UnknownVariable {
                block: "node inputs".to_string(),
                name: format!("{node:?}[{index}]"),
            })
    }

    /// The variable name assigned to an external graph input.
    pub fn graph_input_variable(&self, index: usize) -> Result<String, ShaderGenError> {
        self.graph_input_variables
            .get(index)
            .cloned()
            .ok_or_else(|| ShaderGenError::UnknownVariable {
                block: "graph inputs".to_string(),
                name: index.to_string(),
            })
    }

    /// Spelled type name for the active language, failing when the
    /// syntax has no mapping.
    pub fn type_name(&self, ty: Type) -> Result<&str, ShaderGenError> {
        self.syntax
            .type_name(ty)
            .ok_or_else(|| self.unsupported(ty))
    }

    /// Component accessors for an aggregate type.
    pub fn aggregate_members(&self, ty: Type) -> Result<&[&'static str], ShaderGenError> {
        self.syntax
            .type_syntax(ty)
            .and_then(|syntax| syntax.aggregate.as_ref())
            .map(|aggregate| aggregate.members.as_slice())
            .ok_or_else(|| self.unsupported(ty))
    }

    /// Construct a value of `ty` from component expressions through the
    /// syntax's construction idiom.
    pub fn construct_value(&self, ty: Type, components: &[String]) -> Result<String, ShaderGenError> {
        if ty.is_scalar() && components.len() == 1 {
            return Ok(components[0].clone());
        }
        self.syntax
            .type_syntax(ty)
            .and_then(|syntax| syntax.aggregate.as_ref())
            .map(|aggregate| aggregate.construct(components))
            .ok_or_else(|| self.unsupported(ty))
    }

    /// `"<type> <variable>"` declaration text for a node output.
    pub fn output_declaration(
        &self,
        node: &ShaderNode,
        index: usize,
    ) -> Result<String, ShaderGenError> {
        let output = node
            .output(index)
            .ok_or_else(|| ShaderGenError::InvalidNodeSignature {
                node: node.name.clone(),
                kind: "output",
            })?;
        let type_name = self.type_name(output.ty)?;
        let variable = self.output_variable(node.id, index)?;
        Ok(format!("{type_name} {variable}"))
    }

    /// Default value literal for a node output.
    pub fn output_default(&self, node: &ShaderNode, index: usize) -> Result<String, ShaderGenError> {
        let output = node
            .output(index)
            .ok_or_else(|| ShaderGenError::InvalidNodeSignature {
                node: node.name.clone(),
                kind: "output",
            })?;
        self.syntax
            .default_value(output.ty)
            .map(str::to_string)
            .ok_or_else(|| self.unsupported(output.ty))
    }

    /// Expression for the value feeding a node input: the upstream
    /// socket's variable when connected, the promoted uniform for
    /// unconnected filenames, or the formatted literal/default value.
    pub fn upstream_result(
        &self,
        node: &ShaderNode,
        index: usize,
    ) -> Result<String, ShaderGenError> {
        let socket = node
            .input(index)
            .ok_or_else(|| ShaderGenError::InvalidNodeSignature {
                node: node.name.clone(),
                kind: "input",
            })?;
        match socket.connection {
            Some(SocketSource::Node { node: upstream, output }) => {
                self.output_variable(upstream, output)
            }
            Some(SocketSource::GraphInput { index }) => self.graph_input_variable(index),
            None => {
                if socket.ty == types::FILENAME {
                    // Promoted to a public sampler uniform at setup.
                    return self.input_variable(node.id, index);
                }
                if let Some(value) = &socket.value {
                    return self
                        .syntax
                        .value(socket.ty, value)
                        .ok_or_else(|| self.unsupported(socket.ty));
                }
                self.syntax
                    .default_value(socket.ty)
                    .map(str::to_string)
                    .ok_or_else(|| self.unsupported(socket.ty))
            }
        }
    }

    /// A variable usable for member access on a node input. Connected
    /// inputs already have one; unconnected inputs get a local declared
    /// from their literal value first.
    pub fn accessible_variable(
        &self,
        node: &ShaderNode,
        index: usize,
        stage: &mut ShaderStage,
    ) -> Result<String, ShaderGenError> {
        let socket = node
            .input(index)
            .ok_or_else(|| ShaderGenError::InvalidNodeSignature {
                node: node.name.clone(),
                kind: "input",
            })?;
        match socket.connection {
            Some(SocketSource::Node { node: upstream, output }) => {
                self.output_variable(upstream, output)
            }
            Some(SocketSource::GraphInput { index }) => self.graph_input_variable(index),
            None => {
                let variable = self.input_variable(node.id, index)?;
                let type_name = self.type_name(socket.ty)?.to_string();
                let value = match &socket.value {
                    Some(value) => self
                        .syntax
                        .value(socket.ty, value)
                        .ok_or_else(|| self.unsupported(socket.ty))?,
                    None => self
                        .syntax
                        .default_value(socket.ty)
                        .map(str::to_string)
                        .ok_or_else(|| self.unsupported(socket.ty))?,
                };
                stage.add_line(&format!("{type_name} {variable} = {value}"), true);
                Ok(variable)
            }
        }
    }

    /// Unconnected filename-typed node inputs, to be promoted into the
    /// public uniform block as texture samplers.
    pub fn filename_inputs(&self) -> Vec<(String, Type)> {
        let mut promoted = Vec::new();
        for node in self.graph.nodes() {
            for (index, socket) in node.inputs.iter().enumerate() {
                if socket.ty == types::FILENAME && socket.connection.is_none() {
                    if let Ok(variable) = self.input_variable(node.id, index) {
                        promoted.push((variable, socket.ty));
                    }
                }
            }
        }
        promoted
    }

    /// Emit one function definition per distinct implementation hash, in
    /// dependency order.
    pub fn emit_function_definitions(
        &self,
        ctx: &GenContext,
        stage: &mut ShaderStage,
    ) -> Result<(), ShaderGenError> {
        for node_id in &self.order {
            let Some(node) = self.graph.node(*node_id) else {
                continue;
            };
            let Some(implementation) = self.bindings.get(node_id) else {
                continue;
            };
            if stage.mark_function_defined(implementation.hash()) {
                implementation.emit_function_definition(node, ctx, stage)?;
            }
        }
        Ok(())
    }

    /// Emit every node's function call, in dependency order.
    pub fn emit_function_calls(
        &self,
        ctx: &GenContext,
        stage: &mut ShaderStage,
    ) -> Result<(), ShaderGenError> {
        for node_id in &self.order {
            let Some(node) = self.graph.node(*node_id) else {
                continue;
            };
            let Some(implementation) = self.bindings.get(node_id) else {
                continue;
            };
            implementation.emit_function_call(node, self, ctx, stage)?;
        }
        Ok(())
    }

    /// Expression for the graph's first output socket: the upstream
    /// variable (swizzled if the socket carries a channel mask), or the
    /// socket's literal/default value when unconnected.
    pub fn final_output_result(&self) -> Result<Option<String>, ShaderGenError> {
        let Some(socket) = self.graph.output_socket() else {
            return Ok(None);
        };
        if let Some((node_id, output)) = socket.connection {
            let mut result = self.output_variable(node_id, output)?;
            if !socket.channels.is_empty() {
                let upstream_ty = self
                    .graph
                    .node(node_id)
                    .and_then(|node| node.output(output))
                    .map(|upstream| upstream.ty)
                    .unwrap_or(socket.ty);
                result = self
                    .syntax
                    .swizzled_variable(&result, upstream_ty, &socket.channels, socket.ty)
                    .ok_or_else(|| self.unsupported(socket.ty))?;
            }
            return Ok(Some(result));
        }
        if let Some(value) = &socket.value {
            return self
                .syntax
                .value(socket.ty, value)
                .map(Some)
                .ok_or_else(|| self.unsupported(socket.ty));
        }
        Ok(self.syntax.default_value(socket.ty).map(str::to_string))
    }

    fn unsupported(&self, ty: Type) -> ShaderGenError {
        ShaderGenError::UnsupportedType {
            ty: ty.name().to_string(),
            language: self.language.to_string(),
        }
    }
}

/// Emit `qualifier type name [= value];` declarations for every variable
/// of a uniform block. Variables whose type has no mapping in the active
/// syntax are skipped; partial fragments remain useful downstream.
pub fn emit_uniform_declarations(
    stage: &mut ShaderStage,
    block: &str,
    syntax: &dyn Syntax,
) -> Result<(), ShaderGenError> {
    let variables: Vec<ShaderVariable> = stage.uniform_block(block)?.variables().cloned().collect();
    let qualifier = syntax.uniform_qualifier();
    for variable in variables {
        let Some(type_name) = syntax.type_name(variable.ty) else {
            tracing::debug!(
                variable = %variable.name,
                ty = %variable.ty,
                "skipping uniform with no syntax mapping"
            );
            continue;
        };
        let mut line = format!("{qualifier} {type_name} {}", variable.name);
        if let Some(value) = &variable.value {
            if let Some(text) = syntax.value(variable.ty, value) {
                line.push_str(" = ");
                line.push_str(&text);
            }
        }
        stage.add_line(&line, true);
    }
    Ok(())
}

/// Emit the constant block declarations of a stage.
pub fn emit_constant_declarations(
    stage: &mut ShaderStage,
    syntax: &dyn Syntax,
) -> Result<(), ShaderGenError> {
    let variables: Vec<ShaderVariable> = stage.constant_block().variables().cloned().collect();
    let qualifier = syntax.constant_qualifier();
    for variable in variables {
        let Some(type_name) = syntax.type_name(variable.ty) else {
            tracing::debug!(
                variable = %variable.name,
                ty = %variable.ty,
                "skipping constant with no syntax mapping"
            );
            continue;
        };
        let value = match &variable.value {
            Some(value) => syntax.value(variable.ty, value),
            None => syntax.default_value(variable.ty).map(str::to_string),
        };
        let Some(value) = value else { continue };
        stage.add_line(
            &format!("{qualifier} {type_name} {} = {value}", variable.name),
            true,
        );
    }
    Ok(())
}

/// Emit every one-shot type definition the syntax declares, once.
pub fn emit_type_definitions(stage: &mut ShaderStage, syntax: &dyn Syntax) {
    let definitions: Vec<String> = syntax
        .table()
        .type_syntaxes()
        .filter_map(|(_, type_syntax)| type_syntax.type_definition.clone())
        .collect();
    for definition in definitions {
        for line in definition.lines() {
            stage.add_line(line, false);
        }
    }
    if !stage.code().is_empty() {
        stage.new_line();
    }
}

/// Apply an ordered identifier-to-identifier substitution table to a
/// stage's text, as a single post-pass. Replacement happens on identifier
/// boundaries only.
pub fn replace_tokens(stage: &mut ShaderStage, substitutions: &IndexMap<String, String>) {
    if substitutions.is_empty() {
        return;
    }
    let code = stage.code();
    let mut out = String::with_capacity(code.len());
    let mut identifier = String::new();
    for ch in code.chars() {
        if ch.is_ascii_alphanumeric() || ch == '_' {
            identifier.push(ch);
        } else {
            if !identifier.is_empty() {
                match substitutions.get(&identifier) {
                    Some(replacement) => out.push_str(replacement),
                    None => out.push_str(&identifier),
                }
                identifier.clear();
            }
            out.push(ch);
        }
    }
    if !identifier.is_empty() {
        match substitutions.get(&identifier) {
            Some(replacement) => out.push_str(replacement),
            None => out.push_str(&identifier),
        }
    }
    stage.set_code(out);
}

/// Light shaders bound to numeric light type ids for the hardware
/// generators. Evaluated inside the loop over active light sources.
#[derive(Debug, Default)]
pub struct HwLightBindings {
    bindings: IndexMap<usize, LightShaderImpl>,
}

impl HwLightBindings {
    /// Bind a light shader nodedef to a numeric light type id.
    ///
    /// The nodedef must be of lightshader type and the id must not be
    /// bound already; both conditions are fatal errors. Input sockets are
    /// renamed with the `light.` structural prefix so that generated code
    /// addresses them as members of the per-light data structure.
    pub fn bind(
        &mut self,
        light_type: usize,
        def: &NodeDef,
        language: &str,
        target: &str,
        ctx: &GenContext,
    ) -> Result<(), ShaderGenError> {
        if def.ty != types::LIGHT_SHADER {
            return Err(ShaderGenError::TypeMismatch(def.name.clone()));
        }
        if self.bindings.contains_key(&light_type) {
            return Err(ShaderGenError::DuplicateLightBinding(light_type));
        }

        let entry = def.implementation(language, target).ok_or_else(|| {
            ShaderGenError::NoMatchingImplementation {
                node: def.name.clone(),
                language: language.to_string(),
                target: target.to_string(),
            }
        })?;
        let light = match Implementation::from_def(&entry.kind, def, ctx)? {
            Implementation::LightShader(light) => light,
            Implementation::SourceCode(source) => light_shader_from_source(source, def),
            _ => return Err(ShaderGenError::TypeMismatch(def.name.clone())),
        };
        self.bindings.insert(light_type, light);
        Ok(())
    }

    /// Whether any light shader is bound.
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Bound light shaders, in binding order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &LightShaderImpl)> {
        self.bindings.iter().map(|(id, light)| (*id, light))
    }

    /// Populate the pixel stage's light data block from the bound light
    /// shaders' parameters.
    pub fn create_variables(&self, stage: &mut ShaderStage) {
        let block = stage.create_uniform_block(hw::LIGHT_DATA, hw::LIGHT_DATA_INSTANCE);
        block.add(types::INTEGER, "type", None);
        for (_, light) in self.bindings.iter() {
            for (name, ty) in light.light_params() {
                block.add(ty, name, None);
            }
        }
    }

    /// Emit the light data struct, its uniform array bounded by the
    /// maximum light count, and the active light count uniform.
    pub fn emit_light_data(
        &self,
        stage: &mut ShaderStage,
        syntax: &dyn Syntax,
    ) -> Result<(), ShaderGenError> {
        let variables: Vec<ShaderVariable> =
            stage.uniform_block(hw::LIGHT_DATA)?.variables().cloned().collect();

        stage.add_line(&format!("struct {}", hw::LIGHT_DATA), false);
        stage.begin_scope(Brackets::Braces);
        for variable in &variables {
            let Some(type_name) = syntax.type_name(variable.ty) else {
                tracing::debug!(
                    variable = %variable.name,
                    "skipping light data member with no syntax mapping"
                );
                continue;
            };
            stage.add_line(&format!("{type_name} {}", variable.name), true);
        }
        stage.end_scope(true, true)?;
        stage.new_line();
        stage.add_line(
            &format!(
                "uniform {} {}[{}]",
                hw::LIGHT_DATA,
                hw::LIGHT_DATA_INSTANCE,
                hw::MAX_LIGHT_SOURCES
            ),
            true,
        );
        stage.add_line(&format!("uniform int {}", hw::NUM_ACTIVE_LIGHTS), true);
        stage.new_line();
        Ok(())
    }

    /// Emit each bound light shader's function definition followed by the
    /// light type dispatch function.
    pub fn emit_light_functions(
        &self,
        stage: &mut ShaderStage,
        ctx: &GenContext,
    ) -> Result<(), ShaderGenError> {
        for (_, light) in self.bindings.iter() {
            if stage.mark_function_defined(light.source.hash()) {
                stage.add_block(&light.source.source, ctx)?;
                stage.new_line();
            }
        }

        stage.add_line(
            &format!(
                "void evalLightSource({} light, vec3 position, out lightshader result)",
                hw::LIGHT_DATA
            ),
            false,
        );
        stage.begin_scope(Brackets::Braces);
        stage.add_line("result.intensity = vec3(0.0)", true);
        stage.add_line("result.direction = vec3(0.0, 0.0, 1.0)", true);
        for (light_type, light) in self.bindings.iter() {
            stage.add_line(&format!("if (light.type == {light_type})"), false);
            stage.begin_scope(Brackets::Braces);
            light.emit_dispatch_call(stage, "result");
            stage.add_line("return", true);
            stage.end_scope(false, true)?;
        }
        stage.end_scope(false, true)?;
        stage.new_line();
        Ok(())
    }
}

fn light_shader_from_source(source: SourceCodeImpl, def: &NodeDef) -> LightShaderImpl {
    let params = def
        .inputs
        .iter()
        .map(|input| (format!("light.{}", input.name), input.ty))
        .collect();
    LightShaderImpl { source, params }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::GlslSyntax;
    use glint_graph::{ImplDef, ImplKind, PortDef};
    use std::sync::Arc;

    fn add_def_with_source(ctx: &mut GenContext) -> Arc<NodeDef> {
        ctx.register_source(
            "stdlib/genglsl/mx_add.glsl",
            "void mx_add(vec3 in1, vec3 in2, out vec3 result)\n{\n    result = in1 + in2;\n}\n",
        );
        Arc::new(
            NodeDef::new("ND_add_color3", "add", types::COLOR3)
                .with_input(PortDef::new("in1", types::COLOR3))
                .with_input(PortDef::new("in2", types::COLOR3))
                .with_implementation(ImplDef::new(
                    "glsl",
                    ImplKind::SourceCode {
                        file: "stdlib/genglsl/mx_add.glsl".into(),
                        function: "mx_add".into(),
                    },
                )),
        )
    }

    fn point_light_def(ctx: &mut GenContext) -> NodeDef {
        ctx.register_source(
            "pbrlib/genglsl/mx_point_light.glsl",
            "void mx_point_light(vec3 color, float intensity, vec3 position, out lightshader result)\n{\n    result.intensity = color * intensity;\n    result.direction = vec3(0.0, 0.0, 1.0);\n}\n",
        );
        NodeDef::new("ND_point_light", "point_light", types::LIGHT_SHADER)
            .with_input(PortDef::new("color", types::COLOR3))
            .with_input(PortDef::new("intensity", types::FLOAT))
            .with_input(PortDef::new("position", types::VECTOR3))
            .with_implementation(ImplDef::new(
                "glsl",
                ImplKind::LightShader {
                    file: "pbrlib/genglsl/mx_point_light.glsl".into(),
                    function: "mx_point_light".into(),
                },
            ))
    }

    #[test]
    fn test_missing_implementation_is_fatal() {
        let mut graph = ShaderGraph::new("test");
        let def = Arc::new(NodeDef::new("ND_mystery", "mystery", types::COLOR3));
        graph
            .add_node(glint_graph::ShaderNode::new("mystery1", def))
            .unwrap();

        let syntax = GlslSyntax::new();
        let mut ctx = GenContext::default();
        let result = Emitter::bind(&graph, &syntax, "glsl", "", &mut ctx);
        assert!(matches!(
            result,
            Err(ShaderGenError::NoMatchingImplementation { node, language, .. })
                if node == "mystery1" && language == "glsl"
        ));
    }

    #[test]
    fn test_shared_implementation_defined_once() {
        let mut ctx = GenContext::default();
        let def = add_def_with_source(&mut ctx);
        let mut graph = ShaderGraph::new("dedup");
        graph
            .add_node(glint_graph::ShaderNode::new("add1", def.clone()))
            .unwrap();
        graph
            .add_node(glint_graph::ShaderNode::new("add2", def))
            .unwrap();

        let syntax = GlslSyntax::new();
        let emitter = Emitter::bind(&graph, &syntax, "glsl", "", &mut ctx).unwrap();
        let mut stage = ShaderStage::new(hw::PIXEL_STAGE);
        emitter.emit_function_definitions(&ctx, &mut stage).unwrap();
        emitter.emit_function_calls(&ctx, &mut stage).unwrap();

        // One definition, one call per instance.
        assert_eq!(stage.code().matches("void mx_add").count(), 1);
        assert_eq!(
            stage.code().matches("mx_add(vec3(0.0), vec3(0.0),").count(),
            2
        );
    }

    #[test]
    fn test_replace_tokens_on_identifier_boundaries() {
        let mut stage = ShaderStage::new(hw::PIXEL_STAGE);
        stage.add_line("vec3 result = vd.positionWorld + positionWorldOffset", true);

        let mut substitutions = IndexMap::new();
        substitutions.insert("vd".to_string(), "PIX_IN".to_string());
        substitutions.insert("positionWorld".to_string(), "Pw".to_string());
        replace_tokens(&mut stage, &substitutions);

        assert_eq!(
            stage.code(),
            "vec3 result = PIX_IN.Pw + positionWorldOffset;\n"
        );
    }

    #[test]
    fn test_light_binding_error_ladder() {
        let mut ctx = GenContext::default();
        let def = point_light_def(&mut ctx);

        let mut lights = HwLightBindings::default();
        lights.bind(0, &def, "glsl", "", &ctx).unwrap();

        let result = lights.bind(0, &def, "glsl", "", &ctx);
        assert!(matches!(
            result,
            Err(ShaderGenError::DuplicateLightBinding(0))
        ));

        let not_a_light = NodeDef::new("ND_add_color3", "add", types::COLOR3);
        let result = lights.bind(1, &not_a_light, "glsl", "", &ctx);
        assert!(matches!(
            result,
            Err(ShaderGenError::TypeMismatch(name)) if name == "ND_add_color3"
        ));
    }

    #[test]
    fn test_light_data_block_members() {
        let mut ctx = GenContext::default();
        let def = point_light_def(&mut ctx);
        let mut lights = HwLightBindings::default();
        lights.bind(0, &def, "glsl", "", &ctx).unwrap();

        let mut stage = ShaderStage::new(hw::PIXEL_STAGE);
        lights.create_variables(&mut stage);
        let block = stage.uniform_block(hw::LIGHT_DATA).unwrap();
        // The type discriminator leads, then the bound shader's inputs
        // without their structural prefix.
        assert_eq!(block.get(0).unwrap().name, "type");
        assert!(block.find("color").is_some());
        assert!(block.find("intensity").is_some());
        assert!(block.find("position").is_some());
    }
}
