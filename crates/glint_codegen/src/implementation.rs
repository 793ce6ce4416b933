// SPDX-License-Identifier: MIT OR Apache-2.0
//! Code-emission strategies bound to graph nodes.
//!
//! Each node resolves, at bind time, to one strategy from a closed set:
//! verbatim source inclusion, procedural emission (combine, convert,
//! swizzle, compare), hardware-stream binding, or light-shader binding.
//! Dispatch is a match on the strategy tag.

use crate::context::GenContext;
use crate::error::ShaderGenError;
use crate::generator::{hw, Emitter};
use crate::stage::{Brackets, ShaderStage};
use crate::shader::Shader;
use glint_graph::{types, ImplKind, NodeDef, ShaderNode, StreamKind, Value};
use std::hash::{Hash, Hasher};

/// Verbatim source inclusion: a pre-written function (or single inline
/// expression) embedded into the stage and called positionally.
#[derive(Debug, Clone)]
pub struct SourceCodeImpl {
    /// Function to call; unused for inline expressions.
    pub function: String,
    /// The source text.
    pub source: String,
    /// Whether `source` is a single expression with `{{input}}`
    /// placeholders instead of a function body.
    pub inline: bool,
    hash: u64,
}

impl SourceCodeImpl {
    fn new(function: String, source: String, inline: bool) -> Self {
        let hash = content_hash(&source);
        Self {
            function,
            source,
            inline,
            hash,
        }
    }

    /// Content hash of the source text.
    pub fn hash(&self) -> u64 {
        self.hash
    }
}

/// Light-shader source binding. Input sockets are addressed as members of
/// the per-light data structure.
#[derive(Debug, Clone)]
pub struct LightShaderImpl {
    /// The underlying source function.
    pub source: SourceCodeImpl,
    /// Call arguments with the light struct instance prefix, and their
    /// types.
    pub params: Vec<(String, glint_graph::Type)>,
}

impl LightShaderImpl {
    /// Parameters this light shader reads, without the structural prefix.
    pub fn light_params(&self) -> impl Iterator<Item = (&str, glint_graph::Type)> {
        self.params.iter().map(|(param, ty)| {
            (param.strip_prefix("light.").unwrap_or(param), *ty)
        })
    }

    /// Emit the dispatch call inside the light loop.
    pub fn emit_dispatch_call(&self, stage: &mut ShaderStage, result: &str) {
        let mut call = format!("{}(", self.source.function);
        for (param, _) in &self.params {
            call.push_str(param);
            call.push_str(", ");
        }
        call.push_str(result);
        call.push(')');
        stage.add_line(&call, true);
    }
}

/// A node's bound code-emission strategy.
#[derive(Debug, Clone)]
pub enum Implementation {
    /// Verbatim source inclusion.
    SourceCode(SourceCodeImpl),
    /// Procedural aggregate construction.
    Combine,
    /// Procedural structural conversion.
    Convert,
    /// Procedural channel re-ordering.
    Swizzle,
    /// Procedural two-branch select.
    Compare,
    /// Hardware stream binding.
    Stream(StreamKind),
    /// Light-shader binding.
    LightShader(LightShaderImpl),
}

impl Implementation {
    /// Resolve an implementation entry into a bound strategy, loading
    /// source text through the context.
    pub fn from_def(
        kind: &ImplKind,
        def: &NodeDef,
        ctx: &GenContext,
    ) -> Result<Self, ShaderGenError> {
        match kind {
            ImplKind::SourceCode { file, function } => {
                let (_, source) = ctx
                    .resolve_source(file)
                    .ok_or_else(|| ShaderGenError::MissingInclude(file.clone()))?;
                let inline = file.ends_with(".inline");
                Ok(Self::SourceCode(SourceCodeImpl::new(
                    function.clone(),
                    source,
                    inline,
                )))
            }
            ImplKind::Combine => Ok(Self::Combine),
            ImplKind::Convert => Ok(Self::Convert),
            ImplKind::Swizzle => Ok(Self::Swizzle),
            ImplKind::Compare => Ok(Self::Compare),
            ImplKind::Stream(stream) => Ok(Self::Stream(*stream)),
            ImplKind::LightShader { file, function } => {
                let (_, source) = ctx
                    .resolve_source(file)
                    .ok_or_else(|| ShaderGenError::MissingInclude(file.clone()))?;
                let params = def
                    .inputs
                    .iter()
                    .map(|input| (format!("light.{}", input.name), input.ty))
                    .collect();
                Ok(Self::LightShader(LightShaderImpl {
                    source: SourceCodeImpl::new(function.clone(), source, false),
                    params,
                }))
            }
        }
    }

    /// Content hash of this implementation, keying function-definition
    /// deduplication. Many node instances can share one implementation.
    pub fn hash(&self) -> u64 {
        match self {
            Self::SourceCode(source) => source.hash,
            Self::LightShader(light) => light.source.hash,
            Self::Combine => content_hash("procedural:combine"),
            Self::Convert => content_hash("procedural:convert"),
            Self::Swizzle => content_hash("procedural:swizzle"),
            Self::Compare => content_hash("procedural:compare"),
            Self::Stream(stream) => content_hash(&format!("stream:{stream:?}")),
        }
    }

    /// Declare the stage variables this implementation needs. Variable
    /// blocks deduplicate by name, so repeated stream reads declare once.
    pub fn create_variables(
        &self,
        node: &ShaderNode,
        shader: &mut Shader,
    ) -> Result<(), ShaderGenError> {
        let Self::Stream(stream) = self else {
            return Ok(());
        };
        match stream {
            StreamKind::Position => {
                if shader.has_stage(hw::VERTEX_STAGE) {
                    let vertex = shader.stage_mut(hw::VERTEX_STAGE)?;
                    vertex
                        .create_input_block(hw::VERTEX_INPUTS, "")
                        .add(types::VECTOR3, hw::ATTR_POSITION, None);
                    add_varying(vertex.create_output_block(hw::VERTEX_DATA, "vd"), hw::POSITION_WORLD, types::VECTOR3);
                }
                let pixel = shader.stage_mut(hw::PIXEL_STAGE)?;
                add_varying(pixel.create_input_block(hw::VERTEX_DATA, "vd"), hw::POSITION_WORLD, types::VECTOR3);
            }
            StreamKind::Normal => {
                if shader.has_stage(hw::VERTEX_STAGE) {
                    let vertex = shader.stage_mut(hw::VERTEX_STAGE)?;
                    vertex
                        .create_input_block(hw::VERTEX_INPUTS, "")
                        .add(types::VECTOR3, hw::ATTR_NORMAL, None);
                    vertex
                        .create_uniform_block(hw::PRIVATE_UNIFORMS, "u")
                        .add(types::MATRIX44, hw::WORLD_INVERSE_TRANSPOSE_MATRIX, None);
                    add_varying(vertex.create_output_block(hw::VERTEX_DATA, "vd"), hw::NORMAL_WORLD, types::VECTOR3);
                }
                let pixel = shader.stage_mut(hw::PIXEL_STAGE)?;
                add_varying(pixel.create_input_block(hw::VERTEX_DATA, "vd"), hw::NORMAL_WORLD, types::VECTOR3);
            }
            StreamKind::TexCoord => {
                let index = stream_index(node);
                let attribute = format!("i_texcoord_{index}");
                let varying = format!("texcoord_{index}");
                if shader.has_stage(hw::VERTEX_STAGE) {
                    let vertex = shader.stage_mut(hw::VERTEX_STAGE)?;
                    vertex
                        .create_input_block(hw::VERTEX_INPUTS, "")
                        .add(types::VECTOR2, attribute, None);
                    add_varying(vertex.create_output_block(hw::VERTEX_DATA, "vd"), &varying, types::VECTOR2);
                }
                let pixel = shader.stage_mut(hw::PIXEL_STAGE)?;
                add_varying(pixel.create_input_block(hw::VERTEX_DATA, "vd"), &varying, types::VECTOR2);
            }
            StreamKind::Color => {
                let index = stream_index(node);
                let attribute = format!("i_color_{index}");
                let varying = format!("color_{index}");
                if shader.has_stage(hw::VERTEX_STAGE) {
                    let vertex = shader.stage_mut(hw::VERTEX_STAGE)?;
                    vertex
                        .create_input_block(hw::VERTEX_INPUTS, "")
                        .add(types::COLOR4, attribute, None);
                    add_varying(vertex.create_output_block(hw::VERTEX_DATA, "vd"), &varying, types::COLOR4);
                }
                let pixel = shader.stage_mut(hw::PIXEL_STAGE)?;
                add_varying(pixel.create_input_block(hw::VERTEX_DATA, "vd"), &varying, types::COLOR4);
            }
            StreamKind::Time => {
                let pixel = shader.stage_mut(hw::PIXEL_STAGE)?;
                pixel
                    .create_uniform_block(hw::PRIVATE_UNIFORMS, "u")
                    .add(types::FLOAT, hw::FRAME, None)
                    .flags
                    .push("global".to_string());
            }
        }
        Ok(())
    }

    /// Emit this implementation's function definition. Source-inclusion
    /// strategies embed their source text; procedural strategies emit
    /// nothing here and synthesize everything at call time.
    pub fn emit_function_definition(
        &self,
        _node: &ShaderNode,
        ctx: &GenContext,
        stage: &mut ShaderStage,
    ) -> Result<(), ShaderGenError> {
        match self {
            Self::SourceCode(source) if !source.inline => stage.add_block(&source.source, ctx),
            Self::LightShader(light) => stage.add_block(&light.source.source, ctx),
            _ => Ok(()),
        }
    }

    /// Emit this implementation's per-node code into a stage.
    pub fn emit_function_call(
        &self,
        node: &ShaderNode,
        emitter: &Emitter<'_>,
        ctx: &GenContext,
        stage: &mut ShaderStage,
    ) -> Result<(), ShaderGenError> {
        if let Self::Stream(stream) = self {
            return emit_stream_call(*stream, node, emitter, ctx, stage);
        }

        // Everything else emits into the pixel (or single) stage only.
        if stage.name() != hw::PIXEL_STAGE {
            return Ok(());
        }

        match self {
            Self::SourceCode(source) => emit_source_call(source, node, emitter, stage),
            Self::Combine => emit_combine_call(node, emitter, stage),
            Self::Convert => emit_convert_call(node, emitter, stage),
            Self::Swizzle => emit_swizzle_call(node, emitter, stage),
            Self::Compare => emit_compare_call(node, emitter, stage),
            // Light shaders are called from the light loop, not per node.
            Self::LightShader(_) | Self::Stream(_) => Ok(()),
        }
    }
}

fn add_varying(block: &mut crate::stage::VariableBlock, name: &str, ty: glint_graph::Type) {
    let variable = block.add(ty, name, None);
    if !variable.flags.iter().any(|flag| flag == "varying") {
        variable.flags.push("varying".to_string());
    }
}

fn stream_index(node: &ShaderNode) -> String {
    node.input_by_name("index")
        .and_then(|socket| socket.value.as_ref())
        .map_or_else(
            || "0".to_string(),
            |value| match value {
                Value::Integer(index) => index.to_string(),
                _ => "0".to_string(),
            },
        )
}

fn content_hash(text: &str) -> u64 {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    text.hash(&mut hasher);
    hasher.finish()
}

fn emit_source_call(
    source: &SourceCodeImpl,
    node: &ShaderNode,
    emitter: &Emitter<'_>,
    stage: &mut ShaderStage,
) -> Result<(), ShaderGenError> {
    if source.inline {
        let mut expression = source.source.trim().to_string();
        for (index, input) in node.inputs.iter().enumerate() {
            let placeholder = format!("{{{{{}}}}}", input.name);
            if expression.contains(&placeholder) {
                let result = emitter.upstream_result(node, index)?;
                expression = expression.replace(&placeholder, &result);
            }
        }
        let declaration = emitter.output_declaration(node, 0)?;
        stage.add_line(&format!("{declaration} = {expression}"), true);
        return Ok(());
    }

    // Declare outputs, then call the function with inputs and outputs
    // matched positionally.
    let mut arguments = Vec::with_capacity(node.inputs.len() + node.outputs.len());
    for index in 0..node.inputs.len() {
        arguments.push(emitter.upstream_result(node, index)?);
    }
    for index in 0..node.outputs.len() {
        let declaration = emitter.output_declaration(node, index)?;
        let default = emitter.output_default(node, index)?;
        stage.add_line(&format!("{declaration} = {default}"), true);
        arguments.push(emitter.output_variable(node.id, index)?);
    }
    stage.add_line(
        &format!("{}({})", source.function, arguments.join(", ")),
        true,
    );
    Ok(())
}

fn emit_combine_call(
    node: &ShaderNode,
    emitter: &Emitter<'_>,
    stage: &mut ShaderStage,
) -> Result<(), ShaderGenError> {
    let invalid = || ShaderGenError::InvalidNodeSignature {
        node: node.name.clone(),
        kind: "combine",
    };
    let in1 = node.input(0).ok_or_else(invalid)?;
    let out = node.output(0).ok_or_else(invalid)?;

    // The node signature decides which construction to perform and which
    // value components to read.
    let mut components: Vec<String> = Vec::new();
    if in1.ty == types::FLOAT {
        for index in 0..node.inputs.len() {
            components.push(emitter.upstream_result(node, index)?);
        }
    } else if in1.ty.is_float3() {
        let in2 = node.input(1).ok_or_else(invalid)?;
        if in2.ty != types::FLOAT {
            return Err(invalid());
        }
        let variable = emitter.accessible_variable(node, 0, stage)?;
        let members = emitter.aggregate_members(in1.ty)?;
        components.push(format!("{variable}{}", members[0]));
        components.push(format!("{variable}{}", members[1]));
        components.push(format!("{variable}{}", members[2]));
        components.push(emitter.upstream_result(node, 1)?);
    } else if in1.ty.is_float2() {
        let in2 = node.input(1).ok_or_else(invalid)?;
        if !in2.ty.is_float2() {
            return Err(invalid());
        }
        let first = emitter.accessible_variable(node, 0, stage)?;
        let second = emitter.accessible_variable(node, 1, stage)?;
        let first_members = emitter.aggregate_members(in1.ty)?;
        let second_members = emitter.aggregate_members(in2.ty)?;
        components.push(format!("{first}{}", first_members[0]));
        components.push(format!("{first}{}", first_members[1]));
        components.push(format!("{second}{}", second_members[0]));
        components.push(format!("{second}{}", second_members[1]));
    }

    if components.is_empty() {
        return Err(invalid());
    }

    let result = emitter.construct_value(out.ty, &components)?;
    let declaration = emitter.output_declaration(node, 0)?;
    stage.add_line(&format!("{declaration} = {result}"), true);
    Ok(())
}

fn emit_convert_call(
    node: &ShaderNode,
    emitter: &Emitter<'_>,
    stage: &mut ShaderStage,
) -> Result<(), ShaderGenError> {
    let invalid = || ShaderGenError::InvalidNodeSignature {
        node: node.name.clone(),
        kind: "convert",
    };
    let input = node.input(0).ok_or_else(invalid)?;
    let out = node.output(0).ok_or_else(invalid)?;

    let declaration = emitter.output_declaration(node, 0)?;

    // Same spelled type: plain reassignment.
    let source_name = emitter.type_name(input.ty)?.to_string();
    let target_name = emitter.type_name(out.ty)?.to_string();
    if source_name == target_name {
        let result = emitter.upstream_result(node, 0)?;
        stage.add_line(&format!("{declaration} = {result}"), true);
        return Ok(());
    }

    let components: Vec<String> = if input.ty.is_scalar() {
        let result = emitter.upstream_result(node, 0)?;
        std::iter::repeat_with(|| result.clone())
            .take(out.ty.size())
            .collect()
    } else {
        let variable = emitter.accessible_variable(node, 0, stage)?;
        let members = emitter.aggregate_members(input.ty)?;
        let mut components: Vec<String> = members
            .iter()
            .take(out.ty.size())
            .map(|member| format!("{variable}{member}"))
            .collect();
        // Widening pads positionally; the last slot is an alpha of one.
        while components.len() < out.ty.size() {
            if components.len() == out.ty.size() - 1 {
                components.push("1.0".to_string());
            } else {
                components.push("0.0".to_string());
            }
        }
        components
    };

    let result = emitter.construct_value(out.ty, &components)?;
    stage.add_line(&format!("{declaration} = {result}"), true);
    Ok(())
}

fn emit_swizzle_call(
    node: &ShaderNode,
    emitter: &Emitter<'_>,
    stage: &mut ShaderStage,
) -> Result<(), ShaderGenError> {
    let invalid = || ShaderGenError::InvalidNodeSignature {
        node: node.name.clone(),
        kind: "swizzle",
    };
    let input = node.input(0).ok_or_else(invalid)?;
    let out = node.output(0).ok_or_else(invalid)?;

    let channels = node
        .input_by_name("channels")
        .and_then(|socket| socket.value.as_ref())
        .and_then(|value| match value {
            Value::String(channels) => Some(channels.clone()),
            _ => None,
        })
        .unwrap_or_default();

    let declaration = emitter.output_declaration(node, 0)?;
    if channels.is_empty() {
        let result = emitter.upstream_result(node, 0)?;
        stage.add_line(&format!("{declaration} = {result}"), true);
        return Ok(());
    }

    let variable = if input.ty.is_scalar() {
        emitter.upstream_result(node, 0)?
    } else {
        emitter.accessible_variable(node, 0, stage)?
    };
    let result = emitter
        .syntax
        .swizzled_variable(&variable, input.ty, &channels, out.ty)
        .ok_or_else(invalid)?;
    stage.add_line(&format!("{declaration} = {result}"), true);
    Ok(())
}

fn emit_compare_call(
    node: &ShaderNode,
    emitter: &Emitter<'_>,
    stage: &mut ShaderStage,
) -> Result<(), ShaderGenError> {
    let invalid = || ShaderGenError::InvalidNodeSignature {
        node: node.name.clone(),
        kind: "compare",
    };
    if node.inputs.len() < 4 {
        return Err(invalid());
    }
    let intest = emitter.upstream_result(node, 0)?;
    let cutoff = emitter.upstream_result(node, 1)?;

    let declaration = emitter.output_declaration(node, 0)?;
    let default = emitter.output_default(node, 0)?;
    stage.add_line(&format!("{declaration} = {default}"), true);

    let out_variable = emitter.output_variable(node.id, 0)?;
    stage.add_line(&format!("if ({intest} <= {cutoff})"), false);
    stage.begin_scope(Brackets::Braces);
    let in1 = emitter.upstream_result(node, 2)?;
    stage.add_line(&format!("{out_variable} = {in1}"), true);
    stage.end_scope(false, true)?;
    stage.add_line("else", false);
    stage.begin_scope(Brackets::Braces);
    let in2 = emitter.upstream_result(node, 3)?;
    stage.add_line(&format!("{out_variable} = {in2}"), true);
    stage.end_scope(false, true)?;
    Ok(())
}

fn emit_stream_call(
    stream: StreamKind,
    node: &ShaderNode,
    emitter: &Emitter<'_>,
    _ctx: &GenContext,
    stage: &mut ShaderStage,
) -> Result<(), ShaderGenError> {
    match (stream, stage.name()) {
        (StreamKind::Position, hw::VERTEX_STAGE) => {
            propagate_varying(stage, hw::POSITION_WORLD, "hPositionWorld.xyz")?;
        }
        (StreamKind::Normal, hw::VERTEX_STAGE) => {
            let assignment = format!(
                "normalize(({} * vec4({}, 0.0)).xyz)",
                hw::WORLD_INVERSE_TRANSPOSE_MATRIX,
                hw::ATTR_NORMAL
            );
            propagate_varying(stage, hw::NORMAL_WORLD, &assignment)?;
        }
        (StreamKind::TexCoord, hw::VERTEX_STAGE) => {
            let index = stream_index(node);
            propagate_varying(stage, &format!("texcoord_{index}"), &format!("i_texcoord_{index}"))?;
        }
        (StreamKind::Color, hw::VERTEX_STAGE) => {
            let index = stream_index(node);
            propagate_varying(stage, &format!("color_{index}"), &format!("i_color_{index}"))?;
        }
        (StreamKind::Time, hw::PIXEL_STAGE) => {
            let fps = node
                .input_by_name("fps")
                .and_then(|socket| socket.value.as_ref())
                .and_then(|value| match value {
                    Value::Float(fps) => Some(*fps),
                    _ => None,
                })
                .unwrap_or(1.0);
            let declaration = emitter.output_declaration(node, 0)?;
            stage.add_line(
                &format!(
                    "{declaration} = {} / {}",
                    hw::FRAME,
                    crate::syntax::format_float(fps)
                ),
                true,
            );
        }
        (StreamKind::Position | StreamKind::Normal | StreamKind::TexCoord | StreamKind::Color, hw::PIXEL_STAGE) => {
            let varying = match stream {
                StreamKind::Position => hw::POSITION_WORLD.to_string(),
                StreamKind::Normal => hw::NORMAL_WORLD.to_string(),
                StreamKind::TexCoord => format!("texcoord_{}", stream_index(node)),
                StreamKind::Color => format!("color_{}", stream_index(node)),
                StreamKind::Time => unreachable!(),
            };
            let out = node.output(0).ok_or(ShaderGenError::InvalidNodeSignature {
                node: node.name.clone(),
                kind: "stream",
            })?;
            // Narrow the stream value to the node's declared output type.
            let suffix = if stream == StreamKind::Color {
                if out.ty == types::FLOAT {
                    ".r"
                } else if out.ty.is_float2() {
                    ".rg"
                } else if out.ty.is_float3() {
                    ".rgb"
                } else {
                    ""
                }
            } else {
                ""
            };
            let prefix = block_prefix(stage)?;
            let declaration = emitter.output_declaration(node, 0)?;
            stage.add_line(&format!("{declaration} = {prefix}{varying}{suffix}"), true);
        }
        _ => {}
    }
    Ok(())
}

fn block_prefix(stage: &ShaderStage) -> Result<String, ShaderGenError> {
    let instance = stage.input_block(hw::VERTEX_DATA)?.instance().to_string();
    if instance.is_empty() {
        Ok(String::new())
    } else {
        Ok(format!("{instance}."))
    }
}

fn propagate_varying(
    stage: &mut ShaderStage,
    varying: &str,
    assignment: &str,
) -> Result<(), ShaderGenError> {
    if stage.is_calculated(varying) {
        return Ok(());
    }
    let instance = stage.output_block(hw::VERTEX_DATA)?.instance().to_string();
    let prefix = if instance.is_empty() {
        String::new()
    } else {
        format!("{instance}.")
    };
    stage.add_line(&format!("{prefix}{varying} = {assignment}"), true);
    stage.set_calculated(varying);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::{GlslSyntax, OslSyntax, Syntax};
    use glint_graph::{stdlib, ShaderGraph};
    use std::sync::Arc;

    fn emit_single_node(node: ShaderNode, syntax: &dyn Syntax, language: &str) -> String {
        let mut graph = ShaderGraph::new("test");
        graph.add_node(node).unwrap();
        let mut ctx = GenContext::default();
        let emitter = Emitter::bind(&graph, syntax, language, "", &mut ctx).unwrap();
        let mut stage = ShaderStage::new(hw::PIXEL_STAGE);
        emitter.emit_function_calls(&ctx, &mut stage).unwrap();
        stage.code().to_string()
    }

    #[test]
    fn test_combine_two_floats_into_vector2() {
        let mut node = ShaderNode::new(
            "combine1",
            Arc::new(stdlib::combine2(types::FLOAT, types::VECTOR2)),
        );
        node.inputs[0].value = Some(1.0.into());
        node.inputs[1].value = Some(2.0.into());

        let code = emit_single_node(node.clone(), &OslSyntax::new(), "osl");
        assert!(code.contains("vector2 combine1_out = vector2(1.0, 2.0);"));

        let code = emit_single_node(node, &GlslSyntax::new(), "glsl");
        assert!(code.contains("vec2 combine1_out = vec2(1.0, 2.0);"));
    }

    #[test]
    fn test_combine_two_vector2_into_vector4() {
        let mut node = ShaderNode::new(
            "combine1",
            Arc::new(stdlib::combine2(types::VECTOR2, types::VECTOR4)),
        );
        node.inputs[0].value = Some([1.0, 2.0].into());
        node.inputs[1].value = Some([3.0, 4.0].into());

        let code = emit_single_node(node, &GlslSyntax::new(), "glsl");
        // Components are read positionally and re-packed.
        assert!(code.contains("vec2 combine1_in1 = vec2(1.0, 2.0);"));
        assert!(code.contains("vec2 combine1_in2 = vec2(3.0, 4.0);"));
        assert!(code.contains(
            "vec4 combine1_out = vec4(combine1_in1.x, combine1_in1.y, combine1_in2.x, combine1_in2.y);"
        ));
    }

    #[test]
    fn test_convert_widens_scalar() {
        let mut node = ShaderNode::new(
            "cvt1",
            Arc::new(stdlib::convert(types::FLOAT, types::COLOR3)),
        );
        node.inputs[0].value = Some(0.5.into());

        let code = emit_single_node(node, &GlslSyntax::new(), "glsl");
        assert!(code.contains("vec3 cvt1_out = vec3(0.5, 0.5, 0.5);"));
    }

    #[test]
    fn test_convert_narrows_color4() {
        let mut node = ShaderNode::new(
            "cvt1",
            Arc::new(stdlib::convert(types::COLOR4, types::COLOR3)),
        );
        node.inputs[0].value = Some([1.0, 0.5, 0.0, 1.0].into());

        let code = emit_single_node(node, &GlslSyntax::new(), "glsl");
        assert!(code.contains("vec4 cvt1_in = vec4(1.0, 0.5, 0.0, 1.0);"));
        assert!(code.contains("vec3 cvt1_out = vec3(cvt1_in.r, cvt1_in.g, cvt1_in.b);"));
    }

    #[test]
    fn test_swizzle_reorders_channels() {
        let mut node = ShaderNode::new(
            "swz1",
            Arc::new(stdlib::swizzle(types::COLOR3, types::COLOR3)),
        );
        node.inputs[1].value = Some("bgr".into());

        let code = emit_single_node(node, &GlslSyntax::new(), "glsl");
        assert!(code.contains("vec3 swz1_in = vec3(0.0);"));
        assert!(code.contains("vec3 swz1_out = vec3(swz1_in.b, swz1_in.g, swz1_in.r);"));
    }

    #[test]
    fn test_compare_emits_scoped_branches() {
        let mut node = ShaderNode::new("cmp1", Arc::new(stdlib::compare(types::FLOAT)));
        node.inputs[0].value = Some(1.0.into());
        node.inputs[2].value = Some(2.0.into());
        node.inputs[3].value = Some(3.0.into());

        let code = emit_single_node(node, &GlslSyntax::new(), "glsl");
        assert!(code.contains("float cmp1_out = 0.0;"));
        assert!(code.contains("if (1.0 <= 0.5)"));
        assert!(code.contains("cmp1_out = 2.0;"));
        assert!(code.contains("else"));
        assert!(code.contains("cmp1_out = 3.0;"));
    }
}
