// SPDX-License-Identifier: MIT OR Apache-2.0
//! Standard node definitions with procedural and stream implementations.
//!
//! These cover the structural operations every target supports without
//! source files: combining, converting, swizzling and comparing values,
//! plus the hardware geometric streams. Source-code based definitions
//! (images, BSDFs, light shaders) are supplied by the caller.

use crate::node::{ImplDef, ImplKind, NodeDef, NodeDefRegistry, StreamKind};
use crate::port::PortDef;
use crate::types::{self, Type};

/// Combine two values into an aggregate (two scalars, a three-component
/// value plus a scalar, or two two-component values).
pub fn combine2(in_ty: Type, out_ty: Type) -> NodeDef {
    NodeDef::new(format!("ND_combine2_{}", out_ty.name()), "combine2", out_ty)
        .with_input(PortDef::new("in1", in_ty))
        .with_input(PortDef::new("in2", combine2_second_type(in_ty)))
        .with_implementation(ImplDef::new("", ImplKind::Combine))
}

fn combine2_second_type(in_ty: Type) -> Type {
    if in_ty.is_float3() {
        types::FLOAT
    } else {
        in_ty
    }
}

/// Combine three scalars into a three-component aggregate.
pub fn combine3(out_ty: Type) -> NodeDef {
    NodeDef::new(format!("ND_combine3_{}", out_ty.name()), "combine3", out_ty)
        .with_input(PortDef::new("in1", types::FLOAT))
        .with_input(PortDef::new("in2", types::FLOAT))
        .with_input(PortDef::new("in3", types::FLOAT))
        .with_implementation(ImplDef::new("", ImplKind::Combine))
}

/// Combine four scalars into a four-component aggregate.
pub fn combine4(out_ty: Type) -> NodeDef {
    NodeDef::new(format!("ND_combine4_{}", out_ty.name()), "combine4", out_ty)
        .with_input(PortDef::new("in1", types::FLOAT))
        .with_input(PortDef::new("in2", types::FLOAT))
        .with_input(PortDef::new("in3", types::FLOAT))
        .with_input(PortDef::new("in4", types::FLOAT))
        .with_implementation(ImplDef::new("", ImplKind::Combine))
}

/// Structural conversion between two types.
pub fn convert(from: Type, to: Type) -> NodeDef {
    crate::graph::convert_def(from, to)
}

/// Re-order the channels of a value through a channel mask string.
pub fn swizzle(from: Type, to: Type) -> NodeDef {
    NodeDef::new(
        format!("ND_swizzle_{}_{}", from.name(), to.name()),
        "swizzle",
        to,
    )
    .with_input(PortDef::new("in", from))
    .with_input(PortDef::new("channels", types::STRING))
    .with_implementation(ImplDef::new("", ImplKind::Swizzle))
}

/// Select between two values on a cutoff comparison.
pub fn compare(ty: Type) -> NodeDef {
    NodeDef::new(format!("ND_compare_{}", ty.name()), "compare", ty)
        .with_input(PortDef::new("intest", types::FLOAT))
        .with_input(PortDef::new("cutoff", types::FLOAT).with_value(0.5))
        .with_input(PortDef::new("in1", ty))
        .with_input(PortDef::new("in2", ty))
        .with_implementation(ImplDef::new("", ImplKind::Compare))
}

/// World-space position stream.
pub fn geompos() -> NodeDef {
    NodeDef::new("ND_position_vector3", "position", types::VECTOR3)
        .with_implementation(ImplDef::new("glsl", ImplKind::Stream(StreamKind::Position)))
}

/// World-space normal stream.
pub fn geomnormal() -> NodeDef {
    NodeDef::new("ND_normal_vector3", "normal", types::VECTOR3)
        .with_implementation(ImplDef::new("glsl", ImplKind::Stream(StreamKind::Normal)))
}

/// Texture coordinate stream; the `index` input selects the set.
pub fn texcoord() -> NodeDef {
    NodeDef::new("ND_texcoord_vector2", "texcoord", types::VECTOR2)
        .with_input(PortDef::new("index", types::INTEGER).with_value(0))
        .with_implementation(ImplDef::new("glsl", ImplKind::Stream(StreamKind::TexCoord)))
}

/// Vertex color stream; the `index` input selects the set.
pub fn geomcolor(ty: Type) -> NodeDef {
    NodeDef::new(format!("ND_geomcolor_{}", ty.name()), "geomcolor", ty)
        .with_input(PortDef::new("index", types::INTEGER).with_value(0))
        .with_implementation(ImplDef::new("glsl", ImplKind::Stream(StreamKind::Color)))
}

/// Frame time, scaled by the `fps` input.
pub fn time() -> NodeDef {
    NodeDef::new("ND_time_float", "time", types::FLOAT)
        .with_input(PortDef::new("fps", types::FLOAT).with_value(1.0))
        .with_implementation(ImplDef::new("glsl", ImplKind::Stream(StreamKind::Time)))
}

/// Register the standard definitions into a registry.
pub fn register_std_defs(registry: &mut NodeDefRegistry) {
    registry.register(combine2(types::FLOAT, types::VECTOR2));
    registry.register(combine2(types::FLOAT, types::COLOR2));
    registry.register(combine2(types::VECTOR3, types::VECTOR4));
    registry.register(combine2(types::COLOR3, types::COLOR4));
    registry.register(combine2(types::VECTOR2, types::VECTOR4));
    registry.register(combine3(types::VECTOR3));
    registry.register(combine3(types::COLOR3));
    registry.register(combine4(types::VECTOR4));
    registry.register(combine4(types::COLOR4));
    registry.register(swizzle(types::COLOR3, types::COLOR3));
    registry.register(swizzle(types::COLOR4, types::COLOR3));
    registry.register(swizzle(types::VECTOR3, types::VECTOR3));
    registry.register(compare(types::FLOAT));
    registry.register(compare(types::COLOR3));
    registry.register(geompos());
    registry.register(geomnormal());
    registry.register(texcoord());
    registry.register(geomcolor(types::COLOR4));
    registry.register(time());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_std_defs() {
        let mut registry = NodeDefRegistry::new();
        register_std_defs(&mut registry);

        let combine = registry.get("ND_combine2_vector2").unwrap();
        assert_eq!(combine.ty, types::VECTOR2);
        assert_eq!(combine.inputs.len(), 2);
        assert!(combine.implementation("glsl", "fragment").is_some());
        assert!(combine.implementation("osl", "").is_some());

        let normal = registry.get("ND_normal_vector3").unwrap();
        assert!(normal.implementation("glsl", "").is_some());
        assert!(normal.implementation("osl", "").is_none());
    }

    #[test]
    fn test_compare_signature() {
        let def = compare(types::COLOR3);
        let names: Vec<&str> = def.inputs.iter().map(|input| input.name.as_str()).collect();
        assert_eq!(names, vec!["intest", "cutoff", "in1", "in2"]);
    }
}
