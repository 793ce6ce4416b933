// SPDX-License-Identifier: MIT OR Apache-2.0
//! Shader code generation for Glint.
//!
//! This crate turns `glint_graph` shader graphs into target-language
//! source text:
//! - A per-language syntax layer (GLSL family and OSL)
//! - Scoped code buffers with variable blocks, include and
//!   function-definition deduplication
//! - A closed set of node implementation strategies
//! - Generators orchestrating multi-stage (vertex + pixel) or
//!   single-stage code production
//!
//! Generation is single-threaded and synchronous per request; each
//! request owns its generator, context and stages.

pub mod context;
pub mod error;
pub mod generator;
pub mod implementation;
pub mod library;
pub mod shader;
pub mod stage;
pub mod syntax;

pub use context::{GenContext, GenOptions, SpecularEnvironmentMethod};
pub use error::ShaderGenError;
pub use generator::{
    hw, Emitter, GlslFragmentGenerator, GlslGenerator, HwLightBindings, OslGenerator,
    ShaderGenerator,
};
pub use implementation::Implementation;
pub use shader::Shader;
pub use stage::{Brackets, ShaderStage, ShaderVariable, VariableBlock, VariableInfo};
pub use syntax::{GlslFragmentSyntax, GlslSyntax, OslSyntax, Syntax};
