// SPDX-License-Identifier: MIT OR Apache-2.0
//! Shader graph data model for Glint.
//!
//! This crate provides the language-independent half of the shader
//! generation engine:
//! - A process-wide registry of value types with structural metadata
//! - Node definitions carrying per-(language, target) implementation entries
//! - Typed node instances wired into acyclic graphs
//! - Classification flags driving generator-level branching
//!
//! Code emission lives in `glint_codegen`, which consumes these graphs.

pub mod graph;
pub mod node;
pub mod port;
pub mod stdlib;
pub mod types;
pub mod value;

pub use graph::{CycleError, GraphError, GraphInput, GraphOutput, ShaderGraph};
pub use node::{
    Classification, ImplDef, ImplKind, NodeDef, NodeDefRegistry, NodeId, ShaderNode, StreamKind,
};
pub use port::{InputSocket, OutputSocket, PortDef, SocketSource};
pub use types::{BaseType, Semantic, Type, TypeError};
pub use value::Value;
