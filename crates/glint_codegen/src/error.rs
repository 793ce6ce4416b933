// SPDX-License-Identifier: MIT OR Apache-2.0
//! Error types for shader generation.

use glint_graph::{GraphError, TypeError};

/// Fatal error raised during shader generation.
///
/// Any of these aborts generation for the requested element; no partial
/// output is returned. Soft-skip conditions (a property whose type has no
/// target-language mapping, an empty node name) are handled locally and
/// never surface here.
#[derive(Debug, thiserror::Error)]
pub enum ShaderGenError {
    /// No implementation entry matches the requested pair.
    #[error("Could not find a matching implementation for node '{node}' matching language '{language}' and target '{target}'")]
    NoMatchingImplementation {
        /// Node (or nodedef) name.
        node: String,
        /// Requested language.
        language: String,
        /// Requested target.
        target: String,
    },

    /// `end_scope` called with no scope active.
    #[error("End scope called with no scope active in stage '{0}', please check your begin_scope/end_scope calls")]
    ScopeUnderflow(String),

    /// Variable lookup in a block failed.
    #[error("No variable named '{name}' exists for block '{block}'")]
    UnknownVariable {
        /// Block name.
        block: String,
        /// Variable name.
        name: String,
    },

    /// Variable block lookup in a stage failed.
    #[error("No {kind} block named '{name}' exists for shader stage '{stage}'")]
    UnknownBlock {
        /// Block kind (uniform/input/output).
        kind: &'static str,
        /// Block name.
        name: String,
        /// Stage name.
        stage: String,
    },

    /// Stage lookup in a shader failed.
    #[error("No stage named '{0}' exists for the shader")]
    UnknownStage(String),

    /// An include directive could not be resolved.
    #[error("Could not find include file: '{0}'")]
    MissingInclude(String),

    /// A light type id was bound twice.
    #[error("Error binding light shader. Light type id '{0}' has already been bound")]
    DuplicateLightBinding(usize),

    /// A nodedef bound as a light shader is not of lightshader type.
    #[error("Error binding light shader. Given nodedef '{0}' is not of lightshader type")]
    TypeMismatch(String),

    /// A procedural implementation was given sockets it cannot emit
    /// code for.
    #[error("Node '{node}' is not a valid {kind} node")]
    InvalidNodeSignature {
        /// Node name.
        node: String,
        /// Strategy name.
        kind: &'static str,
    },

    /// A type required by emission has no mapping in the active syntax.
    #[error("Type '{ty}' has no syntax mapping for language '{language}'")]
    UnsupportedType {
        /// Type name.
        ty: String,
        /// Active language.
        language: String,
    },

    /// Error from the type registry.
    #[error(transparent)]
    Type(#[from] TypeError),

    /// Error from graph construction or traversal.
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// The graph contains a cycle.
    #[error(transparent)]
    Cycle(#[from] glint_graph::CycleError),
}
