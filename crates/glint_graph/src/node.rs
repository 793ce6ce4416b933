// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node definitions and node instances.

use crate::port::{InputSocket, OutputSocket, PortDef};
use crate::types::{self, Type};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Unique identifier for a node instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(pub Uuid);

impl NodeId {
    /// Create a new random node ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

bitflags::bitflags! {
    /// Classification flags computed once from a node's definition.
    ///
    /// Generators branch on these flags instead of re-inspecting the
    /// definition; a graph's classification is the union over its nodes.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Classification: u32 {
        /// Texture sampling node.
        const TEXTURE = 1 << 0;
        /// Closure-producing node.
        const CLOSURE = 1 << 1;
        /// Complete shader node.
        const SHADER = 1 << 2;
        /// Surface shader node.
        const SURFACE = 1 << 3;
        /// BSDF closure node.
        const BSDF = 1 << 4;
        /// EDF closure node.
        const EDF = 1 << 5;
        /// VDF closure node.
        const VDF = 1 << 6;
        /// Light shader node.
        const LIGHT = 1 << 7;
        /// 2D convolution node, requires the sampling support library.
        const CONVOLUTION2D = 1 << 8;
        /// Hardware geometric stream node.
        const GEOMETRIC = 1 << 9;
    }
}

/// Hardware stream a stream-binding implementation reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StreamKind {
    /// World-space position.
    Position,
    /// World-space normal.
    Normal,
    /// Texture coordinate set, selected by the node's `index` input.
    TexCoord,
    /// Vertex color set, selected by the node's `index` input.
    Color,
    /// Frame time, scaled by the node's `fps` input.
    Time,
}

/// Code-emission strategy declared by an implementation entry.
///
/// This is the closed set of strategies the generator dispatches over;
/// each variant carries only the data it needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ImplKind {
    /// Include a pre-written source function verbatim and call it.
    /// Files with the `.inline` extension hold a single expression with
    /// `{{input}}` placeholders instead of a function body.
    SourceCode {
        /// Source file resolved through the generation context.
        file: String,
        /// Function to call; ignored for inline expressions.
        function: String,
    },
    /// Synthesize aggregate construction from the concrete socket types.
    Combine,
    /// Structural conversion between arities/semantics.
    Convert,
    /// Channel re-ordering via the node's `channels` input.
    Swizzle,
    /// Two-branch select on a cutoff comparison.
    Compare,
    /// Hardware stream binding.
    Stream(StreamKind),
    /// Light shader source, input sockets addressed as members of the
    /// per-light data structure.
    LightShader {
        /// Source file resolved through the generation context.
        file: String,
        /// Function to call.
        function: String,
    },
}

/// An implementation entry in a node definition, tagged by the
/// (language, target) pair it serves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImplDef {
    /// Target shading language; an empty string matches any language.
    pub language: String,
    /// Generator target; an empty string matches any target.
    pub target: String,
    /// The emission strategy.
    pub kind: ImplKind,
}

impl ImplDef {
    /// Create an entry for one language, matching any target.
    pub fn new(language: impl Into<String>, kind: ImplKind) -> Self {
        Self {
            language: language.into(),
            target: String::new(),
            kind,
        }
    }

    /// Restrict the entry to a specific target.
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = target.into();
        self
    }

    /// Whether this entry serves the given (language, target) pair.
    pub fn matches(&self, language: &str, target: &str) -> bool {
        (self.language.is_empty() || self.language == language)
            && (self.target.is_empty() || self.target == target)
    }
}

/// Node type definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeDef {
    /// Unique definition name.
    pub name: String,
    /// Operation the definition implements (e.g. `add`, `image`).
    pub node: String,
    /// Declared output type of the operation.
    pub ty: Type,
    /// Ordered input port definitions. Order is positional: it must match
    /// the implementation's signature.
    pub inputs: Vec<PortDef>,
    /// Ordered output port definitions.
    pub outputs: Vec<PortDef>,
    /// Candidate implementations tagged by (language, target).
    pub implementations: Vec<ImplDef>,
}

impl NodeDef {
    /// Create a definition with a single output named `out`.
    pub fn new(name: impl Into<String>, node: impl Into<String>, ty: Type) -> Self {
        Self {
            name: name.into(),
            node: node.into(),
            ty,
            inputs: Vec::new(),
            outputs: vec![PortDef::new("out", ty)],
            implementations: Vec::new(),
        }
    }

    /// Append an input port definition.
    pub fn with_input(mut self, input: PortDef) -> Self {
        self.inputs.push(input);
        self
    }

    /// Replace the output port definitions.
    pub fn with_outputs(mut self, outputs: Vec<PortDef>) -> Self {
        self.outputs = outputs;
        self
    }

    /// Append an implementation entry.
    pub fn with_implementation(mut self, implementation: ImplDef) -> Self {
        self.implementations.push(implementation);
        self
    }

    /// Find the implementation entry matching a (language, target) pair.
    /// An exact match is preferred over a wildcard one; ties resolve to
    /// declaration order.
    pub fn implementation(&self, language: &str, target: &str) -> Option<&ImplDef> {
        let mut best: Option<(&ImplDef, u8)> = None;
        for entry in &self.implementations {
            if !entry.matches(language, target) {
                continue;
            }
            let score = u8::from(!entry.language.is_empty()) * 2 + u8::from(!entry.target.is_empty());
            if best.map_or(true, |(_, prev)| score > prev) {
                best = Some((entry, score));
            }
        }
        best.map(|(entry, _)| entry)
    }

    /// Compute the classification flags for nodes using this definition.
    pub fn classification(&self) -> Classification {
        let mut flags = Classification::empty();

        if self.ty == types::SURFACE_SHADER {
            flags |= Classification::SHADER | Classification::SURFACE;
        } else if self.ty == types::LIGHT_SHADER {
            flags |= Classification::SHADER | Classification::LIGHT;
        } else if self.ty == types::VOLUME_SHADER || self.ty == types::DISPLACEMENT_SHADER {
            flags |= Classification::SHADER;
        } else if self.ty == types::BSDF {
            flags |= Classification::CLOSURE | Classification::BSDF;
        } else if self.ty == types::EDF {
            flags |= Classification::CLOSURE | Classification::EDF;
        } else if self.ty == types::VDF {
            flags |= Classification::CLOSURE | Classification::VDF;
        }

        match self.node.as_str() {
            "image" | "tiledimage" | "triplanarprojection" => flags |= Classification::TEXTURE,
            "blur" | "heighttonormal" | "convolve" => {
                flags |= Classification::TEXTURE | Classification::CONVOLUTION2D;
            }
            _ => {}
        }

        if self
            .implementations
            .iter()
            .any(|entry| matches!(entry.kind, ImplKind::Stream(_)))
        {
            flags |= Classification::GEOMETRIC;
        }

        flags
    }
}

/// Registry of available node definitions.
#[derive(Debug, Default)]
pub struct NodeDefRegistry {
    defs: IndexMap<String, Arc<NodeDef>>,
}

impl NodeDefRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            defs: IndexMap::new(),
        }
    }

    /// Register a node definition, replacing any previous definition
    /// with the same name.
    pub fn register(&mut self, def: NodeDef) -> Arc<NodeDef> {
        let def = Arc::new(def);
        self.defs.insert(def.name.clone(), def.clone());
        def
    }

    /// Get a definition by name.
    pub fn get(&self, name: &str) -> Option<&Arc<NodeDef>> {
        self.defs.get(name)
    }

    /// All registered definitions, in registration order.
    pub fn defs(&self) -> impl Iterator<Item = &Arc<NodeDef>> {
        self.defs.values()
    }
}

/// A node instance in a shader graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShaderNode {
    /// Unique instance ID.
    pub id: NodeId,
    /// Instance name, unique within the owning graph. Generated variable
    /// names derive from it.
    pub name: String,
    /// The originating definition.
    pub def: Arc<NodeDef>,
    /// Ordered input sockets.
    pub inputs: Vec<InputSocket>,
    /// Ordered output sockets.
    pub outputs: Vec<OutputSocket>,
    /// Classification flags, computed once at construction.
    #[serde(skip, default = "Classification::empty")]
    pub classification: Classification,
}

impl ShaderNode {
    /// Create a new instance of a definition.
    pub fn new(name: impl Into<String>, def: Arc<NodeDef>) -> Self {
        let classification = def.classification();
        let inputs = def.inputs.iter().map(InputSocket::new).collect();
        let outputs = def.outputs.iter().map(OutputSocket::new).collect();
        Self {
            id: NodeId::new(),
            name: name.into(),
            def,
            inputs,
            outputs,
            classification,
        }
    }

    /// Get an input socket by index.
    pub fn input(&self, index: usize) -> Option<&InputSocket> {
        self.inputs.get(index)
    }

    /// Get an input socket by name.
    pub fn input_by_name(&self, name: &str) -> Option<&InputSocket> {
        self.inputs.iter().find(|socket| socket.name == name)
    }

    /// Get an output socket by index.
    pub fn output(&self, index: usize) -> Option<&OutputSocket> {
        self.outputs.get(index)
    }

    /// Check a classification flag.
    pub fn has_classification(&self, flags: Classification) -> bool {
        self.classification.intersects(flags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types;

    fn add_def() -> NodeDef {
        NodeDef::new("ND_add_color3", "add", types::COLOR3)
            .with_input(PortDef::new("in1", types::COLOR3))
            .with_input(PortDef::new("in2", types::COLOR3))
            .with_implementation(ImplDef::new(
                "glsl",
                ImplKind::SourceCode {
                    file: "mx_add.glsl".into(),
                    function: "mx_add".into(),
                },
            ))
    }

    #[test]
    fn test_implementation_matching() {
        let def = add_def().with_implementation(
            ImplDef::new(
                "glsl",
                ImplKind::SourceCode {
                    file: "mx_add_frag.glsl".into(),
                    function: "mx_add_frag".into(),
                },
            )
            .with_target("fragment"),
        );

        // Empty target in the entry matches any requested target.
        let any = def.implementation("glsl", "somewhere").unwrap();
        assert_eq!(any.target, "");

        // An exact target match is preferred over the wildcard.
        let frag = def.implementation("glsl", "fragment").unwrap();
        assert_eq!(frag.target, "fragment");

        assert!(def.implementation("osl", "").is_none());
    }

    #[test]
    fn test_classification() {
        let surface = NodeDef::new("ND_surface", "standard_surface", types::SURFACE_SHADER);
        assert!(surface
            .classification()
            .contains(Classification::SHADER | Classification::SURFACE));

        let bsdf = NodeDef::new("ND_diffuse_bsdf", "diffuse_bsdf", types::BSDF);
        assert!(bsdf
            .classification()
            .contains(Classification::CLOSURE | Classification::BSDF));

        let blur = NodeDef::new("ND_blur_color3", "blur", types::COLOR3);
        assert!(blur.classification().contains(Classification::CONVOLUTION2D));

        let add = add_def();
        assert_eq!(add.classification(), Classification::empty());
    }

    #[test]
    fn test_nodedef_serde_round_trip() {
        let def = add_def();
        let text = ron::to_string(&def).unwrap();
        let back: NodeDef = ron::from_str(&text).unwrap();
        assert_eq!(back.name, def.name);
        assert_eq!(back.ty, def.ty);
        assert_eq!(back.inputs.len(), 2);
        assert_eq!(back.implementations, def.implementations);
    }

    #[test]
    fn test_node_instance_sockets() {
        let node = ShaderNode::new("add1", Arc::new(add_def()));
        assert_eq!(node.inputs.len(), 2);
        assert_eq!(node.outputs.len(), 1);
        assert_eq!(node.output(0).unwrap().ty, types::COLOR3);
        assert!(node.input_by_name("in2").is_some());
        assert!(node.input(0).unwrap().connection.is_none());
    }
}
