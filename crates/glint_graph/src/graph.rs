// SPDX-License-Identifier: MIT OR Apache-2.0
//! Shader graph structure containing nodes and their wiring.

use crate::node::{Classification, ImplDef, ImplKind, NodeDef, NodeId, ShaderNode};
use crate::port::{is_convertible, PortDef, SocketSource};
use crate::types::Type;
use crate::value::Value;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

/// An external input socket of a graph. Becomes part of the generated
/// shader's public interface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphInput {
    /// Socket name.
    pub name: String,
    /// Data type.
    pub ty: Type,
    /// Default value published with the interface.
    pub value: Option<Value>,
}

/// An external output socket of a graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphOutput {
    /// Socket name.
    pub name: String,
    /// Data type.
    pub ty: Type,
    /// Optional channel mask (e.g. `rgb`, `xxx`) applied when the
    /// upstream value is wider than the socket.
    pub channels: String,
    /// Upstream node output feeding this socket.
    pub connection: Option<(NodeId, usize)>,
    /// Fallback value when unconnected.
    pub value: Option<Value>,
}

/// A directed acyclic graph of shader nodes.
///
/// Node names are unique within the graph. Acyclicity is enforced at
/// construction time: `connect` rejects edges that would close a cycle,
/// and [`ShaderGraph::topological_order`] re-checks defensively for
/// graphs assembled through other means.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShaderGraph {
    /// Graph name; the generated entry point derives from it.
    pub name: String,
    nodes: IndexMap<NodeId, ShaderNode>,
    inputs: Vec<GraphInput>,
    outputs: Vec<GraphOutput>,
}

impl ShaderGraph {
    /// Create a new empty graph.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nodes: IndexMap::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }

    /// Add a node to the graph. Fails if a node with the same name
    /// already exists.
    pub fn add_node(&mut self, node: ShaderNode) -> Result<NodeId, GraphError> {
        if node.name.is_empty() || self.node_by_name(&node.name).is_some() {
            return Err(GraphError::DuplicateNodeName(node.name));
        }
        let id = node.id;
        self.nodes.insert(id, node);
        Ok(id)
    }

    /// Get a node by ID.
    pub fn node(&self, node_id: NodeId) -> Option<&ShaderNode> {
        self.nodes.get(&node_id)
    }

    /// Get a node by name.
    pub fn node_by_name(&self, name: &str) -> Option<&ShaderNode> {
        self.nodes.values().find(|node| node.name == name)
    }

    /// All nodes, in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &ShaderNode> {
        self.nodes.values()
    }

    /// All node IDs, in insertion order.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys().copied()
    }

    /// The number of nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Add an external input socket, returning its index.
    pub fn add_input(
        &mut self,
        name: impl Into<String>,
        ty: Type,
        value: Option<Value>,
    ) -> usize {
        self.inputs.push(GraphInput {
            name: name.into(),
            ty,
            value,
        });
        self.inputs.len() - 1
    }

    /// Add an external output socket, returning its index.
    pub fn add_output(&mut self, name: impl Into<String>, ty: Type) -> usize {
        self.outputs.push(GraphOutput {
            name: name.into(),
            ty,
            channels: String::new(),
            connection: None,
            value: None,
        });
        self.outputs.len() - 1
    }

    /// The external input sockets.
    pub fn inputs(&self) -> &[GraphInput] {
        &self.inputs
    }

    /// The external output sockets.
    pub fn outputs(&self) -> &[GraphOutput] {
        &self.outputs
    }

    /// The first external output socket, if any. Most material graphs
    /// have exactly one.
    pub fn output_socket(&self) -> Option<&GraphOutput> {
        self.outputs.first()
    }

    /// Set the channel mask on an external output socket.
    pub fn set_output_channels(
        &mut self,
        output: usize,
        channels: impl Into<String>,
    ) -> Result<(), GraphError> {
        let socket = self
            .outputs
            .get_mut(output)
            .ok_or(GraphError::OutputNotFound(output))?;
        socket.channels = channels.into();
        Ok(())
    }

    /// Connect a node output to a node input.
    ///
    /// Endpoint types must match exactly, or be bridged by an implicit
    /// conversion: in that case an explicit `convert` node is inserted
    /// between the two sockets.
    pub fn connect(
        &mut self,
        from: (NodeId, usize),
        to: (NodeId, usize),
    ) -> Result<(), GraphError> {
        let (from_node, from_output) = from;
        let (to_node, to_input) = to;

        if from_node == to_node {
            return Err(GraphError::SelfLoop);
        }

        let source = self
            .nodes
            .get(&from_node)
            .ok_or(GraphError::NodeNotFound(from_node))?;
        let from_ty = source
            .output(from_output)
            .ok_or_else(|| GraphError::PortNotFound(source.name.clone(), from_output))?
            .ty;

        let target = self
            .nodes
            .get(&to_node)
            .ok_or(GraphError::NodeNotFound(to_node))?;
        let to_socket = target
            .input(to_input)
            .ok_or_else(|| GraphError::PortNotFound(target.name.clone(), to_input))?;
        if to_socket.connection.is_some() {
            return Err(GraphError::InputAlreadyConnected(
                target.name.clone(),
                to_socket.name.clone(),
            ));
        }
        let to_ty = to_socket.ty;

        // Adding from -> to closes a cycle iff `from` already reads `to`.
        if self.depends_on(from_node, to_node) {
            return Err(GraphError::Cycle);
        }

        let source = if from_ty == to_ty {
            SocketSource::Node {
                node: from_node,
                output: from_output,
            }
        } else if is_convertible(from_ty, to_ty) {
            let bridge = self.insert_convert_node(from_ty, to_ty, to_node, to_input)?;
            self.set_connection(
                bridge,
                0,
                SocketSource::Node {
                    node: from_node,
                    output: from_output,
                },
            );
            SocketSource::Node {
                node: bridge,
                output: 0,
            }
        } else {
            return Err(GraphError::IncompatibleTypes {
                from: from_ty.name().to_string(),
                to: to_ty.name().to_string(),
            });
        };

        self.set_connection(to_node, to_input, source);
        Ok(())
    }

    /// Connect an external input socket to a node input, bridging with a
    /// conversion node if the types differ.
    pub fn connect_input(
        &mut self,
        input: usize,
        to: (NodeId, usize),
    ) -> Result<(), GraphError> {
        let (to_node, to_input) = to;
        let from_ty = self
            .inputs
            .get(input)
            .ok_or(GraphError::InputNotFound(input))?
            .ty;

        let target = self
            .nodes
            .get(&to_node)
            .ok_or(GraphError::NodeNotFound(to_node))?;
        let to_socket = target
            .input(to_input)
            .ok_or_else(|| GraphError::PortNotFound(target.name.clone(), to_input))?;
        if to_socket.connection.is_some() {
            return Err(GraphError::InputAlreadyConnected(
                target.name.clone(),
                to_socket.name.clone(),
            ));
        }
        let to_ty = to_socket.ty;

        let source = if from_ty == to_ty {
            SocketSource::GraphInput { index: input }
        } else if is_convertible(from_ty, to_ty) {
            let bridge = self.insert_convert_node(from_ty, to_ty, to_node, to_input)?;
            self.set_connection(bridge, 0, SocketSource::GraphInput { index: input });
            SocketSource::Node {
                node: bridge,
                output: 0,
            }
        } else {
            return Err(GraphError::IncompatibleTypes {
                from: from_ty.name().to_string(),
                to: to_ty.name().to_string(),
            });
        };

        self.set_connection(to_node, to_input, source);
        Ok(())
    }

    /// Connect a node output to an external output socket. Arity
    /// differences are left to the generator's final output conversion.
    pub fn connect_output(
        &mut self,
        output: usize,
        from: (NodeId, usize),
    ) -> Result<(), GraphError> {
        let (from_node, from_output) = from;
        let source = self
            .nodes
            .get(&from_node)
            .ok_or(GraphError::NodeNotFound(from_node))?;
        let from_ty = source
            .output(from_output)
            .ok_or_else(|| GraphError::PortNotFound(source.name.clone(), from_output))?
            .ty;

        let socket = self
            .outputs
            .get_mut(output)
            .ok_or(GraphError::OutputNotFound(output))?;
        if from_ty != socket.ty && !is_convertible(from_ty, socket.ty) && socket.channels.is_empty()
        {
            return Err(GraphError::IncompatibleTypes {
                from: from_ty.name().to_string(),
                to: socket.ty.name().to_string(),
            });
        }
        socket.connection = Some((from_node, from_output));
        Ok(())
    }

    /// Whether `node` transitively reads the output of `dependency`.
    pub fn depends_on(&self, node: NodeId, dependency: NodeId) -> bool {
        if node == dependency {
            return true;
        }
        let Some(current) = self.nodes.get(&node) else {
            return false;
        };
        current.inputs.iter().any(|socket| match socket.connection {
            Some(SocketSource::Node { node: upstream, .. }) => {
                self.depends_on(upstream, dependency)
            }
            _ => false,
        })
    }

    /// Nodes in dependency order: every node appears after all nodes it
    /// reads from. Performs an explicit cycle check so that graphs not
    /// assembled through [`ShaderGraph::connect`] still fail cleanly.
    pub fn topological_order(&self) -> Result<Vec<NodeId>, CycleError> {
        let mut visited = HashSet::new();
        let mut temp_mark = HashSet::new();
        let mut order = Vec::new();

        for node_id in self.nodes.keys() {
            if !visited.contains(node_id) {
                self.visit(*node_id, &mut visited, &mut temp_mark, &mut order)?;
            }
        }

        Ok(order)
    }

    fn visit(
        &self,
        node_id: NodeId,
        visited: &mut HashSet<NodeId>,
        temp_mark: &mut HashSet<NodeId>,
        order: &mut Vec<NodeId>,
    ) -> Result<(), CycleError> {
        if temp_mark.contains(&node_id) {
            return Err(CycleError);
        }
        if visited.contains(&node_id) {
            return Ok(());
        }

        temp_mark.insert(node_id);

        if let Some(node) = self.nodes.get(&node_id) {
            for socket in &node.inputs {
                if let Some(SocketSource::Node { node: upstream, .. }) = socket.connection {
                    self.visit(upstream, visited, temp_mark, order)?;
                }
            }
        }

        temp_mark.remove(&node_id);
        visited.insert(node_id);
        order.push(node_id);

        Ok(())
    }

    /// Union of the classification flags of all nodes.
    pub fn classification(&self) -> Classification {
        self.nodes
            .values()
            .fold(Classification::empty(), |flags, node| {
                flags | node.classification
            })
    }

    /// Check a classification flag on the graph.
    pub fn has_classification(&self, flags: Classification) -> bool {
        self.classification().intersects(flags)
    }

    fn set_connection(&mut self, node: NodeId, input: usize, source: SocketSource) {
        if let Some(node) = self.nodes.get_mut(&node) {
            if let Some(socket) = node.inputs.get_mut(input) {
                socket.connection = Some(source);
            }
        }
    }

    fn insert_convert_node(
        &mut self,
        from: Type,
        to: Type,
        to_node: NodeId,
        to_input: usize,
    ) -> Result<NodeId, GraphError> {
        let target = &self.nodes[&to_node];
        let base = format!(
            "{}_{}_cvt",
            target.name,
            target.inputs[to_input].name
        );
        let mut name = base.clone();
        let mut counter = 2;
        while self.node_by_name(&name).is_some() {
            name = format!("{base}{counter}");
            counter += 1;
        }
        let node = ShaderNode::new(name, Arc::new(convert_def(from, to)));
        tracing::debug!(
            node = %node.name,
            from = %from,
            to = %to,
            "inserting implicit conversion node"
        );
        self.add_node(node)
    }
}

/// Build the definition of an implicit conversion node between two types.
pub fn convert_def(from: Type, to: Type) -> NodeDef {
    NodeDef::new(
        format!("ND_convert_{}_{}", from.name(), to.name()),
        "convert",
        to,
    )
    .with_input(PortDef::new("in", from))
    .with_implementation(ImplDef::new("", ImplKind::Convert))
}

/// Error when constructing a graph.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    /// Node not found.
    #[error("Node not found: {0:?}")]
    NodeNotFound(NodeId),

    /// Socket index out of range for a node.
    #[error("Node '{0}' has no socket at index {1}")]
    PortNotFound(String, usize),

    /// External input socket index out of range.
    #[error("Graph has no input socket at index {0}")]
    InputNotFound(usize),

    /// External output socket index out of range.
    #[error("Graph has no output socket at index {0}")]
    OutputNotFound(usize),

    /// A node with this name already exists, or the name is empty.
    #[error("A node named '{0}' already exists in the graph")]
    DuplicateNodeName(String),

    /// The input socket already has an upstream connection.
    #[error("Input '{1}' of node '{0}' is already connected")]
    InputAlreadyConnected(String, String),

    /// The endpoint types cannot be bridged by a conversion.
    #[error("Cannot connect '{from}' to '{to}'")]
    IncompatibleTypes {
        /// Source socket type name.
        from: String,
        /// Target socket type name.
        to: String,
    },

    /// A node may not read its own output.
    #[error("Self-loop not allowed")]
    SelfLoop,

    /// The edge would close a cycle.
    #[error("Connection would create a cycle")]
    Cycle,
}

/// Error when a graph contains a cycle.
#[derive(Debug, thiserror::Error)]
#[error("Graph contains a cycle")]
pub struct CycleError;
