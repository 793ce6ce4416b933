// SPDX-License-Identifier: MIT OR Apache-2.0
//! Socket definitions for node inputs/outputs.

use crate::node::NodeId;
use crate::types::{BaseType, Type};
use crate::value::Value;
use serde::{Deserialize, Serialize};

/// Declaration of a socket in a node definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortDef {
    /// Socket name.
    pub name: String,
    /// Data type.
    pub ty: Type,
    /// Default value used when the socket is left unconnected.
    pub value: Option<Value>,
}

impl PortDef {
    /// Create a new port definition.
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: name.into(),
            ty,
            value: None,
        }
    }

    /// Set the default value.
    pub fn with_value(mut self, value: impl Into<Value>) -> Self {
        self.value = Some(value.into());
        self
    }
}

/// Upstream source feeding an input socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SocketSource {
    /// Output socket of another node in the same graph.
    Node {
        /// Source node.
        node: NodeId,
        /// Index into the source node's output sockets.
        output: usize,
    },
    /// One of the graph's external input sockets.
    GraphInput {
        /// Index into the graph's input sockets.
        index: usize,
    },
}

/// An input socket on a node instance.
///
/// Receives from at most one upstream source; an unconnected socket falls
/// back to its literal value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputSocket {
    /// Socket name.
    pub name: String,
    /// Data type.
    pub ty: Type,
    /// Literal value used when unconnected.
    pub value: Option<Value>,
    /// The single upstream source, if connected.
    pub connection: Option<SocketSource>,
}

impl InputSocket {
    /// Create an unconnected input socket from its definition.
    pub fn new(def: &PortDef) -> Self {
        Self {
            name: def.name.clone(),
            ty: def.ty,
            value: def.value.clone(),
            connection: None,
        }
    }
}

/// An output socket on a node instance. May feed any number of
/// downstream sockets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputSocket {
    /// Socket name.
    pub name: String,
    /// Data type.
    pub ty: Type,
}

impl OutputSocket {
    /// Create an output socket from its definition.
    pub fn new(def: &PortDef) -> Self {
        Self {
            name: def.name.clone(),
            ty: def.ty,
        }
    }
}

/// Check whether a value of type `from` can be implicitly bridged to a
/// socket of type `to` by inserting a conversion node.
pub fn is_convertible(from: Type, to: Type) -> bool {
    if from == to {
        return true;
    }
    // Only float-based component data converts implicitly.
    if from.base() != BaseType::Float || to.base() != BaseType::Float {
        return false;
    }
    match (from.size(), to.size()) {
        // Scalar widening.
        (1, 2 | 3 | 4) => true,
        // Color/vector reinterpretation of the same arity, and adjacent
        // widening/narrowing handled by the convert implementation.
        (2, 2) | (3, 3) | (4, 4) => true,
        (3, 4) | (4, 3) | (2, 4) | (4, 2) => true,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types;

    #[test]
    fn test_port_def_builder() {
        let def = PortDef::new("in1", types::FLOAT).with_value(0.5);
        assert_eq!(def.name, "in1");
        assert_eq!(def.value, Some(Value::Float(0.5)));
    }

    #[test]
    fn test_convertibility() {
        assert!(is_convertible(types::FLOAT, types::VECTOR3));
        assert!(is_convertible(types::COLOR3, types::VECTOR3));
        assert!(is_convertible(types::COLOR4, types::COLOR3));
        assert!(!is_convertible(types::STRING, types::FLOAT));
        assert!(!is_convertible(types::BSDF, types::COLOR3));
        assert!(!is_convertible(types::VECTOR3, types::FLOAT));
    }
}
