// SPDX-License-Identifier: MIT OR Apache-2.0
//! Literal values carried by unconnected sockets.

use serde::{Deserialize, Serialize};

/// A literal value assigned to a socket.
///
/// The value only stores the component payload; how it is interpreted
/// (color vs. vector, and how it is spelled in generated code) is decided
/// by the socket's type and the target-language syntax.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Floating point scalar.
    Float(f32),
    /// Integer scalar.
    Integer(i32),
    /// Boolean scalar.
    Boolean(bool),
    /// Two float components.
    Vec2([f32; 2]),
    /// Three float components.
    Vec3([f32; 3]),
    /// Four float components.
    Vec4([f32; 4]),
    /// Nine float components, row major.
    Matrix33([f32; 9]),
    /// Sixteen float components, row major.
    Matrix44([f32; 16]),
    /// String or file name.
    String(String),
}

impl Value {
    /// Float components of the value, if it has any.
    pub fn components(&self) -> Option<&[f32]> {
        match self {
            Self::Float(v) => Some(std::slice::from_ref(v)),
            Self::Vec2(v) => Some(v),
            Self::Vec3(v) => Some(v),
            Self::Vec4(v) => Some(v),
            Self::Matrix33(v) => Some(v),
            Self::Matrix44(v) => Some(v),
            Self::Integer(_) | Self::Boolean(_) | Self::String(_) => None,
        }
    }

    /// Number of components; 0 for strings.
    pub fn size(&self) -> usize {
        match self {
            Self::Float(_) | Self::Integer(_) | Self::Boolean(_) => 1,
            Self::Vec2(_) => 2,
            Self::Vec3(_) => 3,
            Self::Vec4(_) => 4,
            Self::Matrix33(_) => 9,
            Self::Matrix44(_) => 16,
            Self::String(_) => 0,
        }
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Self::Float(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Integer(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Boolean(v)
    }
}

impl From<[f32; 2]> for Value {
    fn from(v: [f32; 2]) -> Self {
        Self::Vec2(v)
    }
}

impl From<[f32; 3]> for Value {
    fn from(v: [f32; 3]) -> Self {
        Self::Vec3(v)
    }
}

impl From<[f32; 4]> for Value {
    fn from(v: [f32; 4]) -> Self {
        Self::Vec4(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_components() {
        assert_eq!(Value::Float(1.5).components(), Some(&[1.5][..]));
        assert_eq!(Value::Vec2([1.0, 2.0]).size(), 2);
        assert_eq!(Value::String("a".into()).components(), None);
    }

    #[test]
    fn test_serde_round_trip() {
        let value = Value::Vec3([0.25, 0.5, 1.0]);
        let text = ron::to_string(&value).unwrap();
        let back: Value = ron::from_str(&text).unwrap();
        assert_eq!(back, value);
    }
}
