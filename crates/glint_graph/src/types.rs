// SPDX-License-Identifier: MIT OR Apache-2.0
//! Type descriptors for values flowing through shader graphs.
//!
//! Types are registered once in a process-wide, append-only registry and
//! referenced through the cheap [`Type`] handle. The standard shading types
//! are registered on first access; additional types can be registered at any
//! time but never removed.

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use parking_lot::RwLock;

/// Base kind of a type's components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum BaseType {
    /// Floating point components.
    Float,
    /// Integer components.
    Integer,
    /// Boolean components.
    Boolean,
    /// Character string.
    String,
    /// Closure (BSDF/EDF/VDF or shader) value, opaque to the graph.
    Closure,
}

/// Semantic tag attached to a type, used to pick conversion and
/// formatting rules during code generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Semantic {
    /// No particular semantic.
    None,
    /// Color data.
    Color,
    /// Vector data.
    Vector,
    /// Matrix data.
    Matrix,
    /// File name referencing a texture resource.
    Filename,
    /// Light-transport closure.
    Closure,
    /// Complete shader.
    Shader,
}

/// Immutable descriptor for a registered type.
#[derive(Debug)]
pub struct TypeDesc {
    name: &'static str,
    base: BaseType,
    semantic: Semantic,
    size: usize,
}

impl TypeDesc {
    const fn new(name: &'static str, base: BaseType, semantic: Semantic, size: usize) -> Self {
        Self {
            name,
            base,
            semantic,
            size,
        }
    }
}

/// Handle to a registered type descriptor.
///
/// Handles are cheap to copy and compare; equality is by type name, which
/// the registry keeps unique.
#[derive(Debug, Clone, Copy)]
pub struct Type(&'static TypeDesc);

impl Type {
    /// Register a new type, failing if the name is already taken.
    pub fn register(
        name: &str,
        base: BaseType,
        semantic: Semantic,
        size: usize,
    ) -> Result<Type, TypeError> {
        let mut registry = REGISTRY.write();
        if registry.contains_key(name) {
            return Err(TypeError::Duplicate(name.to_string()));
        }
        let desc: &'static TypeDesc = Box::leak(Box::new(TypeDesc {
            name: Box::leak(name.to_string().into_boxed_str()),
            base,
            semantic,
            size,
        }));
        registry.insert(desc.name, desc);
        Ok(Type(desc))
    }

    /// Look up a registered type by name.
    pub fn get(name: &str) -> Result<Type, TypeError> {
        REGISTRY
            .read()
            .get(name)
            .copied()
            .map(Type)
            .ok_or_else(|| TypeError::Unknown(name.to_string()))
    }

    /// The registered name.
    pub fn name(&self) -> &'static str {
        self.0.name
    }

    /// The base kind of the type's components.
    pub fn base(&self) -> BaseType {
        self.0.base
    }

    /// The semantic tag.
    pub fn semantic(&self) -> Semantic {
        self.0.semantic
    }

    /// Number of components; 0 for opaque types (strings, closures).
    pub fn size(&self) -> usize {
        self.0.size
    }

    /// Single-component type.
    pub fn is_scalar(&self) -> bool {
        self.0.size == 1
    }

    /// Aggregate of more than one component.
    pub fn is_aggregate(&self) -> bool {
        self.0.size > 1
    }

    /// Two floating point components.
    pub fn is_float2(&self) -> bool {
        self.0.base == BaseType::Float && self.0.size == 2
    }

    /// Three floating point components.
    pub fn is_float3(&self) -> bool {
        self.0.base == BaseType::Float && self.0.size == 3
    }

    /// Four floating point components.
    pub fn is_float4(&self) -> bool {
        self.0.base == BaseType::Float && self.0.size == 4
    }

    /// Closure or shader type.
    pub fn is_closure(&self) -> bool {
        matches!(self.0.semantic, Semantic::Closure | Semantic::Shader)
    }
}

impl PartialEq for Type {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.0, other.0) || self.0.name == other.0.name
    }
}

impl Eq for Type {}

impl std::hash::Hash for Type {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.name.hash(state);
    }
}

impl std::fmt::Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.0.name)
    }
}

impl serde::Serialize for Type {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.0.name)
    }
}

impl<'de> serde::Deserialize<'de> for Type {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Type::get(&name).map_err(serde::de::Error::custom)
    }
}

/// Error raised by the type registry.
#[derive(Debug, thiserror::Error)]
pub enum TypeError {
    /// A type with this name is already registered.
    #[error("A type named '{0}' is already registered")]
    Duplicate(String),

    /// No type with this name is registered.
    #[error("No type named '{0}' is registered")]
    Unknown(String),
}

macro_rules! standard_types {
    ($($konst:ident, $desc:ident => $name:literal, $base:ident, $semantic:ident, $size:literal;)*) => {
        $(
            static $desc: TypeDesc =
                TypeDesc::new($name, BaseType::$base, Semantic::$semantic, $size);
            #[doc = concat!("The standard `", $name, "` type.")]
            pub static $konst: Type = Type(&$desc);
        )*

        static REGISTRY: Lazy<RwLock<IndexMap<&'static str, &'static TypeDesc>>> =
            Lazy::new(|| {
                let mut map = IndexMap::new();
                $( map.insert($desc.name, &$desc); )*
                RwLock::new(map)
            });
    };
}

standard_types! {
    FLOAT, FLOAT_DESC => "float", Float, None, 1;
    INTEGER, INTEGER_DESC => "integer", Integer, None, 1;
    BOOLEAN, BOOLEAN_DESC => "boolean", Boolean, None, 1;
    COLOR2, COLOR2_DESC => "color2", Float, Color, 2;
    COLOR3, COLOR3_DESC => "color3", Float, Color, 3;
    COLOR4, COLOR4_DESC => "color4", Float, Color, 4;
    VECTOR2, VECTOR2_DESC => "vector2", Float, Vector, 2;
    VECTOR3, VECTOR3_DESC => "vector3", Float, Vector, 3;
    VECTOR4, VECTOR4_DESC => "vector4", Float, Vector, 4;
    MATRIX33, MATRIX33_DESC => "matrix33", Float, Matrix, 9;
    MATRIX44, MATRIX44_DESC => "matrix44", Float, Matrix, 16;
    STRING, STRING_DESC => "string", String, None, 0;
    FILENAME, FILENAME_DESC => "filename", String, Filename, 0;
    BSDF, BSDF_DESC => "BSDF", Closure, Closure, 0;
    EDF, EDF_DESC => "EDF", Closure, Closure, 0;
    VDF, VDF_DESC => "VDF", Closure, Closure, 0;
    SURFACE_SHADER, SURFACE_SHADER_DESC => "surfaceshader", Closure, Shader, 0;
    VOLUME_SHADER, VOLUME_SHADER_DESC => "volumeshader", Closure, Shader, 0;
    DISPLACEMENT_SHADER, DISPLACEMENT_SHADER_DESC => "displacementshader", Closure, Shader, 0;
    LIGHT_SHADER, LIGHT_SHADER_DESC => "lightshader", Closure, Shader, 0;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_types() {
        let float = Type::get("float").unwrap();
        assert_eq!(float.base(), BaseType::Float);
        assert!(float.is_scalar());
        assert_eq!(float, FLOAT);

        let color2 = Type::get("color2").unwrap();
        assert_eq!(color2.base(), BaseType::Float);
        assert_eq!(color2.semantic(), Semantic::Color);
        assert!(color2.is_float2());

        let color3 = Type::get("color3").unwrap();
        assert!(color3.is_float3());

        let color4 = Type::get("color4").unwrap();
        assert!(color4.is_float4());

        assert!(BSDF.is_closure());
        assert!(SURFACE_SHADER.is_closure());
        assert!(!VECTOR3.is_closure());
    }

    #[test]
    fn test_register_custom_type() {
        let foo = Type::register("test_foo", BaseType::Float, Semantic::Color, 5).unwrap();
        assert_eq!(foo.size(), 5);
        assert_eq!(foo.semantic(), Semantic::Color);

        let looked_up = Type::get("test_foo").unwrap();
        assert_eq!(looked_up, foo);
        assert_eq!(looked_up.base(), BaseType::Float);
    }

    #[test]
    fn test_duplicate_registration_fails() {
        let result = Type::register("color3", BaseType::Float, Semantic::Color, 3);
        assert!(matches!(result, Err(TypeError::Duplicate(name)) if name == "color3"));
    }

    #[test]
    fn test_unknown_lookup_fails() {
        let result = Type::get("test_bar_does_not_exist");
        assert!(matches!(result, Err(TypeError::Unknown(_))));
    }

    #[test]
    fn test_serde_round_trip() {
        let text = ron::to_string(&VECTOR2).unwrap();
        let back: Type = ron::from_str(&text).unwrap();
        assert_eq!(back, VECTOR2);
    }
}
