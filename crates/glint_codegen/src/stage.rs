// SPDX-License-Identifier: MIT OR Apache-2.0
//! Scoped code buffers and variable blocks for one emission stage.

use crate::context::GenContext;
use crate::error::ShaderGenError;
use glint_graph::{Type, Value};
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::{BTreeSet, HashSet};

const INDENTATION: &str = "    ";

/// Bracket kind opened by a scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Brackets {
    /// No brackets, indentation only.
    None,
    /// Curly braces.
    Braces,
    /// Parentheses.
    Parentheses,
    /// Square brackets.
    Squares,
}

impl Brackets {
    fn open(self) -> Option<char> {
        match self {
            Self::None => None,
            Self::Braces => Some('{'),
            Self::Parentheses => Some('('),
            Self::Squares => Some('['),
        }
    }

    fn close(self) -> Option<char> {
        match self {
            Self::None => None,
            Self::Braces => Some('}'),
            Self::Parentheses => Some(')'),
            Self::Squares => Some(']'),
        }
    }
}

/// A declared variable inside a block.
#[derive(Debug, Clone)]
pub struct ShaderVariable {
    /// Final variable name in the emitted code.
    pub name: String,
    /// Data type.
    pub ty: Type,
    /// Published default value, if any.
    pub value: Option<Value>,
    /// Optional semantic tag for the packaging layer.
    pub semantic: Option<String>,
    /// Free-form flags (e.g. `varying`, `global`) for the packaging layer.
    pub flags: Vec<String>,
}

/// Named, ordered, unique-by-name collection of declared variables.
///
/// Insertion order is the declaration order in emitted code.
#[derive(Debug, Clone)]
pub struct VariableBlock {
    name: String,
    instance: String,
    variables: IndexMap<String, ShaderVariable>,
}

impl VariableBlock {
    /// Create an empty block. `instance` is the prefix used to address
    /// members when the block is declared as a struct instance.
    pub fn new(name: impl Into<String>, instance: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            instance: instance.into(),
            variables: IndexMap::new(),
        }
    }

    /// Block name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Instance name, empty when the block's members are free variables.
    pub fn instance(&self) -> &str {
        &self.instance
    }

    /// Add a variable. Re-adding an existing name is a no-op returning
    /// the existing entry.
    pub fn add(&mut self, ty: Type, name: impl Into<String>, value: Option<Value>) -> &mut ShaderVariable {
        let name = name.into();
        self.variables
            .entry(name.clone())
            .or_insert_with(|| ShaderVariable {
                name,
                ty,
                value,
                semantic: None,
                flags: Vec::new(),
            })
    }

    /// Find a variable by name.
    pub fn find(&self, name: &str) -> Option<&ShaderVariable> {
        self.variables.get(name)
    }

    /// Look up a variable by name, failing when it does not exist.
    pub fn index(&self, name: &str) -> Result<&ShaderVariable, ShaderGenError> {
        self.find(name).ok_or_else(|| ShaderGenError::UnknownVariable {
            block: self.name.clone(),
            name: name.to_string(),
        })
    }

    /// Get a variable by position.
    pub fn get(&self, index: usize) -> Option<&ShaderVariable> {
        self.variables.get_index(index).map(|(_, variable)| variable)
    }

    /// Number of variables.
    pub fn len(&self) -> usize {
        self.variables.len()
    }

    /// Whether the block is empty.
    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// Variables in declaration order.
    pub fn variables(&self) -> impl Iterator<Item = &ShaderVariable> {
        self.variables.values()
    }
}

/// One entry of the variable manifest handed to packaging layers.
#[derive(Debug, Clone, Serialize)]
pub struct VariableInfo {
    /// Owning block name.
    pub block: String,
    /// Variable name as it appears in the source text.
    pub name: String,
    /// Registered type name.
    pub ty: String,
    /// Optional semantic tag.
    pub semantic: Option<String>,
    /// Flags such as `uniform`, `varying` or `global`.
    pub flags: Vec<String>,
}

/// A named emission target with its own code buffer, scope stack and
/// variable blocks.
#[derive(Debug)]
pub struct ShaderStage {
    name: String,
    code: String,
    indentations: usize,
    scopes: Vec<Brackets>,
    uniforms: IndexMap<String, VariableBlock>,
    inputs: IndexMap<String, VariableBlock>,
    outputs: IndexMap<String, VariableBlock>,
    constants: VariableBlock,
    includes: HashSet<String>,
    defined_functions: BTreeSet<u64>,
    calculated: HashSet<String>,
    function_name: String,
}

impl ShaderStage {
    /// Create an empty stage.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            code: String::new(),
            indentations: 0,
            scopes: Vec::new(),
            uniforms: IndexMap::new(),
            inputs: IndexMap::new(),
            outputs: IndexMap::new(),
            constants: VariableBlock::new("Constants", "cn"),
            includes: HashSet::new(),
            defined_functions: BTreeSet::new(),
            calculated: HashSet::new(),
            function_name: String::new(),
        }
    }

    /// Stage name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The emitted source text.
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Replace the emitted source text. Used by the final
    /// token-substitution pass.
    pub fn set_code(&mut self, code: String) {
        self.code = code;
    }

    /// Name of the synthesized entry point, if one was emitted.
    pub fn function_name(&self) -> &str {
        &self.function_name
    }

    /// Record the name of the synthesized entry point.
    pub fn set_function_name(&mut self, name: impl Into<String>) {
        self.function_name = name.into();
    }

    /// Create a uniform block, or return the existing one.
    pub fn create_uniform_block(&mut self, name: &str, instance: &str) -> &mut VariableBlock {
        self.uniforms
            .entry(name.to_string())
            .or_insert_with(|| VariableBlock::new(name, instance))
    }

    /// Create an input block, or return the existing one.
    pub fn create_input_block(&mut self, name: &str, instance: &str) -> &mut VariableBlock {
        self.inputs
            .entry(name.to_string())
            .or_insert_with(|| VariableBlock::new(name, instance))
    }

    /// Create an output block, or return the existing one.
    pub fn create_output_block(&mut self, name: &str, instance: &str) -> &mut VariableBlock {
        self.outputs
            .entry(name.to_string())
            .or_insert_with(|| VariableBlock::new(name, instance))
    }

    /// Get a uniform block by name.
    pub fn uniform_block(&self, name: &str) -> Result<&VariableBlock, ShaderGenError> {
        self.uniforms.get(name).ok_or_else(|| self.unknown_block("uniform", name))
    }

    /// Get a uniform block by name, mutably.
    pub fn uniform_block_mut(&mut self, name: &str) -> Result<&mut VariableBlock, ShaderGenError> {
        if !self.uniforms.contains_key(name) {
            return Err(self.unknown_block("uniform", name));
        }
        Ok(&mut self.uniforms[name])
    }

    /// Get an input block by name.
    pub fn input_block(&self, name: &str) -> Result<&VariableBlock, ShaderGenError> {
        self.inputs.get(name).ok_or_else(|| self.unknown_block("input", name))
    }

    /// Get an input block by name, mutably.
    pub fn input_block_mut(&mut self, name: &str) -> Result<&mut VariableBlock, ShaderGenError> {
        if !self.inputs.contains_key(name) {
            return Err(self.unknown_block("input", name));
        }
        Ok(&mut self.inputs[name])
    }

    /// Get an output block by name.
    pub fn output_block(&self, name: &str) -> Result<&VariableBlock, ShaderGenError> {
        self.outputs.get(name).ok_or_else(|| self.unknown_block("output", name))
    }

    /// Get an output block by name, mutably.
    pub fn output_block_mut(&mut self, name: &str) -> Result<&mut VariableBlock, ShaderGenError> {
        if !self.outputs.contains_key(name) {
            return Err(self.unknown_block("output", name));
        }
        Ok(&mut self.outputs[name])
    }

    /// The constant block.
    pub fn constant_block(&self) -> &VariableBlock {
        &self.constants
    }

    /// The constant block, mutably.
    pub fn constant_block_mut(&mut self) -> &mut VariableBlock {
        &mut self.constants
    }

    fn unknown_block(&self, kind: &'static str, name: &str) -> ShaderGenError {
        ShaderGenError::UnknownBlock {
            kind,
            name: name.to_string(),
            stage: self.name.clone(),
        }
    }

    /// Open a scope. Indentation of subsequent lines derives from the
    /// scope depth alone.
    pub fn begin_scope(&mut self, brackets: Brackets) {
        if let Some(open) = brackets.open() {
            self.begin_line();
            self.code.push(open);
            self.code.push('\n');
        }
        self.indentations += 1;
        self.scopes.push(brackets);
    }

    /// Close the innermost scope. Closing with no scope active is a
    /// fatal error.
    pub fn end_scope(&mut self, semicolon: bool, newline: bool) -> Result<(), ShaderGenError> {
        let brackets = self
            .scopes
            .pop()
            .ok_or_else(|| ShaderGenError::ScopeUnderflow(self.name.clone()))?;
        self.indentations -= 1;

        if let Some(close) = brackets.close() {
            self.begin_line();
            self.code.push(close);
        }
        if semicolon {
            self.code.push(';');
        }
        if newline {
            self.code.push('\n');
        }
        Ok(())
    }

    /// Emit the indentation for the current scope depth.
    pub fn begin_line(&mut self) {
        for _ in 0..self.indentations {
            self.code.push_str(INDENTATION);
        }
    }

    /// Terminate the current line, optionally with a semicolon.
    pub fn end_line(&mut self, semicolon: bool) {
        if semicolon {
            self.code.push(';');
        }
        self.new_line();
    }

    /// Emit a line break.
    pub fn new_line(&mut self) {
        self.code.push('\n');
    }

    /// Append text without indentation or line handling.
    pub fn add_string(&mut self, text: &str) {
        self.code.push_str(text);
    }

    /// Emit one indented line.
    pub fn add_line(&mut self, line: &str, semicolon: bool) {
        self.begin_line();
        self.add_string(line);
        self.end_line(semicolon);
    }

    /// Emit an indented comment line.
    pub fn add_comment(&mut self, text: &str) {
        self.begin_line();
        self.code.push_str("// ");
        self.code.push_str(text);
        self.end_line(false);
    }

    /// Emit a multi-line block, resolving `#include "file"` directives
    /// through the context and deduplicating them by resolved path.
    pub fn add_block(&mut self, text: &str, ctx: &GenContext) -> Result<(), ShaderGenError> {
        for line in text.lines() {
            if let Some(position) = line.find("#include") {
                let rest = &line[position + "#include".len()..];
                let start = rest.find('"');
                let end = rest.rfind('"');
                if let (Some(start), Some(end)) = (start, end) {
                    if end > start + 1 {
                        let file = &rest[start + 1..end];
                        self.add_include(file, ctx)?;
                        continue;
                    }
                }
            }
            self.add_line(line, false);
        }
        Ok(())
    }

    /// Resolve and emit an include file once; repeated inclusion of the
    /// same resolved path is a no-op.
    pub fn add_include(&mut self, file: &str, ctx: &GenContext) -> Result<(), ShaderGenError> {
        let (key, content) = ctx
            .resolve_source(file)
            .ok_or_else(|| ShaderGenError::MissingInclude(file.to_string()))?;
        if self.includes.insert(key) {
            self.add_block(&content, ctx)?;
        }
        Ok(())
    }

    /// Record a function definition keyed by its implementation's content
    /// hash. Returns `true` the first time a hash is seen in this stage;
    /// the caller emits the definition exactly then.
    pub fn mark_function_defined(&mut self, hash: u64) -> bool {
        self.defined_functions.insert(hash)
    }

    /// Content hashes of every distinct function emitted into this stage.
    pub fn function_hashes(&self) -> impl Iterator<Item = u64> + '_ {
        self.defined_functions.iter().copied()
    }

    /// Whether a stream variable has already been assigned in this stage.
    pub fn is_calculated(&self, variable: &str) -> bool {
        self.calculated.contains(variable)
    }

    /// Record that a stream variable has been assigned in this stage.
    pub fn set_calculated(&mut self, variable: impl Into<String>) {
        self.calculated.insert(variable.into());
    }

    /// Structured manifest of every declared variable, sufficient for a
    /// packaging layer to bind them without re-parsing the source text.
    pub fn manifest(&self) -> Vec<VariableInfo> {
        let mut manifest = Vec::new();
        let mut collect = |blocks: &IndexMap<String, VariableBlock>, kind: &str| {
            for block in blocks.values() {
                for variable in block.variables() {
                    let mut flags = vec![kind.to_string()];
                    flags.extend(variable.flags.iter().cloned());
                    manifest.push(VariableInfo {
                        block: block.name().to_string(),
                        name: variable.name.clone(),
                        ty: variable.ty.name().to_string(),
                        semantic: variable.semantic.clone(),
                        flags,
                    });
                }
            }
        };
        collect(&self.uniforms, "uniform");
        collect(&self.inputs, "input");
        collect(&self.outputs, "output");
        for variable in self.constants.variables() {
            manifest.push(VariableInfo {
                block: self.constants.name().to_string(),
                name: variable.name.clone(),
                ty: variable.ty.name().to_string(),
                semantic: variable.semantic.clone(),
                flags: vec!["constant".to_string()],
            });
        }
        manifest
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glint_graph::types;

    #[test]
    fn test_scope_indentation() {
        let mut stage = ShaderStage::new("pixel");
        stage.add_line("void main()", false);
        stage.begin_scope(Brackets::Braces);
        stage.add_line("float a = 1.0", true);
        stage.begin_scope(Brackets::Braces);
        stage.add_line("a = 2.0", true);
        stage.end_scope(false, true).unwrap();
        stage.end_scope(false, true).unwrap();

        let expected = "void main()\n{\n    float a = 1.0;\n    {\n        a = 2.0;\n    }\n}\n";
        assert_eq!(stage.code(), expected);
    }

    #[test]
    fn test_scope_underflow() {
        let mut stage = ShaderStage::new("pixel");
        let result = stage.end_scope(false, true);
        assert!(matches!(result, Err(ShaderGenError::ScopeUnderflow(name)) if name == "pixel"));
    }

    #[test]
    fn test_variable_block_idempotent_add() {
        let mut block = VariableBlock::new("PublicUniforms", "u");
        block.add(types::COLOR3, "base", None);
        block.add(types::FLOAT, "roughness", None);
        // Re-adding does not duplicate or reorder.
        block.add(types::COLOR3, "base", Some([0.0, 0.0, 0.0].into()));

        assert_eq!(block.len(), 2);
        assert_eq!(block.get(0).unwrap().name, "base");
        assert_eq!(block.get(1).unwrap().name, "roughness");
        assert!(block.get(0).unwrap().value.is_none());
    }

    #[test]
    fn test_variable_block_lookup() {
        let mut block = VariableBlock::new("PublicUniforms", "u");
        block.add(types::FLOAT, "roughness", None);

        assert!(block.index("roughness").is_ok());
        let result = block.index("missing");
        assert!(
            matches!(result, Err(ShaderGenError::UnknownVariable { block, name })
                if block == "PublicUniforms" && name == "missing")
        );
    }

    #[test]
    fn test_block_creation_is_idempotent() {
        let mut stage = ShaderStage::new("pixel");
        stage.create_uniform_block("PublicUniforms", "u").add(
            types::FLOAT,
            "roughness",
            None,
        );
        stage.create_uniform_block("PublicUniforms", "u");
        assert_eq!(stage.uniform_block("PublicUniforms").unwrap().len(), 1);

        let result = stage.uniform_block("Missing");
        assert!(matches!(result, Err(ShaderGenError::UnknownBlock { .. })));
    }

    #[test]
    fn test_include_deduplication() {
        let mut ctx = GenContext::default();
        ctx.register_source("lib/a.glsl", "float lib_a() { return 1.0; }");

        let mut stage = ShaderStage::new("pixel");
        stage
            .add_block("#include \"lib/a.glsl\"\n#include \"lib/a.glsl\"", &ctx)
            .unwrap();

        assert_eq!(stage.code().matches("float lib_a()").count(), 1);
    }

    #[test]
    fn test_missing_include_is_fatal() {
        let ctx = GenContext::default();
        let mut stage = ShaderStage::new("pixel");
        let result = stage.add_block("#include \"lib/missing.glsl\"", &ctx);
        assert!(matches!(result, Err(ShaderGenError::MissingInclude(_))));
    }

    #[test]
    fn test_function_definition_dedup() {
        let mut stage = ShaderStage::new("pixel");
        assert!(stage.mark_function_defined(42));
        assert!(!stage.mark_function_defined(42));
        assert!(stage.mark_function_defined(7));
        assert_eq!(stage.function_hashes().collect::<Vec<_>>(), vec![7, 42]);
    }

    #[test]
    fn test_manifest() {
        let mut stage = ShaderStage::new("pixel");
        stage
            .create_uniform_block("PublicUniforms", "u")
            .add(types::COLOR3, "base", None)
            .semantic = Some("color".to_string());
        let varying = stage.create_input_block("VertexData", "vd");
        varying
            .add(types::VECTOR3, "positionWorld", None)
            .flags
            .push("varying".to_string());

        let manifest = stage.manifest();
        assert_eq!(manifest.len(), 2);
        assert_eq!(manifest[0].name, "base");
        assert_eq!(manifest[0].ty, "color3");
        assert_eq!(manifest[0].flags, vec!["uniform"]);
        assert_eq!(manifest[1].flags, vec!["input", "varying"]);
    }
}
