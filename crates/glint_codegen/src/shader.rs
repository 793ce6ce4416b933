// SPDX-License-Identifier: MIT OR Apache-2.0
//! The generated shader object returned to callers.

use crate::error::ShaderGenError;
use crate::stage::{ShaderStage, VariableInfo};
use indexmap::IndexMap;

/// Result of one generation request: named stages holding source text and
/// variable manifests.
#[derive(Debug)]
pub struct Shader {
    name: String,
    stages: IndexMap<String, ShaderStage>,
}

impl Shader {
    /// Create a shader with no stages.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stages: IndexMap::new(),
        }
    }

    /// Shader name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Create a stage, or return the existing one.
    pub fn create_stage(&mut self, name: &str) -> &mut ShaderStage {
        self.stages
            .entry(name.to_string())
            .or_insert_with(|| ShaderStage::new(name))
    }

    /// Whether a stage exists.
    pub fn has_stage(&self, name: &str) -> bool {
        self.stages.contains_key(name)
    }

    /// Get a stage by name.
    pub fn stage(&self, name: &str) -> Result<&ShaderStage, ShaderGenError> {
        self.stages
            .get(name)
            .ok_or_else(|| ShaderGenError::UnknownStage(name.to_string()))
    }

    /// Get a stage by name, mutably.
    pub fn stage_mut(&mut self, name: &str) -> Result<&mut ShaderStage, ShaderGenError> {
        if !self.stages.contains_key(name) {
            return Err(ShaderGenError::UnknownStage(name.to_string()));
        }
        Ok(&mut self.stages[name])
    }

    /// All stages, in creation order.
    pub fn stages(&self) -> impl Iterator<Item = &ShaderStage> {
        self.stages.values()
    }

    /// Source text of one stage.
    pub fn source_code(&self, stage: &str) -> Result<&str, ShaderGenError> {
        self.stage(stage).map(ShaderStage::code)
    }

    /// Variable manifest of one stage.
    pub fn stage_manifest(&self, stage: &str) -> Result<Vec<VariableInfo>, ShaderGenError> {
        self.stage(stage).map(ShaderStage::manifest)
    }
}
