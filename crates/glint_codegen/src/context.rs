// SPDX-License-Identifier: MIT OR Apache-2.0
//! Generation options and per-request context.

use crate::syntax::{sanitize_name, Syntax};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;

/// Method used for specular environment lighting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpecularEnvironmentMethod {
    /// No environment lighting.
    None,
    /// Prefiltered environment maps.
    Prefilter,
    /// Filtered importance sampling.
    FilteredImportanceSampling,
}

/// Options controlling one generation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenOptions {
    /// Maximum number of active light sources. Clamped to at least 1 at
    /// use sites.
    pub max_active_light_sources: u32,
    /// Specular environment method for lighting-classified graphs.
    pub specular_environment_method: SpecularEnvironmentMethod,
    /// Flip the V coordinate of file texture lookups.
    pub file_texture_vertical_flip: bool,
    /// Emit the version header at the top of each stage.
    pub emit_version_string: bool,
    /// Emit transparency handling for surface shaders.
    pub hw_transparency: bool,
}

impl Default for GenOptions {
    fn default() -> Self {
        Self {
            max_active_light_sources: 3,
            specular_environment_method: SpecularEnvironmentMethod::Prefilter,
            file_texture_vertical_flip: false,
            emit_version_string: true,
            hw_transparency: false,
        }
    }
}

/// Per-request generation state: options, identifier synthesis and
/// source-code resolution.
///
/// A context is confined to one generation request's call stack; nothing
/// here is shared between requests.
#[derive(Debug, Default)]
pub struct GenContext {
    /// Options for this request.
    pub options: GenOptions,
    identifiers: HashSet<String>,
    sources: IndexMap<String, String>,
    search_paths: Vec<PathBuf>,
}

impl GenContext {
    /// Create a context with the given options.
    pub fn new(options: GenOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    /// Synthesize a unique identifier from a name, avoiding the syntax's
    /// restricted set and every identifier already synthesized in this
    /// request. Deterministic for a fixed call sequence.
    pub fn make_identifier(&mut self, name: &str, syntax: &dyn Syntax) -> String {
        let base = sanitize_name(name);
        let mut candidate = base.clone();
        let mut counter = 1;
        while syntax.is_restricted(&candidate) || self.identifiers.contains(&candidate) {
            counter += 1;
            candidate = format!("{base}{counter}");
        }
        self.identifiers.insert(candidate.clone());
        candidate
    }

    /// Forget all synthesized identifiers. Called at the start of each
    /// generation request.
    pub fn reset_identifiers(&mut self) {
        self.identifiers.clear();
    }

    /// Register an in-memory source fragment, addressable from include
    /// directives. Registered sources shadow the search paths.
    pub fn register_source(&mut self, name: impl Into<String>, content: impl Into<String>) {
        self.sources.insert(name.into(), content.into());
    }

    /// Append a filesystem search path for source includes.
    pub fn add_source_search_path(&mut self, path: impl Into<PathBuf>) {
        self.search_paths.push(path.into());
    }

    /// Resolve a source file to a deduplication key and its content.
    /// Registered in-memory sources are checked before the search paths.
    pub fn resolve_source(&self, file: &str) -> Option<(String, String)> {
        if let Some(content) = self.sources.get(file) {
            return Some((format!("mem:{file}"), content.clone()));
        }
        for path in &self.search_paths {
            let candidate = path.join(file);
            if let Ok(content) = std::fs::read_to_string(&candidate) {
                return Some((candidate.display().to_string(), content));
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::GlslSyntax;

    #[test]
    fn test_default_options() {
        let options = GenOptions::default();
        assert_eq!(options.max_active_light_sources, 3);
        assert_eq!(
            options.specular_environment_method,
            SpecularEnvironmentMethod::Prefilter
        );
        assert!(!options.file_texture_vertical_flip);
    }

    #[test]
    fn test_options_serialization() {
        let options = GenOptions {
            max_active_light_sources: 8,
            ..GenOptions::default()
        };
        let text = ron::ser::to_string_pretty(&options, ron::ser::PrettyConfig::default()).unwrap();
        let loaded: GenOptions = ron::from_str(&text).unwrap();
        assert_eq!(loaded.max_active_light_sources, 8);
    }

    #[test]
    fn test_make_identifier_avoids_collisions() {
        let syntax = GlslSyntax::new();
        let mut ctx = GenContext::default();

        // Restricted names get a numeric suffix.
        assert_eq!(ctx.make_identifier("vec3", &syntax), "vec32");

        let first = ctx.make_identifier("add_out", &syntax);
        let second = ctx.make_identifier("add_out", &syntax);
        assert_eq!(first, "add_out");
        assert_eq!(second, "add_out2");

        ctx.reset_identifiers();
        assert_eq!(ctx.make_identifier("add_out", &syntax), "add_out");
    }

    #[test]
    fn test_source_resolution() {
        let mut ctx = GenContext::default();
        ctx.register_source("lib/a.glsl", "float a() { return 1.0; }");

        let (key, content) = ctx.resolve_source("lib/a.glsl").unwrap();
        assert_eq!(key, "mem:lib/a.glsl");
        assert!(content.contains("float a()"));
        assert!(ctx.resolve_source("lib/missing.glsl").is_none());
    }
}
