/*!
 * Named prompt templates for script generation.
 *
 * A template source is a YAML (or JSON) mapping from template name to
 * `{template: string, max_length?: integer}`. Placeholders use `{name}` where
 * `name` is a flattened variable key; `{{` and `}}` produce literal braces.
 * Reusable components can be spliced into a body with `{component:name}`.
 */

use log::{debug, info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use super::flatten::{flatten_variables, FlatVariables, DEFAULT_SEPARATOR};
use crate::errors::TemplateError;

/// Placeholder at the start of the remaining input
static PLACEHOLDER_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\{(\w+)\}").unwrap()
});

/// Placeholder anywhere in a rendered prompt
static UNRESOLVED_PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{\w+\}").unwrap()
});

/// Template bundled with the crate, used when no template file is configured
pub const BUILTIN_TEMPLATES: &str = include_str!("../../prompt_templates.yaml");

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Literal(String),
    Placeholder(String),
}

#[derive(Debug, Deserialize)]
struct TemplateEntry {
    template: String,
    #[serde(default, alias = "maxLength")]
    max_length: Option<usize>,
}

/// A single compiled prompt template
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    /// Template body as written
    source: String,
    /// Maximum rendered length in characters
    max_length: Option<usize>,
    segments: Vec<Segment>,
    required: Vec<String>,
}

impl PromptTemplate {
    fn compile(source: &str, max_length: Option<usize>, components: &BTreeMap<String, String>) -> Self {
        let expanded = expand_components(source, components);
        let segments = parse_segments(&expanded);

        let mut seen = BTreeSet::new();
        let required = segments
            .iter()
            .filter_map(|segment| match segment {
                Segment::Placeholder(name) if seen.insert(name.clone()) => Some(name.clone()),
                _ => None,
            })
            .collect();

        Self {
            source: source.to_string(),
            max_length,
            segments,
            required,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn max_length(&self) -> Option<usize> {
        self.max_length
    }

    /// Placeholder names in order of first appearance
    pub fn required_variables(&self) -> &[String] {
        &self.required
    }

    fn fill(&self, variables: &FlatVariables) -> Result<String, TemplateError> {
        let mut prompt = String::with_capacity(self.source.len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => prompt.push_str(text),
                Segment::Placeholder(name) => {
                    let value = variables
                        .get(name)
                        .ok_or_else(|| TemplateError::MissingVariable { key: name.clone() })?;
                    prompt.push_str(value);
                }
            }
        }
        Ok(prompt)
    }
}

/// Collection of named templates plus shared components
#[derive(Debug, Clone, Default)]
pub struct TemplateSet {
    templates: BTreeMap<String, PromptTemplate>,
    components: BTreeMap<String, String>,
}

impl TemplateSet {
    /// Parse a template source
    pub fn load(source: &str) -> Result<Self, TemplateError> {
        let entries: BTreeMap<String, TemplateEntry> =
            serde_yaml::from_str(source).map_err(|e| TemplateError::Load(e.to_string()))?;

        let mut set = Self::default();
        for (name, entry) in entries {
            set.add_template(&name, &entry.template, entry.max_length);
        }

        info!("Loaded templates: {:?}", set.names());
        Ok(set)
    }

    /// Read and parse a template file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, TemplateError> {
        let path = path.as_ref();
        info!("Loading templates from: {:?}", path);
        let source = std::fs::read_to_string(path)
            .map_err(|e| TemplateError::Load(format!("cannot read {:?}: {}", path, e)))?;
        Self::load(&source)
    }

    /// Templates bundled with the crate
    pub fn builtin() -> Result<Self, TemplateError> {
        Self::load(BUILTIN_TEMPLATES)
    }

    pub fn names(&self) -> Vec<&str> {
        self.templates.keys().map(String::as_str).collect()
    }

    pub fn get(&self, name: &str) -> Option<&PromptTemplate> {
        self.templates.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    fn template(&self, name: &str) -> Result<&PromptTemplate, TemplateError> {
        self.templates.get(name).ok_or_else(|| TemplateError::NotFound {
            name: name.to_string(),
            available: self.templates.keys().cloned().collect(),
        })
    }

    /// Render a template against a nested variable map
    pub fn render(&self, name: &str, variables: &Value) -> Result<String, TemplateError> {
        let flat = flatten_variables(variables, DEFAULT_SEPARATOR);
        self.render_flat(name, &flat)
    }

    /// Render a template against already flattened variables
    pub fn render_flat(&self, name: &str, variables: &FlatVariables) -> Result<String, TemplateError> {
        debug!("Generating prompt for template: {}", name);
        let template = self.template(name)?;
        let prompt = template.fill(variables)?;

        if log::log_enabled!(log::Level::Debug) {
            let unused: Vec<&str> = variables
                .keys()
                .filter(|key| !template.required.contains(*key))
                .map(String::as_str)
                .collect();
            if !unused.is_empty() {
                debug!("Template '{}' ignored variables: {}", name, unused.join(", "));
            }
        }

        Ok(prompt)
    }

    /// Render and check the result against the template's own limits.
    ///
    /// Every placeholder is resolved by rendering, so braces left in the
    /// prompt come from escapes or variable values and are kept.
    pub fn render_validated(&self, name: &str, variables: &Value) -> Result<String, TemplateError> {
        let prompt = self.render(name, variables)?;
        let max_length = self.template(name)?.max_length;
        check_rendered(&prompt, max_length).map_err(|reason| TemplateError::InvalidPrompt {
            name: name.to_string(),
            reason,
        })?;
        Ok(prompt)
    }

    /// Placeholder names a template needs, in order of first appearance
    pub fn required_variables(&self, name: &str) -> Result<Vec<String>, TemplateError> {
        Ok(self.template(name)?.required.clone())
    }

    /// Whether a rendered prompt is usable
    pub fn validate(prompt: &str, max_length: Option<usize>) -> bool {
        !UNRESOLVED_PLACEHOLDER.is_match(prompt) && check_rendered(prompt, max_length).is_ok()
    }

    /// Add or replace a template
    pub fn add_template(&mut self, name: &str, template: &str, max_length: Option<usize>) {
        let compiled = PromptTemplate::compile(template, max_length, &self.components);
        if self.templates.insert(name.to_string(), compiled).is_some() {
            debug!("Replaced template: {}", name);
        } else {
            debug!("Added new template: {}", name);
        }
    }

    /// Remove a template, returning whether it existed
    pub fn remove_template(&mut self, name: &str) -> bool {
        if self.templates.remove(name).is_some() {
            info!("Removed template: {}", name);
            true
        } else {
            warn!("Attempted to remove non-existent template: {}", name);
            false
        }
    }

    /// Register a reusable component referenced as `{component:name}`
    pub fn add_component(&mut self, name: &str, text: &str) {
        self.components.insert(name.to_string(), text.to_string());
        self.recompile();
    }

    pub fn remove_component(&mut self, name: &str) -> bool {
        let removed = self.components.remove(name).is_some();
        if removed {
            self.recompile();
        }
        removed
    }

    fn recompile(&mut self) {
        let components = &self.components;
        for template in self.templates.values_mut() {
            *template = PromptTemplate::compile(&template.source, template.max_length, components);
        }
    }
}

fn expand_components(source: &str, components: &BTreeMap<String, String>) -> String {
    let mut expanded = source.to_string();
    for (name, text) in components {
        let marker = format!("{{component:{}}}", name);
        if expanded.contains(&marker) {
            expanded = expanded.replace(&marker, text);
        }
    }
    expanded
}

fn parse_segments(body: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut rest = body;

    while !rest.is_empty() {
        if let Some(after) = rest.strip_prefix("{{") {
            literal.push('{');
            rest = after;
        } else if let Some(after) = rest.strip_prefix("}}") {
            literal.push('}');
            rest = after;
        } else if let Some(captures) = PLACEHOLDER_PREFIX.captures(rest) {
            if !literal.is_empty() {
                segments.push(Segment::Literal(std::mem::take(&mut literal)));
            }
            segments.push(Segment::Placeholder(captures[1].to_string()));
            rest = &rest[captures[0].len()..];
        } else {
            let mut chars = rest.chars();
            if let Some(ch) = chars.next() {
                literal.push(ch);
            }
            rest = chars.as_str();
        }
    }

    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }
    segments
}

fn check_rendered(prompt: &str, max_length: Option<usize>) -> Result<(), String> {
    if prompt.trim().is_empty() {
        return Err("prompt is empty".to_string());
    }
    if let Some(limit) = max_length {
        let length = prompt.chars().count();
        if length > limit {
            return Err(format!("prompt has {} characters, limit is {}", length, limit));
        }
    }
    Ok(())
}
