/*!
 * Prompt templating for script generation.
 *
 * This module provides:
 * - Loading of named templates from YAML/JSON sources
 * - Flattening of nested request variables into placeholder keys
 * - Rendering with strict missing-variable checks and prompt validation
 */

pub mod flatten;
pub mod templates;

// Re-export main types
pub use flatten::{flatten_variables, FlatVariables, DEFAULT_SEPARATOR};
pub use templates::{PromptTemplate, TemplateSet};
