/*!
 * # Reelsmith - batch short-video content generation
 *
 * A Rust library that turns content requests into stored video scripts and media.
 *
 * ## Features
 *
 * - Prompt templates with `{placeholder}` substitution over flattened request data
 * - Script generation through chat models:
 *   - OpenAI API
 *   - Anthropic API
 * - Optional image, voice, music and video stages per request
 * - Persistence in SQLite or in memory
 * - Bounded concurrency with shared, monotonic batch progress
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `app_controller`: Main application controller
 * - `content`: Requests, generated scripts and stored content records
 * - `prompts`: Template engine and variable flattening
 * - `pipeline`: Batch generation:
 *   - `pipeline::progress`: Progress tracking across the batch
 *   - `pipeline::executor`: Per-request stage state machine
 *   - `pipeline::orchestrator`: Concurrent dispatch and result collection
 * - `providers`: Script and media collaborators:
 *   - `providers::openai`: OpenAI API client
 *   - `providers::anthropic`: Anthropic API client
 *   - `providers::media`: HTTP and placeholder media services
 * - `database`: Content stores
 * - `errors`: Custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod app_controller;
pub mod content;
pub mod database;
pub mod errors;
pub mod pipeline;
pub mod prompts;
pub mod providers;

// Re-export main types for easier usage
pub use app_config::Config;
pub use content::{ContentRecord, ContentRequest, ContentStatus, ServiceKind};
pub use database::{ContentStore, MemoryStore, Repository};
pub use errors::{AppError, GenerationError, PersistenceError, ProviderError, StageError, TemplateError};
pub use pipeline::{BatchReport, ContentPipeline, ProgressTracker};
pub use prompts::TemplateSet;
