//! Resume Reviewer - rubric-based resume analysis backed by a local LLM
//!
//! Accepts resume text over HTTP, prompts an Ollama-compatible model server
//! for a structured rubric evaluation, validates the returned JSON and
//! caches validated results by content hash.

pub mod analysis;
pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod pipeline;
pub mod telemetry;
pub mod upstream;
pub mod warmup;
