// src/error.rs
//! Unified error type for the whole render-to-PDF/A pipeline.

use crate::validation::Assertion;
use thiserror::Error;

/// The main error enum for all high-level operations within the service.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization/deserialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Template compilation error: {0}")]
    Template(#[from] handlebars::TemplateError),

    #[error("Malformed input: {0}")]
    Malformed(String),

    #[error("Markup parsing error: {0}")]
    Markup(String),

    #[error("Image decoding error: {0}")]
    Image(#[from] image::ImageError),

    #[error("PDF processing error: {0}")]
    Pdf(String),

    #[error("Generated document failed PDF/A validation with {} assertion(s)", failures.len())]
    NonCompliant { failures: Vec<Assertion> },
}

impl From<lopdf::Error> for PipelineError {
    fn from(e: lopdf::Error) -> Self {
        PipelineError::Pdf(e.to_string())
    }
}

impl From<handlebars::RenderError> for PipelineError {
    fn from(e: handlebars::RenderError) -> Self {
        // Render failures surface at request time and are caused by the
        // supplied payload not satisfying a helper precondition.
        PipelineError::Malformed(e.to_string())
    }
}
