// src/lib.rs
//! pdfgen: renders JSON payloads through named Handlebars templates into
//! validated PDF/A documents, served over HTTP.

pub mod config;
pub mod environment;
pub mod error;
pub mod pdf;
pub mod renderer;
pub mod service;
pub mod template;
pub mod validation;

pub use config::Config;
pub use environment::Environment;
pub use error::PipelineError;
pub use pdf::PdfAssembler;
pub use renderer::render_html;
pub use template::{TemplateKey, TemplateRegistry};
pub use validation::{validate, Assertion, PdfAFlavor, ValidationResult};
