// src/pdf/mod.rs
//! PDF/A assembly: rendered HTML or an uploaded image in, validated
//! document bytes out.

pub mod fonts;
pub mod image;
pub mod layout;
pub mod markup;
pub mod writer;
pub mod xmp;

use crate::environment::Environment;
use crate::error::PipelineError;
use crate::validation::{self, PdfAFlavor};
use chrono::Utc;
use fonts::FontLibrary;
use log::{error, info};
use std::sync::Arc;
use std::time::Instant;

/// Owns the parsed font set and the environment snapshot it was built
/// from. Rebuilt wholesale when the environment reloads.
pub struct PdfAssembler {
    env: Arc<Environment>,
    fonts: FontLibrary,
    flavor: PdfAFlavor,
}

impl PdfAssembler {
    pub fn new(env: Arc<Environment>) -> Result<Self, PipelineError> {
        let fonts = FontLibrary::load(&env)?;
        Ok(PdfAssembler {
            env,
            fonts,
            flavor: PdfAFlavor::A2U,
        })
    }

    /// Converts rendered HTML into a validated PDF/A document. The title
    /// lands in both the info dictionary and the XMP dc:title.
    pub fn assemble(&self, html: &str, title: &str) -> Result<Vec<u8>, PipelineError> {
        let start = Instant::now();
        let blocks = markup::parse_blocks(html)?;
        let pages = layout::layout_blocks(&blocks, &self.fonts);
        let bytes = writer::write_text_document(
            &pages,
            &self.fonts,
            &self.env,
            title,
            self.flavor,
            Utc::now(),
        )?;

        let result = validation::validate(&bytes, self.flavor);
        if !result.is_compliant() {
            for failure in &result.failures {
                error!(
                    "Validation failure {} at {}: {}",
                    failure.rule_id, failure.location, failure.message
                );
            }
            return Err(PipelineError::NonCompliant { failures: result.failures });
        }

        info!(
            "Assembled {} page(s), {} bytes in {:?}",
            pages.len(),
            bytes.len(),
            start.elapsed()
        );
        Ok(bytes)
    }

    /// Wraps an uploaded PNG or JPEG in a single-page document. This path
    /// carries the same document furniture but skips the validation gate.
    pub fn assemble_from_image(&self, image_bytes: &[u8], title: &str) -> Result<Vec<u8>, PipelineError> {
        let start = Instant::now();
        let bytes =
            image::write_image_document(image_bytes, &self.env, title, self.flavor, Utc::now())?;
        info!("Assembled image document, {} bytes in {:?}", bytes.len(), start.elapsed());
        Ok(bytes)
    }
}
