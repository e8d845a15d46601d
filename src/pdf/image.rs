// src/pdf/image.rs
//! Wraps a PNG or JPEG upload in a single-page A4 document.
//!
//! Landscape images are rotated to portrait before placement. Scaling only
//! happens at placement time via the transformation matrix; pixels are
//! never resampled. The decoded image is re-encoded as baseline JPEG so the
//! page can reference it with a DCTDecode filter regardless of input format.

use crate::environment::Environment;
use crate::error::PipelineError;
use crate::pdf::layout::{MARGIN, PAGE_HEIGHT, PAGE_WIDTH};
use crate::pdf::writer::DocumentShell;
use crate::validation::PdfAFlavor;
use chrono::{DateTime, Utc};
use image::codecs::jpeg::JpegEncoder;
use image::{ExtendedColorType, GenericImageView};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Stream};

const JPEG_QUALITY: u8 = 85;

pub fn write_image_document(
    image_bytes: &[u8],
    env: &Environment,
    title: &str,
    flavor: PdfAFlavor,
    now: DateTime<Utc>,
) -> Result<Vec<u8>, PipelineError> {
    let decoded = image::load_from_memory(image_bytes)?;
    let (w, h) = decoded.dimensions();
    let oriented = if w > h { decoded.rotate90() } else { decoded };

    let rgb = oriented.to_rgb8();
    let (width, height) = rgb.dimensions();
    let mut jpeg = Vec::new();
    JpegEncoder::new_with_quality(&mut jpeg, JPEG_QUALITY).encode(
        rgb.as_raw(),
        width,
        height,
        ExtendedColorType::Rgb8,
    )?;

    let mut shell = DocumentShell::new();
    let xobject_id = shell.doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => width as i64,
            "Height" => height as i64,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
            "Filter" => "DCTDecode",
        },
        jpeg,
    ));
    let resources_id = shell.doc.add_object(dictionary! {
        "XObject" => dictionary! { "Im1" => xobject_id },
    });

    let (scaled_w, scaled_h) = fit_to_page(width as f32, height as f32);
    let x = (PAGE_WIDTH - scaled_w) / 2.0;
    let y = PAGE_HEIGHT - MARGIN - scaled_h;
    let content = Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    scaled_w.into(),
                    0.into(),
                    0.into(),
                    scaled_h.into(),
                    x.into(),
                    y.into(),
                ],
            ),
            Operation::new("Do", vec![lopdf::Object::Name(b"Im1".to_vec())]),
            Operation::new("Q", vec![]),
        ],
    };
    let encoded = content.encode().map_err(|e| PipelineError::Pdf(e.to_string()))?;
    let content_id = shell.doc.add_object(Stream::new(dictionary! {}, encoded));
    shell.add_page(dictionary! {
        "Contents" => content_id,
        "Resources" => resources_id,
    });

    shell.finish(env, title, flavor, now)
}

const PRINTABLE_WIDTH: f32 = PAGE_WIDTH - 2.0 * MARGIN;
const PRINTABLE_HEIGHT: f32 = PAGE_HEIGHT - 2.0 * MARGIN;

/// Clamps to the printable width first, then height, never upscaling.
fn fit_to_page(width: f32, height: f32) -> (f32, f32) {
    let mut scale = (PRINTABLE_WIDTH / width).min(1.0);
    if height * scale > PRINTABLE_HEIGHT {
        scale = PRINTABLE_HEIGHT / height;
    }
    (width * scale, height * scale)
}
