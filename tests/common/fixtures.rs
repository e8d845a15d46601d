// tests/common/fixtures.rs
//! Deterministic fixtures: a minimal TrueType font built in memory and an
//! environment snapshot wired up with it, so tests never depend on binary
//! assets in the repository.

use pdfgen::environment::{Environment, FontDescriptor, FontStyle};
use std::sync::Arc;

const UNITS_PER_EM: u16 = 1000;
const ADVANCE: u16 = 500;
const FIRST_CHAR: u16 = 0x20;
const LAST_CHAR: u16 = 0x7e;

/// Builds a syntactically valid TrueType font covering the ASCII printable
/// range with a constant advance width. There are no outlines; only the
/// tables the metrics layer reads (head, hhea, maxp, cmap, hmtx) exist.
pub fn synthetic_font() -> Vec<u8> {
    // Glyph 0 is .notdef; chars map to glyphs 1..=95 via a single segment.
    let num_glyphs = (LAST_CHAR - FIRST_CHAR + 2) as u16;

    let tables: Vec<([u8; 4], Vec<u8>)> = vec![
        (*b"cmap", build_cmap()),
        (*b"head", build_head()),
        (*b"hhea", build_hhea(num_glyphs)),
        (*b"hmtx", build_hmtx(num_glyphs)),
        (*b"maxp", build_maxp(num_glyphs)),
    ];

    let num_tables = tables.len() as u16;
    let mut font = Vec::new();
    push_u32(&mut font, 0x0001_0000);
    push_u16(&mut font, num_tables);
    push_u16(&mut font, 64); // searchRange
    push_u16(&mut font, 2); // entrySelector
    push_u16(&mut font, 16); // rangeShift

    let mut offset = 12 + 16 * tables.len() as u32;
    let mut body = Vec::new();
    for (tag, data) in &tables {
        font.extend_from_slice(tag);
        push_u32(&mut font, 0); // checksum, not verified by the parser
        push_u32(&mut font, offset);
        push_u32(&mut font, data.len() as u32);
        let padded = (data.len() + 3) & !3;
        offset += padded as u32;
        body.extend_from_slice(data);
        body.resize(body.len() + (padded - data.len()), 0);
    }
    font.extend_from_slice(&body);
    font
}

fn build_head() -> Vec<u8> {
    let mut t = Vec::new();
    push_u32(&mut t, 0x0001_0000); // version
    push_u32(&mut t, 0x0001_0000); // fontRevision
    push_u32(&mut t, 0); // checkSumAdjustment
    push_u32(&mut t, 0x5f0f_3cf5); // magicNumber
    push_u16(&mut t, 0); // flags
    push_u16(&mut t, UNITS_PER_EM);
    push_u64(&mut t, 0); // created
    push_u64(&mut t, 0); // modified
    push_i16(&mut t, 0); // xMin
    push_i16(&mut t, -200); // yMin
    push_i16(&mut t, ADVANCE as i16); // xMax
    push_i16(&mut t, 800); // yMax
    push_u16(&mut t, 0); // macStyle
    push_u16(&mut t, 8); // lowestRecPPEM
    push_i16(&mut t, 2); // fontDirectionHint
    push_i16(&mut t, 0); // indexToLocFormat
    push_i16(&mut t, 0); // glyphDataFormat
    t
}

fn build_hhea(num_glyphs: u16) -> Vec<u8> {
    let mut t = Vec::new();
    push_u32(&mut t, 0x0001_0000); // version
    push_i16(&mut t, 800); // ascender
    push_i16(&mut t, -200); // descender
    push_i16(&mut t, 0); // lineGap
    push_u16(&mut t, ADVANCE); // advanceWidthMax
    push_i16(&mut t, 0); // minLeftSideBearing
    push_i16(&mut t, 0); // minRightSideBearing
    push_i16(&mut t, ADVANCE as i16); // xMaxExtent
    push_i16(&mut t, 1); // caretSlopeRise
    push_i16(&mut t, 0); // caretSlopeRun
    push_i16(&mut t, 0); // caretOffset
    push_i16(&mut t, 0);
    push_i16(&mut t, 0);
    push_i16(&mut t, 0);
    push_i16(&mut t, 0);
    push_i16(&mut t, 0); // metricDataFormat
    push_u16(&mut t, num_glyphs); // numberOfHMetrics
    t
}

fn build_maxp(num_glyphs: u16) -> Vec<u8> {
    let mut t = Vec::new();
    push_u32(&mut t, 0x0000_5000); // version 0.5
    push_u16(&mut t, num_glyphs);
    t
}

fn build_hmtx(num_glyphs: u16) -> Vec<u8> {
    let mut t = Vec::new();
    for _ in 0..num_glyphs {
        push_u16(&mut t, ADVANCE);
        push_i16(&mut t, 0);
    }
    t
}

fn build_cmap() -> Vec<u8> {
    // Format 4 subtable with one live segment and the required terminator.
    let mut sub = Vec::new();
    push_u16(&mut sub, 4); // format
    push_u16(&mut sub, 32); // length
    push_u16(&mut sub, 0); // language
    push_u16(&mut sub, 4); // segCountX2
    push_u16(&mut sub, 4); // searchRange
    push_u16(&mut sub, 1); // entrySelector
    push_u16(&mut sub, 0); // rangeShift
    push_u16(&mut sub, LAST_CHAR); // endCode
    push_u16(&mut sub, 0xffff);
    push_u16(&mut sub, 0); // reservedPad
    push_u16(&mut sub, FIRST_CHAR); // startCode
    push_u16(&mut sub, 0xffff);
    push_u16(&mut sub, (1i32 - FIRST_CHAR as i32) as u16); // idDelta
    push_u16(&mut sub, 1);
    push_u16(&mut sub, 0); // idRangeOffset
    push_u16(&mut sub, 0);

    let mut t = Vec::new();
    push_u16(&mut t, 0); // version
    push_u16(&mut t, 1); // numTables
    push_u16(&mut t, 3); // platformID: Windows
    push_u16(&mut t, 1); // encodingID: Unicode BMP
    push_u32(&mut t, 12); // subtable offset
    t.extend_from_slice(&sub);
    t
}

fn push_u16(buf: &mut Vec<u8>, v: u16) {
    buf.extend_from_slice(&v.to_be_bytes());
}

fn push_i16(buf: &mut Vec<u8>, v: i16) {
    buf.extend_from_slice(&v.to_be_bytes());
}

fn push_u32(buf: &mut Vec<u8>, v: u32) {
    buf.extend_from_slice(&v.to_be_bytes());
}

fn push_u64(buf: &mut Vec<u8>, v: u64) {
    buf.extend_from_slice(&v.to_be_bytes());
}

/// An environment with one regular and one bold synthetic font and a
/// placeholder ICC profile, enough for the assembler and the validator.
pub fn test_environment() -> Arc<Environment> {
    let data = Arc::new(synthetic_font());
    let mut env = Environment::default();
    env.color_profile = vec![0u8; 128];
    env.fonts = vec![
        FontDescriptor {
            family: "Test Sans".to_string(),
            weight: 400,
            style: FontStyle::Normal,
            subset: false,
            data: Arc::clone(&data),
        },
        FontDescriptor {
            family: "Test Sans".to_string(),
            weight: 700,
            style: FontStyle::Normal,
            subset: false,
            data,
        },
    ];
    Arc::new(env)
}

/// A landscape JPEG generated in memory.
pub fn landscape_jpeg(width: u32, height: u32) -> Vec<u8> {
    assert!(width > height);
    let img = image::RgbImage::from_pixel(width, height, image::Rgb([180, 90, 40]));
    let mut bytes = Vec::new();
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Jpeg)
        .expect("in-memory JPEG encoding");
    bytes
}
