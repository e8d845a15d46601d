// src/pdf/fonts.rs
//! Font loading, WinAnsi text encoding and width metrics.
//!
//! Text is written into content streams as simple TrueType fonts with
//! WinAnsiEncoding, so every string must be mapped from Unicode to the
//! WinAnsi byte range. Advance widths are extracted with `ttf-parser` and
//! kept in the 1000-units-per-em glyph space PDF expects.

use crate::environment::{Environment, FontDescriptor, FontStyle};
use crate::error::PipelineError;

/// WinAnsi code points in the 0x80..0x9F window that differ from Latin-1.
const WINANSI_EXTRAS: [(char, u8); 27] = [
    ('\u{20ac}', 0x80),
    ('\u{201a}', 0x82),
    ('\u{0192}', 0x83),
    ('\u{201e}', 0x84),
    ('\u{2026}', 0x85),
    ('\u{2020}', 0x86),
    ('\u{2021}', 0x87),
    ('\u{02c6}', 0x88),
    ('\u{2030}', 0x89),
    ('\u{0160}', 0x8a),
    ('\u{2039}', 0x8b),
    ('\u{0152}', 0x8c),
    ('\u{017d}', 0x8e),
    ('\u{2018}', 0x91),
    ('\u{2019}', 0x92),
    ('\u{201c}', 0x93),
    ('\u{201d}', 0x94),
    ('\u{2022}', 0x95),
    ('\u{2013}', 0x96),
    ('\u{2014}', 0x97),
    ('\u{02dc}', 0x98),
    ('\u{2122}', 0x99),
    ('\u{0161}', 0x9a),
    ('\u{203a}', 0x9b),
    ('\u{0153}', 0x9c),
    ('\u{017e}', 0x9e),
    ('\u{0178}', 0x9f),
];

pub fn winansi_byte(c: char) -> Option<u8> {
    match c as u32 {
        code @ 0x20..=0x7e => Some(code as u8),
        code @ 0xa0..=0xff => Some(code as u8),
        _ => WINANSI_EXTRAS.iter().find(|(ch, _)| *ch == c).map(|(_, b)| *b),
    }
}

pub fn winansi_char(byte: u8) -> Option<char> {
    match byte {
        0x20..=0x7e => Some(byte as char),
        0xa0..=0xff => char::from_u32(byte as u32),
        _ => WINANSI_EXTRAS.iter().find(|(_, b)| *b == byte).map(|(c, _)| *c),
    }
}

/// Encodes a line of text for a Tj operand. Characters outside WinAnsi are
/// substituted rather than dropped so widths stay consistent with layout.
pub fn encode_winansi(text: &str) -> Vec<u8> {
    text.chars().map(|c| winansi_byte(c).unwrap_or(b'?')).collect()
}

/// A configured font with its parsed metrics, scaled to 1000 units per em.
pub struct LoadedFont {
    pub descriptor: FontDescriptor,
    pub ascent: f32,
    pub descent: f32,
    pub cap_height: f32,
    pub bbox: [f32; 4],
    advances: [f32; 224],
}

impl LoadedFont {
    pub fn parse(descriptor: FontDescriptor) -> Result<Self, PipelineError> {
        let face = ttf_parser::Face::parse(&descriptor.data, 0).map_err(|e| {
            PipelineError::Config(format!("could not parse font '{}': {}", descriptor.family, e))
        })?;
        let scale = 1000.0 / face.units_per_em() as f32;
        let ascent = face.ascender() as f32 * scale;
        let descent = face.descender() as f32 * scale;
        let cap_height = face
            .capital_height()
            .map(|h| h as f32 * scale)
            .unwrap_or(ascent * 0.7);
        let rect = face.global_bounding_box();
        let bbox = [
            rect.x_min as f32 * scale,
            rect.y_min as f32 * scale,
            rect.x_max as f32 * scale,
            rect.y_max as f32 * scale,
        ];

        let mut advances = [0f32; 224];
        for byte in 0x20..=0xffu16 {
            let byte = byte as u8;
            let advance = winansi_char(byte)
                .and_then(|c| face.glyph_index(c))
                .and_then(|gid| face.glyph_hor_advance(gid));
            if let Some(advance) = advance {
                advances[(byte - 0x20) as usize] = advance as f32 * scale;
            }
        }
        // No-break space falls back to the regular space advance when the
        // face has no dedicated glyph for it.
        if advances[(0xa0 - 0x20) as usize] == 0.0 {
            advances[(0xa0 - 0x20) as usize] = advances[0];
        }

        Ok(LoadedFont {
            descriptor,
            ascent,
            descent,
            cap_height,
            bbox,
            advances,
        })
    }

    fn advance(&self, byte: u8) -> f32 {
        if byte < 0x20 {
            return 0.0;
        }
        let advance = self.advances[(byte - 0x20) as usize];
        if advance == 0.0 {
            // Unmapped bytes render as '?'.
            self.advances[(b'?' - 0x20) as usize]
        } else {
            advance
        }
    }

    /// Width in points of the text at the given size.
    pub fn text_width(&self, text: &str, size: f32) -> f32 {
        let total: f32 = text
            .chars()
            .map(|c| self.advance(winansi_byte(c).unwrap_or(b'?')))
            .sum();
        total * size / 1000.0
    }

    /// /Widths entries for the WinAnsi byte range 32..=255.
    pub fn widths_array(&self) -> Vec<i64> {
        self.advances.iter().map(|w| w.round() as i64).collect()
    }
}

/// Every loaded font, with style-based selection for the layout engine.
pub struct FontLibrary {
    fonts: Vec<LoadedFont>,
}

impl FontLibrary {
    pub fn load(env: &Environment) -> Result<Self, PipelineError> {
        if env.fonts.is_empty() {
            return Err(PipelineError::Config(
                "no fonts configured; at least one font is required".to_string(),
            ));
        }
        let fonts = env
            .fonts
            .iter()
            .map(|d| LoadedFont::parse(d.clone()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(FontLibrary { fonts })
    }

    pub fn fonts(&self) -> &[LoadedFont] {
        &self.fonts
    }

    /// Index of the best match for the requested shape. Style match beats
    /// weight match; the first configured font is the fallback.
    pub fn select(&self, bold: bool, italic: bool) -> usize {
        let score = |font: &LoadedFont| {
            let style_match = (font.descriptor.style == FontStyle::Italic) == italic;
            let weight_match = (font.descriptor.weight >= 600) == bold;
            (style_match as u8) * 2 + weight_match as u8
        };
        self.fonts
            .iter()
            .enumerate()
            .max_by_key(|(i, f)| (score(f), std::cmp::Reverse(*i)))
            .map(|(i, _)| i)
            .unwrap_or(0)
    }

    pub fn get(&self, index: usize) -> &LoadedFont {
        &self.fonts[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn winansi_covers_norwegian_letters() {
        assert_eq!(winansi_byte('æ'), Some(0xe6));
        assert_eq!(winansi_byte('Ø'), Some(0xd8));
        assert_eq!(winansi_byte('å'), Some(0xe5));
        assert_eq!(winansi_byte('\u{a0}'), Some(0xa0));
        assert_eq!(winansi_byte('€'), Some(0x80));
        assert_eq!(winansi_byte('→'), None);
    }

    #[test]
    fn winansi_round_trips_printable_range() {
        for byte in 0x20..=0x7eu8 {
            assert_eq!(winansi_byte(winansi_char(byte).unwrap()), Some(byte));
        }
        for (c, b) in WINANSI_EXTRAS {
            assert_eq!(winansi_char(b), Some(c));
        }
    }

    #[test]
    fn unmappable_characters_are_substituted() {
        assert_eq!(encode_winansi("a→b"), b"a?b".to_vec());
    }
}
