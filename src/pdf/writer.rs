// src/pdf/writer.rs
//! Low-level document assembly on top of `lopdf`.
//!
//! [`DocumentShell`] owns the parts every document shares regardless of how
//! its pages were produced: the page tree, the sRGB output intent, the XMP
//! metadata stream, the document info dictionary and the catalog entries
//! PDF/A requires. Content producers add pages, then call `finish`.

use crate::environment::{Environment, FontStyle};
use crate::error::PipelineError;
use crate::pdf::fonts::{encode_winansi, FontLibrary};
use crate::pdf::layout::{PageLayout, PAGE_HEIGHT, PAGE_WIDTH};
use crate::pdf::xmp;
use crate::validation::PdfAFlavor;
use chrono::{DateTime, Utc};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use std::io::Cursor;

const OUTPUT_CONDITION: &str = "sRGB IEC61966-2.1";
const REGISTRY_NAME: &str = "http://www.color.org";
const DOCUMENT_LANGUAGE: &str = "nb-NO";

pub(crate) struct DocumentShell {
    pub doc: Document,
    pages_id: ObjectId,
    page_ids: Vec<ObjectId>,
}

impl DocumentShell {
    pub fn new() -> Self {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();
        DocumentShell {
            doc,
            pages_id,
            page_ids: Vec::new(),
        }
    }

    /// Adds a page whose dictionary lacks Type/Parent/MediaBox; those are
    /// filled in here so every page agrees on the A4 geometry.
    pub fn add_page(&mut self, mut page: Dictionary) {
        page.set("Type", Object::Name(b"Page".to_vec()));
        page.set("Parent", self.pages_id);
        page.set(
            "MediaBox",
            vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
        );
        let id = self.doc.add_object(page);
        self.page_ids.push(id);
    }

    /// Attaches the shared PDF/A furniture and serializes the document.
    pub fn finish(
        mut self,
        env: &Environment,
        title: &str,
        flavor: PdfAFlavor,
        now: DateTime<Utc>,
    ) -> Result<Vec<u8>, PipelineError> {
        let kids: Vec<Object> = self.page_ids.iter().map(|id| Object::Reference(*id)).collect();
        let count = self.page_ids.len() as i64;
        self.doc.objects.insert(
            self.pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );

        let icc_id = self.doc.add_object(Stream::new(
            dictionary! { "N" => 3 },
            env.color_profile.clone(),
        ));
        let intent_id = self.doc.add_object(dictionary! {
            "Type" => "OutputIntent",
            "S" => "GTS_PDFA1",
            "OutputConditionIdentifier" => Object::string_literal(OUTPUT_CONDITION),
            "OutputCondition" => Object::string_literal(OUTPUT_CONDITION),
            "Info" => Object::string_literal(OUTPUT_CONDITION),
            "RegistryName" => Object::string_literal(REGISTRY_NAME),
            "DestOutputProfile" => icc_id,
        });

        // The metadata stream stays unfiltered so validators can read the
        // packet without decoding.
        let metadata_id = self.doc.add_object(Stream::new(
            dictionary! { "Type" => "Metadata", "Subtype" => "XML" },
            xmp::build_packet(title, flavor, now),
        ));

        let struct_tree_id = self
            .doc
            .add_object(dictionary! { "Type" => "StructTreeRoot" });

        let catalog_id = self.doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
            "Metadata" => metadata_id,
            "OutputIntents" => vec![Object::Reference(intent_id)],
            "Lang" => Object::string_literal(DOCUMENT_LANGUAGE),
            "MarkInfo" => dictionary! { "Marked" => true },
            "StructTreeRoot" => struct_tree_id,
            "ViewerPreferences" => dictionary! { "DisplayDocTitle" => true },
        });

        let stamp = format!("D:{}+00'00'", now.format("%Y%m%d%H%M%S"));
        let info_id = self.doc.add_object(dictionary! {
            "Title" => Object::string_literal(title),
            "Creator" => Object::string_literal(xmp::DOCUMENT_CREATOR),
            "Producer" => Object::string_literal(xmp::DOCUMENT_CREATOR),
            "CreationDate" => Object::string_literal(stamp.clone()),
            "ModDate" => Object::string_literal(stamp),
        });

        self.doc.trailer.set("Root", catalog_id);
        self.doc.trailer.set("Info", info_id);

        let mut bytes = Vec::new();
        self.doc.save_to(&mut Cursor::new(&mut bytes))?;
        Ok(bytes)
    }
}

/// Serializes laid-out text pages into a complete document with every
/// configured font embedded as a WinAnsi-encoded TrueType program.
pub fn write_text_document(
    pages: &[PageLayout],
    fonts: &FontLibrary,
    env: &Environment,
    title: &str,
    flavor: PdfAFlavor,
    now: DateTime<Utc>,
) -> Result<Vec<u8>, PipelineError> {
    let mut shell = DocumentShell::new();

    let mut font_dict = Dictionary::new();
    for (index, font) in fonts.fonts().iter().enumerate() {
        let id = embed_font(&mut shell.doc, font);
        font_dict.set(font_key(index), id);
    }
    let resources_id = shell.doc.add_object(dictionary! { "Font" => font_dict });

    for page in pages {
        let content = page_content(page);
        let encoded = content
            .encode()
            .map_err(|e| PipelineError::Pdf(e.to_string()))?;
        let content_id = shell.doc.add_object(Stream::new(dictionary! {}, encoded));
        shell.add_page(dictionary! {
            "Contents" => content_id,
            "Resources" => resources_id,
        });
    }

    shell.finish(env, title, flavor, now)
}

fn font_key(index: usize) -> String {
    format!("F{}", index + 1)
}

fn page_content(page: &PageLayout) -> Content {
    let mut operations = Vec::with_capacity(page.runs.len() * 5);
    for run in &page.runs {
        operations.push(Operation::new("BT", vec![]));
        operations.push(Operation::new(
            "Tf",
            vec![
                Object::Name(font_key(run.font).into_bytes()),
                run.size.into(),
            ],
        ));
        operations.push(Operation::new("Td", vec![run.x.into(), run.baseline.into()]));
        operations.push(Operation::new(
            "Tj",
            vec![Object::String(encode_winansi(&run.text), StringFormat::Literal)],
        ));
        operations.push(Operation::new("ET", vec![]));
    }
    Content { operations }
}

fn embed_font(doc: &mut Document, font: &crate::pdf::fonts::LoadedFont) -> ObjectId {
    let descriptor = &font.descriptor;
    let base_font = postscript_name(descriptor.family.as_str(), descriptor.weight, descriptor.style);

    let font_file_id = doc.add_object(Stream::new(
        dictionary! { "Length1" => descriptor.data.len() as i64 },
        descriptor.data.as_ref().clone(),
    ));

    let italic_angle = if descriptor.style == FontStyle::Italic { -12.0 } else { 0.0 };
    let descriptor_id = doc.add_object(dictionary! {
        "Type" => "FontDescriptor",
        "FontName" => Object::Name(base_font.clone().into_bytes()),
        "Flags" => 32,
        "FontBBox" => font.bbox.iter().map(|v| Object::Real(*v)).collect::<Vec<Object>>(),
        "ItalicAngle" => italic_angle,
        "Ascent" => font.ascent,
        "Descent" => font.descent,
        "CapHeight" => font.cap_height,
        "StemV" => 80,
        "FontFile2" => font_file_id,
    });

    doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "TrueType",
        "BaseFont" => Object::Name(base_font.into_bytes()),
        "FirstChar" => 32,
        "LastChar" => 255,
        "Widths" => font.widths_array().into_iter().map(Object::Integer).collect::<Vec<Object>>(),
        "Encoding" => "WinAnsiEncoding",
        "FontDescriptor" => descriptor_id,
    })
}

fn postscript_name(family: &str, weight: u16, style: FontStyle) -> String {
    let base: String = family.chars().filter(|c| !c.is_whitespace()).collect();
    let suffix = match (weight >= 600, style == FontStyle::Italic) {
        (true, true) => "-BoldItalic",
        (true, false) => "-Bold",
        (false, true) => "-Italic",
        (false, false) => "",
    };
    format!("{}{}", base, suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn postscript_names_drop_spaces() {
        assert_eq!(postscript_name("Source Sans Pro", 400, FontStyle::Normal), "SourceSansPro");
        assert_eq!(postscript_name("Source Sans Pro", 700, FontStyle::Normal), "SourceSansPro-Bold");
        assert_eq!(postscript_name("X", 400, FontStyle::Italic), "X-Italic");
    }
}
