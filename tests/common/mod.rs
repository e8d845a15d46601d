// tests/common/mod.rs
#![allow(dead_code)]

pub mod fixtures;
pub mod pdf_assertions;

use lopdf::Document;

/// A generated document parsed back for inspection.
pub struct GeneratedPdf {
    pub bytes: Vec<u8>,
    pub doc: Document,
}

impl GeneratedPdf {
    pub fn load(bytes: Vec<u8>) -> Self {
        let doc = Document::load_mem(&bytes).expect("generated PDF should parse");
        GeneratedPdf { bytes, doc }
    }

    pub fn page_count(&self) -> usize {
        self.doc.get_pages().len()
    }
}
