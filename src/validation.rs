// src/validation.rs
//! Post-generation PDF/A compliance checks.
//!
//! Every finished document is re-parsed from its serialized bytes and
//! checked against a fixed rule set. A document is compliant exactly when
//! no assertion failed. Validation itself never errors: anything that
//! prevents a check from running is reported as a failed assertion.

use lopdf::{Document, Object};
use serde::Serialize;

/// The PDF/A flavor documents are produced and validated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PdfAFlavor {
    A2U,
}

impl PdfAFlavor {
    pub fn part(self) -> u8 {
        match self {
            PdfAFlavor::A2U => 2,
        }
    }

    pub fn conformance(self) -> &'static str {
        match self {
            PdfAFlavor::A2U => "U",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AssertionStatus {
    Failed,
}

/// One failed validation rule, with enough context to locate the offender.
#[derive(Debug, Clone, Serialize)]
pub struct Assertion {
    pub rule_id: String,
    pub message: String,
    pub location: String,
    pub status: AssertionStatus,
}

impl Assertion {
    fn failed(rule_id: &str, location: &str, message: impl Into<String>) -> Self {
        Assertion {
            rule_id: rule_id.to_string(),
            message: message.into(),
            location: location.to_string(),
            status: AssertionStatus::Failed,
        }
    }
}

#[derive(Debug)]
pub struct ValidationResult {
    pub failures: Vec<Assertion>,
}

impl ValidationResult {
    pub fn is_compliant(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Runs every rule against the serialized document.
pub fn validate(bytes: &[u8], flavor: PdfAFlavor) -> ValidationResult {
    let mut failures = Vec::new();

    let doc = match Document::load_mem(bytes) {
        Ok(doc) => doc,
        Err(e) => {
            failures.push(Assertion::failed(
                "PDFA-001",
                "document",
                format!("document could not be parsed: {}", e),
            ));
            return ValidationResult { failures };
        }
    };

    check_encryption(&doc, &mut failures);
    check_javascript(&doc, &mut failures);
    check_metadata(&doc, flavor, &mut failures);
    check_output_intent(&doc, &mut failures);
    check_fonts(&doc, &mut failures);
    check_catalog_entries(&doc, &mut failures);

    ValidationResult { failures }
}

fn check_encryption(doc: &Document, failures: &mut Vec<Assertion>) {
    if doc.trailer.get(b"Encrypt").is_ok() {
        failures.push(Assertion::failed(
            "PDFA-002",
            "trailer",
            "encryption is not permitted in PDF/A documents",
        ));
    }
}

/// JavaScript lives in action dictionaries (`/S /JavaScript`) or under the
/// catalog's JavaScript name tree. Document text merely mentioning the word
/// must not trip this rule.
fn check_javascript(doc: &Document, failures: &mut Vec<Assertion>) {
    for (id, object) in &doc.objects {
        let dict = match object.as_dict() {
            Ok(d) => d,
            Err(_) => continue,
        };
        let is_js_action = dict
            .get(b"S")
            .and_then(Object::as_name)
            .map(|name| name == b"JavaScript")
            .unwrap_or(false);
        if is_js_action {
            failures.push(Assertion::failed(
                "PDFA-003",
                &format!("object {} {}", id.0, id.1),
                "JavaScript actions are not permitted in PDF/A documents",
            ));
        }
    }

    let has_js_names = doc
        .catalog()
        .ok()
        .and_then(|catalog| catalog.get(b"Names").ok())
        .and_then(|o| doc.dereference(o).ok())
        .and_then(|(_, o)| o.as_dict().ok())
        .map(|d| d.get(b"JavaScript").is_ok())
        .unwrap_or(false);
    if has_js_names {
        failures.push(Assertion::failed(
            "PDFA-003",
            "catalog",
            "document-level JavaScript is not permitted in PDF/A documents",
        ));
    }
}

fn check_metadata(doc: &Document, flavor: PdfAFlavor, failures: &mut Vec<Assertion>) {
    let xmp = doc
        .catalog()
        .ok()
        .and_then(|catalog| catalog.get(b"Metadata").ok())
        .and_then(|obj| doc.dereference(obj).ok())
        .and_then(|(_, obj)| obj.as_stream().ok())
        .map(|stream| {
            stream
                .decompressed_content()
                .unwrap_or_else(|_| stream.content.clone())
        });

    let xmp = match xmp {
        Some(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        None => {
            failures.push(Assertion::failed(
                "PDFA-004",
                "catalog",
                "document has no XMP metadata stream",
            ));
            return;
        }
    };

    if !xmp.contains("<?xpacket") {
        failures.push(Assertion::failed(
            "PDFA-004",
            "metadata",
            "metadata stream is not an XMP packet",
        ));
        return;
    }

    let part = format!("<pdfaid:part>{}</pdfaid:part>", flavor.part());
    let conformance = format!(
        "<pdfaid:conformance>{}</pdfaid:conformance>",
        flavor.conformance()
    );
    if !xmp.contains(&part) || !xmp.contains(&conformance) {
        failures.push(Assertion::failed(
            "PDFA-005",
            "metadata",
            format!(
                "XMP does not identify the document as PDF/A-{}{}",
                flavor.part(),
                flavor.conformance()
            ),
        ));
    }
    if !xmp.contains("<dc:title>") {
        failures.push(Assertion::failed(
            "PDFA-006",
            "metadata",
            "XMP carries no dc:title",
        ));
    }
}

fn check_output_intent(doc: &Document, failures: &mut Vec<Assertion>) {
    let intents = doc
        .catalog()
        .ok()
        .and_then(|catalog| catalog.get(b"OutputIntents").ok())
        .and_then(|obj| doc.dereference(obj).ok())
        .and_then(|(_, obj)| obj.as_array().ok());

    let intents = match intents {
        Some(list) if !list.is_empty() => list,
        _ => {
            failures.push(Assertion::failed(
                "PDFA-007",
                "catalog",
                "document has no output intent",
            ));
            return;
        }
    };

    let has_pdfa_intent = intents.iter().any(|obj| {
        let dict = match doc.dereference(obj).ok().and_then(|(_, o)| o.as_dict().ok()) {
            Some(d) => d,
            None => return false,
        };
        let is_pdfa = dict
            .get(b"S")
            .and_then(Object::as_name)
            .map(|name| name == b"GTS_PDFA1")
            .unwrap_or(false);
        let has_profile = dict
            .get(b"DestOutputProfile")
            .ok()
            .and_then(|o| doc.dereference(o).ok())
            .and_then(|(_, o)| o.as_stream().ok())
            .map(|s| !s.content.is_empty())
            .unwrap_or(false);
        is_pdfa && has_profile
    });

    if !has_pdfa_intent {
        failures.push(Assertion::failed(
            "PDFA-007",
            "catalog",
            "no GTS_PDFA1 output intent with an embedded ICC profile",
        ));
    }
}

fn check_fonts(doc: &Document, failures: &mut Vec<Assertion>) {
    for (id, object) in &doc.objects {
        let dict = match object.as_dict() {
            Ok(d) => d,
            Err(_) => continue,
        };
        let is_font = dict
            .get(b"Type")
            .and_then(Object::as_name)
            .map(|name| name == b"Font")
            .unwrap_or(false);
        if !is_font {
            continue;
        }
        let subtype = dict
            .get(b"Subtype")
            .and_then(Object::as_name)
            .unwrap_or(b"");
        // Composite fonts keep their descriptor on the descendant.
        if subtype == b"Type0" {
            continue;
        }

        let base_font = dict
            .get(b"BaseFont")
            .and_then(Object::as_name)
            .map(|n| String::from_utf8_lossy(n).into_owned())
            .unwrap_or_else(|_| format!("object {} {}", id.0, id.1));
        let location = format!("font {}", base_font);

        let descriptor = dict
            .get(b"FontDescriptor")
            .ok()
            .and_then(|o| doc.dereference(o).ok())
            .and_then(|(_, o)| o.as_dict().ok());
        let embedded = descriptor
            .map(|d| {
                d.get(b"FontFile").is_ok()
                    || d.get(b"FontFile2").is_ok()
                    || d.get(b"FontFile3").is_ok()
            })
            .unwrap_or(false);

        if !embedded {
            failures.push(Assertion::failed(
                "PDFA-008",
                &location,
                "font program is not embedded",
            ));
        }
    }
}

fn check_catalog_entries(doc: &Document, failures: &mut Vec<Assertion>) {
    let catalog = match doc.catalog() {
        Ok(c) => c,
        Err(_) => {
            failures.push(Assertion::failed(
                "PDFA-009",
                "document",
                "document has no catalog",
            ));
            return;
        }
    };

    if catalog.get(b"Lang").and_then(Object::as_str).is_err() {
        failures.push(Assertion::failed(
            "PDFA-009",
            "catalog",
            "document declares no natural language",
        ));
    }

    let marked = catalog
        .get(b"MarkInfo")
        .ok()
        .and_then(|o| doc.dereference(o).ok())
        .and_then(|(_, o)| o.as_dict().ok())
        .and_then(|d| d.get(b"Marked").ok())
        .and_then(|o| o.as_bool().ok())
        .unwrap_or(false);
    if !marked {
        failures.push(Assertion::failed(
            "PDFA-010",
            "catalog",
            "document is not marked as tagged",
        ));
    } else if catalog.get(b"StructTreeRoot").is_err() {
        failures.push(Assertion::failed(
            "PDFA-011",
            "catalog",
            "tagged document has no structure tree root",
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::dictionary;

    #[test]
    fn garbage_bytes_fail_parse_rule() {
        let result = validate(b"not a pdf", PdfAFlavor::A2U);
        assert!(!result.is_compliant());
        assert_eq!(result.failures[0].rule_id, "PDFA-001");
    }

    #[test]
    fn bare_document_fails_multiple_rules() {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => Vec::<Object>::new(),
                "Count" => 0,
            }),
        );
        let catalog_id =
            doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
        doc.trailer.set("Root", catalog_id);
        let mut bytes = Vec::new();
        doc.save_to(&mut std::io::Cursor::new(&mut bytes)).unwrap();

        let result = validate(&bytes, PdfAFlavor::A2U);
        let rules: Vec<&str> = result.failures.iter().map(|f| f.rule_id.as_str()).collect();
        assert!(rules.contains(&"PDFA-004"));
        assert!(rules.contains(&"PDFA-007"));
        assert!(rules.contains(&"PDFA-009"));
        assert!(rules.contains(&"PDFA-010"));
    }

    fn minimal_document() -> Document {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => Vec::<Object>::new(),
                "Count" => 0,
            }),
        );
        let catalog_id =
            doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
        doc.trailer.set("Root", catalog_id);
        doc
    }

    fn rules_of(doc: &mut Document) -> Vec<String> {
        let mut bytes = Vec::new();
        doc.save_to(&mut std::io::Cursor::new(&mut bytes)).unwrap();
        validate(&bytes, PdfAFlavor::A2U)
            .failures
            .into_iter()
            .map(|f| f.rule_id)
            .collect()
    }

    #[test]
    fn javascript_rule_reads_structure_not_text() {
        // A string merely mentioning /JavaScript is fine.
        let mut doc = minimal_document();
        let info_id = doc.add_object(dictionary! {
            "Title" => Object::string_literal("Skjemaet stoetter ikke /JavaScript"),
        });
        doc.trailer.set("Info", info_id);
        assert!(!rules_of(&mut doc).contains(&"PDFA-003".to_string()));

        // An actual action dictionary is not.
        let mut doc = minimal_document();
        doc.add_object(dictionary! {
            "S" => "JavaScript",
            "JS" => Object::string_literal("app.alert(1)"),
        });
        assert!(rules_of(&mut doc).contains(&"PDFA-003".to_string()));
    }

    #[test]
    fn flavor_identity() {
        assert_eq!(PdfAFlavor::A2U.part(), 2);
        assert_eq!(PdfAFlavor::A2U.conformance(), "U");
    }
}
