// tests/common/pdf_assertions.rs
use lopdf::{Document, Object};

/// Extract all text content from a PDF document.
pub fn extract_text(doc: &Document) -> String {
    let mut text = String::new();
    let pages = doc.get_pages();
    for page_num in 1..=pages.len() {
        if let Ok(page_text) = doc.extract_text(&[page_num as u32]) {
            text.push_str(&page_text);
            text.push('\n');
        }
    }
    text
}

/// Width and height of the page's MediaBox in points.
pub fn page_dimensions(doc: &Document, page_num: u32) -> Option<(f32, f32)> {
    let pages = doc.get_pages();
    let page_id = pages.get(&page_num)?;
    let page = doc.get_object(*page_id).ok()?.as_dict().ok()?;
    let media_box = page.get(b"MediaBox").ok()?.as_array().ok()?;
    if media_box.len() < 4 {
        return None;
    }
    let width = number(&media_box[2])? - number(&media_box[0])?;
    let height = number(&media_box[3])? - number(&media_box[1])?;
    Some((width, height))
}

fn number(object: &Object) -> Option<f32> {
    match object {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

/// Pixel dimensions of the first image XObject in the document.
pub fn image_xobject_dimensions(doc: &Document) -> Option<(i64, i64)> {
    for object in doc.objects.values() {
        let stream = match object.as_stream() {
            Ok(s) => s,
            Err(_) => continue,
        };
        let is_image = stream
            .dict
            .get(b"Subtype")
            .and_then(Object::as_name)
            .map(|name| name == b"Image")
            .unwrap_or(false);
        if !is_image {
            continue;
        }
        let width = stream.dict.get(b"Width").ok()?.as_i64().ok()?;
        let height = stream.dict.get(b"Height").ok()?.as_i64().ok()?;
        return Some((width, height));
    }
    None
}

/// The raw XMP packet from the catalog's metadata stream.
pub fn xmp_packet(doc: &Document) -> Option<String> {
    let catalog = doc.catalog().ok()?;
    let metadata = catalog.get(b"Metadata").ok()?;
    let (_, object) = doc.dereference(metadata).ok()?;
    let stream = object.as_stream().ok()?;
    Some(String::from_utf8_lossy(&stream.content).into_owned())
}
