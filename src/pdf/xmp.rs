// src/pdf/xmp.rs
//! XMP metadata packet for PDF/A identification.
//!
//! The packet is written as an uncompressed /Metadata stream so validators
//! can read it without decoding filters. Only the properties PDF/A-2
//! requires plus Dublin Core title/creator are emitted.

use crate::validation::PdfAFlavor;
use chrono::{DateTime, SecondsFormat, Utc};

pub const DOCUMENT_CREATOR: &str = "pdfgen";

pub fn build_packet(title: &str, flavor: PdfAFlavor, now: DateTime<Utc>) -> Vec<u8> {
    let timestamp = now.to_rfc3339_opts(SecondsFormat::Secs, true);
    let title = escape_xml(title);
    let packet = format!(
        r#"<?xpacket begin="{bom}" id="W5M0MpCehiHzreSzNTczkc9d"?>
<x:xmpmeta xmlns:x="adobe:ns:meta/">
 <rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#">
  <rdf:Description rdf:about=""
    xmlns:dc="http://purl.org/dc/elements/1.1/"
    xmlns:xmp="http://ns.adobe.com/xap/1.0/"
    xmlns:pdfaid="http://www.aiim.org/pdfa/ns/id/">
   <dc:title><rdf:Alt><rdf:li xml:lang="x-default">{title}</rdf:li></rdf:Alt></dc:title>
   <dc:creator><rdf:Seq><rdf:li>{creator}</rdf:li></rdf:Seq></dc:creator>
   <xmp:CreateDate>{timestamp}</xmp:CreateDate>
   <xmp:ModifyDate>{timestamp}</xmp:ModifyDate>
   <pdfaid:part>{part}</pdfaid:part>
   <pdfaid:conformance>{conformance}</pdfaid:conformance>
  </rdf:Description>
 </rdf:RDF>
</x:xmpmeta>
<?xpacket end="w"?>"#,
        bom = '\u{feff}',
        title = title,
        creator = DOCUMENT_CREATOR,
        timestamp = timestamp,
        part = flavor.part(),
        conformance = flavor.conformance(),
    );
    packet.into_bytes()
}

fn escape_xml(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packet_identifies_the_flavor() {
        let packet = build_packet("vedtak", PdfAFlavor::A2U, Utc::now());
        let text = String::from_utf8(packet).unwrap();
        assert!(text.contains("<pdfaid:part>2</pdfaid:part>"));
        assert!(text.contains("<pdfaid:conformance>U</pdfaid:conformance>"));
        assert!(text.contains("<rdf:li xml:lang=\"x-default\">vedtak</rdf:li>"));
        assert!(text.contains("<rdf:li>pdfgen</rdf:li>"));
        assert!(text.starts_with("<?xpacket begin=\"\u{feff}\""));
    }

    #[test]
    fn title_is_escaped() {
        let packet = build_packet("a<b & c", PdfAFlavor::A2U, Utc::now());
        let text = String::from_utf8(packet).unwrap();
        assert!(text.contains("a&lt;b &amp; c"));
    }
}
