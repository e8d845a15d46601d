// src/pdf/markup.rs
//! Parses rendered template HTML into a flat list of layout blocks.
//!
//! The supported element set is intentionally small: h1-h3, p, div, ul, ol,
//! li, br and hr structure the document; b/strong and i/em toggle the span
//! shape. Unknown elements are transparent so templates may carry extra
//! markup without breaking. head/style/script subtrees are dropped.

use crate::error::PipelineError;
use quick_xml::events::Event;
use quick_xml::Reader;

#[derive(Debug, Clone, PartialEq)]
pub enum BlockKind {
    Heading(u8),
    Paragraph,
    ListItem { ordered: bool, index: usize },
    Rule,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Span {
    pub text: String,
    pub bold: bool,
    pub italic: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub kind: BlockKind,
    pub spans: Vec<Span>,
}

struct ListState {
    ordered: bool,
    next_index: usize,
}

struct BlockBuilder {
    blocks: Vec<Block>,
    current: Option<Block>,
    bold_depth: usize,
    italic_depth: usize,
    skip_depth: usize,
    lists: Vec<ListState>,
}

pub fn parse_blocks(html: &str) -> Result<Vec<Block>, PipelineError> {
    let mut reader = Reader::from_str(html);
    reader.config_mut().trim_text(false);
    let mut buf = Vec::new();
    let mut builder = BlockBuilder::new();

    loop {
        match reader
            .read_event_into(&mut buf)
            .map_err(|e| PipelineError::Markup(e.to_string()))?
        {
            Event::Start(e) => {
                let name = local_name(e.name().as_ref());
                builder.open(&name);
            }
            Event::Empty(e) => {
                let name = local_name(e.name().as_ref());
                builder.open(&name);
                builder.close(&name);
            }
            Event::End(e) => {
                let name = local_name(e.name().as_ref());
                builder.close(&name);
            }
            Event::Text(e) => {
                // Entities arrive separately as GeneralRef events; the text
                // event itself only needs decoding.
                let text = e.decode().map_err(|e| PipelineError::Markup(e.to_string()))?;
                builder.text(&text);
            }
            Event::GeneralRef(r) => {
                let resolved = r
                    .resolve_char_ref()
                    .map_err(|e| PipelineError::Markup(e.to_string()))?
                    .map(String::from)
                    .or_else(|| {
                        std::str::from_utf8(&r)
                            .ok()
                            .and_then(resolve_entity)
                            .map(str::to_string)
                    })
                    .ok_or_else(|| {
                        PipelineError::Markup(format!(
                            "unknown entity &{};",
                            String::from_utf8_lossy(&r)
                        ))
                    })?;
                builder.text(&resolved);
            }
            Event::Eof => break,
            // Comments, CDATA, processing instructions and doctype carry no
            // layout information.
            _ => {}
        }
        buf.clear();
    }

    Ok(builder.finish())
}

fn resolve_entity(name: &str) -> Option<&'static str> {
    match name {
        "nbsp" => Some("\u{a0}"),
        "amp" => Some("&"),
        "lt" => Some("<"),
        "gt" => Some(">"),
        "quot" => Some("\""),
        "apos" => Some("'"),
        _ => None,
    }
}

fn local_name(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).to_ascii_lowercase()
}

impl BlockBuilder {
    fn new() -> Self {
        BlockBuilder {
            blocks: Vec::new(),
            current: None,
            bold_depth: 0,
            italic_depth: 0,
            skip_depth: 0,
            lists: Vec::new(),
        }
    }

    fn open(&mut self, name: &str) {
        if self.skip_depth > 0 {
            self.skip_depth += 1;
            return;
        }
        match name {
            "head" | "style" | "script" | "title" => self.skip_depth = 1,
            "h1" => self.start_block(BlockKind::Heading(1)),
            "h2" => self.start_block(BlockKind::Heading(2)),
            "h3" => self.start_block(BlockKind::Heading(3)),
            "p" | "div" => self.start_block(BlockKind::Paragraph),
            "ul" => self.lists.push(ListState { ordered: false, next_index: 1 }),
            "ol" => self.lists.push(ListState { ordered: true, next_index: 1 }),
            "li" => {
                let (ordered, index) = match self.lists.last_mut() {
                    Some(list) => {
                        let index = list.next_index;
                        list.next_index += 1;
                        (list.ordered, index)
                    }
                    None => (false, 1),
                };
                self.start_block(BlockKind::ListItem { ordered, index });
            }
            "br" => self.append_break(),
            "hr" => {
                self.flush();
                self.blocks.push(Block { kind: BlockKind::Rule, spans: Vec::new() });
            }
            "b" | "strong" => self.bold_depth += 1,
            "i" | "em" => self.italic_depth += 1,
            _ => {}
        }
    }

    fn close(&mut self, name: &str) {
        if self.skip_depth > 0 {
            self.skip_depth -= 1;
            return;
        }
        match name {
            "h1" | "h2" | "h3" | "p" | "div" | "li" => self.flush(),
            "ul" | "ol" => {
                self.flush();
                self.lists.pop();
            }
            "b" | "strong" => self.bold_depth = self.bold_depth.saturating_sub(1),
            "i" | "em" => self.italic_depth = self.italic_depth.saturating_sub(1),
            _ => {}
        }
    }

    fn text(&mut self, raw: &str) {
        if self.skip_depth > 0 {
            return;
        }
        let collapsed = collapse_whitespace(raw);
        if collapsed.is_empty() {
            return;
        }
        // Bare whitespace between blocks is dropped entirely.
        if collapsed == " " && self.current.is_none() {
            return;
        }
        let bold = self.bold_depth > 0;
        let italic = self.italic_depth > 0;
        let block = self
            .current
            .get_or_insert_with(|| Block { kind: BlockKind::Paragraph, spans: Vec::new() });

        let mut text = collapsed;
        // Collapse across the span boundary too.
        let at_start = block.spans.iter().all(|s| s.text.is_empty());
        let after_space = block
            .spans
            .last()
            .map(|s| s.text.ends_with(' ') || s.text.ends_with('\n'))
            .unwrap_or(false);
        if at_start || after_space {
            text = text.trim_start_matches(' ').to_string();
            if text.is_empty() {
                return;
            }
        }

        match block.spans.last_mut() {
            Some(last) if last.bold == bold && last.italic == italic => last.text.push_str(&text),
            _ => block.spans.push(Span { text, bold, italic }),
        }
    }

    fn append_break(&mut self) {
        if let Some(block) = self.current.as_mut() {
            if let Some(last) = block.spans.last_mut() {
                while last.text.ends_with(' ') {
                    last.text.pop();
                }
                last.text.push('\n');
                return;
            }
        }
        let bold = self.bold_depth > 0;
        let italic = self.italic_depth > 0;
        self.current
            .get_or_insert_with(|| Block { kind: BlockKind::Paragraph, spans: Vec::new() })
            .spans
            .push(Span { text: "\n".to_string(), bold, italic });
    }

    fn start_block(&mut self, kind: BlockKind) {
        self.flush();
        self.current = Some(Block { kind, spans: Vec::new() });
    }

    fn flush(&mut self) {
        if let Some(mut block) = self.current.take() {
            for span in &mut block.spans {
                while span.text.ends_with(' ') {
                    span.text.pop();
                }
            }
            block.spans.retain(|s| !s.text.is_empty());
            if !block.spans.is_empty() {
                self.blocks.push(block);
            }
        }
    }

    fn finish(mut self) -> Vec<Block> {
        self.flush();
        self.blocks
    }
}

fn collapse_whitespace(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut in_space = false;
    for c in raw.chars() {
        if c == ' ' || c == '\t' || c == '\r' || c == '\n' {
            if !in_space {
                out.push(' ');
            }
            in_space = true;
        } else {
            out.push(c);
            in_space = false;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_of(block: &Block) -> String {
        block.spans.iter().map(|s| s.text.as_str()).collect()
    }

    #[test]
    fn headings_paragraphs_and_rules() {
        let blocks = parse_blocks("<h1>Tittel</h1><p>Hei  \n  verden</p><hr/><div>Slutt</div>")
            .unwrap();
        assert_eq!(blocks.len(), 4);
        assert_eq!(blocks[0].kind, BlockKind::Heading(1));
        assert_eq!(text_of(&blocks[0]), "Tittel");
        assert_eq!(text_of(&blocks[1]), "Hei verden");
        assert_eq!(blocks[2].kind, BlockKind::Rule);
        assert_eq!(blocks[3].kind, BlockKind::Paragraph);
    }

    #[test]
    fn nested_emphasis_becomes_span_shape() {
        let blocks = parse_blocks("<p>plain <b>bold <i>both</i></b></p>").unwrap();
        let spans = &blocks[0].spans;
        assert_eq!(spans.len(), 3);
        assert!(!spans[0].bold);
        assert!(spans[1].bold && !spans[1].italic);
        assert!(spans[2].bold && spans[2].italic);
    }

    #[test]
    fn lists_number_their_items() {
        let blocks = parse_blocks("<ol><li>en</li><li>to</li></ol><ul><li>punkt</li></ul>").unwrap();
        assert_eq!(blocks[0].kind, BlockKind::ListItem { ordered: true, index: 1 });
        assert_eq!(blocks[1].kind, BlockKind::ListItem { ordered: true, index: 2 });
        assert_eq!(blocks[2].kind, BlockKind::ListItem { ordered: false, index: 1 });
    }

    #[test]
    fn br_forces_a_line_break() {
        let blocks = parse_blocks("<p>over<br/>under</p>").unwrap();
        assert_eq!(text_of(&blocks[0]), "over\nunder");
    }

    #[test]
    fn entities_and_nbsp_survive() {
        let blocks = parse_blocks("<p>1&nbsp;337 &amp; mer</p>").unwrap();
        assert_eq!(text_of(&blocks[0]), "1\u{a0}337 & mer");
    }

    #[test]
    fn head_content_is_dropped() {
        let html = "<html><head><title>x</title><style>p{}</style></head><body><p>innhold</p></body></html>";
        let blocks = parse_blocks(html).unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(text_of(&blocks[0]), "innhold");
    }

    #[test]
    fn malformed_markup_is_an_error() {
        assert!(matches!(
            parse_blocks("<p>åpen <b>uten slutt</p>"),
            Err(PipelineError::Markup(_))
        ));
    }
}
