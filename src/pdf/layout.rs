// src/pdf/layout.rs
//! Breaks parsed blocks into positioned text runs on A4 pages.
//!
//! Measurement uses the real advance widths from the selected font, so the
//! greedy line breaker never overflows the text column. No-break spaces
//! measure like spaces but are never used as break points.

use crate::pdf::fonts::FontLibrary;
use crate::pdf::markup::{Block, BlockKind};

pub const PAGE_WIDTH: f32 = 595.28;
pub const PAGE_HEIGHT: f32 = 841.89;
pub const MARGIN: f32 = 50.0;

const BODY_SIZE: f32 = 11.0;
const LINE_HEIGHT_FACTOR: f32 = 1.4;
const LIST_INDENT: f32 = 18.0;
const RULE_GAP: f32 = 12.0;

/// One uninterrupted piece of text in a single font at a single position.
/// `baseline` is in PDF user space (origin bottom-left).
pub struct TextRun {
    pub x: f32,
    pub baseline: f32,
    pub font: usize,
    pub size: f32,
    pub text: String,
}

#[derive(Default)]
pub struct PageLayout {
    pub runs: Vec<TextRun>,
}

struct Word {
    text: String,
    font: usize,
    width: f32,
}

enum Token {
    Word(Word),
    Break,
}

pub fn layout_blocks(blocks: &[Block], fonts: &FontLibrary) -> Vec<PageLayout> {
    let content_width = PAGE_WIDTH - 2.0 * MARGIN;
    let content_height = PAGE_HEIGHT - 2.0 * MARGIN;

    let mut pages = vec![PageLayout::default()];
    let mut cursor = 0.0f32;

    for block in blocks {
        let (size, heading_bold, spacing_before) = match block.kind {
            BlockKind::Heading(1) => (24.0, true, 14.0),
            BlockKind::Heading(2) => (18.0, true, 11.0),
            BlockKind::Heading(_) => (14.0, true, 8.0),
            BlockKind::Rule => {
                cursor += RULE_GAP;
                continue;
            }
            _ => (BODY_SIZE, false, 0.0),
        };
        let (indent, prefix) = match &block.kind {
            BlockKind::ListItem { ordered: false, .. } => (LIST_INDENT, Some("\u{2022}".to_string())),
            BlockKind::ListItem { ordered: true, index } => (LIST_INDENT, Some(format!("{}.", index))),
            _ => (0.0, None),
        };

        if cursor > 0.0 {
            cursor += spacing_before;
        }

        let tokens = tokenize(block, heading_bold, fonts, size);
        let lines = break_lines(tokens, fonts, size, content_width - indent);
        let line_height = size * LINE_HEIGHT_FACTOR;

        for (line_no, line) in lines.into_iter().enumerate() {
            if cursor + line_height > content_height && cursor > 0.0 {
                pages.push(PageLayout::default());
                cursor = 0.0;
            }
            let baseline = PAGE_HEIGHT - MARGIN - cursor - size * 0.8;
            let Some(page) = pages.last_mut() else { break };

            if line_no == 0 {
                if let Some(marker) = &prefix {
                    let font = fonts.select(false, false);
                    page.runs.push(TextRun {
                        x: MARGIN,
                        baseline,
                        font,
                        size,
                        text: marker.clone(),
                    });
                }
            }
            emit_line(page, line, MARGIN + indent, baseline, size, fonts);
            cursor += line_height;
        }

        cursor += size * 0.4;
    }

    pages
}

fn tokenize(block: &Block, heading_bold: bool, fonts: &FontLibrary, size: f32) -> Vec<Token> {
    let mut tokens = Vec::new();
    for span in &block.spans {
        let font = fonts.select(span.bold || heading_bold, span.italic);
        for (line_no, line) in span.text.split('\n').enumerate() {
            if line_no > 0 {
                tokens.push(Token::Break);
            }
            for word in line.split(' ').filter(|w| !w.is_empty()) {
                tokens.push(Token::Word(Word {
                    text: word.to_string(),
                    font,
                    width: fonts.get(font).text_width(word, size),
                }));
            }
        }
    }
    tokens
}

fn break_lines(tokens: Vec<Token>, fonts: &FontLibrary, size: f32, max_width: f32) -> Vec<Vec<Word>> {
    let mut lines: Vec<Vec<Word>> = vec![Vec::new()];
    let mut line_width = 0.0f32;

    for token in tokens {
        match token {
            Token::Break => {
                lines.push(Vec::new());
                line_width = 0.0;
            }
            Token::Word(word) => {
                let space = if lines.last().map(|l| l.is_empty()).unwrap_or(true) {
                    0.0
                } else {
                    fonts.get(word.font).text_width(" ", size)
                };
                if line_width + space + word.width > max_width && line_width > 0.0 {
                    lines.push(Vec::new());
                    line_width = word.width;
                } else {
                    line_width += space + word.width;
                }
                if let Some(line) = lines.last_mut() {
                    line.push(word);
                }
            }
        }
    }

    lines.retain(|l| !l.is_empty());
    if lines.is_empty() {
        lines.push(Vec::new());
    }
    lines
}

/// Merges consecutive same-font words into single runs with correct x
/// offsets, so the content stream stays small.
fn emit_line(page: &mut PageLayout, line: Vec<Word>, x0: f32, baseline: f32, size: f32, fonts: &FontLibrary) {
    let mut x = x0;
    let mut run: Option<TextRun> = None;
    let mut run_width = 0.0f32;

    for word in line {
        let space_width = fonts.get(word.font).text_width(" ", size);
        match run.as_mut() {
            Some(r) if r.font == word.font => {
                r.text.push(' ');
                r.text.push_str(&word.text);
                run_width += space_width + word.width;
            }
            Some(r) => {
                x += run_width + space_width;
                let finished = std::mem::replace(
                    r,
                    TextRun { x, baseline, font: word.font, size, text: word.text },
                );
                page.runs.push(finished);
                run_width = word.width;
            }
            None => {
                run = Some(TextRun { x, baseline, font: word.font, size, text: word.text });
                run_width = word.width;
            }
        }
    }
    if let Some(r) = run {
        page.runs.push(r);
    }
}
