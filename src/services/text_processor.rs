// Text Processing Service
// Normalizes raw document text and splits it into pages and paragraphs

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use crate::models::BlockType;

fn paragraph_break_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n\s*\n").expect("paragraph break regex"))
}

fn horizontal_ws_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[ \t\x0B\u{3000}\u{00A0}]+").expect("whitespace regex"))
}

pub(crate) fn section_header_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d+\.\s+.+$").expect("section header regex"))
}

pub(crate) fn subsection_header_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d+\.\d+\.?\s+.+$").expect("subsection header regex"))
}

pub(crate) fn list_item_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[•\-*]\s+.+$").expect("list item regex"))
}

/// Normalize punctuation and whitespace while keeping blank-line paragraph breaks.
/// Leading indentation of each line and form feeds (page breaks) are preserved.
pub fn normalize_punctuation(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let mut s = text
        .replace('\u{201c}', "\"")
        .replace('\u{201d}', "\"")
        .replace('\u{2018}', "'")
        .replace('\u{2019}', "'")
        .replace('\u{2014}', "-");

    s = s.replace("\r\n", "\n").replace('\r', "\n");

    s = s
        .split('\n')
        .map(normalize_line)
        .collect::<Vec<_>>()
        .join("\n");

    s.trim_start_matches('\n')
        .trim_end_matches(|c: char| c.is_whitespace() && c != '\x0c')
        .to_string()
}

fn is_horizontal_ws(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\x0B' | '\u{3000}' | '\u{00A0}')
}

/// Collapse inner whitespace runs and trailing blanks; indentation becomes one space per char
fn normalize_line(line: &str) -> String {
    let body = line.trim_start_matches(is_horizontal_ws);
    let indent = line.chars().count() - body.chars().count();
    let body = horizontal_ws_re().replace_all(body, " ");
    let body = body.trim_end_matches(' ');
    if body.is_empty() {
        String::new()
    } else {
        format!("{}{}", " ".repeat(indent), body)
    }
}

/// Split text on blank lines. Paragraphs keep their first-line indentation,
/// lose trailing whitespace, and blank ones are dropped.
pub fn split_paragraphs(text: &str) -> Vec<String> {
    paragraph_break_re()
        .split(text)
        .map(|p| p.trim_start_matches('\n').trim_end())
        .filter(|p| !p.trim().is_empty())
        .map(str::to_string)
        .collect()
}

/// Split text into pages on form feed. Blank pages are kept so page numbers stay
/// aligned with the source; fully blank text yields no pages.
pub fn split_pages(text: &str) -> Vec<String> {
    if text.trim().is_empty() {
        return Vec::new();
    }
    text.split('\x0c').map(str::to_string).collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructureElement {
    pub text: String,
    /// UTF-8 byte offset of the line start
    pub offset: usize,
    pub block_type: BlockType,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutStructure {
    pub section_headers: Vec<StructureElement>,
    pub subsection_headers: Vec<StructureElement>,
    pub list_items: Vec<StructureElement>,
}

/// Scan text line by line for section headers, subsection headers and list items
pub fn analyze_structure(text: &str) -> LayoutStructure {
    let mut structure = LayoutStructure::default();
    let mut offset = 0usize;

    for line in text.split('\n') {
        let element = |block_type| StructureElement {
            text: line.to_string(),
            offset,
            block_type,
        };
        if section_header_re().is_match(line) {
            structure.section_headers.push(element(BlockType::SectionHeader));
        }
        if subsection_header_re().is_match(line) {
            structure.subsection_headers.push(element(BlockType::SubsectionHeader));
        }
        if list_item_re().is_match(line) {
            structure.list_items.push(element(BlockType::ListItem));
        }
        offset += line.len() + 1;
    }

    structure
}
