// Segment Encoder
// Converts paragraph text into typed segments with embeddings and layout metrics

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::models::{BlockType, LayoutMetrics, Segment};
use crate::services::capabilities::{Capability, SentenceEncoder};
use crate::services::text_processor::{
    list_item_re, section_header_re, split_pages, split_paragraphs, subsection_header_re,
};

use super::token_mixer;

/// Each paragraph is assumed to be followed by a blank-line separator
const PARAGRAPH_SEPARATOR_LEN: usize = 2;
const LONG_CONTENT_CHARS: usize = 500;
const LONG_CONTENT_BONUS: f64 = 0.1;

/// Infer the block type of a paragraph from its trimmed text
pub fn infer_block_type(text: &str) -> BlockType {
    let text = text.trim();

    if section_header_re().is_match(text) {
        return BlockType::SectionHeader;
    }
    if subsection_header_re().is_match(text) {
        return BlockType::SubsectionHeader;
    }
    if list_item_re().is_match(text) {
        return BlockType::ListItem;
    }
    if text.contains('|') && table_field_count(text) > 2 {
        return BlockType::Table;
    }
    if text.chars().count() < 100 && !text.contains('.') {
        return BlockType::Title;
    }
    BlockType::Paragraph
}

/// Fields produced by splitting on '|', ignoring trailing empty fields
fn table_field_count(text: &str) -> usize {
    let fields: Vec<&str> = text.split('|').collect();
    let trailing_empty = fields.iter().rev().take_while(|f| f.is_empty()).count();
    fields.len() - trailing_empty
}

pub fn calculate_importance(block_type: BlockType, content: &str) -> f64 {
    let mut importance = block_type.base_importance();
    if content.chars().count() > LONG_CONTENT_CHARS {
        importance += LONG_CONTENT_BONUS;
    }
    importance.min(1.0)
}

pub fn layout_metrics(content: &str) -> LayoutMetrics {
    let char_count = content.chars().count();
    let line_count = content.trim_end_matches('\n').split('\n').count().max(1);
    let word_count = content.split_whitespace().count();
    let indent_level = content
        .split('\n')
        .next()
        .map(|first| first.chars().take_while(|c| *c == ' ' || *c == '\t').count())
        .unwrap_or(0);

    LayoutMetrics {
        line_count,
        word_count,
        char_count,
        indent_level,
        relative_font_size: estimate_font_size(content, char_count),
    }
}

fn estimate_font_size(content: &str, char_count: usize) -> f64 {
    let uppercase = content.chars().filter(|c| c.is_uppercase()).count();
    let ratio = if char_count == 0 {
        0.0
    } else {
        uppercase as f64 / char_count as f64
    };

    if ratio > 0.5 {
        1.5
    } else if char_count < 50 {
        1.2
    } else {
        1.0
    }
}

pub struct SegmentEncoder {
    sentence_encoder: Capability<dyn SentenceEncoder>,
    embedding_enabled: bool,
}

impl Default for SegmentEncoder {
    fn default() -> Self {
        Self::new(Capability::Unavailable)
    }
}

impl SegmentEncoder {
    pub fn new(sentence_encoder: Capability<dyn SentenceEncoder>) -> Self {
        Self {
            sentence_encoder,
            embedding_enabled: true,
        }
    }

    /// Disable the external encoder even when one is configured
    pub fn with_embedding_enabled(mut self, enabled: bool) -> Self {
        self.embedding_enabled = enabled;
        self
    }

    pub fn embedding_dimension(&self) -> usize {
        match (&self.sentence_encoder, self.embedding_enabled) {
            (Capability::Available(encoder), true) => encoder.dimension(),
            _ => token_mixer::FALLBACK_DIMENSION,
        }
    }

    /// Embed text with the sentence encoder, falling back to token mixing on any failure
    pub fn embed(&self, text: &str) -> Vec<f64> {
        if self.embedding_enabled {
            match &self.sentence_encoder {
                Capability::Available(encoder) => match encoder.encode(text) {
                    Ok(embedding) if !embedding.is_empty() => return embedding,
                    Ok(_) => warn!("[SEGMENT_ENCODER] sentence encoder returned empty vector, using fallback"),
                    Err(e) => warn!("[SEGMENT_ENCODER] sentence encoder failed: {}, using fallback", e),
                },
                Capability::Unavailable => {}
            }
        }
        token_mixer::sentence_embedding(text)
    }

    pub fn encode_segment(&self, content: &str, position: usize) -> Segment {
        let block_type = infer_block_type(content);
        let layout = layout_metrics(content);
        let importance = calculate_importance(block_type, content);

        let mut segment = Segment::new(
            Uuid::new_v4().to_string(),
            block_type,
            content.to_string(),
            position,
            layout,
            importance,
        );
        segment.embedding_vector = self.embed(content);

        debug!(
            "[SEGMENT_ENCODER] segment {} - {} ({} chars)",
            segment.id,
            block_type,
            segment.layout.char_count
        );
        segment
    }

    pub fn encode_paragraphs<S: AsRef<str>>(&self, paragraphs: &[S]) -> Vec<Segment> {
        info!("[SEGMENT_ENCODER] encoding {} paragraphs", paragraphs.len());

        let mut segments = Vec::with_capacity(paragraphs.len());
        let mut position = 0usize;
        for paragraph in paragraphs {
            let paragraph = paragraph.as_ref();
            segments.push(self.encode_segment(paragraph, position));
            position += paragraph.chars().count() + PARAGRAPH_SEPARATOR_LEN;
        }

        link_parents(&mut segments);
        segments
    }

    /// Encode page texts; page numbers are 1-based and positions run across pages
    pub fn encode_pages<S: AsRef<str>>(&self, pages: &[S]) -> Vec<Segment> {
        info!("[SEGMENT_ENCODER] encoding {} pages", pages.len());

        let mut segments = Vec::new();
        let mut position = 0usize;
        for (page_idx, page) in pages.iter().enumerate() {
            for paragraph in split_paragraphs(page.as_ref()) {
                let mut segment = self.encode_segment(&paragraph, position);
                segment.page_number = Some(page_idx as u32 + 1);
                segments.push(segment);
                position += paragraph.chars().count() + PARAGRAPH_SEPARATOR_LEN;
            }
        }

        link_parents(&mut segments);
        info!("[SEGMENT_ENCODER] {} segments from {} pages", segments.len(), pages.len());
        segments
    }

    /// Encode a full text; form feeds split pages, blank lines split paragraphs
    pub fn encode_text(&self, text: &str) -> Vec<Segment> {
        let pages = split_pages(text);
        if pages.len() > 1 {
            self.encode_pages(&pages)
        } else {
            self.encode_paragraphs(&split_paragraphs(text))
        }
    }
}

/// Subsections attach to the latest section (or title); body blocks to the latest heading
fn link_parents(segments: &mut [Segment]) {
    let mut last_section: Option<String> = None;
    let mut last_heading: Option<String> = None;

    for segment in segments.iter_mut() {
        match segment.block_type {
            BlockType::Title | BlockType::SectionHeader => {
                last_section = Some(segment.id.clone());
                last_heading = Some(segment.id.clone());
            }
            BlockType::SubsectionHeader => {
                segment.parent_id = last_section.clone();
                last_heading = Some(segment.id.clone());
            }
            _ => segment.parent_id = last_heading.clone(),
        }
    }
}
