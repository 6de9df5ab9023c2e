// DocResonance Data Models
// Segments, filters, validation and analysis report types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use crate::error::ResonanceError;

// ============ Block & Document Types ============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BlockType {
    Title,
    SectionHeader,
    SubsectionHeader,
    Paragraph,
    ListItem,
    Table,
    Caption,
    Footer,
    Header,
}

impl BlockType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockType::Title => "TITLE",
            BlockType::SectionHeader => "SECTION_HEADER",
            BlockType::SubsectionHeader => "SUBSECTION_HEADER",
            BlockType::Paragraph => "PARAGRAPH",
            BlockType::ListItem => "LIST_ITEM",
            BlockType::Table => "TABLE",
            BlockType::Caption => "CAPTION",
            BlockType::Footer => "FOOTER",
            BlockType::Header => "HEADER",
        }
    }

    /// Structural headings only. `Header` is a running page header, not a heading.
    pub fn is_heading(&self) -> bool {
        matches!(
            self,
            BlockType::Title | BlockType::SectionHeader | BlockType::SubsectionHeader
        )
    }

    /// Base importance before the long-content bonus
    pub fn base_importance(&self) -> f64 {
        match self {
            BlockType::Title => 1.0,
            BlockType::SectionHeader => 0.9,
            BlockType::SubsectionHeader => 0.8,
            BlockType::Table => 0.7,
            BlockType::ListItem => 0.6,
            _ => 0.5,
        }
    }
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentType {
    ResearchPaper,
    Report,
    Contract,
    Presentation,
    Manual,
    General,
}

impl DocumentType {
    pub const ALL: [DocumentType; 6] = [
        DocumentType::ResearchPaper,
        DocumentType::Report,
        DocumentType::Contract,
        DocumentType::Presentation,
        DocumentType::Manual,
        DocumentType::General,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::ResearchPaper => "RESEARCH_PAPER",
            DocumentType::Report => "REPORT",
            DocumentType::Contract => "CONTRACT",
            DocumentType::Presentation => "PRESENTATION",
            DocumentType::Manual => "MANUAL",
            DocumentType::General => "GENERAL",
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentType {
    type Err = ResonanceError;

    /// Accepts `research_paper`, `RESEARCH-PAPER`, `Research Paper` and similar spellings
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .trim()
            .chars()
            .map(|c| if c == '-' || c == ' ' { '_' } else { c.to_ascii_uppercase() })
            .collect();
        DocumentType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == key)
            .ok_or_else(|| ResonanceError::Config(format!("unknown document type: {}", s)))
    }
}

// ============ Segment ============

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutMetrics {
    pub line_count: usize,
    pub word_count: usize,
    pub char_count: usize,
    pub indent_level: usize,
    pub relative_font_size: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Segment {
    pub id: String,
    pub block_type: BlockType,
    pub content: String,
    /// Character offset (0-based) of the first char.
    pub position: usize,
    /// Character offset (end-exclusive).
    pub end_position: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_number: Option<u32>,
    #[serde(default)]
    pub embedding_vector: Vec<f64>,
    pub layout: LayoutMetrics,
    #[serde(deserialize_with = "deserialize_unit")]
    structural_score: f64,
    pub resonance_intensity: f64,
    #[serde(deserialize_with = "deserialize_unit")]
    importance: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
}

impl Segment {
    pub fn new(
        id: String,
        block_type: BlockType,
        content: String,
        position: usize,
        layout: LayoutMetrics,
        importance: f64,
    ) -> Self {
        let end_position = position + content.chars().count();
        Self {
            id,
            block_type,
            content,
            position,
            end_position,
            page_number: None,
            embedding_vector: Vec::new(),
            layout,
            structural_score: 0.0,
            resonance_intensity: 0.0,
            importance: clamp_unit(importance),
            parent_id: None,
        }
    }

    pub fn is_header(&self) -> bool {
        self.block_type.is_heading()
    }

    /// Content length in chars
    pub fn len(&self) -> usize {
        self.content.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    pub fn structural_score(&self) -> f64 {
        self.structural_score
    }

    pub fn set_structural_score(&mut self, score: f64) {
        self.structural_score = clamp_unit(score);
    }

    pub fn importance(&self) -> f64 {
        self.importance
    }

    pub fn set_importance(&mut self, importance: f64) {
        self.importance = clamp_unit(importance);
    }

    /// Writes a score without clamping. Only used to build invalid fixtures for validation.
    #[cfg(test)]
    pub(crate) fn force_structural_score(&mut self, score: f64) {
        self.structural_score = score;
    }
}

/// Clamp into [0, 1]; NaN maps to 0.
fn clamp_unit(v: f64) -> f64 {
    if v.is_nan() {
        0.0
    } else {
        v.clamp(0.0, 1.0)
    }
}

fn deserialize_unit<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    f64::deserialize(deserializer).map(clamp_unit)
}

// ============ Capabilities ============

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Classification {
    pub document_type: DocumentType,
    pub confidence: f64,
    #[serde(default)]
    pub probabilities: Vec<(DocumentType, f64)>,
}

// ============ Validation ============

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub valid: bool,
    pub total_cells: usize,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn add_error(&mut self, index: usize, msg: impl fmt::Display) {
        self.errors.push(format!("[{}] {}", index, msg));
    }

    pub fn add_warning(&mut self, index: usize, msg: impl fmt::Display) {
        self.warnings.push(format!("[{}] {}", index, msg));
    }
}

// ============ Cache Payload ============

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeywordLocation {
    pub segment_id: String,
    pub content: String,
    pub page_number: Option<u32>,
    pub relevance_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedAnalysis {
    pub summary: String,
    pub keywords: Vec<String>,
    pub keyword_locations: HashMap<String, Vec<KeywordLocation>>,
    pub timestamp: DateTime<Utc>,
    pub hits: u64,
}

impl CachedAnalysis {
    pub fn new(
        summary: String,
        keywords: Vec<String>,
        keyword_locations: HashMap<String, Vec<KeywordLocation>>,
    ) -> Self {
        Self {
            summary,
            keywords,
            keyword_locations,
            timestamp: Utc::now(),
            hits: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub size: usize,
    pub capacity: usize,
    pub total_hits: u64,
}

// ============ Analysis Report ============

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentStatistics {
    pub type_distribution: BTreeMap<BlockType, usize>,
    pub avg_structural_score: f64,
    pub max_structural_score: f64,
    pub avg_resonance: f64,
    pub header_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeySection {
    pub segment_id: String,
    pub block_type: BlockType,
    pub content: String,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub document_type: DocumentType,
    pub document_hash: String,
    pub segments: Vec<Segment>,
    pub validation: ValidationResult,
    pub statistics: DocumentStatistics,
    pub key_sections: Vec<KeySection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cached: Option<CachedAnalysis>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> LayoutMetrics {
        LayoutMetrics {
            line_count: 1,
            word_count: 1,
            char_count: 5,
            indent_level: 0,
            relative_font_size: 1.0,
        }
    }

    #[test]
    fn test_segment_clamps_scores() {
        let mut seg = Segment::new("a".into(), BlockType::Paragraph, "hello".into(), 3, layout(), 1.7);
        assert_eq!(seg.importance(), 1.0);
        assert_eq!(seg.end_position, 8);
        seg.set_structural_score(-0.2);
        assert_eq!(seg.structural_score(), 0.0);
        seg.set_structural_score(f64::NAN);
        assert_eq!(seg.structural_score(), 0.0);
    }

    #[test]
    fn test_is_header_covers_heading_types_only() {
        assert!(BlockType::Title.is_heading());
        assert!(BlockType::SubsectionHeader.is_heading());
        assert!(!BlockType::Header.is_heading());
        assert!(!BlockType::ListItem.is_heading());
    }

    #[test]
    fn test_document_type_from_str() {
        assert_eq!("research_paper".parse::<DocumentType>().unwrap(), DocumentType::ResearchPaper);
        assert_eq!("Research-Paper".parse::<DocumentType>().unwrap(), DocumentType::ResearchPaper);
        assert_eq!("general".parse::<DocumentType>().unwrap(), DocumentType::General);
        assert!("novel".parse::<DocumentType>().is_err());
    }

    #[test]
    fn test_segment_serializes_camel_case() {
        let seg = Segment::new("a".into(), BlockType::SectionHeader, "1. Intro".into(), 0, layout(), 0.9);
        let json = serde_json::to_string(&seg).unwrap();
        assert!(json.contains("\"blockType\":\"SECTION_HEADER\""));
        assert!(json.contains("\"endPosition\":8"));
    }

    #[test]
    fn test_segment_deserialize_clamps_scores() {
        let seg = Segment::new("a".into(), BlockType::Paragraph, "hello".into(), 0, layout(), 0.5);
        let mut value = serde_json::to_value(&seg).unwrap();
        value["structuralScore"] = serde_json::json!(5.0);
        value["importance"] = serde_json::json!(9.0);
        let parsed: Segment = serde_json::from_value(value.clone()).unwrap();
        assert_eq!(parsed.structural_score(), 1.0);
        assert_eq!(parsed.importance(), 1.0);

        value["structuralScore"] = serde_json::json!(-3.0);
        let parsed: Segment = serde_json::from_value(value).unwrap();
        assert_eq!(parsed.structural_score(), 0.0);
    }

    #[test]
    fn test_segment_json_roundtrip_keeps_valid_scores() {
        let mut seg = Segment::new("a".into(), BlockType::Title, "Intro".into(), 2, layout(), 0.8);
        seg.set_structural_score(0.42);
        let parsed: Segment = serde_json::from_str(&serde_json::to_string(&seg).unwrap()).unwrap();
        assert_eq!(parsed, seg);
    }
}
