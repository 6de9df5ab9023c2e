// Model Capabilities
// Optional sentence encoder, document classifier and score predictor hooks.
// Every call site matches on `Capability` and falls back to the rule-based path.

use std::fmt;
use std::sync::Arc;

use crate::error::CapabilityError;
use crate::models::{Classification, Segment};

/// Sentence embedding model (e.g. a 384-dim Sentence-BERT export)
pub trait SentenceEncoder: Send + Sync {
    fn encode(&self, text: &str) -> Result<Vec<f64>, CapabilityError>;
    fn dimension(&self) -> usize;
}

/// Document type classifier over whole-document features
pub trait DocumentClassifier: Send + Sync {
    fn predict(&self, segments: &[Segment]) -> Result<Classification, CapabilityError>;
}

/// Per-segment structural score model. Output is expected in [0, 1].
pub trait ScorePredictor: Send + Sync {
    fn predict_score(&self, segment: &Segment, resonance: f64) -> Result<f64, CapabilityError>;
}

pub enum Capability<T: ?Sized> {
    Unavailable,
    Available(Arc<T>),
}

impl<T: ?Sized> Capability<T> {
    pub fn available(handle: Arc<T>) -> Self {
        Capability::Available(handle)
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Capability::Available(_))
    }
}

impl<T: ?Sized> Default for Capability<T> {
    fn default() -> Self {
        Capability::Unavailable
    }
}

impl<T: ?Sized> Clone for Capability<T> {
    fn clone(&self) -> Self {
        match self {
            Capability::Unavailable => Capability::Unavailable,
            Capability::Available(h) => Capability::Available(Arc::clone(h)),
        }
    }
}

impl<T: ?Sized> fmt::Debug for Capability<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capability::Unavailable => f.write_str("Unavailable"),
            Capability::Available(_) => f.write_str("Available"),
        }
    }
}

/// Six whole-document features: header, list and paragraph ratios,
/// mean length / 1000, mean importance, ln(count + 1) / 10.
pub fn document_features(segments: &[Segment]) -> [f32; 6] {
    if segments.is_empty() {
        return [0.0; 6];
    }
    let total = segments.len() as f64;
    let headers = segments.iter().filter(|s| s.is_header()).count() as f64;
    let lists = segments
        .iter()
        .filter(|s| s.block_type == crate::models::BlockType::ListItem)
        .count() as f64;
    let paragraphs = segments
        .iter()
        .filter(|s| s.block_type == crate::models::BlockType::Paragraph)
        .count() as f64;
    let avg_len = segments.iter().map(|s| s.len() as f64).sum::<f64>() / total;
    let avg_importance = segments.iter().map(|s| s.importance()).sum::<f64>() / total;

    [
        (headers / total) as f32,
        (lists / total) as f32,
        (paragraphs / total) as f32,
        (avg_len / 1000.0) as f32,
        avg_importance as f32,
        ((total + 1.0).ln() / 10.0) as f32,
    ]
}

/// Seven per-segment features for score prediction
pub fn segment_features(segment: &Segment, resonance: f64) -> [f32; 7] {
    [
        segment.importance() as f32,
        resonance as f32,
        if segment.is_header() { 1.0 } else { 0.0 },
        (segment.len() as f64 / 1000.0) as f32,
        segment.layout.relative_font_size as f32,
        (segment.layout.indent_level as f64 / 10.0) as f32,
        (segment.layout.word_count as f64 / 100.0) as f32,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BlockType, LayoutMetrics};

    fn seg(block_type: BlockType, content: &str) -> Segment {
        let layout = LayoutMetrics {
            line_count: 1,
            word_count: content.split_whitespace().count(),
            char_count: content.chars().count(),
            indent_level: 2,
            relative_font_size: 1.2,
        };
        Segment::new("id".into(), block_type, content.into(), 0, layout, block_type.base_importance())
    }

    #[test]
    fn test_capability_default_is_unavailable() {
        let cap: Capability<dyn ScorePredictor> = Capability::default();
        assert!(!cap.is_available());
    }

    #[test]
    fn test_document_features() {
        let segments = vec![
            seg(BlockType::Title, "Title"),
            seg(BlockType::Paragraph, "Body text here."),
            seg(BlockType::ListItem, "- item"),
            seg(BlockType::Paragraph, "More body."),
        ];
        let f = document_features(&segments);
        assert!((f[0] - 0.25).abs() < 1e-6);
        assert!((f[1] - 0.25).abs() < 1e-6);
        assert!((f[2] - 0.5).abs() < 1e-6);
        assert!((f[5] - (5.0f32.ln() / 10.0)).abs() < 1e-6);
        assert_eq!(document_features(&[]), [0.0; 6]);
    }

    #[test]
    fn test_segment_features() {
        let s = seg(BlockType::SectionHeader, "1. Methods");
        let f = segment_features(&s, 3.5);
        assert!((f[0] - 0.9).abs() < 1e-6);
        assert!((f[1] - 3.5).abs() < 1e-6);
        assert_eq!(f[2], 1.0);
        assert!((f[5] - 0.2).abs() < 1e-6);
    }
}
