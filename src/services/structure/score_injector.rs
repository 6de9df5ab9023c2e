// Score Injector
// Fuses spectral resonance with rule-based or model-predicted structural scores.
//
// Model first, rules as fallback: a missing, failing or low-confidence capability
// always degrades to the deterministic rule path.

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::models::{BlockType, DocumentType, Segment};
use crate::services::capabilities::{Capability, DocumentClassifier, ScorePredictor};
use crate::services::config_store::ScoringConfig;

use super::filter_catalog::FilterCatalog;
use super::spectral::SpectralEngine;

const IMPORTANCE_WEIGHT: f64 = 0.4;
const RESONANCE_WEIGHT: f64 = 0.6;
const RESONANCE_SCALE: f64 = 10.0;
const HEADER_BOOST: f64 = 1.2;

/// importance * 0.4 + min(1, resonance / 10) * 0.6, boosted by 1.2 for headings
pub fn rule_score(importance: f64, resonance: f64, is_header: bool) -> f64 {
    let normalized = (resonance / RESONANCE_SCALE).min(1.0);
    let score = importance * IMPORTANCE_WEIGHT + normalized * RESONANCE_WEIGHT;
    if is_header {
        (score * HEADER_BOOST).min(1.0)
    } else {
        score
    }
}

/// Rule-based document type detection over block type ratios
pub fn detect_document_type_by_rules(segments: &[Segment]) -> DocumentType {
    let total = segments.len() as f64;
    let headers = segments.iter().filter(|s| s.is_header()).count();
    let lists = segments.iter().filter(|s| s.block_type == BlockType::ListItem).count();
    let paragraphs = segments.iter().filter(|s| s.block_type == BlockType::Paragraph).count();

    if paragraphs as f64 > total * 0.6 && headers > 3 {
        DocumentType::ResearchPaper
    } else if lists as f64 > total * 0.3 {
        DocumentType::Contract
    } else if headers as f64 > total * 0.3 {
        DocumentType::Presentation
    } else if headers > 2 {
        DocumentType::Report
    } else {
        DocumentType::General
    }
}

pub struct ScoreInjector {
    engine: SpectralEngine,
    catalog: Arc<FilterCatalog>,
    classifier: Capability<dyn DocumentClassifier>,
    predictor: Capability<dyn ScorePredictor>,
    confidence_threshold: f64,
    hybrid_weight: f64,
}

impl ScoreInjector {
    pub fn new(catalog: Arc<FilterCatalog>, config: &ScoringConfig) -> Self {
        Self {
            engine: SpectralEngine::new(),
            catalog,
            classifier: Capability::Unavailable,
            predictor: Capability::Unavailable,
            confidence_threshold: config.classifier_confidence_threshold,
            hybrid_weight: config.hybrid_weight.clamp(0.0, 1.0),
        }
    }

    pub fn with_classifier(mut self, classifier: Capability<dyn DocumentClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn with_predictor(mut self, predictor: Capability<dyn ScorePredictor>) -> Self {
        self.predictor = predictor;
        self
    }

    pub fn with_catalog(mut self, catalog: Arc<FilterCatalog>) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn catalog(&self) -> &FilterCatalog {
        &self.catalog
    }

    /// Detect the document type, trusting the classifier only above the confidence threshold
    pub fn detect_document_type(&self, segments: &[Segment]) -> DocumentType {
        if let Capability::Available(classifier) = &self.classifier {
            match classifier.predict(segments) {
                Ok(result) if result.confidence >= self.confidence_threshold => {
                    info!(
                        "[SCORE_INJECTOR] classifier type: {} (confidence {:.2})",
                        result.document_type, result.confidence
                    );
                    return result.document_type;
                }
                Ok(result) => warn!(
                    "[SCORE_INJECTOR] classifier confidence {:.2} below {:.2}, using rules",
                    result.confidence, self.confidence_threshold
                ),
                Err(e) => warn!("[SCORE_INJECTOR] classifier failed: {}, using rules", e),
            }
        }

        let detected = detect_document_type_by_rules(segments);
        info!("[SCORE_INJECTOR] rule-based type: {}", detected);
        detected
    }

    /// Score every segment in place and return the document type that was used.
    /// Empty input is left untouched.
    pub fn inject_scores(
        &self,
        segments: &mut [Segment],
        document_type: Option<DocumentType>,
    ) -> DocumentType {
        let document_type = match document_type {
            Some(t) => t,
            None => self.detect_document_type(segments),
        };
        info!(
            "[SCORE_INJECTOR] injecting scores: {} segments, type {}",
            segments.len(),
            document_type
        );
        if segments.is_empty() {
            return document_type;
        }

        let filter = self.catalog.get(Some(document_type));
        let resonances = self.engine.analyze_resonance(segments, filter.coefficients());

        for (segment, resonance) in segments.iter_mut().zip(resonances) {
            let score = self.score_segment(segment, resonance);
            segment.resonance_intensity = resonance;
            segment.set_structural_score(score);
        }

        info!("[SCORE_INJECTOR] score injection complete");
        document_type
    }

    fn score_segment(&self, segment: &Segment, resonance: f64) -> f64 {
        let rule = rule_score(segment.importance(), resonance, segment.is_header());

        let Capability::Available(predictor) = &self.predictor else {
            return rule;
        };
        match predictor.predict_score(segment, resonance) {
            Ok(ml) if ml.is_finite() => {
                let ml = ml.clamp(0.0, 1.0);
                let hybrid = ml * self.hybrid_weight + rule * (1.0 - self.hybrid_weight);
                debug!(
                    "[SCORE_INJECTOR] hybrid score {:.3} (ml {:.3}, rule {:.3})",
                    hybrid, ml, rule
                );
                hybrid
            }
            Ok(ml) => {
                warn!("[SCORE_INJECTOR] non-finite predicted score {}, using rules", ml);
                rule
            }
            Err(e) => {
                warn!("[SCORE_INJECTOR] score predictor failed: {}, using rules", e);
                rule
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CapabilityError;
    use crate::models::{Classification, LayoutMetrics};

    fn segment(block_type: BlockType, importance: f64, len: usize) -> Segment {
        let layout = LayoutMetrics {
            line_count: 1,
            word_count: 1,
            char_count: len,
            indent_level: 0,
            relative_font_size: 1.0,
        };
        Segment::new(
            format!("seg-{}", len),
            block_type,
            "y".repeat(len),
            0,
            layout,
            importance,
        )
    }

    fn injector() -> ScoreInjector {
        ScoreInjector::new(Arc::new(FilterCatalog::new()), &ScoringConfig::default())
    }

    struct FixedClassifier(DocumentType, f64);

    impl DocumentClassifier for FixedClassifier {
        fn predict(&self, _segments: &[Segment]) -> Result<Classification, CapabilityError> {
            Ok(Classification {
                document_type: self.0,
                confidence: self.1,
                probabilities: vec![(self.0, self.1)],
            })
        }
    }

    struct FailingClassifier;

    impl DocumentClassifier for FailingClassifier {
        fn predict(&self, _segments: &[Segment]) -> Result<Classification, CapabilityError> {
            Err(CapabilityError::Unavailable("model not loaded".into()))
        }
    }

    struct FixedPredictor(f64);

    impl ScorePredictor for FixedPredictor {
        fn predict_score(&self, _segment: &Segment, _resonance: f64) -> Result<f64, CapabilityError> {
            Ok(self.0)
        }
    }

    struct FailingPredictor;

    impl ScorePredictor for FailingPredictor {
        fn predict_score(&self, _segment: &Segment, _resonance: f64) -> Result<f64, CapabilityError> {
            Err(CapabilityError::Inference("tensor shape".into()))
        }
    }

    /// Four headings followed by seven paragraphs
    fn research_layout() -> Vec<Segment> {
        let mut segments = vec![
            segment(BlockType::Title, 1.0, 20),
            segment(BlockType::SectionHeader, 0.9, 15),
            segment(BlockType::SectionHeader, 0.9, 16),
            segment(BlockType::SubsectionHeader, 0.8, 17),
        ];
        segments.extend((0..7).map(|i| segment(BlockType::Paragraph, 0.5, 200 + i)));
        segments
    }

    #[test]
    fn test_rule_score_formula() {
        assert!((rule_score(0.5, 5.0, false) - 0.5).abs() < 1e-12);
        assert!((rule_score(0.5, 50.0, false) - 0.8).abs() < 1e-12);
        assert!((rule_score(0.5, 5.0, true) - 0.6).abs() < 1e-12);
        assert_eq!(rule_score(1.0, 20.0, true), 1.0);
    }

    #[test]
    fn test_header_boost_monotonicity() {
        for importance in [0.0, 0.3, 0.5, 0.8, 1.0] {
            for resonance in [0.0, 0.5, 2.0, 7.5, 12.0] {
                assert!(rule_score(importance, resonance, true) >= rule_score(importance, resonance, false));
            }
        }
    }

    #[test]
    fn test_auto_detect_research_paper() {
        // 7 of 11 paragraphs (63.6% > 60%) and 4 headings (> 3)
        let segments = research_layout();
        assert_eq!(detect_document_type_by_rules(&segments), DocumentType::ResearchPaper);
    }

    #[test]
    fn test_auto_detect_paragraph_ratio_is_strict() {
        // 6 of 10 paragraphs is exactly 60%, which does not qualify; 4 headings > 30% wins
        let mut segments = research_layout();
        segments.pop();
        assert_eq!(segments.len(), 10);
        assert_eq!(detect_document_type_by_rules(&segments), DocumentType::Presentation);
    }

    #[test]
    fn test_auto_detect_other_types() {
        let lists: Vec<Segment> = (0..4)
            .map(|i| segment(BlockType::ListItem, 0.6, i + 1))
            .chain((0..6).map(|i| segment(BlockType::Paragraph, 0.5, i + 50)))
            .collect();
        assert_eq!(detect_document_type_by_rules(&lists), DocumentType::Contract);

        let slides: Vec<Segment> = (0..2)
            .map(|i| segment(BlockType::Title, 1.0, i + 1))
            .chain((0..3).map(|i| segment(BlockType::Paragraph, 0.5, i + 50)))
            .collect();
        assert_eq!(detect_document_type_by_rules(&slides), DocumentType::Presentation);

        let report: Vec<Segment> = (0..3)
            .map(|i| segment(BlockType::SectionHeader, 0.9, i + 1))
            .chain((0..7).map(|i| segment(BlockType::Table, 0.7, i + 50)))
            .collect();
        assert_eq!(detect_document_type_by_rules(&report), DocumentType::Report);

        let plain: Vec<Segment> = (0..5).map(|i| segment(BlockType::Paragraph, 0.5, i + 50)).collect();
        assert_eq!(detect_document_type_by_rules(&plain), DocumentType::General);
        assert_eq!(detect_document_type_by_rules(&[]), DocumentType::General);
    }

    #[test]
    fn test_classifier_used_only_when_confident() {
        let segments = research_layout();
        let confident = injector().with_classifier(Capability::available(Arc::new(FixedClassifier(
            DocumentType::Contract,
            0.9,
        ))));
        assert_eq!(confident.detect_document_type(&segments), DocumentType::Contract);

        let unsure = injector().with_classifier(Capability::available(Arc::new(FixedClassifier(
            DocumentType::Contract,
            0.4,
        ))));
        assert_eq!(
            unsure.detect_document_type(&segments),
            detect_document_type_by_rules(&segments)
        );

        let failing = injector().with_classifier(Capability::available(Arc::new(FailingClassifier)));
        assert_eq!(
            failing.detect_document_type(&segments),
            detect_document_type_by_rules(&segments)
        );
    }

    #[test]
    fn test_empty_input_is_noop() {
        let mut segments: Vec<Segment> = Vec::new();
        assert_eq!(injector().inject_scores(&mut segments, None), DocumentType::General);
        assert!(segments.is_empty());
    }

    #[test]
    fn test_determinism_identical_segments_general_filter() {
        let make = || vec![segment(BlockType::Paragraph, 0.8, 50), segment(BlockType::Paragraph, 0.8, 50)];
        let inj = injector();

        let mut first = make();
        let mut second = make();
        inj.inject_scores(&mut first, Some(DocumentType::General));
        inj.inject_scores(&mut second, Some(DocumentType::General));

        assert_eq!(first[0].resonance_intensity, first[1].resonance_intensity);
        assert_eq!(first[0].structural_score(), first[1].structural_score());
        assert_eq!(first[0].resonance_intensity, second[0].resonance_intensity);
        assert_eq!(first[0].structural_score(), second[0].structural_score());

        // Identity filter: resonance equals the signal value 0.8*2 + ln(51)/10
        let expected = 1.6 + 51f64.ln() / 10.0;
        assert!((first[0].resonance_intensity - expected).abs() < 1e-9);
    }

    #[test]
    fn test_scores_stay_in_unit_range() {
        let inj = injector();
        for doc_type in DocumentType::ALL {
            let mut segments = research_layout();
            segments.push(segment(BlockType::Table, 0.7, 5000));
            segments.push(segment(BlockType::Title, 1.0, 0));
            inj.inject_scores(&mut segments, Some(doc_type));
            for s in &segments {
                assert!((0.0..=1.0).contains(&s.structural_score()), "{:?}", doc_type);
                assert!(s.resonance_intensity >= 0.0);
            }
        }
    }

    #[test]
    fn test_hybrid_score_with_predictor() {
        let inj = injector().with_predictor(Capability::available(Arc::new(FixedPredictor(1.0))));
        let mut segments = vec![segment(BlockType::Paragraph, 0.5, 30)];
        inj.inject_scores(&mut segments, Some(DocumentType::General));
        let rule = rule_score(0.5, segments[0].resonance_intensity, false);
        let expected = 0.7 + rule * 0.3;
        assert!((segments[0].structural_score() - expected).abs() < 1e-12);
    }

    #[test]
    fn test_out_of_range_prediction_is_clamped() {
        let inj = injector().with_predictor(Capability::available(Arc::new(FixedPredictor(7.0))));
        let mut segments = research_layout();
        inj.inject_scores(&mut segments, None);
        assert!(segments.iter().all(|s| s.structural_score() <= 1.0));

        let nan = injector().with_predictor(Capability::available(Arc::new(FixedPredictor(f64::NAN))));
        let mut nan_segments = vec![segment(BlockType::Paragraph, 0.5, 30)];
        nan.inject_scores(&mut nan_segments, Some(DocumentType::General));
        let rule = rule_score(0.5, nan_segments[0].resonance_intensity, false);
        assert_eq!(nan_segments[0].structural_score(), rule);
    }

    #[test]
    fn test_failing_predictor_falls_back_to_rules() {
        let failing = injector().with_predictor(Capability::available(Arc::new(FailingPredictor)));
        let plain = injector();
        let mut a = research_layout();
        let mut b = research_layout();
        failing.inject_scores(&mut a, Some(DocumentType::Report));
        plain.inject_scores(&mut b, Some(DocumentType::Report));
        for (x, y) in a.iter().zip(&b) {
            assert_eq!(x.structural_score(), y.structural_score());
        }
    }
}
