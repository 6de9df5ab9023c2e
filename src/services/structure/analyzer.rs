// Document Analyzer
// End-to-end pipeline: normalize, encode, inject scores, validate, summarize, cache lookup

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::{ResonanceError, Result};
use crate::models::{
    AnalysisReport, CachedAnalysis, DocumentStatistics, DocumentType, KeySection,
    KeywordLocation, Segment,
};
use crate::services::capabilities::{
    Capability, DocumentClassifier, ScorePredictor, SentenceEncoder,
};
use crate::services::config_store::ScoringConfig;
use crate::services::text_processor::normalize_punctuation;

use super::filter_catalog::FilterCatalog;
use super::result_cache::{document_hash, ResultCache};
use super::score_injector::ScoreInjector;
use super::segment_encoder::SegmentEncoder;
use super::validator::StructureValidator;

pub struct DocumentAnalyzer {
    encoder: SegmentEncoder,
    injector: ScoreInjector,
    validator: StructureValidator,
    cache: Arc<ResultCache>,
    config: ScoringConfig,
}

impl DocumentAnalyzer {
    /// Build an analyzer with the built-in filters, no model capabilities and a private cache
    pub fn new(config: ScoringConfig) -> Result<Self> {
        config.validate()?;
        let catalog = Arc::new(FilterCatalog::new());
        Ok(Self {
            encoder: SegmentEncoder::default().with_embedding_enabled(config.embedding_enabled),
            injector: ScoreInjector::new(catalog, &config),
            validator: StructureValidator::new(),
            cache: Arc::new(ResultCache::new(config.cache_capacity)),
            config,
        })
    }

    pub fn with_sentence_encoder(mut self, encoder: Capability<dyn SentenceEncoder>) -> Self {
        self.encoder = SegmentEncoder::new(encoder).with_embedding_enabled(self.config.embedding_enabled);
        self
    }

    pub fn with_classifier(mut self, classifier: Capability<dyn DocumentClassifier>) -> Self {
        self.injector = self.injector.with_classifier(classifier);
        self
    }

    pub fn with_score_predictor(mut self, predictor: Capability<dyn ScorePredictor>) -> Self {
        self.injector = self.injector.with_predictor(predictor);
        self
    }

    /// Share one cache between several analyzers
    pub fn with_cache(mut self, cache: Arc<ResultCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_catalog(mut self, catalog: Arc<FilterCatalog>) -> Self {
        self.injector = self.injector.with_catalog(catalog);
        self
    }

    pub fn cache(&self) -> &Arc<ResultCache> {
        &self.cache
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Analyze raw text. Form feeds separate pages, blank lines separate paragraphs.
    pub fn analyze_text(&self, text: &str, document_type: Option<DocumentType>) -> Result<AnalysisReport> {
        let segments = self.encoder.encode_text(&normalize_punctuation(text));
        self.analyze_segments(segments, document_type)
    }

    pub fn analyze_pages(&self, pages: &[String], document_type: Option<DocumentType>) -> Result<AnalysisReport> {
        let pages: Vec<String> = pages.iter().map(|p| normalize_punctuation(p)).collect();
        let segments = self.encoder.encode_pages(&pages);
        self.analyze_segments(segments, document_type)
    }

    /// Paragraphs are taken as given (indentation included); blank entries are skipped
    pub fn analyze_paragraphs(
        &self,
        paragraphs: &[String],
        document_type: Option<DocumentType>,
    ) -> Result<AnalysisReport> {
        let paragraphs: Vec<&str> = paragraphs
            .iter()
            .map(|p| p.trim_start_matches('\n').trim_end())
            .filter(|p| !p.trim().is_empty())
            .collect();
        let segments = self.encoder.encode_paragraphs(&paragraphs);
        self.analyze_segments(segments, document_type)
    }

    fn analyze_segments(
        &self,
        mut segments: Vec<Segment>,
        document_type: Option<DocumentType>,
    ) -> Result<AnalysisReport> {
        info!("[ANALYZER] analyzing {} segments", segments.len());

        let document_type = self.injector.inject_scores(&mut segments, document_type);
        let validation = self.validator.validate(&segments);
        if !validation.valid {
            warn!("[ANALYZER] validation reported {} errors", validation.errors.len());
        }

        let statistics = compute_statistics(&segments);
        let key_sections = key_sections(
            &segments,
            self.config.key_section_threshold,
            self.config.key_section_limit,
        );
        let hash = document_hash(&segments);
        let cached = self.cache.get(&hash);

        info!(
            "[ANALYZER] done: type {}, {} key sections, cached {}",
            document_type,
            key_sections.len(),
            cached.is_some()
        );

        Ok(AnalysisReport {
            document_type,
            document_hash: hash,
            segments,
            validation,
            statistics,
            key_sections,
            cached,
        })
    }

    /// Store downstream artifacts (summary, keywords) under a report's document hash
    pub fn store_artifacts(
        &self,
        document_hash: &str,
        summary: String,
        keywords: Vec<String>,
        keyword_locations: HashMap<String, Vec<KeywordLocation>>,
    ) {
        self.cache
            .put(document_hash, CachedAnalysis::new(summary, keywords, keyword_locations));
    }

    /// Analyze documents concurrently on the blocking pool. Results keep input order.
    pub async fn analyze_batch(
        self: Arc<Self>,
        documents: Vec<String>,
        document_type: Option<DocumentType>,
    ) -> Vec<Result<AnalysisReport>> {
        info!("[ANALYZER] batch of {} documents", documents.len());

        let handles: Vec<_> = documents
            .into_iter()
            .map(|doc| {
                let analyzer = Arc::clone(&self);
                tokio::task::spawn_blocking(move || analyzer.analyze_text(&doc, document_type))
            })
            .collect();

        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            results.push(match handle.await {
                Ok(report) => report,
                Err(e) => {
                    warn!("[ANALYZER] batch task failed: {}", e);
                    Err(ResonanceError::Task(e.to_string()))
                }
            });
        }
        results
    }
}

pub fn compute_statistics(segments: &[Segment]) -> DocumentStatistics {
    if segments.is_empty() {
        return DocumentStatistics::default();
    }

    let mut type_distribution = BTreeMap::new();
    for segment in segments {
        *type_distribution.entry(segment.block_type).or_insert(0) += 1;
    }

    let count = segments.len() as f64;
    let total_score: f64 = segments.iter().map(|s| s.structural_score()).sum();
    let total_resonance: f64 = segments.iter().map(|s| s.resonance_intensity).sum();
    let max_score = segments
        .iter()
        .map(|s| s.structural_score())
        .fold(0.0_f64, f64::max);

    DocumentStatistics {
        type_distribution,
        avg_structural_score: total_score / count,
        max_structural_score: max_score,
        avg_resonance: total_resonance / count,
        header_count: segments.iter().filter(|s| s.is_header()).count(),
    }
}

/// Segments scoring strictly above `threshold`, in document order, at most `limit`
pub fn key_sections(segments: &[Segment], threshold: f64, limit: usize) -> Vec<KeySection> {
    segments
        .iter()
        .filter(|s| s.structural_score() > threshold)
        .take(limit)
        .map(|s| KeySection {
            segment_id: s.id.clone(),
            block_type: s.block_type,
            content: s.content.clone(),
            score: s.structural_score(),
        })
        .collect()
}

/// Top `n` segments by structural score; ties keep document order
pub fn ranked_segments(report: &AnalysisReport, n: usize) -> Vec<&Segment> {
    let mut ranked: Vec<&Segment> = report.segments.iter().collect();
    ranked.sort_by(|a, b| b.structural_score().total_cmp(&a.structural_score()));
    ranked.truncate(n);
    ranked
}
