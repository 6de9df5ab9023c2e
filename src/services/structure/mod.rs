// Structure Module
// Spectral structure scoring organized into specialized submodules:
// - token_mixer: Hash-based fallback sentence embeddings
// - segment_encoder: Paragraph text to typed segments with layout metrics
// - spectral: Forward/inverse DFT, filtering, power spectrum and band energy
// - filter_catalog: Per-document-type resonance filters
// - score_injector: Resonance plus rule or model scores, document type detection
// - validator: Integrity and consistency checks
// - result_cache: Content-hash keyed LRU cache for downstream artifacts
// - analyzer: End-to-end document pipeline

pub mod token_mixer;
pub mod segment_encoder;
pub mod spectral;
pub mod filter_catalog;
pub mod score_injector;
pub mod validator;
pub mod result_cache;
pub mod analyzer;

// Re-export commonly used items
pub use segment_encoder::{calculate_importance, infer_block_type, layout_metrics, SegmentEncoder};
pub use spectral::{segment_signal, SpectralEngine, Spectrum};
pub use filter_catalog::{FilterCatalog, ResonanceFilter, FILTER_LENGTH};
pub use score_injector::{detect_document_type_by_rules, rule_score, ScoreInjector};
pub use validator::StructureValidator;
pub use result_cache::{document_hash, hash_content, ResultCache, DEFAULT_CACHE_CAPACITY};
pub use analyzer::{compute_statistics, key_sections, ranked_segments, DocumentAnalyzer};
