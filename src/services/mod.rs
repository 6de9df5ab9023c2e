// Core Services
// Text processing, configuration, model capabilities and the structure scoring engine

pub mod text_processor;
pub mod config_store;
pub mod capabilities;
pub mod structure;

pub use text_processor::*;
pub use config_store::*;
pub use capabilities::{Capability, DocumentClassifier, ScorePredictor, SentenceEncoder};

pub use structure::{
    DocumentAnalyzer,
    FilterCatalog,
    ResonanceFilter,
    ResultCache,
    ScoreInjector,
    SegmentEncoder,
    SpectralEngine,
    Spectrum,
    StructureValidator,
};
