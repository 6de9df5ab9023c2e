// Filter Catalog
// Per-document-type resonance filters P[k], built once and shared read-only

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info};

use crate::error::{ResonanceError, Result};
use crate::models::DocumentType;

pub const FILTER_LENGTH: usize = 128;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResonanceFilter {
    pub name: String,
    pub document_type: DocumentType,
    coefficients: Vec<f64>,
    pub description: String,
}

impl ResonanceFilter {
    /// Coefficients must be exactly `FILTER_LENGTH` finite values
    pub fn new(
        name: impl Into<String>,
        document_type: DocumentType,
        coefficients: Vec<f64>,
        description: impl Into<String>,
    ) -> Result<Self> {
        if coefficients.len() != FILTER_LENGTH {
            return Err(ResonanceError::InvalidFilter(format!(
                "expected {} coefficients, got {}",
                FILTER_LENGTH,
                coefficients.len()
            )));
        }
        if let Some(bad) = coefficients.iter().find(|c| !c.is_finite()) {
            return Err(ResonanceError::InvalidFilter(format!("non-finite coefficient {}", bad)));
        }
        Ok(Self {
            name: name.into(),
            document_type,
            coefficients,
            description: description.into(),
        })
    }

    /// Built-in filter from a rule over normalized frequency `index / 128`
    fn from_rule(
        name: &str,
        document_type: DocumentType,
        description: &str,
        rule: impl Fn(f64) -> f64,
    ) -> Self {
        let coefficients = (0..FILTER_LENGTH)
            .map(|i| rule(i as f64 / FILTER_LENGTH as f64))
            .collect();
        Self {
            name: name.to_string(),
            document_type,
            coefficients,
            description: description.to_string(),
        }
    }

    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }
}

fn research_paper_filter() -> ResonanceFilter {
    ResonanceFilter::from_rule(
        "Research Paper Filter",
        DocumentType::ResearchPaper,
        "Low-pass emphasis on the introduction-body-conclusion arc",
        |freq| {
            if freq < 0.1 {
                2.0
            } else if freq < 0.3 {
                1.5
            } else if freq < 0.5 {
                1.0
            } else {
                0.3
            }
        },
    )
}

fn report_filter() -> ResonanceFilter {
    ResonanceFilter::from_rule(
        "Report Filter",
        DocumentType::Report,
        "Emphasizes the summary-body-conclusion layout of reports",
        |freq| {
            if freq < 0.2 {
                1.8
            } else if freq < 0.5 {
                1.5
            } else if freq < 0.7 {
                0.8
            } else {
                0.2
            }
        },
    )
}

fn contract_filter() -> ResonanceFilter {
    ResonanceFilter::from_rule(
        "Contract Filter",
        DocumentType::Contract,
        "Band-pass on the repeating clause rhythm of contracts",
        |freq| {
            if (0.2..=0.4).contains(&freq) {
                2.0
            } else if freq < 0.6 {
                1.2
            } else {
                0.4
            }
        },
    )
}

fn presentation_filter() -> ResonanceFilter {
    ResonanceFilter::from_rule(
        "Presentation Filter",
        DocumentType::Presentation,
        "Mid-band emphasis on slide-by-slide structure",
        |freq| {
            if freq < 0.3 {
                1.0
            } else if freq < 0.7 {
                1.8
            } else {
                0.5
            }
        },
    )
}

fn general_filter() -> ResonanceFilter {
    ResonanceFilter::from_rule(
        "General Filter",
        DocumentType::General,
        "Passes every frequency component unchanged",
        |_| 1.0,
    )
}

#[derive(Debug, Clone)]
pub struct FilterCatalog {
    filters: HashMap<DocumentType, ResonanceFilter>,
    general: ResonanceFilter,
}

impl Default for FilterCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl FilterCatalog {
    pub fn new() -> Self {
        let mut catalog = Self {
            filters: HashMap::new(),
            general: general_filter(),
        };
        for filter in [
            research_paper_filter(),
            report_filter(),
            contract_filter(),
            presentation_filter(),
            general_filter(),
        ] {
            catalog.insert(filter);
        }
        info!("[FILTER_CATALOG] initialized with {} filters", catalog.filters.len());
        catalog
    }

    fn insert(&mut self, filter: ResonanceFilter) {
        debug!("[FILTER_CATALOG] register {} - {}", filter.document_type, filter.name);
        self.filters.insert(filter.document_type, filter);
    }

    /// Add or override a filter. The filter was validated when it was constructed.
    pub fn register(&mut self, filter: ResonanceFilter) {
        self.insert(filter);
    }

    /// Resolve the filter for a type; unregistered or missing types get the pass-through filter
    pub fn get(&self, document_type: Option<DocumentType>) -> &ResonanceFilter {
        document_type
            .and_then(|t| self.filters.get(&t))
            .unwrap_or(&self.general)
    }

    pub fn all_filters(&self) -> HashMap<DocumentType, ResonanceFilter> {
        self.filters.clone()
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}
