// Structure Validator
// Integrity and consistency checks over scored segments. Findings are data, never errors.

use tracing::info;

use crate::models::{Segment, ValidationResult};

#[derive(Debug, Clone, Copy, Default)]
pub struct StructureValidator;

impl StructureValidator {
    pub fn new() -> Self {
        Self
    }

    pub fn validate(&self, segments: &[Segment]) -> ValidationResult {
        info!("[VALIDATOR] validating {} segments", segments.len());

        let mut result = ValidationResult {
            total_cells: segments.len(),
            ..ValidationResult::default()
        };

        validate_integrity(segments, &mut result);
        validate_consistency(segments, &mut result);

        result.valid = result.errors.is_empty();
        info!(
            "[VALIDATOR] done: {} errors, {} warnings",
            result.errors.len(),
            result.warnings.len()
        );
        result
    }
}

fn validate_integrity(segments: &[Segment], result: &mut ValidationResult) {
    for (i, segment) in segments.iter().enumerate() {
        if segment.id.is_empty() {
            result.add_error(i, "id missing");
        }
        if segment.content.is_empty() {
            result.add_warning(i, "content empty");
        }
        let score = segment.structural_score();
        if !(0.0..=1.0).contains(&score) {
            result.add_error(i, format!("score out of range: {}", score));
        }
    }
}

fn validate_consistency(segments: &[Segment], result: &mut ValidationResult) {
    for (i, pair) in segments.windows(2).enumerate() {
        if pair[1].position < pair[0].end_position {
            result.add_warning(i + 1, "position overlap");
        }
    }
}
