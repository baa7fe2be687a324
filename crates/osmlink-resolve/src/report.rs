//! What the resolver kept, what it dropped, and why.

use osmlink_core::config::Strategy;
use osmlink_core::element::{ElementId, ElementType};
use serde::Serialize;
use std::fmt;

/// Why an element was left out of the output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExclusionReason {
    /// A referenced element was never materialized (or never streamed).
    MissingMember {
        element_type: ElementType,
        id: ElementId,
    },
    /// A composite member's type tag was missing or not point, polyline or composite.
    MalformedMember { position: usize },
    /// A referenced composite was itself excluded.
    DependencyExcluded { id: ElementId },
    /// Blocked on a composite dependency cycle with no way out.
    Cycle,
    /// The identifier was already defined earlier in the stream.
    Duplicate,
}

impl fmt::Display for ExclusionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExclusionReason::MissingMember { element_type, id } => {
                write!(f, "missing {} {}", element_type, id)
            }
            ExclusionReason::MalformedMember { position } => {
                write!(f, "member #{} has an unrecognized type", position)
            }
            ExclusionReason::DependencyExcluded { id } => {
                write!(f, "depends on excluded composite {}", id)
            }
            ExclusionReason::Cycle => f.write_str("composite dependency cycle"),
            ExclusionReason::Duplicate => f.write_str("duplicate identifier"),
        }
    }
}

/// A single dropped element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Exclusion {
    pub element_type: ElementType,
    pub id: ElementId,
    pub reason: ExclusionReason,
}

/// Summary of one resolution run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ResolutionReport {
    /// Strategy actually used (may differ from the configured one for
    /// sources that cannot reset).
    pub strategy: Strategy,
    /// Number of times the source was read from the start.
    pub passes: usize,
    /// Elements in one full read of the source.
    pub input_elements: usize,
    pub points: usize,
    pub polylines: usize,
    pub composites: usize,
    /// Dropped elements in the order they were dropped.
    pub excluded: Vec<Exclusion>,
    /// Identity slots left unresolved: every dropped element except
    /// duplicates, plus every
    /// identifier that was referenced but never defined, sorted by (type, id).
    pub unresolved: Vec<(ElementType, ElementId)>,
}

impl ResolutionReport {
    pub fn resolved(&self) -> usize {
        self.points + self.polylines + self.composites
    }

    pub fn is_excluded(&self, element_type: ElementType, id: ElementId) -> bool {
        self.excluded
            .iter()
            .any(|e| e.element_type == element_type && e.id == id)
    }

    pub fn excluded_of(&self, element_type: ElementType) -> impl Iterator<Item = &Exclusion> {
        self.excluded
            .iter()
            .filter(move |e| e.element_type == element_type)
    }

    /// One-line human-readable summary.
    pub fn summary(&self) -> String {
        format!(
            "{} of {} elements resolved ({} points, {} polylines, {} composites), {} excluded, {} pass(es) via {}",
            self.resolved(),
            self.input_elements,
            self.points,
            self.polylines,
            self.composites,
            self.excluded.len(),
            self.passes,
            self.strategy,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_display() {
        let reason = ExclusionReason::MissingMember {
            element_type: ElementType::Point,
            id: 10,
        };
        assert_eq!(reason.to_string(), "missing point 10");
        assert_eq!(
            ExclusionReason::DependencyExcluded { id: 3 }.to_string(),
            "depends on excluded composite 3"
        );
    }

    #[test]
    fn test_summary_and_lookup() {
        let report = ResolutionReport {
            strategy: Strategy::Buffer,
            passes: 1,
            input_elements: 5,
            points: 3,
            polylines: 1,
            composites: 0,
            excluded: vec![Exclusion {
                element_type: ElementType::Composite,
                id: 1,
                reason: ExclusionReason::Cycle,
            }],
            unresolved: vec![(ElementType::Composite, 1)],
        };
        assert_eq!(report.resolved(), 4);
        assert!(report.is_excluded(ElementType::Composite, 1));
        assert!(!report.is_excluded(ElementType::Polyline, 1));
        assert_eq!(report.excluded_of(ElementType::Composite).count(), 1);
        assert!(report.summary().starts_with("4 of 5 elements resolved"));
    }
}
