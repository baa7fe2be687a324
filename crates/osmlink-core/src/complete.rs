//! Fully linked elements: every reference replaced by a shared handle.
//!
//! Complete elements are immutable once built. Handles are `Arc`s, so the same
//! point referenced by many polylines is one allocation, and the whole graph can
//! be shared read-only across threads.

use crate::element::{Coordinate, ElementId, ElementType, Tags};
use std::sync::Arc;

/// A materialized point.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletePoint {
    pub id: ElementId,
    pub coordinate: Coordinate,
    pub tags: Tags,
}

/// A materialized polyline holding shared point handles in path order.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletePolyline {
    pub id: ElementId,
    pub points: Vec<Arc<CompletePoint>>,
    pub tags: Tags,
}

impl CompletePolyline {
    /// The coordinate sequence of this path.
    pub fn coordinates(&self) -> Vec<Coordinate> {
        self.points.iter().map(|p| p.coordinate).collect()
    }

    pub fn point_ids(&self) -> Vec<ElementId> {
        self.points.iter().map(|p| p.id).collect()
    }
}

/// A resolved composite member.
#[derive(Debug, Clone, PartialEq)]
pub struct CompleteMember {
    pub role: String,
    pub element: CompleteElement,
}

/// A materialized composite.
#[derive(Debug, Clone, PartialEq)]
pub struct CompleteComposite {
    pub id: ElementId,
    pub members: Vec<CompleteMember>,
    pub tags: Tags,
}

/// A shared handle to any materialized element.
///
/// Equality is structural; use [`CompleteElement::same_instance`] to compare
/// identity.
#[derive(Debug, Clone, PartialEq)]
pub enum CompleteElement {
    Point(Arc<CompletePoint>),
    Polyline(Arc<CompletePolyline>),
    Composite(Arc<CompleteComposite>),
}

impl CompleteElement {
    pub fn id(&self) -> ElementId {
        match self {
            CompleteElement::Point(p) => p.id,
            CompleteElement::Polyline(p) => p.id,
            CompleteElement::Composite(c) => c.id,
        }
    }

    pub fn element_type(&self) -> ElementType {
        match self {
            CompleteElement::Point(_) => ElementType::Point,
            CompleteElement::Polyline(_) => ElementType::Polyline,
            CompleteElement::Composite(_) => ElementType::Composite,
        }
    }

    pub fn tags(&self) -> &Tags {
        match self {
            CompleteElement::Point(p) => &p.tags,
            CompleteElement::Polyline(p) => &p.tags,
            CompleteElement::Composite(c) => &c.tags,
        }
    }

    /// True when both handles point at the same allocation.
    pub fn same_instance(&self, other: &CompleteElement) -> bool {
        match (self, other) {
            (CompleteElement::Point(a), CompleteElement::Point(b)) => Arc::ptr_eq(a, b),
            (CompleteElement::Polyline(a), CompleteElement::Polyline(b)) => Arc::ptr_eq(a, b),
            (CompleteElement::Composite(a), CompleteElement::Composite(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    pub fn as_point(&self) -> Option<&Arc<CompletePoint>> {
        match self {
            CompleteElement::Point(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_polyline(&self) -> Option<&Arc<CompletePolyline>> {
        match self {
            CompleteElement::Polyline(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_composite(&self) -> Option<&Arc<CompleteComposite>> {
        match self {
            CompleteElement::Composite(c) => Some(c),
            _ => None,
        }
    }
}

impl From<Arc<CompletePoint>> for CompleteElement {
    fn from(p: Arc<CompletePoint>) -> Self {
        CompleteElement::Point(p)
    }
}

impl From<Arc<CompletePolyline>> for CompleteElement {
    fn from(p: Arc<CompletePolyline>) -> Self {
        CompleteElement::Polyline(p)
    }
}

impl From<Arc<CompleteComposite>> for CompleteElement {
    fn from(c: Arc<CompleteComposite>) -> Self {
        CompleteElement::Composite(c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(id: ElementId, lat: f64, lon: f64) -> Arc<CompletePoint> {
        Arc::new(CompletePoint {
            id,
            coordinate: Coordinate::new(lat, lon),
            tags: Tags::new(),
        })
    }

    #[test]
    fn test_same_instance_vs_equality() {
        let a = CompleteElement::Point(point(1, 0.0, 0.0));
        let b = CompleteElement::Point(point(1, 0.0, 0.0));
        assert_eq!(a, b);
        assert!(!a.same_instance(&b));
        assert!(a.same_instance(&a.clone()));
    }

    #[test]
    fn test_polyline_coordinates() {
        let shared = point(2, 1.0, 0.0);
        let line = CompletePolyline {
            id: 9,
            points: vec![point(1, 0.0, 0.0), shared.clone(), shared],
            tags: Tags::new(),
        };
        assert_eq!(line.point_ids(), vec![1, 2, 2]);
        assert_eq!(line.coordinates()[1], Coordinate::new(1.0, 0.0));
        assert!(Arc::ptr_eq(&line.points[1], &line.points[2]));
    }
}
