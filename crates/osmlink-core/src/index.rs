//! Identity index: (type, id) → materialized element.
//!
//! Three independent namespaces. Each slot is either resolved (holding the one
//! shared instance), marked unresolved, or absent. Inserting into a slot that
//! is already resolved is refused, so the first definition of an identifier
//! is the one every referencer shares.

use crate::complete::{CompleteComposite, CompleteElement, CompletePoint, CompletePolyline};
use crate::element::{ElementId, ElementType};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// State of a single (type, id) slot.
#[derive(Debug, Clone, PartialEq)]
pub enum Slot {
    Resolved(CompleteElement),
    Unresolved,
    Absent,
}

#[derive(Debug, Default)]
pub struct IdentityIndex {
    points: HashMap<ElementId, Arc<CompletePoint>>,
    polylines: HashMap<ElementId, Arc<CompletePolyline>>,
    composites: HashMap<ElementId, Arc<CompleteComposite>>,
    unresolved: HashSet<(ElementType, ElementId)>,
}

impl IdentityIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn point(&self, id: ElementId) -> Option<&Arc<CompletePoint>> {
        self.points.get(&id)
    }

    pub fn polyline(&self, id: ElementId) -> Option<&Arc<CompletePolyline>> {
        self.polylines.get(&id)
    }

    pub fn composite(&self, id: ElementId) -> Option<&Arc<CompleteComposite>> {
        self.composites.get(&id)
    }

    /// Cross-type lookup returning a shared handle.
    pub fn get(&self, ty: ElementType, id: ElementId) -> Option<CompleteElement> {
        match ty {
            ElementType::Point => self.points.get(&id).cloned().map(CompleteElement::Point),
            ElementType::Polyline => self
                .polylines
                .get(&id)
                .cloned()
                .map(CompleteElement::Polyline),
            ElementType::Composite => self
                .composites
                .get(&id)
                .cloned()
                .map(CompleteElement::Composite),
        }
    }

    pub fn contains(&self, ty: ElementType, id: ElementId) -> bool {
        match ty {
            ElementType::Point => self.points.contains_key(&id),
            ElementType::Polyline => self.polylines.contains_key(&id),
            ElementType::Composite => self.composites.contains_key(&id),
        }
    }

    pub fn slot(&self, ty: ElementType, id: ElementId) -> Slot {
        if let Some(element) = self.get(ty, id) {
            Slot::Resolved(element)
        } else if self.unresolved.contains(&(ty, id)) {
            Slot::Unresolved
        } else {
            Slot::Absent
        }
    }

    /// Insert a point. Returns false (and drops `point`) if the id is taken.
    pub fn insert_point(&mut self, point: Arc<CompletePoint>) -> bool {
        if self.points.contains_key(&point.id) {
            return false;
        }
        self.unresolved.remove(&(ElementType::Point, point.id));
        self.points.insert(point.id, point);
        true
    }

    pub fn insert_polyline(&mut self, polyline: Arc<CompletePolyline>) -> bool {
        if self.polylines.contains_key(&polyline.id) {
            return false;
        }
        self.unresolved.remove(&(ElementType::Polyline, polyline.id));
        self.polylines.insert(polyline.id, polyline);
        true
    }

    pub fn insert_composite(&mut self, composite: Arc<CompleteComposite>) -> bool {
        if self.composites.contains_key(&composite.id) {
            return false;
        }
        self.unresolved.remove(&(ElementType::Composite, composite.id));
        self.composites.insert(composite.id, composite);
        true
    }

    /// Record that `(ty, id)` was referenced but cannot be materialized.
    /// No-op when the slot is already resolved.
    pub fn mark_unresolved(&mut self, ty: ElementType, id: ElementId) {
        if !self.contains(ty, id) {
            self.unresolved.insert((ty, id));
        }
    }

    /// Number of resolved entries in one namespace.
    pub fn len_of(&self, ty: ElementType) -> usize {
        match ty {
            ElementType::Point => self.points.len(),
            ElementType::Polyline => self.polylines.len(),
            ElementType::Composite => self.composites.len(),
        }
    }

    pub fn len(&self) -> usize {
        self.points.len() + self.polylines.len() + self.composites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every slot currently marked unresolved, sorted by (type, id).
    pub fn unresolved(&self) -> Vec<(ElementType, ElementId)> {
        let mut marked: Vec<_> = self.unresolved.iter().copied().collect();
        marked.sort_unstable();
        marked
    }
}
