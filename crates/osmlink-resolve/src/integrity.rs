//! Structural checks over an emitted element graph.
//!
//! Verifies that each (type, id) appears once, that every polyline point and
//! composite member is itself part of the graph, and that it is the very same
//! instance as the emitted element with that identifier.

use osmlink_core::complete::CompleteElement;
use osmlink_core::element::{ElementId, ElementType};
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Violation {
    /// The same (type, id) was emitted more than once.
    DuplicateElement {
        element_type: ElementType,
        id: ElementId,
    },
    /// A reference points at something not in the graph.
    Dangling {
        owner_type: ElementType,
        owner: ElementId,
        element_type: ElementType,
        id: ElementId,
    },
    /// A reference points at an equal-looking copy rather than the emitted instance.
    NotShared {
        owner_type: ElementType,
        owner: ElementId,
        element_type: ElementType,
        id: ElementId,
    },
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct IntegrityReport {
    pub elements_checked: usize,
    pub references_checked: usize,
    pub violations: Vec<Violation>,
}

impl IntegrityReport {
    pub fn is_ok(&self) -> bool {
        self.violations.is_empty()
    }
}

pub fn check(elements: &[CompleteElement]) -> IntegrityReport {
    let mut report = IntegrityReport {
        elements_checked: elements.len(),
        ..IntegrityReport::default()
    };

    let mut by_key: HashMap<(ElementType, ElementId), &CompleteElement> = HashMap::new();
    for element in elements {
        let key = (element.element_type(), element.id());
        if by_key.insert(key, element).is_some() {
            report.violations.push(Violation::DuplicateElement {
                element_type: key.0,
                id: key.1,
            });
        }
    }

    for element in elements {
        let owner_type = element.element_type();
        let owner = element.id();
        let references: Vec<CompleteElement> = match element {
            CompleteElement::Point(_) => continue,
            CompleteElement::Polyline(p) => p
                .points
                .iter()
                .cloned()
                .map(CompleteElement::Point)
                .collect(),
            CompleteElement::Composite(c) => c.members.iter().map(|m| m.element.clone()).collect(),
        };

        for reference in references {
            report.references_checked += 1;
            let element_type = reference.element_type();
            let id = reference.id();
            match by_key.get(&(element_type, id)) {
                None => report.violations.push(Violation::Dangling {
                    owner_type,
                    owner,
                    element_type,
                    id,
                }),
                Some(emitted) if !emitted.same_instance(&reference) => {
                    report.violations.push(Violation::NotShared {
                        owner_type,
                        owner,
                        element_type,
                        id,
                    });
                }
                Some(_) => {}
            }
        }
    }

    report
}
