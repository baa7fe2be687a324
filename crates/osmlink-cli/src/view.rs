//! Serializable views of a resolution for `--json` output.
//!
//! Complete elements share handles, so members are written as references
//! (`ref` + `type`) instead of being inlined again.

use osmlink_core::complete::CompleteElement;
use osmlink_core::element::{Coordinate, ElementId, ElementType, Tags};
use osmlink_resolve::Resolution;
use osmlink_resolve::integrity::IntegrityReport;
use osmlink_resolve::report::ResolutionReport;
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ElementView {
    Point {
        id: ElementId,
        lat: f64,
        lon: f64,
        #[serde(skip_serializing_if = "Tags::is_empty")]
        tags: Tags,
    },
    Polyline {
        id: ElementId,
        points: Vec<ElementId>,
        #[serde(skip_serializing_if = "Tags::is_empty")]
        tags: Tags,
    },
    Composite {
        id: ElementId,
        members: Vec<MemberView>,
        #[serde(skip_serializing_if = "Tags::is_empty")]
        tags: Tags,
    },
}

#[derive(Debug, Serialize)]
pub struct MemberView {
    #[serde(rename = "ref")]
    pub id: ElementId,
    #[serde(rename = "type")]
    pub element_type: ElementType,
    pub role: String,
}

impl From<&CompleteElement> for ElementView {
    fn from(element: &CompleteElement) -> Self {
        match element {
            CompleteElement::Point(p) => ElementView::Point {
                id: p.id,
                lat: p.coordinate.lat,
                lon: p.coordinate.lon,
                tags: p.tags.clone(),
            },
            CompleteElement::Polyline(p) => ElementView::Polyline {
                id: p.id,
                points: p.point_ids(),
                tags: p.tags.clone(),
            },
            CompleteElement::Composite(c) => ElementView::Composite {
                id: c.id,
                members: c
                    .members
                    .iter()
                    .map(|m| MemberView {
                        id: m.element.id(),
                        element_type: m.element.element_type(),
                        role: m.role.clone(),
                    })
                    .collect(),
                tags: c.tags.clone(),
            },
        }
    }
}

/// Output of `osmlink resolve --json`.
#[derive(Debug, Serialize)]
pub struct ResolutionView<'a> {
    pub report: &'a ResolutionReport,
    pub elements: Vec<ElementView>,
}

impl<'a> From<&'a Resolution> for ResolutionView<'a> {
    fn from(resolution: &'a Resolution) -> Self {
        Self {
            report: &resolution.report,
            elements: resolution.elements.iter().map(ElementView::from).collect(),
        }
    }
}

/// Output of `osmlink validate --json`.
#[derive(Debug, Serialize)]
pub struct ValidationView<'a> {
    pub resolution: &'a ResolutionReport,
    pub integrity: &'a IntegrityReport,
}

/// Output of `osmlink simplify --json`.
#[derive(Debug, Serialize)]
pub struct SimplifyView {
    pub polyline: ElementId,
    pub tolerance: f64,
    pub original: usize,
    pub coordinates: Vec<Coordinate>,
}
