//! Flat, reference-based network elements as they arrive from a stream.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Identifier of an element, unique within its [`ElementType`] only.
pub type ElementId = i64;

/// Free-form key/value attributes carried by every element.
pub type Tags = BTreeMap<String, String>;

/// The three identifier namespaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementType {
    Point,
    Polyline,
    Composite,
}

impl ElementType {
    pub fn as_str(self) -> &'static str {
        match self {
            ElementType::Point => "point",
            ElementType::Polyline => "polyline",
            ElementType::Composite => "composite",
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// A point feature. Depends on nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointElement {
    pub id: ElementId,
    pub lat: f64,
    pub lon: f64,
    #[serde(default, skip_serializing_if = "Tags::is_empty")]
    pub tags: Tags,
}

impl PointElement {
    pub fn new(id: ElementId, lat: f64, lon: f64) -> Self {
        Self {
            id,
            lat,
            lon,
            tags: Tags::new(),
        }
    }

    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.lat, self.lon)
    }
}

/// An ordered path over point identifiers. Repeats are allowed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolylineElement {
    pub id: ElementId,
    pub points: Vec<ElementId>,
    #[serde(default, skip_serializing_if = "Tags::is_empty")]
    pub tags: Tags,
}

impl PolylineElement {
    pub fn new(id: ElementId, points: Vec<ElementId>) -> Self {
        Self {
            id,
            points,
            tags: Tags::new(),
        }
    }
}

/// The type tag of a composite member as written by the producer.
///
/// Producers may emit tags this crate does not know, or omit the tag; those
/// deserialize to [`MemberType::Unknown`] and make the owning composite
/// unresolvable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberType {
    Point,
    Polyline,
    Composite,
    #[default]
    #[serde(other)]
    Unknown,
}

impl MemberType {
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "point" => MemberType::Point,
            "polyline" => MemberType::Polyline,
            "composite" => MemberType::Composite,
            _ => MemberType::Unknown,
        }
    }

    /// The namespace this member is looked up in, if the tag is recognized.
    pub fn element_type(self) -> Option<ElementType> {
        match self {
            MemberType::Point => Some(ElementType::Point),
            MemberType::Polyline => Some(ElementType::Polyline),
            MemberType::Composite => Some(ElementType::Composite),
            MemberType::Unknown => None,
        }
    }
}

impl From<ElementType> for MemberType {
    fn from(ty: ElementType) -> Self {
        match ty {
            ElementType::Point => MemberType::Point,
            ElementType::Polyline => MemberType::Polyline,
            ElementType::Composite => MemberType::Composite,
        }
    }
}

/// One `(ref, type, role)` entry of a composite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompositeMember {
    #[serde(rename = "ref")]
    pub id: ElementId,
    #[serde(rename = "type", default, deserialize_with = "lenient_member_type")]
    pub member_type: MemberType,
    #[serde(default)]
    pub role: String,
}

impl CompositeMember {
    pub fn new(id: ElementId, role: impl Into<String>, member_type: impl Into<MemberType>) -> Self {
        Self {
            id,
            member_type: member_type.into(),
            role: role.into(),
        }
    }
}

/// Null and non-string tags read as [`MemberType::Unknown`] instead of failing
/// the whole element.
fn lenient_member_type<'de, D>(deserializer: D) -> Result<MemberType, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Tag(String),
        Other(serde::de::IgnoredAny),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Tag(tag) => MemberType::from_tag(&tag),
        Raw::Other(_) => MemberType::Unknown,
    })
}

/// A collection of points, polylines or other composites with roles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeElement {
    pub id: ElementId,
    pub members: Vec<CompositeMember>,
    #[serde(default, skip_serializing_if = "Tags::is_empty")]
    pub tags: Tags,
}

impl CompositeElement {
    pub fn new(id: ElementId, members: Vec<CompositeMember>) -> Self {
        Self {
            id,
            members,
            tags: Tags::new(),
        }
    }
}

/// A tagged flat element as produced by an [`ElementSource`](crate::source::ElementSource).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Element {
    Point(PointElement),
    Polyline(PolylineElement),
    Composite(CompositeElement),
}

impl Element {
    pub fn id(&self) -> ElementId {
        match self {
            Element::Point(p) => p.id,
            Element::Polyline(p) => p.id,
            Element::Composite(c) => c.id,
        }
    }

    pub fn element_type(&self) -> ElementType {
        match self {
            Element::Point(_) => ElementType::Point,
            Element::Polyline(_) => ElementType::Polyline,
            Element::Composite(_) => ElementType::Composite,
        }
    }

    /// Attach tags, replacing any already present.
    #[must_use]
    pub fn with_tags<K, V>(mut self, tags: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let tags: Tags = tags
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        match &mut self {
            Element::Point(p) => p.tags = tags,
            Element::Polyline(p) => p.tags = tags,
            Element::Composite(c) => c.tags = tags,
        }
        self
    }
}

impl From<PointElement> for Element {
    fn from(p: PointElement) -> Self {
        Element::Point(p)
    }
}

impl From<PolylineElement> for Element {
    fn from(p: PolylineElement) -> Self {
        Element::Polyline(p)
    }
}

impl From<CompositeElement> for Element {
    fn from(c: CompositeElement) -> Self {
        Element::Composite(c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_json_shape() {
        let json = r#"{"type":"composite","id":7,"members":[
            {"ref":1,"type":"polyline","role":"outer"},
            {"ref":2,"type":"point"}
        ]}"#;
        let element: Element = serde_json::from_str(json).unwrap();
        let Element::Composite(c) = element else {
            panic!("expected composite");
        };
        assert_eq!(c.id, 7);
        assert_eq!(c.members[0].member_type, MemberType::Polyline);
        assert_eq!(c.members[0].role, "outer");
        assert_eq!(c.members[1].role, "");
        assert!(c.tags.is_empty());
    }

    #[test]
    fn test_unknown_member_type() {
        let json = r#"{"ref":3,"type":"area","role":"x"}"#;
        let member: CompositeMember = serde_json::from_str(json).unwrap();
        assert_eq!(member.member_type, MemberType::Unknown);
        assert_eq!(member.member_type.element_type(), None);
    }

    #[test]
    fn test_missing_or_malformed_member_type() {
        let json = r#"{"type":"composite","id":3,"members":[
            {"ref":1},
            {"ref":2,"type":null},
            {"ref":3,"type":4},
            {"ref":4,"type":{"kind":"point"}},
            {"ref":5,"type":"composite"}
        ]}"#;
        let Element::Composite(c) = serde_json::from_str(json).unwrap() else {
            panic!("expected composite");
        };
        let types: Vec<MemberType> = c.members.iter().map(|m| m.member_type).collect();
        assert_eq!(
            types,
            vec![
                MemberType::Unknown,
                MemberType::Unknown,
                MemberType::Unknown,
                MemberType::Unknown,
                MemberType::Composite,
            ]
        );
    }

    #[test]
    fn test_with_tags() {
        let element = Element::from(PointElement::new(1, 51.0, 4.0))
            .with_tags([("highway", "crossing")]);
        let Element::Point(p) = element else {
            panic!("expected point");
        };
        assert_eq!(p.tags.get("highway").map(String::as_str), Some("crossing"));
    }
}
