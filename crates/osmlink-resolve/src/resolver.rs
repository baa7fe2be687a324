//! Stream → complete element graph.
//!
//! Resolution runs in three phases over the source:
//! 1. points are materialized as they are read;
//! 2. polylines are materialized against the settled point index, all or nothing;
//! 3. composites are resolved as a worklist over their composite-to-composite
//!    dependencies. A composite becomes ready once every composite it references
//!    has been built; an exclusion cascades to everything that references it;
//!    whatever is still waiting when the worklist drains is blocked on a cycle.
//!
//! Missing references never fail the run. They surface only as absence from the
//! output (and as an entry in the [`ResolutionReport`]). The only errors are
//! source failures, passed through untouched, and cancellation.

use crate::cancel::CancellationToken;
use crate::report::{Exclusion, ExclusionReason, ResolutionReport};
use osmlink_core::complete::{
    CompleteComposite, CompleteElement, CompleteMember, CompletePoint, CompletePolyline,
};
use osmlink_core::config::{OutputOrder, ResolveConfig, Strategy};
use osmlink_core::element::{
    CompositeElement, Element, ElementId, ElementType, PointElement, PolylineElement,
};
use osmlink_core::error::SourceError;
use osmlink_core::index::{IdentityIndex, Slot};
use osmlink_core::source::ElementSource;
use rayon::prelude::*;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

/// Fatal resolution failures.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error("resolution cancelled")]
    Cancelled,
}

/// The resolved graph plus a report of what was dropped.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub elements: Vec<CompleteElement>,
    pub report: ResolutionReport,
}

impl Resolution {
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn find(&self, element_type: ElementType, id: ElementId) -> Option<&CompleteElement> {
        self.elements
            .iter()
            .find(|e| e.element_type() == element_type && e.id() == id)
    }

    pub fn points(&self) -> impl Iterator<Item = &Arc<CompletePoint>> {
        self.elements.iter().filter_map(CompleteElement::as_point)
    }

    pub fn polylines(&self) -> impl Iterator<Item = &Arc<CompletePolyline>> {
        self.elements.iter().filter_map(CompleteElement::as_polyline)
    }

    pub fn composites(&self) -> impl Iterator<Item = &Arc<CompleteComposite>> {
        self.elements.iter().filter_map(CompleteElement::as_composite)
    }

    pub fn into_elements(self) -> Vec<CompleteElement> {
        self.elements
    }
}

/// Resolve with the default configuration and no cancellation.
pub fn resolve<S: ElementSource + ?Sized>(source: &mut S) -> Result<Resolution, ResolveError> {
    Resolver::new(ResolveConfig::default()).resolve(source)
}

/// Materializes flat element streams.
#[derive(Debug, Clone, Default)]
pub struct Resolver {
    config: ResolveConfig,
    cancel: CancellationToken,
}

impl Resolver {
    pub fn new(config: ResolveConfig) -> Self {
        Self {
            config,
            cancel: CancellationToken::new(),
        }
    }

    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn config(&self) -> &ResolveConfig {
        &self.config
    }

    pub fn resolve<S: ElementSource + ?Sized>(
        &self,
        source: &mut S,
    ) -> Result<Resolution, ResolveError> {
        let strategy = match self.config.strategy {
            Strategy::Restream if !source.can_reset() => {
                tracing::info!("source cannot be reset, buffering it instead of restreaming");
                Strategy::Buffer
            }
            s => s,
        };

        let mut build = Build::new(strategy);
        match strategy {
            Strategy::Restream => self.resolve_restream(source, &mut build)?,
            Strategy::Buffer => self.resolve_buffered(source, &mut build)?,
        }

        let resolution = build.finish(self.config.order);
        tracing::info!("{}", resolution.report.summary());
        Ok(resolution)
    }

    fn resolve_restream<S: ElementSource + ?Sized>(
        &self,
        source: &mut S,
        build: &mut Build,
    ) -> Result<(), ResolveError> {
        self.pass(source, build, |build, ordinal, element| {
            if let Element::Point(point) = element {
                build.add_point(ordinal, point);
            }
        })?;
        tracing::debug!(points = build.report.points, "points materialized");

        self.pass(source, build, |build, ordinal, element| {
            if let Element::Polyline(polyline) = element {
                build.add_polyline(ordinal, &polyline);
            }
        })?;
        tracing::debug!(polylines = build.report.polylines, "polylines materialized");

        let mut composites = Vec::new();
        self.pass(source, build, |_, ordinal, element| {
            if let Element::Composite(composite) = element {
                composites.push((ordinal, composite));
            }
        })?;
        build.resolve_composites(composites, &self.cancel)
    }

    fn resolve_buffered<S: ElementSource + ?Sized>(
        &self,
        source: &mut S,
        build: &mut Build,
    ) -> Result<(), ResolveError> {
        let mut points = Vec::new();
        let mut polylines = Vec::new();
        let mut composites = Vec::new();
        self.pass(source, build, |_, ordinal, element| match element {
            Element::Point(p) => points.push((ordinal, p)),
            Element::Polyline(p) => polylines.push((ordinal, p)),
            Element::Composite(c) => composites.push((ordinal, c)),
        })?;

        for (ordinal, point) in points {
            build.add_point(ordinal, point);
        }
        tracing::debug!(points = build.report.points, "points materialized");

        if self.config.parallel {
            build.add_polylines_parallel(polylines);
        } else {
            for (ordinal, polyline) in &polylines {
                build.add_polyline(*ordinal, polyline);
            }
        }
        tracing::debug!(polylines = build.report.polylines, "polylines materialized");

        build.resolve_composites(composites, &self.cancel)
    }

    /// Read the source once from the start, checking for cancellation before
    /// every pull. Non-resettable sources are read from where they are.
    fn pass<S, F>(
        &self,
        source: &mut S,
        build: &mut Build,
        mut visit: F,
    ) -> Result<(), ResolveError>
    where
        S: ElementSource + ?Sized,
        F: FnMut(&mut Build, usize, Element),
    {
        if source.can_reset() {
            source.reset()?;
        }
        let mut ordinal = 0;
        loop {
            if self.cancel.is_cancelled() {
                return Err(ResolveError::Cancelled);
            }
            let Some(element) = source.next_element()? else {
                break;
            };
            visit(build, ordinal, element);
            ordinal += 1;
        }
        build.report.passes += 1;
        build.report.input_elements = ordinal;
        Ok(())
    }
}

/// A composite waiting in the worklist.
struct Pending {
    ordinal: usize,
    element: CompositeElement,
}

/// Working state of one resolution. Dropped wholesale on error, so nothing
/// half-built ever leaves the resolver.
struct Build {
    index: IdentityIndex,
    defined: HashSet<(ElementType, ElementId)>,
    emitted: Vec<(usize, CompleteElement)>,
    report: ResolutionReport,
}

impl Build {
    fn new(strategy: Strategy) -> Self {
        Self {
            index: IdentityIndex::new(),
            defined: HashSet::new(),
            emitted: Vec::new(),
            report: ResolutionReport {
                strategy,
                ..ResolutionReport::default()
            },
        }
    }

    /// First definition of `(ty, id)` in the stream? Later ones are dropped.
    fn claim(&mut self, ty: ElementType, id: ElementId) -> bool {
        if self.defined.insert((ty, id)) {
            return true;
        }
        self.exclude(ty, id, ExclusionReason::Duplicate);
        false
    }

    fn exclude(&mut self, element_type: ElementType, id: ElementId, reason: ExclusionReason) {
        tracing::debug!(%element_type, id, %reason, "element excluded");
        if reason != ExclusionReason::Duplicate {
            self.index.mark_unresolved(element_type, id);
        }
        self.report.excluded.push(Exclusion {
            element_type,
            id,
            reason,
        });
    }

    fn add_point(&mut self, ordinal: usize, point: PointElement) {
        if !self.claim(ElementType::Point, point.id) {
            return;
        }
        let point = Arc::new(CompletePoint {
            id: point.id,
            coordinate: point.coordinate(),
            tags: point.tags,
        });
        self.index.insert_point(point.clone());
        self.report.points += 1;
        self.emitted.push((ordinal, CompleteElement::Point(point)));
    }

    fn add_polyline(&mut self, ordinal: usize, polyline: &PolylineElement) {
        if !self.claim(ElementType::Polyline, polyline.id) {
            return;
        }
        let built = materialize_polyline(&self.index, polyline);
        self.insert_polyline(ordinal, polyline.id, built);
    }

    /// Polylines only read the point index, which is settled by now, so they can
    /// be built on the rayon pool. Inserts happen afterwards on this thread.
    fn add_polylines_parallel(&mut self, polylines: Vec<(usize, PolylineElement)>) {
        let claimed: Vec<(usize, PolylineElement)> = polylines
            .into_iter()
            .filter(|(_, p)| self.claim(ElementType::Polyline, p.id))
            .collect();

        let index = &self.index;
        let built: Vec<(usize, ElementId, Result<CompletePolyline, Vec<ElementId>>)> = claimed
            .par_iter()
            .map(|(ordinal, p)| (*ordinal, p.id, materialize_polyline(index, p)))
            .collect();

        for (ordinal, id, result) in built {
            self.insert_polyline(ordinal, id, result);
        }
    }

    fn insert_polyline(
        &mut self,
        ordinal: usize,
        id: ElementId,
        built: Result<CompletePolyline, Vec<ElementId>>,
    ) {
        match built {
            Ok(polyline) => {
                let polyline = Arc::new(polyline);
                self.index.insert_polyline(polyline.clone());
                self.report.polylines += 1;
                self.emitted.push((ordinal, CompleteElement::Polyline(polyline)));
            }
            Err(missing) => {
                for &point in &missing {
                    self.index.mark_unresolved(ElementType::Point, point);
                }
                let reason = ExclusionReason::MissingMember {
                    element_type: ElementType::Point,
                    id: missing[0],
                };
                self.exclude(ElementType::Polyline, id, reason);
            }
        }
    }

    fn resolve_composites(
        &mut self,
        composites: Vec<(usize, CompositeElement)>,
        cancel: &CancellationToken,
    ) -> Result<(), ResolveError> {
        let mut order: Vec<ElementId> = Vec::new();
        let mut pending: HashMap<ElementId, Pending> = HashMap::new();
        for (ordinal, element) in composites {
            if self.claim(ElementType::Composite, element.id) {
                order.push(element.id);
                pending.insert(element.id, Pending { ordinal, element });
            }
        }

        // Remaining unbuilt composite dependencies per waiting composite, and
        // the reverse edges used to release or cascade.
        let mut waiting: HashMap<ElementId, usize> = HashMap::new();
        let mut dependents: HashMap<ElementId, Vec<ElementId>> = HashMap::new();
        let mut ready: VecDeque<ElementId> = VecDeque::new();
        let mut failed: VecDeque<ElementId> = VecDeque::new();

        for &id in &order {
            match self.composite_dependencies(&pending[&id].element, &pending) {
                Ok(deps) if deps.is_empty() => ready.push_back(id),
                Ok(deps) => {
                    waiting.insert(id, deps.len());
                    for dep in deps {
                        dependents.entry(dep).or_default().push(id);
                    }
                }
                Err(reason) => {
                    self.exclude(ElementType::Composite, id, reason);
                    failed.push_back(id);
                }
            }
        }
        self.cascade(&mut failed, &mut waiting, &mut dependents);

        while let Some(id) = ready.pop_front() {
            if cancel.is_cancelled() {
                return Err(ResolveError::Cancelled);
            }
            let Some(Pending { ordinal, element }) = pending.remove(&id) else {
                continue;
            };
            match self.materialize_composite(&element) {
                Ok(composite) => {
                    let composite = Arc::new(composite);
                    self.index.insert_composite(composite.clone());
                    self.report.composites += 1;
                    self.emitted.push((ordinal, CompleteElement::Composite(composite)));

                    for dependent in dependents.remove(&id).unwrap_or_default() {
                        if let Some(remaining) = waiting.get_mut(&dependent) {
                            *remaining -= 1;
                            if *remaining == 0 {
                                waiting.remove(&dependent);
                                ready.push_back(dependent);
                            }
                        }
                    }
                }
                Err(reason) => {
                    self.exclude(ElementType::Composite, id, reason);
                    failed.push_back(id);
                    self.cascade(&mut failed, &mut waiting, &mut dependents);
                }
            }
        }

        for id in order {
            if waiting.contains_key(&id) {
                self.exclude(ElementType::Composite, id, ExclusionReason::Cycle);
            }
        }
        tracing::debug!(composites = self.report.composites, "composites materialized");
        Ok(())
    }

    /// Check the members of `composite` against the index and return the
    /// distinct pending composites it still depends on.
    ///
    /// Every missing reference is marked unresolved in the index, not just the
    /// first. A composite member whose slot is already marked unresolved was
    /// excluded earlier and fails the check immediately.
    fn composite_dependencies(
        &mut self,
        composite: &CompositeElement,
        pending: &HashMap<ElementId, Pending>,
    ) -> Result<Vec<ElementId>, ExclusionReason> {
        let mut deps = Vec::new();
        let mut seen = HashSet::new();
        let mut failure = None;
        for (position, member) in composite.members.iter().enumerate() {
            let Some(element_type) = member.member_type.element_type() else {
                failure.get_or_insert(ExclusionReason::MalformedMember { position });
                continue;
            };
            let id = member.id;
            let defined = match element_type {
                ElementType::Composite => pending.contains_key(&id),
                ty => self.index.contains(ty, id),
            };
            if !defined {
                self.index.mark_unresolved(element_type, id);
                failure.get_or_insert(ExclusionReason::MissingMember { element_type, id });
                continue;
            }
            if element_type != ElementType::Composite {
                continue;
            }
            match self.index.slot(ElementType::Composite, id) {
                Slot::Unresolved => {
                    failure.get_or_insert(ExclusionReason::DependencyExcluded { id });
                }
                Slot::Absent if seen.insert(id) => deps.push(id),
                Slot::Absent | Slot::Resolved(_) => {}
            }
        }
        match failure {
            Some(reason) => Err(reason),
            None => Ok(deps),
        }
    }

    /// Exclude every composite waiting on an already excluded one, transitively.
    fn cascade(
        &mut self,
        failed: &mut VecDeque<ElementId>,
        waiting: &mut HashMap<ElementId, usize>,
        dependents: &mut HashMap<ElementId, Vec<ElementId>>,
    ) {
        while let Some(id) = failed.pop_front() {
            for dependent in dependents.remove(&id).unwrap_or_default() {
                if waiting.remove(&dependent).is_some() {
                    self.exclude(
                        ElementType::Composite,
                        dependent,
                        ExclusionReason::DependencyExcluded { id },
                    );
                    failed.push_back(dependent);
                }
            }
        }
    }

    fn materialize_composite(
        &self,
        composite: &CompositeElement,
    ) -> Result<CompleteComposite, ExclusionReason> {
        let members = composite
            .members
            .iter()
            .enumerate()
            .map(|(position, member)| {
                let element_type = member
                    .member_type
                    .element_type()
                    .ok_or(ExclusionReason::MalformedMember { position })?;
                let element = self.index.get(element_type, member.id).ok_or(
                    ExclusionReason::MissingMember {
                        element_type,
                        id: member.id,
                    },
                )?;
                Ok(CompleteMember {
                    role: member.role.clone(),
                    element,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(CompleteComposite {
            id: composite.id,
            members,
            tags: composite.tags.clone(),
        })
    }

    fn finish(mut self, order: OutputOrder) -> Resolution {
        self.report.unresolved = self.index.unresolved();
        match order {
            OutputOrder::Grouped => self
                .emitted
                .sort_by_key(|(ordinal, e)| (e.element_type(), *ordinal)),
            OutputOrder::Stream => self.emitted.sort_by_key(|(ordinal, _)| *ordinal),
        }
        Resolution {
            elements: self.emitted.into_iter().map(|(_, e)| e).collect(),
            report: self.report,
        }
    }
}

/// Build `polyline` against the point index, or return every point id it
/// references that is not there, in path order without repeats.
fn materialize_polyline(
    index: &IdentityIndex,
    polyline: &PolylineElement,
) -> Result<CompletePolyline, Vec<ElementId>> {
    let mut points = Vec::with_capacity(polyline.points.len());
    let mut missing: Vec<ElementId> = Vec::new();
    for &id in &polyline.points {
        match index.point(id) {
            Some(point) => points.push(point.clone()),
            None if !missing.contains(&id) => missing.push(id),
            None => {}
        }
    }
    if !missing.is_empty() {
        return Err(missing);
    }

    Ok(CompletePolyline {
        id: polyline.id,
        points,
        tags: polyline.tags.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use osmlink_core::element::{CompositeMember, MemberType};
    use osmlink_core::source::MemorySource;

    fn point(id: ElementId) -> Element {
        PointElement::new(id, id as f64, 0.0).into()
    }

    fn composite(id: ElementId, members: &[(ElementId, ElementType)]) -> Element {
        CompositeElement::new(
            id,
            members
                .iter()
                .map(|&(m, ty)| CompositeMember::new(m, "", ty))
                .collect::<Vec<_>>(),
        )
        .into()
    }

    #[test]
    fn test_dependency_dedup_counts_each_composite_once() {
        // 2 references 1 twice; it must be released after 1 is built once.
        let mut source = MemorySource::new(vec![
            composite(
                2,
                &[(1, ElementType::Composite), (1, ElementType::Composite)],
            ),
            composite(1, &[(5, ElementType::Point)]),
            point(5),
        ]);
        let resolution = resolve(&mut source).unwrap();
        let c2 = resolution
            .find(ElementType::Composite, 2)
            .and_then(CompleteElement::as_composite)
            .unwrap();
        assert_eq!(c2.members.len(), 2);
        assert!(c2.members[0].element.same_instance(&c2.members[1].element));
    }

    #[test]
    fn test_cascade_reports_first_failed_dependency() {
        let mut source = MemorySource::new(vec![
            composite(3, &[(2, ElementType::Composite)]),
            composite(2, &[(1, ElementType::Composite)]),
            composite(1, &[(99, ElementType::Point)]),
        ]);
        let resolution = resolve(&mut source).unwrap();
        assert!(resolution.is_empty());

        let reasons: Vec<_> = resolution
            .report
            .excluded_of(ElementType::Composite)
            .map(|e| (e.id, e.reason.clone()))
            .collect();
        assert!(reasons.contains(&(
            1,
            ExclusionReason::MissingMember {
                element_type: ElementType::Point,
                id: 99
            }
        )));
        assert!(reasons.contains(&(2, ExclusionReason::DependencyExcluded { id: 1 })));
        assert!(reasons.contains(&(3, ExclusionReason::DependencyExcluded { id: 2 })));
    }

    #[test]
    fn test_malformed_member_position() {
        let mut source = MemorySource::new(vec![
            point(1),
            CompositeElement::new(
                4,
                vec![
                    CompositeMember::new(1, "a", MemberType::Point),
                    CompositeMember::new(1, "b", MemberType::Unknown),
                ],
            )
            .into(),
        ]);
        let resolution = resolve(&mut source).unwrap();
        assert_eq!(resolution.len(), 1);
        assert_eq!(
            resolution.report.excluded[0].reason,
            ExclusionReason::MalformedMember { position: 1 }
        );
    }

    #[test]
    fn test_missing_references_are_marked_unresolved() {
        let mut source = MemorySource::new(vec![
            point(1),
            PolylineElement::new(5, vec![10, 11, 10, 12]).into(),
            composite(
                4,
                &[
                    (10, ElementType::Point),
                    (11, ElementType::Point),
                    (12, ElementType::Point),
                ],
            ),
            composite(6, &[(1, ElementType::Point), (7, ElementType::Composite)]),
        ]);
        let resolution = resolve(&mut source).unwrap();
        assert_eq!(resolution.len(), 1);
        assert_eq!(
            resolution.report.unresolved,
            vec![
                (ElementType::Point, 10),
                (ElementType::Point, 11),
                (ElementType::Point, 12),
                (ElementType::Polyline, 5),
                (ElementType::Composite, 4),
                (ElementType::Composite, 6),
                (ElementType::Composite, 7),
            ]
        );
    }

    #[test]
    fn test_reference_to_excluded_composite_fails_through_index() {
        // 1 is excluded while scanning, before 2 is checked, so 2 fails on the
        // unresolved slot rather than waiting on 1.
        let mut source = MemorySource::new(vec![
            composite(1, &[(99, ElementType::Polyline)]),
            composite(2, &[(1, ElementType::Composite), (1, ElementType::Composite)]),
        ]);
        let resolution = resolve(&mut source).unwrap();
        assert!(resolution.is_empty());
        assert_eq!(
            resolution.report.excluded[1],
            Exclusion {
                element_type: ElementType::Composite,
                id: 2,
                reason: ExclusionReason::DependencyExcluded { id: 1 },
            }
        );
        assert_eq!(resolution.report.excluded.len(), 2);
    }

    #[test]
    fn test_duplicates_are_not_marked_unresolved() {
        let mut source = MemorySource::new(vec![point(1), point(1)]);
        let resolution = resolve(&mut source).unwrap();
        assert_eq!(resolution.len(), 1);
        assert!(resolution.report.unresolved.is_empty());
    }

    #[test]
    fn test_restream_counts_three_passes() {
        let mut source = MemorySource::new(vec![point(1), point(2)]);
        let resolution = resolve(&mut source).unwrap();
        assert_eq!(resolution.report.passes, 3);
        assert_eq!(resolution.report.input_elements, 2);
        assert_eq!(resolution.report.strategy, Strategy::Restream);
    }
}
