//! Element stream abstraction.

use crate::element::Element;
use crate::error::SourceError;

/// A restartable producer of flat elements in arbitrary order.
pub trait ElementSource {
    /// Pull the next element, or `None` once the stream is exhausted.
    fn next_element(&mut self) -> Result<Option<Element>, SourceError>;

    /// Rewind to the first element.
    fn reset(&mut self) -> Result<(), SourceError>;

    /// Whether [`reset`](Self::reset) is supported. Sources returning false are
    /// read exactly once.
    fn can_reset(&self) -> bool {
        true
    }
}

impl<S: ElementSource + ?Sized> ElementSource for &mut S {
    fn next_element(&mut self) -> Result<Option<Element>, SourceError> {
        (**self).next_element()
    }

    fn reset(&mut self) -> Result<(), SourceError> {
        (**self).reset()
    }

    fn can_reset(&self) -> bool {
        (**self).can_reset()
    }
}

/// An in-memory source replaying a fixed list of elements.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    elements: Vec<Element>,
    cursor: usize,
}

impl MemorySource {
    pub fn new(elements: Vec<Element>) -> Self {
        Self {
            elements,
            cursor: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

impl From<Vec<Element>> for MemorySource {
    fn from(elements: Vec<Element>) -> Self {
        Self::new(elements)
    }
}

impl FromIterator<Element> for MemorySource {
    fn from_iter<I: IntoIterator<Item = Element>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl ElementSource for MemorySource {
    fn next_element(&mut self) -> Result<Option<Element>, SourceError> {
        let next = self.elements.get(self.cursor).cloned();
        if next.is_some() {
            self.cursor += 1;
        }
        Ok(next)
    }

    fn reset(&mut self) -> Result<(), SourceError> {
        self.cursor = 0;
        Ok(())
    }
}

/// Wraps a one-shot iterator. Cannot be reset.
pub struct IterSource<I> {
    iter: I,
}

impl<I> IterSource<I>
where
    I: Iterator<Item = Result<Element, SourceError>>,
{
    pub fn new(iter: I) -> Self {
        Self { iter }
    }
}

impl<I> ElementSource for IterSource<I>
where
    I: Iterator<Item = Result<Element, SourceError>>,
{
    fn next_element(&mut self) -> Result<Option<Element>, SourceError> {
        self.iter.next().transpose()
    }

    fn reset(&mut self) -> Result<(), SourceError> {
        Err(SourceError::NotResettable)
    }

    fn can_reset(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::PointElement;

    #[test]
    fn test_memory_source_replays_after_reset() {
        let mut source: MemorySource = (1..=3)
            .map(|id| Element::from(PointElement::new(id, 0.0, 0.0)))
            .collect();

        let mut first = Vec::new();
        while let Some(e) = source.next_element().unwrap() {
            first.push(e.id());
        }
        assert_eq!(first, vec![1, 2, 3]);
        assert!(source.next_element().unwrap().is_none());

        source.reset().unwrap();
        assert_eq!(source.next_element().unwrap().map(|e| e.id()), Some(1));
    }

    #[test]
    fn test_iter_source_is_one_shot() {
        let mut source = IterSource::new(
            vec![Ok(Element::from(PointElement::new(1, 0.0, 0.0)))].into_iter(),
        );
        assert!(!source.can_reset());
        assert!(source.next_element().unwrap().is_some());
        assert!(source.next_element().unwrap().is_none());
        assert!(matches!(source.reset(), Err(SourceError::NotResettable)));
    }
}
