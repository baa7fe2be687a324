//! Spinner feedback while a source is being read.

use indicatif::{ProgressBar, ProgressStyle};
use osmlink_core::element::Element;
use osmlink_core::error::SourceError;
use osmlink_core::source::ElementSource;

const TICK_EVERY: u64 = 1_000;

/// Spinner on stderr, hidden when stderr is not a terminal.
pub fn spinner() -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message("Reading elements...");
    spinner
}

/// Wraps a source and ticks a spinner as elements are pulled.
pub struct ProgressSource<S> {
    inner: S,
    spinner: ProgressBar,
    pass: usize,
    pulled: u64,
}

impl<S: ElementSource> ProgressSource<S> {
    pub fn new(inner: S, spinner: ProgressBar) -> Self {
        Self {
            inner,
            spinner,
            pass: 0,
            pulled: 0,
        }
    }

    /// Elements pulled in the current pass.
    pub fn pulled(&self) -> u64 {
        self.pulled
    }

    pub fn finish(self) -> S {
        self.spinner.finish_and_clear();
        self.inner
    }
}

impl<S: ElementSource> ElementSource for ProgressSource<S> {
    fn next_element(&mut self) -> Result<Option<Element>, SourceError> {
        let next = self.inner.next_element()?;
        if next.is_some() {
            self.pulled += 1;
            if self.pulled % TICK_EVERY == 0 {
                self.spinner
                    .set_message(format!("pass {}: {} elements read", self.pass + 1, self.pulled));
                self.spinner.tick();
            }
        }
        Ok(next)
    }

    fn reset(&mut self) -> Result<(), SourceError> {
        self.inner.reset()?;
        if self.pulled > 0 {
            self.pass += 1;
        }
        self.pulled = 0;
        Ok(())
    }

    fn can_reset(&self) -> bool {
        self.inner.can_reset()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use osmlink_core::element::PointElement;
    use osmlink_core::source::MemorySource;

    #[test]
    fn test_counts_per_pass() {
        let inner = MemorySource::new(vec![
            PointElement::new(1, 0.0, 0.0).into(),
            PointElement::new(2, 0.0, 0.0).into(),
        ]);
        let mut source = ProgressSource::new(inner, ProgressBar::hidden());
        while source.next_element().unwrap().is_some() {}
        assert_eq!(source.pulled(), 2);

        source.reset().unwrap();
        assert_eq!(source.pulled(), 0);
        assert!(source.next_element().unwrap().is_some());
        assert_eq!(source.finish().len(), 2);
    }
}
