//! Resolution of flat element streams into a fully linked element graph.
//!
//! [`resolver::Resolver`] turns any [`ElementSource`](osmlink_core::source::ElementSource)
//! into shared [`CompleteElement`](osmlink_core::complete::CompleteElement)s,
//! [`integrity::check`] verifies an emitted graph, and [`report`] describes what
//! was dropped.

pub mod cancel;
pub mod integrity;
pub mod report;
pub mod resolver;

pub use cancel::CancellationToken;
pub use resolver::{Resolution, ResolveError, Resolver, resolve};
