//! Core types for osmlink.
//!
//! Provides the flat element model ([`element`]), the fully linked complete
//! model ([`complete`]), the identity index used during resolution
//! ([`index::IdentityIndex`]), element sources, configuration, and curve
//! simplification.

pub mod complete;
pub mod config;
pub mod element;
pub mod error;
pub mod index;
pub mod simplify;
pub mod source;
