//! Input formats, progress reporting and JSON views behind the `osmlink` binary.

pub mod input;
pub mod progress;
pub mod view;
