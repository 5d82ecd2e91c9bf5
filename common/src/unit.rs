//! Marker types for [`DateTimeOf`] parametrization.
//!
//! [`DateTimeOf`]: crate::DateTimeOf

/// Marker type indicating creation of something.
#[derive(Clone, Copy, Debug)]
pub struct Creation;

/// Marker type indicating deletion of something.
#[derive(Clone, Copy, Debug)]
pub struct Deletion;
