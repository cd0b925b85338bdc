//! Round-trip checks for generated codecs against the shapes fixture.
pub mod shapes;
