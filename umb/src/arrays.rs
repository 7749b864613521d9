//! Typed array codec
//!
//! Binary entries are little-endian arrays of one element kind. Writing
//! pulls values from producers on demand; reading pushes decoded values to
//! consumers. Both directions enforce the entry size implied by the index.

pub mod decode;
pub mod encode;

pub use encode::{ArraySource, ArrayStream, PendingEntry};
