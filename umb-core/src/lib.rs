//! UMB Core - Probabilistic Model Interchange Format Definitions
//!
//! This crate provides the I/O-free part of the UMB format: bit-packed
//! value records, the `index.json` schema with its annotation registry,
//! entry naming conventions, size contracts and validation.

pub mod csr;
pub mod error;
pub mod format;
pub mod index;
pub mod packing;
pub mod traits;
pub mod validation;

pub use error::*;
pub use format::*;
pub use index::{
    Annotation, FileData, ModelData, TransitionSystem, UmbIndex, ValuationDescription,
    ValuationItem,
};
pub use packing::{BitString, Layout, LayoutItem, VariableValue};
pub use traits::*;
