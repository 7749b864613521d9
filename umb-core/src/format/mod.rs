//! Format definitions for UMB files
//!
//! This module contains the entry names, interchange enums and element kinds
//! that make up the on-disk layout of a UMB archive.

pub mod constants;
pub mod element;
pub mod enums;
pub mod paths;

pub use constants::*;
pub use element::ElementKind;
pub use enums::{
    CompressionFormat, Entity, Interchange, NumericType, TimeNotion, ValueType, VariableType,
};
pub use paths::{annotation_file, entity_dir, valuations_file};
