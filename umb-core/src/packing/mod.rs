//! Bit-level packing of per-state value records
//!
//! [`BitString`] reads and writes arbitrary-width fields; [`Layout`] places
//! named fields one after another and describes them in the index.

pub mod bit_string;
pub mod layout;

pub use bit_string::BitString;
pub use layout::{Layout, LayoutItem, VariableValue};
