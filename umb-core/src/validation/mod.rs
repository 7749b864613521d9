//! Validation utilities for the UMB format
//!
//! This module contains pure validation functions with no I/O dependencies:
//! entry size arithmetic and identifier rules.

pub mod bounds;
pub mod ids;

pub use bounds::{checked_entry_size, packed_bool_bytes, string_blob_size, validate_entry_size};
pub use ids::{is_valid_id, to_unique_id, to_valid_id, validate_id};
