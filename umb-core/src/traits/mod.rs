//! Core traits for the UMB format

pub mod element;

pub use element::ArrayElement;
