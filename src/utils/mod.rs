//! Shared helpers.

pub mod fields;

pub use fields::FieldLookup;
