//! Portfolio management module

pub mod position;

pub use position::*;
