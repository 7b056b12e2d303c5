//! Strategy module
//!
//! Strategy definition, templates, validation, and buy/sell evaluation.

pub mod base;
pub mod templates;
pub mod validator;

pub use base::*;
pub use validator::*;
