//! Shared utilities: input validation.

pub mod validation;

pub use validation::{validate_cid, validate_http_url};
