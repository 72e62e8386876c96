//! URL handling module for A11y-Scout
//!
//! This module provides URL normalization for duplicate detection, origin
//! extraction for sitemap lookup and link resolution, and same-origin checks.

mod domain;
mod normalize;

pub use domain::{extract_domain, is_same_origin, site_origin};
pub use normalize::normalize_url;
