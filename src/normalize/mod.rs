//! Canonical forms for dates, diagnostic codes and hospital names
//!
//! Everything produced here is a comparison key. Original candidate text is
//! kept untouched by the callers.

pub mod code;
pub mod date;
pub mod hospital;

pub use code::{category_of, matching_form, normalize_code, CodeEntry, CodeIndex};
pub use date::{to_iso, DateNormalizer, ParsedDate};
pub use hospital::HospitalNormalizer;
