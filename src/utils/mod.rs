//! Utility functions

pub mod time;
pub mod validation;

pub use time::cooldown_remaining;
pub use validation::{clamp_page, validate_source_code};
