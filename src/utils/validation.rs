//! Input validation utilities

use crate::constants::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};

/// Validate source code size
pub fn validate_source_code(code: &str, max_bytes: usize) -> Result<(), String> {
    if code.trim().is_empty() {
        return Err("Source code cannot be empty".to_string());
    }
    if code.len() > max_bytes {
        return Err(format!(
            "Source code exceeds maximum size of {} bytes",
            max_bytes
        ));
    }
    Ok(())
}

/// Normalize optional paging parameters into a 1-based page and a bounded page size
pub fn clamp_page(page: Option<u32>, page_size: Option<u32>) -> (u32, u32) {
    let page = page.unwrap_or(1).max(1);
    let page_size = page_size
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);
    (page, page_size)
}
