//! Java language toolchain
//!
//! `javac` insists that a public class lives in a file of the same name, so
//! the source file is named after the detected public class.

use std::sync::LazyLock;

use regex::Regex;

use super::Toolchain;

static PUBLIC_CLASS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"public\s+class\s+(\w+)").expect("valid regex"));

pub fn toolchain() -> Toolchain {
    Toolchain::new(
        "{class}.java",
        Some(&["javac", "-d", "{dir}", "{src}"]),
        &["java", "-cp", "{dir}", "{class}"],
    )
}

/// Name of the first public class in `source`, `Main` when there is none
pub fn public_class_name(source: &str) -> String {
    PUBLIC_CLASS
        .captures(source)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| "Main".to_string())
}
