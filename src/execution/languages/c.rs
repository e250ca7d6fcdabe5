//! C language toolchain

use super::Toolchain;

pub fn toolchain() -> Toolchain {
    Toolchain::new(
        "main.c",
        Some(&["gcc", "-O2", "-o", "{bin}", "{src}", "-lm"]),
        &["{bin}"],
    )
}
